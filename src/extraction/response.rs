//! Recovering JSON from free-form model output.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z]*[ \t]*").expect("fence regex"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma regex"));

/// Parse the outermost JSON object in `response`: code fences are stripped, the text from
/// the first `{` to the last `}` is parsed, and trailing commas are removed on a second try.
pub fn clean_json_response(response: &str) -> Option<Value> {
    let without_fences = CODE_FENCE.replace_all(response, "");
    let start = without_fences.find('{')?;
    let end = without_fences.rfind('}')?;
    if end < start {
        tracing::warn!("Model response has no JSON object");
        return None;
    }
    let candidate = &without_fences[start..=end];

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Some(value),
        Err(first_error) => {
            let repaired = TRAILING_COMMA.replace_all(candidate, "$1");
            match serde_json::from_str::<Value>(&repaired) {
                Ok(value) => Some(value),
                Err(second_error) => {
                    tracing::warn!(
                        error = %first_error,
                        retry_error = %second_error,
                        "Model response is not valid JSON"
                    );
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fences_and_prose() {
        let response = "Here you go:\n```json\n{\"questions\": [{\"question_number\": \"1\"}]}\n```\nDone.";
        let value = clean_json_response(response).expect("json");
        assert_eq!(value["questions"][0]["question_number"], "1");
    }

    #[test]
    fn repairs_trailing_commas() {
        let response = "{\"answers\": [{\"answer_number\": \"2\",},],}";
        let value = clean_json_response(response).expect("json");
        assert_eq!(value["answers"][0]["answer_number"], "2");
    }

    #[test]
    fn rejects_text_without_object() {
        assert!(clean_json_response("no json here").is_none());
        assert!(clean_json_response("} backwards {").is_none());
        assert!(clean_json_response("{ not: json }").is_none());
    }
}
