//! Batched extraction of questions or answers from one PDF.

use super::config::ExtractionKind;
use super::generative::{GenerativeClient, GenerativeError};
use super::prompt::{batch_prompt, capitalize, overview_prompt};
use super::response::clean_json_response;
use super::subjects::SubjectProfile;
use serde_json::{Map, Value, json};

/// Items pulled from a document plus its overview info.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutput {
    /// Questions or answers.
    pub kind: ExtractionKind,
    /// Overview returned by the model, or a placeholder when the overview failed.
    pub document_info: Value,
    /// Extracted items in batch order.
    pub items: Vec<Value>,
}

impl ExtractionOutput {
    /// `{ "document_info": ..., "questions" | "answers": [...] }`
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("document_info".into(), self.document_info.clone());
        object.insert(self.kind.as_str().into(), Value::Array(self.items.clone()));
        Value::Object(object)
    }
}

/// Runs the overview + batch prompts against a generative model.
pub struct BookExtractor<'a> {
    client: &'a dyn GenerativeClient,
}

impl<'a> BookExtractor<'a> {
    /// Extractor backed by `client`.
    pub fn new(client: &'a dyn GenerativeClient) -> Self {
        Self { client }
    }

    /// Extract every item of `kind` from `pdf`.
    ///
    /// The overview supplies the item total (falling back to the subject's expected total);
    /// a batch that fails to generate or parse is logged and skipped. The call fails only when
    /// nothing was extracted and at least one batch request failed.
    pub async fn extract(
        &self,
        pdf: &[u8],
        profile: &SubjectProfile,
        kind: ExtractionKind,
    ) -> Result<ExtractionOutput, GenerativeError> {
        let config = profile.config(kind);
        let total_key = kind.total_key();

        let overview = match self.client.generate(pdf, &overview_prompt(profile, &config)).await {
            Ok(text) => clean_json_response(&text),
            Err(error) => {
                tracing::warn!(error = %error, "Document overview failed; using default batching");
                None
            }
        };
        let document_info = overview
            .as_ref()
            .and_then(|value| value.get("document_info"))
            .filter(|info| info.is_object())
            .cloned()
            .unwrap_or_else(|| {
                json!({
                    "title": format!("Sample {}", capitalize(kind.as_str())),
                    "subject": profile.name,
                    total_key.clone(): config.expected_total,
                    "document_type": kind.as_str(),
                })
            });
        let total = document_info
            .get(&total_key)
            .and_then(value_as_count)
            .filter(|total| *total > 0)
            .unwrap_or(config.expected_total);

        let batches = config.batches(total);
        tracing::info!(
            subject = profile.key,
            kind = kind.as_str(),
            total,
            batches = batches.len(),
            "Extracting in batches"
        );

        let mut items = Vec::new();
        let mut last_error = None;
        for batch in batches {
            let prompt = batch_prompt(profile, &config, batch);
            let text = match self.client.generate(pdf, &prompt).await {
                Ok(text) => text,
                Err(error) => {
                    tracing::error!(
                        batch = batch.number,
                        error = %error,
                        "Batch generation failed"
                    );
                    last_error = Some(error);
                    continue;
                }
            };
            match clean_json_response(&text)
                .as_mut()
                .and_then(|value| value.get_mut(kind.as_str()))
                .map(Value::take)
            {
                Some(Value::Array(batch_items)) => {
                    tracing::debug!(
                        batch = batch.number,
                        count = batch_items.len(),
                        "Batch extracted"
                    );
                    items.extend(batch_items);
                }
                _ => tracing::error!(batch = batch.number, "Batch response could not be parsed"),
            }
        }

        if items.is_empty()
            && let Some(error) = last_error
        {
            return Err(error);
        }
        if items.len() < total {
            tracing::warn!(
                expected = total,
                extracted = items.len(),
                kind = kind.as_str(),
                "Fewer items than expected"
            );
        }

        Ok(ExtractionOutput {
            kind,
            document_info,
            items,
        })
    }
}

fn value_as_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => number.as_u64().map(|count| count as usize),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extraction::subjects::subject_profile;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted model: answers overview prompts with `overview` and batch prompts by echoing
    /// the requested range.
    pub(crate) struct ScriptedModel {
        pub(crate) overview: Option<String>,
        pub(crate) fail_batches: bool,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(overview: Option<&str>) -> Self {
            Self {
                overview: overview.map(str::to_string),
                fail_batches: false,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerativeClient for ScriptedModel {
        async fn generate(&self, _pdf: &[u8], prompt: &str) -> Result<String, GenerativeError> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            if prompt.starts_with("Analyze this PDF") {
                return self.overview.clone().ok_or(GenerativeError::EmptyResponse);
            }
            if self.fail_batches {
                return Err(GenerativeError::EmptyResponse);
            }

            let plural = if prompt.contains("Extract answers") {
                "answers"
            } else {
                "questions"
            };
            let item = &plural[..plural.len() - 1];
            let range = prompt
                .lines()
                .find_map(|line| {
                    line.strip_prefix(&format!(
                        "Begin extraction now. Start response with {{ and end with }}. \
                         Extract {plural} "
                    ))
                })
                .and_then(|rest| rest.strip_suffix(" ONLY."))
                .expect("range line");
            let (start, end) = range.split_once('-').expect("range");
            let (start, end): (usize, usize) =
                (start.parse().expect("start"), end.parse().expect("end"));
            let items: Vec<Value> = (start..=end)
                .map(|n| {
                    json!({
                        format!("{item}_number"): n.to_string(),
                        format!("{item}_text"): format!("text {n}"),
                    })
                })
                .collect();
            Ok(format!("```json\n{}\n```", json!({ plural: items })))
        }
    }

    #[tokio::test]
    async fn batches_follow_overview_total() {
        let model = ScriptedModel::new(Some(
            r#"{"document_info": {"title": "SQP 1", "total_questions": 10}}"#,
        ));
        let profile = subject_profile("computer_applications");
        let output = BookExtractor::new(&model)
            .extract(b"%PDF", profile, ExtractionKind::Questions)
            .await
            .expect("extract");

        assert_eq!(output.items.len(), 10);
        assert_eq!(output.items[9]["question_number"], "10");
        assert_eq!(output.document_info["title"], "SQP 1");
        // overview + batches of 8
        assert_eq!(model.prompts.lock().expect("lock").len(), 3);
        let json = output.to_json();
        assert_eq!(json["questions"].as_array().map(Vec::len), Some(10));
    }

    #[tokio::test]
    async fn missing_overview_uses_expected_total() {
        let model = ScriptedModel::new(None);
        let profile = subject_profile("mathematics");
        let output = BookExtractor::new(&model)
            .extract(b"%PDF", profile, ExtractionKind::Answers)
            .await
            .expect("extract");

        assert_eq!(output.items.len(), 30);
        assert_eq!(output.document_info["total_answers"], 30);
        assert_eq!(output.document_info["subject"], "Mathematics");
    }

    #[tokio::test]
    async fn failing_batches_surface_error_when_nothing_extracted() {
        let mut model = ScriptedModel::new(Some(r#"{"document_info": {"total_questions": "4"}}"#));
        model.fail_batches = true;
        let profile = subject_profile("computer_applications");
        let error = BookExtractor::new(&model)
            .extract(b"%PDF", profile, ExtractionKind::Questions)
            .await
            .expect_err("no items");
        assert!(matches!(error, GenerativeError::EmptyResponse));
    }
}
