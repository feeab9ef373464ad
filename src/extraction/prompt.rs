//! Prompt text sent to the generative model.

use super::config::{BatchRange, ExtractionConfig, ExtractionKind};
use super::subjects::SubjectProfile;
use std::fmt::Write;

const COMMON_RULES: &[&str] = &[
    "Read the document line by line, word by word.",
    "Copy EVERYTHING exactly as written; do not paraphrase or summarize.",
    "Maintain exact formatting, punctuation, spacing, and capitalization.",
    "Copy any sub-parts (i), (ii), (iii) and \"OR\" alternatives exactly as formatted.",
    "Include marks allocation, section names, and time limits exactly as written.",
];

/// Prompt asking for document info and the total item count.
pub fn overview_prompt(profile: &SubjectProfile, config: &ExtractionConfig) -> String {
    let (document, counted) = match config.kind {
        ExtractionKind::Questions => ("question paper", "questions"),
        ExtractionKind::Answers => ("answer key", "answers/solutions"),
    };
    let item = config.kind.item_name();

    format!(
        "Analyze this PDF {document} and provide:\n\
1. Document title and subject information\n\
2. Total number of {counted}\n\
3. Section breakdown ({subject} if applicable)\n\
4. {item_title} number ranges for each section\n\
\n\
This is a {audience} {document}. Count all {counted} carefully.\n\
\n\
Return JSON only:\n\
{{\n  \"document_info\": {{\n    \"title\": \"document title\",\n    \"subject\": \"subject name\",\n    \"class\": \"class level\",\n    \"{total_key}\": {expected},\n    \"document_type\": \"{kind}\"\n  }},\n  \"sections\": [\n    {{\"name\": \"section_name\", \"start\": 1, \"end\": 16}}\n  ]\n}}\n",
        subject = profile.name,
        audience = profile.audience,
        item_title = capitalize(item),
        total_key = config.kind.total_key(),
        expected = config.expected_total,
        kind = config.kind.as_str(),
    )
}

/// Prompt asking for the items of one batch.
pub fn batch_prompt(
    profile: &SubjectProfile,
    config: &ExtractionConfig,
    batch: BatchRange,
) -> String {
    let item = config.kind.item_name();
    let plural = config.kind.as_str();
    let (start, end) = (batch.start, batch.end);
    let document = match config.kind {
        ExtractionKind::Questions => "question paper",
        ExtractionKind::Answers => "answer key or solution document",
    };

    let mut prompt = format!(
        "You are a precision document extraction specialist. Extract {plural} {start} to {end} from this PDF document with ABSOLUTE ACCURACY.\n\n\
This is a {audience} {document}.\n\n\
EXTRACTION RULES ({subject}):\n",
        audience = profile.audience,
        subject = profile.name.to_uppercase(),
    );
    let rules = COMMON_RULES.iter().chain(profile.rules(config.kind));
    for (index, rule) in rules.enumerate() {
        let _ = writeln!(prompt, "{}. {rule}", index + 1);
    }

    let _ = write!(
        prompt,
        "\nMANDATORY REQUIREMENTS:\n\
1. Focus EXCLUSIVELY on {plural} {start} through {end}; ignore all others\n\
2. Include ALL content for each {item}, with no truncation\n\
3. For multi-part {plural}: include ALL parts (a), (b), (c), etc.\n\
4. Copy tables cell by cell if present\n\
5. Return ONLY valid JSON, with no explanations, notes, or markdown\n\
\nFor each {item}, provide:\n"
    );
    for (name, description) in &config.fields {
        let _ = writeln!(prompt, "- {name}: {description}");
    }

    let _ = write!(
        prompt,
        "\nRETURN ONLY THIS JSON STRUCTURE:\n\n{schema}\n\n\
Begin extraction now. Start response with {{ and end with }}. Extract {plural} {start}-{end} ONLY.\n",
        schema = config.json_schema(batch),
    );
    prompt
}

pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::subjects::subject_profile;

    #[test]
    fn batch_prompt_names_range_rules_and_schema() {
        let profile = subject_profile("mathematics");
        let config = profile.config(ExtractionKind::Questions);
        let prompt = batch_prompt(profile, &config, BatchRange { number: 2, start: 11, end: 20 });
        assert!(prompt.contains("Extract questions 11 to 20"));
        assert!(prompt.contains("EXTRACTION RULES (MATHEMATICS)"));
        assert!(prompt.contains("6. Include ALL mathematical expressions"));
        assert!(prompt.contains("- question_text: "));
        assert!(prompt.contains("\"start_question\": 11"));
        assert!(prompt.trim_end().ends_with("Extract questions 11-20 ONLY."));
    }

    #[test]
    fn overview_prompt_requests_total_key() {
        let profile = subject_profile("computer_applications");
        let config = profile.config(ExtractionKind::Answers);
        let prompt = overview_prompt(profile, &config);
        assert!(prompt.contains("\"total_answers\": 39"));
        assert!(prompt.contains("Answer number ranges"));
        assert!(prompt.contains("answer key"));
    }
}
