//! Subject profiles: per-subject extraction fields, batch sizes, and prompt rules.

use super::config::{ExtractionConfig, ExtractionKind};

/// Subject used when a request names an unknown subject.
pub const DEFAULT_SUBJECT: &str = "computer_applications";

/// Prompt and field settings for one school subject.
#[derive(Debug)]
pub struct SubjectProfile {
    /// Canonical key.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Additional accepted keys.
    pub aliases: &'static [&'static str],
    /// How prompts describe the source (`CBSE Class 10 Computer Applications`).
    pub audience: &'static str,
    /// Items per model call.
    pub batch_size: usize,
    /// Items assumed when the overview gives no count.
    pub expected_total: usize,
    /// Subject rules appended to the common question rules.
    pub question_rules: &'static [&'static str],
    /// Subject rules appended to the common answer rules.
    pub answer_rules: &'static [&'static str],
    question_fields: &'static [(&'static str, &'static str)],
    answer_fields: &'static [(&'static str, &'static str)],
}

impl SubjectProfile {
    /// Extraction settings for `kind`.
    pub fn config(&self, kind: ExtractionKind) -> ExtractionConfig {
        let fields = match kind {
            ExtractionKind::Questions => self.question_fields,
            ExtractionKind::Answers => self.answer_fields,
        };
        ExtractionConfig {
            kind,
            batch_size: self.batch_size,
            expected_total: self.expected_total,
            fields: fields.to_vec(),
        }
    }

    /// Subject-specific rules for `kind`.
    pub fn rules(&self, kind: ExtractionKind) -> &'static [&'static str] {
        match kind {
            ExtractionKind::Questions => self.question_rules,
            ExtractionKind::Answers => self.answer_rules,
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.key == key || self.aliases.contains(&key)
    }
}

const NUMBER_Q: (&str, &str) = (
    "question_number",
    "exact question number as it appears in the document",
);
const NUMBER_A: (&str, &str) = (
    "answer_number",
    "exact answer number as it appears in the document",
);
const MARKS_Q: (&str, &str) = (
    "marks",
    "exact marks notation as written in the document including brackets, time allocations, or any other details",
);
const MARKS_A: (&str, &str) = (
    "marks",
    "exact marks notation as written in the document including distribution, partial marks, or any other details",
);

static PROFILES: &[SubjectProfile] = &[
    SubjectProfile {
        key: "computer_applications",
        name: "Computer Applications",
        aliases: &["computer_application"],
        audience: "CBSE Class 10 Computer Applications",
        batch_size: 8,
        expected_total: 39,
        question_rules: &[
            "Include ALL multiple choice options exactly: (a), (b), (c), (d).",
            "Copy any code snippets, HTML tags, Python code, or pseudo-code exactly as shown.",
            "For diagrams, tables, or screenshots: provide a detailed technical description, including all labels, captions, and text.",
            "For assertion-reason type questions, copy both assertion and reason statements word-for-word.",
        ],
        answer_rules: &[
            "Include the correct answer option AND the complete explanation, reasoning, formulas, and any additional notes.",
            "Copy any step-by-step solutions, code snippets, HTML tags, Python code, or pseudo-code exactly as formatted.",
            "For diagrams, tables, or screenshots: provide a detailed technical description, including all labels, captions, and text.",
        ],
        question_fields: &[
            NUMBER_Q,
            (
                "question_text",
                "complete question text copied word-for-word including all multiple choice options (a), (b), (c), (d) if present, maintaining exact formatting and punctuation",
            ),
            (
                "diagram_explain",
                "technical word-for-word description of any diagrams, tables, charts, or visual elements including all labels and text, or null if none present",
            ),
            (
                "section",
                "exact section name as written in the document (Computer Applications, etc.)",
            ),
            MARKS_Q,
        ],
        answer_fields: &[
            NUMBER_A,
            (
                "answer_text",
                "complete answer copied word-for-word including correct option, full explanation, reasoning, formulas, equations, and any additional notes exactly as written",
            ),
            (
                "diagram_explain",
                "technical word-for-word description of any diagrams, tables, charts, or visual elements including all labels and text, or null if none present",
            ),
            (
                "section",
                "exact section name as written in the document (Computer Applications, etc.)",
            ),
            MARKS_A,
        ],
    },
    SubjectProfile {
        key: "mathematics",
        name: "Mathematics",
        aliases: &["math", "maths"],
        audience: "Mathematics",
        batch_size: 10,
        expected_total: 30,
        question_rules: &[
            "Include ALL mathematical expressions, equations, and formulas exactly as shown.",
            "Copy any mathematical working, proofs, or step-by-step solutions exactly as shown.",
            "For diagrams, graphs, or figures: provide a detailed mathematical description, including all labels, axes, coordinates, and mathematical notation.",
            "For theorem-proof type questions, copy both theorem and proof statements word-for-word.",
        ],
        answer_rules: &[
            "Include the correct answer AND the complete step-by-step solution, mathematical working, formulas, and any additional notes.",
            "Copy any mathematical proofs, derivations, or step-by-step solutions exactly as formatted.",
            "For diagrams, graphs, or figures: provide a detailed mathematical description, including all labels, axes, coordinates, and mathematical notation.",
        ],
        question_fields: &[
            NUMBER_Q,
            (
                "question_text",
                "complete question text copied word-for-word including all mathematical expressions, equations, and diagrams exactly as written",
            ),
            (
                "diagram_explain",
                "detailed description of any mathematical diagrams, graphs, figures, or visual elements including all labels, axes, and mathematical notation",
            ),
            (
                "section",
                "exact section name as written in the document (Mathematics, etc.)",
            ),
            MARKS_Q,
        ],
        answer_fields: &[
            NUMBER_A,
            (
                "answer_text",
                "complete answer copied word-for-word including step-by-step solution, mathematical working, formulas, equations, and final answer exactly as written",
            ),
            (
                "diagram_explain",
                "detailed description of any mathematical diagrams, graphs, figures, or visual elements including all labels, axes, and mathematical notation",
            ),
            (
                "section",
                "exact section name as written in the document (Mathematics, etc.)",
            ),
            MARKS_A,
        ],
    },
    SubjectProfile {
        key: "political_science",
        name: "Political Science",
        aliases: &["polsci", "political_science_12"],
        audience: "CBSE Class 12 Political Science",
        batch_size: 6,
        expected_total: 30,
        question_rules: &[
            "Include ALL multiple choice options exactly: (a), (b), (c), (d).",
            "Copy all political terminology, constitutional provisions, and proper nouns exactly as shown.",
            "For diagrams, maps, charts, or organizational structures: provide detailed descriptions including all labels, captions, and political references.",
            "Verify all dates and historical references for accuracy.",
            "Check grammar and sentence structure, and flag any missing or incomplete words.",
        ],
        answer_rules: &[
            "Include the correct answer option AND the complete explanation, reasoning, political context, and any additional notes.",
            "Copy all political terminology, constitutional provisions, and proper nouns exactly as shown.",
            "Verify all dates and historical references for accuracy.",
        ],
        question_fields: &[
            NUMBER_Q,
            (
                "question_text",
                "complete question text copied word-for-word with quality control verification for spelling mistakes, grammar errors, missing words, and punctuation accuracy",
            ),
            (
                "diagram_explain",
                "detailed description of any political maps, charts, constitutional diagrams, organizational structures, or visual elements, or null if none present",
            ),
            (
                "section",
                "exact section name as written in the document (Political Science, Part A, Part B, etc.)",
            ),
            MARKS_Q,
            (
                "date_accuracy",
                "verification of all historical dates, years, constitutional amendments, and political events mentioned",
            ),
            (
                "quality_check",
                "quality control assessment for spelling mistakes, grammar errors, missing words, punctuation issues, and factual accuracy",
            ),
        ],
        answer_fields: &[
            NUMBER_A,
            (
                "answer_text",
                "complete answer copied word-for-word with quality control verification for spelling mistakes, grammar errors, missing words, and factual accuracy",
            ),
            (
                "diagram_explain",
                "detailed description of any political maps, charts, constitutional diagrams, organizational structures, or visual elements, or null if none present",
            ),
            (
                "section",
                "exact section name as written in the document (Political Science, Part A, Part B, etc.)",
            ),
            MARKS_A,
            (
                "date_accuracy",
                "verification of all historical dates, years, constitutional amendments, and political events mentioned",
            ),
            (
                "quality_check",
                "quality control assessment for spelling mistakes, grammar errors, missing words, punctuation issues, and factual accuracy",
            ),
        ],
    },
    SubjectProfile {
        key: "social_science",
        name: "Social Science",
        aliases: &["csbe_social_science", "cbse_social_science", "sst"],
        audience: "CBSE Social Science",
        batch_size: 8,
        expected_total: 35,
        question_rules: &[
            "Include ALL multiple choice options exactly: (a), (b), (c), (d).",
            "Copy any historical dates, geographical locations, and proper nouns exactly as shown.",
            "For maps, charts, graphs, or timelines: provide a detailed description, including all labels, captions, and geographical/historical references.",
            "For assertion-reason type questions, copy both assertion and reason statements word-for-word.",
        ],
        answer_rules: &[
            "Include the correct answer option AND the complete explanation, reasoning, historical/geographical context, and any additional notes.",
            "Include historical dates, geographical locations, and proper nouns exactly as shown.",
            "For maps, charts, graphs, or timelines: provide a detailed description, including all labels, captions, and geographical/historical references.",
        ],
        question_fields: &[
            NUMBER_Q,
            (
                "question_text",
                "complete question text copied word-for-word including all multiple choice options (a), (b), (c), (d) if present, maintaining exact formatting and punctuation",
            ),
            (
                "diagram_explain",
                "detailed description of any maps, charts, graphs, timelines, or visual elements including all labels, captions, and geographical/historical references, or null if none present",
            ),
            (
                "section",
                "exact section name as written in the document (Social Science, History, Geography, Civics, Economics, etc.)",
            ),
            MARKS_Q,
        ],
        answer_fields: &[
            NUMBER_A,
            (
                "answer_text",
                "complete answer copied word-for-word including correct option, full explanation, reasoning, historical/geographical context, and any additional notes exactly as written",
            ),
            (
                "diagram_explain",
                "detailed description of any maps, charts, graphs, timelines, or visual elements including all labels, captions, and geographical/historical references, or null if none present",
            ),
            (
                "section",
                "exact section name as written in the document (Social Science, History, Geography, Civics, Economics, etc.)",
            ),
            MARKS_A,
        ],
    },
];

/// Profile for `subject` (case-insensitive, spaces and dashes treated as `_`), falling back to
/// the default subject.
pub fn subject_profile(subject: &str) -> &'static SubjectProfile {
    let key = normalize_subject(subject);
    PROFILES
        .iter()
        .find(|profile| profile.matches(&key))
        .unwrap_or_else(|| {
            tracing::warn!(subject, fallback = DEFAULT_SUBJECT, "Unknown subject; using default");
            default_profile()
        })
}

/// Every accepted subject key, canonical keys first.
pub fn available_subjects() -> Vec<&'static str> {
    PROFILES
        .iter()
        .map(|profile| profile.key)
        .chain(PROFILES.iter().flat_map(|profile| profile.aliases.iter().copied()))
        .collect()
}

fn default_profile() -> &'static SubjectProfile {
    &PROFILES[0]
}

fn normalize_subject(subject: &str) -> String {
    subject
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_profiles() {
        assert_eq!(subject_profile("Maths").key, "mathematics");
        assert_eq!(subject_profile("computer application").key, "computer_applications");
        assert_eq!(subject_profile("Political-Science").key, "political_science");
        assert_eq!(subject_profile("csbe_social_science").name, "Social Science");
    }

    #[test]
    fn unknown_subject_falls_back_to_default() {
        assert_eq!(subject_profile("astronomy").key, DEFAULT_SUBJECT);
        assert_eq!(subject_profile("").key, DEFAULT_SUBJECT);
    }

    #[test]
    fn configs_carry_subject_batching() {
        let config = subject_profile("political_science").config(ExtractionKind::Answers);
        assert_eq!(config.batch_size, 6);
        assert_eq!(config.fields[0].0, "answer_number");
        assert!(config.fields.iter().any(|(name, _)| *name == "quality_check"));
    }

    #[test]
    fn subject_list_includes_aliases() {
        let subjects = available_subjects();
        assert_eq!(subjects[0], DEFAULT_SUBJECT);
        assert!(subjects.contains(&"maths"));
        assert!(subjects.contains(&"social_science"));
    }
}
