//! Turn a marker label into a tag, an output file, and a boundary kind.

use super::patterns::MarkerFamily;
use super::result::{ANSWER_KEYS_FOLDER, BoundaryKind, QUESTION_PAPERS_FOLDER};
use regex::Regex;
use std::sync::LazyLock;

/// Leading status word of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerTag {
    /// Paper printed together with worked answers.
    Solved,
    /// Paper without answers.
    Unsolved,
    /// Answer section for a paper.
    Solutions,
    /// No recognized tag.
    None,
}

impl MarkerTag {
    /// Parse the tag from the first word of a label.
    pub fn from_label(label: &str) -> Self {
        match label
            .split_whitespace()
            .next()
            .map(str::to_uppercase)
            .as_deref()
        {
            Some("SOLVED") => Self::Solved,
            Some("UNSOLVED") => Self::Unsolved,
            Some("SOLUTIONS") => Self::Solutions,
            _ => Self::None,
        }
    }

    /// Serialized form stored in the analysis JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solved => "SOLVED",
            Self::Unsolved => "UNSOLVED",
            Self::Solutions => "SOLUTIONS",
            Self::None => "NA",
        }
    }
}

/// File the splitter writes a boundary to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// File name, e.g. `SQP-3.pdf`.
    pub filename: String,
    /// Folder, `question_papers` or `answer_keys`.
    pub folder: &'static str,
}

impl OutputTarget {
    fn question_paper(filename: String) -> Self {
        Self {
            filename,
            folder: QUESTION_PAPERS_FOLDER,
        }
    }

    fn answer_key(filename: String) -> Self {
        Self {
            filename,
            folder: ANSWER_KEYS_FOLDER,
        }
    }
}

static SELF_ASSESSMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Self\s+Assessment\s+Paper[- ]?(\d+)|\bSAP\s*-\s*(\d+)")
        .expect("self assessment regex")
});
static PRACTICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Practice\s+Paper[- ]?(\d+)|\bPP\s*-\s*(\d+)").expect("practice regex")
});
static QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Question\s+Paper\s*[- ]?\s*(\d+)|\bSQP\s*-\s*(\d+)").expect("question regex")
});
static ANSWER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:Answers?|Answer\s+Key|Solutions?)\b").expect("answer prefix regex")
});

fn paper_number(regex: &Regex, label: &str) -> Option<String> {
    let captures = regex.captures(label)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|number| number.as_str().to_string())
}

/// Whether the label opens with an answers/solutions heading.
pub fn is_answer_heading(label: &str) -> bool {
    ANSWER_PREFIX.is_match(label.trim_start())
}

/// Derive the output file for a label.
///
/// Only unsolved self assessment and practice papers are written out; question papers are
/// written for every tag, with `SOLUTIONS` going to the answer keys folder. A bare answers
/// heading that names a paper is treated like a `SOLUTIONS` tag.
pub fn output_target(label: &str, tag: MarkerTag) -> Option<OutputTarget> {
    if tag == MarkerTag::Unsolved {
        if let Some(number) = paper_number(&SELF_ASSESSMENT, label) {
            return Some(OutputTarget::question_paper(format!("SAP-{number}.pdf")));
        }
        if let Some(number) = paper_number(&PRACTICE, label) {
            return Some(OutputTarget::question_paper(format!("PP-{number}.pdf")));
        }
    }

    let number = paper_number(&QUESTION, label)?;
    match tag {
        MarkerTag::Solved | MarkerTag::Unsolved => {
            Some(OutputTarget::question_paper(format!("SQP-{number}.pdf")))
        }
        MarkerTag::Solutions => Some(OutputTarget::answer_key(format!(
            "SQP-{number}-SOLUTION.pdf"
        ))),
        MarkerTag::None if is_answer_heading(label) => Some(OutputTarget::answer_key(format!(
            "SQP-{number}-SOLUTION.pdf"
        ))),
        MarkerTag::None => None,
    }
}

/// Decide the boundary kind from the derived target, the tag, and the marker family.
pub fn classify_kind(
    label: &str,
    tag: MarkerTag,
    family: MarkerFamily,
    target: Option<&OutputTarget>,
) -> BoundaryKind {
    if let Some(target) = target {
        return BoundaryKind::from_folder(target.folder);
    }
    if tag == MarkerTag::Solutions || is_answer_heading(label) {
        return BoundaryKind::AnswerKey;
    }
    if family.is_paper() {
        return BoundaryKind::QuestionPaper;
    }
    BoundaryKind::Unknown
}
