//! Section marker patterns recognized in page headers.

use regex::Regex;
use std::sync::LazyLock;

/// Family of a marker pattern; drives the base confidence and the kind fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerFamily {
    /// `SOLVED|UNSOLVED|SOLUTIONS Self Assessment Paper-N`
    TaggedSelfAssessment,
    /// `Self Assessment Paper-N`
    SelfAssessment,
    /// `Sample Question Paper-N`, optionally tagged
    SampleQuestion,
    /// `Practice|Mock|Test|Question Paper-N`
    PracticePaper,
    /// `SQP-N`, `SAP-N`, `PP-N`
    Abbreviation,
    /// `Answers`, `Solutions`, `Answer Key`, optionally naming a paper
    AnswerHeading,
    /// `Mind Map-N`, `Mind map`
    MindMap,
    /// `On tips`
    Tips,
    /// `Chapter N`, `Unit N`, `Part N`
    GenericSection,
}

impl MarkerFamily {
    /// Base confidence assigned before tag and file-name adjustments.
    pub fn base_confidence(self) -> f32 {
        match self {
            Self::TaggedSelfAssessment => 0.9,
            Self::SampleQuestion => 0.85,
            Self::SelfAssessment | Self::PracticePaper | Self::Abbreviation => 0.8,
            Self::AnswerHeading => 0.75,
            Self::GenericSection => 0.6,
            Self::MindMap => 0.5,
            Self::Tips => 0.4,
        }
    }

    /// Whether markers of this family always introduce a question paper.
    pub fn is_paper(self) -> bool {
        matches!(
            self,
            Self::TaggedSelfAssessment
                | Self::SelfAssessment
                | Self::SampleQuestion
                | Self::PracticePaper
                | Self::Abbreviation
        )
    }
}

/// Ordered marker table. On equal match length the earlier entry wins.
static MARKERS: LazyLock<Vec<(Regex, MarkerFamily)>> = LazyLock::new(|| {
    [
        (
            r"(?im)^(SOLVED|UNSOLVED|SOLUTIONS)\s+Self\s+Assessment\s+Paper-\d+",
            MarkerFamily::TaggedSelfAssessment,
        ),
        (
            r"(?im)^Self\s+Assessment\s+Paper-\d+",
            MarkerFamily::SelfAssessment,
        ),
        (
            r"(?im)^(SOLVED|UNSOLVED|SOLUTIONS)?\s*Sample\s+Question\s+(?:SOLVED\s+)?Paper-\d+",
            MarkerFamily::SampleQuestion,
        ),
        (
            r"(?im)^(SOLVED|UNSOLVED|SOLUTIONS)?\s*(Practice|Mock|Test|Question)\s+(Paper|Test)?-\d+",
            MarkerFamily::PracticePaper,
        ),
        (
            r"(?im)^(SOLVED|UNSOLVED|SOLUTIONS)?\s*SQP\s*-\s*\d+",
            MarkerFamily::Abbreviation,
        ),
        (
            r"(?im)^(SOLVED|UNSOLVED|SOLUTIONS)?\s*SAP\s*-\s*\d+",
            MarkerFamily::Abbreviation,
        ),
        (
            r"(?im)^(SOLVED|UNSOLVED|SOLUTIONS)?\s*PP\s*-\s*\d+",
            MarkerFamily::Abbreviation,
        ),
        (
            r"(?im)^(?:Answers?|Answer\s+Key|Solutions?)(?:\s+(?:to|for|of))?(?:\s*[:\-]\s*|[ \t]+)?(?:(?:SQP|SAP|PP)\s*-\s*\d+|(?:Sample\s+)?Question\s+Paper\s*-?\s*\d+)?[ \t]*$",
            MarkerFamily::AnswerHeading,
        ),
        (r"(?im)^Mind\s+Map\s*-\s*\d+", MarkerFamily::MindMap),
        (r"(?im)^Mind\s+map", MarkerFamily::MindMap),
        (r"(?im)^On\s+tips", MarkerFamily::Tips),
        (
            r"(?im)^[ \t]*(SOLVED|UNSOLVED|SOLUTIONS)?\s*(chapter|unit|part)\s*\d+\s*[:.\-]?[ \t]*.*",
            MarkerFamily::GenericSection,
        ),
    ]
    .into_iter()
    .map(|(pattern, family)| {
        (
            Regex::new(pattern).expect("marker pattern must compile"),
            family,
        )
    })
    .collect()
});

/// A marker candidate found in header text.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerCandidate {
    /// Matched text with newlines flattened to spaces.
    pub label: String,
    /// Pattern family that produced the match.
    pub family: MarkerFamily,
}

/// Collect every marker match found in `text`.
pub fn find_candidates(text: &str) -> Vec<MarkerCandidate> {
    let mut candidates = Vec::new();
    for (regex, family) in MARKERS.iter() {
        for found in regex.find_iter(text) {
            let label = normalize_label(found.as_str());
            if label.is_empty() {
                continue;
            }
            candidates.push(MarkerCandidate {
                label,
                family: *family,
            });
        }
    }
    candidates
}

/// Pick the most specific (longest) marker in `text`.
pub fn best_candidate(text: &str) -> Option<MarkerCandidate> {
    let mut best: Option<MarkerCandidate> = None;
    for candidate in find_candidates(text) {
        let longer = best
            .as_ref()
            .map(|current| candidate.label.len() > current.label.len())
            .unwrap_or(true);
        if longer {
            best = Some(candidate);
        }
    }
    best
}

/// Whether a single line reads as a section marker.
pub fn is_marker_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && best_candidate(trimmed).is_some()
}

fn normalize_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
