//! Confidence scoring for boundaries and whole documents.

use super::patterns::MarkerFamily;

/// Document confidence when no marker was found.
pub const NOT_FOUND_CONFIDENCE: f32 = 0.30;

const FOUND_BASE: f32 = 0.70;
const DENSITY_BONUS: f32 = 0.10;
const PAPER_LABEL_BONUS: f32 = 0.05;
const DOCUMENT_CAP: f32 = 0.95;
const TAG_BONUS: f32 = 0.05;
const FILENAME_BONUS: f32 = 0.05;

/// Score one boundary from its pattern family, tag, and derived file name.
pub fn boundary_confidence(family: MarkerFamily, has_tag: bool, has_filename: bool) -> f32 {
    let mut score = family.base_confidence();
    if has_tag {
        score += TAG_BONUS;
    }
    if has_filename {
        score += FILENAME_BONUS;
    }
    score.clamp(0.0, 1.0)
}

/// Score a document from the labels of its markers.
pub fn document_confidence<'a, I>(labels: I, total_pages: u32) -> f32
where
    I: IntoIterator<Item = &'a str>,
{
    let labels: Vec<&str> = labels.into_iter().collect();
    if labels.is_empty() {
        return NOT_FOUND_CONFIDENCE;
    }

    let mut score = FOUND_BASE;
    if total_pages > 0 && labels.len() as f32 / total_pages as f32 > 0.1 {
        score += DENSITY_BONUS;
    }
    let names_paper = labels.iter().any(|label| {
        let label = label.to_uppercase();
        ["SAP", "SQP", "PP", "PRACTICE", "QUESTION"]
            .iter()
            .any(|needle| label.contains(needle))
    });
    if names_paper {
        score += PAPER_LABEL_BONUS;
    }
    score.min(DOCUMENT_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn empty_document_scores_not_found() {
        assert!(close(document_confidence(Vec::<&str>::new(), 20), NOT_FOUND_CONFIDENCE));
    }

    #[test]
    fn document_score_adds_density_and_paper_bonuses() {
        let labels = ["UNSOLVED SQP-1", "UNSOLVED SQP-2", "SOLUTIONS SQP-1"];
        assert!(close(document_confidence(labels, 20), 0.85));
        assert!(close(document_confidence(["Chapter 1"], 5), 0.80));
        assert!(close(document_confidence(["Chapter 1"], 100), 0.70));
    }

    #[test]
    fn paper_label_bonus_ignores_case() {
        let lower = document_confidence(["unsolved sqp-1"], 20);
        let upper = document_confidence(["UNSOLVED SQP-1"], 20);
        assert!(close(lower, 0.75));
        assert!(close(lower, upper));
        assert!(close(document_confidence(["practice paper-2"], 20), 0.75));
    }

    #[test]
    fn boundary_bonuses_are_clamped() {
        assert!(close(
            boundary_confidence(MarkerFamily::TaggedSelfAssessment, true, true),
            1.0
        ));
        assert!(close(
            boundary_confidence(MarkerFamily::GenericSection, false, false),
            0.6
        ));
        assert!(close(boundary_confidence(MarkerFamily::Tips, true, false), 0.45));
    }
}
