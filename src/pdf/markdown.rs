//! Render extracted page text as markdown for the chunker.
//!
//! Each page opens with a `_page_N_` anchor so chunk metadata can recover page numbers, and
//! lines that read as section markers become `##` headings so the chunker can split on them.

use super::reader::DocumentText;
use crate::analysis::is_marker_line;

/// Render pages `start..=end` (1-based, clamped to the document) as markdown.
pub fn pages_to_markdown(text: &DocumentText, start: u32, end: u32) -> String {
    let end = end.min(text.page_count());
    let mut markdown = format!("# {}\n\n", text.book_title());

    for page in start.max(1)..=end {
        let Some(body) = text.pages.get(page as usize - 1) else {
            continue;
        };
        markdown.push_str(&format!("_page_{page}_\n\n"));

        let mut blank_run = false;
        for line in body.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if !blank_run {
                    markdown.push('\n');
                }
                blank_run = true;
                continue;
            }
            blank_run = false;
            if is_marker_line(trimmed) {
                markdown.push_str(&format!("\n## {trimmed}\n\n"));
            } else {
                markdown.push_str(trimmed);
                markdown.push('\n');
            }
        }
        markdown.push('\n');
    }

    markdown
}

/// Render the whole document.
pub fn document_to_markdown(text: &DocumentText) -> String {
    pages_to_markdown(text, 1, text.page_count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocumentText {
        DocumentText {
            metadata_title: Some("Computer Applications".into()),
            pages: vec![
                "Preface\nThis book covers Java.".into(),
                "UNSOLVED SQP-1\nSection A\nQ1. Define a class.".into(),
                "Q2. What is a loop?".into(),
            ],
        }
    }

    #[test]
    fn anchors_pages_and_promotes_markers() {
        let markdown = document_to_markdown(&sample());
        assert!(markdown.starts_with("# Computer Applications\n"));
        assert!(markdown.contains("_page_1_"));
        assert!(markdown.contains("_page_3_"));
        assert!(markdown.contains("\n## UNSOLVED SQP-1\n"));
        assert!(markdown.contains("Q1. Define a class.\n"));
    }

    #[test]
    fn page_window_is_clamped() {
        let markdown = pages_to_markdown(&sample(), 2, 10);
        assert!(!markdown.contains("_page_1_"));
        assert!(markdown.contains("_page_2_"));
        assert!(markdown.contains("_page_3_"));
    }
}
