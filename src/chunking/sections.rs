//! Markdown section and paragraph splitting.

use super::tokens::TokenCounter;
use regex::Regex;
use semchunk_rs::Chunker;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("header regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("paragraph regex"));

/// A run of markdown opened by a heading (or the preamble before the first heading).
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Heading text, empty for the preamble.
    pub title: String,
    /// Heading depth (`#` count), 0 for the preamble.
    pub level: usize,
    /// Section body including its heading line.
    pub content: String,
    /// Byte offset of the section in the source markdown.
    pub offset: usize,
}

/// A paragraph slice with its position in the source markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// Trimmed paragraph text.
    pub text: String,
    /// Byte offset of `text` in the source markdown.
    pub offset: usize,
}

impl Paragraph {
    /// Byte offset one past the paragraph.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Split markdown at ATX headings. Sections without content are dropped.
pub fn parse_sections(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        title: String::new(),
        level: 0,
        content: String::new(),
        offset: 0,
    };
    let mut offset = 0;

    for line in markdown.split_inclusive('\n') {
        if let Some(captures) = HEADER.captures(line.trim()) {
            if !current.content.trim().is_empty() {
                sections.push(current);
            }
            current = Section {
                title: captures[2].trim().to_string(),
                level: captures[1].len(),
                content: String::new(),
                offset,
            };
        }
        current.content.push_str(line);
        offset += line.len();
    }

    if !current.content.trim().is_empty() {
        sections.push(current);
    }
    sections
}

/// Split a section into paragraphs; paragraphs over `max_tokens` are cut further with
/// `semchunk`.
pub fn split_paragraphs(
    section: &Section,
    max_tokens: usize,
    token_counter: &TokenCounter,
) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let content = section.content.as_str();
    let breaks = PARAGRAPH_BREAK
        .find_iter(content)
        .map(|found| (found.start(), found.end()))
        .chain(std::iter::once((content.len(), content.len())));

    for (break_start, break_end) in breaks {
        let raw = &content[start..break_start];
        let leading = raw.len() - raw.trim_start().len();
        let text = raw.trim();
        if !text.is_empty() {
            let offset = section.offset + start + leading;
            if token_counter.as_ref()(text) > max_tokens {
                paragraphs.extend(split_oversized(text, offset, max_tokens, token_counter));
            } else {
                paragraphs.push(Paragraph {
                    text: text.to_string(),
                    offset,
                });
            }
        }
        start = break_end;
    }

    paragraphs
}

fn split_oversized(
    text: &str,
    offset: usize,
    max_tokens: usize,
    token_counter: &TokenCounter,
) -> Vec<Paragraph> {
    let counter = token_counter.clone();
    let chunker = Chunker::new(
        max_tokens,
        Box::new(move |segment: &str| counter.as_ref()(segment)),
    );

    let mut cursor = 0;
    chunker
        .chunk(text)
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| {
            let piece = piece.trim().to_string();
            let found = text[cursor..].find(&piece).map(|at| cursor + at);
            let local = found.unwrap_or(cursor);
            if found.is_some() {
                cursor = local + piece.len();
            }
            Paragraph {
                text: piece,
                offset: offset + local,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::tokens::whitespace_counter;

    const MARKDOWN: &str = "# Physics\n\n_page_1_\n\nIntro line.\n\n## Chapter 1 Motion\n\nSpeed is distance over time.\n\nVelocity has direction.\n";

    #[test]
    fn sections_split_at_headings() {
        let sections = parse_sections(MARKDOWN);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Physics");
        assert_eq!(sections[0].level, 1);
        assert_eq!(sections[1].title, "Chapter 1 Motion");
        assert_eq!(sections[1].level, 2);
        assert!(sections[1].content.starts_with("## Chapter 1 Motion"));
        assert_eq!(
            &MARKDOWN[sections[1].offset..sections[1].offset + 2],
            "##"
        );
    }

    #[test]
    fn preamble_without_heading_is_kept() {
        let sections = parse_sections("plain text\n\n# Heading\nbody\n");
        assert_eq!(sections[0].title, "");
        assert_eq!(sections[0].level, 0);
        assert_eq!(sections[1].title, "Heading");
    }

    #[test]
    fn paragraphs_track_source_offsets() {
        let sections = parse_sections(MARKDOWN);
        let counter = whitespace_counter();
        let paragraphs = split_paragraphs(&sections[1], 100, &counter);
        let texts: Vec<_> = paragraphs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "## Chapter 1 Motion",
                "Speed is distance over time.",
                "Velocity has direction."
            ]
        );
        for paragraph in &paragraphs {
            assert_eq!(&MARKDOWN[paragraph.offset..paragraph.end()], paragraph.text);
        }
    }

    #[test]
    fn oversized_paragraphs_are_split_within_budget() {
        let long = (1..=30)
            .map(|n| format!("word{n}"))
            .collect::<Vec<_>>()
            .join(" ");
        let section = Section {
            title: String::new(),
            level: 0,
            content: long.clone(),
            offset: 0,
        };
        let counter = whitespace_counter();
        let paragraphs = split_paragraphs(&section, 8, &counter);
        assert!(paragraphs.len() >= 4);
        for paragraph in &paragraphs {
            assert!(counter.as_ref()(&paragraph.text) <= 8);
        }
        let rejoined: Vec<&str> = paragraphs
            .iter()
            .flat_map(|p| p.text.split_whitespace())
            .collect();
        assert_eq!(rejoined, long.split_whitespace().collect::<Vec<_>>());
    }
}
