//! Lightweight chunk metadata derived with regular expressions.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

const KEYWORD_LIMIT: usize = 10;

static PAGE_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_page_(\d+)_").expect("page anchor regex"));
static CHAPTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bchapter\s+(\d+)").expect("chapter regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s*(.+)$").expect("heading regex"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]*").expect("word regex"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(\s|$)").expect("sentence regex"));

static TECHNICAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b[A-Z]{2,}\b",
        r"\b[a-z]+[A-Z]\w*\b",
        r"\b[A-Za-z_]\w*\.[A-Za-z_]\w*\b",
        r"\b\w+\(\)",
        r"\b\w+\[\w+\]",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("technical term regex"))
    .collect()
});

static ELEMENTS: LazyLock<[(ElementKind, Regex); 4]> = LazyLock::new(|| {
    let build = |word: &str| {
        Regex::new(&format!(r"(?i)\b{word}\s+(\d+(?:\.\d+)?[a-z]?):?\s*([^.!?\n]*)"))
            .expect("element regex")
    };
    [
        (ElementKind::Figure, build("Figure")),
        (ElementKind::Table, build("Table")),
        (ElementKind::Example, build("Example")),
        (ElementKind::Exercise, build("Exercise")),
    ]
});

#[derive(Clone, Copy)]
enum ElementKind {
    Figure,
    Table,
    Example,
    Exercise,
}

impl ElementKind {
    fn label(self) -> &'static str {
        match self {
            Self::Figure => "Figure",
            Self::Table => "Table",
            Self::Example => "Example",
            Self::Exercise => "Exercise",
        }
    }
}

/// Content categories, checked in order; the first match wins.
const CONTENT_TYPES: &[(&str, &[&str])] = &[
    ("introduction", &["introduction", "overview", "basic", "fundamental"]),
    ("explanation", &["explanation", "description", "detail", "how it works"]),
    ("example", &["example", "for instance", "such as", "consider"]),
    ("exercise", &["exercise", "practice", "problem", "question"]),
    ("summary", &["summary", "conclusion", "recap"]),
    ("definition", &["definition", "refers to", "is defined", "means"]),
    ("procedure", &["step", "procedure", "process", "method"]),
];

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "him", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just", "may", "me",
    "more", "most", "must", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "out", "over", "own", "same", "shall", "she", "should", "so",
    "some", "such", "than", "that", "the", "their", "theirs", "them", "then", "there", "these",
    "they", "this", "those", "through", "to", "too", "under", "until", "up", "upon", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "would", "you", "your", "yours",
];

/// Metadata attached to every chunk payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkMetadata {
    /// Pages referenced by `_page_N_` anchors, in order of appearance.
    pub page_numbers: Vec<u32>,
    /// Chapter number, from the ingest request or a `Chapter N` mention.
    pub chapter_number: Option<u32>,
    /// First heading inside the chunk.
    pub section_title: Option<String>,
    /// `Figure N: caption` mentions.
    pub figures: Vec<String>,
    /// `Table N: caption` mentions.
    pub tables: Vec<String>,
    /// `Example N: ...` mentions.
    pub examples: Vec<String>,
    /// `Exercise N: ...` mentions.
    pub exercises: Vec<String>,
    /// Coarse content category (`general` when nothing matches).
    pub content_type: String,
    /// Acronyms, camelCase, dotted names, calls, and indexing expressions.
    pub technical_terms: Vec<String>,
    /// Most frequent non-stop-words.
    pub keywords: Vec<String>,
    /// Whitespace-separated words.
    pub word_count: usize,
    /// Sentences ending in `.`, `!` or `?`.
    pub sentence_count: usize,
    /// `0.4 * words per sentence + 0.6 * letters per word`; lower reads easier.
    pub readability_score: f32,
    /// Percentage of words longer than six letters.
    pub complexity_score: f32,
}

/// Derive metadata for one chunk of markdown.
pub fn extract_metadata(text: &str, chapter: Option<u32>) -> ChunkMetadata {
    let mut metadata = ChunkMetadata {
        page_numbers: page_numbers(text),
        chapter_number: chapter.or_else(|| {
            CHAPTER
                .captures(text)
                .and_then(|captures| captures[1].parse().ok())
        }),
        section_title: HEADING
            .captures(text)
            .map(|captures| captures[1].trim().to_string()),
        content_type: content_type(text).to_string(),
        technical_terms: technical_terms(text),
        keywords: keywords(text, KEYWORD_LIMIT),
        word_count: text.split_whitespace().count(),
        ..ChunkMetadata::default()
    };

    for (kind, pattern) in ELEMENTS.iter() {
        let found: Vec<String> = pattern
            .captures_iter(text)
            .map(|captures| {
                format!("{} {}: {}", kind.label(), &captures[1], captures[2].trim())
            })
            .collect();
        match kind {
            ElementKind::Figure => metadata.figures = found,
            ElementKind::Table => metadata.tables = found,
            ElementKind::Example => metadata.examples = found,
            ElementKind::Exercise => metadata.exercises = found,
        }
    }

    let words: Vec<&str> = WORD.find_iter(text).map(|found| found.as_str()).collect();
    let sentences = SENTENCE_END.find_iter(text).count().max(usize::from(!words.is_empty()));
    metadata.sentence_count = sentences;
    metadata.readability_score = readability(&words, sentences);
    metadata.complexity_score = complexity(&words);
    metadata
}

fn page_numbers(text: &str) -> Vec<u32> {
    let mut seen = BTreeSet::new();
    PAGE_ANCHOR
        .captures_iter(text)
        .filter_map(|captures| captures[1].parse().ok())
        .filter(|page| seen.insert(*page))
        .collect()
}

fn content_type(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(_, cues)| cues.iter().any(|cue| lower.contains(cue)))
        .map(|(name, _)| *name)
        .unwrap_or("general")
}

fn technical_terms(text: &str) -> Vec<String> {
    let terms: BTreeSet<String> = TECHNICAL
        .iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|found| found.as_str().to_string()))
        .filter(|term| !STOP_WORDS.contains(&term.to_lowercase().as_str()))
        .collect();
    terms.into_iter().collect()
}

fn keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in WORD.find_iter(text).enumerate() {
        let word = word.as_str().trim_matches(|c: char| c == '\'' || c == '-').to_lowercase();
        if word.len() <= 2 || STOP_WORDS.contains(&word.as_str()) || word.starts_with("page") {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

fn readability(words: &[&str], sentences: usize) -> f32 {
    if words.is_empty() || sentences == 0 {
        return 0.0;
    }
    let avg_sentence = words.len() as f32 / sentences as f32;
    let avg_word = words.iter().map(|word| word.chars().count()).sum::<usize>() as f32
        / words.len() as f32;
    round2(avg_sentence * 0.4 + avg_word * 0.6)
}

fn complexity(words: &[&str]) -> f32 {
    if words.is_empty() {
        return 0.0;
    }
    let long = words.iter().filter(|word| word.chars().count() > 6).count();
    round2(long as f32 / words.len() as f32 * 100.0)
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "## Chapter 3 Electricity\n\n_page_12_\n\nAn electric current is the flow of charge. \
Current is measured in amperes using an ammeter.\n\nFigure 3.1: A simple circuit\n\n_page_13_\n\n\
Example 2: Compute the current through a resistor. Use the SI unit and the I() helper.";

    #[test]
    fn extracts_structure_from_markdown() {
        let metadata = extract_metadata(SAMPLE, None);
        assert_eq!(metadata.page_numbers, vec![12, 13]);
        assert_eq!(metadata.chapter_number, Some(3));
        assert_eq!(metadata.section_title.as_deref(), Some("Chapter 3 Electricity"));
        assert_eq!(metadata.figures, vec!["Figure 3.1: A simple circuit".to_string()]);
        assert_eq!(
            metadata.examples,
            vec!["Example 2: Compute the current through a resistor".to_string()]
        );
        assert!(metadata.tables.is_empty());
        assert_eq!(metadata.content_type, "example");
        assert!(metadata.technical_terms.contains(&"SI".to_string()));
        assert!(metadata.technical_terms.contains(&"I()".to_string()));
        assert_eq!(metadata.keywords[0], "current");
        assert!(metadata.sentence_count >= 3);
    }

    #[test]
    fn request_chapter_overrides_detected_chapter() {
        let metadata = extract_metadata(SAMPLE, Some(7));
        assert_eq!(metadata.chapter_number, Some(7));
    }

    #[test]
    fn keywords_skip_stop_words_and_short_tokens() {
        let words = keywords("the cell and the cell wall of a plant cell", 3);
        assert_eq!(words, vec!["cell", "wall", "plant"]);
    }

    #[test]
    fn scores_are_zero_for_empty_text() {
        let metadata = extract_metadata("", None);
        assert_eq!(metadata.word_count, 0);
        assert_eq!(metadata.sentence_count, 0);
        assert_eq!(metadata.readability_score, 0.0);
        assert_eq!(metadata.complexity_score, 0.0);
        assert_eq!(metadata.content_type, "general");
    }

    #[test]
    fn readability_combines_sentence_and_word_length() {
        let metadata = extract_metadata("Cats sit. Dogs run.", None);
        assert_eq!(metadata.sentence_count, 2);
        assert!((metadata.readability_score - 2.9).abs() < 0.01);
        assert_eq!(metadata.complexity_score, 0.0);
    }
}
