//! Lexical helpers shared by the heuristic evaluator, rewriter and generator.

use std::collections::BTreeSet;

const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "been", "by", "can", "could",
    "do", "does", "for", "from", "has", "have", "how", "i", "if", "in", "into", "is", "it", "its",
    "many", "me", "much", "of", "on", "or", "our", "should", "so", "than", "that", "the", "their",
    "them", "there", "these", "they", "this", "those", "to", "was", "we", "were", "what", "when",
    "where", "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Lowercase alphanumeric tokens, in order, including stop words.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// Folds a trailing plural `s` ("outputs" → "output"); short words and
/// words ending in "ss" are left alone.
pub fn stem(token: &str) -> String {
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

/// Distinct stemmed content terms, sorted.
pub fn content_terms(text: &str) -> BTreeSet<String> {
    tokens(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .map(|t| stem(&t))
        .collect()
}

/// Spelling variants and abbreviations that name the same quantity in
/// datasheets and regulations.
const CONCEPTS: &[(&str, &str)] = &[
    ("capacity", "power"),
    ("co2", "emission"),
    ("efficient", "efficiency"),
    ("max", "maximum"),
    ("min", "minimum"),
    ("output", "power"),
    ("peak", "maximum"),
    ("rating", "power"),
    ("wattage", "power"),
];

/// Content terms with variants folded onto one canonical term, so
/// "maximum power output" and "Max power" share every concept.
pub fn concept_terms(text: &str) -> BTreeSet<String> {
    content_terms(text)
        .into_iter()
        .map(|term| match CONCEPTS.binary_search_by(|(k, _)| k.cmp(&term.as_str())) {
            Ok(idx) => CONCEPTS[idx].1.to_string(),
            Err(_) => term,
        })
        .collect()
}

/// Fraction of `query_terms` present in `text_terms`; 0.0 when the query has
/// no content terms.
pub fn coverage(query_terms: &BTreeSet<String>, text_terms: &BTreeSet<String>) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let hits = query_terms.intersection(text_terms).count();
    hits as f32 / query_terms.len() as f32
}

/// Splits text into sentences on `.`, `!`, `?` and line breaks.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            push_sentence(&mut out, &mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            // "4.5" is not a sentence break
            let next_is_boundary = chars.peek().map_or(true, |n| n.is_whitespace());
            if next_is_boundary {
                push_sentence(&mut out, &mut current);
            }
        }
    }
    push_sentence(&mut out, &mut current);
    out
}

fn push_sentence(out: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

/// Collapses runs of whitespace and lowercases, for equality checks between
/// query strings.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
