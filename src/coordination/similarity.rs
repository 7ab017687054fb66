//! Token-overlap similarity for duplicate-work detection

use regex::Regex;
use std::collections::BTreeSet;

lazy_static::lazy_static! {
    static ref WORD: Regex = Regex::new(r"[a-z0-9_]+").expect("static regex");
}

/// Words that carry no signal about what a task is
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "the", "to", "of", "in", "on", "for", "with", "is", "it", "be", "by",
    "as", "at", "or", "this", "that", "from", "into", "please",
];

/// Lowercased content words of `text`
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Jaccard overlap of two token sets (0-1). Empty input never overlaps.
pub fn token_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.union(b).count();
    shared as f64 / union as f64
}
