//! Shared utility functions for conductor
//!
//! Text helpers used by the registry, the audit log and the planner.

use std::path::{Component, Path, PathBuf};

/// Safely truncate a string to max_chars characters (not bytes)
///
/// # Examples
/// ```
/// use conductor::utils::truncate_str;
///
/// assert_eq!(truncate_str("hello world", 5), "hello");
/// let emoji = "hello 🌍 world";
/// assert!(truncate_str(emoji, 7).chars().count() <= 7);
/// ```
#[inline]
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Lowercase and collapse all runs of whitespace into single spaces.
///
/// Used wherever two task descriptions must compare equal regardless of
/// formatting (fingerprints, template matching).
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lexically normalize a path: drops `.` segments and folds `..` into a
/// preceding named segment. Leading `..` segments are kept. Never touches
/// the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // The root is its own parent
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Check if text contains any of the keywords
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
