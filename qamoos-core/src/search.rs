//! Case-insensitive substring search. No ranking; callers keep store order.

use crate::model::Word;

/// Unicode-aware case-insensitive containment. An empty needle matches nothing.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A word matches when any dialect spelling or meaning value contains the needle.
pub fn word_matches(word: &Word, needle: &str) -> bool {
    word.words.iter().any(|entry| {
        contains_ci(&entry.word, needle)
            || entry.meanings.iter().any(|m| contains_ci(&m.value, needle))
    })
}
