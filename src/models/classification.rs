use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Similarity needed to accept a misspelled category word.
const CATEGORY_MATCH_THRESHOLD: f64 = 0.85;

/// Recycling bins an item can be sorted into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, EnumIter, Display, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum Category {
    Plastic,
    Paper,
    Metal,
    Trash,
}

impl Category {
    /// Map a free-form category word onto the closed set.
    ///
    /// Exact (case-insensitive) names win; otherwise the closest name by
    /// Jaro-Winkler similarity is taken if it clears the threshold. Anything
    /// else is `Trash`.
    pub fn from_word(word: &str) -> Self {
        let word = word
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        if let Ok(category) = Category::from_str(&word) {
            return category;
        }

        Category::iter()
            .map(|c| (c, jaro_winkler(&word, &c.to_string().to_lowercase())))
            .filter(|(_, score)| *score >= CATEGORY_MATCH_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c)
            .unwrap_or(Category::Trash)
    }
}

/// Outcome of one successful classification call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    /// Reply text exactly as the service returned it.
    pub text: String,
    pub item: Option<String>,
    pub category: Category,
}

impl ClassificationResult {
    /// Derive item and category from an `Item: ...` / `Category: ...` reply.
    ///
    /// The text is kept verbatim; lines that do not follow the convention are ignored.
    pub fn from_reply(text: String) -> Self {
        let mut item = None;
        let mut category = None;

        for line in text.lines() {
            if let Some(value) = strip_label(line, "item") {
                if item.is_none() && !value.is_empty() {
                    item = Some(value.to_string());
                }
            } else if let Some(value) = strip_label(line, "category") {
                if category.is_none() && !value.is_empty() {
                    category = Some(Category::from_word(value));
                }
            }
        }

        Self {
            text,
            item,
            category: category.unwrap_or(Category::Trash),
        }
    }
}

/// Return the value after `label:` when the line starts with it (ignoring case and markdown emphasis).
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let line = line.trim().trim_start_matches(['*', '-', ' ']);
    let (head, rest) = line.split_once(':')?;
    let head = head.trim().trim_end_matches('*');
    if head.eq_ignore_ascii_case(label) {
        Some(rest.trim().trim_matches('*').trim())
    } else {
        None
    }
}
