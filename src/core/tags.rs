/// Tag comparison and merging.

use serde::{Deserialize, Serialize};

use crate::schema::spec::Tag;

/// How two tags of the same category relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagComparison {
    /// Element-wise identical.
    Exact,
    /// One is a strict prefix of the other.
    Partial,
    Mismatch,
}

/// Classify the relationship between two tags sharing a category.
pub fn compare(a: &Tag, b: &Tag) -> TagComparison {
    if a == b {
        return TagComparison::Exact;
    }
    if a.len() == b.len() {
        return TagComparison::Mismatch;
    }
    let (shorter, longer) = if a.len() < b.len() { (a, b) } else { (b, a) };
    if longer.parts().starts_with(shorter.parts()) {
        TagComparison::Partial
    } else {
        TagComparison::Mismatch
    }
}

/// Replace the tag of the same category in `tags`, or append it.
/// Returns a new list; `tags` is left untouched.
pub fn merge_in_tag(tags: &[Tag], tag: Tag) -> Vec<Tag> {
    let mut merged = tags.to_vec();
    match merged.iter().position(|t| t.category() == tag.category()) {
        Some(i) => merged[i] = tag,
        None => merged.push(tag),
    }
    merged
}

/// Fold chosen tags into `tags`, keeping whichever tag of a shared
/// category is longer. Ties keep the existing tag.
pub fn reincorporate(tags: &mut Vec<Tag>, chosen: &[Tag]) {
    for tag in chosen {
        match tags.iter().position(|t| t.category() == tag.category()) {
            Some(i) => {
                if tag.len() > tags[i].len() {
                    tags[i] = tag.clone();
                }
            }
            None => tags.push(tag.clone()),
        }
    }
}
