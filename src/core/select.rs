/// Candidate scoring, salience cut-off, and flattening.
///
/// The generator drives these steps; they hold no state of their own.

use crate::core::filters::{Filter, FilterOutcome};
use crate::core::generator::GenerationState;
use crate::schema::model::Model;
use crate::schema::spec::{Group, Tag};

/// A group after filtering, possibly rewritten by a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredGroup {
    pub group: Group,
    pub score: f64,
}

/// A flattened candidate: one phrase with its group's tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub phrase: String,
    pub tags: Vec<Tag>,
}

/// Run `group` through `filters` in order. `None` means a filter vetoed it.
pub fn score_group(
    filters: &[Box<dyn Filter>],
    group: &Group,
    model: &Model,
    state: &GenerationState,
) -> Option<ScoredGroup> {
    let mut current = group.clone();
    let mut score = 0.0;
    for filter in filters {
        match filter.apply(&current, model, state) {
            FilterOutcome::Veto => {
                tracing::trace!(tags = ?group.tags, "group vetoed");
                return None;
            }
            FilterOutcome::Score(delta) => score += delta,
            FilterOutcome::Rewrite(delta, rewritten) => {
                score += delta;
                current = rewritten;
            }
        }
    }
    Some(ScoredGroup {
        group: current,
        score,
    })
}

/// Score every group of a snippet, dropping vetoed ones.
pub fn score_groups(
    filters: &[Box<dyn Filter>],
    groups: &[Group],
    model: &Model,
    state: &GenerationState,
) -> Vec<ScoredGroup> {
    groups
        .iter()
        .filter_map(|g| score_group(filters, g, model, state))
        .collect()
}

/// Keep the non-empty groups scoring at least `salience(max score)`.
pub fn apply_salience(scored: &[ScoredGroup], salience: &dyn Fn(f64) -> f64) -> Vec<ScoredGroup> {
    let live: Vec<&ScoredGroup> = scored
        .iter()
        .filter(|s| !s.group.phrases.is_empty())
        .collect();
    let max_score = live
        .iter()
        .map(|s| s.score)
        .fold(f64::NEG_INFINITY, f64::max);
    let threshold = salience(max_score);
    live.into_iter()
        .filter(|s| s.score >= threshold)
        .cloned()
        .collect()
}

/// One candidate per phrase, in group order.
pub fn flatten(entries: &[ScoredGroup]) -> Vec<Candidate> {
    entries
        .iter()
        .flat_map(|s| {
            s.group.phrases.iter().map(move |phrase| Candidate {
                phrase: phrase.clone(),
                tags: s.group.tags.clone(),
            })
        })
        .collect()
}

/// Map a draw in `[0, 1)` onto an index below `len`. A draw of exactly 1
/// lands on the last index.
pub fn pick_index(draw: f64, len: usize) -> usize {
    let i = (draw * len as f64).floor() as usize;
    i.min(len.saturating_sub(1))
}
