/// Scoring filters — rate, veto, or prune a snippet's groups against a model.

use serde::{Deserialize, Serialize};

use crate::core::generator::GenerationState;
use crate::core::tags::{compare, TagComparison};
use crate::schema::model::Model;
use crate::schema::spec::Group;

/// What a filter decided about one group.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Drop the group outright; later filters are not consulted.
    Veto,
    Score(f64),
    /// Score the group and hand a replacement group to the filters after this one.
    Rewrite(f64, Group),
}

/// A scoring filter. Receives the generator state so it can consult
/// history.
pub trait Filter {
    fn apply(&self, group: &Group, model: &Model, state: &GenerationState) -> FilterOutcome;
}

impl<F> Filter for F
where
    F: Fn(&Group, &Model, &GenerationState) -> FilterOutcome,
{
    fn apply(&self, group: &Group, model: &Model, state: &GenerationState) -> FilterOutcome {
        self(group, model, state)
    }
}

/// Pair each group tag with the model tag of the same category.
fn shared_comparisons<'a>(
    group: &'a Group,
    model: &'a Model,
) -> impl Iterator<Item = TagComparison> + 'a {
    group
        .tags
        .iter()
        .filter_map(move |g| model.tag(g.category()).map(|m| compare(g, m)))
}

/// Vetoes any group with a tag that mismatches the model's tag of the same
/// category.
#[derive(Debug, Clone, Copy, Default)]
pub struct MismatchFilter;

impl Filter for MismatchFilter {
    fn apply(&self, group: &Group, model: &Model, _state: &GenerationState) -> FilterOutcome {
        if shared_comparisons(group, model).any(|c| c == TagComparison::Mismatch) {
            FilterOutcome::Veto
        } else {
            FilterOutcome::Score(0.0)
        }
    }
}

/// Rewards groups whose tags compare to the model's at a given level.
#[derive(Debug, Clone, Copy)]
pub struct BonusFilter {
    pub level: TagComparison,
    pub bonus: f64,
    /// Award the bonus once per matching category instead of once overall.
    pub cumulative: bool,
}

impl Filter for BonusFilter {
    fn apply(&self, group: &Group, model: &Model, _state: &GenerationState) -> FilterOutcome {
        let count = shared_comparisons(group, model)
            .filter(|c| *c == self.level)
            .count();
        let score = if self.cumulative {
            self.bonus * count as f64
        } else if count > 0 {
            self.bonus
        } else {
            0.0
        };
        FilterOutcome::Score(score)
    }
}

/// Prunes phrases that already appear in the generator's history.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrynessFilter;

impl Filter for DrynessFilter {
    fn apply(&self, group: &Group, _model: &Model, state: &GenerationState) -> FilterOutcome {
        let phrases = group
            .phrases
            .iter()
            .filter(|p| !state.history().contains(*p))
            .cloned()
            .collect();
        FilterOutcome::Rewrite(
            0.0,
            Group {
                tags: group.tags.clone(),
                phrases,
            },
        )
    }
}

/// Rewards tagged groups whose categories have not come up yet.
#[derive(Debug, Clone, Copy)]
pub struct UnmentionedFilter {
    pub bonus: f64,
}

impl Filter for UnmentionedFilter {
    fn apply(&self, group: &Group, _model: &Model, state: &GenerationState) -> FilterOutcome {
        if group.tags.is_empty() {
            return FilterOutcome::Score(0.0);
        }
        let mentioned = group.tags.iter().any(|g| {
            state
                .tag_history()
                .iter()
                .any(|t| t.category() == g.category())
        });
        FilterOutcome::Score(if mentioned { 0.0 } else { self.bonus })
    }
}

pub fn mismatch() -> MismatchFilter {
    MismatchFilter
}

pub fn partial_bonus(bonus: f64, cumulative: bool) -> BonusFilter {
    BonusFilter {
        level: TagComparison::Partial,
        bonus,
        cumulative,
    }
}

pub fn full_bonus(bonus: f64, cumulative: bool) -> BonusFilter {
    BonusFilter {
        level: TagComparison::Exact,
        bonus,
        cumulative,
    }
}

pub fn dryness() -> DrynessFilter {
    DrynessFilter
}

pub fn unmentioned(bonus: f64) -> UnmentionedFilter {
    UnmentionedFilter { bonus }
}

fn default_bonus() -> f64 {
    1.0
}

/// Declarative form of the built-in filters, for RON configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterConfig {
    Mismatch,
    PartialBonus {
        #[serde(default = "default_bonus")]
        bonus: f64,
        #[serde(default)]
        cumulative: bool,
    },
    FullBonus {
        #[serde(default = "default_bonus")]
        bonus: f64,
        #[serde(default)]
        cumulative: bool,
    },
    Dryness,
    Unmentioned {
        #[serde(default = "default_bonus")]
        bonus: f64,
    },
}

impl FilterConfig {
    pub fn build(&self) -> Box<dyn Filter> {
        match *self {
            FilterConfig::Mismatch => Box::new(mismatch()),
            FilterConfig::PartialBonus { bonus, cumulative } => {
                Box::new(partial_bonus(bonus, cumulative))
            }
            FilterConfig::FullBonus { bonus, cumulative } => Box::new(full_bonus(bonus, cumulative)),
            FilterConfig::Dryness => Box::new(dryness()),
            FilterConfig::Unmentioned { bonus } => Box::new(unmentioned(bonus)),
        }
    }
}
