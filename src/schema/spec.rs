/// Snippet grammar data — tags, groups, snippets, and the spec that holds them.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("snippet '{snippet}' has an empty tag")]
    EmptyTag { snippet: String },
    #[error("snippet '{snippet}' has a group with more than one '{category}' tag")]
    DuplicateCategory { snippet: String, category: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A category-qualified specificity chain, e.g. `["government", "monarchy"]`.
///
/// Element 0 is the category; each following element narrows the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Vec<String>);

impl Tag {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tag(parts.into_iter().map(Into::into).collect())
    }

    /// The category this tag belongs to. Empty only for an invalid tag.
    pub fn category(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("|"))
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Tag {
    fn from(parts: [S; N]) -> Self {
        Tag::new(parts)
    }
}

/// A tagged bundle of alternative phrases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub phrases: Vec<String>,
}

impl Group {
    pub fn new<T, P>(tags: T, phrases: P) -> Self
    where
        T: IntoIterator<Item = Tag>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Group {
            tags: tags.into_iter().collect(),
            phrases: phrases.into_iter().map(Into::into).collect(),
        }
    }

    /// An untagged group.
    pub fn untagged<P>(phrases: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Group::new(Vec::new(), phrases)
    }
}

/// A named, independently generatable unit of grammar.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snippet {
    pub groups: Vec<Group>,
    /// Memoize the first output per model.
    #[serde(default)]
    pub bind: bool,
}

impl Snippet {
    pub fn new(groups: Vec<Group>) -> Self {
        Snippet {
            groups,
            bind: false,
        }
    }

    pub fn bound(groups: Vec<Group>) -> Self {
        Snippet { groups, bind: true }
    }
}

/// A set of named snippets. Read-only once handed to a generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spec {
    pub snippets: HashMap<String, Snippet>,
}

// RON files may list `phrases` directly on a snippet as shorthand for an
// untagged group, so loading goes through these intermediate shapes.

#[derive(Debug, Deserialize)]
#[serde(rename = "Group")]
struct RonGroup {
    #[serde(default)]
    tags: Vec<Tag>,
    phrases: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Snippet")]
struct RonSnippet {
    #[serde(default)]
    groups: Vec<RonGroup>,
    #[serde(default)]
    phrases: Vec<String>,
    #[serde(default)]
    bind: bool,
}

impl From<RonSnippet> for Snippet {
    fn from(raw: RonSnippet) -> Self {
        let mut groups: Vec<Group> = raw
            .groups
            .into_iter()
            .map(|g| Group {
                tags: g.tags,
                phrases: g.phrases,
            })
            .collect();
        if !raw.phrases.is_empty() {
            groups.push(Group::untagged(raw.phrases));
        }
        Snippet {
            groups,
            bind: raw.bind,
        }
    }
}

impl Spec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a snippet.
    pub fn with_snippet(mut self, name: impl Into<String>, snippet: Snippet) -> Self {
        self.snippets.insert(name.into(), snippet);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Snippet> {
        self.snippets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snippets.contains_key(name)
    }

    /// Load a spec from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Spec, SpecError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a spec from a RON map of snippet name to snippet.
    pub fn parse_ron(input: &str) -> Result<Spec, SpecError> {
        let raw: HashMap<String, RonSnippet> = ron::from_str(input)?;
        let snippets = raw
            .into_iter()
            .map(|(name, snippet)| (name, Snippet::from(snippet)))
            .collect();
        Ok(Spec { snippets })
    }

    /// Load and merge every `.ron` file in a directory, in file name order.
    pub fn load_dir(dir: &Path) -> Result<Spec, SpecError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut spec = Spec::default();
        for path in paths {
            spec.merge(Self::load_from_ron(&path)?);
        }
        Ok(spec)
    }

    /// Merge another spec into this one. Snippets from `other` override
    /// snippets in `self` with the same name.
    pub fn merge(&mut self, other: Spec) {
        self.snippets.extend(other.snippets);
    }

    /// Check that every tag is non-empty and no group repeats a category.
    pub fn validate(&self) -> Result<(), SpecError> {
        for (name, snippet) in &self.snippets {
            for group in &snippet.groups {
                let mut seen = FxHashSet::default();
                for tag in &group.tags {
                    if tag.is_empty() {
                        return Err(SpecError::EmptyTag {
                            snippet: name.clone(),
                        });
                    }
                    if !seen.insert(tag.category()) {
                        return Err(SpecError::DuplicateCategory {
                            snippet: name.clone(),
                            category: tag.category().to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
