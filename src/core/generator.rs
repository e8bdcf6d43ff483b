/// The generator: scores, selects, and expands snippets for a model.
///
/// `gen` validates the request and manages history lifetime; the private
/// `expand_snippet` recurses through the template interpreter for nested
/// `[:snippet]` references.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;

use crate::core::audit::AuditLedger;
use crate::core::config::GeneratorConfig;
use crate::core::filters::Filter;
use crate::core::select::{self, Candidate, ScoredGroup};
use crate::core::tags::{self, merge_in_tag};
use crate::core::template::{self, DirectiveHost};
use crate::schema::model::{Model, Transform};
use crate::schema::spec::{Spec, SpecError, Tag};

#[derive(Debug, Error)]
pub enum GenError {
    #[error("unknown snippet: {0}")]
    UnknownSnippet(String),
    #[error("no candidates left for snippet '{snippet}' ({} scored groups)", .candidates.len())]
    ExhaustedCandidates {
        snippet: String,
        candidates: Vec<ScoredGroup>,
    },
    #[error("Missing close bracket in phrase: {0}")]
    MalformedDirective(String),
    #[error("builtin or model property \"{0}\" is not a function")]
    UnresolvedCallable(String),
    #[error("invalid directive: [{0}]")]
    InvalidDirective(String),
    #[error("invalid spec: {0}")]
    Spec(#[from] SpecError),
}

/// A source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

impl<F> RandomSource for F
where
    F: FnMut() -> f64,
{
    fn next_f64(&mut self) -> f64 {
        self()
    }
}

/// Adapts any `rand` RNG into a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Generator-wide memory of what has been chosen, most recent first.
#[derive(Debug, Clone, Default)]
pub struct GenerationState {
    history: VecDeque<String>,
    tag_history: VecDeque<Tag>,
}

impl GenerationState {
    pub fn history(&self) -> &VecDeque<String> {
        &self.history
    }

    pub fn tag_history(&self) -> &VecDeque<Tag> {
        &self.tag_history
    }

    pub fn record_phrase(&mut self, phrase: String) {
        self.history.push_front(phrase);
    }

    /// Prepend `tags`, keeping their relative order.
    pub fn record_tags(&mut self, tags: &[Tag]) {
        for tag in tags.iter().rev() {
            self.tag_history.push_front(tag.clone());
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn clear_tag_history(&mut self) {
        self.tag_history.clear();
    }

    pub fn clear(&mut self) {
        self.clear_history();
        self.clear_tag_history();
    }
}

type Salience = Box<dyn Fn(f64) -> f64>;
type SubmodelFactory = Box<dyn Fn(&Model, Tag) -> Model>;

/// Derived model for a tag-scoped directive: a copy of `parent` with the
/// forced tag merged in.
pub fn scoped_model(parent: &Model, tag: Tag) -> Model {
    let mut derived = parent.clone();
    derived.tags = merge_in_tag(&parent.tags, tag);
    derived
}

/// Generates text from a [`Spec`]. Built via `Generator::builder(spec)`.
pub struct Generator {
    spec: Spec,
    filters: Vec<Box<dyn Filter>>,
    state: GenerationState,
    audit: Option<AuditLedger>,
    reincorporate: bool,
    persistence: bool,
    salience: Salience,
    rng: Box<dyn RandomSource>,
    builtins: FxHashMap<String, Transform>,
    submodel: SubmodelFactory,
}

/// Builder for constructing a `Generator`.
pub struct GeneratorBuilder {
    spec: Spec,
    filters: Vec<Box<dyn Filter>>,
    reincorporate: bool,
    persistence: bool,
    audit: bool,
    salience: Option<Salience>,
    seed: Option<u64>,
    rng: Option<Box<dyn RandomSource>>,
    builtins: FxHashMap<String, Transform>,
    submodel: Option<SubmodelFactory>,
}

impl Generator {
    pub fn builder(spec: Spec) -> GeneratorBuilder {
        GeneratorBuilder {
            spec,
            filters: Vec::new(),
            reincorporate: false,
            persistence: true,
            audit: false,
            salience: None,
            seed: None,
            rng: None,
            builtins: FxHashMap::default(),
            submodel: None,
        }
    }

    /// Generate text for `snippet` against `model`.
    ///
    /// With persistence off, history and tag history are cleared once the
    /// whole call tree has finished, whether or not it succeeded.
    pub fn gen(&mut self, snippet: &str, model: &mut Model) -> Result<String, GenError> {
        if !self.spec.contains(snippet) {
            return Err(GenError::UnknownSnippet(snippet.to_string()));
        }
        let result = self.expand_snippet(snippet, model);
        if !self.persistence {
            self.state.clear();
            tracing::debug!("history cleared");
        }
        result
    }

    fn expand_snippet(&mut self, name: &str, model: &mut Model) -> Result<String, GenError> {
        let snippet = self
            .spec
            .get(name)
            .ok_or_else(|| GenError::UnknownSnippet(name.to_string()))?;
        let bind = snippet.bind;
        if bind {
            if let Some(bound) = model.binding(name) {
                tracing::debug!(snippet = name, "reusing bound output");
                return Ok(bound.to_string());
            }
        }

        let _span = tracing::debug_span!("generate", snippet = name).entered();

        let scored = select::score_groups(&self.filters, &snippet.groups, model, &self.state);
        let entries = select::apply_salience(&scored, &*self.salience);
        let candidates = select::flatten(&entries);
        if candidates.is_empty() {
            return Err(GenError::ExhaustedCandidates {
                snippet: name.to_string(),
                candidates: scored,
            });
        }
        let index = select::pick_index(self.rng.next_f64(), candidates.len());
        let Some(Candidate { phrase, tags: chosen }) = candidates.into_iter().nth(index) else {
            return Err(GenError::ExhaustedCandidates {
                snippet: name.to_string(),
                candidates: scored,
            });
        };
        tracing::debug!(phrase = %phrase, "chose phrase");

        if self.reincorporate {
            tags::reincorporate(&mut model.tags, &chosen);
        }
        self.state.record_tags(&chosen);
        self.state.record_phrase(phrase.clone());
        if let Some(audit) = &mut self.audit {
            audit.record(name, &phrase);
        }

        let output = template::expand(&phrase, model, self)?;
        if bind {
            model.bindings.insert(name.to_string(), output.clone());
        }
        Ok(output)
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    pub fn history(&self) -> &VecDeque<String> {
        self.state.history()
    }

    pub fn tag_history(&self) -> &VecDeque<Tag> {
        self.state.tag_history()
    }

    /// Phrase counts, if auditing was enabled.
    pub fn audit(&self) -> Option<&AuditLedger> {
        self.audit.as_ref()
    }

    pub fn reset_audit(&mut self) {
        if let Some(audit) = &mut self.audit {
            audit.reset();
        }
    }

    pub fn clear_history(&mut self) {
        self.state.clear_history();
    }

    pub fn clear_tag_history(&mut self) {
        self.state.clear_tag_history();
    }
}

impl DirectiveHost for Generator {
    fn generate(&mut self, snippet: &str, model: &mut Model) -> Result<String, GenError> {
        self.expand_snippet(snippet, model)
    }

    fn draw(&mut self) -> f64 {
        self.rng.next_f64()
    }

    fn builtin(&self, name: &str) -> Option<Transform> {
        self.builtins.get(name).cloned()
    }

    fn submodel(&self, parent: &Model, tag: Tag) -> Model {
        (self.submodel)(parent, tag)
    }
}

impl GeneratorBuilder {
    /// Append a filter; filters run in the order added.
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Box<dyn Filter>>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Fold chosen tags back into the model.
    pub fn reincorporate(mut self, on: bool) -> Self {
        self.reincorporate = on;
        self
    }

    /// Keep history across `gen` calls. On by default.
    pub fn persistence(mut self, on: bool) -> Self {
        self.persistence = on;
        self
    }

    pub fn audit(mut self, on: bool) -> Self {
        self.audit = on;
        self
    }

    /// Map the best score to the minimum score a group needs to stay
    /// eligible. Defaults to the identity.
    pub fn salience<F>(mut self, formula: F) -> Self
    where
        F: Fn(f64) -> f64 + 'static,
    {
        self.salience = Some(Box::new(formula));
        self
    }

    /// Seed the default RNG. Ignored when a random source is supplied.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn rng(mut self, source: impl RandomSource + 'static) -> Self {
        self.rng = Some(Box::new(source));
        self
    }

    /// Register a transform for chained directives.
    pub fn builtin<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.builtins.insert(name.into(), Rc::new(f));
        self
    }

    /// Replace how tag-scoped directives derive their model.
    pub fn submodel<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Model, Tag) -> Model + 'static,
    {
        self.submodel = Some(Box::new(factory));
        self
    }

    /// Apply a declarative configuration on top of the current settings.
    pub fn config(mut self, config: &GeneratorConfig) -> Self {
        self.filters.extend(config.filters.iter().map(|f| f.build()));
        self.reincorporate = config.reincorporate;
        self.persistence = config.persistence;
        self.audit = config.audit;
        if let Some(seed) = config.seed {
            self.seed = Some(seed);
        }
        if let Some(margin) = config.salience_margin {
            self.salience = Some(Box::new(move |max: f64| max - margin));
        }
        self
    }

    pub fn build(self) -> Result<Generator, GenError> {
        self.spec.validate()?;

        let rng: Box<dyn RandomSource> = match (self.rng, self.seed) {
            (Some(rng), _) => rng,
            (None, Some(seed)) => Box::new(RngSource(StdRng::seed_from_u64(seed))),
            (None, None) => Box::new(RngSource(StdRng::from_entropy())),
        };
        let salience: Salience = match self.salience {
            Some(formula) => formula,
            None => Box::new(|max: f64| max),
        };
        let submodel: SubmodelFactory = match self.submodel {
            Some(factory) => factory,
            None => Box::new(scoped_model),
        };
        let audit = self.audit.then(|| AuditLedger::new(&self.spec));

        Ok(Generator {
            spec: self.spec,
            filters: self.filters,
            state: GenerationState::default(),
            audit,
            reincorporate: self.reincorporate,
            persistence: self.persistence,
            salience,
            rng,
            builtins: self.builtins,
            submodel,
        })
    }
}
