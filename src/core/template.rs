/// Directive interpreter — expands `[...]` directives inside a chosen phrase.
///
/// Directive forms, tried in order:
/// - `['text']` → literal text
/// - `[fn rest]` → apply a transform to the expansion of `rest`
/// - `[|category|value:snippet]` → generate `snippet` against a derived model
///   carrying the forced tag
/// - `[:snippet]` → generate `snippet`
/// - `[#min-max]` → random integer, `min <= n < max`
/// - `[a.b.c]` → nested model field
/// - `[name]` → model field
///
/// Brackets are not depth-balanced: a directive ends at the first `]`
/// after its `[`. Each substitution is rescanned, so expansions may
/// themselves contain directives.

use std::rc::Rc;

use crate::core::generator::GenError;
use crate::schema::model::{Model, Transform, UNDEFINED};
use crate::schema::spec::Tag;

/// Services the interpreter needs from whoever drives it.
pub trait DirectiveHost {
    /// Generate a snippet against `model`. Backs `[:snippet]`.
    fn generate(&mut self, snippet: &str, model: &mut Model) -> Result<String, GenError>;

    /// Next random draw in `[0, 1)`.
    fn draw(&mut self) -> f64;

    /// A host-supplied transform, consulted after the built-in ones.
    fn builtin(&self, name: &str) -> Option<Transform>;

    /// Build the model a tag-scoped directive generates against.
    fn submodel(&self, parent: &Model, tag: Tag) -> Model;
}

/// Expand every directive in `phrase`.
pub fn expand(phrase: &str, model: &mut Model, host: &mut dyn DirectiveHost) -> Result<String, GenError> {
    let mut text = phrase.to_string();
    loop {
        let Some(open) = text.find('[') else {
            return Ok(text);
        };
        let Some(close) = text[open..].find(']').map(|i| open + i) else {
            return Err(GenError::MalformedDirective(phrase.to_string()));
        };
        let value = evaluate(&text[open + 1..close], model, host)?;
        text = format!("{}{}{}", &text[..open], value, &text[close + 1..]);
    }
}

/// Evaluate the text between a pair of brackets.
pub fn evaluate(raw: &str, model: &mut Model, host: &mut dyn DirectiveHost) -> Result<String, GenError> {
    let directive = raw.trim();

    if directive.starts_with('\'') && directive.ends_with('\'') {
        return Ok(directive
            .get(1..directive.len() - 1)
            .unwrap_or("")
            .to_string());
    }

    if let Some((head, rest)) = directive.split_once(' ') {
        let arg = evaluate(rest, model, host)?;
        let transform = resolve(head, &*host, model)
            .ok_or_else(|| GenError::UnresolvedCallable(head.to_string()))?;
        return Ok(transform(&arg));
    }

    if let Some(scoped) = directive.strip_prefix('|') {
        let (tag_text, snippet) = scoped
            .split_once(':')
            .ok_or_else(|| GenError::InvalidDirective(directive.to_string()))?;
        let tag = Tag::new(tag_text.split('|'));
        if tag.category().is_empty() {
            return Err(GenError::InvalidDirective(directive.to_string()));
        }
        let mut derived = host.submodel(model, tag);
        let output = host.generate(snippet, &mut derived)?;
        // Bindings are shared with the caller; only the tags are scoped.
        for (name, text) in derived.bindings {
            model.bindings.entry(name).or_insert(text);
        }
        return Ok(output);
    }

    if let Some(snippet) = directive.strip_prefix(':') {
        return host.generate(snippet, model);
    }

    if let Some(range) = directive.strip_prefix('#') {
        let (min, max) = parse_range(range)
            .ok_or_else(|| GenError::InvalidDirective(directive.to_string()))?;
        return roll(host.draw(), min, max)
            .map(|n| n.to_string())
            .ok_or_else(|| GenError::InvalidDirective(directive.to_string()));
    }

    let value = if directive.contains('.') {
        model.lookup_path(directive.split('.'))
    } else {
        model.field(directive)
    };
    Ok(value.map_or_else(|| UNDEFINED.to_string(), ToString::to_string))
}

fn parse_range(range: &str) -> Option<(i64, i64)> {
    let (min, max) = range.split_once('-')?;
    Some((min.trim().parse().ok()?, max.trim().parse().ok()?))
}

/// `floor(draw * (max - min)) + min`. A draw of exactly 1 yields `max`.
/// `None` when the result does not fit in an `i64`.
pub fn roll(draw: f64, min: i64, max: i64) -> Option<i64> {
    let span = max.checked_sub(min)?;
    let offset = (draw * span as f64).floor();
    if !(i64::MIN as f64..i64::MAX as f64).contains(&offset) {
        return None;
    }
    (offset as i64).checked_add(min)
}

type Resolver = fn(&str, &dyn DirectiveHost, &Model) -> Option<Transform>;

/// Transform lookup order: built-ins, then host builtins, then model functions.
const RESOLVERS: [Resolver; 3] = [builtin_resolver, host_resolver, model_resolver];

fn resolve(name: &str, host: &dyn DirectiveHost, model: &Model) -> Option<Transform> {
    RESOLVERS.iter().find_map(|resolver| resolver(name, host, model))
}

fn builtin_resolver(name: &str, _host: &dyn DirectiveHost, _model: &Model) -> Option<Transform> {
    builtin_transform(name)
}

fn host_resolver(name: &str, host: &dyn DirectiveHost, _model: &Model) -> Option<Transform> {
    host.builtin(name)
}

fn model_resolver(name: &str, _host: &dyn DirectiveHost, model: &Model) -> Option<Transform> {
    model.functions.get(name).cloned()
}

fn builtin_transform(name: &str) -> Option<Transform> {
    let f: fn(&str) -> String = match name {
        "a" | "an" => article,
        "cap" => capitalize,
        "A" | "An" => |text| capitalize(&article(text)),
        _ => return None,
    };
    Some(Rc::new(f))
}

/// Prefix the indefinite article, "an" before a vowel.
pub fn article(text: &str) -> String {
    let vowel = text
        .chars()
        .next()
        .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'));
    if vowel {
        format!("an {}", text)
    } else {
        format!("a {}", text)
    }
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
