//! Snippet Engine — tag-aware procedural text generation.
//!
//! A spec of named snippets offers tagged groups of alternative phrases.
//! The generator scores each group against a caller-supplied model, picks
//! a phrase among the best, and expands the `[...]` directives inside it,
//! recursing into other snippets as they are referenced.

pub mod core;
pub mod schema;

pub use crate::core::filters;
pub use crate::core::generator::{GenError, Generator, GeneratorBuilder, RandomSource};
pub use crate::schema::model::{Model, Value};
pub use crate::schema::spec::{Group, Snippet, Spec, Tag};
