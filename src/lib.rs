//! # doclift: Declarative JSON Lifting
//!
//! doclift reshapes one JSON document into another by running a *recipe*: an
//! ordered list of rules that select values with path expressions, optionally
//! transform them, and write them into a fresh output document.
//!
//! ## Rules and Recipes
//!
//! A rule reads from `src` (one or more queries) or produces a constant with
//! `set`, and writes to `dst`. Recipes are written in code ([`recipe`],
//! [`rule`]) or loaded from JSON ([`recipe::json`]) and compiled once into a
//! [`Lifter`].
//!
//! ```
//! use doclift::{lifter, recipe, rule, transform, Lift};
//! use serde_json::json;
//!
//! let lift = lifter(recipe![
//!     rule::src("$.author.email").dst("$.emails").mv(),
//!     rule::src("$.reviewers[*].email").dst("$.emails").mv(),
//!     rule::src("$.title").dst("$.heading").via(transform::map(|v| {
//!         Ok(json!(v.as_str().unwrap_or_default().to_uppercase()))
//!     })),
//! ])
//! .unwrap();
//!
//! let doc = json!({
//!     "title": "release notes",
//!     "author": {"email": "a@x"},
//!     "reviewers": [{"email": "b@x"}, {"email": "c@x"}]
//! });
//! assert_eq!(
//!     lift.invoke(&doc).unwrap(),
//!     json!({"emails": ["a@x", "b@x", "c@x"], "heading": "RELEASE NOTES"})
//! );
//! ```
//!
//! ## Paths and Stores
//!
//! Paths starting with `$` address the document: the input on the read side,
//! the output on the write side. Paths starting with `@` address the local
//! scratch store, which lives for one pass and is copied into nested recipes
//! ([`path`], [`eval::context`]).
//!
//! ## Evaluation
//!
//! The [`eval`] module fires rules in order against an execution context. A
//! `via` may be a function, an async function, a nested recipe or a pipe
//! ([`transform`]).
//!
//! ## Composition and Async Resolution
//!
//! [`pipe`] chains lifters. Async transforms leave deferred values in the
//! output [`Tree`]; the async entry points of [`Lift`] wait for all of them
//! with [`resolve::resolve_deep`].

pub mod config;
pub mod error;
pub mod eval;
pub mod lifter;
pub mod path;
pub mod pipe;
pub mod recipe;
pub mod resolve;
pub mod transform;
pub mod tree;

// Re-exports
pub use config::{LiftConfig, OverwritePolicy};
pub use error::*;
pub use eval::context::{ExecutionContext, Seed};
pub use lifter::{Lift, Lifter, lifter};
pub use pipe::{Pipe, PipeMember, pipe};
pub use recipe::{Entry, RuleSpec, rule};
pub use transform::{SharedTransform, Transform, TransformRegistry};
pub use tree::{Deferred, Tree};
