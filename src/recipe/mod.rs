//! # Recipes
//!
//! A recipe is an ordered list of entries. Each entry is one of:
//!
//! - a [`RuleSpec`]: `src`/`set`, optional `dst`, `via` and flags
//! - a transform: sugar for a rule with `src: "$"` and that transform as `via`
//! - a nested list of entries, spliced in place
//!
//! Recipes are built in code with [`rule::src`]/[`rule::set`] and the
//! [`recipe!`](crate::recipe!) macro, or loaded from JSON with the [`json`]
//! module.
//!
//! ```
//! use doclift::{lifter, recipe, rule, Lift};
//! use serde_json::json;
//!
//! let lift = lifter(recipe![
//!     rule::src("$.id").dst("$.ident"),
//!     rule::set("Foo").dst("$.kind"),
//! ])
//! .unwrap();
//! let out = lift.invoke(&json!({"id": "001"})).unwrap();
//! assert_eq!(out, json!({"ident": "001", "kind": "Foo"}));
//! ```

pub mod json;
pub mod rule;

use std::sync::Arc;

use crate::transform::SharedTransform;
use crate::{Lifter, Pipe};

pub use rule::{Dst, Rule, RuleSpec, SetValue, Via};

#[derive(Clone)]
pub enum Entry {
    Rule(RuleSpec),
    Transform(SharedTransform),
    Recipe(Vec<Entry>),
}

impl Entry {
    /// Splice nested recipes and expand bare transforms into root rules.
    pub(crate) fn flatten_into(self, rules: &mut Vec<RuleSpec>) {
        match self {
            Entry::Rule(spec) => rules.push(spec),
            Entry::Transform(transform) => rules.push(rule::src("$").via(transform)),
            Entry::Recipe(entries) => {
                for entry in entries {
                    entry.flatten_into(rules);
                }
            }
        }
    }
}

impl From<RuleSpec> for Entry {
    fn from(spec: RuleSpec) -> Self {
        Entry::Rule(spec)
    }
}

impl From<SharedTransform> for Entry {
    fn from(transform: SharedTransform) -> Self {
        Entry::Transform(transform)
    }
}

impl From<Lifter> for Entry {
    fn from(lifter: Lifter) -> Self {
        Entry::Transform(Arc::new(lifter))
    }
}

impl From<Pipe> for Entry {
    fn from(pipe: Pipe) -> Self {
        Entry::Transform(Arc::new(pipe))
    }
}

impl From<Vec<Entry>> for Entry {
    fn from(entries: Vec<Entry>) -> Self {
        Entry::Recipe(entries)
    }
}

/// Build a `Vec<Entry>` from anything convertible into an entry.
#[macro_export]
macro_rules! recipe {
    () => {
        ::std::vec::Vec::<$crate::recipe::Entry>::new()
    };
    ($($entry:expr),+ $(,)?) => {
        ::std::vec![$($crate::recipe::Entry::from($entry)),+]
    };
}
