//! Declarative recipes loaded from JSON.
//!
//! The JSON shape mirrors the typed builder: a recipe is an array whose items
//! are rule objects, nested arrays, or strings naming a registered transform.
//! A rule's `via` is either a nested recipe array or a transform name.
//!
//! ```json
//! [
//!   { "src": "$.title", "dst": "$.heading", "via": "uppercase" },
//!   { "set": "Article", "dst": "$.kind" },
//!   { "src": "$.tags[*]", "dst": "$.labels", "mv": true }
//! ]
//! ```
//!
//! A top-level object is read as a recipe of one rule.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Entry, RuleSpec, rule::Dst, rule::SetValue, rule::Via};
use crate::transform::TransformRegistry;
use crate::{RecipeError, RecipeResult};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDst {
    Flag(bool),
    Path(String),
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    src: Option<OneOrMany>,
    #[serde(default)]
    set: Option<Value>,
    #[serde(default)]
    dst: Option<RawDst>,
    #[serde(default)]
    via: Option<Value>,
    #[serde(default)]
    mv: bool,
    #[serde(default)]
    clone: bool,
    #[serde(default)]
    leaf: bool,
    #[serde(flatten)]
    unknown: BTreeMap<String, Value>,
}

pub fn from_value(value: &Value, registry: &TransformRegistry) -> RecipeResult<Vec<Entry>> {
    match value {
        Value::Array(items) => items.iter().map(|item| entry(item, registry)).collect(),
        Value::Object(_) => Ok(vec![entry(value, registry)?]),
        other => Err(RecipeError::Malformed(format!(
            "expected a recipe array or rule object, got {}",
            other
        ))),
    }
}

pub fn from_str(s: &str, registry: &TransformRegistry) -> RecipeResult<Vec<Entry>> {
    let value: Value =
        serde_json::from_str(s).map_err(|e| RecipeError::Malformed(e.to_string()))?;
    from_value(&value, registry)
}

pub fn from_file<P: AsRef<Path>>(path: P, registry: &TransformRegistry) -> RecipeResult<Vec<Entry>> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading recipe");
    let content = fs::read_to_string(path)
        .map_err(|e| RecipeError::Io(format!("{}: {}", path.display(), e)))?;
    from_str(&content, registry)
}

fn entry(value: &Value, registry: &TransformRegistry) -> RecipeResult<Entry> {
    match value {
        Value::Array(_) => Ok(Entry::Recipe(from_value(value, registry)?)),
        Value::Object(_) => Ok(Entry::Rule(rule(value, registry)?)),
        Value::String(name) => Ok(Entry::Transform(lookup(name, registry)?)),
        other => Err(RecipeError::Malformed(format!(
            "recipe entries must be rules, recipes or transform names, got {}",
            other
        ))),
    }
}

fn rule(value: &Value, registry: &TransformRegistry) -> RecipeResult<RuleSpec> {
    let raw = RawRule::deserialize(value).map_err(|e| RecipeError::Malformed(e.to_string()))?;
    if !raw.unknown.is_empty() {
        return Err(RecipeError::UnknownFields(
            raw.unknown.into_keys().collect(),
        ));
    }

    let via = match raw.via {
        None | Some(Value::Null) => None,
        Some(nested @ Value::Array(_)) => Some(Via::Recipe(from_value(&nested, registry)?)),
        Some(Value::String(name)) => Some(Via::Transform(lookup(&name, registry)?)),
        Some(other) => return Err(RecipeError::InvalidTransform(other.to_string())),
    };

    Ok(RuleSpec {
        src: raw.src.map(|src| match src {
            OneOrMany::One(path) => vec![path],
            OneOrMany::Many(paths) => paths,
        }),
        set: raw.set.filter(|v| !v.is_null()).map(SetValue::Const),
        dst: match raw.dst {
            None | Some(RawDst::Flag(true)) => Dst::Source,
            Some(RawDst::Flag(false)) => Dst::Discard,
            Some(RawDst::Path(path)) => Dst::Path(path),
        },
        via,
        mv: raw.mv,
        clone: raw.clone,
        leaf: raw.leaf,
    })
}

fn lookup(
    name: &str,
    registry: &TransformRegistry,
) -> RecipeResult<crate::transform::SharedTransform> {
    registry
        .get(name)
        .ok_or_else(|| RecipeError::UnknownTransform(name.to_string()))
}
