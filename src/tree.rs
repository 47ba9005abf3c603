//! The accumulator a lifter writes into.
//!
//! A [`Tree`] mirrors the JSON data model and adds one variant, `Deferred`,
//! holding a pending computation that will settle to a plain JSON value.
//! Asynchronous transforms park their results here; [`Tree::settle`] walks
//! the tree and waits for all of them (see [`crate::resolve`]).

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::{Map, Value};

use crate::path::{DocPath, Seg};
use crate::resolve::{Settle, resolve_deep};
use crate::{LiftError, LiftResult, PathError};

/// A pending value. Cloning shares the underlying computation.
#[derive(Clone)]
pub struct Deferred(Shared<BoxFuture<'static, LiftResult<Value>>>);

impl Deferred {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = LiftResult<Value>> + Send + 'static,
    {
        Self(future.boxed().shared())
    }

    pub fn ready(value: Value) -> Self {
        Self::new(futures::future::ready(Ok(value)))
    }

    /// Resolved value, if the computation already finished.
    pub fn peek(&self) -> Option<&LiftResult<Value>> {
        self.0.peek()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(result) => write!(f, "Deferred({:?})", result),
            None => write!(f, "Deferred(<pending>)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Tree {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Tree>),
    Object(BTreeMap<String, Tree>),
    Deferred(Deferred),
}

impl Tree {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = LiftResult<Value>> + Send + 'static,
    {
        Tree::Deferred(Deferred::new(future))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Bool(_) => "boolean",
            Tree::Number(_) => "number",
            Tree::String(_) => "string",
            Tree::Array(_) => "array",
            Tree::Object(_) => "object",
            Tree::Deferred(_) => "deferred",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Null)
    }

    /// True when no deferred value remains anywhere below this node.
    pub fn is_settled(&self) -> bool {
        match self {
            Tree::Deferred(_) => false,
            Tree::Array(items) => items.iter().all(Tree::is_settled),
            Tree::Object(fields) => fields.values().all(Tree::is_settled),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a plain JSON value. Fails if anything is still pending.
    pub fn into_value(self) -> LiftResult<Value> {
        self.into_value_inner().map_err(|mut trail| {
            trail.reverse();
            LiftError::unsettled(DocPath::from_segments(trail).to_string())
        })
    }

    // On failure, returns the path to the pending slot, innermost segment first.
    fn into_value_inner(self) -> Result<Value, Vec<Seg>> {
        Ok(match self {
            Tree::Null => Value::Null,
            Tree::Bool(b) => Value::Bool(b),
            Tree::Number(n) => Value::Number(n),
            Tree::String(s) => Value::String(s),
            Tree::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    out.push(item.into_value_inner().map_err(|mut trail| {
                        trail.push(Seg::Index(i));
                        trail
                    })?);
                }
                Value::Array(out)
            }
            Tree::Object(fields) => {
                let mut out = Map::with_capacity(fields.len());
                for (k, v) in fields {
                    let v = match v.into_value_inner() {
                        Ok(v) => v,
                        Err(mut trail) => {
                            trail.push(Seg::Key(k));
                            return Err(trail);
                        }
                    };
                    out.insert(k, v);
                }
                Value::Object(out)
            }
            Tree::Deferred(_) => return Err(Vec::new()),
        })
    }

    /// JSON view of this tree with pending slots read as `null`. Used to run
    /// queries over a store that may still hold deferred values.
    pub fn to_value_lossy(&self) -> Value {
        match self {
            Tree::Null | Tree::Deferred(_) => Value::Null,
            Tree::Bool(b) => Value::Bool(*b),
            Tree::Number(n) => Value::Number(n.clone()),
            Tree::String(s) => Value::String(s.clone()),
            Tree::Array(items) => Value::Array(items.iter().map(Tree::to_value_lossy).collect()),
            Tree::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value_lossy()))
                    .collect(),
            ),
        }
    }

    /// Wait for every deferred value in the tree, then convert it.
    pub fn settle(mut self) -> BoxFuture<'static, LiftResult<Value>> {
        async move {
            resolve_deep(&mut self).await?;
            self.into_value()
        }
        .boxed()
    }

    pub fn get(&self, path: &DocPath) -> Option<&Tree> {
        let mut node = self;
        for seg in path {
            node = match (seg, node) {
                (Seg::Key(k), Tree::Object(fields)) => fields.get(k)?,
                (Seg::Index(i), Tree::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Hand the slot at `path` to `update`, creating intermediate objects and
    /// arrays along the way. A missing slot is presented as `Null`.
    pub fn assign<F>(&mut self, path: &DocPath, update: F) -> LiftResult<()>
    where
        F: FnOnce(&mut Tree) -> LiftResult<()>,
    {
        let mut node = self;
        let mut walked = DocPath::root();
        for seg in path {
            if node.is_null() {
                *node = match seg {
                    Seg::Key(_) => Tree::Object(BTreeMap::new()),
                    Seg::Index(_) => Tree::Array(Vec::new()),
                };
            }
            node = match (seg, node) {
                (Seg::Key(k), Tree::Object(fields)) => fields.entry(k.clone()).or_default(),
                (Seg::Index(i), Tree::Array(items)) => {
                    if items.len() <= *i {
                        items.resize(*i + 1, Tree::Null);
                    }
                    &mut items[*i]
                }
                (seg, other) => {
                    return Err(PathError::TypeConflict {
                        path: walked.to_string(),
                        expected: match seg {
                            Seg::Key(_) => "object",
                            Seg::Index(_) => "array",
                        },
                        found: other.kind(),
                    }
                    .into());
                }
            };
            walked = match seg {
                Seg::Key(k) => walked.key(k.clone()),
                Seg::Index(i) => walked.index(*i),
            };
        }
        update(node)
    }

    /// Overwrite the slot at `path`.
    pub fn set(&mut self, path: &DocPath, value: Tree) -> LiftResult<()> {
        self.assign(path, |slot| {
            *slot = value;
            Ok(())
        })
    }

    /// Append to the sequence at `path`, creating it when absent.
    pub fn push(&mut self, path: &DocPath, value: Tree) -> LiftResult<()> {
        let at = path.to_string();
        self.assign(path, move |slot| match slot {
            Tree::Null => {
                *slot = Tree::Array(vec![value]);
                Ok(())
            }
            Tree::Array(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(PathError::TypeConflict {
                path: at,
                expected: "array",
                found: other.kind(),
            }
            .into()),
        })
    }
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(b),
            Value::Number(n) => Tree::Number(n),
            Value::String(s) => Tree::String(s),
            Value::Array(items) => Tree::Array(items.into_iter().map(Tree::from).collect()),
            Value::Object(fields) => {
                Tree::Object(fields.into_iter().map(|(k, v)| (k, Tree::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for Tree {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(*b),
            Value::Number(n) => Tree::Number(n.clone()),
            Value::String(s) => Tree::String(s.clone()),
            Value::Array(items) => Tree::Array(items.iter().map(Tree::from).collect()),
            Value::Object(fields) => Tree::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Tree::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Settle for Tree {
    type Settled = Value;
    type Error = LiftError;

    fn take_pending(&mut self) -> Option<BoxFuture<'static, LiftResult<Value>>> {
        match self {
            Tree::Deferred(deferred) => Some(deferred.0.clone().boxed()),
            _ => None,
        }
    }

    fn children_mut(&mut self) -> Vec<&mut Self> {
        match self {
            Tree::Array(items) => items.iter_mut().collect(),
            Tree::Object(fields) => fields.values_mut().collect(),
            _ => Vec::new(),
        }
    }

    fn patch(&mut self, settled: Value) {
        *self = Tree::from(settled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(p: &str) -> DocPath {
        DocPath::parse(p).unwrap()
    }

    #[test]
    fn test_set_creates_intermediate_containers() {
        let mut tree = Tree::Null;
        tree.set(&path("$.meta.seq"), Tree::from(json!(20))).unwrap();
        tree.set(&path("$.parts[1].id"), Tree::from(json!("B"))).unwrap();
        assert_eq!(
            tree.into_value().unwrap(),
            json!({"meta": {"seq": 20}, "parts": [null, {"id": "B"}]})
        );
    }

    #[test]
    fn test_set_at_root_replaces_everything() {
        let mut tree = Tree::from(json!({"a": 1}));
        tree.set(&DocPath::root(), Tree::from(json!([1, 2]))).unwrap();
        assert_eq!(tree.into_value().unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_push_accumulates_in_order() {
        let mut tree = Tree::Null;
        for email in ["a@x", "b@x", "c@x"] {
            tree.push(&path("$.emails"), Tree::from(json!(email))).unwrap();
        }
        assert_eq!(
            tree.into_value().unwrap(),
            json!({"emails": ["a@x", "b@x", "c@x"]})
        );
    }

    #[test]
    fn test_writing_through_a_scalar_is_a_type_conflict() {
        let mut tree = Tree::from(json!({"email": "a@x"}));
        let err = tree
            .set(&path("$.email.address"), Tree::from(json!("x")))
            .unwrap_err();
        assert_eq!(
            err,
            LiftError::Path(PathError::TypeConflict {
                path: "$['email']".to_string(),
                expected: "object",
                found: "string",
            })
        );

        let err = tree.push(&path("$.email"), Tree::Null).unwrap_err();
        assert!(matches!(err, LiftError::Path(PathError::TypeConflict { .. })));
    }

    #[test]
    fn test_get_reads_existing_slots_only() {
        let tree = Tree::from(json!({"a": [{"b": 1}]}));
        assert_eq!(
            tree.get(&path("$.a[0].b")).unwrap().clone().into_value().unwrap(),
            json!(1)
        );
        assert!(tree.get(&path("$.a[3]")).is_none());
        assert!(tree.get(&path("$.a.b")).is_none());
    }

    #[test]
    fn test_into_value_reports_pending_location() {
        let mut tree = Tree::Null;
        tree.set(&path("$.parts[0]"), Tree::Deferred(Deferred::ready(json!(1))))
            .unwrap();
        assert!(!tree.is_settled());
        assert_eq!(
            tree.clone().into_value().unwrap_err(),
            LiftError::Unsettled("$['parts'][0]".to_string())
        );
        assert_eq!(tree.to_value_lossy(), json!({"parts": [null]}));
    }

    #[tokio::test]
    async fn test_settle_replaces_deferred_values() {
        let mut tree = Tree::from(json!({"id": "abc"}));
        tree.set(&path("$.seq"), Tree::deferred(async { Ok(json!(11)) }))
            .unwrap();
        assert_eq!(
            tree.settle().await.unwrap(),
            json!({"id": "abc", "seq": 11})
        );
    }
}
