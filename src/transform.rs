//! Transforms applied to matched values before they are written.
//!
//! A rule's `via` is resolved once, at compile time, into an
//! `Arc<dyn Transform>`: a plain function, an async function, a nested
//! recipe (compiled into a [`crate::Lifter`]) or a [`crate::Pipe`].

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::eval::context::ExecutionContext;
use crate::{LiftError, LiftResult, Tree};

pub trait Transform: Send + Sync {
    /// Produce the value to write. `previous` is the value currently stored
    /// at the destination; it is always `None` for multivalue rules.
    fn apply(
        &self,
        value: Tree,
        previous: Option<&Tree>,
        context: &ExecutionContext<'_>,
    ) -> LiftResult<Tree>;
}

pub type SharedTransform = Arc<dyn Transform>;

/// Synchronous function transform. Fails with `Unsettled` when handed a value
/// that still contains deferred parts.
pub struct FnTransform<F>(F);

impl<F> Transform for FnTransform<F>
where
    F: Fn(Value, Option<Value>, &ExecutionContext<'_>) -> LiftResult<Value> + Send + Sync,
{
    fn apply(
        &self,
        value: Tree,
        previous: Option<&Tree>,
        context: &ExecutionContext<'_>,
    ) -> LiftResult<Tree> {
        let value = value.into_value()?;
        let previous = previous.cloned().map(Tree::into_value).transpose()?;
        (self.0)(value, previous, context).map(Tree::from)
    }
}

/// Asynchronous function transform. The result is left in the output as a
/// deferred value; pending inputs are awaited before the function runs.
pub struct AsyncFnTransform<F>(Arc<F>);

impl<F, Fut> Transform for AsyncFnTransform<F>
where
    F: Fn(Value, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LiftResult<Value>> + Send + 'static,
{
    fn apply(
        &self,
        value: Tree,
        previous: Option<&Tree>,
        _context: &ExecutionContext<'_>,
    ) -> LiftResult<Tree> {
        let f = self.0.clone();
        let previous = previous.cloned();
        Ok(Tree::deferred(async move {
            let value = value.settle().await?;
            let previous = match previous {
                Some(previous) => Some(previous.settle().await?),
                None => None,
            };
            f(value, previous).await
        }))
    }
}

/// `(value, previous, context) -> value`
pub fn func<F>(f: F) -> SharedTransform
where
    F: Fn(Value, Option<Value>, &ExecutionContext<'_>) -> LiftResult<Value> + Send + Sync + 'static,
{
    Arc::new(FnTransform(f))
}

/// `value -> value`
pub fn map<F>(f: F) -> SharedTransform
where
    F: Fn(Value) -> LiftResult<Value> + Send + Sync + 'static,
{
    func(move |value: Value, _: Option<Value>, _: &ExecutionContext<'_>| f(value))
}

/// `(value, previous) -> future of value`
pub fn async_fn<F, Fut>(f: F) -> SharedTransform
where
    F: Fn(Value, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LiftResult<Value>> + Send + 'static,
{
    Arc::new(AsyncFnTransform(Arc::new(f)))
}

/// `value -> future of value`
pub fn async_map<F, Fut>(f: F) -> SharedTransform
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LiftResult<Value>> + Send + 'static,
{
    async_fn(move |value: Value, _: Option<Value>| f(value))
}

/// Named transforms available to declarative (JSON) recipes.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: Arc<DashMap<String, SharedTransform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, transform: SharedTransform) -> &Self {
        self.transforms.insert(name.into(), transform);
        self
    }

    pub fn get(&self, name: &str) -> Option<SharedTransform> {
        self.transforms.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// A registry preloaded with a few string and number helpers.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry
            .register("lowercase", map(|v| string_op(v, |s| s.to_lowercase())))
            .register("uppercase", map(|v| string_op(v, |s| s.to_uppercase())))
            .register("trim", map(|v| string_op(v, |s| s.trim().to_string())))
            .register("number", map(to_number))
            .register("string", map(to_string));
        registry
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.transforms.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}

fn string_op(value: Value, op: impl Fn(&str) -> String) -> LiftResult<Value> {
    match value {
        Value::String(s) => Ok(Value::String(op(&s))),
        other => Err(LiftError::transform(format!(
            "expected a string, got {}",
            other
        ))),
    }
}

fn to_number(value: Value) -> LiftResult<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(n)),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::from(i));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| LiftError::transform(format!("'{}' is not a number", s)))
        }
        Value::Bool(b) => Ok(Value::from(b as i64)),
        other => Err(LiftError::transform(format!(
            "can't convert {} to a number",
            other
        ))),
    }
}

fn to_string(value: Value) -> LiftResult<Value> {
    Ok(match value {
        Value::String(s) => Value::String(s),
        other => Value::String(other.to_string()),
    })
}
