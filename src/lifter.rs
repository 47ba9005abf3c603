//! Compiled recipes and the invocation surface shared with pipes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::eval::context::{ExecutionContext, Seed};
use crate::recipe::{Entry, Rule};
use crate::transform::Transform;
use crate::{LiftConfig, LiftResult, RecipeResult, Tree};

/// Anything that turns one document into another: a [`Lifter`] or a
/// [`crate::Pipe`].
///
/// Implementors provide [`Lift::lift_tree`]; the invocation helpers are
/// layered on top of it.
#[async_trait]
pub trait Lift: Send + Sync {
    /// One pass over `document`. The result may still hold deferred values.
    fn lift_tree(&self, document: &Value, seed: Seed) -> LiftResult<Tree>;

    /// One pass followed by deep resolution of every deferred value.
    async fn lift_settled(&self, document: &Value, seed: Seed) -> LiftResult<Value> {
        self.lift_tree(document, seed)?.settle().await
    }

    fn invoke(&self, document: &Value) -> LiftResult<Value> {
        self.invoke_with(document, None, None)
    }

    /// Invoke with an optional output seed and context seed. Fails with
    /// `Unsettled` if an async transform left a deferred value behind.
    fn invoke_with(
        &self,
        document: &Value,
        out: Option<Value>,
        context: Option<Value>,
    ) -> LiftResult<Value> {
        let seed = Seed::from_call(document, out, context)?;
        let tree = self.lift_tree(document, seed)?;
        if !tree.is_settled() {
            warn!("synchronous invocation produced deferred values");
        }
        tree.into_value()
    }

    async fn invoke_async(&self, document: &Value) -> LiftResult<Value> {
        self.invoke_async_with(document, None, None).await
    }

    async fn invoke_async_with(
        &self,
        document: &Value,
        out: Option<Value>,
        context: Option<Value>,
    ) -> LiftResult<Value> {
        let seed = Seed::from_call(document, out, context)?;
        self.lift_settled(document, seed).await
    }

    /// A one-argument adapter for iterator `map` and friends.
    fn as_mapper(&self) -> Box<dyn Fn(&Value) -> LiftResult<Value> + Send + Sync + '_> {
        Box::new(move |document: &Value| self.invoke(document))
    }
}

/// A compiled recipe.
///
/// Cloning is cheap and clones share their rules. [`Lifter::add`] never
/// changes rules seen by earlier clones.
#[derive(Clone)]
pub struct Lifter {
    rules: Arc<Vec<Rule>>,
    config: Arc<LiftConfig>,
}

/// Compile `entries` with the default configuration.
pub fn lifter<I, E>(entries: I) -> RecipeResult<Lifter>
where
    I: IntoIterator<Item = E>,
    E: Into<Entry>,
{
    Lifter::with_config(entries, LiftConfig::default())
}

impl Lifter {
    pub fn with_config<I, E>(entries: I, config: LiftConfig) -> RecipeResult<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let mut lifter = Self {
            rules: Arc::new(Vec::new()),
            config: Arc::new(config),
        };
        lifter.add(entries)?;
        Ok(lifter)
    }

    /// Compile and append more rules. On error nothing is added.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn add<I, E>(&mut self, entries: I) -> RecipeResult<&mut Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let mut specs = Vec::new();
        for entry in entries {
            entry.into().flatten_into(&mut specs);
        }
        let compiled = specs
            .into_iter()
            .map(|spec| Rule::compile(spec, self.config.clone()))
            .collect::<RecipeResult<Vec<_>>>()?;
        debug!(added = compiled.len(), "rules compiled");
        Arc::make_mut(&mut self.rules).extend(compiled);
        Ok(self)
    }

    pub fn config(&self) -> &LiftConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(rules = self.rules.len()))]
    fn run(&self, context: &mut ExecutionContext<'_>) -> LiftResult<()> {
        for rule in self.rules.iter() {
            rule.fire(context)?;
        }
        Ok(())
    }
}

impl Lift for Lifter {
    fn lift_tree(&self, document: &Value, seed: Seed) -> LiftResult<Tree> {
        let mut context = ExecutionContext::new(document, seed);
        self.run(&mut context)?;
        Ok(context.into_out())
    }
}

/// A lifter used as a transform runs over the matched value in a forked
/// context, starting from the previous value at the destination.
impl Transform for Lifter {
    fn apply(
        &self,
        value: Tree,
        previous: Option<&Tree>,
        context: &ExecutionContext<'_>,
    ) -> LiftResult<Tree> {
        let document = value.into_value()?;
        let mut child = context.fork(&document, previous.cloned().unwrap_or_default());
        self.run(&mut child)?;
        Ok(child.into_out())
    }
}

impl std::fmt::Debug for Lifter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rules: Vec<String> = self.rules.iter().map(ToString::to_string).collect();
        f.debug_struct("Lifter")
            .field("rules", &rules)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::rule;
    use crate::{LiftError, RecipeError, recipe};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_add_is_copy_on_write() {
        let mut base = lifter([rule::src("$.id").dst("$.ident")]).unwrap();
        let snapshot = base.clone();
        base.add([rule::set("Foo").dst("$.kind")]).unwrap();

        let doc = json!({"id": "001"});
        assert_eq!(base.len(), 2);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            base.invoke(&doc).unwrap(),
            json!({"ident": "001", "kind": "Foo"})
        );
        assert_eq!(snapshot.invoke(&doc).unwrap(), json!({"ident": "001"}));
    }

    #[test]
    fn test_failed_add_leaves_rules_alone() {
        let mut lift = lifter([rule::src("$.id")]).unwrap();
        let err = lift
            .add(recipe![rule::src("$.a"), rule::RuleSpec::new()])
            .err();
        assert_eq!(err, Some(RecipeError::MissingSource));
        assert_eq!(lift.len(), 1);
    }

    #[test]
    fn test_empty_lifter_returns_null() {
        let lift = lifter(recipe![]).unwrap();
        assert!(lift.is_empty());
        assert_eq!(lift.invoke(&json!({"a": 1})).unwrap(), Value::Null);
    }

    #[test]
    fn test_out_seed_is_extended() {
        let lift = lifter([rule::src("$.id").dst("$.ident")]).unwrap();
        let out = lift
            .invoke_with(&json!({"id": 7}), Some(json!({"kept": true})), None)
            .unwrap();
        assert_eq!(out, json!({"kept": true, "ident": 7}));
    }

    #[test]
    fn test_mapper_avoids_misuse_guard() {
        let lift = lifter([rule::src("$.id").dst("$.ident")]).unwrap();
        let docs = vec![json!({"id": "001"}), json!({"id": "002"})];

        let err = lift
            .invoke_with(&docs[1], Some(json!(1)), Some(Value::Array(docs.clone())))
            .unwrap_err();
        assert_eq!(err, LiftError::Misuse);

        let mapped: LiftResult<Vec<Value>> = docs.iter().map(lift.as_mapper()).collect();
        assert_eq!(
            mapped.unwrap(),
            vec![json!({"ident": "001"}), json!({"ident": "002"})]
        );
    }

    #[test]
    fn test_debug_lists_rules() {
        let lift = lifter([rule::src("$.id").dst("$.ident")]).unwrap();
        let shown = format!("{:?}", lift);
        assert!(shown.contains("src=$.id dst=document:$['ident']"));
    }
}
