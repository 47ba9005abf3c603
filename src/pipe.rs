//! Sequential composition of lifters.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::eval::context::{ExecutionContext, Seed};
use crate::lifter::{Lift, Lifter};
use crate::transform::{Transform, TransformRegistry};
use crate::{LiftConfig, LiftError, LiftResult, Tree, recipe};

/// Lifters run in order, each stage reading the previous stage's output.
///
/// Every stage but the last starts from an empty output; the last honors the
/// caller's output seed. The context seed is visible to all stages. An empty
/// pipe returns its input unchanged.
#[derive(Clone, Default)]
pub struct Pipe {
    stages: Arc<Vec<Arc<dyn Lift>>>,
}

/// One pipe member: a single stage or a group spliced in place.
pub enum PipeMember {
    Stage(Arc<dyn Lift>),
    Group(Vec<PipeMember>),
}

impl PipeMember {
    fn flatten_into(self, stages: &mut Vec<Arc<dyn Lift>>) {
        match self {
            PipeMember::Stage(stage) => stages.push(stage),
            PipeMember::Group(members) => {
                for member in members {
                    member.flatten_into(stages);
                }
            }
        }
    }
}

impl From<Lifter> for PipeMember {
    fn from(lifter: Lifter) -> Self {
        PipeMember::Stage(Arc::new(lifter))
    }
}

impl From<Pipe> for PipeMember {
    fn from(pipe: Pipe) -> Self {
        PipeMember::Stage(Arc::new(pipe))
    }
}

impl From<Arc<dyn Lift>> for PipeMember {
    fn from(stage: Arc<dyn Lift>) -> Self {
        PipeMember::Stage(stage)
    }
}

impl<M: Into<PipeMember>> From<Vec<M>> for PipeMember {
    fn from(members: Vec<M>) -> Self {
        PipeMember::Group(members.into_iter().map(Into::into).collect())
    }
}

pub fn pipe<I, M>(members: I) -> Pipe
where
    I: IntoIterator<Item = M>,
    M: Into<PipeMember>,
{
    let mut stages = Vec::new();
    for member in members {
        member.into().flatten_into(&mut stages);
    }
    debug!(stages = stages.len(), "pipe composed");
    Pipe {
        stages: Arc::new(stages),
    }
}

impl Pipe {
    /// Build a pipe from a JSON array of recipes. Members that are not
    /// recipe arrays are rejected with their position.
    pub fn from_value(
        value: &Value,
        registry: &TransformRegistry,
        config: LiftConfig,
    ) -> LiftResult<Self> {
        let Value::Array(members) = value else {
            return Err(LiftError::InvalidPipeMember {
                index: 0,
                reason: format!("expected an array of recipes, got {}", value),
            });
        };

        let mut stages = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            if !member.is_array() {
                return Err(LiftError::InvalidPipeMember {
                    index,
                    reason: format!("expected a recipe array, got {}", member),
                });
            }
            let entries = recipe::json::from_value(member, registry)?;
            stages.push(Lifter::with_config(entries, config.clone())?);
        }
        Ok(pipe(stages))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[async_trait]
impl Lift for Pipe {
    fn lift_tree(&self, document: &Value, seed: Seed) -> LiftResult<Tree> {
        let Some((last, init)) = self.stages.split_last() else {
            return Ok(Tree::from(document));
        };
        let mut current = Cow::Borrowed(document);
        for stage in init {
            let stage_seed = Seed {
                out: Tree::Null,
                ..seed.clone()
            };
            current = Cow::Owned(stage.lift_tree(&current, stage_seed)?.into_value()?);
        }
        last.lift_tree(&current, seed)
    }

    /// Each stage is fully resolved before the next one starts.
    async fn lift_settled(&self, document: &Value, seed: Seed) -> LiftResult<Value> {
        let Some((last, init)) = self.stages.split_last() else {
            return Ok(document.clone());
        };
        let mut current = Cow::Borrowed(document);
        for stage in init {
            let stage_seed = Seed {
                out: Tree::Null,
                ..seed.clone()
            };
            current = Cow::Owned(stage.lift_settled(&current, stage_seed).await?);
        }
        last.lift_settled(&current, seed).await
    }
}

impl Transform for Pipe {
    fn apply(
        &self,
        value: Tree,
        previous: Option<&Tree>,
        context: &ExecutionContext<'_>,
    ) -> LiftResult<Tree> {
        let document = value.into_value()?;
        self.lift_tree(&document, context.fork_seed(previous.cloned().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifter::lifter;
    use crate::recipe::rule;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stage(from: &str, to: &str) -> Lifter {
        lifter([rule::src(from).dst(to)]).unwrap()
    }

    #[test]
    fn test_stages_run_in_order() {
        let p = pipe([stage("$.id", "$.ident"), stage("$.ident", "$.ID")]);
        assert_eq!(p.invoke(&json!({"id": "ABC"})).unwrap(), json!({"ID": "ABC"}));
    }

    #[test]
    fn test_groups_are_flattened() {
        let p = pipe(vec![
            PipeMember::from(stage("$.a", "$.b")),
            PipeMember::from(vec![stage("$.b", "$.c"), stage("$.c", "$.d")]),
        ]);
        assert_eq!(p.len(), 3);
        assert_eq!(p.invoke(&json!({"a": 1})).unwrap(), json!({"d": 1}));
    }

    #[test]
    fn test_empty_pipe_is_identity() {
        let p = pipe(Vec::<Lifter>::new());
        assert!(p.is_empty());
        let doc = json!({"x": [1, 2]});
        assert_eq!(p.invoke(&doc).unwrap(), doc);
    }

    #[test]
    fn test_only_last_stage_sees_out_seed() {
        let p = pipe([stage("$.id", "$.ident"), stage("$.ident", "$.ID")]);
        let out = p
            .invoke_with(&json!({"id": 1}), Some(json!({"seeded": true})), None)
            .unwrap();
        assert_eq!(out, json!({"seeded": true, "ID": 1}));
    }

    #[test]
    fn test_from_value_rejects_non_recipe_members() {
        let registry = TransformRegistry::new();
        let err = Pipe::from_value(
            &json!([[{"src": "$.a"}], {"src": "$.b"}]),
            &registry,
            LiftConfig::default(),
        )
        .err();
        assert!(matches!(
            err,
            Some(LiftError::InvalidPipeMember { index: 1, .. })
        ));

        let p = Pipe::from_value(
            &json!([[{"src": "$.a", "dst": "$.b"}], [{"src": "$.b", "dst": "$.c"}]]),
            &registry,
            LiftConfig::default(),
        )
        .unwrap();
        assert_eq!(p.invoke(&json!({"a": 5})).unwrap(), json!({"c": 5}));
    }
}

impl std::fmt::Debug for Pipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("stages", &self.stages.len())
            .finish()
    }
}
