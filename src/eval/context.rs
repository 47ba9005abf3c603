use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::path::{DocPath, Store};
use crate::{LiftError, LiftResult, OverwritePolicy, PathError, Tree};

/// Caller-supplied starting state for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub out: Tree,
    pub local: Tree,
    pub params: Arc<Map<String, Value>>,
}

impl Seed {
    pub fn with_local(local: Value) -> Self {
        Self {
            local: Tree::from(local),
            ..Self::default()
        }
    }

    /// Build a seed from the loosely-typed `(out, context)` pair of an
    /// invocation. The context object's `local` key seeds the local store;
    /// every other key becomes a read-only parameter.
    ///
    /// Rejects the `(value, index, array)` shape produced by handing a lifter
    /// straight to an array-mapping helper.
    pub fn from_call(
        document: &Value,
        out: Option<Value>,
        context: Option<Value>,
    ) -> LiftResult<Self> {
        if let (Some(Value::Number(index)), Some(Value::Array(items))) = (&out, &context) {
            let called_as_mapper = index
                .as_u64()
                .and_then(|i| items.get(i as usize))
                .is_some_and(|item| item == document);
            if called_as_mapper {
                return Err(LiftError::Misuse);
            }
        }

        let (local, params) = match context {
            None | Some(Value::Null) => (Tree::Null, Map::new()),
            Some(Value::Object(mut fields)) => {
                let local = fields.remove("local").map(Tree::from).unwrap_or_default();
                (local, fields)
            }
            Some(other) => {
                return Err(LiftError::InvalidContextSeed(format!(
                    "expected an object, got {}",
                    other
                )));
            }
        };

        Ok(Self {
            out: out.map(Tree::from).unwrap_or_default(),
            local,
            params: Arc::new(params),
        })
    }
}

/// State threaded through one traversal pass: the read-only document, the
/// output accumulator and the local scratch store.
pub struct ExecutionContext<'d> {
    document: &'d Value,
    out: Tree,
    local: Tree,
    params: Arc<Map<String, Value>>,
    written: HashSet<(Store, DocPath)>,
}

impl<'d> ExecutionContext<'d> {
    pub fn new(document: &'d Value, seed: Seed) -> Self {
        Self {
            document,
            out: seed.out,
            local: seed.local,
            params: seed.params,
            written: HashSet::new(),
        }
    }

    /// A child context for a nested recipe: new document and output, a
    /// private copy of the local store. Writes the child makes to its local
    /// store never reach this context.
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn fork<'a>(&self, document: &'a Value, out: Tree) -> ExecutionContext<'a> {
        ExecutionContext::new(document, self.fork_seed(out))
    }

    /// The seed a nested lifter or pipe starts from when invoked as a
    /// transform of this context.
    pub fn fork_seed(&self, out: Tree) -> Seed {
        Seed {
            out,
            local: self.local.clone(),
            params: self.params.clone(),
        }
    }

    pub fn document(&self) -> &'d Value {
        self.document
    }

    pub fn out(&self) -> &Tree {
        &self.out
    }

    pub fn local(&self) -> &Tree {
        &self.local
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn store(&self, store: Store) -> &Tree {
        match store {
            Store::Document => &self.out,
            Store::Local => &self.local,
        }
    }

    pub(crate) fn store_mut(&mut self, store: Store) -> &mut Tree {
        match store {
            Store::Document => &mut self.out,
            Store::Local => &mut self.local,
        }
    }

    /// Track a single-value write, failing on a repeat under `Reject`.
    pub(crate) fn record_write(
        &mut self,
        store: Store,
        path: &DocPath,
        policy: OverwritePolicy,
    ) -> LiftResult<()> {
        let first = self.written.insert((store, path.clone()));
        if !first {
            debug!(%store, %path, "destination overwritten");
            if policy == OverwritePolicy::Reject {
                return Err(PathError::DuplicateWrite(path.to_string()).into());
            }
        }
        Ok(())
    }

    pub fn into_out(self) -> Tree {
        self.out
    }
}
