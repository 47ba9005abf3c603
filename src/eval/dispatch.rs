use tracing::{debug, warn};

use crate::eval::context::ExecutionContext;
use crate::path::{DocPath, Store};
use crate::recipe::Rule;
use crate::{LiftResult, PathError, Tree};

/// A destination after `dst` has been evaluated for one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Discard,
    At { store: Store, path: DocPath },
}

impl Rule {
    /// Transform `value` and write it to `destination`.
    #[tracing::instrument(level = "debug", skip(self, value, context), fields(rule = %self))]
    pub(crate) fn dispatch(
        &self,
        value: Tree,
        destination: Destination,
        context: &mut ExecutionContext<'_>,
    ) -> LiftResult<()> {
        let (store, path) = match destination {
            Destination::Discard => {
                if let Some(via) = &self.via {
                    let result = via.apply(value, None, context)?;
                    if !result.is_settled() {
                        warn!("deferred result of a side-effect-only rule is dropped unpolled");
                    }
                }
                return Ok(());
            }
            Destination::At { store, path } => (store, path),
        };

        if self.mv && path.is_root() {
            return Err(PathError::AppendAtRoot(store.to_string()).into());
        }

        let value = match &self.via {
            Some(via) => {
                let previous = if self.mv {
                    None
                } else {
                    context.store(store).get(&path)
                };
                via.apply(value, previous, context)?
            }
            None => value,
        };

        debug!(%store, %path, mv = self.mv, "write");
        if self.mv {
            context.store_mut(store).push(&path, value)
        } else {
            context.record_write(store, &path, self.config.overwrite)?;
            context.store_mut(store).set(&path, value)
        }
    }
}
