//! Deep resolution of deferred values.
//!
//! [`resolve_deep`] walks any tree that implements [`Settle`], starts waiting
//! on every pending slot it finds, and patches each slot in place once its
//! value arrives. All pending slots are awaited concurrently; the call returns
//! when the last one has settled, or with the first failure.
//!
//! The walk never looks inside a pending slot and never creates new work of
//! its own: it only awaits and patches. Settled nodes are left exactly where
//! they are.

use futures::future::{BoxFuture, try_join_all};
use tracing::trace;

/// A tree whose nodes may be pending.
pub trait Settle {
    type Settled;
    type Error;

    /// The computation behind this node, if it is pending.
    fn take_pending(&mut self) -> Option<BoxFuture<'static, Result<Self::Settled, Self::Error>>>;

    /// Child slots to search when this node is not pending.
    fn children_mut(&mut self) -> Vec<&mut Self>;

    /// Replace this node with its settled value.
    fn patch(&mut self, settled: Self::Settled);
}

pub async fn resolve_deep<T: Settle>(root: &mut T) -> Result<(), T::Error> {
    let mut waiting = Vec::new();
    let mut stack: Vec<&mut T> = vec![root];

    while let Some(node) = stack.pop() {
        if let Some(pending) = node.take_pending() {
            waiting.push(async move {
                let settled = pending.await?;
                node.patch(settled);
                Ok::<(), T::Error>(())
            });
            continue;
        }
        stack.extend(node.children_mut());
    }

    trace!(pending = waiting.len(), "resolving deferred values");
    try_join_all(waiting).await?;
    Ok(())
}
