use tracing::debug;

use crate::eval::context::ExecutionContext;
use crate::eval::dispatch::Destination;
use crate::path::{self, DocPath, Store};
use crate::recipe::rule::{Rule, SetValue, Source, Target};
use crate::{LiftResult, Tree};

impl Rule {
    /// Run this rule once against the context.
    #[tracing::instrument(level = "debug", skip(self, context), fields(rule = %self))]
    pub(crate) fn fire(&self, context: &mut ExecutionContext<'_>) -> LiftResult<()> {
        let paths = match &self.source {
            Source::Constant(set) => {
                let value = match set {
                    SetValue::Const(v) => Tree::from(v),
                    SetValue::Computed(f) => Tree::from(f(context.document(), context)?),
                };
                let destination = self.destination(&value, &DocPath::root(), context)?;
                return self.dispatch(value, destination, context);
            }
            Source::Query(paths) => paths,
        };

        for source in paths {
            let matches: Vec<(DocPath, Tree)> = match source.store {
                Store::Document => source
                    .selector
                    .select(context.document(), self.leaf)
                    .into_iter()
                    .map(|(at, value)| (at, Tree::from(value)))
                    .collect(),
                Store::Local => {
                    // Queries run over a plain view; pending slots read as null
                    // there but are handed on as the deferred node itself.
                    let view = context.local().to_value_lossy();
                    source
                        .selector
                        .select(&view, self.leaf)
                        .into_iter()
                        .map(|(at, _)| {
                            let node = context.local().get(&at).cloned().unwrap_or_default();
                            (at, node)
                        })
                        .collect()
                }
            };
            debug!(
                store = %source.store,
                src = source.selector.source(),
                matches = matches.len(),
                "matched"
            );

            for (at, value) in matches {
                let destination = self.destination(&value, &at, context)?;
                self.dispatch(value, destination, context)?;
            }
        }
        Ok(())
    }

    fn destination(
        &self,
        value: &Tree,
        matched: &DocPath,
        context: &ExecutionContext<'_>,
    ) -> LiftResult<Destination> {
        Ok(match &self.target {
            Target::Source => Destination::At {
                store: Store::Document,
                path: matched.clone(),
            },
            Target::Discard => Destination::Discard,
            Target::Fixed { store, path } => Destination::At {
                store: *store,
                path: path.clone(),
            },
            Target::Computed(f) => match f(value, &matched.to_string(), context)? {
                None => Destination::Discard,
                Some(raw) => {
                    let address = path::classify(&raw, &self.config);
                    Destination::At {
                        store: address.store,
                        path: DocPath::parse(&address.path)?,
                    }
                }
            },
        })
    }
}
