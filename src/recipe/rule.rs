use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::eval::context::ExecutionContext;
use crate::path::{self, DocPath, Selector, Store};
use crate::recipe::Entry;
use crate::transform::SharedTransform;
use crate::{LiftConfig, LiftResult, Lifter, PathError, RecipeError, RecipeResult, Tree};

pub type DstFn =
    Arc<dyn Fn(&Tree, &str, &ExecutionContext<'_>) -> LiftResult<Option<String>> + Send + Sync>;
pub type SetFn = Arc<dyn Fn(&Value, &ExecutionContext<'_>) -> LiftResult<Value> + Send + Sync>;

/// Where a rule writes.
#[derive(Clone, Default)]
pub enum Dst {
    /// Same location the value was matched at.
    #[default]
    Source,
    /// Nowhere; `via` still runs for its side effects.
    Discard,
    Path(String),
    /// Computed per match from `(value, matched path, context)`. `None`
    /// discards the match.
    Computed(DstFn),
}

#[derive(Clone)]
pub enum SetValue {
    Const(Value),
    Computed(SetFn),
}

#[derive(Clone)]
pub enum Via {
    Transform(SharedTransform),
    Recipe(Vec<Entry>),
}

/// An uncompiled rule. Build it with the chained setters and hand it to
/// [`crate::lifter`]; all consistency checks happen at compile time.
#[derive(Clone, Default)]
pub struct RuleSpec {
    pub src: Option<Vec<String>>,
    pub set: Option<SetValue>,
    pub dst: Dst,
    pub via: Option<Via>,
    pub mv: bool,
    pub clone: bool,
    pub leaf: bool,
}

/// Start a rule that matches `path`.
pub fn src(path: impl Into<String>) -> RuleSpec {
    RuleSpec::new().src(path)
}

/// Start a rule that writes a constant once per pass.
pub fn set(value: impl Into<Value>) -> RuleSpec {
    RuleSpec::new().set(value)
}

impl RuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src(mut self, path: impl Into<String>) -> Self {
        self.src.get_or_insert_with(Vec::new).push(path.into());
        self
    }

    pub fn srcs<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.src
            .get_or_insert_with(Vec::new)
            .extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn set(mut self, value: impl Into<Value>) -> Self {
        self.set = Some(SetValue::Const(value.into()));
        self
    }

    pub fn set_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &ExecutionContext<'_>) -> LiftResult<Value> + Send + Sync + 'static,
    {
        self.set = Some(SetValue::Computed(Arc::new(f)));
        self
    }

    pub fn dst(mut self, path: impl Into<String>) -> Self {
        self.dst = Dst::Path(path.into());
        self
    }

    pub fn dst_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Tree, &str, &ExecutionContext<'_>) -> LiftResult<Option<String>>
            + Send
            + Sync
            + 'static,
    {
        self.dst = Dst::Computed(Arc::new(f));
        self
    }

    pub fn discard(mut self) -> Self {
        self.dst = Dst::Discard;
        self
    }

    pub fn via(mut self, transform: SharedTransform) -> Self {
        self.via = Some(Via::Transform(transform));
        self
    }

    pub fn via_recipe<I, E>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        self.via = Some(Via::Recipe(entries.into_iter().map(Into::into).collect()));
        self
    }

    pub fn mv(mut self) -> Self {
        self.mv = true;
        self
    }

    pub fn cloned(mut self) -> Self {
        self.clone = true;
        self
    }

    pub fn leaf(mut self) -> Self {
        self.leaf = true;
        self
    }
}

#[derive(Clone)]
pub(crate) struct SourcePath {
    pub(crate) store: Store,
    pub(crate) selector: Arc<Selector>,
}

#[derive(Clone)]
pub(crate) enum Source {
    Query(Vec<SourcePath>),
    Constant(SetValue),
}

#[derive(Clone)]
pub(crate) enum Target {
    Source,
    Discard,
    Fixed { store: Store, path: DocPath },
    Computed(DstFn),
}

/// A validated rule, ready to run.
#[derive(Clone)]
pub struct Rule {
    pub(crate) source: Source,
    pub(crate) target: Target,
    pub(crate) via: Option<SharedTransform>,
    pub(crate) mv: bool,
    pub(crate) clone: bool,
    pub(crate) leaf: bool,
    pub(crate) config: Arc<LiftConfig>,
}

impl Rule {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn compile(spec: RuleSpec, config: Arc<LiftConfig>) -> RecipeResult<Self> {
        let RuleSpec {
            src,
            set,
            dst,
            via,
            mv,
            clone,
            leaf,
        } = spec;

        let via = match via {
            None => None,
            Some(Via::Transform(transform)) => Some(transform),
            Some(Via::Recipe(entries)) => {
                let nested = Lifter::with_config(entries, (*config).clone())?;
                Some(Arc::new(nested) as SharedTransform)
            }
        };

        let source = match (src, set) {
            (Some(_), Some(_)) => return Err(RecipeError::SrcAndSet),
            (None, Some(set)) => {
                if matches!(dst, Dst::Source | Dst::Discard) {
                    return Err(RecipeError::MissingDst);
                }
                Source::Constant(set)
            }
            (Some(paths), None) => Source::Query(
                paths
                    .iter()
                    .map(|p| compile_source(p, &config))
                    .collect::<RecipeResult<_>>()?,
            ),
            (None, None) => return Err(RecipeError::MissingSource),
        };

        let target = match dst {
            Dst::Source => Target::Source,
            Dst::Discard => Target::Discard,
            Dst::Path(p) => {
                let address = path::classify(&p, &config);
                let location = DocPath::parse(&address.path).map_err(|e| invalid_path(&p, e))?;
                Target::Fixed {
                    store: address.store,
                    path: location,
                }
            }
            Dst::Computed(f) => Target::Computed(f),
        };

        let rule = Self {
            source,
            target,
            via,
            mv,
            clone,
            leaf,
            config,
        };
        debug!(rule = %rule, "compiled rule");
        Ok(rule)
    }
}

fn compile_source(raw: &str, config: &LiftConfig) -> RecipeResult<SourcePath> {
    let address = path::classify(raw, config);
    let selector = Selector::parse(&address.path).map_err(|e| invalid_path(raw, e))?;
    Ok(SourcePath {
        store: address.store,
        selector: Arc::new(selector),
    })
}

fn invalid_path(raw: &str, error: PathError) -> RecipeError {
    RecipeError::InvalidPath {
        path: raw.to_string(),
        reason: error.to_string(),
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Query(paths) => {
                let shown: Vec<String> = paths
                    .iter()
                    .map(|p| match p.store {
                        Store::Local => format!("{}:{}", p.store, p.selector.source()),
                        Store::Document => p.selector.source().to_string(),
                    })
                    .collect();
                write!(f, "src={}", shown.join(","))?;
            }
            Source::Constant(_) => write!(f, "set")?,
        }
        match &self.target {
            Target::Source => {}
            Target::Discard => write!(f, " dst=false")?,
            Target::Fixed { store, path } => write!(f, " dst={}:{}", store, path)?,
            Target::Computed(_) => write!(f, " dst=<fn>")?,
        }
        if self.via.is_some() {
            write!(f, " via")?;
        }
        for (flag, name) in [(self.mv, "mv"), (self.clone, "clone"), (self.leaf, "leaf")] {
            if flag {
                write!(f, " {}", name)?;
            }
        }
        Ok(())
    }
}
