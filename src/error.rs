use thiserror::Error;

/// Rejections raised while compiling a recipe, before any document is seen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipeError {
    #[error("Unknown properties in rule: {}", .0.join(", "))]
    UnknownFields(Vec<String>),
    #[error("Can't have src and set")]
    SrcAndSet,
    #[error("No dst for set")]
    MissingDst,
    #[error("Missing src / set")]
    MissingSource,
    #[error("via must be a function or a recipe array, got {0}")]
    InvalidTransform(String),
    #[error("No transform registered as '{0}'")]
    UnknownTransform(String),
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("Malformed recipe: {0}")]
    Malformed(String),
    #[error("Failed to read recipe: {0}")]
    Io(String),
}

/// Failures surfaced while reading or writing through a path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Malformed path '{path}': {reason}")]
    Malformed { path: String, reason: String },
    #[error("Path '{0}' does not address a single location")]
    NotSingular(String),
    #[error("Can't append to the root of the {0} store")]
    AppendAtRoot(String),
    #[error("Type conflict at {path}: expected {expected}, found {found}")]
    TypeConflict {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Destination {0} written twice in one pass")]
    DuplicateWrite(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiftError {
    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("All pipe members must be lifters (member {index}: {reason})")]
    InvalidPipeMember { index: usize, reason: String },
    #[error("Lifter called with the (value, index, array) mapping convention; use as_mapper()")]
    Misuse,
    #[error("Invalid context seed: {0}")]
    InvalidContextSeed(String),
    #[error("Value at {0} is still pending; use an async invocation")]
    Unsettled(String),
    #[error("Transform failed: {0}")]
    Transform(String),
    #[error("Config error: {0}")]
    Config(String),
}

pub type LiftResult<T> = Result<T, LiftError>;
pub type RecipeResult<T> = Result<T, RecipeError>;

impl LiftError {
    pub fn transform<S: Into<String>>(message: S) -> Self {
        LiftError::Transform(message.into())
    }

    pub fn unsettled<S: Into<String>>(location: S) -> Self {
        LiftError::Unsettled(location.into())
    }
}
