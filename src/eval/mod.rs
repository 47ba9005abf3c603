//! Rule Evaluation
//!
//! Evaluation runs a compiled recipe over one document. Each rule is fired in
//! order against a shared [`context::ExecutionContext`], so later rules see
//! what earlier rules wrote to the output and the local store.
//!
//! # Core Components
//!
//! ## Execution Context
//! Holds the read-only input document, the output accumulator, the local
//! scratch store and any caller parameters for one pass.
//!
//! ## Executor
//! Selects the values a rule reads: one constant for `set` rules, every
//! query match for `src` rules. Each selection gets a resolved destination.
//!
//! ## Dispatcher
//! Applies the rule's transform and writes the result, either replacing the
//! destination or appending to it for multivalue rules.
//!
//! # Evaluation Pipeline
//!
//! 1. The lifter builds a context from the document and the caller's seed
//! 2. Rules fire in recipe order
//! 3. Matches are dispatched in the order the query enumerates them
//! 4. The output accumulator is returned, possibly with deferred values

pub mod context;
pub mod dispatch;
pub mod executor;
