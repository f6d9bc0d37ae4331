// medcart/src/pipeline/mod.rs

//! A small async step pipeline.
//!
//! Multi-step workflows (adding to a cart, checking out) are declared as an
//! ordered list of named steps. Handlers attach to a step's `before`, `on` or
//! `after` phase and share state through [`ContextData`].

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline, StepDef};
