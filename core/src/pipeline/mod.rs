// switchyard/src/pipeline/mod.rs

//! Pipelines: their definitions, the fluent builder that produces them, and their
//! compilation into a single callable.

pub mod builder;
pub mod definition;
pub mod execution;
pub(crate) mod link;

pub use builder::{ClosedBuilder, PipelineBuilder, SwitchCases};
pub use definition::{OpenPipeline, Pipeline, ReducedPipeStep};
pub use execution::CompiledPipeline;
