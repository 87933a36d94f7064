// switchyard/src/core/pipeline_trait.rs

//! Defines the `AnyPipeline` trait, the type-erased view under which the `Space`
//! stores closed and open pipelines of any input/flow combination.

use crate::core::step::StepName;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased pipeline definition.
///
/// Typed access goes through `Space::get_closed_pipeline` / `Space::get_open_pipeline`,
/// which downcast `as_any_arc` back to the concrete definition.
pub trait AnyPipeline: Send + Sync + 'static {
  fn name(&self) -> &str;

  fn entry_step(&self) -> &StepName;

  /// `true` for pipelines ending in a reduction point instead of a terminal step.
  fn is_open_pipeline(&self) -> bool;

  /// Human readable signature, e.g. `Pipeline<alloc::string::String, Blocking<i32>>`.
  fn type_description(&self) -> String;

  /// Steps of the main chain, entry first. Branch internals are not included.
  fn step_names(&self) -> Vec<StepName>;

  fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl fmt::Debug for dyn AnyPipeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AnyPipeline")
      .field("name", &self.name())
      .field("open", &self.is_open_pipeline())
      .finish()
  }
}
