// switchyard/src/pipeline/definition.rs

//! Contains the closed `Pipeline<I, F>`, the embeddable `OpenPipeline<I, O, F>` and the
//! `ReducedPipeStep` that marks the exit of an open pipeline.
//!
//! The user-facing handles pair a `Space` with an `Arc` of the immutable definition.
//! The `Space` itself only stores the definitions, so no reference cycle forms.

use crate::core::continuation::Next;
use crate::core::flow::Flow;
use crate::core::pipeline_trait::AnyPipeline;
use crate::core::step::StepName;
use crate::error::SwitchyardResult;
use crate::pipeline::link::{downcast_next, erase, fold_links, Link, Terminal};
use crate::space::Space;
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

// --- Definitions (what the Space stores) ---

pub(crate) struct ClosedPipelineDef<I, F: Flow> {
  pub(crate) name: String,
  pub(crate) entry: StepName,
  pub(crate) links: Vec<Arc<dyn Link>>,
  pub(crate) terminal: Arc<dyn Terminal>,
  pub(crate) _types: PhantomData<fn(I) -> F>,
}

impl<I: 'static, F: Flow> ClosedPipelineDef<I, F> {
  /// Backward fold from the terminal to the entry step.
  pub(crate) fn reduce(&self) -> SwitchyardResult<Next<I, F>> {
    let seed = self.terminal.seed()?;
    let folded = fold_links(&self.links, seed)?;
    downcast_next::<I, F>(folded, &self.entry)
  }

  pub(crate) fn describe() -> String {
    format!("Pipeline<{}, {}>", type_name::<I>(), type_name::<F>())
  }
}

impl<I: 'static, F: Flow> AnyPipeline for ClosedPipelineDef<I, F> {
  fn name(&self) -> &str {
    &self.name
  }

  fn entry_step(&self) -> &StepName {
    &self.entry
  }

  fn is_open_pipeline(&self) -> bool {
    false
  }

  fn type_description(&self) -> String {
    Self::describe()
  }

  fn step_names(&self) -> Vec<StepName> {
    self
      .links
      .iter()
      .map(|link| link.step_name().clone())
      .chain(std::iter::once(self.terminal.step_name().clone()))
      .collect()
  }

  fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
    self
  }
}

pub(crate) struct OpenPipelineDef<I, O, F: Flow> {
  pub(crate) name: String,
  pub(crate) entry: StepName,
  pub(crate) exit: StepName,
  pub(crate) links: Vec<Arc<dyn Link>>,
  pub(crate) _types: PhantomData<fn(I) -> (O, F)>,
}

impl<I: 'static, O: 'static, F: Flow> OpenPipelineDef<I, O, F> {
  /// Folds the open chain in front of `next`.
  pub(crate) fn build_handler(&self, next: Next<O, F>) -> SwitchyardResult<Next<I, F>> {
    let folded = fold_links(&self.links, erase(next))?;
    downcast_next::<I, F>(folded, &self.entry)
  }

  pub(crate) fn describe() -> String {
    format!(
      "OpenPipeline<{}, {}, {}>",
      type_name::<I>(),
      type_name::<O>(),
      type_name::<F>()
    )
  }
}

impl<I: 'static, O: 'static, F: Flow> AnyPipeline for OpenPipelineDef<I, O, F> {
  fn name(&self) -> &str {
    &self.name
  }

  fn entry_step(&self) -> &StepName {
    &self.entry
  }

  fn is_open_pipeline(&self) -> bool {
    true
  }

  fn type_description(&self) -> String {
    Self::describe()
  }

  fn step_names(&self) -> Vec<StepName> {
    self.links.iter().map(|link| link.step_name().clone()).collect()
  }

  fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
    self
  }
}

// --- Handles ---

/// A named chain from an entry step to a terminal step (`Handler`, `Fork` or `MultiFork`).
///
/// Compile it with [`Pipeline::compile`] or [`Pipeline::compile_with`].
pub struct Pipeline<I, F: Flow> {
  pub(crate) space: Space,
  pub(crate) def: Arc<ClosedPipelineDef<I, F>>,
}

impl<I, F: Flow> Clone for Pipeline<I, F> {
  fn clone(&self) -> Self {
    Self {
      space: self.space.clone(),
      def: Arc::clone(&self.def),
    }
  }
}

impl<I: 'static, F: Flow> Pipeline<I, F> {
  pub fn name(&self) -> &str {
    &self.def.name
  }

  pub fn entry_step(&self) -> &StepName {
    &self.def.entry
  }

  pub fn is_open_pipeline(&self) -> bool {
    false
  }

  pub fn step_names(&self) -> Vec<StepName> {
    self.def.step_names()
  }

  /// The registry this pipeline's steps live in.
  pub fn space(&self) -> &Space {
    &self.space
  }
}

impl<I, F: Flow> fmt::Debug for Pipeline<I, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pipeline")
      .field("name", &self.def.name)
      .field("entry", &self.def.entry)
      .field("steps", &(self.def.links.len() + 1))
      .finish()
  }
}

/// A chain without a terminal of its own, ending in a [`ReducedPipeStep`].
///
/// Open pipelines are what `If`, `IfElse` and `Switch` steps use as branches: the
/// reduction point is handed the branching step's own `next`, which is where the
/// branch rejoins the main chain.
pub struct OpenPipeline<I, O, F: Flow> {
  pub(crate) space: Space,
  pub(crate) def: Arc<OpenPipelineDef<I, O, F>>,
}

impl<I, O, F: Flow> Clone for OpenPipeline<I, O, F> {
  fn clone(&self) -> Self {
    Self {
      space: self.space.clone(),
      def: Arc::clone(&self.def),
    }
  }
}

impl<I: 'static, O: 'static, F: Flow> OpenPipeline<I, O, F> {
  pub fn name(&self) -> &str {
    &self.def.name
  }

  pub fn entry_step(&self) -> &StepName {
    &self.def.entry
  }

  pub fn is_open_pipeline(&self) -> bool {
    true
  }

  pub fn step_names(&self) -> Vec<StepName> {
    self.def.step_names()
  }

  pub fn space(&self) -> &Space {
    &self.space
  }

  pub fn reduced_step(&self) -> ReducedPipeStep<I, O, F> {
    ReducedPipeStep {
      def: Arc::clone(&self.def),
    }
  }
}

impl<I, O, F: Flow> fmt::Debug for OpenPipeline<I, O, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OpenPipeline")
      .field("name", &self.def.name)
      .field("entry", &self.def.entry)
      .field("exit", &self.def.exit)
      .finish()
  }
}

/// Exit marker of an [`OpenPipeline`].
pub struct ReducedPipeStep<I, O, F: Flow> {
  def: Arc<OpenPipelineDef<I, O, F>>,
}

impl<I: 'static, O: 'static, F: Flow> ReducedPipeStep<I, O, F> {
  pub fn name(&self) -> &StepName {
    &self.def.exit
  }

  /// Folds the whole open chain into one continuation that finishes with `next`.
  pub fn build_handler(&self, next: Next<O, F>) -> SwitchyardResult<Next<I, F>> {
    self.def.build_handler(next)
  }
}
