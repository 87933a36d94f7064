// switchyard/src/pipeline/execution.rs

//! Compilation of a closed pipeline into a single callable, and the callable itself.

use crate::core::continuation::Next;
use crate::core::flow::Flow;
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::pipeline::definition::Pipeline;
use crate::space::Space;
use std::fmt;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// The reduced form of a pipeline: one continuation that runs the entry step.
///
/// Holds no framework-owned mutable state. Clone it freely and invoke it from as many
/// threads as needed; mutators attached after compilation do not affect it.
pub struct CompiledPipeline<I, F: Flow> {
  name: Arc<str>,
  entry: Next<I, F>,
}

impl<I, F: Flow> Clone for CompiledPipeline<I, F> {
  fn clone(&self) -> Self {
    Self {
      name: Arc::clone(&self.name),
      entry: self.entry.clone(),
    }
  }
}

impl<I: 'static, F: Flow> CompiledPipeline<I, F> {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn invoke(&self, input: I, signal: F::Signal) -> F::Output {
    self.entry.call(input, signal)
  }

  /// The compiled chain as a continuation, e.g. to hand it to another step.
  pub fn as_next(&self) -> Next<I, F> {
    self.entry.clone()
  }
}

impl<I: 'static, F> CompiledPipeline<I, F>
where
  F: Flow<Signal = ()>,
{
  pub fn run(&self, input: I) -> F::Output {
    self.entry.call(input, ())
  }
}

impl<I, F: Flow> fmt::Debug for CompiledPipeline<I, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompiledPipeline")
      .field("name", &self.name)
      .field("input", &std::any::type_name::<I>())
      .finish()
  }
}

impl<I: 'static, F: Flow> Pipeline<I, F> {
  /// Reduces the pipeline with the mutators currently attached to its steps.
  ///
  /// Reads the registry without changing it; every call returns an independent
  /// callable.
  #[instrument(
    name = "Pipeline::compile",
    skip_all,
    fields(pipeline = %self.def.name, steps = self.def.links.len() + 1),
    err(Display)
  )]
  pub fn compile(&self) -> SwitchyardResult<CompiledPipeline<I, F>> {
    event!(Level::DEBUG, "Pipeline compilation starting.");
    let entry = self.def.reduce()?;
    event!(Level::DEBUG, "Pipeline compiled.");
    Ok(CompiledPipeline {
      name: Arc::from(self.def.name.as_str()),
      entry,
    })
  }

  /// Runs `configure` against the pipeline's space (typically to attach mutators),
  /// then compiles.
  ///
  /// A `SwitchyardError` propagated out of `configure` is returned as is; any other
  /// error becomes `SwitchyardError::ConfigurationFailure`.
  pub fn compile_with<C>(&self, configure: C) -> SwitchyardResult<CompiledPipeline<I, F>>
  where
    C: FnOnce(&Space) -> anyhow::Result<()>,
  {
    if let Err(err) = configure(&self.space) {
      let err = SwitchyardError::from_configure(&self.def.name, err);
      event!(Level::ERROR, pipeline = %self.def.name, error = %err, "Pipeline configuration failed.");
      return Err(err);
    }
    self.compile()
  }
}
