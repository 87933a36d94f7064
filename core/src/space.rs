// switchyard/src/space.rs

//! Defines `Space`, the named registry every step and pipeline is registered in.
//!
//! Steps are keyed by `StepName` and pipelines by name, both stored type-erased. Typed
//! lookups check the stored kind tag first and only then downcast to the exact
//! `Step<B>`, so `IfElse` and `Fork` steps (which share a behavior shape) can never be
//! confused with each other.
//!
//! A root pipeline name is reserved by `create_pipeline` and held until the builder
//! registers the pipeline. A builder that is dropped unfinished, including one that
//! failed halfway, withdraws every step it registered and frees the name.

use crate::core::flow::Flow;
use crate::core::pipeline_trait::AnyPipeline;
use crate::core::step::{
  AnyStep, ForkFn, HandlerFn, IfElseFn, IfFn, LinearFn, MultiForkFn, Step, StepKind, StepName, SwitchFn,
};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::pipeline::builder::PipelineBuilder;
use crate::pipeline::definition::{ClosedPipelineDef, OpenPipeline, OpenPipelineDef, Pipeline};
use parking_lot::{Mutex, RwLock};
use std::any::type_name;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

#[derive(Default)]
struct SpaceInner {
  steps: RwLock<HashMap<StepName, Arc<dyn AnyStep>>>,
  pipelines: RwLock<HashMap<String, Arc<dyn AnyPipeline>>>,
  /// Names held by root builders that have not registered their pipeline yet.
  pending: Mutex<HashSet<String>>,
}

/// Shared registry of steps and pipelines. Built pipelines and their steps are never
/// removed.
///
/// Cloning a `Space` yields another handle to the same registry. Two spaces created
/// with [`Space::new`] never see each other's steps or mutators.
#[derive(Clone, Default)]
pub struct Space {
  inner: Arc<SpaceInner>,
}

/// Exclusive claim on a root pipeline name, held by its builder.
pub(crate) struct PipelineReservation {
  space: Space,
  name: String,
  finished: bool,
}

impl PipelineReservation {
  pub(crate) fn name(&self) -> &str {
    &self.name
  }

  /// Releases the claim once the pipeline itself is registered under the name.
  pub(crate) fn finish(mut self) {
    self.finished = true;
    self.space.inner.pending.lock().remove(&self.name);
  }
}

impl Drop for PipelineReservation {
  fn drop(&mut self) {
    if !self.finished {
      self.space.withdraw(&self.name);
    }
  }
}

enum Lookup<T> {
  Found(T),
  Missing,
  Mismatch { actual: String },
}

fn describe_step(kind: StepKind, behavior: &str) -> String {
  format!("{:?} step ({})", kind, behavior)
}

macro_rules! typed_step_lookup {
  ($(#[$doc:meta])* $get:ident, $required:ident, $kind:ident, $alias:ident<$($t:ident),+>) => {
    $(#[$doc])*
    pub fn $get<$($t: 'static,)+ F: Flow>(&self, pipeline: &str, step: &str) -> Option<Arc<Step<$alias<$($t,)+ F>>>> {
      match self.find_step::<$alias<$($t,)+ F>>(&StepName::new(pipeline, step), StepKind::$kind) {
        Lookup::Found(step) => Some(step),
        Lookup::Missing | Lookup::Mismatch { .. } => None,
      }
    }

    pub fn $required<$($t: 'static,)+ F: Flow>(
      &self,
      pipeline: &str,
      step: &str,
    ) -> SwitchyardResult<Arc<Step<$alias<$($t,)+ F>>>> {
      self.require_step::<$alias<$($t,)+ F>>(StepName::new(pipeline, step), StepKind::$kind)
    }
  };
}

impl Space {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts a root pipeline. Its steps register as they are added; the pipeline itself
  /// registers when the builder is terminated.
  ///
  /// Fails with `PipelineWithNameAlreadyExists` if the name belongs to a registered
  /// pipeline or to another builder still in progress.
  pub fn create_pipeline<I: 'static, F: Flow>(
    &self,
    name: impl Into<String>,
  ) -> SwitchyardResult<PipelineBuilder<I, I, F>> {
    let reservation = self.reserve(name.into())?;
    Ok(PipelineBuilder::root(self.clone(), reservation))
  }

  fn reserve(&self, name: String) -> SwitchyardResult<PipelineReservation> {
    let mut pending = self.inner.pending.lock();
    if pending.contains(&name) || self.inner.pipelines.read().contains_key(&name) {
      event!(Level::ERROR, pipeline = %name, "Pipeline name already taken.");
      return Err(SwitchyardError::PipelineWithNameAlreadyExists { pipeline: name });
    }
    pending.insert(name.clone());
    Ok(PipelineReservation {
      space: self.clone(),
      name,
      finished: false,
    })
  }

  /// Drops the steps of an unfinished pipeline, then frees its name.
  fn withdraw(&self, pipeline: &str) {
    let withdrawn = {
      let mut steps = self.inner.steps.write();
      let before = steps.len();
      steps.retain(|name, _| name.pipeline != pipeline);
      before - steps.len()
    };
    self.inner.pending.lock().remove(pipeline);
    event!(Level::DEBUG, %pipeline, withdrawn, "Unfinished pipeline withdrawn.");
  }

  pub(crate) fn add_step(&self, step: Arc<dyn AnyStep>) -> SwitchyardResult<()> {
    let mut steps = self.inner.steps.write();
    if steps.contains_key(step.name()) {
      event!(Level::ERROR, step = %step.name(), "Step name already registered.");
      return Err(SwitchyardError::StepWithNameAlreadyExists {
        step: step.name().clone(),
      });
    }
    event!(Level::DEBUG, step = %step.name(), kind = ?step.kind(), "Step registered.");
    steps.insert(step.name().clone(), step);
    Ok(())
  }

  pub(crate) fn add_pipeline(&self, pipeline: Arc<dyn AnyPipeline>) -> SwitchyardResult<()> {
    let mut pipelines = self.inner.pipelines.write();
    if pipelines.contains_key(pipeline.name()) {
      event!(Level::ERROR, pipeline = %pipeline.name(), "Pipeline name already registered.");
      return Err(SwitchyardError::PipelineWithNameAlreadyExists {
        pipeline: pipeline.name().to_string(),
      });
    }
    event!(
      Level::DEBUG,
      pipeline = %pipeline.name(),
      open = pipeline.is_open_pipeline(),
      "Pipeline registered."
    );
    pipelines.insert(pipeline.name().to_string(), pipeline);
    Ok(())
  }

  pub(crate) fn same_as(&self, other: &Space) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  // --- Steps ---

  pub fn get_step(&self, pipeline: &str, step: &str) -> Option<Arc<dyn AnyStep>> {
    self.inner.steps.read().get(&StepName::new(pipeline, step)).cloned()
  }

  pub fn get_required_step(&self, pipeline: &str, step: &str) -> SwitchyardResult<Arc<dyn AnyStep>> {
    let name = StepName::new(pipeline, step);
    self.inner.steps.read().get(&name).cloned().ok_or_else(|| {
      event!(Level::ERROR, step = %name, "Step lookup failed.");
      SwitchyardError::StepNotFound { step: name }
    })
  }

  fn find_step<B>(&self, name: &StepName, kind: StepKind) -> Lookup<Arc<Step<B>>>
  where
    B: Clone + Send + Sync + 'static,
  {
    let erased = match self.inner.steps.read().get(name) {
      Some(step) => Arc::clone(step),
      None => return Lookup::Missing,
    };
    let actual = describe_step(erased.kind(), erased.behavior_type());
    if erased.kind() != kind {
      return Lookup::Mismatch { actual };
    }
    match erased.as_any_arc().downcast::<Step<B>>() {
      Ok(step) => Lookup::Found(step),
      Err(_) => Lookup::Mismatch { actual },
    }
  }

  fn require_step<B>(&self, name: StepName, kind: StepKind) -> SwitchyardResult<Arc<Step<B>>>
  where
    B: Clone + Send + Sync + 'static,
  {
    match self.find_step::<B>(&name, kind) {
      Lookup::Found(step) => Ok(step),
      Lookup::Missing => {
        event!(Level::ERROR, step = %name, "Step lookup failed.");
        Err(SwitchyardError::StepNotFound { step: name })
      }
      Lookup::Mismatch { actual } => {
        let expected = describe_step(kind, type_name::<B>());
        event!(Level::ERROR, step = %name, %expected, %actual, "Step has an unexpected type.");
        Err(SwitchyardError::UnexpectedStepType {
          step: name,
          expected,
          actual,
        })
      }
    }
  }

  typed_step_lookup!(
    /// `None` when the step is absent, is not a linear step, or differs in `I`, `O` or `F`.
    get_linear_step, get_required_linear_step, Linear, LinearFn<I, O>
  );
  typed_step_lookup!(get_handler_step, get_required_handler_step, Handler, HandlerFn<I>);
  typed_step_lookup!(get_if_step, get_required_if_step, If, IfFn<I, B, O>);
  typed_step_lookup!(get_if_else_step, get_required_if_else_step, IfElse, IfElseFn<I, T, E>);
  typed_step_lookup!(get_switch_step, get_required_switch_step, Switch, SwitchFn<I, S, D>);
  typed_step_lookup!(get_fork_step, get_required_fork_step, Fork, ForkFn<I, A, B>);
  typed_step_lookup!(
    get_multi_fork_step,
    get_required_multi_fork_step,
    MultiFork,
    MultiForkFn<I, M, D>
  );

  // --- Pipelines ---

  pub fn get_pipeline(&self, name: &str) -> Option<Arc<dyn AnyPipeline>> {
    self.inner.pipelines.read().get(name).cloned()
  }

  pub fn get_required_pipeline(&self, name: &str) -> SwitchyardResult<Arc<dyn AnyPipeline>> {
    self.get_pipeline(name).ok_or_else(|| {
      event!(Level::ERROR, pipeline = %name, "Pipeline lookup failed.");
      SwitchyardError::PipelineNotFound {
        pipeline: name.to_string(),
      }
    })
  }

  fn find_pipeline<D: AnyPipeline>(&self, name: &str) -> Lookup<Arc<D>> {
    let Some(erased) = self.get_pipeline(name) else {
      return Lookup::Missing;
    };
    let actual = erased.type_description();
    match erased.as_any_arc().downcast::<D>() {
      Ok(def) => Lookup::Found(def),
      Err(_) => Lookup::Mismatch { actual },
    }
  }

  fn require_pipeline<D: AnyPipeline>(&self, name: &str, expected: String) -> SwitchyardResult<Arc<D>> {
    match self.find_pipeline::<D>(name) {
      Lookup::Found(def) => Ok(def),
      Lookup::Missing => {
        event!(Level::ERROR, pipeline = %name, "Pipeline lookup failed.");
        Err(SwitchyardError::PipelineNotFound {
          pipeline: name.to_string(),
        })
      }
      Lookup::Mismatch { actual } => {
        event!(Level::ERROR, pipeline = %name, %expected, %actual, "Pipeline has an unexpected type.");
        Err(SwitchyardError::UnexpectedPipelineType {
          pipeline: name.to_string(),
          expected,
          actual,
        })
      }
    }
  }

  pub fn get_closed_pipeline<I: 'static, F: Flow>(&self, name: &str) -> Option<Pipeline<I, F>> {
    match self.find_pipeline::<ClosedPipelineDef<I, F>>(name) {
      Lookup::Found(def) => Some(Pipeline {
        space: self.clone(),
        def,
      }),
      Lookup::Missing | Lookup::Mismatch { .. } => None,
    }
  }

  pub fn get_required_closed_pipeline<I: 'static, F: Flow>(&self, name: &str) -> SwitchyardResult<Pipeline<I, F>> {
    let def = self.require_pipeline::<ClosedPipelineDef<I, F>>(name, ClosedPipelineDef::<I, F>::describe())?;
    Ok(Pipeline {
      space: self.clone(),
      def,
    })
  }

  pub fn get_open_pipeline<I: 'static, O: 'static, F: Flow>(&self, name: &str) -> Option<OpenPipeline<I, O, F>> {
    match self.find_pipeline::<OpenPipelineDef<I, O, F>>(name) {
      Lookup::Found(def) => Some(OpenPipeline {
        space: self.clone(),
        def,
      }),
      Lookup::Missing | Lookup::Mismatch { .. } => None,
    }
  }

  pub fn get_required_open_pipeline<I: 'static, O: 'static, F: Flow>(
    &self,
    name: &str,
  ) -> SwitchyardResult<OpenPipeline<I, O, F>> {
    let def = self.require_pipeline::<OpenPipelineDef<I, O, F>>(name, OpenPipelineDef::<I, O, F>::describe())?;
    Ok(OpenPipeline {
      space: self.clone(),
      def,
    })
  }

  // --- Inspection ---

  /// Registered pipeline names, sorted.
  pub fn pipeline_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.inner.pipelines.read().keys().cloned().collect();
    names.sort();
    names
  }

  /// Every registered step of `pipeline`, branch steps included, sorted.
  pub fn step_names(&self, pipeline: &str) -> Vec<StepName> {
    let mut names: Vec<StepName> = self
      .inner
      .steps
      .read()
      .keys()
      .filter(|name| name.pipeline == pipeline)
      .cloned()
      .collect();
    names.sort();
    names
  }

  pub fn contains_step(&self, pipeline: &str, step: &str) -> bool {
    self.inner.steps.read().contains_key(&StepName::new(pipeline, step))
  }

  pub fn contains_pipeline(&self, name: &str) -> bool {
    self.inner.pipelines.read().contains_key(name)
  }
}

impl fmt::Debug for Space {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Space")
      .field("pipelines", &self.pipeline_names())
      .field("steps", &self.inner.steps.read().len())
      .finish()
  }
}
