// switchyard/src/pipeline/builder.rs

//! The fluent builder.
//!
//! `PipelineBuilder<I, C, F>` tracks the pipeline input `I` and the type `C` the next
//! step will receive. Every verb registers its step in the `Space` right away and
//! fails fast on duplicate names or structural misuse. A builder ends either in a
//! terminal verb (`handle_with`, `then_fork`, `then_multi_fork`) followed by
//! `build_pipeline`, or in `build_open_pipeline`.
//!
//! A root builder holds its pipeline name from `Space::create_pipeline` on. If it is
//! dropped before the pipeline is registered, for example because a verb failed, the
//! steps it already registered are withdrawn again.
//!
//! Branches of `If`, `IfElse` and `Switch` steps are described by closures that receive
//! a fresh branch builder. Branch builders namespace their steps under the parent
//! pipeline and are never registered as pipelines of their own.

use crate::conditional::branch::{IfElseLink, IfLink, SwitchLink};
use crate::conditional::fork::{ForkLink, MultiForkLink};
use crate::core::continuation::{Cases, Next};
use crate::core::flow::Flow;
use crate::core::pipeline_trait::AnyPipeline;
use crate::core::step::{
  AnyStep, ForkFn, HandlerFn, IfElseFn, IfFn, LinearFn, MultiForkFn, Step, StepKind, StepName, SwitchFn,
};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::pipeline::definition::{ClosedPipelineDef, OpenPipeline, OpenPipelineDef, Pipeline};
use crate::pipeline::link::{HandlerLink, LinearLink, Link, Terminal};
use crate::space::{PipelineReservation, Space};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildScope {
  /// Created by `Space::create_pipeline`; registers the finished pipeline.
  Root,
  /// Created for a branch of an `If`/`IfElse`/`Switch` step.
  Branch,
}

pub struct PipelineBuilder<I, C, F: Flow> {
  space: Space,
  pipeline: String,
  scope: BuildScope,
  entry: Option<StepName>,
  links: Vec<Arc<dyn Link>>,
  reservation: Option<PipelineReservation>,
  _types: PhantomData<fn(I) -> (C, F)>,
}

impl<I: 'static, F: Flow> PipelineBuilder<I, I, F> {
  pub(crate) fn root(space: Space, reservation: PipelineReservation) -> Self {
    let pipeline = reservation.name().to_string();
    event!(Level::DEBUG, %pipeline, "Pipeline builder created.");
    Self::empty(space, pipeline, BuildScope::Root, Some(reservation))
  }

  fn branch(space: Space, pipeline: String) -> Self {
    Self::empty(space, pipeline, BuildScope::Branch, None)
  }

  fn empty(space: Space, pipeline: String, scope: BuildScope, reservation: Option<PipelineReservation>) -> Self {
    Self {
      space,
      pipeline,
      scope,
      entry: None,
      links: Vec::new(),
      reservation,
      _types: PhantomData,
    }
  }

  // --- Entry verbs ---

  pub fn start_with_linear<O: 'static>(
    self,
    name: &str,
    behavior: impl Fn(I, F::Signal, Next<O, F>) -> F::Output + Send + Sync + 'static,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    self.ensure_not_started("start_with_linear")?;
    self.linear(name, behavior)
  }

  pub fn start_with_if<B: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(I, F::Signal, Next<B, F>, Next<O, F>) -> F::Output + Send + Sync + 'static,
    branch: impl FnOnce(PipelineBuilder<B, B, F>) -> SwitchyardResult<OpenPipeline<B, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    self.ensure_not_started("start_with_if")?;
    self.if_step(name, selector, branch)
  }

  pub fn start_with_if_else<T: 'static, E: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(I, F::Signal, Next<T, F>, Next<E, F>) -> F::Output + Send + Sync + 'static,
    if_branch: impl FnOnce(PipelineBuilder<T, T, F>) -> SwitchyardResult<OpenPipeline<T, O, F>>,
    else_branch: impl FnOnce(PipelineBuilder<E, E, F>) -> SwitchyardResult<OpenPipeline<E, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    self.ensure_not_started("start_with_if_else")?;
    self.if_else_step(name, selector, if_branch, else_branch)
  }

  pub fn start_with_switch<S: 'static, D: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(I, F::Signal, Cases<S, F>, Next<D, F>) -> F::Output + Send + Sync + 'static,
    cases: impl FnOnce(&mut SwitchCases<S, O, F>) -> SwitchyardResult<()>,
    default: impl FnOnce(PipelineBuilder<D, D, F>) -> SwitchyardResult<OpenPipeline<D, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    self.ensure_not_started("start_with_switch")?;
    self.switch_step(name, selector, cases, default)
  }

  pub fn start_with_fork<A: 'static, B: 'static>(
    self,
    name: &str,
    selector: impl Fn(I, F::Signal, Next<A, F>, Next<B, F>) -> F::Output + Send + Sync + 'static,
    left: &Pipeline<A, F>,
    right: &Pipeline<B, F>,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    self.ensure_not_started("start_with_fork")?;
    self.fork_step(name, selector, left, right)
  }

  pub fn start_with_multi_fork<M: 'static, D: 'static>(
    self,
    name: &str,
    selector: impl Fn(I, F::Signal, Cases<M, F>, Next<D, F>) -> F::Output + Send + Sync + 'static,
    branches: &[(&str, &Pipeline<M, F>)],
    default: &Pipeline<D, F>,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    self.ensure_not_started("start_with_multi_fork")?;
    self.multi_fork_step(name, selector, branches, default)
  }

  pub fn start_with_handler(
    self,
    name: &str,
    handler: impl Fn(I, F::Signal) -> F::Output + Send + Sync + 'static,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    self.ensure_not_started("start_with_handler")?;
    self.handler_step(name, handler)
  }
}

impl<I: 'static, C: 'static, F: Flow> PipelineBuilder<I, C, F> {
  pub fn name(&self) -> &str {
    &self.pipeline
  }

  // --- Continuation verbs ---

  pub fn then_linear<O: 'static>(
    self,
    name: &str,
    behavior: impl Fn(C, F::Signal, Next<O, F>) -> F::Output + Send + Sync + 'static,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    self.ensure_started("then_linear")?;
    self.linear(name, behavior)
  }

  pub fn then_if<B: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Next<B, F>, Next<O, F>) -> F::Output + Send + Sync + 'static,
    branch: impl FnOnce(PipelineBuilder<B, B, F>) -> SwitchyardResult<OpenPipeline<B, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    self.ensure_started("then_if")?;
    self.if_step(name, selector, branch)
  }

  pub fn then_if_else<T: 'static, E: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Next<T, F>, Next<E, F>) -> F::Output + Send + Sync + 'static,
    if_branch: impl FnOnce(PipelineBuilder<T, T, F>) -> SwitchyardResult<OpenPipeline<T, O, F>>,
    else_branch: impl FnOnce(PipelineBuilder<E, E, F>) -> SwitchyardResult<OpenPipeline<E, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    self.ensure_started("then_if_else")?;
    self.if_else_step(name, selector, if_branch, else_branch)
  }

  pub fn then_switch<S: 'static, D: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Cases<S, F>, Next<D, F>) -> F::Output + Send + Sync + 'static,
    cases: impl FnOnce(&mut SwitchCases<S, O, F>) -> SwitchyardResult<()>,
    default: impl FnOnce(PipelineBuilder<D, D, F>) -> SwitchyardResult<OpenPipeline<D, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    self.ensure_started("then_switch")?;
    self.switch_step(name, selector, cases, default)
  }

  pub fn then_fork<A: 'static, B: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Next<A, F>, Next<B, F>) -> F::Output + Send + Sync + 'static,
    left: &Pipeline<A, F>,
    right: &Pipeline<B, F>,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    self.ensure_started("then_fork")?;
    self.fork_step(name, selector, left, right)
  }

  pub fn then_multi_fork<M: 'static, D: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Cases<M, F>, Next<D, F>) -> F::Output + Send + Sync + 'static,
    branches: &[(&str, &Pipeline<M, F>)],
    default: &Pipeline<D, F>,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    self.ensure_started("then_multi_fork")?;
    self.multi_fork_step(name, selector, branches, default)
  }

  pub fn handle_with(
    self,
    name: &str,
    handler: impl Fn(C, F::Signal) -> F::Output + Send + Sync + 'static,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    self.ensure_started("handle_with")?;
    self.handler_step(name, handler)
  }

  /// Ends the chain with a reduction point instead of a terminal step.
  ///
  /// Root builders register the result; branch builders hand it back to the step that
  /// owns the branch.
  #[instrument(
    name = "PipelineBuilder::build_open_pipeline",
    skip_all,
    fields(pipeline = %self.pipeline, steps = self.links.len()),
    err(Display)
  )]
  pub fn build_open_pipeline(self) -> SwitchyardResult<OpenPipeline<I, C, F>> {
    let Some(entry) = self.entry else {
      event!(Level::ERROR, "Open pipeline has no entry step.");
      return Err(SwitchyardError::invalid_operation(
        &self.pipeline,
        "cannot build an open pipeline without an entry step",
      ));
    };
    let exit = StepName::new(&self.pipeline, format!("{}:exit", entry.step));
    let def = Arc::new(OpenPipelineDef::<I, C, F> {
      name: self.pipeline,
      entry,
      exit,
      links: self.links,
      _types: PhantomData,
    });
    if self.scope == BuildScope::Root {
      let erased: Arc<dyn AnyPipeline> = def.clone();
      self.space.add_pipeline(erased)?;
    }
    if let Some(reservation) = self.reservation {
      reservation.finish();
    }
    event!(Level::DEBUG, open = true, root = (self.scope == BuildScope::Root), "Open pipeline built.");
    Ok(OpenPipeline { space: self.space, def })
  }

  // --- Shared step construction ---

  fn ensure_started(&self, verb: &str) -> SwitchyardResult<()> {
    if self.entry.is_none() {
      event!(Level::ERROR, pipeline = %self.pipeline, verb, "Continuation verb used before an entry step.");
      return Err(SwitchyardError::invalid_operation(
        &self.pipeline,
        format!("'{}' requires an entry step; start the pipeline with a start_with_* verb", verb),
      ));
    }
    Ok(())
  }

  fn ensure_not_started(&self, verb: &str) -> SwitchyardResult<()> {
    if let Some(entry) = &self.entry {
      event!(Level::ERROR, pipeline = %self.pipeline, verb, %entry, "Pipeline already has an entry step.");
      return Err(SwitchyardError::invalid_operation(
        &self.pipeline,
        format!("'{}' called on a pipeline that already starts with '{}'", verb, entry.step),
      ));
    }
    Ok(())
  }

  fn register<B>(&self, name: &str, kind: StepKind, behavior: B) -> SwitchyardResult<Arc<Step<B>>>
  where
    B: Clone + Send + Sync + 'static,
  {
    let step = Arc::new(Step::new(StepName::new(&self.pipeline, name), kind, behavior));
    let erased: Arc<dyn AnyStep> = step.clone();
    self.space.add_step(erased)?;
    Ok(step)
  }

  /// Makes sure a branch handed over by the caller lives in this builder's space.
  fn ensure_same_space(&self, branch_space: &Space, branch: &str) -> SwitchyardResult<()> {
    if !self.space.same_as(branch_space) {
      event!(Level::ERROR, pipeline = %self.pipeline, %branch, "Branch belongs to a different space.");
      return Err(SwitchyardError::invalid_operation(
        &self.pipeline,
        format!("branch '{}' was built in a different space", branch),
      ));
    }
    Ok(())
  }

  fn open_branch<B: 'static, O: 'static>(
    &self,
    build: impl FnOnce(PipelineBuilder<B, B, F>) -> SwitchyardResult<OpenPipeline<B, O, F>>,
  ) -> SwitchyardResult<Arc<OpenPipelineDef<B, O, F>>> {
    let branch = build(PipelineBuilder::branch(self.space.clone(), self.pipeline.clone()))?;
    self.ensure_same_space(&branch.space, &branch.def.name)?;
    Ok(branch.def)
  }

  fn push<O>(mut self, link: Arc<dyn Link>) -> PipelineBuilder<I, O, F> {
    if self.entry.is_none() {
      self.entry = Some(link.step_name().clone());
    }
    self.links.push(link);
    PipelineBuilder {
      space: self.space,
      pipeline: self.pipeline,
      scope: self.scope,
      entry: self.entry,
      links: self.links,
      reservation: self.reservation,
      _types: PhantomData,
    }
  }

  fn close(self, terminal: Arc<dyn Terminal>) -> ClosedBuilder<I, F> {
    let entry = self.entry.unwrap_or_else(|| terminal.step_name().clone());
    ClosedBuilder {
      space: self.space,
      pipeline: self.pipeline,
      scope: self.scope,
      entry,
      links: self.links,
      terminal,
      reservation: self.reservation,
      _types: PhantomData,
    }
  }

  fn linear<O: 'static>(
    self,
    name: &str,
    behavior: impl Fn(C, F::Signal, Next<O, F>) -> F::Output + Send + Sync + 'static,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    let behavior: LinearFn<C, O, F> = Arc::new(behavior);
    let step = self.register(name, StepKind::Linear, behavior)?;
    Ok(self.push(Arc::new(LinearLink::<C, O, F> { step })))
  }

  fn if_step<B: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Next<B, F>, Next<O, F>) -> F::Output + Send + Sync + 'static,
    branch: impl FnOnce(PipelineBuilder<B, B, F>) -> SwitchyardResult<OpenPipeline<B, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    let selector: IfFn<C, B, O, F> = Arc::new(selector);
    let step = self.register(name, StepKind::If, selector)?;
    let branch = self.open_branch(branch)?;
    Ok(self.push(Arc::new(IfLink::<C, B, O, F> { step, branch })))
  }

  fn if_else_step<T: 'static, E: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Next<T, F>, Next<E, F>) -> F::Output + Send + Sync + 'static,
    if_branch: impl FnOnce(PipelineBuilder<T, T, F>) -> SwitchyardResult<OpenPipeline<T, O, F>>,
    else_branch: impl FnOnce(PipelineBuilder<E, E, F>) -> SwitchyardResult<OpenPipeline<E, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    let selector: IfElseFn<C, T, E, F> = Arc::new(selector);
    let step = self.register(name, StepKind::IfElse, selector)?;
    let if_branch = self.open_branch(if_branch)?;
    let else_branch = self.open_branch(else_branch)?;
    Ok(self.push(Arc::new(IfElseLink::<C, T, E, O, F> {
      step,
      if_branch,
      else_branch,
    })))
  }

  fn switch_step<S: 'static, D: 'static, O: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Cases<S, F>, Next<D, F>) -> F::Output + Send + Sync + 'static,
    cases: impl FnOnce(&mut SwitchCases<S, O, F>) -> SwitchyardResult<()>,
    default: impl FnOnce(PipelineBuilder<D, D, F>) -> SwitchyardResult<OpenPipeline<D, O, F>>,
  ) -> SwitchyardResult<PipelineBuilder<I, O, F>> {
    let selector: SwitchFn<C, S, D, F> = Arc::new(selector);
    let step = self.register(name, StepKind::Switch, selector)?;
    let mut collected = SwitchCases {
      space: self.space.clone(),
      pipeline: self.pipeline.clone(),
      cases: Vec::new(),
    };
    cases(&mut collected)?;
    let default = self.open_branch(default)?;
    event!(Level::DEBUG, step = %step.name(), cases = collected.cases.len(), "Switch cases collected.");
    Ok(self.push(Arc::new(SwitchLink::<C, S, D, O, F> {
      step,
      cases: collected.cases,
      default,
    })))
  }

  fn fork_step<A: 'static, B: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Next<A, F>, Next<B, F>) -> F::Output + Send + Sync + 'static,
    left: &Pipeline<A, F>,
    right: &Pipeline<B, F>,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    self.ensure_same_space(&left.space, left.name())?;
    self.ensure_same_space(&right.space, right.name())?;
    let selector: ForkFn<C, A, B, F> = Arc::new(selector);
    let step = self.register(name, StepKind::Fork, selector)?;
    let terminal = Arc::new(ForkLink::<C, A, B, F> {
      step,
      left: Arc::clone(&left.def),
      right: Arc::clone(&right.def),
    });
    Ok(self.close(terminal))
  }

  fn multi_fork_step<M: 'static, D: 'static>(
    self,
    name: &str,
    selector: impl Fn(C, F::Signal, Cases<M, F>, Next<D, F>) -> F::Output + Send + Sync + 'static,
    branches: &[(&str, &Pipeline<M, F>)],
    default: &Pipeline<D, F>,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    let mut seen = HashSet::with_capacity(branches.len());
    for (branch, pipeline) in branches {
      if !seen.insert(*branch) {
        event!(Level::ERROR, pipeline = %self.pipeline, %branch, "Duplicate multi-fork branch name.");
        return Err(SwitchyardError::invalid_operation(
          &self.pipeline,
          format!("multi-fork step '{}' declares branch '{}' twice", name, branch),
        ));
      }
      self.ensure_same_space(&pipeline.space, pipeline.name())?;
    }
    self.ensure_same_space(&default.space, default.name())?;
    let selector: MultiForkFn<C, M, D, F> = Arc::new(selector);
    let step = self.register(name, StepKind::MultiFork, selector)?;
    let terminal = Arc::new(MultiForkLink::<C, M, D, F> {
      step,
      branches: branches
        .iter()
        .map(|(branch, pipeline)| (branch.to_string(), Arc::clone(&pipeline.def)))
        .collect(),
      default: Arc::clone(&default.def),
    });
    Ok(self.close(terminal))
  }

  fn handler_step(
    self,
    name: &str,
    handler: impl Fn(C, F::Signal) -> F::Output + Send + Sync + 'static,
  ) -> SwitchyardResult<ClosedBuilder<I, F>> {
    let handler: HandlerFn<C, F> = Arc::new(handler);
    let step = self.register(name, StepKind::Handler, handler)?;
    Ok(self.close(Arc::new(HandlerLink::<C, F> { step })))
  }
}

/// Collects the named cases of a `Switch` step.
pub struct SwitchCases<S, O, F: Flow> {
  space: Space,
  pipeline: String,
  cases: Vec<(String, Arc<OpenPipelineDef<S, O, F>>)>,
}

impl<S: 'static, O: 'static, F: Flow> SwitchCases<S, O, F> {
  /// Adds a case. Case names are unique per switch step.
  pub fn case(
    &mut self,
    name: &str,
    build: impl FnOnce(PipelineBuilder<S, S, F>) -> SwitchyardResult<OpenPipeline<S, O, F>>,
  ) -> SwitchyardResult<&mut Self> {
    if self.cases.iter().any(|(case, _)| case == name) {
      event!(Level::ERROR, pipeline = %self.pipeline, case = %name, "Duplicate switch case name.");
      return Err(SwitchyardError::invalid_operation(
        &self.pipeline,
        format!("switch case '{}' is declared twice", name),
      ));
    }
    let branch = build(PipelineBuilder::branch(self.space.clone(), self.pipeline.clone()))?;
    if !self.space.same_as(&branch.space) {
      event!(Level::ERROR, pipeline = %self.pipeline, case = %name, "Switch case belongs to a different space.");
      return Err(SwitchyardError::invalid_operation(
        &self.pipeline,
        format!("switch case '{}' was built in a different space", name),
      ));
    }
    self.cases.push((name.to_string(), branch.def));
    Ok(self)
  }

  pub fn len(&self) -> usize {
    self.cases.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cases.is_empty()
  }
}

/// A builder whose chain already ends in a terminal step. Only `build_pipeline` is left.
pub struct ClosedBuilder<I, F: Flow> {
  space: Space,
  pipeline: String,
  scope: BuildScope,
  entry: StepName,
  links: Vec<Arc<dyn Link>>,
  terminal: Arc<dyn Terminal>,
  reservation: Option<PipelineReservation>,
  _types: PhantomData<fn(I) -> F>,
}

impl<I: 'static, F: Flow> ClosedBuilder<I, F> {
  #[instrument(
    name = "ClosedBuilder::build_pipeline",
    skip_all,
    fields(pipeline = %self.pipeline, steps = self.links.len() + 1),
    err(Display)
  )]
  pub fn build_pipeline(self) -> SwitchyardResult<Pipeline<I, F>> {
    if self.scope == BuildScope::Branch {
      event!(Level::ERROR, terminal = %self.terminal.step_name(), "Branch sub-chain closed with a terminal step.");
      return Err(SwitchyardError::invalid_operation(
        &self.pipeline,
        format!(
          "branch ending in '{}' cannot be closed; if, if-else and switch branches must rejoin the main chain",
          self.terminal.step_name().step
        ),
      ));
    }
    let def = Arc::new(ClosedPipelineDef::<I, F> {
      name: self.pipeline,
      entry: self.entry,
      links: self.links,
      terminal: self.terminal,
      _types: PhantomData,
    });
    let erased: Arc<dyn AnyPipeline> = def.clone();
    self.space.add_pipeline(erased)?;
    if let Some(reservation) = self.reservation {
      reservation.finish();
    }
    event!(Level::DEBUG, terminal = ?def.terminal.kind(), "Pipeline built.");
    Ok(Pipeline { space: self.space, def })
  }
}
