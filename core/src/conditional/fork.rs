// switchyard/src/conditional/fork.rs

//! Links for exclusive routing: `Fork` and `MultiFork`.
//!
//! Fork branches are closed pipelines registered on their own in the `Space`. There
//! is no rejoin: invoking a branch invokes a complete, separately reduced pipeline, so
//! a fork step is terminal in the pipeline that contains it.

use crate::core::continuation::{Cases, Next};
use crate::core::flow::Flow;
use crate::core::step::{ForkFn, MultiForkFn, Step, StepKind, StepName};
use crate::error::SwitchyardResult;
use crate::pipeline::definition::ClosedPipelineDef;
use crate::pipeline::link::{erase, ErasedNext, Terminal};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

pub(crate) struct ForkLink<I, A, B, F: Flow> {
  pub(crate) step: Arc<Step<ForkFn<I, A, B, F>>>,
  pub(crate) left: Arc<ClosedPipelineDef<A, F>>,
  pub(crate) right: Arc<ClosedPipelineDef<B, F>>,
}

impl<I: 'static, A: 'static, B: 'static, F: Flow> Terminal for ForkLink<I, A, B, F> {
  fn step_name(&self) -> &StepName {
    self.step.name()
  }

  fn kind(&self) -> StepKind {
    StepKind::Fork
  }

  fn seed(&self) -> SwitchyardResult<ErasedNext> {
    let left = self.left.reduce()?;
    let right = self.right.reduce()?;
    let selector = self.step.resolve();
    let name = self.step.name().clone();
    Ok(erase(Next::<I, F>::new(move |input, signal| {
      event!(Level::TRACE, step = %name, "Entering fork step.");
      (selector)(input, signal, left.clone(), right.clone())
    })))
  }
}

pub(crate) struct MultiForkLink<I, M, D, F: Flow> {
  pub(crate) step: Arc<Step<MultiForkFn<I, M, D, F>>>,
  pub(crate) branches: Vec<(String, Arc<ClosedPipelineDef<M, F>>)>,
  pub(crate) default: Arc<ClosedPipelineDef<D, F>>,
}

impl<I: 'static, M: 'static, D: 'static, F: Flow> Terminal for MultiForkLink<I, M, D, F> {
  fn step_name(&self) -> &StepName {
    self.step.name()
  }

  fn kind(&self) -> StepKind {
    StepKind::MultiFork
  }

  fn seed(&self) -> SwitchyardResult<ErasedNext> {
    let mut compiled = HashMap::with_capacity(self.branches.len());
    for (branch, pipeline) in &self.branches {
      compiled.insert(branch.clone(), pipeline.reduce()?);
    }
    let branches = Cases::new(compiled);
    let default = self.default.reduce()?;
    let selector = self.step.resolve();
    let name = self.step.name().clone();
    Ok(erase(Next::<I, F>::new(move |input, signal| {
      event!(Level::TRACE, step = %name, "Entering multi-fork step.");
      (selector)(input, signal, branches.clone(), default.clone())
    })))
  }
}
