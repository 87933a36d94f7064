// switchyard/src/conditional/branch.rs

//! Links for the branch-bearing steps that rejoin the main chain: `If`, `IfElse` and
//! `Switch`.
//!
//! Every branch is an open pipeline. At fold time its reduction point receives the
//! step's own `next`, so whichever branch the selector picks ends up continuing the
//! main chain. Steps inside a branch never see the outer continuation.

use crate::core::continuation::{Cases, Next};
use crate::core::flow::Flow;
use crate::core::step::{IfElseFn, IfFn, Step, StepKind, StepName, SwitchFn};
use crate::error::SwitchyardResult;
use crate::pipeline::definition::OpenPipelineDef;
use crate::pipeline::link::{downcast_next, erase, ErasedNext, Link};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

pub(crate) struct IfLink<I, B, O, F: Flow> {
  pub(crate) step: Arc<Step<IfFn<I, B, O, F>>>,
  pub(crate) branch: Arc<OpenPipelineDef<B, O, F>>,
}

impl<I: 'static, B: 'static, O: 'static, F: Flow> Link for IfLink<I, B, O, F> {
  fn step_name(&self) -> &StepName {
    self.step.name()
  }

  fn kind(&self) -> StepKind {
    StepKind::If
  }

  fn fold(&self, next: ErasedNext) -> SwitchyardResult<ErasedNext> {
    let next = downcast_next::<O, F>(next, self.step.name())?;
    let if_next = self.branch.build_handler(next.clone())?;
    let selector = self.step.resolve();
    let name = self.step.name().clone();
    Ok(erase(Next::<I, F>::new(move |input, signal| {
      event!(Level::TRACE, step = %name, "Entering if step.");
      (selector)(input, signal, if_next.clone(), next.clone())
    })))
  }
}

pub(crate) struct IfElseLink<I, T, E, O, F: Flow> {
  pub(crate) step: Arc<Step<IfElseFn<I, T, E, F>>>,
  pub(crate) if_branch: Arc<OpenPipelineDef<T, O, F>>,
  pub(crate) else_branch: Arc<OpenPipelineDef<E, O, F>>,
}

impl<I: 'static, T: 'static, E: 'static, O: 'static, F: Flow> Link for IfElseLink<I, T, E, O, F> {
  fn step_name(&self) -> &StepName {
    self.step.name()
  }

  fn kind(&self) -> StepKind {
    StepKind::IfElse
  }

  fn fold(&self, next: ErasedNext) -> SwitchyardResult<ErasedNext> {
    let next = downcast_next::<O, F>(next, self.step.name())?;
    let if_next = self.if_branch.build_handler(next.clone())?;
    let else_next = self.else_branch.build_handler(next)?;
    let selector = self.step.resolve();
    let name = self.step.name().clone();
    Ok(erase(Next::<I, F>::new(move |input, signal| {
      event!(Level::TRACE, step = %name, "Entering if-else step.");
      (selector)(input, signal, if_next.clone(), else_next.clone())
    })))
  }
}

pub(crate) struct SwitchLink<I, S, D, O, F: Flow> {
  pub(crate) step: Arc<Step<SwitchFn<I, S, D, F>>>,
  pub(crate) cases: Vec<(String, Arc<OpenPipelineDef<S, O, F>>)>,
  pub(crate) default: Arc<OpenPipelineDef<D, O, F>>,
}

impl<I: 'static, S: 'static, D: 'static, O: 'static, F: Flow> Link for SwitchLink<I, S, D, O, F> {
  fn step_name(&self) -> &StepName {
    self.step.name()
  }

  fn kind(&self) -> StepKind {
    StepKind::Switch
  }

  fn fold(&self, next: ErasedNext) -> SwitchyardResult<ErasedNext> {
    let next = downcast_next::<O, F>(next, self.step.name())?;
    let mut compiled = HashMap::with_capacity(self.cases.len());
    for (case, branch) in &self.cases {
      compiled.insert(case.clone(), branch.build_handler(next.clone())?);
    }
    let cases = Cases::new(compiled);
    let default = self.default.build_handler(next)?;
    let selector = self.step.resolve();
    let name = self.step.name().clone();
    Ok(erase(Next::<I, F>::new(move |input, signal| {
      event!(Level::TRACE, step = %name, "Entering switch step.");
      (selector)(input, signal, cases.clone(), default.clone())
    })))
  }
}
