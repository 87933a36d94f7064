// switchyard/src/pipeline/link.rs

//! Links: the structural position of a step inside a chain.
//!
//! A link knows how to fold its step in front of the continuation that follows it.
//! Continuations travel between links type-erased (`ErasedNext`) so a chain can be
//! stored as a flat list and reduced with an iterative backward fold; each link
//! downcasts to the exact `Next<O, F>` it was built against.

use crate::core::continuation::Next;
use crate::core::flow::Flow;
use crate::core::step::{HandlerFn, LinearFn, Step, StepKind, StepName};
use crate::error::{SwitchyardError, SwitchyardResult};
use std::any::Any;
use std::sync::Arc;
use tracing::{event, Level};

/// A `Next<T, F>` with `T` and `F` erased.
pub(crate) type ErasedNext = Box<dyn Any + Send + Sync>;

/// A non-terminal position: receives the compiled continuation of whatever follows.
pub(crate) trait Link: Send + Sync {
  fn step_name(&self) -> &StepName;

  fn kind(&self) -> StepKind;

  fn fold(&self, next: ErasedNext) -> SwitchyardResult<ErasedNext>;
}

/// The last position of a closed pipeline; seeds the fold.
pub(crate) trait Terminal: Send + Sync {
  fn step_name(&self) -> &StepName;

  fn kind(&self) -> StepKind;

  fn seed(&self) -> SwitchyardResult<ErasedNext>;
}

/// Folds `links` back to front in front of `seed`.
pub(crate) fn fold_links(links: &[Arc<dyn Link>], seed: ErasedNext) -> SwitchyardResult<ErasedNext> {
  links.iter().rev().try_fold(seed, |next, link| {
    event!(Level::TRACE, step = %link.step_name(), kind = ?link.kind(), "Folding step.");
    link.fold(next)
  })
}

pub(crate) fn erase<T: 'static, F: Flow>(next: Next<T, F>) -> ErasedNext {
  Box::new(next)
}

pub(crate) fn downcast_next<T: 'static, F: Flow>(erased: ErasedNext, step: &StepName) -> SwitchyardResult<Next<T, F>> {
  match erased.downcast::<Next<T, F>>() {
    Ok(next) => Ok(*next),
    Err(_) => {
      event!(Level::ERROR, %step, expected = %std::any::type_name::<Next<T, F>>(), "Continuation type mismatch while folding.");
      Err(SwitchyardError::Internal(format!(
        "Continuation handed to step '{}' is not a {}",
        step,
        std::any::type_name::<Next<T, F>>()
      )))
    }
  }
}

// --- Linear / Handler ---

pub(crate) struct LinearLink<I, O, F: Flow> {
  pub(crate) step: Arc<Step<LinearFn<I, O, F>>>,
}

impl<I: 'static, O: 'static, F: Flow> Link for LinearLink<I, O, F> {
  fn step_name(&self) -> &StepName {
    self.step.name()
  }

  fn kind(&self) -> StepKind {
    StepKind::Linear
  }

  fn fold(&self, next: ErasedNext) -> SwitchyardResult<ErasedNext> {
    let next = downcast_next::<O, F>(next, self.step.name())?;
    let behavior = self.step.resolve();
    let name = self.step.name().clone();
    Ok(erase(Next::<I, F>::new(move |input, signal| {
      event!(Level::TRACE, step = %name, "Entering linear step.");
      (behavior)(input, signal, next.clone())
    })))
  }
}

pub(crate) struct HandlerLink<I, F: Flow> {
  pub(crate) step: Arc<Step<HandlerFn<I, F>>>,
}

impl<I: 'static, F: Flow> Terminal for HandlerLink<I, F> {
  fn step_name(&self) -> &StepName {
    self.step.name()
  }

  fn kind(&self) -> StepKind {
    StepKind::Handler
  }

  fn seed(&self) -> SwitchyardResult<ErasedNext> {
    let behavior = self.step.resolve();
    let name = self.step.name().clone();
    Ok(erase(Next::<I, F>::new(move |input, signal| {
      event!(Level::TRACE, step = %name, "Entering handler step.");
      (behavior)(input, signal)
    })))
  }
}
