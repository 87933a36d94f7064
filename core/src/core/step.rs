// switchyard/src/core/step.rs

//! Defines the step model: the identity of a step, its kind, the behavior shapes of
//! the seven kinds, and the `Step<B>` record the registry stores.

use crate::core::continuation::{Cases, Next};
use crate::core::flow::Flow;
use crate::error::SwitchyardResult;
use crate::mutator::{AddingMode, Mutator, MutatorChain};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

/// Composite identity of a step. Unique within a `Space`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepName {
  pub pipeline: String,
  pub step: String,
}

impl StepName {
  pub fn new(pipeline: impl Into<String>, step: impl Into<String>) -> Self {
    Self {
      pipeline: pipeline.into(),
      step: step.into(),
    }
  }
}

impl fmt::Display for StepName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.pipeline, self.step)
  }
}

/// Kind tag stored next to every step; checked before any downcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
  Linear,
  Handler,
  If,
  IfElse,
  Switch,
  Fork,
  MultiFork,
}

impl StepKind {
  /// Terminal kinds end a closed pipeline; nothing can follow them.
  pub fn is_terminal(self) -> bool {
    matches!(self, StepKind::Handler | StepKind::Fork | StepKind::MultiFork)
  }
}

// --- Behavior shapes ---
//
// Each kind wraps one of these. Branch-bearing kinds receive their branches already
// compiled into continuations.

/// `input -> next`. May decline to call `next`, which ends the invocation.
pub type LinearFn<I, O, F> =
  Arc<dyn Fn(I, <F as Flow>::Signal, Next<O, F>) -> <F as Flow>::Output + Send + Sync>;

/// Terminal: consumes the input, calls nothing further.
pub type HandlerFn<I, F> = Arc<dyn Fn(I, <F as Flow>::Signal) -> <F as Flow>::Output + Send + Sync>;

/// Calls exactly one of `if_next` (enters the branch) or `next` (skips it).
pub type IfFn<I, B, O, F> =
  Arc<dyn Fn(I, <F as Flow>::Signal, Next<B, F>, Next<O, F>) -> <F as Flow>::Output + Send + Sync>;

/// Calls exactly one of `if_next` or `else_next`; both branches rejoin the same `next`.
pub type IfElseFn<I, T, E, F> =
  Arc<dyn Fn(I, <F as Flow>::Signal, Next<T, F>, Next<E, F>) -> <F as Flow>::Output + Send + Sync>;

/// Calls exactly one named case or the default; all of them rejoin the same `next`.
pub type SwitchFn<I, S, D, F> =
  Arc<dyn Fn(I, <F as Flow>::Signal, Cases<S, F>, Next<D, F>) -> <F as Flow>::Output + Send + Sync>;

/// Routes to exactly one of two independent closed pipelines.
pub type ForkFn<I, A, B, F> =
  Arc<dyn Fn(I, <F as Flow>::Signal, Next<A, F>, Next<B, F>) -> <F as Flow>::Output + Send + Sync>;

/// Routes to exactly one named closed pipeline or the default one.
pub type MultiForkFn<I, M, D, F> =
  Arc<dyn Fn(I, <F as Flow>::Signal, Cases<M, F>, Next<D, F>) -> <F as Flow>::Output + Send + Sync>;

/// A step as stored in a `Space`.
///
/// Its position in the chain is fixed at build time; only its behavior can change,
/// through the mutators attached to it.
pub struct Step<B> {
  name: StepName,
  kind: StepKind,
  behavior: B,
  mutators: Mutex<MutatorChain<B>>,
}

impl<B> Step<B>
where
  B: Clone + Send + Sync + 'static,
{
  pub(crate) fn new(name: StepName, kind: StepKind, behavior: B) -> Self {
    Self {
      name,
      kind,
      behavior,
      mutators: Mutex::new(MutatorChain::new()),
    }
  }

  pub fn name(&self) -> &StepName {
    &self.name
  }

  pub fn kind(&self) -> StepKind {
    self.kind
  }

  /// The behavior supplied at build time, without mutators.
  pub fn behavior(&self) -> B {
    self.behavior.clone()
  }

  /// The behavior with every attached mutator applied, lowest priority innermost.
  ///
  /// The chain is copied out before any transform runs, so a transform may inspect or
  /// extend its own step.
  pub fn resolve(&self) -> B {
    let mutators = self.mutators.lock().snapshot();
    mutators
      .iter()
      .fold(self.behavior.clone(), |behavior, mutator| mutator.apply(behavior))
  }

  pub fn add_mutator(&self, mutator: Mutator<B>, mode: AddingMode) -> SwitchyardResult<()> {
    let mutator_name = mutator.name().to_string();
    let priority = mutator.priority();
    self.mutators.lock().add(&self.name, mutator, mode)?;
    event!(Level::DEBUG, step = %self.name, mutator = %mutator_name, priority, "Mutator attached.");
    Ok(())
  }

  /// Attaches `transform` at exactly `priority`.
  pub fn mutate(
    &self,
    name: impl Into<String>,
    priority: i32,
    transform: impl Fn(B) -> B + Send + Sync + 'static,
  ) -> SwitchyardResult<()> {
    self.add_mutator(Mutator::new(name, priority, transform), AddingMode::ExactPlace)
  }

  /// Mutator names in application order.
  pub fn mutator_names(&self) -> Vec<String> {
    self.mutators.lock().names()
  }
}

impl<B> fmt::Debug for Step<B> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Step")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("mutators", &self.mutators.lock().len())
      .finish()
  }
}

/// Type-erased view of a step, as the registry stores it.
pub trait AnyStep: Send + Sync + 'static {
  fn name(&self) -> &StepName;

  fn kind(&self) -> StepKind;

  /// Rust type of the wrapped behavior, for diagnostics.
  fn behavior_type(&self) -> &'static str;

  fn mutator_names(&self) -> Vec<String>;

  fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<B> AnyStep for Step<B>
where
  B: Clone + Send + Sync + 'static,
{
  fn name(&self) -> &StepName {
    &self.name
  }

  fn kind(&self) -> StepKind {
    self.kind
  }

  fn behavior_type(&self) -> &'static str {
    std::any::type_name::<B>()
  }

  fn mutator_names(&self) -> Vec<String> {
    self.mutators.lock().names()
  }

  fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
    self
  }
}

impl fmt::Debug for dyn AnyStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AnyStep")
      .field("name", self.name())
      .field("kind", &self.kind())
      .finish()
  }
}
