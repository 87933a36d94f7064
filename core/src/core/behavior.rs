// switchyard/src/core/behavior.rs

//! Capability traits for steps implemented as objects rather than closures.
//!
//! Builder verbs take closures. To hand them an object instead, wrap it with the
//! adapter of its kind:
//!
//! ```ignore
//! builder.then_linear::<i32>("parse", behavior::linear(ParseInt))?
//! ```

use crate::core::continuation::{Cases, Next};
use crate::core::flow::{Flow, FlowFuture};
use async_trait::async_trait;
use std::sync::Arc;

pub trait LinearBehavior<I, O, F: Flow>: Send + Sync + 'static {
  fn run(&self, input: I, signal: F::Signal, next: Next<O, F>) -> F::Output;
}

pub trait HandlerBehavior<I, F: Flow>: Send + Sync + 'static {
  fn handle(&self, input: I, signal: F::Signal) -> F::Output;
}

pub trait IfSelector<I, B, O, F: Flow>: Send + Sync + 'static {
  fn select(&self, input: I, signal: F::Signal, if_next: Next<B, F>, next: Next<O, F>) -> F::Output;
}

pub trait IfElseSelector<I, T, E, F: Flow>: Send + Sync + 'static {
  fn select(&self, input: I, signal: F::Signal, if_next: Next<T, F>, else_next: Next<E, F>) -> F::Output;
}

pub trait SwitchSelector<I, S, D, F: Flow>: Send + Sync + 'static {
  fn select(&self, input: I, signal: F::Signal, cases: Cases<S, F>, default: Next<D, F>) -> F::Output;
}

pub trait ForkSelector<I, A, B, F: Flow>: Send + Sync + 'static {
  fn select(&self, input: I, signal: F::Signal, left: Next<A, F>, right: Next<B, F>) -> F::Output;
}

pub trait MultiForkSelector<I, M, D, F: Flow>: Send + Sync + 'static {
  fn select(&self, input: I, signal: F::Signal, branches: Cases<M, F>, default: Next<D, F>) -> F::Output;
}

/// Terminal handler written as an `async fn`, for `Async` and `Cancellable` flows.
/// `S` is the flow's signal.
#[async_trait]
pub trait AsyncHandlerBehavior<I, R, S = ()>: Send + Sync + 'static
where
  I: Send + 'static,
  S: Send + 'static,
{
  async fn handle(&self, input: I, signal: S) -> R;
}

// --- Adapters ---

pub fn linear<I, O, F, L>(behavior: L) -> impl Fn(I, F::Signal, Next<O, F>) -> F::Output + Send + Sync + 'static
where
  I: 'static,
  O: 'static,
  F: Flow,
  L: LinearBehavior<I, O, F>,
{
  move |input: I, signal: F::Signal, next: Next<O, F>| behavior.run(input, signal, next)
}

pub fn handler<I, F, H>(behavior: H) -> impl Fn(I, F::Signal) -> F::Output + Send + Sync + 'static
where
  I: 'static,
  F: Flow,
  H: HandlerBehavior<I, F>,
{
  move |input: I, signal: F::Signal| behavior.handle(input, signal)
}

pub fn if_selector<I, B, O, F, S>(
  selector: S,
) -> impl Fn(I, F::Signal, Next<B, F>, Next<O, F>) -> F::Output + Send + Sync + 'static
where
  I: 'static,
  B: 'static,
  O: 'static,
  F: Flow,
  S: IfSelector<I, B, O, F>,
{
  move |input: I, signal: F::Signal, if_next: Next<B, F>, next: Next<O, F>| selector.select(input, signal, if_next, next)
}

pub fn if_else_selector<I, T, E, F, S>(
  selector: S,
) -> impl Fn(I, F::Signal, Next<T, F>, Next<E, F>) -> F::Output + Send + Sync + 'static
where
  I: 'static,
  T: 'static,
  E: 'static,
  F: Flow,
  S: IfElseSelector<I, T, E, F>,
{
  move |input: I, signal: F::Signal, if_next: Next<T, F>, else_next: Next<E, F>| {
    selector.select(input, signal, if_next, else_next)
  }
}

pub fn switch_selector<I, S, D, F, Sel>(
  selector: Sel,
) -> impl Fn(I, F::Signal, Cases<S, F>, Next<D, F>) -> F::Output + Send + Sync + 'static
where
  I: 'static,
  S: 'static,
  D: 'static,
  F: Flow,
  Sel: SwitchSelector<I, S, D, F>,
{
  move |input: I, signal: F::Signal, cases: Cases<S, F>, default: Next<D, F>| selector.select(input, signal, cases, default)
}

pub fn fork_selector<I, A, B, F, S>(
  selector: S,
) -> impl Fn(I, F::Signal, Next<A, F>, Next<B, F>) -> F::Output + Send + Sync + 'static
where
  I: 'static,
  A: 'static,
  B: 'static,
  F: Flow,
  S: ForkSelector<I, A, B, F>,
{
  move |input: I, signal: F::Signal, left: Next<A, F>, right: Next<B, F>| selector.select(input, signal, left, right)
}

pub fn multi_fork_selector<I, M, D, F, S>(
  selector: S,
) -> impl Fn(I, F::Signal, Cases<M, F>, Next<D, F>) -> F::Output + Send + Sync + 'static
where
  I: 'static,
  M: 'static,
  D: 'static,
  F: Flow,
  S: MultiForkSelector<I, M, D, F>,
{
  move |input: I, signal: F::Signal, branches: Cases<M, F>, default: Next<D, F>| {
    selector.select(input, signal, branches, default)
  }
}

/// Adapts an [`AsyncHandlerBehavior`] to any flow whose output is a `FlowFuture<R>`.
pub fn async_handler<I, R, F, H>(behavior: H) -> impl Fn(I, F::Signal) -> F::Output + Send + Sync + 'static
where
  I: Send + 'static,
  R: Send + 'static,
  F: Flow<Output = FlowFuture<R>>,
  H: AsyncHandlerBehavior<I, R, F::Signal>,
{
  let behavior = Arc::new(behavior);
  move |input: I, signal: F::Signal| {
    let behavior = Arc::clone(&behavior);
    let fut: FlowFuture<R> = Box::pin(async move { behavior.handle(input, signal).await });
    fut
  }
}
