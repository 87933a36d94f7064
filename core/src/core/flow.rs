// switchyard/src/core/flow.rs

//! The continuation effect a pipeline is parameterized by.
//!
//! Every continuation in a chain has the shape `Fn(T, Signal) -> Output`. A `Flow`
//! fixes `Output` (a plain value for blocking chains, a boxed future for async ones)
//! and `Signal` (`()` when cancellation is not supported). The step model, the
//! registry and the mutators are written once against this trait instead of once per
//! calling convention.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Boxed future returned by every continuation of an async flow.
pub type FlowFuture<R> = Pin<Box<dyn Future<Output = R> + Send>>;

pub trait Flow: Send + Sync + 'static {
  /// What every continuation in the chain returns.
  type Output: Send + 'static;
  /// Threaded explicitly through every call of the composed chain.
  type Signal: Clone + Send + Sync + 'static;
}

/// Synchronous chain. `Blocking` (`R = ()`) is fire-and-forget, `Blocking<R>` returns
/// whatever the terminal handler produces.
pub struct Blocking<R = ()>(PhantomData<fn() -> R>);

impl<R: Send + 'static> Flow for Blocking<R> {
  type Output = R;
  type Signal = ();
}

/// Asynchronous chain without cancellation.
pub struct Async<R = ()>(PhantomData<fn() -> R>);

impl<R: Send + 'static> Flow for Async<R> {
  type Output = FlowFuture<R>;
  type Signal = ();
}

/// Asynchronous chain with a `CancellationToken` handed to every step.
///
/// Observance is cooperative: a step that never looks at the token runs to completion.
pub struct Cancellable<R = ()>(PhantomData<fn() -> R>);

impl<R: Send + 'static> Flow for Cancellable<R> {
  type Output = FlowFuture<R>;
  type Signal = CancellationToken;
}
