// switchyard/src/core/continuation.rs

//! Continuation handles handed to step behaviors: `Next<T, F>` for a single
//! "what happens next" and `Cases<T, F>` for a named dictionary of them.

use crate::core::flow::Flow;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// A continuation accepting a `T` under flow `F`.
///
/// Cloning is cheap (one `Arc`), so behaviors receive their continuations by value
/// and may move them into futures.
pub struct Next<T, F: Flow> {
  inner: Arc<dyn Fn(T, F::Signal) -> F::Output + Send + Sync>,
}

impl<T, F: Flow> Clone for Next<T, F> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T: 'static, F: Flow> Next<T, F> {
  pub fn new(f: impl Fn(T, F::Signal) -> F::Output + Send + Sync + 'static) -> Self {
    Self { inner: Arc::new(f) }
  }

  /// Continues the chain with `input`, passing the signal along.
  pub fn call(&self, input: T, signal: F::Signal) -> F::Output {
    (self.inner)(input, signal)
  }
}

impl<T: 'static, F> Next<T, F>
where
  F: Flow<Signal = ()>,
{
  /// `call` for flows without a cancellation signal.
  pub fn run(&self, input: T) -> F::Output {
    (self.inner)(input, ())
  }
}

impl<T, F: Flow> fmt::Debug for Next<T, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Next")
      .field("input", &std::any::type_name::<T>())
      .finish()
  }
}

/// Named continuations of a `Switch` (cases) or `MultiFork` (branches) step.
///
/// Indexing with a name that is not present panics like any `HashMap` lookup; use
/// [`Cases::get`] when the selector cannot guarantee the name.
pub struct Cases<T, F: Flow> {
  branches: Arc<HashMap<String, Next<T, F>>>,
}

impl<T, F: Flow> Clone for Cases<T, F> {
  fn clone(&self) -> Self {
    Self {
      branches: Arc::clone(&self.branches),
    }
  }
}

impl<T, F: Flow> Cases<T, F> {
  pub(crate) fn new(branches: HashMap<String, Next<T, F>>) -> Self {
    Self {
      branches: Arc::new(branches),
    }
  }

  pub fn get(&self, name: &str) -> Option<&Next<T, F>> {
    self.branches.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.branches.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.branches.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.branches.len()
  }

  pub fn is_empty(&self) -> bool {
    self.branches.is_empty()
  }
}

impl<'a, T, F: Flow> Index<&'a str> for Cases<T, F> {
  type Output = Next<T, F>;

  fn index(&self, name: &'a str) -> &Next<T, F> {
    &self.branches[name]
  }
}

impl<T, F: Flow> fmt::Debug for Cases<T, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names: Vec<&str> = self.names().collect();
    names.sort_unstable();
    f.debug_struct("Cases")
      .field("input", &std::any::type_name::<T>())
      .field("names", &names)
      .finish()
  }
}
