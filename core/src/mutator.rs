// switchyard/src/mutator.rs

//! Named, prioritized wrappers around a step's behavior.
//!
//! A mutator maps "the behavior so far" to "a new behavior". Each step owns a
//! `MutatorChain` ordered by priority; compilation applies it in ascending order, so
//! the lowest priority sits closest to the original behavior and the highest one is
//! the outermost wrapper.

use crate::core::step::StepName;
use crate::error::{SwitchyardError, SwitchyardResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

pub struct Mutator<B> {
  name: String,
  priority: i32,
  transform: Arc<dyn Fn(B) -> B + Send + Sync>,
}

impl<B> Clone for Mutator<B> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      priority: self.priority,
      transform: Arc::clone(&self.transform),
    }
  }
}

impl<B: 'static> Mutator<B> {
  pub fn new(name: impl Into<String>, priority: i32, transform: impl Fn(B) -> B + Send + Sync + 'static) -> Self {
    Self {
      name: name.into(),
      priority,
      transform: Arc::new(transform),
    }
  }
}

impl<B> Mutator<B> {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn priority(&self) -> i32 {
    self.priority
  }

  pub fn apply(&self, behavior: B) -> B {
    (self.transform)(behavior)
  }
}

impl<B> fmt::Debug for Mutator<B> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Mutator")
      .field("name", &self.name)
      .field("priority", &self.priority)
      .finish()
  }
}

/// Placement policy for [`MutatorChain::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum AddingMode {
  /// The mutator takes exactly its own priority slot; an occupied slot is an error.
  #[default]
  ExactPlace,
}

/// Priority-ordered mutators of one step. Priorities are slots, not sort keys.
pub struct MutatorChain<B> {
  slots: BTreeMap<i32, Mutator<B>>,
}

impl<B> Default for MutatorChain<B> {
  fn default() -> Self {
    Self::new()
  }
}

impl<B> MutatorChain<B> {
  pub fn new() -> Self {
    Self { slots: BTreeMap::new() }
  }

  pub fn add(&mut self, step: &StepName, mutator: Mutator<B>, mode: AddingMode) -> SwitchyardResult<()> {
    match mode {
      AddingMode::ExactPlace => {
        if let Some(occupant) = self.slots.get(&mutator.priority) {
          event!(
            Level::ERROR,
            %step,
            priority = mutator.priority,
            occupant = %occupant.name,
            rejected = %mutator.name,
            "Mutator priority slot already taken."
          );
          return Err(SwitchyardError::MutatorSlotOccupied {
            step: step.clone(),
            priority: mutator.priority,
            occupant: occupant.name.clone(),
            rejected: mutator.name,
          });
        }
        self.slots.insert(mutator.priority, mutator);
        Ok(())
      }
    }
  }

  /// Wraps `base` with every mutator, ascending priority.
  pub fn apply(&self, base: B) -> B {
    self.slots.values().fold(base, |behavior, mutator| mutator.apply(behavior))
  }

  /// The mutators in application order.
  pub fn snapshot(&self) -> Vec<Mutator<B>> {
    self.slots.values().cloned().collect()
  }

  pub fn names(&self) -> Vec<String> {
    self.slots.values().map(|m| m.name.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }
}
