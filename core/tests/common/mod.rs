// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use switchyard::{Blocking, Next, Pipeline, Space, SwitchyardError, SwitchyardResult};
use tracing::Level;

/// Flow used by most tests: synchronous, returning the handler's `i32`.
pub type Ret = Blocking<i32>;

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Test setup rejected: {0}")]
  Setup(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

/// Unwraps the error side of a builder or lookup result. Builders have no `Debug`, so
/// `Result::unwrap_err` is not available for them.
pub fn expect_err<T>(result: SwitchyardResult<T>) -> SwitchyardError {
  match result {
    Ok(_) => panic!("expected a SwitchyardError, got Ok"),
    Err(err) => err,
  }
}

// --- Common Pipelines ---

/// `value -> (value + 5) * 3`, registered as `arithmetic` unless another name is given.
pub fn arithmetic_pipeline(space: &Space, name: &str) -> SwitchyardResult<Pipeline<i32, Ret>> {
  space
    .create_pipeline::<i32, Ret>(name)?
    .start_with_linear("add_five", |value: i32, _: (), next: Next<i32, Ret>| next.run(value + 5))?
    .then_linear("times_three", |value: i32, _: (), next: Next<i32, Ret>| next.run(value * 3))?
    .handle_with("identity", |value: i32, _: ()| value)?
    .build_pipeline()
}

/// `"<digits>" -> parsed value`, anything else `-> -1`. Ends in a handler named `result`.
pub fn parse_pipeline(space: &Space, name: &str) -> SwitchyardResult<Pipeline<String, Ret>> {
  space
    .create_pipeline::<String, Ret>(name)?
    .start_with_linear("parse", |text: String, _: (), next: Next<i32, Ret>| {
      next.run(text.trim().parse().unwrap_or(-1))
    })?
    .handle_with("result", |value: i32, _: ()| value)?
    .build_pipeline()
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::TRACE)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Atomic counters for checking execution counts ---
pub static HANDLER_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static BRANCH_A_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static BRANCH_B_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static DEFAULT_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  HANDLER_EXEC_COUNTER.store(0, Ordering::SeqCst);
  BRANCH_A_EXEC_COUNTER.store(0, Ordering::SeqCst);
  BRANCH_B_EXEC_COUNTER.store(0, Ordering::SeqCst);
  DEFAULT_EXEC_COUNTER.store(0, Ordering::SeqCst);
  TRAIL.lock().clear();
}

pub fn count(counter: &AtomicUsize) -> usize {
  counter.load(Ordering::SeqCst)
}

pub fn bump(counter: &AtomicUsize) {
  counter.fetch_add(1, Ordering::SeqCst);
}

// --- Execution trail, for ordering assertions ---
pub static TRAIL: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn record(entry: impl Into<String>) {
  TRAIL.lock().push(entry.into());
}

pub fn take_trail() -> Vec<String> {
  std::mem::take(&mut *TRAIL.lock())
}
