// tests/flow_tests.rs
mod common;

use async_trait::async_trait;
use common::*;
use serial_test::serial;
use std::time::Duration;
use switchyard::{
  behavior, Async, AsyncHandlerBehavior, Blocking, CancellationToken, Cancellable, FlowFuture, ForkSelector,
  HandlerBehavior, IfElseSelector, LinearBehavior, Next, Space, SwitchyardResult,
};

type Maybe = Cancellable<Option<i32>>;

#[tokio::test]
async fn async_pipeline_awaits_every_step() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let compiled = space
    .create_pipeline::<i32, Async<i32>>("async_math")?
    .start_with_linear(
      "double_later",
      |value: i32, _: (), next: Next<i32, Async<i32>>| -> FlowFuture<i32> {
        Box::pin(async move {
          tokio::task::yield_now().await;
          next.run(value * 2).await
        })
      },
    )?
    .then_linear("plus_one", |value: i32, _: (), next: Next<i32, Async<i32>>| next.run(value + 1))?
    .handle_with("result", |value: i32, _: ()| -> FlowFuture<i32> { Box::pin(async move { value }) })?
    .build_pipeline()?
    .compile()?;

  assert_eq!(compiled.run(5).await, 11);
  Ok(())
}

#[tokio::test]
#[serial]
async fn async_fire_and_forget_can_drop() -> SwitchyardResult<()> {
  setup_tracing();
  reset_counters();
  let space = Space::new();
  let compiled = space
    .create_pipeline::<i32, Async>("async_filter")?
    .start_with_linear("only_positive", |value: i32, _: (), next: Next<i32, Async>| -> FlowFuture<()> {
      if value > 0 {
        next.run(value)
      } else {
        Box::pin(async {})
      }
    })?
    .handle_with("count", |_: i32, _: ()| -> FlowFuture<()> {
      Box::pin(async {
        bump(&HANDLER_EXEC_COUNTER);
      })
    })?
    .build_pipeline()?
    .compile()?;

  for value in [-2, -1, 0, 1, 2] {
    compiled.run(value).await;
  }
  assert_eq!(count(&HANDLER_EXEC_COUNTER), 2);
  Ok(())
}

fn cancellable_pipeline(space: &Space) -> SwitchyardResult<switchyard::Pipeline<i32, Maybe>> {
  space
    .create_pipeline::<i32, Maybe>("cancellable")?
    .start_with_linear(
      "check_token",
      |value: i32, token: CancellationToken, next: Next<i32, Maybe>| -> FlowFuture<Option<i32>> {
        if token.is_cancelled() {
          return Box::pin(async { None });
        }
        next.call(value, token)
      },
    )?
    .handle_with("slow_square", |value: i32, token: CancellationToken| -> FlowFuture<Option<i32>> {
      Box::pin(async move {
        bump(&HANDLER_EXEC_COUNTER);
        tokio::select! {
          _ = token.cancelled() => None,
          _ = tokio::time::sleep(Duration::from_millis(if value > 100 { 30_000 } else { 1 })) => Some(value * value),
        }
      })
    })?
    .build_pipeline()
}

#[tokio::test]
#[serial]
async fn cancellation_token_reaches_every_step() -> SwitchyardResult<()> {
  setup_tracing();
  reset_counters();
  let space = Space::new();
  let compiled = cancellable_pipeline(&space)?.compile()?;

  assert_eq!(compiled.invoke(4, CancellationToken::new()).await, Some(16));

  let cancelled = CancellationToken::new();
  cancelled.cancel();
  assert_eq!(compiled.invoke(4, cancelled).await, None);
  // The first step observed the token; the handler never started.
  assert_eq!(count(&HANDLER_EXEC_COUNTER), 1);
  Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_interrupts_a_running_step() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let compiled = cancellable_pipeline(&space)?.compile()?;

  let token = CancellationToken::new();
  let running = tokio::spawn(compiled.invoke(1_000, token.clone()));
  tokio::time::sleep(Duration::from_millis(20)).await;
  token.cancel();

  let outcome = tokio::time::timeout(Duration::from_secs(5), running)
    .await
    .expect("cancelled step should finish promptly")
    .expect("pipeline task panicked");
  assert_eq!(outcome, None);
  Ok(())
}

// --- Capability traits ---

struct Doubler;

#[async_trait]
impl AsyncHandlerBehavior<i32, i32> for Doubler {
  async fn handle(&self, input: i32, _signal: ()) -> i32 {
    tokio::task::yield_now().await;
    input * 2
  }
}

struct CancelAware;

#[async_trait]
impl AsyncHandlerBehavior<i32, Option<i32>, CancellationToken> for CancelAware {
  async fn handle(&self, input: i32, signal: CancellationToken) -> Option<i32> {
    if signal.is_cancelled() {
      None
    } else {
      Some(input)
    }
  }
}

#[tokio::test]
async fn async_handler_objects_adapt_to_async_flows() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let doubled = space
    .create_pipeline::<i32, Async<i32>>("doubler")?
    .start_with_handler("double", behavior::async_handler::<i32, i32, Async<i32>, _>(Doubler))?
    .build_pipeline()?
    .compile()?;
  let guarded = space
    .create_pipeline::<i32, Maybe>("guarded")?
    .start_with_handler("guard", behavior::async_handler::<i32, Option<i32>, Maybe, _>(CancelAware))?
    .build_pipeline()?
    .compile()?;

  assert_eq!(doubled.run(21).await, 42);
  assert_eq!(guarded.invoke(3, CancellationToken::new()).await, Some(3));
  let cancelled = CancellationToken::new();
  cancelled.cancel();
  assert_eq!(guarded.invoke(3, cancelled).await, None);
  Ok(())
}

struct AddN(i32);

impl LinearBehavior<i32, i32, Blocking<i32>> for AddN {
  fn run(&self, input: i32, _signal: (), next: Next<i32, Blocking<i32>>) -> i32 {
    next.run(input + self.0)
  }
}

struct Sign;

impl IfElseSelector<i32, i32, i32, Blocking<i32>> for Sign {
  fn select(
    &self,
    input: i32,
    _signal: (),
    negative: Next<i32, Blocking<i32>>,
    positive: Next<i32, Blocking<i32>>,
  ) -> i32 {
    if input < 0 {
      negative.run(input)
    } else {
      positive.run(input)
    }
  }
}

struct Echo;

impl HandlerBehavior<i32, Blocking<i32>> for Echo {
  fn handle(&self, input: i32, _signal: ()) -> i32 {
    input
  }
}

struct Constant(i32);

impl HandlerBehavior<i32, Blocking<i32>> for Constant {
  fn handle(&self, _input: i32, _signal: ()) -> i32 {
    self.0
  }
}

struct EvenOdd;

impl ForkSelector<i32, i32, i32, Blocking<i32>> for EvenOdd {
  fn select(&self, input: i32, _signal: (), even: Next<i32, Blocking<i32>>, odd: Next<i32, Blocking<i32>>) -> i32 {
    if input % 2 == 0 {
      even.run(input)
    } else {
      odd.run(input)
    }
  }
}

#[test]
fn capability_objects_plug_into_blocking_verbs() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let even = space
    .create_pipeline::<i32, Ret>("even")?
    .start_with_handler("echo", behavior::handler::<i32, Ret, _>(Echo))?
    .build_pipeline()?;
  let odd = space
    .create_pipeline::<i32, Ret>("odd")?
    .start_with_handler("constant", behavior::handler::<i32, Ret, _>(Constant(-1)))?
    .build_pipeline()?;

  let compiled = space
    .create_pipeline::<i32, Ret>("objects")?
    .start_with_linear("add_ten", behavior::linear::<i32, i32, Ret, _>(AddN(10)))?
    .then_if_else(
      "sign",
      behavior::if_else_selector::<i32, i32, i32, Ret, _>(Sign),
      |negative| {
        negative
          .start_with_linear("abs", |value: i32, _: (), next: Next<i32, Ret>| next.run(value.abs()))?
          .build_open_pipeline()
      },
      |positive| {
        positive
          .start_with_linear("add_one", behavior::linear::<i32, i32, Ret, _>(AddN(1)))?
          .build_open_pipeline()
      },
    )?
    .then_fork("parity", behavior::fork_selector::<i32, i32, i32, Ret, _>(EvenOdd), &even, &odd)?
    .build_pipeline()?
    .compile()?;

  // -14 + 10 = -4 -> abs 4 -> even -> 4
  assert_eq!(compiled.run(-14), 4);
  // 1 + 10 = 11 -> +1 = 12 -> even -> 12
  assert_eq!(compiled.run(1), 12);
  // 2 + 10 = 12 -> +1 = 13 -> odd -> -1
  assert_eq!(compiled.run(2), -1);
  Ok(())
}
