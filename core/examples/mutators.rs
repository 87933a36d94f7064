// switchyard/examples/mutators.rs

use std::sync::Arc;
use std::time::Instant;
use switchyard::{Async, FlowFuture, HandlerFn, LinearFn, Next, Space, SwitchyardResult};
use tracing::info;

type Flow = Async<u32>;

#[tokio::main]
async fn main() -> SwitchyardResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Mutators Example ---");

  let space = Space::new();
  let pipeline = space
    .create_pipeline::<u32, Flow>("pricing")?
    .start_with_linear("apply_discount", |cents: u32, _: (), next: Next<u32, Flow>| next.run(cents * 90 / 100))?
    .handle_with("charge", |cents: u32, _: ()| -> FlowFuture<u32> {
      Box::pin(async move {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cents
      })
    })?
    .build_pipeline()?;

  let plain = pipeline.compile()?;
  info!("Without mutators: {}", plain.run(1_000).await);

  // Intercept steps by name. Lower priorities sit closer to the original behavior.
  let compiled = pipeline.compile_with(|space| {
    space
      .get_required_linear_step::<u32, u32, Flow>("pricing", "apply_discount")?
      .mutate("holiday_discount", 0, |_: LinearFn<u32, u32, Flow>| -> LinearFn<u32, u32, Flow> {
        Arc::new(|cents: u32, _: (), next: Next<u32, Flow>| next.run(cents / 2))
      })?;

    space
      .get_required_handler_step::<u32, Flow>("pricing", "charge")?
      .mutate("timing", 100, |inner: HandlerFn<u32, Flow>| -> HandlerFn<u32, Flow> {
        Arc::new(move |cents: u32, signal: ()| -> FlowFuture<u32> {
          let charge = inner(cents, signal);
          Box::pin(async move {
            let started = Instant::now();
            let charged = charge.await;
            info!(elapsed = ?started.elapsed(), charged, "Charge completed.");
            charged
          })
        })
      })?;
    Ok(())
  })?;

  let charged = compiled.run(1_000).await;
  info!("With mutators: {}", charged);
  assert_eq!(charged, 500);
  // Compiled before the mutators were attached, so unaffected by them.
  assert_eq!(plain.run(1_000).await, 900);

  Ok(())
}
