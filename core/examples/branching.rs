// switchyard/examples/branching.rs

use switchyard::{Blocking, Cases, Next, Space, SwitchyardResult};
use tracing::info;

type Flow = Blocking<String>;

fn main() -> SwitchyardResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Branching Example ---");

  let space = Space::new();

  // --- Fork targets: independent pipelines, no rejoin ---
  let numbers = space
    .create_pipeline::<i64, Flow>("numbers")?
    .start_with_switch(
      "by_size",
      |value: i64, _: (), cases: Cases<i64, Flow>, default: Next<i64, Flow>| {
        if value > 100 {
          cases["GreaterThan100"].run(value)
        } else {
          default.run(value)
        }
      },
      |cases| {
        cases.case("GreaterThan100", |case| {
          case
            .start_with_linear("triple", |value: i64, _: (), next: Next<i64, Flow>| next.run(value * 3))?
            .build_open_pipeline()
        })?;
        Ok(())
      },
      |default| {
        default
          .start_with_linear("keep", |value: i64, _: (), next: Next<i64, Flow>| next.run(value))?
          .build_open_pipeline()
      },
    )?
    .handle_with("format_number", |value: i64, _: ()| format!("number {}", value))?
    .build_pipeline()?;

  let words = space
    .create_pipeline::<String, Flow>("words")?
    .start_with_if(
      "is_long",
      |text: String, _: (), shorten: Next<String, Flow>, next: Next<String, Flow>| {
        if text.len() > 8 {
          shorten.run(text)
        } else {
          next.run(text)
        }
      },
      |branch| {
        branch
          .start_with_linear("shorten", |text: String, _: (), next: Next<String, Flow>| {
            next.run(format!("{}...", &text[..8]))
          })?
          .build_open_pipeline()
      },
    )?
    .handle_with("format_word", |text: String, _: ()| format!("word '{}'", text))?
    .build_pipeline()?;

  // --- Main pipeline: trim, then route to exactly one of the two ---
  let router = space
    .create_pipeline::<String, Flow>("router")?
    .start_with_linear("trim", |text: String, _: (), next: Next<String, Flow>| next.run(text.trim().to_string()))?
    .then_fork(
      "number_or_word",
      |text: String, _: (), numbers: Next<i64, Flow>, words: Next<String, Flow>| match text.parse::<i64>() {
        Ok(value) => numbers.run(value),
        Err(_) => words.run(text),
      },
      &numbers,
      &words,
    )?
    .build_pipeline()?
    .compile()?;

  for input in ["105", " 42 ", "switchyard", "rail"] {
    info!("{:>12} -> {}", format!("{:?}", input), router.run(input.to_string()));
  }
  assert_eq!(router.run("105".to_string()), "number 315");
  assert_eq!(router.run("switchyard".to_string()), "word 'switchya...'");

  info!("Pipelines: {:?}", space.pipeline_names());
  Ok(())
}
