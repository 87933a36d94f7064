// switchyard/examples/basic_pipeline.rs

use switchyard::{Blocking, Next, Space, SwitchyardResult};
use tracing::info;

// A summary of what the pipeline saw, produced by its terminal handler.
#[derive(Debug, Default)]
struct Report {
  words: usize,
  longest: String,
}

type Flow = Blocking<Report>;

fn main() -> SwitchyardResult<()> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Pipeline Example ---");

  // 1. Every pipeline lives in a Space, which also holds each of its steps by name.
  let space = Space::new();

  // 2. Chain steps. Each one receives its input and the continuation of the rest.
  let pipeline = space
    .create_pipeline::<String, Flow>("word_report")?
    .start_with_linear("normalize", |text: String, _: (), next: Next<String, Flow>| {
      next.run(text.to_lowercase())
    })?
    .then_linear("split", |text: String, _: (), next: Next<Vec<String>, Flow>| {
      let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
      if words.is_empty() {
        // Not calling `next` ends the invocation here.
        info!("Nothing to report.");
        return Report::default();
      }
      next.run(words)
    })?
    .handle_with("report", |words: Vec<String>, _: ()| Report {
      words: words.len(),
      longest: words.iter().max_by_key(|w| w.len()).cloned().unwrap_or_default(),
    })?
    .build_pipeline()?;

  // 3. Compile once, run as often as needed.
  let compiled = pipeline.compile()?;
  let report = compiled.run("Switchyards route every Train".to_string());
  info!("Report: {:?}", report);
  assert_eq!(report.words, 4);
  assert_eq!(report.longest, "switchyards");

  let empty = compiled.run("   ".to_string());
  assert_eq!(empty.words, 0);

  info!("Registered steps: {:?}", space.step_names("word_report"));
  Ok(())
}
