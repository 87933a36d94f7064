// tests/mutator_tests.rs
mod common;

use common::*;
use serial_test::serial;
use std::sync::{mpsc, Arc};
use std::time::Duration;
use switchyard::{
  AddingMode, Blocking, Cases, HandlerFn, LinearFn, Mutator, Next, Space, SwitchFn, SwitchyardError, SwitchyardResult,
};

type Text = Blocking<String>;

/// Mutator that adds one to the input of an `i32` handler.
fn plus_one(inner: HandlerFn<i32, Ret>) -> HandlerFn<i32, Ret> {
  Arc::new(move |value: i32, signal: ()| inner(value + 1, signal))
}

#[test]
fn mutator_rewrites_handler_input() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let pipeline = arithmetic_pipeline(&space, "arithmetic")?;

  let handler = space.get_required_handler_step::<i32, Ret>("arithmetic", "identity")?;
  handler.mutate("plus_one", 0, plus_one)?;

  assert_eq!(pipeline.compile()?.run(2), 22);
  assert_eq!(handler.mutator_names(), vec!["plus_one".to_string()]);
  // The stored behavior stays untouched; only the resolved one changes.
  assert_eq!((handler.behavior())(5, ()), 5);
  assert_eq!((handler.resolve())(5, ()), 6);
  Ok(())
}

#[test]
fn spaces_do_not_share_mutators() -> SwitchyardResult<()> {
  setup_tracing();
  let mutated = Space::new();
  let pristine = Space::new();
  let mutated_pipeline = arithmetic_pipeline(&mutated, "arithmetic")?;
  let pristine_pipeline = arithmetic_pipeline(&pristine, "arithmetic")?;

  mutated
    .get_required_handler_step::<i32, Ret>("arithmetic", "identity")?
    .mutate("plus_one", 0, plus_one)?;

  assert_eq!(mutated_pipeline.compile()?.run(2), 22);
  assert_eq!(pristine_pipeline.compile()?.run(2), 21);
  Ok(())
}

fn tagging_pipeline(space: &Space) -> SwitchyardResult<switchyard::Pipeline<String, Text>> {
  space
    .create_pipeline::<String, Text>("tags")?
    .start_with_linear("tag", |text: String, _: (), next: Next<String, Text>| next.run(text + "|base"))?
    .handle_with("result", |text: String, _: ()| text)?
    .build_pipeline()
}

/// Wraps a linear behavior so it appends `tag` to the input before delegating.
fn tag_before(tag: &'static str) -> impl Fn(LinearFn<String, String, Text>) -> LinearFn<String, String, Text> {
  move |inner: LinearFn<String, String, Text>| -> LinearFn<String, String, Text> {
    Arc::new(move |text: String, signal: (), next: Next<String, Text>| inner(text + tag, signal, next))
  }
}

#[test]
#[serial]
fn higher_priority_mutators_wrap_outward() -> SwitchyardResult<()> {
  setup_tracing();
  reset_counters();
  let space = Space::new();
  let pipeline = tagging_pipeline(&space)?;
  let step = space.get_required_linear_step::<String, String, Text>("tags", "tag")?;

  // Registration order does not matter, only priority.
  step.mutate("outer", 20, tag_before("|outer"))?;
  step.add_mutator(Mutator::new("inner", 10, tag_before("|inner")), AddingMode::ExactPlace)?;
  step.mutate("logged", -5, |inner: LinearFn<String, String, Text>| -> LinearFn<String, String, Text> {
    Arc::new(move |text: String, signal: (), next: Next<String, Text>| {
      record(format!("logged:{}", text));
      inner(text, signal, next)
    })
  })?;

  assert_eq!(step.mutator_names(), vec!["logged", "inner", "outer"]);
  assert_eq!(pipeline.compile()?.run("x".to_string()), "x|outer|inner|base");
  assert_eq!(take_trail(), vec!["logged:x|outer|inner".to_string()]);
  Ok(())
}

#[test]
fn occupied_priority_slot_is_rejected() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let pipeline = tagging_pipeline(&space)?;
  let step = space.get_required_linear_step::<String, String, Text>("tags", "tag")?;

  step.mutate("first", 1, tag_before("|first"))?;
  match expect_err(step.mutate("second", 1, tag_before("|second"))) {
    SwitchyardError::MutatorSlotOccupied {
      step: name,
      priority,
      occupant,
      rejected,
    } => {
      assert_eq!(name.to_string(), "tags/tag");
      assert_eq!(priority, 1);
      assert_eq!(occupant, "first");
      assert_eq!(rejected, "second");
    }
    other => panic!("expected MutatorSlotOccupied, got {:?}", other),
  }

  // The rejected mutator left no trace.
  assert_eq!(pipeline.compile()?.run("x".to_string()), "x|first|base");
  Ok(())
}

#[test]
fn compiled_pipeline_ignores_later_mutators() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let pipeline = arithmetic_pipeline(&space, "arithmetic")?;
  let before = pipeline.compile()?;

  space
    .get_required_handler_step::<i32, Ret>("arithmetic", "identity")?
    .mutate("plus_one", 0, plus_one)?;
  let after = pipeline.compile()?;

  assert_eq!(before.run(2), 21);
  assert_eq!(after.run(2), 22);
  Ok(())
}

#[test]
fn compile_with_attaches_mutators_first() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let pipeline = arithmetic_pipeline(&space, "arithmetic")?;

  let compiled = pipeline.compile_with(|space| {
    space
      .get_required_linear_step::<i32, i32, Ret>("arithmetic", "times_three")?
      .mutate("times_four_instead", 0, |_: LinearFn<i32, i32, Ret>| -> LinearFn<i32, i32, Ret> {
        Arc::new(|value: i32, _: (), next: Next<i32, Ret>| next.run(value * 4))
      })?;
    Ok(())
  })?;

  assert_eq!(compiled.run(2), 28);
  Ok(())
}

#[test]
fn compile_with_returns_framework_errors_unchanged() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let pipeline = arithmetic_pipeline(&space, "arithmetic")?;

  let result = pipeline.compile_with(|space| {
    space.get_required_handler_step::<i32, Ret>("arithmetic", "no_such_step")?;
    Ok(())
  });

  assert!(matches!(
    expect_err(result),
    SwitchyardError::StepNotFound { ref step } if step.step == "no_such_step"
  ));
  Ok(())
}

#[test]
fn compile_with_wraps_foreign_errors() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let pipeline = arithmetic_pipeline(&space, "arithmetic")?;

  let result = pipeline.compile_with(|_| Err(TestError::Setup("feature flag missing".to_string()).into()));

  match expect_err(result) {
    SwitchyardError::ConfigurationFailure { pipeline, source } => {
      assert_eq!(pipeline, "arithmetic");
      assert_eq!(
        source.downcast_ref::<TestError>(),
        Some(&TestError::Setup("feature flag missing".to_string()))
      );
    }
    other => panic!("expected ConfigurationFailure, got {:?}", other),
  }
  Ok(())
}

#[test]
#[serial]
fn selector_mutator_reroutes_a_switch() -> SwitchyardResult<()> {
  setup_tracing();
  reset_counters();
  let space = Space::new();
  let pipeline = space
    .create_pipeline::<i32, Ret>("routing")?
    .start_with_switch(
      "route",
      |value: i32, _: (), cases: Cases<i32, Ret>, default: Next<i32, Ret>| {
        if value > 0 {
          cases["positive"].run(value)
        } else {
          default.run(value)
        }
      },
      |cases| {
        cases.case("positive", |case| {
          case
            .start_with_linear("double", |value: i32, _: (), next: Next<i32, Ret>| {
              bump(&BRANCH_A_EXEC_COUNTER);
              next.run(value * 2)
            })?
            .build_open_pipeline()
        })?;
        Ok(())
      },
      |default| {
        default
          .start_with_linear("zero", |_: i32, _: (), next: Next<i32, Ret>| {
            bump(&DEFAULT_EXEC_COUNTER);
            next.run(0)
          })?
          .build_open_pipeline()
      },
    )?
    .handle_with("result", |value: i32, _: ()| value)?
    .build_pipeline()?;

  space
    .get_required_switch_step::<i32, i32, i32, Ret>("routing", "route")?
    .mutate("always_default", 0, |_: SwitchFn<i32, i32, i32, Ret>| -> SwitchFn<i32, i32, i32, Ret> {
      Arc::new(|value: i32, _: (), _cases: Cases<i32, Ret>, default: Next<i32, Ret>| default.run(value))
    })?;

  assert_eq!(pipeline.compile()?.run(5), 0);
  assert_eq!(count(&BRANCH_A_EXEC_COUNTER), 0);
  assert_eq!(count(&DEFAULT_EXEC_COUNTER), 1);
  Ok(())
}

#[test]
fn branch_steps_can_be_mutated() -> SwitchyardResult<()> {
  setup_tracing();
  let space = Space::new();
  let pipeline = space
    .create_pipeline::<String, Ret>("measure_or_parse")?
    .start_with_if(
      "is_int",
      |text: String, _: (), measure: Next<String, Ret>, next: Next<i32, Ret>| match text.parse::<i32>() {
        Ok(value) => next.run(value),
        Err(_) => measure.run(text),
      },
      |branch| {
        branch
          .start_with_linear("measure", |text: String, _: (), next: Next<i32, Ret>| next.run(text.len() as i32))?
          .build_open_pipeline()
      },
    )?
    .handle_with("result", |value: i32, _: ()| value)?
    .build_pipeline()?;

  space
    .get_required_linear_step::<String, i32, Ret>("measure_or_parse", "measure")?
    .mutate("count_words", 0, |_: LinearFn<String, i32, Ret>| -> LinearFn<String, i32, Ret> {
      Arc::new(|text: String, _: (), next: Next<i32, Ret>| next.run(text.split_whitespace().count() as i32))
    })?;

  let compiled = pipeline.compile()?;
  assert_eq!(compiled.run("two words".to_string()), 2);
  assert_eq!(compiled.run("9".to_string()), 9);
  Ok(())
}

#[test]
#[serial]
fn transform_may_inspect_its_own_step() -> SwitchyardResult<()> {
  setup_tracing();
  reset_counters();
  let space = Space::new();
  let pipeline = arithmetic_pipeline(&space, "arithmetic")?;
  let step = space.get_required_linear_step::<i32, i32, Ret>("arithmetic", "times_three")?;
  let own = Arc::downgrade(&step);
  step.mutate("self_aware", 0, move |inner: LinearFn<i32, i32, Ret>| {
    if let Some(step) = own.upgrade() {
      record(step.mutator_names().join(","));
      // Only the first resolve succeeds; later ones find the slot taken.
      let _ = step.mutate("late", 1, |inner: LinearFn<i32, i32, Ret>| inner);
    }
    inner
  })?;

  let (sender, receiver) = mpsc::channel();
  std::thread::spawn(move || {
    let _ = sender.send(pipeline.compile().map(|compiled| compiled.run(2)));
  });
  let result = receiver
    .recv_timeout(Duration::from_secs(5))
    .expect("compile should not block on the step's own lock")?;

  assert_eq!(result, 21);
  assert_eq!(take_trail(), vec!["self_aware".to_string()]);
  assert_eq!(step.mutator_names(), vec!["self_aware".to_string(), "late".to_string()]);
  Ok(())
}
