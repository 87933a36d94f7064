// src/lib.rs

//! Switchyard: composable, type-checked pipelines of continuation-passing steps.
//!
//! A pipeline is a chain of named steps. Each step receives its input and a handle to
//! whatever follows it, and decides whether and how to continue:
//!  - Linear transforms that may also drop the input.
//!  - `If`, `IfElse` and `Switch` steps whose branches rejoin the main chain.
//!  - `Fork` and `MultiFork` steps that route to one of several independent pipelines.
//!  - Terminal handlers.
//!
//! Every step is registered in a [`Space`] under its pipeline and step name. Before a
//! pipeline is compiled, any step can be intercepted by name with [`Mutator`]s that
//! rewrite its behavior. Compilation folds the chain from the terminal step back to
//! the entry step into one [`CompiledPipeline`].
//!
//! Blocking, async and cancellable chains share the same model, parameterized by a
//! [`Flow`].

/*
    Typical use:
    1. Create a `Space`.
    2. `space.create_pipeline::<Input, Blocking>("name")?`, then chain `start_with_*`,
       `then_*` and finish with `handle_with(..)?.build_pipeline()`.
    3. Optionally look steps up with `space.get_required_<kind>_step` and attach
       mutators, or do so inside `pipeline.compile_with(|space| ..)`.
    4. `pipeline.compile()?` and call `run`/`invoke` on the result as often as needed.
*/

mod conditional;
pub mod core;
pub mod error;
pub mod mutator;
pub mod pipeline;
pub mod space;

// --- Re-exports for the Public API ---

pub use crate::core::behavior;
pub use crate::core::behavior::{
  AsyncHandlerBehavior, ForkSelector, HandlerBehavior, IfElseSelector, IfSelector, LinearBehavior,
  MultiForkSelector, SwitchSelector,
};
pub use crate::core::continuation::{Cases, Next};
pub use crate::core::flow::{Async, Blocking, Cancellable, Flow, FlowFuture};
pub use crate::core::pipeline_trait::AnyPipeline;
pub use crate::core::step::{
  AnyStep, ForkFn, HandlerFn, IfElseFn, IfFn, LinearFn, MultiForkFn, Step, StepKind, StepName, SwitchFn,
};

pub use crate::pipeline::{
  ClosedBuilder, CompiledPipeline, OpenPipeline, Pipeline, PipelineBuilder, ReducedPipeStep, SwitchCases,
};

pub use crate::mutator::{AddingMode, Mutator, MutatorChain};
pub use crate::space::Space;

pub use crate::error::{SwitchyardError, SwitchyardResult};

pub use tokio_util::sync::CancellationToken;
