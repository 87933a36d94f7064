pub mod behavior;
pub mod continuation;
pub mod flow;
pub mod pipeline_trait;
pub mod step;

// Re-export key types for easier access from other switchyard modules (and lib.rs)
pub use continuation::{Cases, Next};
pub use flow::{Async, Blocking, Cancellable, Flow, FlowFuture};
pub use pipeline_trait::AnyPipeline;
pub use step::{AnyStep, Step, StepKind, StepName};
