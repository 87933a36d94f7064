// switchyard/src/error.rs
use crate::core::step::StepName;
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Errors raised while building, configuring or compiling pipelines.
///
/// Nothing here is produced while a compiled pipeline runs: author selectors and
/// handlers fail on their own terms and the framework never intercepts them.
#[derive(Debug, Error)]
pub enum SwitchyardError {
  #[error("Step with name '{step}' already exists")]
  StepWithNameAlreadyExists { step: StepName },

  #[error("Pipeline with name '{pipeline}' already exists")]
  PipelineWithNameAlreadyExists { pipeline: String },

  #[error("Step not found: {step}")]
  StepNotFound { step: StepName },

  #[error("Pipeline not found: {pipeline}")]
  PipelineNotFound { pipeline: String },

  #[error("Unexpected type for step '{step}' (expected {expected}, actual {actual})")]
  UnexpectedStepType {
    step: StepName,
    expected: String,
    actual: String,
  },

  #[error("Unexpected type for pipeline '{pipeline}' (expected {expected}, actual {actual})")]
  UnexpectedPipelineType {
    pipeline: String,
    expected: String,
    actual: String,
  },

  #[error("Invalid operation on pipeline '{pipeline}': {message}")]
  InvalidOperation { pipeline: String, message: String },

  #[error("Mutator '{rejected}' cannot take priority {priority} on step '{step}': slot is held by '{occupant}'")]
  MutatorSlotOccupied {
    step: StepName,
    priority: i32,
    occupant: String,
    rejected: String,
  },

  #[error("Mutator configuration failed for pipeline '{pipeline}'. Source: {source}")]
  ConfigurationFailure {
    pipeline: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Internal switchyard error: {0}")]
  Internal(String),
}

impl SwitchyardError {
  pub(crate) fn invalid_operation(pipeline: &str, message: impl Into<String>) -> Self {
    SwitchyardError::InvalidOperation {
      pipeline: pipeline.to_string(),
      message: message.into(),
    }
  }

  /// Turns the error of a configure callback back into a `SwitchyardError`.
  ///
  /// Callbacks usually fail by `?`-propagating one of our own errors through `anyhow`;
  /// those come back unwrapped so callers can still match on the variant.
  pub(crate) fn from_configure(pipeline: &str, err: AnyhowError) -> Self {
    match err.downcast::<SwitchyardError>() {
      Ok(own) => own,
      Err(source) => SwitchyardError::ConfigurationFailure {
        pipeline: pipeline.to_string(),
        source,
      },
    }
  }
}

pub type SwitchyardResult<T, E = SwitchyardError> = std::result::Result<T, E>;
