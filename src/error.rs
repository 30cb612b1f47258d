use thiserror::Error;

use crate::types::{Event, Phase};

/// Failure of a single narrative generation call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Generation timed out after {0} ms")]
    TimedOut(u64),
    #[error("Generator not configured: {0}")]
    NotConfigured(String),
}

/// Rejected summon input. The state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Summon name must not be empty")]
    EmptySummon,
    #[error("Summon name is {len} characters long, at most {max} are allowed")]
    SummonTooLong { len: usize, max: usize },
}

/// Errors returned by [`crate::RoundEngine::step`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{event} is not accepted while {phase}")]
    InvalidTransition { phase: Phase, event: &'static str },

    #[error("The match has ended; start a new playthrough")]
    MatchEnded,

    /// A reset happened while the step was waiting on the generator
    #[error("Playthrough {started} was reset while the step was in flight")]
    Superseded { started: u64 },

    /// The state was inconsistent and has been reset
    #[error("Match state invariant violated ({0}); state was reset")]
    InvariantViolation(String),
}

impl StepError {
    pub(crate) fn invalid(phase: Phase, event: &Event) -> Self {
        StepError::InvalidTransition {
            phase,
            event: event.name(),
        }
    }
}

/// Errors reading configuration from the environment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
