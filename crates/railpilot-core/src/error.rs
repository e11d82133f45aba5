//! Error types for ports and loops, each with an operator-facing suggestion.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::State;

/// Error codes for port failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortErrorCode {
    ElementNotFound,
    DriverFailed,
    SolverFailed,
    InvalidInput,
    InternalError,
}

impl fmt::Display for PortErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortErrorCode::ElementNotFound => write!(f, "ELEMENT_NOT_FOUND"),
            PortErrorCode::DriverFailed => write!(f, "DRIVER_FAILED"),
            PortErrorCode::SolverFailed => write!(f, "SOLVER_FAILED"),
            PortErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
            PortErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// A failure reported by the DOM or captcha port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortError {
    pub code: PortErrorCode,
    pub message: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (hint: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for PortError {}

impl PortError {
    pub fn element_not_found(target: impl fmt::Display) -> Self {
        Self {
            code: PortErrorCode::ElementNotFound,
            message: format!("No element matches '{}'", target),
            suggestion: Some(
                "The page may still be rendering; the loop retries on the next poll".into(),
            ),
        }
    }

    /// The element exists but cannot take the action yet (stale, covered).
    pub fn element_not_ready(message: impl Into<String>) -> Self {
        Self {
            code: PortErrorCode::ElementNotFound,
            message: message.into(),
            suggestion: Some("An overlay or re-render is in the way; the loop retries".into()),
        }
    }

    pub fn driver_failed(message: impl Into<String>) -> Self {
        Self {
            code: PortErrorCode::DriverFailed,
            message: message.into(),
            suggestion: Some(
                "Check that the WebDriver server is running and the browser window is open".into(),
            ),
        }
    }

    /// Solver failure with its stderr output included.
    pub fn solver_failed_with_stderr(message: impl Into<String>, stderr: Option<&str>) -> Self {
        let msg = message.into();
        let full_message = match stderr {
            Some(err) if !err.trim().is_empty() => format!("{}\nstderr: {}", msg, err.trim()),
            _ => msg,
        };
        Self {
            code: PortErrorCode::SolverFailed,
            message: full_message,
            suggestion: Some(
                "Run the solver command by hand with the captcha image to diagnose".into(),
            ),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            code: PortErrorCode::InvalidInput,
            message: message.into(),
            suggestion: Some("Check the command syntax and try again".into()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: PortErrorCode::InternalError,
            message: message.into(),
            suggestion: Some("This is an internal error. Please report it if it persists.".into()),
        }
    }

    /// Whether the failure clears up by itself on a later poll.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            PortErrorCode::ElementNotFound | PortErrorCode::SolverFailed
        )
    }
}

/// Failure of a flow loop.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Fatal-global: the train has no seats left.
    #[error("No seats available, further execution stopped")]
    NoSeatsAvailable,

    /// Fatal-global: the provider reported a hard error.
    #[error("Provider error: {marker}")]
    ProviderFatal { marker: String },

    /// Fatal-local: the post-search captcha budget ran out.
    #[error("Captcha not resolved after {attempts} attempts")]
    CaptchaBudgetExhausted { attempts: u32 },

    /// Safety valve tripped.
    #[error("{flow} gave up after {iterations} iterations (last state: {last_state})")]
    IterationLimit {
        flow: &'static str,
        iterations: u64,
        last_state: State,
    },

    #[error("Invalid booking criteria: {0}")]
    InvalidCriteria(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl FlowError {
    /// Map a fatal screen state to its error.
    pub fn from_fatal_state(state: State) -> Option<Self> {
        match state {
            State::NoSeatsAvailable => Some(FlowError::NoSeatsAvailable),
            State::ProviderFatalError => Some(FlowError::ProviderFatal {
                marker: crate::markers::PROVIDER_SORRY.to_string(),
            }),
            _ => None,
        }
    }

    /// Errors that must stop the entire run, not just the current loop.
    pub fn is_fatal_global(&self) -> bool {
        matches!(
            self,
            FlowError::NoSeatsAvailable | FlowError::ProviderFatal { .. }
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            FlowError::NoSeatsAvailable => 3,
            FlowError::ProviderFatal { .. } => 4,
            FlowError::CaptchaBudgetExhausted { .. } => 5,
            FlowError::IterationLimit { .. } => 6,
            FlowError::InvalidCriteria(_) => 2,
            FlowError::Port(_) => 1,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            FlowError::NoSeatsAvailable => {
                Some("Pick another train or class; retrying cannot book this one".into())
            }
            FlowError::ProviderFatal { .. } => {
                Some("The reservation site rejected the transaction; start a new run later".into())
            }
            FlowError::CaptchaBudgetExhausted { .. } => Some(
                "Check the solver output or rerun with --manual-captcha to solve by hand".into(),
            ),
            FlowError::IterationLimit { .. } => {
                Some("Raise --max-iterations or inspect the browser window".into())
            }
            FlowError::InvalidCriteria(_) => {
                Some("Use a train number, a class code like 3A and a date like 18/01/2026".into())
            }
            FlowError::Port(err) => err.suggestion.clone(),
        }
    }
}
