//! Performer results and their aggregation into a single run status.

use crate::error::{ErrorKind, Result, TepError};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const ALL_SUCCEEDED: &str = "AllSucceeded";
pub const MULTIPLE_ERRORS: &str = "MultipleErrors";
pub const CANCELLED: &str = "Cancelled";

/// A normal event: something was done and is worth reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub reason: String,
    pub message: String,
}

impl Event {
    pub fn new(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub reason: String,
    pub message: String,
    pub kind: ErrorKind,
}

impl Failure {
    pub fn new(reason: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
            kind,
        }
    }

    /// Wrap an error under `reason`, prefixing `context` to its message.
    /// Cancellation always reports as [`CANCELLED`].
    pub fn from_error(reason: &str, context: impl fmt::Display, err: &TepError) -> Self {
        if matches!(err, TepError::Cancelled) {
            return Self::new(CANCELLED, ErrorKind::Collaborator, format!("{context}: {err}"));
        }
        Self::new(reason, err.kind(), format!("{context}: {err}"))
    }

    /// Validation errors carry their own reason code.
    pub fn from_validation(err: &TepError) -> Self {
        match err {
            TepError::Validation { reason, message } => {
                Self::new(*reason, ErrorKind::Validation, message.clone())
            }
            other => Self::new("InvalidEvent", other.kind(), other.to_string()),
        }
    }

    /// Fold several failures into one. A single failure is returned as is.
    pub fn aggregate(mut failures: Vec<Failure>) -> Failure {
        if failures.len() == 1 {
            return failures.remove(0);
        }
        let lines: Vec<String> = failures.iter().map(|f| format!("\t* {f}")).collect();
        Self::new(
            MULTIPLE_ERRORS,
            ErrorKind::Aggregate,
            format!(
                "multiple errors: {} errors occurred:\n{}",
                failures.len(),
                lines.join("\n")
            ),
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason == CANCELLED
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

/// What one performer did with one event. `Ok(None)` means nothing to report.
pub type Outcome = std::result::Result<Option<Event>, Failure>;

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// No performer reported anything.
    Unchanged,
    Succeeded { reason: String, message: String },
    Failed(Failure),
}

impl RunStatus {
    pub fn from_outcomes(outcomes: Vec<Outcome>) -> Self {
        let mut reported = false;
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(None) => {}
                Ok(Some(_)) => reported = true,
                Err(f) => failures.push(f),
            }
        }

        // A cancelled pass reports as cancelled, whatever else went wrong.
        if let Some(pos) = failures.iter().position(Failure::is_cancelled) {
            return RunStatus::Failed(failures.swap_remove(pos));
        }
        if !failures.is_empty() {
            return RunStatus::Failed(Failure::aggregate(failures));
        }
        if reported {
            RunStatus::Succeeded {
                reason: ALL_SUCCEEDED.to_string(),
                message: "TEP Automation successful".to_string(),
            }
        } else {
            RunStatus::Unchanged
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Unchanged => f.write_str("unchanged"),
            RunStatus::Succeeded { reason, message } => write!(f, "succeeded ({reason}): {message}"),
            RunStatus::Failed(failure) => write!(f, "failed ({failure})"),
        }
    }
}

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Shared cancellation flag, checked before every GitHub call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TepError::Cancelled)
        } else {
            Ok(())
        }
    }
}
