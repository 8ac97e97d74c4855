use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TepError {
    #[error("{0} is not a valid status")]
    InvalidStatus(String),

    #[error("couldn't parse date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("document has no front-matter block")]
    MissingFrontMatter,

    #[error("metadata for {key} is missing")]
    MissingMetadata { key: String },

    #[error("metadata for {key} is not {expected}")]
    WrongMetadataType { key: String, expected: &'static str },

    #[error("label {0} is not a valid TEP status")]
    InvalidStatusLabel(String),

    #[error("metadata for TEP-{id} has invalid status {status}")]
    InvalidMarkerStatus { id: String, status: String },

    #[error("invalid number '{0}' in tracking issue metadata")]
    InvalidNumber(String),

    #[error("parsing contents of {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: Box<TepError>,
    },

    #[error("{reason}: {message}")]
    Validation {
        reason: &'static str,
        message: String,
    },

    #[error("GitHub {operation} failed for {target}: {message}")]
    GitHub {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("reconciliation cancelled")]
    Cancelled,

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl TepError {
    pub fn validation(reason: &'static str, message: impl Into<String>) -> Self {
        TepError::Validation {
            reason,
            message: message.into(),
        }
    }

    pub fn github(
        operation: &'static str,
        target: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        TepError::GitHub {
            operation,
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Attach the path of the document that failed to parse.
    pub fn in_document(self, path: impl Into<String>) -> Self {
        TepError::Document {
            path: path.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TepError::Validation { .. } => ErrorKind::Validation,
            TepError::GitHub { .. } | TepError::Cancelled => ErrorKind::Collaborator,
            TepError::Document { source, .. } => source.kind(),
            _ => ErrorKind::Extraction,
        }
    }
}

/// Failure category reported alongside a reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Extraction,
    Collaborator,
    Aggregate,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, TepError>;
