use crate::error::TepError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix added to a status to build the `tep-status/<status>` label on tracking issues.
pub const TRACKING_LABEL_PREFIX: &str = "tep-status/";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a proposal. `New` is used for proposals that have not
/// been merged yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    New,
    Proposed,
    Implementable,
    Implementing,
    Implemented,
    Withdrawn,
    Replaced,
}

impl Status {
    pub fn all() -> &'static [Status] {
        &[
            Status::New,
            Status::Proposed,
            Status::Implementable,
            Status::Implementing,
            Status::Implemented,
            Status::Withdrawn,
            Status::Replaced,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::New => "new",
            Status::Proposed => "proposed",
            Status::Implementable => "implementable",
            Status::Implementing => "implementing",
            Status::Implemented => "implemented",
            Status::Withdrawn => "withdrawn",
            Status::Replaced => "replaced",
        }
    }

    /// No further transition is expected once a proposal reaches one of these.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Implemented | Status::Withdrawn | Status::Replaced
        )
    }

    /// `tep-status/<status>`
    pub fn tracking_label(self) -> String {
        format!("{TRACKING_LABEL_PREFIX}{}", self.as_str())
    }

    /// Inverse of [`Status::tracking_label`]. Returns `None` when the label
    /// lacks the prefix or the suffix is not a known status.
    pub fn from_tracking_label(label: &str) -> Option<Status> {
        label.strip_prefix(TRACKING_LABEL_PREFIX)?.parse().ok()
    }

    /// The status wrapped in backticks for GitHub markdown.
    pub fn for_markdown(self) -> String {
        format!("`{}`", self.as_str())
    }
}

pub fn is_valid(s: &str) -> bool {
    Status::all().iter().any(|status| status.as_str() == s)
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = TepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Status::New),
            "proposed" => Ok(Status::Proposed),
            "implementable" => Ok(Status::Implementable),
            "implementing" => Ok(Status::Implementing),
            "implemented" => Ok(Status::Implemented),
            "withdrawn" => Ok(Status::Withdrawn),
            "replaced" => Ok(Status::Replaced),
            _ => Err(TepError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
