use crate::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GitHub owner of the repository holding the proposals.
pub const PROPOSALS_OWNER: &str = "tektoncd";
/// Repository holding the proposals, under [`PROPOSALS_OWNER`].
pub const PROPOSALS_REPO: &str = "community";
/// Directory inside [`PROPOSALS_REPO`] containing the proposal documents.
pub const PROPOSALS_DIR: &str = "teps";
/// Branch the index document is read from.
pub const PROPOSALS_BRANCH: &str = "main";
/// File inside [`PROPOSALS_DIR`] holding the proposal index table.
pub const INDEX_FILE: &str = "README.md";
/// Base URL for links to proposal documents.
pub const BLOB_BASE_URL: &str = "https://github.com/tektoncd/community/blob/main/teps/";

// ---------------------------------------------------------------------------
// ProposalInfo
// ---------------------------------------------------------------------------

/// A proposal as read from the index table or from a proposal document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalInfo {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub filename: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
}

impl ProposalInfo {
    pub fn url(&self) -> String {
        format!("{BLOB_BASE_URL}{}", self.filename)
    }
}

/// Keep only the proposals currently in `status`.
pub fn with_status(
    proposals: &BTreeMap<String, ProposalInfo>,
    status: Status,
) -> BTreeMap<String, ProposalInfo> {
    proposals
        .iter()
        .filter(|(_, p)| p.status == status)
        .map(|(id, p)| (id.clone(), p.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// ImplementationPr
// ---------------------------------------------------------------------------

/// A pull request in one of the owner's repositories implementing a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplementationPr {
    pub repo: String,
    pub number: u64,
}

// ---------------------------------------------------------------------------
// CommentInfo
// ---------------------------------------------------------------------------

/// A reminder comment previously posted by the bot, re-derived from its markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentInfo {
    pub comment_id: u64,
    pub proposal_ids: Vec<String>,
    pub to_implemented: bool,
}
