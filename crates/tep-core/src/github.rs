//! The GitHub operations the engine consumes. Implementations own transport,
//! authentication, pagination and retries; the engine only sees plain values.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How a file was changed by a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
}

impl ChangeKind {
    /// Map GitHub's file `status` string. Unknown values count as `Changed`.
    pub fn from_github(status: &str) -> Self {
        match status {
            "added" => ChangeKind::Added,
            "modified" => ChangeKind::Modified,
            "removed" => ChangeKind::Removed,
            "renamed" => ChangeKind::Renamed,
            "copied" => ChangeKind::Copied,
            "unchanged" => ChangeKind::Unchanged,
            _ => ChangeKind::Changed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub filename: String,
    pub change_kind: ChangeKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    /// Map GitHub's issue `state` string. Anything but `closed` is open.
    pub fn from_github(state: &str) -> Self {
        if state == "closed" {
            IssueState::Closed
        } else {
            IssueState::Open
        }
    }
}

/// An issue as returned by the issue listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub state: IssueState,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

/// Fields written when creating or editing a tracking issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrComment {
    pub id: u64,
    pub author: String,
    pub body: String,
}

/// Blocking request/response access to GitHub.
///
/// Issue operations target the proposals repository. Comment operations take
/// the repository name because PRs in any of the owner's repositories may
/// reference a proposal.
pub trait GitHubApi: Send + Sync {
    /// The proposal index document on the default branch.
    fn fetch_index_document(&self) -> Result<String>;

    fn list_files_changed(&self, pr_number: u64) -> Result<Vec<ChangedFile>>;

    fn fetch_file_at_revision(&self, path: &str, revision: &str) -> Result<String>;

    fn list_open_issues_with_label(&self, label: &str) -> Result<Vec<Issue>>;

    /// Returns the new issue number.
    fn create_issue(&self, request: &IssueRequest) -> Result<u64>;

    fn edit_issue(&self, number: u64, request: &IssueRequest) -> Result<()>;

    fn close_issue_with_comment(&self, number: u64, comment: &str) -> Result<()>;

    fn list_comments(&self, repo: &str, pr_number: u64) -> Result<Vec<PrComment>>;

    /// Returns the new comment id.
    fn create_comment(&self, repo: &str, pr_number: u64, body: &str) -> Result<u64>;

    fn edit_comment(&self, repo: &str, comment_id: u64, body: &str) -> Result<()>;
}
