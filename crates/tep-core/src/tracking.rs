//! The tracking issue kept per proposal, and the round-trip between it and
//! the issue text stored on GitHub.
//!
//! [`TrackingIssue::body`] renders the canonical issue body and
//! [`parse_body`] reads the tracked fields back out of it. The PR lists
//! always survive the round trip. Free-text fields survive only when they are
//! set: an empty field renders as a placeholder, and the placeholder parses
//! back to empty.

use crate::error::{Result, TepError};
use crate::github::{Issue, IssueRequest, IssueState};
use crate::status::{Status, TRACKING_LABEL_PREFIX};
use crate::types::{ImplementationPr, BLOB_BASE_URL, PROPOSALS_OWNER, PROPOSALS_REPO};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Placeholder rendered when the issue has no description.
pub const DEFAULT_DESCRIPTION: &str = "(specify a one-line description of the TEP)";
/// Placeholder rendered when a release target or the projects are unset.
pub const DEFAULT_FIELD: &str = "(unspecified)";

static TITLE_RE: OnceLock<Regex> = OnceLock::new();
static PROPOSAL_PR_RE: OnceLock<Regex> = OnceLock::new();
static IMPLEMENTATION_PR_RE: OnceLock<Regex> = OnceLock::new();
static DESCRIPTION_RE: OnceLock<Regex> = OnceLock::new();
static PROJECTS_RE: OnceLock<Regex> = OnceLock::new();
static ALPHA_RE: OnceLock<Regex> = OnceLock::new();
static BETA_RE: OnceLock<Regex> = OnceLock::new();

fn title_re() -> &'static Regex {
    TITLE_RE.get_or_init(|| Regex::new(r"^TEP-(\d+) Tracking Issue$").unwrap())
}

fn proposal_pr_re() -> &'static Regex {
    PROPOSAL_PR_RE.get_or_init(|| Regex::new(r"<!-- TEP PR: (\d+) -->").unwrap())
}

fn implementation_pr_re() -> &'static Regex {
    IMPLEMENTATION_PR_RE.get_or_init(|| {
        Regex::new(r"<!-- Implementation PR: repo: (.*?) number: (\d+) -->").unwrap()
    })
}

fn description_re() -> &'static Regex {
    DESCRIPTION_RE.get_or_init(|| Regex::new(r"(?m)^Description: (.*?)\r?$").unwrap())
}

fn projects_re() -> &'static Regex {
    PROJECTS_RE.get_or_init(|| Regex::new(r"(?m)^Project\(s\): (.*?)\r?$").unwrap())
}

fn alpha_re() -> &'static Regex {
    ALPHA_RE.get_or_init(|| Regex::new(r"(?m)^\* Alpha: (.*?)\r?$").unwrap())
}

fn beta_re() -> &'static Regex {
    BETA_RE.get_or_init(|| Regex::new(r"(?m)^\* Beta: (.*?)\r?$").unwrap())
}

/// `TEP-<id> Tracking Issue`
pub fn title_for(proposal_id: &str) -> String {
    format!("TEP-{proposal_id} Tracking Issue")
}

// ---------------------------------------------------------------------------
// TrackingIssue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackingIssue {
    pub issue_number: u64,
    pub issue_state: IssueState,
    pub status: Status,
    pub proposal_id: String,
    /// Pull requests against the proposals repository. Set semantics, insertion order.
    pub proposal_prs: Vec<u64>,
    /// Set semantics, insertion order.
    pub implementation_prs: Vec<ImplementationPr>,
    /// Accumulates; never shrunk here.
    pub assignees: Vec<String>,
    pub description: String,
    pub alpha_target: String,
    pub beta_target: String,
    pub projects: String,
}

impl TrackingIssue {
    pub fn new(proposal_id: impl Into<String>, status: Status) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            status,
            ..Self::default()
        }
    }

    pub fn add_assignee(&mut self, assignee: &str) {
        if !self.assignees.iter().any(|a| a == assignee) {
            self.assignees.push(assignee.to_string());
        }
    }

    pub fn add_proposal_pr(&mut self, number: u64) {
        if !self.proposal_prs.contains(&number) {
            self.proposal_prs.push(number);
        }
    }

    pub fn add_implementation_pr(&mut self, repo: &str, number: u64) {
        let present = self
            .implementation_prs
            .iter()
            .any(|pr| pr.number == number && pr.repo == repo);
        if !present {
            self.implementation_prs.push(ImplementationPr {
                repo: repo.to_string(),
                number,
            });
        }
    }

    pub fn title(&self) -> String {
        title_for(&self.proposal_id)
    }

    /// Render the canonical issue body. `filename` is the proposal document
    /// inside the proposals directory.
    pub fn body(&self, filename: &str) -> String {
        let or_default = |value: &str, default: &'static str| -> String {
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };

        let authors: String = self
            .assignees
            .iter()
            .map(|assignee| format!("\n- @{assignee}"))
            .collect();
        let proposal_prs: String = self
            .proposal_prs
            .iter()
            .map(|number| format!("\n- (https://github.com/{PROPOSALS_OWNER}/{PROPOSALS_REPO}/pull/{number})"))
            .collect();
        let implementation_prs = if self.implementation_prs.is_empty() {
            String::new()
        } else {
            let lines: String = self
                .implementation_prs
                .iter()
                .map(|pr| format!("\n- (https://github.com/{PROPOSALS_OWNER}/{}/pull/{})", pr.repo, pr.number))
                .collect();
            format!("Implementation PRs:{lines}")
        };
        let proposal_markers: String = self
            .proposal_prs
            .iter()
            .map(|number| format!("\n<!-- TEP PR: {number} -->"))
            .collect();
        let implementation_markers: String = self
            .implementation_prs
            .iter()
            .map(|pr| format!("\n<!-- Implementation PR: repo: {} number: {} -->", pr.repo, pr.number))
            .collect();

        format!(
            "This issue tracks TEP-{id}.\n\
             \n\
             Use this issue for discussion of this TEP not directly related to pull requests updating or implementing the TEP.\n\
             \n\
             TEP: ({BLOB_BASE_URL}{filename})\n\
             Description: {description}\n\
             Current status: {status}\n\
             Authors:{authors}\n\
             Project(s): {projects}\n\
             Release Targets:\n\
             * Alpha: {alpha}\n\
             * Beta: {beta}\n\
             \n\
             TEP PRs:{proposal_prs}\n\
             {implementation_prs}\n\
             {proposal_markers}\n\
             {implementation_markers}\n",
            id = self.proposal_id,
            description = or_default(&self.description, DEFAULT_DESCRIPTION),
            status = self.status.for_markdown(),
            projects = or_default(&self.projects, DEFAULT_FIELD),
            alpha = or_default(&self.alpha_target, DEFAULT_FIELD),
            beta = or_default(&self.beta_target, DEFAULT_FIELD),
        )
    }

    /// The create/edit request for this issue: title, rendered body, the
    /// tracking label plus the status label, and the assignees.
    pub fn request(&self, filename: &str, tracking_label: &str) -> IssueRequest {
        IssueRequest {
            title: self.title(),
            body: self.body(filename),
            labels: vec![tracking_label.to_string(), self.status.tracking_label()],
            assignees: self.assignees.clone(),
        }
    }

    /// Re-derive a tracking issue from a listed GitHub issue.
    ///
    /// Returns `Ok(None)` when the title doesn't name a proposal. A
    /// `tep-status/` label with an unknown suffix is an error. An issue with
    /// no status label is treated as `new`.
    pub fn from_issue(issue: &Issue) -> Result<Option<Self>> {
        let Some(caps) = title_re().captures(&issue.title) else {
            return Ok(None);
        };

        let mut status = Status::New;
        for label in &issue.labels {
            if label.starts_with(TRACKING_LABEL_PREFIX) {
                status = Status::from_tracking_label(label)
                    .ok_or_else(|| TepError::InvalidStatusLabel(label.clone()))?;
            }
        }

        let fields = parse_body(&issue.body)?;

        Ok(Some(Self {
            issue_number: issue.number,
            issue_state: issue.state,
            status,
            proposal_id: caps[1].to_string(),
            proposal_prs: fields.proposal_prs,
            implementation_prs: fields.implementation_prs,
            assignees: issue.assignees.clone(),
            description: fields.description,
            alpha_target: fields.alpha_target,
            beta_target: fields.beta_target,
            projects: fields.projects,
        }))
    }
}

// ---------------------------------------------------------------------------
// Body parsing
// ---------------------------------------------------------------------------

/// Fields recovered from a tracking issue body. Absent fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackedFields {
    pub proposal_prs: Vec<u64>,
    pub implementation_prs: Vec<ImplementationPr>,
    pub description: String,
    pub alpha_target: String,
    pub beta_target: String,
    pub projects: String,
}

fn parse_number(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| TepError::InvalidNumber(raw.to_string()))
}

fn free_text(re: &Regex, body: &str, default: &str) -> String {
    match re.captures(body) {
        Some(caps) => {
            let value = caps[1].trim();
            if value == default {
                String::new()
            } else {
                value.to_string()
            }
        }
        None => String::new(),
    }
}

pub fn parse_body(body: &str) -> Result<TrackedFields> {
    let proposal_prs = proposal_pr_re()
        .captures_iter(body)
        .map(|caps| parse_number(&caps[1]))
        .collect::<Result<Vec<_>>>()?;

    let implementation_prs = implementation_pr_re()
        .captures_iter(body)
        .map(|caps| {
            Ok(ImplementationPr {
                repo: caps[1].to_string(),
                number: parse_number(&caps[2])?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TrackedFields {
        proposal_prs,
        implementation_prs,
        description: free_text(description_re(), body, DEFAULT_DESCRIPTION),
        alpha_target: free_text(alpha_re(), body, DEFAULT_FIELD),
        beta_target: free_text(beta_re(), body, DEFAULT_FIELD),
        projects: free_text(projects_re(), body, DEFAULT_FIELD),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrackingIssue {
        TrackingIssue {
            issue_number: 5,
            issue_state: IssueState::Open,
            status: Status::Proposed,
            proposal_id: "1234".to_string(),
            proposal_prs: vec![100, 120],
            implementation_prs: vec![
                ImplementationPr {
                    repo: "pipeline".to_string(),
                    number: 77,
                },
                ImplementationPr {
                    repo: "triggers".to_string(),
                    number: 88,
                },
            ],
            assignees: vec!["abayer".to_string(), "vdemeester".to_string()],
            ..TrackingIssue::default()
        }
    }

    #[test]
    fn body_matches_template() {
        let expected = "This issue tracks TEP-1234.

Use this issue for discussion of this TEP not directly related to pull requests updating or implementing the TEP.

TEP: (https://github.com/tektoncd/community/blob/main/teps/1234-some-tep.md)
Description: (specify a one-line description of the TEP)
Current status: `proposed`
Authors:
- @abayer
- @vdemeester
Project(s): (unspecified)
Release Targets:
* Alpha: (unspecified)
* Beta: (unspecified)

TEP PRs:
- (https://github.com/tektoncd/community/pull/100)
- (https://github.com/tektoncd/community/pull/120)
Implementation PRs:
- (https://github.com/tektoncd/pipeline/pull/77)
- (https://github.com/tektoncd/triggers/pull/88)

<!-- TEP PR: 100 -->
<!-- TEP PR: 120 -->

<!-- Implementation PR: repo: pipeline number: 77 -->
<!-- Implementation PR: repo: triggers number: 88 -->
";
        assert_eq!(sample().body("1234-some-tep.md"), expected);
    }

    #[test]
    fn body_without_implementation_prs() {
        let mut issue = sample();
        issue.implementation_prs.clear();
        let body = issue.body("1234-some-tep.md");
        assert!(!body.contains("Implementation PRs:"));
        assert!(body.ends_with("<!-- TEP PR: 120 -->\n\n"));
    }

    #[test]
    fn pr_lists_round_trip() {
        let mut issue = sample();
        issue.description = "Do the thing".to_string();
        issue.alpha_target = "v0.40".to_string();
        issue.beta_target = "v0.45".to_string();
        issue.projects = "pipeline, triggers".to_string();

        let fields = parse_body(&issue.body("1234-some-tep.md")).unwrap();
        assert_eq!(fields.proposal_prs, issue.proposal_prs);
        assert_eq!(fields.implementation_prs, issue.implementation_prs);
        assert_eq!(fields.description, "Do the thing");
        assert_eq!(fields.alpha_target, "v0.40");
        assert_eq!(fields.beta_target, "v0.45");
        assert_eq!(fields.projects, "pipeline, triggers");
    }

    #[test]
    fn defaults_collapse_to_empty() {
        let fields = parse_body(&sample().body("1234-some-tep.md")).unwrap();
        assert_eq!(fields.description, "");
        assert_eq!(fields.alpha_target, "");
        assert_eq!(fields.beta_target, "");
        assert_eq!(fields.projects, "");
    }

    #[test]
    fn parse_empty_body() {
        assert_eq!(parse_body("").unwrap(), TrackedFields::default());
    }

    #[test]
    fn parse_rejects_overflowing_number() {
        let err = parse_body("<!-- TEP PR: 99999999999999999999999 -->").unwrap_err();
        assert!(matches!(err, TepError::InvalidNumber(_)));
    }

    #[test]
    fn add_is_idempotent() {
        let mut issue = sample();
        let before = issue.clone();
        issue.add_proposal_pr(100);
        issue.add_proposal_pr(100);
        issue.add_assignee("abayer");
        issue.add_implementation_pr("pipeline", 77);
        assert_eq!(issue, before);

        issue.add_proposal_pr(130);
        issue.add_proposal_pr(130);
        issue.add_assignee("new-author");
        issue.add_assignee("new-author");
        issue.add_implementation_pr("pipeline", 78);
        issue.add_implementation_pr("pipeline", 78);
        assert_eq!(issue.proposal_prs, vec![100, 120, 130]);
        assert_eq!(issue.assignees, vec!["abayer", "vdemeester", "new-author"]);
        assert_eq!(issue.implementation_prs.len(), 3);
    }

    #[test]
    fn same_number_different_repo_is_distinct() {
        let mut issue = sample();
        issue.add_implementation_pr("triggers", 77);
        assert_eq!(issue.implementation_prs.len(), 3);
    }

    #[test]
    fn from_issue_reads_labels_and_body() {
        let rendered = sample();
        let issue = Issue {
            number: 5,
            state: IssueState::Open,
            title: "TEP-1234 Tracking Issue".to_string(),
            body: rendered.body("1234-some-tep.md"),
            labels: vec![
                "tep-tracking".to_string(),
                "tep-status/proposed".to_string(),
            ],
            assignees: vec!["abayer".to_string(), "vdemeester".to_string()],
        };
        let parsed = TrackingIssue::from_issue(&issue).unwrap().unwrap();
        assert_eq!(parsed, rendered);
    }

    #[test]
    fn from_issue_invalid_status_label() {
        let issue = Issue {
            title: "TEP-1234 Tracking Issue".to_string(),
            labels: vec!["tep-status/bogus".to_string()],
            ..Issue::default()
        };
        assert!(matches!(
            TrackingIssue::from_issue(&issue).unwrap_err(),
            TepError::InvalidStatusLabel(_)
        ));
    }

    #[test]
    fn from_issue_ignores_other_titles() {
        let issue = Issue {
            title: "Some unrelated issue".to_string(),
            ..Issue::default()
        };
        assert!(TrackingIssue::from_issue(&issue).unwrap().is_none());
    }

    #[test]
    fn request_labels() {
        let req = sample().request("1234-some-tep.md", "tep-tracking");
        assert_eq!(req.title, "TEP-1234 Tracking Issue");
        assert_eq!(req.labels, vec!["tep-tracking", "tep-status/proposed"]);
        assert_eq!(req.assignees, vec!["abayer", "vdemeester"]);
    }
}
