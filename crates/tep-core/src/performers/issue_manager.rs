//! Keeps one tracking issue per proposal in step with the pull requests that
//! add or change the proposal document.
//!
//! The decision for a single proposal is [`plan`], a pure function of the
//! event, the proposal as it reads at the PR head, and the open tracking issue
//! for it (if any). [`IssueManager`] does the reads, calls `plan` per proposal
//! and executes the resulting actions in order.

use super::{guarded, Performer};
use crate::error::Result;
use crate::event::{PrAction, PrEvent};
use crate::github::{ChangeKind, GitHubApi, IssueRequest};
use crate::outcome::{CancelToken, Event, Failure, Outcome};
use crate::parser;
use crate::status::Status;
use crate::tracking::TrackingIssue;
use crate::types::{ProposalInfo, PROPOSALS_DIR, PROPOSALS_REPO};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NAME: &str = "IssueManager";

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueAction {
    Create {
        proposal_id: String,
        request: IssueRequest,
    },
    Update {
        number: u64,
        proposal_id: String,
        request: IssueRequest,
    },
    Close {
        number: u64,
        proposal_id: String,
        comment: String,
    },
}

/// Comment posted on a tracking issue right before it is closed.
pub fn close_comment(proposal_id: &str, status: Status) -> String {
    format!(
        "Closing tracking issue for TEP-{proposal_id} because it has reached the terminal status {}",
        status.for_markdown()
    )
}

/// Decide what to do with the tracking issue for one proposal touched by the PR.
///
/// | tracking issue | action                 | result                            |
/// |----------------|------------------------|-----------------------------------|
/// | none           | opened                 | create                            |
/// | exists         | closed, merged         | update; close if status terminal  |
/// | exists, `new`  | synchronize            | update, status stays `new`        |
/// | anything else  |                        | nothing                           |
///
/// An update is only planned when the merged record differs from `existing`.
pub fn plan(
    event: &PrEvent,
    proposal: &ProposalInfo,
    existing: Option<&TrackingIssue>,
    tracking_label: &str,
) -> Vec<IssueAction> {
    match (existing, &event.action) {
        (Some(issue), PrAction::Closed) if event.is_merged => {
            let mut actions: Vec<IssueAction> =
                update_action(issue, proposal, event.number, proposal.status, tracking_label)
                    .into_iter()
                    .collect();
            if proposal.status.is_terminal() {
                actions.push(IssueAction::Close {
                    number: issue.issue_number,
                    proposal_id: proposal.id.clone(),
                    comment: close_comment(&proposal.id, proposal.status),
                });
            }
            actions
        }
        // Past `new`, a maintainer owns the status; don't clobber it.
        (Some(issue), PrAction::Synchronize) if issue.status == Status::New => {
            update_action(issue, proposal, event.number, Status::New, tracking_label)
                .into_iter()
                .collect()
        }
        (None, PrAction::Opened) => {
            // Proposals that predate tracking issues may already be past `proposed`.
            let status = match proposal.status {
                Status::Proposed => Status::New,
                other => other,
            };
            let mut issue = TrackingIssue::new(proposal.id.as_str(), status);
            issue.add_proposal_pr(event.number);
            for author in &proposal.authors {
                issue.add_assignee(author);
            }
            vec![IssueAction::Create {
                proposal_id: proposal.id.clone(),
                request: issue.request(&proposal.filename, tracking_label),
            }]
        }
        _ => Vec::new(),
    }
}

fn update_action(
    existing: &TrackingIssue,
    proposal: &ProposalInfo,
    pr_number: u64,
    status: Status,
    tracking_label: &str,
) -> Option<IssueAction> {
    let mut updated = existing.clone();
    updated.add_proposal_pr(pr_number);
    for author in &proposal.authors {
        updated.add_assignee(author);
    }
    updated.status = status;

    if updated == *existing {
        return None;
    }
    Some(IssueAction::Update {
        number: updated.issue_number,
        proposal_id: updated.proposal_id.clone(),
        request: updated.request(&proposal.filename, tracking_label),
    })
}

// ---------------------------------------------------------------------------
// IssueManager
// ---------------------------------------------------------------------------

pub struct IssueManager {
    github: Arc<dyn GitHubApi>,
    tracking_label: String,
}

impl IssueManager {
    pub fn new(github: Arc<dyn GitHubApi>, tracking_label: impl Into<String>) -> Self {
        Self {
            github,
            tracking_label: tracking_label.into(),
        }
    }

    /// `(id, path)` for each proposal document the PR adds or modifies.
    ///
    /// One entry per id: when several documents carry the same id, the first
    /// listed is used and the rest are logged and skipped.
    fn changed_proposals(&self, pr_number: u64, cancel: &CancelToken) -> Result<Vec<(String, String)>> {
        let files = guarded(cancel, || self.github.list_files_changed(pr_number))?;
        let mut found: Vec<(String, String)> = Vec::new();
        for file in files {
            if !matches!(file.change_kind, ChangeKind::Added | ChangeKind::Modified) {
                continue;
            }
            let Some(id) = parser::proposal_id_from_path(&file.filename) else {
                continue;
            };
            if let Some((_, kept)) = found.iter().find(|(seen, _)| *seen == id) {
                if *kept != file.filename {
                    warn!(
                        performer = NAME,
                        proposal = %id,
                        kept = %kept,
                        ignored = %file.filename,
                        "more than one document for the same TEP"
                    );
                }
                continue;
            }
            found.push((id, file.filename));
        }
        Ok(found)
    }

    fn load_proposal(
        &self,
        id: &str,
        path: &str,
        revision: &str,
        cancel: &CancelToken,
    ) -> Result<ProposalInfo> {
        let contents = guarded(cancel, || self.github.fetch_file_at_revision(path, revision))?;
        let prefix = format!("{PROPOSALS_DIR}/");
        let filename = path.strip_prefix(prefix.as_str()).unwrap_or(path);
        parser::from_document(id, filename, &contents).map_err(|e| e.in_document(path))
    }

    /// Open tracking issues keyed by proposal id.
    fn tracking_issues(&self, cancel: &CancelToken) -> Result<BTreeMap<String, TrackingIssue>> {
        let issues = guarded(cancel, || {
            self.github.list_open_issues_with_label(&self.tracking_label)
        })?;
        let mut found: BTreeMap<String, TrackingIssue> = BTreeMap::new();
        for issue in &issues {
            let Some(tracking) = TrackingIssue::from_issue(issue)? else {
                continue;
            };
            if let Some(kept) = found.get(&tracking.proposal_id) {
                warn!(
                    performer = NAME,
                    proposal = %tracking.proposal_id,
                    kept = kept.issue_number,
                    ignored = tracking.issue_number,
                    "more than one open tracking issue"
                );
                continue;
            }
            found.insert(tracking.proposal_id.clone(), tracking);
        }
        Ok(found)
    }

    fn apply(
        &self,
        action: &IssueAction,
        event: &PrEvent,
        cancel: &CancelToken,
    ) -> std::result::Result<(), Failure> {
        match action {
            IssueAction::Create {
                proposal_id,
                request,
            } => {
                info!(performer = NAME, proposal = %proposal_id, pr = %event.target(), "creating tracking issue");
                let number = guarded(cancel, || self.github.create_issue(request)).map_err(|e| {
                    Failure::from_error(
                        "CreatingTrackingIssue",
                        format!("Failure creating tracking issue for TEP-{proposal_id}"),
                        &e,
                    )
                })?;
                debug!(performer = NAME, issue = number, "tracking issue created");
            }
            IssueAction::Update {
                number,
                proposal_id,
                request,
            } => {
                info!(performer = NAME, proposal = %proposal_id, issue = number, pr = %event.target(), "updating tracking issue");
                guarded(cancel, || self.github.edit_issue(*number, request)).map_err(|e| {
                    Failure::from_error(
                        "UpdatingTrackingIssue",
                        format!("Failure updating tracking issue {number}"),
                        &e,
                    )
                })?;
            }
            IssueAction::Close {
                number,
                proposal_id,
                comment,
            } => {
                info!(performer = NAME, proposal = %proposal_id, issue = number, "closing tracking issue");
                guarded(cancel, || self.github.close_issue_with_comment(*number, comment)).map_err(
                    |e| {
                        Failure::from_error(
                            "CloseTrackingIssue",
                            format!("Failure closing tracking issue {number}"),
                            &e,
                        )
                    },
                )?;
            }
        }
        Ok(())
    }
}

impl Performer for IssueManager {
    fn name(&self) -> &'static str {
        NAME
    }

    fn perform(&self, event: &PrEvent, cancel: &CancelToken) -> Outcome {
        if event.repo != PROPOSALS_REPO {
            return Ok(None);
        }
        debug!(performer = NAME, pr = %event.target(), "checking tracking issues");

        if !matches!(
            event.action,
            PrAction::Opened | PrAction::Closed | PrAction::Synchronize
        ) {
            info!(performer = NAME, action = %event.action, "ignoring PR action");
            return Ok(None);
        }
        if event.is_abandoned() {
            info!(performer = NAME, pr = %event.target(), "ignoring closed but unmerged PR");
            return Ok(None);
        }

        let changed = self.changed_proposals(event.number, cancel).map_err(|e| {
            Failure::from_error(
                "LoadingPRTEPs",
                format!("Failure finding TEP markdown changes for {}", event.target()),
                &e,
            )
        })?;
        if changed.is_empty() {
            info!(performer = NAME, pr = %event.target(), "no TEPs added or modified");
            return Ok(None);
        }

        let mut failures = Vec::new();
        let mut proposals = Vec::new();
        for (id, path) in &changed {
            match self.load_proposal(id, path, &event.git_revision, cancel) {
                Ok(proposal) => proposals.push(proposal),
                Err(e) => {
                    let failure = Failure::from_error(
                        "LoadingPRTEPs",
                        format!("Failure loading TEP-{id} from {}", event.target()),
                        &e,
                    );
                    if failure.is_cancelled() {
                        return Err(failure);
                    }
                    failures.push(failure);
                }
            }
        }

        let mut written = 0usize;
        if !proposals.is_empty() {
            match self.tracking_issues(cancel) {
                Ok(issues) => {
                    for proposal in &proposals {
                        let actions =
                            plan(event, proposal, issues.get(&proposal.id), &self.tracking_label);
                        if actions.is_empty() {
                            debug!(performer = NAME, proposal = %proposal.id, "no tracking issue changes needed");
                        }
                        for action in &actions {
                            if let Err(failure) = self.apply(action, event, cancel) {
                                if failure.is_cancelled() {
                                    return Err(failure);
                                }
                                failures.push(failure);
                                break;
                            }
                            written += 1;
                        }
                    }
                }
                Err(e) => {
                    let failure = Failure::from_error(
                        "LoadingTrackingIssues",
                        "Failure loading existing tracking issues",
                        &e,
                    );
                    if failure.is_cancelled() {
                        return Err(failure);
                    }
                    failures.push(failure);
                }
            }
        }

        if !failures.is_empty() {
            return Err(Failure::aggregate(failures));
        }
        if written == 0 {
            return Ok(None);
        }
        Ok(Some(Event::new(
            "TrackingIssuesUpdatedOrCreated",
            format!(
                "Tracking issues created or updated for PR #{}",
                event.number
            ),
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
