//! Reminds PR authors to move the proposals their PR references along.
//!
//! Opened or edited PRs referencing `proposed`/`implementable` proposals get a
//! comment suggesting `implementing`; merged PRs referencing `implementing`
//! proposals get one suggesting `implemented`. The bot finds its own earlier
//! comment by the markers it left in it and edits that instead of posting again.

use super::{guarded, Performer};
use crate::error::{Result, TepError};
use crate::event::{PrAction, PrEvent};
use crate::github::{GitHubApi, PrComment};
use crate::outcome::{CancelToken, Event, Failure, Outcome};
use crate::parser;
use crate::status::{self, Status};
use crate::types::{CommentInfo, ProposalInfo, BLOB_BASE_URL, INDEX_FILE, PROPOSALS_DIR};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

pub const NAME: &str = "PRNotifier";

const TO_IMPLEMENTING_HEADER: &str = "This pull request appears to be referencing one or more \
[Tekton Enhancement Proposals](https://github.com/tektoncd/community/tree/main/teps#readme) \
which are currently in the `proposed` or `implementable` states. If this PR contains \
work towards implementing these TEPs, please update their state(s) to `implementing`.\n\
<!-- TEP Notifier Action: implementing -->\n\
TEPs:\n";

const TO_IMPLEMENTED_HEADER: &str = "This merged pull request appears to be referencing one or more \
[Tekton Enhancement Proposals](https://github.com/tektoncd/community/tree/main/teps#readme) \
which are currently in the `implementing` state. If this PR finished the work towards \
implementing these TEPs, please update their state(s) to `implemented`.\n\
<!-- TEP Notifier Action: implemented -->\n\
TEPs:\n";

// ---------------------------------------------------------------------------
// Comment text
// ---------------------------------------------------------------------------

/// Comment for opened/edited PRs.
pub fn implementing_comment(proposals: &[ProposalInfo]) -> String {
    comment_body(TO_IMPLEMENTING_HEADER, proposals)
}

/// Comment for merged PRs.
pub fn implemented_comment(proposals: &[ProposalInfo]) -> String {
    comment_body(TO_IMPLEMENTED_HEADER, proposals)
}

fn comment_body(header: &str, proposals: &[ProposalInfo]) -> String {
    let listing: String = proposals
        .iter()
        .map(|p| {
            format!(
                " * [TEP-{} ({})]({BLOB_BASE_URL}{}), current status: {}\n",
                p.id,
                p.title,
                p.filename,
                p.status.for_markdown()
            )
        })
        .collect();
    let markers: String = proposals
        .iter()
        .map(|p| format!("<!-- TEP update: TEP-{} status: {} -->\n", p.id, p.status))
        .collect();
    format!("{header}{listing}\n{markers}")
}

/// Re-derive a bot comment's markers. Comments without update markers are
/// `None`; a marker carrying an unknown status is an error.
pub fn comment_info(comment: &PrComment) -> Result<Option<CommentInfo>> {
    let (markers, to_implemented) = parser::comment_markers(&comment.body);
    if markers.is_empty() {
        return Ok(None);
    }
    for (id, raw) in &markers {
        if !status::is_valid(raw) {
            return Err(TepError::InvalidMarkerStatus {
                id: id.clone(),
                status: raw.clone(),
            });
        }
    }
    Ok(Some(CommentInfo {
        comment_id: comment.id,
        proposal_ids: markers.into_keys().collect(),
        to_implemented,
    }))
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentAction {
    Create { body: String },
    Edit { comment_id: u64, body: String },
}

/// The referenced proposals a comment should list, in first-reference order.
/// Ids missing from the index are skipped.
pub fn eligible_proposals(
    merged: bool,
    ids: &[String],
    index: &BTreeMap<String, ProposalInfo>,
) -> Vec<ProposalInfo> {
    let wanted: &[Status] = if merged {
        &[Status::Implementing]
    } else {
        &[Status::Proposed, Status::Implementable]
    };
    let mut seen = BTreeSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| index.get(id))
        .filter(|p| wanted.contains(&p.status))
        .cloned()
        .collect()
}

/// Decide whether to post, edit, or leave the reminder comment.
///
/// For merged PRs the first earlier reminder marked `implemented` is reused;
/// otherwise the last bot comment with markers is. An existing comment is only
/// edited when the set of proposals it lists differs.
pub fn plan(merged: bool, eligible: &[ProposalInfo], existing: &[CommentInfo]) -> Option<CommentAction> {
    if eligible.is_empty() {
        return None;
    }
    let body = if merged {
        implemented_comment(eligible)
    } else {
        implementing_comment(eligible)
    };

    let previous = if merged {
        existing.iter().find(|c| c.to_implemented)
    } else {
        existing.last()
    };

    match previous {
        None => Some(CommentAction::Create { body }),
        Some(comment) => {
            let listed: BTreeSet<&str> = comment.proposal_ids.iter().map(String::as_str).collect();
            let wanted: BTreeSet<&str> = eligible.iter().map(|p| p.id.as_str()).collect();
            if listed == wanted {
                None
            } else {
                Some(CommentAction::Edit {
                    comment_id: comment.comment_id,
                    body,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PrNotifier
// ---------------------------------------------------------------------------

pub struct PrNotifier {
    github: Arc<dyn GitHubApi>,
    bot_user: String,
}

impl PrNotifier {
    pub fn new(github: Arc<dyn GitHubApi>, bot_user: impl Into<String>) -> Self {
        Self {
            github,
            bot_user: bot_user.into(),
        }
    }

    fn index(&self, cancel: &CancelToken) -> Result<BTreeMap<String, ProposalInfo>> {
        let text = guarded(cancel, || self.github.fetch_index_document())?;
        parser::extract_from_index(&text).map_err(|e| e.in_document(format!("{PROPOSALS_DIR}/{INDEX_FILE}")))
    }

    /// Earlier reminders posted by the bot on this PR, oldest first.
    fn bot_comments(&self, event: &PrEvent, cancel: &CancelToken) -> Result<Vec<CommentInfo>> {
        let comments = guarded(cancel, || self.github.list_comments(&event.repo, event.number))?;
        let mut found = Vec::new();
        for comment in comments.iter().filter(|c| c.author == self.bot_user) {
            if let Some(info) = comment_info(comment)? {
                found.push(info);
            }
        }
        Ok(found)
    }
}

impl Performer for PrNotifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn perform(&self, event: &PrEvent, cancel: &CancelToken) -> Outcome {
        debug!(performer = NAME, pr = %event.target(), "checking for TEP references");

        if !matches!(
            event.action,
            PrAction::Opened | PrAction::Edited | PrAction::Closed
        ) {
            info!(performer = NAME, action = %event.action, "ignoring PR action");
            return Ok(None);
        }
        if event.is_abandoned() {
            info!(performer = NAME, pr = %event.target(), "ignoring closed PR because it was not merged");
            return Ok(None);
        }

        let ids = parser::ids_from_pr(&event.title, &event.body);
        if ids.is_empty() {
            info!(performer = NAME, pr = %event.target(), "no TEPs found in title or body");
            return Ok(None);
        }

        let index = self.index(cancel).map_err(|e| {
            Failure::from_error(
                "LoadingPRTEPs",
                format!("Failure loading TEPs for {}", event.target()),
                &e,
            )
        })?;

        let merged = event.action == PrAction::Closed;
        let eligible = eligible_proposals(merged, &ids, &index);
        if eligible.is_empty() {
            info!(performer = NAME, pr = %event.target(), "no referenced TEPs need a status change");
            return Ok(None);
        }

        let existing = self.bot_comments(event, cancel).map_err(|e| {
            Failure::from_error(
                "CheckingPRComments",
                format!("Failure checking for TEP comments for {}", event.target()),
                &e,
            )
        })?;

        match plan(merged, &eligible, &existing) {
            None => {
                debug!(performer = NAME, pr = %event.target(), "existing comment is up to date");
                Ok(None)
            }
            Some(CommentAction::Create { body }) => {
                let id = guarded(cancel, || {
                    self.github.create_comment(&event.repo, event.number, &body)
                })
                .map_err(|e| {
                    Failure::from_error(
                        "AddingPRComment",
                        format!("Failure adding new comment for {}", event.target()),
                        &e,
                    )
                })?;
                info!(performer = NAME, pr = %event.target(), comment = id, "comment added");
                Ok(Some(Event::new(
                    "CommentAdded",
                    format!("Comment for {}", event.target()),
                )))
            }
            Some(CommentAction::Edit { comment_id, body }) => {
                guarded(cancel, || {
                    self.github.edit_comment(&event.repo, comment_id, &body)
                })
                .map_err(|e| {
                    Failure::from_error(
                        "UpdatingPRComment",
                        format!(
                            "Failure updating existing comment {comment_id} for {}",
                            event.target()
                        ),
                        &e,
                    )
                })?;
                info!(performer = NAME, pr = %event.target(), comment = comment_id, "comment updated");
                Ok(Some(Event::new(
                    "CommentUpdated",
                    format!(
                        "Existing comment {comment_id} for {} updated",
                        event.target()
                    ),
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
