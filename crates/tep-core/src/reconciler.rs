//! One reconciliation pass: validate the event, run every performer against
//! it concurrently, and fold their outcomes into a [`RunStatus`].

use crate::error::ErrorKind;
use crate::event::PrEvent;
use crate::github::GitHubApi;
use crate::outcome::{CancelToken, Failure, Outcome, RunStatus, CANCELLED};
use crate::performers::{IssueManager, Performer, PrNotifier};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

pub const DEFAULT_BOT_USER: &str = "tekton-robot";
pub const DEFAULT_TRACKING_LABEL: &str = "tep-tracking";

/// Identity the performers act under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Only this user's comments are treated as earlier reminders.
    pub bot_user: String,
    /// Label every tracking issue carries.
    pub tracking_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_user: DEFAULT_BOT_USER.to_string(),
            tracking_label: DEFAULT_TRACKING_LABEL.to_string(),
        }
    }
}

pub struct Reconciler {
    performers: Vec<Box<dyn Performer>>,
}

impl Reconciler {
    /// The standard performer set: tracking-issue manager and PR notifier.
    pub fn new(github: Arc<dyn GitHubApi>, settings: &Settings) -> Self {
        Self::with_performers(vec![
            Box::new(IssueManager::new(github.clone(), settings.tracking_label.clone())),
            Box::new(PrNotifier::new(github, settings.bot_user.clone())),
        ])
    }

    pub fn with_performers(performers: Vec<Box<dyn Performer>>) -> Self {
        Self { performers }
    }

    /// Validate the trigger parameters, then reconcile. Invalid parameters
    /// fail the run before any GitHub call.
    pub fn reconcile_params(&self, params: &BTreeMap<String, String>, cancel: &CancelToken) -> RunStatus {
        match PrEvent::from_params(params) {
            Ok(event) => self.reconcile(&event, cancel),
            Err(e) => {
                warn!(error = %e, "invalid event parameters");
                RunStatus::Failed(Failure::from_validation(&e))
            }
        }
    }

    pub fn reconcile(&self, event: &PrEvent, cancel: &CancelToken) -> RunStatus {
        info!(pr = %event.target(), action = %event.action, "reconciling");

        let outcomes: Vec<Outcome> = thread::scope(|s| {
            let handles: Vec<_> = self
                .performers
                .iter()
                .map(|p| (p.name(), s.spawn(move || p.perform(event, cancel))))
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Failure::new(
                            "PerformerPanicked",
                            ErrorKind::Collaborator,
                            format!("performer {name} panicked"),
                        ))
                    })
                })
                .collect()
        });

        let mut status = RunStatus::from_outcomes(outcomes);
        // Writes may have landed before the cancel; the pass still fails.
        if cancel.is_cancelled() && !matches!(&status, RunStatus::Failed(f) if f.is_cancelled()) {
            status = RunStatus::Failed(Failure::new(
                CANCELLED,
                ErrorKind::Collaborator,
                format!("reconciliation of {} was cancelled", event.target()),
            ));
        }
        match &status {
            RunStatus::Failed(f) => warn!(pr = %event.target(), reason = %f.reason, "reconciliation failed: {}", f.message),
            other => info!(pr = %event.target(), "reconciliation {other}"),
        }
        status
    }
}
