//! Independent units of reconciliation run against the same event.

pub mod issue_manager;
pub mod notifier;

pub use issue_manager::IssueManager;
pub use notifier::PrNotifier;

use crate::error::Result;
use crate::event::PrEvent;
use crate::outcome::{CancelToken, Outcome};

pub trait Performer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handle one event. Performers share nothing but the collaborator, so
    /// they may run concurrently against the same event.
    fn perform(&self, event: &PrEvent, cancel: &CancelToken) -> Outcome;
}

/// Run one collaborator call unless the pass has been cancelled.
pub(crate) fn guarded<T>(cancel: &CancelToken, call: impl FnOnce() -> Result<T>) -> Result<T> {
    cancel.check()?;
    call()
}
