pub mod error;
pub mod event;
pub mod github;
pub mod outcome;
pub mod parser;
pub mod performers;
pub mod reconciler;
pub mod status;
pub mod tracking;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{ErrorKind, Result, TepError};
pub use event::PrEvent;
pub use github::GitHubApi;
pub use outcome::{CancelToken, RunStatus};
pub use reconciler::{Reconciler, Settings};
pub use status::Status;
