//! GitHub REST implementation of [`tep_core::GitHubApi`].
//!
//! Blocking `reqwest` client, bearer-token auth (or anonymous), base64 file
//! contents, and `Link`-header pagination. No retries: a failed call surfaces
//! as [`tep_core::TepError::GitHub`] and the event is redelivered.

mod client;
mod wire;


pub use client::{ClientConfig, GitHubClient, DEFAULT_API_BASE_URL};
