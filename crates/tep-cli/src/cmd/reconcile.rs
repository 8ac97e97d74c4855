use crate::config::BotConfig;
use crate::dry_run::DryRun;
use crate::output::print_json;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tep_core::{CancelToken, GitHubApi, Reconciler, RunStatus};
use tep_github::GitHubClient;

/// One reconciliation pass for the event in `event_path`, a JSON object of
/// string parameters. A failed pass is reported and then returned as an error.
pub fn run(
    config: &BotConfig,
    token: Option<String>,
    event_path: &Path,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(event_path)
        .with_context(|| format!("failed to read event {}", event_path.display()))?;
    let params: BTreeMap<String, String> = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse event {}", event_path.display()))?;

    let client = GitHubClient::new(config.client_config(token))
        .context("failed to build GitHub client")?;
    let github: Arc<dyn GitHubApi> = if dry_run {
        Arc::new(DryRun::new(client))
    } else {
        Arc::new(client)
    };

    let reconciler = Reconciler::new(github, &config.settings());
    let status = reconciler.reconcile_params(&params, &CancelToken::new());

    if json {
        print_json(&status)?;
    } else {
        println!("{status}");
    }

    if let RunStatus::Failed(failure) = status {
        anyhow::bail!("reconciliation failed with {}", failure.reason);
    }
    Ok(())
}
