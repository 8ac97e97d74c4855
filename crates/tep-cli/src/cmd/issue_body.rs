use crate::output::{print_fields, print_json};
use anyhow::Context;
use std::path::Path;
use tep_core::tracking::parse_body;

pub fn run(path: &Path, json: bool) -> anyhow::Result<()> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let fields = parse_body(&body)
        .with_context(|| format!("failed to parse tracking issue body {}", path.display()))?;

    if json {
        return print_json(&fields);
    }

    let prs: Vec<String> = fields.proposal_prs.iter().map(|n| format!("#{n}")).collect();
    let implementations: Vec<String> = fields
        .implementation_prs
        .iter()
        .map(|pr| format!("{}#{}", pr.repo, pr.number))
        .collect();
    print_fields(&[
        ("description", fields.description.clone()),
        ("proposal PRs", prs.join(", ")),
        ("implementation PRs", implementations.join(", ")),
        ("alpha target", fields.alpha_target.clone()),
        ("beta target", fields.beta_target.clone()),
        ("projects", fields.projects.clone()),
    ]);
    Ok(())
}
