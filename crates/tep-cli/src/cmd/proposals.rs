use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;
use tep_core::parser::extract_from_index;
use tep_core::types::with_status;
use tep_core::Status;

pub fn run(index_path: &Path, status: Option<&str>, json: bool) -> anyhow::Result<()> {
    let index = std::fs::read_to_string(index_path)
        .with_context(|| format!("failed to read index {}", index_path.display()))?;
    let status = status.map(str::parse::<Status>).transpose()?;
    let proposals = extract_from_index(&index)
        .with_context(|| format!("failed to parse index {}", index_path.display()))?;

    let proposals = match status {
        Some(status) => with_status(&proposals, status),
        None => proposals,
    };
    let selected: Vec<_> = proposals.values().collect();

    if json {
        return print_json(&selected);
    }

    if selected.is_empty() {
        println!("No proposals.");
        return Ok(());
    }

    let rows = selected
        .iter()
        .map(|p| {
            vec![
                format!("TEP-{}", p.id),
                p.status.to_string(),
                p.last_modified.format("%Y-%m-%d").to_string(),
                p.title.clone(),
                p.filename.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "UPDATED", "TITLE", "FILE"], rows);
    Ok(())
}
