use crate::output::{print_fields, print_json};
use anyhow::Context;
use std::path::Path;
use tep_core::parser::{from_document, proposal_id_from_path};
use tep_core::types::PROPOSALS_DIR;

/// Parse one proposal document. The id comes from the `NNNN-title.md` file name.
pub fn run(path: &Path, json: bool) -> anyhow::Result<()> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let id = proposal_id_from_path(&format!("{PROPOSALS_DIR}/{filename}"))
        .with_context(|| format!("{filename} is not named like NNNN-title.md"))?;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let proposal = from_document(&id, filename, &contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if json {
        return print_json(&proposal);
    }

    print_fields(&[
        ("id", format!("TEP-{}", proposal.id)),
        ("title", proposal.title.clone()),
        ("status", proposal.status.to_string()),
        ("updated", proposal.last_modified.format("%Y-%m-%d").to_string()),
        ("authors", proposal.authors.join(", ")),
        ("url", proposal.url()),
    ]);
    Ok(())
}
