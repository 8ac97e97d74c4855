use tep_core::github::{ChangedFile, GitHubApi, Issue, IssueRequest, PrComment};
use tep_core::Result;
use tracing::info;

/// Passes reads through to GitHub and only logs the writes.
///
/// Created issues and comments get id 0.
pub struct DryRun<G> {
    inner: G,
}

impl<G: GitHubApi> DryRun<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

impl<G: GitHubApi> GitHubApi for DryRun<G> {
    fn fetch_index_document(&self) -> Result<String> {
        self.inner.fetch_index_document()
    }

    fn list_files_changed(&self, pr_number: u64) -> Result<Vec<ChangedFile>> {
        self.inner.list_files_changed(pr_number)
    }

    fn fetch_file_at_revision(&self, path: &str, revision: &str) -> Result<String> {
        self.inner.fetch_file_at_revision(path, revision)
    }

    fn list_open_issues_with_label(&self, label: &str) -> Result<Vec<Issue>> {
        self.inner.list_open_issues_with_label(label)
    }

    fn create_issue(&self, request: &IssueRequest) -> Result<u64> {
        info!(title = %request.title, labels = ?request.labels, assignees = ?request.assignees, "dry run: would create issue");
        Ok(0)
    }

    fn edit_issue(&self, number: u64, request: &IssueRequest) -> Result<()> {
        info!(issue = number, title = %request.title, labels = ?request.labels, "dry run: would edit issue");
        Ok(())
    }

    fn close_issue_with_comment(&self, number: u64, comment: &str) -> Result<()> {
        info!(issue = number, comment, "dry run: would close issue");
        Ok(())
    }

    fn list_comments(&self, repo: &str, pr_number: u64) -> Result<Vec<PrComment>> {
        self.inner.list_comments(repo, pr_number)
    }

    fn create_comment(&self, repo: &str, pr_number: u64, body: &str) -> Result<u64> {
        info!(repo, pr = pr_number, "dry run: would comment:\n{body}");
        Ok(0)
    }

    fn edit_comment(&self, repo: &str, comment_id: u64, body: &str) -> Result<()> {
        info!(repo, comment = comment_id, "dry run: would edit comment:\n{body}");
        Ok(())
    }
}
