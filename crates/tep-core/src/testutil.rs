//! In-memory GitHub for engine tests. Writes are applied to the fake's state
//! and recorded, so a second pass sees what the first one wrote.

use crate::error::{Result, TepError};
use crate::github::{ChangeKind, ChangedFile, GitHubApi, Issue, IssueRequest, IssueState, PrComment};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

pub const BOT: &str = "tekton-robot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    CreateIssue(IssueRequest),
    EditIssue(u64, IssueRequest),
    CloseIssue(u64, String),
    CreateComment { repo: String, pr: u64, body: String },
    EditComment { repo: String, id: u64, body: String },
}

#[derive(Default)]
struct State {
    index: String,
    files: BTreeMap<u64, Vec<ChangedFile>>,
    documents: BTreeMap<(String, String), String>,
    issues: Vec<Issue>,
    comments: BTreeMap<(String, u64), Vec<PrComment>>,
    next_id: u64,
    calls: Vec<&'static str>,
    writes: Vec<Write>,
    failing: BTreeSet<&'static str>,
}

pub struct FakeGitHub {
    state: Mutex<State>,
}

impl Default for FakeGitHub {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        }
    }
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(self, index: &str) -> Self {
        self.state.lock().unwrap().index = index.to_string();
        self
    }

    /// Register an added proposal document on `pr` at `revision`.
    pub fn with_document(self, pr: u64, revision: &str, path: &str, contents: &str) -> Self {
        self.with_changed_file(pr, path, ChangeKind::Added)
            .with_file(path, revision, contents)
    }

    pub fn with_changed_file(self, pr: u64, path: &str, kind: ChangeKind) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .entry(pr)
            .or_default()
            .push(ChangedFile {
                filename: path.to_string(),
                change_kind: kind,
            });
        self
    }

    pub fn with_file(self, path: &str, revision: &str, contents: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .documents
            .insert((path.to_string(), revision.to_string()), contents.to_string());
        self
    }

    pub fn with_issue(self, issue: Issue) -> Self {
        self.state.lock().unwrap().issues.push(issue);
        self
    }

    pub fn with_comment(self, repo: &str, pr: u64, comment: PrComment) -> Self {
        self.state
            .lock()
            .unwrap()
            .comments
            .entry((repo.to_string(), pr))
            .or_default()
            .push(comment);
        self
    }

    /// Make every call to `operation` fail.
    pub fn failing(self, operation: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(operation);
        self
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.clear();
        state.writes.clear();
    }

    pub fn issue(&self, number: u64) -> Option<Issue> {
        self.state
            .lock()
            .unwrap()
            .issues
            .iter()
            .find(|i| i.number == number)
            .cloned()
    }

    pub fn comments(&self, repo: &str, pr: u64) -> Vec<PrComment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&(repo.to_string(), pr))
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self, operation: &'static str, target: &str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(operation) {
            return Err(TepError::github(operation, target, "injected failure"));
        }
        state.calls.push(operation);
        Ok(state)
    }
}

impl GitHubApi for FakeGitHub {
    fn fetch_index_document(&self) -> Result<String> {
        let state = self.begin("fetch index", "teps/README.md")?;
        Ok(state.index.clone())
    }

    fn list_files_changed(&self, pr_number: u64) -> Result<Vec<ChangedFile>> {
        let state = self.begin("list files", &format!("#{pr_number}"))?;
        Ok(state.files.get(&pr_number).cloned().unwrap_or_default())
    }

    fn fetch_file_at_revision(&self, path: &str, revision: &str) -> Result<String> {
        let state = self.begin("fetch file", path)?;
        state
            .documents
            .get(&(path.to_string(), revision.to_string()))
            .cloned()
            .ok_or_else(|| TepError::github("fetch file", path, "404 Not Found"))
    }

    fn list_open_issues_with_label(&self, label: &str) -> Result<Vec<Issue>> {
        let state = self.begin("list issues", label)?;
        Ok(state
            .issues
            .iter()
            .filter(|i| i.state == IssueState::Open && i.labels.iter().any(|l| l == label))
            .cloned()
            .collect())
    }

    fn create_issue(&self, request: &IssueRequest) -> Result<u64> {
        let mut state = self.begin("create issue", &request.title)?;
        state.next_id += 1;
        let number = state.next_id;
        state.issues.push(Issue {
            number,
            state: IssueState::Open,
            title: request.title.clone(),
            body: request.body.clone(),
            labels: request.labels.clone(),
            assignees: request.assignees.clone(),
        });
        state.writes.push(Write::CreateIssue(request.clone()));
        Ok(number)
    }

    fn edit_issue(&self, number: u64, request: &IssueRequest) -> Result<()> {
        let mut state = self.begin("edit issue", &format!("#{number}"))?;
        let issue = state
            .issues
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or_else(|| TepError::github("edit issue", format!("#{number}"), "404 Not Found"))?;
        issue.title = request.title.clone();
        issue.body = request.body.clone();
        issue.labels = request.labels.clone();
        issue.assignees = request.assignees.clone();
        state.writes.push(Write::EditIssue(number, request.clone()));
        Ok(())
    }

    fn close_issue_with_comment(&self, number: u64, comment: &str) -> Result<()> {
        let mut state = self.begin("close issue", &format!("#{number}"))?;
        let issue = state
            .issues
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or_else(|| TepError::github("close issue", format!("#{number}"), "404 Not Found"))?;
        issue.state = IssueState::Closed;
        state.writes.push(Write::CloseIssue(number, comment.to_string()));
        Ok(())
    }

    fn list_comments(&self, repo: &str, pr_number: u64) -> Result<Vec<PrComment>> {
        let state = self.begin("list comments", &format!("{repo}#{pr_number}"))?;
        Ok(state
            .comments
            .get(&(repo.to_string(), pr_number))
            .cloned()
            .unwrap_or_default())
    }

    fn create_comment(&self, repo: &str, pr_number: u64, body: &str) -> Result<u64> {
        let mut state = self.begin("create comment", &format!("{repo}#{pr_number}"))?;
        state.next_id += 1;
        let id = state.next_id;
        state
            .comments
            .entry((repo.to_string(), pr_number))
            .or_default()
            .push(PrComment {
                id,
                author: BOT.to_string(),
                body: body.to_string(),
            });
        state.writes.push(Write::CreateComment {
            repo: repo.to_string(),
            pr: pr_number,
            body: body.to_string(),
        });
        Ok(id)
    }

    fn edit_comment(&self, repo: &str, comment_id: u64, body: &str) -> Result<()> {
        let mut state = self.begin("edit comment", &format!("{repo} comment {comment_id}"))?;
        let comment = state
            .comments
            .values_mut()
            .flatten()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| TepError::github("edit comment", comment_id.to_string(), "404 Not Found"))?;
        comment.body = body.to_string();
        state.writes.push(Write::EditComment {
            repo: repo.to_string(),
            id: comment_id,
            body: body.to_string(),
        });
        Ok(())
    }
}
