use crate::wire;
use base64::Engine as _;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, LINK, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tep_core::github::{ChangeKind, ChangedFile, GitHubApi, Issue, IssueRequest, IssueState, PrComment};
use tep_core::types::{INDEX_FILE, PROPOSALS_BRANCH, PROPOSALS_DIR, PROPOSALS_OWNER, PROPOSALS_REPO};
use tep_core::{Result, TepError};
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Empty or `None` means anonymous access.
    pub token: Option<String>,
    pub user_agent: String,
    pub per_page: u32,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            user_agent: concat!("tepbot/", env!("CARGO_PKG_VERSION")).to_string(),
            per_page: 20,
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`GitHubApi`] over the GitHub REST API.
///
/// Issue operations target the proposals repository; comment operations
/// target any repository under the proposals owner.
pub struct GitHubClient {
    http: Client,
    base: String,
    token: Option<String>,
    user_agent: String,
    per_page: u32,
}

impl GitHubClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(config.timeout)
            .build()
            .map_err(|e| TepError::github("build client", &config.api_base_url, e))?;
        Ok(Self {
            http,
            base: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.filter(|t| !t.is_empty()),
            user_agent: config.user_agent,
            per_page: config.per_page.max(1),
        })
    }

    fn repo_url(&self, repo: &str, rest: &str) -> String {
        format!("{}/repos/{PROPOSALS_OWNER}/{repo}/{rest}", self.base)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, &self.user_agent)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(&self, operation: &'static str, target: &str, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .map_err(|e| TepError::github(operation, target, e))?;
        let status = response.status();
        debug!(operation, resource = target, status = status.as_u16(), "github request");
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(TepError::github(operation, target, format!("{status}: {body}")));
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(operation: &'static str, target: &str, response: Response) -> Result<T> {
        response
            .json()
            .map_err(|e| TepError::github(operation, target, format!("decoding response: {e}")))
    }

    /// Follow `Link: rel="next"` until the last page.
    fn get_all<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        target: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let per_page = self.per_page.to_string();
        let mut items = Vec::new();
        let mut builder = self
            .request(Method::GET, url)
            .query(query)
            .query(&[("per_page", per_page.as_str()), ("page", "1")]);
        loop {
            let response = self.send(operation, target, builder)?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(wire::next_link);
            let page: Vec<T> = Self::decode(operation, target, response)?;
            items.extend(page);
            match next {
                Some(next) => builder = self.request(Method::GET, &next),
                None => break,
            }
        }
        Ok(items)
    }

    fn contents(&self, path: &str, reference: &str) -> Result<String> {
        let target = format!("{PROPOSALS_OWNER}/{PROPOSALS_REPO}/{path}@{reference}");
        let url = self.repo_url(PROPOSALS_REPO, &format!("contents/{path}"));
        let response = self.send(
            "fetch contents",
            &target,
            self.request(Method::GET, &url).query(&[("ref", reference)]),
        )?;
        let contents: wire::Contents = Self::decode("fetch contents", &target, response)?;
        if contents.encoding != "base64" {
            return Err(TepError::github(
                "fetch contents",
                &target,
                format!("unsupported encoding '{}'", contents.encoding),
            ));
        }
        let packed: String = contents.content.split_whitespace().collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(packed)
            .map_err(|e| TepError::github("fetch contents", &target, e))?;
        String::from_utf8(bytes).map_err(|e| TepError::github("fetch contents", &target, e))
    }
}

impl GitHubApi for GitHubClient {
    fn fetch_index_document(&self) -> Result<String> {
        self.contents(&format!("{PROPOSALS_DIR}/{INDEX_FILE}"), PROPOSALS_BRANCH)
    }

    fn list_files_changed(&self, pr_number: u64) -> Result<Vec<ChangedFile>> {
        let target = format!("{PROPOSALS_OWNER}/{PROPOSALS_REPO}#{pr_number}");
        let url = self.repo_url(PROPOSALS_REPO, &format!("pulls/{pr_number}/files"));
        let files: Vec<wire::PullFile> = self.get_all("list files", &target, &url, &[])?;
        Ok(files
            .into_iter()
            .map(|f| ChangedFile {
                change_kind: ChangeKind::from_github(&f.status),
                filename: f.filename,
            })
            .collect())
    }

    fn fetch_file_at_revision(&self, path: &str, revision: &str) -> Result<String> {
        self.contents(path, revision)
    }

    fn list_open_issues_with_label(&self, label: &str) -> Result<Vec<Issue>> {
        let target = format!("{PROPOSALS_OWNER}/{PROPOSALS_REPO}");
        let url = self.repo_url(PROPOSALS_REPO, "issues");
        let items: Vec<wire::IssueItem> = self.get_all(
            "list issues",
            &target,
            &url,
            &[("state", "open"), ("labels", label)],
        )?;
        Ok(items
            .into_iter()
            .filter(|item| item.pull_request.is_none())
            .map(|item| Issue {
                number: item.number,
                state: IssueState::from_github(&item.state),
                title: item.title,
                body: item.body.unwrap_or_default(),
                labels: item.labels.into_iter().map(|l| l.name).collect(),
                assignees: item.assignees.into_iter().map(|u| u.login).collect(),
            })
            .collect())
    }

    fn create_issue(&self, request: &IssueRequest) -> Result<u64> {
        let target = format!("{PROPOSALS_OWNER}/{PROPOSALS_REPO}");
        let url = self.repo_url(PROPOSALS_REPO, "issues");
        let payload = wire::IssuePayload {
            title: &request.title,
            body: &request.body,
            labels: &request.labels,
            assignees: &request.assignees,
        };
        let response = self.send(
            "create issue",
            &target,
            self.request(Method::POST, &url).json(&payload),
        )?;
        let created: wire::Created = Self::decode("create issue", &target, response)?;
        Ok(created.number)
    }

    fn edit_issue(&self, number: u64, request: &IssueRequest) -> Result<()> {
        let target = format!("{PROPOSALS_OWNER}/{PROPOSALS_REPO}#{number}");
        let url = self.repo_url(PROPOSALS_REPO, &format!("issues/{number}"));
        let payload = wire::IssuePayload {
            title: &request.title,
            body: &request.body,
            labels: &request.labels,
            assignees: &request.assignees,
        };
        self.send(
            "edit issue",
            &target,
            self.request(Method::PATCH, &url).json(&payload),
        )?;
        Ok(())
    }

    fn close_issue_with_comment(&self, number: u64, comment: &str) -> Result<()> {
        self.create_comment(PROPOSALS_REPO, number, comment)?;
        let target = format!("{PROPOSALS_OWNER}/{PROPOSALS_REPO}#{number}");
        let url = self.repo_url(PROPOSALS_REPO, &format!("issues/{number}"));
        self.send(
            "close issue",
            &target,
            self.request(Method::PATCH, &url)
                .json(&wire::StatePayload { state: "closed" }),
        )?;
        Ok(())
    }

    fn list_comments(&self, repo: &str, pr_number: u64) -> Result<Vec<PrComment>> {
        let target = format!("{PROPOSALS_OWNER}/{repo}#{pr_number}");
        let url = self.repo_url(repo, &format!("issues/{pr_number}/comments"));
        let items: Vec<wire::CommentItem> = self.get_all("list comments", &target, &url, &[])?;
        Ok(items
            .into_iter()
            .map(|c| PrComment {
                id: c.id,
                author: c.user.map(|u| u.login).unwrap_or_default(),
                body: c.body.unwrap_or_default(),
            })
            .collect())
    }

    fn create_comment(&self, repo: &str, pr_number: u64, body: &str) -> Result<u64> {
        let target = format!("{PROPOSALS_OWNER}/{repo}#{pr_number}");
        let url = self.repo_url(repo, &format!("issues/{pr_number}/comments"));
        let response = self.send(
            "create comment",
            &target,
            self.request(Method::POST, &url)
                .json(&wire::CommentPayload { body }),
        )?;
        let created: wire::CreatedComment = Self::decode("create comment", &target, response)?;
        Ok(created.id)
    }

    fn edit_comment(&self, repo: &str, comment_id: u64, body: &str) -> Result<()> {
        let target = format!("{PROPOSALS_OWNER}/{repo} comment {comment_id}");
        let url = self.repo_url(repo, &format!("issues/comments/{comment_id}"));
        self.send(
            "edit comment",
            &target,
            self.request(Method::PATCH, &url)
                .json(&wire::CommentPayload { body }),
        )?;
        Ok(())
    }
}
