//! The pull-request event a reconciliation pass runs against, validated from
//! the flat string parameters the trigger passes in.

use crate::error::{Result, TepError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const ACTION_PARAM: &str = "pullRequestAction";
pub const NUMBER_PARAM: &str = "pullRequestNumber";
pub const TITLE_PARAM: &str = "pullRequestTitle";
pub const BODY_PARAM: &str = "pullRequestBody";
pub const PACKAGE_PARAM: &str = "package";
pub const IS_MERGED_PARAM: &str = "pullRequestIsMerged";
pub const GIT_REVISION_PARAM: &str = "gitRevision";

const KNOWN_PARAMS: &[&str] = &[
    ACTION_PARAM,
    NUMBER_PARAM,
    TITLE_PARAM,
    BODY_PARAM,
    PACKAGE_PARAM,
    IS_MERGED_PARAM,
    GIT_REVISION_PARAM,
];

// ---------------------------------------------------------------------------
// PrAction
// ---------------------------------------------------------------------------

/// The webhook action. Actions the performers don't handle are kept verbatim
/// so they can be logged and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    Opened,
    Edited,
    Closed,
    Synchronize,
    Other(String),
}

impl PrAction {
    pub fn parse(s: &str) -> Self {
        match s {
            "opened" => PrAction::Opened,
            "edited" => PrAction::Edited,
            "closed" => PrAction::Closed,
            "synchronize" => PrAction::Synchronize,
            other => PrAction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PrAction::Opened => "opened",
            PrAction::Edited => "edited",
            PrAction::Closed => "closed",
            PrAction::Synchronize => "synchronize",
            PrAction::Other(s) => s,
        }
    }
}

impl fmt::Display for PrAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PrEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrEvent {
    pub action: PrAction,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub owner: String,
    pub repo: String,
    pub is_merged: bool,
    pub git_revision: String,
}

impl PrEvent {
    /// Validate the trigger parameters. Every parameter is required and
    /// non-empty; unknown parameter names are rejected.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self> {
        let unexpected: Vec<&str> = params
            .keys()
            .map(String::as_str)
            .filter(|name| !KNOWN_PARAMS.contains(name))
            .collect();
        if !unexpected.is_empty() {
            return Err(TepError::validation(
                "UnexpectedParams",
                format!("Found unexpected params: {}", unexpected.join(", ")),
            ));
        }

        let action = PrAction::parse(required(params, ACTION_PARAM, "MissingPullRequestAction")?);

        let raw_number = required(params, NUMBER_PARAM, "MissingPullRequestNumber")?;
        let number = raw_number.parse::<u64>().map_err(|_| {
            TepError::validation(
                "InvalidPullRequestNumber",
                format!("{raw_number} is not a valid value for the {NUMBER_PARAM} param"),
            )
        })?;

        let title = required(params, TITLE_PARAM, "MissingPullRequestTitle")?.to_string();
        let body = required(params, BODY_PARAM, "MissingPullRequestBody")?.to_string();

        let package = required(params, PACKAGE_PARAM, "MissingPackage")?;
        let mut parts = package.split('/');
        let (owner, repo) = match (parts.next(), parts.next()) {
            (Some(owner), Some(repo)) => (owner.to_string(), repo.to_string()),
            _ => {
                return Err(TepError::validation(
                    "InvalidPackage",
                    format!(
                        "The {PACKAGE_PARAM} param value {package} does not contain an owner and a repository separated by '/'"
                    ),
                ))
            }
        };

        let raw_merged = required(params, IS_MERGED_PARAM, "MissingPullRequestIsMerged")?;
        let is_merged = parse_bool(raw_merged).ok_or_else(|| {
            TepError::validation(
                "InvalidPullRequestIsMerged",
                format!("{raw_merged} is not a valid value for the {IS_MERGED_PARAM} param"),
            )
        })?;

        let git_revision =
            required(params, GIT_REVISION_PARAM, "MissingPullRequestSHA")?.to_string();

        Ok(PrEvent {
            action,
            number,
            title,
            body,
            owner,
            repo,
            is_merged,
            git_revision,
        })
    }

    /// Closed without being merged. Nothing reacts to these.
    pub fn is_abandoned(&self) -> bool {
        self.action == PrAction::Closed && !self.is_merged
    }

    /// `owner/repo#number`, for log lines and failure messages.
    pub fn target(&self) -> String {
        format!("{}/{}#{}", self.owner, self.repo, self.number)
    }
}

fn required<'a>(
    params: &'a BTreeMap<String, String>,
    name: &str,
    reason: &'static str,
) -> Result<&'a str> {
    match params.get(name) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TepError::validation(
            reason,
            format!("The {name} param was not passed"),
        )),
    }
}

/// The boolean spellings accepted by the trigger templates.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
