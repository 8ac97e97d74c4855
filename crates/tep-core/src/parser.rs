//! Pure extraction of proposal facts from semi-structured text: the index
//! table, a proposal document's front-matter, the markers the notifier leaves
//! in PR comments, and proposal references in PR titles and bodies.

use crate::error::{Result, TepError};
use crate::status::Status;
use crate::types::ProposalInfo;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

static INDEX_ROW_RE: OnceLock<Regex> = OnceLock::new();
static NOTIFIER_ACTION_RE: OnceLock<Regex> = OnceLock::new();
static UPDATE_MARKER_RE: OnceLock<Regex> = OnceLock::new();
static ID_RE: OnceLock<Regex> = OnceLock::new();
static URL_RE: OnceLock<Regex> = OnceLock::new();
static CHANGED_FILE_RE: OnceLock<Regex> = OnceLock::new();

fn index_row_re() -> &'static Regex {
    INDEX_ROW_RE.get_or_init(|| {
        Regex::new(r"\|\[TEP-(\d+)\]\((.*?\.md)\) \| (.*?) \| (.*?) \| (\d\d\d\d-\d\d-\d\d) \|")
            .unwrap()
    })
}

fn notifier_action_re() -> &'static Regex {
    NOTIFIER_ACTION_RE.get_or_init(|| Regex::new(r"<!-- TEP Notifier Action: (\w+) -->").unwrap())
}

fn update_marker_re() -> &'static Regex {
    UPDATE_MARKER_RE
        .get_or_init(|| Regex::new(r"<!-- TEP update: TEP-(\d+) status: (\w+) -->").unwrap())
}

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"TEP-(\d+)").unwrap())
}

fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| {
        Regex::new(r"https://github\.com/tektoncd/community/blob/.*?/teps/(\d+)-.*?\.md").unwrap()
    })
}

fn changed_file_re() -> &'static Regex {
    CHANGED_FILE_RE.get_or_init(|| Regex::new(r"^teps/(\d+)-.*\.md$").unwrap())
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a `YYYY-MM-DD` date as UTC midnight.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|source| {
        TepError::InvalidDate {
            value: raw.to_string(),
            source,
        }
    })?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

// ---------------------------------------------------------------------------
// Index table
// ---------------------------------------------------------------------------

/// Extract every proposal row from the index document.
///
/// Rows that don't match the table layout are skipped. A bad date or status
/// in a matching row fails the whole parse. A repeated id keeps the last row.
pub fn extract_from_index(index: &str) -> Result<BTreeMap<String, ProposalInfo>> {
    let mut proposals = BTreeMap::new();

    for caps in index_row_re().captures_iter(index) {
        let last_modified = parse_date(&caps[5])?;
        let status: Status = caps[4].parse()?;
        let id = caps[1].to_string();
        proposals.insert(
            id.clone(),
            ProposalInfo {
                id,
                title: caps[3].to_string(),
                status,
                filename: caps[2].to_string(),
                last_modified,
                authors: Vec::new(),
            },
        );
    }

    Ok(proposals)
}

// ---------------------------------------------------------------------------
// Document front-matter
// ---------------------------------------------------------------------------

/// Extract the YAML between the leading pair of `---` delimiters.
fn front_matter(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;
    if rest.starts_with("---") {
        return Some("");
    }
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

fn string_field<'a>(meta: &'a Value, key: &str) -> Result<&'a str> {
    match meta.get(key) {
        None | Some(Value::Null) => Err(TepError::MissingMetadata {
            key: key.to_string(),
        }),
        Some(v) => v.as_str().ok_or_else(|| TepError::WrongMetadataType {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}

/// Parse a proposal document's front-matter into a [`ProposalInfo`].
///
/// `title`, `status`, `last-updated` and `authors` are all required. Authors
/// have a single leading `@` stripped.
pub fn from_document(id: &str, filename: &str, contents: &str) -> Result<ProposalInfo> {
    let raw = front_matter(contents).ok_or(TepError::MissingFrontMatter)?;
    let meta: Value = if raw.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(raw)?
    };

    let title = string_field(&meta, "title")?.to_string();
    let status: Status = string_field(&meta, "status")?.parse()?;
    let last_modified = parse_date(string_field(&meta, "last-updated")?)?;

    let raw_authors = match meta.get("authors") {
        None | Some(Value::Null) => {
            return Err(TepError::MissingMetadata {
                key: "authors".to_string(),
            })
        }
        Some(Value::Sequence(seq)) => seq,
        Some(_) => {
            return Err(TepError::WrongMetadataType {
                key: "authors".to_string(),
                expected: "a list",
            })
        }
    };
    let authors = raw_authors
        .iter()
        .map(|a| {
            a.as_str()
                .map(|s| s.strip_prefix('@').unwrap_or(s).to_string())
                .ok_or_else(|| TepError::WrongMetadataType {
                    key: "authors".to_string(),
                    expected: "a list of strings",
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ProposalInfo {
        id: id.to_string(),
        title,
        status,
        filename: filename.to_string(),
        last_modified,
        authors,
    })
}

/// Proposal id for a changed path like `teps/1234-some-proposal.md`.
pub fn proposal_id_from_path(path: &str) -> Option<String> {
    changed_file_re()
        .captures(path)
        .map(|caps| caps[1].to_string())
}

// ---------------------------------------------------------------------------
// Comment markers
// ---------------------------------------------------------------------------

/// Proposal ids and raw statuses from `<!-- TEP update: ... -->` markers, and
/// whether the comment is a reminder to move proposals to `implemented`.
///
/// When one id has several markers the last one wins.
pub fn comment_markers(body: &str) -> (BTreeMap<String, String>, bool) {
    let to_implemented = notifier_action_re()
        .captures(body)
        .is_some_and(|caps| &caps[1] == Status::Implemented.as_str());

    let mut markers = BTreeMap::new();
    for caps in update_marker_re().captures_iter(body) {
        markers.insert(caps[1].to_string(), caps[2].to_string());
    }

    (markers, to_implemented)
}

// ---------------------------------------------------------------------------
// PR title and body
// ---------------------------------------------------------------------------

/// All proposal ids referenced in a PR title and body, either as `TEP-1234`
/// or as a link to a proposal document on any branch.
///
/// Title before body, bare ids before links. Not deduplicated.
pub fn ids_from_pr(title: &str, body: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for text in [title, body] {
        for re in [id_re(), url_re()] {
            ids.extend(re.captures_iter(text).map(|caps| caps[1].to_string()));
        }
    }
    ids
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "there are three teps in here
on later lines
|[TEP-1234](1234-something-or-other.md) | Some TEP Title | proposed | 2021-12-20 |
|[TEP-5678](5678-second-one.md) | Another TEP Title | proposed | 2021-12-20 |
|[TEP-4321](4321-third-one.md) | Yet Another TEP Title | implementing | 2021-12-20 |
tada, three valid TEPs
";

    #[test]
    fn index_single_row() {
        let teps =
            extract_from_index("|[TEP-1234](1234-x.md) | Title | proposed | 2021-12-20 |").unwrap();
        let t = &teps["1234"];
        assert_eq!(t.id, "1234");
        assert_eq!(t.title, "Title");
        assert_eq!(t.status, Status::Proposed);
        assert_eq!(t.filename, "1234-x.md");
        assert_eq!(
            t.last_modified,
            Utc.with_ymd_and_hms(2021, 12, 20, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn index_skips_prose() {
        let teps = extract_from_index(INDEX).unwrap();
        assert_eq!(teps.len(), 3);
        assert_eq!(teps["4321"].status, Status::Implementing);
        assert_eq!(teps["5678"].title, "Another TEP Title");
    }

    #[test]
    fn index_invalid_status_fails_whole_parse() {
        let text = format!("{INDEX}|[TEP-9999](9999-x.md) | Bad | not-a-status | 2021-12-20 |\n");
        let err = extract_from_index(&text).unwrap_err();
        assert!(matches!(err, TepError::InvalidStatus(s) if s == "not-a-status"));
    }

    #[test]
    fn index_invalid_date_fails_whole_parse() {
        let err =
            extract_from_index("|[TEP-1234](1234-x.md) | Title | proposed | 2021-13-45 |").unwrap_err();
        assert!(matches!(err, TepError::InvalidDate { .. }));
    }

    #[test]
    fn index_last_row_wins() {
        let text = "|[TEP-1234](1234-x.md) | Old | proposed | 2021-12-20 |\n\
                    |[TEP-1234](1234-y.md) | New | implementing | 2022-01-02 |\n";
        let teps = extract_from_index(text).unwrap();
        assert_eq!(teps.len(), 1);
        assert_eq!(teps["1234"].title, "New");
        assert_eq!(teps["1234"].status, Status::Implementing);
    }

    const DOC: &str = "---
status: implementable
title: Some Proposal
creation-date: '2021-11-01'
last-updated: '2021-12-20'
authors:
- '@abayer'
- someone
---

# TEP-1234: Some Proposal
";

    #[test]
    fn document_front_matter() {
        let info = from_document("1234", "1234-some-proposal.md", DOC).unwrap();
        assert_eq!(info.title, "Some Proposal");
        assert_eq!(info.status, Status::Implementable);
        assert_eq!(info.authors, vec!["abayer", "someone"]);
        assert_eq!(info.filename, "1234-some-proposal.md");
        assert_eq!(
            info.last_modified,
            Utc.with_ymd_and_hms(2021, 12, 20, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn document_unquoted_date() {
        let doc = DOC.replace("'2021-12-20'", "2021-12-20");
        let info = from_document("1234", "1234-some-proposal.md", &doc).unwrap();
        assert_eq!(info.last_modified.date_naive().to_string(), "2021-12-20");
    }

    #[test]
    fn document_missing_key_names_it() {
        let doc = DOC.replace("title: Some Proposal\n", "");
        let err = from_document("1234", "f.md", &doc).unwrap_err();
        assert!(matches!(err, TepError::MissingMetadata { ref key } if key == "title"));

        let doc = DOC.replace("last-updated: '2021-12-20'\n", "");
        let err = from_document("1234", "f.md", &doc).unwrap_err();
        assert!(err.to_string().contains("last-updated"));
    }

    #[test]
    fn document_wrong_types() {
        let doc = DOC.replace("title: Some Proposal", "title: [a, b]");
        assert!(matches!(
            from_document("1234", "f.md", &doc).unwrap_err(),
            TepError::WrongMetadataType { ref key, .. } if key == "title"
        ));

        let doc = DOC.replace("- '@abayer'\n- someone\n", "").replace("authors:", "authors: abayer");
        assert!(matches!(
            from_document("1234", "f.md", &doc).unwrap_err(),
            TepError::WrongMetadataType { ref key, .. } if key == "authors"
        ));
    }

    #[test]
    fn document_invalid_status() {
        let doc = DOC.replace("implementable", "in-progress");
        assert!(matches!(
            from_document("1234", "f.md", &doc).unwrap_err(),
            TepError::InvalidStatus(_)
        ));
    }

    #[test]
    fn document_without_front_matter() {
        assert!(matches!(
            from_document("1234", "f.md", "# Just a heading\n").unwrap_err(),
            TepError::MissingFrontMatter
        ));
        assert!(matches!(
            from_document("1234", "f.md", "---\n---\n# Empty\n").unwrap_err(),
            TepError::MissingMetadata { .. }
        ));
    }

    #[test]
    fn changed_paths() {
        assert_eq!(
            proposal_id_from_path("teps/1234-some-proposal.md").as_deref(),
            Some("1234")
        );
        assert_eq!(proposal_id_from_path("teps/README.md"), None);
        assert_eq!(proposal_id_from_path("teps/images/1234-diagram.png"), None);
        assert_eq!(proposal_id_from_path("other/1234-x.md"), None);
    }

    #[test]
    fn markers_in_comment() {
        let body = "Some text\n<!-- TEP Notifier Action: implemented -->\n\
                    <!-- TEP update: TEP-1234 status: implementing -->\n\
                    <!-- TEP update: TEP-5678 status: implementing -->\n";
        let (markers, to_implemented) = comment_markers(body);
        assert!(to_implemented);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers["5678"], "implementing");
    }

    #[test]
    fn markers_last_occurrence_wins() {
        let body = "<!-- TEP update: TEP-1234 status: proposed -->\n\
                    <!-- TEP update: TEP-1234 status: implementable -->\n";
        let (markers, to_implemented) = comment_markers(body);
        assert!(!to_implemented);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers["1234"], "implementable");
    }

    #[test]
    fn markers_implementing_action_is_not_terminal() {
        let (markers, to_implemented) =
            comment_markers("<!-- TEP Notifier Action: implementing -->\nno tep markers");
        assert!(!to_implemented);
        assert!(markers.is_empty());
    }

    #[test]
    fn ids_title_then_body() {
        let ids = ids_from_pr(
            "This implements TEP-1234",
            "See https://github.com/tektoncd/community/blob/some-branch/teps/0002-custom-tasks.md and TEP-5678",
        );
        assert_eq!(ids, vec!["1234", "5678", "0002"]);
    }

    #[test]
    fn ids_not_deduplicated() {
        let ids = ids_from_pr("TEP-1234", "TEP-1234 again");
        assert_eq!(ids, vec!["1234", "1234"]);
        assert!(ids_from_pr("No proposals", "here either").is_empty());
    }
}
