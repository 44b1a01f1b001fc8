//! Domain mirrors of the upstream issue and pull-request objects.
//!
//! Only the fields the workflow consumes are carried; conversion from the
//! octocrab models happens at the client boundary so the watchers and the
//! phase strategy stay independent of the REST client.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

pub const LABEL_PREFIX: &str = "soba:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub labels: BTreeSet<String>,
}

impl Issue {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Labels in the `soba:` namespace, in sorted order.
    pub fn soba_labels(&self) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|l| l.starts_with(LABEL_PREFIX))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub state: PrState,
    pub head_ref: String,
    pub body: String,
    pub labels: BTreeSet<String>,
    /// The most recent review of at least one reviewer requests changes.
    pub changes_requested: bool,
    /// Reviewers whose most recent review approves.
    pub approvals: usize,
    pub mergeable: Option<bool>,
}

impl PullRequest {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// The issue this PR belongs to: a `soba/<n>` head branch wins, then
    /// the first closing reference in the body.
    pub fn linked_issue(&self) -> Option<u64> {
        if let Some(rest) = self.head_ref.strip_prefix("soba/") {
            if let Ok(number) = rest.parse::<u64>() {
                return Some(number);
            }
        }
        issue_reference(&self.body)
    }
}

/// First `fixes/closes/resolves #N` (or bare `#N`) reference in a PR body.
fn issue_reference(body: &str) -> Option<u64> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"(?i)fixes\s+#(\d+)",
            r"(?i)closes\s+#(\d+)",
            r"(?i)resolves\s+#(\d+)",
            r"(?i)fix\s+#(\d+)",
            r"(?i)close\s+#(\d+)",
            r"(?i)resolve\s+#(\d+)",
            r"#(\d+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });

    for pattern in patterns {
        if let Some(caps) = pattern.captures(body) {
            if let Some(m) = caps.get(1) {
                if let Ok(number) = m.as_str().parse::<u64>() {
                    return Some(number);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(head_ref: &str, body: &str) -> PullRequest {
        PullRequest {
            number: 7,
            state: PrState::Open,
            head_ref: head_ref.to_string(),
            body: body.to_string(),
            labels: BTreeSet::new(),
            changes_requested: false,
            approvals: 0,
            mergeable: None,
        }
    }

    #[test]
    fn branch_name_links_issue() {
        assert_eq!(pr("soba/42", "").linked_issue(), Some(42));
    }

    #[test]
    fn body_reference_links_issue_when_branch_is_foreign() {
        assert_eq!(
            pr("feature/foo", "Closes #13\n\ndetails").linked_issue(),
            Some(13)
        );
        assert_eq!(pr("feature/foo", "see #9").linked_issue(), Some(9));
    }

    #[test]
    fn branch_wins_over_body() {
        assert_eq!(pr("soba/42", "Fixes #13").linked_issue(), Some(42));
    }

    #[test]
    fn unlinked_pr_yields_none() {
        assert_eq!(pr("feature/foo", "no references here").linked_issue(), None);
    }

    #[test]
    fn soba_labels_filters_by_prefix() {
        let issue = Issue {
            number: 3,
            title: "t".to_string(),
            state: IssueState::Open,
            labels: ["bug".to_string(), "soba:todo".to_string()]
                .into_iter()
                .collect(),
        };
        assert_eq!(issue.soba_labels(), vec!["soba:todo"]);
    }
}
