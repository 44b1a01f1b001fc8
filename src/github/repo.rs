//! Repository identifier parsing.
//!
//! Accepts the `owner/repo` shorthand plus the GitHub remote URL forms
//! (`https://github.com/O/R[.git]`, `git@github.com:O/R[.git]`,
//! `ssh://git@github.com[:port]/O/R[.git]`). Anything pointing at a
//! non-GitHub host is a validation error.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{Result, SobaError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            [
                r"^https://github\.com/(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?/?$",
                r"^git@github\.com:(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?$",
                r"^ssh://git@github\.com(?::\d+)?/(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?$",
                r"^(?P<owner>[A-Za-z0-9][A-Za-z0-9._-]*)/(?P<repo>[A-Za-z0-9][A-Za-z0-9._-]*)$",
            ]
            .iter()
            .map(|p| Regex::new(p).expect("repository pattern"))
            .collect()
        });

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SobaError::validation("github.repository is not set"));
        }

        for pattern in patterns {
            if let Some(caps) = pattern.captures(trimmed) {
                return Ok(Self::new(&caps["owner"], &caps["repo"]));
            }
        }

        Err(SobaError::validation("unrecognized GitHub repository")
            .with_context("repository", trimmed))
    }

    /// Session name shared by every window this daemon manages.
    pub fn session_name(&self) -> String {
        format!("soba-{}-{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
