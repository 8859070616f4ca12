//
//  scm-bitbucket
//  uri/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Checkout URL and SCM URI Codec
//!
//! Pure string translation between the three repository identifiers the
//! adapter juggles:
//!
//! - **Checkout URL** — what users configure on a pipeline, in ssh
//!   (`git@bitbucket.org:owner/repo.git#branch`) or https
//!   (`https://bitbucket.org/owner/repo.git#branch`) form.
//! - **SCM URI** — the compact `hostname:repoId:branch` identifier handed
//!   back to the orchestration platform and passed into every subsequent
//!   adapter call.
//! - **repoId** — `{owner}/{repoUuid}`, keyed by the repository's immutable
//!   UUID rather than its slug so that the identifier survives repository
//!   renames.
//!
//! ## Supported Checkout URL Forms
//!
//! - `git@bitbucket.org:owner/repo.git`
//! - `git@bitbucket.org:owner/repo.git#branch`
//! - `https://bitbucket.org/owner/repo.git`
//! - `https://user@bitbucket.org/owner/repo#branch`
//!
//! ## SCM URI Shape
//!
//! The serialized form keeps the historical `:`-separated layout, but
//! parsing is a structured three-field split (`splitn(3, ':')`) so a branch
//! name containing a colon round-trips intact.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, ScmError};

/// Regular expression for the checkout-URL grammar.
///
/// Matches both ssh and https forms with an optional `#branch` suffix.
///
/// # Capture Groups
/// 1. Hostname (e.g. "bitbucket.org")
/// 2. Owner/workspace (e.g. "batman")
/// 3. Repository name (e.g. "test", without the `.git` suffix)
/// 4. Branch, including the leading `#` (e.g. "#mybranch")
static CHECKOUT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:git@|https://(?:[^@/\s]+@)?)([^/:\s]+)[/:]([^/\s]+)/([^#\s]+?)(?:\.git)?(#.+)?$")
        .unwrap()
});

/// Components extracted from a checkout URL.
///
/// Transient value produced by [`checkout_url_info`] and consumed by
/// [`parse_url`](crate::scm::Scm::parse_url); the branch is `None` when the
/// URL carries no `#branch` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrlInfo {
    /// Hostname of the SCM provider (e.g. "bitbucket.org").
    pub hostname: String,
    /// Repository owner or workspace.
    pub username: String,
    /// Repository name.
    pub repo: String,
    /// Branch from the `#branch` suffix, if present.
    pub branch: Option<String>,
}

/// Parses a checkout URL into its components.
///
/// # Parameters
///
/// - `checkout_url`: ssh or https checkout URL, optionally with `#branch`.
///
/// # Returns
///
/// Returns `Ok(CheckoutUrlInfo)` on success, or [`ScmError::Config`] when
/// the URL does not match the checkout-URL grammar.
///
/// # Example
///
/// ```rust
/// use scm_bitbucket::uri::checkout_url_info;
///
/// let info = checkout_url_info("git@bitbucket.org:batman/test.git#master").unwrap();
/// assert_eq!(info.hostname, "bitbucket.org");
/// assert_eq!(info.username, "batman");
/// assert_eq!(info.repo, "test");
/// assert_eq!(info.branch.as_deref(), Some("master"));
/// ```
pub fn checkout_url_info(checkout_url: &str) -> Result<CheckoutUrlInfo> {
    let caps = CHECKOUT_URL
        .captures(checkout_url)
        .ok_or_else(|| ScmError::Config(format!("Invalid scmUrl: {checkout_url}")))?;

    Ok(CheckoutUrlInfo {
        hostname: caps[1].to_string(),
        username: caps[2].to_string(),
        repo: caps[3].to_string(),
        branch: caps
            .get(4)
            .map(|m| m.as_str().trim_start_matches('#').to_string()),
    })
}

/// Compact repository+branch identifier, serialized as `hostname:repoId:branch`.
///
/// `repo_id` is `{owner}/{repoUuid}` for Bitbucket. Instances are immutable;
/// callers re-parse the string form rather than mutating an existing value.
///
/// # Example
///
/// ```rust
/// use scm_bitbucket::uri::ScmUri;
///
/// let uri: ScmUri = "bitbucket.org:batman/{uuid}:master".parse().unwrap();
/// assert_eq!(uri.owner(), "batman");
/// assert_eq!(uri.repo_uuid(), "{uuid}");
/// assert_eq!(uri.to_string(), "bitbucket.org:batman/{uuid}:master");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmUri {
    /// Hostname of the SCM provider.
    pub hostname: String,
    /// Provider-specific repository identifier, `{owner}/{repoUuid}`.
    pub repo_id: String,
    /// Branch name.
    pub branch: String,
}

impl ScmUri {
    /// Creates a new SCM URI from its three fields.
    pub fn new(
        hostname: impl Into<String>,
        repo_id: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            repo_id: repo_id.into(),
            branch: branch.into(),
        }
    }

    /// Returns the owner component of `repo_id`.
    pub fn owner(&self) -> &str {
        self.repo_id.split('/').next().unwrap_or(&self.repo_id)
    }

    /// Returns the repository UUID component of `repo_id`.
    pub fn repo_uuid(&self) -> &str {
        self.repo_id
            .split_once('/')
            .map(|(_, uuid)| uuid)
            .unwrap_or(&self.repo_id)
    }
}

impl fmt::Display for ScmUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.hostname, self.repo_id, self.branch)
    }
}

impl FromStr for ScmUri {
    type Err = ScmError;

    /// Parses `hostname:repoId:branch`.
    ///
    /// The split is bounded at three fields, so a branch containing `:`
    /// stays intact. All three fields must be non-empty.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(hostname), Some(repo_id), Some(branch))
                if !hostname.is_empty() && !repo_id.is_empty() && !branch.is_empty() =>
            {
                Ok(Self::new(hostname, repo_id, branch))
            }
            _ => Err(ScmError::Config(format!("Invalid scmUri: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ssh_checkout_url() {
        let info = checkout_url_info("git@bitbucket.org:batman/test.git#mybranch").unwrap();
        assert_eq!(info.hostname, "bitbucket.org");
        assert_eq!(info.username, "batman");
        assert_eq!(info.repo, "test");
        assert_eq!(info.branch.as_deref(), Some("mybranch"));
    }

    #[test]
    fn test_parse_https_checkout_url() {
        let info = checkout_url_info("https://bitbucket.org/batman/test.git").unwrap();
        assert_eq!(info.hostname, "bitbucket.org");
        assert_eq!(info.username, "batman");
        assert_eq!(info.repo, "test");
        assert_eq!(info.branch, None);
    }

    #[test]
    fn test_parse_https_with_user_and_branch() {
        let info = checkout_url_info("https://robin@bitbucket.org/batman/test#feature").unwrap();
        assert_eq!(info.username, "batman");
        assert_eq!(info.repo, "test");
        assert_eq!(info.branch.as_deref(), Some("feature"));
    }

    #[test]
    fn test_parse_dotted_repo_name() {
        let info = checkout_url_info("git@bitbucket.org:batman/my.repo.git").unwrap();
        assert_eq!(info.repo, "my.repo");
    }

    #[test]
    fn test_rejects_garbage_url() {
        let err = checkout_url_info("not a url").unwrap_err();
        assert!(err.to_string().starts_with("Invalid scmUrl"));
    }

    #[test]
    fn test_scm_uri_round_trip() {
        let raw = "bitbucket.org:batman/{de7d7695-1196-46a1-b87d-371b7b2945ab}:master";
        let uri: ScmUri = raw.parse().unwrap();
        assert_eq!(uri.hostname, "bitbucket.org");
        assert_eq!(uri.owner(), "batman");
        assert_eq!(uri.repo_uuid(), "{de7d7695-1196-46a1-b87d-371b7b2945ab}");
        assert_eq!(uri.branch, "master");
        assert_eq!(uri.to_string(), raw);
    }

    #[test]
    fn test_scm_uri_branch_with_colon() {
        let uri: ScmUri = "bitbucket.org:batman/{uuid}:release:2026".parse().unwrap();
        assert_eq!(uri.branch, "release:2026");
    }

    #[test]
    fn test_scm_uri_rejects_missing_fields() {
        assert!("bitbucket.org:batman/{uuid}".parse::<ScmUri>().is_err());
        assert!("::".parse::<ScmUri>().is_err());
    }
}
