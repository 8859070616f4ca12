//
//  scm-bitbucket
//  api/models.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! Wire types for the Bitbucket Cloud API v2.0 responses the adapter reads.
//!
//! Only the fields the adapter actually consumes are modeled; everything
//! else in Bitbucket's (large) resource representations is ignored during
//! deserialization. Optional fields default rather than fail so that a
//! listing containing a sparse entry does not sink the whole page.

use serde::Deserialize;

/// One page of a Bitbucket Cloud collection.
///
/// Cloud pagination is page/pagelen based for the endpoints the adapter
/// queries; the adapter detects the last page by a short `values` array
/// rather than by following `next` links, because the termination condition
/// of its sequential scans depends on the page's own content.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    /// Items in the current page.
    pub values: Vec<T>,

    /// Current page number (1-indexed).
    #[serde(default)]
    pub page: Option<u32>,

    /// Requested page size.
    #[serde(default)]
    pub pagelen: Option<u32>,

    /// Total item count, when the endpoint reports one.
    #[serde(default)]
    pub size: Option<u32>,

    /// URL of the next page, when more pages exist.
    #[serde(default)]
    pub next: Option<String>,
}

/// A single HATEOAS link.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Link {
    /// Absolute URL of the linked resource.
    pub href: String,
}

/// The subset of a resource's `links` object the adapter reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    /// Web UI link.
    #[serde(default)]
    pub html: Option<Link>,

    /// Avatar image link (user resources).
    #[serde(default)]
    pub avatar: Option<Link>,
}

impl Links {
    /// Returns the web UI URL, or an empty string when absent.
    pub fn html_href(&self) -> String {
        self.html.as_ref().map(|l| l.href.clone()).unwrap_or_default()
    }

    /// Returns the avatar URL, or an empty string when absent.
    pub fn avatar_href(&self) -> String {
        self.avatar
            .as_ref()
            .map(|l| l.href.clone())
            .unwrap_or_default()
    }
}

/// A repository resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Immutable repository UUID, braces included (e.g. `{123e4567-...}`).
    pub uuid: String,

    /// Full path in `{workspace}/{repo_slug}` form.
    #[serde(default)]
    pub full_name: String,

    /// The repository's main/default branch.
    #[serde(default)]
    pub mainbranch: Option<BranchName>,

    /// Resource links.
    #[serde(default)]
    pub links: Links,
}

/// A named branch reference without target details.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchName {
    /// Branch name.
    pub name: String,
}

/// A branch reference including the commit it points at.
///
/// Shape of `GET /repositories/{repoId}/refs/branches/{branch}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    /// Branch name.
    pub name: String,

    /// The commit at the branch head.
    pub target: CommitTarget,
}

/// Minimal commit pointer.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitTarget {
    /// Commit hash.
    pub hash: String,
}

/// A commit resource, as returned by `GET .../commit/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    /// Commit message.
    #[serde(default)]
    pub message: String,

    /// Commit author.
    #[serde(default)]
    pub author: Option<CommitAuthor>,

    /// Resource links.
    #[serde(default)]
    pub links: Links,
}

/// Authorship information on a commit.
///
/// `user` is absent when the author's email does not map to a Bitbucket
/// account; `raw` always carries the git author string.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    /// Raw git author string (`Name <email>`).
    #[serde(default)]
    pub raw: Option<String>,

    /// The Bitbucket account behind the commit, when resolvable.
    #[serde(default)]
    pub user: Option<UserAccount>,
}

/// A user account resource.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    /// Immutable account UUID, braces included.
    #[serde(default)]
    pub uuid: Option<String>,

    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Public handle. Older payloads used `username` for the same field.
    #[serde(default, alias = "username")]
    pub nickname: Option<String>,

    /// Resource links.
    #[serde(default)]
    pub links: Links,
}

/// A pull request resource.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// Numeric pull request id.
    pub id: u64,

    /// Source (feature) side of the pull request.
    pub source: PrEndpoint,

    /// Destination (target) side of the pull request.
    pub destination: PrEndpoint,

    /// Resource links.
    #[serde(default)]
    pub links: Links,
}

/// One side of a pull request: a branch plus the commit it points at.
#[derive(Debug, Clone, Deserialize)]
pub struct PrEndpoint {
    /// The branch on this side.
    pub branch: BranchName,

    /// The commit on this side. Absent on some destination payloads.
    #[serde(default)]
    pub commit: Option<CommitTarget>,
}

/// A webhook subscription resource on a repository.
///
/// Remote state owned by Bitbucket; the adapter only holds it transiently
/// while running the find-or-create registration protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSubscription {
    /// Hook UUID, braces included.
    pub uuid: String,

    /// Callback URL the hook posts to.
    pub url: String,

    /// Subscribed event keys.
    #[serde(default)]
    pub events: Vec<String>,

    /// Whether the hook is active.
    #[serde(default)]
    pub active: bool,

    /// Free-form description.
    #[serde(default)]
    pub description: String,
}
