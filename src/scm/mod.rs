//
//  scm-bitbucket
//  scm/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # SCM Capability Contract
//!
//! The [`Scm`] trait is the method surface the orchestration platform
//! programs against: one conforming type per source-control backend, held
//! as a trait object and selected by `scm_context` string. There is no
//! base-class hierarchy — a backend either implements the capability set or
//! it is not a backend.
//!
//! This module also defines the caller-facing value types those methods
//! return. They are deliberately plain data: the platform persists and
//! compares them, so they carry no provider handles.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::ExecutorStats;
use crate::error::Result;
use crate::webhook::WebhookEvent;

mod bitbucket;

pub use bitbucket::{BitbucketScm, API_URL, BITBUCKET_HOST};

/// Repository access levels resolved for a caller's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    /// Administrative access.
    pub admin: bool,
    /// Write access.
    pub push: bool,
    /// Read access.
    pub pull: bool,
}

/// Summary of one open pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrSummary {
    /// Job-facing name, `PR-{id}`.
    pub name: String,
    /// Source branch name.
    pub source_branch: String,
}

/// Detailed pull request lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrInfo {
    /// Job-facing name, `PR-{id}`.
    pub name: String,
    /// Source branch name.
    pub source_branch: String,
    /// Head commit hash of the source branch.
    pub sha: String,
    /// Web UI URL of the pull request.
    pub url: String,
}

/// Display-ready author information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedAuthor {
    /// Public handle.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Profile URL.
    pub url: String,
    /// Avatar image URL.
    pub avatar: String,
}

/// Display-ready repository link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedUrl {
    /// Branch the SCM URI points at.
    pub branch: String,
    /// Repository full name, `{owner}/{repo}`.
    pub name: String,
    /// Web UI URL of the repository.
    pub url: String,
}

/// Display-ready commit information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedCommit {
    /// Commit message.
    pub message: String,
    /// Decorated commit author.
    pub author: DecoratedAuthor,
    /// Web UI URL of the commit.
    pub url: String,
}

/// Inputs for reporting a build status onto a commit.
#[derive(Debug, Clone)]
pub struct CommitStatus<'a> {
    /// SCM URI of the repository+branch.
    pub scm_uri: &'a str,
    /// Commit to decorate.
    pub sha: &'a str,
    /// Build status in the platform's vocabulary
    /// (`SUCCESS`, `FAILURE`, `RUNNING`, `QUEUED`, `ABORTED`).
    pub build_status: &'a str,
    /// Caller-scoped API token.
    pub token: &'a str,
    /// Link back to the build.
    pub url: &'a str,
    /// Job the status belongs to.
    pub job_name: &'a str,
    /// Pipeline the job belongs to.
    pub pipeline_id: u64,
}

/// Inputs for assembling a checkout command.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Branch to clone.
    pub branch: String,
    /// SCM hostname.
    pub host: String,
    /// Repository owner or workspace.
    pub org: String,
    /// Repository name.
    pub repo: String,
    /// Commit to reset to.
    pub sha: String,
    /// Source branch of the pull request, for PR builds.
    pub pr_ref: Option<String>,
}

/// A named shell step the platform injects into a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCommand {
    /// Step name.
    pub name: String,
    /// Shell command line.
    pub command: String,
}

/// The capability set a source-control backend exposes to the platform.
///
/// All methods take `&self` and are safe to call concurrently; the only
/// shared mutable state behind a conforming type should be its service
/// token.
#[async_trait]
pub trait Scm: Send + Sync {
    /// Resolves a checkout URL into the compact `hostname:repoId:branch`
    /// SCM URI, looking up the repository's immutable UUID.
    async fn parse_url(&self, checkout_url: &str, token: &str) -> Result<String>;

    /// Normalizes an inbound webhook delivery into the canonical event
    /// model, or `None` when the event is not one this backend reacts to.
    async fn parse_hook(
        &self,
        headers: &HashMap<String, String>,
        payload: &Value,
    ) -> Result<Option<WebhookEvent>>;

    /// Whether this adapter instance recognizes and owns the given webhook
    /// delivery. Never fails: malformed deliveries are simply not ours.
    async fn can_handle_webhook(
        &self,
        headers: &HashMap<String, String>,
        payload: &Value,
    ) -> bool;

    /// Idempotently ensures a webhook pointing at `webhook_url` exists on
    /// the repository, subscribed to `actions` (or the default set when
    /// empty).
    async fn add_webhook(
        &self,
        scm_uri: &str,
        token: &str,
        webhook_url: &str,
        actions: &[String],
    ) -> Result<()>;

    /// Resolves the commit hash to build: the head of the URI's branch, or
    /// the source head of `pr_num` when given.
    async fn get_commit_sha(
        &self,
        scm_uri: &str,
        token: &str,
        pr_num: Option<u64>,
    ) -> Result<String>;

    /// Fetches a file's raw contents at `reference` (defaulting to the
    /// URI's branch).
    async fn get_file(
        &self,
        scm_uri: &str,
        token: &str,
        path: &str,
        reference: Option<&str>,
    ) -> Result<String>;

    /// Resolves the caller's access levels on the repository.
    async fn get_permissions(&self, scm_uri: &str, token: &str) -> Result<Permissions>;

    /// Reports a build status onto a commit; returns the provider's
    /// response body.
    async fn update_commit_status(&self, status: &CommitStatus<'_>) -> Result<Value>;

    /// Returns the OAuth provider configuration for the platform's login
    /// layer, keyed by scm context.
    async fn get_bell_configuration(&self) -> Result<Value>;

    /// Assembles the shell step that checks out the code in a build.
    async fn get_checkout_command(&self, config: &CheckoutConfig) -> Result<CheckoutCommand>;

    /// Lists the repository's open pull requests.
    async fn get_opened_prs(&self, scm_uri: &str, token: &str) -> Result<Vec<PrSummary>>;

    /// Looks up one pull request.
    async fn get_pr_info(&self, scm_uri: &str, token: &str, pr_num: u64) -> Result<PrInfo>;

    /// Lists all branch names on the repository.
    async fn get_branch_list(&self, scm_uri: &str, token: &str) -> Result<Vec<String>>;

    /// Decorates a username into display-ready author information.
    async fn decorate_author(&self, username: &str, token: &str) -> Result<DecoratedAuthor>;

    /// Decorates an SCM URI into a display-ready repository link.
    async fn decorate_url(&self, scm_uri: &str, token: &str) -> Result<DecoratedUrl>;

    /// Decorates a commit into display-ready information, including its
    /// decorated author.
    async fn decorate_commit(
        &self,
        sha: &str,
        scm_uri: &str,
        token: &str,
    ) -> Result<DecoratedCommit>;

    /// Request counters of the underlying executor, keyed by scm context.
    fn stats(&self) -> HashMap<String, ExecutorStats>;

    /// The scm context strings this backend serves.
    fn get_scm_contexts(&self) -> Vec<String>;
}
