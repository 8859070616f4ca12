//
//  scm-bitbucket
//  scm/bitbucket.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Bitbucket Cloud Backend
//!
//! [`BitbucketScm`] is the Bitbucket Cloud implementation of the [`Scm`]
//! capability set, wiring together the token manager, the webhook
//! normalizer/registrar, and the injected HTTP executor.
//!
//! ## Token Policy
//!
//! Read-only lookups (URL parsing, commit/branch/PR reads, decorations,
//! file reads) authenticate with the adapter's own service token, refreshed
//! transparently by [`TokenManager`]. Identity-bearing operations —
//! permission resolution, commit statuses, webhook registration — use the
//! caller-supplied token, because their effect (or answer) depends on who
//! is asking.
//!
//! ## Error Vocabularies
//!
//! Listing and webhook operations validate responses through
//! [`check_response_error`]; single-request methods use the inline
//! `STATUS CODE <code>: <body>` convention, with the repository lookup
//! special-casing 404 into `Cannot find repository`. Callers match on
//! these message shapes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use url::Url;

use crate::api::{
    check_response_error, status_error, BranchName, BranchRef, Commit, ExecutorStats,
    HttpExecutor, HttpRequest, Paginated, PullRequest, Repository, ReqwestExecutor, UserAccount,
};
use crate::auth::TokenManager;
use crate::config::BitbucketConfig;
use crate::error::{Result, ScmError};
use crate::uri::{checkout_url_info, ScmUri};
use crate::webhook::normalize::normalize;
use crate::webhook::{WebhookEvent, WebhookRegistrar};

use super::{
    CheckoutCommand, CheckoutConfig, CommitStatus, DecoratedAuthor, DecoratedCommit, DecoratedUrl,
    Permissions, PrInfo, PrSummary, Scm,
};

/// Bitbucket Cloud REST API v2.0 base URL.
pub const API_URL: &str = "https://api.bitbucket.org/2.0";

/// The hostname this adapter serves.
pub const BITBUCKET_HOST: &str = "bitbucket.org";

/// Page size used when listing branches.
const BRANCH_PAGE_SIZE: usize = 100;

/// Maps the platform's build-status vocabulary onto Bitbucket commit
/// status states.
fn commit_status_state(build_status: &str) -> &'static str {
    match build_status {
        "SUCCESS" => "SUCCESSFUL",
        "RUNNING" | "QUEUED" => "INPROGRESS",
        "ABORTED" => "STOPPED",
        _ => "FAILED",
    }
}

/// Bitbucket Cloud source-control backend.
///
/// One instance per configured Bitbucket account; safe to share across
/// concurrent platform tasks. The only mutable state is the service token
/// inside the [`TokenManager`].
///
/// # Example
///
/// ```rust,no_run
/// use scm_bitbucket::config::BitbucketConfig;
/// use scm_bitbucket::scm::{BitbucketScm, Scm};
///
/// # async fn example() -> scm_bitbucket::error::Result<()> {
/// let scm = BitbucketScm::new(BitbucketConfig::new("client-id", "client-secret"))?;
/// let uri = scm
///     .parse_url("git@bitbucket.org:batman/test.git#master", "caller-token")
///     .await?;
/// println!("building {uri}");
/// # Ok(())
/// # }
/// ```
pub struct BitbucketScm {
    config: BitbucketConfig,
    executor: Arc<dyn HttpExecutor>,
    tokens: TokenManager,
    registrar: WebhookRegistrar,
    hostname: String,
    api_base: String,
}

impl BitbucketScm {
    /// Creates a backend with the stock [`ReqwestExecutor`].
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::Config`] when the OAuth credentials are missing,
    /// before any network activity.
    pub fn new(config: BitbucketConfig) -> Result<Self> {
        let executor = Arc::new(ReqwestExecutor::new()?);
        Self::with_executor(config, executor)
    }

    /// Creates a backend issuing all calls through the given executor.
    ///
    /// This is the seam for resilience policy (and for tests): whatever
    /// retry, circuit-breaking, or timeout behavior the executor applies
    /// governs every call the adapter makes.
    pub fn with_executor(config: BitbucketConfig, executor: Arc<dyn HttpExecutor>) -> Result<Self> {
        config.validate()?;

        let tokens = TokenManager::new(
            Arc::clone(&executor),
            &config.oauth_client_id,
            &config.oauth_client_secret,
        );
        let registrar = WebhookRegistrar::new(Arc::clone(&executor), API_URL.to_string());

        Ok(Self {
            config,
            executor,
            tokens,
            registrar,
            hostname: BITBUCKET_HOST.to_string(),
            api_base: API_URL.to_string(),
        })
    }

    /// The context string identifying this backend, `bitbucket:<hostname>`.
    pub fn scm_context(&self) -> String {
        format!("bitbucket:{}", self.hostname)
    }

    async fn api_get(&self, url: String, token: &str) -> Result<crate::api::HttpResponse> {
        self.executor.execute(HttpRequest::get(url).bearer(token)).await
    }

    /// One of the three concurrent permission probes: whether the repo UUID
    /// shows up in the caller's (optionally role-filtered) repository list.
    async fn probe_permission(
        &self,
        owner: &str,
        uuid: &str,
        role: Option<&str>,
        token: &str,
    ) -> Result<bool> {
        let url = match role {
            Some(role) => format!("{}/repositories/{}?role={}", self.api_base, owner, role),
            None => format!("{}/repositories/{}", self.api_base, owner),
        };

        let response = self.api_get(url, token).await?;
        check_response_error(&response)?;

        let listing: Paginated<Repository> = response.parse()?;
        Ok(listing.values.iter().any(|repo| repo.uuid == uuid))
    }
}

#[async_trait]
impl Scm for BitbucketScm {
    async fn parse_url(&self, checkout_url: &str, _token: &str) -> Result<String> {
        let info = checkout_url_info(checkout_url)?;
        let token = self.tokens.get().await?;

        let url = format!(
            "{}/repositories/{}/{}",
            self.api_base, info.username, info.repo
        );
        let response = self.api_get(url, &token).await?;

        if response.status == 404 {
            return Err(ScmError::provider(404, "Cannot find repository"));
        }
        if !response.is_success() {
            return Err(status_error(&response));
        }

        let repo: Repository = response.parse()?;
        let branch = info
            .branch
            .or_else(|| repo.mainbranch.map(|main| main.name))
            .unwrap_or_else(|| "master".to_string());

        Ok(ScmUri::new(
            info.hostname,
            format!("{}/{}", info.username, repo.uuid),
            branch,
        )
        .to_string())
    }

    async fn parse_hook(
        &self,
        headers: &HashMap<String, String>,
        payload: &Value,
    ) -> Result<Option<WebhookEvent>> {
        normalize(headers, payload, &self.scm_context())
    }

    async fn can_handle_webhook(
        &self,
        headers: &HashMap<String, String>,
        payload: &Value,
    ) -> bool {
        match normalize(headers, payload, &self.scm_context()) {
            Ok(Some(event)) => Url::parse(&event.checkout_url)
                .ok()
                .and_then(|url| url.host_str().map(|host| host == self.hostname))
                .unwrap_or(false),
            Ok(None) => false,
            Err(source) => {
                tracing::warn!(error = %source, "webhook ownership probe failed to normalize");
                false
            }
        }
    }

    async fn add_webhook(
        &self,
        scm_uri: &str,
        token: &str,
        webhook_url: &str,
        actions: &[String],
    ) -> Result<()> {
        let uri: ScmUri = scm_uri.parse()?;

        let existing = self
            .registrar
            .find_webhook(&uri.repo_id, webhook_url, 1, token)
            .await?;
        self.registrar
            .create_or_update(&uri.repo_id, existing.as_ref(), webhook_url, actions, token)
            .await
    }

    async fn get_commit_sha(
        &self,
        scm_uri: &str,
        token: &str,
        pr_num: Option<u64>,
    ) -> Result<String> {
        if let Some(pr_num) = pr_num {
            return Ok(self.get_pr_info(scm_uri, token, pr_num).await?.sha);
        }

        let uri: ScmUri = scm_uri.parse()?;
        let token = self.tokens.get().await?;

        let url = format!(
            "{}/repositories/{}/refs/branches/{}",
            self.api_base, uri.repo_id, uri.branch
        );
        let response = self.api_get(url, &token).await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }

        let branch: BranchRef = response.parse()?;
        Ok(branch.target.hash)
    }

    async fn get_file(
        &self,
        scm_uri: &str,
        _token: &str,
        path: &str,
        reference: Option<&str>,
    ) -> Result<String> {
        let uri: ScmUri = scm_uri.parse()?;
        let token = self.tokens.get().await?;

        let reference = reference.unwrap_or(&uri.branch);
        let url = format!(
            "{}/repositories/{}/src/{}/{}",
            self.api_base, uri.repo_id, reference, path
        );
        let response = self.api_get(url, &token).await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }

        Ok(response.body)
    }

    async fn get_permissions(&self, scm_uri: &str, token: &str) -> Result<Permissions> {
        let uri: ScmUri = scm_uri.parse()?;
        let owner = uri.owner();
        let uuid = uri.repo_uuid();

        // The three probes are independent; none short-circuits the others,
        // and a failure in any one fails the whole operation.
        let (admin, push, pull) = tokio::try_join!(
            self.probe_permission(owner, uuid, Some("admin"), token),
            self.probe_permission(owner, uuid, Some("contributor"), token),
            self.probe_permission(owner, uuid, None, token),
        )?;

        Ok(Permissions { admin, push, pull })
    }

    async fn update_commit_status(&self, status: &CommitStatus<'_>) -> Result<Value> {
        let uri: ScmUri = status.scm_uri.parse()?;

        let body = json!({
            "url": status.url,
            "state": commit_status_state(status.build_status),
            "key": status.sha,
            "description": format!("Screwdriver/{}/{}", status.pipeline_id, status.job_name),
        });

        let url = format!(
            "{}/repositories/{}/commit/{}/statuses/build",
            self.api_base, uri.repo_id, status.sha
        );
        let response = self
            .executor
            .execute(HttpRequest::post(url).bearer(status.token).json(body))
            .await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }

        Ok(response.json())
    }

    async fn get_bell_configuration(&self) -> Result<Value> {
        let mut providers = Map::new();
        providers.insert(
            self.scm_context(),
            json!({
                "provider": "bitbucket",
                "clientId": self.config.oauth_client_id,
                "clientSecret": self.config.oauth_client_secret,
                "isSecure": self.config.https,
                "forceHttps": self.config.https,
            }),
        );
        Ok(Value::Object(providers))
    }

    async fn get_checkout_command(&self, config: &CheckoutConfig) -> Result<CheckoutCommand> {
        let checkout_url = format!("https://{}/{}/{}.git", config.host, config.org, config.repo);
        let checkout_ref = match &config.pr_ref {
            Some(_) => &config.branch,
            None => &config.sha,
        };

        let mut command = vec![
            format!("export SCM_URL={checkout_url}"),
            format!(
                "if [ ! -z \"$SCM_USERNAME\" ] && [ ! -z \"$SCM_ACCESS_TOKEN\" ]; then export SCM_URL=https://$SCM_USERNAME:$SCM_ACCESS_TOKEN@{}/{}/{}.git; fi",
                config.host, config.org, config.repo
            ),
            format!(
                "git clone --quiet --progress --branch {} $SCM_URL $SD_SOURCE_DIR",
                config.branch
            ),
            "cd $SD_SOURCE_DIR".to_string(),
            format!("git config user.name {}", self.config.username),
            format!("git config user.email {}", self.config.email),
            format!("git reset --hard {checkout_ref}"),
        ];

        if let Some(pr_ref) = &config.pr_ref {
            command.push(format!("git fetch origin {pr_ref}"));
            command.push(format!("git merge --no-edit {}", config.sha));
        }

        Ok(CheckoutCommand {
            name: "sd-checkout-code".to_string(),
            command: command.join(" && "),
        })
    }

    async fn get_opened_prs(&self, scm_uri: &str, _token: &str) -> Result<Vec<PrSummary>> {
        let uri: ScmUri = scm_uri.parse()?;
        let token = self.tokens.get().await?;

        let url = format!("{}/repositories/{}/pullrequests", self.api_base, uri.repo_id);
        let response = self.api_get(url, &token).await?;
        check_response_error(&response)?;

        let listing: Paginated<PullRequest> = response.parse()?;
        Ok(listing
            .values
            .into_iter()
            .map(|pr| PrSummary {
                name: format!("PR-{}", pr.id),
                source_branch: pr.source.branch.name,
            })
            .collect())
    }

    async fn get_pr_info(&self, scm_uri: &str, _token: &str, pr_num: u64) -> Result<PrInfo> {
        let uri: ScmUri = scm_uri.parse()?;
        let token = self.tokens.get().await?;

        let url = format!(
            "{}/repositories/{}/pullrequests/{}",
            self.api_base, uri.repo_id, pr_num
        );
        let response = self.api_get(url, &token).await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }

        let pr: PullRequest = response.parse()?;
        Ok(PrInfo {
            name: format!("PR-{}", pr.id),
            source_branch: pr.source.branch.name,
            sha: pr.source.commit.map(|commit| commit.hash).unwrap_or_default(),
            url: pr.links.html_href(),
        })
    }

    async fn get_branch_list(&self, scm_uri: &str, _token: &str) -> Result<Vec<String>> {
        let uri: ScmUri = scm_uri.parse()?;
        let token = self.tokens.get().await?;

        let mut names = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "{}/repositories/{}/refs/branches?pagelen={}&page={}",
                self.api_base, uri.repo_id, BRANCH_PAGE_SIZE, page
            );
            let response = self.api_get(url, &token).await?;
            check_response_error(&response)?;

            let listing: Paginated<BranchName> = response.parse()?;
            let page_len = listing.values.len();
            names.extend(listing.values.into_iter().map(|branch| branch.name));

            if page_len < BRANCH_PAGE_SIZE {
                return Ok(names);
            }
            page += 1;
        }
    }

    async fn decorate_author(&self, username: &str, _token: &str) -> Result<DecoratedAuthor> {
        let token = self.tokens.get().await?;

        let url = format!("{}/users/{}", self.api_base, username);
        let response = self.api_get(url, &token).await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }

        let user: UserAccount = response.parse()?;
        Ok(DecoratedAuthor {
            username: user.nickname.unwrap_or_else(|| username.to_string()),
            name: user.display_name.unwrap_or_default(),
            url: user.links.html_href(),
            avatar: user.links.avatar_href(),
        })
    }

    async fn decorate_url(&self, scm_uri: &str, _token: &str) -> Result<DecoratedUrl> {
        let uri: ScmUri = scm_uri.parse()?;
        let token = self.tokens.get().await?;

        let url = format!("{}/repositories/{}", self.api_base, uri.repo_id);
        let response = self.api_get(url, &token).await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }

        let repo: Repository = response.parse()?;
        Ok(DecoratedUrl {
            branch: uri.branch,
            name: repo.full_name,
            url: repo.links.html_href(),
        })
    }

    async fn decorate_commit(
        &self,
        sha: &str,
        scm_uri: &str,
        token: &str,
    ) -> Result<DecoratedCommit> {
        let uri: ScmUri = scm_uri.parse()?;
        let service_token = self.tokens.get().await?;

        let url = format!(
            "{}/repositories/{}/commit/{}",
            self.api_base, uri.repo_id, sha
        );
        let response = self.api_get(url, &service_token).await?;
        if !response.is_success() {
            return Err(status_error(&response));
        }

        let commit: Commit = response.parse()?;
        let selector = commit.author.as_ref().and_then(|author| {
            author
                .user
                .as_ref()
                .and_then(|user| user.uuid.clone().or_else(|| user.nickname.clone()))
        });

        let author = match selector {
            Some(selector) => self.decorate_author(&selector, token).await?,
            None => {
                // Commits whose author email maps to no Bitbucket account
                // only carry the raw git author string.
                let raw = commit
                    .author
                    .as_ref()
                    .and_then(|author| author.raw.clone())
                    .unwrap_or_default();
                DecoratedAuthor {
                    username: raw.clone(),
                    name: raw,
                    url: String::new(),
                    avatar: String::new(),
                }
            }
        };

        Ok(DecoratedCommit {
            message: commit.message,
            author,
            url: commit.links.html_href(),
        })
    }

    fn stats(&self) -> HashMap<String, ExecutorStats> {
        HashMap::from([(self.scm_context(), self.executor.stats())])
    }

    fn get_scm_contexts(&self) -> Vec<String> {
        vec![self.scm_context()]
    }
}
