//
//  scm-bitbucket
//  lib.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Bitbucket Cloud SCM Adapter
//!
//! This library lets a CI/CD orchestration platform treat a Bitbucket Cloud
//! account as one of several interchangeable source-control backends. It
//! translates between the platform's generic SCM contract — parse a
//! checkout URL, decorate a commit, report build status, manage webhooks,
//! fetch files, resolve permissions, assemble checkout commands — and
//! Bitbucket's REST API and webhook payload formats.
//!
//! ## Overview
//!
//! The platform programs against the [`scm::Scm`] trait and holds one
//! [`scm::BitbucketScm`] instance per configured Bitbucket account. Each
//! instance owns:
//!
//! - a service-level OAuth token, issued via the client-credentials grant
//!   and renewed transparently before any read call that needs it
//!   ([`auth::TokenManager`]);
//! - a webhook normalizer turning Bitbucket's heterogeneous delivery
//!   payloads into one canonical event model, silently ignoring event kinds
//!   it does not react to ([`webhook::normalize`]);
//! - an idempotent find-or-create webhook registrar
//!   ([`webhook::WebhookRegistrar`]);
//! - an injected HTTP executor carrying whatever resilience policy the
//!   deployment wants ([`api::HttpExecutor`]).
//!
//! ## Module Structure
//!
//! - [`scm`]: the capability trait and the Bitbucket backend
//! - [`api`]: HTTP executor capability, response validation, wire models
//! - [`auth`]: service token lifecycle
//! - [`webhook`]: inbound normalization and outbound registration
//! - [`uri`]: checkout-URL and SCM-URI codec
//! - [`config`]: per-instance configuration
//! - [`error`]: the adapter error taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use scm_bitbucket::config::BitbucketConfig;
//! use scm_bitbucket::scm::{BitbucketScm, Scm};
//!
//! # async fn example() -> scm_bitbucket::error::Result<()> {
//! let scm = BitbucketScm::new(BitbucketConfig::new("client-id", "client-secret"))?;
//!
//! let uri = scm
//!     .parse_url("git@bitbucket.org:batman/test.git#master", "caller-token")
//!     .await?;
//! let sha = scm.get_commit_sha(&uri, "caller-token", None).await?;
//! println!("head of {uri} is {sha}");
//! # Ok(())
//! # }
//! ```

/// Crate version, surfaced in the HTTP user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP executor capability, response validation, and wire models.
pub mod api;

/// Service-level OAuth token lifecycle.
pub mod auth;

/// Per-instance adapter configuration.
pub mod config;

/// Adapter error taxonomy.
pub mod error;

/// The SCM capability contract and the Bitbucket Cloud backend.
pub mod scm;

/// Checkout-URL and SCM-URI codec.
pub mod uri;

/// Webhook normalization and registration.
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

pub use config::BitbucketConfig;
pub use error::ScmError;
pub use scm::{BitbucketScm, Scm};
pub use webhook::{EventAction, EventType, WebhookEvent};
