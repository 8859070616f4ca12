//
//  scm-bitbucket
//  api/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # API Layer
//!
//! The request/response boundary with Bitbucket Cloud.
//!
//! - [`client`]: the [`HttpExecutor`] capability, the default
//!   [`ReqwestExecutor`], and response validation
//! - [`models`]: wire types for the API v2.0 responses the adapter reads
//!
//! All endpoints live under `https://api.bitbucket.org/2.0`; every call
//! carries a bearer token except the OAuth token endpoint, which uses HTTP
//! Basic (see [`crate::auth`]).

/// HTTP executor capability and response validation.
pub mod client;

/// Wire types for Bitbucket Cloud API responses.
pub mod models;

pub use client::{
    check_response_error, status_error, ExecutorStats, HttpExecutor, HttpRequest, HttpResponse,
    ReqwestExecutor, RequestAuth, RequestBody,
};
pub use models::{
    BranchName, BranchRef, Commit, CommitAuthor, CommitTarget, Link, Links, Paginated, PrEndpoint,
    PullRequest, Repository, UserAccount, WebhookSubscription,
};
