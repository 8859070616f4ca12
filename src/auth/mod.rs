//
//  scm-bitbucket
//  auth/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Authentication
//!
//! Service-level OAuth token management for the adapter.
//!
//! The adapter authenticates outbound read calls with a single short-lived
//! OAuth access token obtained through the client-credentials grant and
//! renewed through the refresh-token grant. See [`token::TokenManager`] for
//! the lifecycle rules.
//!
//! Caller-supplied tokens (build-scoped or user-scoped) are passed straight
//! through to identity-bearing operations and are not managed here.

mod token;

pub use token::*;
