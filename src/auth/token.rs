//
//  scm-bitbucket
//  auth/token.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Service Token Lifecycle
//!
//! Bitbucket issues short-lived (1–2 hour) OAuth access tokens. The adapter
//! holds exactly one service-level token per instance, shared by every
//! outbound read call, and refreshes it transparently on use rather than on
//! a background timer: polling the expiry on each call costs at most one
//! extra latency hit when the token is stale, and leaves no orphaned timers
//! behind on shutdown.
//!
//! ## Grant Sequence
//!
//! - First issuance: `grant_type=client_credentials` with HTTP Basic auth
//!   (client id / client secret) against the pre-provisioned OAuth consumer.
//! - Every later renewal: `grant_type=refresh_token` with the refresh token
//!   from the previous response, same Basic auth.
//!
//! The full authorization-code flow is out of scope; the consumer is
//! provisioned ahead of time and the adapter only ever renews.
//!
//! ## Failure Semantics
//!
//! A non-200 from the token endpoint is fatal to the triggering call and is
//! surfaced as [`ScmError::Authentication`] carrying the raw response body
//! — the token endpoint's error envelope differs from the regular API error
//! shape, so the generic response validator is bypassed here. The manager
//! never retries; transient-network retry policy belongs to the executor.
//!
//! Tokens live in memory only and die with the process.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::api::{HttpExecutor, HttpRequest};
use crate::error::{Result, ScmError};

/// Bitbucket Cloud OAuth token endpoint.
pub const TOKEN_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// Tokens are treated as expired this many milliseconds before their actual
/// expiry, so a token cannot lapse mid-request.
const EXPIRY_SAFETY_MARGIN_MS: i64 = 5000;

/// The single service-level OAuth token.
///
/// Created empty at adapter construction; mutated only by
/// [`TokenManager::refresh`]; never persisted. After the first successful
/// issuance the refresh token is non-empty and is reused for every later
/// renewal.
#[derive(Debug, Clone, Default)]
pub struct ServiceToken {
    /// Bearer token attached to API requests.
    pub access_token: String,
    /// Refresh token for subsequent renewals.
    pub refresh_token: String,
    /// Expiry instant, epoch milliseconds.
    pub expires_at_ms: i64,
}

impl ServiceToken {
    /// Whether the token needs (re-)issuing at `now_ms`.
    fn is_stale(&self, now_ms: i64) -> bool {
        self.access_token.is_empty() || now_ms >= self.expires_at_ms - EXPIRY_SAFETY_MARGIN_MS
    }
}

/// Successful token-endpoint response body.
#[derive(Deserialize)]
struct TokenGrantResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

/// Owns the service token's lifecycle: issuance, expiry tracking, and
/// transparent refresh.
///
/// One manager per adapter instance, so concurrent adapter instances (e.g.
/// multi-tenant hosting for different Bitbucket accounts) each run an
/// independent token lifecycle. The token sits behind an async mutex; a
/// refresh holds the lock, so concurrent calls that observe the same stale
/// token serialize on a single renewal instead of racing the endpoint.
pub struct TokenManager {
    executor: Arc<dyn HttpExecutor>,
    client_id: String,
    client_secret: String,
    token_url: String,
    state: Mutex<ServiceToken>,
}

impl TokenManager {
    /// Creates a manager for the given OAuth consumer.
    pub fn new(executor: Arc<dyn HttpExecutor>, client_id: &str, client_secret: &str) -> Self {
        Self {
            executor,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url: TOKEN_URL.to_string(),
            state: Mutex::new(ServiceToken::default()),
        }
    }

    /// Returns a currently-valid access token, refreshing first when the
    /// in-memory token is absent or within the safety margin of expiry.
    ///
    /// Refresh is the exception path: while the token is fresh this is a
    /// lock-and-clone with no network activity.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::Authentication`] when the token endpoint refuses
    /// the grant, or a transport error when the endpoint is unreachable.
    pub async fn get(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if state.is_stale(Utc::now().timestamp_millis()) {
            self.refresh(&mut state).await?;
        }
        Ok(state.access_token.clone())
    }

    /// Issues or renews the token via the OAuth token endpoint.
    async fn refresh(&self, state: &mut ServiceToken) -> Result<()> {
        let fields = if state.refresh_token.is_empty() {
            vec![("grant_type".to_string(), "client_credentials".to_string())]
        } else {
            vec![
                ("grant_type".to_string(), "refresh_token".to_string()),
                ("refresh_token".to_string(), state.refresh_token.clone()),
            ]
        };

        tracing::debug!(grant_type = %fields[0].1, "refreshing bitbucket service token");

        let request = HttpRequest::post(&self.token_url)
            .basic(&self.client_id, &self.client_secret)
            .form(fields);
        let response = self.executor.execute(request).await?;

        if response.status != 200 {
            return Err(ScmError::Authentication {
                body: response.body,
            });
        }

        let grant: TokenGrantResponse = serde_json::from_str(&response.body)
            .map_err(|_| ScmError::Authentication {
                body: response.body.clone(),
            })?;

        state.access_token = grant.access_token;
        state.refresh_token = grant.refresh_token;
        state.expires_at_ms = Utc::now().timestamp_millis() + grant.expires_in * 1000;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RequestBody;
    use crate::testing::MockExecutor;
    use serde_json::json;

    fn token_body(access: &str, refresh: &str, expires_in: i64) -> String {
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": expires_in,
            "token_type": "bearer",
            "scopes": "repository webhook"
        })
        .to_string()
    }

    #[test]
    fn test_initial_issuance_uses_client_credentials_grant() {
        tokio_test::block_on(async {
            let executor = Arc::new(
                MockExecutor::new().route("POST", "/site/oauth2/access_token", 200, token_body("tok1", "ref1", 7200)),
            );
            let manager = TokenManager::new(executor.clone(), "id", "secret");

            assert_eq!(manager.get().await.unwrap(), "tok1");

            let requests = executor.requests();
            assert_eq!(requests.len(), 1);
            match &requests[0].body {
                RequestBody::Form(fields) => {
                    assert!(fields
                        .contains(&("grant_type".to_string(), "client_credentials".to_string())));
                }
                other => panic!("expected form body, got {other:?}"),
            }
        });
    }

    #[test]
    fn test_valid_token_is_reused_without_refresh() {
        tokio_test::block_on(async {
            let executor = Arc::new(
                MockExecutor::new().route("POST", "/site/oauth2/access_token", 200, token_body("tok1", "ref1", 7200)),
            );
            let manager = TokenManager::new(executor.clone(), "id", "secret");

            for _ in 0..5 {
                assert_eq!(manager.get().await.unwrap(), "tok1");
            }

            assert_eq!(executor.calls_matching("/site/oauth2/access_token"), 1);
        });
    }

    #[test]
    fn test_stale_token_triggers_refresh_token_grant() {
        tokio_test::block_on(async {
            // expires_in of 0 makes the token stale immediately, so the
            // second get() must renew with the refresh_token grant.
            let executor = Arc::new(
                MockExecutor::new().route("POST", "/site/oauth2/access_token", 200, token_body("tok1", "ref1", 0)),
            );
            let manager = TokenManager::new(executor.clone(), "id", "secret");

            manager.get().await.unwrap();
            manager.get().await.unwrap();

            let requests = executor.requests();
            assert_eq!(requests.len(), 2);
            match &requests[1].body {
                RequestBody::Form(fields) => {
                    assert!(fields
                        .contains(&("grant_type".to_string(), "refresh_token".to_string())));
                    assert!(fields
                        .contains(&("refresh_token".to_string(), "ref1".to_string())));
                }
                other => panic!("expected form body, got {other:?}"),
            }
        });
    }

    #[test]
    fn test_refresh_failure_is_fatal_with_body() {
        tokio_test::block_on(async {
            let executor = Arc::new(MockExecutor::new().route(
                "POST",
                "/site/oauth2/access_token",
                400,
                r#"{"error_description": "Invalid OAuth client credentials"}"#.to_string(),
            ));
            let manager = TokenManager::new(executor, "id", "wrong");

            let err = manager.get().await.unwrap_err();
            match err {
                ScmError::Authentication { body } => {
                    assert!(body.contains("Invalid OAuth client credentials"));
                }
                other => panic!("expected authentication error, got {other:?}"),
            }
        });
    }
}
