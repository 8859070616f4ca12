//
//  scm-bitbucket
//  api/client.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # HTTP Executor and Response Validation
//!
//! This module defines the request/response boundary between the adapter
//! and Bitbucket's REST API.
//!
//! ## Architecture
//!
//! All outbound traffic flows through an injected [`HttpExecutor`]
//! capability. The adapter core never retries and never times out on its
//! own; resilience policy (retries, circuit breaking, deadlines) lives
//! entirely inside the executor implementation. The default
//! [`ReqwestExecutor`] wraps a [`reqwest::Client`] with a per-request
//! timeout and keeps request counters that surface through
//! [`HttpExecutor::stats`].
//!
//! Responses come back as a uniform `{status, body}` envelope regardless of
//! status code; interpreting the status is the caller's job, either through
//! [`check_response_error`] (the shared vocabulary for listing and webhook
//! operations) or through the inline `STATUS CODE <code>` convention used
//! by single-request façade methods.
//!
//! ## Error Envelope
//!
//! Bitbucket Cloud reports errors as:
//!
//! ```json
//! {"type": "error", "error": {"message": "...", "detail": {"required": ["..."]}}}
//! ```
//!
//! [`check_response_error`] extracts a human-readable reason from that
//! envelope, falling back to the stringified body when the shape differs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, ScmError};

/// Default per-request timeout for the stock executor, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Authentication applied to an outbound request.
#[derive(Debug, Clone)]
pub enum RequestAuth {
    /// No authentication header.
    None,
    /// `Authorization: Bearer <token>` — every API call.
    Bearer(String),
    /// HTTP Basic — the OAuth token endpoint only.
    Basic {
        /// Basic auth username (OAuth client id).
        username: String,
        /// Basic auth password (OAuth client secret).
        password: String,
    },
}

/// Body attached to an outbound request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON-serialized body.
    Json(Value),
    /// `application/x-www-form-urlencoded` body.
    Form(Vec<(String, String)>),
}

/// A provider-agnostic description of one HTTP call.
///
/// Built by the façade methods and handed to the [`HttpExecutor`]; carries
/// everything the executor needs and nothing it does not (no cookies, no
/// redirects, no streaming).
///
/// # Example
///
/// ```rust
/// use scm_bitbucket::api::HttpRequest;
///
/// let request = HttpRequest::get("https://api.bitbucket.org/2.0/repositories/batman/test")
///     .bearer("access-token");
/// assert_eq!(request.method, reqwest::Method::GET);
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Authentication to apply.
    pub auth: RequestAuth,
    /// Request body.
    pub body: RequestBody,
}

impl HttpRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            auth: RequestAuth::None,
            body: RequestBody::Empty,
        }
    }

    /// Builds a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Builds a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Builds a PUT request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Attaches a bearer token.
    pub fn bearer(mut self, token: &str) -> Self {
        self.auth = RequestAuth::Bearer(token.to_string());
        self
    }

    /// Attaches HTTP Basic credentials.
    pub fn basic(mut self, username: &str, password: &str) -> Self {
        self.auth = RequestAuth::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
        self
    }

    /// Attaches a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attaches a form-encoded body.
    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }
}

/// Uniform response envelope: status code plus raw body text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as loose JSON, yielding `Value::Null` when the body
    /// is not valid JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    /// Deserializes the body into a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::Provider`] when the body does not match the
    /// expected shape.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|source| {
            ScmError::provider(self.status, format!("Unexpected response body: {source}"))
        })
    }
}

/// Snapshot of an executor's request counters.
///
/// Returned by [`HttpExecutor::stats`] and surfaced to the orchestration
/// platform through [`stats`](crate::scm::Scm::stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Total requests issued.
    pub total: u64,
    /// Requests that completed with a 2xx status.
    pub success: u64,
    /// Requests that failed in transport or completed non-2xx.
    pub failure: u64,
}

/// Capability interface for performing HTTP calls.
///
/// The adapter consumes this as an injected collaborator so that resilience
/// policy stays configurable and tests can substitute a scripted
/// implementation. Implementations must be safe to share across concurrent
/// façade calls.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Performs one HTTP call, returning the uniform response envelope.
    ///
    /// Non-2xx statuses are NOT errors at this layer; only transport-level
    /// failures (DNS, connection, timeout) reject.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Returns a snapshot of this executor's request counters.
    fn stats(&self) -> ExecutorStats;
}

/// Default [`HttpExecutor`] backed by [`reqwest::Client`].
///
/// Applies a custom user agent and a per-request timeout; counts requests
/// with lock-free atomics so `stats()` is cheap to call from any task.
pub struct ReqwestExecutor {
    /// The underlying HTTP client.
    http: Client,
    total: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
}

impl ReqwestExecutor {
    /// Creates an executor with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates an executor with an explicit per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: Client::builder()
                .user_agent(format!("scm-bitbucket/{}", crate::VERSION))
                .timeout(timeout)
                .build()?,
            total: AtomicU64::new(0),
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.total.fetch_add(1, Ordering::Relaxed);

        let mut builder = self.http.request(request.method.clone(), &request.url);

        builder = match request.auth {
            RequestAuth::None => builder,
            RequestAuth::Bearer(token) => builder.bearer_auth(token),
            RequestAuth::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
        };

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                self.failure.fetch_add(1, Ordering::Relaxed);
                return Err(source.into());
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(source) => {
                self.failure.fetch_add(1, Ordering::Relaxed);
                return Err(source.into());
            }
        };

        if (200..300).contains(&status) {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%status, url = %request.url, "bitbucket api returned non-2xx");
        }

        Ok(HttpResponse { status, body })
    }

    fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            total: self.total.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            failure: self.failure.load(Ordering::Relaxed),
        }
    }
}

/// Validates a response envelope, translating non-2xx statuses into a
/// structured [`ScmError::Provider`].
///
/// The error message has the shape `<errorMessage> Reason "<errorReason>"`:
///
/// - `errorMessage` comes from `body.error.message`, defaulting to
///   `SCM service unavailable (<status>).`
/// - `errorReason` comes from `body.error.detail.required`, defaulting to
///   the JSON-stringified body (or the raw body when it is not JSON).
///
/// This is the single shared vocabulary for listing and webhook operations;
/// single-request façade methods use [`status_error`] instead.
///
/// # Example
///
/// ```rust
/// use scm_bitbucket::api::{check_response_error, HttpResponse};
///
/// let response = HttpResponse {
///     status: 403,
///     body: r#"{"error": {"message": "Access denied", "detail": {"required": ["webhook"]}}}"#.to_string(),
/// };
/// let err = check_response_error(&response).unwrap_err();
/// assert_eq!(err.to_string(), r#"Access denied Reason "["webhook"]""#);
/// ```
pub fn check_response_error(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }

    let body = response.json();

    let message = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("SCM service unavailable ({}).", response.status));

    let reason = match body.pointer("/error/detail/required") {
        Some(Value::String(reason)) => reason.clone(),
        Some(other) => other.to_string(),
        None if body.is_null() => response.body.clone(),
        None => body.to_string(),
    };

    Err(ScmError::provider(
        response.status,
        format!("{message} Reason \"{reason}\""),
    ))
}

/// Builds the inline-convention error for single-request façade methods:
/// `STATUS CODE <code>: <stringified body>`.
pub fn status_error(response: &HttpResponse) -> ScmError {
    ScmError::provider(
        response.status,
        format!("STATUS CODE {}: {}", response.status, response.body),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses_pass_through() {
        for status in [200, 201, 204, 299] {
            let response = HttpResponse {
                status,
                body: String::new(),
            };
            assert!(check_response_error(&response).is_ok());
        }
    }

    #[test]
    fn test_error_with_provider_envelope() {
        let response = HttpResponse {
            status: 403,
            body: r#"{"type": "error", "error": {"message": "Access denied", "detail": {"required": ["webhook"]}}}"#
                .to_string(),
        };
        let err = check_response_error(&response).unwrap_err();
        assert_eq!(err.to_string(), r#"Access denied Reason "["webhook"]""#);
        assert_eq!(err.status_code(), Some(403));
    }

    #[test]
    fn test_error_without_envelope_stringifies_body() {
        let response = HttpResponse {
            status: 500,
            body: r#"{"unexpected":true}"#.to_string(),
        };
        let err = check_response_error(&response).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"SCM service unavailable (500). Reason "{"unexpected":true}""#
        );
    }

    #[test]
    fn test_error_with_non_json_body() {
        let response = HttpResponse {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        let err = check_response_error(&response).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"SCM service unavailable (502). Reason "Bad Gateway""#
        );
    }

    #[test]
    fn test_status_error_convention() {
        let response = HttpResponse {
            status: 409,
            body: r#"{"busy": true}"#.to_string(),
        };
        let err = status_error(&response);
        assert_eq!(err.to_string(), r#"STATUS CODE 409: {"busy": true}"#);
        assert_eq!(err.status_code(), Some(409));
    }

    #[tokio::test]
    async fn test_reqwest_executor_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2.0/repositories/batman/test")
            .match_header("authorization", "Bearer my-token")
            .with_status(200)
            .with_body(r#"{"uuid": "{uuid}"}"#)
            .create_async()
            .await;

        let executor = ReqwestExecutor::new().unwrap();
        let response = executor
            .execute(
                HttpRequest::get(format!("{}/2.0/repositories/batman/test", server.url()))
                    .bearer("my-token"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.json()["uuid"], "{uuid}");
        assert_eq!(
            executor.stats(),
            ExecutorStats {
                total: 1,
                success: 1,
                failure: 0
            }
        );
    }

    #[tokio::test]
    async fn test_reqwest_executor_returns_envelope_for_non_2xx() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/2.0/repositories/batman/test/hooks")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Token expired"}}"#)
            .create_async()
            .await;

        let executor = ReqwestExecutor::new().unwrap();
        let response = executor
            .execute(
                HttpRequest::post(format!(
                    "{}/2.0/repositories/batman/test/hooks",
                    server.url()
                ))
                .bearer("stale")
                .json(serde_json::json!({"url": "https://cd.example.com/hook"})),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert!(check_response_error(&response).is_err());
        assert_eq!(executor.stats().failure, 1);
    }
}
