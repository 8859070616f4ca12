//
//  scm-bitbucket
//  error.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Adapter Error Types
//!
//! This module defines the error taxonomy shared by every adapter operation.
//!
//! ## Overview
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | [`ScmError::Transport`] | The HTTP layer itself failed (DNS, connection, timeout) |
//! | [`ScmError::Provider`] | Bitbucket answered with a non-2xx status |
//! | [`ScmError::Authentication`] | Service token issuance or refresh failed |
//! | [`ScmError::Config`] | Invalid adapter configuration or malformed input strings |
//! | [`ScmError::Hook`] | A recognized webhook event arrived with a malformed payload |
//!
//! Unsupported webhook events are deliberately NOT errors: they surface as
//! `Ok(None)` from [`parse_hook`](crate::scm::Scm::parse_hook) so that the
//! calling platform never answers a provider notification with a 500 for an
//! event it simply does not care about.
//!
//! ## Error Messages
//!
//! Provider errors carry a preformatted message because callers match on
//! message substrings (e.g. `Cannot find repository`, `STATUS CODE 403`).
//! The originating HTTP status stays available through
//! [`ScmError::status_code`] for programmatic checks.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = ScmError> = std::result::Result<T, E>;

/// Errors produced by the Bitbucket SCM adapter.
#[derive(Debug, Error)]
pub enum ScmError {
    /// The HTTP executor rejected before a response was produced.
    ///
    /// Propagated verbatim from the underlying client; retry policy for
    /// transient transport failures belongs to the executor, never to the
    /// adapter logic.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Bitbucket returned a non-2xx response.
    ///
    /// The message embeds the HTTP status and either the provider-supplied
    /// structured reason or the raw response body.
    #[error("{message}")]
    Provider {
        /// HTTP status code of the failing response.
        status: u16,
        /// Preformatted, caller-facing message.
        message: String,
    },

    /// The OAuth token endpoint refused to issue or refresh the service token.
    ///
    /// Fatal to the triggering call; the adapter does not retry 4xx auth
    /// failures. Carries the raw response body since the token endpoint's
    /// error envelope differs from the regular API error shape.
    #[error("Authentication failed: {body}")]
    Authentication {
        /// Raw response body from the token endpoint.
        body: String,
    },

    /// The adapter was constructed or invoked with invalid configuration.
    ///
    /// Raised synchronously, before any network activity.
    #[error("{0}")]
    Config(String),

    /// A supported webhook event carried a payload missing required fields.
    #[error("{0}")]
    Hook(String),
}

impl ScmError {
    /// Builds a [`ScmError::Provider`] from a status and message.
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code associated with this error, if any.
    ///
    /// Lets callers distinguish e.g. a 404 from other provider failures
    /// without parsing the message text.
    ///
    /// # Example
    ///
    /// ```rust
    /// use scm_bitbucket::error::ScmError;
    ///
    /// let err = ScmError::provider(404, "Cannot find repository");
    /// assert_eq!(err.status_code(), Some(404));
    /// ```
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => Some(*status),
            Self::Transport(source) => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_is_display() {
        let err = ScmError::provider(503, "SCM service unavailable (503). Reason \"down\"");
        assert_eq!(
            err.to_string(),
            "SCM service unavailable (503). Reason \"down\""
        );
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn test_non_provider_errors_have_no_status() {
        assert_eq!(ScmError::Config("bad".into()).status_code(), None);
        assert_eq!(ScmError::Hook("bad".into()).status_code(), None);
    }
}
