//
//  scm-bitbucket
//  config/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Adapter Configuration
//!
//! Static, per-instance settings supplied by the hosting platform at
//! construction time. The configuration is immutable for the adapter's
//! lifetime; there is no file- or environment-based loading here — the
//! orchestration platform owns where these values come from.
//!
//! Validation is synchronous and happens before any network activity:
//! an adapter with unusable OAuth credentials must fail at construction,
//! not on its first API call.

use crate::error::{Result, ScmError};

/// Configuration for one Bitbucket Cloud adapter instance.
///
/// # Example
///
/// ```rust
/// use scm_bitbucket::config::BitbucketConfig;
///
/// let config = BitbucketConfig::new("my-oauth-client-id", "my-oauth-client-secret");
/// assert_eq!(config.username, "sd-buildbot");
/// ```
#[derive(Debug, Clone)]
pub struct BitbucketConfig {
    /// OAuth consumer key of the pre-provisioned Bitbucket app.
    pub oauth_client_id: String,

    /// OAuth consumer secret of the pre-provisioned Bitbucket app.
    pub oauth_client_secret: String,

    /// Git committer name used in generated checkout commands.
    pub username: String,

    /// Git committer email used in generated checkout commands.
    pub email: String,

    /// Whether the hosting platform is reachable over https only; forwarded
    /// into the OAuth provider configuration.
    pub https: bool,
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            oauth_client_id: String::new(),
            oauth_client_secret: String::new(),
            username: "sd-buildbot".to_string(),
            email: "dev-null@screwdriver.cd".to_string(),
            https: false,
        }
    }
}

impl BitbucketConfig {
    /// Creates a configuration with the given OAuth consumer credentials
    /// and default identity settings.
    pub fn new(oauth_client_id: impl Into<String>, oauth_client_secret: impl Into<String>) -> Self {
        Self {
            oauth_client_id: oauth_client_id.into(),
            oauth_client_secret: oauth_client_secret.into(),
            ..Self::default()
        }
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::Config`] when either OAuth credential is empty.
    pub fn validate(&self) -> Result<()> {
        if self.oauth_client_id.trim().is_empty() {
            return Err(ScmError::Config("oauthClientId is required".to_string()));
        }
        if self.oauth_client_secret.trim().is_empty() {
            return Err(ScmError::Config(
                "oauthClientSecret is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_passes() {
        assert!(BitbucketConfig::new("id", "secret").validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let missing_id = BitbucketConfig::new("", "secret");
        assert!(missing_id.validate().is_err());

        let missing_secret = BitbucketConfig::new("id", "   ");
        let err = missing_secret.validate().unwrap_err();
        assert_eq!(err.to_string(), "oauthClientSecret is required");
    }
}
