//
//  scm-bitbucket
//  webhook/normalize.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Webhook Normalization
//!
//! Single-shot classification of an inbound Bitbucket webhook call into the
//! orchestration platform's canonical event model.
//!
//! ## Classification
//!
//! The event kind and action arrive in the `x-event-key` header as
//! `<kind>:<action>`:
//!
//! | kind | action | outcome |
//! |------|--------|---------|
//! | `repo` | `push` | repo / push |
//! | `pullrequest` | `created` | pr / opened |
//! | `pullrequest` | `updated` | pr / synchronized |
//! | `pullrequest` | `fulfilled`, `rejected` | pr / closed |
//! | anything else | — | unsupported |
//!
//! Unsupported combinations resolve to `Ok(None)`, never an error: webhook
//! delivery must not surface 500s for events the adapter does not care
//! about, since providers retry and alert on handler failures. A payload
//! for a *supported* event that is missing required fields is a genuine
//! fault and surfaces as [`ScmError::Hook`].
//!
//! ## Checkout URL
//!
//! The canonical checkout URL is resynthesized from the repository's HTML
//! link as `{protocol}://{hostname}{path}.git`. The acting user's identity
//! is carried separately in `username` and is never embedded in the URL.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use url::Url;

use crate::error::{Result, ScmError};

/// Header carrying the `<kind>:<action>` event key.
pub const WEBHOOK_EVENT_HEADER: &str = "x-event-key";

/// Header carrying the provider's delivery UUID.
pub const WEBHOOK_UUID_HEADER: &str = "x-request-uuid";

/// Canonical event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Pull request event.
    Pr,
    /// Repository event.
    Repo,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pr => write!(f, "pr"),
            Self::Repo => write!(f, "repo"),
        }
    }
}

/// Canonical event action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    /// A pull request was opened.
    Opened,
    /// A pull request was closed (merged or declined).
    Closed,
    /// A pull request's source branch was updated.
    Synchronized,
    /// Commits were pushed to a branch.
    Push,
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::Closed => write!(f, "closed"),
            Self::Synchronized => write!(f, "synchronized"),
            Self::Push => write!(f, "push"),
        }
    }
}

/// The caller's provider-agnostic webhook representation.
///
/// Constructed fresh per incoming call; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Event category.
    pub event_type: EventType,
    /// Event action.
    pub action: EventAction,
    /// UUID of the acting user.
    pub username: String,
    /// Canonical https checkout URL of the repository.
    pub checkout_url: String,
    /// Branch the event concerns (destination branch for PR events).
    pub branch: String,
    /// Commit hash the event concerns (source head for PR events).
    pub sha: String,
    /// Pull request number, for PR events.
    pub pr_num: Option<u64>,
    /// Pull request source branch name, for PR events.
    ///
    /// Bitbucket has no dedicated PR ref path; the "ref" is simply the
    /// source branch name.
    pub pr_ref: Option<String>,
    /// Message of the pushed head commit, for push events. Empty when the
    /// payload omits it.
    pub last_commit_message: Option<String>,
    /// Provider delivery UUID, from `x-request-uuid`.
    pub hook_id: String,
    /// Owning adapter context, `bitbucket:<hostname>`.
    pub scm_context: String,
}

/// Case-insensitive header lookup.
pub(crate) fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Extracts a required string at a JSON pointer.
fn str_at(value: &Value, pointer: &str) -> Result<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ScmError::Hook(format!("webhook payload missing {pointer}")))
}

/// Rebuilds the canonical checkout URL from the repository's HTML link.
fn checkout_url_from_repository(payload: &Value) -> Result<String> {
    let href = str_at(payload, "/repository/links/html/href")?;
    let parsed = Url::parse(&href)
        .map_err(|_| ScmError::Hook(format!("unparseable repository link {href}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ScmError::Hook(format!("repository link {href} has no host")))?;

    Ok(format!("{}://{}{}.git", parsed.scheme(), host, parsed.path()))
}

/// Classifies an inbound webhook call and extracts the canonical event.
///
/// # Parameters
///
/// - `headers`: the delivery's HTTP headers (looked up case-insensitively).
/// - `payload`: the JSON body.
/// - `scm_context`: the owning adapter's context string.
///
/// # Returns
///
/// - `Ok(Some(event))` for a recognized, well-formed delivery.
/// - `Ok(None)` for any event kind/action outside the supported table, or
///   when the event-key header is absent or malformed.
/// - `Err(ScmError::Hook)` when a supported event's payload lacks a
///   required field.
pub fn normalize(
    headers: &HashMap<String, String>,
    payload: &Value,
    scm_context: &str,
) -> Result<Option<WebhookEvent>> {
    let Some(event_key) = header(headers, WEBHOOK_EVENT_HEADER) else {
        return Ok(None);
    };
    let Some((kind, action)) = event_key.split_once(':') else {
        return Ok(None);
    };

    let (event_type, event_action) = match (kind, action) {
        ("repo", "push") => (EventType::Repo, EventAction::Push),
        ("pullrequest", "created") => (EventType::Pr, EventAction::Opened),
        ("pullrequest", "updated") => (EventType::Pr, EventAction::Synchronized),
        // "fullfilled" is the spelling some historical deliveries carried.
        ("pullrequest", "fulfilled" | "fullfilled" | "rejected") => {
            (EventType::Pr, EventAction::Closed)
        }
        _ => {
            tracing::debug!(%event_key, "ignoring unsupported webhook event");
            return Ok(None);
        }
    };

    let hook_id = header(headers, WEBHOOK_UUID_HEADER)
        .ok_or_else(|| ScmError::Hook(format!("missing {WEBHOOK_UUID_HEADER} header")))?
        .to_string();
    let username = str_at(payload, "/actor/uuid")?;
    let checkout_url = checkout_url_from_repository(payload)?;

    let event = match event_type {
        EventType::Repo => {
            let change = payload
                .pointer("/push/changes/0/new")
                .ok_or_else(|| ScmError::Hook("push payload carries no changes".to_string()))?;
            WebhookEvent {
                event_type,
                action: event_action,
                username,
                checkout_url,
                branch: str_at(change, "/name")?,
                sha: str_at(change, "/target/hash")?,
                pr_num: None,
                pr_ref: None,
                last_commit_message: Some(
                    change
                        .pointer("/target/message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                ),
                hook_id,
                scm_context: scm_context.to_string(),
            }
        }
        EventType::Pr => WebhookEvent {
            event_type,
            action: event_action,
            username,
            checkout_url,
            branch: str_at(payload, "/pullrequest/destination/branch/name")?,
            sha: str_at(payload, "/pullrequest/source/commit/hash")?,
            pr_num: Some(
                payload
                    .pointer("/pullrequest/id")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| ScmError::Hook("webhook payload missing /pullrequest/id".to_string()))?,
            ),
            pr_ref: Some(str_at(payload, "/pullrequest/source/branch/name")?),
            last_commit_message: None,
            hook_id,
            scm_context: scm_context.to_string(),
        },
    };

    Ok(Some(event))
}
