//
//  scm-bitbucket
//  webhook/register.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! # Webhook Registration
//!
//! Idempotent find-or-create protocol ensuring a repository carries exactly
//! one hook pointed at a given callback URL.
//!
//! ## Protocol
//!
//! 1. Walk the repository's hook collection page by page (`pagelen=30`),
//!    scanning each page for an entry whose `url` equals the target. Pages
//!    are fetched strictly sequentially because the termination condition —
//!    a page shorter than the page size — depends on the previous page's
//!    content.
//! 2. When a match exists, PUT the registration body to the hook's own
//!    resource (find-then-replace). Otherwise POST it to the collection.
//!
//! The two-call sequence is not transactional: two callers registering the
//! same URL simultaneously can both miss in the search and create two
//! hooks. Duplicate notifications are tolerable to the caller, so the
//! protocol accepts the race instead of paying for provider-side locking.
//! A failed page is never retried here; retry policy belongs to the
//! executor.

use std::sync::Arc;

use serde_json::json;

use crate::api::{check_response_error, HttpExecutor, HttpRequest, Paginated, WebhookSubscription};
use crate::error::Result;

/// Page size used when scanning the hook collection.
pub const WEBHOOK_PAGE_SIZE: usize = 30;

/// Event subscriptions applied when the caller does not name any.
pub const DEFAULT_WEBHOOK_EVENTS: [&str; 5] = [
    "repo:push",
    "pullrequest:created",
    "pullrequest:fulfilled",
    "pullrequest:rejected",
    "pullrequest:updated",
];

/// Description attached to hooks this adapter registers.
const WEBHOOK_DESCRIPTION: &str = "Screwdriver-CD build trigger";

/// Runs the find-or-create protocol against a repository's hook collection.
pub struct WebhookRegistrar {
    executor: Arc<dyn HttpExecutor>,
    api_base: String,
}

impl WebhookRegistrar {
    /// Creates a registrar issuing calls through `executor` against the
    /// given API base URL.
    pub fn new(executor: Arc<dyn HttpExecutor>, api_base: String) -> Self {
        Self { executor, api_base }
    }

    /// Searches the repository's hooks for one whose callback URL equals
    /// `url`, starting at `page`.
    ///
    /// Fetches further pages only while pages come back full-sized; a short
    /// page without a match ends the search with `Ok(None)`. The first
    /// failing page propagates immediately without touching later pages.
    pub async fn find_webhook(
        &self,
        repo_id: &str,
        url: &str,
        page: u32,
        token: &str,
    ) -> Result<Option<WebhookSubscription>> {
        let mut page = page;
        loop {
            let request = HttpRequest::get(format!(
                "{}/repositories/{}/hooks?pagelen={}&page={}",
                self.api_base, repo_id, WEBHOOK_PAGE_SIZE, page
            ))
            .bearer(token);

            let response = self.executor.execute(request).await?;
            check_response_error(&response)?;

            let listing: Paginated<WebhookSubscription> = response.parse()?;
            let page_len = listing.values.len();

            if let Some(hook) = listing.values.into_iter().find(|hook| hook.url == url) {
                return Ok(Some(hook));
            }
            if page_len < WEBHOOK_PAGE_SIZE {
                return Ok(None);
            }
            page += 1;
        }
    }

    /// Registers or replaces the hook pointing at `url`.
    ///
    /// With `hook` present (a match from [`find_webhook`]) the registration
    /// body is PUT to that hook's resource; otherwise it is POSTed to the
    /// collection. An empty `actions` list falls back to
    /// [`DEFAULT_WEBHOOK_EVENTS`].
    pub async fn create_or_update(
        &self,
        repo_id: &str,
        hook: Option<&WebhookSubscription>,
        url: &str,
        actions: &[String],
        token: &str,
    ) -> Result<()> {
        let events: Vec<String> = if actions.is_empty() {
            DEFAULT_WEBHOOK_EVENTS.iter().map(ToString::to_string).collect()
        } else {
            actions.to_vec()
        };

        let body = json!({
            "description": WEBHOOK_DESCRIPTION,
            "url": url,
            "active": true,
            "events": events,
        });

        let request = match hook {
            Some(existing) => HttpRequest::put(format!(
                "{}/repositories/{}/hooks/{}",
                self.api_base, repo_id, existing.uuid
            )),
            None => HttpRequest::post(format!("{}/repositories/{}/hooks", self.api_base, repo_id)),
        }
        .bearer(token)
        .json(body);

        let response = self.executor.execute(request).await?;
        check_response_error(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExecutor;
    use serde_json::{json, Value};

    const REPO_ID: &str = "batman/{repo-uuid}";
    const TARGET: &str = "https://cd.example.com/v4/webhooks";

    fn registrar(executor: &Arc<MockExecutor>) -> WebhookRegistrar {
        WebhookRegistrar::new(
            executor.clone() as Arc<dyn crate::api::HttpExecutor>,
            "https://api.bitbucket.org/2.0".to_string(),
        )
    }

    fn hook(url: &str) -> Value {
        json!({
            "uuid": "{hook-uuid}",
            "url": url,
            "events": ["repo:push"],
            "active": true,
            "description": "Screwdriver-CD build trigger"
        })
    }

    fn page_of(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| hook(&format!("https://elsewhere.example.com/{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_short_first_page_without_match_returns_none() {
        let executor = Arc::new(MockExecutor::new().route(
            "GET",
            "/hooks?pagelen=30&page=1",
            200,
            json!({"values": page_of(3), "pagelen": 30, "page": 1}).to_string(),
        ));

        let found = registrar(&executor)
            .find_webhook(REPO_ID, TARGET, 1, "token")
            .await
            .unwrap();

        assert!(found.is_none());
        assert_eq!(executor.calls_matching("/hooks?"), 1);
    }

    #[tokio::test]
    async fn test_full_page_continues_to_next_page() {
        let mut second_page = page_of(2);
        second_page.push(hook(TARGET));

        let executor = Arc::new(
            MockExecutor::new()
                .route(
                    "GET",
                    "/hooks?pagelen=30&page=1",
                    200,
                    json!({"values": page_of(30), "pagelen": 30, "page": 1}).to_string(),
                )
                .route(
                    "GET",
                    "/hooks?pagelen=30&page=2",
                    200,
                    json!({"values": second_page, "pagelen": 30, "page": 2}).to_string(),
                ),
        );

        let found = registrar(&executor)
            .find_webhook(REPO_ID, TARGET, 1, "token")
            .await
            .unwrap()
            .expect("hook on page 2 should be found");

        assert_eq!(found.uuid, "{hook-uuid}");
        assert_eq!(executor.calls_matching("/hooks?"), 2);
    }

    #[tokio::test]
    async fn test_failing_page_propagates_without_further_pages() {
        let executor = Arc::new(MockExecutor::new().route(
            "GET",
            "/hooks?pagelen=30&page=1",
            403,
            json!({"error": {"message": "Access denied"}}).to_string(),
        ));

        let err = registrar(&executor)
            .find_webhook(REPO_ID, TARGET, 1, "token")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Access denied"));
        assert_eq!(executor.calls_matching("/hooks?"), 1);
    }

    #[tokio::test]
    async fn test_create_posts_to_collection_with_default_events() {
        let executor = Arc::new(MockExecutor::new().route("POST", "/hooks", 201, hook(TARGET).to_string()));

        registrar(&executor)
            .create_or_update(REPO_ID, None, TARGET, &[], "token")
            .await
            .unwrap();

        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, reqwest::Method::POST);
        match &requests[0].body {
            crate::api::RequestBody::Json(body) => {
                assert_eq!(body["description"], "Screwdriver-CD build trigger");
                assert_eq!(body["active"], true);
                assert_eq!(
                    body["events"],
                    json!([
                        "repo:push",
                        "pullrequest:created",
                        "pullrequest:fulfilled",
                        "pullrequest:rejected",
                        "pullrequest:updated"
                    ])
                );
            }
            other => panic!("expected json body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_puts_to_existing_hook() {
        let executor = Arc::new(MockExecutor::new().route(
            "PUT",
            "/hooks/{hook-uuid}",
            200,
            hook(TARGET).to_string(),
        ));

        let existing: WebhookSubscription = serde_json::from_value(hook(TARGET)).unwrap();
        registrar(&executor)
            .create_or_update(
                REPO_ID,
                Some(&existing),
                TARGET,
                &["repo:push".to_string()],
                "token",
            )
            .await
            .unwrap();

        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, reqwest::Method::PUT);
        assert!(requests[0].url.ends_with("/hooks/{hook-uuid}"));
        match &requests[0].body {
            crate::api::RequestBody::Json(body) => {
                assert_eq!(body["events"], json!(["repo:push"]));
            }
            other => panic!("expected json body, got {other:?}"),
        }
    }
}
