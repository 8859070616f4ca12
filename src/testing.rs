//
//  scm-bitbucket
//  testing.rs
//
//  Created by Ngonidzashe Mangudya on 2026/08/07.
//  Copyright (c) 2026 IAMNGONI. All rights reserved.
//

//! Scripted [`HttpExecutor`] for unit tests.
//!
//! Routes are matched in order by HTTP method plus a URL substring; the
//! first match wins, so more specific routes go first. Every executed
//! request is recorded for assertions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ExecutorStats, HttpExecutor, HttpRequest, HttpResponse};
use crate::error::Result;

struct Route {
    method: String,
    url_part: String,
    status: u16,
    body: String,
}

/// In-memory executor serving canned responses.
pub(crate) struct MockExecutor {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    success: AtomicU64,
    failure: AtomicU64,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
        }
    }

    /// Appends a route (builder style).
    pub fn route(self, method: &str, url_part: &str, status: u16, body: String) -> Self {
        self.routes.lock().unwrap().push(Route {
            method: method.to_string(),
            url_part: url_part.to_string(),
            status,
            body,
        });
        self
    }

    /// Inserts a route ahead of the existing ones, shadowing any later
    /// route that would also match. Lets a test change the remote's state
    /// between calls.
    pub fn prepend_route(&self, method: &str, url_part: &str, status: u16, body: String) {
        self.routes.lock().unwrap().insert(
            0,
            Route {
                method: method.to_string(),
                url_part: url_part.to_string(),
                status,
                body,
            },
        );
    }

    /// All requests executed so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of executed requests whose URL contains `url_part`.
    pub fn calls_matching(&self, url_part: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.contains(url_part))
            .count()
    }
}

#[async_trait]
impl HttpExecutor for MockExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let routes = self.routes.lock().unwrap();
        let matched = routes.iter().find(|route| {
            route.method == request.method.as_str() && request.url.contains(&route.url_part)
        });

        let response = match matched {
            Some(route) => HttpResponse {
                status: route.status,
                body: route.body.clone(),
            },
            None => HttpResponse {
                status: 404,
                body: format!("no mock route for {} {}", request.method, request.url),
            },
        };

        if response.is_success() {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }
        Ok(response)
    }

    fn stats(&self) -> ExecutorStats {
        let success = self.success.load(Ordering::Relaxed);
        let failure = self.failure.load(Ordering::Relaxed);
        ExecutorStats {
            total: success + failure,
            success,
            failure,
        }
    }
}
