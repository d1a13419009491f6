//! In-memory transport for tests
//!
//! Serves canned responses keyed by method and path, and records every request
//! so callers can assert how many backend calls a tool made.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use crate::error::Result;

use super::transport::{ApiRequest, RawResponse, Transport};

/// Mock transport with predefined responses
pub struct MockTransport {
    responses: HashMap<(Method, String), RawResponse>,
    fallback: RawResponse,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Every unmatched request answers `200 {}`
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fallback: RawResponse::json(200, &json!({})),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Add a predefined response for a method and path
    pub fn with_response(mut self, method: Method, path: &str, response: RawResponse) -> Self {
        self.responses.insert((method, path.to_string()), response);
        self
    }

    /// Replace the response used for unmatched requests
    pub fn with_fallback(mut self, response: RawResponse) -> Self {
        self.fallback = response;
        self
    }

    /// All requests seen so far, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of backend calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        let key = (request.method.clone(), request.path.clone());
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        Ok(self
            .responses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
