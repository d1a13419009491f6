//! HTTP transport seam for the Bangumi API
//!
//! `Transport` is the only place a request leaves the process. The production
//! implementation wraps a single pooled `reqwest::Client`; tests substitute
//! `MockTransport`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::error::{BangumiError, Result};

/// Public Bangumi API host
pub const DEFAULT_BASE_URL: &str = "https://api.bgm.tv";

/// One outgoing backend call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Set query parameters
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Set a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter by name
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Undecoded backend answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// `Location` header, present on redirects
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Response with a JSON body
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            location: None,
            body: serde_json::to_vec(body).unwrap_or_default(),
        }
    }

    /// Response with no body (204-style success)
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Redirect carrying the target in the `Location` header
    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            location: Some(location.into()),
            body: Vec::new(),
        }
    }

    /// Raw body bytes, e.g. a malformed payload
    pub fn bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            location: None,
            body: body.into(),
        }
    }
}

/// Executes backend calls; shared by every in-flight tool invocation
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request and return the status, redirect target and body.
    ///
    /// Non-2xx statuses are not errors here; only network failures are.
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse>;
}

/// Production transport backed by a pooled reqwest client
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Build the client. An empty or absent token sends no `Authorization` header.
    pub fn new(base_url: impl Into<String>, token: Option<&str>, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| BangumiError::Config(format!("Invalid user agent: {}", e)))?,
        );
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| BangumiError::Config(format!("Invalid API token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        // Redirects stay visible: the image endpoint answers with a 302 whose
        // Location header is the result.
        let client = Client::builder()
            .default_headers(headers)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            location,
            body,
        })
    }
}
