//!
//! Platform API client
//! -------------------
//! Thin wrapper over `reqwest` that adds the session's bearer token, speaks
//! JSON in both directions and normalizes the two response contracts (raw
//! payload or `{code, success, model}` envelope) into `Result<T, RequestError>`.
//! No retries and no timeouts beyond the HTTP client's defaults.

use std::sync::Arc;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{RequestError, RequestResult};

pub mod envelope;
pub mod models;
mod endpoints;

pub use endpoints::{ALL_TAGS, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
pub use envelope::{decode_response, ApiEnvelope};

/// Where the client reads the bearer token from, at request time.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Token source for anonymous use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenSource for NoToken {
    fn bearer_token(&self) -> Option<String> { None }
}

/// Method and optional JSON body of one call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self { Self::get() }
}

impl RequestOptions {
    pub fn get() -> Self { Self { method: Method::GET, body: None } }

    pub fn patch() -> Self { Self { method: Method::PATCH, body: None } }

    pub fn delete() -> Self { Self { method: Method::DELETE, body: None } }

    pub fn post<B: Serialize + ?Sized>(body: &B) -> RequestResult<Self> {
        Ok(Self { method: Method::POST, body: Some(to_body(body)?) })
    }

    pub fn put<B: Serialize + ?Sized>(body: &B) -> RequestResult<Self> {
        Ok(Self { method: Method::PUT, body: Some(to_body(body)?) })
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> RequestResult<Value> {
    serde_json::to_value(body).map_err(|e| RequestError::new(format!("invalid request body: {}", e)))
}

#[derive(Clone)]
pub struct ApiClient {
    base: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base).finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base: &str, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_http(base, reqwest::Client::new(), tokens)
    }

    /// Client over a preconfigured `reqwest::Client` (proxies, TLS roots).
    pub fn with_http(base: &str, http: reqwest::Client, tokens: Arc<dyn TokenSource>) -> Self {
        Self { base: base.trim_end_matches('/').to_string(), http, tokens }
    }

    pub fn base_url(&self) -> &str { &self.base }

    /// Absolute URL for an endpoint path such as `/profiles/tags`.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base, endpoint)
        } else {
            format!("{}/{}", self.base, endpoint)
        }
    }

    /// Issue one call and decode its answer into `T`.
    pub async fn request<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> RequestResult<T> {
        let url = self.url_for(endpoint);
        let method = options.method.clone();
        let mut req = self
            .http
            .request(options.method, &url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.tokens.bearer_token() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = options.body.as_ref() {
            let bytes = serde_json::to_vec(body).map_err(|e| RequestError::new(format!("invalid request body: {}", e)))?;
            req = req.body(bytes);
        }
        let resp = req.send().await.map_err(|e| RequestError::transport(&e))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| RequestError::transport(&e))?;
        debug!(%method, endpoint, status, len = bytes.len(), "api response");
        decode_response(status, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_joins_base_and_endpoint() {
        let c = ApiClient::new("http://localhost:8080/api/", Arc::new(NoToken));
        assert_eq!(c.base_url(), "http://localhost:8080/api");
        assert_eq!(c.url_for("/auth/login"), "http://localhost:8080/api/auth/login");
        assert_eq!(c.url_for("profiles/tags"), "http://localhost:8080/api/profiles/tags");
    }

    #[test]
    fn request_options_carry_json_bodies() {
        let o = RequestOptions::post(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(o.method, Method::POST);
        assert_eq!(o.body, Some(serde_json::json!({"a": 1})));
        assert!(RequestOptions::default().body.is_none());
        assert_eq!(RequestOptions::patch().method, Method::PATCH);
    }

    #[test]
    fn debug_does_not_leak_tokens() {
        struct Secret;
        impl TokenSource for Secret {
            fn bearer_token(&self) -> Option<String> { Some("s3cr3t".into()) }
        }
        let c = ApiClient::new("http://x", Arc::new(Secret));
        assert!(!format!("{:?}", c).contains("s3cr3t"));
    }
}
