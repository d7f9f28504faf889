//! HTTP transport used by the content-API client

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spacetechs_shared::{ApiError, ApiResult};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one request; implementations never follow redirects
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn execute(&self, request: TransportRequest) -> ApiResult<TransportResponse>;
}

/// `reqwest`-backed transport (fetch in the browser, hyper natively)
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let builder = reqwest::Client::builder();

        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout);

        #[cfg(target_arch = "wasm32")]
        let _ = timeout;

        let client = builder.build().map_err(|e| ApiError::NetworkError {
            message: format!("failed to build HTTP client: {}", e),
        })?;

        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> ApiResult<TransportResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| ApiError::NetworkError {
            message: format!("Please check your connection ({})", e),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ApiError::NetworkError {
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(TransportResponse { status, body })
    }
}
