//! Content-API access for page components

use std::future::Future;
use std::rc::Rc;

use serde::Serialize;
use spacetechs_config::{ApiConfig, DEFAULT_API_BASE_URL};
use spacetechs_data::fallback::{fallback_blogs, fallback_featured_projects};
use spacetechs_data::ApiClient;
use spacetechs_shared::{ApiError, ApiResult, ErrorResponse};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// Substitute `fallback` for transport and HTTP failures; security
/// violations are never masked
pub async fn with_fallback<T>(
    request: impl Future<Output = ApiResult<T>>,
    fallback: impl FnOnce() -> T,
    operation: &str,
) -> ApiResult<T> {
    match request.await {
        Ok(data) => Ok(data),
        Err(error) if error.is_security_violation() => {
            log::error!("{}: {}", operation, error);
            Err(error)
        }
        Err(error) => {
            log::warn!("{}: {}; using fallback content", operation, error);
            Ok(fallback())
        }
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn error_to_js(error: ApiError, operation: &str) -> JsValue {
    let response = ErrorResponse::new(error).with_context("ContentClient", operation);
    serde_wasm_bindgen::to_value(&response)
        .unwrap_or_else(|_| JsValue::from_str(&response.to_json()))
}

fn respond<T: Serialize>(result: ApiResult<T>, operation: &str) -> Result<JsValue, JsValue> {
    match result {
        Ok(value) => to_js(&value),
        Err(error) => Err(error_to_js(error, operation)),
    }
}

#[wasm_bindgen]
pub struct ContentClient {
    client: Rc<ApiClient>,
}

#[wasm_bindgen]
impl ContentClient {
    /// `base_url` defaults to the production content API
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Result<ContentClient, JsValue> {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let mut config =
            ApiConfig::new(&base_url).map_err(|e| JsValue::from_str(&e.to_string()))?;
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            config = config.with_api_key(key);
        }

        let client = ApiClient::new(config).map_err(|e| error_to_js(e, "new"))?;
        Ok(ContentClient {
            client: Rc::new(client),
        })
    }

    #[wasm_bindgen(js_name = featuredProjects)]
    pub fn featured_projects(&self) -> js_sys::Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            let result = with_fallback(
                client.get_featured_projects(),
                fallback_featured_projects,
                "featuredProjects",
            )
            .await;
            respond(result, "featuredProjects")
        })
    }

    #[wasm_bindgen(js_name = featuredBlogs)]
    pub fn featured_blogs(&self) -> js_sys::Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            let result =
                with_fallback(client.get_featured_blogs(), fallback_blogs, "featuredBlogs").await;
            respond(result, "featuredBlogs")
        })
    }

    /// Resolves to `null` when no project matches
    pub fn project(&self, slug_or_id: String) -> js_sys::Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            respond(client.get_project(&slug_or_id).await, "project")
        })
    }

    pub fn blog(&self, slug_or_id: String) -> js_sys::Promise {
        let client = self.client.clone();
        future_to_promise(async move { respond(client.get_blog(&slug_or_id).await, "blog") })
    }

    #[wasm_bindgen(js_name = clearCache)]
    pub fn clear_cache(&self) {
        self.client.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn offline() -> ApiError {
        ApiError::NetworkError {
            message: "offline".to_string(),
        }
    }

    #[test]
    fn test_network_failure_uses_fallback() {
        let projects = block_on(with_fallback(
            async { Err(offline()) },
            fallback_featured_projects,
            "featuredProjects",
        ))
        .unwrap();
        assert_eq!(projects.len(), 2);
    }

    #[test]
    fn test_security_violation_is_surfaced() {
        let violation = ApiError::invalid_endpoint("https://evil.example/x", "absolute URLs not allowed");
        let failing = violation.clone();
        let result = block_on(with_fallback(
            async move { Err::<Vec<u8>, _>(failing) },
            Vec::new,
            "project",
        ));
        assert_eq!(result, Err(violation));
    }

    #[test]
    fn test_success_passes_through() {
        let result = block_on(with_fallback(async { Ok(vec![1]) }, Vec::new, "blogs"));
        assert_eq!(result, Ok(vec![1]));
    }
}
