//! Cached content-API client
//!
//! `request` validates the endpoint, serves fresh GET responses from the
//! [`RequestCache`] and otherwise goes to the network. Concurrent requests for
//! the same uncached key are not deduplicated: each one reaches the transport.

use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use spacetechs_config::ApiConfig;
use spacetechs_shared::{
    ApiError, ApiResult, Blog, BlogDetail, BlogList, Category, CategoryDetail, CategoryList,
    ContactSubmission, Envelope, Project, ProjectDetail, ProjectList,
};

use crate::cache::{cache_key, CacheStats, CachedResponse, Clock, RequestCache, SystemClock};
use crate::endpoint;
use crate::query::{encode_segment, ContentQuery, QueryParams};
use crate::transport::{HttpTransport, Method, ReqwestTransport, TransportRequest};

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

pub struct ApiClient {
    config: ApiConfig,
    transport: Rc<dyn HttpTransport>,
    clock: Rc<dyn Clock>,
    cache: RefCell<RequestCache>,
}

impl ApiClient {
    /// Client over `reqwest` with the system clock
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(
            config,
            Rc::new(transport),
            Rc::new(SystemClock),
        ))
    }

    pub fn with_transport(
        config: ApiConfig,
        transport: Rc<dyn HttpTransport>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let cache = RequestCache::new(config.cache_ttl, config.max_cache_entries);
        Self {
            config,
            transport,
            clock,
            cache: RefCell::new(cache),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Issue a request against the configured base URL and return the JSON body
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> ApiResult<Value> {
        Ok(self.fetch(endpoint, options).await?.data)
    }

    async fn fetch(&self, endpoint: &str, options: RequestOptions) -> ApiResult<CachedResponse> {
        let url = endpoint::resolve(
            &self.config.base_url,
            endpoint,
            &self.config.private_host_allowlist,
        )?;

        let is_get = options.method == Method::Get;
        let key = cache_key(url.as_str(), options.method, options.body.as_ref());

        if is_get {
            let now = self.clock.now_ms();
            let mut cache = self.cache.borrow_mut();
            cache.cleanup(now);
            if let Some(response) = cache.get(&key, now) {
                return Ok(response);
            }
        }

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(api_key) = &self.config.api_key {
            headers.push(("X-API-Key".to_string(), api_key.clone()));
        }
        headers.extend(options.headers);

        let body = options
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::InvalidArgument {
                message: format!("request body is not serialisable: {}", e),
            })?;

        log::debug!("{} {}", options.method.as_str(), url);
        let response = self
            .transport
            .execute(TransportRequest {
                method: options.method,
                url,
                headers,
                body,
            })
            .await?;

        if !response.is_success() {
            let body = if response.body.is_empty() {
                format!("{} Error", response.status)
            } else {
                response.body
            };
            return Err(ApiError::HttpError {
                status: response.status,
                body,
            });
        }

        let data: Value = serde_json::from_str(&response.body).map_err(|e| ApiError::InvalidJson {
            status: response.status,
            message: e.to_string(),
        })?;

        let fetched = CachedResponse {
            status: response.status,
            data,
        };
        if is_get {
            self.cache
                .borrow_mut()
                .insert(key, fetched.clone(), self.clock.now_ms());
        }

        Ok(fetched)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        let CachedResponse { status, data } = self.fetch(endpoint, RequestOptions::get()).await?;
        serde_json::from_value(data).map_err(|e| ApiError::InvalidJson {
            status,
            message: format!("unexpected response shape: {}", e),
        })
    }

    async fn get_data<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        let envelope: Envelope<T> = self.get_json(endpoint).await?;
        Ok(envelope.data)
    }

    // Projects

    pub async fn get_projects(&self, query: &ContentQuery) -> ApiResult<Vec<Project>> {
        let endpoint = format!("/projects{}", query.to_params().to_query_string());
        let list: ProjectList = self.get_data(&endpoint).await?;
        Ok(list.projects)
    }

    pub async fn get_project(&self, slug_or_id: &str) -> ApiResult<Option<Project>> {
        let id = required_id(slug_or_id, "Project slug or ID")?;
        let detail: ProjectDetail = self.get_data(&format!("/projects/{}", id)).await?;
        Ok(detail.project)
    }

    pub async fn get_featured_projects(&self) -> ApiResult<Vec<Project>> {
        let list: ProjectList = self
            .get_data("/projects?featured=true&sort=-createdAt")
            .await?;
        Ok(list.projects)
    }

    pub async fn get_projects_by_category(
        &self,
        category_id: &str,
        query: &ContentQuery,
    ) -> ApiResult<Vec<Project>> {
        required_id(category_id, "Category ID")?;
        let mut params = QueryParams::new();
        params.set("category", category_id);
        query.apply_to(&mut params);

        let list: ProjectList = self
            .get_data(&format!("/projects{}", params.to_query_string()))
            .await?;
        Ok(list.projects)
    }

    pub async fn search_projects(&self, term: &str) -> ApiResult<Vec<Project>> {
        let mut params = QueryParams::new();
        params.set("search", term.trim());
        let list: ProjectList = self
            .get_data(&format!("/projects{}", params.to_query_string()))
            .await?;
        Ok(list.projects)
    }

    // Blogs

    pub async fn get_blogs(&self, query: &ContentQuery) -> ApiResult<Vec<Blog>> {
        let endpoint = format!("/blogs{}", query.to_params().to_query_string());
        let list: BlogList = self.get_data(&endpoint).await?;
        Ok(list.blogs)
    }

    pub async fn get_blog(&self, slug_or_id: &str) -> ApiResult<Blog> {
        let id = required_id(slug_or_id, "Blog slug or ID")?;
        let detail: BlogDetail = self.get_data(&format!("/blogs/{}", id)).await?;
        Ok(detail.into_blog())
    }

    pub async fn get_featured_blogs(&self) -> ApiResult<Vec<Blog>> {
        let list: BlogList = self
            .get_data("/blogs?featured=true&published=true&sort=-publishedAt")
            .await?;
        Ok(list.blogs)
    }

    pub async fn get_blogs_by_category(
        &self,
        category_id: &str,
        query: &ContentQuery,
    ) -> ApiResult<Vec<Blog>> {
        required_id(category_id, "Category ID")?;
        let mut params = QueryParams::new();
        params.set("category", category_id).set("published", true);
        query.apply_to(&mut params);

        let list: BlogList = self
            .get_data(&format!("/blogs{}", params.to_query_string()))
            .await?;
        Ok(list.blogs)
    }

    pub async fn search_blogs(&self, term: &str) -> ApiResult<Vec<Blog>> {
        let mut params = QueryParams::new();
        params.set("search", term.trim()).set("published", true);
        let list: BlogList = self
            .get_data(&format!("/blogs{}", params.to_query_string()))
            .await?;
        Ok(list.blogs)
    }

    // Categories

    pub async fn get_categories(&self, query: &ContentQuery) -> ApiResult<Vec<Category>> {
        let endpoint = format!("/categories{}", query.to_params().to_query_string());
        let list: CategoryList = self.get_data(&endpoint).await?;
        Ok(list.categories)
    }

    pub async fn get_category(&self, id: &str) -> ApiResult<Option<Category>> {
        let id = required_id(id, "Category ID")?;
        let detail: CategoryDetail = self.get_data(&format!("/categories/{}", id)).await?;
        Ok(detail.category)
    }

    // Contact

    /// POST the contact form; never cached
    pub async fn submit_contact(&self, submission: &ContactSubmission) -> ApiResult<Value> {
        if submission.name.trim().is_empty()
            || submission.email.trim().is_empty()
            || submission.message.trim().is_empty()
        {
            return Err(ApiError::InvalidArgument {
                message: "name, email and message are required".to_string(),
            });
        }

        let body = serde_json::to_value(submission).map_err(|e| ApiError::InvalidArgument {
            message: e.to_string(),
        })?;
        self.request("/contact", RequestOptions::post(body)).await
    }
}

fn required_id(value: &str, what: &str) -> ApiResult<String> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidArgument {
            message: format!("{} is required", what),
        });
    }
    Ok(encode_segment(value))
}
