//! Content data layer for the SpaceTechs site
//! Endpoint validation, the bounded request cache, the content-API client
//! and component-scoped loading with static fallbacks

pub mod cache;
pub mod client;
pub mod endpoint;
pub mod fallback;
pub mod loader;
pub mod query;
pub mod transport;

pub use cache::{
    cache_key, CacheStats, CachedResponse, Clock, ManualClock, RequestCache, SystemClock,
};
pub use client::{ApiClient, RequestOptions};
pub use loader::{with_retry, ComponentScope, LoadState, Resource, RetryPolicy};
pub use query::{ContentQuery, QueryParams};
pub use transport::{HttpTransport, Method, ReqwestTransport, TransportRequest, TransportResponse};

pub use spacetechs_shared::{ApiError, ApiResult};
