//! Component-scoped content loading
//!
//! A [`ComponentScope`] stands for a mounted UI component. Loads started
//! through it write their outcome into a [`Resource`] only while the scope is
//! mounted; unmounting aborts everything still pending.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable, Aborted};
use spacetechs_shared::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(T),
    /// The request failed and static content was substituted
    Fallback { data: T, error: ApiError },
    Failed(ApiError),
}

impl<T> LoadState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Ready(data) | LoadState::Fallback { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            LoadState::Fallback { error, .. } | LoadState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Shared slot a component renders from
#[derive(Debug)]
pub struct Resource<T> {
    state: Rc<RefCell<LoadState<T>>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Resource<T> {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(LoadState::Idle)),
        }
    }

    pub fn with_state<R>(&self, read: impl FnOnce(&LoadState<T>) -> R) -> R {
        read(&self.state.borrow())
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    fn set(&self, state: LoadState<T>) {
        *self.state.borrow_mut() = state;
    }
}

impl<T: Clone> Resource<T> {
    pub fn state(&self) -> LoadState<T> {
        self.state.borrow().clone()
    }
}

type PendingLoads = Rc<RefCell<Vec<(u64, AbortHandle)>>>;

pub struct ComponentScope {
    name: String,
    mounted: Rc<Cell<bool>>,
    pending: PendingLoads,
    next_load: Cell<u64>,
}

impl ComponentScope {
    pub fn mount(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mounted: Rc::new(Cell::new(true)),
            pending: Rc::new(RefCell::new(Vec::new())),
            next_load: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn pending_loads(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Drive `request` into `resource`. On failure `fallback` (if any) is
    /// substituted, except for security violations which always surface.
    /// The returned future must be polled by the caller's executor.
    pub fn load<T, F>(
        &self,
        resource: &Resource<T>,
        request: F,
        fallback: Option<T>,
    ) -> impl Future<Output = ()>
    where
        F: Future<Output = ApiResult<T>>,
    {
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.next_load.get();
        self.next_load.set(id + 1);

        if self.mounted.get() {
            resource.set(LoadState::Loading);
            self.pending.borrow_mut().push((id, handle));
        } else {
            handle.abort();
        }

        let resource = resource.clone();
        let mounted = self.mounted.clone();
        let pending = self.pending.clone();
        let name = self.name.clone();

        async move {
            let outcome = Abortable::new(request, registration).await;
            pending.borrow_mut().retain(|(pending_id, _)| *pending_id != id);

            let result = match outcome {
                Ok(result) => result,
                Err(Aborted) => {
                    log::debug!("{}: load aborted on unmount", name);
                    return;
                }
            };

            if !mounted.get() {
                log::debug!("{}: ignoring load result after unmount", name);
                return;
            }

            let state = match (result, fallback) {
                (Ok(data), _) => LoadState::Ready(data),
                (Err(error), _) if error.is_security_violation() => {
                    log::error!("{}: {}", name, error);
                    LoadState::Failed(error)
                }
                (Err(error), Some(data)) => {
                    log::warn!("{}: {}; showing fallback content", name, error);
                    LoadState::Fallback { data, error }
                }
                (Err(error), None) => {
                    log::warn!("{}: {}", name, error);
                    LoadState::Failed(error)
                }
            };
            resource.set(state);
        }
    }

    /// Stop accepting results and abort pending loads; idempotent
    pub fn unmount(&self) {
        if !self.mounted.replace(false) {
            return;
        }
        let pending: Vec<(u64, AbortHandle)> = self.pending.borrow_mut().drain(..).collect();
        if !pending.is_empty() {
            log::debug!("{}: aborting {} pending loads", self.name, pending.len());
        }
        for (_, handle) in pending {
            handle.abort();
        }
    }
}

impl Drop for ComponentScope {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Retry rule for data loads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// 4xx, bad arguments and security violations are final
    pub fn should_retry(&self, retries_so_far: u32, error: &ApiError) -> bool {
        let permanent = error.is_client_error()
            || error.is_security_violation()
            || matches!(error, ApiError::InvalidArgument { .. });
        !permanent && retries_so_far < self.max_retries
    }

    /// `min(base * 2^retry, max)`
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Run `operation` until it succeeds or `policy` gives up, awaiting
/// `sleep(delay)` between attempts
pub async fn with_retry<T, Op, Fut, Sleep, SleepFut>(
    policy: &RetryPolicy,
    mut operation: Op,
    mut sleep: Sleep,
) -> ApiResult<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
    Sleep: FnMut(Duration) -> SleepFut,
    SleepFut: Future<Output = ()>,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if policy.should_retry(retries, &error) => {
                let delay = policy.delay(retries);
                log::warn!("{}; retrying in {:?}", error, delay);
                sleep(delay).await;
                retries += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::channel::oneshot;
    use futures::FutureExt;
    use spacetechs_config::ApiConfig;
    use spacetechs_shared::Project;

    use crate::cache::ManualClock;
    use crate::client::ApiClient;
    use crate::transport::{HttpTransport, TransportRequest, TransportResponse};

    /// A backend that accepts requests and never answers
    #[derive(Default)]
    struct StalledTransport {
        calls: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl HttpTransport for StalledTransport {
        async fn execute(&self, _request: TransportRequest) -> ApiResult<TransportResponse> {
            self.calls.set(self.calls.get() + 1);
            futures::future::pending().await
        }
    }

    fn network_error() -> ApiError {
        ApiError::NetworkError {
            message: "offline".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ready_while_mounted() {
        let scope = ComponentScope::mount("FeaturedSection");
        let resource = Resource::new();

        scope.load(&resource, async { Ok(vec![1, 2, 3]) }, None).await;
        assert_eq!(resource.state(), LoadState::Ready(vec![1, 2, 3]));
        assert_eq!(scope.pending_loads(), 0);
    }

    #[tokio::test]
    async fn test_fallback_on_failure() {
        let scope = ComponentScope::mount("FeaturedSection");
        let resource = Resource::new();

        scope
            .load(&resource, async { Err(network_error()) }, Some(vec!["mock"]))
            .await;

        resource.with_state(|state| {
            assert_eq!(state.data(), Some(&vec!["mock"]));
            assert_eq!(state.error(), Some(&network_error()));
        });
    }

    #[tokio::test]
    async fn test_security_violation_is_not_masked() {
        let scope = ComponentScope::mount("ProjectDetail");
        let resource = Resource::new();
        let violation = ApiError::invalid_endpoint("//evil", "protocol-relative URLs not allowed");

        let failing = violation.clone();
        scope
            .load(&resource, async move { Err::<u8, _>(failing) }, Some(0))
            .await;
        assert_eq!(resource.state(), LoadState::Failed(violation));
    }

    #[tokio::test]
    async fn test_unmount_aborts_pending_load() {
        let scope = ComponentScope::mount("ProjectDetail");
        let resource: Resource<String> = Resource::new();
        let (sender, receiver) = oneshot::channel::<ApiResult<String>>();

        let request = receiver.map(|r| r.unwrap_or_else(|_| Err(network_error())));
        let mut load = Box::pin(scope.load(&resource, request, None));

        assert!(futures::poll!(load.as_mut()).is_pending());
        assert!(resource.is_loading());
        assert_eq!(scope.pending_loads(), 1);

        scope.unmount();
        assert_eq!(scope.pending_loads(), 0);

        // Late resolution is ignored
        let _ = sender.send(Ok("ai-dashboard".to_string()));
        load.await;
        assert!(resource.is_loading());
    }

    #[tokio::test]
    async fn test_unmount_aborts_in_flight_project_request() {
        let transport = Rc::new(StalledTransport::default());
        let config = ApiConfig::new("https://backend.spacetechs.net/api").unwrap();
        let clock = Rc::new(ManualClock::new(0));
        let client = ApiClient::with_transport(config, transport.clone(), clock);

        let scope = ComponentScope::mount("ProjectDetail");
        let resource: Resource<Option<Project>> = Resource::new();
        let mut load = Box::pin(scope.load(&resource, client.get_project("ai-dashboard"), None));

        assert!(futures::poll!(load.as_mut()).is_pending());
        assert_eq!(transport.calls.get(), 1);
        assert!(resource.is_loading());
        assert_eq!(scope.pending_loads(), 1);

        scope.unmount();
        assert_eq!(scope.pending_loads(), 0);

        // The stalled request is dropped instead of awaited forever
        load.await;
        assert!(resource.is_loading());
        assert_eq!(client.cache_stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_load_after_unmount_is_noop() {
        let scope = ComponentScope::mount("BlogList");
        scope.unmount();

        let resource = Resource::new();
        scope.load(&resource, async { Ok(1) }, None).await;
        assert_eq!(resource.state(), LoadState::Idle);
    }

    #[test]
    fn test_retry_policy() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0, &network_error()));
        assert!(policy.should_retry(2, &network_error()));
        assert!(!policy.should_retry(3, &network_error()));

        let not_found = ApiError::HttpError {
            status: 404,
            body: String::new(),
        };
        assert!(!policy.should_retry(0, &not_found));

        let unavailable = ApiError::HttpError {
            status: 503,
            body: String::new(),
        };
        assert!(policy.should_retry(0, &unavailable));

        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(5), Duration::from_secs(30));
        assert_eq!(policy.delay(40), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_three_retries() {
        let attempts = Cell::new(0);
        let delays = RefCell::new(Vec::new());

        let result: ApiResult<()> = with_retry(
            &RetryPolicy::default(),
            || {
                attempts.set(attempts.get() + 1);
                async { Err(network_error()) }
            },
            |delay| {
                delays.borrow_mut().push(delay);
                async {}
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.get(), 4);
        assert_eq!(
            *delays.borrow(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test]
    async fn test_with_retry_recovers() {
        let attempts = Cell::new(0);
        let result = with_retry(
            &RetryPolicy::default(),
            || {
                attempts.set(attempts.get() + 1);
                let n = attempts.get();
                async move {
                    if n < 2 {
                        Err(network_error())
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| async {},
        )
        .await;

        assert_eq!(result, Ok(2));
    }
}
