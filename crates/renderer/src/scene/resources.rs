//! GPU resource accounting for scene objects
//!
//! Scene objects never talk to a rendering API directly. Every geometry,
//! material, texture or buffer is allocated through a [`GpuBackend`] via a
//! per-object [`ResourceScope`], and released when the scope is disposed.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::Serialize;
use spacetechs_shared::SceneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
    Buffer,
}

/// Opaque handle to one backend allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub id: u64,
    pub kind: ResourceKind,
    pub label: String,
    pub bytes: u64,
}

/// Rendering backend seen by the scene graph
pub trait GpuBackend {
    fn allocate(&self, kind: ResourceKind, label: &str, bytes: u64) -> Result<ResourceHandle, SceneError>;

    /// Decode and upload an image; fails when the image cannot be loaded
    fn load_texture(&self, path: &str) -> Result<ResourceHandle, SceneError>;

    fn release(&self, handle: &ResourceHandle);
}

/// Snapshot of live allocations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLedger {
    pub live: usize,
    pub live_bytes: u64,
    pub by_kind: HashMap<ResourceKind, usize>,
    pub total_allocations: u64,
    pub total_releases: u64,
}

/// Backend that records allocations without drawing anything
///
/// Used for native builds and as the bookkeeping half of the browser bridge.
/// Textures listed with [`TrackingBackend::fail_texture`] and allocations past
/// the optional byte budget fail, which exercises the error paths.
#[derive(Debug, Default)]
pub struct TrackingBackend {
    next_id: Cell<u64>,
    live: RefCell<HashMap<u64, ResourceHandle>>,
    total_allocations: Cell<u64>,
    total_releases: Cell<u64>,
    failing_textures: RefCell<HashSet<String>>,
    byte_budget: Option<u64>,
}

impl TrackingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_byte_budget(budget: u64) -> Self {
        Self {
            byte_budget: Some(budget),
            ..Self::default()
        }
    }

    pub fn fail_texture(&self, path: impl Into<String>) {
        self.failing_textures.borrow_mut().insert(path.into());
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn live_bytes(&self) -> u64 {
        self.live.borrow().values().map(|h| h.bytes).sum()
    }

    pub fn ledger(&self) -> ResourceLedger {
        let live = self.live.borrow();
        let mut by_kind = HashMap::new();
        for handle in live.values() {
            *by_kind.entry(handle.kind).or_insert(0) += 1;
        }

        ResourceLedger {
            live: live.len(),
            live_bytes: live.values().map(|h| h.bytes).sum(),
            by_kind,
            total_allocations: self.total_allocations.get(),
            total_releases: self.total_releases.get(),
        }
    }

    fn record(&self, kind: ResourceKind, label: &str, bytes: u64) -> ResourceHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let handle = ResourceHandle {
            id,
            kind,
            label: label.to_string(),
            bytes,
        };
        self.live.borrow_mut().insert(id, handle.clone());
        self.total_allocations.set(self.total_allocations.get() + 1);
        handle
    }
}

/// Bytes reserved for a decoded texture of unknown size (1024x1024 RGBA)
const DEFAULT_TEXTURE_BYTES: u64 = 1024 * 1024 * 4;

impl GpuBackend for TrackingBackend {
    fn allocate(&self, kind: ResourceKind, label: &str, bytes: u64) -> Result<ResourceHandle, SceneError> {
        if let Some(budget) = self.byte_budget {
            if self.live_bytes() + bytes > budget {
                return Err(SceneError::ResourceAllocation {
                    label: label.to_string(),
                    message: format!("{} bytes exceeds the {} byte budget", bytes, budget),
                });
            }
        }
        Ok(self.record(kind, label, bytes))
    }

    fn load_texture(&self, path: &str) -> Result<ResourceHandle, SceneError> {
        if self.failing_textures.borrow().contains(path) {
            return Err(SceneError::TextureLoad {
                path: path.to_string(),
                message: "image could not be decoded".to_string(),
            });
        }
        self.allocate(ResourceKind::Texture, path, DEFAULT_TEXTURE_BYTES)
    }

    fn release(&self, handle: &ResourceHandle) {
        if self.live.borrow_mut().remove(&handle.id).is_some() {
            self.total_releases.set(self.total_releases.get() + 1);
        } else {
            log::warn!("Release of unknown resource {} ({})", handle.id, handle.label);
        }
    }
}

/// Allocations owned by one scene object
pub struct ResourceScope {
    backend: Rc<dyn GpuBackend>,
    handles: Vec<ResourceHandle>,
}

impl ResourceScope {
    pub fn new(backend: Rc<dyn GpuBackend>) -> Self {
        Self {
            backend,
            handles: Vec::new(),
        }
    }

    pub fn allocate(&mut self, kind: ResourceKind, label: &str, bytes: u64) -> Result<ResourceHandle, SceneError> {
        let handle = self.backend.allocate(kind, label, bytes)?;
        self.handles.push(handle.clone());
        Ok(handle)
    }

    pub fn load_texture(&mut self, path: &str) -> Result<ResourceHandle, SceneError> {
        let handle = self.backend.load_texture(path)?;
        self.handles.push(handle.clone());
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn bytes(&self) -> u64 {
        self.handles.iter().map(|h| h.bytes).sum()
    }

    /// Release everything in reverse allocation order; safe to call repeatedly
    pub fn dispose(&mut self) {
        while let Some(handle) = self.handles.pop() {
            self.backend.release(&handle);
        }
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_dispose_releases_everything_once() {
        let backend = Rc::new(TrackingBackend::new());
        let mut scope = ResourceScope::new(backend.clone());

        scope.allocate(ResourceKind::Geometry, "sphere", 1024).unwrap();
        scope.allocate(ResourceKind::Material, "planet", 64).unwrap();
        assert_eq!(backend.live_count(), 2);
        assert_eq!(scope.bytes(), 1088);

        scope.dispose();
        scope.dispose();
        assert_eq!(backend.live_count(), 0);
        assert_eq!(backend.ledger().total_releases, 2);
    }

    #[test]
    fn test_scope_drop_releases() {
        let backend = Rc::new(TrackingBackend::new());
        {
            let mut scope = ResourceScope::new(backend.clone());
            scope.allocate(ResourceKind::Buffer, "particles", 12_000).unwrap();
        }
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_failing_texture_and_budget() {
        let backend = TrackingBackend::with_byte_budget(100);
        backend.fail_texture("/textures/broken.jpg");

        assert!(matches!(
            backend.load_texture("/textures/broken.jpg"),
            Err(SceneError::TextureLoad { .. })
        ));
        assert!(matches!(
            backend.allocate(ResourceKind::Buffer, "huge", 101),
            Err(SceneError::ResourceAllocation { .. })
        ));
        assert!(backend.allocate(ResourceKind::Buffer, "small", 100).is_ok());
    }

    #[test]
    fn test_ledger_counts_by_kind() {
        let backend = TrackingBackend::new();
        backend.allocate(ResourceKind::Geometry, "a", 10).unwrap();
        backend.allocate(ResourceKind::Geometry, "b", 10).unwrap();
        backend.allocate(ResourceKind::Texture, "c", 10).unwrap();

        let ledger = backend.ledger();
        assert_eq!(ledger.live, 3);
        assert_eq!(ledger.live_bytes, 30);
        assert_eq!(ledger.by_kind.get(&ResourceKind::Geometry), Some(&2));
    }
}
