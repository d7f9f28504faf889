//! Adaptive scene runtime
//!
//! Frame loop and FPS monitoring, the quality/performance store and the
//! adaptive scene graph. Everything here is single-threaded and shared
//! through `Rc`; the wasm bridge drives the [`FrameLoop`] from
//! `requestAnimationFrame`, tests drive it with synthetic timestamps.

pub mod monitor;
pub mod scene;
pub mod store;

pub use monitor::{
    FpsMonitor, FrameLoop, FrameRegistration, MonitorHandle, PerformanceMonitor, RenderBudget,
    RenderStats,
};
pub use scene::{
    follow_store, BuildContext, ComponentSpec, ComponentTag, FrameContext, FrameThrottle, GpuBackend,
    ResourceScope, SceneFactory, SceneGraph, SceneObject, TrackingBackend,
};
pub use store::{derive_settings, PerformanceStore, Subscription};

pub use spacetechs_shared::{OptimalSettings, PerformanceState, QualityTier, SceneError};
