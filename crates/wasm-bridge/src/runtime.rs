//! Runtime wiring: detection, store, monitor and scene graph on one frame loop

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spacetechs_config::{detect_capabilities, EnvironmentProbe, PerformanceThresholds};
use spacetechs_renderer::scene::ComponentSpec;
use spacetechs_renderer::{
    follow_store, FrameContext, FrameLoop, FrameRegistration, MonitorHandle, OptimalSettings,
    PerformanceMonitor, PerformanceState, PerformanceStore, SceneError, SceneFactory, SceneGraph,
    Subscription, TrackingBackend,
};
use spacetechs_shared::DeviceCapabilities;

pub struct RuntimeCore {
    store: Rc<PerformanceStore>,
    frame_loop: FrameLoop,
    graph: Rc<RefCell<SceneGraph>>,
    backend: Rc<TrackingBackend>,
    factory: SceneFactory,
    monitor: Option<MonitorHandle>,
    scene_frame: FrameRegistration,
    _follow: Subscription,
}

impl RuntimeCore {
    /// Detect the environment once and assemble the runtime
    pub fn from_probe(probe: &dyn EnvironmentProbe, thresholds: PerformanceThresholds) -> Self {
        let capabilities = detect_capabilities(probe);
        let core = Self::new(capabilities, thresholds);
        core.store
            .set_prefers_reduced_motion(probe.prefers_reduced_motion());
        core
    }

    pub fn new(capabilities: DeviceCapabilities, thresholds: PerformanceThresholds) -> Self {
        log::info!(
            "Scene runtime starting: mobile={} memory={}GB cores={} webgl={}",
            capabilities.is_mobile,
            capabilities.memory_gb,
            capabilities.cpu_cores,
            capabilities.has_webgl
        );

        let store = Rc::new(PerformanceStore::new(thresholds));
        store.set_device_capabilities(capabilities.clone());

        let backend = Rc::new(TrackingBackend::new());
        let graph = Rc::new(RefCell::new(SceneGraph::new(
            backend.clone(),
            store.get_optimal_settings(),
        )));
        let follow = follow_store(graph.clone(), &store);

        let frame_loop = FrameLoop::new();
        let monitor = Some(PerformanceMonitor::start(&frame_loop, store.clone()));
        let scene_frame = drive_scene(&frame_loop, graph.clone(), store.clone());

        Self {
            store,
            frame_loop,
            graph,
            backend,
            factory: SceneFactory::for_capabilities(&capabilities),
            monitor,
            scene_frame,
            _follow: follow,
        }
    }

    pub fn store(&self) -> &Rc<PerformanceStore> {
        &self.store
    }

    pub fn state(&self) -> PerformanceState {
        self.store.get_state()
    }

    pub fn settings(&self) -> OptimalSettings {
        self.store.get_optimal_settings()
    }

    pub fn tick(&self, now_ms: f64) {
        self.frame_loop.tick(now_ms);
    }

    /// Add a component by tag name; returns its id
    pub fn mount(&self, tag: &str, spec: &ComponentSpec) -> Result<String, SceneError> {
        let object = self.factory.create_named(tag, spec)?;
        Ok(self.graph.borrow_mut().add(object))
    }

    pub fn unmount(&self, id: &str) -> bool {
        self.graph.borrow_mut().remove(id)
    }

    pub fn mounted_ids(&self) -> Vec<String> {
        self.graph.borrow().ids()
    }

    pub fn live_resources(&self) -> usize {
        self.backend.live_count()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.as_ref().map_or(false, |m| m.is_running())
    }

    pub fn stop_monitoring(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
    }

    pub fn restart_monitoring(&mut self) {
        if self.monitor.is_none() {
            self.monitor = Some(PerformanceMonitor::start(&self.frame_loop, self.store.clone()));
        }
    }

    pub fn frame_callbacks(&self) -> usize {
        self.frame_loop.active_registrations()
    }

    /// Dispose every scene object
    pub fn clear_scene(&self) {
        self.graph.borrow_mut().clear();
    }
}

impl Drop for RuntimeCore {
    fn drop(&mut self) {
        self.scene_frame.cancel();
        self.clear_scene();
    }
}

fn drive_scene(
    frame_loop: &FrameLoop,
    graph: Rc<RefCell<SceneGraph>>,
    store: Rc<PerformanceStore>,
) -> FrameRegistration {
    let started_at: Cell<Option<f64>> = Cell::new(None);
    frame_loop.register(move |now_ms| {
        let start = match started_at.get() {
            Some(start) => start,
            None => {
                started_at.set(Some(now_ms));
                now_ms
            }
        };
        let state = store.get_state();
        let Ok(mut graph) = graph.try_borrow_mut() else {
            return;
        };
        let animations_enabled = graph.settings().animations_enabled;
        graph.frame(&FrameContext {
            elapsed_secs: (now_ms - start) / 1000.0,
            is_degraded_mode: state.is_degraded_mode,
            animations_enabled,
            hovered_object_id: state.hovered_object_id.as_deref(),
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacetechs_config::StaticProbe;
    use spacetechs_renderer::scene::{BuildContext, ComponentTag, ResourceScope, SceneObject};
    use spacetechs_renderer::{FrameThrottle, QualityTier};

    /// Counts the animated updates it is allowed to make
    struct UpdateCounter {
        throttle: FrameThrottle,
        updates: Rc<Cell<u32>>,
    }

    impl SceneObject for UpdateCounter {
        fn id(&self) -> &str {
            "counter"
        }

        fn tag(&self) -> ComponentTag {
            ComponentTag::Planet
        }

        fn build(&mut self, _ctx: &BuildContext, _scope: &mut ResourceScope) -> Result<(), SceneError> {
            Ok(())
        }

        fn on_frame(&mut self, ctx: &FrameContext) {
            if ctx.animations_enabled && self.throttle.ready(ctx.elapsed_secs, ctx.update_interval()) {
                self.updates.set(self.updates.get() + 1);
            }
        }
    }

    fn desktop() -> RuntimeCore {
        let _ = env_logger::builder().is_test(true).try_init();
        RuntimeCore::from_probe(&StaticProbe::desktop(), PerformanceThresholds::default())
    }

    #[test]
    fn test_detection_seeds_store() {
        let runtime = desktop();
        assert_eq!(runtime.state().tier, QualityTier::High);
        assert!(runtime.is_monitoring());
        assert_eq!(runtime.frame_callbacks(), 2);
    }

    #[test]
    fn test_reduced_motion_preference_is_applied() {
        let probe = StaticProbe {
            prefers_reduced_motion: true,
            ..StaticProbe::desktop()
        };
        let runtime = RuntimeCore::from_probe(&probe, PerformanceThresholds::default());
        assert!(runtime.state().prefers_reduced_motion);
        assert!(!runtime.settings().animations_enabled);
    }

    #[test]
    fn test_mount_and_unmount_release_resources() {
        let runtime = desktop();
        let planet = runtime
            .mount("planet", &ComponentSpec::with_id("project-0"))
            .unwrap();
        let stars = runtime.mount("starfield", &ComponentSpec::default()).unwrap();
        assert!(stars.starts_with("starfield-"));
        assert!(runtime.live_resources() > 0);

        assert!(runtime.unmount(&planet));
        assert!(runtime.unmount(&stars));
        assert!(!runtime.unmount(&planet));
        assert_eq!(runtime.live_resources(), 0);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let runtime = desktop();
        let err = runtime.mount("nebula", &ComponentSpec::default()).unwrap_err();
        assert_eq!(
            err,
            SceneError::UnknownComponent {
                tag: "nebula".to_string()
            }
        );
        assert!(runtime.mounted_ids().is_empty());
    }

    #[test]
    fn test_slow_frames_degrade_runtime() {
        let runtime = desktop();
        runtime
            .mount("particles", &ComponentSpec::with_id("hero-particles"))
            .unwrap();

        let mut now = 0.0;
        for _ in 0..12 {
            now += 100.0;
            runtime.tick(now);
        }

        let state = runtime.state();
        assert!(state.is_degraded_mode);
        assert_eq!(state.tier, QualityTier::Low);
        assert_eq!(runtime.settings().particle_count, 500);
    }

    #[test]
    fn test_monitor_restart_does_not_leak_callbacks() {
        let mut runtime = desktop();
        for _ in 0..5 {
            runtime.stop_monitoring();
            assert!(!runtime.is_monitoring());
            runtime.restart_monitoring();
        }
        assert_eq!(runtime.frame_callbacks(), 2);
    }

    #[test]
    fn test_degraded_mode_keeps_animating_at_five_hertz() {
        let runtime = desktop();
        let updates = Rc::new(Cell::new(0));
        runtime.graph.borrow_mut().add(Box::new(UpdateCounter {
            throttle: FrameThrottle::default(),
            updates: updates.clone(),
        }));

        runtime.store().set_performance_mode(true);
        assert!(runtime.settings().animations_enabled);

        // ~60 fps for five seconds
        for frame in 0..313 {
            runtime.tick(frame as f64 * 16.0);
        }

        assert!(runtime.state().is_degraded_mode);
        assert_eq!(updates.get(), 25);
    }
}
