//! Adaptive scene graph
//!
//! Objects are built once per settings snapshot under their own
//! [`ResourceScope`] and rebuilt only when the material signature of the
//! optimal settings changes. Per-frame work goes through [`SceneObject::on_frame`]
//! with a borrowed [`FrameContext`], which never allocates.

pub mod factory;
pub mod objects;
pub mod resources;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use spacetechs_config::{AnimationConfig, GeometryConfig, PerformanceThresholds};
use spacetechs_shared::{OptimalSettings, SceneError};

use crate::store::{
    derive_settings, PerformanceStore, Subscription, DEGRADED_FRAME_INTERVAL_SECS,
    NORMAL_FRAME_INTERVAL_SECS,
};

pub use factory::{ComponentSpec, SceneFactory};
pub use objects::{FallbackNode, ParticleField, Planet, StarField, TextureSource};
pub use resources::{GpuBackend, ResourceHandle, ResourceKind, ResourceLedger, ResourceScope, TrackingBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentTag {
    Planet,
    Particles,
    StarField,
}

impl ComponentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentTag::Planet => "planet",
            ComponentTag::Particles => "particles",
            ComponentTag::StarField => "starfield",
        }
    }
}

impl fmt::Display for ComponentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentTag {
    type Err = SceneError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "planet" => Ok(ComponentTag::Planet),
            "particles" => Ok(ComponentTag::Particles),
            "starfield" => Ok(ComponentTag::StarField),
            other => Err(SceneError::UnknownComponent {
                tag: other.to_string(),
            }),
        }
    }
}

/// Inputs for building an object's resources
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub settings: OptimalSettings,
    pub geometry: GeometryConfig,
    pub animation: AnimationConfig,
}

impl BuildContext {
    pub fn new(settings: OptimalSettings) -> Self {
        Self {
            settings,
            geometry: GeometryConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

/// Per-frame inputs; cheap to build every frame
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub elapsed_secs: f64,
    pub is_degraded_mode: bool,
    pub animations_enabled: bool,
    pub hovered_object_id: Option<&'a str>,
}

impl FrameContext<'_> {
    pub fn update_interval(&self) -> f64 {
        if self.is_degraded_mode {
            DEGRADED_FRAME_INTERVAL_SECS
        } else {
            NORMAL_FRAME_INTERVAL_SECS
        }
    }
}

/// Skips updates until `interval` has passed since the last accepted one
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameThrottle {
    last: Option<f64>,
}

impl FrameThrottle {
    pub fn ready(&mut self, elapsed_secs: f64, interval_secs: f64) -> bool {
        match self.last {
            Some(last) if elapsed_secs - last < interval_secs => false,
            _ => {
                self.last = Some(elapsed_secs);
                true
            }
        }
    }
}

pub trait SceneObject {
    fn id(&self) -> &str;

    fn tag(&self) -> ComponentTag;

    /// Allocate every GPU resource through `scope`
    fn build(&mut self, ctx: &BuildContext, scope: &mut ResourceScope) -> Result<(), SceneError>;

    fn on_frame(&mut self, ctx: &FrameContext);

    fn is_fallback(&self) -> bool {
        false
    }
}

struct SceneNode {
    object: Box<dyn SceneObject>,
    scope: ResourceScope,
}

/// Owns scene objects together with their resources
pub struct SceneGraph {
    backend: Rc<dyn GpuBackend>,
    context: BuildContext,
    nodes: Vec<SceneNode>,
    rebuilds: u64,
}

impl SceneGraph {
    pub fn new(backend: Rc<dyn GpuBackend>, settings: OptimalSettings) -> Self {
        Self {
            backend,
            context: BuildContext::new(settings),
            nodes: Vec::new(),
            rebuilds: 0,
        }
    }

    pub fn settings(&self) -> &OptimalSettings {
        &self.context.settings
    }

    /// Build and insert `object`, returning its id. A failed build is contained:
    /// partial resources are released and a [`FallbackNode`] takes its place.
    pub fn add(&mut self, object: Box<dyn SceneObject>) -> String {
        let id = object.id().to_string();
        let node = self.build_node(object);
        self.nodes.push(node);
        id
    }

    /// Remove and dispose an object; false if `id` is unknown
    pub fn remove(&mut self, id: &str) -> bool {
        match self.nodes.iter().position(|n| n.object.id() == id) {
            Some(index) => {
                let mut node = self.nodes.remove(index);
                node.scope.dispose();
                log::debug!("Removed scene object {}", id);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&dyn SceneObject> {
        self.nodes
            .iter()
            .find(|n| n.object.id() == id)
            .map(|n| n.object.as_ref())
    }

    pub fn ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.object.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn fallback_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.object.is_fallback()).count()
    }

    /// Number of full rebuilds triggered by settings changes
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Adopt new settings; objects are rebuilt only when the material
    /// signature changed. Returns whether a rebuild happened.
    pub fn apply_settings(&mut self, settings: OptimalSettings) -> bool {
        let changed = settings.material_signature() != self.context.settings.material_signature();
        self.context.settings = settings;
        if !changed {
            return false;
        }

        log::info!(
            "Rebuilding {} scene objects for {:?} detail / {} particles",
            self.nodes.len(),
            self.context.settings.geometry_detail,
            self.context.settings.particle_count
        );

        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_iter()
            .map(|mut node| {
                node.scope.dispose();
                self.build_node(node.object)
            })
            .collect();
        self.rebuilds += 1;
        true
    }

    pub fn frame(&mut self, ctx: &FrameContext) {
        for node in &mut self.nodes {
            node.object.on_frame(ctx);
        }
    }

    /// Dispose every object
    pub fn clear(&mut self) {
        for mut node in self.nodes.drain(..) {
            node.scope.dispose();
        }
    }

    fn build_node(&self, mut object: Box<dyn SceneObject>) -> SceneNode {
        let mut scope = ResourceScope::new(self.backend.clone());
        match object.build(&self.context, &mut scope) {
            Ok(()) => SceneNode { object, scope },
            Err(err) => {
                log::warn!("Scene object {} failed to build: {}", object.id(), err);
                scope.dispose();
                SceneNode {
                    object: Box::new(FallbackNode::new(object.id(), object.tag())),
                    scope,
                }
            }
        }
    }
}

impl Drop for SceneGraph {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Keep `graph` in sync with `store`; dropping the subscription detaches it
pub fn follow_store(graph: Rc<RefCell<SceneGraph>>, store: &PerformanceStore) -> Subscription {
    let thresholds: PerformanceThresholds = *store.thresholds();
    store.subscribe(move |state| {
        let settings = derive_settings(&thresholds, state);
        match graph.try_borrow_mut() {
            Ok(mut graph) => {
                graph.apply_settings(settings);
            }
            Err(_) => log::debug!("Scene graph busy; settings applied on next change"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacetechs_shared::{PerformanceState, QualityTier};

    fn settings_for(state: PerformanceState) -> OptimalSettings {
        derive_settings(&PerformanceThresholds::default(), &state)
    }

    fn medium() -> OptimalSettings {
        settings_for(PerformanceState::default())
    }

    /// Always fails after allocating a geometry
    struct Broken;

    impl SceneObject for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        fn tag(&self) -> ComponentTag {
            ComponentTag::Planet
        }

        fn build(&mut self, _ctx: &BuildContext, scope: &mut ResourceScope) -> Result<(), SceneError> {
            scope.allocate(ResourceKind::Geometry, "broken:sphere", 128)?;
            Err(SceneError::ResourceAllocation {
                label: "broken:material".to_string(),
                message: "shader compile failed".to_string(),
            })
        }

        fn on_frame(&mut self, _ctx: &FrameContext) {}
    }

    #[test]
    fn test_throttle() {
        let mut throttle = FrameThrottle::default();
        assert!(throttle.ready(1.0, 0.2));
        assert!(!throttle.ready(1.1, 0.2));
        assert!(throttle.ready(1.2, 0.2));
        assert!(!throttle.ready(1.3, 0.2));
    }

    #[test]
    fn test_component_tag_parse() {
        assert_eq!("starfield".parse::<ComponentTag>().unwrap(), ComponentTag::StarField);
        assert!(matches!(
            "nebula".parse::<ComponentTag>(),
            Err(SceneError::UnknownComponent { .. })
        ));
    }

    #[test]
    fn test_remove_releases_all_resources() {
        let backend = Rc::new(TrackingBackend::new());
        let mut graph = SceneGraph::new(backend.clone(), medium());

        graph.add(Box::new(Planet::new("a", [0.0; 3]).with_texture("/textures/a.jpg")));
        graph.add(Box::new(ParticleField::new("particles")));
        graph.add(Box::new(StarField::new("stars")));
        assert!(backend.live_count() > 0);

        assert!(graph.remove("a"));
        assert!(!graph.remove("a"));
        assert!(graph.remove("particles"));
        assert!(graph.remove("stars"));

        assert_eq!(backend.live_count(), 0);
        let ledger = backend.ledger();
        assert_eq!(ledger.total_allocations, ledger.total_releases);
    }

    #[test]
    fn test_drop_releases_all_resources() {
        let backend = Rc::new(TrackingBackend::new());
        {
            let mut graph = SceneGraph::new(backend.clone(), medium());
            graph.add(Box::new(Planet::new("a", [0.0; 3])));
            graph.add(Box::new(StarField::new("stars")));
        }
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_build_failure_substitutes_fallback() {
        let backend = Rc::new(TrackingBackend::new());
        let mut graph = SceneGraph::new(backend.clone(), medium());

        let id = graph.add(Box::new(Broken));
        assert_eq!(id, "broken");
        assert_eq!(graph.fallback_count(), 1);
        assert_eq!(backend.live_count(), 0);
        assert!(graph.get("broken").is_some_and(|o| o.is_fallback()));
    }

    #[test]
    fn test_allocation_budget_is_contained() {
        let backend = Rc::new(TrackingBackend::with_byte_budget(1024));
        let mut graph = SceneGraph::new(backend.clone(), medium());

        graph.add(Box::new(StarField::new("stars")));
        assert_eq!(graph.fallback_count(), 1);
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_rebuild_only_on_material_change() {
        let backend = Rc::new(TrackingBackend::new());
        let mut graph = SceneGraph::new(backend.clone(), medium());
        graph.add(Box::new(Planet::new("a", [0.0; 3])));
        let allocations = backend.ledger().total_allocations;

        // Same tier, different animation flag: no rebuild
        let reduced_motion_off = medium();
        assert!(!graph.apply_settings(reduced_motion_off));
        assert_eq!(backend.ledger().total_allocations, allocations);

        let high = settings_for(PerformanceState {
            tier: QualityTier::High,
            ..PerformanceState::default()
        });
        assert!(graph.apply_settings(high));
        assert_eq!(graph.rebuild_count(), 1);
        assert_eq!(backend.live_count(), 2);
        assert!(backend.ledger().total_allocations > allocations);
    }

    #[test]
    fn test_graph_follows_store() {
        let backend = Rc::new(TrackingBackend::new());
        let store = PerformanceStore::default();
        let graph = Rc::new(RefCell::new(SceneGraph::new(
            backend.clone(),
            store.get_optimal_settings(),
        )));
        graph.borrow_mut().add(Box::new(ParticleField::new("particles")));

        let _subscription = follow_store(graph.clone(), &store);
        store.set_fps(58.0);
        assert_eq!(graph.borrow().settings().particle_count, 1500);
        assert_eq!(graph.borrow().rebuild_count(), 1);

        store.set_fps(10.0);
        let graph = graph.borrow();
        assert_eq!(graph.settings().particle_count, 500);
        assert!(graph.settings().animations_enabled);
        assert_eq!(graph.settings().frame_interval_secs, DEGRADED_FRAME_INTERVAL_SECS);
        assert_eq!(backend.live_count(), 2);
    }

    #[test]
    fn test_frame_drives_objects() {
        let backend = Rc::new(TrackingBackend::new());
        let mut graph = SceneGraph::new(backend, medium());
        graph.add(Box::new(Planet::new("a", [0.0; 3])));

        graph.frame(&FrameContext {
            elapsed_secs: 0.0,
            is_degraded_mode: false,
            animations_enabled: true,
            hovered_object_id: None,
        });
        assert_eq!(graph.len(), 1);
    }
}
