//! Decorative scene objects: planets, particle fields and star fields

use spacetechs_config::{MaterialKind, MaterialPreset};
use spacetechs_shared::{QualityTier, SceneError};

use super::resources::{ResourceKind, ResourceScope};
use super::{BuildContext, ComponentTag, FrameContext, FrameThrottle, SceneObject};

/// Hard cap on particles regardless of tier
pub const MAX_PARTICLES: u32 = 3000;

/// Star count at High quality
pub const BASE_STAR_COUNT: u32 = 5000;

/// Bytes per vertex: position, normal and uv as f32
const VERTEX_STRIDE: u64 = 8 * 4;

/// Material uniform block size
const MATERIAL_BYTES: u64 = 256;

/// Procedural fallback texture (64x64 RGBA)
const FALLBACK_TEXTURE_BYTES: u64 = 64 * 64 * 4;

const GOLDEN_ANGLE: f32 = 2.399_963;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    None,
    Loaded,
    Fallback,
}

/// A textured, slowly rotating sphere representing one project
#[derive(Debug, Clone)]
pub struct Planet {
    id: String,
    texture_path: Option<String>,
    position: [f32; 3],
    rotation: [f32; 2],
    scale: f32,
    rotation_step: [f32; 2],
    hover_scale: f32,
    vertex_count: u32,
    texture: TextureSource,
    throttle: FrameThrottle,
}

impl Planet {
    pub fn new(id: impl Into<String>, position: [f32; 3]) -> Self {
        Self {
            id: id.into(),
            texture_path: None,
            position,
            rotation: [0.0, 0.0],
            scale: 1.0,
            rotation_step: [0.0, 0.0],
            hover_scale: 1.0,
            vertex_count: 0,
            texture: TextureSource::None,
            throttle: FrameThrottle::default(),
        }
    }

    pub fn with_texture(mut self, path: impl Into<String>) -> Self {
        self.texture_path = Some(path.into());
        self
    }

    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    pub fn rotation(&self) -> [f32; 2] {
        self.rotation
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn texture_source(&self) -> TextureSource {
        self.texture
    }
}

impl SceneObject for Planet {
    fn id(&self) -> &str {
        &self.id
    }

    fn tag(&self) -> ComponentTag {
        ComponentTag::Planet
    }

    fn build(&mut self, ctx: &BuildContext, scope: &mut ResourceScope) -> Result<(), SceneError> {
        let detail = ctx.settings.geometry_detail;
        self.vertex_count = ctx.geometry.sphere_vertex_count(detail);
        scope.allocate(
            ResourceKind::Geometry,
            &format!("{}:sphere", self.id),
            self.vertex_count as u64 * VERTEX_STRIDE,
        )?;

        let material = MaterialPreset::for_kind(MaterialKind::Planet);
        scope.allocate(
            ResourceKind::Material,
            &format!("{}:{:?}", self.id, material.kind),
            MATERIAL_BYTES,
        )?;

        self.texture = match &self.texture_path {
            None => TextureSource::None,
            Some(path) => match scope.load_texture(path) {
                Ok(_) => TextureSource::Loaded,
                Err(err) => {
                    log::warn!("{}; using fallback texture for {}", err, self.id);
                    scope.allocate(
                        ResourceKind::Texture,
                        &format!("{}:fallback-texture", self.id),
                        FALLBACK_TEXTURE_BYTES,
                    )?;
                    TextureSource::Fallback
                }
            },
        };

        self.rotation_step = [ctx.animation.planet_rotation_x, ctx.animation.planet_rotation_y];
        self.hover_scale = ctx.animation.hover_scale;
        Ok(())
    }

    fn on_frame(&mut self, ctx: &FrameContext) {
        if !ctx.animations_enabled || !self.throttle.ready(ctx.elapsed_secs, ctx.update_interval()) {
            return;
        }

        self.rotation[0] += self.rotation_step[0];
        self.rotation[1] += self.rotation_step[1];

        let target = if ctx.hovered_object_id == Some(self.id.as_str()) {
            self.hover_scale
        } else {
            1.0
        };
        self.scale += (target - self.scale) * 0.1;
    }
}

/// Floating particles drifting around the scene
#[derive(Debug, Clone)]
pub struct ParticleField {
    id: String,
    positions: Vec<[f32; 3]>,
    drift: f32,
    angle: f32,
    throttle: FrameThrottle,
}

impl ParticleField {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            positions: Vec::new(),
            drift: 0.0,
            angle: 0.0,
            throttle: FrameThrottle::default(),
        }
    }

    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }
}

impl SceneObject for ParticleField {
    fn id(&self) -> &str {
        &self.id
    }

    fn tag(&self) -> ComponentTag {
        ComponentTag::Particles
    }

    fn build(&mut self, ctx: &BuildContext, scope: &mut ResourceScope) -> Result<(), SceneError> {
        let count = ctx.settings.particle_count.min(MAX_PARTICLES);
        self.positions = spiral_positions(count, 10.0);

        scope.allocate(
            ResourceKind::Buffer,
            &format!("{}:positions", self.id),
            count as u64 * 3 * 4,
        )?;
        scope.allocate(ResourceKind::Material, &format!("{}:points", self.id), MATERIAL_BYTES)?;

        self.drift = ctx.animation.particle_drift;
        Ok(())
    }

    fn on_frame(&mut self, ctx: &FrameContext) {
        if !ctx.animations_enabled || !self.throttle.ready(ctx.elapsed_secs, ctx.update_interval()) {
            return;
        }
        self.angle += self.drift;
    }
}

/// Background star sphere scaled to the active tier
#[derive(Debug, Clone)]
pub struct StarField {
    id: String,
    star_count: u32,
    drift: f32,
    angle: f32,
    throttle: FrameThrottle,
}

impl StarField {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            star_count: 0,
            drift: 0.0,
            angle: 0.0,
            throttle: FrameThrottle::default(),
        }
    }

    pub fn star_count(&self) -> u32 {
        self.star_count
    }

    /// Stars for a particle budget, relative to the High preset
    pub fn stars_for(particle_count: u32) -> u32 {
        let full = QualityTier::High.preset().particle_count as u64;
        (BASE_STAR_COUNT as u64 * particle_count.min(full as u32) as u64 / full) as u32
    }
}

impl SceneObject for StarField {
    fn id(&self) -> &str {
        &self.id
    }

    fn tag(&self) -> ComponentTag {
        ComponentTag::StarField
    }

    fn build(&mut self, ctx: &BuildContext, scope: &mut ResourceScope) -> Result<(), SceneError> {
        self.star_count = Self::stars_for(ctx.settings.particle_count);

        // position + color per star
        scope.allocate(
            ResourceKind::Buffer,
            &format!("{}:stars", self.id),
            self.star_count as u64 * 6 * 4,
        )?;
        scope.allocate(ResourceKind::Material, &format!("{}:points", self.id), MATERIAL_BYTES)?;

        self.drift = ctx.animation.star_drift;
        Ok(())
    }

    fn on_frame(&mut self, ctx: &FrameContext) {
        if !ctx.animations_enabled || !self.throttle.ready(ctx.elapsed_secs, ctx.update_interval()) {
            return;
        }
        self.angle += self.drift;
    }
}

/// Neutral stand-in rendered when a component cannot be built
#[derive(Debug, Clone)]
pub struct FallbackNode {
    id: String,
    replaces: ComponentTag,
}

impl FallbackNode {
    pub fn new(id: impl Into<String>, replaces: ComponentTag) -> Self {
        Self {
            id: id.into(),
            replaces,
        }
    }

    pub fn replaces(&self) -> ComponentTag {
        self.replaces
    }
}

impl SceneObject for FallbackNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn tag(&self) -> ComponentTag {
        self.replaces
    }

    fn build(&mut self, _ctx: &BuildContext, _scope: &mut ResourceScope) -> Result<(), SceneError> {
        Ok(())
    }

    fn on_frame(&mut self, _ctx: &FrameContext) {}

    fn is_fallback(&self) -> bool {
        true
    }
}

/// Points on a flattened golden-angle spiral within `radius`
fn spiral_positions(count: u32, radius: f32) -> Vec<[f32; 3]> {
    (0..count)
        .map(|i| {
            let t = (i as f32 + 0.5) / count as f32;
            let r = radius * t.sqrt();
            let theta = i as f32 * GOLDEN_ANGLE;
            let y = ((i % 7) as f32 - 3.0) * 0.25;
            [r * theta.cos(), y, r * theta.sin()]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::scene::resources::TrackingBackend;
    use crate::store::{derive_settings, DEGRADED_FRAME_INTERVAL_SECS};
    use spacetechs_config::PerformanceThresholds;
    use spacetechs_shared::{GeometryDetail, OptimalSettings, PerformanceState};

    fn settings(tier: QualityTier, is_mobile: bool) -> OptimalSettings {
        let state = PerformanceState {
            tier,
            is_mobile,
            ..PerformanceState::default()
        };
        derive_settings(&PerformanceThresholds::default(), &state)
    }

    fn frame(elapsed_secs: f64) -> FrameContext<'static> {
        FrameContext {
            elapsed_secs,
            is_degraded_mode: false,
            animations_enabled: true,
            hovered_object_id: None,
        }
    }

    #[test]
    fn test_planet_geometry_follows_detail() {
        let backend = Rc::new(TrackingBackend::new());
        let mut scope = ResourceScope::new(backend.clone());
        let mut planet = Planet::new("ai-dashboard", [0.0, 0.0, 0.0]);

        let ctx = BuildContext::new(settings(QualityTier::High, false));
        assert_eq!(ctx.settings.geometry_detail, GeometryDetail::High);
        planet.build(&ctx, &mut scope).unwrap();

        assert_eq!(planet.vertex_count(), 65 * 65);
        assert_eq!(scope.len(), 2);
        assert_eq!(planet.texture_source(), TextureSource::None);
    }

    #[test]
    fn test_planet_uses_fallback_texture_on_load_failure() {
        let backend = Rc::new(TrackingBackend::new());
        backend.fail_texture("/textures/mars.jpg");

        let mut scope = ResourceScope::new(backend.clone());
        let mut planet = Planet::new("mars", [0.0; 3]).with_texture("/textures/mars.jpg");
        planet
            .build(&BuildContext::new(settings(QualityTier::Medium, false)), &mut scope)
            .unwrap();

        assert_eq!(planet.texture_source(), TextureSource::Fallback);
        assert_eq!(scope.len(), 3);

        scope.dispose();
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn test_planet_rotation_is_throttled() {
        let backend = Rc::new(TrackingBackend::new());
        let mut scope = ResourceScope::new(backend);
        let mut planet = Planet::new("p", [0.0; 3]);
        planet
            .build(&BuildContext::new(settings(QualityTier::Medium, false)), &mut scope)
            .unwrap();

        planet.on_frame(&frame(0.0));
        let after_first = planet.rotation();

        // Well inside 1/60s: skipped
        planet.on_frame(&frame(0.005));
        assert_eq!(planet.rotation(), after_first);

        planet.on_frame(&frame(0.02));
        assert!(planet.rotation()[1] > after_first[1]);
    }

    #[test]
    fn test_degraded_mode_slows_updates() {
        let mut planet = Planet::new("p", [0.0; 3]);
        planet.rotation_step = [0.002, 0.005];

        let degraded = |elapsed_secs| FrameContext {
            elapsed_secs,
            is_degraded_mode: true,
            animations_enabled: true,
            hovered_object_id: None,
        };

        planet.on_frame(&degraded(0.0));
        planet.on_frame(&degraded(DEGRADED_FRAME_INTERVAL_SECS / 2.0));
        assert!((planet.rotation()[1] - 0.005).abs() < 1e-6);

        planet.on_frame(&degraded(DEGRADED_FRAME_INTERVAL_SECS));
        assert!((planet.rotation()[1] - 0.010).abs() < 1e-6);
    }

    #[test]
    fn test_hovered_planet_scales_up() {
        let mut planet = Planet::new("hovered", [0.0; 3]);
        planet.hover_scale = 1.2;

        let mut elapsed = 0.0;
        for _ in 0..60 {
            elapsed += 0.02;
            planet.on_frame(&FrameContext {
                elapsed_secs: elapsed,
                is_degraded_mode: false,
                animations_enabled: true,
                hovered_object_id: Some("hovered"),
            });
        }
        assert!(planet.scale() > 1.19);
    }

    #[test]
    fn test_particle_count_is_capped() {
        let backend = Rc::new(TrackingBackend::new());
        let mut scope = ResourceScope::new(backend);
        let mut particles = ParticleField::new("particles");

        let mut big = settings(QualityTier::High, false);
        big.particle_count = 10_000;
        particles.build(&BuildContext::new(big), &mut scope).unwrap();
        assert_eq!(particles.count(), MAX_PARTICLES as usize);

        let mut scope = ResourceScope::new(Rc::new(TrackingBackend::new()));
        particles
            .build(&BuildContext::new(settings(QualityTier::Low, true)), &mut scope)
            .unwrap();
        assert_eq!(particles.count(), 250);
    }

    #[test]
    fn test_star_count_scales_with_tier() {
        assert_eq!(StarField::stars_for(1500), 5000);
        assert_eq!(StarField::stars_for(750), 2500);
        assert_eq!(StarField::stars_for(500), 1666);
    }

    #[test]
    fn test_animations_disabled_freezes_objects() {
        let mut stars = StarField::new("stars");
        stars.drift = 0.0005;
        stars.on_frame(&FrameContext {
            elapsed_secs: 1.0,
            is_degraded_mode: false,
            animations_enabled: false,
            hovered_object_id: None,
        });
        assert_eq!(stars.angle, 0.0);
    }
}
