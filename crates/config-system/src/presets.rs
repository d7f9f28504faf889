//! Scene presets: geometry levels of detail, material presets, animation
//! speeds and the orbit layout used for project planets

use serde::{Deserialize, Serialize};
use spacetechs_shared::GeometryDetail;

/// Sphere and plane tessellation per level of detail
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeometryConfig {
    pub sphere_radius: f32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self { sphere_radius: 0.8 }
    }
}

impl GeometryConfig {
    /// (width segments, height segments)
    pub fn sphere_segments(&self, detail: GeometryDetail) -> (u32, u32) {
        match detail {
            GeometryDetail::Low => (16, 16),
            GeometryDetail::Medium => (32, 32),
            GeometryDetail::High => (64, 64),
        }
    }

    /// Subdivisions of a unit plane
    pub fn plane_segments(&self, detail: GeometryDetail) -> (u32, u32) {
        match detail {
            GeometryDetail::Low => (8, 8),
            GeometryDetail::Medium => (16, 16),
            GeometryDetail::High => (32, 32),
        }
    }

    /// Vertex count of a UV sphere at `detail`
    pub fn sphere_vertex_count(&self, detail: GeometryDetail) -> u32 {
        let (w, h) = self.sphere_segments(detail);
        (w + 1) * (h + 1)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Planet,
    Glass,
    Holographic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialPreset {
    pub kind: MaterialKind,
    pub roughness: f32,
    pub metalness: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub emissive: Option<String>,
    pub emissive_intensity: f32,
}

impl MaterialPreset {
    pub fn for_kind(kind: MaterialKind) -> Self {
        match kind {
            MaterialKind::Planet => Self {
                kind,
                roughness: 0.9,
                metalness: 0.1,
                opacity: 1.0,
                transparent: false,
                emissive: None,
                emissive_intensity: 0.0,
            },
            MaterialKind::Glass => Self {
                kind,
                roughness: 0.0,
                metalness: 0.1,
                opacity: 0.2,
                transparent: true,
                emissive: None,
                emissive_intensity: 0.0,
            },
            MaterialKind::Holographic => Self {
                kind,
                roughness: 0.5,
                metalness: 0.0,
                opacity: 0.8,
                transparent: true,
                emissive: Some("#00ffff".to_string()),
                emissive_intensity: 0.2,
            },
        }
    }
}

/// Per-update animation steps
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnimationConfig {
    pub planet_rotation_y: f32,
    pub planet_rotation_x: f32,
    pub hover_scale: f32,
    pub particle_drift: f32,
    pub star_drift: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            planet_rotation_y: 0.005,
            planet_rotation_x: 0.002,
            hover_scale: 1.2,
            particle_drift: 0.001,
            star_drift: 0.0005,
        }
    }
}

/// Orbit layout for project planets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SceneLayout {
    pub base_radius: f32,
    pub max_projects: usize,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            base_radius: 4.0,
            max_projects: 8,
        }
    }
}

impl SceneLayout {
    /// Positions for `count` planets (capped at `max_projects`), alternating
    /// between an inner and outer ring on either side of the viewport
    pub fn positions(&self, count: usize) -> Vec<[f32; 3]> {
        let count = count.min(self.max_projects);
        if count == 0 {
            return Vec::new();
        }

        let angle_step = std::f32::consts::TAU / count as f32;
        (0..count)
            .map(|i| {
                let angle = i as f32 * angle_step;
                let layer_radius = self.base_radius + (i % 2) as f32 * 2.0;
                let side_offset = if i % 2 == 0 { -8.5 } else { 6.5 };

                let x = angle.cos() * layer_radius + side_offset;
                let z = angle.sin() * layer_radius;
                let y = ((i % 3) as f32 - 1.0) * 1.5;

                [x, y, z - 2.0]
            })
            .collect()
    }
}
