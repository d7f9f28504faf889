// Performance state structures shared by the store, the scene and the JS bridge
// Field names mirror the camelCase shape the page components consume

use serde::{Deserialize, Serialize};

use crate::{GeometryDetail, QualityTier};

/// Default memory estimate when `navigator.deviceMemory` is unavailable
pub const DEFAULT_MEMORY_GB: f64 = 4.0;

/// Default core count when `navigator.hardwareConcurrency` is unavailable
pub const DEFAULT_CPU_CORES: u32 = 4;

/// Default texture limit when no WebGL context could be created
pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 2048;

/// Runtime environment read once per session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    pub is_mobile: bool,
    #[serde(rename = "memoryGB")]
    pub memory_gb: f64,
    pub cpu_cores: u32,
    #[serde(rename = "hasWebGL")]
    pub has_webgl: bool,
    #[serde(rename = "hasWebGL2")]
    pub has_webgl2: bool,
    pub max_texture_size: u32,
    /// Unmasked GPU renderer string, when the driver exposes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_renderer: Option<String>,
}

impl Default for DeviceCapabilities {
    /// Conservative values used whenever introspection fails
    fn default() -> Self {
        Self {
            is_mobile: false,
            memory_gb: DEFAULT_MEMORY_GB,
            cpu_cores: DEFAULT_CPU_CORES,
            has_webgl: false,
            has_webgl2: false,
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
            gpu_renderer: None,
        }
    }
}

impl DeviceCapabilities {
    /// True when the renderer string hints at a discrete GPU vendor
    pub fn has_discrete_gpu_hint(&self) -> bool {
        self.gpu_renderer
            .as_deref()
            .map(|renderer| {
                let renderer = renderer.to_lowercase();
                renderer.contains("nvidia") || renderer.contains("amd")
            })
            .unwrap_or(false)
    }
}

/// Process-wide performance snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceState {
    pub fps: f64,
    pub tier: QualityTier,
    pub is_degraded_mode: bool,
    pub is_mobile: bool,
    pub prefers_reduced_motion: bool,
    pub hovered_object_id: Option<String>,
    pub selected_object_id: Option<String>,
    pub is_scene_loading: bool,
    /// Percent, 0..=100
    pub loading_progress: u8,
}

impl Default for PerformanceState {
    fn default() -> Self {
        Self {
            fps: 60.0,
            tier: QualityTier::Medium,
            is_degraded_mode: false,
            is_mobile: false,
            prefers_reduced_motion: false,
            hovered_object_id: None,
            selected_object_id: None,
            is_scene_loading: true,
            loading_progress: 0,
        }
    }
}

/// Rendering knobs derived from a [`PerformanceState`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimalSettings {
    pub particle_count: u32,
    pub geometry_detail: GeometryDetail,
    pub shadows_enabled: bool,
    pub postprocessing_enabled: bool,
    pub animations_enabled: bool,
    pub antialias: bool,
    /// Upper bound applied to `window.devicePixelRatio`
    pub max_pixel_ratio: f32,
    pub lod_distances: [f32; 3],
    /// Minimum time between animated property updates
    pub frame_interval_secs: f64,
}

impl OptimalSettings {
    /// Fields whose change requires geometries and materials to be rebuilt
    pub fn material_signature(&self) -> (GeometryDetail, u32, bool, bool) {
        (
            self.geometry_detail,
            self.particle_count,
            self.shadows_enabled,
            self.postprocessing_enabled,
        )
    }
}
