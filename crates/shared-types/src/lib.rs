//! Shared types for the SpaceTechs scene runtime
//!
//! This crate contains the types passed between the config-system, renderer,
//! data-manager and wasm-bridge crates: the performance data model, the
//! typed content-API schemas and the common error taxonomy.

use serde::{Deserialize, Serialize};

pub mod content;
pub mod errors;
pub mod performance;

pub use content::*;
pub use errors::*;
pub use performance::*;

/// Discrete rendering-quality level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl Default for QualityTier {
    fn default() -> Self {
        QualityTier::Medium
    }
}

impl QualityTier {
    /// Fixed rendering record for this tier
    pub fn preset(&self) -> QualityPreset {
        match self {
            QualityTier::Low => QualityPreset {
                particle_count: 500,
                geometry_detail: GeometryDetail::Low,
                shadows_enabled: false,
                postprocessing_enabled: false,
            },
            QualityTier::Medium => QualityPreset {
                particle_count: 1000,
                geometry_detail: GeometryDetail::Medium,
                shadows_enabled: true,
                postprocessing_enabled: false,
            },
            QualityTier::High => QualityPreset {
                particle_count: 1500,
                geometry_detail: GeometryDetail::High,
                shadows_enabled: true,
                postprocessing_enabled: true,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry level-of-detail
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GeometryDetail {
    Low,
    Medium,
    High,
}

/// Static rendering knobs attached to a [`QualityTier`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QualityPreset {
    pub particle_count: u32,
    pub geometry_detail: GeometryDetail,
    pub shadows_enabled: bool,
    pub postprocessing_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(QualityTier::Low < QualityTier::Medium);
        assert!(QualityTier::Medium < QualityTier::High);
        assert_eq!(QualityTier::default(), QualityTier::Medium);
    }

    #[test]
    fn test_low_preset_disables_effects() {
        let preset = QualityTier::Low.preset();
        assert_eq!(preset.particle_count, 500);
        assert_eq!(preset.geometry_detail, GeometryDetail::Low);
        assert!(!preset.shadows_enabled);
        assert!(!preset.postprocessing_enabled);
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        let json = serde_json::to_string(&QualityTier::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}
