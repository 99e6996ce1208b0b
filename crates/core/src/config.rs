//! Pipeline configuration, loadable from JSON

use crate::error::RasterError;
use crate::graphics::ColorOps;
use crate::logging::{log, LogCategory, LogLevel};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How a fragment's color is computed before depth resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingMode {
    /// Interpolated vertex color, unlit
    #[default]
    VertexColor,
    /// Vertex color scaled by `ambient + max(0, n·l)`, clamped to [0, 1]
    Lambert,
    /// Normal visualized as `n * 0.5 + 0.5`
    Normals,
}

/// Which triangles are discarded by facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullMode {
    #[default]
    None,
    /// Discard triangles that are clockwise in normalized device coordinates
    Back,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Clear color as RGBA bytes
    pub background: [u8; 4],
    pub shading: ShadingMode,
    /// Direction towards the light in world space; normalized on use
    pub light_direction: [f32; 3],
    pub ambient: f32,
    pub cull_mode: CullMode,
    /// Interpolate color and normal with 1/w weighting
    pub perspective_correct: bool,
    /// Worker threads per stage; `None` uses every available core
    pub workers: Option<usize>,
    /// Upper bound on fragments per frame
    pub max_fragments: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            background: [0, 0, 0, 255],
            shading: ShadingMode::VertexColor,
            light_direction: [0.3, 0.5, 1.0],
            ambient: 0.1,
            cull_mode: CullMode::None,
            perspective_correct: true,
            workers: None,
            max_fragments: 64 * 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, RasterError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load a config, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log(LogCategory::Buffers, LogLevel::Warn, || {
                    format!("Failed to load {}: {}. Using defaults.", path.display(), e)
                });
                Self::default()
            }
        }
    }

    /// Write the config as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), RasterError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn background_argb(&self) -> u32 {
        ColorOps::from_rgba8(self.background)
    }

    /// Normalized light direction; a zero vector falls back to +Z
    pub fn light(&self) -> Vec3 {
        Vec3::from_array(self.light_direction)
            .try_normalize()
            .unwrap_or(Vec3::Z)
    }

    /// Effective worker count, at least 1
    pub fn worker_count(&self) -> usize {
        match self.workers {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}
