//! Bake configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use navmesh_common::{Error, Result};

use crate::collector::CollectSettings;

/// Parameters handed to the navmesh build library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// The width/depth resolution of the voxel field
    pub cell_size: f32,
    /// The height resolution of the voxel field
    pub cell_height: f32,

    /// Minimum floor to ceiling height an agent can stand under
    pub agent_height: f32,
    pub agent_radius: f32,
    /// Maximum ledge height an agent can step up
    pub agent_max_climb: f32,
    /// Maximum walkable slope in degrees
    pub agent_max_slope: f32,
    pub agent_max_acceleration: f32,
    pub agent_max_speed: f32,

    /// Minimum cell count of an isolated region
    pub min_region_size: i32,
    /// Regions below this cell count are merged into neighbors
    pub merged_region_size: i32,

    pub filter_low_hanging_obstacles: bool,
    pub filter_ledge_spans: bool,
    pub filter_walkable_low_height_spans: bool,

    /// Maximum contour edge length along mesh borders
    pub edge_max_len: f32,
    /// Maximum distance simplified contours may deviate from raw contours
    pub edge_max_error: f32,
    /// Maximum vertices per polygon, 3..=6
    pub verts_per_poly: usize,

    pub detail_sample_dist: f32,
    pub detail_sample_max_error: f32,

    /// Tile edge length in cells
    pub tile_size: i32,
    /// Added to the Y of every input vertex before the build
    pub vertical_offset: f32,
    pub tiled: bool,
    pub build_height_mesh: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            cell_size: 0.1,
            cell_height: 0.2,
            agent_height: 2.0,
            agent_radius: 0.4,
            agent_max_climb: 0.4,
            agent_max_slope: 45.0,
            agent_max_acceleration: 8.0,
            agent_max_speed: 3.5,
            min_region_size: 8,
            merged_region_size: 20,
            filter_low_hanging_obstacles: true,
            filter_ledge_spans: true,
            filter_walkable_low_height_spans: true,
            edge_max_len: 12.0,
            edge_max_error: 1.3,
            verts_per_poly: 6,
            detail_sample_dist: 6.0,
            detail_sample_max_error: 1.0,
            tile_size: 32,
            vertical_offset: 0.0,
            tiled: true,
            build_height_mesh: false,
        }
    }
}

impl BuildSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size > 0.0) || !(self.cell_height > 0.0) {
            return Err(Error::InvalidSettings(format!(
                "cell size {} and cell height {} must be positive",
                self.cell_size, self.cell_height
            )));
        }
        if !(0.0..=90.0).contains(&self.agent_max_slope) {
            return Err(Error::InvalidSettings(format!(
                "max slope {} outside 0..=90 degrees",
                self.agent_max_slope
            )));
        }
        if !(3..=6).contains(&self.verts_per_poly) {
            return Err(Error::InvalidSettings(format!(
                "verts_per_poly {} outside 3..=6",
                self.verts_per_poly
            )));
        }
        if self.tiled && self.tile_size <= 0 {
            return Err(Error::InvalidSettings(format!(
                "tile size {} must be positive",
                self.tile_size
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidSettings(format!("build settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

/// Everything a surface needs to bake: what to collect and how to build it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    pub collect: CollectSettings,
    pub build: BuildSettings,
}

impl SurfaceSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidSettings(format!("surface settings: {}", e)))?;
        settings.build.validate()?;
        Ok(settings)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}
