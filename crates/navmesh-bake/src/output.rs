//! Where baked files are written

use std::path::{Path, PathBuf};

use crate::scene::Scene;

/// Baked navmesh container
pub const NAVMESH_FILE: &str = "NavigationMesh.bin";
/// Companion height mesh, Wavefront OBJ
pub const HEIGHT_MESH_FILE: &str = "NavigationMesh.obj";

/// Resolves the per-scene output directory
pub trait OutputLocator {
    /// Directory for `scene`'s baked files, `None` when the scene has no location
    fn output_dir(&self, scene: &Scene) -> Option<PathBuf>;
}

/// Always writes to the same directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedOutputDir(pub PathBuf);

impl FixedOutputDir {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self(dir.as_ref().to_path_buf())
    }
}

impl OutputLocator for FixedOutputDir {
    fn output_dir(&self, _scene: &Scene) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Writes next to the scene file; unsaved scenes have no output location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneRelativeOutput;

impl OutputLocator for SceneRelativeOutput {
    fn output_dir(&self, scene: &Scene) -> Option<PathBuf> {
        scene
            .path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
    }
}
