//! Navmesh surface controller
//!
//! A [`NavMeshSurface`] runs the whole bake for one scene: collect, combine,
//! build, serialize and write. It keeps the last baked or loaded navmesh and
//! height mesh in memory, but the files on disk stay authoritative: a cache
//! entry whose file has disappeared is dropped before it is used.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use navmesh_common::{Error, Result, TriMesh};
use navmesh_format::TiledNavMesh;

use crate::build::{NavMeshBuildAdapter, TriangleNavMeshBuilder};
use crate::collector::Collector;
use crate::combiner::{CombinedMesh, CoordinateConvention, HeightMesh, MeshCombiner};
use crate::output::{OutputLocator, SceneRelativeOutput, HEIGHT_MESH_FILE, NAVMESH_FILE};
use crate::scene::Scene;
use crate::settings::SurfaceSettings;

/// In-memory copy of a baked artifact and the file it belongs to
#[derive(Debug, Clone, Default)]
pub enum SurfaceCache<T> {
    #[default]
    Empty,
    Loaded { value: T, path: PathBuf },
}

/// Cached navmesh
pub type NavMeshCache = SurfaceCache<TiledNavMesh>;
/// Cached height mesh
pub type HeightMeshCache = SurfaceCache<HeightMesh>;

impl<T> SurfaceCache<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            SurfaceCache::Empty => None,
            SurfaceCache::Loaded { value, .. } => Some(value),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SurfaceCache::Loaded { .. })
    }

    pub fn clear(&mut self) {
        *self = SurfaceCache::Empty;
    }

    /// Drops the entry if its file is gone; returns whether it is valid for `path`
    fn refresh(&mut self, path: &Path) -> bool {
        let SurfaceCache::Loaded { path: cached, .. } = self else {
            return false;
        };
        if !cached.exists() {
            log::warn!(
                "{} was removed, dropping the cached copy",
                cached.display()
            );
            self.clear();
            return false;
        }
        cached.as_path() == path
    }
}

/// What a bake produced
#[derive(Debug, Clone, PartialEq)]
pub struct BakeSummary {
    pub target_count: usize,
    pub tile_count: usize,
    pub poly_count: usize,
    pub nav_mesh_path: PathBuf,
    pub nav_mesh_bytes: usize,
    pub height_mesh_path: Option<PathBuf>,
}

/// Bakes, stores and serves the navmesh of a scene
pub struct NavMeshSurface {
    settings: SurfaceSettings,
    convention: CoordinateConvention,
    locator: Box<dyn OutputLocator>,
    builder: Box<dyn NavMeshBuildAdapter>,
    nav_mesh: NavMeshCache,
    height_mesh: HeightMeshCache,
}

impl NavMeshSurface {
    pub fn new(
        settings: SurfaceSettings,
        locator: impl OutputLocator + 'static,
        builder: impl NavMeshBuildAdapter + 'static,
    ) -> Self {
        Self {
            settings,
            convention: CoordinateConvention::Preserve,
            locator: Box::new(locator),
            builder: Box::new(builder),
            nav_mesh: NavMeshCache::Empty,
            height_mesh: HeightMeshCache::Empty,
        }
    }

    /// Surface writing next to the scene file with the reference triangle builder
    pub fn with_settings(settings: SurfaceSettings) -> Self {
        Self::new(settings, SceneRelativeOutput, TriangleNavMeshBuilder)
    }

    pub fn with_convention(mut self, convention: CoordinateConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn settings(&self) -> &SurfaceSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SurfaceSettings {
        &mut self.settings
    }

    fn output_dir(&self, scene: &Scene) -> Result<PathBuf> {
        self.locator
            .output_dir(scene)
            .ok_or(Error::NoOutputLocation)
    }

    pub fn nav_mesh_path(&self, scene: &Scene) -> Result<PathBuf> {
        Ok(self.output_dir(scene)?.join(NAVMESH_FILE))
    }

    pub fn height_mesh_path(&self, scene: &Scene) -> Result<PathBuf> {
        Ok(self.output_dir(scene)?.join(HEIGHT_MESH_FILE))
    }

    /// Replaces the scene's baked files with a fresh bake.
    ///
    /// Missing geometry, a missing output location and invalid settings are
    /// reported before any existing file is touched. A failed build leaves
    /// no navmesh file behind.
    pub fn bake(&mut self, scene: &Scene) -> Result<BakeSummary> {
        let targets = Collector::new(&self.settings.collect).collect(scene)?;
        if targets.is_empty() {
            return Err(Error::NoGeometry);
        }
        let dir = self.output_dir(scene)?;
        let build = self.settings.build.clone();
        build.validate()?;

        log::info!(
            "Baking navmesh for scene '{}' from {} targets",
            scene.name,
            targets.len()
        );
        self.clear(scene)?;

        let (combined, height_mesh) = MeshCombiner::new(self.convention).combine(
            &targets,
            build.vertical_offset,
            build.build_height_mesh,
        )?;
        let nav_mesh = self.builder.build(&combined, &build)?;
        let bytes = navmesh_format::serialize(&nav_mesh)?;

        fs::create_dir_all(&dir)?;
        let nav_mesh_path = dir.join(NAVMESH_FILE);
        write_replacing(&nav_mesh_path, &bytes)?;

        let height_mesh_path = match &height_mesh {
            Some(mesh) => {
                let path = dir.join(HEIGHT_MESH_FILE);
                let obj = mesh.to_tri_mesh().to_obj_string(&scene.name);
                write_replacing(&path, obj.as_bytes())?;
                Some(path)
            }
            None => None,
        };

        let summary = BakeSummary {
            target_count: targets.len(),
            tile_count: nav_mesh.tile_count(),
            poly_count: nav_mesh.tiles().map(|t| t.polys.len()).sum(),
            nav_mesh_path: nav_mesh_path.clone(),
            nav_mesh_bytes: bytes.len(),
            height_mesh_path: height_mesh_path.clone(),
        };
        log::info!(
            "Wrote {} ({} bytes, {} tiles, {} polygons)",
            nav_mesh_path.display(),
            summary.nav_mesh_bytes,
            summary.tile_count,
            summary.poly_count
        );

        self.nav_mesh = NavMeshCache::Loaded {
            value: nav_mesh,
            path: nav_mesh_path,
        };
        if let (Some(value), Some(path)) = (height_mesh, height_mesh_path) {
            self.height_mesh = HeightMeshCache::Loaded { value, path };
        }
        Ok(summary)
    }

    /// Drops the caches and deletes the scene's baked files.
    ///
    /// Files that do not exist are ignored; a scene without an output
    /// location only has its caches dropped.
    pub fn clear(&mut self, scene: &Scene) -> Result<()> {
        self.nav_mesh.clear();
        self.height_mesh.clear();
        let Some(dir) = self.locator.output_dir(scene) else {
            return Ok(());
        };
        for name in [NAVMESH_FILE, HEIGHT_MESH_FILE] {
            let path = dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn has_nav_mesh_data(&mut self, scene: &Scene) -> bool {
        match self.nav_mesh_path(scene) {
            Ok(path) => self.nav_mesh.refresh(&path) || path.is_file(),
            Err(_) => false,
        }
    }

    pub fn has_height_mesh_data(&mut self, scene: &Scene) -> bool {
        match self.height_mesh_path(scene) {
            Ok(path) => self.height_mesh.refresh(&path) || path.is_file(),
            Err(_) => false,
        }
    }

    /// The scene's navmesh, loading it from disk when it is not cached.
    ///
    /// A scene that was never baked yields [`Error::NotFound`]. A failed load
    /// leaves the cache as it was.
    pub fn nav_mesh_data(&mut self, scene: &Scene) -> Result<&TiledNavMesh> {
        let path = self.nav_mesh_path(scene)?;
        if !self.nav_mesh.refresh(&path) {
            let value = load_nav_mesh(&path, self.settings.build.verts_per_poly)?;
            self.nav_mesh = NavMeshCache::Loaded {
                value,
                path: path.clone(),
            };
        }
        self.nav_mesh.get().ok_or(Error::NotFound(path))
    }

    /// The scene's height mesh, `None` when none was baked
    pub fn height_mesh(&mut self, scene: &Scene) -> Result<Option<&HeightMesh>> {
        let path = self.height_mesh_path(scene)?;
        if !self.height_mesh.refresh(&path) {
            if !path.is_file() {
                return Ok(None);
            }
            let value = CombinedMesh::from_tri_mesh(TriMesh::from_obj(&path)?);
            log::debug!(
                "Loaded height mesh {}: {} triangles",
                path.display(),
                value.tri_count()
            );
            self.height_mesh = HeightMeshCache::Loaded { value, path };
        }
        Ok(self.height_mesh.get())
    }
}

fn load_nav_mesh(path: &Path, verts_per_poly: usize) -> Result<TiledNavMesh> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    let nav_mesh = navmesh_format::deserialize(&bytes, Some(verts_per_poly))?;
    log::info!(
        "Loaded {} ({} tiles)",
        path.display(),
        nav_mesh.tile_count()
    );
    Ok(nav_mesh)
}

/// Writes through a sibling temp file so readers never see a partial file
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
