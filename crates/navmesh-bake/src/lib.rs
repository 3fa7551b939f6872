//! Navmesh baking pipeline
//!
//! Collects geometry from a scene, merges it into one input mesh, hands it to
//! a build adapter and persists the resulting tiled navmesh next to the
//! scene:
//!
//! ```text
//! Scene -> Collector -> MeshCombiner -> NavMeshBuildAdapter -> NavigationMesh.bin
//! ```

pub mod build;
pub mod collector;
pub mod combiner;
pub mod height_mesh;
pub mod output;
pub mod scene;
pub mod settings;
pub mod shapes;
pub mod surface;
pub mod target;

pub use build::{BuildError, NavMeshBuildAdapter, TriangleNavMeshBuilder};
pub use collector::{CollectMode, CollectSettings, CollectVolume, Collector, UseGeometry};
pub use combiner::{CombinedMesh, CoordinateConvention, HeightMesh, MeshCombiner};
pub use height_mesh::HeightMeshRefiner;
pub use output::{FixedOutputDir, OutputLocator, SceneRelativeOutput, HEIGHT_MESH_FILE, NAVMESH_FILE};
pub use scene::{ColliderShape, Component, MeshRef, Scene, SceneNode, Transform};
pub use settings::{BuildSettings, SurfaceSettings};
pub use surface::{BakeSummary, HeightMeshCache, NavMeshCache, NavMeshSurface, SurfaceCache};
pub use target::GeometryTarget;
