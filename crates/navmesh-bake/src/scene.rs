//! Host scene description
//!
//! A scene is a forest of named nodes, each with a local transform, a layer,
//! a tag and a list of components. Scenes are described in JSON; meshes can
//! be inlined or referenced as OBJ files relative to the scene file.

use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use navmesh_common::{Error, Result, TriMesh};

/// Tag carried by nodes that do not set one
pub const UNTAGGED: &str = "Untagged";

/// A loaded scene
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    /// Location of the scene file; `None` for scenes that were never saved
    #[serde(skip)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub roots: Vec<SceneNode>,
}

impl Scene {
    /// Creates an unsaved scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            roots: Vec::new(),
        }
    }

    /// Parses a scene from JSON. OBJ references are resolved against `base_dir`.
    pub fn from_json_str(json: &str, base_dir: Option<&Path>) -> Result<Self> {
        let mut scene: Scene = serde_json::from_str(json)
            .map_err(|e| Error::InvalidMesh(format!("scene description: {}", e)))?;
        for root in &mut scene.roots {
            root.resolve_meshes(base_dir)?;
        }
        Ok(scene)
    }

    /// Loads a scene file and remembers its location
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let mut scene = Self::from_json_str(&json, path.parent())?;
        if scene.name.is_empty() {
            scene.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        scene.path = Some(path.to_path_buf());
        log::debug!("Loaded scene '{}' from {}", scene.name, path.display());
        Ok(scene)
    }

    /// Finds a node by its `/`-separated name path from a root
    pub fn find(&self, path: &str) -> Option<&SceneNode> {
        let mut names = path.split('/').filter(|s| !s.is_empty());
        let first = names.next()?;
        let mut node = self.roots.iter().find(|n| n.name == first)?;
        for name in names {
            node = node.children.iter().find(|n| n.name == name)?;
        }
        Some(node)
    }
}

/// A node of the scene graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub layer: u32,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            layer: 0,
            tag: default_tag(),
            transform: Transform::default(),
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    fn resolve_meshes(&mut self, base_dir: Option<&Path>) -> Result<()> {
        for component in &mut self.components {
            match component {
                Component::Mesh { mesh, .. }
                | Component::Collider {
                    shape: ColliderShape::Mesh { mesh },
                    ..
                } => mesh.resolve(base_dir)?,
                _ => {}
            }
        }
        for child in &mut self.children {
            child.resolve_meshes(base_dir)?;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_tag() -> String {
    UNTAGGED.to_string()
}

/// Local transform of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Local-to-parent matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Mesh data, either inline or in an OBJ file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshRef {
    /// Inline mesh data
    #[serde(flatten)]
    pub data: Option<TriMesh>,
    /// OBJ file, relative to the scene file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj: Option<PathBuf>,
}

impl MeshRef {
    pub fn inline(mesh: TriMesh) -> Self {
        Self {
            data: Some(mesh),
            obj: None,
        }
    }

    /// Loaded mesh, `None` when the component has no mesh assigned
    pub fn mesh(&self) -> Option<&TriMesh> {
        self.data.as_ref()
    }

    fn resolve(&mut self, base_dir: Option<&Path>) -> Result<()> {
        if self.data.is_some() {
            return Ok(());
        }
        if let Some(obj) = &self.obj {
            let path = match base_dir {
                Some(dir) if obj.is_relative() => dir.join(obj),
                _ => obj.clone(),
            };
            self.data = Some(TriMesh::from_obj(&path)?);
        }
        Ok(())
    }
}

/// Components that can contribute navmesh geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    /// Render mesh
    Mesh {
        #[serde(flatten)]
        mesh: MeshRef,
    },
    /// Heightmap terrain; `heights` is row-major `[z * resolution + x]`, normalized to 0..1
    Terrain {
        heightmap_resolution: usize,
        size: Vec3,
        heights: Vec<f32>,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    /// Physics collider
    Collider {
        #[serde(flatten)]
        shape: ColliderShape,
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default)]
        is_trigger: bool,
    },
}

impl Component {
    pub fn mesh(mesh: TriMesh) -> Self {
        Component::Mesh {
            mesh: MeshRef::inline(mesh),
        }
    }

    pub fn collider(shape: ColliderShape) -> Self {
        Component::Collider {
            shape,
            enabled: true,
            is_trigger: false,
        }
    }
}

/// Collider shapes, in the collider's local space
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ColliderShape {
    Box {
        #[serde(default)]
        center: Vec3,
        size: Vec3,
    },
    Sphere {
        #[serde(default)]
        center: Vec3,
        radius: f32,
    },
    Capsule {
        #[serde(default)]
        center: Vec3,
        radius: f32,
        height: f32,
        /// Axis of the capsule: 0 = X, 1 = Y, 2 = Z
        #[serde(default = "default_capsule_direction")]
        direction: u8,
    },
    Mesh {
        #[serde(flatten)]
        mesh: MeshRef,
    },
    /// Shapes with no mesh representation (wheels, terrain colliders)
    #[serde(other)]
    Unsupported,
}

fn default_capsule_direction() -> u8 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "name": "Level",
        "roots": [
            {
                "name": "World",
                "layer": 0,
                "transform": { "position": [1.0, 0.0, 0.0] },
                "children": [
                    {
                        "name": "Floor",
                        "tag": "Ground",
                        "components": [
                            { "type": "mesh", "vertices": [[0,0,0],[0,0,1],[1,0,0]], "indices": [0,1,2] },
                            { "type": "collider", "shape": "box", "size": [1.0, 1.0, 1.0] },
                            { "type": "collider", "shape": "wheel", "is_trigger": false }
                        ]
                    },
                    { "name": "Hidden", "active": false }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_scene() -> Result<()> {
        let scene = Scene::from_json_str(SCENE, None)?;
        assert_eq!(scene.name, "Level");
        assert!(scene.path.is_none());

        let floor = scene.find("World/Floor").unwrap();
        assert_eq!(floor.tag, "Ground");
        assert!(floor.active);
        assert_eq!(floor.components.len(), 3);
        match &floor.components[0] {
            Component::Mesh { mesh } => assert_eq!(mesh.mesh().unwrap().tri_count(), 1),
            other => panic!("unexpected component {:?}", other),
        }
        assert!(matches!(
            floor.components[2],
            Component::Collider {
                shape: ColliderShape::Unsupported,
                ..
            }
        ));

        let hidden = scene.find("/World/Hidden/").unwrap();
        assert!(!hidden.active);
        assert_eq!(hidden.tag, UNTAGGED);
        assert!(scene.find("World/Missing").is_none());
        Ok(())
    }

    #[test]
    fn test_transform_defaults() -> Result<()> {
        let scene = Scene::from_json_str(SCENE, None)?;
        let world = scene.find("World").unwrap();
        assert_eq!(world.transform.scale, Vec3::ONE);
        assert_eq!(
            world.transform.matrix().transform_point3(Vec3::ZERO),
            Vec3::new(1.0, 0.0, 0.0)
        );
        Ok(())
    }

    #[test]
    fn test_load_resolves_obj() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join("floor.obj"),
            "v 0 0 0\nv 0 0 1\nv 1 0 0\nf 1 2 3\n",
        )?;
        let scene_path = dir.path().join("level.json");
        std::fs::write(
            &scene_path,
            r#"{ "name": "", "roots": [ { "name": "Floor", "components": [ { "type": "mesh", "obj": "floor.obj" } ] } ] }"#,
        )?;

        let scene = Scene::load(&scene_path)?;
        assert_eq!(scene.name, "level");
        assert_eq!(scene.path.as_deref(), Some(scene_path.as_path()));
        match &scene.roots[0].components[0] {
            Component::Mesh { mesh } => assert_eq!(mesh.mesh().unwrap().vert_count(), 3),
            other => panic!("unexpected component {:?}", other),
        }
        Ok(())
    }
}
