//! Scene geometry collection
//!
//! Walks the scene graph and turns every qualifying terrain, render mesh or
//! collider into a [`GeometryTarget`]. Collection only reads the scene.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use navmesh_common::{Aabb, Result};

use crate::scene::{ColliderShape, Component, Scene, SceneNode};
use crate::shapes;
use crate::target::GeometryTarget;

/// Which nodes are considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectMode {
    /// Every node in the scene
    #[default]
    All,
    /// Nodes inside, or with render bounds overlapping, the collection volume
    Volume,
    /// The surface node and its descendants
    Children,
}

/// Which components provide geometry besides terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseGeometry {
    #[default]
    RenderMeshes,
    PhysicsColliders,
}

/// Box used by [`CollectMode::Volume`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectVolume {
    pub center: Vec3,
    pub size: Vec3,
}

impl Default for CollectVolume {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            size: Vec3::new(50.0, 25.0, 50.0),
        }
    }
}

impl CollectVolume {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.size)
    }
}

/// Source selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectSettings {
    pub mode: CollectMode,
    pub use_geometry: UseGeometry,
    /// Bit `n` set includes nodes on layer `n`
    pub layer_mask: u32,
    /// Allowed tags; `None` or empty disables tag filtering
    pub tag_filter: Option<Vec<String>>,
    pub volume: CollectVolume,
    /// `/`-separated path of the surface node, used by [`CollectMode::Children`]
    pub surface_path: Option<String>,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            mode: CollectMode::All,
            use_geometry: UseGeometry::RenderMeshes,
            layer_mask: u32::MAX,
            tag_filter: None,
            volume: CollectVolume::default(),
            surface_path: None,
        }
    }
}

/// A node reached by the traversal, with its resolved world state
struct Visited<'a> {
    node: &'a SceneNode,
    world: Mat4,
    active_in_hierarchy: bool,
}

fn visit<'a>(node: &'a SceneNode, parent: Mat4, parent_active: bool, out: &mut Vec<Visited<'a>>) {
    let world = parent * node.transform.matrix();
    let active_in_hierarchy = parent_active && node.active;
    out.push(Visited {
        node,
        world,
        active_in_hierarchy,
    });
    for child in &node.children {
        visit(child, world, active_in_hierarchy, out);
    }
}

/// Collects navmesh geometry from a scene
pub struct Collector<'s> {
    settings: &'s CollectSettings,
}

impl<'s> Collector<'s> {
    pub fn new(settings: &'s CollectSettings) -> Self {
        Self { settings }
    }

    /// Returns all targets: terrains first, then meshes or colliders.
    ///
    /// Both groups are in depth-first pre-order of the scene graph.
    pub fn collect(&self, scene: &Scene) -> Result<Vec<GeometryTarget>> {
        let nodes: Vec<Visited> = self
            .candidates(scene)
            .into_iter()
            .filter(|v| self.accepts(v))
            .collect();

        let mut targets = Vec::new();
        for v in &nodes {
            self.collect_terrains(v, &mut targets)?;
        }
        let terrain_count = targets.len();
        for v in &nodes {
            match self.settings.use_geometry {
                UseGeometry::RenderMeshes => self.collect_meshes(v, &mut targets)?,
                UseGeometry::PhysicsColliders => self.collect_colliders(v, &mut targets)?,
            }
        }

        log::info!(
            "Collected {} navmesh targets ({} terrain) from {} of scene '{}'",
            targets.len(),
            terrain_count,
            nodes.len(),
            scene.name
        );
        Ok(targets)
    }

    fn candidates<'a>(&self, scene: &'a Scene) -> Vec<Visited<'a>> {
        let mut out = Vec::new();
        match self.settings.mode {
            CollectMode::All | CollectMode::Volume => {
                for root in &scene.roots {
                    visit(root, Mat4::IDENTITY, true, &mut out);
                }
            }
            CollectMode::Children => {
                let Some(path) = self.settings.surface_path.as_deref() else {
                    log::warn!("Children collection without a surface path collects nothing");
                    return out;
                };
                // Resolve the ancestor chain so transforms and activity are inherited
                let mut names = path.split('/').filter(|s| !s.is_empty());
                let mut siblings = &scene.roots;
                let mut world = Mat4::IDENTITY;
                let mut active = true;
                let mut found = None;
                while let Some(name) = names.next() {
                    let Some(node) = siblings.iter().find(|n| n.name == name) else {
                        break;
                    };
                    if names.clone().next().is_none() {
                        found = Some(node);
                        break;
                    }
                    world *= node.transform.matrix();
                    active &= node.active;
                    siblings = &node.children;
                }
                match found {
                    Some(surface) => visit(surface, world, active, &mut out),
                    None => log::warn!("Surface node '{}' not found", path),
                }
            }
        }
        out
    }

    fn accepts(&self, v: &Visited) -> bool {
        let node = v.node;
        if self.settings.mode == CollectMode::Volume {
            let volume = self.settings.volume.bounds();
            let position = v.world.transform_point3(Vec3::ZERO);
            let inside = volume.contains_point(position)
                || render_bounds(v).is_some_and(|b| volume.intersects(&b));
            if !inside {
                return false;
            }
        }
        if node.layer >= 32 || (self.settings.layer_mask >> node.layer) & 1 != 1 {
            return false;
        }
        if let Some(tags) = &self.settings.tag_filter {
            if !tags.is_empty() && !tags.iter().any(|t| *t == node.tag) {
                return false;
            }
        }
        v.active_in_hierarchy
    }

    fn collect_terrains(&self, v: &Visited, targets: &mut Vec<GeometryTarget>) -> Result<()> {
        for component in &v.node.components {
            if let Component::Terrain {
                heightmap_resolution,
                size,
                heights,
                enabled: true,
            } = component
            {
                let mesh = shapes::terrain_mesh(*heightmap_resolution, *size, heights)?;
                log::debug!("Terrain '{}': {} triangles", v.node.name, mesh.tri_count());
                targets.push(GeometryTarget::from_mesh(&v.node.name, &mesh, v.world)?);
            }
        }
        Ok(())
    }

    fn collect_meshes(&self, v: &Visited, targets: &mut Vec<GeometryTarget>) -> Result<()> {
        for component in &v.node.components {
            if let Component::Mesh { mesh } = component {
                match mesh.mesh() {
                    Some(mesh) => {
                        log::debug!("Mesh '{}': {} triangles", v.node.name, mesh.tri_count());
                        targets.push(GeometryTarget::from_mesh(&v.node.name, mesh, v.world)?);
                    }
                    None => log::debug!("Mesh component on '{}' has no mesh", v.node.name),
                }
            }
        }
        Ok(())
    }

    fn collect_colliders(&self, v: &Visited, targets: &mut Vec<GeometryTarget>) -> Result<()> {
        for component in &v.node.components {
            let Component::Collider {
                shape,
                enabled,
                is_trigger,
            } = component
            else {
                continue;
            };
            if !*enabled || *is_trigger {
                continue;
            }
            let mesh = match shape {
                ColliderShape::Box { center, size } => shapes::box_mesh(*center, *size),
                ColliderShape::Sphere { center, radius } => shapes::sphere_mesh(*center, *radius),
                ColliderShape::Capsule {
                    center,
                    radius,
                    height,
                    direction,
                } => shapes::capsule_mesh(*center, *radius, *height, *direction),
                ColliderShape::Mesh { mesh } => match mesh.mesh() {
                    Some(mesh) => mesh.clone(),
                    None => {
                        log::debug!("Mesh collider on '{}' has no mesh", v.node.name);
                        continue;
                    }
                },
                ColliderShape::Unsupported => {
                    log::debug!("Skipping unsupported collider on '{}'", v.node.name);
                    continue;
                }
            };
            log::debug!("Collider '{}': {} triangles", v.node.name, mesh.tri_count());
            targets.push(GeometryTarget::from_mesh(&v.node.name, &mesh, v.world)?);
        }
        Ok(())
    }
}

/// World bounds of a node's render meshes, from their transformed local boxes
fn render_bounds(v: &Visited) -> Option<Aabb> {
    let mut bounds: Option<Aabb> = None;
    for component in &v.node.components {
        let Component::Mesh { mesh } = component else {
            continue;
        };
        let Some(mesh) = mesh.mesh() else {
            continue;
        };
        let local = mesh.calculate_bounds();
        let mut world = Aabb::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { local.min.x } else { local.max.x },
                if i & 2 == 0 { local.min.y } else { local.max.y },
                if i & 4 == 0 { local.min.z } else { local.max.z },
            );
            world.expand(v.world.transform_point3(corner));
        }
        bounds = Some(match bounds {
            Some(b) => b.union(&world),
            None => world,
        });
    }
    bounds
}
