//! Geometry targets
//!
//! A target is one contributing mesh in its local space together with its
//! world transform. Targets are built per bake and never mutated.

use glam::{Mat4, Vec3};

use navmesh_common::{Aabb, Result, TriMesh};

/// A single mesh contributing to the navmesh input
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryTarget {
    name: String,
    mesh: TriMesh,
    transform: Mat4,
}

impl GeometryTarget {
    /// Creates a target, rejecting malformed triangle lists
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Vec3>,
        indices: Vec<u32>,
        transform: Mat4,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            mesh: TriMesh::from_parts(vertices, indices)?,
            transform,
        })
    }

    pub fn from_mesh(name: impl Into<String>, mesh: &TriMesh, transform: Mat4) -> Result<Self> {
        Self::new(name, mesh.vertices.clone(), mesh.indices.clone(), transform)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.mesh.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.mesh.indices
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// World-space vertex positions
    pub fn world_vertices(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.mesh
            .vertices
            .iter()
            .map(move |&v| self.transform.transform_point3(v))
    }

    pub fn world_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for v in self.world_vertices() {
            bounds.expand(v);
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navmesh_common::Error;

    #[test]
    fn test_new_validates() {
        let verts = vec![Vec3::ZERO, Vec3::X, Vec3::Z];
        assert!(GeometryTarget::new("ok", verts.clone(), vec![0, 2, 1], Mat4::IDENTITY).is_ok());
        assert!(matches!(
            GeometryTarget::new("short", verts.clone(), vec![0, 2], Mat4::IDENTITY),
            Err(Error::InvalidMesh(_))
        ));
        assert!(matches!(
            GeometryTarget::new("range", verts, vec![0, 2, 3], Mat4::IDENTITY),
            Err(Error::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_world_vertices() -> Result<()> {
        let target = GeometryTarget::new(
            "moved",
            vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            vec![0, 2, 1],
            Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
        )?;
        let world: Vec<Vec3> = target.world_vertices().collect();
        assert_eq!(world[1], Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(target.world_bounds().min.y, 2.0);
        Ok(())
    }
}
