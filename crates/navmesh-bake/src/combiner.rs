//! Mesh combination
//!
//! Merges all targets into one world-space triangle soup ready for the
//! navmesh builder, and optionally derives the height mesh from the same
//! geometry before any vertical offset is applied.

use glam::Vec3;

use navmesh_common::{Aabb, Error, Result, TriMesh};

use crate::height_mesh::HeightMeshRefiner;
use crate::target::GeometryTarget;

/// Combined navmesh input geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

/// Height mesh; same layout as the combined mesh, kept in host coordinates
pub type HeightMesh = CombinedMesh;

impl CombinedMesh {
    pub fn from_tri_mesh(mesh: TriMesh) -> Self {
        let bounds = mesh.calculate_bounds();
        Self {
            vertices: mesh.vertices,
            indices: mesh.indices,
            bounds,
        }
    }

    pub fn to_tri_mesh(&self) -> TriMesh {
        TriMesh {
            vertices: self.vertices.clone(),
            indices: self.indices.clone(),
        }
    }

    pub fn tri_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, tri: usize) -> [Vec3; 3] {
        let i = tri * 3;
        [
            self.vertices[self.indices[i] as usize],
            self.vertices[self.indices[i + 1] as usize],
            self.vertices[self.indices[i + 2] as usize],
        ]
    }

    pub fn recalculate_bounds(&mut self) {
        self.bounds = Aabb::from_points(&self.vertices);
    }
}

/// Coordinate convention applied to the combined mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateConvention {
    /// Host coordinates and winding, used for exported navmeshes
    #[default]
    Preserve,
    /// Negate X and reverse the winding of every triangle
    FlipHandedness,
}

impl CoordinateConvention {
    /// Applies the convention to vertices and winding together
    pub fn apply(self, mesh: &mut CombinedMesh) {
        match self {
            CoordinateConvention::Preserve => {}
            CoordinateConvention::FlipHandedness => {
                for v in &mut mesh.vertices {
                    v.x = -v.x;
                }
                for tri in mesh.indices.chunks_exact_mut(3) {
                    tri.swap(1, 2);
                }
                mesh.recalculate_bounds();
            }
        }
    }
}

/// Merges geometry targets
#[derive(Debug, Clone, Default)]
pub struct MeshCombiner {
    convention: CoordinateConvention,
    refiner: HeightMeshRefiner,
}

impl MeshCombiner {
    pub fn new(convention: CoordinateConvention) -> Self {
        Self {
            convention,
            refiner: HeightMeshRefiner::default(),
        }
    }

    pub fn with_refiner(mut self, refiner: HeightMeshRefiner) -> Self {
        self.refiner = refiner;
        self
    }

    pub fn convention(&self) -> CoordinateConvention {
        self.convention
    }

    /// Combines targets into one mesh.
    ///
    /// The height mesh, when requested, is taken before `vertical_offset` is
    /// applied and stays in host coordinates.
    pub fn combine(
        &self,
        targets: &[GeometryTarget],
        vertical_offset: f32,
        build_height_mesh: bool,
    ) -> Result<(CombinedMesh, Option<HeightMesh>)> {
        if targets.is_empty() {
            return Err(Error::NoGeometry);
        }

        let vert_total: usize = targets.iter().map(|t| t.vertices().len()).sum();
        let index_total: usize = targets.iter().map(|t| t.indices().len()).sum();
        if vert_total > u32::MAX as usize {
            return Err(Error::InvalidMesh(format!(
                "{} combined vertices exceed 32-bit indices",
                vert_total
            )));
        }

        let mut combined = CombinedMesh {
            vertices: Vec::with_capacity(vert_total),
            indices: Vec::with_capacity(index_total),
            bounds: Aabb::EMPTY,
        };
        for target in targets {
            let base = combined.vertices.len() as u32;
            combined.vertices.extend(target.world_vertices());
            combined
                .indices
                .extend(target.indices().iter().map(|&i| i + base));
        }
        combined.recalculate_bounds();

        let height_mesh = if build_height_mesh {
            let refined = self.refiner.refine(&combined);
            log::debug!(
                "Height mesh: {} vertices, {} triangles",
                refined.vertices.len(),
                refined.tri_count()
            );
            Some(refined)
        } else {
            None
        };

        if vertical_offset != 0.0 {
            for v in &mut combined.vertices {
                v.y += vertical_offset;
            }
            combined.recalculate_bounds();
        }

        self.convention.apply(&mut combined);

        log::info!(
            "Combined {} targets: {} vertices, {} triangles",
            targets.len(),
            combined.vertices.len(),
            combined.tri_count()
        );
        Ok((combined, height_mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    fn tri_target(name: &str, offset: Vec3) -> GeometryTarget {
        GeometryTarget::new(
            name,
            vec![Vec3::ZERO, Vec3::Z, Vec3::X],
            vec![0, 1, 2],
            Mat4::from_translation(offset),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_targets() {
        let combiner = MeshCombiner::new(CoordinateConvention::Preserve);
        assert!(matches!(
            combiner.combine(&[], 0.0, false),
            Err(Error::NoGeometry)
        ));
    }

    #[test]
    fn test_concatenation_rebases_indices() -> Result<()> {
        let combiner = MeshCombiner::new(CoordinateConvention::Preserve);
        let targets = [
            tri_target("a", Vec3::ZERO),
            tri_target("b", Vec3::new(5.0, 1.0, 0.0)),
        ];
        let (mesh, height) = combiner.combine(&targets, 0.0, false)?;
        assert!(height.is_none());
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.vertices[3], Vec3::new(5.0, 1.0, 0.0));
        assert_eq!(mesh.bounds.max, Vec3::new(6.0, 1.0, 1.0));
        Ok(())
    }

    #[test]
    fn test_offset_does_not_move_height_mesh() -> Result<()> {
        let combiner = MeshCombiner::new(CoordinateConvention::Preserve);
        let targets = [tri_target("a", Vec3::new(0.0, 2.0, 0.0))];
        let (mesh, height) = combiner.combine(&targets, 0.25, true)?;
        let height = height.unwrap();

        assert!(mesh.vertices.iter().all(|v| v.y == 2.25));
        assert!(height.vertices.iter().all(|v| v.y == 2.0));
        assert_eq!(mesh.bounds.min.y, 2.25);
        Ok(())
    }

    #[test]
    fn test_custom_refiner() -> Result<()> {
        let targets = [tri_target("a", Vec3::ZERO)];
        let (_, coarse) = MeshCombiner::new(CoordinateConvention::Preserve)
            .with_refiner(HeightMeshRefiner {
                max_depth: 0,
                ..Default::default()
            })
            .combine(&targets, 0.0, true)?;
        assert_eq!(coarse.unwrap().tri_count(), 1);

        let (_, fine) = MeshCombiner::new(CoordinateConvention::Preserve)
            .combine(&targets, 0.0, true)?;
        assert_eq!(fine.unwrap().tri_count(), 16);
        Ok(())
    }

    #[test]
    fn test_flip_handedness() -> Result<()> {
        let targets = [tri_target("a", Vec3::new(1.0, 0.0, 0.0))];
        let (preserved, _) = MeshCombiner::new(CoordinateConvention::Preserve)
            .combine(&targets, 0.0, false)?;
        let (flipped, height) = MeshCombiner::new(CoordinateConvention::FlipHandedness)
            .combine(&targets, 0.0, true)?;

        assert_eq!(preserved.indices, vec![0, 1, 2]);
        assert_eq!(flipped.indices, vec![0, 2, 1]);
        for (p, f) in preserved.vertices.iter().zip(&flipped.vertices) {
            assert_eq!(f.x, -p.x);
            assert_eq!(f.y, p.y);
            assert_eq!(f.z, p.z);
        }
        assert_eq!(flipped.bounds.min.x, -2.0);

        // The height mesh is never flipped
        assert!(height.unwrap().vertices.iter().all(|v| v.x >= 1.0));
        Ok(())
    }
}
