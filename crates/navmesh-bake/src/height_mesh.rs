//! Height mesh refinement
//!
//! The height mesh is the combined input geometry with long triangles split
//! so that height lookups along it stay close to the source surface.

use std::collections::HashMap;

use glam::Vec3;

use crate::combiner::{CombinedMesh, HeightMesh};

/// Default welding distance
pub const DEFAULT_WELD_TOLERANCE: f32 = 0.001;
/// Default longest edge left unsplit
pub const DEFAULT_MAX_EDGE_LENGTH: f32 = 0.5;
/// Default subdivision depth limit
pub const DEFAULT_MAX_DEPTH: u32 = 4;

/// Subdivides and welds a combined mesh into a height mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightMeshRefiner {
    pub weld_tolerance: f32,
    pub max_edge_length: f32,
    pub max_depth: u32,
}

impl Default for HeightMeshRefiner {
    fn default() -> Self {
        Self {
            weld_tolerance: DEFAULT_WELD_TOLERANCE,
            max_edge_length: DEFAULT_MAX_EDGE_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

struct Subdivider<'a> {
    refiner: &'a HeightMeshRefiner,
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    midpoints: HashMap<(u32, u32), u32>,
}

impl Subdivider<'_> {
    fn midpoint(&mut self, a: u32, b: u32) -> u32 {
        let key = (a.min(b), a.max(b));
        if let Some(&m) = self.midpoints.get(&key) {
            return m;
        }
        let p = (self.vertices[key.0 as usize] + self.vertices[key.1 as usize]) * 0.5;
        let m = self.vertices.len() as u32;
        self.vertices.push(p);
        self.midpoints.insert(key, m);
        m
    }

    fn split(&mut self, a: u32, b: u32, c: u32, depth: u32) {
        let (pa, pb, pc) = (
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        );
        let longest = pa
            .distance(pb)
            .max(pb.distance(pc))
            .max(pc.distance(pa));

        if longest <= self.refiner.max_edge_length || depth >= self.refiner.max_depth {
            self.indices.extend_from_slice(&[a, b, c]);
            return;
        }

        let ab = self.midpoint(a, b);
        let bc = self.midpoint(b, c);
        let ca = self.midpoint(c, a);
        self.split(a, ab, ca, depth + 1);
        self.split(ab, b, bc, depth + 1);
        self.split(ca, bc, c, depth + 1);
        self.split(ab, bc, ca, depth + 1);
    }
}

impl HeightMeshRefiner {
    /// Refines `mesh` into a new height mesh; the input is left untouched
    pub fn refine(&self, mesh: &CombinedMesh) -> HeightMesh {
        let mut sub = Subdivider {
            refiner: self,
            vertices: mesh.vertices.clone(),
            indices: Vec::with_capacity(mesh.indices.len()),
            midpoints: HashMap::new(),
        };
        for tri in mesh.indices.chunks_exact(3) {
            sub.split(tri[0], tri[1], tri[2], 0);
        }

        let remap = self.weld(&sub.vertices);

        let mut indices = Vec::with_capacity(sub.indices.len());
        for tri in sub.indices.chunks_exact(3) {
            let (a, b, c) = (remap[tri[0] as usize], remap[tri[1] as usize], remap[tri[2] as usize]);
            if a == b || b == c || c == a {
                continue;
            }
            indices.extend_from_slice(&[a, b, c]);
        }

        // Drop vertices no triangle references, keeping the original order
        let mut compact = vec![u32::MAX; sub.vertices.len()];
        for &i in &indices {
            compact[i as usize] = 0;
        }
        let mut vertices = Vec::new();
        for (i, slot) in compact.iter_mut().enumerate() {
            if *slot == 0 {
                *slot = vertices.len() as u32;
                vertices.push(sub.vertices[i]);
            }
        }
        for i in &mut indices {
            *i = compact[*i as usize];
        }

        let mut refined = CombinedMesh {
            vertices,
            indices,
            ..Default::default()
        };
        refined.recalculate_bounds();
        refined
    }

    /// Maps every vertex to the earliest vertex within the weld tolerance
    fn weld(&self, vertices: &[Vec3]) -> Vec<u32> {
        let tolerance = self.weld_tolerance;
        if tolerance <= 0.0 {
            return (0..vertices.len() as u32).collect();
        }

        let cell = |p: Vec3| {
            let c = (p / tolerance).floor();
            (c.x as i64, c.y as i64, c.z as i64)
        };
        let tolerance_sq = tolerance * tolerance;
        let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
        let mut remap = Vec::with_capacity(vertices.len());

        for (i, &p) in vertices.iter().enumerate() {
            let (cx, cy, cz) = cell(p);
            let mut found: Option<u32> = None;
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                            continue;
                        };
                        for &j in bucket {
                            if vertices[j as usize].distance_squared(p) <= tolerance_sq
                                && found.map_or(true, |f| j < f)
                            {
                                found = Some(j);
                            }
                        }
                    }
                }
            }

            match found {
                Some(j) => remap.push(j),
                None => {
                    grid.entry((cx, cy, cz)).or_default().push(i as u32);
                    remap.push(i as u32);
                }
            }
        }
        remap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(vertices: Vec<Vec3>, indices: Vec<u32>) -> CombinedMesh {
        let mut mesh = CombinedMesh {
            vertices,
            indices,
            ..Default::default()
        };
        mesh.recalculate_bounds();
        mesh
    }

    #[test]
    fn test_small_triangle_is_kept() {
        let input = mesh(
            vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 0.3), Vec3::new(0.3, 0.0, 0.0)],
            vec![0, 1, 2],
        );
        let refined = HeightMeshRefiner::default().refine(&input);
        assert_eq!(refined, input);
    }

    #[test]
    fn test_long_triangle_is_subdivided() {
        let input = mesh(vec![Vec3::ZERO, Vec3::Z, Vec3::X], vec![0, 1, 2]);
        let refined = HeightMeshRefiner::default().refine(&input);

        // Two levels: edges of 1.0 and 1.41 end below 0.5
        assert_eq!(refined.tri_count(), 16);
        assert_eq!(refined.vertices.len(), 15);
        assert_eq!(&refined.vertices[..3], &input.vertices[..]);
        assert_eq!(refined.bounds, input.bounds);
        for tri in 0..refined.tri_count() {
            let [a, b, c] = refined.triangle(tri);
            assert!(a.distance(b).max(b.distance(c)).max(c.distance(a)) <= 0.5);
        }
    }

    #[test]
    fn test_depth_limit() {
        let refiner = HeightMeshRefiner {
            max_depth: 1,
            ..Default::default()
        };
        let input = mesh(
            vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), Vec3::new(10.0, 0.0, 0.0)],
            vec![0, 1, 2],
        );
        let refined = refiner.refine(&input);
        assert_eq!(refined.tri_count(), 4);
        assert_eq!(refined.vertices.len(), 6);
    }

    #[test]
    fn test_weld_shared_edge() {
        let offset = Vec3::new(0.0, 0.0005, 0.0);
        let input = mesh(
            vec![
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, 0.3),
                Vec3::new(0.3, 0.0, 0.0),
                Vec3::new(0.3, 0.0, 0.0) + offset,
                Vec3::new(0.0, 0.0, 0.3) + offset,
                Vec3::new(0.3, 0.0, 0.3),
            ],
            vec![0, 1, 2, 3, 4, 5],
        );
        let refined = HeightMeshRefiner::default().refine(&input);
        assert_eq!(refined.vertices.len(), 4);
        assert_eq!(refined.indices, vec![0, 1, 2, 2, 1, 3]);
        // The earliest vertex keeps its exact position
        assert_eq!(refined.vertices[2], Vec3::new(0.3, 0.0, 0.0));
    }

    #[test]
    fn test_degenerate_triangles_dropped() {
        let input = mesh(
            vec![
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, 0.0002),
                Vec3::new(0.3, 0.0, 0.0),
                Vec3::new(5.0, 0.0, 5.0),
                Vec3::new(5.0, 0.0, 5.3),
                Vec3::new(5.3, 0.0, 5.0),
            ],
            vec![0, 1, 2, 3, 4, 5],
        );
        let refined = HeightMeshRefiner::default().refine(&input);
        assert_eq!(refined.tri_count(), 1);
        assert_eq!(refined.vertices.len(), 3);
        assert_eq!(refined.vertices[0], Vec3::new(5.0, 0.0, 5.0));
        assert_eq!(refined.indices, vec![0, 1, 2]);
    }
}
