//! Triangle meshes for collider primitives and heightmap terrain
//!
//! All meshes are generated in the owning node's local space; the collider
//! center is baked into the vertices.

use std::f32::consts::PI;

use glam::Vec3;

use navmesh_common::{Error, Result, TriMesh};

/// Longitude segments of sphere and capsule meshes
pub const SPHERE_SEGMENTS: usize = 16;
/// Latitude rings of sphere meshes
pub const SPHERE_RINGS: usize = 12;
/// Longitude segments of capsule meshes
pub const CAPSULE_SEGMENTS: usize = 16;
/// Latitude rings of capsule meshes, split between the two caps
pub const CAPSULE_RINGS: usize = 8;
/// Terrain heightmap sampling step
pub const TERRAIN_SAMPLE_STEP: usize = 2;

/// Box as 8 corners and 12 triangles
pub fn box_mesh(center: Vec3, size: Vec3) -> TriMesh {
    let h = size * 0.5;
    let vertices = vec![
        // Bottom
        center + Vec3::new(-h.x, -h.y, -h.z),
        center + Vec3::new(h.x, -h.y, -h.z),
        center + Vec3::new(h.x, -h.y, h.z),
        center + Vec3::new(-h.x, -h.y, h.z),
        // Top
        center + Vec3::new(-h.x, h.y, -h.z),
        center + Vec3::new(h.x, h.y, -h.z),
        center + Vec3::new(h.x, h.y, h.z),
        center + Vec3::new(-h.x, h.y, h.z),
    ];

    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2, // bottom
        4, 5, 6, 4, 6, 7, // top
        0, 1, 5, 0, 5, 4, // front
        2, 3, 7, 2, 7, 6, // back
        0, 4, 7, 0, 7, 3, // left
        1, 2, 6, 1, 6, 5, // right
    ];

    TriMesh { vertices, indices }
}

/// Appends the quads between consecutive rows of a `(segments + 1)`-wide lat/long grid
fn push_grid_quads(indices: &mut Vec<u32>, start: usize, rows: usize, segments: usize) {
    for row in 0..rows {
        for lon in 0..segments {
            let first = (start + row * (segments + 1) + lon) as u32;
            let second = first + segments as u32 + 1;
            indices.extend_from_slice(&[first, second, first + 1, second, second + 1, first + 1]);
        }
    }
}

/// Point on a unit sphere at latitude index `lat` of `rings`, longitude `lon` of `segments`
fn sphere_point(lat: usize, rings: usize, lon: usize, segments: usize) -> Vec3 {
    let theta = lat as f32 * PI / rings as f32;
    let phi = lon as f32 * 2.0 * PI / segments as f32;
    Vec3::new(phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin())
}

/// UV sphere with [`SPHERE_SEGMENTS`] x [`SPHERE_RINGS`] quads
pub fn sphere_mesh(center: Vec3, radius: f32) -> TriMesh {
    let (segments, rings) = (SPHERE_SEGMENTS, SPHERE_RINGS);
    let mut vertices = Vec::with_capacity((rings + 1) * (segments + 1));
    for lat in 0..=rings {
        for lon in 0..=segments {
            vertices.push(sphere_point(lat, rings, lon, segments) * radius + center);
        }
    }

    let mut indices = Vec::with_capacity(rings * segments * 6);
    push_grid_quads(&mut indices, 0, rings, segments);
    TriMesh { vertices, indices }
}

/// Maps a Y-up capsule vertex onto the capsule's axis (0 = X, 1 = Y, 2 = Z)
fn orient_capsule(v: Vec3, direction: u8) -> Vec3 {
    match direction {
        0 => Vec3::new(v.y, v.z, v.x),
        2 => Vec3::new(v.x, v.z, v.y),
        _ => v,
    }
}

/// Capsule built from a top cap, a cylinder band and a bottom cap.
///
/// `height` is the full tip-to-tip length; it is clamped to at least the
/// diameter.
pub fn capsule_mesh(center: Vec3, radius: f32, height: f32, direction: u8) -> TriMesh {
    let (segments, rings) = (CAPSULE_SEGMENTS, CAPSULE_RINGS);
    let half_cylinder = (height - 2.0 * radius).max(0.0) / 2.0;
    let mut vertices = Vec::new();

    let mut push = |v: Vec3| vertices.push(orient_capsule(v, direction) + center);

    for lat in 0..=rings / 2 {
        for lon in 0..=segments {
            let p = sphere_point(lat, rings, lon, segments) * radius;
            push(p + Vec3::new(0.0, half_cylinder, 0.0));
        }
    }
    let top_count = (rings / 2 + 1) * (segments + 1);

    for y in [half_cylinder, -half_cylinder] {
        for lon in 0..=segments {
            let phi = lon as f32 * 2.0 * PI / segments as f32;
            push(Vec3::new(phi.cos() * radius, y, phi.sin() * radius));
        }
    }
    let cylinder_count = 2 * (segments + 1);

    for lat in rings / 2..=rings {
        for lon in 0..=segments {
            let p = sphere_point(lat, rings, lon, segments) * radius;
            push(p - Vec3::new(0.0, half_cylinder, 0.0));
        }
    }

    let mut indices = Vec::new();
    push_grid_quads(&mut indices, 0, rings / 2, segments);
    push_grid_quads(&mut indices, top_count, 1, segments);
    push_grid_quads(&mut indices, top_count + cylinder_count, rings / 2, segments);

    TriMesh { vertices, indices }
}

/// Regular grid mesh for a heightmap terrain.
///
/// Every [`TERRAIN_SAMPLE_STEP`]th sample is used. `heights` is row-major
/// with `resolution * resolution` normalized samples, scaled by `size.y`.
pub fn terrain_mesh(resolution: usize, size: Vec3, heights: &[f32]) -> Result<TriMesh> {
    if resolution < 2 {
        return Err(Error::InvalidMesh(format!(
            "terrain heightmap resolution {} is below 2",
            resolution
        )));
    }
    if heights.len() != resolution * resolution {
        return Err(Error::InvalidMesh(format!(
            "terrain has {} height samples, expected {}",
            heights.len(),
            resolution * resolution
        )));
    }

    let step = TERRAIN_SAMPLE_STEP;
    let scale = Vec3::new(
        size.x / (resolution - 1) as f32 * step as f32,
        size.y,
        size.z / (resolution - 1) as f32 * step as f32,
    );
    let w = (resolution - 1) / step + 1;
    let h = w;

    let mut vertices = Vec::with_capacity(w * h);
    for z in 0..h {
        for x in 0..w {
            let height = heights[z * step * resolution + x * step];
            vertices.push(scale * Vec3::new(x as f32, height, z as f32));
        }
    }

    let mut indices = Vec::with_capacity((w - 1) * (h - 1) * 6);
    for z in 0..h - 1 {
        for x in 0..w - 1 {
            let i = (z * w + x) as u32;
            let below = ((z + 1) * w + x) as u32;
            indices.extend_from_slice(&[i, below, i + 1, below, below + 1, i + 1]);
        }
    }

    Ok(TriMesh { vertices, indices })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_box_mesh() {
        let mesh = box_mesh(Vec3::new(0.0, 1.0, 0.0), Vec3::new(2.0, 2.0, 4.0));
        assert_eq!(mesh.vert_count(), 8);
        assert_eq!(mesh.tri_count(), 12);
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.vertices[0], Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(mesh.vertices[6], Vec3::new(1.0, 2.0, 2.0));
        assert_eq!(&mesh.indices[..6], &[0, 2, 1, 0, 3, 2]);
    }

    #[test]
    fn test_sphere_mesh() {
        let mesh = sphere_mesh(Vec3::new(1.0, 0.0, 0.0), 2.0);
        assert_eq!(mesh.vert_count(), 13 * 17);
        assert_eq!(mesh.tri_count(), 12 * 16 * 2);
        assert!(mesh.validate().is_ok());
        assert_close(mesh.vertices[0], Vec3::new(1.0, 2.0, 0.0));
        assert_close(*mesh.vertices.last().unwrap(), Vec3::new(1.0, -2.0, 0.0));
        for v in &mesh.vertices {
            assert!(((*v - Vec3::X).length() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_capsule_mesh_axes() {
        let y = capsule_mesh(Vec3::ZERO, 0.5, 3.0, 1);
        assert!(y.validate().is_ok());
        assert_eq!(y.vert_count(), (5 + 2 + 5) * 17);
        assert_eq!(y.tri_count(), (4 + 1 + 4) * 16 * 2);
        let bounds = y.calculate_bounds();
        assert!((bounds.max.y - 1.5).abs() < 1e-5);
        assert!((bounds.min.y + 1.5).abs() < 1e-5);

        let x = capsule_mesh(Vec3::ZERO, 0.5, 3.0, 0);
        let bounds = x.calculate_bounds();
        assert!((bounds.max.x - 1.5).abs() < 1e-5);
        assert!(bounds.max.y <= 0.5 + 1e-5);

        let z = capsule_mesh(Vec3::ZERO, 0.5, 3.0, 2);
        let bounds = z.calculate_bounds();
        assert!((bounds.max.z - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_short_capsule_is_a_sphere() {
        let mesh = capsule_mesh(Vec3::ZERO, 1.0, 0.5, 1);
        let bounds = mesh.calculate_bounds();
        assert!((bounds.max.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_terrain_mesh_downsamples() -> Result<()> {
        // 5x5 samples -> 3x3 grid
        let res = 5;
        let heights: Vec<f32> = (0..res * res).map(|i| (i % res) as f32 / 4.0).collect();
        let mesh = terrain_mesh(res, Vec3::new(8.0, 10.0, 8.0), &heights)?;
        assert_eq!(mesh.vert_count(), 9);
        assert_eq!(mesh.tri_count(), 8);
        assert_eq!(mesh.vertices[0], Vec3::ZERO);
        // x = 1 samples column 2, normalized 0.5
        assert_eq!(mesh.vertices[1], Vec3::new(4.0, 5.0, 0.0));
        assert_eq!(mesh.vertices[8], Vec3::new(8.0, 10.0, 8.0));
        assert_eq!(&mesh.indices[..6], &[0, 3, 1, 3, 4, 1]);
        Ok(())
    }

    #[test]
    fn test_terrain_rejects_bad_samples() {
        assert!(terrain_mesh(1, Vec3::ONE, &[0.0]).is_err());
        assert!(terrain_mesh(3, Vec3::ONE, &[0.0; 8]).is_err());
    }
}
