//! Mesh utilities for triangle mesh handling

use crate::{Aabb, Error, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// A simple indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriMesh {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Triangle list, 3 indices per triangle
    pub indices: Vec<u32>,
}

impl TriMesh {
    /// Creates a new empty triangle mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh and checks that the index buffer is a valid triangle list
    pub fn from_parts(vertices: Vec<Vec3>, indices: Vec<u32>) -> Result<Self> {
        let mesh = Self { vertices, indices };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn vert_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn tri_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Checks the triangle-list invariants: a multiple of 3 indices, all in range
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vert_count = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= vert_count) {
            return Err(Error::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad, vert_count
            )));
        }
        Ok(())
    }

    /// Returns the three corner positions of triangle `tri`
    pub fn triangle(&self, tri: usize) -> [Vec3; 3] {
        let i = tri * 3;
        [
            self.vertices[self.indices[i] as usize],
            self.vertices[self.indices[i + 1] as usize],
            self.vertices[self.indices[i + 2] as usize],
        ]
    }

    /// Calculates the axis-aligned bounding box of the mesh
    pub fn calculate_bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Loads a mesh from an OBJ file
    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut mesh = Self::new();

        for line in reader.lines() {
            let line = line?;
            Self::parse_obj_line(&line, &mut mesh)?;
        }

        mesh.validate()?;
        log::debug!(
            "Loaded OBJ mesh: {} vertices, {} triangles",
            mesh.vert_count(),
            mesh.tri_count()
        );
        Ok(mesh)
    }

    /// Parses OBJ content from a string
    ///
    /// # Example
    ///
    /// ```
    /// use navmesh_common::TriMesh;
    ///
    /// let obj_content = r#"
    /// v 0.0 0.0 0.0
    /// v 1.0 0.0 0.0
    /// v 0.5 1.0 0.0
    /// f 1 2 3
    /// "#;
    ///
    /// let mesh = TriMesh::from_obj_str(obj_content).unwrap();
    /// assert_eq!(mesh.vert_count(), 3);
    /// assert_eq!(mesh.tri_count(), 1);
    /// ```
    pub fn from_obj_str(content: &str) -> Result<Self> {
        let mut mesh = Self::new();

        for line in content.lines() {
            Self::parse_obj_line(line, &mut mesh)?;
        }

        mesh.validate()?;
        Ok(mesh)
    }

    /// Parses a single line from an OBJ file
    fn parse_obj_line(line: &str, mesh: &mut Self) -> Result<()> {
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let mut coord = |axis: &str| -> Result<f32> {
                    tokens
                        .next()
                        .ok_or_else(|| {
                            Error::InvalidMesh(format!("Invalid vertex: missing {} coordinate", axis))
                        })?
                        .parse::<f32>()
                        .map_err(|_| {
                            Error::InvalidMesh(format!(
                                "Invalid vertex: {} coordinate is not a number",
                                axis
                            ))
                        })
                };
                let x = coord("x")?;
                let y = coord("y")?;
                let z = coord("z")?;
                mesh.vertices.push(Vec3::new(x, y, z));
            }
            Some("f") => {
                let mut face_indices = Vec::new();

                for token in tokens {
                    let index_str = token.split('/').next().unwrap_or_default();

                    let index = index_str.parse::<i64>().map_err(|_| {
                        Error::InvalidMesh("Invalid face: vertex index is not a number".to_string())
                    })?;

                    // OBJ indices are 1-based; negative indices count back from the end
                    let resolved = if index < 0 {
                        mesh.vertices.len() as i64 + index
                    } else {
                        index - 1
                    };
                    if resolved < 0 || resolved > u32::MAX as i64 {
                        return Err(Error::InvalidMesh(format!(
                            "Invalid face: vertex index {} out of range",
                            index
                        )));
                    }

                    face_indices.push(resolved as u32);
                }

                if face_indices.len() < 3 {
                    return Err(Error::InvalidMesh(
                        "Invalid face: less than 3 vertices".to_string(),
                    ));
                }

                // Fan triangulation for polygons with more than 3 vertices
                for i in 1..(face_indices.len() - 1) {
                    mesh.indices.push(face_indices[0]);
                    mesh.indices.push(face_indices[i]);
                    mesh.indices.push(face_indices[i + 1]);
                }
            }
            _ => {
                // Skip normals, texture coordinates, comments, groups
            }
        }

        Ok(())
    }

    /// Renders the mesh as Wavefront OBJ text
    ///
    /// Floats use Rust's shortest round-trip formatting, so reading the text
    /// back reproduces every coordinate exactly.
    pub fn to_obj_string(&self, name: &str) -> String {
        let mut out = String::with_capacity(self.vertices.len() * 32 + self.indices.len() * 8);
        let _ = writeln!(out, "o {}", name);
        for v in &self.vertices {
            let _ = writeln!(out, "v {:?} {:?} {:?}", v.x, v.y, v.z);
        }
        for tri in self.indices.chunks_exact(3) {
            let _ = writeln!(out, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1);
        }
        out
    }

    /// Writes the mesh to an OBJ file, replacing any existing file
    pub fn save_obj<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.to_obj_string(name).as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_obj_str_simple_triangle() {
        let obj = r#"
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.5 1.0 0.0
f 1 2 3
"#;
        let mesh = TriMesh::from_obj_str(obj).unwrap();
        assert_eq!(mesh.vert_count(), 3);
        assert_eq!(mesh.tri_count(), 1);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_from_obj_str_quad_triangulation() {
        let obj = r#"
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3 4
"#;
        let mesh = TriMesh::from_obj_str(obj).unwrap();
        assert_eq!(mesh.tri_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_from_obj_str_with_texture_coords_and_normals() {
        let obj = r#"
# comment
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.5 1.0 0.0
vt 0.0 0.0
vn 0.0 0.0 1.0
f 1/1/1 2//1 -1
"#;
        let mesh = TriMesh::from_obj_str(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_from_obj_str_invalid_input() {
        assert!(TriMesh::from_obj_str("v 0.0 0.0").is_err());
        assert!(TriMesh::from_obj_str("v 0 0 0\nv 1 0 0\nf 1 2").is_err());
        // Index past the vertex buffer
        assert!(TriMesh::from_obj_str("v 0 0 0\nv 1 0 0\nv 0 0 1\nf 1 2 4").is_err());
    }

    #[test]
    fn test_validate() {
        let verts = vec![Vec3::ZERO, Vec3::X, Vec3::Z];
        assert!(TriMesh::from_parts(verts.clone(), vec![0, 1, 2]).is_ok());
        assert!(matches!(
            TriMesh::from_parts(verts.clone(), vec![0, 1]),
            Err(Error::InvalidMesh(_))
        ));
        assert!(matches!(
            TriMesh::from_parts(verts, vec![0, 1, 3]),
            Err(Error::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_obj_text_is_lossless() -> Result<()> {
        let mesh = TriMesh::from_parts(
            vec![
                Vec3::new(0.1, -2.75, 1.0 / 3.0),
                Vec3::new(1e-7, 12345.678, -0.0),
                Vec3::new(3.0, 0.2, 7.5),
            ],
            vec![0, 2, 1],
        )?;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mesh.obj");
        mesh.save_obj(&path, "height")?;

        let loaded = TriMesh::from_obj(&path)?;
        assert_eq!(loaded, mesh);
        Ok(())
    }
}
