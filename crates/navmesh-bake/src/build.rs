//! Navmesh build adapters
//!
//! [`NavMeshBuildAdapter`] is the seam to the voxelization and
//! polygonization library. [`TriangleNavMeshBuilder`] is a reference adapter
//! that turns every walkable input triangle into one polygon, so the bake
//! pipeline works without a native build library.

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;

use navmesh_common::Aabb;
use navmesh_format::{
    ilog2, next_pow2, BvNode, MeshTile, NavMeshParams, Poly, PolyDetail, TiledNavMesh,
    DT_EXT_LINK, DT_POLYTYPE_GROUND,
};

use crate::combiner::CombinedMesh;
use crate::settings::BuildSettings;

/// Flags given to every generated polygon
pub const WALKABLE_POLY_FLAGS: u16 = 1;
/// Area id given to every generated polygon
pub const WALKABLE_AREA: u8 = 63;

/// Tile index bits never exceed this, leaving room for salt and poly bits
const MAX_TILE_BITS: u32 = 14;
/// Tile plus poly bits of a reference
const REF_INDEX_BITS: u32 = 22;
/// Detail triangle flags with every edge on the polygon boundary
const DETAIL_TRI_BOUNDARY_EDGES: u8 = 0x15;
/// Internal neighbor ids are `index + 1` and must stay below `DT_EXT_LINK`
const MAX_TILE_POLYS: usize = (DT_EXT_LINK - 1) as usize;

/// Build failures reported by an adapter
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("none of the {0} input triangles is walkable")]
    NoWalkableGeometry(usize),

    #[error("invalid build input: {0}")]
    InvalidInput(String),

    #[error("tile ({x}, {y}) has {count} polygons, the limit is {limit}")]
    TooManyPolys {
        x: i32,
        y: i32,
        count: usize,
        limit: usize,
    },

    #[error("tile ({x}, {y}) has {count} vertices, the limit is {limit}")]
    TooManyVerts {
        x: i32,
        y: i32,
        count: usize,
        limit: usize,
    },

    #[error("{count} tiles exceed the limit of {limit}")]
    TooManyTiles { count: usize, limit: usize },

    #[error("navmesh assembly failed: {0}")]
    Format(#[from] navmesh_common::Error),
}

impl From<BuildError> for navmesh_common::Error {
    fn from(err: BuildError) -> Self {
        navmesh_common::Error::Build(err.to_string())
    }
}

/// Builds a tiled navmesh from combined input geometry
pub trait NavMeshBuildAdapter {
    fn build(
        &self,
        mesh: &CombinedMesh,
        settings: &BuildSettings,
    ) -> std::result::Result<TiledNavMesh, BuildError>;
}

/// One polygon per walkable triangle, bucketed into a regular tile grid
#[derive(Debug, Clone, Copy, Default)]
pub struct TriangleNavMeshBuilder;

impl TriangleNavMeshBuilder {
    pub fn new() -> Self {
        Self
    }
}

/// Tile grid laid over the XZ extent of the input
#[derive(Debug, Clone, Copy)]
struct TileGrid {
    origin: Vec3,
    tile_world: f32,
    width: i32,
    height: i32,
}

impl TileGrid {
    fn new(bounds: &Aabb, settings: &BuildSettings) -> Self {
        let extent = bounds.size();
        let tile_world = if settings.tiled {
            settings.tile_size as f32 * settings.cell_size
        } else {
            extent.x.max(extent.z).max(settings.cell_size)
        };
        let cells = |len: f32| ((len / tile_world).ceil() as i32).max(1);
        Self {
            origin: bounds.min,
            tile_world,
            width: cells(extent.x),
            height: cells(extent.z),
        }
    }

    /// Tile containing `p`, clamped to the grid
    fn locate(&self, p: Vec3) -> (i32, i32) {
        let x = ((p.x - self.origin.x) / self.tile_world).floor() as i32;
        let y = ((p.z - self.origin.z) / self.tile_world).floor() as i32;
        (x.clamp(0, self.width - 1), y.clamp(0, self.height - 1))
    }

    fn tile_count(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

type EdgeKey = ([u32; 3], [u32; 3]);

fn position_key(v: Vec3) -> [u32; 3] {
    [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
}

fn edge_key(a: Vec3, b: Vec3) -> EdgeKey {
    let (ka, kb) = (position_key(a), position_key(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

/// Portal direction towards a neighboring tile, x axis first
fn portal_side(from: (i32, i32), to: (i32, i32)) -> u16 {
    if to.0 > from.0 {
        0
    } else if to.0 < from.0 {
        4
    } else if to.1 > from.1 {
        2
    } else {
        6
    }
}

fn is_walkable(tri: &[Vec3; 3], min_normal_y: f32) -> bool {
    let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
    let len = n.length();
    len > f32::EPSILON && n.y >= min_normal_y * len
}

impl NavMeshBuildAdapter for TriangleNavMeshBuilder {
    fn build(
        &self,
        mesh: &CombinedMesh,
        settings: &BuildSettings,
    ) -> std::result::Result<TiledNavMesh, BuildError> {
        settings
            .validate()
            .map_err(|e| BuildError::InvalidInput(e.to_string()))?;
        if mesh.indices.len() % 3 != 0 {
            return Err(BuildError::InvalidInput(format!(
                "index count {} is not a multiple of 3",
                mesh.indices.len()
            )));
        }
        if let Some(bad) = mesh
            .indices
            .iter()
            .find(|&&i| i as usize >= mesh.vertices.len())
        {
            return Err(BuildError::InvalidInput(format!(
                "index {} out of range for {} vertices",
                bad,
                mesh.vertices.len()
            )));
        }

        let min_normal_y = settings.agent_max_slope.to_radians().cos();
        let walkable: Vec<[Vec3; 3]> = (0..mesh.tri_count())
            .map(|t| mesh.triangle(t))
            .filter(|tri| is_walkable(tri, min_normal_y))
            .collect();
        if walkable.is_empty() {
            return Err(BuildError::NoWalkableGeometry(mesh.tri_count()));
        }
        log::debug!(
            "{} of {} triangles are walkable",
            walkable.len(),
            mesh.tri_count()
        );

        let bounds = Aabb::from_points(walkable.iter().flatten());
        let grid = TileGrid::new(&bounds, settings);

        // Tiles keyed (y, x) so they are added row by row
        let mut buckets: BTreeMap<(i32, i32), Vec<usize>> = BTreeMap::new();
        let mut tile_of = Vec::with_capacity(walkable.len());
        for (i, tri) in walkable.iter().enumerate() {
            let centroid = (tri[0] + tri[1] + tri[2]) / 3.0;
            let (x, y) = grid.locate(centroid);
            buckets.entry((y, x)).or_default().push(i);
            tile_of.push((x, y));
        }

        let grid_tiles = grid.tile_count().min(1 << MAX_TILE_BITS) as i32;
        let tile_bits = ilog2(next_pow2(grid_tiles)).min(MAX_TILE_BITS);
        let poly_bits = REF_INDEX_BITS - tile_bits;
        let params = NavMeshParams {
            origin: grid.origin.to_array(),
            tile_width: grid.tile_world,
            tile_height: grid.tile_world,
            max_tiles: 1 << tile_bits,
            max_polys: 1 << poly_bits,
        };
        if buckets.len() > params.max_tiles as usize {
            return Err(BuildError::TooManyTiles {
                count: buckets.len(),
                limit: params.max_tiles as usize,
            });
        }

        // Which tiles touch each edge, for portal detection
        let mut edge_tiles: HashMap<EdgeKey, Vec<(i32, i32)>> = HashMap::new();
        for (i, tri) in walkable.iter().enumerate() {
            for j in 0..3 {
                let owners = edge_tiles.entry(edge_key(tri[j], tri[(j + 1) % 3])).or_default();
                if !owners.contains(&tile_of[i]) {
                    owners.push(tile_of[i]);
                }
            }
        }

        let mut nav_mesh = TiledNavMesh::new(params, settings.verts_per_poly)?;
        for ((y, x), tris) in &buckets {
            let tile = build_tile(
                (*x, *y),
                tris.iter().map(|&i| &walkable[i]),
                &edge_tiles,
                &params,
                settings,
            )?;
            nav_mesh.add_tile(tile)?;
        }

        log::info!(
            "Built navmesh: {} tiles, {} polygons, tile size {}",
            nav_mesh.tile_count(),
            walkable.len(),
            grid.tile_world
        );
        Ok(nav_mesh)
    }
}

fn build_tile<'a>(
    (x, y): (i32, i32),
    tris: impl Iterator<Item = &'a [Vec3; 3]>,
    edge_tiles: &HashMap<EdgeKey, Vec<(i32, i32)>>,
    params: &NavMeshParams,
    settings: &BuildSettings,
) -> std::result::Result<MeshTile, BuildError> {
    let mut tile = MeshTile::new(x, y, 0);
    let mut vert_lookup: HashMap<[u32; 3], u16> = HashMap::new();
    let mut positions: Vec<Vec3> = Vec::new();
    let mut vert_overflow = 0usize;

    for tri in tris {
        let mut poly = Poly::new(settings.verts_per_poly);
        for (slot, &p) in tri.iter().enumerate() {
            let index = match vert_lookup.get(&position_key(p)) {
                Some(&index) => index,
                None => {
                    if positions.len() > u16::MAX as usize {
                        vert_overflow += 1;
                        0
                    } else {
                        let index = positions.len() as u16;
                        vert_lookup.insert(position_key(p), index);
                        positions.push(p);
                        index
                    }
                }
            };
            poly.verts[slot] = index;
        }
        poly.vert_count = 3;
        poly.flags = WALKABLE_POLY_FLAGS;
        poly.set_area(WALKABLE_AREA);
        poly.set_type(DT_POLYTYPE_GROUND);
        tile.polys.push(poly);
    }

    if vert_overflow > 0 {
        return Err(BuildError::TooManyVerts {
            x,
            y,
            count: positions.len() + vert_overflow,
            limit: u16::MAX as usize + 1,
        });
    }
    let poly_limit = (params.max_polys as usize).min(MAX_TILE_POLYS);
    if tile.polys.len() > poly_limit {
        return Err(BuildError::TooManyPolys {
            x,
            y,
            count: tile.polys.len(),
            limit: poly_limit,
        });
    }

    let portal_edges = connect_neighbors(&mut tile, &positions, edge_tiles)?;
    let internal_edges = tile
        .polys
        .iter()
        .flat_map(|p| p.neis[..p.vert_count as usize].iter())
        .filter(|&&n| n != 0 && n & DT_EXT_LINK == 0)
        .count();

    tile.verts = positions.iter().flat_map(|p| p.to_array()).collect();
    for i in 0..tile.polys.len() {
        tile.detail_meshes.push(PolyDetail {
            vert_base: 0,
            tri_base: i as u32,
            vert_count: 0,
            tri_count: 1,
        });
        tile.detail_tris
            .extend_from_slice(&[0, 1, 2, DETAIL_TRI_BOUNDARY_EDGES]);
    }

    let bounds = Aabb::from_points(&positions);
    let header = &mut tile.header;
    // One link per neighbor edge, plus two more per portal edge
    header.max_link_count = (internal_edges + portal_edges * 3) as i32;
    header.off_mesh_base = tile.polys.len() as i32;
    header.walkable_height = settings.agent_height;
    header.walkable_radius = settings.agent_radius;
    header.walkable_climb = settings.agent_max_climb;
    header.bmin = bounds.min.to_array();
    header.bmax = bounds.max.to_array();
    header.bv_quant_factor = 1.0 / settings.cell_size;

    tile.bv_tree = build_bv_tree(&tile, &positions);
    tile.sync_header_counts();

    log::debug!(
        "Tile ({}, {}): {} polygons, {} vertices, {} portal edges",
        x,
        y,
        tile.polys.len(),
        positions.len(),
        portal_edges
    );
    Ok(tile)
}

/// Fills polygon neighbors; returns the number of portal edges
fn connect_neighbors(
    tile: &mut MeshTile,
    positions: &[Vec3],
    edge_tiles: &HashMap<EdgeKey, Vec<(i32, i32)>>,
) -> Result<usize, BuildError> {
    let here = (tile.header.x, tile.header.y);
    let nei_of = |p: usize| {
        u16::try_from(p + 1)
            .ok()
            .filter(|&n| n & DT_EXT_LINK == 0)
            .ok_or(BuildError::TooManyPolys {
                x: here.0,
                y: here.1,
                count: p + 1,
                limit: MAX_TILE_POLYS,
            })
    };
    let mut edges: HashMap<(u16, u16), Vec<(usize, usize)>> = HashMap::new();
    for (p, poly) in tile.polys.iter().enumerate() {
        for e in 0..3 {
            let (a, b) = (poly.verts[e], poly.verts[(e + 1) % 3]);
            edges.entry((a.min(b), a.max(b))).or_default().push((p, e));
        }
    }

    for users in edges.values() {
        if let &[(p0, e0), (p1, e1), ..] = users.as_slice() {
            tile.polys[p0].neis[e0] = nei_of(p1)?;
            tile.polys[p1].neis[e1] = nei_of(p0)?;
        }
    }

    let mut portals = 0;
    for poly in &mut tile.polys {
        for e in 0..3 {
            if poly.neis[e] != 0 {
                continue;
            }
            let a = positions[poly.verts[e] as usize];
            let b = positions[poly.verts[(e + 1) % 3] as usize];
            let other = edge_tiles
                .get(&edge_key(a, b))
                .and_then(|owners| owners.iter().find(|&&t| t != here));
            if let Some(&other) = other {
                poly.neis[e] = DT_EXT_LINK | portal_side(here, other);
                portals += 1;
            }
        }
    }
    Ok(portals)
}

#[derive(Clone, Copy)]
struct BvItem {
    bmin: [u16; 3],
    bmax: [u16; 3],
    poly: i32,
}

fn quantize(v: f32, origin: f32, factor: f32, round_up: bool) -> u16 {
    let q = (v - origin) * factor;
    let q = if round_up { q.ceil() } else { q.floor() };
    q.clamp(0.0, u16::MAX as f32) as u16
}

/// Quantized bounding volume tree in Detour's flattened layout.
///
/// Leaves store the polygon index; internal nodes store the negated size
/// of their subtree so a query can skip it.
fn build_bv_tree(tile: &MeshTile, positions: &[Vec3]) -> Vec<BvNode> {
    let factor = tile.header.bv_quant_factor;
    let origin = tile.header.bmin;
    let mut items: Vec<BvItem> = tile
        .polys
        .iter()
        .enumerate()
        .map(|(i, poly)| {
            let bounds = Aabb::from_points(
                poly.verts[..poly.vert_count as usize]
                    .iter()
                    .map(|&v| &positions[v as usize]),
            );
            let (lo, hi) = (bounds.min.to_array(), bounds.max.to_array());
            BvItem {
                bmin: [0, 1, 2].map(|k| quantize(lo[k], origin[k], factor, false)),
                bmax: [0, 1, 2].map(|k| quantize(hi[k], origin[k], factor, true)),
                poly: i as i32,
            }
        })
        .collect();

    let mut nodes = Vec::with_capacity(items.len() * 2);
    subdivide(&mut items, &mut nodes);
    nodes
}

fn subdivide(items: &mut [BvItem], nodes: &mut Vec<BvNode>) {
    let current = nodes.len();
    if let [item] = items {
        nodes.push(BvNode {
            bmin: item.bmin,
            bmax: item.bmax,
            i: item.poly,
        });
        return;
    }

    let mut bmin = [u16::MAX; 3];
    let mut bmax = [0u16; 3];
    for item in items.iter() {
        for k in 0..3 {
            bmin[k] = bmin[k].min(item.bmin[k]);
            bmax[k] = bmax[k].max(item.bmax[k]);
        }
    }
    nodes.push(BvNode { bmin, bmax, i: 0 });

    let span = [0, 1, 2].map(|k| bmax[k] - bmin[k]);
    let mut axis = 0;
    if span[1] > span[axis] {
        axis = 1;
    }
    if span[2] > span[axis] {
        axis = 2;
    }
    items.sort_by_key(|item| item.bmin[axis]);

    let (left, right) = items.split_at_mut(items.len() / 2);
    subdivide(left, nodes);
    subdivide(right, nodes);

    let escape = (nodes.len() - current) as i32;
    nodes[current].i = -escape;
}

#[cfg(test)]
mod tests {
    use super::*;
    use navmesh_common::{Error, ErrorKind};

    /// Unit quads along +X, two triangles each, facing up
    fn strip(cells: u32) -> CombinedMesh {
        let mut vertices = Vec::new();
        for x in 0..=cells {
            vertices.push(Vec3::new(x as f32, 0.0, 0.0));
            vertices.push(Vec3::new(x as f32, 0.0, 1.0));
        }
        let mut indices = Vec::new();
        for x in 0..cells {
            let (a, b, c, d) = (x * 2, x * 2 + 1, x * 2 + 3, x * 2 + 2);
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
        let mut mesh = CombinedMesh {
            vertices,
            indices,
            ..Default::default()
        };
        mesh.recalculate_bounds();
        mesh
    }

    /// `cells` x `cells` unit quads on the XZ plane, facing up
    fn grid(cells: u32) -> CombinedMesh {
        let row = cells + 1;
        let mut vertices = Vec::new();
        for z in 0..=cells {
            for x in 0..=cells {
                vertices.push(Vec3::new(x as f32, 0.0, z as f32));
            }
        }
        let mut indices = Vec::new();
        for z in 0..cells {
            for x in 0..cells {
                let a = z * row + x;
                let (b, c, d) = (a + row, a + row + 1, a + 1);
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }
        let mut mesh = CombinedMesh {
            vertices,
            indices,
            ..Default::default()
        };
        mesh.recalculate_bounds();
        mesh
    }

    fn unit_tiles() -> BuildSettings {
        BuildSettings {
            cell_size: 0.5,
            tile_size: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_quad() -> Result<(), BuildError> {
        let nav_mesh = TriangleNavMeshBuilder.build(&strip(1), &BuildSettings::default())?;
        assert_eq!(nav_mesh.tile_count(), 1);
        assert_eq!(nav_mesh.params().max_tiles, 1);
        assert_eq!(nav_mesh.params().max_polys, 1 << 22);

        let tile = nav_mesh.tile_at(0, 0, 0).unwrap();
        assert_eq!(tile.polys.len(), 2);
        assert_eq!(tile.verts.len(), 4 * 3);
        assert_eq!(tile.polys[0].neis, vec![0, 0, 2, 0, 0, 0]);
        assert_eq!(tile.polys[1].neis, vec![1, 0, 0, 0, 0, 0]);
        assert_eq!(tile.polys[0].flags, WALKABLE_POLY_FLAGS);
        assert_eq!(tile.polys[0].area(), WALKABLE_AREA);
        assert_eq!(tile.header.max_link_count, 2);
        assert_eq!(tile.links.len(), 2);
        assert_eq!(tile.header.off_mesh_base, 2);
        assert_eq!(tile.detail_tris, vec![0, 1, 2, 0x15, 0, 1, 2, 0x15]);
        assert_eq!(tile.detail_meshes[1].tri_base, 1);
        assert_eq!(tile.header.bv_quant_factor, 1.0 / 0.1);

        assert_eq!(tile.bv_tree.len(), 3);
        assert_eq!(tile.bv_tree[0].i, -3);
        let mut leaves: Vec<i32> = tile.bv_tree[1..].iter().map(|n| n.i).collect();
        leaves.sort();
        assert_eq!(leaves, vec![0, 1]);
        assert_eq!(tile.bv_tree[0].bmax, [10, 0, 10]);
        Ok(())
    }

    #[test]
    fn test_tiles_and_portals() -> Result<(), BuildError> {
        let nav_mesh = TriangleNavMeshBuilder.build(&strip(4), &unit_tiles())?;
        assert_eq!(nav_mesh.tile_count(), 4);
        assert_eq!(nav_mesh.params().tile_width, 1.0);
        assert_eq!(nav_mesh.params().max_tiles, 4);
        assert_eq!(nav_mesh.params().max_polys, 1 << 20);

        let first = nav_mesh.tile_at(0, 0, 0).unwrap();
        assert_eq!(first.polys.len(), 2);
        assert_eq!(first.polys[1].neis[..3], [1, DT_EXT_LINK, 0]);
        assert_eq!(first.header.max_link_count, 5);

        let second = nav_mesh.tile_at(1, 0, 0).unwrap();
        assert_eq!(second.polys[0].neis[..3], [DT_EXT_LINK | 4, 0, 2]);
        assert_eq!(second.polys[1].neis[..3], [1, DT_EXT_LINK, 0]);
        assert_eq!(second.header.bmin, [1.0, 0.0, 0.0]);

        let last = nav_mesh.tile_at(3, 0, 0).unwrap();
        assert_eq!(last.polys[1].neis[..3], [1, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_untiled_builds_one_tile() -> Result<(), BuildError> {
        let settings = BuildSettings {
            tiled: false,
            ..unit_tiles()
        };
        let nav_mesh = TriangleNavMeshBuilder.build(&strip(4), &settings)?;
        assert_eq!(nav_mesh.tile_count(), 1);
        assert_eq!(nav_mesh.params().tile_width, 4.0);
        let tile = nav_mesh.tile_at(0, 0, 0).unwrap();
        assert_eq!(tile.polys.len(), 8);
        assert_eq!(tile.verts.len(), 10 * 3);
        assert_eq!(tile.bv_tree.len(), 15);
        assert_eq!(tile.bv_tree[0].i, -15);
        assert!(tile
            .polys
            .iter()
            .all(|p| p.neis.iter().all(|&n| n & DT_EXT_LINK == 0)));
        Ok(())
    }

    #[test]
    fn test_large_untiled_tile_keeps_internal_neighbors() -> Result<(), BuildError> {
        let settings = BuildSettings {
            tiled: false,
            ..Default::default()
        };
        let nav_mesh = TriangleNavMeshBuilder.build(&grid(120), &settings)?;
        let tile = nav_mesh.tile_at(0, 0, 0).unwrap();
        assert_eq!(tile.polys.len(), 28800);
        assert!(tile
            .polys
            .iter()
            .all(|p| p.neis.iter().all(|&n| n & DT_EXT_LINK == 0)));
        let last = tile.polys.len() as u16;
        assert!(tile.polys.iter().any(|p| p.neis.contains(&last)));
        Ok(())
    }

    #[test]
    fn test_too_many_polys_in_one_tile() {
        let settings = BuildSettings {
            tiled: false,
            ..Default::default()
        };
        for cells in [129, 200] {
            let err = TriangleNavMeshBuilder
                .build(&grid(cells), &settings)
                .unwrap_err();
            assert!(matches!(
                err,
                BuildError::TooManyPolys { count, limit: MAX_TILE_POLYS, .. }
                    if count == (cells * cells * 2) as usize
            ));
        }
    }

    #[test]
    fn test_slope_and_facing() {
        let wall = CombinedMesh {
            vertices: vec![Vec3::ZERO, Vec3::Y, Vec3::X],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert!(matches!(
            TriangleNavMeshBuilder.build(&wall, &BuildSettings::default()),
            Err(BuildError::NoWalkableGeometry(1))
        ));

        let mut facing_down = strip(1);
        for tri in facing_down.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        assert!(matches!(
            TriangleNavMeshBuilder.build(&facing_down, &BuildSettings::default()),
            Err(BuildError::NoWalkableGeometry(2))
        ));
    }

    #[test]
    fn test_rejects_bad_input() {
        let settings = BuildSettings {
            verts_per_poly: 8,
            ..Default::default()
        };
        assert!(matches!(
            TriangleNavMeshBuilder.build(&strip(1), &settings),
            Err(BuildError::InvalidInput(_))
        ));

        let mut broken = strip(1);
        broken.indices.push(0);
        assert!(matches!(
            TriangleNavMeshBuilder.build(&broken, &BuildSettings::default()),
            Err(BuildError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_build_error_converts() {
        let err: Error = BuildError::NoWalkableGeometry(3).into();
        assert_eq!(err.kind(), ErrorKind::Build);
        assert!(err.to_string().contains("3 input triangles"));
    }

    #[test]
    fn test_output_serializes() -> navmesh_common::Result<()> {
        let nav_mesh = TriangleNavMeshBuilder.build(&strip(3), &unit_tiles())?;
        let bytes = navmesh_format::serialize(&nav_mesh)?;
        let loaded = navmesh_format::deserialize(&bytes, None)?;
        assert_eq!(loaded.tile_count(), 3);
        for (a, b) in nav_mesh.tiles().zip(loaded.tiles()) {
            assert!(a.same_content(b));
        }
        Ok(())
    }
}
