//! In-memory tiled navigation mesh
//!
//! The layout of every tile mirrors the native Detour structures one to one,
//! so the binary serializer can write it without any translation beyond
//! fixed-size padding.

use std::collections::HashMap;

use navmesh_common::{Error, Result};

use crate::tile_ref::TileRefLayout;

/// Maximum vertices per polygon stored in a tile blob
pub const DT_VERTS_PER_POLYGON: usize = 6;

/// Null link / unset first link
pub const DT_NULL_LINK: u32 = 0xffff_ffff;

/// Neighbor flag for edges that are portals to another tile
pub const DT_EXT_LINK: u16 = 0x8000;

/// Regular ground polygon
pub const DT_POLYTYPE_GROUND: u8 = 0;

/// Polygon standing in for an off-mesh connection
pub const DT_POLYTYPE_OFFMESH_CONNECTION: u8 = 1;

/// Navigation mesh configuration shared by every tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavMeshParams {
    /// World-space origin of the tile grid
    pub origin: [f32; 3],
    pub tile_width: f32,
    pub tile_height: f32,
    /// Maximum number of live tiles
    pub max_tiles: i32,
    /// Maximum number of polygons per tile
    pub max_polys: i32,
}

impl NavMeshParams {
    /// Checks the parameters, returning a description of the first problem
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.origin.iter().any(|v| !v.is_finite()) {
            return Err(format!("origin {:?} is not finite", self.origin));
        }
        if !(self.tile_width > 0.0) || !(self.tile_height > 0.0) {
            return Err(format!(
                "tile size {}x{} must be positive",
                self.tile_width, self.tile_height
            ));
        }
        if self.max_tiles <= 0 || self.max_polys <= 0 {
            return Err(format!(
                "max_tiles {} and max_polys {} must be positive",
                self.max_tiles, self.max_polys
            ));
        }
        Ok(())
    }
}

/// Link between two polygons, rebuilt at load time and never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Reference to the neighbor polygon
    pub reference: u32,
    /// Index of the next link of the same polygon, or [`DT_NULL_LINK`]
    pub next: u32,
    /// Edge of the owning polygon this link crosses
    pub edge: u8,
    /// 0xff for links inside a tile
    pub side: u8,
    pub bmin: u8,
    pub bmax: u8,
}

/// Polygon within a tile
#[derive(Debug, Clone, PartialEq)]
pub struct Poly {
    /// Head of this polygon's link list, runtime only
    pub first_link: u32,
    /// Vertex indices, `verts_per_poly` slots, unused slots zero
    pub verts: Vec<u16>,
    /// Neighbor per edge: 0 none, `n` internal poly `n - 1`, `0x8000 | dir` portal
    pub neis: Vec<u16>,
    pub flags: u16,
    pub vert_count: u8,
    /// Area id in the low 6 bits, polygon type in the high 2
    pub area_and_type: u8,
}

impl Poly {
    /// Creates an empty ground polygon with `capacity` vertex slots
    pub fn new(capacity: usize) -> Self {
        Self {
            first_link: DT_NULL_LINK,
            verts: vec![0; capacity],
            neis: vec![0; capacity],
            flags: 0,
            vert_count: 0,
            area_and_type: 0,
        }
    }

    pub fn area(&self) -> u8 {
        self.area_and_type & 0x3f
    }

    pub fn set_area(&mut self, area: u8) {
        self.area_and_type = (self.area_and_type & 0xc0) | (area & 0x3f);
    }

    pub fn poly_type(&self) -> u8 {
        self.area_and_type >> 6
    }

    pub fn set_type(&mut self, poly_type: u8) {
        self.area_and_type = (self.area_and_type & 0x3f) | (poly_type << 6);
    }

    /// Slot capacity of `verts` / `neis`
    pub fn capacity(&self) -> usize {
        self.verts.len()
    }
}

/// Detail sub-mesh of one polygon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolyDetail {
    pub vert_base: u32,
    pub tri_base: u32,
    pub vert_count: u8,
    pub tri_count: u8,
}

/// Quantized bounding volume tree node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvNode {
    pub bmin: [u16; 3],
    pub bmax: [u16; 3],
    /// Polygon index for leaves, negative escape index for internal nodes
    pub i: i32,
}

/// Off-mesh connection between two points
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OffMeshConnection {
    /// Start and end points, `[ax, ay, az, bx, by, bz]`
    pub pos: [f32; 6],
    pub radius: f32,
    /// Polygon index of the connection within its tile
    pub poly: u16,
    /// Direction flags, bit 0 set for bidirectional
    pub flags: u8,
    /// Tile side the end point lies on, 0xff inside
    pub side: u8,
    pub user_id: u32,
}

impl OffMeshConnection {
    pub fn start(&self) -> [f32; 3] {
        [self.pos[0], self.pos[1], self.pos[2]]
    }

    pub fn end(&self) -> [f32; 3] {
        [self.pos[3], self.pos[4], self.pos[5]]
    }
}

/// Tile header, mirrors `dtMeshHeader` minus magic and version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileHeader {
    pub x: i32,
    pub y: i32,
    pub layer: i32,
    pub user_id: u32,
    pub poly_count: i32,
    pub vert_count: i32,
    pub max_link_count: i32,
    pub detail_mesh_count: i32,
    pub detail_vert_count: i32,
    pub detail_tri_count: i32,
    pub bv_node_count: i32,
    pub off_mesh_con_count: i32,
    /// Index of the first off-mesh connection polygon
    pub off_mesh_base: i32,
    pub walkable_height: f32,
    pub walkable_radius: f32,
    pub walkable_climb: f32,
    pub bmin: [f32; 3],
    pub bmax: [f32; 3],
    pub bv_quant_factor: f32,
}

impl TileHeader {
    pub fn new(x: i32, y: i32, layer: i32) -> Self {
        Self {
            x,
            y,
            layer,
            ..Self::default()
        }
    }
}

/// One tile of the navigation mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshTile {
    /// Slot salt, assigned by the owning navmesh
    pub salt: u32,
    pub header: TileHeader,
    /// Vertex positions `[x, y, z, ...]`
    pub verts: Vec<f32>,
    pub polys: Vec<Poly>,
    pub links: Vec<Link>,
    pub detail_meshes: Vec<PolyDetail>,
    /// Detail vertex positions `[x, y, z, ...]`
    pub detail_verts: Vec<f32>,
    /// Detail triangles, 3 vertex indices and a flags byte each
    pub detail_tris: Vec<u8>,
    pub bv_tree: Vec<BvNode>,
    pub off_mesh_cons: Vec<OffMeshConnection>,
}

impl MeshTile {
    /// Creates an empty tile at the given grid location
    pub fn new(x: i32, y: i32, layer: i32) -> Self {
        Self {
            header: TileHeader::new(x, y, layer),
            ..Self::default()
        }
    }

    /// Sets every header count from the current buffer lengths
    pub fn sync_header_counts(&mut self) {
        let h = &mut self.header;
        h.poly_count = self.polys.len() as i32;
        h.vert_count = (self.verts.len() / 3) as i32;
        h.detail_mesh_count = self.detail_meshes.len() as i32;
        h.detail_vert_count = (self.detail_verts.len() / 3) as i32;
        h.detail_tri_count = (self.detail_tris.len() / 4) as i32;
        h.bv_node_count = self.bv_tree.len() as i32;
        h.off_mesh_con_count = self.off_mesh_cons.len() as i32;
    }

    /// Checks that header counts agree with the buffers
    pub fn validate(&self) -> Result<()> {
        let h = &self.header;
        let checks: [(&str, i64, usize, usize); 7] = [
            ("poly", h.poly_count as i64, self.polys.len(), 1),
            ("vert", h.vert_count as i64, self.verts.len(), 3),
            ("detail mesh", h.detail_mesh_count as i64, self.detail_meshes.len(), 1),
            ("detail vert", h.detail_vert_count as i64, self.detail_verts.len(), 3),
            ("detail tri", h.detail_tri_count as i64, self.detail_tris.len(), 4),
            ("bv node", h.bv_node_count as i64, self.bv_tree.len(), 1),
            ("off-mesh connection", h.off_mesh_con_count as i64, self.off_mesh_cons.len(), 1),
        ];
        for (what, count, len, stride) in checks {
            if count < 0 || count as usize * stride != len {
                return Err(Error::InconsistentTile(format!(
                    "tile ({}, {}) header {} count {} does not match {} buffer entries",
                    h.x,
                    h.y,
                    what,
                    count,
                    len / stride
                )));
            }
        }
        if h.max_link_count < 0 || self.links.len() > h.max_link_count as usize {
            return Err(Error::InconsistentTile(format!(
                "tile ({}, {}) holds {} links but max_link_count is {}",
                h.x,
                h.y,
                self.links.len(),
                h.max_link_count
            )));
        }
        let vert_count = self.verts.len() / 3;
        for (i, poly) in self.polys.iter().enumerate() {
            let used = poly.vert_count as usize;
            if used > poly.verts.len() || poly.verts.len() != poly.neis.len() {
                return Err(Error::InconsistentTile(format!(
                    "poly {} uses {} vertices but has {} slots",
                    i,
                    used,
                    poly.verts.len()
                )));
            }
            if let Some(v) = poly.verts[..used].iter().find(|&&v| v as usize >= vert_count) {
                return Err(Error::InconsistentTile(format!(
                    "poly {} references vertex {} of {}",
                    i, v, vert_count
                )));
            }
        }
        Ok(())
    }

    /// Compares the persisted content of two tiles, ignoring links and salt
    pub fn same_content(&self, other: &MeshTile) -> bool {
        let same_polys = self.polys.len() == other.polys.len()
            && self.polys.iter().zip(&other.polys).all(|(a, b)| {
                let n = a.vert_count as usize;
                a.vert_count == b.vert_count
                    && a.flags == b.flags
                    && a.area_and_type == b.area_and_type
                    && a.verts.get(..n) == b.verts.get(..n)
                    && a.neis.get(..n) == b.neis.get(..n)
            });
        same_polys
            && self.header == other.header
            && self.verts == other.verts
            && self.detail_meshes == other.detail_meshes
            && self.detail_verts == other.detail_verts
            && self.detail_tris == other.detail_tris
            && self.bv_tree == other.bv_tree
            && self.off_mesh_cons == other.off_mesh_cons
    }
}

/// Tiled navigation mesh
#[derive(Debug, Clone)]
pub struct TiledNavMesh {
    params: NavMeshParams,
    verts_per_poly: usize,
    layout: TileRefLayout,
    tiles: Vec<Option<MeshTile>>,
    /// Salt of the next tile placed in each slot
    salts: Vec<u32>,
    pos_lookup: HashMap<(i32, i32, i32), usize>,
}

impl TiledNavMesh {
    /// Creates an empty navigation mesh
    pub fn new(params: NavMeshParams, verts_per_poly: usize) -> Result<Self> {
        params.check().map_err(Error::InvalidSettings)?;
        if !(3..=DT_VERTS_PER_POLYGON).contains(&verts_per_poly) {
            return Err(Error::InvalidSettings(format!(
                "verts_per_poly {} outside 3..={}",
                verts_per_poly, DT_VERTS_PER_POLYGON
            )));
        }

        Ok(Self {
            layout: TileRefLayout::for_runtime(params.max_tiles, params.max_polys),
            params,
            verts_per_poly,
            tiles: Vec::new(),
            salts: Vec::new(),
            pos_lookup: HashMap::new(),
        })
    }

    pub fn params(&self) -> &NavMeshParams {
        &self.params
    }

    pub fn verts_per_poly(&self) -> usize {
        self.verts_per_poly
    }

    /// Number of live tiles
    pub fn tile_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    /// Live tiles in slot order
    pub fn tiles(&self) -> impl Iterator<Item = &MeshTile> {
        self.tiles.iter().flatten()
    }

    pub fn tile(&self, slot: usize) -> Option<&MeshTile> {
        self.tiles.get(slot).and_then(Option::as_ref)
    }

    pub fn tile_at(&self, x: i32, y: i32, layer: i32) -> Option<&MeshTile> {
        self.pos_lookup
            .get(&(x, y, layer))
            .and_then(|&slot| self.tile(slot))
    }

    /// Runtime reference of the tile in `slot`
    pub fn tile_ref(&self, slot: usize) -> Option<u32> {
        self.tile(slot)
            .map(|tile| self.layout.tile_ref(tile.salt, slot as u32))
    }

    /// Adds a tile into the first free slot and rebuilds its internal links.
    ///
    /// Returns the slot index.
    pub fn add_tile(&mut self, mut tile: MeshTile) -> Result<usize> {
        tile.validate()?;

        let key = (tile.header.x, tile.header.y, tile.header.layer);
        if self.pos_lookup.contains_key(&key) {
            return Err(Error::InconsistentTile(format!(
                "a tile already occupies ({}, {}, layer {})",
                key.0, key.1, key.2
            )));
        }
        if tile.polys.len() > self.params.max_polys as usize {
            return Err(Error::InconsistentTile(format!(
                "tile has {} polys, navmesh allows {}",
                tile.polys.len(),
                self.params.max_polys
            )));
        }
        for (i, poly) in tile.polys.iter_mut().enumerate() {
            if poly.vert_count as usize > self.verts_per_poly {
                return Err(Error::InconsistentTile(format!(
                    "poly {} has {} vertices, navmesh allows {}",
                    i, poly.vert_count, self.verts_per_poly
                )));
            }
            poly.verts.resize(self.verts_per_poly, 0);
            poly.neis.resize(self.verts_per_poly, 0);
        }

        let slot = self.allocate_slot()?;
        tile.salt = self.salts[slot];
        self.connect_int_links(&mut tile, slot);

        log::debug!(
            "Added tile ({}, {}, layer {}) to slot {}: {} polys, {} links",
            key.0,
            key.1,
            key.2,
            slot,
            tile.polys.len(),
            tile.links.len()
        );

        self.pos_lookup.insert(key, slot);
        self.tiles[slot] = Some(tile);
        Ok(slot)
    }

    /// Removes the tile in `slot`, bumping the slot salt so stale references fail
    pub fn remove_tile(&mut self, slot: usize) -> Result<MeshTile> {
        let tile = self
            .tiles
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or_else(|| Error::InvalidSettings(format!("no tile in slot {}", slot)))?;
        self.pos_lookup
            .remove(&(tile.header.x, tile.header.y, tile.header.layer));
        let salt_mask = if self.layout.tile_bits + self.layout.poly_bits >= 32 {
            0
        } else {
            u32::MAX >> (self.layout.tile_bits + self.layout.poly_bits)
        };
        let next = (self.salts[slot] + 1) & salt_mask;
        self.salts[slot] = if next == 0 { 1 } else { next };
        Ok(tile)
    }

    fn allocate_slot(&mut self) -> Result<usize> {
        if let Some(slot) = self.tiles.iter().position(Option::is_none) {
            return Ok(slot);
        }
        if self.tiles.len() >= self.params.max_tiles as usize {
            return Err(Error::InconsistentTile(format!(
                "navmesh is full ({} tiles)",
                self.params.max_tiles
            )));
        }
        self.tiles.push(None);
        self.salts.push(1);
        Ok(self.tiles.len() - 1)
    }

    /// Rebuilds links between polygons of the same tile from neighbor data
    fn connect_int_links(&self, tile: &mut MeshTile, slot: usize) {
        tile.links.clear();
        let max_links = tile.header.max_link_count.max(0) as usize;
        let poly_count = tile.polys.len();
        let mut dropped = 0usize;

        for i in 0..poly_count {
            let mut head = DT_NULL_LINK;
            let (vert_count, neis) = {
                let poly = &tile.polys[i];
                if poly.poly_type() != DT_POLYTYPE_GROUND {
                    (0, Vec::new())
                } else {
                    (poly.vert_count as usize, poly.neis.clone())
                }
            };

            // Walk edges backwards so the list reads in edge order
            for edge in (0..vert_count).rev() {
                let nei = neis[edge];
                if nei == 0 || nei & DT_EXT_LINK != 0 {
                    continue;
                }
                let target = (nei - 1) as usize;
                if target >= poly_count {
                    dropped += 1;
                    continue;
                }
                if tile.links.len() >= max_links {
                    dropped += 1;
                    continue;
                }
                tile.links.push(Link {
                    reference: self.layout.poly_ref(tile.salt, slot as u32, target as u32),
                    next: head,
                    edge: edge as u8,
                    side: 0xff,
                    bmin: 0,
                    bmax: 0,
                });
                head = (tile.links.len() - 1) as u32;
            }
            tile.polys[i].first_link = head;
        }

        if dropped > 0 {
            log::warn!(
                "Tile ({}, {}): {} internal links could not be created",
                tile.header.x,
                tile.header.y,
                dropped
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> NavMeshParams {
        NavMeshParams {
            origin: [0.0; 3],
            tile_width: 3.2,
            tile_height: 3.2,
            max_tiles: 4,
            max_polys: 16,
        }
    }

    /// Two triangles sharing the edge (1, 2)
    fn quad_tile(x: i32, y: i32) -> MeshTile {
        let mut tile = MeshTile::new(x, y, 0);
        tile.verts = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let mut a = Poly::new(DT_VERTS_PER_POLYGON);
        a.vert_count = 3;
        a.verts[..3].copy_from_slice(&[0, 1, 2]);
        a.neis[1] = 2;
        let mut b = Poly::new(DT_VERTS_PER_POLYGON);
        b.vert_count = 3;
        b.verts[..3].copy_from_slice(&[2, 1, 3]);
        b.neis[0] = 1;
        b.neis[1] = DT_EXT_LINK;
        tile.polys = vec![a, b];
        tile.header.max_link_count = 6;
        tile.sync_header_counts();
        tile
    }

    #[test]
    fn test_params_validation() {
        assert!(TiledNavMesh::new(params(), 6).is_ok());
        let mut bad = params();
        bad.max_tiles = 0;
        assert!(matches!(
            TiledNavMesh::new(bad, 6),
            Err(Error::InvalidSettings(_))
        ));
        assert!(TiledNavMesh::new(params(), 7).is_err());
        assert!(TiledNavMesh::new(params(), 2).is_err());
    }

    #[test]
    fn test_add_tile_builds_internal_links() -> Result<()> {
        let mut nav = TiledNavMesh::new(params(), 6)?;
        let slot = nav.add_tile(quad_tile(0, 0))?;
        assert_eq!(slot, 0);

        let tile = nav.tile(slot).unwrap();
        assert_eq!(tile.salt, 1);
        // Portal edges get no internal link
        assert_eq!(tile.links.len(), 2);
        let a = &tile.polys[0];
        let link = tile.links[a.first_link as usize];
        assert_eq!(link.edge, 1);
        assert_eq!(link.next, DT_NULL_LINK);
        assert_eq!(link.reference & 0xf, 1);
        Ok(())
    }

    #[test]
    fn test_slots_and_capacity() -> Result<()> {
        let mut nav = TiledNavMesh::new(params(), 6)?;
        for i in 0..4 {
            assert_eq!(nav.add_tile(quad_tile(i, 0))?, i as usize);
        }
        assert_eq!(nav.tile_count(), 4);
        assert!(nav.add_tile(quad_tile(9, 9)).is_err());

        let removed = nav.remove_tile(1)?;
        assert_eq!(removed.header.x, 1);
        assert!(nav.tile_at(1, 0, 0).is_none());
        assert_eq!(nav.add_tile(quad_tile(7, 7))?, 1);
        assert_eq!(nav.tile(1).unwrap().salt, 2);
        Ok(())
    }

    #[test]
    fn test_duplicate_location_rejected() -> Result<()> {
        let mut nav = TiledNavMesh::new(params(), 6)?;
        nav.add_tile(quad_tile(0, 0))?;
        assert!(matches!(
            nav.add_tile(quad_tile(0, 0)),
            Err(Error::InconsistentTile(_))
        ));
        Ok(())
    }

    #[test]
    fn test_poly_capacity_follows_navmesh() -> Result<()> {
        let mut nav = TiledNavMesh::new(params(), 3)?;
        nav.add_tile(quad_tile(0, 0))?;
        assert_eq!(nav.tile(0).unwrap().polys[0].capacity(), 3);

        let mut tile = quad_tile(1, 0);
        tile.polys[0].vert_count = 4;
        tile.polys[0].verts[3] = 3;
        assert!(nav.add_tile(tile).is_err());
        Ok(())
    }

    #[test]
    fn test_validate_counts() {
        let mut tile = quad_tile(0, 0);
        assert!(tile.validate().is_ok());
        tile.header.poly_count = 3;
        assert!(matches!(tile.validate(), Err(Error::InconsistentTile(_))));

        let mut tile = quad_tile(0, 0);
        tile.polys[1].verts[2] = 40;
        assert!(tile.validate().is_err());
    }

    #[test]
    fn test_area_and_type() {
        let mut poly = Poly::new(6);
        poly.set_area(63);
        poly.set_type(DT_POLYTYPE_OFFMESH_CONNECTION);
        assert_eq!(poly.area_and_type, 0x7f);
        assert_eq!(poly.area(), 63);
        assert_eq!(poly.poly_type(), 1);
    }
}
