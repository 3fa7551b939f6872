//! Binary navmesh container
//!
//! Reads and writes the `MSET` container: a set header, the navmesh
//! parameters, then one `{tileRef, dataSize}` header and `DNAV` tile blob per
//! live tile. The layout is byte-exact with the native Detour structures
//! (little-endian, no alignment padding beyond what the structs declare) so
//! the file can be loaded by a natively compiled reader.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use navmesh_common::{Error, Result};

use crate::nav_mesh::{
    BvNode, MeshTile, NavMeshParams, OffMeshConnection, Poly, PolyDetail, TileHeader,
    TiledNavMesh, DT_NULL_LINK, DT_VERTS_PER_POLYGON,
};
use crate::tile_ref::{TileRefLayout, DT_CONTAINER_SALT};

/// Magic number of the container ('MSET')
pub const NAVMESHSET_MAGIC: u32 =
    (b'M' as u32) << 24 | (b'S' as u32) << 16 | (b'E' as u32) << 8 | b'T' as u32;

/// Container version
pub const NAVMESHSET_VERSION: u32 = 1;

/// Magic number of a tile blob ('DNAV')
pub const DT_NAVMESH_MAGIC: u32 =
    (b'D' as u32) << 24 | (b'N' as u32) << 16 | (b'A' as u32) << 8 | b'V' as u32;

/// Tile blob version
pub const DT_NAVMESH_VERSION: u32 = 7;

/// Size of the set header
pub const SET_HEADER_SIZE: usize = 12;
/// Size of the params block
pub const PARAMS_SIZE: usize = 28;
/// Size of a per-tile `{tileRef, dataSize}` header
pub const TILE_HEADER_SIZE: usize = 8;
/// Size of `dtMeshHeader`
pub const MESH_HEADER_SIZE: usize = 100;
/// Size of `dtPoly`
pub const POLY_SIZE: usize = 32;
/// Size of `dtLink`
pub const LINK_SIZE: usize = 12;
/// Size of `dtPolyDetail`, including 2 bytes of trailing padding
pub const POLY_DETAIL_SIZE: usize = 12;
/// Size of `dtBVNode`
pub const BV_NODE_SIZE: usize = 16;
/// Size of `dtOffMeshConnection`
pub const OFF_MESH_CON_SIZE: usize = 36;

/// Container header
#[repr(C)]
#[derive(Debug, Clone)]
struct NavMeshSetHeader {
    magic: u32,
    version: u32,
    tile_count: u32,
}

impl NavMeshSetHeader {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.tile_count)?;
        Ok(())
    }
}

/// Navmesh params as stored in the container, matching `dtNavMeshParams`
#[repr(C)]
#[derive(Debug, Clone)]
struct NavMeshParamsData {
    origin: [f32; 3],
    tile_width: f32,
    tile_height: f32,
    max_tiles: i32,
    max_polys: i32,
}

impl NavMeshParamsData {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            origin: [
                reader.read_f32::<LittleEndian>()?,
                reader.read_f32::<LittleEndian>()?,
                reader.read_f32::<LittleEndian>()?,
            ],
            tile_width: reader.read_f32::<LittleEndian>()?,
            tile_height: reader.read_f32::<LittleEndian>()?,
            max_tiles: reader.read_i32::<LittleEndian>()?,
            max_polys: reader.read_i32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for &v in &self.origin {
            writer.write_f32::<LittleEndian>(v)?;
        }
        writer.write_f32::<LittleEndian>(self.tile_width)?;
        writer.write_f32::<LittleEndian>(self.tile_height)?;
        writer.write_i32::<LittleEndian>(self.max_tiles)?;
        writer.write_i32::<LittleEndian>(self.max_polys)?;
        Ok(())
    }
}

impl From<&NavMeshParams> for NavMeshParamsData {
    fn from(params: &NavMeshParams) -> Self {
        Self {
            origin: params.origin,
            tile_width: params.tile_width,
            tile_height: params.tile_height,
            max_tiles: params.max_tiles,
            max_polys: params.max_polys,
        }
    }
}

impl From<NavMeshParamsData> for NavMeshParams {
    fn from(data: NavMeshParamsData) -> Self {
        Self {
            origin: data.origin,
            tile_width: data.tile_width,
            tile_height: data.tile_height,
            max_tiles: data.max_tiles,
            max_polys: data.max_polys,
        }
    }
}

/// Per-tile header in the container
#[repr(C)]
#[derive(Debug, Clone)]
struct NavMeshTileHeader {
    tile_ref: u32,
    data_size: i32,
}

impl NavMeshTileHeader {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            tile_ref: reader.read_u32::<LittleEndian>()?,
            data_size: reader.read_i32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.tile_ref)?;
        writer.write_i32::<LittleEndian>(self.data_size)?;
        Ok(())
    }
}

/// Mesh header structure matching `dtMeshHeader`
#[repr(C)]
#[derive(Debug, Clone)]
struct MeshHeader {
    magic: u32,
    version: u32,
    x: i32,
    y: i32,
    layer: i32,
    user_id: u32,
    poly_count: i32,
    vert_count: i32,
    max_link_count: i32,
    detail_mesh_count: i32,
    detail_vert_count: i32,
    detail_tri_count: i32,
    bv_node_count: i32,
    off_mesh_con_count: i32,
    off_mesh_base: i32,
    walkable_height: f32,
    walkable_radius: f32,
    walkable_climb: f32,
    bmin: [f32; 3],
    bmax: [f32; 3],
    bv_quant_factor: f32,
}

impl MeshHeader {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            magic: reader.read_u32::<LittleEndian>()?,
            version: reader.read_u32::<LittleEndian>()?,
            x: reader.read_i32::<LittleEndian>()?,
            y: reader.read_i32::<LittleEndian>()?,
            layer: reader.read_i32::<LittleEndian>()?,
            user_id: reader.read_u32::<LittleEndian>()?,
            poly_count: reader.read_i32::<LittleEndian>()?,
            vert_count: reader.read_i32::<LittleEndian>()?,
            max_link_count: reader.read_i32::<LittleEndian>()?,
            detail_mesh_count: reader.read_i32::<LittleEndian>()?,
            detail_vert_count: reader.read_i32::<LittleEndian>()?,
            detail_tri_count: reader.read_i32::<LittleEndian>()?,
            bv_node_count: reader.read_i32::<LittleEndian>()?,
            off_mesh_con_count: reader.read_i32::<LittleEndian>()?,
            off_mesh_base: reader.read_i32::<LittleEndian>()?,
            walkable_height: reader.read_f32::<LittleEndian>()?,
            walkable_radius: reader.read_f32::<LittleEndian>()?,
            walkable_climb: reader.read_f32::<LittleEndian>()?,
            bmin: read_vec3(reader)?,
            bmax: read_vec3(reader)?,
            bv_quant_factor: reader.read_f32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_i32::<LittleEndian>(self.x)?;
        writer.write_i32::<LittleEndian>(self.y)?;
        writer.write_i32::<LittleEndian>(self.layer)?;
        writer.write_u32::<LittleEndian>(self.user_id)?;
        writer.write_i32::<LittleEndian>(self.poly_count)?;
        writer.write_i32::<LittleEndian>(self.vert_count)?;
        writer.write_i32::<LittleEndian>(self.max_link_count)?;
        writer.write_i32::<LittleEndian>(self.detail_mesh_count)?;
        writer.write_i32::<LittleEndian>(self.detail_vert_count)?;
        writer.write_i32::<LittleEndian>(self.detail_tri_count)?;
        writer.write_i32::<LittleEndian>(self.bv_node_count)?;
        writer.write_i32::<LittleEndian>(self.off_mesh_con_count)?;
        writer.write_i32::<LittleEndian>(self.off_mesh_base)?;
        writer.write_f32::<LittleEndian>(self.walkable_height)?;
        writer.write_f32::<LittleEndian>(self.walkable_radius)?;
        writer.write_f32::<LittleEndian>(self.walkable_climb)?;
        write_vec3(writer, &self.bmin)?;
        write_vec3(writer, &self.bmax)?;
        writer.write_f32::<LittleEndian>(self.bv_quant_factor)?;
        Ok(())
    }

    fn from_tile_header(h: &TileHeader) -> Self {
        Self {
            magic: DT_NAVMESH_MAGIC,
            version: DT_NAVMESH_VERSION,
            x: h.x,
            y: h.y,
            layer: h.layer,
            user_id: h.user_id,
            poly_count: h.poly_count,
            vert_count: h.vert_count,
            max_link_count: h.max_link_count,
            detail_mesh_count: h.detail_mesh_count,
            detail_vert_count: h.detail_vert_count,
            detail_tri_count: h.detail_tri_count,
            bv_node_count: h.bv_node_count,
            off_mesh_con_count: h.off_mesh_con_count,
            off_mesh_base: h.off_mesh_base,
            walkable_height: h.walkable_height,
            walkable_radius: h.walkable_radius,
            walkable_climb: h.walkable_climb,
            bmin: h.bmin,
            bmax: h.bmax,
            bv_quant_factor: h.bv_quant_factor,
        }
    }

    fn to_tile_header(&self) -> TileHeader {
        TileHeader {
            x: self.x,
            y: self.y,
            layer: self.layer,
            user_id: self.user_id,
            poly_count: self.poly_count,
            vert_count: self.vert_count,
            max_link_count: self.max_link_count,
            detail_mesh_count: self.detail_mesh_count,
            detail_vert_count: self.detail_vert_count,
            detail_tri_count: self.detail_tri_count,
            bv_node_count: self.bv_node_count,
            off_mesh_con_count: self.off_mesh_con_count,
            off_mesh_base: self.off_mesh_base,
            walkable_height: self.walkable_height,
            walkable_radius: self.walkable_radius,
            walkable_climb: self.walkable_climb,
            bmin: self.bmin,
            bmax: self.bmax,
            bv_quant_factor: self.bv_quant_factor,
        }
    }
}

/// Polygon structure matching `dtPoly`
#[repr(C)]
#[derive(Debug, Clone)]
struct PolyData {
    first_link: u32,
    verts: [u16; DT_VERTS_PER_POLYGON],
    neis: [u16; DT_VERTS_PER_POLYGON],
    flags: u16,
    vert_count: u8,
    area_and_type: u8,
}

impl PolyData {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let first_link = reader.read_u32::<LittleEndian>()?;

        let mut verts = [0u16; DT_VERTS_PER_POLYGON];
        for v in &mut verts {
            *v = reader.read_u16::<LittleEndian>()?;
        }

        let mut neis = [0u16; DT_VERTS_PER_POLYGON];
        for n in &mut neis {
            *n = reader.read_u16::<LittleEndian>()?;
        }

        Ok(Self {
            first_link,
            verts,
            neis,
            flags: reader.read_u16::<LittleEndian>()?,
            vert_count: reader.read_u8()?,
            area_and_type: reader.read_u8()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.first_link)?;
        for &v in &self.verts {
            writer.write_u16::<LittleEndian>(v)?;
        }
        for &n in &self.neis {
            writer.write_u16::<LittleEndian>(n)?;
        }
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u8(self.vert_count)?;
        writer.write_u8(self.area_and_type)?;
        Ok(())
    }

    /// Pads a polygon to the fixed on-disk capacity.
    ///
    /// Only the used slots are copied; everything past `vert_count` is zero.
    fn from_poly(index: usize, poly: &Poly) -> Result<Self> {
        let used = poly.vert_count as usize;
        if used > DT_VERTS_PER_POLYGON {
            return Err(Error::InconsistentTile(format!(
                "poly {} has {} vertices, the format stores at most {}",
                index, used, DT_VERTS_PER_POLYGON
            )));
        }

        let mut data = Self {
            first_link: DT_NULL_LINK,
            verts: [0; DT_VERTS_PER_POLYGON],
            neis: [0; DT_VERTS_PER_POLYGON],
            flags: poly.flags,
            vert_count: poly.vert_count,
            area_and_type: poly.area_and_type,
        };
        data.verts[..used].copy_from_slice(&poly.verts[..used]);
        data.neis[..used].copy_from_slice(&poly.neis[..used]);
        Ok(data)
    }

    fn to_poly(&self, capacity: usize) -> Poly {
        let mut poly = Poly::new(capacity);
        let slots = capacity.min(DT_VERTS_PER_POLYGON);
        poly.verts[..slots].copy_from_slice(&self.verts[..slots]);
        poly.neis[..slots].copy_from_slice(&self.neis[..slots]);
        poly.flags = self.flags;
        poly.vert_count = self.vert_count;
        poly.area_and_type = self.area_and_type;
        poly
    }
}

/// Detail mesh structure matching `dtPolyDetail`
#[repr(C)]
#[derive(Debug, Clone)]
struct PolyDetailData {
    vert_base: u32,
    tri_base: u32,
    vert_count: u8,
    tri_count: u8,
}

impl PolyDetailData {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let data = Self {
            vert_base: reader.read_u32::<LittleEndian>()?,
            tri_base: reader.read_u32::<LittleEndian>()?,
            vert_count: reader.read_u8()?,
            tri_count: reader.read_u8()?,
        };
        // Struct padding
        reader.read_u16::<LittleEndian>()?;
        Ok(data)
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.vert_base)?;
        writer.write_u32::<LittleEndian>(self.tri_base)?;
        writer.write_u8(self.vert_count)?;
        writer.write_u8(self.tri_count)?;
        writer.write_u16::<LittleEndian>(0)?;
        Ok(())
    }
}

impl From<&PolyDetail> for PolyDetailData {
    fn from(d: &PolyDetail) -> Self {
        Self {
            vert_base: d.vert_base,
            tri_base: d.tri_base,
            vert_count: d.vert_count,
            tri_count: d.tri_count,
        }
    }
}

impl From<PolyDetailData> for PolyDetail {
    fn from(d: PolyDetailData) -> Self {
        Self {
            vert_base: d.vert_base,
            tri_base: d.tri_base,
            vert_count: d.vert_count,
            tri_count: d.tri_count,
        }
    }
}

/// Bounding volume node matching `dtBVNode`
#[repr(C)]
#[derive(Debug, Clone)]
struct BvNodeData {
    bmin: [u16; 3],
    bmax: [u16; 3],
    i: i32,
}

impl BvNodeData {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            bmin: [
                reader.read_u16::<LittleEndian>()?,
                reader.read_u16::<LittleEndian>()?,
                reader.read_u16::<LittleEndian>()?,
            ],
            bmax: [
                reader.read_u16::<LittleEndian>()?,
                reader.read_u16::<LittleEndian>()?,
                reader.read_u16::<LittleEndian>()?,
            ],
            i: reader.read_i32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for &v in self.bmin.iter().chain(&self.bmax) {
            writer.write_u16::<LittleEndian>(v)?;
        }
        writer.write_i32::<LittleEndian>(self.i)?;
        Ok(())
    }
}

/// Off-mesh connection matching `dtOffMeshConnection`
#[repr(C)]
#[derive(Debug, Clone)]
struct OffMeshConnectionData {
    pos: [f32; 6],
    rad: f32,
    poly: u16,
    flags: u8,
    side: u8,
    user_id: u32,
}

impl OffMeshConnectionData {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut pos = [0.0; 6];
        for p in &mut pos {
            *p = reader.read_f32::<LittleEndian>()?;
        }

        Ok(Self {
            pos,
            rad: reader.read_f32::<LittleEndian>()?,
            poly: reader.read_u16::<LittleEndian>()?,
            flags: reader.read_u8()?,
            side: reader.read_u8()?,
            user_id: reader.read_u32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for &p in &self.pos {
            writer.write_f32::<LittleEndian>(p)?;
        }
        writer.write_f32::<LittleEndian>(self.rad)?;
        writer.write_u16::<LittleEndian>(self.poly)?;
        writer.write_u8(self.flags)?;
        writer.write_u8(self.side)?;
        writer.write_u32::<LittleEndian>(self.user_id)?;
        Ok(())
    }
}

fn read_vec3<R: Read>(reader: &mut R) -> std::io::Result<[f32; 3]> {
    Ok([
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ])
}

fn write_vec3<W: Write>(writer: &mut W, v: &[f32; 3]) -> Result<()> {
    for &c in v {
        writer.write_f32::<LittleEndian>(c)?;
    }
    Ok(())
}

fn truncated(what: String) -> impl FnOnce(std::io::Error) -> Error {
    move |e| Error::Truncated(format!("{}: {}", what, e))
}

/// Returns the blob size a tile header describes.
///
/// `None` if any count is negative or the size overflows.
pub fn tile_data_size(header: &TileHeader) -> Option<usize> {
    let sections = [
        (header.vert_count, 12),
        (header.poly_count, POLY_SIZE),
        (header.max_link_count, LINK_SIZE),
        (header.detail_mesh_count, POLY_DETAIL_SIZE),
        (header.detail_vert_count, 12),
        (header.detail_tri_count, 4),
        (header.bv_node_count, BV_NODE_SIZE),
        (header.off_mesh_con_count, OFF_MESH_CON_SIZE),
    ];

    sections
        .iter()
        .try_fold(MESH_HEADER_SIZE, |total, &(count, size)| {
            let count = usize::try_from(count).ok()?;
            total.checked_add(count.checked_mul(size)?)
        })
}

/// Serializes a single tile into a `DNAV` blob.
///
/// Counts are checked against the buffers before anything is written.
pub fn serialize_tile(tile: &MeshTile) -> Result<Vec<u8>> {
    tile.validate()?;
    let polys = tile
        .polys
        .iter()
        .enumerate()
        .map(|(i, poly)| PolyData::from_poly(i, poly))
        .collect::<Result<Vec<_>>>()?;

    let size = tile_data_size(&tile.header).ok_or_else(|| {
        Error::InconsistentTile(format!(
            "tile ({}, {}) size overflows",
            tile.header.x, tile.header.y
        ))
    })?;
    let mut data = Vec::with_capacity(size);

    MeshHeader::from_tile_header(&tile.header).write_to(&mut data)?;

    for &v in &tile.verts {
        data.write_f32::<LittleEndian>(v)?;
    }
    for poly in &polys {
        poly.write_to(&mut data)?;
    }
    // Link storage is reserved but never persisted
    data.resize(data.len() + tile.header.max_link_count as usize * LINK_SIZE, 0);
    for detail in &tile.detail_meshes {
        PolyDetailData::from(detail).write_to(&mut data)?;
    }
    for &v in &tile.detail_verts {
        data.write_f32::<LittleEndian>(v)?;
    }
    data.extend_from_slice(&tile.detail_tris);
    for node in &tile.bv_tree {
        BvNodeData {
            bmin: node.bmin,
            bmax: node.bmax,
            i: node.i,
        }
        .write_to(&mut data)?;
    }
    for con in &tile.off_mesh_cons {
        OffMeshConnectionData {
            pos: con.pos,
            rad: con.radius,
            poly: con.poly,
            flags: con.flags,
            side: con.side,
            user_id: con.user_id,
        }
        .write_to(&mut data)?;
    }

    debug_assert_eq!(data.len(), size);
    Ok(data)
}

/// Parses a `DNAV` blob whose size is exactly known.
///
/// Polygons get `verts_per_poly` slots.
pub fn deserialize_tile(data: &[u8], verts_per_poly: usize) -> Result<MeshTile> {
    if data.len() < MESH_HEADER_SIZE {
        return Err(Error::Corrupt(format!(
            "tile blob of {} bytes is smaller than its header",
            data.len()
        )));
    }

    let corrupt = |e: std::io::Error| Error::Corrupt(format!("tile blob: {}", e));
    let mut cursor = Cursor::new(data);
    let header = MeshHeader::read_from(&mut cursor).map_err(corrupt)?;

    if header.magic != DT_NAVMESH_MAGIC {
        return Err(Error::Corrupt(format!(
            "tile magic {:#010x}, expected {:#010x}",
            header.magic, DT_NAVMESH_MAGIC
        )));
    }
    if header.version != DT_NAVMESH_VERSION {
        return Err(Error::Corrupt(format!(
            "tile version {}, expected {}",
            header.version, DT_NAVMESH_VERSION
        )));
    }

    let tile_header = header.to_tile_header();
    match tile_data_size(&tile_header) {
        Some(size) if size == data.len() => {}
        Some(size) => {
            return Err(Error::Corrupt(format!(
                "tile ({}, {}) counts describe {} bytes, blob has {}",
                header.x,
                header.y,
                size,
                data.len()
            )));
        }
        None => {
            return Err(Error::Corrupt(format!(
                "tile ({}, {}) has negative counts",
                header.x, header.y
            )));
        }
    }

    let mut tile = MeshTile {
        header: tile_header,
        ..MeshTile::default()
    };

    let vert_floats = header.vert_count as usize * 3;
    tile.verts.reserve(vert_floats);
    for _ in 0..vert_floats {
        tile.verts.push(cursor.read_f32::<LittleEndian>().map_err(corrupt)?);
    }

    tile.polys.reserve(header.poly_count as usize);
    for i in 0..header.poly_count as usize {
        let poly = PolyData::read_from(&mut cursor).map_err(corrupt)?;
        if poly.vert_count as usize > verts_per_poly {
            return Err(Error::Corrupt(format!(
                "poly {} has {} vertices, capacity is {}",
                i, poly.vert_count, verts_per_poly
            )));
        }
        tile.polys.push(poly.to_poly(verts_per_poly));
    }

    cursor.set_position(cursor.position() + (header.max_link_count as usize * LINK_SIZE) as u64);

    for _ in 0..header.detail_mesh_count {
        let detail = PolyDetailData::read_from(&mut cursor).map_err(corrupt)?;
        tile.detail_meshes.push(detail.into());
    }

    for _ in 0..header.detail_vert_count as usize * 3 {
        tile.detail_verts
            .push(cursor.read_f32::<LittleEndian>().map_err(corrupt)?);
    }

    let mut tris = vec![0u8; header.detail_tri_count as usize * 4];
    cursor.read_exact(&mut tris).map_err(corrupt)?;
    tile.detail_tris = tris;

    for _ in 0..header.bv_node_count {
        let node = BvNodeData::read_from(&mut cursor).map_err(corrupt)?;
        tile.bv_tree.push(BvNode {
            bmin: node.bmin,
            bmax: node.bmax,
            i: node.i,
        });
    }

    for _ in 0..header.off_mesh_con_count {
        let con = OffMeshConnectionData::read_from(&mut cursor).map_err(corrupt)?;
        tile.off_mesh_cons.push(OffMeshConnection {
            pos: con.pos,
            radius: con.rad,
            poly: con.poly,
            flags: con.flags,
            side: con.side,
            user_id: con.user_id,
        });
    }

    Ok(tile)
}

/// Serializes every live tile of `nav_mesh` into an `MSET` container.
///
/// Tile references are recomputed from each tile's position in slot order,
/// with salt 1 and bit widths derived from the params.
pub fn serialize(nav_mesh: &TiledNavMesh) -> Result<Vec<u8>> {
    let params = nav_mesh.params();
    let layout = TileRefLayout::for_container(params.max_tiles, params.max_polys);
    let tile_count = nav_mesh.tile_count();

    let mut data = Vec::new();
    NavMeshSetHeader {
        magic: NAVMESHSET_MAGIC,
        version: NAVMESHSET_VERSION,
        tile_count: tile_count as u32,
    }
    .write_to(&mut data)?;
    NavMeshParamsData::from(params).write_to(&mut data)?;

    for (seq, tile) in nav_mesh.tiles().enumerate() {
        let blob = serialize_tile(tile)?;
        let data_size = i32::try_from(blob.len()).map_err(|_| {
            Error::InconsistentTile(format!("tile blob of {} bytes is too large", blob.len()))
        })?;
        NavMeshTileHeader {
            tile_ref: layout.tile_ref(DT_CONTAINER_SALT, seq as u32),
            data_size,
        }
        .write_to(&mut data)?;
        data.extend_from_slice(&blob);

        log::debug!(
            "Wrote tile ({}, {}, layer {}): {} bytes",
            tile.header.x,
            tile.header.y,
            tile.header.layer,
            blob.len()
        );
    }

    log::info!(
        "Serialized navmesh: {} tiles, {} bytes",
        tile_count,
        data.len()
    );
    Ok(data)
}

/// Loads an `MSET` container.
///
/// The outer magic and version are checked before anything else. Tile
/// references stored in the file are ignored and tiles are re-added through
/// [`TiledNavMesh::add_tile`]. Tiles with a non-positive data size are
/// skipped. `verts_per_poly` defaults to [`DT_VERTS_PER_POLYGON`].
pub fn deserialize(data: &[u8], verts_per_poly: Option<usize>) -> Result<TiledNavMesh> {
    let mut cursor = Cursor::new(data);

    let magic = cursor
        .read_u32::<LittleEndian>()
        .map_err(truncated("set header".into()))?;
    if magic != NAVMESHSET_MAGIC {
        return Err(Error::WrongMagic {
            found: magic,
            expected: NAVMESHSET_MAGIC,
        });
    }
    let version = cursor
        .read_u32::<LittleEndian>()
        .map_err(truncated("set header".into()))?;
    if version != NAVMESHSET_VERSION {
        return Err(Error::WrongVersion {
            found: version,
            expected: NAVMESHSET_VERSION,
        });
    }
    let tile_count = cursor
        .read_u32::<LittleEndian>()
        .map_err(truncated("set header".into()))?;

    let params: NavMeshParams = NavMeshParamsData::read_from(&mut cursor)
        .map_err(truncated("navmesh params".into()))?
        .into();
    params.check().map_err(Error::Corrupt)?;

    let verts_per_poly = verts_per_poly.unwrap_or(DT_VERTS_PER_POLYGON);
    let mut nav_mesh = TiledNavMesh::new(params, verts_per_poly)?;

    for i in 0..tile_count {
        let tile_header = NavMeshTileHeader::read_from(&mut cursor)
            .map_err(truncated(format!("tile {} header", i)))?;
        if tile_header.data_size <= 0 {
            log::warn!(
                "Skipping tile {} (ref {:#x}) with data size {}",
                i,
                tile_header.tile_ref,
                tile_header.data_size
            );
            continue;
        }

        let start = cursor.position() as usize;
        let end = start + tile_header.data_size as usize;
        if end > data.len() {
            return Err(Error::Truncated(format!(
                "tile {} needs {} bytes, {} remain",
                i,
                tile_header.data_size,
                data.len() - start
            )));
        }

        let tile = deserialize_tile(&data[start..end], verts_per_poly)
            .map_err(|e| match e {
                Error::Corrupt(msg) => Error::Corrupt(format!("tile {}: {}", i, msg)),
                other => other,
            })?;
        cursor.set_position(end as u64);

        nav_mesh
            .add_tile(tile)
            .map_err(|e| Error::Corrupt(format!("tile {}: {}", i, e)))?;
    }

    let trailing = data.len() - cursor.position() as usize;
    if trailing > 0 {
        log::debug!("Ignoring {} trailing bytes after the last tile", trailing);
    }

    log::info!(
        "Loaded navmesh: {} tiles, {} verts per poly",
        nav_mesh.tile_count(),
        verts_per_poly
    );
    Ok(nav_mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_values() {
        assert_eq!(NAVMESHSET_MAGIC, 0x4D53_4554);
        assert_eq!(DT_NAVMESH_MAGIC, 0x444E_4156);
        assert_eq!(NAVMESHSET_MAGIC.to_le_bytes(), *b"TESM");
    }

    #[test]
    fn test_struct_sizes() -> Result<()> {
        let mut buf = Vec::new();
        MeshHeader::from_tile_header(&TileHeader::default()).write_to(&mut buf)?;
        assert_eq!(buf.len(), MESH_HEADER_SIZE);

        buf.clear();
        PolyData::from_poly(0, &Poly::new(DT_VERTS_PER_POLYGON))?.write_to(&mut buf)?;
        assert_eq!(buf.len(), POLY_SIZE);

        buf.clear();
        PolyDetailData::from(&PolyDetail::default()).write_to(&mut buf)?;
        assert_eq!(buf.len(), POLY_DETAIL_SIZE);

        buf.clear();
        BvNodeData {
            bmin: [0; 3],
            bmax: [0; 3],
            i: 0,
        }
        .write_to(&mut buf)?;
        assert_eq!(buf.len(), BV_NODE_SIZE);

        buf.clear();
        OffMeshConnectionData {
            pos: [0.0; 6],
            rad: 0.0,
            poly: 0,
            flags: 0,
            side: 0,
            user_id: 0,
        }
        .write_to(&mut buf)?;
        assert_eq!(buf.len(), OFF_MESH_CON_SIZE);

        buf.clear();
        NavMeshParamsData {
            origin: [0.0; 3],
            tile_width: 1.0,
            tile_height: 1.0,
            max_tiles: 1,
            max_polys: 1,
        }
        .write_to(&mut buf)?;
        assert_eq!(buf.len(), PARAMS_SIZE);
        Ok(())
    }

    #[test]
    fn test_tile_data_size() {
        let mut header = TileHeader::default();
        assert_eq!(tile_data_size(&header), Some(MESH_HEADER_SIZE));

        header.vert_count = 4;
        header.poly_count = 2;
        header.max_link_count = 6;
        header.detail_mesh_count = 2;
        header.detail_tri_count = 2;
        header.bv_node_count = 3;
        header.off_mesh_con_count = 1;
        assert_eq!(
            tile_data_size(&header),
            Some(100 + 48 + 64 + 72 + 24 + 8 + 48 + 36)
        );

        header.detail_vert_count = -1;
        assert_eq!(tile_data_size(&header), None);
    }

    #[test]
    fn test_poly_padding() -> Result<()> {
        let mut poly = Poly::new(DT_VERTS_PER_POLYGON);
        poly.vert_count = 3;
        poly.verts[..3].copy_from_slice(&[4, 5, 6]);
        poly.neis[..3].copy_from_slice(&[1, 0x8000, 2]);
        poly.flags = 1;
        poly.set_area(63);

        let mut buf = Vec::new();
        PolyData::from_poly(0, &poly)?.write_to(&mut buf)?;

        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_u32::<LittleEndian>()?, DT_NULL_LINK);
        let verts: Vec<u16> = (0..6)
            .map(|_| cursor.read_u16::<LittleEndian>())
            .collect::<std::io::Result<_>>()?;
        assert_eq!(verts, vec![4, 5, 6, 0, 0, 0]);
        let neis: Vec<u16> = (0..6)
            .map(|_| cursor.read_u16::<LittleEndian>())
            .collect::<std::io::Result<_>>()?;
        assert_eq!(neis, vec![1, 0x8000, 2, 0, 0, 0]);
        assert_eq!(cursor.read_u16::<LittleEndian>()?, 1);
        assert_eq!(cursor.read_u8()?, 3);
        assert_eq!(cursor.read_u8()?, 63);
        Ok(())
    }

    #[test]
    fn test_oversized_poly_rejected() {
        let mut poly = Poly::new(8);
        poly.vert_count = 7;
        assert!(matches!(
            PolyData::from_poly(3, &poly),
            Err(Error::InconsistentTile(_))
        ));
    }
}
