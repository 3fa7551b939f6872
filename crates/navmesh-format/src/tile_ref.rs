//! Bit-packed tile and polygon references
//!
//! A reference packs `salt | tile index | poly index` into one 32-bit word,
//! highest field first. The widths of the tile and poly fields are derived
//! from the navmesh parameters, so the same tile can have different
//! references in different processes.

/// Salt written for every tile in a container; 0 marks an invalid reference
pub const DT_CONTAINER_SALT: u32 = 1;

/// Floor of log2, with 0 for non-positive input
#[inline]
pub fn ilog2(value: i32) -> u32 {
    if value <= 0 {
        0
    } else {
        31 - (value as u32).leading_zeros()
    }
}

/// Smallest power of two that is `>= value`, with 1 for non-positive input
#[inline]
pub fn next_pow2(value: i32) -> i32 {
    if value <= 1 {
        1
    } else {
        (value as u32).next_power_of_two() as i32
    }
}

/// Packs a salt, tile index and polygon index into a reference.
///
/// Shift amounts wrap modulo 32 and fields are not masked, matching the
/// reader this format is exchanged with.
#[inline]
pub fn pack_tile_ref(salt: u32, tile_index: u32, poly_index: u32, tile_bits: u32, poly_bits: u32) -> u32 {
    salt.wrapping_shl(poly_bits + tile_bits) | tile_index.wrapping_shl(poly_bits) | poly_index
}

/// Splits a reference back into `(salt, tile_index, poly_index)`
#[inline]
pub fn unpack_tile_ref(reference: u32, tile_bits: u32, poly_bits: u32) -> (u32, u32, u32) {
    let poly_mask = mask(poly_bits);
    let tile_mask = mask(tile_bits);
    let poly = reference & poly_mask;
    let tile = (reference >> poly_bits.min(31)) & tile_mask;
    let salt = if poly_bits + tile_bits >= 32 {
        0
    } else {
        reference >> (poly_bits + tile_bits)
    };
    (salt, tile, poly)
}

#[inline]
fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Bit layout of references in a container file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRefLayout {
    pub tile_bits: u32,
    pub poly_bits: u32,
}

impl TileRefLayout {
    /// Layout the container format derives from `maxTiles` / `maxPolys`
    pub fn for_container(max_tiles: i32, max_polys: i32) -> Self {
        Self {
            tile_bits: ilog2(max_tiles),
            poly_bits: ilog2(max_polys),
        }
    }

    /// Layout used for in-process references, rounded up so every slot fits
    pub fn for_runtime(max_tiles: i32, max_polys: i32) -> Self {
        Self {
            tile_bits: ilog2(next_pow2(max_tiles)),
            poly_bits: ilog2(next_pow2(max_polys)),
        }
    }

    /// Reference of a whole tile (polygon index 0)
    pub fn tile_ref(&self, salt: u32, tile_index: u32) -> u32 {
        pack_tile_ref(salt, tile_index, 0, self.tile_bits, self.poly_bits)
    }

    pub fn poly_ref(&self, salt: u32, tile_index: u32, poly_index: u32) -> u32 {
        pack_tile_ref(salt, tile_index, poly_index, self.tile_bits, self.poly_bits)
    }
}
