//! Tiled navigation mesh model and its binary container format
//!
//! [`TiledNavMesh`] holds tiles laid out like the native Detour structures.
//! [`serialize`] and [`deserialize`] convert it to and from the `MSET`
//! container consumed by native runtimes.

pub mod binary_format;
mod nav_mesh;
mod tile_ref;

pub use binary_format::{deserialize, deserialize_tile, serialize, serialize_tile, tile_data_size};
pub use nav_mesh::*;
pub use tile_ref::*;
