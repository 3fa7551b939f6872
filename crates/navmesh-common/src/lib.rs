//! Common utilities and data structures shared by the navmesh format and bake crates

mod bounds;
mod mesh;

pub use bounds::*;
pub use mesh::*;

use std::path::PathBuf;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Represents an affine world transform
pub type Mat4 = glam::Mat4;

/// Broad classification of [`Error`] values.
///
/// Callers use this to tell "never baked" (`Io`) apart from "corrupt bake"
/// (`Format`) without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input: no geometry, no output location, malformed meshes
    Input,
    /// Malformed binary data, either read or about to be written
    Format,
    /// The navmesh build library reported a failure
    Build,
    /// File missing, unreadable or unwritable
    Io,
}

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no navmesh geometry found")]
    NoGeometry,

    #[error("scene has no output location; save the scene first")]
    NoOutputLocation,

    #[error("invalid input mesh: {0}")]
    InvalidMesh(String),

    #[error("invalid build settings: {0}")]
    InvalidSettings(String),

    #[error("wrong magic: found {found:#010x}, expected {expected:#010x}")]
    WrongMagic { found: u32, expected: u32 },

    #[error("unsupported version {found}, expected {expected}")]
    WrongVersion { found: u32, expected: u32 },

    #[error("navmesh data truncated: {0}")]
    Truncated(String),

    #[error("navmesh data corrupted: {0}")]
    Corrupt(String),

    #[error("inconsistent tile data: {0}")]
    InconsistentTile(String),

    #[error("navmesh build failed: {0}")]
    Build(String),

    #[error("navmesh data not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoGeometry
            | Error::NoOutputLocation
            | Error::InvalidMesh(_)
            | Error::InvalidSettings(_) => ErrorKind::Input,
            Error::WrongMagic { .. }
            | Error::WrongVersion { .. }
            | Error::Truncated(_)
            | Error::Corrupt(_)
            | Error::InconsistentTile(_) => ErrorKind::Format,
            Error::Build(_) => ErrorKind::Build,
            Error::NotFound(_) | Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type for navmesh operations
pub type Result<T> = std::result::Result<T, Error>;
