//! I/O for meshkit meshes
//!
//! Reads and writes the line-oriented face/vertex text format (an OBJ
//! subset) used for mesh input.

pub mod error;
pub mod obj;

pub use error::*;
pub use obj::{ObjOptions, ObjReader, ObjWriter};

use meshkit_core::{Error, Result, TriangleMesh};
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh(&self, path: &Path) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh(&self, mesh: &TriangleMesh, path: &Path) -> Result<()>;
}

/// Read a mesh, picking the reader from the file extension
pub fn read_mesh<P: AsRef<Path>>(path: P, options: ObjOptions) -> Result<TriangleMesh> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("obj") | None => ObjReader::new(options).read_mesh(path),
        Some(other) => Err(Error::Unsupported(format!("Unsupported mesh format: {}", other))),
    }
}

/// Write a mesh, picking the writer from the file extension
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P, options: ObjOptions) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("obj") | None => ObjWriter::new(options).write_mesh(mesh, path),
        Some(other) => Err(Error::Unsupported(format!("Unsupported mesh format: {}", other))),
    }
}
