//! OBJ-style face/vertex text format
//!
//! Only `v` and `f` records are interpreted. Texture and normal records
//! (`vt`, `vn`) and every other line are skipped. Face tokens of the form
//! `i/j/k` keep their first (vertex) index; polygons are fan-triangulated.

use crate::error::IoError;
use crate::{MeshReader, MeshWriter};
use meshkit_core::{Point3f, Result, TriangleMesh};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Reading and writing options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjOptions {
    /// Source faces are wound the other way; `f a b c` is stored as `a c b`
    pub counter_clockwise: bool,
}

impl ObjOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter_clockwise(mut self, ccw: bool) -> Self {
        self.counter_clockwise = ccw;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjReader {
    pub options: ObjOptions,
}

#[derive(Debug, Clone, Default)]
pub struct ObjWriter {
    pub options: ObjOptions,
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(token: &str, vertex_count: usize, line: usize) -> std::result::Result<usize, IoError> {
    let raw = token.split('/').next().unwrap_or(token);
    let value: i64 = raw
        .parse()
        .map_err(|_| IoError::parse(line, format!("invalid face index '{}'", token)))?;
    let index = match value {
        v if v > 0 => (v - 1) as usize,
        v if v < 0 => match vertex_count.checked_sub(v.unsigned_abs() as usize) {
            Some(i) => i,
            None => return Err(IoError::parse(line, format!("relative index {} out of range", v))),
        },
        _ => return Err(IoError::parse(line, "face index 0 is not valid")),
    };
    if index >= vertex_count {
        return Err(IoError::parse(
            line,
            format!("face index {} out of range for {} vertices", value, vertex_count),
        ));
    }
    Ok(index)
}

impl ObjReader {
    pub fn new(options: ObjOptions) -> Self {
        Self { options }
    }

    /// Parse a mesh from any buffered source
    pub fn read<R: BufRead>(&self, reader: R) -> std::result::Result<TriangleMesh, IoError> {
        let mut vertices: Vec<Point3f> = Vec::new();
        let mut faces: Vec<[usize; 3]> = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let number = i + 1;
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("v") => {
                    let mut coords = [0.0f32; 3];
                    for c in coords.iter_mut() {
                        let token = tokens
                            .next()
                            .ok_or_else(|| IoError::parse(number, "vertex needs three coordinates"))?;
                        *c = token
                            .parse()
                            .map_err(|_| IoError::parse(number, format!("invalid coordinate '{}'", token)))?;
                    }
                    vertices.push(Point3f::new(coords[0], coords[1], coords[2]));
                }
                Some("f") => {
                    let polygon = tokens
                        .map(|t| resolve_index(t, vertices.len(), number))
                        .collect::<std::result::Result<Vec<usize>, IoError>>()?;
                    if polygon.len() < 3 {
                        return Err(IoError::parse(number, "face needs at least three indices"));
                    }
                    for k in 1..polygon.len() - 1 {
                        let (a, b, c) = (polygon[0], polygon[k], polygon[k + 1]);
                        faces.push(if self.options.counter_clockwise { [a, c, b] } else { [a, b, c] });
                    }
                }
                _ => {}
            }
        }

        log::debug!("parsed {} vertices and {} triangles", vertices.len(), faces.len());
        // indices were validated while parsing
        TriangleMesh::from_vertices_and_faces(vertices, faces)
            .map_err(|e| IoError::parse(0, e.to_string()))
    }

    /// Parse the file at `path`
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> std::result::Result<TriangleMesh, IoError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => IoError::Io(e),
        })?;
        self.read(BufReader::new(file))
    }
}

impl ObjWriter {
    pub fn new(options: ObjOptions) -> Self {
        Self { options }
    }

    /// Write every vertex and the live triangles, 1-based
    pub fn write<W: Write>(&self, mesh: &TriangleMesh, writer: W) -> std::result::Result<(), IoError> {
        let mut out = BufWriter::new(writer);
        for v in &mesh.vertices {
            writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for [a, b, c] in mesh.faces() {
            let (b, c) = if self.options.counter_clockwise { (c, b) } else { (b, c) };
            writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn write_path<P: AsRef<Path>>(&self, mesh: &TriangleMesh, path: P) -> std::result::Result<(), IoError> {
        let file = File::create(path)?;
        self.write(mesh, file)
    }
}

impl MeshReader for ObjReader {
    fn read_mesh(&self, path: &Path) -> Result<TriangleMesh> {
        Ok(self.read_path(path)?)
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh(&self, mesh: &TriangleMesh, path: &Path) -> Result<()> {
        Ok(self.write_path(mesh, path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CUBE: &str = "\
# unit cube
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 1 3 2
f 1 4 3
f 5 6 7
f 5 7 8
f 1 2 6
f 1 6 5
f 4 8 7
f 4 7 3
f 1 5 8
f 1 8 4
f 2 3 7
f 2 7 6
";

    fn read_str(text: &str, options: ObjOptions) -> std::result::Result<TriangleMesh, IoError> {
        ObjReader::new(options).read(text.as_bytes())
    }

    #[test]
    fn test_read_cube() {
        let mesh = read_str(CUBE, ObjOptions::default()).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.triangles[0].indices, [0, 2, 1]);
        let b = mesh.bounding_box().unwrap();
        assert_relative_eq!(b.max.x, 1.0);
    }

    #[test]
    fn test_counter_clockwise_swaps_last_two() {
        let mesh = read_str(CUBE, ObjOptions::new().with_counter_clockwise(true)).unwrap();
        assert_eq!(mesh.triangles[0].indices, [0, 1, 2]);
    }

    #[test]
    fn test_texture_and_normal_records_are_skipped() {
        let text = "v 0 0 0\nvt 0.5 0.5\nvn 0 0 1\nv 1 0 0\nv 0 1 0\nf 1/1/1 2/1/1 3/1/1\n";
        let mesh = read_str(text, ObjOptions::default()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangles[0].indices, [0, 1, 2]);
    }

    #[test]
    fn test_polygon_fan() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = read_str(text, ObjOptions::default()).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.triangles[1].indices, [0, 2, 3]);
    }

    #[test]
    fn test_relative_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = read_str(text, ObjOptions::default()).unwrap();
        assert_eq!(mesh.triangles[0].indices, [0, 1, 2]);
    }

    #[test]
    fn test_malformed_input() {
        let bad_index = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n";
        assert!(matches!(
            read_str(bad_index, ObjOptions::default()),
            Err(IoError::ParseError { line: 4, .. })
        ));
        let bad_coord = "v 0 zero 0\n";
        assert!(matches!(
            read_str(bad_coord, ObjOptions::default()),
            Err(IoError::ParseError { line: 1, .. })
        ));
        assert!(read_str("v 0 0 0\nf 1 1\n", ObjOptions::default()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("meshkit_io_does_not_exist.obj");
        let err = ObjReader::default().read_path(&path).unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
        let core: meshkit_core::Error = err.into();
        assert!(matches!(core, meshkit_core::Error::Io(_)));
    }

    #[test]
    fn test_write_then_read_keeps_live_faces() {
        let mut mesh = read_str(CUBE, ObjOptions::default()).unwrap();
        mesh.triangles[3].deleted = true;

        let path = std::env::temp_dir().join("meshkit_io_write_test.obj");
        let options = ObjOptions::new().with_counter_clockwise(true);
        ObjWriter::new(options).write_mesh(&mesh, &path).unwrap();
        let back = ObjReader::new(options).read_mesh(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.face_count(), 11);
        assert_eq!(back.triangles[0].indices, mesh.triangles[0].indices);
        assert_eq!(back.vertices, mesh.vertices);
    }
}
