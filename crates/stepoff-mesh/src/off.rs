//! OFF (Object File Format) export.
//!
//! Layout: `OFF`, then `<vertices> <faces> 0`, one `x y z` line per vertex and
//! one `3 i j k` line per triangle. Coordinates use the shortest decimal form
//! that reads back to the same `f64`.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::mesh::Mesh;

struct Off<'a>(&'a Mesh);

impl fmt::Display for Off<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mesh = self.0;
        writeln!(f, "OFF")?;
        writeln!(f, "{} {} 0", mesh.num_vertices(), mesh.num_triangles())?;
        for v in &mesh.vertices {
            writeln!(f, "{} {} {}", v.x, v.y, v.z)?;
        }
        for [a, b, c] in &mesh.triangles {
            writeln!(f, "3 {a} {b} {c}")?;
        }
        Ok(())
    }
}

/// Write a mesh in OFF format to any writer.
pub fn write_off<W: Write>(mesh: &Mesh, writer: &mut W) -> io::Result<()> {
    write!(writer, "{}", Off(mesh))
}

/// Render a mesh as OFF text.
pub fn to_off_string(mesh: &Mesh) -> String {
    Off(mesh).to_string()
}

/// Write a mesh to an OFF file, replacing any existing file.
pub fn export_off(mesh: &Mesh, path: impl AsRef<Path>) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_off(mesh, &mut writer)?;
    writer.flush()
}
