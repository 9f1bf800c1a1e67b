#![warn(missing_docs)]

//! Triangle mesh extraction from resolved STEP topology.
//!
//! [`build_mesh`] turns a [`stepoff_step::Topology`] into an indexed triangle
//! mesh, welding vertices by rounded coordinates and falling back to raw
//! point extraction when no usable face loops exist. [`export_off`] writes
//! the result as OFF text.

mod build;
mod error;
mod mesh;
mod off;

pub use build::{
    brep_faces, build_mesh, fan_triangulate, group_sequential, point_cloud, BuiltMesh,
    LoopPolicy, MeshInput, MeshOptions, Strategy,
};
pub use error::{MeshError, Result};
pub use mesh::{Mesh, VertexIndex};
pub use off::{export_off, to_off_string, write_off};
