#![warn(missing_docs)]

//! STEP to OFF conversion.
//!
//! Runs the whole pipeline for one file: parse the exchange structure, index
//! the records, resolve the B-rep topology, build a triangle mesh and write
//! it as OFF. Every call owns its own state, so conversions may run on
//! separate threads without coordination.
//!
//! ```no_run
//! use stepoff::{convert_file, ConvertOptions};
//!
//! let report = convert_file("part.step", "part.off", &ConvertOptions::default()).unwrap();
//! println!("{} vertices, {} triangles", report.vertices, report.triangles);
//! ```

mod error;

use std::fs;
use std::path::Path;

use serde::Serialize;
use stepoff_mesh::{build_mesh, export_off, MeshInput};
use stepoff_step::{parse_step, read_step, resolve, EntityStore, StepFile};

pub use error::ConvertError;
pub use stepoff_mesh::{LoopPolicy, Mesh, MeshOptions as ConvertOptions, Strategy};

/// Summary of one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertReport {
    /// Distinct data records.
    pub records: usize,
    /// Schemas named in the header.
    pub schemas: Vec<String>,
    /// Statements that could not be parsed.
    pub malformed: usize,
    /// Records replaced by a later record with the same ID.
    pub duplicates: usize,
    /// Entities skipped because of badly shaped parameters.
    pub skipped: usize,
    /// Resolved CARTESIAN_POINTs.
    pub points: usize,
    /// Face bounds found.
    pub faces: usize,
    /// Strategy that produced the mesh.
    pub strategy: Strategy,
    /// Whether triangles came from grouping consecutive vertices.
    pub grouped_sequentially: bool,
    /// Output vertices.
    pub vertices: usize,
    /// Output triangles.
    pub triangles: usize,
}

/// A converted mesh and its report.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The mesh, ready for export.
    pub mesh: Mesh,
    /// What happened on the way.
    pub report: ConvertReport,
}

/// Convert STEP text held in memory.
pub fn convert_bytes(data: &[u8], options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    convert(parse_step(data), options)
}

/// Convert the STEP file at `input` and write the mesh to `output` as OFF.
///
/// Reading, parsing and meshing all happen before `output` is opened, so a
/// conversion that fails on the input leaves an existing output file as it
/// was. If writing fails part way, the truncated output file is removed.
pub fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<ConvertReport, ConvertError> {
    let (input, output) = (input.as_ref(), output.as_ref());
    tracing::info!(path = %input.display(), "reading STEP file");

    let file = read_step(input).map_err(|source| ConvertError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let Conversion { mesh, report } = convert(file, options)?;

    if let Err(source) = export_off(&mesh, output) {
        if let Err(err) = fs::remove_file(output) {
            tracing::debug!(path = %output.display(), error = %err, "could not remove partial output");
        }
        return Err(ConvertError::Write {
            path: output.to_path_buf(),
            source,
        });
    }
    tracing::info!(
        path = %output.display(),
        vertices = report.vertices,
        triangles = report.triangles,
        "wrote OFF file"
    );
    Ok(report)
}

fn convert(file: StepFile, options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    let schemas = file.schemas();
    let malformed = file.malformed.len();
    if malformed > 0 {
        tracing::warn!(malformed, "skipped unparseable statements");
    }

    let store = EntityStore::index(file.records);
    let topology = resolve(&store);
    tracing::info!(
        records = store.len(),
        points = topology.points.len(),
        faces = topology.faces.len(),
        "resolved topology"
    );

    let built = build_mesh(&MeshInput {
        store: &store,
        topology: &topology,
        options,
    })?;
    if let Some((min, max)) = built.mesh.bounds() {
        tracing::debug!(?min, ?max, "mesh bounds");
    }

    let report = ConvertReport {
        records: store.len(),
        schemas,
        malformed,
        duplicates: store.duplicates(),
        skipped: topology.skipped.len(),
        points: topology.points.len(),
        faces: topology.faces.len(),
        strategy: built.strategy,
        grouped_sequentially: built.grouped_sequentially,
        vertices: built.mesh.num_vertices(),
        triangles: built.mesh.num_triangles(),
    };
    Ok(Conversion {
        mesh: built.mesh,
        report,
    })
}
