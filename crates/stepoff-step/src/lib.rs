#![warn(missing_docs)]

//! Best-effort STEP (ISO 10303-21) reading for mesh extraction.
//!
//! Parses the exchange structure into flat records, indexes them by instance
//! ID, and resolves the B-rep chain
//! `CARTESIAN_POINT → VERTEX_POINT → EDGE_CURVE → EDGE_LOOP → FACE_BOUND`
//! into plain ID maps. Nothing here fails on a single bad record: malformed
//! statements and badly shaped entities are reported and skipped.
//!
//! # Example
//!
//! ```no_run
//! use stepoff_step::{read_step, resolve, EntityStore};
//!
//! let file = read_step("part.step").unwrap();
//! let store = EntityStore::index(file.records);
//! let topology = resolve(&store);
//! println!("{} faces", topology.faces.len());
//! ```

mod error;
mod lexer;
mod parser;
mod resolve;
mod store;

pub mod entities;

use std::path::Path;

pub use error::StepError;
pub use parser::{Param, Parser, Record, StepFile};
pub use resolve::{resolve, EdgeUse, Topology};
pub use store::EntityStore;

/// Read and parse a STEP file from a path.
///
/// Only I/O failure is an error; see [`parse_step`].
pub fn read_step(path: impl AsRef<Path>) -> Result<StepFile, StepError> {
    let data = std::fs::read(path)?;
    Ok(parse_step(&data))
}

/// Parse STEP text from a byte buffer, skipping statements that cannot be
/// parsed.
pub fn parse_step(data: &[u8]) -> StepFile {
    Parser::parse(data)
}
