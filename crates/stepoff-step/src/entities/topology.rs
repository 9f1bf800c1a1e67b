//! Topology entities: vertex, edge, loop, face bound, shell, and solid.

use super::{expect_kind, EntityArgs};
use crate::error::StepError;
use crate::parser::Record;

/// Parsed VERTEX_POINT record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepVertex {
    /// The entity ID.
    pub id: u64,
    /// The CARTESIAN_POINT it sits on.
    pub point_id: u64,
}

/// Parsed EDGE_CURVE record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEdge {
    /// The entity ID.
    pub id: u64,
    /// Start vertex entity ID.
    pub start_vertex_id: u64,
    /// End vertex entity ID.
    pub end_vertex_id: u64,
}

/// Parsed ORIENTED_EDGE record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOrientedEdge {
    /// The entity ID.
    pub id: u64,
    /// The underlying EDGE_CURVE entity ID.
    pub edge_id: u64,
    /// `true` when the loop traverses the edge from start to end.
    pub orientation: bool,
}

/// Parsed EDGE_LOOP record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEdgeLoop {
    /// The entity ID.
    pub id: u64,
    /// Edge references in loop order (EDGE_CURVE or ORIENTED_EDGE IDs).
    pub edge_ids: Vec<u64>,
}

/// Parsed FACE_BOUND / FACE_OUTER_BOUND record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepFaceBound {
    /// The entity ID.
    pub id: u64,
    /// The loop entity ID.
    pub loop_id: u64,
    /// `.F.` means the loop is traversed in reverse for this face.
    pub orientation: bool,
    /// Whether this is an outer bound. Inner bounds (holes) are kept but
    /// not subtracted.
    pub is_outer: bool,
}

/// Parsed CLOSED_SHELL / OPEN_SHELL record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepShell {
    /// The entity ID.
    pub id: u64,
    /// Face entity IDs.
    pub face_ids: Vec<u64>,
}

/// Parsed MANIFOLD_SOLID_BREP record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSolid {
    /// The entity ID.
    pub id: u64,
    /// The outer shell entity ID.
    pub outer_shell_id: u64,
}

/// Parse a VERTEX_POINT record: `VERTEX_POINT(name, #point)`.
pub fn parse_vertex_point(record: &Record) -> Result<StepVertex, StepError> {
    expect_kind(record, &["VERTEX_POINT"])?;
    Ok(StepVertex {
        id: record.id,
        point_id: record.reference(1)?,
    })
}

/// Parse an EDGE_CURVE record: `EDGE_CURVE(name, #start, #end, #curve, .T.)`.
///
/// Only the two vertex references are read.
pub fn parse_edge_curve(record: &Record) -> Result<StepEdge, StepError> {
    expect_kind(record, &["EDGE_CURVE"])?;
    Ok(StepEdge {
        id: record.id,
        start_vertex_id: record.reference(1)?,
        end_vertex_id: record.reference(2)?,
    })
}

/// Parse an ORIENTED_EDGE record: `ORIENTED_EDGE(name, *, *, #edge, .T.)`.
pub fn parse_oriented_edge(record: &Record) -> Result<StepOrientedEdge, StepError> {
    expect_kind(record, &["ORIENTED_EDGE"])?;
    Ok(StepOrientedEdge {
        id: record.id,
        edge_id: record.reference(3)?,
        orientation: record.flag(4)?,
    })
}

/// Parse an EDGE_LOOP record: `EDGE_LOOP(name, (#e1, #e2, ...))`.
pub fn parse_edge_loop(record: &Record) -> Result<StepEdgeLoop, StepError> {
    expect_kind(record, &["EDGE_LOOP"])?;
    Ok(StepEdgeLoop {
        id: record.id,
        edge_ids: record.reference_list(1)?,
    })
}

/// Parse a FACE_BOUND or FACE_OUTER_BOUND record: `FACE_BOUND(name, #loop, .T.)`.
///
/// A missing or unreadable orientation flag defaults to `.T.`.
pub fn parse_face_bound(record: &Record) -> Result<StepFaceBound, StepError> {
    expect_kind(record, &["FACE_BOUND", "FACE_OUTER_BOUND"])?;
    Ok(StepFaceBound {
        id: record.id,
        loop_id: record.reference(1)?,
        orientation: record.flag(2).unwrap_or(true),
        is_outer: record.keyword == "FACE_OUTER_BOUND",
    })
}

/// Parse a CLOSED_SHELL or OPEN_SHELL record: `CLOSED_SHELL(name, (#f1, ...))`.
pub fn parse_shell(record: &Record) -> Result<StepShell, StepError> {
    expect_kind(record, &["CLOSED_SHELL", "OPEN_SHELL"])?;
    Ok(StepShell {
        id: record.id,
        face_ids: record.reference_list(1)?,
    })
}

/// Parse a MANIFOLD_SOLID_BREP record: `MANIFOLD_SOLID_BREP(name, #shell)`.
pub fn parse_manifold_solid_brep(record: &Record) -> Result<StepSolid, StepError> {
    expect_kind(record, &["MANIFOLD_SOLID_BREP"])?;
    Ok(StepSolid {
        id: record.id,
        outer_shell_id: record.reference(1)?,
    })
}
