//! Topology resolver: walks the entity store and builds the id maps the mesh
//! builder consumes.

use std::collections::HashMap;

use nalgebra::Point3;

use crate::entities::{
    parse_cartesian_point, parse_edge_curve, parse_edge_loop, parse_face_bound,
    parse_oriented_edge, parse_vertex_point, StepEdge, StepFaceBound, StepOrientedEdge,
};
use crate::error::StepError;
use crate::parser::Record;
use crate::store::EntityStore;

/// An edge as traversed by a loop: start and end vertex after applying the
/// ORIENTED_EDGE orientation, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeUse {
    /// Vertex the traversal starts at.
    pub start_vertex_id: u64,
    /// Vertex the traversal ends at.
    pub end_vertex_id: u64,
}

impl EdgeUse {
    /// The same edge traversed the other way.
    pub fn reversed(self) -> Self {
        Self {
            start_vertex_id: self.end_vertex_id,
            end_vertex_id: self.start_vertex_id,
        }
    }
}

/// Resolved B-rep topology of one file. All maps store IDs, never borrowed
/// records.
#[derive(Debug, Default)]
pub struct Topology {
    /// CARTESIAN_POINT id → coordinates.
    pub points: HashMap<u64, Point3<f64>>,
    /// VERTEX_POINT id → CARTESIAN_POINT id.
    pub vertices: HashMap<u64, u64>,
    /// EDGE_CURVE id → (start vertex, end vertex).
    pub edges: HashMap<u64, StepEdge>,
    /// ORIENTED_EDGE id → (edge, orientation).
    pub oriented_edges: HashMap<u64, StepOrientedEdge>,
    /// EDGE_LOOP id → edge references in loop order.
    pub loops: HashMap<u64, Vec<u64>>,
    /// FACE_OUTER_BOUND / FACE_BOUND records, in file order.
    pub faces: Vec<StepFaceBound>,
    /// Records skipped because their parameters had the wrong shape.
    pub skipped: Vec<StepError>,
}

impl Topology {
    /// Coordinates of a topological vertex, if its point chain resolves.
    pub fn vertex_point(&self, vertex_id: u64) -> Option<Point3<f64>> {
        let point_id = self.vertices.get(&vertex_id)?;
        self.points.get(point_id).copied()
    }

    /// Resolve a loop entry. Entries may name an EDGE_CURVE directly or an
    /// ORIENTED_EDGE wrapping one; a `.F.` orientation swaps start and end.
    pub fn edge_use(&self, edge_ref: u64) -> Option<EdgeUse> {
        if let Some(edge) = self.edges.get(&edge_ref) {
            return Some(EdgeUse {
                start_vertex_id: edge.start_vertex_id,
                end_vertex_id: edge.end_vertex_id,
            });
        }
        let oriented = self.oriented_edges.get(&edge_ref)?;
        let edge = self.edges.get(&oriented.edge_id)?;
        let forward = EdgeUse {
            start_vertex_id: edge.start_vertex_id,
            end_vertex_id: edge.end_vertex_id,
        };
        Some(if oriented.orientation {
            forward
        } else {
            forward.reversed()
        })
    }
}

/// Build the topology maps in dependency order, one pass per entity kind.
///
/// Never fails. A record whose parameters have the wrong shape is skipped and
/// recorded in [`Topology::skipped`].
pub fn resolve(store: &EntityStore) -> Topology {
    let mut topo = Topology::default();

    for (id, point) in collect(store, "CARTESIAN_POINT", &mut topo.skipped, parse_cartesian_point) {
        topo.points.insert(id, point);
    }
    for (id, vertex) in collect(store, "VERTEX_POINT", &mut topo.skipped, parse_vertex_point) {
        topo.vertices.insert(id, vertex.point_id);
    }
    for (id, edge) in collect(store, "EDGE_CURVE", &mut topo.skipped, parse_edge_curve) {
        topo.edges.insert(id, edge);
    }
    for (id, oriented) in collect(store, "ORIENTED_EDGE", &mut topo.skipped, parse_oriented_edge) {
        topo.oriented_edges.insert(id, oriented);
    }
    for (id, edge_loop) in collect(store, "EDGE_LOOP", &mut topo.skipped, parse_edge_loop) {
        topo.loops.insert(id, edge_loop.edge_ids);
    }

    // Outer and inner bounds are interleaved in file order.
    for record in store.iter() {
        if record.keyword != "FACE_OUTER_BOUND" && record.keyword != "FACE_BOUND" {
            continue;
        }
        match parse_face_bound(record) {
            Ok(bound) => topo.faces.push(bound),
            Err(err) => skip(&mut topo.skipped, record, err),
        }
    }

    tracing::debug!(
        points = topo.points.len(),
        vertices = topo.vertices.len(),
        edges = topo.edges.len(),
        oriented_edges = topo.oriented_edges.len(),
        loops = topo.loops.len(),
        faces = topo.faces.len(),
        skipped = topo.skipped.len(),
        "resolved topology"
    );

    topo
}

fn collect<T>(
    store: &EntityStore,
    keyword: &str,
    skipped: &mut Vec<StepError>,
    parse: impl Fn(&Record) -> Result<T, StepError>,
) -> Vec<(u64, T)> {
    let mut out = Vec::new();
    for record in store.all_of_kind(keyword) {
        match parse(record) {
            Ok(value) => out.push((record.id, value)),
            Err(err) => skip(skipped, record, err),
        }
    }
    out
}

fn skip(skipped: &mut Vec<StepError>, record: &Record, err: StepError) {
    tracing::debug!(id = record.id, keyword = %record.keyword, error = %err, "skipping record");
    skipped.push(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn topology(input: &str) -> Topology {
        resolve(&EntityStore::index(Parser::parse(input.as_bytes()).records))
    }

    const TRIANGLE: &str = r#"
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#3 = CARTESIAN_POINT('', (0.0, 1.0, 0.0));
#11 = VERTEX_POINT('', #1);
#12 = VERTEX_POINT('', #2);
#13 = VERTEX_POINT('', #3);
#21 = EDGE_CURVE('', #11, #12, #99, .T.);
#22 = EDGE_CURVE('', #12, #13, #99, .T.);
#23 = EDGE_CURVE('', #13, #11, #99, .T.);
#31 = EDGE_LOOP('', (#21, #22, #23));
#41 = FACE_OUTER_BOUND('', #31, .T.);
"#;

    #[test]
    fn test_resolve_triangle() {
        let topo = topology(TRIANGLE);
        assert_eq!(topo.points.len(), 3);
        assert_eq!(topo.vertices[&12], 2);
        assert_eq!(topo.edges[&22].end_vertex_id, 13);
        assert_eq!(topo.loops[&31], vec![21, 22, 23]);
        assert_eq!(topo.faces.len(), 1);
        assert_eq!(topo.faces[0].loop_id, 31);
        assert!(topo.skipped.is_empty());
        assert_eq!(topo.vertex_point(13), Some(Point3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_malformed_edge_is_skipped_alone() {
        let input = format!("{TRIANGLE}\n#24 = EDGE_CURVE('', #11);");
        let topo = topology(&input);
        assert_eq!(topo.edges.len(), 3);
        assert_eq!(topo.skipped.len(), 1);
        assert!(matches!(
            topo.skipped[0],
            StepError::Argument { entity_id: Some(24), .. }
        ));
    }

    #[test]
    fn test_oriented_edge_use_is_reversed() {
        let input = format!(
            "{TRIANGLE}\n#50 = ORIENTED_EDGE('', *, *, #21, .F.);\n#51 = ORIENTED_EDGE('', *, *, #21, .T.);"
        );
        let topo = topology(&input);
        let reversed = topo.edge_use(50).unwrap();
        assert_eq!((reversed.start_vertex_id, reversed.end_vertex_id), (12, 11));
        let forward = topo.edge_use(51).unwrap();
        assert_eq!((forward.start_vertex_id, forward.end_vertex_id), (11, 12));
        assert_eq!(topo.edge_use(21), Some(forward));
        assert!(topo.edge_use(999).is_none());
    }

    #[test]
    fn test_faces_keep_file_order() {
        let input = format!(
            "{TRIANGLE}\n#42 = FACE_BOUND('', #31, .T.);\n#43 = FACE_OUTER_BOUND('', #31, .T.);"
        );
        let topo = topology(&input);
        let ids: Vec<u64> = topo.faces.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![41, 42, 43]);
        assert!(!topo.faces[1].is_outer);
    }

    #[test]
    fn test_unresolved_vertex_chain() {
        let topo = topology("#11 = VERTEX_POINT('', #404);");
        assert_eq!(topo.vertices.len(), 1);
        assert!(topo.vertex_point(11).is_none());
    }
}
