//! Mesh building from STEP topology.
//!
//! Strategies are tried in order until one yields at least one vertex:
//! 1. [`Strategy::BrepFaces`]: fan-triangulate every face bound's loop.
//! 2. [`Strategy::PointCloud`]: take every CARTESIAN_POINT and group them
//!    three at a time, bounded by the number of shell faces.
//!
//! Whichever mesh wins, if it has vertices but no triangles its vertices are
//! grouped into consecutive triples.

use std::fmt;

use serde::{Deserialize, Serialize};
use stepoff_step::entities::{parse_cartesian_point, parse_manifold_solid_brep, parse_shell};
use stepoff_step::{EdgeUse, EntityStore, StepError, Topology};

use crate::error::{MeshError, Result};
use crate::mesh::{Mesh, VertexIndex};

/// What to do with face loops whose edges do not form a closed chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPolicy {
    /// Use the start vertex of every edge regardless of closure.
    #[default]
    Lenient,
    /// Skip faces whose loop is not closed.
    RequireClosed,
}

/// Mesh building parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshOptions {
    /// Fractional digits used when welding vertices.
    pub precision: usize,
    /// Handling of open face loops.
    pub loop_policy: LoopPolicy,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            precision: 6,
            loop_policy: LoopPolicy::Lenient,
        }
    }
}

/// The strategy that produced a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Fan triangulation of B-rep face loops.
    BrepFaces,
    /// Raw CARTESIAN_POINT extraction.
    PointCloud,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::BrepFaces => "brep_faces",
            Strategy::PointCloud => "point_cloud",
        })
    }
}

/// Everything a strategy may look at.
#[derive(Debug, Clone, Copy)]
pub struct MeshInput<'a> {
    /// All records of the file.
    pub store: &'a EntityStore,
    /// Resolved topology maps.
    pub topology: &'a Topology,
    /// Building parameters.
    pub options: &'a MeshOptions,
}

/// A mesh together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltMesh {
    /// The mesh.
    pub mesh: Mesh,
    /// Strategy that yielded the vertices.
    pub strategy: Strategy,
    /// Whether triangles were made by grouping consecutive vertices.
    pub grouped_sequentially: bool,
}

type Attempt = fn(&MeshInput<'_>) -> Option<Mesh>;

const STRATEGIES: &[(Strategy, Attempt)] = &[
    (Strategy::BrepFaces, brep_faces),
    (Strategy::PointCloud, point_cloud),
];

/// Build a mesh, falling back through the strategies in order.
///
/// Fails with [`MeshError::EmptyGeometry`] only when no strategy finds a
/// vertex. Degenerate output (no triangles, repeated indices) is accepted.
pub fn build_mesh(input: &MeshInput<'_>) -> Result<BuiltMesh> {
    for &(strategy, attempt) in STRATEGIES {
        let Some(mut mesh) = attempt(input) else {
            tracing::debug!(%strategy, "strategy found no vertices");
            continue;
        };
        if strategy != Strategy::BrepFaces {
            tracing::warn!(%strategy, "no B-rep face geometry, using fallback extraction");
        }

        let grouped_sequentially = mesh.triangles.is_empty();
        if grouped_sequentially {
            tracing::warn!(
                vertices = mesh.num_vertices(),
                "no faces found, grouping consecutive vertices into triangles"
            );
            group_sequential(&mut mesh);
        }

        debug_assert!(mesh.indices_in_bounds());
        return Ok(BuiltMesh {
            mesh,
            strategy,
            grouped_sequentially,
        });
    }
    Err(MeshError::EmptyGeometry)
}

/// Fan-triangulate every face loop, welding shared vertices.
///
/// Each face polygon is the start vertex of every edge use in loop order,
/// walked backwards for a `.F.` face bound. Faces are visited in file order so the vertex numbering is stable.
pub fn brep_faces(input: &MeshInput<'_>) -> Option<Mesh> {
    let topo = input.topology;
    let mut mesh = Mesh::new();
    let mut index = VertexIndex::new(input.options.precision);

    for face in &topo.faces {
        let Some(edge_refs) = topo.loops.get(&face.loop_id) else {
            tracing::debug!(face = face.id, error = %StepError::UnresolvedReference(face.loop_id), "face loop missing");
            continue;
        };

        let mut uses = Vec::with_capacity(edge_refs.len());
        for &edge_ref in edge_refs {
            match topo.edge_use(edge_ref) {
                Some(edge_use) => uses.push(edge_use),
                None => tracing::debug!(face = face.id, loop_id = face.loop_id, edge = edge_ref, "unresolved loop edge"),
            }
        }

        if !face.orientation {
            uses.reverse();
            for edge_use in &mut uses {
                *edge_use = edge_use.reversed();
            }
        }
        if !face.is_outer {
            tracing::debug!(face = face.id, "inner bound triangulated as its own polygon");
        }

        if !is_closed(&uses) {
            if input.options.loop_policy == LoopPolicy::RequireClosed {
                tracing::debug!(face = face.id, "skipping face with open loop");
                continue;
            }
            tracing::debug!(face = face.id, "face loop is not closed");
        }

        let polygon: Vec<u32> = uses
            .iter()
            .filter_map(|u| topo.vertex_point(u.start_vertex_id))
            .map(|p| index.index_of(&mut mesh, p))
            .collect();
        fan_triangulate(&polygon, &mut mesh.triangles);
    }

    (!mesh.vertices.is_empty()).then_some(mesh)
}

/// Every CARTESIAN_POINT in file order, unwelded, grouped three at a time up
/// to three points per shell face.
pub fn point_cloud(input: &MeshInput<'_>) -> Option<Mesh> {
    let mut mesh = Mesh::new();
    mesh.vertices = input
        .store
        .all_of_kind("CARTESIAN_POINT")
        .filter_map(|r| parse_cartesian_point(r).ok())
        .collect();
    if mesh.vertices.is_empty() {
        return None;
    }

    let n = mesh.num_vertices();
    let face_count = shell_face_count(input.store);
    if n >= 3 && face_count > 0 {
        let bound = n.min(face_count * 3);
        for i in (0..bound).step_by(3).filter(|i| i + 2 < n) {
            let i = i as u32;
            mesh.triangles.push([i, i + 1, i + 2]);
        }
    }
    Some(mesh)
}

/// Split a polygon into `n - 2` triangles sharing its first vertex.
pub fn fan_triangulate(polygon: &[u32], triangles: &mut Vec<[u32; 3]>) {
    if polygon.len() < 3 {
        return;
    }
    let anchor = polygon[0];
    for pair in polygon[1..].windows(2) {
        triangles.push([anchor, pair[0], pair[1]]);
    }
}

/// Group vertices `(0, 1, 2), (3, 4, 5), ...` until fewer than three remain.
pub fn group_sequential(mesh: &mut Mesh) {
    let n = mesh.num_vertices() as u32;
    let mut i = 0;
    while i + 2 < n {
        mesh.triangles.push([i, i + 1, i + 2]);
        i += 3;
    }
}

fn is_closed(uses: &[EdgeUse]) -> bool {
    let (Some(first), Some(last)) = (uses.first(), uses.last()) else {
        return false;
    };
    last.end_vertex_id == first.start_vertex_id
        && uses
            .windows(2)
            .all(|w| w[0].end_vertex_id == w[1].start_vertex_id)
}

/// Largest face count over all shells, including shells reached through a
/// MANIFOLD_SOLID_BREP.
fn shell_face_count(store: &EntityStore) -> usize {
    let mut best = 0;
    for record in store.iter() {
        let count = match record.keyword.as_str() {
            "CLOSED_SHELL" | "OPEN_SHELL" => parse_shell(record).map(|s| s.face_ids.len()),
            "MANIFOLD_SOLID_BREP" => parse_manifold_solid_brep(record)
                .and_then(|solid| store.require(solid.outer_shell_id))
                .and_then(parse_shell)
                .map(|s| s.face_ids.len()),
            _ => continue,
        };
        match count {
            Ok(count) => best = best.max(count),
            Err(err) => tracing::debug!(id = record.id, error = %err, "ignoring shell"),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepoff_step::{parse_step, resolve};

    fn build(input: &str, options: MeshOptions) -> Result<BuiltMesh> {
        let store = EntityStore::index(parse_step(input.as_bytes()).records);
        let topology = resolve(&store);
        build_mesh(&MeshInput {
            store: &store,
            topology: &topology,
            options: &options,
        })
    }

    fn polygon_face(coords: &[(f64, f64, f64)]) -> String {
        let n = coords.len();
        let mut out = String::new();
        for (i, (x, y, z)) in coords.iter().enumerate() {
            out.push_str(&format!("#{} = CARTESIAN_POINT('', ({x:.6}, {y:.6}, {z:.6}));\n", 100 + i));
            out.push_str(&format!("#{} = VERTEX_POINT('', #{});\n", 200 + i, 100 + i));
        }
        let mut edges = Vec::new();
        for i in 0..n {
            out.push_str(&format!(
                "#{} = EDGE_CURVE('', #{}, #{}, #999, .T.);\n",
                300 + i,
                200 + i,
                200 + (i + 1) % n
            ));
            edges.push(format!("#{}", 300 + i));
        }
        out.push_str(&format!("#400 = EDGE_LOOP('', ({}));\n", edges.join(", ")));
        out.push_str("#500 = FACE_OUTER_BOUND('', #400, .T.);\n");
        out
    }

    #[test]
    fn test_single_triangle_face() {
        let input = polygon_face(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)]);
        let built = build(&input, MeshOptions::default()).unwrap();
        assert_eq!(built.strategy, Strategy::BrepFaces);
        assert!(!built.grouped_sequentially);
        assert_eq!(built.mesh.num_vertices(), 3);
        assert_eq!(built.mesh.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_ngon_gives_n_minus_two_fan_triangles() {
        for n in 3..9 {
            let coords: Vec<_> = (0..n)
                .map(|i| {
                    let a = i as f64 / n as f64 * std::f64::consts::TAU;
                    (a.cos(), a.sin(), 0.0)
                })
                .collect();
            let built = build(&polygon_face(&coords), MeshOptions::default()).unwrap();
            assert_eq!(built.mesh.num_triangles(), n - 2);
            assert!(built.mesh.triangles.iter().all(|t| t[0] == 0));
        }
    }

    #[test]
    fn test_shared_vertices_are_welded_across_faces() {
        let mut input = polygon_face(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)]);
        // Second face shares #201 and #202 and adds a new corner.
        input.push_str(
            "#110 = CARTESIAN_POINT('', (1.0, 1.0, 0.0));\n\
             #210 = VERTEX_POINT('', #110);\n\
             #310 = EDGE_CURVE('', #202, #201, #999, .T.);\n\
             #311 = EDGE_CURVE('', #201, #210, #999, .T.);\n\
             #312 = EDGE_CURVE('', #210, #202, #999, .T.);\n\
             #410 = EDGE_LOOP('', (#310, #311, #312));\n\
             #510 = FACE_OUTER_BOUND('', #410, .T.);\n",
        );
        let built = build(&input, MeshOptions::default()).unwrap();
        assert_eq!(built.mesh.num_vertices(), 4);
        assert_eq!(built.mesh.triangles, vec![[0, 1, 2], [2, 1, 3]]);
    }

    #[test]
    fn test_oriented_edges_follow_loop_direction() {
        let input = "\
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#3 = CARTESIAN_POINT('', (0.0, 1.0, 0.0));
#11 = VERTEX_POINT('', #1);
#12 = VERTEX_POINT('', #2);
#13 = VERTEX_POINT('', #3);
#21 = EDGE_CURVE('', #11, #12, #99, .T.);
#22 = EDGE_CURVE('', #12, #13, #99, .T.);
#23 = EDGE_CURVE('', #13, #11, #99, .T.);
#31 = ORIENTED_EDGE('', *, *, #23, .F.);
#32 = ORIENTED_EDGE('', *, *, #22, .F.);
#33 = ORIENTED_EDGE('', *, *, #21, .F.);
#40 = EDGE_LOOP('', (#31, #32, #33));
#50 = FACE_OUTER_BOUND('', #40, .T.);
";
        let options = MeshOptions {
            loop_policy: LoopPolicy::RequireClosed,
            ..MeshOptions::default()
        };
        let built = build(input, options).unwrap();
        assert_eq!(built.strategy, Strategy::BrepFaces);
        // Reversed traversal starts at #11, then #13, then #12.
        assert_eq!(built.mesh.vertices[1], nalgebra::Point3::new(0.0, 1.0, 0.0));
        assert_eq!(built.mesh.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_reversed_face_bound_walks_loop_backwards() {
        let input = polygon_face(&[
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
            (0.0, 1.0, 0.0),
        ])
        .replace("FACE_OUTER_BOUND('', #400, .T.)", "FACE_OUTER_BOUND('', #400, .F.)");
        let options = MeshOptions {
            loop_policy: LoopPolicy::RequireClosed,
            ..MeshOptions::default()
        };
        let built = build(&input, options).unwrap();
        assert_eq!(built.strategy, Strategy::BrepFaces);
        // Backwards from the end of the last edge: #200, #203, #202, #201.
        assert_eq!(built.mesh.vertices[1], nalgebra::Point3::new(0.0, 1.0, 0.0));
        assert_eq!(built.mesh.vertices[3], nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert_eq!(built.mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_require_closed_skips_open_loops() {
        let input = "\
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#3 = CARTESIAN_POINT('', (0.0, 1.0, 0.0));
#4 = CARTESIAN_POINT('', (5.0, 5.0, 5.0));
#11 = VERTEX_POINT('', #1);
#12 = VERTEX_POINT('', #2);
#13 = VERTEX_POINT('', #3);
#14 = VERTEX_POINT('', #4);
#21 = EDGE_CURVE('', #11, #12, #99, .T.);
#22 = EDGE_CURVE('', #12, #13, #99, .T.);
#23 = EDGE_CURVE('', #13, #14, #99, .T.);
#40 = EDGE_LOOP('', (#21, #22, #23));
#50 = FACE_OUTER_BOUND('', #40, .T.);
";
        let lenient = build(input, MeshOptions::default()).unwrap();
        assert_eq!(lenient.strategy, Strategy::BrepFaces);
        assert_eq!(lenient.mesh.triangles, vec![[0, 1, 2]]);

        let strict = build(
            input,
            MeshOptions {
                loop_policy: LoopPolicy::RequireClosed,
                ..MeshOptions::default()
            },
        )
        .unwrap();
        assert_eq!(strict.strategy, Strategy::PointCloud);
        assert_eq!(strict.mesh.num_vertices(), 4);
    }

    #[test]
    fn test_malformed_edge_does_not_abort_other_faces() {
        let mut input = polygon_face(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)]);
        input.push_str(
            "#600 = EDGE_CURVE('', #200);\n\
             #610 = EDGE_LOOP('', (#600, #301));\n\
             #620 = FACE_OUTER_BOUND('', #610, .T.);\n",
        );
        let built = build(&input, MeshOptions::default()).unwrap();
        assert_eq!(built.strategy, Strategy::BrepFaces);
        assert_eq!(built.mesh.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_points_only_falls_back_to_sequential_groups() {
        let input = "\
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#3 = CARTESIAN_POINT('', (0.0, 1.0, 0.0));
#4 = CARTESIAN_POINT('', (0.0, 0.0, 1.0));
#5 = CARTESIAN_POINT('', (1.0, 1.0, 0.0));
#6 = CARTESIAN_POINT('', (1.0, 0.0, 1.0));
#7 = CARTESIAN_POINT('', (0.0, 1.0, 1.0));
";
        let built = build(input, MeshOptions::default()).unwrap();
        assert_eq!(built.strategy, Strategy::PointCloud);
        assert!(built.grouped_sequentially);
        assert_eq!(built.mesh.num_vertices(), 7);
        assert_eq!(built.mesh.triangles, vec![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn test_point_cloud_bounded_by_shell_faces() {
        let mut input = String::new();
        for i in 0..12 {
            input.push_str(&format!("#{} = CARTESIAN_POINT('', ({i}.0, 0.0, 0.0));\n", i + 1));
        }
        input.push_str("#50 = CLOSED_SHELL('', (#60, #61));\n#70 = MANIFOLD_SOLID_BREP('', #50);\n");
        let built = build(&input, MeshOptions::default()).unwrap();
        assert_eq!(built.strategy, Strategy::PointCloud);
        assert!(!built.grouped_sequentially);
        assert_eq!(built.mesh.triangles, vec![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn test_point_cloud_keeps_duplicate_points() {
        let input = "\
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
";
        let built = build(input, MeshOptions::default()).unwrap();
        assert_eq!(built.mesh.num_vertices(), 2);
        assert!(built.mesh.triangles.is_empty());
    }

    #[test]
    fn test_no_geometry_is_empty_geometry() {
        let input = "#1 = DIRECTION('', (0.0, 0.0, 1.0));\n#2 = PRODUCT('p', 'p', '', ());";
        assert_eq!(
            build(input, MeshOptions::default()),
            Err(MeshError::EmptyGeometry)
        );
    }

    #[test]
    fn test_vertices_without_faces_are_grouped() {
        // Topology resolves vertices but loops are too short to triangulate.
        let input = "\
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#11 = VERTEX_POINT('', #1);
#12 = VERTEX_POINT('', #2);
#21 = EDGE_CURVE('', #11, #12, #99, .T.);
#22 = EDGE_CURVE('', #12, #11, #99, .T.);
#40 = EDGE_LOOP('', (#21, #22));
#50 = FACE_OUTER_BOUND('', #40, .T.);
";
        let built = build(input, MeshOptions::default()).unwrap();
        assert_eq!(built.strategy, Strategy::BrepFaces);
        assert!(built.grouped_sequentially);
        assert_eq!(built.mesh.num_vertices(), 2);
        assert!(built.mesh.triangles.is_empty());
    }

    #[test]
    fn test_fan_triangulate() {
        let mut tris = Vec::new();
        fan_triangulate(&[7, 8], &mut tris);
        assert!(tris.is_empty());
        fan_triangulate(&[4, 5, 6, 7, 8], &mut tris);
        assert_eq!(tris, vec![[4, 5, 6], [4, 6, 7], [4, 7, 8]]);
    }

    #[test]
    fn test_group_sequential_drops_remainder() {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![nalgebra::Point3::origin(); 8];
        group_sequential(&mut mesh);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [3, 4, 5]]);
    }
}
