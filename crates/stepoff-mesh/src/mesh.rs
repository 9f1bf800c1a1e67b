//! Indexed triangle mesh and tolerance-based vertex welding.

use std::collections::HashMap;

use nalgebra::Point3;

/// Output triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions; the position in this vector is the output index.
    pub vertices: Vec<Point3<f64>>,
    /// Triangles as triples of vertex indices.
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Whether every triangle index refers to an existing vertex.
    pub fn indices_in_bounds(&self) -> bool {
        let n = self.vertices.len();
        self.triangles
            .iter()
            .flatten()
            .all(|&i| (i as usize) < n)
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }
}

/// Assigns mesh indices to points, merging points whose coordinates agree
/// after rounding to `precision` fractional digits.
#[derive(Debug)]
pub struct VertexIndex {
    precision: usize,
    keys: HashMap<String, u32>,
}

impl VertexIndex {
    /// Create an index rounding to `precision` fractional digits.
    pub fn new(precision: usize) -> Self {
        Self {
            precision,
            keys: HashMap::new(),
        }
    }

    /// Index of `point` in `mesh`, appending it on first use.
    pub fn index_of(&mut self, mesh: &mut Mesh, point: Point3<f64>) -> u32 {
        let key = self.key(&point);
        *self.keys.entry(key).or_insert_with(|| {
            mesh.vertices.push(point);
            (mesh.vertices.len() - 1) as u32
        })
    }

    /// Canonical `x,y,z` key for a point.
    pub fn key(&self, point: &Point3<f64>) -> String {
        let precision = self.precision;
        let mut key = String::new();
        for (i, c) in point.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            let s = format!("{c:.precision$}");
            // -0.000000 and 0.000000 are the same coordinate
            match s.strip_prefix('-') {
                Some(abs) if abs.bytes().all(|b| b == b'0' || b == b'.') => key.push_str(abs),
                _ => key.push_str(&s),
            }
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_points_within_tolerance_merge() {
        let mut mesh = Mesh::new();
        let mut index = VertexIndex::new(6);
        let a = index.index_of(&mut mesh, Point3::new(1.0, 2.0, 3.0));
        let b = index.index_of(&mut mesh, Point3::new(1.0 + 4e-7, 2.0 - 3e-7, 3.0));
        assert_eq!(a, b);
        assert_eq!(mesh.num_vertices(), 1);
    }

    #[test]
    fn test_points_beyond_tolerance_stay_distinct() {
        let mut mesh = Mesh::new();
        let mut index = VertexIndex::new(6);
        let a = index.index_of(&mut mesh, Point3::new(1.0, 2.0, 3.0));
        let b = index.index_of(&mut mesh, Point3::new(1.0, 2.0, 3.000002));
        assert_ne!(a, b);
        assert_eq!(mesh.num_vertices(), 2);
    }

    #[test]
    fn test_signed_zero_merges() {
        let index = VertexIndex::new(6);
        assert_eq!(
            index.key(&Point3::new(-1e-9, 0.0, -0.0)),
            index.key(&Point3::new(1e-9, 0.0, 0.0))
        );
        assert_eq!(index.key(&Point3::new(-0.5, 0.0, 0.0)), "-0.500000,0.000000,0.000000");
    }

    #[test]
    fn test_first_occurrence_position_is_kept() {
        let mut mesh = Mesh::new();
        let mut index = VertexIndex::new(6);
        index.index_of(&mut mesh, Point3::new(5.0, 0.0, 0.0));
        index.index_of(&mut mesh, Point3::new(5.0000001, 0.0, 0.0));
        assert_relative_eq!(mesh.vertices[0].x, 5.0);
    }

    #[test]
    fn test_bounds_and_index_check() {
        let mut mesh = Mesh::new();
        assert!(mesh.bounds().is_none());
        mesh.vertices.push(Point3::new(0.0, -1.0, 2.0));
        mesh.vertices.push(Point3::new(3.0, 1.0, -2.0));
        mesh.triangles.push([0, 1, 1]);
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo, Point3::new(0.0, -1.0, -2.0));
        assert_eq!(hi, Point3::new(3.0, 1.0, 2.0));
        assert!(mesh.indices_in_bounds());
        mesh.triangles.push([0, 1, 2]);
        assert!(!mesh.indices_in_bounds());
    }
}
