/// Vertex, face and edge statistics
use std::collections::HashSet;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use nalgebra::Vector3;

use crate::geometry::Mesh;
use crate::normalize::bounding_box;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub face_count: usize,
    /// `round(faces * 3 / 2)`. Exact only for closed 2-manifold meshes; open
    /// boundaries and non-manifold edges are not deduplicated.
    pub edge_count: usize,
    /// Bounding box size, unrounded
    pub dimensions: Vector3<f32>,
}

impl MeshStats {
    pub fn zero() -> Self {
        Self {
            vertex_count: 0,
            face_count: 0,
            edge_count: 0,
            dimensions: Vector3::zeros(),
        }
    }

    /// Dimensions rounded to two decimals for display
    pub fn display_dimensions(&self) -> [f32; 3] {
        let round = |v: f32| (v * 100.0).round() / 100.0;
        [
            round(self.dimensions.x),
            round(self.dimensions.y),
            round(self.dimensions.z),
        ]
    }

    pub fn format_dimensions(&self) -> String {
        let [w, h, d] = self.display_dimensions();
        format!("{:.2} x {:.2} x {:.2}", w, h, d)
    }
}

impl Default for MeshStats {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for MeshStats {
    type Output = MeshStats;

    fn add(self, other: MeshStats) -> MeshStats {
        MeshStats {
            vertex_count: self.vertex_count + other.vertex_count,
            face_count: self.face_count + other.face_count,
            edge_count: self.edge_count + other.edge_count,
            dimensions: self.dimensions + other.dimensions,
        }
    }
}

impl AddAssign for MeshStats {
    fn add_assign(&mut self, other: MeshStats) {
        *self = *self + other;
    }
}

impl Sum for MeshStats {
    fn sum<I: Iterator<Item = MeshStats>>(iter: I) -> Self {
        iter.fold(MeshStats::zero(), Add::add)
    }
}

/// Edge estimate from the face count, rounding halves up
pub fn estimate_edges(face_count: usize) -> usize {
    (face_count * 3 + 1) / 2
}

pub fn stats(mesh: &Mesh) -> MeshStats {
    let face_count = mesh.face_count();
    MeshStats {
        vertex_count: mesh.vertex_count(),
        face_count,
        edge_count: estimate_edges(face_count),
        dimensions: bounding_box(mesh).size(),
    }
}

/// Count vertices whose exact position already occurred earlier in the list
pub fn duplicate_vertices(mesh: &Mesh) -> usize {
    let mut seen = HashSet::with_capacity(mesh.vertex_count());
    mesh.positions()
        .iter()
        // + 0.0 folds -0.0 into 0.0
        .filter(|p| !seen.insert(p.coords.map(|c| (c + 0.0).to_bits())))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_cube_stats() {
        let s = stats(&Mesh::cube(1.0));
        assert_eq!(s.vertex_count, 8);
        assert_eq!(s.face_count, 12);
        assert_eq!(s.edge_count, 18);
        assert_eq!(s.dimensions, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_tetrahedron_edge_estimate_is_exact() {
        let s = stats(&Mesh::tetrahedron(1.0));
        assert_eq!(s.face_count, 4);
        assert_eq!(s.edge_count, 6);
    }

    #[test]
    fn test_edge_estimate_rounds_half_up() {
        assert_eq!(estimate_edges(0), 0);
        assert_eq!(estimate_edges(1), 2);
        assert_eq!(estimate_edges(3), 5);
    }

    #[test]
    fn test_indexed_face_references() {
        let mesh = Mesh::cube(1.0);
        let references: usize = mesh.face_indices().map(|f| f.len()).sum();
        assert_eq!(stats(&mesh).face_count * 3, references);
    }

    #[test]
    fn test_malformed_soup_is_tolerated() {
        let s = stats(&Mesh::soup(vec![Point3::origin(); 8]));
        assert_eq!(s.vertex_count, 8);
        assert_eq!(s.face_count, 2);
        assert_eq!(s.edge_count, 3);
    }

    #[test]
    fn test_empty_mesh_stats() {
        assert_eq!(stats(&Mesh::new()), MeshStats::zero());
    }

    #[test]
    fn test_aggregate_sums_fields() {
        let total: MeshStats = [Mesh::cube(1.0), Mesh::tetrahedron(2.0)]
            .iter()
            .map(stats)
            .sum();
        assert_eq!(total.vertex_count, 12);
        assert_eq!(total.face_count, 16);
        assert_eq!(total.edge_count, 24);
        assert_eq!(total.dimensions, Vector3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_display_dimensions_round_to_two_places() {
        let s = MeshStats {
            dimensions: Vector3::new(1.23456, 0.007, 10.0),
            ..MeshStats::zero()
        };
        assert_eq!(s.format_dimensions(), "1.23 x 0.01 x 10.00");
    }

    #[test]
    fn test_duplicate_vertices() {
        let soup = Mesh::soup(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(-0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]);
        assert_eq!(duplicate_vertices(&soup), 2);
        assert_eq!(duplicate_vertices(&Mesh::cube(1.0)), 0);
    }
}
