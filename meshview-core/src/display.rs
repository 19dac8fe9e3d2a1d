/// Display modes a renderer can request, and the derived data they need
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::geometry::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayMode {
    Faces,
    /// Unique edges with hidden lines removed
    Edges,
    Vertices,
    /// Unique edges drawn through the surface
    Wireframe,
    #[default]
    All,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 5] = [
        DisplayMode::Faces,
        DisplayMode::Edges,
        DisplayMode::Vertices,
        DisplayMode::Wireframe,
        DisplayMode::All,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DisplayMode::Faces => "faces",
            DisplayMode::Edges => "edges",
            DisplayMode::Vertices => "vertices",
            DisplayMode::Wireframe => "wireframe",
            DisplayMode::All => "all",
        }
    }

    /// The following mode, wrapping around
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn draws_faces(self) -> bool {
        matches!(self, DisplayMode::Faces | DisplayMode::All)
    }

    pub fn draws_edges(self) -> bool {
        matches!(self, DisplayMode::Edges | DisplayMode::Wireframe | DisplayMode::All)
    }

    pub fn draws_vertices(self) -> bool {
        matches!(self, DisplayMode::Vertices | DisplayMode::All)
    }

    /// Whether surfaces occlude lines and points even when not drawn
    pub fn hides_occluded(self) -> bool {
        !matches!(self, DisplayMode::Wireframe | DisplayMode::Vertices)
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|m| m.name()).collect();
                format!("unknown display mode {:?}, expected one of {}", s, names.join(", "))
            })
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Undirected edges of every face, deduplicated, as `[lo, hi]` in first-seen order
pub fn unique_edges(mesh: &Mesh) -> Vec<[u32; 2]> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for [a, b, c] in mesh.face_indices() {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            let edge = [u.min(v), u.max(v)];
            if seen.insert(edge) {
                edges.push(edge);
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_mode_cycle_wraps() {
        let mut mode = DisplayMode::Faces;
        for _ in 0..DisplayMode::ALL.len() {
            mode = mode.next();
        }
        assert_eq!(mode, DisplayMode::Faces);
        assert_eq!(DisplayMode::All.next(), DisplayMode::Faces);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Wireframe".parse::<DisplayMode>().unwrap(), DisplayMode::Wireframe);
        assert!("solid".parse::<DisplayMode>().is_err());
    }

    #[test]
    fn test_tetrahedron_has_six_unique_edges() {
        let edges = unique_edges(&Mesh::tetrahedron(1.0));
        assert_eq!(edges.len(), 6);
        assert!(edges.iter().all(|[lo, hi]| lo < hi));
    }

    #[test]
    fn test_cube_unique_edges_include_diagonals() {
        // 12 box edges plus one diagonal per quad
        assert_eq!(unique_edges(&Mesh::cube(1.0)).len(), 18);
    }

    #[test]
    fn test_soup_edges_are_not_shared() {
        let soup = Mesh::soup(vec![Point3::origin(); 6]);
        assert_eq!(unique_edges(&soup).len(), 6);
    }
}
