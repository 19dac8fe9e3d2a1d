/// Canonical mesh representation shared by every loader
use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::{MeshError, PaletteError};

/// Linear RGB color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` (or `rrggbb`) hex string
    pub fn from_hex(hex: &str) -> Result<Self, PaletteError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(PaletteError::InvalidHex(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| PaletteError::InvalidHex(hex.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (quantize(self.r), quantize(self.g), quantize(self.b))
    }
}

/// Face topology of a mesh
#[derive(Debug, Clone, PartialEq)]
pub enum Faces {
    /// Explicit index triples into the vertex list
    Indexed(Vec<[u32; 3]>),
    /// Every 3 consecutive vertices form one face
    Soup,
}

/// A triangle mesh: positions, optional per-vertex colors and faces.
///
/// Fields are private so that the invariants checked on construction
/// (indices in range, one color per vertex) hold for the mesh's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<Point3<f32>>,
    colors: Option<Vec<Color>>,
    faces: Faces,
}

impl Mesh {
    /// An empty indexed mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            colors: None,
            faces: Faces::Indexed(Vec::new()),
        }
    }

    /// Build an indexed mesh, rejecting any face that points past the vertex list
    pub fn indexed(positions: Vec<Point3<f32>>, faces: Vec<[u32; 3]>) -> Result<Self, MeshError> {
        let vertex_count = positions.len();
        for (face, indices) in faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }

        Ok(Self {
            positions,
            colors: None,
            faces: Faces::Indexed(faces),
        })
    }

    /// Build an unindexed triangle soup
    pub fn soup(positions: Vec<Point3<f32>>) -> Self {
        Self {
            positions,
            colors: None,
            faces: Faces::Soup,
        }
    }

    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Mutable access to positions; the vertex count cannot change through it
    pub fn positions_mut(&mut self) -> &mut [Point3<f32>] {
        &mut self.positions
    }

    pub fn colors(&self) -> Option<&[Color]> {
        self.colors.as_deref()
    }

    pub fn set_colors(&mut self, colors: Vec<Color>) -> Result<(), MeshError> {
        if colors.len() != self.positions.len() {
            return Err(MeshError::ColorCountMismatch {
                colors: colors.len(),
                vertices: self.positions.len(),
            });
        }
        self.colors = Some(colors);
        Ok(())
    }

    pub fn faces(&self) -> &Faces {
        &self.faces
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.faces, Faces::Indexed(_))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of faces. A soup whose length is not a multiple of 3 drops the tail.
    pub fn face_count(&self) -> usize {
        match &self.faces {
            Faces::Indexed(faces) => faces.len(),
            Faces::Soup => self.positions.len() / 3,
        }
    }

    /// Index triple of face `i`, synthesized for soups
    pub fn face(&self, i: usize) -> Option<[u32; 3]> {
        match &self.faces {
            Faces::Indexed(faces) => faces.get(i).copied(),
            Faces::Soup if i < self.face_count() => {
                let base = (i * 3) as u32;
                Some([base, base + 1, base + 2])
            }
            Faces::Soup => None,
        }
    }

    /// Iterate every face as an index triple
    pub fn face_indices(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.face_count()).filter_map(move |i| self.face(i))
    }

    /// Iterate every face as its three corner positions
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.face_indices().map(move |[a, b, c]| {
            [
                self.positions[a as usize],
                self.positions[b as usize],
                self.positions[c as usize],
            ]
        })
    }

    /// Face normal from the winding of the triangle; zero for degenerate faces
    pub fn face_normal(&self, face: [u32; 3]) -> Vector3<f32> {
        let v0 = self.positions[face[0] as usize];
        let v1 = self.positions[face[1] as usize];
        let v2 = self.positions[face[2] as usize];

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1
            .cross(&edge2)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Apply an affine transform to every position
    pub fn transform_positions(&mut self, matrix: &Matrix4<f32>) {
        for position in &mut self.positions {
            *position = matrix.transform_point(position);
        }
    }

    /// Concatenate `other` onto this mesh, offsetting its indices.
    ///
    /// Two soups stay a soup; any other combination becomes indexed. Colors
    /// survive only when both sides carry them.
    pub fn append(&mut self, other: Mesh) {
        if self.positions.is_empty() {
            *self = other;
            return;
        }

        let offset = self.positions.len() as u32;
        let faces = if matches!((&self.faces, &other.faces), (Faces::Soup, Faces::Soup)) {
            Faces::Soup
        } else {
            let mut faces: Vec<[u32; 3]> = self.face_indices().collect();
            faces.extend(
                other
                    .face_indices()
                    .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
            );
            Faces::Indexed(faces)
        };

        self.colors = match (self.colors.take(), other.colors) {
            (Some(mut mine), Some(theirs)) => {
                mine.extend(theirs);
                Some(mine)
            }
            _ => None,
        };
        self.positions.extend(other.positions);
        self.faces = faces;
    }

    /// Axis-aligned cube centered on the origin: 8 shared vertices and
    /// 6 quads fan-triangulated into 12 faces
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let positions = (0..8)
            .map(|i| {
                let pick = |bit: u32| if i & bit != 0 { half } else { -half };
                Point3::new(pick(1), pick(2), pick(4))
            })
            .collect();

        // Counter-clockwise seen from outside
        let quads: [[u32; 4]; 6] = [
            [4, 5, 7, 6], // +z
            [1, 0, 2, 3], // -z
            [5, 1, 3, 7], // +x
            [0, 4, 6, 2], // -x
            [6, 7, 3, 2], // +y
            [0, 1, 5, 4], // -y
        ];
        let faces = quads
            .iter()
            .flat_map(|&[a, b, c, d]| [[a, b, c], [a, c, d]])
            .collect();

        Self {
            positions,
            colors: None,
            faces: Faces::Indexed(faces),
        }
    }

    /// Regular tetrahedron inscribed in a cube of edge `size`
    pub fn tetrahedron(size: f32) -> Self {
        let h = size / 2.0;
        Self {
            positions: vec![
                Point3::new(h, h, h),
                Point3::new(h, -h, -h),
                Point3::new(-h, h, -h),
                Point3::new(-h, -h, h),
            ],
            colors: None,
            faces: Faces::Indexed(vec![[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]),
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_rejects_out_of_range_face() {
        let positions = vec![Point3::origin(); 3];
        let err = Mesh::indexed(positions, vec![[0, 1, 2], [0, 1, 3]]).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                face: 1,
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn test_colors_must_match_vertex_count() {
        let mut mesh = Mesh::tetrahedron(1.0);
        assert!(mesh.set_colors(vec![Color::WHITE; 3]).is_err());
        assert!(mesh.colors().is_none());
        mesh.set_colors(vec![Color::WHITE; 4]).unwrap();
        assert_eq!(mesh.colors().map(<[Color]>::len), Some(4));
    }

    #[test]
    fn test_cube_topology() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.face_count(), 12);
        for [a, b, c] in cube.face_indices() {
            assert!(a < 8 && b < 8 && c < 8);
        }
    }

    #[test]
    fn test_cube_faces_point_outward() {
        let cube = Mesh::cube(2.0);
        for face in cube.face_indices() {
            let normal = cube.face_normal(face);
            let centroid = face
                .iter()
                .map(|&i| cube.positions()[i as usize].coords)
                .sum::<Vector3<f32>>()
                / 3.0;
            assert!(normal.dot(&centroid) > 0.0, "face {:?} points inward", face);
        }
    }

    #[test]
    fn test_soup_face_count_truncates() {
        let soup = Mesh::soup(vec![Point3::origin(); 7]);
        assert_eq!(soup.face_count(), 2);
        assert_eq!(soup.face(1), Some([3, 4, 5]));
        assert_eq!(soup.face(2), None);
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut mesh = Mesh::tetrahedron(1.0);
        mesh.append(Mesh::tetrahedron(1.0));
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 8);
        assert_eq!(mesh.face(4), Some([4, 5, 6]));
    }

    #[test]
    fn test_append_soup_onto_indexed_becomes_indexed() {
        let mut mesh = Mesh::tetrahedron(1.0);
        mesh.append(Mesh::soup(vec![Point3::origin(); 3]));
        assert!(mesh.is_indexed());
        assert_eq!(mesh.face(4), Some([4, 5, 6]));
    }

    #[test]
    fn test_append_drops_colors_unless_both_have_them() {
        let mut colored = Mesh::tetrahedron(1.0);
        colored.set_colors(vec![Color::WHITE; 4]).unwrap();

        let mut mesh = colored.clone();
        mesh.append(colored.clone());
        assert_eq!(mesh.colors().map(<[Color]>::len), Some(8));

        mesh.append(Mesh::tetrahedron(1.0));
        assert!(mesh.colors().is_none());
    }

    #[test]
    fn test_color_from_hex() {
        let color = Color::from_hex("#ff9500").unwrap();
        assert_eq!(color.to_rgb8(), (255, 149, 0));
        assert!(Color::from_hex("#ff95").is_err());
        assert!(Color::from_hex("zzzzzz").is_err());
    }
}
