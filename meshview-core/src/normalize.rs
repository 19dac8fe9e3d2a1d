/// Bounding boxes and re-centering
use nalgebra::{Point3, Vector3};

use crate::geometry::Mesh;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// The box of a point set with no points: both corners at the origin
    pub fn empty() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }

    /// Single min/max reduction over the points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self::empty();
        };

        points.fold(
            Self {
                min: *first,
                max: *first,
            },
            |bounds, p| Self {
                min: bounds.min.inf(p),
                max: bounds.max.sup(p),
            },
        )
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn bounding_box(mesh: &Mesh) -> BoundingBox {
    BoundingBox::from_points(mesh.positions())
}

/// Translate the mesh so its bounding box is centered on the origin.
///
/// Returns the box measured before translation. Scale and orientation are
/// left alone, and a mesh with no vertices is untouched.
pub fn normalize(mesh: &mut Mesh) -> BoundingBox {
    let bounds = bounding_box(mesh);
    let offset = bounds.center().coords;

    if offset != Vector3::zeros() {
        for position in mesh.positions_mut() {
            *position -= offset;
        }
    }
    bounds
}

/// By-value form of [`normalize`]
pub fn normalized(mut mesh: Mesh) -> Mesh {
    normalize(&mut mesh);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_cube() -> Mesh {
        let mut mesh = Mesh::cube(2.0);
        for p in mesh.positions_mut() {
            p.coords += Vector3::new(10.0, -3.0, 0.5);
        }
        mesh
    }

    #[test]
    fn test_bounding_box_of_cube() {
        let bounds = bounding_box(&offset_cube());
        assert_eq!(bounds.min, Point3::new(9.0, -4.0, -0.5));
        assert_eq!(bounds.max, Point3::new(11.0, -2.0, 1.5));
        assert_eq!(bounds.size(), Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(bounds.center(), Point3::new(10.0, -3.0, 0.5));
    }

    #[test]
    fn test_normalize_centers_on_origin() {
        let mut mesh = offset_cube();
        let before = normalize(&mut mesh);
        assert_eq!(before.center(), Point3::new(10.0, -3.0, 0.5));

        let after = bounding_box(&mesh);
        assert!(after.center().coords.norm() < 1e-6);
        assert!((after.size() - before.size()).norm() < 1e-6);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalized(offset_cube());
        let twice = normalized(once.clone());
        for (a, b) in once.positions().iter().zip(twice.positions()) {
            assert!((a - b).norm() < 1e-6);
        }
    }

    #[test]
    fn test_empty_mesh_has_zero_bounds() {
        let mut mesh = Mesh::new();
        let bounds = normalize(&mut mesh);
        assert_eq!(bounds.center(), Point3::origin());
        assert_eq!(bounds.size(), Vector3::zeros());
        assert_eq!(mesh.vertex_count(), 0);
    }
}
