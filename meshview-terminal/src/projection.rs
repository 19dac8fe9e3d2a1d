/// Camera and projection onto the character grid
use meshview_core::Transform;
use nalgebra::{Matrix4, Point3, Vector3};

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f32 = 0.5;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// A projected point: cell coordinates plus distance from the camera plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: cell_aspect(width, height),
            near: 0.1,
            far: 100.0,
            mode: ProjectionMode::Perspective,
        }
    }

    /// Back the camera off along +Z until a sphere of `radius` around the target fits the view
    pub fn frame(&mut self, radius: f32) {
        let radius = radius.max(1e-3);
        let distance = radius / (self.fov / 2.0).sin();
        self.position = self.target + Vector3::new(0.0, 0.0, distance);
        self.near = (distance - radius * 4.0).max(0.01);
        self.far = distance + radius * 4.0;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = cell_aspect(width, height);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm() * (self.fov / 2.0).tan() * 2.0;
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// `projection * view * model`
    pub fn mvp_matrix(&self, model: &Matrix4<f32>) -> Matrix4<f32> {
        Transform::mvp_matrix(model, &self.view_matrix(), &self.projection_matrix())
    }

    /// Project a model-space point through a precomputed MVP matrix.
    ///
    /// Returns `None` behind the camera or outside the near/far range. Points
    /// off the sides of the screen are kept so that partly visible triangles
    /// can still be clipped per cell.
    pub fn project(
        &self,
        point: &Point3<f32>,
        mvp: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<ScreenPoint> {
        let clip = mvp * point.to_homogeneous();
        if clip.w <= 1e-6 {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        if !(-1.0..=1.0).contains(&ndc.z) {
            return None;
        }

        let depth = match self.mode {
            ProjectionMode::Perspective => clip.w,
            ProjectionMode::Orthographic => {
                (ndc.z * (self.far - self.near) + self.far + self.near) / 2.0
            }
        };
        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * width as f32,
            y: (1.0 - ndc.y) * 0.5 * height as f32,
            depth,
        })
    }
}

fn cell_aspect(width: u32, height: u32) -> f32 {
    width.max(1) as f32 * CELL_ASPECT / height.max(1) as f32
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(80, 20);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = Camera::new(80, 24);
        let mvp = camera.mvp_matrix(&Matrix4::identity());
        let p = camera.project(&Point3::origin(), &mvp, 80, 24).unwrap();
        assert!((p.x - 40.0).abs() < 1e-4);
        assert!((p.y - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_nearer_points_have_smaller_depth() {
        let camera = Camera::new(80, 24);
        let mvp = camera.mvp_matrix(&Matrix4::identity());
        let near = camera.project(&Point3::new(0.0, 0.0, 1.0), &mvp, 80, 24).unwrap();
        let far = camera.project(&Point3::new(0.0, 0.0, -1.0), &mvp, 80, 24).unwrap();
        assert!(near.depth < far.depth);
    }

    #[test]
    fn test_points_behind_camera_are_dropped() {
        let camera = Camera::new(80, 24);
        let mvp = camera.mvp_matrix(&Matrix4::identity());
        assert!(camera.project(&Point3::new(0.0, 0.0, 10.0), &mvp, 80, 24).is_none());
    }

    #[test]
    fn test_up_is_toward_the_top_row() {
        let camera = Camera::new(80, 24);
        let mvp = camera.mvp_matrix(&Matrix4::identity());
        let p = camera.project(&Point3::new(0.0, 1.0, 0.0), &mvp, 80, 24).unwrap();
        assert!(p.y < 12.0);
    }

    #[test]
    fn test_frame_keeps_sphere_in_range() {
        let mut camera = Camera::new(80, 24);
        camera.frame(10.0);
        let mvp = camera.mvp_matrix(&Matrix4::identity());
        assert!(camera.project(&Point3::new(0.0, 0.0, 10.0), &mvp, 80, 24).is_some());
        assert!(camera.project(&Point3::new(0.0, 0.0, -10.0), &mvp, 80, 24).is_some());
    }

    #[test]
    fn test_orthographic_keeps_center() {
        let mut camera = Camera::new(80, 24);
        camera.mode = ProjectionMode::Orthographic;
        let mvp = camera.mvp_matrix(&Matrix4::identity());
        let p = camera.project(&Point3::origin(), &mvp, 80, 24).unwrap();
        assert!((p.x - 40.0).abs() < 1e-4);
    }
}
