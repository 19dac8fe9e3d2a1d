/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color as TermColor, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshview_core::{unique_edges, Color, DisplayMode, Mesh, SceneGraph};
use nalgebra::{Matrix4, Vector3};
use std::io::Write;

use crate::projection::{Camera, ScreenPoint};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

const VERTEX_CHAR: char = 'o';

/// Lines and points on a surface may sit this far behind it and still show
const DEPTH_BIAS: f32 = 0.05;

/// A mesh with its model matrix and projected vertices
type Frame<'a> = (&'a Mesh, Matrix4<f32>, Vec<Option<ScreenPoint>>);

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Option<Color>>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![None; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(None);
    }

    /// Draw every mesh of the scene at its cached world matrix
    pub fn render_scene(
        &mut self,
        scene: &SceneGraph,
        camera: &Camera,
        mode: DisplayMode,
        colored: bool,
    ) {
        let frames: Vec<_> = scene
            .meshes()
            .map(|(_, mesh, world)| (mesh, *world, self.project_mesh(mesh, world, camera)))
            .collect();
        self.render_frames(&frames, mode, colored);
    }

    /// Render a single mesh outside of a scene
    pub fn render_mesh(
        &mut self,
        mesh: &Mesh,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
        mode: DisplayMode,
        colored: bool,
    ) {
        let screen = self.project_mesh(mesh, model_matrix, camera);
        self.render_frames(&[(mesh, *model_matrix, screen)], mode, colored);
    }

    /// Surfaces go first so that edges and vertices behind them fail the
    /// depth test. When `mode` draws no faces but still hides occluded
    /// geometry, the surfaces only write depth.
    fn render_frames(&mut self, frames: &[Frame<'_>], mode: DisplayMode, colored: bool) {
        if mode.draws_faces() || mode.hides_occluded() {
            for (mesh, world, screen) in frames {
                self.render_faces(mesh, world, screen, colored, mode.draws_faces());
            }
        }
        let depth_test = mode.hides_occluded();
        if mode.draws_edges() {
            for (mesh, _, screen) in frames {
                self.render_edges(mesh, screen, colored, depth_test);
            }
        }
        if mode.draws_vertices() {
            for (mesh, _, screen) in frames {
                self.render_vertices(mesh, screen, colored, depth_test);
            }
        }
    }

    fn project_mesh(
        &self,
        mesh: &Mesh,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
    ) -> Vec<Option<ScreenPoint>> {
        let mvp = camera.mvp_matrix(model_matrix);
        mesh.positions()
            .iter()
            .map(|p| camera.project(p, &mvp, self.width as u32, self.height as u32))
            .collect()
    }

    fn render_faces(
        &mut self,
        mesh: &Mesh,
        model_matrix: &Matrix4<f32>,
        screen: &[Option<ScreenPoint>],
        colored: bool,
        visible: bool,
    ) {
        let light_dir = Vector3::new(0.0, 0.0, 1.0);
        for face in mesh.face_indices() {
            let corners = face.map(|i| screen[i as usize]);
            let [Some(v0), Some(v1), Some(v2)] = corners else {
                continue; // Triangle is clipped
            };

            // Shade by the world-space normal against a light at the camera
            let normal = model_matrix
                .transform_vector(&mesh.face_normal(face))
                .try_normalize(1e-12)
                .unwrap_or_else(Vector3::zeros);
            let brightness = normal.dot(&light_dir).abs();
            let char_index = 1 + (brightness * (LUMINOSITY_RAMP.len() - 2) as f32) as usize;
            let character = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];

            let color = if colored { face_color(mesh, face) } else { None };
            let ink = visible.then_some((character, color));
            self.rasterize_triangle([v0, v1, v2], ink);
        }
    }

    fn render_edges(
        &mut self,
        mesh: &Mesh,
        screen: &[Option<ScreenPoint>],
        colored: bool,
        depth_test: bool,
    ) {
        for [a, b] in unique_edges(mesh) {
            let (Some(start), Some(end)) = (screen[a as usize], screen[b as usize]) else {
                continue;
            };
            let color = if colored {
                mesh.colors().map(|colors| colors[a as usize])
            } else {
                None
            };
            self.draw_line(start, end, color, depth_test);
        }
    }

    fn render_vertices(
        &mut self,
        mesh: &Mesh,
        screen: &[Option<ScreenPoint>],
        colored: bool,
        depth_test: bool,
    ) {
        for (i, point) in screen.iter().enumerate() {
            let Some(point) = point else { continue };
            let color = if colored {
                mesh.colors().map(|colors| colors[i])
            } else {
                None
            };
            self.plot(point.x as i32, point.y as i32, point.depth, VERTEX_CHAR, color, depth_test);
        }
    }

    /// Fill a triangle; with no ink only the depth buffer is written
    fn rasterize_triangle(&mut self, coords: [ScreenPoint; 3], ink: Option<(char, Option<Color>)>) {
        let [v0, v1, v2] = coords;

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    if let Some((character, color)) = ink {
                        self.char_buffer[idx] = character;
                        self.color_buffer[idx] = color;
                    }
                }
            }
        }
    }

    /// DDA line with a slope-dependent glyph
    fn draw_line(&mut self, start: ScreenPoint, end: ScreenPoint, color: Option<Color>, depth_test: bool) {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        let character = line_char(dx, dy);

        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = start.x + dx * t;
            let y = start.y + dy * t;
            let depth = start.depth + (end.depth - start.depth) * t;
            self.plot(x as i32, y as i32, depth, character, color, depth_test);
        }
    }

    fn plot(&mut self, x: i32, y: i32, depth: f32, character: char, color: Option<Color>, depth_test: bool) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth_test && depth > self.depth_buffer[idx] + DEPTH_BIAS {
            return;
        }
        self.depth_buffer[idx] = self.depth_buffer[idx].min(depth);
        self.char_buffer[idx] = character;
        self.color_buffer[idx] = color;
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    /// Number of cells holding something other than a blank
    pub fn filled_cells(&self) -> usize {
        self.char_buffer.iter().filter(|&&c| c != ' ').count()
    }

    /// Plain text rows without any styling
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        self.char_buffer
            .chunks(self.width.max(1))
            .map(|row| row.iter().collect())
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = None;
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let c = self.char_buffer[idx];
                let color = self.color_buffer[idx]
                    .map(|color| {
                        let (r, g, b) = color.to_rgb8();
                        TermColor::Rgb { r, g, b }
                    })
                    .unwrap_or_else(|| ramp_color(c));

                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Grey levels by character intensity when no vertex colors are shown
fn ramp_color(c: char) -> TermColor {
    match c {
        ' ' | '.' | ':' => TermColor::DarkGrey,
        '-' | '=' => TermColor::Grey,
        '+' | '*' => TermColor::White,
        '#' | '%' | '@' => TermColor::Cyan,
        _ => TermColor::White,
    }
}

fn face_color(mesh: &Mesh, face: [u32; 3]) -> Option<Color> {
    let colors = mesh.colors()?;
    let [a, b, c] = face.map(|i| colors[i as usize]);
    Some(Color::new(
        (a.r + b.r + c.r) / 3.0,
        (a.g + b.g + c.g) / 3.0,
        (a.b + b.b + c.b) / 3.0,
    ))
}

fn line_char(dx: f32, dy: f32) -> char {
    let (ax, ay) = (dx.abs(), dy.abs());
    if ay < ax * 0.4 {
        '-'
    } else if ax < ay * 0.4 {
        '|'
    } else if (dx > 0.0) == (dy > 0.0) {
        // Screen y grows downward
        '\\'
    } else {
        '/'
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::{apply_palette, Palette};

    fn render(mesh: &Mesh, mode: DisplayMode) -> AsciiRenderer {
        let mut renderer = AsciiRenderer::new(60, 30);
        let camera = Camera::new(60, 30);
        let model = meshview_core::Transform::rotation_matrix(&meshview_core::EulerRotation::new(
            0.4, 0.6, 0.0,
        ));
        renderer.render_mesh(mesh, &model, &camera, mode, true);
        renderer
    }

    #[test]
    fn test_faces_fill_the_center() {
        let renderer = render(&Mesh::cube(2.0), DisplayMode::Faces);
        let center = renderer.char_at(30, 15).unwrap();
        assert_ne!(center, ' ');
        assert_ne!(center, VERTEX_CHAR);
    }

    #[test]
    fn test_vertices_mode_only_plots_points() {
        let renderer = render(&Mesh::cube(2.0), DisplayMode::Vertices);
        let glyphs: String = renderer.rows().collect();
        assert!(glyphs.chars().all(|c| c == ' ' || c == VERTEX_CHAR));
        assert!(renderer.filled_cells() > 0);
    }

    #[test]
    fn test_wireframe_shows_more_than_hidden_line_edges() {
        let edges = render(&Mesh::cube(2.0), DisplayMode::Edges).filled_cells();
        let wireframe = render(&Mesh::cube(2.0), DisplayMode::Wireframe).filled_cells();
        assert!(edges > 0);
        assert!(wireframe > edges);
    }

    #[test]
    fn test_clear_resets_buffers() {
        let mut renderer = render(&Mesh::tetrahedron(2.0), DisplayMode::All);
        assert!(renderer.filled_cells() > 0);
        renderer.clear();
        assert_eq!(renderer.filled_cells(), 0);
    }

    #[test]
    fn test_draw_uses_vertex_colors() {
        let mut mesh = Mesh::cube(2.0);
        apply_palette(&mut mesh, &Palette::new(vec![Color::new(1.0, 0.0, 0.0)]).unwrap());
        let renderer = render(&mesh, DisplayMode::Faces);
        let mut out = Vec::new();
        renderer.draw(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        // 24-bit foreground escape for pure red
        assert!(text.contains("38;2;255;0;0"));
    }

    #[test]
    fn test_barycentric_of_vertex() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (0.0, 0.0)).unwrap();
        assert!((w0 - 1.0).abs() < 1e-6 && w1.abs() < 1e-6 && w2.abs() < 1e-6);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
    }

    #[test]
    fn test_line_glyphs() {
        assert_eq!(line_char(5.0, 0.0), '-');
        assert_eq!(line_char(0.0, 5.0), '|');
        assert_eq!(line_char(3.0, 3.0), '\\');
        assert_eq!(line_char(3.0, -3.0), '/');
    }
}
