/// Terminal-based ASCII viewer for meshview scenes
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use meshview_core::{
    apply_palette, EulerRotation, FrameTime, LocalTransform, Mesh, NodeId, Orbit, Palette, Pulse,
    SceneError, SceneGraph, Spin,
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod cli;
pub mod config;
pub mod projection;
pub mod renderer;

pub use config::ViewerConfig;
pub use projection::{Camera, ProjectionMode};
pub use renderer::AsciiRenderer;

/// Rotation per key press, in radians
const ROTATE_STEP: f32 = 0.1;

/// Idle rotation of the view in radians per second
const IDLE_SPIN: (f32, f32) = (0.3, 0.45);

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    scene: SceneGraph,
    /// Node carrying the user's rotation and the global scale
    view: NodeId,
    rotation: EulerRotation,
    camera: Camera,
    renderer: AsciiRenderer,
    config: ViewerConfig,
    summary: String,
    running: bool,
    started: Instant,
    last_tick: Instant,
    last_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(scene: SceneGraph, view: NodeId, radius: f32, config: ViewerConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(scene, view, radius, config, width, height))
    }

    /// Build the app for a fixed character grid
    pub fn with_size(
        scene: SceneGraph,
        view: NodeId,
        radius: f32,
        config: ViewerConfig,
        width: u16,
        height: u16,
    ) -> Self {
        let mut camera = Camera::new(width as u32, height as u32);
        camera.frame(radius);

        let totals = scene.stats();
        let summary = format!(
            "{} vertices, {} faces, {} edges, {}",
            totals.vertex_count,
            totals.face_count,
            totals.edge_count,
            totals.format_dimensions()
        );
        let now = Instant::now();

        Self {
            scene,
            view,
            rotation: EulerRotation::new(0.3, 0.3, 0.0),
            camera,
            renderer: AsciiRenderer::new(width as usize, height as usize),
            config,
            summary,
            running: true,
            started: now,
            last_tick: now,
            last_sample: now,
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn rotation(&self) -> EulerRotation {
        self.rotation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = self.config.frame_duration();

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                        self.handle_key(code)
                    }
                    Event::Resize(width, height) => self.resize(width, height),
                    _ => {}
                }
            }

            self.tick(frame_start);
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_sample).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_sample).as_secs_f32();
                self.frame_count = 0;
                self.last_sample = now;
            }
        }

        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('w') | KeyCode::Up => {
                self.rotation.rotate(ROTATE_STEP, 0.0, 0.0);
            }
            KeyCode::Char('s') | KeyCode::Down => {
                self.rotation.rotate(-ROTATE_STEP, 0.0, 0.0);
            }
            KeyCode::Char('a') | KeyCode::Left => {
                self.rotation.rotate(0.0, -ROTATE_STEP, 0.0);
            }
            KeyCode::Char('d') | KeyCode::Right => {
                self.rotation.rotate(0.0, ROTATE_STEP, 0.0);
            }
            KeyCode::Char('e') => {
                self.rotation.rotate(0.0, 0.0, ROTATE_STEP);
            }
            KeyCode::Char('r') => {
                self.rotation.rotate(0.0, 0.0, -ROTATE_STEP);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.config.adjust_scale(1),
            KeyCode::Char('-') => self.config.adjust_scale(-1),
            KeyCode::Char('m') => {
                self.config.mode = self.config.mode.next();
                log::debug!("display mode: {}", self.config.mode);
            }
            _ => {}
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.renderer.resize(width as usize, height as usize);
        self.camera.resize(width as u32, height as u32);
    }

    /// Advance the scene to `now`
    pub fn tick(&mut self, now: Instant) {
        let delta = now.saturating_duration_since(self.last_tick).as_secs_f32();
        let elapsed = now.saturating_duration_since(self.started).as_secs_f32();
        self.last_tick = now;

        // Continuous slow rotation for demo effect
        self.rotation.rotate(IDLE_SPIN.0 * delta, IDLE_SPIN.1 * delta, 0.0);

        let local = LocalTransform::identity()
            .with_rotation(self.rotation)
            .with_uniform_scale(self.config.scale);
        if let Err(err) = self.scene.set_local_transform(self.view, local) {
            log::error!("view node vanished: {}", err);
        }
        self.scene.advance(FrameTime::new(delta, elapsed));
    }

    /// Draw the current frame into the renderer's buffers
    pub fn draw_frame(&mut self) {
        self.renderer.clear();
        self.renderer
            .render_scene(&self.scene, &self.camera, self.config.mode, self.config.color);
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    fn render(&mut self) -> io::Result<()> {
        self.draw_frame();

        // Output to terminal
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "meshview | {} | scale {:.1} | {} | FPS: {:.1} | WASD/Arrows=Rotate E/R=Roll +/-=Scale M=Mode Q=Quit",
                self.config.mode, self.config.scale, self.summary, self.fps
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// A single mesh under a view node. Returns the scene and the view node.
pub fn model_scene(mesh: Mesh, name: &str) -> (SceneGraph, NodeId) {
    let mut scene = SceneGraph::new();
    let view = scene.create_node("view");
    let model = scene.create_mesh_node(name, mesh);
    if let Err(err) = scene.add_child(view, model) {
        log::error!("could not attach {}: {}", name, err);
    }
    scene.update_all();
    (scene, view)
}

/// Three-level hierarchy: a spinning cube, a tetrahedron orbiting it at
/// distance 2 and a pulsing cube one unit beyond that.
///
/// Returns the scene, its view node and a radius enclosing the motion.
pub fn demo_scene(palette: &Palette) -> (SceneGraph, NodeId, f32) {
    let colored = |mut mesh: Mesh| {
        apply_palette(&mut mesh, palette);
        mesh
    };

    let mut scene = SceneGraph::new();
    let view = scene.create_node("view");
    let parent = scene.create_mesh_node("parent", colored(Mesh::cube(1.0)));
    let child = scene.create_mesh_node("child", colored(Mesh::tetrahedron(0.8)));
    let grandchild = scene.create_mesh_node("grandchild", colored(Mesh::cube(0.4)));

    if let Err(err) = link_demo(&mut scene, [view, parent, child, grandchild]) {
        log::error!("demo scene is incomplete: {}", err);
    }

    scene.update_all();
    (scene, view, 3.5)
}

fn link_demo(scene: &mut SceneGraph, nodes: [NodeId; 4]) -> Result<(), SceneError> {
    let [view, parent, child, grandchild] = nodes;
    scene.add_child(view, parent)?;
    scene.add_child(parent, child)?;
    scene.add_child(child, grandchild)?;
    scene.set_local_transform(child, LocalTransform::from_translation(0.0, 2.0, 0.0))?;
    scene.set_local_transform(grandchild, LocalTransform::from_translation(1.0, 0.0, 0.0))?;

    scene.attach_animation(parent, Box::new(Spin::new(0.0, 0.6, 0.0)))?;
    scene.attach_animation(child, Box::new(Orbit { radius: 2.0, speed: 1.0 }))?;
    scene.attach_animation(child, Box::new(Spin::new(0.3, 0.0, 0.0)))?;
    scene.attach_animation(grandchild, Box::new(Spin::new(0.0, 0.0, 0.12)))?;
    scene.attach_animation(grandchild, Box::new(Pulse { amplitude: 0.2, speed: 1.0 }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::DisplayMode;

    fn demo_app() -> TerminalApp {
        let config = ViewerConfig::default();
        let (scene, view, radius) = demo_scene(&config.palette);
        TerminalApp::with_size(scene, view, radius, config, 80, 24)
    }

    #[test]
    fn test_demo_hierarchy() {
        let (scene, view, _) = demo_scene(&Palette::neon());
        assert_eq!(scene.len(), 4);
        assert_eq!(scene.roots(), &[view]);
        assert_eq!(scene.descendants(view).unwrap().len(), 3);
        assert_eq!(scene.meshes().count(), 3);
        assert!(scene.meshes().all(|(_, mesh, _)| mesh.colors().is_some()));

        // Child sits 2 above the parent, grandchild one unit further out
        let child = scene.find_by_name("child").unwrap();
        let grandchild = scene.find_by_name("grandchild").unwrap();
        assert!((scene.world_position(child).unwrap().coords.norm() - 2.0).abs() < 1e-5);
        let offset = scene.world_position(grandchild).unwrap() - scene.world_position(child).unwrap();
        assert!((offset.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_keys_drive_rotation_scale_and_mode() {
        let mut app = demo_app();
        let before = app.rotation();
        app.handle_key(KeyCode::Char('w'));
        app.handle_key(KeyCode::Left);
        assert!((app.rotation().x - before.x - ROTATE_STEP).abs() < 1e-6);
        assert!((app.rotation().y - before.y + ROTATE_STEP).abs() < 1e-6);

        app.handle_key(KeyCode::Char('+'));
        assert!((app.config().scale - 1.1).abs() < 1e-5);

        app.handle_key(KeyCode::Char('m'));
        assert_eq!(app.config().mode, DisplayMode::Faces);

        assert!(app.is_running());
        app.handle_key(KeyCode::Esc);
        assert!(!app.is_running());
    }

    #[test]
    fn test_tick_applies_view_scale() {
        let mut app = demo_app();
        app.handle_key(KeyCode::Char('-'));
        app.tick(Instant::now());
        let view = app.scene().roots()[0];
        let local = app.scene().local_transform(view).unwrap();
        assert!((local.scale.x - 0.9).abs() < 1e-5);
        assert!(!app.scene().is_stale(view).unwrap());
    }

    #[test]
    fn test_draw_frame_fills_cells() {
        let mut app = demo_app();
        app.tick(Instant::now());
        app.draw_frame();
        assert!(app.renderer().filled_cells() > 0);
    }

    #[test]
    fn test_model_scene_wraps_mesh() {
        let (scene, view) = model_scene(Mesh::cube(1.0), "cube.obj");
        let model = scene.find_by_name("cube.obj").unwrap();
        assert_eq!(scene.parent(model).unwrap(), Some(view));
        assert_eq!(scene.stats().face_count, 12);
    }
}
