/// meshview core library - mesh loading, analysis and scene composition
///
/// Parses OBJ, STL and GLB bytes into one canonical [`Mesh`], normalizes it
/// around the origin, derives structural statistics, assigns angular color
/// bands and composes transforms through a parent-child [`SceneGraph`].
/// Everything here is synchronous and free of I/O.

pub mod colorize;
pub mod display;
pub mod error;
pub mod format;
pub mod geometry;
pub mod glb;
pub mod normalize;
pub mod obj;
pub mod scene;
pub mod stats;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use colorize::{apply_palette, colorize, Palette};
pub use display::{unique_edges, DisplayMode};
pub use error::{LoadError, MeshError, PaletteError, ParseError, SceneError};
pub use format::{load, load_normalized, load_with, LoadOptions, MeshFormat};
pub use geometry::{Color, Faces, Mesh};
pub use normalize::{bounding_box, normalize, BoundingBox};
pub use scene::{AnimationRule, FrameTime, NodeId, Orbit, Pulse, SceneGraph, Spin};
pub use stats::{duplicate_vertices, stats, MeshStats};
pub use transform::{EulerRotation, LocalTransform, Transform};
