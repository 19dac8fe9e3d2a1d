/// Error types for loading, mesh construction, colorization and scene edits
use thiserror::Error;

use crate::format::MeshFormat;
use crate::scene::NodeId;

/// Malformed, truncated or out-of-range input. The whole mesh is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{format} parse error at byte {byte_offset}: {reason}")]
pub struct ParseError {
    pub format: MeshFormat,
    pub byte_offset: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(format: MeshFormat, byte_offset: usize, reason: impl Into<String>) -> Self {
        Self {
            format,
            byte_offset,
            reason: reason.into(),
        }
    }
}

/// Errors returned by the format loaders
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unsupported mesh format: {0:?}")]
    UnsupportedFormat(String),
}

/// Violations of the mesh invariants caught by the checked constructors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("face {face} references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("{colors} colors supplied for {vertices} vertices")]
    ColorCountMismatch { colors: usize, vertices: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("attaching node {child} under node {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("node {0} does not exist")]
    MissingNode(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    #[error("palette must contain at least one color")]
    Empty,

    #[error("invalid hex color {0:?}, expected #rrggbb")]
    InvalidHex(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = ParseError::new(MeshFormat::Stl, 134, "record truncated");
        assert_eq!(err.to_string(), "STL parse error at byte 134: record truncated");
    }

    #[test]
    fn test_load_error_is_transparent_over_parse() {
        let err: LoadError = ParseError::new(MeshFormat::Obj, 7, "bad face").into();
        assert_eq!(err.to_string(), "OBJ parse error at byte 7: bad face");
    }
}
