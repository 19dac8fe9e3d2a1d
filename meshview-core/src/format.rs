/// Format dispatch for the mesh loaders
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::LoadError;
use crate::geometry::Mesh;
use crate::normalize::{normalize, BoundingBox};
use crate::{glb, obj, stl};

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    Obj,
    Stl,
    Glb,
}

impl MeshFormat {
    pub const ALL: [MeshFormat; 3] = [MeshFormat::Obj, MeshFormat::Stl, MeshFormat::Glb];

    pub fn name(self) -> &'static str {
        match self {
            MeshFormat::Obj => "OBJ",
            MeshFormat::Stl => "STL",
            MeshFormat::Glb => "GLB",
        }
    }

    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        extension.parse()
    }
}

impl FromStr for MeshFormat {
    type Err = LoadError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "obj" => Ok(MeshFormat::Obj),
            "stl" => Ok(MeshFormat::Stl),
            "glb" => Ok(MeshFormat::Glb),
            _ => Err(LoadError::UnsupportedFormat(tag.to_string())),
        }
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loader knobs left to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Bake GLB node transforms into vertex positions instead of discarding them
    pub bake_node_transforms: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            bake_node_transforms: true,
        }
    }
}

/// Parse `bytes` as `format` with default options
pub fn load(bytes: &[u8], format: MeshFormat) -> Result<Mesh, LoadError> {
    load_with(bytes, format, &LoadOptions::default())
}

/// Parse `bytes` as the format named by `tag` ("obj", "stl", "glb")
pub fn load_tagged(bytes: &[u8], tag: &str) -> Result<Mesh, LoadError> {
    load(bytes, tag.parse()?)
}

pub fn load_with(bytes: &[u8], format: MeshFormat, options: &LoadOptions) -> Result<Mesh, LoadError> {
    let mesh = match format {
        MeshFormat::Obj => obj::parse_obj(bytes)?,
        MeshFormat::Stl => stl::parse_stl(bytes)?,
        MeshFormat::Glb => glb::parse_glb(bytes, options)?,
    };

    log::debug!(
        "loaded {} mesh: {} vertices, {} faces ({})",
        format,
        mesh.vertex_count(),
        mesh.face_count(),
        if mesh.is_indexed() { "indexed" } else { "soup" }
    );
    Ok(mesh)
}

/// Load and re-center in one step. Returns the bounding box measured before centering.
pub fn load_normalized(
    bytes: &[u8],
    format: MeshFormat,
    options: &LoadOptions,
) -> Result<(Mesh, BoundingBox), LoadError> {
    let mut mesh = load_with(bytes, format, options)?;
    let bounds = normalize(&mut mesh);
    Ok((mesh, bounds))
}
