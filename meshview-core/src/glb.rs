/// Binary glTF (GLB) loader that flattens every triangle primitive into one mesh
use gltf::buffer::Source;
use gltf::mesh::Mode;
use gltf::{Accessor, Document, Gltf, Node};
use nalgebra::{Matrix4, Point3};

use crate::error::ParseError;
use crate::format::{LoadOptions, MeshFormat};
use crate::geometry::{Color, Mesh};

const MAGIC: &[u8; 4] = b"glTF";
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const MAX_NODE_DEPTH: usize = 256;

/// Byte layout of a validated GLB container
#[derive(Debug, Clone, Copy)]
struct GlbLayout {
    length: usize,
    json_offset: usize,
    bin_offset: Option<usize>,
}

pub fn parse_glb(data: &[u8], options: &LoadOptions) -> Result<Mesh, ParseError> {
    let layout = read_layout(data)?;
    let gltf = Gltf::from_slice(&data[..layout.length]).map_err(|e| {
        ParseError::new(MeshFormat::Glb, layout.json_offset, format!("invalid glTF document: {}", e))
    })?;
    let bin_offset = layout.bin_offset.unwrap_or(layout.length);

    let buffers = resolve_buffers(&gltf, bin_offset)?;
    let instances = mesh_instances(&gltf.document, options.bake_node_transforms)?;
    let meshes: Vec<gltf::Mesh> = gltf.meshes().collect();

    let mut merged = Mesh::new();
    for (mesh_index, transform) in instances {
        let Some(mesh) = meshes.get(mesh_index) else {
            continue;
        };
        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                log::warn!(
                    "skipping {:?} primitive {} of mesh {}",
                    primitive.mode(),
                    primitive.index(),
                    mesh.name().unwrap_or("<unnamed>")
                );
                continue;
            }
            merged.append(read_primitive(&primitive, &buffers, &transform, bin_offset)?);
        }
    }
    Ok(merged)
}

fn read_layout(data: &[u8]) -> Result<GlbLayout, ParseError> {
    let err = |offset, reason: String| ParseError::new(MeshFormat::Glb, offset, reason);

    if data.len() < HEADER_LEN {
        return Err(err(data.len(), "truncated GLB header".to_string()));
    }
    if &data[0..4] != MAGIC {
        return Err(err(0, "missing glTF magic".to_string()));
    }
    let version = read_u32(data, 4);
    if version != 2 {
        return Err(err(4, format!("unsupported GLB version {}", version)));
    }
    let length = read_u32(data, 8) as usize;
    if length > data.len() {
        return Err(err(
            data.len(),
            format!("header declares {} bytes but only {} are present", length, data.len()),
        ));
    }

    let mut layout = GlbLayout {
        length,
        json_offset: 0,
        bin_offset: None,
    };
    let mut offset = HEADER_LEN;
    while offset < length {
        if offset + CHUNK_HEADER_LEN > length {
            return Err(err(offset, "truncated chunk header".to_string()));
        }
        let chunk_len = read_u32(data, offset) as usize;
        let chunk_type = read_u32(data, offset + 4);
        let body = offset + CHUNK_HEADER_LEN;
        if body + chunk_len > length {
            return Err(err(
                body,
                format!("chunk of {} bytes runs past the end of the container", chunk_len),
            ));
        }

        match chunk_type {
            CHUNK_JSON if offset == HEADER_LEN => layout.json_offset = body,
            _ if offset == HEADER_LEN => {
                return Err(err(offset, "first chunk must be JSON".to_string()));
            }
            CHUNK_BIN if layout.bin_offset.is_none() => layout.bin_offset = Some(body),
            // Unknown chunk types are skipped per the container rules
            _ => {}
        }
        offset = body + chunk_len;
    }

    if layout.json_offset == 0 {
        return Err(err(HEADER_LEN, "missing JSON chunk".to_string()));
    }
    Ok(layout)
}

fn resolve_buffers(gltf: &Gltf, bin_offset: usize) -> Result<Vec<&[u8]>, ParseError> {
    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            Source::Bin => {
                let blob = gltf.blob.as_deref().ok_or_else(|| {
                    ParseError::new(MeshFormat::Glb, bin_offset, "buffer refers to a missing BIN chunk")
                })?;
                if blob.len() < buffer.length() {
                    return Err(ParseError::new(
                        MeshFormat::Glb,
                        bin_offset + blob.len(),
                        format!("BIN chunk holds {} of {} bytes", blob.len(), buffer.length()),
                    ));
                }
                buffers.push(blob);
            }
            Source::Uri(uri) => {
                return Err(ParseError::new(
                    MeshFormat::Glb,
                    0,
                    format!("external buffer {:?} is not supported", uri),
                ));
            }
        }
    }
    Ok(buffers)
}

/// Every (mesh index, world transform) pair to emit.
///
/// With baking, meshes are instanced once per node of the default scene that
/// references them. Without it, or without any scene, each mesh is emitted
/// once with its node transforms discarded.
fn mesh_instances(document: &Document, bake: bool) -> Result<Vec<(usize, Matrix4<f32>)>, ParseError> {
    let scene = document.default_scene().or_else(|| document.scenes().next());
    match scene {
        Some(scene) if bake => {
            let mut instances = Vec::new();
            for node in scene.nodes() {
                visit_node(&node, &Matrix4::identity(), 0, &mut instances)?;
            }
            Ok(instances)
        }
        _ => Ok(document
            .meshes()
            .map(|mesh| (mesh.index(), Matrix4::identity()))
            .collect()),
    }
}

fn visit_node(
    node: &Node,
    parent: &Matrix4<f32>,
    depth: usize,
    instances: &mut Vec<(usize, Matrix4<f32>)>,
) -> Result<(), ParseError> {
    if depth > MAX_NODE_DEPTH {
        return Err(ParseError::new(
            MeshFormat::Glb,
            0,
            format!("node hierarchy deeper than {} levels", MAX_NODE_DEPTH),
        ));
    }

    let world = parent * Matrix4::from(node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        instances.push((mesh.index(), world));
    }
    for child in node.children() {
        visit_node(&child, &world, depth + 1, instances)?;
    }
    Ok(())
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[&[u8]],
    transform: &Matrix4<f32>,
    bin_offset: usize,
) -> Result<Mesh, ParseError> {
    let position_accessor = primitive.get(&gltf::Semantic::Positions).ok_or_else(|| {
        ParseError::new(MeshFormat::Glb, bin_offset, "primitive has no POSITION attribute")
    })?;
    check_accessor(&position_accessor, buffers, bin_offset)?;
    if let Some(indices) = primitive.indices() {
        check_accessor(&indices, buffers, bin_offset)?;
    }
    let color_accessor = primitive.get(&gltf::Semantic::Colors(0));
    if let Some(colors) = &color_accessor {
        check_accessor(colors, buffers, bin_offset)?;
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).copied());
    let positions: Vec<Point3<f32>> = reader
        .read_positions()
        .map(|iter| {
            iter.map(|p| transform.transform_point(&Point3::from(p)))
                .collect()
        })
        .unwrap_or_default();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if indices.len() % 3 != 0 {
        return Err(ParseError::new(
            MeshFormat::Glb,
            bin_offset,
            format!("{} indices do not form whole triangles", indices.len()),
        ));
    }
    let faces = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

    let mut mesh = Mesh::indexed(positions, faces)
        .map_err(|e| ParseError::new(MeshFormat::Glb, bin_offset, e.to_string()))?;

    if let Some(colors) = reader.read_colors(0) {
        let colors = colors
            .into_rgb_f32()
            .map(|[r, g, b]| Color::new(r, g, b))
            .collect();
        mesh.set_colors(colors)
            .map_err(|e| ParseError::new(MeshFormat::Glb, bin_offset, e.to_string()))?;
    }
    Ok(mesh)
}

/// Reject accessors whose data would run past their view or buffer
fn check_accessor(accessor: &Accessor, buffers: &[&[u8]], bin_offset: usize) -> Result<(), ParseError> {
    let Some(view) = accessor.view() else {
        return Err(ParseError::new(
            MeshFormat::Glb,
            bin_offset,
            format!("accessor {} has no buffer view", accessor.index()),
        ));
    };
    let buffer_len = buffers
        .get(view.buffer().index())
        .map(|b| b.len())
        .unwrap_or_default();
    let overflow = || ParseError::new(MeshFormat::Glb, bin_offset, "accessor size overflows");

    let view_end = view.offset().checked_add(view.length()).ok_or_else(overflow)?;
    if view_end > buffer_len {
        return Err(ParseError::new(
            MeshFormat::Glb,
            bin_offset + buffer_len,
            format!("buffer view {} runs past the end of its buffer", view.index()),
        ));
    }

    if accessor.count() > 0 {
        let stride = view.stride().unwrap_or(accessor.size());
        let needed = stride
            .checked_mul(accessor.count() - 1)
            .and_then(|span| span.checked_add(accessor.offset()))
            .and_then(|span| span.checked_add(accessor.size()))
            .ok_or_else(overflow)?;
        if needed > view.length() {
            return Err(ParseError::new(
                MeshFormat::Glb,
                bin_offset + view_end,
                format!("accessor {} needs {} bytes of a {}-byte view", accessor.index(), needed, view.length()),
            ));
        }
    }
    Ok(())
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
