//! End-to-end: bytes in every format through loading, normalization,
//! statistics, colorization and scene composition.

use meshview_core::{
    apply_palette, load, load_normalized, stats, unique_edges, LoadOptions, LocalTransform,
    MeshFormat, Palette, SceneGraph,
};
use nalgebra::{Matrix4, Point3, Vector3};

const CUBE_OBJ: &str = "\
v -1 -1 -1
v 1 -1 -1
v -1 1 -1
v 1 1 -1
v -1 -1 1
v 1 -1 1
v -1 1 1
v 1 1 1
f 5 6 8 7
f 2 1 3 4
f 6 2 4 8
f 1 5 7 3
f 7 8 4 3
f 1 2 6 5
";

fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for triangle in triangles {
        data.extend_from_slice(&[0u8; 12]);
        for c in triangle.iter().flatten() {
            data.extend_from_slice(&c.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 2]);
    }
    data
}

fn single_triangle_glb() -> Vec<u8> {
    let json = r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"mesh":0,"translation":[0,0,3]}],"meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],"buffers":[{"byteLength":36}],"bufferViews":[{"buffer":0,"byteLength":36}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[2,2,0]}]}"#;
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = Vec::new();
    for c in [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0] {
        bin.extend_from_slice(&c.to_le_bytes());
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut data = b"glTF".to_vec();
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&(total as u32).to_le_bytes());
    data.extend_from_slice(&(json.len() as u32).to_le_bytes());
    data.extend_from_slice(b"JSON");
    data.extend_from_slice(&json);
    data.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    data.extend_from_slice(b"BIN\0");
    data.extend_from_slice(&bin);
    data
}

#[test]
fn obj_cube_matches_reference_counts() {
    let mesh = load(CUBE_OBJ.as_bytes(), MeshFormat::Obj).unwrap();
    let s = stats(&mesh);
    assert_eq!((s.vertex_count, s.face_count, s.edge_count), (8, 12, 18));
    assert_eq!(s.format_dimensions(), "2.00 x 2.00 x 2.00");
    assert_eq!(mesh.face_indices().count() * 3, 36);
    assert_eq!(unique_edges(&mesh).len(), 18);
}

#[test]
fn stl_soup_is_normalized_and_up_corrected() {
    let triangle = [[10.0, 10.0, 0.0], [12.0, 10.0, 0.0], [10.0, 10.0, 4.0]];
    let (mesh, bounds) = load_normalized(
        &binary_stl(&[triangle]),
        MeshFormat::Stl,
        &LoadOptions::default(),
    )
    .unwrap();

    assert!(!mesh.is_indexed());
    assert_eq!(mesh.face_count(), 1);
    // Z-up height 4 becomes Y-up height 4
    assert!((bounds.size() - Vector3::new(2.0, 4.0, 0.0)).norm() < 1e-5);
    let recentered = meshview_core::bounding_box(&mesh);
    assert!(recentered.center().coords.norm() < 1e-5);
}

#[test]
fn glb_node_translation_is_baked() {
    let mesh = load(&single_triangle_glb(), MeshFormat::Glb).unwrap();
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.face(0), Some([0, 1, 2]));
    assert_eq!(mesh.positions()[1], Point3::new(2.0, 0.0, 3.0));
}

#[test]
fn every_format_feeds_one_scene() {
    let mut graph = SceneGraph::new();
    let root = graph.create_node("root");

    let sources = [
        (CUBE_OBJ.as_bytes().to_vec(), MeshFormat::Obj),
        (binary_stl(&[[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]), MeshFormat::Stl),
        (single_triangle_glb(), MeshFormat::Glb),
    ];
    for (i, (bytes, format)) in sources.iter().enumerate() {
        let (mut mesh, _) = load_normalized(bytes, *format, &LoadOptions::default()).unwrap();
        apply_palette(&mut mesh, &Palette::neon());
        let node = graph.create_mesh_node(format.name(), mesh);
        graph
            .set_local_transform(node, LocalTransform::from_translation(i as f32 * 3.0, 0.0, 0.0))
            .unwrap();
        graph.add_child(root, node).unwrap();
    }
    graph.update_world_transforms(root, &Matrix4::identity()).unwrap();

    let total = graph.stats();
    assert_eq!(total.vertex_count, 8 + 3 + 3);
    assert_eq!(total.face_count, 12 + 1 + 1);
    assert!(graph
        .meshes()
        .all(|(_, mesh, _)| mesh.colors().map(<[_]>::len) == Some(mesh.vertex_count())));

    let glb = graph.find_by_name("GLB").unwrap();
    assert!((graph.world_position(glb).unwrap() - Point3::new(6.0, 0.0, 0.0)).norm() < 1e-6);
}

#[test]
fn malformed_input_is_rejected_whole() {
    let err = load(b"v 0 0 0\nv 1 0 0\nf 1 2 9\n", MeshFormat::Obj).unwrap_err();
    assert!(err.to_string().starts_with("OBJ parse error at byte 16"));
}
