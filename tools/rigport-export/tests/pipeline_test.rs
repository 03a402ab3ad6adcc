//! Library-level pipeline tests
//!
//! Snapshot -> document conversion, checked against the properties every
//! exported document must hold.


use glam::Mat4;
use rigport_export::compose::from_row_major;
use rigport_export::snapshot::{ArmatureSnapshot, MeshSnapshot};
use rigport_export::{
    BoneFormat, Conventions, Document, DocumentBuilder, MeshError, Skeleton, UpAxis,
    apply_conventions, convert_armature_to_memory, convert_mesh_to_memory,
};
use rigport_shared::{EmissionKind, frame_emission, parse_documents};

fn rig() -> ArmatureSnapshot {
    serde_json::from_value(generate_test_snapshots::rig_snapshot()).expect("rig snapshot")
}

fn quad() -> MeshSnapshot {
    serde_json::from_value(generate_test_snapshots::skinned_quad_snapshot())
        .expect("quad snapshot")
}

fn approx_eq(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4)
}

#[test]
fn test_arm_rotation_keyframe() {
    let converted = convert_armature_to_memory(&rig()).expect("convert rig");
    let doc = converted.document;

    assert_eq!(doc.joint_indices["Root"], 0);
    assert_eq!(doc.joint_indices["Arm"], 1);
    assert_eq!(doc.bone_child_to_parent.get(&1), Some(&0));
    assert!(!doc.bone_child_to_parent.contains_key(&0));

    let wave = &doc.bone_space_actions["Wave"];
    assert_eq!(wave.bone_keyframes.frame_range_inclusive, (0, 10));
    assert!(!wave.bone_keyframes.keyframes.contains_key(&0));
    assert_eq!(wave.pose_markers.get(&5).map(String::as_str), Some("peak"));

    let first = &wave.bone_keyframes.keyframes[&1][0];
    assert_eq!(first.frame, 0);

    let (s, c) = 1.57f32.sin_cos();
    let expected = [
        c, -s, 0.0, 0.0, //
        s, c, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
    assert!(approx_eq(first.bone.values(), &expected));
}

#[test]
fn test_inverse_bind_times_world_bind_is_identity() {
    let mut snapshot = rig();
    snapshot.world_matrix = [
        2.0, 0.0, 0.0, 1.0, //
        0.0, 2.0, 0.0, -3.0, //
        0.0, 0.0, 2.0, 0.5, //
        0.0, 0.0, 0.0, 1.0,
    ];
    let skeleton = Skeleton::from_snapshot(&snapshot).expect("skeleton");
    let doc = convert_armature_to_memory(&snapshot).expect("convert").document;

    for joint in 0..skeleton.len() as u16 {
        let inverse = doc.inverse_bind_poses[joint as usize]
            .matrix()
            .expect("matrix bones by default");
        let inverse = from_row_major(inverse);
        let world = skeleton.world_bind(joint).expect("world bind");
        let product = inverse * world;
        assert!(
            product.abs_diff_eq(Mat4::IDENTITY, 1e-4),
            "joint {joint}: {product:?}"
        );
    }
}

#[test]
fn test_every_bone_has_an_index() {
    let doc = convert_armature_to_memory(&rig()).expect("convert").document;

    assert_eq!(doc.joint_indices.len(), doc.inverse_bind_poses.len());
    let mut indices: Vec<u16> = doc.joint_indices.values().copied().collect();
    indices.sort();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(doc.bone_groups["Upper"], vec![1]);
}

#[test]
fn test_keyframes_strictly_ascending_within_range() {
    let doc = convert_armature_to_memory(&rig()).expect("convert").document;

    for action in doc.bone_space_actions.values() {
        let (start, end) = action.bone_keyframes.frame_range_inclusive;
        for keyframes in action.bone_keyframes.keyframes.values() {
            assert!(keyframes.windows(2).all(|w| w[0].frame < w[1].frame));
            assert!(keyframes.iter().all(|k| start <= k.frame && k.frame <= end));
        }
    }
}

#[test]
fn test_skinned_quad_attributes() {
    let converted = convert_armature_to_memory(&rig()).expect("convert rig");
    let packed = convert_mesh_to_memory(&quad(), Some(&converted.skeleton)).expect("convert quad");
    let attribs = &packed.attribs;

    assert_eq!(attribs.vertices_in_each_face, vec![3, 3]);
    assert_eq!(attribs.material_index, vec![0, 1]);
    assert_eq!(attribs.loop_count(), 6);
    assert_eq!(attribs.positions.indices, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(attribs.normals.indices, vec![0, 0, 0, 1, 1, 1]);

    let uvs = attribs.uvs.as_ref().expect("uvs");
    assert_eq!(uvs.indices.len(), 6);
    assert_eq!(uvs.attribute.element(5), Some(&[0.0, 1.0][..]));

    // "Cloth" is not a bone, so vertex 3 ends up without influences
    let influences = attribs.bone_influences.as_ref().expect("influences");
    assert_eq!(influences.bones_per_vertex.counts(), &[1, 2, 1, 0]);
    assert_eq!(influences.bone_indices, vec![0, 0, 1, 1]);
    assert_eq!(influences.bone_weights, vec![1.0, 0.5, 0.5, 1.0]);
    assert_eq!(packed.skipped.len(), 1);
    assert!(matches!(
        &packed.skipped[0],
        MeshError::UnresolvedVertexGroup { group, vertices: 1 } if group == "Cloth"
    ));
}

#[test]
fn test_world_bounding_box_contains_every_vertex() {
    let snapshot = quad();
    let converted = convert_armature_to_memory(&rig()).expect("convert rig");
    let packed = convert_mesh_to_memory(&snapshot, Some(&converted.skeleton)).expect("convert");
    let bbox = packed.bounding_box.expect("bounding box");

    assert!(approx_eq(&bbox.min_corner, &[5.0, 0.0, 0.0]));
    assert!(approx_eq(&bbox.max_corner, &[6.0, 1.0, 0.0]));

    let world = from_row_major(&snapshot.world_matrix);
    for vertex in &snapshot.vertices {
        let p = world.transform_point3(glam::Vec3::from_array(vertex.position));
        assert!(bbox.contains(p.to_array(), 1e-4));
    }
}

#[test]
fn test_skinned_mesh_without_armature_fails() {
    assert!(matches!(
        convert_mesh_to_memory(&quad(), None),
        Err(MeshError::MissingArmature { .. })
    ));
}

#[test]
fn test_document_json_is_deterministic_and_framable() {
    let converted = convert_armature_to_memory(&rig()).expect("convert rig");
    let packed = convert_mesh_to_memory(&quad(), Some(&converted.skeleton)).expect("convert");
    let doc = DocumentBuilder::new(&packed.name).mesh(packed).build();

    let first = doc.to_json().expect("json");
    let second = doc.to_json().expect("json");
    assert_eq!(first, second);
    assert!(!first.contains('\n'));

    let mut stream = String::from("Blender 4.1 (hash abc)\nRead blend: /assets/quad.blend\n");
    stream.push_str(&frame_emission(
        EmissionKind::Mesh,
        "/assets/quad.blend",
        "Quad",
        &first,
    ));
    stream.push_str("\nBlender quit\n");

    let parsed = parse_documents(&stream).expect("parse stream");
    let decoded = &parsed["/assets/quad.blend"]["Quad"];
    assert_eq!(decoded, &doc);
    assert_eq!(decoded.armature_name.as_deref(), Some("Rig"));
}

#[test]
fn test_binary_container_matches_json() {
    let doc = convert_armature_to_memory(&rig()).expect("convert").document;
    let bytes = doc.to_bytes().expect("encode");
    let from_bytes = Document::from_bytes(&bytes).expect("decode");
    let from_json = Document::from_json(&doc.to_json().expect("json")).expect("parse");
    assert_eq!(from_bytes, from_json);
}

#[test]
fn test_y_up_dual_quat_conventions() {
    let converted = convert_armature_to_memory(&rig()).expect("convert rig");
    let packed = convert_mesh_to_memory(&quad(), Some(&converted.skeleton)).expect("convert");
    let mut doc = DocumentBuilder::new(&packed.name)
        .skeleton(&converted.skeleton)
        .actions(converted.document.bone_space_actions.clone())
        .mesh(packed)
        .build();

    let conventions = Conventions {
        up_axis: UpAxis::Y,
        bone_format: BoneFormat::DualQuat,
        triangulate: true,
    };
    apply_conventions(&mut doc, &conventions);

    // Arm sits one unit up Blender's Y, which is -Z after the switch
    let dq = doc.inverse_bind_poses[1].dual_quat().expect("dual quat");
    let real = glam::Quat::from_xyzw(dq[1], dq[2], dq[3], dq[0]);
    let dual = glam::Quat::from_xyzw(dq[5], dq[6], dq[7], dq[4]);
    let t = dual * real.conjugate() * 2.0;
    assert!(approx_eq(&[t.x, t.y, t.z], &[0.0, 0.0, 1.0]));

    let keyframes = &doc.bone_space_actions["Wave"].bone_keyframes.keyframes[&1];
    assert!(keyframes.iter().all(|k| k.bone.dual_quat().is_some()));

    let bbox = doc.bounding_box.expect("bounding box");
    assert!(approx_eq(&bbox.min_corner, &[5.0, 0.0, -1.0]));
    assert!(approx_eq(&bbox.max_corner, &[6.0, 0.0, 0.0]));

    let attribs = doc.attribs.as_ref().expect("attribs");
    assert_eq!(attribs.vertices_in_each_face, vec![3, 3]);
    assert!(doc.to_json().is_ok());
}
