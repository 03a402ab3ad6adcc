//! Output conventions applied to a finished document
//!
//! Blender is Z-up and right-handed. Switching to Y-up keeps the handedness:
//! the new +Y axis is the old +Z axis and the new +Z axis is the old -Y axis.
//! Every bone transform, position, normal and the bounding box are moved
//! into the new basis. Bones can then be re-encoded as dual quaternions, and
//! faces fanned into triangles.

use glam::{Mat4, Quat, Vec3, Vec4};
use rigport_shared::{Bone, BoundingBox, DUAL_QUAT_LEN, Document, VertexAttribute};
use serde::Deserialize;

use crate::compose::{from_row_major, to_row_major};
use crate::mesh::triangulate;

/// How far a bone's scale may stray from 1 before it stops counting as rigid
const RIGID_EPSILON: f32 = 1e-3;

/// Z-up -> Y-up change of basis: `(x, y, z) -> (x, z, -y)`
const Z_UP_TO_Y_UP: Mat4 = Mat4::from_cols(Vec4::X, Vec4::NEG_Z, Vec4::Y, Vec4::W);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    /// Blender's own convention
    #[default]
    Z,
    Y,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoneFormat {
    #[default]
    Matrix,
    DualQuat,
}

/// Post-conversion options for a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conventions {
    pub up_axis: UpAxis,
    pub bone_format: BoneFormat,
    /// Split every face into triangles
    pub triangulate: bool,
}

// === Y-up ===

/// Re-express a transform in the Y-up basis
pub fn y_up_matrix(m: Mat4) -> Mat4 {
    Z_UP_TO_Y_UP * m * Z_UP_TO_Y_UP.transpose()
}

pub fn y_up_vector([x, y, z]: [f32; 3]) -> [f32; 3] {
    [x, z, -y]
}

/// Dual quaternion parts `[w, x, y, z]` rotate like their vector part
fn y_up_dual_quat(dq: [f32; DUAL_QUAT_LEN]) -> [f32; DUAL_QUAT_LEN] {
    let [rw, rx, ry, rz, dw, dx, dy, dz] = dq;
    [rw, rx, rz, -ry, dw, dx, dz, -dy]
}

fn y_up_bone(bone: &mut Bone) {
    *bone = match *bone {
        Bone::Matrix(m) => Bone::Matrix(to_row_major(y_up_matrix(from_row_major(&m)))),
        Bone::DualQuat(dq) => Bone::DualQuat(y_up_dual_quat(dq)),
    };
}

fn y_up_attribute(attribute: &mut VertexAttribute) {
    for v in attribute.data.chunks_exact_mut(3) {
        let [x, y, z] = y_up_vector([v[0], v[1], v[2]]);
        v.copy_from_slice(&[x, y, z]);
    }
}

/// The old `y` extent becomes the new `-z` extent, so min and max swap there
fn y_up_bounding_box(bb: BoundingBox) -> BoundingBox {
    let (min, max) = (bb.min_corner, bb.max_corner);
    BoundingBox {
        min_corner: [min[0], min[2], -max[1]],
        max_corner: [max[0], max[2], -min[1]],
    }
}

// === Dual quaternions ===

/// Rigid part of a transform as a dual quaternion; scale is discarded
pub fn to_dual_quat(m: Mat4) -> [f32; DUAL_QUAT_LEN] {
    let (_, real, translation) = m.to_scale_rotation_translation();
    let dual = Quat::from_xyzw(translation.x, translation.y, translation.z, 0.0) * real * 0.5;
    [
        real.w, real.x, real.y, real.z, //
        dual.w, dual.x, dual.y, dual.z,
    ]
}

fn is_rigid(m: Mat4) -> bool {
    let (scale, _, _) = m.to_scale_rotation_translation();
    (scale - Vec3::ONE).abs().max_element() <= RIGID_EPSILON
}

/// Returns whether the bone was rigid
fn dual_quat_bone(bone: &mut Bone) -> bool {
    let Bone::Matrix(values) = *bone else {
        return true;
    };
    let m = from_row_major(&values);
    *bone = Bone::DualQuat(to_dual_quat(m));
    is_rigid(m)
}

// === Document ===

fn bones_mut(doc: &mut Document) -> impl Iterator<Item = &mut Bone> {
    let keyframes = doc
        .bone_space_actions
        .values_mut()
        .flat_map(|action| action.bone_keyframes.keyframes.values_mut())
        .flatten()
        .map(|keyframe| &mut keyframe.bone);
    doc.inverse_bind_poses.iter_mut().chain(keyframes)
}

/// Apply `conventions` to a converted document
pub fn apply_conventions(doc: &mut Document, conventions: &Conventions) {
    if conventions.triangulate {
        if let Some(attribs) = &mut doc.attribs {
            triangulate(attribs);
        }
    }

    if conventions.up_axis == UpAxis::Y {
        bones_mut(doc).for_each(y_up_bone);
        if let Some(attribs) = &mut doc.attribs {
            y_up_attribute(&mut attribs.positions.attribute);
            y_up_attribute(&mut attribs.normals.attribute);
        }
        doc.bounding_box = doc.bounding_box.map(y_up_bounding_box);
    }

    if conventions.bone_format == BoneFormat::DualQuat {
        let scaled = bones_mut(doc).map(dual_quat_bone).filter(|rigid| !rigid).count();
        if scaled > 0 {
            tracing::warn!(
                "'{}': scale dropped from {} scaled bone transforms in dual quaternion output",
                doc.name,
                scaled
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{EulerOrder, Rotation, compose};
    use rigport_shared::{
        BoneKeyframe, BoneKeyframes, BoneSpaceAction, IDENTITY_MATRIX, IndexedAttribute,
        MeshAttributes,
    };
    use std::collections::BTreeMap;

    fn approx_eq(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    fn dual_quat_point(dq: &[f32; DUAL_QUAT_LEN], p: Vec3) -> Vec3 {
        let real = Quat::from_xyzw(dq[1], dq[2], dq[3], dq[0]);
        let dual = Quat::from_xyzw(dq[5], dq[6], dq[7], dq[4]);
        let t = dual * real.conjugate() * 2.0;
        real * p + Vec3::new(t.x, t.y, t.z)
    }

    #[test]
    fn test_y_up_vector() {
        assert_eq!(y_up_vector([0.0, 1.0, 2.0]), [0.0, 2.0, -1.0]);
        // Blender's up becomes +Y
        assert_eq!(y_up_vector([0.0, 0.0, 1.0]), [0.0, 1.0, -0.0]);
    }

    #[test]
    fn test_y_up_matrix_moves_points_with_the_basis() {
        let rotation = Rotation::Euler([0.3, -0.2, 1.1], EulerOrder::XYZ);
        let m = compose([1.0, 2.0, 3.0], rotation, [1.0; 3]);
        let p = Vec3::new(0.5, -1.0, 4.0);

        let expected = y_up_vector(m.transform_point3(p).to_array());
        let moved = Vec3::from_array(y_up_vector(p.to_array()));
        let converted = y_up_matrix(m).transform_point3(moved);
        assert!(approx_eq(&converted.to_array(), &expected));
    }

    #[test]
    fn test_y_up_dual_quat_swaps_like_vectors() {
        let dq = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(
            y_up_dual_quat(dq),
            [0.0, 1.0, 3.0, -2.0, 4.0, 5.0, 7.0, -6.0]
        );
    }

    #[test]
    fn test_y_up_bounding_box_stays_ordered() {
        let bb = y_up_bounding_box(BoundingBox {
            min_corner: [1.0, 2.0, 3.0],
            max_corner: [5.0, 6.0, 7.0],
        });
        assert_eq!(bb.min_corner, [1.0, 3.0, -6.0]);
        assert_eq!(bb.max_corner, [5.0, 7.0, -2.0]);
    }

    #[test]
    fn test_dual_quat_of_identity() {
        assert_eq!(
            to_dual_quat(Mat4::IDENTITY),
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_dual_quat_transforms_like_matrix() {
        let m = compose(
            [1.0, -2.0, 0.5],
            Rotation::Quaternion([0.9238795, 0.0, 0.0, 0.38268343]),
            [1.0; 3],
        );
        let dq = to_dual_quat(m);

        let real_norm: f32 = dq[..4].iter().map(|v| v * v).sum();
        assert!((real_norm - 1.0).abs() < 1e-5);

        for p in [Vec3::ZERO, Vec3::X, Vec3::new(3.0, -1.0, 2.0)] {
            let expected = m.transform_point3(p);
            assert!(approx_eq(
                &dual_quat_point(&dq, p).to_array(),
                &expected.to_array()
            ));
        }
    }

    #[test]
    fn test_rigid_check() {
        assert!(is_rigid(Mat4::IDENTITY));
        assert!(!is_rigid(Mat4::from_scale(Vec3::splat(2.0))));
    }

    fn sample_document() -> Document {
        let rest = Rotation::Quaternion([1.0, 0.0, 0.0, 0.0]);
        let local = compose([0.0, 1.0, 0.0], rest, [1.0; 3]);
        let mut doc = Document::named("Quad");
        doc.inverse_bind_poses = vec![Bone::Matrix(IDENTITY_MATRIX)];
        doc.bone_space_actions.insert(
            "Idle".into(),
            BoneSpaceAction {
                bone_keyframes: BoneKeyframes {
                    frame_range_inclusive: (0, 0),
                    keyframes: BTreeMap::from([(
                        0,
                        vec![BoneKeyframe {
                            frame: 0,
                            bone: Bone::Matrix(to_row_major(local)),
                        }],
                    )]),
                },
                pose_markers: BTreeMap::new(),
            },
        );

        let mut positions = VertexAttribute::new(3);
        positions.data = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let mut normals = VertexAttribute::new(3);
        normals.data = vec![0.0, 0.0, 1.0];
        doc.attribs = Some(MeshAttributes {
            vertices_in_each_face: vec![4],
            material_index: vec![0],
            positions: IndexedAttribute {
                indices: vec![0, 1, 2, 3],
                attribute: positions,
            },
            normals: IndexedAttribute {
                indices: vec![0, 0, 0, 0],
                attribute: normals,
            },
            uvs: None,
            bone_influences: None,
        });
        doc.bounding_box = Some(BoundingBox {
            min_corner: [0.0, 0.0, 0.0],
            max_corner: [1.0, 1.0, 0.0],
        });
        doc
    }

    #[test]
    fn test_default_conventions_change_nothing() {
        let mut doc = sample_document();
        apply_conventions(&mut doc, &Conventions::default());
        assert_eq!(doc, sample_document());
    }

    #[test]
    fn test_apply_all_conventions() {
        let mut doc = sample_document();
        apply_conventions(
            &mut doc,
            &Conventions {
                up_axis: UpAxis::Y,
                bone_format: BoneFormat::DualQuat,
                triangulate: true,
            },
        );

        let attribs = doc.attribs.as_ref().unwrap();
        assert_eq!(attribs.vertices_in_each_face, vec![3, 3]);
        assert_eq!(attribs.positions.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(approx_eq(
            &attribs.positions.attribute.data[6..9],
            &[1.0, 0.0, -1.0]
        ));
        assert!(approx_eq(&attribs.normals.attribute.data, &[0.0, 1.0, 0.0]));

        let bb = doc.bounding_box.unwrap();
        assert_eq!(bb.min_corner, [0.0, 0.0, -1.0]);
        assert_eq!(bb.max_corner, [1.0, 0.0, -0.0]);

        assert!(approx_eq(
            doc.inverse_bind_poses[0].values(),
            &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        ));

        // Translation along old +Y ends up along new -Z
        let bone = doc.bone_space_actions["Idle"].bone_keyframes.keyframes[&0][0].bone;
        let dq = bone.dual_quat().unwrap();
        assert!(approx_eq(
            &dual_quat_point(dq, Vec3::ZERO).to_array(),
            &[0.0, 0.0, -1.0]
        ));
    }
}
