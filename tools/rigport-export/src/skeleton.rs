//! Skeleton indexer
//!
//! Assigns every bone a stable `JointIndex` (its position in the input list),
//! resolves parents and bone groups to indices, and computes inverse bind
//! matrices in world space.

use glam::Mat4;
use hashbrown::HashMap;
use rigport_shared::{Bone, JointIndex};
use std::collections::BTreeMap;

use crate::compose::{RotationMode, from_row_major, to_row_major};
use crate::error::SkeletonError;
use crate::snapshot::ArmatureSnapshot;

/// Maximum number of bones addressable by a `JointIndex`
pub const MAX_BONES: usize = JointIndex::MAX as usize + 1;

/// Determinant, relative to the product of the axis lengths, below which a
/// bind matrix is considered singular. Uniform scale alone never trips it.
const SINGULAR_EPSILON: f32 = 1e-6;

/// Whether `m` has no usable inverse
fn is_singular(m: Mat4) -> bool {
    let axes: f32 = [m.x_axis, m.y_axis, m.z_axis]
        .iter()
        .map(|axis| axis.truncate().length())
        .product();
    let det = m.determinant();
    if !det.is_finite() || !axes.is_normal() {
        return true;
    }
    det.abs() / axes < SINGULAR_EPSILON || !m.inverse().is_finite()
}

/// Immutable, indexed skeleton shared by every reconstruction step
#[derive(Debug, Clone)]
pub struct Skeleton {
    name: String,
    names: Vec<String>,
    lookup: HashMap<String, JointIndex>,
    parents: BTreeMap<JointIndex, JointIndex>,
    rotation_modes: Vec<RotationMode>,
    /// `world × bind` per joint
    world_binds: Vec<Mat4>,
    inverse_binds: Vec<Mat4>,
    groups: BTreeMap<String, Vec<JointIndex>>,
}

impl Skeleton {
    /// Index the bones of an armature snapshot
    pub fn from_snapshot(snapshot: &ArmatureSnapshot) -> Result<Self, SkeletonError> {
        let count = snapshot.bones.len();
        if count > MAX_BONES {
            return Err(SkeletonError::TooManyBones {
                count,
                max: MAX_BONES,
            });
        }

        let mut names = Vec::with_capacity(count);
        let mut lookup = HashMap::with_capacity(count);
        for (i, bone) in snapshot.bones.iter().enumerate() {
            if lookup.insert(bone.name.clone(), i as JointIndex).is_some() {
                return Err(SkeletonError::DuplicateBone {
                    bone: bone.name.clone(),
                });
            }
            names.push(bone.name.clone());
        }

        let mut parents = BTreeMap::new();
        for (i, bone) in snapshot.bones.iter().enumerate() {
            if let Some(parent) = &bone.parent {
                let parent_index =
                    *lookup
                        .get(parent)
                        .ok_or_else(|| SkeletonError::UnknownParent {
                            bone: bone.name.clone(),
                            parent: parent.clone(),
                        })?;
                parents.insert(i as JointIndex, parent_index);
            }
        }

        let world = from_row_major(&snapshot.world_matrix);
        let mut world_binds = Vec::with_capacity(count);
        let mut inverse_binds = Vec::with_capacity(count);
        for bone in &snapshot.bones {
            let world_bind = world * from_row_major(&bone.bind_matrix);
            if is_singular(world_bind) {
                return Err(SkeletonError::SingularBindMatrix {
                    bone: bone.name.clone(),
                });
            }
            world_binds.push(world_bind);
            inverse_binds.push(world_bind.inverse());
        }

        let mut groups = BTreeMap::new();
        for (group, members) in &snapshot.bone_groups {
            let indices = members
                .iter()
                .map(|member| {
                    lookup
                        .get(member)
                        .copied()
                        .ok_or_else(|| SkeletonError::UnknownGroupMember {
                            group: group.clone(),
                            bone: member.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            groups.insert(group.clone(), indices);
        }

        Ok(Self {
            name: snapshot.name.clone(),
            names,
            lookup,
            parents,
            rotation_modes: snapshot.bones.iter().map(|b| b.rotation_mode).collect(),
            world_binds,
            inverse_binds,
            groups,
        })
    }

    /// Armature name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<JointIndex> {
        self.lookup.get(name).copied()
    }

    pub fn name_of(&self, index: JointIndex) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    /// Parent joint, `None` for roots
    pub fn parent_of(&self, index: JointIndex) -> Option<JointIndex> {
        self.parents.get(&index).copied()
    }

    pub fn rotation_mode(&self, index: JointIndex) -> RotationMode {
        self.rotation_modes
            .get(index as usize)
            .copied()
            .unwrap_or_default()
    }

    /// World-space bind matrix (`world × bind`)
    pub fn world_bind(&self, index: JointIndex) -> Option<Mat4> {
        self.world_binds.get(index as usize).copied()
    }

    pub fn inverse_bind(&self, index: JointIndex) -> Option<Mat4> {
        self.inverse_binds.get(index as usize).copied()
    }

    /// Bone names in `JointIndex` order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Sparse child -> parent map
    pub fn parents(&self) -> &BTreeMap<JointIndex, JointIndex> {
        &self.parents
    }

    /// Bone groups resolved to joint indices, members in declared order
    pub fn groups(&self) -> &BTreeMap<String, Vec<JointIndex>> {
        &self.groups
    }

    /// Bone name -> index table for the document
    pub fn joint_indices(&self) -> BTreeMap<String, JointIndex> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i as JointIndex))
            .collect()
    }

    /// Inverse binds as wire bones, indexed by `JointIndex`
    pub fn inverse_bind_poses(&self) -> Vec<Bone> {
        self.inverse_binds
            .iter()
            .map(|m| Bone::Matrix(to_row_major(*m)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::BoneSnapshot;
    use glam::{Vec3, Vec4};
    use rigport_shared::IDENTITY_MATRIX;

    fn bone(name: &str, parent: Option<&str>, bind: Mat4) -> BoneSnapshot {
        BoneSnapshot {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            bind_matrix: to_row_major(bind),
            rotation_mode: RotationMode::Quaternion,
        }
    }

    fn armature(bones: Vec<BoneSnapshot>) -> ArmatureSnapshot {
        ArmatureSnapshot {
            name: "Rig".to_string(),
            world_matrix: IDENTITY_MATRIX,
            bones,
            bone_groups: BTreeMap::new(),
            actions: Vec::new(),
        }
    }

    #[test]
    fn test_index_bijection() {
        let skeleton = Skeleton::from_snapshot(&armature(vec![
            bone("Root", None, Mat4::IDENTITY),
            bone("Spine", Some("Root"), Mat4::IDENTITY),
            bone("Head", Some("Spine"), Mat4::IDENTITY),
        ]))
        .unwrap();

        assert_eq!(skeleton.len(), 3);
        for i in 0..skeleton.len() as JointIndex {
            let name = skeleton.name_of(i).unwrap();
            assert_eq!(skeleton.index_of(name), Some(i));
        }
        assert_eq!(skeleton.index_of("Spine"), Some(1));
    }

    #[test]
    fn test_parent_map_is_sparse() {
        let skeleton = Skeleton::from_snapshot(&armature(vec![
            bone("Root", None, Mat4::IDENTITY),
            bone("Arm", Some("Root"), Mat4::IDENTITY),
            bone("Prop", None, Mat4::IDENTITY),
        ]))
        .unwrap();

        assert_eq!(skeleton.parent_of(0), None);
        assert_eq!(skeleton.parent_of(1), Some(0));
        assert_eq!(skeleton.parent_of(2), None);
        assert_eq!(skeleton.parents().len(), 1);
    }

    #[test]
    fn test_unknown_parent() {
        let err = Skeleton::from_snapshot(&armature(vec![bone(
            "Arm",
            Some("Ghost"),
            Mat4::IDENTITY,
        )]))
        .unwrap_err();
        assert_eq!(
            err,
            SkeletonError::UnknownParent {
                bone: "Arm".into(),
                parent: "Ghost".into()
            }
        );
    }

    #[test]
    fn test_duplicate_bone() {
        let err = Skeleton::from_snapshot(&armature(vec![
            bone("Arm", None, Mat4::IDENTITY),
            bone("Arm", None, Mat4::IDENTITY),
        ]))
        .unwrap_err();
        assert_eq!(err, SkeletonError::DuplicateBone { bone: "Arm".into() });
    }

    #[test]
    fn test_singular_bind_matrix() {
        let flat = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        let err =
            Skeleton::from_snapshot(&armature(vec![bone("Flat", None, flat)])).unwrap_err();
        assert_eq!(err, SkeletonError::SingularBindMatrix { bone: "Flat".into() });
    }

    #[test]
    fn test_collapsed_axes_are_singular() {
        let skew = Mat4::from_cols(Vec4::X, Vec4::X + Vec4::Y * 1e-8, Vec4::Z, Vec4::W);
        let err = Skeleton::from_snapshot(&armature(vec![bone("Skew", None, skew)])).unwrap_err();
        assert_eq!(err, SkeletonError::SingularBindMatrix { bone: "Skew".into() });

        let mut nan = Mat4::IDENTITY;
        nan.w_axis.x = f32::NAN;
        assert!(is_singular(nan));
    }

    #[test]
    fn test_tiny_uniform_scale_is_invertible() {
        // Determinant is 1e-12 here, yet the matrix inverts cleanly
        let tiny = Mat4::from_scale(Vec3::splat(1e-4));
        let skeleton = Skeleton::from_snapshot(&armature(vec![bone("Tiny", None, tiny)])).unwrap();

        let product = skeleton.inverse_bind(0).unwrap() * skeleton.world_bind(0).unwrap();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn test_too_many_bones() {
        let bones: Vec<BoneSnapshot> = (0..=MAX_BONES)
            .map(|i| bone(&format!("Bone{i}"), None, Mat4::IDENTITY))
            .collect();
        assert_eq!(
            Skeleton::from_snapshot(&armature(bones)).unwrap_err(),
            SkeletonError::TooManyBones {
                count: MAX_BONES + 1,
                max: MAX_BONES,
            }
        );
    }

    #[test]
    fn test_inverse_bind_includes_world_matrix() {
        let mut snapshot = armature(vec![
            bone("Root", None, Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))),
            bone(
                "Arm",
                Some("Root"),
                Mat4::from_rotation_z(0.7) * Mat4::from_scale(Vec3::splat(2.0)),
            ),
        ]);
        snapshot.world_matrix = to_row_major(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        let skeleton = Skeleton::from_snapshot(&snapshot).unwrap();

        for i in 0..skeleton.len() as JointIndex {
            let product = skeleton.inverse_bind(i).unwrap() * skeleton.world_bind(i).unwrap();
            assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
        }

        let root_inverse = skeleton.inverse_bind(0).unwrap();
        let origin = root_inverse.transform_point3(Vec3::new(5.0, 1.0, 0.0));
        assert!(origin.abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn test_bone_groups_resolve_in_member_order() {
        let mut snapshot = armature(vec![
            bone("Root", None, Mat4::IDENTITY),
            bone("Arm", Some("Root"), Mat4::IDENTITY),
            bone("Hand", Some("Arm"), Mat4::IDENTITY),
        ]);
        snapshot
            .bone_groups
            .insert("upper".into(), vec!["Hand".into(), "Arm".into()]);
        let skeleton = Skeleton::from_snapshot(&snapshot).unwrap();
        assert_eq!(skeleton.groups()["upper"], vec![2, 1]);

        snapshot
            .bone_groups
            .insert("broken".into(), vec!["Tail".into()]);
        assert_eq!(
            Skeleton::from_snapshot(&snapshot).unwrap_err(),
            SkeletonError::UnknownGroupMember {
                group: "broken".into(),
                bone: "Tail".into()
            }
        );
    }

    #[test]
    fn test_joint_indices_table() {
        let skeleton = Skeleton::from_snapshot(&armature(vec![
            bone("Root", None, Mat4::IDENTITY),
            bone("Arm", Some("Root"), Mat4::IDENTITY),
        ]))
        .unwrap();
        let table = skeleton.joint_indices();
        assert_eq!(table["Root"], 0);
        assert_eq!(table["Arm"], 1);
        assert_eq!(skeleton.inverse_bind_poses().len(), 2);
    }
}
