//! Interchange document types
//!
//! Field names of these types are the JSON wire contract. Every map is a
//! `BTreeMap` so that rendering the same document twice yields identical bytes.
//! Matrices are plain `[f32; 16]` arrays in row-major order.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable, dense index of a bone within its skeleton
pub type JointIndex = u16;

/// Integer animation frame (may be negative)
pub type Frame = i32;

/// Number of floats in a serialized 4x4 matrix
pub const MATRIX_LEN: usize = 16;

/// Number of floats in a serialized dual quaternion
pub const DUAL_QUAT_LEN: usize = 8;

/// Row-major 4x4 identity
pub const IDENTITY_MATRIX: [f32; MATRIX_LEN] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

// === Skeleton & Animation ===

/// A bone transform as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum Bone {
    /// 16 floats, row-major
    Matrix([f32; MATRIX_LEN]),
    /// Rigid transform: real part `[w, x, y, z]`, then dual part `[w, x, y, z]`
    DualQuat([f32; DUAL_QUAT_LEN]),
}

impl Bone {
    pub fn matrix(&self) -> Option<&[f32; MATRIX_LEN]> {
        match self {
            Bone::Matrix(m) => Some(m),
            Bone::DualQuat(_) => None,
        }
    }

    pub fn dual_quat(&self) -> Option<&[f32; DUAL_QUAT_LEN]> {
        match self {
            Bone::Matrix(_) => None,
            Bone::DualQuat(dq) => Some(dq),
        }
    }

    /// Every float of the transform, in wire order
    pub fn values(&self) -> &[f32] {
        match self {
            Bone::Matrix(m) => m,
            Bone::DualQuat(dq) => dq,
        }
    }
}

/// Local transform of one bone at one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BoneKeyframe {
    pub frame: Frame,
    pub bone: Bone,
}

/// Reconstructed keyframes of one action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BoneKeyframes {
    /// `[start, end]`, both inclusive
    pub frame_range_inclusive: (Frame, Frame),
    /// Ascending, duplicate-free keyframes per bone. Bones with no samples are absent.
    pub keyframes: BTreeMap<JointIndex, Vec<BoneKeyframe>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BoneSpaceAction {
    pub bone_keyframes: BoneKeyframes,
    /// Frame -> marker name
    pub pose_markers: BTreeMap<Frame, String>,
}

impl BoneSpaceAction {
    /// Frames at which `joint` has a keyframe
    pub fn frames_of(&self, joint: JointIndex) -> Vec<Frame> {
        self.bone_keyframes
            .keyframes
            .get(&joint)
            .map(|kfs| kfs.iter().map(|kf| kf.frame).collect())
            .unwrap_or_default()
    }
}

// === Mesh ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BoundingBox {
    pub min_corner: [f32; 3],
    pub max_corner: [f32; 3],
}

impl BoundingBox {
    /// Whether `point` lies inside the box, allowing `epsilon` of slack per axis
    pub fn contains(&self, point: [f32; 3], epsilon: f32) -> bool {
        (0..3).all(|axis| {
            point[axis] >= self.min_corner[axis] - epsilon
                && point[axis] <= self.max_corner[axis] + epsilon
        })
    }
}

/// Flat float buffer with a fixed number of components per element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct VertexAttribute {
    pub data: Vec<f32>,
    pub attribute_size: u32,
}

impl VertexAttribute {
    pub fn new(attribute_size: u32) -> Self {
        Self {
            data: Vec::new(),
            attribute_size,
        }
    }

    /// Number of whole elements in the buffer
    pub fn len(&self) -> usize {
        if self.attribute_size == 0 {
            0
        } else {
            self.data.len() / self.attribute_size as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `index` as a slice of `attribute_size` floats
    pub fn element(&self, index: usize) -> Option<&[f32]> {
        let size = self.attribute_size as usize;
        self.data.get(index * size..(index + 1) * size)
    }
}

/// Attribute buffer plus the per-loop indices into it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct IndexedAttribute {
    pub indices: Vec<u32>,
    pub attribute: VertexAttribute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum BonesPerVertex {
    /// Influence count for each vertex, in vertex order
    NonUniform(Vec<u16>),
}

impl BonesPerVertex {
    pub fn counts(&self) -> &[u16] {
        match self {
            BonesPerVertex::NonUniform(counts) => counts,
        }
    }
}

/// Flattened skinning data. `bone_indices` and `bone_weights` hold
/// `bones_per_vertex[v]` entries for each vertex `v`, in vertex order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BoneInfluences {
    pub bones_per_vertex: BonesPerVertex,
    pub bone_indices: Vec<JointIndex>,
    pub bone_weights: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct MeshAttributes {
    pub vertices_in_each_face: Vec<u32>,
    pub material_index: Vec<u16>,
    pub positions: IndexedAttribute,
    pub normals: IndexedAttribute,
    pub uvs: Option<IndexedAttribute>,
    pub bone_influences: Option<BoneInfluences>,
}

impl MeshAttributes {
    /// Total number of face loops (face-vertex corners)
    pub fn loop_count(&self) -> usize {
        self.vertices_in_each_face.iter().map(|&n| n as usize).sum()
    }
}

// === Materials & Custom Properties ===

/// Texture channel a scalar input is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Channel {
    R,
    G,
    B,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum BaseColor {
    Uniform([f32; 3]),
    ImageTexture(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum ScalarInput {
    Uniform(f32),
    ImageTexture(String, Channel),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Material {
    pub name: String,
    pub base_color: BaseColor,
    pub roughness: ScalarInput,
    pub metallic: ScalarInput,
    pub normal_map: Option<String>,
}

/// Scalar element of a `CustomProperty::Vec`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum ScalarProperty {
    Float(f32),
    Int(i32),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum CustomProperty {
    Float(f32),
    Int(i32),
    String(String),
    Vec(Vec<ScalarProperty>),
}

// === Document ===

/// One exported armature or mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Document {
    pub name: String,
    pub armature_name: Option<String>,
    pub joint_indices: BTreeMap<String, JointIndex>,
    /// Sparse: root bones are absent
    pub bone_child_to_parent: BTreeMap<JointIndex, JointIndex>,
    /// Indexed by `JointIndex`
    pub inverse_bind_poses: Vec<Bone>,
    pub bone_groups: BTreeMap<String, Vec<JointIndex>>,
    pub bone_space_actions: BTreeMap<String, BoneSpaceAction>,
    pub bounding_box: Option<BoundingBox>,
    pub materials: Vec<Material>,
    pub custom_properties: BTreeMap<String, CustomProperty>,
    pub attribs: Option<MeshAttributes>,
}

impl Document {
    /// Empty document with the given name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn bone_count(&self) -> usize {
        self.inverse_bind_poses.len()
    }

    /// Whether the document carries mesh attributes
    pub fn is_mesh(&self) -> bool {
        self.attribs.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_keys_render_as_strings() {
        let mut doc = Document::named("Rig");
        doc.bone_child_to_parent.insert(1, 0);
        doc.joint_indices.insert("Root".into(), 0);
        doc.joint_indices.insert("Arm".into(), 1);

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains(r#""bone_child_to_parent":{"1":0}"#));
        assert!(json.contains(r#""joint_indices":{"Arm":1,"Root":0}"#));
    }

    #[test]
    fn test_bone_shapes() {
        let dq = Bone::DualQuat([1.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0]);
        assert_eq!(
            serde_json::to_string(&dq).unwrap(),
            r#"{"DualQuat":[1.0,0.0,0.0,0.0,0.0,0.5,0.0,0.0]}"#
        );
        assert_eq!(dq.matrix(), None);
        assert_eq!(dq.values().len(), DUAL_QUAT_LEN);

        let m = Bone::Matrix(IDENTITY_MATRIX);
        assert_eq!(m.matrix(), Some(&IDENTITY_MATRIX));
        assert_eq!(m.dual_quat(), None);
        assert_eq!(m.values().len(), MATRIX_LEN);
    }

    #[test]
    fn test_empty_document_shape() {
        let json = serde_json::to_string(&Document::named("Empty")).unwrap();
        assert!(json.starts_with(r#"{"name":"Empty","armature_name":null,"#));
        assert!(json.contains(r#""bounding_box":null"#));
        assert!(json.ends_with(r#""attribs":null}"#));
    }

    #[test]
    fn test_material_enum_shapes() {
        let material = Material {
            name: "Skin".into(),
            base_color: BaseColor::Uniform([1.0, 0.5, 0.0]),
            roughness: ScalarInput::ImageTexture("rough.png".into(), Channel::R),
            metallic: ScalarInput::Uniform(0.0),
            normal_map: None,
        };
        let json = serde_json::to_string(&material).unwrap();
        let expected = concat!(
            r#"{"name":"Skin","base_color":{"Uniform":[1.0,0.5,0.0]},"#,
            r#""roughness":{"ImageTexture":["rough.png","R"]},"#,
            r#""metallic":{"Uniform":0.0},"normal_map":null}"#,
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn test_custom_property_shapes() {
        let props = BTreeMap::from([
            ("a".to_string(), CustomProperty::Int(3)),
            (
                "b".to_string(),
                CustomProperty::Vec(vec![ScalarProperty::Float(1.5), ScalarProperty::Int(2)]),
            ),
        ]);
        let json = serde_json::to_string(&props).unwrap();
        assert_eq!(json, r#"{"a":{"Int":3},"b":{"Vec":[{"Float":1.5},{"Int":2}]}}"#);
    }

    #[test]
    fn test_vertex_attribute_elements() {
        let attr = VertexAttribute {
            data: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            attribute_size: 3,
        };
        assert_eq!(attr.len(), 2);
        assert_eq!(attr.element(1), Some(&[3.0, 4.0, 5.0][..]));
        assert_eq!(attr.element(2), None);
    }

    #[test]
    fn test_bounding_box_contains() {
        let bb = BoundingBox {
            min_corner: [-1.0, -1.0, -1.0],
            max_corner: [1.0, 1.0, 1.0],
        };
        assert!(bb.contains([0.0, 1.0, -1.0], 0.0));
        assert!(!bb.contains([0.0, 1.1, 0.0], 0.0));
        assert!(bb.contains([0.0, 1.0001, 0.0], 1e-3));
    }
}
