//! Snapshot input types.
//!
//! A snapshot is the pre-extracted, read-only JSON description of an armature
//! or mesh, written by the host application.

use anyhow::{Context, Result};
use rigport_shared::{CustomProperty, Frame, IDENTITY_MATRIX, MATRIX_LEN, Material};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

use crate::compose::RotationMode;

fn identity() -> [f32; MATRIX_LEN] {
    IDENTITY_MATRIX
}

// === Armature ===

#[derive(Debug, Clone, Deserialize)]
pub struct ArmatureSnapshot {
    pub name: String,
    /// Row-major
    #[serde(default = "identity")]
    pub world_matrix: [f32; MATRIX_LEN],
    pub bones: Vec<BoneSnapshot>,
    #[serde(default)]
    pub bone_groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub actions: Vec<ActionSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoneSnapshot {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Armature-space rest matrix, row-major
    #[serde(default = "identity")]
    pub bind_matrix: [f32; MATRIX_LEN],
    /// Blender name (`"QUATERNION"`, `"XYZ"`, ...)
    #[serde(default)]
    pub rotation_mode: RotationMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionSnapshot {
    pub name: String,
    /// Declared `[start, end]`; derived from the keyframes when absent
    #[serde(default)]
    pub frame_range: Option<[f32; 2]>,
    #[serde(default)]
    pub fcurves: Vec<FCurveSnapshot>,
    #[serde(default)]
    pub pose_markers: BTreeMap<Frame, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FCurveSnapshot {
    /// e.g. `pose.bones["Arm"].rotation_euler`
    pub data_path: String,
    pub array_index: u32,
    /// `[frame, value]` pairs
    pub keyframe_points: Vec<[f32; 2]>,
}

// === Mesh ===

#[derive(Debug, Clone, Deserialize)]
pub struct MeshSnapshot {
    pub name: String,
    #[serde(default)]
    pub armature_name: Option<String>,
    #[serde(default = "identity")]
    pub world_matrix: [f32; MATRIX_LEN],
    pub vertices: Vec<VertexSnapshot>,
    pub faces: Vec<FaceSnapshot>,
    /// Vertex group names, indexed by group index
    #[serde(default)]
    pub vertex_groups: Vec<String>,
    /// One UV per face loop, in face order
    #[serde(default)]
    pub uv_layer: Option<Vec<[f32; 2]>>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub custom_properties: BTreeMap<String, CustomProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VertexSnapshot {
    pub position: [f32; 3],
    /// `(group index, weight)` pairs
    #[serde(default)]
    pub groups: Vec<(usize, f32)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceSnapshot {
    pub vertices: Vec<usize>,
    #[serde(default)]
    pub material_index: u16,
    #[serde(default)]
    pub normal: Option<[f32; 3]>,
}

impl MeshSnapshot {
    pub fn loop_count(&self) -> usize {
        self.faces.iter().map(|f| f.vertices.len()).sum()
    }
}

// === Loading ===

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} snapshot: {:?}", what, path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} snapshot: {:?}", what, path))
}

/// Load an armature snapshot from a JSON file
pub fn load_armature(path: &Path) -> Result<ArmatureSnapshot> {
    load_json(path, "armature")
}

/// Load a mesh snapshot from a JSON file
pub fn load_mesh(path: &Path) -> Result<MeshSnapshot> {
    load_json(path, "mesh")
}
