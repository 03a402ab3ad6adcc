//! Types for mesh conversion

use rigport_shared::{BoundingBox, CustomProperty, Material, MeshAttributes};
use std::collections::BTreeMap;

use crate::error::MeshError;

/// Components per position / normal
pub(crate) const VEC3_SIZE: u32 = 3;

/// Components per UV
pub(crate) const UV_SIZE: u32 = 2;

/// Result of in-memory mesh conversion
#[derive(Debug, Clone)]
pub struct PackedMesh {
    pub name: String,
    /// Parent armature, if the mesh is skinned
    pub armature_name: Option<String>,
    pub attribs: MeshAttributes,
    /// World-space box, `None` for a mesh without vertices
    pub bounding_box: Option<BoundingBox>,
    pub materials: Vec<Material>,
    pub custom_properties: BTreeMap<String, CustomProperty>,
    /// Vertex groups dropped from the influence lists
    pub skipped: Vec<MeshError>,
}
