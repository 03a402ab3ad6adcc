//! Attribute packing
//!
//! Positions are stored once per vertex, normals once per face and UVs once
//! per face loop. Each buffer carries one index per face loop.

use glam::Vec3;
use rigport_shared::{IndexedAttribute, VertexAttribute};

use super::types::{UV_SIZE, VEC3_SIZE};
use crate::error::MeshError;
use crate::snapshot::{FaceSnapshot, VertexSnapshot};

/// Check that every face only references existing vertices
pub(crate) fn validate_faces(faces: &[FaceSnapshot], vertex_count: usize) -> Result<(), MeshError> {
    for (face_index, face) in faces.iter().enumerate() {
        if let Some(&index) = face.vertices.iter().find(|&&v| v >= vertex_count) {
            return Err(MeshError::VertexIndexOutOfRange {
                face: face_index,
                index,
                vertex_count,
            });
        }
    }
    Ok(())
}

/// One position per vertex, indexed by the face vertex indices
pub(crate) fn pack_positions(
    vertices: &[VertexSnapshot],
    faces: &[FaceSnapshot],
) -> IndexedAttribute {
    let mut attribute = VertexAttribute::new(VEC3_SIZE);
    attribute.data = vertices.iter().flat_map(|v| v.position).collect();

    let indices = faces
        .iter()
        .flat_map(|f| f.vertices.iter().map(|&v| v as u32))
        .collect();

    IndexedAttribute { indices, attribute }
}

/// Face normal by Newell's method. Degenerate faces give the zero vector.
pub fn face_normal(points: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for (i, current) in points.iter().enumerate() {
        let next = points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal.normalize_or_zero()
}

/// One normal per face; every loop of a face points at its face's slot
pub(crate) fn pack_normals(
    vertices: &[VertexSnapshot],
    faces: &[FaceSnapshot],
) -> IndexedAttribute {
    let mut attribute = VertexAttribute::new(VEC3_SIZE);
    let mut indices = Vec::new();

    for (face_index, face) in faces.iter().enumerate() {
        let normal = match face.normal {
            Some(normal) => normal,
            None => {
                let points: Vec<Vec3> = face
                    .vertices
                    .iter()
                    .map(|&v| Vec3::from_array(vertices[v].position))
                    .collect();
                face_normal(&points).to_array()
            }
        };
        attribute.data.extend_from_slice(&normal);
        indices.extend(std::iter::repeat_n(face_index as u32, face.vertices.len()));
    }

    IndexedAttribute { indices, attribute }
}

/// One UV per face loop, `None` without a UV layer
pub(crate) fn pack_uvs(
    uv_layer: Option<&[[f32; 2]]>,
    faces: &[FaceSnapshot],
) -> Result<Option<IndexedAttribute>, MeshError> {
    let Some(uvs) = uv_layer else {
        return Ok(None);
    };

    let loop_count: usize = faces.iter().map(|f| f.vertices.len()).sum();
    if uvs.len() != loop_count {
        return Err(MeshError::UvLoopCountMismatch {
            uv_count: uvs.len(),
            loop_count,
        });
    }

    let mut attribute = VertexAttribute::new(UV_SIZE);
    attribute.data = uvs.iter().flatten().copied().collect();

    Ok(Some(IndexedAttribute {
        indices: (0..loop_count as u32).collect(),
        attribute,
    }))
}
