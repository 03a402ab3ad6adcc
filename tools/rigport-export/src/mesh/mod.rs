//! Mesh converter (mesh snapshot -> interchange document)

mod bounds;
mod influences;
mod packing;
mod triangulate;
mod types;

use anyhow::{Context, Result};
use rigport_shared::{EmissionKind, MeshAttributes};
use std::path::{Path, PathBuf};

use crate::compose::from_row_major;
use crate::conventions::apply_conventions;
use crate::document::DocumentBuilder;
use crate::error::MeshError;
use crate::formats::{OutputOptions, write_document};
use crate::skeleton::Skeleton;
use crate::snapshot::{MeshSnapshot, load_armature, load_mesh};

// Re-export public API
pub use bounds::{local_corners, world_bounding_box};
pub use packing::face_normal;
pub use triangulate::triangulate;
pub use types::PackedMesh;

/// Pack a mesh snapshot into attribute buffers.
///
/// Bone influences are built only when the mesh names a parent armature, in
/// which case `skeleton` must be that armature.
pub fn convert_mesh_to_memory(
    snapshot: &MeshSnapshot,
    skeleton: Option<&Skeleton>,
) -> Result<PackedMesh, MeshError> {
    packing::validate_faces(&snapshot.faces, snapshot.vertices.len())?;

    let skeleton = match (&snapshot.armature_name, skeleton) {
        (Some(expected), Some(skeleton)) if skeleton.name() != expected => {
            return Err(MeshError::ArmatureMismatch {
                mesh: snapshot.name.clone(),
                expected: expected.clone(),
                found: skeleton.name().to_string(),
            });
        }
        (Some(expected), None) => {
            return Err(MeshError::MissingArmature {
                mesh: snapshot.name.clone(),
                armature: expected.clone(),
            });
        }
        (Some(_), Some(skeleton)) => Some(skeleton),
        (None, Some(skeleton)) => {
            tracing::debug!(
                "Mesh '{}' has no parent armature, ignoring '{}'",
                snapshot.name,
                skeleton.name()
            );
            None
        }
        (None, None) => None,
    };

    let uvs = packing::pack_uvs(snapshot.uv_layer.as_deref(), &snapshot.faces)?;

    let (bone_influences, skipped) = match skeleton {
        Some(skeleton) => {
            let (influences, skipped) =
                influences::pack_influences(&snapshot.vertices, &snapshot.vertex_groups, skeleton);
            (Some(influences), skipped)
        }
        None => (None, Vec::new()),
    };

    let attribs = MeshAttributes {
        vertices_in_each_face: snapshot
            .faces
            .iter()
            .map(|f| f.vertices.len() as u32)
            .collect(),
        material_index: snapshot.faces.iter().map(|f| f.material_index).collect(),
        positions: packing::pack_positions(&snapshot.vertices, &snapshot.faces),
        normals: packing::pack_normals(&snapshot.vertices, &snapshot.faces),
        uvs,
        bone_influences,
    };

    let bounding_box = world_bounding_box(
        snapshot.vertices.iter().map(|v| v.position),
        from_row_major(&snapshot.world_matrix),
    );

    Ok(PackedMesh {
        name: snapshot.name.clone(),
        armature_name: snapshot.armature_name.clone(),
        attribs,
        bounding_box,
        materials: snapshot.materials.clone(),
        custom_properties: snapshot.custom_properties.clone(),
        skipped,
    })
}

/// Convert a mesh snapshot file and write the document.
///
/// With `embed_armature`, the document also carries the armature's skeleton and
/// actions. Returns the written path, or `None` when written to stdout.
pub fn convert_mesh(
    input: &Path,
    armature: Option<&Path>,
    options: &OutputOptions,
) -> Result<Option<PathBuf>> {
    let snapshot = load_mesh(input)?;

    let armature_snapshot = armature.map(load_armature).transpose()?;
    let skeleton = armature_snapshot
        .as_ref()
        .map(Skeleton::from_snapshot)
        .transpose()
        .with_context(|| format!("Invalid armature for mesh '{}'", snapshot.name))?;

    let packed = convert_mesh_to_memory(&snapshot, skeleton.as_ref())
        .with_context(|| format!("Failed to convert mesh: {:?}", input))?;

    let mut builder = DocumentBuilder::new(&packed.name);
    if options.embed_armature {
        if let (Some(skeleton), Some(armature)) = (&skeleton, &armature_snapshot) {
            let actions = crate::animation::convert_actions(&armature.actions, skeleton)?;
            builder = builder.skeleton(skeleton).actions(actions.actions);
        }
    }
    let mut document = builder.mesh(packed.clone()).build();
    apply_conventions(&mut document, &options.conventions);

    let written = write_document(&document, EmissionKind::Mesh, input, options)?;

    tracing::info!(
        "Exported mesh '{}': {} vertices, {} faces{}",
        packed.name,
        snapshot.vertices.len(),
        snapshot.faces.len(),
        if packed.attribs.bone_influences.is_some() {
            ", skinned"
        } else {
            ""
        }
    );

    Ok(written)
}
