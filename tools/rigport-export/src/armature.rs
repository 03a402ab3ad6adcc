//! Armature converter (armature snapshot -> interchange document)

use anyhow::{Context, Result};
use rigport_shared::{Document, EmissionKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::animation::convert_actions;
use crate::conventions::apply_conventions;
use crate::document::DocumentBuilder;
use crate::error::{CurveError, ExportError};
use crate::formats::{OutputOptions, write_document};
use crate::skeleton::Skeleton;
use crate::snapshot::{ArmatureSnapshot, load_armature};

/// Result of in-memory armature conversion
#[derive(Debug, Clone)]
pub struct ConvertedArmature {
    pub document: Document,
    /// Indexed skeleton, for skinning meshes against this armature
    pub skeleton: Skeleton,
    /// Skipped channels per action
    pub skipped: BTreeMap<String, Vec<CurveError>>,
    /// Actions left out because they had no keyframes
    pub empty_actions: Vec<String>,
}

/// Convert an armature snapshot to an in-memory document
pub fn convert_armature_to_memory(
    snapshot: &ArmatureSnapshot,
) -> Result<ConvertedArmature, ExportError> {
    let skeleton = Skeleton::from_snapshot(snapshot)?;
    let actions = convert_actions(&snapshot.actions, &skeleton)?;

    let document = DocumentBuilder::new(&snapshot.name)
        .skeleton(&skeleton)
        .actions(actions.actions)
        .build();

    Ok(ConvertedArmature {
        document,
        skeleton,
        skipped: actions.skipped,
        empty_actions: actions.empty,
    })
}

/// Convert an armature snapshot file and write the document.
///
/// Returns the written path, or `None` when written to stdout.
pub fn convert_armature(input: &Path, options: &OutputOptions) -> Result<Option<PathBuf>> {
    let snapshot = load_armature(input)?;
    let mut converted = convert_armature_to_memory(&snapshot)
        .with_context(|| format!("Failed to convert armature: {:?}", input))?;
    apply_conventions(&mut converted.document, &options.conventions);

    let written = write_document(&converted.document, EmissionKind::Armature, input, options)?;

    tracing::info!(
        "Exported armature '{}': {} bones, {} actions",
        snapshot.name,
        converted.document.bone_count(),
        converted.document.bone_space_actions.len()
    );

    Ok(written)
}
