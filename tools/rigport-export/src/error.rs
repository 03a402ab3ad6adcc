//! Error taxonomy of the export pipeline.
//!
//! Some variants are recoverable: the pipeline records them in a skip list and
//! carries on. Everything that reaches [`ExportError`] aborts the export.

use rigport_shared::{Frame, FramingError, SerializationError};

/// Structural problems with an armature's bones
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkeletonError {
    #[error("Bone '{bone}' names unknown parent '{parent}'")]
    UnknownParent { bone: String, parent: String },

    #[error("Bone '{bone}' has a singular bind matrix")]
    SingularBindMatrix { bone: String },

    #[error("Duplicate bone name '{bone}'")]
    DuplicateBone { bone: String },

    #[error("Skeleton has {count} bones, maximum is {max}")]
    TooManyBones { count: usize, max: usize },

    #[error("Bone group '{group}' references unknown bone '{bone}'")]
    UnknownGroupMember { group: String, bone: String },
}

/// Problems with an action's animation curves
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    /// Recorded and skipped
    #[error("Unsupported property '{property}' (axis {axis}) on bone '{bone}'")]
    UnsupportedProperty {
        bone: String,
        property: String,
        axis: u32,
    },

    /// Recorded and skipped
    #[error("Curve targets unknown bone '{bone}'")]
    UnknownBone { bone: String },

    /// Recorded and skipped
    #[error("Curve '{data_path}' is not a pose bone channel")]
    UnrecognizedDataPath { data_path: String },

    /// Recorded and skipped
    #[error("Non-finite keyframe on bone '{bone}' ({property})")]
    InvalidKeyframe { bone: String, property: String },

    #[error("Action '{action}' has invalid frame range {start}..={end}")]
    InvalidFrameRange {
        action: String,
        start: Frame,
        end: Frame,
    },

    #[error("Duplicate action name '{action}'")]
    DuplicateAction { action: String },
}

impl CurveError {
    /// Whether the sample is skipped rather than aborting the export
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CurveError::UnsupportedProperty { .. }
                | CurveError::UnknownBone { .. }
                | CurveError::UnrecognizedDataPath { .. }
                | CurveError::InvalidKeyframe { .. }
        )
    }
}

/// Problems with mesh topology or skinning
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    /// Recorded and skipped
    #[error("Vertex group '{group}' does not resolve to a bone ({vertices} vertices affected)")]
    UnresolvedVertexGroup { group: String, vertices: usize },

    /// Recorded and skipped
    #[error("Vertex {vertex} has {dropped} influences past the limit of {max}")]
    TooManyInfluences {
        vertex: usize,
        dropped: usize,
        max: usize,
    },

    #[error("Face {face} references vertex {index}, but mesh has {vertex_count} vertices")]
    VertexIndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("UV layer has {uv_count} entries, expected one per face loop ({loop_count})")]
    UvLoopCountMismatch { uv_count: usize, loop_count: usize },

    #[error("Mesh '{mesh}' is parented to armature '{armature}', but no armature was provided")]
    MissingArmature { mesh: String, armature: String },

    #[error("Mesh '{mesh}' is parented to armature '{expected}', but '{found}' was provided")]
    ArmatureMismatch {
        mesh: String,
        expected: String,
        found: String,
    },
}

/// Any fatal export failure
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Skeleton(#[from] SkeletonError),

    #[error(transparent)]
    Curve(#[from] CurveError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Framing(#[from] FramingError),
}
