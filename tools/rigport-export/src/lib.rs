//! rigport-export library
//!
//! Converts armature and mesh snapshots into interchange documents. Used by the
//! `rigport-export` binary and available to other tools.

pub mod animation;
pub mod armature;
pub mod compose;
pub mod conventions;
pub mod curves;
pub mod document;
pub mod error;
pub mod extract;
pub mod formats;
pub mod manifest;
pub mod mesh;
pub mod skeleton;
pub mod snapshot;

// Re-export the interchange format from shared
pub use rigport_shared::{Document, INTERCHANGE_FORMAT, InterchangeFormat};

// Re-export key conversion types
pub use animation::{ConvertedAction, ConvertedActions, convert_action, convert_actions};
pub use armature::{ConvertedArmature, convert_armature, convert_armature_to_memory};
pub use conventions::{BoneFormat, Conventions, UpAxis, apply_conventions};
pub use document::DocumentBuilder;
pub use error::{CurveError, ExportError, MeshError, SkeletonError};
pub use mesh::{PackedMesh, convert_mesh, convert_mesh_to_memory};
pub use skeleton::Skeleton;
