//! Shared types for the rigport interchange format.
//!
//! Wire types of the interchange document, format constants, the JSON and
//! binary encodings, and the START/END framing used on mixed output streams.

pub mod codec;
pub mod document;
pub mod error;
pub mod format;
pub mod framing;
pub mod validate;

pub use document::{
    BaseColor, Bone, BoneInfluences, BoneKeyframe, BoneKeyframes, BoneSpaceAction, BonesPerVertex,
    BoundingBox, Channel, CustomProperty, DUAL_QUAT_LEN, Document, Frame, IDENTITY_MATRIX,
    IndexedAttribute, JointIndex, MATRIX_LEN, Material, MeshAttributes, ScalarInput,
    ScalarProperty, VertexAttribute,
};
pub use error::{FramingError, SerializationError};
pub use format::{BinaryHeader, INTERCHANGE_FORMAT, InterchangeFormat};
pub use framing::{
    Emission, EmissionKind, flatten_documents, frame_emission, parse_documents, parse_emissions,
};
pub use validate::ensure_finite;
