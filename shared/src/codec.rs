//! JSON and binary encodings of a [`Document`]

use crate::document::Document;
use crate::error::SerializationError;
use crate::format::{BinaryHeader, INTERCHANGE_FORMAT};
use crate::validate::ensure_finite;

impl Document {
    /// Render as single-line JSON.
    ///
    /// Fails on the first non-finite float instead of writing `null`.
    pub fn to_json(&self) -> Result<String, SerializationError> {
        ensure_finite(self)?;
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON body
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as a binary container (`RGPT` + version + bitcode payload)
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        ensure_finite(self)?;
        let payload = bitcode::encode(self);
        let mut bytes = Vec::with_capacity(BinaryHeader::SIZE + payload.len());
        bytes.extend_from_slice(&BinaryHeader::current().to_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode a binary container, checking magic bytes and version
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        let header = BinaryHeader::from_bytes(bytes).ok_or_else(|| SerializationError::BadMagic {
            expected: *INTERCHANGE_FORMAT.magic,
            found: bytes.iter().take(4).copied().collect(),
        })?;

        if &header.magic != INTERCHANGE_FORMAT.magic {
            return Err(SerializationError::BadMagic {
                expected: *INTERCHANGE_FORMAT.magic,
                found: header.magic.to_vec(),
            });
        }

        if header.version != INTERCHANGE_FORMAT.version {
            return Err(SerializationError::UnsupportedVersion {
                expected: INTERCHANGE_FORMAT.version,
                found: header.version,
            });
        }

        bitcode::decode(&bytes[BinaryHeader::SIZE..])
            .map_err(|e| SerializationError::Decode(e.to_string()))
    }
}
