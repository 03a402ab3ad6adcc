//! Interchange format specification.
//!
//! This module defines the `InterchangeFormat` struct which serves as the single source
//! of truth for all format-related constants (file extensions, magic bytes, version).
//!
//! # Example
//!
//! ```
//! use rigport_shared::INTERCHANGE_FORMAT;
//!
//! assert_eq!(INTERCHANGE_FORMAT.magic, b"RGPT");
//! assert_eq!(INTERCHANGE_FORMAT.json_ext, "rigport.json");
//! ```

/// Interchange format specification.
///
/// Defines the constants used for JSON and binary interchange documents.
#[derive(Debug, Clone, Copy)]
pub struct InterchangeFormat {
    /// Magic bytes at start of a binary document (4 bytes)
    pub magic: &'static [u8; 4],

    /// Format version for backward compatibility
    pub version: u32,

    /// JSON document extension without leading dot
    pub json_ext: &'static str,

    /// Binary document extension without leading dot
    pub binary_ext: &'static str,
}

impl InterchangeFormat {
    /// Create a new format specification.
    pub const fn new(
        magic: &'static [u8; 4],
        version: u32,
        json_ext: &'static str,
        binary_ext: &'static str,
    ) -> Self {
        Self {
            magic,
            version,
            json_ext,
            binary_ext,
        }
    }

    /// File extension for the requested encoding
    pub fn extension(&self, binary: bool) -> &'static str {
        if binary {
            self.binary_ext
        } else {
            self.json_ext
        }
    }
}

/// The interchange format written by this workspace.
///
/// - Binary magic: `RGPT`
/// - Extensions: `.rigport.json` (JSON), `.rigport` (binary)
pub const INTERCHANGE_FORMAT: InterchangeFormat =
    InterchangeFormat::new(b"RGPT", 1, "rigport.json", "rigport");

/// Header that precedes the bitcode payload of a binary document (8 bytes)
///
/// # Layout
/// ```text
/// 0x00: magic [u8; 4]   - "RGPT"
/// 0x04: version u32 LE  - format version
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BinaryHeader {
    pub magic: [u8; 4],
    pub version: u32,
}

impl BinaryHeader {
    pub const SIZE: usize = 8;

    /// Header for the current format version
    pub fn current() -> Self {
        Self {
            magic: *INTERCHANGE_FORMAT.magic,
            version: INTERCHANGE_FORMAT.version,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}
