//! Error types for rendering, decoding and framing documents

/// Failure to render or decode a document
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Non-finite value at {location}")]
    NonFiniteValue { location: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid magic bytes: expected {expected:?}, got {found:?}")]
    BadMagic { expected: [u8; 4], found: Vec<u8> },

    #[error("Unsupported format version: {found} (expected {expected})")]
    UnsupportedVersion { expected: u32, found: u32 },

    #[error("Failed to decode binary document: {0}")]
    Decode(String),
}

/// Failure to locate framed documents in an output stream
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("Line {line}: no END sentinel for '{start}'")]
    Unterminated { line: usize, start: String },

    #[error("Line {line}: expected '{expected}', found '{found}'")]
    MismatchedEnd {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("Line {line}: malformed sentinel '{sentinel}' (expected '<path> <name>')")]
    MalformedSentinel { line: usize, sentinel: String },

    #[error("Line {line}: sentinel '{start}' is not followed by a body")]
    MissingBody { line: usize, start: String },

    #[error("'{name}' exported from more than one file: {paths:?}")]
    DuplicateNames { name: String, paths: Vec<String> },

    #[error("Line {line}: invalid body for '{header}': {source}")]
    InvalidBody {
        line: usize,
        header: String,
        #[source]
        source: SerializationError,
    },

    #[error("Line {line}: sentinel '{header}' does not end with the body's name '{name}'")]
    NameMismatch {
        line: usize,
        header: String,
        name: String,
    },
}
