//! Pull framed documents out of a captured output stream

use anyhow::{Context, Result, bail};
use hashbrown::HashMap;
use rigport_shared::{Document, INTERCHANGE_FORMAT, flatten_documents, parse_documents};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::formats::file_stem;

/// Every framed document in `stream`, keyed by object name.
///
/// Fails when a frame is broken or one name comes from more than one file.
pub fn extract_from_str(stream: &str) -> Result<BTreeMap<String, Document>, ExportError> {
    Ok(flatten_documents(parse_documents(stream)?)?)
}

/// Extract every framed document from the stream file at `input` and write
/// each to `<output_dir>/<name>.rigport.json`, with path separators in the
/// name replaced (see [`file_stem`]).
pub fn extract_documents(input: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let stream = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read stream: {:?}", input))?;
    let documents = extract_from_str(&stream)
        .with_context(|| format!("Failed to extract documents from {:?}", input))?;

    if documents.is_empty() {
        tracing::warn!("No framed documents found in {:?}", input);
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut stems: HashMap<String, &str> = HashMap::new();
    for name in documents.keys() {
        if let Some(other) = stems.insert(file_stem(name), name) {
            bail!("'{}' and '{}' would be written to the same file", other, name);
        }
    }

    let mut written = Vec::with_capacity(documents.len());
    for (name, doc) in &documents {
        let file_name = format!("{}.{}", file_stem(name), INTERCHANGE_FORMAT.json_ext);
        let path = output_dir.join(file_name);
        std::fs::write(&path, doc.to_json()?)
            .with_context(|| format!("Failed to write {:?}", path))?;
        tracing::info!("Extracted '{}' -> {:?}", name, path);
        written.push(path);
    }

    Ok(written)
}
