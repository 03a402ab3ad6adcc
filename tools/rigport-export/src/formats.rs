//! Document output
//!
//! Writes a document as bare JSON, as a binary container, or wrapped in the
//! START/END framing used on mixed output streams.

use anyhow::{Context, Result, bail};
use rigport_shared::{Document, EmissionKind, INTERCHANGE_FORMAT, frame_emission};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::conventions::Conventions;

/// How and where a converted document is written
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Output file; derived from the input path when absent
    pub output: Option<PathBuf>,
    /// Write the binary container instead of JSON
    pub binary: bool,
    /// Wrap the JSON body in START/END sentinel lines
    pub framed: bool,
    /// Include the parent armature's skeleton and actions in mesh documents
    pub embed_armature: bool,
    /// Up axis, bone encoding and face layout of the written document
    pub conventions: Conventions,
}

/// Default output path next to `input` (`rig.json` -> `rig.rigport.json`)
pub fn default_output_path(input: &Path, binary: bool) -> PathBuf {
    input.with_extension(INTERCHANGE_FORMAT.extension(binary))
}

/// File stem for an object name: path separators and characters most file
/// systems reject become `_`, so the file always lands in its directory.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() { "_".to_string() } else { stem }
}

/// Write a document's encoded body to `w`
pub fn write_body<W: Write>(w: &mut W, doc: &Document, binary: bool) -> Result<()> {
    if binary {
        w.write_all(&doc.to_bytes()?)?;
    } else {
        w.write_all(doc.to_json()?.as_bytes())?;
    }
    Ok(())
}

/// Write a framed emission (three lines) to `w`
pub fn write_framed<W: Write>(
    w: &mut W,
    doc: &Document,
    kind: EmissionKind,
    source: &Path,
) -> Result<()> {
    let body = doc.to_json()?;
    let framed = frame_emission(kind, &source.display().to_string(), &doc.name, &body);
    w.write_all(framed.as_bytes())?;
    Ok(())
}

/// Write `doc` according to `options`.
///
/// Returns the written path, or `None` for framed output sent to stdout.
pub fn write_document(
    doc: &Document,
    kind: EmissionKind,
    input: &Path,
    options: &OutputOptions,
) -> Result<Option<PathBuf>> {
    if options.framed && options.binary {
        bail!("Framed output is JSON only; --framed and --binary cannot be combined");
    }

    if options.framed {
        return match &options.output {
            Some(path) => {
                let mut file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create output: {:?}", path))?;
                write_framed(&mut file, doc, kind, input)?;
                Ok(Some(path.clone()))
            }
            None => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                write_framed(&mut lock, doc, kind, input)?;
                lock.flush()?;
                Ok(None)
            }
        };
    }

    let path = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input, options.binary));
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create output: {:?}", path))?;
    write_body(&mut file, doc, options.binary)?;
    Ok(Some(path))
}
