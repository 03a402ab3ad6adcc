//! START/END framing of documents in mixed output streams.
//!
//! Every emission is exactly three lines:
//!
//! ```text
//! START_<KIND>_JSON <path> <name>
//! <single-line JSON body>
//! END_<KIND>_JSON <path> <name>
//! ```
//!
//! Anything outside a frame is treated as noise. Both the path and the name
//! may contain spaces, so the header is only split once the body's `name`
//! field is known.

use std::collections::BTreeMap;

use crate::document::Document;
use crate::error::FramingError;

/// What kind of object a framed body describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmissionKind {
    Armature,
    Mesh,
}

impl EmissionKind {
    pub const ALL: [EmissionKind; 2] = [EmissionKind::Armature, EmissionKind::Mesh];

    pub fn tag(self) -> &'static str {
        match self {
            EmissionKind::Armature => "ARMATURE",
            EmissionKind::Mesh => "MESH",
        }
    }

    pub fn start_sentinel(self) -> String {
        format!("START_{}_JSON", self.tag())
    }

    pub fn end_sentinel(self) -> String {
        format!("END_{}_JSON", self.tag())
    }
}

/// A body located between matching sentinels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub kind: EmissionKind,
    /// 1-based line of the START sentinel
    pub line: usize,
    /// `<path> <name>` as written after the sentinel
    pub header: String,
    pub body: String,
}

impl Emission {
    /// Source path, given the object name carried by the body.
    ///
    /// `None` when the header does not end with ` <name>`.
    pub fn path_for(&self, name: &str) -> Option<&str> {
        self.header.strip_suffix(name)?.strip_suffix(' ')
    }
}

/// Wrap `body` in START/END sentinel lines (trailing newline included)
pub fn frame_emission(kind: EmissionKind, path: &str, name: &str, body: &str) -> String {
    format!(
        "{start} {path} {name}\n{body}\n{end} {path} {name}\n",
        start = kind.start_sentinel(),
        end = kind.end_sentinel(),
    )
}

/// Which sentinel (if any) a line begins with
fn classify(line: &str) -> Option<(EmissionKind, bool, &str)> {
    for kind in EmissionKind::ALL {
        let start = kind.start_sentinel();
        let end = kind.end_sentinel();
        if let Some(rest) = line.strip_prefix(start.as_str()) {
            return Some((kind, true, rest));
        }
        if let Some(rest) = line.strip_prefix(end.as_str()) {
            return Some((kind, false, rest));
        }
    }
    None
}

/// Find every framed body in `stream`.
///
/// Fails when a START line has no body, has no END line directly after its
/// body, or the END line does not repeat the START line's header.
pub fn parse_emissions(stream: &str) -> Result<Vec<Emission>, FramingError> {
    let lines: Vec<&str> = stream.lines().collect();
    let mut emissions = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let line_no = i + 1;

        let Some((kind, true, rest)) = classify(line) else {
            i += 1;
            continue;
        };

        // A header needs at least a path and a name
        let header = match rest.strip_prefix(' ') {
            Some(header) if header.rsplit_once(' ').is_some_and(|(_, name)| !name.is_empty()) => {
                header
            }
            _ => {
                return Err(FramingError::MalformedSentinel {
                    line: line_no,
                    sentinel: line.to_string(),
                });
            }
        };

        let body = match lines.get(i + 1) {
            None => {
                return Err(FramingError::Unterminated {
                    line: line_no,
                    start: line.to_string(),
                });
            }
            Some(body) if body.trim().is_empty() || classify(body).is_some() => {
                return Err(FramingError::MissingBody {
                    line: line_no,
                    start: line.to_string(),
                });
            }
            Some(body) => *body,
        };

        let expected = format!("{} {}", kind.end_sentinel(), header);
        match lines.get(i + 2) {
            None => {
                return Err(FramingError::Unterminated {
                    line: line_no,
                    start: line.to_string(),
                });
            }
            Some(end) if *end == expected => {}
            Some(end) => {
                return Err(FramingError::MismatchedEnd {
                    line: i + 3,
                    expected,
                    found: end.to_string(),
                });
            }
        }

        emissions.push(Emission {
            kind,
            line: line_no,
            header: header.to_string(),
            body: body.to_string(),
        });
        i += 3;
    }

    Ok(emissions)
}

/// Parse every framed document in `stream`, grouped by source path then name.
///
/// Documents are keyed by their own `name`; the header must end with that
/// name, and whatever precedes it is the source path. A later emission with
/// the same path and name replaces an earlier one.
pub fn parse_documents(
    stream: &str,
) -> Result<BTreeMap<String, BTreeMap<String, Document>>, FramingError> {
    let mut documents: BTreeMap<String, BTreeMap<String, Document>> = BTreeMap::new();

    for emission in parse_emissions(stream)? {
        let doc = Document::from_json(&emission.body).map_err(|source| {
            FramingError::InvalidBody {
                line: emission.line,
                header: emission.header.clone(),
                source,
            }
        })?;
        let path = emission
            .path_for(&doc.name)
            .ok_or_else(|| FramingError::NameMismatch {
                line: emission.line,
                header: emission.header.clone(),
                name: doc.name.clone(),
            })?
            .to_string();
        documents
            .entry(path)
            .or_default()
            .insert(doc.name.clone(), doc);
    }

    Ok(documents)
}

/// Merge per-file documents into one name -> document map.
///
/// A name exported from more than one file is an error listing every file.
pub fn flatten_documents(
    by_path: BTreeMap<String, BTreeMap<String, Document>>,
) -> Result<BTreeMap<String, Document>, FramingError> {
    let mut sources: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (path, docs) in &by_path {
        for name in docs.keys() {
            sources.entry(name.clone()).or_default().push(path.clone());
        }
    }

    if let Some((name, paths)) = sources.into_iter().find(|(_, paths)| paths.len() > 1) {
        return Err(FramingError::DuplicateNames { name, paths });
    }

    Ok(by_path.into_values().flatten().collect())
}
