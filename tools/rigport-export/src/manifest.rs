//! Manifest parsing and build orchestration
//!
//! Parses rigport.toml and converts every armature and mesh it lists.

use anyhow::{Context, Result, bail};
use hashbrown::HashMap;
use rayon::prelude::*;
use rigport_shared::{EmissionKind, INTERCHANGE_FORMAT};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::armature::convert_armature_to_memory;
use crate::conventions::{BoneFormat, Conventions, UpAxis, apply_conventions};
use crate::document::DocumentBuilder;
use crate::formats::{OutputOptions, file_stem, write_document};
use crate::mesh::convert_mesh_to_memory;
use crate::skeleton::Skeleton;
use crate::snapshot::{load_armature, load_mesh};

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub armatures: BTreeMap<String, ArmatureEntry>,
    #[serde(default)]
    pub meshes: BTreeMap<String, MeshEntry>,
    /// Directory relative source paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub framed: bool,
    /// `"z"` keeps Blender's axes, `"y"` converts to Y-up
    #[serde(default)]
    pub up_axis: UpAxis,
    /// `"matrix"` or `"dual_quat"`
    #[serde(default)]
    pub bone_format: BoneFormat,
    #[serde(default)]
    pub triangulate: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            binary: false,
            framed: false,
            up_axis: UpAxis::default(),
            bone_format: BoneFormat::default(),
            triangulate: false,
        }
    }
}

impl OutputConfig {
    pub fn conventions(&self) -> Conventions {
        Conventions {
            up_axis: self.up_axis,
            bone_format: self.bone_format,
            triangulate: self.triangulate,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exported/")
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ArmatureEntry {
    Simple(PathBuf),
    Detailed { path: PathBuf },
}

impl ArmatureEntry {
    pub fn path(&self) -> &Path {
        match self {
            ArmatureEntry::Simple(p) => p,
            ArmatureEntry::Detailed { path } => path,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MeshEntry {
    Simple(PathBuf),
    Detailed {
        path: PathBuf,
        /// Key of an `[armatures]` entry
        #[serde(default)]
        armature: Option<String>,
    },
}

impl MeshEntry {
    pub fn path(&self) -> &Path {
        match self {
            MeshEntry::Simple(p) => p,
            MeshEntry::Detailed { path, .. } => path,
        }
    }

    pub fn armature(&self) -> Option<&str> {
        match self {
            MeshEntry::Simple(_) => None,
            MeshEntry::Detailed { armature, .. } => armature.as_deref(),
        }
    }
}

impl Manifest {
    /// Source path resolved against the manifest directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let mut manifest: Manifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    manifest.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(manifest)
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest) -> Result<()> {
    if manifest.output.framed && manifest.output.binary {
        bail!("[output] framed and binary cannot both be enabled");
    }

    // Check that all source files exist
    for (name, entry) in &manifest.armatures {
        let path = manifest.resolve(entry.path());
        if !path.exists() {
            bail!("Armature '{}' source not found: {:?}", name, path);
        }
    }
    for (name, entry) in &manifest.meshes {
        let path = manifest.resolve(entry.path());
        if !path.exists() {
            bail!("Mesh '{}' source not found: {:?}", name, path);
        }
        if let Some(armature) = entry.armature() {
            if !manifest.armatures.contains_key(armature) {
                bail!("Mesh '{}' references unknown armature '{}'", name, armature);
            }
        }
    }
    Ok(())
}

fn output_options(manifest: &Manifest, output_dir: &Path, name: &str) -> OutputOptions {
    let ext = INTERCHANGE_FORMAT.extension(manifest.output.binary);
    OutputOptions {
        output: Some(output_dir.join(format!("{}.{}", file_stem(name), ext))),
        binary: manifest.output.binary,
        framed: manifest.output.framed,
        embed_armature: false,
        conventions: manifest.output.conventions(),
    }
}

/// Build everything a manifest lists.
///
/// Armatures are converted first so that meshes can be skinned against them.
/// Returns the written paths, armatures first, each group in name order.
pub fn build_all(manifest: &Manifest, output_override: Option<&Path>) -> Result<Vec<PathBuf>> {
    validate(manifest)?;

    let output_dir = output_override.unwrap_or(&manifest.output.dir);
    let output_dir = manifest.resolve(output_dir);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    // Convert armatures in parallel
    let armatures: Result<Vec<_>> = manifest
        .armatures
        .par_iter()
        .map(|(name, entry)| -> Result<(String, Skeleton, Option<PathBuf>)> {
            let input = manifest.resolve(entry.path());
            let snapshot = load_armature(&input)?;
            let mut converted = convert_armature_to_memory(&snapshot)
                .with_context(|| format!("Failed to convert armature '{}'", name))?;
            let options = output_options(manifest, &output_dir, name);
            apply_conventions(&mut converted.document, &options.conventions);
            let written =
                write_document(&converted.document, EmissionKind::Armature, &input, &options)?;
            tracing::info!(
                "Converted armature: {} ({} bones, {} actions)",
                name,
                converted.document.bone_count(),
                converted.document.bone_space_actions.len()
            );
            Ok((name.clone(), converted.skeleton, written))
        })
        .collect();

    let mut written = Vec::new();
    let mut skeletons: HashMap<String, Skeleton> = HashMap::new();
    for (name, skeleton, path) in armatures? {
        written.extend(path);
        skeletons.insert(name, skeleton);
    }

    // Convert meshes in parallel
    let meshes: Result<Vec<_>> = manifest
        .meshes
        .par_iter()
        .map(|(name, entry)| -> Result<Option<PathBuf>> {
            let input = manifest.resolve(entry.path());
            let snapshot = load_mesh(&input)?;

            // Explicit manifest reference first, then the snapshot's parent by name
            let skeleton = match entry.armature() {
                Some(key) => skeletons.get(key),
                None => snapshot
                    .armature_name
                    .as_deref()
                    .and_then(|parent| skeletons.values().find(|s| s.name() == parent)),
            };

            let packed = convert_mesh_to_memory(&snapshot, skeleton)
                .with_context(|| format!("Failed to convert mesh '{}'", name))?;
            let mut document = DocumentBuilder::new(&packed.name).mesh(packed).build();
            let options = output_options(manifest, &output_dir, name);
            apply_conventions(&mut document, &options.conventions);
            let path = write_document(&document, EmissionKind::Mesh, &input, &options)?;
            tracing::info!("Converted mesh: {}", name);
            Ok(path)
        })
        .collect();

    written.extend(meshes?.into_iter().flatten());

    tracing::info!("Build complete: {} documents", written.len());
    Ok(written)
}
