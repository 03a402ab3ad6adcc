//! rigport-export - armature and mesh interchange exporter
//!
//! Converts armature and mesh snapshots (JSON) into interchange documents
//! (.rigport.json, .rigport), and extracts framed documents from captured
//! output streams.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// Use modules from library
use rigport_export::formats::OutputOptions;
use rigport_export::{BoneFormat, Conventions, UpAxis, armature, extract, manifest, mesh};

#[derive(Parser)]
#[command(name = "rigport-export")]
#[command(about = "Armature and mesh interchange exporter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Output flags shared by the single-object commands
#[derive(Args)]
struct OutputArgs {
    /// Output file (default: next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the binary container instead of JSON
    #[arg(long)]
    binary: bool,

    /// Wrap the JSON in START/END sentinel lines (stdout unless -o is given)
    #[arg(long)]
    framed: bool,

    /// Convert from Blender's Z-up axes to Y-up
    #[arg(long)]
    y_up: bool,

    /// Encode bone transforms as dual quaternions instead of matrices
    #[arg(long)]
    dual_quat: bool,

    /// Split every face into triangles
    #[arg(long)]
    triangulate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build documents from a manifest file
    Build {
        /// Path to rigport.toml manifest
        #[arg(default_value = "rigport.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to rigport.toml manifest
        #[arg(default_value = "rigport.toml")]
        manifest: PathBuf,
    },

    /// Export an armature snapshot
    Armature {
        /// Input armature snapshot (JSON)
        input: PathBuf,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Export a mesh snapshot
    Mesh {
        /// Input mesh snapshot (JSON)
        input: PathBuf,

        /// Parent armature snapshot, required for skinned meshes
        #[arg(short, long)]
        armature: Option<PathBuf>,

        /// Also include the armature's skeleton and actions
        #[arg(long, requires = "armature")]
        embed_armature: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Extract framed documents from a captured output stream
    Extract {
        /// Captured stream (e.g. host stdout)
        input: PathBuf,

        /// Output directory (default: next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl OutputArgs {
    fn into_options(self, embed_armature: bool) -> OutputOptions {
        OutputOptions {
            output: self.output,
            binary: self.binary,
            framed: self.framed,
            embed_armature,
            conventions: Conventions {
                up_axis: if self.y_up { UpAxis::Y } else { UpAxis::Z },
                bone_format: if self.dual_quat {
                    BoneFormat::DualQuat
                } else {
                    BoneFormat::Matrix
                },
                triangulate: self.triangulate,
            },
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging (stderr, so stdout carries only framed output)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building documents from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            let written = manifest::build_all(&config, output.as_deref())?;
            if verbose {
                for path in &written {
                    tracing::info!("  {:?}", path);
                }
            }
            tracing::info!("Build complete!");
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }

        Commands::Armature { input, out } => {
            let options = out.into_options(false);
            tracing::info!("Converting armature {:?}", input);
            if let Some(path) = armature::convert_armature(&input, &options)? {
                tracing::info!("Wrote {:?}", path);
            }
        }

        Commands::Mesh {
            input,
            armature,
            embed_armature,
            out,
        } => {
            let options = out.into_options(embed_armature);
            tracing::info!("Converting mesh {:?}", input);
            if let Some(path) = mesh::convert_mesh(&input, armature.as_deref(), &options)? {
                tracing::info!("Wrote {:?}", path);
            }
        }

        Commands::Extract { input, output } => {
            let output = output.unwrap_or_else(|| {
                input
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from("."))
            });
            let written = extract::extract_documents(&input, &output)?;
            tracing::info!("Extracted {} documents", written.len());
        }
    }

    Ok(())
}
