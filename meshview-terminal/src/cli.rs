//! Command-line interface
//!
//! ## Commands
//! - `view` - Render a model (or the built-in demo hierarchy) in the terminal
//! - `stats` - Print vertex, face and edge statistics for one or more models

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meshview_core::{
    apply_palette, duplicate_vertices, load_normalized, load_with, stats, DisplayMode,
    LoadOptions, MeshFormat, MeshStats, Palette,
};

use crate::config::ViewerConfig;
use crate::{demo_scene, model_scene, TerminalApp};

/// Terminal viewer and inspector for OBJ, STL and GLB meshes
#[derive(Parser)]
#[command(name = "meshview")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show a model in the terminal
    View {
        /// Model file; the demo hierarchy is shown when omitted
        path: Option<PathBuf>,

        /// Input format (obj, stl, glb); taken from the extension by default
        #[arg(short, long)]
        format: Option<MeshFormat>,

        /// Display mode (faces, edges, vertices, wireframe, all)
        #[arg(short, long, default_value = "all")]
        mode: DisplayMode,

        /// Uniform scale
        #[arg(short, long, default_value_t = 1.0)]
        scale: f32,

        /// Comma-separated band colors, e.g. "#ff1744,#00aaff"
        #[arg(short, long)]
        palette: Option<Palette>,

        /// Draw with the grey luminosity ramp instead of vertex colors
        #[arg(long)]
        no_color: bool,

        /// Target frame rate
        #[arg(long, default_value_t = 30)]
        fps: u32,

        /// Discard GLB node transforms instead of baking them into positions
        #[arg(long)]
        no_bake: bool,
    },

    /// Print model statistics
    Stats {
        /// Model files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::View {
            path,
            format,
            mode,
            scale,
            palette,
            no_color,
            fps,
            no_bake,
        } => {
            let config = ViewerConfig {
                mode,
                palette: palette.unwrap_or_default(),
                color: !no_color,
                fps,
                ..ViewerConfig::default()
            }
            .with_scale(scale);
            let options = LoadOptions {
                bake_node_transforms: !no_bake,
            };

            let (scene, view, radius) = match path {
                Some(path) => {
                    let format = resolve_format(&path, format)?;
                    let bytes = fs::read(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let (mut mesh, bounds) = load_normalized(&bytes, format, &options)
                        .with_context(|| format!("failed to load {}", path.display()))?;
                    apply_palette(&mut mesh, &config.palette);

                    let summary = stats(&mesh);
                    log::info!(
                        "{}: {} vertices, {} faces, {}",
                        path.display(),
                        summary.vertex_count,
                        summary.face_count,
                        summary.format_dimensions()
                    );
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "model".to_string());
                    let (scene, view) = model_scene(mesh, &name);
                    (scene, view, bounds.size().norm() / 2.0)
                }
                None => demo_scene(&config.palette),
            };

            let mut app = TerminalApp::new(scene, view, radius, config)
                .context("failed to set up the terminal")?;
            app.run().context("terminal session failed")?;
        }

        Commands::Stats { paths } => {
            let rows = paths
                .iter()
                .map(|path| stats_row(path))
                .collect::<Result<Vec<_>>>()?;
            write_stats_table(&mut io::stdout().lock(), &rows)?;
        }
    }

    Ok(())
}

fn resolve_format(path: &Path, format: Option<MeshFormat>) -> Result<MeshFormat> {
    match format {
        Some(format) => Ok(format),
        None => MeshFormat::from_path(path)
            .with_context(|| format!("cannot tell the format of {}; pass --format", path.display())),
    }
}

/// One line of the `stats` report
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub name: String,
    pub stats: MeshStats,
    pub duplicates: usize,
}

pub fn stats_row(path: &Path) -> Result<StatsRow> {
    let format = resolve_format(path, None)?;
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mesh = load_with(&bytes, format, &LoadOptions::default())
        .with_context(|| format!("failed to load {}", path.display()))?;

    Ok(StatsRow {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        stats: stats(&mesh),
        duplicates: duplicate_vertices(&mesh),
    })
}

/// Aligned table with a summed total row
pub fn write_stats_table<W: Write>(out: &mut W, rows: &[StatsRow]) -> io::Result<()> {
    writeln!(
        out,
        "{:<24} {:>10} {:>10} {:>10} {:>10}  {}",
        "model", "vertices", "faces", "edges", "duplicates", "dimensions"
    )?;

    let line = |out: &mut W, name: &str, s: &MeshStats, duplicates: usize| {
        writeln!(
            out,
            "{:<24} {:>10} {:>10} {:>10} {:>10}  {}",
            name,
            s.vertex_count,
            s.face_count,
            s.edge_count,
            duplicates,
            s.format_dimensions()
        )
    };
    for row in rows {
        line(out, &row.name, &row.stats, row.duplicates)?;
    }
    if rows.len() > 1 {
        let total: MeshStats = rows.iter().map(|r| r.stats).sum();
        let duplicates = rows.iter().map(|r| r.duplicates).sum();
        line(out, "total", &total, duplicates)?;
    }
    Ok(())
}
