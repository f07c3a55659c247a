//! Command-line overrides for the flight demo.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Quadsphere demo arguments. Anything given here wins over `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "quadsphere", about = "Fly a viewer over LOD terrain")]
pub struct CliArgs {
    /// Quads per patch edge.
    #[arg(long)]
    pub detail: Option<u32>,

    /// Smallest patch edge length that may still split.
    #[arg(long)]
    pub min_patch_size: Option<f64>,

    /// Split factor `k` in `distance² <= k * size²`.
    #[arg(long)]
    pub split_factor: Option<f64>,

    /// Noise seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Generation worker threads (0 builds on the calling thread).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Build a six-face planet instead of a flat patch.
    #[arg(long)]
    pub planet: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(detail) = args.detail {
            self.terrain.detail = detail;
        }
        if let Some(size) = args.min_patch_size {
            self.terrain.min_patch_size = size;
        }
        if let Some(k) = args.split_factor {
            self.terrain.split_factor = k;
        }
        if let Some(seed) = args.seed {
            self.noise.seed = seed;
        }
        if let Some(workers) = args.workers {
            self.scheduler.worker_threads = Some(workers);
        }
        if let Some(frames) = args.frames {
            self.viewer.frames = frames;
        }
        if args.planet {
            self.planet.enabled = true;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
