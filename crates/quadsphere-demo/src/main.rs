//! Flies a scripted viewer over procedural terrain and reports how the
//! quadtree refines around it.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p quadsphere-demo -- --frames 300` for a flat patch,
//! or add `--planet` for a six-face sphere.

mod scene;
mod terrain;

use std::time::Instant;

use clap::Parser;
use glam::DVec3;
use quadsphere_config::{CliArgs, Config, default_config_dir};
use quadsphere_lod::FloatingOrigin;
use tracing::{debug, error, info, warn};

use crate::terrain::Terrain;

/// Extra frames allowed after the flight for pending generations to land.
const SETTLE_FRAMES: u32 = 600;

fn main() {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map_or_else(default_config_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    quadsphere_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = config.validate() {
        error!(%e, "Refusing to start");
        std::process::exit(2);
    }

    let mut terrain = match Terrain::from_config(&config) {
        Ok(terrain) => terrain,
        Err(e) => {
            error!(%e, "Failed to build terrain");
            std::process::exit(1);
        }
    };
    info!(
        trees = terrain.tree_count(),
        planet = config.planet.enabled,
        detail = config.terrain.detail,
        "Terrain ready"
    );

    fly(&config, &mut terrain);
}

fn fly(config: &Config, terrain: &mut Terrain) {
    let mut origin = FloatingOrigin::new(config.origin.rebase_threshold);
    let mut viewer = DVec3::from_array(config.viewer.start);
    if config.planet.enabled {
        viewer += DVec3::Y * config.planet.radius;
    }
    let step = DVec3::from_array(config.viewer.velocity) * config.viewer.frame_dt;

    let started = Instant::now();
    let mut completed = 0usize;
    let mut failed = 0usize;
    for _ in 0..config.viewer.frames {
        viewer += step;
        if let Some(offset) = origin.update(viewer) {
            viewer -= offset;
            terrain.rebase(offset);
            info!(
                x = origin.origin.x,
                y = origin.origin.y,
                z = origin.origin.z,
                "Floating origin moved"
            );
        }

        let stats = terrain.frame(viewer);
        completed += stats.completed;
        failed += stats.failed;
        debug!(
            frame = stats.frame,
            submitted = stats.submitted,
            refused = stats.refused,
            completed = stats.completed,
            stale = stats.stale,
            collapsed = stats.collapsed,
            leaves = stats.leaves,
            in_flight = stats.in_flight,
            "Frame"
        );
    }

    let mut extra = 0;
    while !terrain.is_settled() && extra < SETTLE_FRAMES {
        let stats = terrain.frame(viewer);
        completed += stats.completed;
        failed += stats.failed;
        extra += 1;
        if stats.in_flight > 0 {
            std::thread::yield_now();
        }
    }
    if !terrain.is_settled() {
        warn!(extra, "Terrain still refining after settle frames");
    }

    let world = origin.to_world(viewer);
    info!(
        frames = config.viewer.frames + extra,
        elapsed_ms = started.elapsed().as_millis() as u64,
        completed,
        failed,
        leaves = terrain.leaf_count(),
        max_depth = terrain.max_depth(),
        per_depth = ?terrain.leaves_per_depth(),
        patches = terrain.shown_count(),
        triangles = terrain.triangle_count(),
        viewer_x = world.x,
        viewer_y = world.y,
        viewer_z = world.z,
        "Flight finished"
    );
}
