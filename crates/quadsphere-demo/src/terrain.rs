//! Builds the quadtrees described by a [`Config`] and drives them together.

use std::sync::Arc;

use glam::DVec3;
use quadsphere_config::Config;
use quadsphere_lod::{
    CubeFace, FrameStats, HeightField, QuadtreeRoot, RootPatch, SchedulerSettings, TerrainError,
    TerrainSettings,
};
use quadsphere_terrain::{FbmNoise, NoiseParams, PlaneHeightField, SphereHeightField};

use crate::scene::MeshTally;

/// Quadtree settings from the `terrain` and `scheduler` sections.
///
/// With several trees the worker budget is shared between them.
pub fn terrain_settings(config: &Config, tree_count: usize) -> TerrainSettings {
    let tree_count = tree_count.max(1);
    let workers = config
        .scheduler
        .worker_threads
        .unwrap_or_else(|| SchedulerSettings::with_defaults().worker_threads);
    let worker_threads = if workers == 0 {
        0
    } else {
        (workers / tree_count).max(1)
    };
    TerrainSettings {
        detail: config.terrain.detail,
        min_patch_size: config.terrain.min_patch_size,
        split_factor: config.terrain.split_factor,
        collision_patch_size: config.terrain.collision_patch_size,
        scheduler: SchedulerSettings {
            worker_threads,
            max_in_flight: (config.scheduler.max_in_flight / tree_count).max(1),
        },
    }
}

/// Noise parameters from the `noise` section.
pub fn noise_params(config: &Config) -> NoiseParams {
    let noise = &config.noise;
    NoiseParams {
        seed: noise.seed,
        octaves: noise.octaves,
        period: noise.period,
        persistence: noise.persistence,
        lacunarity: noise.lacunarity,
        altitude_base: noise.altitude_base,
        altitude_high: noise.altitude_high,
    }
}

/// One flat quadtree, or six cube-face quadtrees forming a planet.
pub struct Terrain {
    trees: Vec<QuadtreeRoot<MeshTally>>,
}

impl Terrain {
    /// Build the roots. Nothing is generated until the first [`Terrain::frame`].
    pub fn from_config(config: &Config) -> Result<Self, TerrainError> {
        let noise = FbmNoise::new(noise_params(config));
        let trees = if config.planet.enabled {
            let radius = config.planet.radius;
            let height: Arc<dyn HeightField> =
                Arc::new(SphereHeightField::new(noise, DVec3::ZERO, radius));
            let settings = terrain_settings(config, CubeFace::ALL.len());
            CubeFace::ALL
                .into_iter()
                .map(|face| {
                    QuadtreeRoot::new(
                        settings.clone(),
                        RootPatch::cube_face(face, radius),
                        Arc::clone(&height),
                        MeshTally::default(),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let height: Arc<dyn HeightField> = Arc::new(PlaneHeightField::new(noise, DVec3::Y));
            vec![QuadtreeRoot::new(
                terrain_settings(config, 1),
                RootPatch::flat(config.terrain.root_size),
                height,
                MeshTally::default(),
            )?]
        };
        Ok(Self { trees })
    }

    /// Run one frame on every tree and sum their counters.
    pub fn frame(&mut self, viewer: DVec3) -> FrameStats {
        let mut total = FrameStats::default();
        for tree in &mut self.trees {
            let stats = tree.frame(&viewer);
            total.frame = stats.frame;
            total.submitted += stats.submitted;
            total.refused += stats.refused;
            total.completed += stats.completed;
            total.stale += stats.stale;
            total.failed += stats.failed;
            total.collapsed += stats.collapsed;
            total.leaves += stats.leaves;
            total.resident += stats.resident;
            total.in_flight += stats.in_flight;
        }
        total
    }

    /// Forward a floating-origin shift to every tree.
    pub fn rebase(&mut self, offset: DVec3) {
        for tree in &mut self.trees {
            tree.rebase(offset);
        }
    }

    /// Whether every tree has finished converging.
    pub fn is_settled(&self) -> bool {
        self.trees.iter().all(QuadtreeRoot::is_settled)
    }

    /// Number of quadtrees.
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Leaves across all trees.
    pub fn leaf_count(&self) -> usize {
        self.trees.iter().map(|tree| tree.leaves().len()).sum()
    }

    /// Deepest leaf across all trees.
    pub fn max_depth(&self) -> u32 {
        self.trees
            .iter()
            .flat_map(|tree| tree.leaves())
            .map(|leaf| leaf.depth())
            .max()
            .unwrap_or(0)
    }

    /// Leaf count indexed by depth.
    pub fn leaves_per_depth(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_depth() as usize + 1];
        for leaf in self.trees.iter().flat_map(|tree| tree.leaves()) {
            counts[leaf.depth() as usize] += 1;
        }
        counts
    }

    /// Triangles currently shown across all trees.
    pub fn triangle_count(&self) -> usize {
        self.trees
            .iter()
            .map(|tree| tree.scene().triangle_count())
            .sum()
    }

    /// Patches currently shown across all trees.
    pub fn shown_count(&self) -> usize {
        self.trees
            .iter()
            .map(|tree| tree.scene().shown_count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.terrain.detail = 4;
        config.terrain.root_size = 3200.0;
        config.scheduler.worker_threads = Some(0);
        config
    }

    #[test]
    fn test_settings_share_workers_between_trees() {
        let mut config = Config::default();
        config.scheduler.worker_threads = Some(12);
        config.scheduler.max_in_flight = 60;
        let settings = terrain_settings(&config, 6);
        assert_eq!(settings.scheduler.worker_threads, 2);
        assert_eq!(settings.scheduler.max_in_flight, 10);

        config.scheduler.worker_threads = Some(2);
        assert_eq!(terrain_settings(&config, 6).scheduler.worker_threads, 1);

        config.scheduler.worker_threads = Some(0);
        assert_eq!(terrain_settings(&config, 6).scheduler.worker_threads, 0);
    }

    #[test]
    fn test_noise_params_copied() {
        let mut config = Config::default();
        config.noise.seed = 99;
        config.noise.altitude_high = 1234.0;
        let params = noise_params(&config);
        assert_eq!(params.seed, 99);
        assert_eq!(params.altitude_high, 1234.0);
    }

    #[test]
    fn test_flat_terrain_settles_inline() {
        let config = small_config();
        let mut terrain = Terrain::from_config(&config).unwrap();
        assert_eq!(terrain.tree_count(), 1);

        let viewer = DVec3::new(0.0, 600.0, 0.0);
        for _ in 0..32 {
            terrain.frame(viewer);
            if terrain.is_settled() {
                break;
            }
        }
        assert!(terrain.is_settled());
        assert!(terrain.leaf_count() > 1);
        assert_eq!(terrain.shown_count(), terrain.leaf_count());
        assert!(terrain.triangle_count() >= terrain.leaf_count() * 32);

        let per_depth = terrain.leaves_per_depth();
        assert_eq!(per_depth.len(), terrain.max_depth() as usize + 1);
        assert_eq!(per_depth.iter().sum::<usize>(), terrain.leaf_count());
    }

    #[test]
    fn test_planet_has_six_trees() {
        let mut config = small_config();
        config.planet.enabled = true;
        config.planet.radius = 1600.0;
        let mut terrain = Terrain::from_config(&config).unwrap();
        assert_eq!(terrain.tree_count(), 6);

        // Results are installed on the frame after they are submitted.
        let viewer = DVec3::new(0.0, 2200.0, 0.0);
        let completed: usize = (0..3).map(|_| terrain.frame(viewer).completed).sum();
        assert!(completed >= 6);
        assert!(terrain.shown_count() >= 6);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = small_config();
        config.terrain.split_factor = 0.0;
        assert!(Terrain::from_config(&config).is_err());
    }
}
