//! Per-session terrain settings.

use crate::error::TerrainError;

/// Largest accepted `detail`. A patch has `(detail + 1)²` surface vertices
/// plus skirts, and all of them are indexed with `u32`.
pub const MAX_DETAIL: u32 = 4096;

/// Worker pool sizing for patch generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerSettings {
    /// Number of worker threads. `0` builds every patch inline on the
    /// traversal thread (deterministic, used by tests and tools).
    pub worker_threads: usize,
    /// Maximum number of generations queued or running at once.
    pub max_in_flight: usize,
}

impl SchedulerSettings {
    /// Leave two cores for the main and render threads.
    pub fn with_defaults() -> Self {
        let cpus = num_cpus::get().max(2);
        Self {
            worker_threads: (cpus - 2).max(1),
            max_in_flight: 64,
        }
    }

    /// Inline generation with an effectively unbounded budget.
    pub fn inline() -> Self {
        Self {
            worker_threads: 0,
            max_in_flight: usize::MAX,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Immutable settings shared by every node of one quadtree.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainSettings {
    /// Quads per patch edge.
    pub detail: u32,
    /// Patches at or below this edge length never subdivide.
    pub min_patch_size: f64,
    /// A node splits while `distance² <= split_factor * size²`.
    ///
    /// The default of 8 puts the split distance at two patch hypotenuses
    /// (`(2·√2·size)²`), far enough that edge-adjacent leaves never differ by
    /// more than one level.
    pub split_factor: f64,
    /// Patches at or below this size also get a skirt-free collision index list.
    pub collision_patch_size: f64,
    /// Generation worker pool.
    pub scheduler: SchedulerSettings,
}

impl TerrainSettings {
    /// Check the configuration surface. Called by [`crate::QuadtreeRoot::new`].
    pub fn validate(&self) -> Result<(), TerrainError> {
        if !(1..=MAX_DETAIL).contains(&self.detail) {
            return Err(TerrainError::InvalidDetail(self.detail));
        }
        if !(self.min_patch_size > 0.0 && self.min_patch_size.is_finite()) {
            return Err(TerrainError::InvalidMinPatchSize(self.min_patch_size));
        }
        if !(self.split_factor > 0.0 && self.split_factor.is_finite()) {
            return Err(TerrainError::InvalidSplitFactor(self.split_factor));
        }
        Ok(())
    }

    /// Squared split distance for a patch of the given edge length.
    #[inline]
    pub fn split_distance_sq(&self, size: f64) -> f64 {
        self.split_factor * size * size
    }
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            detail: 16,
            min_patch_size: 200.0,
            split_factor: 8.0,
            collision_patch_size: 200.0,
            scheduler: SchedulerSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(TerrainSettings::default().validate().is_ok());
    }

    #[test]
    fn test_zero_detail_rejected() {
        let settings = TerrainSettings {
            detail: 0,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(TerrainError::InvalidDetail(0)));
    }

    #[test]
    fn test_detail_beyond_u32_indexing_rejected() {
        let settings = TerrainSettings {
            detail: 65_535,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(TerrainError::InvalidDetail(65_535)));

        let largest = TerrainSettings {
            detail: MAX_DETAIL,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
        let rows = u64::from(MAX_DETAIL) + 1;
        assert!(rows * rows + 8 * u64::from(MAX_DETAIL) < u64::from(u32::MAX));
    }

    #[test]
    fn test_non_positive_min_patch_size_rejected() {
        for bad in [0.0, -5.0, f64::NAN] {
            let settings = TerrainSettings {
                min_patch_size: bad,
                ..Default::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(TerrainError::InvalidMinPatchSize(_))
            ));
        }
    }

    #[test]
    fn test_non_positive_split_factor_rejected() {
        let settings = TerrainSettings {
            split_factor: 0.0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(TerrainError::InvalidSplitFactor(0.0))
        );
    }

    #[test]
    fn test_default_split_distance_is_two_hypotenuses() {
        let settings = TerrainSettings::default();
        let size = 100.0;
        let hypotenuse = size * std::f64::consts::SQRT_2;
        let expected = (2.0 * hypotenuse) * (2.0 * hypotenuse);
        assert!((settings.split_distance_sq(size) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_default_scheduler_has_at_least_one_worker() {
        assert!(SchedulerSettings::with_defaults().worker_threads >= 1);
        assert_eq!(SchedulerSettings::inline().worker_threads, 0);
    }
}
