//! [`HeightField`] implementations backed by [`FbmNoise`].

use glam::DVec3;
use quadsphere_lod::HeightField;

use crate::fbm::FbmNoise;

/// Displaces a plane along its normal.
pub struct PlaneHeightField {
    noise: FbmNoise,
    up: DVec3,
}

impl PlaneHeightField {
    /// Displace along `up` (normalised here).
    pub fn new(noise: FbmNoise, up: DVec3) -> Self {
        Self {
            noise,
            up: up.normalize_or(DVec3::Y),
        }
    }

    /// The noise sampler.
    pub fn noise(&self) -> &FbmNoise {
        &self.noise
    }
}

impl HeightField for PlaneHeightField {
    fn evaluate(&self, position: DVec3) -> DVec3 {
        position + self.up * self.noise.altitude(position)
    }
}

/// Projects cube-face points onto a sphere and lifts them by the noise altitude.
pub struct SphereHeightField {
    noise: FbmNoise,
    center: DVec3,
    radius: f64,
}

impl SphereHeightField {
    /// A planet of `radius` around `center`.
    pub fn new(noise: FbmNoise, center: DVec3, radius: f64) -> Self {
        Self {
            noise,
            center,
            radius,
        }
    }

    /// Planet radius at altitude 0.
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl HeightField for SphereHeightField {
    fn evaluate(&self, position: DVec3) -> DVec3 {
        let dir = (position - self.center).normalize_or(DVec3::Y);
        // Noise is sampled on the zero-altitude sphere.
        let surface = dir * self.radius;
        self.center + dir * (self.radius + self.noise.altitude(surface))
    }
}
