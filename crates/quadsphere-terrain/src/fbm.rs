//! Multi-octave fractal Brownian motion (fBm) over simplex noise.
//!
//! Composites octaves of 3D simplex noise, each at `lacunarity` times the
//! frequency and `persistence` times the amplitude of the previous one, and
//! normalises the result into `[0, 1]`.

use glam::DVec3;
use noise::{NoiseFn, Simplex};

/// Noise and altitude parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseParams {
    /// Seed for deterministic generation.
    pub seed: u32,
    /// Number of octaves to composite.
    pub octaves: u32,
    /// Wavelength of the first octave in world units.
    pub period: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Altitude where the noise is 0.
    pub altitude_base: f64,
    /// Altitude where the noise is 1.
    pub altitude_high: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 9,
            period: 2000.0,
            persistence: 0.5,
            lacunarity: 2.0,
            altitude_base: 0.0,
            altitude_high: 500.0,
        }
    }
}

impl NoiseParams {
    /// Map a normalised noise value to an altitude.
    #[inline]
    pub fn altitude(&self, n: f64) -> f64 {
        self.altitude_base + n * (self.altitude_high - self.altitude_base)
    }
}

/// Deterministic fBm sampler. Stateless after construction, so it can be
/// shared across generation workers.
pub struct FbmNoise {
    noise: Simplex,
    params: NoiseParams,
    amplitude_sum: f64,
}

impl FbmNoise {
    /// Create a sampler with the given parameters.
    pub fn new(params: NoiseParams) -> Self {
        let mut amplitude_sum = 0.0;
        let mut amplitude = 1.0;
        for _ in 0..params.octaves.max(1) {
            amplitude_sum += amplitude;
            amplitude *= params.persistence;
        }
        Self {
            noise: Simplex::new(params.seed),
            params,
            amplitude_sum,
        }
    }

    /// Raw fBm in roughly `[-1, 1]`.
    pub fn sample_signed(&self, point: DVec3) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0 / self.params.period;
        let mut amplitude = 1.0;

        for _ in 0..self.params.octaves.max(1) {
            let p = point * frequency;
            total += self.noise.get([p.x, p.y, p.z]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        total / self.amplitude_sum
    }

    /// fBm remapped into `[0, 1]`.
    pub fn sample(&self, point: DVec3) -> f64 {
        (self.sample_signed(point) * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    /// Altitude at `point`, between `altitude_base` and `altitude_high`.
    pub fn altitude(&self, point: DVec3) -> f64 {
        self.params.altitude(self.sample(point))
    }

    /// The parameters this sampler was built with.
    pub fn params(&self) -> &NoiseParams {
        &self.params
    }
}
