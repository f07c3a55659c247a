//! Height fields for the terrain quadtree: fractal simplex noise displacing a
//! flat plane or the surface of a sphere.

mod fbm;
mod height_field;

pub use fbm::{FbmNoise, NoiseParams};
pub use height_field::{PlaneHeightField, SphereHeightField};
