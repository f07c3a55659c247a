//! Error types for quadtree construction and patch generation.

/// Invalid terrain configuration, reported when a [`crate::QuadtreeRoot`] is built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    /// Grid resolution must be between one quad per patch edge and [`crate::MAX_DETAIL`].
    #[error("detail must be between 1 and {max}, got {0}", max = crate::MAX_DETAIL)]
    InvalidDetail(u32),

    /// The size below which patches stop subdividing must be positive.
    #[error("min_patch_size must be positive and finite, got {0}")]
    InvalidMinPatchSize(f64),

    /// The split-distance constant must be positive.
    #[error("split_factor must be positive and finite, got {0}")]
    InvalidSplitFactor(f64),

    /// The root patch must have a positive edge length.
    #[error("root patch size must be positive and finite, got {0}")]
    InvalidRootSize(f64),

    /// The patch basis is not a right-handed orthonormal frame.
    #[error("patch basis must be orthonormal with right x forward = up")]
    InvalidBasis,
}

/// Failure while building a single patch mesh.
///
/// These never escape the quadtree: the affected node keeps its previous
/// state and is resubmitted on a later frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    /// The height field returned NaN or infinity for a grid vertex.
    #[error("height field produced a non-finite position for vertex {index}")]
    NonFinitePosition {
        /// Grid vertex index (`v * (detail + 1) + u`).
        index: usize,
    },

    /// The request asks for more quads than `u32` indices can address.
    #[error("detail {0} exceeds the maximum of {max}", max = crate::MAX_DETAIL)]
    DetailTooLarge(u32),

    /// The height field panicked on a worker thread.
    #[error("height field panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_value() {
        assert_eq!(
            TerrainError::InvalidDetail(0).to_string(),
            "detail must be between 1 and 4096, got 0"
        );
        assert!(TerrainError::InvalidMinPatchSize(-1.0)
            .to_string()
            .contains("-1"));
        assert!(GenerationError::NonFinitePosition { index: 7 }
            .to_string()
            .contains("vertex 7"));
    }
}
