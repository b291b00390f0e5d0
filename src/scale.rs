use crate::error::OctreeError;

/// Maps a distance to the largest node diameter that may be treated as
/// a single averaged point at that distance — the acceptance policy
/// driving [`crate::Convolution`].
pub trait ScaleConfig {
    fn find_scale(&self, distance: f64) -> f64;
}

/// `scale = k * distance` (clamped to zero below `distance = 0`).
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "encode", derive(bincode::Encode, bincode::Decode))]
pub struct LinearScale {
    k: f64,
}

impl LinearScale {
    pub fn new(k: f64) -> Result<Self, OctreeError> {
        if k <= 0.0 {
            return Err(OctreeError::InvalidConfig("LinearScale slope k must be positive"));
        }
        Ok(Self { k })
    }
}

impl Default for LinearScale {
    fn default() -> Self {
        Self { k: 0.5 }
    }
}

impl ScaleConfig for LinearScale {
    fn find_scale(&self, distance: f64) -> f64 {
        if distance < 0.0 {
            0.0
        } else {
            distance * self.k
        }
    }
}

/// A piecewise step function keyed by sorted minimum-distance
/// thresholds. Always contains `(0.0, 0.0)`, so an unconfigured
/// instance forces descent at every distance.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "encode", derive(bincode::Encode, bincode::Decode))]
pub struct DiscreteScale {
    entries: Vec<(f64, f64)>,
}

impl DiscreteScale {
    pub fn new() -> Self {
        Self {
            entries: vec![(0.0, 0.0)],
        }
    }

    /// Allow averaging with `averaging_scale` once the query distance
    /// reaches at least `min_distance`. Resorts immediately; cheap
    /// enough since `ScaleConfig` mutation is rare relative to lookups.
    pub fn add_scale(&mut self, min_distance: f64, averaging_scale: f64) {
        self.entries.push((min_distance, averaging_scale));
        self.entries
            .sort_by(|a, b| a.0.partial_cmp(&b.0).expect("min_distance must not be NaN"));
    }
}

impl Default for DiscreteScale {
    fn default() -> Self {
        Self::new()
    }
}

impl ScaleConfig for DiscreteScale {
    fn find_scale(&self, distance: f64) -> f64 {
        let last = self
            .entries
            .last()
            .expect("DiscreteScale always carries at least (0.0, 0.0)");
        if distance >= last.0 {
            return last.1;
        }
        // Largest entry whose min_distance <= distance; entries[0] == (0.0, _)
        // guarantees this is never empty for distance >= 0.
        let idx = self.entries.partition_point(|(min_d, _)| *min_d <= distance);
        self.entries[idx.saturating_sub(1)].1
    }
}
