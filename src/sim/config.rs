use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Set of engine events that end a `transport` call.
///
/// Entering void and running out of energy always end a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMask(u8);

impl EventMask {
    pub const NONE: Self = Self(0);
    /// Stop at every change of medium.
    pub const MEDIUM: Self = Self(1);
    /// Stop when the configured distance limit is reached.
    pub const LIMIT_DISTANCE: Self = Self(1 << 1);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for EventMask {
    type Output = Self;
    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Options of the transport loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Maximum number of engine calls per trajectory.
    pub max_iterations: usize,
    /// Seed of the pseudo-random generator.
    pub seed: u64,
}

impl TransportConfig {
    pub fn new() -> Self {
        Self {
            max_iterations: 10_000,
            seed: 1,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Options of the continuous energy-loss engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub events: EventMask,
    /// Distance added to the geometry step bound so that a step ends just
    /// past the boundary (m).
    pub boundary_tolerance: f64,
    /// Maximum number of internal steps within one `transport` call.
    pub max_substeps: usize,
    /// Relative half-width of the uniform energy-loss fluctuation, 0 for none.
    pub straggling: f64,
    /// Total path length after which transport stops (m).
    pub distance_limit: Option<f64>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            events: EventMask::MEDIUM,
            boundary_tolerance: 1e-4,
            max_substeps: 100_000,
            straggling: 0.0,
            distance_limit: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
