use serde::{Deserialize, Serialize};

use crate::{Point, Vector};

use super::error::{Result, TransportError};

/// Monte Carlo state of a transported particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleState {
    /// Position (ECEF metres for Earth geometries).
    pub position: Point,
    /// Unit direction of motion.
    pub direction: Vector,
    /// Kinetic energy in GeV.
    pub energy: f64,
    /// Statistical weight.
    pub weight: f64,
    /// Electric charge in units of the elementary charge.
    pub charge: f64,
    /// Total distance travelled in metres.
    pub distance: f64,
}

impl ParticleState {
    /// Creates a unit-weight negative muon state.
    ///
    /// The direction is normalized; zero or non-finite directions and
    /// negative or non-finite energies are rejected.
    pub fn new(position: Point, direction: Vector, energy: f64) -> Result<Self> {
        let direction = direction.normalize().ok_or(TransportError::InvalidDirection)?;
        if !energy.is_finite() || energy < 0.0 {
            return Err(TransportError::InvalidEnergy(energy));
        }
        Ok(Self {
            position,
            direction,
            energy,
            weight: 1.0,
            charge: -1.0,
            distance: 0.0,
        })
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Moves the particle in a straight line.
    pub fn advance(&mut self, length: f64) {
        self.position = self.position + self.direction * length;
        self.distance += length;
    }
}
