//! Propagation engines.
//!
//! An engine advances a [`ParticleState`] through the media returned by a
//! [`MediumSource`], one `transport` call at a time, and reports why it
//! stopped. [`ContinuousLossEngine`] is a straight-line continuous
//! slowing-down model: no interactions are sampled and charged particles are
//! not deflected by the medium magnetic field.

use serde::Serialize;
use tracing::debug;

use super::config::{EngineConfig, EventMask};
use super::error::{Result, TransportError};
use super::materials::MaterialLibrary;
use super::medium::{Medium, MediumSource, same_medium};
use super::state::ParticleState;

/// Why a `transport` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Event {
    /// The particle changed medium (possibly into void).
    Medium,
    /// The kinetic energy reached zero.
    EnergyExhausted,
    /// The distance limit was reached.
    DistanceLimit,
}

/// Result of one `transport` call.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub event: Event,
    /// Media before and after the last step.
    pub media: [Option<&'a Medium>; 2],
}

/// Uniform pseudo-random numbers over `[0, 1)`.
pub trait RandomSource {
    fn uniform01(&mut self) -> f64;
}

impl<R: rand::Rng + ?Sized> RandomSource for R {
    fn uniform01(&mut self) -> f64 {
        self.r#gen::<f64>()
    }
}

/// Advances a particle state until an event occurs.
pub trait PropagationEngine: Sync {
    fn transport<'a>(
        &self,
        state: &mut ParticleState,
        source: &'a dyn MediumSource,
        rng: &mut dyn RandomSource,
    ) -> Result<Transition<'a>>;
}

/// Continuous slowing down with `-dE/dX = a + b E` along straight lines.
pub struct ContinuousLossEngine<'p> {
    physics: &'p MaterialLibrary,
    config: EngineConfig,
}

/// Loss coefficients per unit length (`a * rho` in GeV/m, `b * rho` in 1/m).
#[derive(Debug, Clone, Copy)]
struct LinearLoss {
    a: f64,
    b: f64,
}

impl LinearLoss {
    /// Energy after travelling `length`.
    fn energy_after(&self, energy: f64, length: f64) -> f64 {
        let e = if self.b > 0.0 {
            let e0 = self.a / self.b;
            (energy + e0) * (-self.b * length).exp() - e0
        } else {
            energy - self.a * length
        };
        e.max(0.0)
    }

    /// Path length until the energy reaches zero.
    fn range(&self, energy: f64) -> f64 {
        if self.a <= 0.0 {
            f64::INFINITY
        } else if self.b > 0.0 {
            (self.b * energy / self.a).ln_1p() / self.b
        } else {
            energy / self.a
        }
    }
}

impl<'p> ContinuousLossEngine<'p> {
    pub fn new(physics: &'p MaterialLibrary, config: EngineConfig) -> Self {
        Self { physics, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn loss(&self, medium: &Medium, rng: &mut dyn RandomSource) -> Result<LinearLoss> {
        let material = self.physics.get(medium.material).ok_or_else(|| {
            TransportError::Engine(format!("unknown material id {}", medium.material.0))
        })?;
        let mut density = medium.density.unwrap_or(material.density);
        if self.config.straggling > 0.0 {
            density *= 1.0 + self.config.straggling * (2.0 * rng.uniform01() - 1.0);
        }
        Ok(LinearLoss {
            a: material.ionisation_loss * density,
            b: material.radiative_loss * density,
        })
    }

    /// Remaining path length before the distance limit, if one applies.
    fn remaining_distance(&self, state: &ParticleState) -> Option<f64> {
        if !self.config.events.contains(EventMask::LIMIT_DISTANCE) {
            return None;
        }
        self.config
            .distance_limit
            .map(|limit| (limit - state.distance).max(0.0))
    }
}

impl PropagationEngine for ContinuousLossEngine<'_> {
    fn transport<'a>(
        &self,
        state: &mut ParticleState,
        source: &'a dyn MediumSource,
        rng: &mut dyn RandomSource,
    ) -> Result<Transition<'a>> {
        let start = source.resolve(state);
        let Some(mut medium) = start.medium else {
            // Nothing to propagate through
            return Ok(Transition {
                event: Event::Medium,
                media: [None, None],
            });
        };
        let mut bound = start.step;

        for _ in 0..self.config.max_substeps {
            if state.energy <= 0.0 {
                state.energy = 0.0;
                return Ok(Transition {
                    event: Event::EnergyExhausted,
                    media: [Some(medium), Some(medium)],
                });
            }

            let mut length = bound + self.config.boundary_tolerance;
            let remaining = self.remaining_distance(state);
            if let Some(remaining) = remaining {
                if remaining <= 0.0 {
                    return Ok(Transition {
                        event: Event::DistanceLimit,
                        media: [Some(medium), Some(medium)],
                    });
                }
                length = length.min(remaining);
            }

            let loss = self.loss(medium, rng)?;
            let range = loss.range(state.energy);
            if range.is_finite() && range <= length {
                state.advance(range);
                state.energy = 0.0;
                let after = source.resolve(state).medium;
                debug!(distance = state.distance, "energy exhausted");
                return Ok(Transition {
                    event: Event::EnergyExhausted,
                    media: [Some(medium), after],
                });
            }
            if !length.is_finite() {
                return Err(TransportError::Engine(
                    "unbounded step: no boundary ahead and no energy loss".to_string(),
                ));
            }

            state.energy = loss.energy_after(state.energy, length);
            state.advance(length);

            if remaining.is_some_and(|r| length >= r) {
                let after = source.resolve(state).medium;
                return Ok(Transition {
                    event: Event::DistanceLimit,
                    media: [Some(medium), after],
                });
            }

            let next = source.resolve(state);
            if !same_medium(next.medium, Some(medium)) {
                match next.medium {
                    Some(m) if !self.config.events.contains(EventMask::MEDIUM) => medium = m,
                    after => {
                        debug!(
                            distance = state.distance,
                            energy = state.energy,
                            void = after.is_none(),
                            "medium change"
                        );
                        return Ok(Transition {
                            event: Event::Medium,
                            media: [Some(medium), after],
                        });
                    }
                }
            }
            bound = next.step;
        }

        Err(TransportError::Engine(format!(
            "no event after {} sub-steps",
            self.config.max_substeps
        )))
    }
}
