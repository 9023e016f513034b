use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::TransportConfig;
use super::engine::{Event, PropagationEngine, RandomSource};
use super::error::{Result, TransportError};
use super::medium::{Medium, MediumSource};
use super::state::ParticleState;

/// State of a trajectory in the transport loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportStatus {
    Running,
    /// The particle left the simulated world.
    StoppedVoid,
    /// The kinetic energy reached zero.
    StoppedEnergy,
    /// Any other terminal engine event.
    StoppedOther(Event),
}

/// Final report of a trajectory.
#[derive(Debug, Clone, Serialize)]
pub struct TransportOutcome {
    pub status: TransportStatus,
    /// Number of engine calls.
    pub iterations: usize,
    pub state: ParticleState,
}

/// A state handed to an [`Observer`].
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    /// 0 for the initial state, then the iteration number.
    pub index: usize,
    pub state: &'a ParticleState,
    /// Medium at the state position, `None` for void.
    pub medium: Option<&'a Medium>,
}

/// Receives every state of a trajectory.
pub trait Observer {
    fn observe(&mut self, observation: &Observation<'_>);
}

impl<F> Observer for F
where
    F: FnMut(&Observation<'_>),
{
    fn observe(&mut self, observation: &Observation<'_>) {
        self(observation)
    }
}

/// Observer that ignores everything.
pub struct NoObserver;

impl Observer for NoObserver {
    fn observe(&mut self, _observation: &Observation<'_>) {}
}

/// Drives an engine until the particle exits, stops, or hits another
/// terminal event.
pub struct TransportLoop {
    config: TransportConfig,
}

impl TransportLoop {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Transports one particle and returns its final state.
    ///
    /// A particle starting in void stops without any engine call.
    pub fn run<E>(
        &self,
        engine: &E,
        source: &dyn MediumSource,
        mut state: ParticleState,
        rng: &mut dyn RandomSource,
        observer: &mut dyn Observer,
    ) -> Result<TransportOutcome>
    where
        E: PropagationEngine + ?Sized,
    {
        let medium = source.resolve(&state).medium;
        observer.observe(&Observation {
            index: 0,
            state: &state,
            medium,
        });

        let mut status = if medium.is_none() {
            TransportStatus::StoppedVoid
        } else if state.energy == 0.0 {
            TransportStatus::StoppedEnergy
        } else {
            TransportStatus::Running
        };
        let mut iterations = 0;

        while status == TransportStatus::Running {
            if iterations == self.config.max_iterations {
                warn!(
                    iterations,
                    energy = state.energy,
                    distance = state.distance,
                    "transport iteration cap reached"
                );
                return Err(TransportError::IterationLimit(iterations));
            }
            iterations += 1;

            let transition = engine.transport(&mut state, source, rng)?;
            debug!(iteration = iterations, event = ?transition.event, energy = state.energy, "engine step");

            observer.observe(&Observation {
                index: iterations,
                state: &state,
                medium: source.resolve(&state).medium,
            });

            status = if state.energy == 0.0 {
                TransportStatus::StoppedEnergy
            } else if transition.media[1].is_none() {
                TransportStatus::StoppedVoid
            } else {
                match transition.event {
                    Event::Medium => TransportStatus::Running,
                    // Includes EnergyExhausted reported with energy left
                    other => TransportStatus::StoppedOther(other),
                }
            };
        }

        info!(
            status = ?status,
            iterations,
            energy = state.energy,
            distance = state.distance,
            "trajectory done"
        );
        Ok(TransportOutcome {
            status,
            iterations,
            state,
        })
    }

    /// Transports independent particles in parallel.
    ///
    /// Trajectory `i` draws from its own generator seeded with
    /// `config.seed + i`, so results do not depend on scheduling.
    pub fn run_batch<E>(
        &self,
        engine: &E,
        source: &dyn MediumSource,
        states: Vec<ParticleState>,
    ) -> Vec<Result<TransportOutcome>>
    where
        E: PropagationEngine + ?Sized,
    {
        let seed = self.config.seed;
        states
            .into_par_iter()
            .enumerate()
            .map(|(i, state)| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                self.run(engine, source, state, &mut rng, &mut NoObserver)
            })
            .collect()
    }
}

impl Default for TransportLoop {
    fn default() -> Self {
        Self::new(TransportConfig::new())
    }
}
