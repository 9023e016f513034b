pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod layers;
pub mod materials;
pub mod medium;
pub mod state;
pub mod stepper;
pub mod transport;
pub mod world;

pub use config::{EngineConfig, EventMask, TransportConfig};
pub use engine::{ContinuousLossEngine, Event, PropagationEngine, RandomSource, Transition};
pub use error::{ErrorKind, TransportError};
pub use frame::{FlatFrame, VerticalFrame, Wgs84Frame};
pub use layers::LayerStack;
pub use materials::{MaterialDatabase, MaterialId, MaterialLibrary, MaterialProperties};
pub use medium::{Medium, MediumResolver, MediumSource, MediumTable};
pub use state::ParticleState;
pub use stepper::{BoundaryStepper, StepResult};
pub use transport::{NoObserver, Observation, Observer, TransportLoop, TransportOutcome, TransportStatus};
pub use world::LayeredWorld;
