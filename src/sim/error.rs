use thiserror::Error;

/// Broad classification of a [`TransportError`], used at the top-level
/// boundary to pick an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Geometry, material or initial-state problems detected before transport.
    Configuration,
    /// Failures reported while stepping a particle.
    Engine,
}

/// Errors raised while building a layered world or transporting through it.
///
/// None of these are recovered locally: they propagate to the caller, which
/// releases what it owns and terminates.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("layer stack requires at least one elevation")]
    EmptyStack,

    #[error("elevation #{index} is not finite ({value})")]
    InvalidElevation { index: usize, value: f64 },

    #[error("elevations must be strictly increasing: #{index} ({value} m) <= previous ({previous} m)")]
    NonIncreasing {
        index: usize,
        value: f64,
        previous: f64,
    },

    #[error("ceiling {ceiling} m must be above the topmost layer bottom {top} m")]
    InvalidCeiling { ceiling: f64, top: f64 },

    #[error("layer stack has {layers} layers but {media} media were given")]
    MediaCountMismatch { layers: usize, media: usize },

    #[error("unknown material `{0}`")]
    UnknownMaterial(String),

    #[error("invalid material `{name}`: {reason}")]
    InvalidMaterial { name: String, reason: String },

    #[error("direction must be a finite non-zero vector")]
    InvalidDirection,

    #[error("kinetic energy must be finite and non-negative, got {0}")]
    InvalidEnergy(f64),

    #[error("propagation engine: {0}")]
    Engine(String),

    #[error("transport did not terminate after {0} iterations")]
    IterationLimit(usize),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Engine(_) | TransportError::IterationLimit(_) => ErrorKind::Engine,
            _ => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
