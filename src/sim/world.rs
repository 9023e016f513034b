//! Layered world: a boundary stepper and the media filling its layers.
//!
//! The world owns both halves so that the resolver handed to the transport
//! loop can borrow them for the duration of a run:
//! - `world.resolver()` implements [`MediumSource`](super::medium::MediumSource)
//! - `world.stepper().position(...)` places a particle in the world frame

use serde::Serialize;

use super::error::{Result, TransportError};
use super::frame::{VerticalFrame, Wgs84Frame};
use super::layers::LayerStack;
use super::materials::MaterialDatabase;
use super::medium::{Medium, MediumResolver, MediumTable};
use super::stepper::BoundaryStepper;

#[derive(Debug, Clone)]
pub struct LayeredWorld<F: VerticalFrame = Wgs84Frame> {
    stepper: BoundaryStepper<F>,
    media: MediumTable,
}

impl<F: VerticalFrame> LayeredWorld<F> {
    pub fn new(stack: LayerStack, frame: F, media: MediumTable) -> Result<Self> {
        if media.len() != stack.len() {
            return Err(TransportError::MediaCountMismatch {
                layers: stack.len(),
                media: media.len(),
            });
        }
        Ok(Self {
            stepper: BoundaryStepper::new(stack, frame),
            media,
        })
    }

    /// Builds the world from one material name per layer, bottom first.
    pub fn build(
        stack: LayerStack,
        frame: F,
        materials: &[&str],
        database: &dyn MaterialDatabase,
    ) -> Result<Self> {
        let media = MediumTable::build(&stack, materials, database)?;
        Self::new(stack, frame, media)
    }

    pub fn stepper(&self) -> &BoundaryStepper<F> {
        &self.stepper
    }

    pub fn media(&self) -> &MediumTable {
        &self.media
    }

    pub fn resolver(&self) -> MediumResolver<'_, F> {
        MediumResolver::new(&self.stepper, &self.media)
    }

    /// Medium at an altitude, `None` for void.
    pub fn medium_at_altitude(&self, altitude: f64) -> Option<&Medium> {
        self.media.medium_at(self.stepper.stack().layer_at(altitude))
    }

    /// Serializable description of the layers and their media.
    pub fn summary(&self) -> WorldSummary<'_> {
        WorldSummary {
            stack: self.stepper.stack(),
            media: &self.media,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorldSummary<'a> {
    pub stack: &'a LayerStack,
    pub media: &'a MediumTable,
}
