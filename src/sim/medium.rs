use serde::Serialize;

use crate::Vector;

use super::error::{Result, TransportError};
use super::frame::VerticalFrame;
use super::layers::LayerStack;
use super::materials::{MaterialDatabase, MaterialId};
use super::state::ParticleState;
use super::stepper::BoundaryStepper;

/// Propagation medium filling one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Medium {
    pub material: MaterialId,
    /// Uniform density override in kg/m^3. The material default applies when unset.
    pub density: Option<f64>,
    /// Uniform magnetic field in tesla. No field when unset.
    pub magnetic_field: Option<Vector>,
}

impl Medium {
    pub fn new(material: MaterialId) -> Self {
        Self {
            material,
            density: None,
            magnetic_field: None,
        }
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = Some(density);
        self
    }

    pub fn with_magnetic_field(mut self, field: Vector) -> Self {
        self.magnetic_field = Some(field);
        self
    }
}

/// One medium per layer, indexed by layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediumTable {
    media: Vec<Medium>,
}

impl MediumTable {
    /// Builds the table by resolving one material name per layer.
    pub fn build(
        stack: &LayerStack,
        materials: &[&str],
        database: &dyn MaterialDatabase,
    ) -> Result<Self> {
        let media = materials
            .iter()
            .map(|name| database.material_index(name).map(Medium::new))
            .collect::<Result<Vec<_>>>()?;
        Self::from_media(stack, media)
    }

    /// Wraps explicit media, one per layer.
    pub fn from_media(stack: &LayerStack, media: Vec<Medium>) -> Result<Self> {
        if media.len() != stack.len() {
            return Err(TransportError::MediaCountMismatch {
                layers: stack.len(),
                media: media.len(),
            });
        }
        if let Some(m) = media
            .iter()
            .find(|m| m.density.is_some_and(|d| !d.is_finite() || d <= 0.0))
        {
            return Err(TransportError::InvalidMaterial {
                name: format!("#{}", m.material.0),
                reason: "density override must be finite and positive".to_string(),
            });
        }
        Ok(Self { media })
    }

    /// Medium of a layer; `None` (void) outside `[0, len)`.
    pub fn medium_at(&self, layer: Option<usize>) -> Option<&Medium> {
        layer.and_then(|i| self.media.get(i))
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Medium> {
        self.media.iter()
    }
}

/// Medium at a particle position and the step over which it stays valid.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    /// `None` when the particle is outside the simulated world.
    pub medium: Option<&'a Medium>,
    /// Upper bound for the next propagation step.
    pub step: f64,
}

/// Per-step medium query handed to a propagation engine.
pub trait MediumSource: Sync {
    fn resolve(&self, state: &ParticleState) -> Resolution<'_>;
}

/// Identity comparison of resolved media (same table entry).
pub fn same_medium(a: Option<&Medium>, b: Option<&Medium>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::ptr::eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Resolves media by stepping through the layer stack.
pub struct MediumResolver<'a, F: VerticalFrame> {
    stepper: &'a BoundaryStepper<F>,
    table: &'a MediumTable,
}

impl<'a, F: VerticalFrame> MediumResolver<'a, F> {
    pub fn new(stepper: &'a BoundaryStepper<F>, table: &'a MediumTable) -> Self {
        Self { stepper, table }
    }
}

impl<F: VerticalFrame> MediumSource for MediumResolver<'_, F> {
    fn resolve(&self, state: &ParticleState) -> Resolution<'_> {
        let step = self.stepper.step(state.position, state.direction);
        Resolution {
            medium: self.table.medium_at(step.layer),
            step: step.length,
        }
    }
}
