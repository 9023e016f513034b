use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{Result, TransportError};

/// Opaque handle of a material registered in a [`MaterialDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// Bulk material properties used by the continuous energy-loss engine.
///
/// The stopping power follows the usual two-term parametrisation
/// `-dE/dX = a + b E`, with `X` the column depth (kg/m^2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    pub name: String,
    /// Default density in kg/m^3.
    pub density: f64,
    /// Ionisation loss `a` in GeV m^2/kg.
    pub ionisation_loss: f64,
    /// Radiative loss coefficient `b` in m^2/kg.
    pub radiative_loss: f64,
}

impl MaterialProperties {
    pub fn new(name: &str, density: f64) -> Self {
        Self {
            name: name.to_string(),
            density,
            ionisation_loss: 0.0,
            radiative_loss: 0.0,
        }
    }

    pub fn with_energy_loss(mut self, ionisation_loss: f64, radiative_loss: f64) -> Self {
        self.ionisation_loss = ionisation_loss;
        self.radiative_loss = radiative_loss;
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| TransportError::InvalidMaterial {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("empty name"));
        }
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(invalid("density must be finite and positive"));
        }
        if !self.ionisation_loss.is_finite() || self.ionisation_loss < 0.0 {
            return Err(invalid("ionisation loss must be finite and non-negative"));
        }
        if !self.radiative_loss.is_finite() || self.radiative_loss < 0.0 {
            return Err(invalid("radiative loss must be finite and non-negative"));
        }
        Ok(())
    }
}

/// Name-to-material resolution, as needed to build a medium table.
pub trait MaterialDatabase: Sync {
    /// Resolves a material name. Unknown names are an error.
    fn material_index(&self, name: &str) -> Result<MaterialId>;

    /// Returns the name of a registered material.
    fn material_name(&self, id: MaterialId) -> Option<&str>;
}

/// In-memory material database.
///
/// Identifiers are assigned in insertion order and stay stable: re-adding a
/// material with an existing name replaces its properties in place.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: Vec<MaterialProperties>,
    index: HashMap<String, MaterialId>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self {
            materials: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a material to the library and returns its identifier.
    pub fn add(&mut self, material: MaterialProperties) -> Result<MaterialId> {
        material.validate()?;
        if let Some(&id) = self.index.get(&material.name) {
            self.materials[id.0] = material;
            return Ok(id);
        }
        let id = MaterialId(self.materials.len());
        self.index.insert(material.name.clone(), id);
        self.materials.push(material);
        Ok(id)
    }

    /// Returns a material by identifier.
    pub fn get(&self, id: MaterialId) -> Option<&MaterialProperties> {
        self.materials.get(id.0)
    }

    /// Returns a material by name.
    pub fn by_name(&self, name: &str) -> Option<&MaterialProperties> {
        self.index.get(name).and_then(|id| self.get(*id))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Creates a library holding `StandardRock`, `Water` and `Air`.
    pub fn with_presets() -> Self {
        let mut lib = Self::new();
        for material in presets() {
            if let Err(err) = lib.add(material) {
                debug_assert!(false, "invalid preset: {err}");
                warn!("skipping preset: {err}");
            }
        }
        lib
    }
}

fn presets() -> [MaterialProperties; 3] {
    [
        MaterialProperties::new("StandardRock", 2650.0).with_energy_loss(2.17e-4, 4.0e-7),
        MaterialProperties::new("Water", 1000.0).with_energy_loss(2.40e-4, 3.2e-7),
        MaterialProperties::new("Air", 1.205).with_energy_loss(2.20e-4, 3.5e-7),
    ]
}

impl MaterialDatabase for MaterialLibrary {
    fn material_index(&self, name: &str) -> Result<MaterialId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TransportError::UnknownMaterial(name.to_string()))
    }

    fn material_name(&self, id: MaterialId) -> Option<&str> {
        self.get(id).map(|m| m.name.as_str())
    }
}
