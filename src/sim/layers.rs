use serde::Serialize;

use super::error::{Result, TransportError};

/// Ordered stack of flat horizontal layers.
///
/// Layer `i` spans `[elevations[i], elevations[i + 1])`. The topmost layer
/// extends up to the ceiling when one is set, and without bound otherwise.
/// Everything below the lowest elevation (and at or above the ceiling) is
/// void.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStack {
    elevations: Vec<f64>,
    ceiling: Option<f64>,
}

/// The vertical band containing a given altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Layer index, `None` for void.
    pub layer: Option<usize>,
    /// Lower boundary, `f64::NEG_INFINITY` below the stack.
    pub lower: f64,
    /// Upper boundary, `f64::INFINITY` when unbounded.
    pub upper: f64,
}

impl LayerStack {
    /// Creates a stack from the bottom elevation of each layer (metres).
    pub fn new(elevations: Vec<f64>) -> Result<Self> {
        if elevations.is_empty() {
            return Err(TransportError::EmptyStack);
        }
        for (index, &value) in elevations.iter().enumerate() {
            if !value.is_finite() {
                return Err(TransportError::InvalidElevation { index, value });
            }
            if index > 0 && value <= elevations[index - 1] {
                return Err(TransportError::NonIncreasing {
                    index,
                    value,
                    previous: elevations[index - 1],
                });
            }
        }
        Ok(Self {
            elevations,
            ceiling: None,
        })
    }

    /// Bounds the topmost layer from above.
    pub fn with_ceiling(mut self, ceiling: f64) -> Result<Self> {
        let top = self.elevations[self.elevations.len() - 1];
        if !ceiling.is_finite() || ceiling <= top {
            return Err(TransportError::InvalidCeiling { ceiling, top });
        }
        self.ceiling = Some(ceiling);
        Ok(self)
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.elevations.len()
    }

    /// Always false: a stack holds at least one layer.
    pub fn is_empty(&self) -> bool {
        self.elevations.is_empty()
    }

    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    pub fn ceiling(&self) -> Option<f64> {
        self.ceiling
    }

    /// Index of the layer containing `altitude`, `None` if void.
    pub fn layer_at(&self, altitude: f64) -> Option<usize> {
        // Also rejects NaN
        if !(altitude >= self.elevations[0]) {
            return None;
        }
        if let Some(ceiling) = self.ceiling
            && altitude >= ceiling
        {
            return None;
        }
        Some(self.elevations.partition_point(|&e| e <= altitude) - 1)
    }

    /// Returns the band (layer or void) containing `altitude` with its
    /// boundaries.
    pub fn band(&self, altitude: f64) -> Band {
        let top = self.ceiling.unwrap_or(f64::INFINITY);
        match self.layer_at(altitude) {
            Some(i) => Band {
                layer: Some(i),
                lower: self.elevations[i],
                upper: self.elevations.get(i + 1).copied().unwrap_or(top),
            },
            None if altitude >= top => Band {
                layer: None,
                lower: top,
                upper: f64::INFINITY,
            },
            None => Band {
                layer: None,
                lower: f64::NEG_INFINITY,
                upper: self.elevations[0],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earth() -> LayerStack {
        LayerStack::new(vec![-1000.0, 0.0, 1000.0]).unwrap()
    }

    #[test]
    fn test_layer_at() {
        let stack = earth();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.layer_at(-1000.5), None);
        assert_eq!(stack.layer_at(-1000.0), Some(0));
        assert_eq!(stack.layer_at(-0.5), Some(0));
        assert_eq!(stack.layer_at(0.0), Some(1));
        assert_eq!(stack.layer_at(999.9), Some(1));
        assert_eq!(stack.layer_at(1000.0), Some(2));
        assert_eq!(stack.layer_at(1.0e7), Some(2));
        assert_eq!(stack.layer_at(f64::NAN), None);
    }

    #[test]
    fn test_ceiling() {
        let stack = earth().with_ceiling(2000.0).unwrap();
        assert_eq!(stack.layer_at(1999.0), Some(2));
        assert_eq!(stack.layer_at(2000.0), None);
        assert_eq!(stack.layer_at(3000.0), None);
        assert!(earth().with_ceiling(1000.0).is_err());
        assert!(earth().with_ceiling(f64::INFINITY).is_err());
    }

    #[test]
    fn test_band() {
        let stack = earth().with_ceiling(2000.0).unwrap();
        let b = stack.band(500.0);
        assert_eq!(b.layer, Some(1));
        assert_eq!((b.lower, b.upper), (0.0, 1000.0));

        let b = stack.band(1500.0);
        assert_eq!((b.layer, b.lower, b.upper), (Some(2), 1000.0, 2000.0));

        let b = stack.band(-5000.0);
        assert_eq!(b.layer, None);
        assert_eq!(b.upper, -1000.0);
        assert!(b.lower.is_infinite());

        let b = stack.band(2500.0);
        assert_eq!(b.layer, None);
        assert_eq!(b.lower, 2000.0);
        assert!(b.upper.is_infinite());

        let b = earth().band(1500.0);
        assert_eq!(b.layer, Some(2));
        assert!(b.upper.is_infinite());
    }

    #[test]
    fn test_invalid_elevations() {
        assert!(matches!(
            LayerStack::new(vec![]),
            Err(TransportError::EmptyStack)
        ));
        assert!(matches!(
            LayerStack::new(vec![0.0, 0.0]),
            Err(TransportError::NonIncreasing { index: 1, .. })
        ));
        assert!(matches!(
            LayerStack::new(vec![10.0, 5.0]),
            Err(TransportError::NonIncreasing { index: 1, .. })
        ));
        assert!(matches!(
            LayerStack::new(vec![0.0, f64::NAN]),
            Err(TransportError::InvalidElevation { index: 1, .. })
        ));
    }
}
