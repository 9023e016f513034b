use crate::{Point, Vector};

use super::frame::{VerticalFrame, Wgs84Frame};
use super::layers::LayerStack;

/// Outcome of a boundary step query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Distance to the next boundary crossing along the ray, `f64::INFINITY`
    /// when no boundary is ever reached.
    pub length: f64,
    /// Layer occupied over `[0, length)`, `None` for void.
    pub layer: Option<usize>,
    /// Altitude at the query position.
    pub altitude: f64,
}

/// Ray stepper through a stack of flat layers.
///
/// Pure query: the stepper never moves the particle. The returned length is
/// meant as an upper bound for the next propagation step.
#[derive(Debug, Clone)]
pub struct BoundaryStepper<F: VerticalFrame = Wgs84Frame> {
    stack: LayerStack,
    frame: F,
}

impl<F: VerticalFrame> BoundaryStepper<F> {
    pub fn new(stack: LayerStack, frame: F) -> Self {
        Self { stack, frame }
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn frame(&self) -> &F {
        &self.frame
    }

    /// Distance to the nearest boundary along the ray and the current layer.
    ///
    /// `direction` must be a unit vector.
    pub fn step(&self, position: Point, direction: Vector) -> StepResult {
        let altitude = self.frame.altitude(position);
        let band = self.stack.band(altitude);

        let length = [band.lower, band.upper]
            .into_iter()
            .filter(|h| h.is_finite())
            .filter_map(|h| self.frame.distance_to_altitude(position, direction, h))
            .fold(f64::INFINITY, f64::min);

        StepResult {
            length,
            layer: band.layer,
            altitude,
        }
    }
}

impl BoundaryStepper<Wgs84Frame> {
    /// ECEF position at the given geodetic location.
    pub fn position(&self, latitude: f64, longitude: f64, altitude: f64) -> Point {
        self.frame.position(latitude, longitude, altitude)
    }

    /// ECEF unit direction from local azimuth and elevation (degrees).
    pub fn direction(&self, latitude: f64, longitude: f64, azimuth: f64, elevation: f64) -> Vector {
        self.frame.direction(latitude, longitude, azimuth, elevation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::frame::FlatFrame;

    fn flat_stepper() -> BoundaryStepper<FlatFrame> {
        let stack = LayerStack::new(vec![-1000.0, 0.0, 1000.0])
            .unwrap()
            .with_ceiling(2000.0)
            .unwrap();
        BoundaryStepper::new(stack, FlatFrame)
    }

    #[test]
    fn test_step_up_and_down() {
        let stepper = flat_stepper();
        let p = Point::new(0.0, 0.0, -0.5);
        let up = Vector::new(0.0, 0.0, 1.0);

        let r = stepper.step(p, up);
        assert_eq!(r.layer, Some(0));
        assert!((r.length - 0.5).abs() < 1e-12);
        assert!((r.altitude + 0.5).abs() < 1e-12);

        let r = stepper.step(p, -up);
        assert_eq!(r.layer, Some(0));
        assert!((r.length - 999.5).abs() < 1e-12);
    }

    #[test]
    fn test_horizontal_is_infinite() {
        let stepper = flat_stepper();
        let r = stepper.step(Point::new(0.0, 0.0, 500.0), Vector::new(1.0, 0.0, 0.0));
        assert_eq!(r.layer, Some(1));
        assert!(r.length.is_infinite());
    }

    #[test]
    fn test_void_bands() {
        let stepper = flat_stepper();
        let up = Vector::new(0.0, 0.0, 1.0);

        // Below the stack, heading up: reaches the lowest boundary
        let r = stepper.step(Point::new(0.0, 0.0, -1500.0), up);
        assert_eq!(r.layer, None);
        assert!((r.length - 500.0).abs() < 1e-12);

        // Above the ceiling, heading up: nothing left to cross
        let r = stepper.step(Point::new(0.0, 0.0, 2500.0), up);
        assert_eq!(r.layer, None);
        assert!(r.length.is_infinite());

        // Above the ceiling, heading down
        let r = stepper.step(Point::new(0.0, 0.0, 2500.0), -up);
        assert!((r.length - 500.0).abs() < 1e-12);
    }

    #[test]
    fn test_monotone_along_ray() {
        let stepper = flat_stepper();
        let p0 = Point::new(0.0, 0.0, 250.0);
        let d = Vector::new(0.3, -0.2, 0.6).normalize().unwrap();
        let first = stepper.step(p0, d);
        assert_eq!(first.layer, Some(1));

        let mut previous = first.length;
        for frac in [0.0, 0.1, 0.5, 0.9, 0.999] {
            let r = stepper.step(p0 + d * (first.length * frac), d);
            assert_eq!(r.layer, first.layer);
            assert!(r.length <= previous + 1e-9);
            assert!((r.length - first.length * (1.0 - frac)).abs() < 1e-6);
            previous = r.length;
        }
        // Just past the bound the layer changes
        let r = stepper.step(p0 + d * (first.length + 1e-6), d);
        assert_eq!(r.layer, Some(2));
    }

    #[test]
    fn test_wgs84_position_helpers() {
        let stack = LayerStack::new(vec![-1000.0, 0.0, 1000.0]).unwrap();
        let stepper = BoundaryStepper::new(stack, Wgs84Frame::new());
        let p = stepper.position(45.0, 3.0, -0.5);
        let d = stepper.direction(45.0, 3.0, 0.0, 90.0);
        let r = stepper.step(p, d);
        assert_eq!(r.layer, Some(0));
        assert!((r.altitude + 0.5).abs() < 1e-6);
        assert!((r.length - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_wgs84_grazing_rays_keep_layer_below_bound() {
        let stack = LayerStack::new(vec![-1000.0, 0.0, 1000.0])
            .unwrap()
            .with_ceiling(2000.0)
            .unwrap();
        let stepper = BoundaryStepper::new(stack, Wgs84Frame::new());
        let frame = stepper.frame();

        for altitude in [-999.0, -0.5, 0.5, 999.0, 1001.0, 1999.0] {
            for azimuth in (0..360).step_by(15).map(f64::from) {
                for elevation in [-0.5, -0.1, 0.0, 0.1, 0.5] {
                    let p = stepper.position(45.0, 3.0, altitude);
                    let d = stepper.direction(45.0, 3.0, azimuth, elevation);
                    let r = stepper.step(p, d);
                    assert_eq!(r.layer, stepper.stack().layer_at(altitude));
                    if !r.length.is_finite() {
                        continue;
                    }
                    for eps in [1e-3, 1e-6] {
                        let inner = frame.altitude(p + d * (r.length * (1.0 - eps)));
                        assert_eq!(
                            stepper.stack().layer_at(inner),
                            r.layer,
                            "alt {altitude}, az {azimuth}, el {elevation}: s = {}",
                            r.length
                        );
                    }
                    // The bound ends on one of the enclosing boundaries
                    let end = frame.altitude(p + d * r.length);
                    let band = stepper.stack().band(altitude);
                    let gap = (end - band.lower).abs().min((end - band.upper).abs());
                    assert!(gap < 1e-5, "alt {altitude}, az {azimuth}, el {elevation}: end {end}");
                }
            }
        }
    }
}
