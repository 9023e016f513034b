//! Vertical reference frames for flat layer boundaries.
//!
//! A frame tells the stepper how high a point is and how far a ray must go
//! to reach a given altitude. Layer boundaries are surfaces of constant
//! altitude in that frame.

use crate::geom::geodetic::{ecef_from_geodetic, ecef_from_horizontal, ecef_to_geodetic, local_up};
use crate::{Point, Vector};

/// Defines altitude and ray/altitude-surface intersection.
pub trait VerticalFrame: Send + Sync {
    /// Altitude of a position, in metres.
    fn altitude(&self, position: Point) -> f64;

    /// Distance along a unit `direction` until the ray reaches `altitude`
    /// while moving towards it.
    ///
    /// A target at the current altitude only counts when descending, since
    /// layer bottoms belong to the layer above them. Returns `None` when the
    /// surface is never reached.
    fn distance_to_altitude(&self, position: Point, direction: Vector, altitude: f64)
    -> Option<f64>;
}

/// Cartesian frame where the altitude is the `z` coordinate.
///
/// Boundaries are exact planes; a horizontal ray never reaches any of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatFrame;

impl VerticalFrame for FlatFrame {
    fn altitude(&self, position: Point) -> f64 {
        position.z
    }

    fn distance_to_altitude(
        &self,
        position: Point,
        direction: Vector,
        altitude: f64,
    ) -> Option<f64> {
        if direction.dz == 0.0 {
            return None;
        }
        let s = (altitude - position.z) / direction.dz;
        if s > 0.0 || (s == 0.0 && direction.dz < 0.0) {
            Some(s)
        } else {
            None
        }
    }
}

/// Earth-Centered Earth-Fixed frame with altitudes above the WGS84 ellipsoid.
///
/// The geodetic altitude is convex along any straight line near the Earth
/// surface. Crossings are bracketed by sampling the ray at doubling distances,
/// then solved with chord and tangent steps safeguarded by bisection. The
/// returned distance always stays on the near side of the crossing.
#[derive(Debug, Clone, Copy)]
pub struct Wgs84Frame {
    /// Crossing distances are resolved to within this length (m).
    pub tolerance: f64,
    /// Crossings farther than this along the ray are ignored (m).
    pub max_range: f64,
}

/// Solver iteration cap; each iteration at least halves the bracket.
const MAX_SOLVER_STEPS: usize = 128;

impl Wgs84Frame {
    pub fn new() -> Self {
        Self {
            tolerance: 1e-6,
            max_range: 1e8,
        }
    }

    /// ECEF position of a geodetic location.
    pub fn position(&self, latitude: f64, longitude: f64, altitude: f64) -> Point {
        ecef_from_geodetic(latitude, longitude, altitude)
    }

    /// ECEF unit direction of a horizontal (azimuth, elevation) direction.
    pub fn direction(&self, latitude: f64, longitude: f64, azimuth: f64, elevation: f64) -> Vector {
        ecef_from_horizontal(latitude, longitude, azimuth, elevation)
    }
}

impl Default for Wgs84Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Altitude at distance `s` along the ray and its rate of change.
fn altitude_profile(position: Point, direction: Vector, s: f64) -> (f64, f64) {
    let g = ecef_to_geodetic(position + direction * s);
    (g.altitude, direction.dot(local_up(g.latitude, g.longitude)))
}

/// Search for the first point where a ray reaches a target altitude.
struct Crossing<'f> {
    frame: &'f Wgs84Frame,
    position: Point,
    direction: Vector,
    target: f64,
    ascending: bool,
}

impl Crossing<'_> {
    /// Signed altitude gap at `s`, positive before the crossing, and the
    /// derivative of the gap.
    fn gap(&self, s: f64) -> (f64, f64) {
        let (altitude, rate) = altitude_profile(self.position, self.direction, s);
        if self.ascending {
            (self.target - altitude, -rate)
        } else {
            (altitude - self.target, rate)
        }
    }

    /// Finds `(lo, hi)` with `gap(lo) > 0 >= gap(hi)` and no crossing before `lo`.
    fn bracket(&self, start: f64) -> Option<(f64, f64)> {
        let mut lo = 0.0;
        let mut hi = start.max(self.frame.tolerance);
        while hi <= self.frame.max_range {
            let (gap, slope) = self.gap(hi);
            if gap <= 0.0 {
                return Some((lo, hi));
            }
            if !self.ascending && slope >= 0.0 {
                // Lowest point of the ray lies in [lo, hi]
                return self.bracket_around_minimum(lo, hi);
            }
            lo = hi;
            hi *= 2.0;
        }
        None
    }

    /// Bisects on the altitude rate until the target is found below the
    /// lowest point of the ray, or the ray is shown to pass above it.
    fn bracket_around_minimum(&self, mut lo: f64, mut hi: f64) -> Option<(f64, f64)> {
        while hi - lo > self.frame.tolerance {
            let mid = 0.5 * (lo + hi);
            let (gap, slope) = self.gap(mid);
            if gap <= 0.0 {
                return Some((lo, mid));
            }
            if slope < 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        None
    }

    /// Shrinks a bracket down to the tolerance and returns its near end.
    fn solve(&self, mut lo: f64, mut hi: f64) -> f64 {
        let (mut gap_lo, _) = self.gap(lo);
        let (mut gap_hi, mut slope_hi) = self.gap(hi);

        for _ in 0..MAX_SOLVER_STEPS {
            let width = hi - lo;
            if width <= self.frame.tolerance {
                break;
            }
            // On a convex or concave gap the chord and the tangent land on
            // opposite sides of the root
            let chord = lo + width * gap_lo / (gap_lo - gap_hi);
            let tangent = hi - gap_hi / slope_hi;
            for s in [Some(chord), (slope_hi < 0.0).then_some(tangent), None] {
                let s = match s {
                    Some(s) => s,
                    // Stalled: bisect
                    None if hi - lo > 0.5 * width => 0.5 * (lo + hi),
                    None => continue,
                };
                if !(s > lo && s < hi) {
                    continue;
                }
                let (gap, slope) = self.gap(s);
                if gap > 0.0 {
                    lo = s;
                    gap_lo = gap;
                } else {
                    hi = s;
                    gap_hi = gap;
                    slope_hi = slope;
                }
            }
        }
        lo
    }
}

impl VerticalFrame for Wgs84Frame {
    fn altitude(&self, position: Point) -> f64 {
        ecef_to_geodetic(position).altitude
    }

    fn distance_to_altitude(
        &self,
        position: Point,
        direction: Vector,
        altitude: f64,
    ) -> Option<f64> {
        let (current, rate) = altitude_profile(position, direction, 0.0);
        if altitude == current {
            return (rate < 0.0).then_some(0.0);
        }
        let ascending = altitude > current;
        if !ascending && rate >= 0.0 {
            // Moving away: a convex altitude never comes back down
            return None;
        }

        let crossing = Crossing {
            frame: self,
            position,
            direction,
            target: altitude,
            ascending,
        };
        // The altitude changes by at most the distance travelled
        let (lo, hi) = crossing.bracket((altitude - current).abs())?;
        Some(crossing.solve(lo, hi))
    }
}
