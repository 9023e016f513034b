//! Geodetic (WGS84) and Earth-Centered Earth-Fixed (ECEF) conversions.
//!
//! Angles are in degrees, lengths in metres. Horizontal directions follow the
//! usual surveying convention: azimuth from north, clockwise (0=N, 90=E),
//! elevation from the local horizon (90 = zenith).

use crate::{Point, Vector};

/// WGS84 semi-major axis (m).
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Number of fixed-point iterations in [`ecef_to_geodetic`].
const GEODETIC_ITERATIONS: usize = 8;

/// Geodetic coordinates of a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    /// Latitude in degrees (positive north).
    pub latitude: f64,
    /// Longitude in degrees (positive east).
    pub longitude: f64,
    /// Height above the ellipsoid in metres.
    pub altitude: f64,
}

impl Geodetic {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Prime vertical radius of curvature at the given latitude (radians).
fn prime_vertical_radius(sin_lat: f64) -> f64 {
    WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt()
}

/// Converts geodetic coordinates to an ECEF position.
pub fn ecef_from_geodetic(latitude: f64, longitude: f64, altitude: f64) -> Point {
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude.to_radians().sin_cos();
    let n = prime_vertical_radius(sin_lat);

    Point::new(
        (n + altitude) * cos_lat * cos_lon,
        (n + altitude) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + altitude) * sin_lat,
    )
}

/// Converts an ECEF position to geodetic coordinates.
///
/// Fixed-point iteration on the latitude; the height formula used here stays
/// well conditioned at the poles.
pub fn ecef_to_geodetic(position: Point) -> Geodetic {
    let p = position.x.hypot(position.y);
    let longitude = position.y.atan2(position.x);

    let mut lat = position.z.atan2(p * (1.0 - WGS84_E2));
    let mut altitude = 0.0;
    for _ in 0..GEODETIC_ITERATIONS {
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = prime_vertical_radius(sin_lat);
        altitude = p * cos_lat + position.z * sin_lat - WGS84_A * WGS84_A / n;
        lat = position
            .z
            .atan2(p * (1.0 - WGS84_E2 * n / (n + altitude)));
    }

    Geodetic {
        latitude: lat.to_degrees(),
        longitude: longitude.to_degrees(),
        altitude,
    }
}

/// Local vertical (ellipsoid normal, pointing up) at the given location.
pub fn local_up(latitude: f64, longitude: f64) -> Vector {
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude.to_radians().sin_cos();
    Vector::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

/// Converts a horizontal direction (azimuth, elevation) at a given location
/// to a unit ECEF direction.
pub fn ecef_from_horizontal(latitude: f64, longitude: f64, azimuth: f64, elevation: f64) -> Vector {
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude.to_radians().sin_cos();
    let (sin_az, cos_az) = azimuth.to_radians().sin_cos();
    let (sin_el, cos_el) = elevation.to_radians().sin_cos();

    // East / north / up components
    let e = cos_el * sin_az;
    let n = cos_el * cos_az;
    let u = sin_el;

    let east = Vector::new(-sin_lon, cos_lon, 0.0);
    let north = Vector::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    let up = Vector::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);

    east * e + north * n + up * u
}
