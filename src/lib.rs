pub mod geom;
pub mod sim;

// Prelude
pub use geom::geodetic::Geodetic;
pub use geom::point::Point;
pub use geom::vector::Vector;
