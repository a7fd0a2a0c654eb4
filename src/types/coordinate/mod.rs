use core::fmt;

pub mod latitude;
pub mod longitude;

pub use latitude::Latitude;
pub use longitude::Longitude;

use crate::types::measurement::wrap_360;

pub const UNITS_PER_DEGREE: i32 = 10_000_000;
pub const RADIANS_PER_UNIT: f32 = core::f32::consts::PI / 180.0 / UNITS_PER_DEGREE as f32;
pub const EARTH_RADIUS: f32 = 6_371_000.0; // meter

fn write_dms(f: &mut fmt::Formatter, hemisphere: char, width: usize, value: i32) -> fmt::Result {
    let units = UNITS_PER_DEGREE as i64;
    let value = (value as i64).abs();
    let minutes = value % units * 60;
    let seconds = minutes % units * 60_000 / units;
    let (degree, minute) = (value / units, minutes / units);
    let (second, milli) = (seconds / 1000, seconds % 1000);
    write!(f, "{}{:0w$}°{:02}'{:02}.{:03}", hemisphere, degree, minute, second, milli, w = width)
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Position {
    pub latitude: Latitude,
    pub longitude: Longitude,
}

impl Position {
    pub const fn new(latitude: i32, longitude: i32) -> Self {
        Self { latitude: Latitude(latitude), longitude: Longitude(longitude) }
    }
}

/// Horizontal offset on the local tangent plane, meter.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Displacement {
    pub north: f32,
    pub east: f32,
}

impl Displacement {
    pub fn distance(&self) -> f32 {
        libm::sqrtf(self.north * self.north + self.east * self.east)
    }

    /// Bearing of travel in degree, 0 north, 90 east, within [0, 360).
    pub fn bearing(&self) -> f32 {
        wrap_360(libm::atan2f(self.east, self.north).to_degrees())
    }
}

/// Flat-earth projection around the mean latitude of both points, only
/// meaningful over the few meters between consecutive fixes.
impl core::ops::Sub for Position {
    type Output = Displacement;

    fn sub(self, origin: Self) -> Displacement {
        let north = EARTH_RADIUS * self.latitude.delta(origin.latitude);
        let cos_latitude = libm::cosf(self.latitude.midpoint(origin.latitude).radians());
        let east = EARTH_RADIUS * self.longitude.delta(origin.longitude) * cos_latitude;
        Displacement { north, east }
    }
}

mod test {
    #[test]
    fn test_tangent_plane_northward() {
        use super::Position;

        let origin = Position::new(100_000_000, 200_000_000);
        let displacement = Position::new(100_001_000, 200_000_000) - origin;
        assert!((displacement.north - 11.119).abs() < 0.01);
        assert_eq!(displacement.east, 0.0);
        assert!((displacement.distance() - 11.119).abs() < 0.01);
        assert!(displacement.bearing() < 0.001);
    }

    #[test]
    fn test_tangent_plane_bearing_quadrants() {
        use super::Position;

        let origin = Position::new(0, 0);
        let east = Position::new(0, 1_000) - origin;
        assert!((east.bearing() - 90.0).abs() < 0.01);
        let south = Position::new(-1_000, 0) - origin;
        assert!((south.bearing() - 180.0).abs() < 0.01);
        let west = Position::new(0, -1_000) - origin;
        assert!((west.bearing() - 270.0).abs() < 0.01);
        let north_west = Position::new(1_000, -1_000) - origin;
        assert!((north_west.bearing() - 315.0).abs() < 0.01);
    }

    #[test]
    fn test_east_shrinks_with_latitude() {
        use super::Position;

        let equator = Position::new(0, 1_000) - Position::new(0, 0);
        let sixty = Position::new(600_000_000, 1_000) - Position::new(600_000_000, 0);
        assert!((sixty.east / equator.east - 0.5).abs() < 0.001);
    }
}
