use core::fmt::{self, Write};

use heapless::String;

use super::{write_dms, RADIANS_PER_UNIT, UNITS_PER_DEGREE};

const HALF_TURN: i64 = 180 * UNITS_PER_DEGREE as i64;

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Longitude(pub i32); // 1e-7 degree, east positive

impl Longitude {
    pub fn degrees(self) -> f64 {
        self.0 as f64 / UNITS_PER_DEGREE as f64
    }

    /// Shortest angle swept from `origin` to `self`, radians. Crossing the
    /// antimeridian yields a small delta rather than a near full turn.
    pub fn delta(self, origin: Self) -> f32 {
        let mut delta = self.0 as i64 - origin.0 as i64;
        if delta > HALF_TURN {
            delta -= 2 * HALF_TURN;
        } else if delta < -HALF_TURN {
            delta += 2 * HALF_TURN;
        }
        delta as f32 * RADIANS_PER_UNIT
    }
}

impl fmt::Display for Longitude {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ew = if self.0 >= 0 { 'E' } else { 'W' };
        write_dms(f, ew, 3, self.0)
    }
}

impl serde::Serialize for Longitude {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut string = String::<16>::new();
        write!(string, "{}", self).ok();
        serializer.serialize_str(string.as_str())
    }
}

mod test {
    #[test]
    fn test_longitude() {
        use std::format;

        use super::Longitude;

        assert_eq!("E020°00'00.000", format!("{}", Longitude(200_000_000)));
        assert_eq!("W001°21'53.370", format!("{}", Longitude(-13_648_250)));
    }

    #[test]
    fn test_delta_across_antimeridian() {
        use super::Longitude;

        let east = Longitude(1_799_999_000);
        let west = Longitude(-1_799_999_000);
        let delta = west.delta(east);
        assert!(delta > 0.0 && delta < 0.0001);
        assert!((east.delta(west) + delta).abs() < 1e-9);
    }
}
