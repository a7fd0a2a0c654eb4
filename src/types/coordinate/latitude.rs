use core::fmt::{self, Write};

use heapless::String;

use super::{write_dms, RADIANS_PER_UNIT};

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Latitude(pub i32); // 1e-7 degree, north positive

impl Latitude {
    pub fn degrees(self) -> f64 {
        self.0 as f64 / super::UNITS_PER_DEGREE as f64
    }

    pub fn radians(self) -> f32 {
        self.0 as f32 * RADIANS_PER_UNIT
    }

    /// Angle swept from `origin` to `self`, radians.
    pub fn delta(self, origin: Self) -> f32 {
        (self.0 as i64 - origin.0 as i64) as f32 * RADIANS_PER_UNIT
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self(((self.0 as i64 + other.0 as i64) / 2) as i32)
    }
}

impl fmt::Display for Latitude {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ns = if self.0 >= 0 { 'N' } else { 'S' };
        write_dms(f, ns, 2, self.0)
    }
}

impl serde::Serialize for Latitude {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut string = String::<16>::new();
        write!(string, "{}", self).ok();
        serializer.serialize_str(string.as_str())
    }
}

mod test {
    #[test]
    fn test_latitude() {
        use std::format;

        use super::Latitude;

        assert_eq!("N10°00'00.000", format!("{}", Latitude(100_000_000)));
        assert_eq!("S33°52'04.320", format!("{}", Latitude(-338_678_667)));
        assert_eq!(Latitude(100_000_000).degrees(), 10.0);
        assert_eq!(Latitude(10).midpoint(Latitude(20)), Latitude(15));
    }
}
