use chrono::naive::{NaiveDate, NaiveDateTime, NaiveTime};

use super::ubx::nav_pvt::{FixType, Valid};
use crate::types::coordinate::Position;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Quality {
    pub fix_type: FixType,
    pub fix_ok: bool,
    pub satellites_used: u8,
    pub satellites_visible: u8,
    pub position_dop: u16, // 0.01
}

impl Quality {
    const fn new() -> Self {
        Self {
            fix_type: FixType::NoFix,
            fix_ok: false,
            satellites_used: 0,
            satellites_visible: 0,
            position_dop: 0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UtcTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub valid: Valid,
}

impl UtcTime {
    pub const fn new() -> Self {
        Self { year: 0, month: 0, day: 0, hour: 0, minute: 0, second: 0, valid: Valid(0) }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        if !self.valid.valid_date() {
            return None;
        }
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())
    }

    pub fn time(&self) -> Option<NaiveTime> {
        if !self.valid.valid_time() {
            return None;
        }
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        Some(NaiveDateTime::new(self.date()?, self.time()?))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Motion {
    pub ground_speed: i32,        // mm/s
    pub speed: i32,               // 3D, mm/s, high rate solution only
    pub velocity_ned: [i32; 3],   // mm/s, navigation solution only
    pub heading_of_motion: i32,   // 1e-5 degree
    pub heading_of_vehicle: i32,  // 1e-5 degree
}

impl Motion {
    const fn new() -> Self {
        Self {
            ground_speed: 0,
            speed: 0,
            velocity_ned: [0; 3],
            heading_of_motion: 0,
            heading_of_vehicle: 0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Accuracy {
    pub horizontal: u32, // mm
    pub vertical: u32,   // mm
    pub speed: u32,      // mm/s
    pub heading: u32,    // 1e-5 degree
    pub time: u32,       // ns
}

impl Accuracy {
    const fn new() -> Self {
        Self { horizontal: 0, vertical: 0, speed: 0, heading: 0, time: 0 }
    }
}

/// Speed and bearing derived from consecutive high rate positions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Derived {
    pub speed_mps: f32,
    pub speed_kmh: f32,
    pub heading: f32, // degree
    pub heading_valid: bool,
}

impl Derived {
    pub const fn new() -> Self {
        Self { speed_mps: 0.0, speed_kmh: 0.0, heading: 0.0, heading_valid: false }
    }
}

/// Navigation record merged from every recognized message. A message only
/// overwrites the fields it carries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MergedFix {
    pub valid: bool,
    pub time_valid: bool,
    pub itow: u32, // ms
    pub utc: UtcTime,
    pub quality: Quality,
    pub position: Position,
    pub height: i32,     // above ellipsoid, mm
    pub height_msl: i32, // mm
    pub motion: Motion,
    pub accuracy: Accuracy,
    pub llh: Derived,
    pub host_time_ms: u32,
}

impl MergedFix {
    pub const fn new() -> Self {
        Self {
            valid: false,
            time_valid: false,
            itow: 0,
            utc: UtcTime::new(),
            quality: Quality::new(),
            position: Position::new(0, 0),
            height: 0,
            height_msl: 0,
            motion: Motion::new(),
            accuracy: Accuracy::new(),
            llh: Derived::new(),
            host_time_ms: 0,
        }
    }
}

mod test {
    #[test]
    fn test_utc_time() {
        use super::UtcTime;
        use crate::protocol::serial::gnss::ubx::nav_pvt::Valid;

        let mut utc = UtcTime {
            year: 2021,
            month: 7,
            day: 4,
            hour: 12,
            minute: 30,
            second: 45,
            valid: Valid(0x01),
        };
        assert!(utc.date().is_some());
        assert!(utc.time().is_none());
        assert!(utc.datetime().is_none());

        utc.valid = Valid(0x03);
        let datetime = utc.datetime().unwrap();
        assert_eq!(std::format!("{}", datetime), "2021-07-04 12:30:45");

        utc.month = 13;
        assert!(utc.datetime().is_none());
    }

    #[test]
    fn test_serialize_merged_fix() {
        use serde_json::json;

        use super::MergedFix;

        let mut fix = MergedFix::new();
        fix.position.latitude.0 = 100_000_000;
        let value = serde_json::to_value(&fix).unwrap();
        let position = json!({"latitude": "N10°00'00.000", "longitude": "E000°00'00.000"});
        assert_eq!(value["position"], position);
        assert_eq!(value["quality"]["fix-type"], 0);
        assert_eq!(value["llh"]["heading-valid"], false);
        assert_eq!(MergedFix::default(), MergedFix::new());
    }
}
