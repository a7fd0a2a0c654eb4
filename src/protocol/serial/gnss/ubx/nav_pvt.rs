use super::message::Fields;
use crate::protocol::serial::gnss::out::UtcTime;
use crate::types::coordinate::Position;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Valid(pub u8);

impl Valid {
    pub fn valid_date(self) -> bool {
        self.0 & (1 << 0) > 0
    }

    pub fn valid_time(self) -> bool {
        self.0 & (1 << 1) > 0
    }

    pub fn date_and_time(self) -> bool {
        self.valid_date() && self.valid_time()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FixType {
    NoFix,
    DeadReckoningOnly,
    TwoDemension,
    ThreeDemension,
    GNSSPlusDeadReckoningCombined,
    TimeOnlyFix,
    Reserved(u8),
}

impl FixType {
    pub const fn value(self) -> u8 {
        match self {
            Self::NoFix => 0,
            Self::DeadReckoningOnly => 1,
            Self::TwoDemension => 2,
            Self::ThreeDemension => 3,
            Self::GNSSPlusDeadReckoningCombined => 4,
            Self::TimeOnlyFix => 5,
            Self::Reserved(value) => value,
        }
    }
}

impl From<u8> for FixType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::NoFix,
            1 => Self::DeadReckoningOnly,
            2 => Self::TwoDemension,
            3 => Self::ThreeDemension,
            4 => Self::GNSSPlusDeadReckoningCombined,
            5 => Self::TimeOnlyFix,
            value => Self::Reserved(value),
        }
    }
}

impl Default for FixType {
    fn default() -> Self {
        Self::NoFix
    }
}

impl serde::Serialize for FixType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Flags1(pub u8);

impl Flags1 {
    pub fn gnss_fix_ok(self) -> bool {
        self.0 & (1 << 0) > 0
    }
}

/// UTC block shared by the navigation and high-rate solutions, located at
/// offset 4 of both payloads.
pub(super) fn utc(fields: &Fields) -> UtcTime {
    UtcTime {
        year: fields.u16(4),
        month: fields.u8(6),
        day: fields.u8(7),
        hour: fields.u8(8),
        minute: fields.u8(9),
        second: fields.u8(10),
        valid: Valid(fields.u8(11)),
    }
}

/// UBX-NAV-PVT, navigation position velocity time solution.
#[derive(Copy, Clone, Debug)]
pub struct NavPvt<'a>(pub(super) Fields<'a>);

impl<'a> NavPvt<'a> {
    pub const SIZE: usize = 92;

    pub fn itow(&self) -> u32 {
        self.0.u32(0)
    }

    pub fn utc(&self) -> UtcTime {
        utc(&self.0)
    }

    pub fn time_accuracy(&self) -> u32 {
        self.0.u32(12) // ns
    }

    pub fn fix_type(&self) -> FixType {
        self.0.u8(20).into()
    }

    pub fn flags1(&self) -> Flags1 {
        Flags1(self.0.u8(21))
    }

    pub fn num_satellites(&self) -> u8 {
        self.0.u8(23)
    }

    pub fn position(&self) -> Position {
        Position::new(self.0.i32(28), self.0.i32(24))
    }

    pub fn height(&self) -> i32 {
        self.0.i32(32) // above ellipsoid, mm
    }

    pub fn height_above_msl(&self) -> i32 {
        self.0.i32(36) // mm
    }

    pub fn horizontal_accuracy(&self) -> u32 {
        self.0.u32(40) // mm
    }

    pub fn vertical_accuracy(&self) -> u32 {
        self.0.u32(44) // mm
    }

    /// North, east, down in mm/s
    pub fn velocity_ned(&self) -> [i32; 3] {
        [self.0.i32(48), self.0.i32(52), self.0.i32(56)]
    }

    pub fn ground_speed(&self) -> i32 {
        self.0.i32(60) // mm/s
    }

    pub fn heading_of_motion(&self) -> i32 {
        self.0.i32(64) // 1e-5 degree
    }

    pub fn speed_accuracy(&self) -> u32 {
        self.0.u32(68) // mm/s
    }

    pub fn heading_accuracy(&self) -> u32 {
        self.0.u32(72) // 1e-5 degree
    }

    pub fn position_dop(&self) -> u16 {
        self.0.u16(76) // 0.01
    }

    pub fn heading_of_vehicle(&self) -> i32 {
        self.0.i32(84) // 1e-5 degree
    }
}

mod test {
    #[test]
    fn test_ubx_nav_pvt() {
        use std::format;

        use hex_literal::hex;

        use super::{FixType, NavPvt};
        use crate::protocol::serial::gnss::ubx::message::Fields;

        let payload = hex!(
            "00 00 00 00 E0 07 0A 15 16 0D 0A 04 01 00 00 00
             01 00 00 00 03 0C E0 0B 86 BE 2F FF AD 1F 21 04
             E0 F2 09 00 A0 56 09 00 01 00 00 00 01 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00"
        );
        let nav_pvt = NavPvt(Fields(&payload));
        let utc = nav_pvt.utc();
        assert_eq!((utc.year, utc.month, utc.day), (2016, 10, 21));
        assert_eq!((utc.hour, utc.minute, utc.second), (22, 13, 10));
        assert!(!utc.valid.valid_date());
        assert!(!utc.valid.date_and_time());
        assert_eq!(nav_pvt.fix_type(), FixType::ThreeDemension);
        assert!(!nav_pvt.flags1().gnss_fix_ok());
        assert_eq!(nav_pvt.num_satellites(), 11);
        assert_eq!(nav_pvt.height(), 652000);
        assert_eq!(nav_pvt.height_above_msl(), 612000);

        let position = nav_pvt.position();
        assert_eq!(position.longitude.0, -13648250);
        assert_eq!("W001°21'53.370", format!("{}", position.longitude));
        assert_eq!(position.latitude.0, 69279661);
        assert_eq!("N06°55'40.677", format!("{}", position.latitude));
        assert_eq!(utc.datetime(), None);
    }

    #[test]
    fn test_fix_type() {
        use super::FixType;

        assert_eq!(FixType::from(3), FixType::ThreeDemension);
        assert_eq!(FixType::from(9), FixType::Reserved(9));
        assert_eq!(FixType::from(9).value(), 9);
        assert_eq!(FixType::default().value(), 0);
    }
}
