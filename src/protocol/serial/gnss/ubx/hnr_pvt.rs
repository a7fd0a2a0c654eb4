use super::{
    message::Fields,
    nav_pvt::{utc, FixType, Valid},
};
use crate::{protocol::serial::gnss::out::UtcTime, types::coordinate::Position};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Flags(pub u8);

impl Flags {
    pub fn gnss_fix_ok(self) -> bool {
        self.0 & (1 << 0) > 0
    }
}

/// UBX-HNR-PVT, high rate output of the fused navigation engine.
#[derive(Copy, Clone, Debug)]
pub struct HnrPvt<'a>(pub(super) Fields<'a>);

impl<'a> HnrPvt<'a> {
    pub const SIZE: usize = 72;

    pub fn itow(&self) -> u32 {
        self.0.u32(0)
    }

    pub fn utc(&self) -> UtcTime {
        utc(&self.0)
    }

    pub fn valid(&self) -> Valid {
        Valid(self.0.u8(11))
    }

    pub fn fix_type(&self) -> FixType {
        self.0.u8(16).into()
    }

    pub fn flags(&self) -> Flags {
        Flags(self.0.u8(17))
    }

    /// Fix ok with any kind of fix.
    pub fn has_fix(&self) -> bool {
        self.flags().gnss_fix_ok() && self.fix_type().value() != 0
    }

    /// Additionally requires date and time to be valid.
    pub fn usable(&self) -> bool {
        self.valid().date_and_time() && self.has_fix()
    }

    pub fn position(&self) -> Position {
        Position::new(self.0.i32(24), self.0.i32(20))
    }

    pub fn height(&self) -> i32 {
        self.0.i32(28) // above ellipsoid, mm
    }

    pub fn height_above_msl(&self) -> i32 {
        self.0.i32(32) // mm
    }

    pub fn ground_speed(&self) -> i32 {
        self.0.i32(36) // mm/s
    }

    pub fn speed(&self) -> i32 {
        self.0.i32(40) // 3D, mm/s
    }

    pub fn heading_of_motion(&self) -> i32 {
        self.0.i32(44) // 1e-5 degree
    }

    pub fn heading_of_vehicle(&self) -> i32 {
        self.0.i32(48) // 1e-5 degree
    }

    pub fn horizontal_accuracy(&self) -> u32 {
        self.0.u32(52) // mm
    }

    pub fn vertical_accuracy(&self) -> u32 {
        self.0.u32(56) // mm
    }

    pub fn speed_accuracy(&self) -> u32 {
        self.0.u32(60) // mm/s
    }

    pub fn heading_accuracy(&self) -> u32 {
        self.0.u32(64) // 1e-5 degree
    }
}

/// Payload builder for fixtures. Fix ok, 3D fix with date and time valid
/// unless changed afterwards.
#[cfg(test)]
pub fn payload(itow: u32, latitude: i32, longitude: i32) -> [u8; HnrPvt::SIZE] {
    let mut bytes = [0u8; HnrPvt::SIZE];
    bytes[0..4].copy_from_slice(&itow.to_le_bytes());
    bytes[4..6].copy_from_slice(&2021u16.to_le_bytes());
    bytes[6..11].copy_from_slice(&[7, 4, 12, 30, 45]);
    bytes[11] = 0x07;
    bytes[16] = 3;
    bytes[17] = 0x0D;
    bytes[20..24].copy_from_slice(&longitude.to_le_bytes());
    bytes[24..28].copy_from_slice(&latitude.to_le_bytes());
    bytes
}

mod test {
    #[test]
    fn test_ubx_hnr_pvt() {
        use hex_literal::hex;

        use super::HnrPvt;
        use crate::protocol::serial::gnss::ubx::{message::Fields, nav_pvt::FixType};

        let payload = hex!(
            "E8 03 00 00 E5 07 07 04 0C 1E 2D 07 00 00 00 00
             03 0D 00 00 86 BE 2F FF AD 1F 21 04 E0 F2 09 00
             A0 56 09 00 B8 0B 00 00 C4 0B 00 00 40 4B 4C 00
             00 00 00 00 10 27 00 00 20 4E 00 00 64 00 00 00
             A0 86 01 00 00 00 00 00"
        );
        let hnr = HnrPvt(Fields(&payload));
        assert_eq!(hnr.itow(), 1000);
        assert_eq!(hnr.fix_type(), FixType::ThreeDemension);
        assert!(hnr.flags().gnss_fix_ok());
        assert!(hnr.usable());
        assert_eq!(hnr.position().longitude.0, -13648250);
        assert_eq!(hnr.position().latitude.0, 69279661);
        assert_eq!(hnr.ground_speed(), 3000);
        assert_eq!(hnr.speed(), 3012);
        assert_eq!(hnr.heading_of_motion(), 5000000);
        assert_eq!(hnr.horizontal_accuracy(), 10000);
        assert_eq!(hnr.vertical_accuracy(), 20000);
        assert_eq!(hnr.speed_accuracy(), 100);
        assert_eq!(hnr.heading_accuracy(), 100000);

        let utc = hnr.utc();
        assert_eq!((utc.year, utc.month, utc.day), (2021, 7, 4));
        assert!(utc.datetime().is_some());
    }

    #[test]
    fn test_hnr_pvt_usable() {
        use super::{payload, HnrPvt};
        use crate::protocol::serial::gnss::ubx::message::Fields;

        let mut bytes = payload(0, 0, 0);
        assert!(HnrPvt(Fields(&bytes)).usable());
        bytes[11] = 0x01;
        assert!(!HnrPvt(Fields(&bytes)).usable());
        assert!(HnrPvt(Fields(&bytes)).has_fix());
        bytes[11] = 0x03;
        bytes[16] = 0;
        assert!(!HnrPvt(Fields(&bytes)).usable());
        bytes[16] = 2;
        bytes[17] = 0x0C;
        assert!(!HnrPvt(Fields(&bytes)).usable());
        assert!(!HnrPvt(Fields(&bytes)).has_fix());
    }
}
