use super::message::Fields;

/// UBX-NAV-SAT, per satellite information. Only the header is of interest.
#[derive(Copy, Clone, Debug)]
pub struct NavSat<'a>(pub(super) Fields<'a>);

impl<'a> NavSat<'a> {
    pub const HEADER_SIZE: usize = 8;
    pub const BLOCK_SIZE: usize = 12;
    pub const NUM_SVS_OFFSET: usize = 5;

    pub const fn size_of(num_svs: u8) -> usize {
        Self::HEADER_SIZE + Self::BLOCK_SIZE * num_svs as usize
    }

    pub fn num_satellites(&self) -> u8 {
        self.0.u8(Self::NUM_SVS_OFFSET)
    }
}

#[cfg(test)]
pub fn payload(itow: u32, num_svs: u8) -> std::vec::Vec<u8> {
    let mut bytes = std::vec![0u8; NavSat::size_of(num_svs)];
    bytes[0..4].copy_from_slice(&itow.to_le_bytes());
    bytes[4] = 1;
    bytes[NavSat::NUM_SVS_OFFSET] = num_svs;
    bytes
}

mod test {
    #[test]
    fn test_ubx_nav_sat() {
        use super::{payload, NavSat};
        use crate::protocol::serial::gnss::ubx::message::Fields;

        assert_eq!(NavSat::size_of(0), 8);
        assert_eq!(NavSat::size_of(255), 3068);

        let bytes = payload(2000, 14);
        let nav_sat = NavSat(Fields(&bytes));
        assert_eq!(nav_sat.num_satellites(), 14);
    }
}
