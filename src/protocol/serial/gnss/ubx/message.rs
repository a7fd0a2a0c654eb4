use super::{hnr_pvt::HnrPvt, nav_pvt::NavPvt, nav_sat::NavSat};

pub const UBX_HEADER0: u8 = 0xB5;
pub const UBX_HEADER1: u8 = 0x62;
pub const MAX_PAYLOAD_SIZE: usize = 400;

/// 8-bit Fletcher sum over class, id, length and payload.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Checksum {
    a: u8,
    b: u8,
}

impl Checksum {
    pub fn update(&mut self, byte: u8) {
        self.a = self.a.wrapping_add(byte);
        self.b = self.b.wrapping_add(self.a);
    }

    pub fn value(&self) -> (u8, u8) {
        (self.a, self.b)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PayloadType {
    HnrPvt,
    NavPvt,
    NavSat,
}

impl PayloadType {
    pub fn try_from(class: u8, id: u8) -> Option<Self> {
        match (class, id) {
            (0x28, 0x00) => Some(Self::HnrPvt),
            (0x01, 0x07) => Some(Self::NavPvt),
            (0x01, 0x35) => Some(Self::NavSat),
            _ => None,
        }
    }

    /// Whether `payload` has exactly the shape this message type declares.
    pub fn accepts(self, payload: &[u8]) -> bool {
        match self {
            Self::HnrPvt => payload.len() == HnrPvt::SIZE,
            Self::NavPvt => payload.len() == NavPvt::SIZE,
            Self::NavSat => match payload.get(NavSat::NUM_SVS_OFFSET) {
                Some(&num_svs) => payload.len() == NavSat::size_of(num_svs),
                None => false,
            },
        }
    }
}

/// Positional little-endian reader over a payload. Reads past the end yield
/// zero, shapes are checked before any accessor runs.
#[derive(Copy, Clone, Debug)]
pub struct Fields<'a>(pub &'a [u8]);

impl<'a> Fields<'a> {
    fn bytes<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut bytes = [0u8; N];
        if let Some(slice) = self.0.get(offset..offset + N) {
            bytes.copy_from_slice(slice);
        }
        bytes
    }

    pub fn u8(&self, offset: usize) -> u8 {
        self.0.get(offset).copied().unwrap_or_default()
    }

    pub fn u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes(self.bytes(offset))
    }

    pub fn u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.bytes(offset))
    }

    pub fn i32(&self, offset: usize) -> i32 {
        i32::from_le_bytes(self.bytes(offset))
    }
}

/// A checksum-valid frame, borrowing the decoder's payload buffer.
#[derive(Copy, Clone, Debug)]
pub struct Frame<'a> {
    pub class: u8,
    pub id: u8,
    pub payload: &'a [u8],
}

#[derive(Copy, Clone, Debug)]
pub enum Message<'a> {
    HnrPvt(HnrPvt<'a>),
    NavPvt(NavPvt<'a>),
    NavSat(NavSat<'a>),
    /// Known class and id whose length does not match the layout
    Malformed(PayloadType),
    Unknown { class: u8, id: u8 },
}

impl<'a> Frame<'a> {
    pub fn payload_type(&self) -> Option<PayloadType> {
        PayloadType::try_from(self.class, self.id)
    }

    pub fn message(&self) -> Message<'a> {
        let payload_type = match self.payload_type() {
            Some(payload_type) => payload_type,
            None => return Message::Unknown { class: self.class, id: self.id },
        };
        if !payload_type.accepts(self.payload) {
            return Message::Malformed(payload_type);
        }
        let fields = Fields(self.payload);
        match payload_type {
            PayloadType::HnrPvt => Message::HnrPvt(HnrPvt(fields)),
            PayloadType::NavPvt => Message::NavPvt(NavPvt(fields)),
            PayloadType::NavSat => Message::NavSat(NavSat(fields)),
        }
    }
}

/// Wraps `payload` into a complete wire frame.
#[cfg(test)]
pub fn encode(class: u8, id: u8, payload: &[u8]) -> std::vec::Vec<u8> {
    let mut bytes = std::vec![UBX_HEADER0, UBX_HEADER1, class, id];
    bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    bytes.extend_from_slice(payload);
    let mut checksum = Checksum::default();
    bytes[2..].iter().for_each(|&b| checksum.update(b));
    let (a, b) = checksum.value();
    bytes.push(a);
    bytes.push(b);
    bytes
}

mod test {
    #[test]
    fn test_checksum() {
        use super::Checksum;

        let mut checksum = Checksum::default();
        [0x01, 0x07, 0x00, 0x00].iter().for_each(|&b| checksum.update(b));
        assert_eq!(checksum.value(), (0x08, 0x19));
    }

    #[test]
    fn test_fields() {
        use super::Fields;

        let fields = Fields(&[0x86, 0xBE, 0x2F, 0xFF, 0xE0, 0x07]);
        assert_eq!(fields.i32(0), -13648250);
        assert_eq!(fields.u16(4), 2016);
        assert_eq!(fields.u8(5), 0x07);
        assert_eq!(fields.u32(4), 0);
        assert_eq!(fields.u8(6), 0);
    }

    #[test]
    fn test_message_shape() {
        use super::{Frame, Message, PayloadType};

        let payload = [0u8; 92];
        let frame = Frame { class: 0x01, id: 0x07, payload: &payload };
        assert!(matches!(frame.message(), Message::NavPvt(_)));

        let frame = Frame { class: 0x01, id: 0x07, payload: &payload[..91] };
        assert!(matches!(frame.message(), Message::Malformed(PayloadType::NavPvt)));

        let frame = Frame { class: 0x28, id: 0x00, payload: &payload[..72] };
        assert!(matches!(frame.message(), Message::HnrPvt(_)));

        let frame = Frame { class: 0x0A, id: 0x04, payload: &payload };
        assert!(matches!(frame.message(), Message::Unknown { class: 0x0A, id: 0x04 }));
    }

    #[test]
    fn test_nav_sat_shape() {
        use super::{Frame, Message, PayloadType};

        let mut payload = [0u8; 8 + 12 * 2];
        payload[5] = 2;
        let frame = Frame { class: 0x01, id: 0x35, payload: &payload };
        assert!(matches!(frame.message(), Message::NavSat(_)));

        payload[5] = 3;
        let frame = Frame { class: 0x01, id: 0x35, payload: &payload };
        assert!(matches!(frame.message(), Message::Malformed(PayloadType::NavSat)));

        let frame = Frame { class: 0x01, id: 0x35, payload: &payload[..4] };
        assert!(matches!(frame.message(), Message::Malformed(PayloadType::NavSat)));
    }
}
