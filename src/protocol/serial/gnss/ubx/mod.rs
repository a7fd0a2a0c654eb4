pub mod hnr_pvt;
pub mod message;
pub mod nav_pvt;
pub mod nav_sat;

use heapless::Vec;

use message::{Checksum, Frame, MAX_PAYLOAD_SIZE, UBX_HEADER0, UBX_HEADER1};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    WaitHeader0,
    WaitHeader1,
    WaitClass,
    WaitId,
    WaitLength0,
    WaitLength1,
    WaitPayload,
    WaitChecksumA,
    WaitChecksumB,
}

/// Wrapping counters, for diagnostics only.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub frames: u32,
    #[serde(rename = "checksum-errors")]
    pub checksum_errors: u32,
    pub oversize: u32,
    pub ignored: u32,
}

/// Bytes following a sync sequence: class, id, length, payload and checksum.
const FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + 6;

enum Step {
    Pending,
    Frame,
    /// The frame in flight broke, its bytes may hide another sync sequence
    Rescan,
}

/// Byte at a time UBX framer. Never blocks or allocates. Any violation drops
/// the frame in flight and hunts for the next sync sequence, starting from the
/// bytes that frame had swallowed.
pub struct UBX {
    state: State,
    class: u8,
    id: u8,
    length: usize,
    checksum: Checksum,
    checksum_a: u8,
    buffer: Vec<u8, FRAME_SIZE>,
    statistics: Statistics,
}

impl UBX {
    pub fn new() -> Self {
        Self {
            state: State::WaitHeader0,
            class: 0,
            id: 0,
            length: 0,
            checksum: Checksum::default(),
            checksum_a: 0,
            buffer: Vec::new(),
            statistics: Statistics::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    fn payload(&self) -> &[u8] {
        self.buffer.get(4..4 + self.length).unwrap_or(&[])
    }

    fn step(&mut self, byte: u8) -> Step {
        let hunting = matches!(self.state, State::WaitHeader0 | State::WaitHeader1);
        if !hunting && self.buffer.push(byte).is_err() {
            self.state = State::WaitHeader0;
            return Step::Rescan;
        }
        let (state, step) = match (self.state, byte) {
            (State::WaitHeader0, UBX_HEADER0) => (State::WaitHeader1, Step::Pending),
            (State::WaitHeader0, _) => (State::WaitHeader0, Step::Pending),
            (State::WaitHeader1, UBX_HEADER1) => {
                self.buffer.clear();
                self.checksum = Checksum::default();
                (State::WaitClass, Step::Pending)
            }
            (State::WaitHeader1, UBX_HEADER0) => (State::WaitHeader1, Step::Pending),
            (State::WaitHeader1, _) => {
                trace!("UBX lost sync at 0x{:02X}", byte);
                (State::WaitHeader0, Step::Pending)
            }
            (State::WaitClass, class) => {
                self.checksum.update(class);
                self.class = class;
                (State::WaitId, Step::Pending)
            }
            (State::WaitId, id) => {
                self.checksum.update(id);
                self.id = id;
                (State::WaitLength0, Step::Pending)
            }
            (State::WaitLength0, value) => {
                self.checksum.update(value);
                self.length = value as usize;
                (State::WaitLength1, Step::Pending)
            }
            (State::WaitLength1, value) => {
                self.checksum.update(value);
                self.length |= (value as usize) << 8;
                if self.length > MAX_PAYLOAD_SIZE {
                    trace!("UBX {:02X}-{:02X} oversize {}", self.class, self.id, self.length);
                    self.statistics.oversize = self.statistics.oversize.wrapping_add(1);
                    (State::WaitHeader0, Step::Rescan)
                } else if self.length == 0 {
                    (State::WaitChecksumA, Step::Pending)
                } else {
                    (State::WaitPayload, Step::Pending)
                }
            }
            (State::WaitPayload, value) => {
                self.checksum.update(value);
                match self.buffer.len() < 4 + self.length {
                    true => (State::WaitPayload, Step::Pending),
                    false => (State::WaitChecksumA, Step::Pending),
                }
            }
            (State::WaitChecksumA, value) => {
                self.checksum_a = value;
                (State::WaitChecksumB, Step::Pending)
            }
            (State::WaitChecksumB, value) => {
                if (self.checksum_a, value) != self.checksum.value() {
                    trace!("UBX {:02X}-{:02X} checksum mismatch", self.class, self.id);
                    self.statistics.checksum_errors =
                        self.statistics.checksum_errors.wrapping_add(1);
                    (State::WaitHeader0, Step::Rescan)
                } else {
                    self.statistics.frames = self.statistics.frames.wrapping_add(1);
                    (State::WaitHeader0, Step::Frame)
                }
            }
        };
        self.state = state;
        step
    }

    /// Feeds one received byte, handing every frame it completes to `handle`.
    ///
    /// A broken frame has its buffered bytes replayed through the framer, so
    /// several frames may complete on a single byte. `handle` returns whether
    /// the frame was of any use, unused ones are counted as ignored.
    pub fn feed<F: FnMut(Frame<'_>) -> bool>(&mut self, byte: u8, mut handle: F) {
        let mut replay: Vec<u8, FRAME_SIZE> = Vec::new();
        let mut index = 0;
        let mut byte = Some(byte);
        loop {
            let next = match replay.get(index) {
                Some(&next) => {
                    index += 1;
                    next
                }
                None => match byte.take() {
                    Some(next) => next,
                    None => return,
                },
            };
            match self.step(next) {
                Step::Pending => (),
                Step::Frame => {
                    let frame = Frame { class: self.class, id: self.id, payload: self.payload() };
                    if !handle(frame) {
                        self.statistics.ignored = self.statistics.ignored.wrapping_add(1);
                    }
                }
                Step::Rescan => {
                    // Swallowed bytes go first, then whatever was still queued
                    let mut bytes: Vec<u8, FRAME_SIZE> = Vec::new();
                    let rest = replay.get(index..).unwrap_or(&[]);
                    if bytes.extend_from_slice(&self.buffer).is_err()
                        || bytes.extend_from_slice(rest).is_err()
                    {
                        trace!("UBX rescan truncated");
                    }
                    self.buffer.clear();
                    replay = bytes;
                    index = 0;
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = State::WaitHeader0;
        self.buffer.clear();
    }
}

mod test {
    /// Feeds `bytes` one at a time, collecting class, id and payload length
    /// of every frame decoded.
    #[cfg(test)]
    fn decode(ubx: &mut super::UBX, bytes: &[u8]) -> std::vec::Vec<(u8, u8, usize)> {
        let mut frames = std::vec::Vec::new();
        for &byte in bytes.iter() {
            ubx.feed(byte, |frame| {
                frames.push((frame.class, frame.id, frame.payload.len()));
                true
            });
        }
        frames
    }

    #[test]
    fn test_nav_pvt_frame() {
        use hex_literal::hex;

        use super::{message::Message, State, UBX};

        let bytes = hex!(
            "00 00
             B5 62 01 07 5C 00
             00 00 00 00 E0 07 0A 15 16 0D 0A 04 01 00 00 00
             01 00 00 00 03 0C E0 0B 86 BE 2F FF AD 1F 21 04
             E0 F2 09 00 A0 56 09 00 01 00 00 00 01 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00
             D6 73"
        );
        let mut ubx = UBX::new();
        assert!(decode(&mut ubx, &bytes[..bytes.len() - 1]).is_empty());
        assert_eq!(ubx.state(), State::WaitChecksumB);
        let mut satellites = None;
        ubx.feed(bytes[bytes.len() - 1], |frame| {
            assert_eq!((frame.class, frame.id, frame.payload.len()), (0x01, 0x07, 92));
            match frame.message() {
                Message::NavPvt(nav_pvt) => satellites = Some(nav_pvt.num_satellites()),
                _ => panic!("expect NAV-PVT"),
            }
            true
        });
        assert_eq!(satellites, Some(11));
        assert_eq!(ubx.state(), State::WaitHeader0);
        assert_eq!(ubx.statistics().frames, 1);
    }

    #[test]
    fn test_resync_through_garbage() {
        use super::{message::encode, UBX};

        let frame = encode(0x01, 0x35, &[0u8; 8]);
        let mut stream = std::vec::Vec::new();
        stream.extend_from_slice(&[0xB5, 0xB5, 0x00, 0x62, 0xFF]);
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(&[0x62, 0xB5, 0x01]);
        stream.extend_from_slice(&frame[..7]);
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(&frame);

        let mut ubx = UBX::new();
        assert_eq!(decode(&mut ubx, &stream).len(), 3);
    }

    #[test]
    fn test_truncated_frame_followed_by_valid_frames() {
        use super::{message::encode, UBX};

        let frame = encode(0x01, 0x35, &[0u8; 8]);
        let mut stream = frame[..7].to_vec();
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(&frame);

        let mut ubx = UBX::new();
        assert_eq!(decode(&mut ubx, &stream), [(0x01, 0x35, 8), (0x01, 0x35, 8)]);
        assert_eq!(ubx.statistics().frames, 2);
        assert_eq!(ubx.statistics().checksum_errors, 1);
    }

    #[test]
    fn test_frames_swallowed_by_long_payload() {
        use super::{message::encode, UBX};

        // Declares 64 payload bytes, then four 16 byte frames fill them
        let mut stream = std::vec![0xB5, 0x62, 0x01, 0x35, 0x40, 0x00];
        let frame = encode(0x01, 0x35, &[0u8; 8]);
        (0..5).for_each(|_| stream.extend_from_slice(&frame));

        let mut ubx = UBX::new();
        assert_eq!(decode(&mut ubx, &stream).len(), 5);
        assert_eq!(ubx.statistics().checksum_errors, 1);
    }

    #[test]
    fn test_repeated_header0() {
        use super::{message::encode, State, UBX};

        let frame = encode(0x0A, 0x04, &[1, 2, 3]);
        let mut ubx = UBX::new();
        assert!(decode(&mut ubx, &[0xB5, 0xB5]).is_empty());
        assert_eq!(ubx.state(), State::WaitHeader1);
        assert_eq!(decode(&mut ubx, &frame[1..]), [(0x0A, 0x04, 3)]);
    }

    #[test]
    fn test_checksum_rejection() {
        use super::{message::encode, State, UBX};

        let mut bad = encode(0x01, 0x07, &[0u8; 92]);
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        let good = encode(0x01, 0x35, &[0u8; 8]);

        let mut ubx = UBX::new();
        assert!(decode(&mut ubx, &bad).is_empty());
        assert_eq!(ubx.state(), State::WaitHeader0);
        assert_eq!(ubx.statistics().checksum_errors, 1);
        assert_eq!(decode(&mut ubx, &good).len(), 1);
    }

    #[test]
    fn test_checksum_a_mismatch_consumes_b() {
        use super::{message::encode, State, UBX};

        let mut bad = encode(0x01, 0x35, &[0u8; 8]);
        let a = bad.len() - 2;
        bad[a] ^= 0x01;
        let mut ubx = UBX::new();
        assert!(decode(&mut ubx, &bad[..bad.len() - 1]).is_empty());
        assert_eq!(ubx.state(), State::WaitChecksumB);
        assert!(decode(&mut ubx, &bad[bad.len() - 1..]).is_empty());
        assert_eq!(ubx.state(), State::WaitHeader0);
    }

    #[test]
    fn test_oversize_length() {
        use super::{message::encode, State, UBX};

        let mut ubx = UBX::new();
        assert!(decode(&mut ubx, &[0xB5, 0x62, 0x01, 0x35, 0x91, 0x01]).is_empty());
        assert_eq!(ubx.state(), State::WaitHeader0);
        assert_eq!(ubx.statistics().oversize, 1);

        let frame = encode(0x01, 0x35, &[0u8; 8]);
        assert_eq!(decode(&mut ubx, &frame).len(), 1);
    }

    #[test]
    fn test_max_and_empty_payload() {
        use super::{message::encode, UBX};

        let mut ubx = UBX::new();
        let frame = encode(0x01, 0x35, &[0x5Au8; 400]);
        assert_eq!(decode(&mut ubx, &frame), [(0x01, 0x35, 400)]);

        let frame = encode(0x05, 0x01, &[]);
        assert_eq!(decode(&mut ubx, &frame), [(0x05, 0x01, 0)]);
    }

    #[test]
    fn test_unused_frame_is_ignored() {
        use super::{message::encode, UBX};

        let frame = encode(0x0A, 0x04, &[0u8; 40]);
        let mut ubx = UBX::new();
        frame.iter().for_each(|&byte| ubx.feed(byte, |_| false));
        assert_eq!((ubx.statistics().frames, ubx.statistics().ignored), (1, 1));
    }

    #[test]
    fn test_reset_mid_frame() {
        use super::{message::encode, State, UBX};

        let frame = encode(0x01, 0x35, &[0u8; 8]);
        let mut ubx = UBX::new();
        assert!(decode(&mut ubx, &frame[..9]).is_empty());
        assert_eq!(ubx.state(), State::WaitPayload);
        ubx.reset();
        assert_eq!(ubx.state(), State::WaitHeader0);
        assert_eq!(decode(&mut ubx, &frame).len(), 1);
    }
}
