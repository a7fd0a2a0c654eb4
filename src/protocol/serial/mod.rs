use embedded_hal::serial::Read;

pub mod gnss;

pub trait Receiver {
    fn feed(&mut self, byte: u8);

    fn receive(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&byte| self.feed(byte));
    }

    fn reset(&mut self);
}

/// Feeds every byte the port holds to `receiver`, returns the number of
/// bytes consumed. Port errors such as overrun leave a hole in the stream
/// so the frame in flight is dropped.
pub fn drain<S, R>(serial: &mut S, receiver: &mut R) -> usize
where
    S: Read<u8>,
    R: Receiver + ?Sized,
{
    let mut count = 0;
    loop {
        match serial.read() {
            Ok(byte) => {
                receiver.feed(byte);
                count += 1;
            }
            Err(nb::Error::WouldBlock) => return count,
            Err(nb::Error::Other(_)) => {
                trace!("Serial read error, reset receiver");
                receiver.reset();
            }
        }
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::VecDeque;

    /// Serial port replaying a script; `None` entries produce a read error.
    pub struct Serial(pub VecDeque<Option<u8>>);

    impl Serial {
        pub fn new(bytes: &[u8]) -> Self {
            Self(bytes.iter().map(|&b| Some(b)).collect())
        }
    }

    impl embedded_hal::serial::Read<u8> for Serial {
        type Error = ();

        fn read(&mut self) -> nb::Result<u8, ()> {
            match self.0.pop_front() {
                Some(Some(byte)) => Ok(byte),
                Some(None) => Err(nb::Error::Other(())),
                None => Err(nb::Error::WouldBlock),
            }
        }
    }
}

mod test {
    #[cfg(test)]
    #[derive(Default)]
    struct Recorder {
        bytes: std::vec::Vec<u8>,
        resets: usize,
    }

    #[cfg(test)]
    impl super::Receiver for Recorder {
        fn feed(&mut self, byte: u8) {
            self.bytes.push(byte)
        }

        fn reset(&mut self) {
            self.resets += 1
        }
    }

    #[test]
    fn test_drain() {
        use super::{drain, mock::Serial};

        let mut serial = Serial::new(&[1, 2, 3]);
        serial.0.insert(1, None);
        let mut recorder = Recorder::default();
        assert_eq!(drain(&mut serial, &mut recorder), 3);
        assert_eq!(recorder.bytes, [1, 2, 3]);
        assert_eq!(recorder.resets, 1);
        assert_eq!(drain(&mut serial, &mut recorder), 0);
    }

    #[test]
    fn test_receive_slice() {
        use super::Receiver;

        let mut recorder = Recorder::default();
        recorder.receive(&[0xB5, 0x62]);
        assert_eq!(recorder.bytes, [0xB5, 0x62]);
    }
}
