pub mod out;
pub mod ubx;

use embedded_hal::serial::Read;
use hal::clock::Clock;
use spin::Mutex;

use out::MergedFix;
use ubx::{hnr_pvt::HnrPvt, message::Message, nav_pvt::NavPvt, Statistics, UBX};

use super::{drain, Receiver};
use crate::{
    config,
    ins::Speedometer,
    sync::{free, Cell, DataReader, DataWriter},
    sys::jiffies::Jiffies,
};

fn merge_hnr_pvt(fix: &mut MergedFix, hnr: &HnrPvt) {
    fix.itow = hnr.itow();
    fix.utc = hnr.utc();
    fix.quality.fix_type = hnr.fix_type();
    fix.quality.fix_ok = hnr.flags().gnss_fix_ok();
    fix.position = hnr.position();
    fix.height = hnr.height();
    fix.height_msl = hnr.height_above_msl();
    fix.motion.ground_speed = hnr.ground_speed();
    fix.motion.speed = hnr.speed();
    fix.motion.heading_of_motion = hnr.heading_of_motion();
    fix.motion.heading_of_vehicle = hnr.heading_of_vehicle();
    fix.accuracy.horizontal = hnr.horizontal_accuracy();
    fix.accuracy.vertical = hnr.vertical_accuracy();
    fix.accuracy.speed = hnr.speed_accuracy();
    fix.accuracy.heading = hnr.heading_accuracy();
    fix.valid = hnr.usable();
}

fn merge_nav_pvt(fix: &mut MergedFix, nav: &NavPvt) {
    fix.itow = nav.itow();
    fix.utc = nav.utc();
    fix.time_valid = fix.utc.valid.date_and_time();
    fix.quality.fix_type = nav.fix_type();
    fix.quality.fix_ok = nav.flags1().gnss_fix_ok();
    fix.quality.satellites_used = nav.num_satellites();
    fix.quality.position_dop = nav.position_dop();
    fix.position = nav.position();
    fix.height = nav.height();
    fix.height_msl = nav.height_above_msl();
    fix.motion.ground_speed = nav.ground_speed();
    fix.motion.velocity_ned = nav.velocity_ned();
    fix.motion.heading_of_motion = nav.heading_of_motion();
    fix.motion.heading_of_vehicle = nav.heading_of_vehicle();
    fix.accuracy.horizontal = nav.horizontal_accuracy();
    fix.accuracy.vertical = nav.vertical_accuracy();
    fix.accuracy.speed = nav.speed_accuracy();
    fix.accuracy.heading = nav.heading_accuracy();
    fix.accuracy.time = nav.time_accuracy();
    fix.valid = nav.fix_type().value() >= 2;
}

/// Decodes and merges receiver output, runs entirely in the serial receive
/// interrupt. Every recognized message publishes the whole record to
/// `writer`.
pub struct GNSSReceiver<C, W> {
    ubx: UBX,
    high_rate: bool,
    fix: MergedFix,
    speedometer: Speedometer,
    clock: C,
    writer: W,
}

impl<C: Clock, W: DataWriter<MergedFix>> GNSSReceiver<C, W> {
    pub fn new(config: &config::GNSS, clock: C, writer: W) -> Self {
        Self {
            ubx: UBX::new(),
            high_rate: config.high_rate,
            fix: MergedFix::new(),
            speedometer: Speedometer::new(&config.speedometer),
            clock,
            writer,
        }
    }

    pub fn fix(&self) -> &MergedFix {
        &self.fix
    }

    pub fn statistics(&self) -> Statistics {
        self.ubx.statistics()
    }
}

impl<C: Clock, W: DataWriter<MergedFix>> Receiver for GNSSReceiver<C, W> {
    fn feed(&mut self, byte: u8) {
        let Self { ubx, high_rate, fix, speedometer, clock, writer } = self;
        ubx.feed(byte, |frame| {
            let now = clock.millis();
            let was_valid = fix.valid;
            let merged = match frame.message() {
                Message::HnrPvt(hnr) if *high_rate => {
                    merge_hnr_pvt(fix, &hnr);
                    fix.llh = speedometer.update(hnr.has_fix(), hnr.position(), now);
                    true
                }
                Message::NavPvt(nav) => {
                    merge_nav_pvt(fix, &nav);
                    true
                }
                Message::NavSat(sat) => {
                    fix.quality.satellites_visible = sat.num_satellites();
                    true
                }
                Message::Malformed(payload_type) => {
                    trace!("UBX {:?} with unexpected length", payload_type);
                    false
                }
                _ => false,
            };
            if !merged {
                trace!("UBX ignore {:02X}-{:02X}", frame.class, frame.id);
                return false;
            }

            fix.host_time_ms = now;
            if fix.valid != was_valid {
                match fix.valid {
                    true => debug!("GNSS fix acquired, type {}", fix.quality.fix_type.value()),
                    false => debug!("GNSS fix lost"),
                }
            }
            writer.write(*fix);
            true
        });
    }

    fn reset(&mut self) {
        self.ubx.reset()
    }
}

/// Latest merged record, written from interrupt context only.
pub static FIX: Cell<MergedFix> = Cell::new(MergedFix::new());

type Driver = GNSSReceiver<Jiffies, &'static Cell<MergedFix>>;

static RECEIVER: Mutex<Option<Driver>> = Mutex::new(None);

pub fn init(config: &config::GNSS) {
    let receiver = GNSSReceiver::new(config, Jiffies, &FIX);
    free(|| *RECEIVER.lock() = Some(receiver));
}

/// Interrupt context. Bytes arriving before `init` are dropped.
pub fn feed_byte(byte: u8) {
    if let Some(mut guard) = RECEIVER.try_lock() {
        if let Some(receiver) = guard.as_mut() {
            receiver.feed(byte);
        }
    }
}

/// Serial receive interrupt handler body, drains the port into the decoder.
pub fn on_serial_interrupt<S: Read<u8>>(serial: &mut S) -> usize {
    if let Some(mut guard) = RECEIVER.try_lock() {
        if let Some(receiver) = guard.as_mut() {
            return drain(serial, receiver);
        }
    }
    while !matches!(serial.read(), Err(nb::Error::WouldBlock)) {}
    0
}

/// Poll context. Copies the record and consumes its new-data flag.
pub fn get_latest_fix() -> (MergedFix, bool) {
    FIX.read()
}

pub fn statistics() -> Option<Statistics> {
    free(|| RECEIVER.lock().as_ref().map(|receiver| receiver.statistics()))
}

#[cfg(test)]
pub mod test_clock {
    /// Manually advanced millisecond clock.
    #[derive(Default)]
    pub struct TestClock(pub core::cell::Cell<u32>);

    impl TestClock {
        pub fn set(&self, millis: u32) {
            self.0.set(millis)
        }
    }

    impl hal::clock::Clock for TestClock {
        fn millis(&self) -> u32 {
            self.0.get()
        }
    }
}

mod test {
    #[cfg(test)]
    const NAV_PVT: [u8; 100] = hex_literal::hex!(
        "B5 62 01 07 5C 00
         00 00 00 00 E0 07 0A 15 16 0D 0A 04 01 00 00 00
         01 00 00 00 03 0C E0 0B 86 BE 2F FF AD 1F 21 04
         E0 F2 09 00 A0 56 09 00 01 00 00 00 01 00 00 00
         00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
         00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
         00 00 00 00 00 00 00 00 00 00 00 00
         D6 73"
    );

    #[test]
    fn test_nav_pvt_merge() {
        use super::{out::MergedFix, test_clock::TestClock, GNSSReceiver};
        use crate::{
            protocol::serial::{gnss::ubx::nav_pvt::FixType, Receiver},
            sync::{Cell, DataReader},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        clock.set(1234);
        let mut receiver = GNSSReceiver::new(&Default::default(), &clock, &cell);
        receiver.receive(&NAV_PVT);

        let (fix, fresh) = cell.read();
        assert!(fresh);
        assert!(fix.valid);
        assert!(!fix.time_valid);
        assert_eq!(fix.quality.fix_type, FixType::ThreeDemension);
        assert!(!fix.quality.fix_ok);
        assert_eq!(fix.quality.satellites_used, 11);
        assert_eq!(fix.position.latitude.0, 69279661);
        assert_eq!(fix.position.longitude.0, -13648250);
        assert_eq!((fix.height, fix.height_msl), (652000, 612000));
        assert_eq!(fix.utc.year, 2016);
        assert_eq!(fix.host_time_ms, 1234);
        assert_eq!(receiver.statistics().frames, 1);
    }

    #[test]
    fn test_nav_sat_merge_independence() {
        use pretty_assertions::assert_eq;

        use super::{out::MergedFix, test_clock::TestClock, ubx, GNSSReceiver};
        use crate::{
            protocol::serial::Receiver,
            sync::{Cell, DataReader},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut receiver = GNSSReceiver::new(&Default::default(), &clock, &cell);
        receiver.receive(&NAV_PVT);
        let (before, _) = cell.read();

        let payload = ubx::nav_sat::payload(0, 14);
        receiver.receive(&ubx::message::encode(0x01, 0x35, &payload));
        let (after, fresh) = cell.read();
        assert!(fresh);
        let mut expected = before;
        expected.quality.satellites_visible = 14;
        assert_eq!(expected, after);
    }

    #[test]
    fn test_at_most_one_consumption() {
        use super::{out::MergedFix, test_clock::TestClock, ubx, GNSSReceiver};
        use crate::{
            protocol::serial::Receiver,
            sync::{Cell, DataReader},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut receiver = GNSSReceiver::new(&Default::default(), &clock, &cell);
        for num_svs in 1..=3 {
            let payload = ubx::nav_sat::payload(0, num_svs);
            receiver.receive(&ubx::message::encode(0x01, 0x35, &payload));
        }
        let (first, fresh) = cell.read();
        assert!(fresh);
        assert_eq!(first.quality.satellites_visible, 3);
        let (second, fresh) = cell.read();
        assert!(!fresh);
        assert_eq!(first, second);
    }

    #[test]
    fn test_hnr_pvt_drives_speedometer() {
        use super::{out::MergedFix, test_clock::TestClock, ubx, GNSSReceiver};
        use crate::{
            protocol::serial::Receiver,
            sync::{Cell, DataReader},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut receiver = GNSSReceiver::new(&Default::default(), &clock, &cell);
        for i in 0..5 {
            clock.set(i as u32 * 100);
            let payload = ubx::hnr_pvt::payload(i as u32 * 100, 0, i * 50);
            receiver.receive(&ubx::message::encode(0x28, 0x00, &payload));
        }
        let (fix, fresh) = cell.read();
        assert!(fresh);
        assert!(fix.valid);
        assert!(!fix.time_valid);
        assert_eq!(fix.itow, 400);
        assert!(fix.llh.speed_mps > 1.0);
        assert!(fix.llh.heading_valid);
        assert!((fix.llh.heading - 90.0).abs() < 0.1);

        // Fix lost
        clock.set(500);
        let mut payload = ubx::hnr_pvt::payload(500, 0, 250);
        payload[17] = 0x0C;
        receiver.receive(&ubx::message::encode(0x28, 0x00, &payload));
        let (fix, fresh) = cell.read();
        assert!(fresh);
        assert!(!fix.valid);
        assert_eq!(fix.llh.speed_mps, 0.0);
        assert!(!fix.llh.heading_valid);
    }

    #[test]
    fn test_nav_pvt_does_not_drive_speedometer() {
        use super::{
            out::{Derived, MergedFix},
            test_clock::TestClock,
            GNSSReceiver,
        };
        use crate::{protocol::serial::Receiver, sync::Cell};

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut receiver = GNSSReceiver::new(&Default::default(), &clock, &cell);
        receiver.receive(&NAV_PVT);
        clock.set(100);
        receiver.receive(&NAV_PVT);
        assert_eq!(receiver.fix().llh, Derived::default());
    }

    #[test]
    fn test_high_rate_disabled() {
        use super::{out::MergedFix, test_clock::TestClock, ubx, GNSSReceiver};
        use crate::{
            config,
            protocol::serial::Receiver,
            sync::{Cell, DataReader},
        };

        let config = config::GNSS { high_rate: false, ..Default::default() };
        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut receiver = GNSSReceiver::new(&config, &clock, &cell);
        let payload = ubx::hnr_pvt::payload(0, 0, 0);
        receiver.receive(&ubx::message::encode(0x28, 0x00, &payload));
        assert!(!cell.read().1);
        assert_eq!(receiver.statistics().ignored, 1);
        assert_eq!(receiver.statistics().frames, 1);
    }

    #[test]
    fn test_ignored_frames() {
        use super::{out::MergedFix, test_clock::TestClock, ubx, GNSSReceiver};
        use crate::{
            protocol::serial::Receiver,
            sync::{Cell, DataReader},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut receiver = GNSSReceiver::new(&Default::default(), &clock, &cell);
        receiver.receive(&ubx::message::encode(0x01, 0x07, &[0u8; 91]));
        receiver.receive(&ubx::message::encode(0x0A, 0x04, &[0u8; 40]));
        receiver.receive(&ubx::message::encode(0x01, 0x35, &[0u8; 9]));
        assert!(!cell.read().1);
        assert_eq!(receiver.statistics().ignored, 3);
        assert_eq!(*receiver.fix(), MergedFix::new());
    }

    #[test]
    #[serial_test::serial]
    fn test_global_entry_points() {
        use super::{feed_byte, get_latest_fix, init, on_serial_interrupt, statistics};
        use crate::{protocol::serial::mock::Serial, sys::jiffies};

        init(&Default::default());
        get_latest_fix();
        jiffies::set(5000);
        NAV_PVT.iter().for_each(|&byte| feed_byte(byte));
        let (fix, fresh) = get_latest_fix();
        assert!(fresh);
        assert_eq!(fix.host_time_ms, 5000);
        assert!(!get_latest_fix().1);

        let mut serial = Serial::new(&NAV_PVT);
        assert_eq!(on_serial_interrupt(&mut serial), NAV_PVT.len());
        assert!(get_latest_fix().1);
        assert_eq!(statistics().map(|s| s.frames), Some(2));
    }
}
