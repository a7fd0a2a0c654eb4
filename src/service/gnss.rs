use chrono::{naive::NaiveDateTime, Duration};
use hal::{clock::Clock, rtc::RTCWriter};
use spin::Mutex;

use crate::{
    algorithm::HeadingLPF,
    config,
    protocol::serial::gnss::{
        out::{Derived, MergedFix, UtcTime},
        FIX,
    },
    sync::{Cell, DataReader},
    sys::jiffies::Jiffies,
    types::measurement::{heading_to_degree, mms_to_mps, mps_to_kmh},
};

pub const STEP_THRESHOLD: i64 = 5000; // ms

/// Application view of the receiver, copied by value to every consumer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    pub valid: bool,
    pub time_valid: bool,
    pub utc: UtcTime,
    pub latitude: f64,  // degree
    pub longitude: f64, // degree
    pub height: f32,    // above ellipsoid, meter
    pub height_msl: f32,
    pub fix_type: u8,
    pub fix_ok: bool,
    pub satellites_used: u8,
    pub satellites_visible: u8,
    pub speed_mps: f32,
    pub speed_kmh: f32,
    pub heading: f32, // degree
    pub heading_valid: bool,
    pub ground_speed: i32,      // mm/s as reported
    pub heading_of_motion: i32, // 1e-5 degree as reported
    pub llh: Derived,
    pub host_time_ms: u32,
    pub itow: u32,
}

impl Snapshot {
    pub const fn new() -> Self {
        Self {
            valid: false,
            time_valid: false,
            utc: UtcTime::new(),
            latitude: 0.0,
            longitude: 0.0,
            height: 0.0,
            height_msl: 0.0,
            fix_type: 0,
            fix_ok: false,
            satellites_used: 0,
            satellites_visible: 0,
            speed_mps: 0.0,
            speed_kmh: 0.0,
            heading: 0.0,
            heading_valid: false,
            ground_speed: 0,
            heading_of_motion: 0,
            llh: Derived::new(),
            host_time_ms: 0,
            itow: 0,
        }
    }

    fn of(fix: &MergedFix, now: u32) -> Self {
        Self {
            valid: fix.valid,
            time_valid: fix.time_valid,
            utc: fix.utc,
            latitude: fix.position.latitude.degrees(),
            longitude: fix.position.longitude.degrees(),
            height: fix.height as f32 / 1000.0,
            height_msl: fix.height_msl as f32 / 1000.0,
            fix_type: fix.quality.fix_type.value(),
            fix_ok: fix.quality.fix_ok,
            satellites_used: fix.quality.satellites_used,
            satellites_visible: fix.quality.satellites_visible,
            ground_speed: fix.motion.ground_speed,
            heading_of_motion: fix.motion.heading_of_motion,
            llh: fix.llh,
            host_time_ms: now,
            itow: fix.itow,
            ..Self::new()
        }
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        match self.time_valid {
            true => self.utc.datetime(),
            false => None,
        }
    }

    pub fn local_datetime(&self, offset_minutes: i32) -> Option<NaiveDateTime> {
        self.datetime()?.checked_add_signed(Duration::minutes(offset_minutes.into()))
    }
}

struct TimeSync<'a> {
    writer: &'a dyn RTCWriter,
    synced: Option<(NaiveDateTime, u32)>,
}

impl<'a> TimeSync<'a> {
    fn update(&mut self, datetime: NaiveDateTime, now: u32) {
        let expected = self.synced.and_then(|(synced, at)| {
            synced.checked_add_signed(Duration::milliseconds(now.wrapping_sub(at).into()))
        });
        let drift = expected.map(|expected| (datetime - expected).num_milliseconds().abs());
        if matches!(drift, Some(drift) if drift <= STEP_THRESHOLD) {
            return;
        }
        debug!("Sync RTC to {}", datetime);
        self.writer.set_datetime(&datetime);
        self.synced = Some((datetime, now));
    }
}

/// Polled once per scheduler tick. Speed is taken from the receiver, heading
/// of motion goes through a circular low pass whose step is the elapsed
/// receiver time of week.
pub struct GpsService<'a, S, C> {
    source: S,
    clock: C,
    filter: HeadingLPF,
    max_gap: u32,
    min_speed: f32, // km/h
    last_itow: Option<u32>,
    snapshot: Snapshot,
    time_sync: Option<TimeSync<'a>>,
}

impl<'a, S: DataReader<MergedFix>, C: Clock> GpsService<'a, S, C> {
    pub fn new(config: &config::Heading, source: S, clock: C) -> Self {
        Self {
            source,
            clock,
            filter: HeadingLPF::new(config.tau_seconds()),
            max_gap: config.max_gap.into(),
            min_speed: config.min_speed.into(),
            last_itow: None,
            snapshot: Snapshot::new(),
            time_sync: None,
        }
    }

    pub fn set_rtc(&mut self, writer: &'a dyn RTCWriter) {
        self.time_sync = Some(TimeSync { writer, synced: None });
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    pub fn poll(&mut self) -> Snapshot {
        let (fix, fresh) = self.source.read();
        if !fresh {
            return self.snapshot;
        }

        let mut snapshot = Snapshot::of(&fix, self.clock.millis());
        if !fix.valid {
            if self.snapshot.valid {
                debug!("GPS snapshot invalid");
            }
            self.filter.reset();
            self.last_itow = None;
            snapshot.llh = Derived::new();
            self.snapshot = snapshot;
            return snapshot;
        }

        let dt = match self.last_itow.map(|last| fix.itow.wrapping_sub(last)) {
            Some(gap) if gap <= self.max_gap => gap as f32 / 1000.0,
            _ => 0.0,
        };
        self.last_itow = Some(fix.itow);
        let heading = self.filter.filter(heading_to_degree(fix.motion.heading_of_motion), dt);

        snapshot.speed_mps = mms_to_mps(fix.motion.ground_speed);
        snapshot.speed_kmh = mps_to_kmh(snapshot.speed_mps);
        snapshot.heading = heading;
        snapshot.heading_valid = snapshot.speed_kmh >= self.min_speed;

        if let (Some(time_sync), Some(datetime)) = (self.time_sync.as_mut(), snapshot.datetime()) {
            time_sync.update(datetime, snapshot.host_time_ms);
        }
        self.snapshot = snapshot;
        snapshot
    }
}

type Service = GpsService<'static, &'static Cell<MergedFix>, Jiffies>;

static SERVICE: Mutex<Option<Service>> = Mutex::new(None);

pub fn init(config: &config::Heading) {
    *SERVICE.lock() = Some(GpsService::new(config, &FIX, Jiffies));
}

/// Pushes valid receiver time into the board RTC when it drifts more than
/// `STEP_THRESHOLD`.
pub fn init_rtc(writer: &'static dyn RTCWriter) {
    if let Some(service) = SERVICE.lock().as_mut() {
        service.set_rtc(writer);
    }
}

pub fn poll_tick() {
    if let Some(service) = SERVICE.lock().as_mut() {
        service.poll();
    }
}

/// Last published snapshot, an invalid one before the first tick.
pub fn get_snapshot() -> Snapshot {
    SERVICE.lock().as_ref().map(|service| service.snapshot()).unwrap_or_default()
}

mod test {
    #[cfg(test)]
    fn fix(itow: u32, ground_speed: i32, heading: i32) -> super::MergedFix {
        use crate::protocol::serial::gnss::ubx::nav_pvt::{FixType, Valid};

        let mut fix = super::MergedFix::new();
        fix.valid = true;
        fix.time_valid = true;
        fix.itow = itow;
        fix.utc.year = 2021;
        fix.utc.month = 7;
        fix.utc.day = 4;
        fix.utc.hour = 12;
        fix.utc.minute = 30;
        fix.utc.second = (itow / 1000 % 60) as u8;
        fix.utc.valid = Valid(0x07);
        fix.quality.fix_type = FixType::ThreeDemension;
        fix.quality.fix_ok = true;
        fix.motion.ground_speed = ground_speed;
        fix.motion.heading_of_motion = heading;
        fix
    }

    #[test]
    fn test_no_new_data_keeps_snapshot() {
        use super::GpsService;
        use crate::{
            protocol::serial::gnss::{out::MergedFix, test_clock::TestClock},
            sync::{Cell, DataWriter},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        clock.set(100);
        cell.write(fix(0, 10_000, 9_000_000));
        let first = service.poll();
        assert!(first.valid);
        assert_eq!(first.host_time_ms, 100);

        clock.set(200);
        assert_eq!(service.poll(), first);
        assert_eq!(service.snapshot(), first);
    }

    #[test]
    fn test_speed_and_heading_gate() {
        use super::GpsService;
        use crate::{
            protocol::serial::gnss::{out::MergedFix, test_clock::TestClock},
            sync::{Cell, DataWriter},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        cell.write(fix(0, 5_555, 4_500_000));
        let snapshot = service.poll();
        assert!((snapshot.speed_mps - 5.555).abs() < 1e-4);
        assert!(snapshot.speed_kmh < 20.0);
        assert!(!snapshot.heading_valid);
        assert_eq!(snapshot.heading, 45.0);

        cell.write(fix(1000, 5_556, 4_500_000));
        let snapshot = service.poll();
        assert!(snapshot.speed_kmh >= 20.0);
        assert!(snapshot.heading_valid);
    }

    #[test]
    fn test_heading_wraps_across_north() {
        use super::GpsService;
        use crate::{
            protocol::serial::gnss::{out::MergedFix, test_clock::TestClock},
            sync::{Cell, DataWriter},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        cell.write(fix(0, 10_000, 35_000_000));
        assert_eq!(service.poll().heading, 350.0);

        cell.write(fix(1000, 10_000, 1_000_000));
        let heading = service.poll().heading;
        // alpha = 1 / (0.7 + 1), 20 degree clockwise across north
        let expected = 20.0 / 1.7 - 10.0;
        assert!((heading - expected).abs() < 0.01);
    }

    #[test]
    fn test_receiver_time_gap() {
        use super::GpsService;
        use crate::{
            protocol::serial::gnss::{out::MergedFix, test_clock::TestClock},
            sync::{Cell, DataWriter},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        cell.write(fix(0, 10_000, 0));
        service.poll();
        cell.write(fix(6000, 10_000, 9_000_000));
        assert_eq!(service.poll().heading, 0.0);

        cell.write(fix(7000, 10_000, 9_000_000));
        assert!(service.poll().heading > 0.0);
    }

    #[test]
    fn test_invalid_fix_resets_heading() {
        use super::GpsService;
        use crate::{
            protocol::serial::gnss::{out::MergedFix, test_clock::TestClock},
            sync::{Cell, DataWriter},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        cell.write(fix(0, 10_000, 1_000_000));
        service.poll();

        let mut lost = fix(1000, 10_000, 1_000_000);
        lost.valid = false;
        cell.write(lost);
        let snapshot = service.poll();
        assert!(!snapshot.valid);
        assert_eq!((snapshot.speed_mps, snapshot.speed_kmh), (0.0, 0.0));
        assert_eq!(snapshot.heading, 0.0);
        assert!(!snapshot.heading_valid);

        cell.write(fix(2000, 10_000, 20_000_000));
        assert_eq!(service.poll().heading, 200.0);
    }

    #[test]
    fn test_datetime() {
        use chrono::naive::NaiveDate;

        use super::GpsService;
        use crate::{
            protocol::serial::gnss::{out::MergedFix, test_clock::TestClock},
            sync::{Cell, DataWriter},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        cell.write(fix(45_000, 0, 0));
        let snapshot = service.poll();
        let expected = NaiveDate::from_ymd_opt(2021, 7, 4).unwrap().and_hms_opt(12, 30, 45);
        assert_eq!(snapshot.datetime(), expected);
        let expected = NaiveDate::from_ymd_opt(2021, 7, 4).unwrap().and_hms_opt(20, 30, 45);
        assert_eq!(snapshot.local_datetime(480), expected);
        let expected = NaiveDate::from_ymd_opt(2021, 7, 3).unwrap().and_hms_opt(23, 30, 45);
        assert_eq!(snapshot.local_datetime(-780), expected);

        let mut no_time = fix(46_000, 0, 0);
        no_time.time_valid = false;
        cell.write(no_time);
        assert_eq!(service.poll().datetime(), None);
    }

    #[cfg(test)]
    #[derive(Default)]
    struct RTC(spin::Mutex<std::vec::Vec<chrono::naive::NaiveDateTime>>);

    #[cfg(test)]
    impl hal::rtc::RTCWriter for RTC {
        fn set_datetime(&self, datetime: &chrono::naive::NaiveDateTime) {
            self.0.lock().push(*datetime)
        }
    }

    #[test]
    fn test_rtc_sync() {
        use chrono::naive::NaiveTime;

        use super::GpsService;
        use crate::{
            protocol::serial::gnss::{out::MergedFix, test_clock::TestClock},
            sync::{Cell, DataWriter},
        };

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let rtc = RTC::default();
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        service.set_rtc(&rtc);

        clock.set(10_000);
        cell.write(fix(45_000, 0, 0));
        service.poll();
        assert_eq!(rtc.0.lock().len(), 1);

        clock.set(11_000);
        cell.write(fix(46_000, 0, 0));
        service.poll();
        assert_eq!(rtc.0.lock().len(), 1);

        clock.set(12_000);
        cell.write(fix(57_000, 0, 0));
        service.poll();
        let synced = rtc.0.lock();
        assert_eq!(synced.len(), 2);
        assert_eq!(Some(synced[1].time()), NaiveTime::from_hms_opt(12, 30, 57));
    }

    #[test]
    fn test_fix_loss_reaches_snapshot() {
        use super::GpsService;
        use crate::protocol::serial::{
            gnss::{out::MergedFix, test_clock::TestClock, ubx, GNSSReceiver},
            Receiver,
        };
        use crate::sync::Cell;

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut receiver = GNSSReceiver::new(&Default::default(), &clock, &cell);
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        for i in 0..5 {
            clock.set(i as u32 * 100);
            let mut payload = ubx::hnr_pvt::payload(i as u32 * 100, i * 50, 0);
            payload[36..40].copy_from_slice(&6_000i32.to_le_bytes());
            receiver.receive(&ubx::message::encode(0x28, 0x00, &payload));
        }
        let snapshot = service.poll();
        assert!(snapshot.valid);
        assert!(snapshot.llh.speed_mps > 0.0);
        assert!(snapshot.heading_valid);

        let mut payload = ubx::hnr_pvt::payload(500, 250, 0);
        payload[17] = 0x0C;
        receiver.receive(&ubx::message::encode(0x28, 0x00, &payload));
        let snapshot = service.poll();
        assert!(!snapshot.valid);
        assert_eq!(snapshot.llh.speed_mps, 0.0);
        assert!(!snapshot.llh.heading_valid);
        assert_eq!(snapshot.speed_mps, 0.0);
        assert!(!snapshot.heading_valid);
    }

    #[test]
    fn test_invalid_nav_pvt_clears_llh() {
        use super::GpsService;
        use crate::protocol::serial::{
            gnss::{
                out::{Derived, MergedFix},
                test_clock::TestClock,
                ubx, GNSSReceiver,
            },
            Receiver,
        };
        use crate::sync::Cell;

        let (clock, cell) = (TestClock::default(), Cell::new(MergedFix::new()));
        let mut receiver = GNSSReceiver::new(&Default::default(), &clock, &cell);
        let mut service = GpsService::new(&Default::default(), &cell, &clock);
        for i in 0..5 {
            clock.set(i as u32 * 100);
            let payload = ubx::hnr_pvt::payload(i as u32 * 100, i * 50, 0);
            receiver.receive(&ubx::message::encode(0x28, 0x00, &payload));
        }
        assert!(service.poll().llh.heading_valid);

        // fixType 0
        clock.set(500);
        receiver.receive(&ubx::message::encode(0x01, 0x07, &[0u8; 92]));
        assert!(receiver.fix().llh.speed_mps > 0.0);
        let snapshot = service.poll();
        assert!(!snapshot.valid);
        assert_eq!(snapshot.llh, Derived::new());
        assert_eq!((snapshot.speed_mps, snapshot.heading_valid), (0.0, false));
    }

    #[test]
    #[serial_test::serial]
    fn test_global_service() {
        use super::{get_snapshot, poll_tick};
        use crate::{config, feed_byte, protocol::serial::gnss::ubx, sys::jiffies};

        crate::init(&config::GNSS::default());
        poll_tick();
        assert!(!get_snapshot().valid);

        jiffies::set(2000);
        let mut payload = ubx::hnr_pvt::payload(1000, 100_000_000, 200_000_000);
        payload[36..40].copy_from_slice(&10_000i32.to_le_bytes());
        ubx::message::encode(0x28, 0x00, &payload).iter().for_each(|&byte| feed_byte(byte));
        poll_tick();
        let snapshot = get_snapshot();
        assert!(snapshot.valid);
        assert_eq!(snapshot.host_time_ms, 2000);
        assert!((snapshot.latitude - 10.0).abs() < 1e-9);
        assert!((snapshot.longitude - 20.0).abs() < 1e-9);
        assert!((snapshot.speed_kmh - 36.0).abs() < 1e-3);
        assert!(snapshot.heading_valid);
        assert_eq!(get_snapshot(), snapshot);
    }
}
