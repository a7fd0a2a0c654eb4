use crate::{
    algorithm::LPF,
    config,
    protocol::serial::gnss::out::Derived,
    types::{coordinate::Position, measurement::mps_to_kmh},
};

#[derive(Copy, Clone, Debug)]
struct Reference {
    position: Position,
    time: u32, // ms
}

/// Speed and bearing by finite differencing of consecutive positions.
///
/// Samples closer than `min-interval` or further apart than `max-interval`
/// only move the reference. Instantaneous speeds above `max-speed` are
/// replaced by the current filtered speed. Bearing is only taken once the
/// filtered speed reaches `heading-speed` and the position actually moved,
/// otherwise the last bearing is kept as is.
pub struct Speedometer {
    min_interval: u32,
    max_interval: u32,
    max_speed: f32,     // m/s
    heading_speed: f32, // km/h
    speed: LPF<f32>,
    reference: Option<Reference>,
    output: Derived,
}

impl Speedometer {
    pub fn new(config: &config::Speedometer) -> Self {
        Self {
            min_interval: config.min_interval.into(),
            max_interval: config.max_interval.into(),
            max_speed: config.max_speed.into(),
            heading_speed: config.heading_speed.into(),
            speed: LPF::new(config.tau_seconds()),
            reference: None,
            output: Derived::new(),
        }
    }

    pub fn reset(&mut self) {
        self.reference = None;
        self.speed.reset();
        self.output = Derived::new();
    }

    /// `now` is the host millisecond clock, allowed to wrap.
    pub fn update(&mut self, usable: bool, position: Position, now: u32) -> Derived {
        if !usable {
            if self.reference.is_some() {
                debug!("Speedometer reset on fix loss");
            }
            self.reset();
            return self.output;
        }

        let reference = match self.reference.replace(Reference { position, time: now }) {
            Some(reference) => reference,
            None => {
                self.speed.reset();
                self.output = Derived::new();
                return self.output;
            }
        };

        let interval = now.wrapping_sub(reference.time);
        if interval < self.min_interval || interval > self.max_interval {
            trace!("Speedometer skip sample after {}ms", interval);
            return self.output;
        }

        let dt = interval as f32 / 1000.0;
        let displacement = position - reference.position;
        let mut speed = displacement.distance() / dt;
        if speed > self.max_speed {
            debug!("Speedometer reject implausible speed {}m/s", speed);
            speed = self.speed.value();
        }
        let speed = self.speed.filter(speed, dt);
        self.output.speed_mps = speed;
        self.output.speed_kmh = mps_to_kmh(speed);
        if self.output.speed_kmh >= self.heading_speed && displacement.distance() > 0.0 {
            self.output.heading = displacement.bearing();
            self.output.heading_valid = true;
        }
        self.output
    }
}

mod test {
    #[cfg(test)]
    fn speedometer() -> super::Speedometer {
        super::Speedometer::new(&Default::default())
    }

    #[test]
    fn test_first_sample_is_reference() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        let output = speedometer.update(true, Position::new(100_000_000, 200_000_000), 0);
        assert_eq!(output.speed_mps, 0.0);
        assert!(!output.heading_valid);
    }

    #[test]
    fn test_implausible_first_delta() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        speedometer.update(true, Position::new(100_000_000, 200_000_000), 0);
        let output = speedometer.update(true, Position::new(100_001_000, 200_000_000), 100);
        assert_eq!(output.speed_mps, 0.0);
        assert!(!output.heading_valid);

        // Reference moved, a small step from the new position is accepted
        let output = speedometer.update(true, Position::new(100_001_050, 200_000_000), 200);
        assert!(output.speed_mps > 1.0);
        assert!(output.heading_valid);
    }

    #[test]
    fn test_outlier_clamp() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        speedometer.update(true, Position::new(0, 0), 0);
        let before = speedometer.update(true, Position::new(50, 0), 100);
        assert!(before.speed_mps > 0.0);
        let after = speedometer.update(true, Position::new(5_000, 0), 200);
        assert_eq!(after.speed_mps, before.speed_mps);
        assert_eq!(after.speed_kmh, before.speed_kmh);
    }

    #[test]
    fn test_gap_too_short() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        speedometer.update(true, Position::new(0, 0), 0);
        let before = speedometer.update(true, Position::new(50, 0), 100);
        let output = speedometer.update(true, Position::new(60, 0), 105);
        assert_eq!(output, before);

        // Measured from the skipped sample, not from the older one
        let output = speedometer.update(true, Position::new(60, 0), 205);
        assert!(output.speed_mps < before.speed_mps);
    }

    #[test]
    fn test_gap_too_long() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        speedometer.update(true, Position::new(0, 0), 0);
        let before = speedometer.update(true, Position::new(50, 0), 100);
        let output = speedometer.update(true, Position::new(5_000, 0), 1100);
        assert_eq!(output, before);

        let output = speedometer.update(true, Position::new(5_000, 0), 1200);
        assert!(output.speed_mps < before.speed_mps);
    }

    #[test]
    fn test_heading_gate() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        speedometer.update(true, Position::new(0, 0), 0);
        let output = speedometer.update(true, Position::new(0, 0), 100);
        assert_eq!(output.speed_mps, 0.0);
        assert!(!output.heading_valid);

        let output = speedometer.update(true, Position::new(50, 50), 200);
        assert!(output.speed_kmh >= 2.0);
        assert!(output.heading_valid);
        assert!((output.heading - 45.0).abs() < 0.1);

        // Standing still again keeps the last bearing
        let mut output = output;
        for i in 3..10 {
            output = speedometer.update(true, Position::new(50, 50), i * 100);
        }
        assert!(output.speed_kmh < 2.0);
        assert!(output.heading_valid);
        assert!((output.heading - 45.0).abs() < 0.1);
    }

    #[test]
    fn test_stop_while_speed_decays() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        speedometer.update(true, Position::new(0, 0), 0);
        let moving = speedometer.update(true, Position::new(50, 50), 100);
        assert!(moving.heading_valid);
        assert!((moving.heading - 45.0).abs() < 0.1);

        // No displacement, the filtered speed is still above the gate
        let stopped = speedometer.update(true, Position::new(50, 50), 200);
        assert!(stopped.speed_kmh >= 2.0);
        assert!(stopped.speed_kmh < moving.speed_kmh);
        assert!(stopped.heading_valid);
        assert_eq!(stopped.heading, moving.heading);
    }

    #[test]
    fn test_fix_loss_reset() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        speedometer.update(true, Position::new(0, 0), 0);
        let output = speedometer.update(true, Position::new(0, 50), 100);
        assert!(output.speed_mps > 0.0);
        assert!((output.heading - 90.0).abs() < 0.1);

        let output = speedometer.update(false, Position::new(0, 100), 200);
        assert_eq!(output.speed_mps, 0.0);
        assert_eq!(output.speed_kmh, 0.0);
        assert!(!output.heading_valid);

        // Back to a usable fix starts over from a fresh reference
        let output = speedometer.update(true, Position::new(0, 100), 300);
        assert_eq!(output.speed_mps, 0.0);
        assert!(!output.heading_valid);
    }

    #[test]
    fn test_clock_wrap() {
        use crate::types::coordinate::Position;

        let mut speedometer = speedometer();
        speedometer.update(true, Position::new(0, 0), u32::MAX - 49);
        let output = speedometer.update(true, Position::new(0, 50), 50);
        assert!(output.speed_mps > 0.0);
    }

    #[test]
    fn test_steady_motion_converges() {
        use crate::types::coordinate::{Position, EARTH_RADIUS, RADIANS_PER_UNIT};

        let mut speedometer = speedometer();
        let mut output = speedometer.update(true, Position::new(0, 0), 0);
        for i in 1..=50 {
            output = speedometer.update(true, Position::new(0, i * 20), i as u32 * 100);
        }
        // 20 units of longitude at the equator every 100ms
        let expected = 20.0 * RADIANS_PER_UNIT * EARTH_RADIUS / 0.1;
        assert!((output.speed_mps - expected).abs() < 0.01);
        assert!((output.heading - 90.0).abs() < 0.1);
    }
}
