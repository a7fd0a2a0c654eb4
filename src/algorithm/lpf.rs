use crate::types::measurement::{wrap_180, wrap_360};

/// Blend factor of a first order low pass with time constant `tau` over a
/// step of `dt`, both in seconds.
pub fn alpha(tau: f32, dt: f32) -> f32 {
    if !(dt > 0.0) {
        return 0.0;
    }
    (dt / (tau + dt)).clamp(0.0, 1.0)
}

pub struct LPF<T> {
    tau: f32,
    value: T,
}

impl LPF<f32> {
    pub fn new(tau: f32) -> Self {
        Self { tau, value: 0.0 }
    }

    pub fn filter(&mut self, sample: f32, dt: f32) -> f32 {
        self.value += alpha(self.tau, dt) * (sample - self.value);
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

/// Low pass over a circular domain in degree. The first sample seeds the
/// output; later samples move it along the shortest arc.
pub struct HeadingLPF {
    tau: f32,
    value: Option<f32>,
}

impl HeadingLPF {
    pub fn new(tau: f32) -> Self {
        Self { tau, value: None }
    }

    pub fn filter(&mut self, heading: f32, dt: f32) -> f32 {
        let heading = wrap_360(heading);
        let value = match self.value {
            Some(value) => wrap_360(value + alpha(self.tau, dt) * wrap_180(heading - value)),
            None => heading,
        };
        self.value = Some(value);
        value
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

mod test {
    #[test]
    fn test_lpf() {
        use super::LPF;

        let mut lpf = LPF::new(0.3);
        lpf.value = 3.335;
        let value0 = lpf.filter(3.295, 0.05);
        let value1 = lpf.filter(3.295, 0.05);
        assert!(3.295 < value1 && value1 < value0);
        assert_eq!(lpf.filter(1.0, 0.0), value1);
    }

    #[test]
    fn test_lpf_step_response() {
        use super::LPF;

        let mut lpf = LPF::new(0.3);
        // alpha = 0.1 / 0.4
        assert!((lpf.filter(10.0, 0.1) - 2.5).abs() < 1e-5);
        lpf.reset();
        assert_eq!(lpf.value(), 0.0);
    }

    #[test]
    fn test_heading_lpf_seeds_with_first_sample() {
        use super::HeadingLPF;

        let mut lpf = HeadingLPF::new(0.7);
        assert_eq!(lpf.value(), None);
        assert_eq!(lpf.filter(-90.0, 0.5), 270.0);
    }

    #[test]
    fn test_heading_lpf_wraps_through_north() {
        use super::HeadingLPF;

        let mut lpf = HeadingLPF::new(0.7);
        lpf.filter(350.0, 0.0);
        // alpha = 0.7 / 1.4, shortest arc is +20
        let value = lpf.filter(10.0, 0.7);
        assert!((value - 0.0).abs() < 1e-3 || (value - 360.0).abs() < 1e-3);
        let value = lpf.filter(20.0, 0.7);
        assert!((value - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_heading_lpf_holds_without_elapsed_time() {
        use super::HeadingLPF;

        let mut lpf = HeadingLPF::new(0.7);
        lpf.filter(45.0, 0.0);
        assert_eq!(lpf.filter(180.0, 0.0), 45.0);
        lpf.reset();
        assert_eq!(lpf.filter(180.0, 0.0), 180.0);
    }
}
