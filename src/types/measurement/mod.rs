pub const KMH_PER_MPS: f32 = 3.6;

/// mm/s as reported by the receiver into m/s.
pub fn mms_to_mps(value: i32) -> f32 {
    value as f32 / 1000.0
}

pub fn mps_to_kmh(value: f32) -> f32 {
    value * KMH_PER_MPS
}

/// 1e-5 degree as reported by the receiver into degree.
pub fn heading_to_degree(value: i32) -> f32 {
    value as f32 / 100_000.0
}

pub fn wrap_360(degree: f32) -> f32 {
    let degree = libm::fmodf(degree, 360.0);
    let degree = if degree < 0.0 { degree + 360.0 } else { degree };
    if degree >= 360.0 {
        0.0
    } else {
        degree
    }
}

/// Shortest signed angle within [-180, 180].
pub fn wrap_180(degree: f32) -> f32 {
    let degree = wrap_360(degree);
    if degree > 180.0 {
        degree - 360.0
    } else {
        degree
    }
}

mod test {
    #[test]
    fn test_wrap_360() {
        use super::wrap_360;

        assert_eq!(wrap_360(0.0), 0.0);
        assert_eq!(wrap_360(360.0), 0.0);
        assert_eq!(wrap_360(-90.0), 270.0);
        assert_eq!(wrap_360(725.0), 5.0);
        assert!(wrap_360(-1e-6) < 360.0);
    }

    #[test]
    fn test_wrap_180() {
        use super::wrap_180;

        assert_eq!(wrap_180(350.0 - 10.0), 340.0 - 360.0);
        assert_eq!(wrap_180(10.0 - 350.0), 20.0);
        assert_eq!(wrap_180(180.0), 180.0);
        assert_eq!(wrap_180(-90.0), -90.0);
    }

    #[test]
    fn test_unit_convert() {
        use super::{heading_to_degree, mms_to_mps, mps_to_kmh};

        assert_eq!(mms_to_mps(12_000), 12.0);
        assert!((mps_to_kmh(10.0) - 36.0).abs() < 1e-4);
        assert!((heading_to_degree(-9_000_000) + 90.0).abs() < 1e-3);
    }
}
