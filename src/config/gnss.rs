use super::pathset::{Error, Path, PathSet, Value};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Speedometer {
    pub min_interval: u16, // ms
    pub max_interval: u16, // ms
    pub max_speed: u16,    // m/s, anything above is treated as a position glitch
    pub tau: u16,          // ms
    pub heading_speed: u8, // km/h
}

impl Speedometer {
    const DEFAULT: Self =
        Self { min_interval: 10, max_interval: 200, max_speed: 100, tau: 300, heading_speed: 2 };

    pub fn tau_seconds(&self) -> f32 {
        self.tau as f32 / 1000.0
    }
}

impl Default for Speedometer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PathSet for Speedometer {
    fn set(&mut self, mut path: Path, value: Value) -> Result<(), Error> {
        let default = Self::DEFAULT;
        let mut next = *self;
        match path.str()? {
            "min-interval" => next.min_interval = value.parse_or(default.min_interval)?,
            "max-interval" => next.max_interval = value.parse_or(default.max_interval)?,
            "max-speed" => next.max_speed = value.parse_or(default.max_speed)?,
            "tau" => next.tau = value.parse_or(default.tau)?,
            "heading-speed" => next.heading_speed = value.parse_or(default.heading_speed)?,
            _ => return Err(Error::UnknownPath),
        }
        if next.min_interval >= next.max_interval {
            return Err(Error::InvalidValue);
        }
        *self = next;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Heading {
    pub tau: u16,     // ms
    pub max_gap: u16, // ms of receiver time, longer gaps skip the blend
    pub min_speed: u8, // km/h
}

impl Heading {
    const DEFAULT: Self = Self { tau: 700, max_gap: 5000, min_speed: 20 };

    pub fn tau_seconds(&self) -> f32 {
        self.tau as f32 / 1000.0
    }
}

impl Default for Heading {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PathSet for Heading {
    fn set(&mut self, mut path: Path, value: Value) -> Result<(), Error> {
        let default = Self::DEFAULT;
        match path.str()? {
            "tau" => self.tau = value.parse_or(default.tau)?,
            "max-gap" => self.max_gap = value.parse_or(default.max_gap)?,
            "min-speed" => self.min_speed = value.parse_or(default.min_speed)?,
            _ => return Err(Error::UnknownPath),
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GNSS {
    /// Receiver runs the high navigation rate engine (M8U class modules)
    pub high_rate: bool,
    pub speedometer: Speedometer,
    pub heading: Heading,
}

impl Default for GNSS {
    fn default() -> Self {
        Self { high_rate: true, speedometer: Speedometer::default(), heading: Heading::default() }
    }
}

impl PathSet for GNSS {
    fn set(&mut self, mut path: Path, value: Value) -> Result<(), Error> {
        match path.str()? {
            "high-rate" => self.high_rate = value.parse_or(true)?,
            "speedometer" => return self.speedometer.set(path, value),
            "heading" => return self.heading.set(path, value),
            _ => return Err(Error::UnknownPath),
        }
        Ok(())
    }
}

mod test {
    #[test]
    fn test_default_gnss_config() {
        use super::GNSS;

        let config = GNSS::default();
        assert!(config.high_rate);
        assert_eq!(config.speedometer.min_interval, 10);
        assert_eq!(config.speedometer.max_interval, 200);
        assert_eq!(config.speedometer.tau_seconds(), 0.3);
        assert_eq!(config.heading.min_speed, 20);
    }

    #[test]
    fn test_set_by_path() {
        use super::GNSS;
        use crate::config::pathset::{Error, Path, PathSet, Value};

        let mut config = GNSS::default();
        config.set(Path::new("speedometer.max-speed"), Value::of("80")).unwrap();
        assert_eq!(config.speedometer.max_speed, 80);
        config.set(Path::new("speedometer.max-speed"), Value(None)).unwrap();
        assert_eq!(config.speedometer.max_speed, 100);

        config.set(Path::new("heading.tau"), Value::of("500")).unwrap();
        assert_eq!(config.heading.tau, 500);
        config.set(Path::new("high-rate"), Value::of("false")).unwrap();
        assert!(!config.high_rate);

        let result = config.set(Path::new("speedometer.min-interval"), Value::of("300"));
        assert_eq!(result, Err(Error::InvalidValue));
        assert_eq!(config.speedometer.min_interval, 10);

        let result = config.set(Path::new("heading.unknown"), Value::of("1"));
        assert_eq!(result, Err(Error::UnknownPath));
        let result = config.set(Path::new("heading.tau"), Value::of("-1"));
        assert_eq!(result, Err(Error::InvalidValue));
    }

    #[test]
    fn test_deserialize_partial() {
        use pretty_assertions::assert_eq;

        use super::{Heading, GNSS};

        let json = r#"{"high-rate": false, "heading": {"min-speed": 15}}"#;
        let config: GNSS = serde_json::from_str(json).unwrap();
        let expected = GNSS {
            high_rate: false,
            heading: Heading { min_speed: 15, ..Default::default() },
            ..Default::default()
        };
        assert_eq!(expected, config);
    }

    #[test]
    fn test_serialize_keys() {
        use super::GNSS;

        let value = serde_json::to_value(&GNSS::default()).unwrap();
        assert_eq!(value["speedometer"]["max-speed"], 100);
        assert_eq!(value["heading"]["max-gap"], 5000);
    }
}
