use core::str::{FromStr, Split};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Error {
    UnknownPath,
    ExpectValue,
    InvalidValue,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let err_string = match self {
            Self::UnknownPath => "Specified path not exists or invalid",
            Self::ExpectValue => "Expect value",
            Self::InvalidValue => "Value not valid",
        };
        write!(f, "{}", err_string)
    }
}

/// Value side of a `path=value` console assignment; `None` restores default.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Value<'a>(pub Option<&'a str>);

impl<'a> Value<'a> {
    pub fn of(string: &'a str) -> Value<'a> {
        Value(Some(string))
    }

    pub fn parse<T: FromStr>(&self) -> Result<T, Error> {
        let string = self.0.ok_or(Error::ExpectValue)?;
        T::from_str(string).map_err(|_| Error::InvalidValue)
    }

    pub fn parse_or<T: FromStr>(&self, or: T) -> Result<T, Error> {
        match self.0 {
            Some(s) => T::from_str(s).map_err(|_| Error::InvalidValue),
            None => Ok(or),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Path<'a>(Split<'a, char>);

impl<'a> Path<'a> {
    pub fn new(path: &'a str) -> Self {
        Self(path.split('.'))
    }

    pub fn str(&mut self) -> Result<&'a str, Error> {
        self.0.next().ok_or(Error::UnknownPath)
    }
}

pub trait PathSet {
    fn set(&mut self, path: Path, value: Value) -> Result<(), Error>;
}

mod test {
    #[test]
    fn test_value_parse() {
        use super::{Error, Value};

        assert_eq!(Value::of("12").parse::<u16>(), Ok(12));
        assert_eq!(Value::of("x").parse::<u16>(), Err(Error::InvalidValue));
        assert_eq!(Value(None).parse::<u16>(), Err(Error::ExpectValue));
        assert_eq!(Value(None).parse_or(7u16), Ok(7));
    }

    #[test]
    fn test_path_walk() {
        use super::{Error, Path};

        let mut path = Path::new("speedometer.tau");
        assert_eq!(path.str(), Ok("speedometer"));
        assert_eq!(path.str(), Ok("tau"));
        assert_eq!(path.str(), Err(Error::UnknownPath));
    }
}
