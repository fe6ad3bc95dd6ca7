//! RINEX revision description.
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Version describes RINEX standards revisions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    /// Version major number
    pub major: u8,
    /// Version minor number
    pub minor: u8,
}

impl Default for Version {
    fn default() -> Self {
        Self { major: 3, minor: 5 }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

impl std::str::FromStr for Version {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |d: &str| {
            d.parse::<u8>()
                .map_err(|_| Error::CorruptHeader(format!("unparseable version \"{}\"", s)))
        };
        match s.split_once('.') {
            Some((major, minor)) => Ok(Self {
                major: parse(major)?,
                minor: parse(minor)?,
            }),
            None => Ok(Self {
                major: parse(s)?,
                minor: 0,
            }),
        }
    }
}

impl Version {
    /// True when this revision is decodable: 2.10 and above, any 3.x.
    pub fn is_supported(&self) -> bool {
        match self.major {
            2 => self.minor >= 10,
            3 => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parsing() {
        let v = Version::from_str("2.11").unwrap();
        assert_eq!((v.major, v.minor), (2, 11));
        let v = Version::from_str("     3.04").unwrap();
        assert_eq!((v.major, v.minor), (3, 4));
        let v = Version::from_str("3").unwrap();
        assert_eq!((v.major, v.minor), (3, 0));
        assert!(Version::from_str("x.y").is_err());
    }

    #[test]
    fn support() {
        assert!(Version { major: 2, minor: 11 }.is_supported());
        assert!(Version { major: 3, minor: 0 }.is_supported());
        assert!(!Version { major: 2, minor: 9 }.is_supported());
        assert!(!Version { major: 4, minor: 0 }.is_supported());
    }

    #[test]
    fn display() {
        assert_eq!(Version { major: 2, minor: 11 }.to_string(), "2.11");
        assert_eq!(Version { major: 3, minor: 4 }.to_string(), "3.04");
    }
}
