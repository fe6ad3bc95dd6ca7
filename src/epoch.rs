//! Epoch decoding helpers shared by every record variant.
use crate::error::Error;
use hifitime::Epoch;

/// Two-digit year pivot: 80..=99 belong to the 20th century.
pub(crate) fn pivot_year(y: i32) -> i32 {
    if (0..100).contains(&y) {
        if y >= 80 {
            y + 1900
        } else {
            y + 2000
        }
    } else {
        y
    }
}

/// Parses "[yy]yy mm dd hh mm ss.sssssss" epoch descriptors, in UTC.
/// Malformed decimal seconds recover as 0 rather than failing:
/// real receivers emit the occasional mangled seconds field.
pub(crate) fn parse_epoch(content: &str) -> Result<Epoch, Error> {
    let mut items = content.split_ascii_whitespace();
    let y = items
        .next()
        .and_then(|s| s.parse::<i32>().ok())
        .ok_or(Error::DateTimeParsing)?;
    let m = items
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(Error::DateTimeParsing)?;
    let d = items
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(Error::DateTimeParsing)?;
    let hh = items
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(Error::DateTimeParsing)?;
    let mm = items
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(Error::DateTimeParsing)?;
    let sec = items.next().unwrap_or("0");

    let y = pivot_year(y);
    let (ss, ns) = match sec.parse::<f64>() {
        Ok(s) if (0.0..61.0).contains(&s) => split_seconds(s),
        _ => {
            log::debug!("unparseable seconds field \"{}\", defaulting to 0", sec);
            (0, 0)
        },
    };

    Epoch::maybe_from_gregorian_utc(y, m, d, hh, mm, ss, ns).map_err(|_| Error::DateTimeParsing)
}

fn split_seconds(s: f64) -> (u8, u32) {
    let whole = s.floor();
    let mut ss = whole as u8;
    // source files encode down to 0.1 us, nanoseconds are plenty
    let mut ns = ((s - whole) * 1.0e9).round() as u32;
    if ns >= 1_000_000_000 {
        ss += 1;
        ns = 0;
    }
    (ss, ns)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn year_pivot() {
        assert_eq!(pivot_year(99), 1999);
        assert_eq!(pivot_year(0), 2000);
        assert_eq!(pivot_year(79), 2079);
        assert_eq!(pivot_year(80), 1980);
        assert_eq!(pivot_year(2021), 2021);
    }

    #[test]
    fn v2_descriptor() {
        let e = parse_epoch(" 10  3  5  0  0 30.0000000").unwrap();
        let (y, m, d, hh, mm, ss, ns) = e.to_gregorian_utc();
        assert_eq!((y, m, d, hh, mm, ss, ns), (2010, 3, 5, 0, 0, 30, 0));
    }

    #[test]
    fn v3_descriptor() {
        let e = parse_epoch("2022 03 04 11 59 59.9000000").unwrap();
        let (y, m, d, hh, mm, ss, ns) = e.to_gregorian_utc();
        assert_eq!((y, m, d, hh, mm, ss), (2022, 3, 4, 11, 59, 59));
        assert_eq!(ns, 900_000_000);
    }

    #[test]
    fn lenient_seconds() {
        let e = parse_epoch(" 99  9  2 17 51 4x.0").unwrap();
        let (y, _, _, _, _, ss, _) = e.to_gregorian_utc();
        assert_eq!(y, 1999);
        assert_eq!(ss, 0);
    }

    #[test]
    fn malformed() {
        assert!(parse_epoch("").is_err());
        assert!(parse_epoch("2022 03").is_err());
        assert!(parse_epoch("2022 13 40 99 99 0.0").is_err());
    }
}
