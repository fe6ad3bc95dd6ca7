//! Observation header decoding.
use super::{split_label, store_extra};
use crate::{
    common::{fortran_f64, subfield},
    epoch::parse_epoch,
    error::Error,
    types::FileClass,
    version::Version,
};
use gnss_rs::prelude::Constellation;
use hifitime::Epoch;
use map_3d::{ecef2geodetic, Ellipsoid};
use std::collections::HashMap;
use std::str::FromStr;

/// Observable code tables: one shared list in V2, one per system in V3.
#[derive(Debug, Clone, PartialEq)]
pub enum ObsTypes {
    V2(Vec<String>),
    V3(Vec<(Constellation, Vec<String>)>),
}

impl ObsTypes {
    /// Widest per-satellite field count across all systems.
    pub fn fmax(&self) -> usize {
        match self {
            Self::V2(codes) => codes.len(),
            Self::V3(tables) => tables.iter().map(|(_, c)| c.len()).max().unwrap_or(0),
        }
    }

    pub fn for_constellation(&self, c: Constellation) -> Option<&[String]> {
        match self {
            Self::V2(codes) => Some(codes),
            Self::V3(tables) => tables
                .iter()
                .find(|(sys, _)| *sys == c)
                .map(|(_, codes)| codes.as_slice()),
        }
    }
}

/// Everything an observation header can declare that downstream
/// decoding or the array attributes consume.
#[derive(Debug, Clone)]
pub struct ObsHeader {
    pub version: Version,
    pub constellation: Option<Constellation>,
    pub types: ObsTypes,
    /// Receiver ECEF position [m]
    pub rx_position: Option<(f64, f64, f64)>,
    /// Derived geodetic position: latitude [deg], longitude [deg], height [m]
    pub rx_geodetic: Option<(f64, f64, f64)>,
    pub interval: Option<f64>,
    pub time_of_first_obs: Option<Epoch>,
    pub time_of_last_obs: Option<Epoch>,
    pub time_system: String,
    pub num_svs: Option<usize>,
    /// Labels we carry but do not interpret
    pub extra: HashMap<String, String>,
}

impl ObsHeader {
    pub(crate) fn parse(class: &FileClass, section: &str) -> Result<Self, Error> {
        let mut v2_codes: Vec<String> = Vec::new();
        let mut v3_tables: Vec<(Constellation, Vec<String>)> = Vec::new();
        let mut saw_types = false;
        let mut rx_position = None;
        let mut rx_geodetic = None;
        let mut interval = None;
        let mut time_of_first_obs = None;
        let mut time_of_last_obs = None;
        let mut time_system = String::new();
        let mut num_svs = None;
        let mut extra = HashMap::new();
        let mut closed = false;

        for line in section.lines() {
            let (content, label) = split_label(line);
            match label {
                super::HEADER_END_MARKER => {
                    closed = true;
                    break;
                },
                "RINEX VERSION / TYPE" | "CRINEX VERS   / TYPE" | "CRINEX PROG / DATE" => {},
                "# / TYPES OF OBSERV" => {
                    saw_types = true;
                    // the count only appears on the lead line,
                    // continuations leave columns 1-6 blank
                    for code in subfield(content, 6, 54).split_ascii_whitespace() {
                        v2_codes.push(code.to_string());
                    }
                },
                "SYS / # / OBS TYPES" => {
                    saw_types = true;
                    let sys = subfield(content, 0, 1).trim();
                    let codes = subfield(content, 7, 53).split_ascii_whitespace();
                    if sys.is_empty() {
                        // continuation of the previous system
                        if let Some((_, table)) = v3_tables.last_mut() {
                            table.extend(codes.map(str::to_string));
                        }
                    } else {
                        let constellation = Constellation::from_str(sys).map_err(|_| {
                            Error::CorruptHeader(format!("unknown system \"{}\"", sys))
                        })?;
                        v3_tables.push((constellation, codes.map(str::to_string).collect()));
                    }
                },
                "APPROX POSITION XYZ" => {
                    let mut it = content.split_ascii_whitespace().filter_map(fortran_f64);
                    if let (Some(x), Some(y), Some(z)) = (it.next(), it.next(), it.next()) {
                        rx_position = Some((x, y, z));
                        let (lat, lon, h) = ecef2geodetic(x, y, z, Ellipsoid::WGS84);
                        rx_geodetic = Some((lat.to_degrees(), lon.to_degrees(), h));
                    }
                },
                "INTERVAL" => {
                    interval = fortran_f64(content);
                },
                "TIME OF FIRST OBS" | "TIME OF LAST OBS" => {
                    let epoch = parse_epoch(subfield(content, 0, 43)).ok();
                    let system = subfield(content, 43, 17).trim();
                    if !system.is_empty() {
                        time_system = system.to_string();
                    }
                    if label == "TIME OF FIRST OBS" {
                        time_of_first_obs = epoch;
                    } else {
                        time_of_last_obs = epoch;
                    }
                },
                "# OF SATELLITES" => {
                    num_svs = subfield(content, 0, 6).trim().parse::<usize>().ok();
                },
                _ => store_extra(&mut extra, label, content),
            }
        }

        if !closed {
            return Err(Error::CorruptHeader(
                "END OF HEADER marker not found".to_string(),
            ));
        }
        if !saw_types {
            let label = if class.version.major < 3 {
                "# / TYPES OF OBSERV"
            } else {
                "SYS / # / OBS TYPES"
            };
            return Err(Error::MissingMandatoryHeader(label.to_string()));
        }
        if time_of_first_obs.is_none() {
            return Err(Error::MissingMandatoryHeader(
                "TIME OF FIRST OBS".to_string(),
            ));
        }
        if time_system.is_empty() {
            time_system = "GPS".to_string();
        }

        let types = if class.version.major < 3 {
            ObsTypes::V2(v2_codes)
        } else {
            ObsTypes::V3(v3_tables)
        };

        Ok(Self {
            version: class.version,
            constellation: class.constellation,
            types,
            rx_position,
            rx_geodetic,
            interval,
            time_of_first_obs,
            time_of_last_obs,
            time_system,
            num_svs,
            extra,
        })
    }
}
