//! RINEX file classification: the header sniffer.
use crate::{common::subfield, error::Error, version::Version};
use gnss_rs::prelude::Constellation;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Blank lines tolerated before the version line.
const MAX_BLANK_LOOKAHEAD: usize = 10;

/// All record types this crate recognizes.
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Type {
    /// Observation data: phase, pseudo-range, doppler, signal strength
    #[default]
    ObservationData,
    /// Navigation (ephemeris) broadcast messages
    NavigationData,
    /// SP3 precise orbits: recognized, never decoded here
    Sp3,
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ObservationData => write!(f, "OBS"),
            Self::NavigationData => write!(f, "NAV"),
            Self::Sp3 => write!(f, "SP3"),
        }
    }
}

/// What the first header line says about a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileClass {
    pub version: Version,
    pub rinex_type: Type,
    pub constellation: Option<Constellation>,
    /// First line carries the Compact RINEX marker
    pub crinex: bool,
}

/// Classifies a text source from its first non-blank line.
pub fn classify(content: &str) -> Result<FileClass, Error> {
    let mut first = None;
    for line in content.lines().take(MAX_BLANK_LOOKAHEAD) {
        if !line.trim().is_empty() {
            first = Some(line);
            break;
        }
    }
    let line =
        first.ok_or_else(|| Error::CorruptHeader("no content within lookahead".to_string()))?;

    if line.starts_with("#c") || line.starts_with("#d") {
        return Ok(FileClass {
            version: Version::default(),
            rinex_type: Type::Sp3,
            constellation: None,
            crinex: false,
        });
    }

    if line.len() < 61 {
        return Err(Error::CorruptHeader("first line too short".to_string()));
    }

    let marker = subfield(line, 60, 20).trim();
    let crinex = marker.starts_with("CRINEX VERS");
    if !crinex && marker != "RINEX VERSION / TYPE" {
        return Err(Error::CorruptHeader(format!(
            "unexpected first label \"{}\"",
            marker
        )));
    }

    let version = Version::from_str(subfield(line, 0, 9))?;
    if crinex {
        // compact observation data: conversion happens upstream,
        // only the wrapped type is known at this point
        return Ok(FileClass {
            version,
            rinex_type: Type::ObservationData,
            constellation: None,
            crinex: true,
        });
    }
    if !version.is_supported() {
        return Err(Error::UnsupportedFormat(format!(
            "RINEX revision {}",
            version
        )));
    }

    let type_area = subfield(line, 20, 20);
    let type_char = type_area.chars().next().unwrap_or(' ');
    let rinex_type = match type_char {
        'O' | 'C' => Type::ObservationData,
        'N' => Type::NavigationData,
        _ if type_area.contains("NAV") => Type::NavigationData,
        _ => {
            return Err(Error::UnsupportedFormat(format!(
                "file type \"{}\"",
                type_area.trim()
            )))
        },
    };

    let constellation = if version.major < 3 && rinex_type == Type::NavigationData {
        // V2 NAV: the system is implied by the type letter
        match type_char {
            'N' => Some(Constellation::GPS),
            'G' => Some(Constellation::Glonass),
            'E' => Some(Constellation::Galileo),
            _ => system_letter(line),
        }
    } else {
        system_letter(line)
    };

    Ok(FileClass {
        version,
        rinex_type,
        constellation,
        crinex: false,
    })
}

// column 41 system letter, blank defaults to GPS
fn system_letter(line: &str) -> Option<Constellation> {
    let letter = subfield(line, 40, 1).trim();
    if letter.is_empty() {
        Some(Constellation::GPS)
    } else {
        Constellation::from_str(letter).ok()
    }
}
