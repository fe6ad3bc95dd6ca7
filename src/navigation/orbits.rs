//! Broadcast ephemeris layouts: field names per constellation and
//! revision, plus reconciliation of declared versus observed counts.
use crate::error::Error;
use gnss_rs::prelude::Constellation;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Width of one ephemeris value on a record line.
pub(crate) const FIELD_WIDTH: usize = 19;

/// Shape of one constellation's ephemeris block.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NavLayout {
    /// Continuation lines after the epoch line
    pub lines: usize,
    /// Field names in transmission order, clock terms first
    pub fields: &'static [&'static str],
}

static GPS_FIELDS: [&str; 29] = [
    "SVclockBias",
    "SVclockDrift",
    "SVclockDriftRate",
    "IODE",
    "Crs",
    "DeltaN",
    "M0",
    "Cuc",
    "Eccentricity",
    "Cus",
    "sqrtA",
    "Toe",
    "Cic",
    "Omega0",
    "Cis",
    "Io",
    "Crc",
    "omega",
    "OmegaDot",
    "IDOT",
    "CodesL2",
    "GPSWeek",
    "L2Pflag",
    "SVacc",
    "health",
    "TGD",
    "IODC",
    "TransTime",
    "FitIntvl",
];

static GAL_FIELDS: [&str; 31] = [
    "SVclockBias",
    "SVclockDrift",
    "SVclockDriftRate",
    "IODnav",
    "Crs",
    "DeltaN",
    "M0",
    "Cuc",
    "Eccentricity",
    "Cus",
    "sqrtA",
    "Toe",
    "Cic",
    "Omega0",
    "Cis",
    "Io",
    "Crc",
    "omega",
    "OmegaDot",
    "IDOT",
    "DataSrc",
    "GALWeek",
    "spare0",
    "SISA",
    "health",
    "BGDe5a",
    "BGDe5b",
    "TransTime",
    "spare1",
    "spare2",
    "spare3",
];

static BDS_FIELDS: [&str; 28] = [
    "SVclockBias",
    "SVclockDrift",
    "SVclockDriftRate",
    "AODE",
    "Crs",
    "DeltaN",
    "M0",
    "Cuc",
    "Eccentricity",
    "Cus",
    "sqrtA",
    "Toe",
    "Cic",
    "Omega0",
    "Cis",
    "Io",
    "Crc",
    "omega",
    "OmegaDot",
    "IDOT",
    "spare",
    "BDTWeek",
    "SVacc",
    "SatH1",
    "TGD1",
    "TGD2",
    "TransTime",
    "AODC",
];

static GLO_FIELDS: [&str; 15] = [
    "SVclockBias",
    "SVrelFreqBias",
    "MessageFrameTime",
    "X",
    "dX",
    "dX2",
    "health",
    "Y",
    "dY",
    "dY2",
    "FreqNum",
    "Z",
    "dZ",
    "dZ2",
    "AgeOpInfo",
];

static SBAS_FIELDS: [&str; 15] = [
    "SVclockBias",
    "SVrelFreqBias",
    "TransTime",
    "X",
    "dX",
    "dX2",
    "health",
    "Y",
    "dY",
    "dY2",
    "URA",
    "Z",
    "dZ",
    "dZ2",
    "IODN",
];

lazy_static! {
    static ref LAYOUTS_V3: HashMap<Constellation, NavLayout> = {
        let mut m = HashMap::new();
        m.insert(Constellation::GPS, NavLayout { lines: 7, fields: &GPS_FIELDS });
        m.insert(Constellation::QZSS, NavLayout { lines: 7, fields: &GPS_FIELDS });
        m.insert(Constellation::Galileo, NavLayout { lines: 7, fields: &GAL_FIELDS });
        m.insert(Constellation::BeiDou, NavLayout { lines: 7, fields: &BDS_FIELDS });
        m.insert(Constellation::Glonass, NavLayout { lines: 3, fields: &GLO_FIELDS });
        m.insert(Constellation::SBAS, NavLayout { lines: 3, fields: &SBAS_FIELDS });
        m
    };
    static ref LAYOUTS_V2: HashMap<Constellation, NavLayout> = {
        let mut m = HashMap::new();
        m.insert(Constellation::GPS, NavLayout { lines: 7, fields: &GPS_FIELDS });
        m.insert(Constellation::Glonass, NavLayout { lines: 3, fields: &GLO_FIELDS });
        m.insert(Constellation::Galileo, NavLayout { lines: 7, fields: &GAL_FIELDS[..28] });
        m
    };
}

/// Layout lookup by revision and constellation.
pub(crate) fn layout(major: u8, c: Constellation) -> Result<NavLayout, Error> {
    let c = if c.is_sbas() { Constellation::SBAS } else { c };
    let table = if major < 3 { &*LAYOUTS_V2 } else { &*LAYOUTS_V3 };
    table
        .get(&c)
        .copied()
        .ok_or_else(|| Error::UnsupportedFormat(format!("{} broadcast ephemeris", c)))
}

/// Field-name plan after spare-field reconciliation: the names each
/// decoded value zips against, plus the position where a missing
/// broadcast spare must be re-inserted.
#[derive(Debug, Clone)]
pub(crate) struct FieldPlan {
    pub names: Vec<&'static str>,
    pub insert_blank_at: Option<usize>,
}

/// BeiDou writers drop the second-line spare.
const BDS_SPARE_INDEX: usize = 20;

/// Matches the observed value count of one record against the declared
/// layout, applying the known writer quirks per constellation.
pub(crate) fn reconcile(
    c: Constellation,
    observed: usize,
    layout: &NavLayout,
) -> Result<FieldPlan, Error> {
    let declared = layout.fields.len();
    match c {
        Constellation::Galileo => {
            // writers truncate the trailing spares at known lengths
            let names = galileo_fields(observed)
                .ok_or(Error::SchemaMismatch(c, observed, declared))?;
            Ok(FieldPlan {
                names: names.to_vec(),
                insert_blank_at: None,
            })
        },
        Constellation::BeiDou => {
            if observed == declared {
                Ok(FieldPlan {
                    names: layout.fields.to_vec(),
                    insert_blank_at: None,
                })
            } else if observed + 1 == declared {
                Ok(FieldPlan {
                    names: layout.fields.to_vec(),
                    insert_blank_at: Some(BDS_SPARE_INDEX),
                })
            } else {
                Err(Error::SchemaMismatch(c, observed, declared))
            }
        },
        Constellation::GPS | Constellation::QZSS => {
            if observed == declared || observed == declared + 1 {
                // the occasional extra trailing value carries nothing
                Ok(FieldPlan {
                    names: layout.fields.to_vec(),
                    insert_blank_at: None,
                })
            } else if observed + 1 == declared {
                Ok(FieldPlan {
                    names: layout.fields[..observed].to_vec(),
                    insert_blank_at: None,
                })
            } else {
                Err(Error::SchemaMismatch(c, observed, declared))
            }
        },
        _ => {
            // GLONASS / SBAS blocks are uniform, tolerate a short tail
            if observed > declared {
                Err(Error::SchemaMismatch(c, observed, declared))
            } else {
                Ok(FieldPlan {
                    names: layout.fields[..observed].to_vec(),
                    insert_blank_at: None,
                })
            }
        },
    }
}

fn galileo_fields(observed: usize) -> Option<&'static [&'static str]> {
    match observed {
        31 => Some(&GAL_FIELDS),
        30 => Some(&GAL_FIELDS[..30]),
        28 => Some(&GAL_FIELDS[..28]),
        _ => None,
    }
}
