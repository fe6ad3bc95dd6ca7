//! Navigation (broadcast ephemeris) record decoding.
use crate::{
    array::{canonical_sv, sv_types, Attrs, DecodedArray, RecordKind},
    error::Error,
    header::NavHeader,
    Options,
};
use gnss_rs::prelude::SV;
use hifitime::Epoch;
use itertools::Itertools;
use std::collections::BTreeSet;

mod orbits;
mod v2;
mod v3;

/// One decoded ephemeris block before assembly.
#[derive(Debug, Clone)]
pub(crate) struct NavRecord {
    pub sv: SV,
    pub epoch: Epoch,
    pub names: Vec<&'static str>,
    pub values: Vec<f64>,
}

pub(crate) fn decode(
    header: &NavHeader,
    body: &str,
    opts: &Options,
    file_name: Option<&str>,
) -> Result<DecodedArray, Error> {
    let records = if header.version.major < 3 {
        v2::parse(header, body, opts)?
    } else {
        v3::parse(header, body, opts)?
    };
    Ok(assemble(header, records, file_name))
}

/// Collects loose records into the dense array: duplicate (sv, epoch)
/// blocks keep their first occurrence, axes come out sorted, fields in
/// first-appearance order.
fn assemble(header: &NavHeader, records: Vec<NavRecord>, file_name: Option<&str>) -> DecodedArray {
    let mut seen: BTreeSet<(SV, Epoch)> = BTreeSet::new();
    let mut kept = Vec::with_capacity(records.len());
    for r in records {
        if !seen.insert((r.sv, r.epoch)) {
            log::warn!("duplicated ephemeris for {} at {}, keeping the first", r.sv, r.epoch);
            continue;
        }
        kept.push(r);
    }

    let time: Vec<Epoch> = kept.iter().map(|r| r.epoch).sorted().dedup().collect();
    let sv: Vec<String> = kept
        .iter()
        .map(|r| canonical_sv(&r.sv.to_string()))
        .sorted()
        .dedup()
        .collect();
    let mut fields: Vec<String> = Vec::new();
    for r in &kept {
        for name in &r.names {
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }
    }

    let mut array = DecodedArray::new(RecordKind::Nav, time, sv, fields);
    for r in &kept {
        let t = match array.time.binary_search(&r.epoch) {
            Ok(t) => t,
            Err(_) => continue,
        };
        let label = canonical_sv(&r.sv.to_string());
        let s = match array.sv.binary_search(&label) {
            Ok(s) => s,
            Err(_) => continue,
        };
        for (name, value) in r.names.iter().zip(&r.values) {
            if value.is_nan() {
                continue;
            }
            if let Some(f) = array.field_index(name) {
                array.set(f, t, s, *value);
            }
        }
    }

    array.attrs = Attrs {
        version: header.version.to_string(),
        filename: file_name.map(str::to_string),
        rx_position: None,
        rx_geodetic: None,
        interval: None,
        // broadcast epochs are expressed in the system clock of each
        // message, no single header system applies
        time_system: "UTC".to_string(),
        ionospheric_corr: if header.iono_corrections.is_empty() {
            None
        } else {
            Some(header.iono_corrections.clone())
        },
        sv_types: None,
    };
    let mut array = array.prune_missing();
    array.attrs.sv_types = sv_types(&array.sv);
    array
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::classify;
    use gnss_rs::prelude::Constellation;

    const HEADER: &str = "     3.04           N: GNSS NAV DATA    M: MIXED            RINEX VERSION / TYPE
                                                            END OF HEADER
";

    fn nav_header() -> NavHeader {
        let class = classify(HEADER).unwrap();
        match crate::header::Header::parse(&class, HEADER).unwrap() {
            crate::header::Header::Nav(h) => h,
            _ => unreachable!(),
        }
    }

    #[test]
    fn duplicate_records_keep_first() {
        let sv = SV::new(Constellation::GPS, 7);
        let epoch = Epoch::from_gregorian_utc(2022, 3, 4, 0, 0, 0, 0);
        let records = vec![
            NavRecord {
                sv,
                epoch,
                names: vec!["SVclockBias"],
                values: vec![1.0e-5],
            },
            NavRecord {
                sv,
                epoch,
                names: vec!["SVclockBias"],
                values: vec![9.0e-5],
            },
        ];
        let a = assemble(&nav_header(), records, None);
        assert_eq!(a.get("SVclockBias", 0, "G07"), Some(1.0e-5));
    }

    #[test]
    fn field_union_in_first_appearance_order() {
        let epoch = Epoch::from_gregorian_utc(2022, 3, 4, 0, 0, 0, 0);
        let records = vec![
            NavRecord {
                sv: SV::new(Constellation::GPS, 7),
                epoch,
                names: vec!["SVclockBias", "IODE"],
                values: vec![1.0e-5, 44.0],
            },
            NavRecord {
                sv: SV::new(Constellation::Glonass, 3),
                epoch,
                names: vec!["SVclockBias", "FreqNum"],
                values: vec![2.0e-5, 5.0],
            },
        ];
        let a = assemble(&nav_header(), records, None);
        assert_eq!(a.fields, vec!["SVclockBias", "IODE", "FreqNum"]);
        assert_eq!(a.sv, vec!["G07", "R03"]);
        assert_eq!(a.get("FreqNum", 0, "R03"), Some(5.0));
        assert!(a.get("IODE", 0, "R03").unwrap().is_nan());
        assert_eq!(a.attrs.sv_types, Some(vec!["G".to_string(), "R".to_string()]));
    }
}
