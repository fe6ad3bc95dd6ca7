//! RINEX 3.x observation record decoding.
//!
//! Each constellation declares its own observable table, so decoding
//! runs one buffer per system and outer-joins the parts at the end.
use super::{finish, keep_epoch, parse_sv, store_cell, validate_meas, ObsBuffer, ObsSchema};
use crate::{
    array::DecodedArray,
    common::subfield,
    epoch::parse_epoch,
    error::Error,
    header::{ObsHeader, ObsTypes},
    Options,
};
use gnss_rs::prelude::Constellation;

const CELL_WIDTH: usize = 16;
/// Satellite identifier prefix of every V3 data line.
const SV_WIDTH: usize = 3;

pub(crate) fn decode(
    header: &ObsHeader,
    body: &str,
    opts: &Options,
    file_name: Option<&str>,
) -> Result<DecodedArray, Error> {
    let tables = match &header.types {
        ObsTypes::V3(tables) => tables,
        ObsTypes::V2(_) => {
            return Err(Error::CorruptHeader(
                "V2 observable table in a V3 source".to_string(),
            ))
        },
    };

    // constellation filter must select declared systems
    let selected: Vec<&(Constellation, Vec<String>)> = match &opts.constellations {
        Some(wanted) => {
            let mut selected = Vec::new();
            for c in wanted {
                match tables.iter().find(|(sys, _)| sys == c) {
                    Some(table) => selected.push(table),
                    None => {
                        return Err(Error::InvalidInput(format!(
                            "constellation {} not declared by this file",
                            c
                        )))
                    },
                }
            }
            selected
        },
        None => tables.iter().collect(),
    };
    let code_tables: Vec<&[String]> = selected.iter().map(|(_, c)| c.as_slice()).collect();
    validate_meas(opts, &code_tables)?;

    // one (schema, buffer) part per retained system
    let epoch_estimate = strict_epoch_count(body);
    let mut parts: Vec<(ObsSchema, ObsBuffer)> = Vec::new();
    for (constellation, codes) in selected {
        if let Some(schema) = ObsSchema::build(*constellation, codes, opts) {
            let buffer = ObsBuffer::new(schema.fields.clone(), epoch_estimate, None)?;
            parts.push((schema, buffer));
        }
    }
    if parts.is_empty() {
        return Err(Error::InvalidInput(
            "measurement filter selects nothing".to_string(),
        ));
    }

    let mut last_kept = None;
    let lines: Vec<&str> = body.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if !line.starts_with('>') {
            continue;
        }
        let mut tokens = line[1..].split_ascii_whitespace();
        let stamp: Vec<&str> = tokens.by_ref().take(6).collect();
        let flag = tokens.next().and_then(|f| f.parse::<u8>().ok()).unwrap_or(0);
        let nsat = tokens
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        if !matches!(flag, 0 | 1 | 5 | 6) {
            // flags 5 and 6 carry ordinary data records
            log::debug!("skipping event flag {} block of {} lines", flag, nsat);
            i += nsat;
            continue;
        }
        let epoch = match parse_epoch(&stamp.join(" ")) {
            Ok(e) => e,
            Err(_) => {
                log::warn!("skipping unparseable epoch line \"{}\"", line.trim_end());
                i += nsat;
                continue;
            },
        };
        if let Some((_, t1)) = opts.tlim {
            if epoch > t1 {
                break;
            }
        }
        if !keep_epoch(epoch, opts.tlim, opts.interval, last_kept)
            || parts.iter().any(|(_, b)| b.contains_epoch(epoch))
        {
            i += nsat;
            continue;
        }
        // every part advances together so the time axes stay aligned
        // until the final join
        for (_, buffer) in parts.iter_mut() {
            buffer.push_epoch(epoch);
        }
        last_kept = Some(epoch);

        for _ in 0..nsat {
            let data = lines.get(i).copied().unwrap_or("");
            i += 1;
            let id = subfield(data, 0, SV_WIDTH);
            let sv = match parse_sv(id, header.constellation) {
                Ok(sv) => sv,
                Err(_) => {
                    log::warn!("skipping unparseable satellite \"{}\" at {}", id, epoch);
                    continue;
                },
            };
            let part = parts
                .iter_mut()
                .find(|(schema, _)| schema.constellation == sv.constellation);
            let (schema, buffer) = match part {
                Some(part) => part,
                // filtered-out or undeclared system
                None => continue,
            };
            let slot = buffer.slot(sv);
            for (obs, route) in schema.routing.iter().enumerate() {
                store_cell(
                    buffer,
                    slot,
                    *route,
                    subfield(data, SV_WIDTH + obs * CELL_WIDTH, CELL_WIDTH),
                );
            }
        }
    }

    // outer join of the per-system parts
    let mut merged: Option<DecodedArray> = None;
    for (_, buffer) in parts {
        let part = finish(buffer, header, file_name);
        merged = Some(match merged {
            Some(acc) => acc.merge(part),
            None => part,
        });
    }
    merged.ok_or_else(|| Error::InvalidInput("measurement filter selects nothing".to_string()))
}

fn strict_epoch_count(body: &str) -> usize {
    body.lines().filter(|l| l.starts_with('>')).count().max(1)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::classify;
    use hifitime::Epoch;

    const HEADER: &str = "     3.02           OBSERVATION DATA    M: MIXED            RINEX VERSION / TYPE
G    2 C1C L1C                                              SYS / # / OBS TYPES
R    1 C1C                                                  SYS / # / OBS TYPES
  2022    03    04    00    00   00.0000000     GPS         TIME OF FIRST OBS
                                                            END OF HEADER
";

    const BODY: &str = "> 2022 03 04 00 00  0.0000000  0  3
G07  20147683.700   105870652.29708
G09  21847683.100   114803254.10107
R22  23619095.450
> 2022 03 04 00 00 30.0000000  0  2
G07  20147700.800   105870742.11408
R22  23619120.150
";

    fn obs_header() -> ObsHeader {
        let class = classify(HEADER).unwrap();
        match crate::header::Header::parse(&class, HEADER).unwrap() {
            crate::header::Header::Obs(h) => h,
            _ => unreachable!(),
        }
    }

    fn t(ss: u8) -> Epoch {
        Epoch::from_gregorian_utc(2022, 3, 4, 0, 0, ss, 0)
    }

    #[test]
    fn mixed_decode() {
        let a = decode(&obs_header(), BODY, &Options::default(), None).unwrap();
        assert_eq!(a.time, vec![t(0), t(30)]);
        assert_eq!(a.sv, vec!["G07", "G09", "R22"]);
        assert_eq!(a.fields, vec!["C1C", "L1C"]);
        assert_eq!(a.get("C1C", 0, "G09"), Some(21847683.100));
        assert_eq!(a.get("C1C", 1, "R22"), Some(23619120.150));
        assert_eq!(a.get("L1C", 1, "G07"), Some(105870742.114));
        // GLONASS never declared a phase observable
        assert!(a.get("L1C", 0, "R22").unwrap().is_nan());
        // G09 absent from the second epoch
        assert!(a.get("C1C", 1, "G09").unwrap().is_nan());
        assert_eq!(a.attrs.sv_types, Some(vec!["G".to_string(), "R".to_string()]));
    }

    #[test]
    fn constellation_filter() {
        let opts = Options::default().with_constellations(&[Constellation::GPS]);
        let a = decode(&obs_header(), BODY, &opts, None).unwrap();
        assert_eq!(a.sv, vec!["G07", "G09"]);
        assert_eq!(a.fields, vec!["C1C", "L1C"]);

        let opts = Options::default().with_constellations(&[Constellation::Galileo]);
        assert!(matches!(
            decode(&obs_header(), BODY, &opts, None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn measurement_filter_per_system() {
        let opts = Options::default().with_meas(&["L1"]);
        let a = decode(&obs_header(), BODY, &opts, None).unwrap();
        // GLONASS declares no L1 code, its part prunes away entirely
        assert_eq!(a.fields, vec!["L1C"]);
        assert_eq!(a.sv, vec!["G07", "G09"]);
    }

    #[test]
    fn event_flag_skipped() {
        let body = "> 2022 03 04 00 00  0.0000000  4  1
antenna height changed                                      COMMENT
> 2022 03 04 00 00 30.0000000  0  1
G07  20147700.800   105870742.11408
";
        let a = decode(&obs_header(), body, &Options::default(), None).unwrap();
        assert_eq!(a.time, vec![t(30)]);
        assert_eq!(a.sv, vec!["G07"]);
    }

    #[test]
    fn cycle_slip_epoch_decoded() {
        let body = "> 2022 03 04 00 00  0.0000000  0  1
G07  20147683.700   105870652.29708
> 2022 03 04 00 00 30.0000000  6  1
G07  20147700.800   105870742.11408
";
        let a = decode(&obs_header(), body, &Options::default(), None).unwrap();
        assert_eq!(a.time, vec![t(0), t(30)]);
        assert_eq!(a.get("C1C", 1, "G07"), Some(20147700.800));
    }

    #[test]
    fn window_stops_early() {
        let opts = Options::default().with_tlim(t(0), t(0));
        let a = decode(&obs_header(), BODY, &opts, None).unwrap();
        assert_eq!(a.time, vec![t(0)]);
        assert_eq!(a.sv, vec!["G07", "G09", "R22"]);
    }
}
