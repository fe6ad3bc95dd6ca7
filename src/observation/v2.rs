//! RINEX 2.x observation record decoding.
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
use num_integer::Integer;

/// Satellite identifiers per epoch-descriptor line.
const SVS_PER_LINE: usize = 12;
/// Observation cells per data line.
const OBS_PER_LINE: usize = 5;
const CELL_WIDTH: usize = 16;

pub(crate) fn decode(
    header: &ObsHeader,
    body: &str,
    opts: &Options,
    file_name: Option<&str>,
) -> Result<DecodedArray, Error> {
    let codes = match &header.types {
        ObsTypes::V2(codes) => codes,
        ObsTypes::V3(_) => {
            return Err(Error::CorruptHeader(
                "V3 observable tables in a V2 source".to_string(),
            ))
        },
    };
    validate_meas(opts, &[codes])?;
    let schema = ObsSchema::build(
        header.constellation.unwrap_or(Constellation::GPS),
        codes,
        opts,
    )
    .ok_or_else(|| Error::InvalidInput("measurement filter selects nothing".to_string()))?;

    let nobs = codes.len();
    let lines_per_sv = Integer::div_ceil(&nobs, &OBS_PER_LINE).max(1);
    let epoch_estimate = if opts.fast {
        fast_epoch_estimate(body, nobs)
    } else {
        None
    }
    .unwrap_or_else(|| strict_epoch_count(body));

    let mut buffer = ObsBuffer::new(schema.fields.clone(), epoch_estimate, header.num_svs)?;
    let mut last_kept = None;
    let lines: Vec<&str> = body.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if line.trim().is_empty() {
            continue;
        }
        let flag = subfield(line, 26, 3).trim().parse::<u8>().unwrap_or(0);
        let nsat = subfield(line, 29, 3).trim().parse::<usize>().unwrap_or(0);
        if !matches!(flag, 0 | 1 | 5 | 6) {
            // event block: the satellite count field holds the number
            // of header-style lines that follow; flags 5 and 6 mark
            // ordinary data epochs and decode below
            log::debug!("skipping event flag {} block of {} lines", flag, nsat);
            i += nsat;
            continue;
        }
        let sv_list_lines = Integer::div_ceil(&nsat.max(1), &SVS_PER_LINE);
        let block = (sv_list_lines - 1) + nsat * lines_per_sv;

        let epoch = match parse_epoch(subfield(line, 0, 26)) {
            Ok(e) => e,
            Err(_) => {
                log::warn!("skipping unparseable epoch line \"{}\"", line.trim_end());
                i += block;
                continue;
            },
        };
        if let Some((_, t1)) = opts.tlim {
            // observation epochs are chronological
            if epoch > t1 {
                break;
            }
        }
        if buffer.contains_epoch(epoch) {
            log::warn!("duplicated epoch {}, keeping the first block", epoch);
            i += block;
            continue;
        }
        if !keep_epoch(epoch, opts.tlim, opts.interval, last_kept) {
            i += block;
            continue;
        }

        // the satellite roster spans the descriptor line and its
        // continuations, 12 identifiers of 3 characters each
        let mut roster = String::with_capacity(sv_list_lines * 36);
        roster.push_str(&format!("{:<36}", subfield(line, 32, 36)));
        for _ in 1..sv_list_lines {
            let cont = lines.get(i).copied().unwrap_or("");
            roster.push_str(&format!("{:<36}", subfield(cont, 32, 36)));
            i += 1;
        }

        buffer.push_epoch(epoch);
        last_kept = Some(epoch);

        for s in 0..nsat {
            // one satellite row re-joined, each line padded to its
            // full 80 columns so cell offsets stay uniform
            let mut row = String::with_capacity(lines_per_sv * 80);
            for k in 0..lines_per_sv {
                row.push_str(&format!("{:<80}", lines.get(i + k).copied().unwrap_or("")));
            }
            i += lines_per_sv;

            let id = subfield(&roster, s * 3, 3);
            let sv = match parse_sv(id, header.constellation) {
                Ok(sv) => sv,
                Err(_) => {
                    log::warn!("skipping unparseable satellite \"{}\" at {}", id, epoch);
                    continue;
                },
            };
            let slot = buffer.slot(sv);
            for (obs, route) in schema.routing.iter().enumerate() {
                store_cell(&mut buffer, slot, *route, subfield(&row, obs * CELL_WIDTH, CELL_WIDTH));
            }
        }
    }

    Ok(finish(buffer, header, file_name))
}

// preallocation sizing from the first block's shape, bailing to the
// strict count when the file does not look uniform
fn fast_epoch_estimate(body: &str, nobs: usize) -> Option<usize> {
    let mut lines = body.lines();
    let first = lines.by_ref().find(|l| is_epoch_line(l))?;
    let nsat = subfield(first, 29, 3).trim().parse::<usize>().ok()?;
    if nsat == 0 || nobs == 0 {
        return None;
    }
    let continuations = Integer::div_ceil(&nsat, &SVS_PER_LINE) - 1;
    let data = lines.nth(continuations)?;
    if data.len() > CELL_WIDTH * nobs.min(OBS_PER_LINE) + 1 {
        return None;
    }
    let block = 1 + continuations + nsat * Integer::div_ceil(&nobs, &OBS_PER_LINE);
    Some(body.len() / (block * 81) + 2)
}

fn strict_epoch_count(body: &str) -> usize {
    body.lines().filter(|l| is_epoch_line(l)).count().max(1)
}

fn is_epoch_line(line: &str) -> bool {
    parse_epoch(subfield(line, 0, 26)).is_ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::classify;
    use hifitime::Epoch;

    const HEADER: &str = "     2.11           OBSERVATION DATA    M (MIXED)           RINEX VERSION / TYPE
     2    C1    L1                                          # / TYPES OF OBSERV
  2010     3     5     0     0    0.0000000     GPS         TIME OF FIRST OBS
                                                            END OF HEADER
";

    const BODY: &str = " 10  3  5  0  0  0.0000000  0  2G07R22
  20147683.700   105870652.29708
  23619095.450    -9223071.059 7
 10  3  5  0  0 30.0000000  0  2G07R22
  20147700.800   105870742.11408
  23619120.150    -9223090.214 7
";

    fn obs_header() -> ObsHeader {
        let class = classify(HEADER).unwrap();
        match crate::header::Header::parse(&class, HEADER).unwrap() {
            crate::header::Header::Obs(h) => h,
            _ => unreachable!(),
        }
    }

    fn t(ss: u8) -> Epoch {
        Epoch::from_gregorian_utc(2010, 3, 5, 0, 0, ss, 0)
    }

    #[test]
    fn minimal_scenario() {
        let a = decode(&obs_header(), BODY, &Options::default(), Some("site0640.10o")).unwrap();
        assert_eq!(a.time, vec![t(0), t(30)]);
        assert_eq!(a.sv, vec!["G07", "R22"]);
        assert_eq!(a.fields, vec!["C1", "L1"]);
        assert_eq!(a.get("C1", 0, "G07"), Some(20147683.700));
        assert_eq!(a.get("L1", 0, "G07"), Some(105870652.297));
        assert_eq!(a.get("C1", 1, "R22"), Some(23619120.150));
        assert_eq!(a.get("L1", 1, "R22"), Some(-9223090.214));
        assert_eq!(a.attrs.version, "2.11");
        assert_eq!(a.attrs.filename.as_deref(), Some("site0640.10o"));
        assert_eq!(a.attrs.interval, Some(30.0));
        assert_eq!(a.attrs.sv_types, Some(vec!["G".to_string(), "R".to_string()]));
    }

    #[test]
    fn indicator_expansion() {
        let opts = Options::default().with_indicators(true);
        let a = decode(&obs_header(), BODY, &opts, None).unwrap();
        // L1 carried both digits, C1 carried none
        assert_eq!(a.get("L1lli", 0, "G07"), Some(0.0));
        assert_eq!(a.get("L1ssi", 0, "G07"), Some(8.0));
        assert_eq!(a.get("L1ssi", 0, "R22"), Some(7.0));
        assert!(a.field_index("C1ssi").is_none());
    }

    #[test]
    fn interval_decimation() {
        let opts = Options::default().with_interval(60.0);
        let a = decode(&obs_header(), BODY, &opts, None).unwrap();
        assert_eq!(a.time, vec![t(0)]);
    }

    #[test]
    fn time_window() {
        let opts = Options::default().with_tlim(t(30), t(30));
        let a = decode(&obs_header(), BODY, &opts, None).unwrap();
        assert_eq!(a.time, vec![t(30)]);
        assert_eq!(a.get("C1", 0, "G07"), Some(20147700.800));
    }

    #[test]
    fn event_flag_skipped() {
        let body = " 10  3  5  0  0  0.0000000  4  1
site relocation note                                        COMMENT
 10  3  5  0  0 30.0000000  0  1G07
  20147700.800   105870742.11408
";
        let a = decode(&obs_header(), body, &Options::default(), None).unwrap();
        assert_eq!(a.time, vec![t(30)]);
        assert_eq!(a.sv, vec!["G07"]);
    }

    #[test]
    fn cycle_slip_epoch_decoded() {
        let body = " 10  3  5  0  0  0.0000000  0  1G07
  20147683.700   105870652.29708
 10  3  5  0  0 30.0000000  6  1G07
  20147700.800   105870742.11408
";
        let a = decode(&obs_header(), body, &Options::default(), None).unwrap();
        assert_eq!(a.time, vec![t(0), t(30)]);
        assert_eq!(a.get("C1", 1, "G07"), Some(20147700.800));
        assert_eq!(a.get("L1", 1, "G07"), Some(105870742.114));
    }

    #[test]
    fn duplicate_epoch_keeps_first() {
        let body = " 10  3  5  0  0  0.0000000  0  1G07
  20147683.700   105870652.29708
 10  3  5  0  0  0.0000000  0  1G07
  99999999.999   999999999.99908
";
        let a = decode(&obs_header(), body, &Options::default(), None).unwrap();
        assert_eq!(a.time, vec![t(0)]);
        assert_eq!(a.get("C1", 0, "G07"), Some(20147683.700));
    }

    #[test]
    fn unknown_measurement_rejected() {
        let opts = Options::default().with_meas(&["P2"]);
        assert!(matches!(
            decode(&obs_header(), BODY, &opts, None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn estimate_matches_uniform_body() {
        assert!(fast_epoch_estimate(BODY, 2).unwrap() >= 2);
        assert_eq!(strict_epoch_count(BODY), 2);
    }
}
