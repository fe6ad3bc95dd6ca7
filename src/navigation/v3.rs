//! RINEX 3.x navigation record decoding.
use super::{
    orbits::{layout, reconcile, FIELD_WIDTH},
    NavRecord,
};
use crate::{
    array::MISSING,
    common::{fortran_f64, subfield},
    epoch::parse_epoch,
    error::Error,
    header::NavHeader,
    observation::parse_sv,
    Options,
};
use gnss_rs::prelude::Constellation;

pub(crate) fn parse(
    header: &NavHeader,
    body: &str,
    opts: &Options,
) -> Result<Vec<NavRecord>, Error> {
    let lines: Vec<&str> = body.lines().collect();
    let mut records = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if subfield(line, 0, 3).trim().is_empty() {
            // blank or orphan continuation
            continue;
        }
        let sv = match parse_sv(subfield(line, 0, 3), header.constellation) {
            Ok(sv) => sv,
            Err(_) => {
                log::warn!("skipping unparseable record start \"{}\"", line.trim_end());
                continue;
            },
        };
        let layout = layout(3, sv.constellation)?;

        let epoch = match parse_epoch(subfield(line, 4, 19)) {
            Ok(e) => e,
            Err(_) => {
                log::warn!("skipping {} record with unparseable epoch", sv);
                i += layout.lines;
                continue;
            },
        };
        // broadcast records come in no particular order, filtered
        // records are skipped rather than ending the scan
        if !wanted(sv.constellation, opts) || !in_window(epoch, opts) {
            i += layout.lines;
            continue;
        }

        let mut raw = String::with_capacity(57 + 76 * layout.lines);
        raw.push_str(&format!("{:<57}", subfield(line, 23, 57)));
        for _ in 0..layout.lines {
            let cont = lines.get(i).copied().unwrap_or("");
            i += 1;
            raw.push_str(&format!("{:<76}", subfield(cont, 4, 76)));
        }

        let observed = (raw.trim_end().len() + FIELD_WIDTH - 1) / FIELD_WIDTH;
        let plan = reconcile(sv.constellation, observed, &layout)?;
        let mut values: Vec<f64> = (0..observed)
            .map(|k| fortran_f64(subfield(&raw, k * FIELD_WIDTH, FIELD_WIDTH)).unwrap_or(MISSING))
            .collect();
        if let Some(at) = plan.insert_blank_at {
            values.insert(at, MISSING);
        }

        records.push(NavRecord {
            sv,
            epoch,
            names: plan.names,
            values,
        });
    }
    Ok(records)
}

pub(super) fn wanted(c: Constellation, opts: &Options) -> bool {
    match &opts.constellations {
        None => true,
        Some(list) => list
            .iter()
            .any(|w| *w == c || (*w == Constellation::SBAS && c.is_sbas())),
    }
}

pub(super) fn in_window(e: hifitime::Epoch, opts: &Options) -> bool {
    match opts.tlim {
        None => true,
        Some((t0, t1)) => e >= t0 && e <= t1,
    }
}
