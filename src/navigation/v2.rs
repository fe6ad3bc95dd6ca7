//! RINEX 2.x navigation record decoding.
//!
//! V2 files carry a single constellation announced in the header, and
//! record starts identify satellites by bare PRN.
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
    Options,
};
use gnss_rs::prelude::{Constellation, SV};

pub(crate) fn parse(
    header: &NavHeader,
    body: &str,
    opts: &Options,
) -> Result<Vec<NavRecord>, Error> {
    let constellation = header.constellation.unwrap_or(Constellation::GPS);
    let layout = layout(2, constellation)?;
    let lines: Vec<&str> = body.lines().collect();
    let mut records = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;
        let prn = subfield(line, 0, 2).trim();
        if prn.is_empty() {
            continue;
        }
        let sv = match prn.parse::<u8>() {
            Ok(prn) => SV::new(constellation, prn),
            Err(_) => {
                log::warn!("skipping unparseable record start \"{}\"", line.trim_end());
                continue;
            },
        };

        let epoch = match parse_epoch(subfield(line, 2, 20)) {
            Ok(e) => e,
            Err(_) => {
                log::warn!("skipping {} record with unparseable epoch", sv);
                i += layout.lines;
                continue;
            },
        };
        if !super::v3::in_window(epoch, opts) || !super::v3::wanted(constellation, opts) {
            i += layout.lines;
            continue;
        }

        let mut raw = String::with_capacity(57 + 76 * layout.lines);
        raw.push_str(&format!("{:<57}", subfield(line, 22, 57)));
        for _ in 0..layout.lines {
            let cont = lines.get(i).copied().unwrap_or("");
            i += 1;
            raw.push_str(&format!("{:<76}", subfield(cont, 3, 76)));
        }

        let observed = (raw.trim_end().len() + FIELD_WIDTH - 1) / FIELD_WIDTH;
        let plan = reconcile(constellation, observed, &layout)?;
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
