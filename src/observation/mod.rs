//! Observation record decoding shared machinery: per-constellation
//! field schemas and the growable epoch by field by satellite buffer.
use crate::{
    array::{canonical_sv, median_interval, sv_types, Attrs, DecodedArray, RecordKind},
    error::Error,
    header::ObsHeader,
    memory,
    Options,
};
use gnss_rs::prelude::{Constellation, SV};
use hifitime::Epoch;
use std::collections::HashMap;

mod v2;
mod v3;

pub(crate) use v2::decode as decode_v2;
pub(crate) use v3::decode as decode_v3;

/// Satellite-axis preallocation when the header stays silent.
const SV_SLOT_ESTIMATE: usize = 40;

/// Where one observable cell routes: the value field, plus the
/// indicator fields when requested.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldMap {
    pub value: usize,
    pub lli: Option<usize>,
    pub ssi: Option<usize>,
}

/// Output field list for one constellation, with per-cell routing.
#[derive(Debug, Clone)]
pub(crate) struct ObsSchema {
    pub constellation: Constellation,
    pub fields: Vec<String>,
    /// One entry per declared observable, in file order
    pub routing: Vec<FieldMap>,
}

impl ObsSchema {
    /// Builds the output schema from the declared code table, honoring
    /// the measurement filter and indicator expansion. `None` when the
    /// filter leaves nothing.
    pub fn build(constellation: Constellation, codes: &[String], opts: &Options) -> Option<Self> {
        let mut fields = Vec::new();
        let mut routing = Vec::new();
        for code in codes {
            let keep = match &opts.meas {
                Some(meas) => meas.iter().any(|m| code.starts_with(m.as_str())),
                None => true,
            };
            if !keep {
                routing.push(FieldMap {
                    value: usize::MAX,
                    lli: None,
                    ssi: None,
                });
                continue;
            }
            let value = fields.len();
            fields.push(code.clone());
            let lli = if opts.use_indicators && code.starts_with('L') {
                fields.push(format!("{}lli", code));
                Some(fields.len() - 1)
            } else {
                None
            };
            let ssi = if opts.use_indicators {
                fields.push(format!("{}ssi", code));
                Some(fields.len() - 1)
            } else {
                None
            };
            routing.push(FieldMap { value, lli, ssi });
        }
        if fields.is_empty() {
            return None;
        }
        Some(Self {
            constellation,
            fields,
            routing,
        })
    }

    /// True when this observable index survived the filter.
    pub fn keeps(&self, observable: usize) -> bool {
        self.routing
            .get(observable)
            .map(|r| r.value != usize::MAX)
            .unwrap_or(false)
    }
}

/// Epoch-major decode buffer. The satellite axis is an arena: slots
/// are handed out in first-seen order through an index map and the
/// whole buffer restrides when the arena outgrows its capacity.
#[derive(Debug)]
pub(crate) struct ObsBuffer {
    fields: Vec<String>,
    time: Vec<Epoch>,
    svs: Vec<SV>,
    index: HashMap<SV, usize>,
    sv_cap: usize,
    /// Layout `[epoch][field][sv slot]`
    values: Vec<f64>,
}

impl ObsBuffer {
    /// `epoch_estimate` sizes the preallocation; it is checked against
    /// available memory before a single value lands.
    pub fn new(
        fields: Vec<String>,
        epoch_estimate: usize,
        sv_estimate: Option<usize>,
    ) -> Result<Self, Error> {
        let sv_cap = sv_estimate.unwrap_or(SV_SLOT_ESTIMATE).max(1);
        let projected = (fields.len() * epoch_estimate * sv_cap) as u64 * 8;
        memory::check_allocation(projected)?;
        let stride = fields.len() * sv_cap;
        Ok(Self {
            fields,
            time: Vec::with_capacity(epoch_estimate),
            svs: Vec::new(),
            index: HashMap::new(),
            sv_cap,
            values: Vec::with_capacity(epoch_estimate.min(1024) * stride),
        })
    }

    /// Opens a new epoch; all satellite cells start missing.
    pub fn push_epoch(&mut self, t: Epoch) {
        self.time.push(t);
        let stride = self.fields.len() * self.sv_cap;
        self.values
            .resize(self.values.len() + stride, crate::array::MISSING);
    }

    pub fn contains_epoch(&self, t: Epoch) -> bool {
        self.time.contains(&t)
    }

    /// Arena slot for a satellite, growing the satellite axis when the
    /// arena is full.
    pub fn slot(&mut self, sv: SV) -> usize {
        if let Some(&slot) = self.index.get(&sv) {
            return slot;
        }
        if self.svs.len() == self.sv_cap {
            self.grow_sv();
        }
        let slot = self.svs.len();
        self.svs.push(sv);
        self.index.insert(sv, slot);
        slot
    }

    // restride: widen every [field][sv] plane in place, back to front
    fn grow_sv(&mut self) {
        let old_cap = self.sv_cap;
        let new_cap = old_cap * 2;
        let planes = self.time.len() * self.fields.len();
        let mut widened = vec![crate::array::MISSING; planes * new_cap];
        for p in 0..planes {
            let src = &self.values[p * old_cap..(p + 1) * old_cap];
            widened[p * new_cap..p * new_cap + old_cap].copy_from_slice(src);
        }
        self.values = widened;
        self.sv_cap = new_cap;
    }

    /// Writes one cell of the currently open epoch.
    pub fn set(&mut self, field: usize, slot: usize, value: f64) {
        let t = self.time.len() - 1;
        let i = (t * self.fields.len() + field) * self.sv_cap + slot;
        self.values[i] = value;
    }

    /// Finalizes into a field-major array with the satellite axis
    /// sorted by canonical label.
    pub fn into_array(self) -> DecodedArray {
        let mut order: Vec<usize> = (0..self.svs.len()).collect();
        let labels: Vec<String> = self
            .svs
            .iter()
            .map(|sv| canonical_sv(&sv.to_string()))
            .collect();
        order.sort_by(|&a, &b| labels[a].cmp(&labels[b]));

        let sv: Vec<String> = order.iter().map(|&s| labels[s].clone()).collect();
        let mut array = DecodedArray::new(RecordKind::Obs, self.time.clone(), sv, self.fields.clone());
        for (ns, &s) in order.iter().enumerate() {
            for t in 0..self.time.len() {
                for f in 0..self.fields.len() {
                    let i = (t * self.fields.len() + f) * self.sv_cap + s;
                    let v = self.values[i];
                    if !v.is_nan() {
                        array.set(f, t, ns, v);
                    }
                }
            }
        }
        array
    }
}

/// Attributes common to both observation decoders.
pub(crate) fn obs_attrs(header: &ObsHeader, time: &[Epoch], file_name: Option<&str>) -> Attrs {
    Attrs {
        version: header.version.to_string(),
        filename: file_name.map(str::to_string),
        rx_position: header.rx_position.map(|(x, y, z)| [x, y, z]),
        rx_geodetic: header.rx_geodetic.map(|(lat, lon, h)| [lat, lon, h]),
        interval: header.interval.or_else(|| median_interval(time)),
        time_system: header.time_system.clone(),
        ionospheric_corr: None,
        sv_types: None,
    }
}

/// Epoch retention: the time window keeps both ends, the decimation
/// interval keeps an epoch once the gap since the last kept one
/// reaches the requested cadence.
pub(crate) fn keep_epoch(
    t: Epoch,
    tlim: Option<(Epoch, Epoch)>,
    interval: Option<f64>,
    last_kept: Option<Epoch>,
) -> bool {
    if let Some((t0, t1)) = tlim {
        if t < t0 || t > t1 {
            return false;
        }
    }
    if let (Some(dt), Some(last)) = (interval, last_kept) {
        // small tolerance against sub-second epoch jitter
        if (t - last).to_seconds() + 1.0e-5 < dt {
            return false;
        }
    }
    true
}

/// Rejects measurement prefixes that select nothing from the declared
/// code tables: a silent empty result would hide a typo.
pub(crate) fn validate_meas(opts: &Options, tables: &[&[String]]) -> Result<(), Error> {
    if let Some(meas) = &opts.meas {
        for m in meas {
            let present = tables
                .iter()
                .any(|codes| codes.iter().any(|c| c.starts_with(m.as_str())));
            if !present {
                return Err(Error::InvalidInput(format!(
                    "measurement \"{}\" not declared by this file",
                    m
                )));
            }
        }
    }
    Ok(())
}

/// Satellite identifier with a constellation fallback for V2 sources
/// that omit the system letter.
pub(crate) fn parse_sv(id: &str, fallback: Option<Constellation>) -> Result<SV, Error> {
    let t = id.trim();
    match t.chars().next() {
        None => Err(Error::InvalidInput("blank satellite identifier".to_string())),
        Some(c) if c.is_ascii_digit() => {
            let prn = t
                .parse::<u8>()
                .map_err(|_| Error::InvalidInput(format!("satellite identifier \"{}\"", id)))?;
            let constellation = match fallback {
                Some(c) if c != Constellation::Mixed => c,
                _ => Constellation::GPS,
            };
            Ok(SV::new(constellation, prn))
        },
        _ => Ok(t.parse::<SV>()?),
    }
}

/// One 16-character cell: F14.3 value, loss-of-lock digit, strength digit.
pub(crate) fn store_cell(buffer: &mut ObsBuffer, slot: usize, route: FieldMap, cell: &str) {
    if route.value == usize::MAX {
        return;
    }
    if let Some(v) = crate::common::fortran_f64(crate::common::subfield(cell, 0, 14)) {
        buffer.set(route.value, slot, v);
    }
    if let Some(f) = route.lli {
        if let Some(d) = indicator(crate::common::subfield(cell, 14, 1)) {
            buffer.set(f, slot, d);
        }
    }
    if let Some(f) = route.ssi {
        if let Some(d) = indicator(crate::common::subfield(cell, 15, 1)) {
            buffer.set(f, slot, d);
        }
    }
}

// blank indicators stay missing, never zero
fn indicator(s: &str) -> Option<f64> {
    s.trim().parse::<u8>().ok().map(f64::from)
}

/// Finalizes one buffer: attributes attached, all-missing planes pruned.
pub(crate) fn finish(
    buffer: ObsBuffer,
    header: &ObsHeader,
    file_name: Option<&str>,
) -> DecodedArray {
    let mut array = buffer.into_array();
    array.attrs = obs_attrs(header, &array.time, file_name);
    let mut array = array.prune_missing();
    array.attrs.sv_types = sv_types(&array.sv);
    array
}
