//! Labeled decode product: a dense time by satellite by field cube.
use hifitime::Epoch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Missing-cell sentinel. Never zero: zero is a legal measurement.
pub const MISSING: f64 = f64::NAN;

/// Which record family an array holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Obs,
    Nav,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Obs => write!(f, "OBS"),
            Self::Nav => write!(f, "NAV"),
        }
    }
}

/// Provenance and geometry carried alongside the values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attrs {
    /// Source RINEX revision, "2.11" style
    pub version: String,
    pub filename: Option<String>,
    /// Receiver ECEF position [m]
    pub rx_position: Option<[f64; 3]>,
    /// Receiver geodetic position: latitude [deg], longitude [deg], height [m]
    pub rx_geodetic: Option<[f64; 3]>,
    /// Nominal sampling cadence [s]
    pub interval: Option<f64>,
    /// Header-declared time system, "GPS" when unstated
    pub time_system: String,
    /// Broadcast ionospheric model coefficients, keyed by model name
    pub ionospheric_corr: Option<BTreeMap<String, Vec<f64>>>,
    /// Constellation letters present, sorted, one per system
    pub sv_types: Option<Vec<String>>,
}

/// Decoded record block: every (field, time, sv) cell, missing cells
/// holding NaN. Layout is field-major then time then satellite, so a
/// single field forms one contiguous time by sv plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedArray {
    pub kind: RecordKind,
    pub time: Vec<Epoch>,
    /// Canonical satellite labels, "G07" style, sorted
    pub sv: Vec<String>,
    pub fields: Vec<String>,
    #[serde(with = "missing")]
    pub values: Vec<f64>,
    pub attrs: Attrs,
}

impl PartialEq for DecodedArray {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.time == other.time
            && self.sv == other.sv
            && self.fields == other.fields
            && self.attrs == other.attrs
            && self.values.len() == other.values.len()
            // bitwise so NaN cells compare equal to themselves
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl DecodedArray {
    /// Fresh all-missing array over the given axes.
    pub fn new(kind: RecordKind, time: Vec<Epoch>, sv: Vec<String>, fields: Vec<String>) -> Self {
        let values = vec![MISSING; fields.len() * time.len() * sv.len()];
        Self {
            kind,
            time,
            sv,
            fields,
            values,
            attrs: Attrs::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty() || self.sv.is_empty() || self.fields.is_empty()
    }

    fn index(&self, f: usize, t: usize, s: usize) -> usize {
        (f * self.time.len() + t) * self.sv.len() + s
    }

    pub fn set(&mut self, f: usize, t: usize, s: usize, value: f64) {
        let i = self.index(f, t, s);
        self.values[i] = value;
    }

    pub fn at(&self, f: usize, t: usize, s: usize) -> f64 {
        self.values[self.index(f, t, s)]
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    pub fn sv_index(&self, sv: &str) -> Option<usize> {
        self.sv.iter().position(|s| s == sv)
    }

    /// Cell lookup by field name and satellite label.
    pub fn get(&self, field: &str, t: usize, sv: &str) -> Option<f64> {
        let f = self.field_index(field)?;
        let s = self.sv_index(sv)?;
        if t >= self.time.len() {
            return None;
        }
        Some(self.at(f, t, s))
    }

    /// Drops satellites and fields whose every cell is missing.
    /// Time steps always survive: an all-missing epoch is still a
    /// sampling instant the file declared.
    pub fn prune_missing(mut self) -> Self {
        let keep_sv: Vec<usize> = (0..self.sv.len())
            .filter(|&s| {
                (0..self.fields.len())
                    .any(|f| (0..self.time.len()).any(|t| !self.at(f, t, s).is_nan()))
            })
            .collect();
        let keep_fields: Vec<usize> = (0..self.fields.len())
            .filter(|&f| {
                (0..self.time.len()).any(|t| keep_sv.iter().any(|&s| !self.at(f, t, s).is_nan()))
            })
            .collect();
        if keep_sv.len() == self.sv.len() && keep_fields.len() == self.fields.len() {
            return self;
        }

        let mut pruned = Self::new(
            self.kind,
            self.time.clone(),
            keep_sv.iter().map(|&s| self.sv[s].clone()).collect(),
            keep_fields
                .iter()
                .map(|&f| self.fields[f].clone())
                .collect(),
        );
        for (nf, &f) in keep_fields.iter().enumerate() {
            for t in 0..self.time.len() {
                for (ns, &s) in keep_sv.iter().enumerate() {
                    pruned.set(nf, t, ns, self.at(f, t, s));
                }
            }
        }
        pruned.attrs = std::mem::take(&mut self.attrs);
        pruned
    }

    /// Outer join along every axis: union of times, satellites and
    /// fields, existing cells copied over, new cells missing. `other`
    /// wins on cells both sides populate.
    pub fn merge(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }

        let time: Vec<Epoch> = self
            .time
            .iter()
            .chain(other.time.iter())
            .copied()
            .sorted()
            .dedup()
            .collect();
        let sv: Vec<String> = self
            .sv
            .iter()
            .chain(other.sv.iter())
            .cloned()
            .sorted()
            .dedup()
            .collect();
        let mut fields = self.fields.clone();
        for f in &other.fields {
            if !fields.contains(f) {
                fields.push(f.clone());
            }
        }

        let mut merged = Self::new(self.kind, time, sv, fields);
        for part in [&self, &other] {
            for (f, field) in part.fields.iter().enumerate() {
                let nf = match merged.field_index(field) {
                    Some(nf) => nf,
                    None => continue,
                };
                for (t, epoch) in part.time.iter().enumerate() {
                    let nt = match merged.time.binary_search(epoch) {
                        Ok(nt) => nt,
                        Err(_) => continue,
                    };
                    for (s, label) in part.sv.iter().enumerate() {
                        let v = part.at(f, t, s);
                        if v.is_nan() {
                            continue;
                        }
                        if let Ok(ns) = merged.sv.binary_search(label) {
                            merged.set(nf, nt, ns, v);
                        }
                    }
                }
            }
        }

        merged.attrs = merge_attrs(self.attrs, other.attrs);
        merged.attrs.sv_types = sv_types(&merged.sv);
        merged
    }
}

fn merge_attrs(mut a: Attrs, b: Attrs) -> Attrs {
    if a.version.is_empty() {
        a.version = b.version;
    }
    if a.time_system.is_empty() {
        a.time_system = b.time_system;
    }
    a.filename = a.filename.or(b.filename);
    a.rx_position = a.rx_position.or(b.rx_position);
    a.rx_geodetic = a.rx_geodetic.or(b.rx_geodetic);
    a.interval = a.interval.or(b.interval);
    a.ionospheric_corr = a.ionospheric_corr.or(b.ionospheric_corr);
    a
}

/// Distinct leading constellation letters of a sorted label list.
pub(crate) fn sv_types(sv: &[String]) -> Option<Vec<String>> {
    if sv.is_empty() {
        return None;
    }
    Some(
        sv.iter()
            .filter_map(|s| s.chars().next())
            .map(|c| c.to_string())
            .sorted()
            .dedup()
            .collect(),
    )
}

/// Canonical 3-character satellite label: system letter then
/// zero-padded 2-digit PRN. "G 7" and "G7" both become "G07".
pub fn canonical_sv(id: &str) -> String {
    let t = id.trim();
    let mut chars: Vec<char> = t.chars().collect();
    if chars.len() == 2 {
        chars.insert(1, '0');
    } else if chars.len() == 3 && chars[1] == ' ' {
        chars[1] = '0';
    }
    chars.into_iter().collect()
}

/// Median gap between consecutive epochs [s], the cadence estimate
/// used when the header declares no interval.
pub(crate) fn median_interval(time: &[Epoch]) -> Option<f64> {
    if time.len() < 2 {
        return None;
    }
    let mut gaps: Vec<f64> = time
        .windows(2)
        .map(|w| (w[1] - w[0]).to_seconds())
        .collect();
    gaps.sort_by(|a, b| a.total_cmp(b));
    Some(gaps[gaps.len() / 2])
}

// serde adapter: JSON has no NaN, missing cells travel as null
mod missing {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], ser: S) -> Result<S::Ok, S::Error> {
        let cells: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        cells.serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<f64>, D::Error> {
        let cells = Vec::<Option<f64>>::deserialize(de)?;
        Ok(cells
            .into_iter()
            .map(|c| c.unwrap_or(super::MISSING))
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn epoch(ss: u16) -> Epoch {
        Epoch::from_gregorian_utc(2022, 3, 4, 0, 0, 0, 0)
            + hifitime::Duration::from_seconds(ss as f64)
    }

    fn sample() -> DecodedArray {
        let mut a = DecodedArray::new(
            RecordKind::Obs,
            vec![epoch(0), epoch(30)],
            vec!["G07".to_string(), "R12".to_string()],
            vec!["C1".to_string(), "L1".to_string()],
        );
        a.set(0, 0, 0, 20147683.7);
        a.set(1, 1, 1, 105870652.297);
        a
    }

    #[test]
    fn indexing() {
        let a = sample();
        assert_eq!(a.get("C1", 0, "G07"), Some(20147683.7));
        assert_eq!(a.get("L1", 1, "R12"), Some(105870652.297));
        assert!(a.get("C1", 1, "G07").unwrap().is_nan());
        assert_eq!(a.get("P2", 0, "G07"), None);
        assert_eq!(a.get("C1", 0, "E11"), None);
    }

    #[test]
    fn canonical_labels() {
        assert_eq!(canonical_sv("G 7"), "G07");
        assert_eq!(canonical_sv("G7"), "G07");
        assert_eq!(canonical_sv("G07"), "G07");
        assert_eq!(canonical_sv(" R12 "), "R12");
    }

    #[test]
    fn prune_drops_empty_planes() {
        let mut a = DecodedArray::new(
            RecordKind::Obs,
            vec![epoch(0)],
            vec!["G07".to_string(), "G09".to_string()],
            vec!["C1".to_string(), "P2".to_string()],
        );
        a.set(0, 0, 0, 1.0);
        let p = a.prune_missing();
        assert_eq!(p.sv, vec!["G07"]);
        assert_eq!(p.fields, vec!["C1"]);
        assert_eq!(p.get("C1", 0, "G07"), Some(1.0));
    }

    #[test]
    fn merge_outer_joins() {
        let mut a = DecodedArray::new(
            RecordKind::Obs,
            vec![epoch(0)],
            vec!["G07".to_string()],
            vec!["C1".to_string()],
        );
        a.set(0, 0, 0, 1.0);
        let mut b = DecodedArray::new(
            RecordKind::Obs,
            vec![epoch(30)],
            vec!["R12".to_string()],
            vec!["C1".to_string(), "L1".to_string()],
        );
        b.set(0, 0, 0, 2.0);
        b.set(1, 0, 0, 3.0);

        let m = a.merge(b);
        assert_eq!(m.time, vec![epoch(0), epoch(30)]);
        assert_eq!(m.sv, vec!["G07", "R12"]);
        assert_eq!(m.fields, vec!["C1", "L1"]);
        assert_eq!(m.get("C1", 0, "G07"), Some(1.0));
        assert_eq!(m.get("C1", 1, "R12"), Some(2.0));
        assert_eq!(m.get("L1", 1, "R12"), Some(3.0));
        assert!(m.get("C1", 1, "G07").unwrap().is_nan());
        assert_eq!(m.attrs.sv_types, Some(vec!["G".to_string(), "R".to_string()]));
    }

    #[test]
    fn merge_with_empty() {
        let a = sample();
        let empty = DecodedArray::new(RecordKind::Obs, vec![], vec![], vec![]);
        assert_eq!(a.clone().merge(empty), a);
    }

    #[test]
    fn median_cadence() {
        let t = vec![epoch(0), epoch(30), epoch(60)];
        assert_eq!(median_interval(&t), Some(30.0));
        assert_eq!(median_interval(&t[..1]), None);
    }

    #[test]
    fn serde_preserves_missing() {
        let a = sample();
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("null"));
        let back: DecodedArray = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
