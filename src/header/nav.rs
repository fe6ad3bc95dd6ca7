//! Navigation header decoding.
use super::{split_label, store_extra};
use crate::{
    common::{fortran_f64, subfield},
    error::Error,
    types::FileClass,
    version::Version,
};
use gnss_rs::prelude::Constellation;
use std::collections::{BTreeMap, HashMap};

/// One "TIME SYSTEM CORR" entry: x(t) = a0 + a1 (t - ref).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSystemCorr {
    pub a0: f64,
    pub a1: f64,
    pub ref_time: Option<f64>,
    pub ref_week: Option<f64>,
}

/// Navigation header: broadcast model corrections plus the
/// classification the decoder dispatches on.
#[derive(Debug, Clone)]
pub struct NavHeader {
    pub version: Version,
    pub constellation: Option<Constellation>,
    /// Ionospheric model coefficients keyed by model name
    /// ("GPSA"/"GPSB" in V3, "ION ALPHA"/"ION BETA" in V2)
    pub iono_corrections: BTreeMap<String, Vec<f64>>,
    pub time_corrections: BTreeMap<String, TimeSystemCorr>,
    pub extra: HashMap<String, String>,
}

impl NavHeader {
    pub(crate) fn parse(class: &FileClass, section: &str) -> Result<Self, Error> {
        let mut iono_corrections = BTreeMap::new();
        let mut time_corrections = BTreeMap::new();
        let mut extra = HashMap::new();
        let mut closed = false;

        for line in section.lines() {
            let (content, label) = split_label(line);
            match label {
                super::HEADER_END_MARKER => {
                    closed = true;
                    break;
                },
                "RINEX VERSION / TYPE" => {},
                "IONOSPHERIC CORR" => {
                    // A4, 1X, then 4 D12.4 fields
                    let key = subfield(content, 0, 4).trim().to_string();
                    let coeffs: Vec<f64> = (0..4)
                        .filter_map(|i| fortran_f64(subfield(content, 5 + 12 * i, 12)))
                        .collect();
                    if !key.is_empty() && !coeffs.is_empty() {
                        iono_corrections.insert(key, coeffs);
                    }
                },
                "ION ALPHA" | "ION BETA" => {
                    let coeffs: Vec<f64> = content
                        .split_ascii_whitespace()
                        .filter_map(fortran_f64)
                        .collect();
                    if !coeffs.is_empty() {
                        iono_corrections.insert(label.to_string(), coeffs);
                    }
                },
                "TIME SYSTEM CORR" => {
                    let key = subfield(content, 0, 4).trim().to_string();
                    let a0 = fortran_f64(subfield(content, 5, 17));
                    let a1 = fortran_f64(subfield(content, 22, 16));
                    let ref_time = fortran_f64(subfield(content, 38, 7));
                    let ref_week = fortran_f64(subfield(content, 45, 5));
                    if let (Some(a0), Some(a1)) = (a0, a1) {
                        time_corrections.insert(
                            key,
                            TimeSystemCorr {
                                a0,
                                a1,
                                ref_time,
                                ref_week,
                            },
                        );
                    }
                },
                "DELTA-UTC: A0,A1,T,W" => {
                    // V2 counterpart of TIME SYSTEM CORR, GPS to UTC.
                    // Fixed slices: the two D19.12 fields may abut.
                    let a0 = fortran_f64(subfield(content, 3, 19));
                    let a1 = fortran_f64(subfield(content, 22, 19));
                    if let (Some(a0), Some(a1)) = (a0, a1) {
                        time_corrections.insert(
                            "GPUT".to_string(),
                            TimeSystemCorr {
                                a0,
                                a1,
                                ref_time: fortran_f64(subfield(content, 41, 9)),
                                ref_week: fortran_f64(subfield(content, 50, 9)),
                            },
                        );
                    }
                },
                _ => store_extra(&mut extra, label, content),
            }
        }

        if !closed {
            return Err(Error::CorruptHeader(
                "END OF HEADER marker not found".to_string(),
            ));
        }

        Ok(Self {
            version: class.version,
            constellation: class.constellation,
            iono_corrections,
            time_corrections,
            extra,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::classify;

    const V3_SECTION: &str = "     3.04           N: GNSS NAV DATA    M: MIXED            RINEX VERSION / TYPE
GPSA    .1211D-07   .1490D-07  -.5960D-07  -.1192D-06       IONOSPHERIC CORR
GPSB    .9626D+05   .8192D+05  -.1966D+06  -.3932D+06       IONOSPHERIC CORR
GPUT  -.3725290298D-08 -.106581410D-13  61440 2200          TIME SYSTEM CORR
                                                            END OF HEADER
";

    const V2_SECTION: &str = "     2.11           N: GPS NAV DATA                         RINEX VERSION / TYPE
     .1211D-07   .1490D-07  -.5960D-07  -.1192D-06          ION ALPHA
     .9626D+05   .8192D+05  -.1966D+06  -.3932D+06          ION BETA
    -.379979610443D-07 -.266453525910D-14   319488     2200 DELTA-UTC: A0,A1,T,W
                                                            END OF HEADER
";

    #[test]
    fn v3_corrections() {
        let class = classify(V3_SECTION).unwrap();
        let h = NavHeader::parse(&class, V3_SECTION).unwrap();
        let alpha = &h.iono_corrections["GPSA"];
        assert_eq!(alpha.len(), 4);
        assert_eq!(alpha[0], 0.1211e-7);
        assert_eq!(h.iono_corrections["GPSB"][3], -0.3932e6);
        let gput = &h.time_corrections["GPUT"];
        assert_eq!(gput.a0, -0.3725290298e-8);
        assert_eq!(gput.ref_week, Some(2200.0));
    }

    #[test]
    fn v2_corrections() {
        let class = classify(V2_SECTION).unwrap();
        let h = NavHeader::parse(&class, V2_SECTION).unwrap();
        assert_eq!(h.iono_corrections["ION ALPHA"].len(), 4);
        assert_eq!(h.iono_corrections["ION BETA"][0], 0.9626e5);
        let gput = &h.time_corrections["GPUT"];
        assert_eq!(gput.a1, -0.266453525910e-14);
        assert_eq!(gput.ref_time, Some(319488.0));
    }

    #[test]
    fn unknown_labels_kept() {
        let section = "     3.04           N: GNSS NAV DATA    M: MIXED            RINEX VERSION / TYPE
some free text here                                         COMMENT
                                                            END OF HEADER
";
        let class = classify(section).unwrap();
        let h = NavHeader::parse(&class, section).unwrap();
        assert_eq!(h.extra["COMMENT"], "some free text here");
        assert!(h.iono_corrections.is_empty());
    }
}
