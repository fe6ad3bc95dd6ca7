//! Header section decoding: the labeled lines before "END OF HEADER".
use crate::{error::Error, types::FileClass, types::Type};
use std::collections::HashMap;

mod nav;
mod obs;

pub use nav::{NavHeader, TimeSystemCorr};
pub use obs::{ObsHeader, ObsTypes};

/// Closing label of every header section.
pub const HEADER_END_MARKER: &str = "END OF HEADER";

/// Parsed header, one variant per decodable record type.
#[derive(Debug, Clone)]
pub enum Header {
    Obs(ObsHeader),
    Nav(NavHeader),
}

impl Header {
    /// Decodes the header section that `classify` already typed.
    pub fn parse(class: &FileClass, section: &str) -> Result<Self, Error> {
        match class.rinex_type {
            Type::ObservationData => Ok(Self::Obs(ObsHeader::parse(class, section)?)),
            Type::NavigationData => Ok(Self::Nav(NavHeader::parse(class, section)?)),
            Type::Sp3 => Err(Error::UnsupportedFormat("SP3 precise orbits".to_string())),
        }
    }
}

/// Splits a header line into (content, label): the label always
/// starts at column 61.
pub(crate) fn split_label(line: &str) -> (&str, &str) {
    if line.len() > 60 {
        let content = line.get(..60).unwrap_or("");
        let label = line.get(60..).map(str::trim).unwrap_or("");
        (content, label)
    } else if line.trim() == HEADER_END_MARKER {
        ("", HEADER_END_MARKER)
    } else {
        // short line: no room for a label, keep it all as content
        (line, "")
    }
}

/// Accumulates an unrecognized label, concatenating repeats
/// (COMMENT lines, multi-line free text).
pub(crate) fn store_extra(extra: &mut HashMap<String, String>, label: &str, content: &str) {
    let entry = extra.entry(label.to_string()).or_default();
    if !entry.is_empty() {
        entry.push(' ');
    }
    entry.push_str(content.trim_end());
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn label_split() {
        let line = "     3.02           OBSERVATION DATA    M: MIXED            RINEX VERSION / TYPE";
        let (content, label) = split_label(line);
        assert_eq!(label, "RINEX VERSION / TYPE");
        assert_eq!(content.len(), 60);

        let (_, label) = split_label("                                                            END OF HEADER");
        assert_eq!(label, "END OF HEADER");
        let (_, label) = split_label("END OF HEADER");
        assert_eq!(label, "END OF HEADER");
    }

    #[test]
    fn extra_accumulation() {
        let mut extra = HashMap::new();
        store_extra(&mut extra, "COMMENT", "first line  ");
        store_extra(&mut extra, "COMMENT", "second line");
        assert_eq!(extra["COMMENT"], "first line second line");
    }
}
