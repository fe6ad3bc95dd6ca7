//! Decoded-array container: gzip-compressed JSON holding the OBS and
//! NAV groups of one source.
use crate::{array::DecodedArray, error::Error};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Canonical container suffix.
pub const CONTAINER_EXTENSION: &str = "rnz";

#[derive(Serialize, Deserialize)]
struct Document {
    #[serde(rename = "OBS", default, skip_serializing_if = "Option::is_none")]
    obs: Option<DecodedArray>,
    #[serde(rename = "NAV", default, skip_serializing_if = "Option::is_none")]
    nav: Option<DecodedArray>,
}

/// Writes the given groups to `path`, replacing any existing file.
pub fn save(
    path: &Path,
    obs: Option<&DecodedArray>,
    nav: Option<&DecodedArray>,
) -> Result<(), Error> {
    let doc = Document {
        obs: obs.cloned(),
        nav: nav.cloned(),
    };
    let writer = GzEncoder::new(File::create(path)?, Compression::default());
    serde_json::to_writer(writer, &doc)?;
    Ok(())
}

/// Reads both groups back; absent groups come out `None`.
pub fn load_all(path: &Path) -> Result<(Option<DecodedArray>, Option<DecodedArray>), Error> {
    let reader = GzDecoder::new(BufReader::new(File::open(path)?));
    let doc: Document = serde_json::from_reader(reader)?;
    Ok((doc.obs, doc.nav))
}

/// Reads one named group, failing when the container lacks it.
pub fn read_group(path: &Path, kind: crate::array::RecordKind) -> Result<DecodedArray, Error> {
    let (obs, nav) = load_all(path)?;
    let group = match kind {
        crate::array::RecordKind::Obs => obs,
        crate::array::RecordKind::Nav => nav,
    };
    group.ok_or_else(|| Error::GroupNotFound(kind.to_string()))
}
