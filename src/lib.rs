//! RINEX observation and navigation decoding into labeled arrays.
//!
//! This crate reads RINEX 2.x and 3.x observation and broadcast
//! navigation files, wrapped or not in gzip, zip, `.Z` or Hatanaka
//! compact form, and decodes them into dense time by satellite by
//! field arrays with missing cells held as NaN.
//!
//! ```no_run
//! use rinexload::prelude::*;
//!
//! let opts = Options::default();
//! let loaded = rinexload::load("ADIS00ETH_R_20220680000_01D_30S_MO.crx.gz", &opts)?;
//! if let Some(obs) = loaded.obs() {
//!     println!("{} epochs, {} satellites", obs.time.len(), obs.sv.len());
//! }
//! # Ok::<(), rinexload::error::Error>(())
//! ```
pub mod array;
pub mod batch;
pub mod container;
pub mod error;
pub mod hatanaka;
pub mod header;
pub mod reader;
pub mod types;
pub mod version;

mod common;
mod epoch;
mod lzw;
mod memory;
mod navigation;
mod observation;

pub mod prelude {
    pub use crate::array::{Attrs, DecodedArray, RecordKind};
    pub use crate::error::Error;
    pub use crate::header::{Header, NavHeader, ObsHeader};
    pub use crate::version::Version;
    pub use crate::{load, load_str, read_header, Loaded, Options};
    pub use gnss_rs::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch};
}

use crate::{
    array::DecodedArray,
    container::CONTAINER_EXTENSION,
    error::Error,
    hatanaka::{CrxBin, CrxDecompressor},
    header::{Header, HEADER_END_MARKER},
    reader::{open, Source, TextSource},
    types::{classify, Type},
};
use gnss_rs::prelude::Constellation;
use hifitime::Epoch;
use std::path::Path;

/// Decode-time options, all optional.
#[derive(Debug, Clone)]
pub struct Options {
    /// Restrict to these systems; absent systems are an error
    pub constellations: Option<Vec<Constellation>>,
    /// Inclusive time window
    pub tlim: Option<(Epoch, Epoch)>,
    /// Observable name prefixes to keep ("C1", "L", ...)
    pub meas: Option<Vec<String>>,
    /// Expand loss-of-lock and signal-strength digits into their own
    /// fields
    pub use_indicators: bool,
    /// Decimate observations to this cadence [s]
    pub interval: Option<f64>,
    /// Size decode buffers from the first block instead of a full
    /// pre-scan
    pub fast: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            constellations: None,
            tlim: None,
            meas: None,
            use_indicators: false,
            interval: None,
            fast: true,
        }
    }
}

impl Options {
    pub fn with_constellations(mut self, list: &[Constellation]) -> Self {
        self.constellations = Some(list.to_vec());
        self
    }
    pub fn with_tlim(mut self, t0: Epoch, t1: Epoch) -> Self {
        self.tlim = Some((t0, t1));
        self
    }
    pub fn with_meas(mut self, prefixes: &[&str]) -> Self {
        self.meas = Some(prefixes.iter().map(|s| s.to_string()).collect());
        self
    }
    pub fn with_indicators(mut self, on: bool) -> Self {
        self.use_indicators = on;
        self
    }
    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.interval = Some(seconds);
        self
    }
    pub fn with_fast(mut self, on: bool) -> Self {
        self.fast = on;
        self
    }
}

/// What a source decoded into. Plain RINEX files hold one group,
/// containers may hold both.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Obs(DecodedArray),
    Nav(DecodedArray),
    Both {
        obs: DecodedArray,
        nav: DecodedArray,
    },
}

impl Loaded {
    pub fn obs(&self) -> Option<&DecodedArray> {
        match self {
            Self::Obs(a) => Some(a),
            Self::Both { obs, .. } => Some(obs),
            Self::Nav(_) => None,
        }
    }
    pub fn nav(&self) -> Option<&DecodedArray> {
        match self {
            Self::Nav(a) => Some(a),
            Self::Both { nav, .. } => Some(nav),
            Self::Obs(_) => None,
        }
    }
}

/// Decodes one source with the default Hatanaka converter.
pub fn load<P: AsRef<Path>>(path: P, opts: &Options) -> Result<Loaded, Error> {
    load_with(path, opts, &CrxBin::default())
}

/// Decodes one source, resolving Compact RINEX through the given
/// converter.
pub fn load_with<P: AsRef<Path>>(
    path: P,
    opts: &Options,
    crx: &dyn CrxDecompressor,
) -> Result<Loaded, Error> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext == CONTAINER_EXTENSION {
        return match container::load_all(path)? {
            (Some(obs), Some(nav)) => Ok(Loaded::Both { obs, nav }),
            (Some(obs), None) => Ok(Loaded::Obs(obs)),
            (None, Some(nav)) => Ok(Loaded::Nav(nav)),
            (None, None) => Err(Error::GroupNotFound("OBS or NAV".to_string())),
        };
    }
    let source = open(Source::Path(path), crx, false)?;
    decode_text(&source, opts)
}

/// Decodes in-memory RINEX text.
pub fn load_str(text: &str, opts: &Options) -> Result<Loaded, Error> {
    let source = open(Source::Text(text), &CrxBin::default(), false)?;
    decode_text(&source, opts)
}

fn decode_text(source: &TextSource, opts: &Options) -> Result<Loaded, Error> {
    let class = classify(&source.content)?;
    if class.rinex_type == Type::Sp3 {
        return Err(Error::UnsupportedFormat("SP3 precise orbits".to_string()));
    }
    let (header_section, body) = split_header_body(&source.content)?;
    let header = Header::parse(&class, header_section)?;
    let file_name = source.file_name.as_deref();
    match header {
        Header::Obs(h) => {
            let array = if class.version.major < 3 {
                observation::decode_v2(&h, body, opts, file_name)?
            } else {
                observation::decode_v3(&h, body, opts, file_name)?
            };
            Ok(Loaded::Obs(array))
        },
        Header::Nav(h) => Ok(Loaded::Nav(navigation::decode(&h, body, opts, file_name)?)),
    }
}

// header section keeps its closing marker line, the body starts on
// the following line
fn split_header_body(content: &str) -> Result<(&str, &str), Error> {
    let at = content
        .find(HEADER_END_MARKER)
        .ok_or_else(|| Error::CorruptHeader("END OF HEADER marker not found".to_string()))?;
    let header_end = at + HEADER_END_MARKER.len();
    let body_start = content[header_end..]
        .find('\n')
        .map(|n| header_end + n + 1)
        .unwrap_or(content.len());
    Ok((&content[..body_start], &content[body_start..]))
}

/// Decodes only the header of a source, cheap even for compact or
/// compressed inputs.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<Header, Error> {
    let source = open(Source::Path(path.as_ref()), &CrxBin::default(), true)?;
    header_from_source(&source)
}

/// Header of in-memory RINEX text.
pub fn header_from_str(text: &str) -> Result<Header, Error> {
    let source = open(Source::Text(text), &CrxBin::default(), true)?;
    header_from_source(&source)
}

fn header_from_source(source: &TextSource) -> Result<Header, Error> {
    let content: &str = if source.crinex {
        // the plain RINEX header follows the two-line compact preamble
        match source.content.splitn(3, '\n').nth(2) {
            Some(rest) => rest,
            None => {
                return Err(Error::CorruptHeader(
                    "compact preamble with no header".to_string(),
                ))
            },
        }
    } else {
        &source.content
    };
    let class = classify(content)?;
    let (header_section, _) = split_header_body(content)?;
    Header::parse(&class, header_section)
}
