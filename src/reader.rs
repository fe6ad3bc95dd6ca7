//! Decompression gateway: any supported source into one text buffer.
use crate::{
    error::Error,
    hatanaka::{is_crinex, CrxDecompressor},
    lzw,
};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const LARGE_SOURCE_BYTES: u64 = 100 * 1024 * 1024;

/// Decoder input: a filesystem path or in-memory text.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Path(&'a Path),
    Text(&'a str),
}

impl<'a> From<&'a Path> for Source<'a> {
    fn from(p: &'a Path) -> Self {
        Self::Path(p)
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(t: &'a str) -> Self {
        Self::Text(t)
    }
}

/// Gateway output: fully unwrapped RINEX text.
#[derive(Debug, Clone)]
pub struct TextSource {
    pub content: String,
    pub file_name: Option<String>,
    /// Input carried the Compact RINEX marker
    /// (converted on open, unless only the header was requested)
    pub crinex: bool,
}

/// Opens a source, transparently unwrapping gzip/zip/LZW containers
/// and running the Hatanaka converter when the first line announces
/// Compact RINEX. `header_only` skips the (costly) conversion since
/// the plain header is embedded past the CRINEX preamble anyway.
pub fn open(
    source: Source,
    crx: &dyn CrxDecompressor,
    header_only: bool,
) -> Result<TextSource, Error> {
    let (bytes, file_name) = match source {
        Source::Text(text) => {
            if text.trim().is_empty() {
                return Err(Error::InvalidInput("empty text source".to_string()));
            }
            (text.as_bytes().to_vec(), None)
        },
        Source::Path(path) => {
            if !path.is_file() {
                return Err(Error::InvalidInput(format!("{} is not a file", path.display())));
            }
            let len = std::fs::metadata(path)?.len();
            if len > LARGE_SOURCE_BYTES {
                log::debug!("large source {}: {} bytes", path.display(), len);
            }
            let file_name = path.file_name().map(|n| n.to_string_lossy().to_string());
            (read_container(path)?, file_name)
        },
    };

    let mut content = String::from_utf8_lossy(&bytes).into_owned();
    let crinex = content.lines().next().map(is_crinex).unwrap_or(false);
    if crinex && !header_only {
        let recovered = crx.decompress(content.as_bytes())?;
        content = String::from_utf8_lossy(&recovered).into_owned();
    }

    Ok(TextSource {
        content,
        file_name,
        crinex,
    })
}

// suffix-driven container unwrapping, ASCII with lossy replacement
fn read_container(path: &Path) -> Result<Vec<u8>, Error> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "gz" => {
            let mut buf = Vec::new();
            GzDecoder::new(File::open(path)?).read_to_end(&mut buf)?;
            Ok(buf)
        },
        "zip" => {
            let mut archive = zip::ZipArchive::new(File::open(path)?)?;
            if archive.len() == 0 {
                return Err(Error::InvalidInput(format!(
                    "{}: empty zip archive",
                    path.display()
                )));
            }
            // first member only
            let mut member = archive.by_index(0)?;
            let mut buf = Vec::new();
            member.read_to_end(&mut buf)?;
            Ok(buf)
        },
        "z" => {
            let mut raw = Vec::new();
            File::open(path)?.read_to_end(&mut raw)?;
            lzw::decompress(&raw)
        },
        _ => Ok(std::fs::read(path)?),
    }
}
