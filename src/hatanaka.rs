//! Compact RINEX (Hatanaka) support: marker detection plus the
//! external converter, modeled as an injected capability so the
//! decoders stay testable without the native binary.
use crate::{common::subfield, error::Error};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Columns 21-40 of a CRINEX first line carry this marker.
const COMPACT_MARKER: &str = "COMPACT RINEX";

/// True when a first header line announces Compact RINEX.
pub fn is_crinex(first_line: &str) -> bool {
    subfield(first_line, 20, 20).contains(COMPACT_MARKER)
}

/// Whole-buffer CRINEX to canonical RINEX conversion.
pub trait CrxDecompressor {
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Default capability: the RNXCMP `crx2rnx` executable, driven
/// stdin to stdout with both sides fully buffered.
#[derive(Debug, Clone)]
pub struct CrxBin {
    /// Converter executable, resolved through PATH by default
    pub program: PathBuf,
}

impl Default for CrxBin {
    fn default() -> Self {
        Self {
            program: PathBuf::from("crx2rnx"),
        }
    }
}

impl CrxDecompressor for CrxBin {
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let mut child = Command::new(&self.program)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::MissingDependency(format!(
                        "\"{}\" not found: build crx2rnx from the RNXCMP distribution and put it in PATH",
                        self.program.display()
                    ))
                } else {
                    Error::Io(e)
                }
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::InvalidInput("crx2rnx stdin unavailable".to_string()))?;
        // the converter streams its output while we feed it: feeding
        // from a helper thread keeps a single blocked pipe from
        // deadlocking on large files
        let buffer = input.to_vec();
        let feeder = std::thread::spawn(move || stdin.write_all(&buffer));
        let output = child.wait_with_output()?;
        feeder
            .join()
            .map_err(|_| Error::InvalidInput("crx2rnx feed thread panicked".to_string()))??;

        if !output.status.success() {
            return Err(Error::InvalidInput(format!(
                "crx2rnx exited with {}",
                output.status
            )));
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn marker_detection() {
        let crx = "3.0                 COMPACT RINEX FORMAT                    CRINEX VERS   / TYPE";
        assert!(is_crinex(crx));
        let rnx = "     3.02           OBSERVATION DATA    M: MIXED            RINEX VERSION / TYPE";
        assert!(!is_crinex(rnx));
        assert!(!is_crinex(""));
        assert!(!is_crinex("short line"));
    }

    #[test]
    fn missing_binary() {
        let converter = CrxBin {
            program: PathBuf::from("rinexload-no-such-converter"),
        };
        let r = converter.decompress(b"anything");
        assert!(matches!(r, Err(Error::MissingDependency(_))));
    }
}
