//! Crate-wide error taxonomy.
use gnss_rs::prelude::Constellation;
use thiserror::Error;

/// Errors that may rise while opening, classifying or decoding a source.
#[derive(Error, Debug)]
pub enum Error {
    /// Source type or value not usable at an entry point
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// First line too short, wrong trailing marker, unparseable version,
    /// or no content within the blank-line lookahead
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// Required label absent for this revision / record type
    #[error("missing mandatory header label \"{0}\"")]
    MissingMandatoryHeader(String),

    /// Revision / type combination recognized but not decodable here
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoded field count still disagrees with the declared table
    /// after spare-field reconciliation
    #[error("{0} record carries {1} fields where the schema declares {2}")]
    SchemaMismatch(Constellation, usize, usize),

    /// Optional library or external executable unavailable for this input
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// Estimated decode buffer would not fit in memory
    #[error("{required} byte decode buffer exceeds the {available} bytes available, retry without fast preallocation")]
    ResourceExceeded { required: u64, available: u64 },

    /// Requested record-type group absent from a container
    #[error("container holds no \"{0}\" group")]
    GroupNotFound(String),

    #[error("failed to parse datetime")]
    DateTimeParsing,

    #[error("failed to parse satellite identifier")]
    SvParsing(#[from] gnss_rs::sv::ParsingError),

    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("zip archive error")]
    Zip(#[from] zip::result::ZipError),

    #[error("container serialization error")]
    Serde(#[from] serde_json::Error),
}
