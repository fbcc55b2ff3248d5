use thiserror::Error;

/// Errors surfaced while configuring or building an index.
///
/// Query-time conditions (unknown terms, empty indexes) are modeled as
/// empty results, not errors; only configuration and ingestion can fail.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A weighting coefficient or index parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A source line could not be parsed into an entity record.
    #[error("malformed record at line {line}: {reason}")]
    Ingestion { line: usize, reason: String },

    /// Reading a source file failed; the build is aborted.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
