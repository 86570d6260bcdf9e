//! Error types.
use crate::model::Strand;
use thiserror::Error;

/// A read whose 2D alignment table cannot be turned into event maps.
/// Always fatal for that read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// No rows, or rows with an empty kmer. The kmer length is unknown.
    #[error("alignment table is empty")]
    EmptyAlignment,
    /// The row cursor ran past the end of the alignment table.
    #[error("alignment table exhausted at consensus position {position} (row {row})")]
    RowsExhausted { position: usize, row: usize },
    /// A carry-forward was needed before any event of the strand was aligned.
    #[error("no {strand} event is known at consensus position {position}")]
    Unresolved { strand: Strand, position: usize },
    /// The final map does not cover the consensus sequence base by base.
    #[error("{strand} event map has {len} entries for a {expected}bp read")]
    LengthMismatch {
        strand: Strand,
        len: usize,
        expected: usize,
    },
}

#[derive(Debug, Error)]
pub enum NpReadError {
    #[error("mapping failed: {0}")]
    Mapping(#[from] MappingError),
    /// A dataset or attribute the operation needs is absent from the read.
    #[error("missing {0}")]
    Missing(String),
    #[error("malformed {0}")]
    Malformed(String),
    #[error("aligner failed: {0}")]
    Aligner(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
