//! Error kinds for trace decoding
//!
//! Every error is terminal for the process (rank) or trace it names: the
//! input is a static, already-written trace directory, so nothing here is
//! retried. Variants carry the rank and record index where that is what a
//! person debugging a corrupt or version-mismatched trace needs first.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while decoding a trace directory.
#[derive(Error, Debug)]
pub enum TraceError {
    /// Metadata file is structurally unusable: header too short,
    /// inconsistent counts, or a file id outside `[0, file_count)`.
    #[error("malformed metadata in {}: {reason}", path.display())]
    MalformedMetadata { path: PathBuf, reason: String },

    /// An event-log line ended before its fixed 10-byte header. Decoding
    /// of that rank's log stops; records decoded so far remain usable.
    #[error("truncated record in rank {rank} log at byte offset {offset}")]
    TruncatedRecord { rank: i32, offset: usize },

    /// A delta-encoded record referenced a position before the start of
    /// its rank's record sequence.
    #[error(
        "invalid back reference in rank {rank}, record {record}: \
         distance {distance} reaches before the first record"
    )]
    InvalidBackReference {
        rank: i32,
        record: usize,
        distance: usize,
    },

    /// A delta bitmask flagged more argument slots than the record
    /// supplied replacement tokens for.
    #[error(
        "argument underflow in rank {rank}, record {record}: \
         mask flags {needed} slots but only {supplied} tokens present"
    )]
    ArgumentUnderflow {
        rank: i32,
        record: usize,
        needed: usize,
        supplied: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
