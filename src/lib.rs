//! Iolens - decoder and conflict analyzer for binary HPC I/O traces
//!
//! This library decodes the per-process trace directories written by an
//! HPC I/O tracing tool (global metadata, per-rank metadata, per-rank
//! delta-compressed event logs) and derives per-file byte-range access
//! intervals and cross-process conflict classifications from them.
//! Presentation layers - plotting, HTML reports, command-line drivers -
//! live outside this crate and consume its output types.

pub mod conflicts;
pub mod error;
pub mod filter;
pub mod functions;
pub mod intervals;
pub mod metadata;
pub mod reader;
pub mod records;
pub mod stats;

pub use error::TraceError;
pub use reader::TraceReader;
