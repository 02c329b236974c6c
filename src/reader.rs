//! Trace-directory reader
//!
//! Ties the pipeline together for one trace directory: global metadata,
//! then per rank the local metadata and the event log, decoded,
//! delta-expanded and time-sorted. Ranks are processed independently and
//! share no mutable state; cross-rank work only starts when intervals
//! are merged.
//!
//! Event logs are memory-mapped rather than read into a buffer - delta
//! compression keeps the files small per record, but long runs still
//! produce logs in the hundreds of megabytes.

use crate::conflicts::{self, ConflictSummary};
use crate::error::TraceError;
use crate::filter::FileFilter;
use crate::intervals::{self, IntervalBuilder, IntervalMap};
use crate::metadata::{
    event_log_path, global_metadata_path, local_metadata_path, GlobalMetadata, LocalMetadata,
};
use crate::records::{self, Record};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// One rank's fully decoded trace.
#[derive(Debug)]
pub struct RankTrace {
    pub rank: i32,
    pub meta: LocalMetadata,
    /// Decoded, delta-expanded, time-sorted records
    pub records: Vec<Record>,
    /// Set when the rank's event log ended mid-record; `records` holds
    /// everything decoded before the truncation point.
    pub truncation: Option<TraceError>,
}

/// A fully decoded trace directory.
///
/// Reporting collaborators read these fields and the derived maps; they
/// never mutate them.
#[derive(Debug)]
pub struct TraceReader {
    pub global: GlobalMetadata,
    /// Indexed by rank
    pub ranks: Vec<RankTrace>,
}

impl TraceReader {
    /// Decode an entire trace directory.
    ///
    /// Structural errors in metadata or in delta expansion abort the
    /// load; a truncated event log only stops that rank's decoding and
    /// is recorded on its [`RankTrace`].
    pub fn load(dir: &Path) -> Result<Self> {
        let global_path = global_metadata_path(dir);
        let global = GlobalMetadata::read(&global_path)
            .with_context(|| format!("reading global metadata {}", global_path.display()))?;
        info!(
            process_count = global.process_count,
            compression_mode = global.compression_mode,
            "loaded global metadata"
        );

        let mut ranks = Vec::with_capacity(global.process_count as usize);
        for rank in 0..global.process_count {
            ranks.push(
                load_rank(dir, rank).with_context(|| format!("decoding rank {rank}"))?,
            );
        }

        Ok(Self { global, ranks })
    }

    /// Per-filename interval collections merged across all ranks.
    pub fn build_intervals(&self) -> IntervalMap {
        let mut builder = IntervalBuilder::new();
        for rt in &self.ranks {
            builder.add_rank(rt.rank, &rt.records, &rt.meta, self.global.time_resolution);
        }
        builder.build()
    }

    /// Per-filename conflict summaries, ignored files dropped first.
    pub fn conflict_summaries(&self, filter: &FileFilter) -> HashMap<String, ConflictSummary> {
        let intervals = intervals::filter_ignored_files(self.build_intervals(), filter);
        conflicts::analyze_all(&intervals)
    }

    /// Local metadata of every rank, in rank order.
    pub fn local_metadata(&self) -> impl Iterator<Item = &LocalMetadata> {
        self.ranks.iter().map(|rt| &rt.meta)
    }

    /// All decoded records across ranks, for aggregate statistics.
    pub fn all_records(&self) -> impl Iterator<Item = &Record> {
        self.ranks.iter().flat_map(|rt| rt.records.iter())
    }

    /// `(records, metadata)` pairs per rank, the shape the per-file
    /// access summaries consume.
    pub fn rank_views(&self) -> impl Iterator<Item = (&[Record], &LocalMetadata)> {
        self.ranks.iter().map(|rt| (rt.records.as_slice(), &rt.meta))
    }
}

fn load_rank(dir: &Path, rank: i32) -> Result<RankTrace> {
    let meta_path = local_metadata_path(dir, rank);
    let meta = LocalMetadata::read(&meta_path)
        .with_context(|| format!("reading local metadata {}", meta_path.display()))?;

    let log_path = event_log_path(dir, rank);
    let file = File::open(&log_path)
        .with_context(|| format!("opening event log {}", log_path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("stat {}", log_path.display()))?
        .len();

    // Zero-length logs cannot be mapped; a rank that made no calls is
    // legitimate.
    let decoded = if len == 0 {
        records::decode_log(&[], rank)
    } else {
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("mapping event log {}", log_path.display()))?;
        records::decode_log(&mmap, rank)
    };

    if let Some(err) = &decoded.truncation {
        warn!(rank, %err, "event log truncated; keeping records decoded so far");
    }

    let expanded = records::decompress(decoded.records, rank)?;
    let sorted = records::sort_by_start_time(expanded);
    debug!(rank, records = sorted.len(), "decoded rank");

    Ok(RankTrace {
        rank,
        meta,
        records: sorted,
        truncation: decoded.truncation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_fails() {
        let err = TraceReader::load(Path::new("/nonexistent/trace-dir")).unwrap_err();
        assert!(err.to_string().contains("global metadata"));
    }
}
