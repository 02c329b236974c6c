//! Byte-range access intervals per file
//!
//! Converts a rank's decoded, time-sorted records into per-file intervals
//! `{ rank, start_time, end_time, offset, count, is_read }`. Only the
//! plain-POSIX byte-transfer family contributes: MPI-IO and HDF5 calls
//! operate on abstractions whose byte offsets are not recoverable from
//! this record layout.
//!
//! # Offset recovery
//!
//! Positioned calls (`pread`/`pwrite`) carry their offset explicitly.
//! Plain and buffered calls do not, so the builder keeps one cursor per
//! file id and rank: `open`/`creat`/`fopen` reset it to zero,
//! `lseek`/`fseek` reposition it (SEEK_END relative to the size recorded
//! in the file map), and every plain or buffered transfer advances it by
//! the transfer's byte count. Positioned transfers leave it unchanged.

use crate::functions::{self, IoClass, TransferLayout};
use crate::metadata::LocalMetadata;
use crate::records::Record;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// One byte-range access by one rank on one file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interval {
    pub rank: i32,
    /// Seconds relative to the rank's start timestamp
    pub start_time: f64,
    pub end_time: f64,
    pub offset: i64,
    pub count: i64,
    pub is_read: bool,
}

/// Per-filename interval collections, merged across ranks.
pub type IntervalMap = HashMap<String, Vec<Interval>>;

/// Accumulates intervals rank by rank.
///
/// Ranks are independent until their contributions merge into the shared
/// per-filename vectors here, which is the only cross-rank touch point.
#[derive(Debug, Default)]
pub struct IntervalBuilder {
    intervals: IntervalMap,
}

/// `whence` values of `lseek`, as logged.
const SEEK_SET: i64 = 0;
const SEEK_CUR: i64 = 1;
const SEEK_END: i64 = 2;

impl IntervalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one rank's sorted record sequence into the interval map.
    ///
    /// `time_resolution` converts record time units to seconds. Records
    /// with unparsable arguments or file ids missing from the file map
    /// are skipped with a debug log, never fatal.
    pub fn add_rank(
        &mut self,
        rank: i32,
        records: &[Record],
        meta: &LocalMetadata,
        time_resolution: f64,
    ) {
        // file id -> current byte position, this rank only
        let mut cursors: HashMap<usize, i64> = HashMap::new();

        for (idx, rec) in records.iter().enumerate() {
            let Some(desc) = functions::lookup(rec.func_id) else {
                debug!(rank, record = idx, func_id = rec.func_id, "unknown function id");
                continue;
            };

            match desc.class {
                IoClass::Open => {
                    if let Some(fid) = parse_arg(rec, 0) {
                        cursors.insert(fid as usize, 0);
                    }
                }
                IoClass::Seek => {
                    let (Some(fid), Some(offset), Some(whence)) =
                        (parse_arg(rec, 0), parse_arg(rec, 1), parse_arg(rec, 2))
                    else {
                        debug!(rank, record = idx, name = desc.name, "unparsable seek");
                        continue;
                    };
                    let fid = fid as usize;
                    let base = match whence {
                        SEEK_SET => 0,
                        SEEK_CUR => cursors.get(&fid).copied().unwrap_or(0),
                        SEEK_END => meta.files.get(fid).map_or(0, |f| f.size),
                        other => {
                            debug!(rank, record = idx, whence = other, "unknown seek whence");
                            continue;
                        }
                    };
                    cursors.insert(fid, base + offset);
                }
                IoClass::Transfer { layout, is_read } => {
                    let Some((fid, offset, count)) =
                        transfer_geometry(rec, layout, &mut cursors)
                    else {
                        debug!(rank, record = idx, name = desc.name, "unparsable transfer");
                        continue;
                    };
                    let Some(filename) = meta.filename(fid) else {
                        debug!(rank, record = idx, fid, "file id not in file map");
                        continue;
                    };
                    self.intervals
                        .entry(filename.to_owned())
                        .or_default()
                        .push(Interval {
                            rank,
                            start_time: rec.start_seconds(time_resolution),
                            end_time: rec.end_seconds(time_resolution),
                            offset,
                            count,
                            is_read,
                        });
                }
                IoClass::Other => {}
            }
        }
    }

    pub fn build(self) -> IntervalMap {
        self.intervals
    }
}

/// Resolve `(file id, byte offset, byte count)` for one transfer record,
/// advancing the cursor for the non-positioned variants.
fn transfer_geometry(
    rec: &Record,
    layout: TransferLayout,
    cursors: &mut HashMap<usize, i64>,
) -> Option<(usize, i64, i64)> {
    match layout {
        TransferLayout::Plain => {
            let fid = parse_arg(rec, 0)? as usize;
            let count = parse_arg(rec, 2)?;
            let offset = cursors.get(&fid).copied().unwrap_or(0);
            cursors.insert(fid, offset + count);
            Some((fid, offset, count))
        }
        TransferLayout::Positioned => {
            let fid = parse_arg(rec, 0)? as usize;
            let count = parse_arg(rec, 2)?;
            let offset = parse_arg(rec, 3)?;
            Some((fid, offset, count))
        }
        TransferLayout::Buffered => {
            let size = parse_arg(rec, 1)?;
            let nmemb = parse_arg(rec, 2)?;
            let fid = parse_arg(rec, 3)? as usize;
            let count = size.checked_mul(nmemb)?;
            let offset = cursors.get(&fid).copied().unwrap_or(0);
            cursors.insert(fid, offset + count);
            Some((fid, offset, count))
        }
    }
}

fn parse_arg(rec: &Record, idx: usize) -> Option<i64> {
    rec.args.get(idx)?.parse().ok()
}

/// Drop ignored filenames from an interval map. Pure: the surviving
/// entries move over untouched.
pub fn filter_ignored_files(
    intervals: IntervalMap,
    filter: &crate::filter::FileFilter,
) -> IntervalMap {
    intervals
        .into_iter()
        .filter(|(name, _)| !filter.is_ignored(name))
        .collect()
}
