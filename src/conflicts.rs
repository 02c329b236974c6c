//! Cross-process access-conflict classification
//!
//! For each file, every pair of intervals with overlapping byte ranges is
//! classified by the read/write roles of the temporally first and second
//! access (RAR/RAW/WAW/WAR) and by locality (same rank or different
//! ranks). The result per file is a presence summary - one flag per
//! (conflict type, locality) combination - not a pair list.
//!
//! The scan is a full overlap sweep: intervals sorted by starting offset
//! with an active set of ranges still covering the current offset. Every
//! genuinely overlapping pair is tested, including pairs that are not
//! adjacent in the sorted order because a wide interval spans several
//! later ones.

use crate::intervals::{Interval, IntervalMap};
use serde::Serialize;
use std::collections::HashMap;

/// Conflict classification of an overlapping pair, by the read/write
/// roles of the temporally first and second access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConflictType {
    /// read after read
    Rar,
    /// read after write
    Raw,
    /// write after write
    Waw,
    /// write after read
    War,
}

/// Presence flags for one conflict type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocalityFlags {
    pub same_process: bool,
    pub cross_process: bool,
}

/// Per-file conflict summary: 4 conflict types x 2 localities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConflictSummary {
    pub rar: LocalityFlags,
    pub raw: LocalityFlags,
    pub waw: LocalityFlags,
    pub war: LocalityFlags,
}

impl ConflictSummary {
    /// Flags for one conflict type.
    pub fn flags(&self, ty: ConflictType) -> LocalityFlags {
        match ty {
            ConflictType::Rar => self.rar,
            ConflictType::Raw => self.raw,
            ConflictType::Waw => self.waw,
            ConflictType::War => self.war,
        }
    }

    /// True if any conflict was observed at all.
    pub fn any(&self) -> bool {
        [self.rar, self.raw, self.waw, self.war]
            .iter()
            .any(|f| f.same_process || f.cross_process)
    }

    fn record(&mut self, first: &Interval, second: &Interval) {
        let flags = match (first.is_read, second.is_read) {
            (true, true) => &mut self.rar,
            (false, true) => &mut self.raw,
            (true, false) => &mut self.war,
            (false, false) => &mut self.waw,
        };
        if first.rank == second.rank {
            flags.same_process = true;
        } else {
            flags.cross_process = true;
        }
    }
}

/// Classify all overlapping pairs among one file's intervals.
pub fn analyze_file(intervals: &[Interval]) -> ConflictSummary {
    let mut summary = ConflictSummary::default();

    // Zero-length accesses cover no bytes and cannot conflict.
    let mut sorted: Vec<&Interval> = intervals.iter().filter(|iv| iv.count > 0).collect();
    sorted.sort_by_key(|iv| iv.offset);

    // Active set: earlier intervals whose range still reaches the current
    // starting offset. Quadratic only in the overlap depth.
    let mut active: Vec<&Interval> = Vec::new();
    for current in sorted {
        active.retain(|prev| prev.offset + prev.count > current.offset);
        for prev in &active {
            // prev.offset <= current.offset and prev extends past it, so
            // the pair overlaps; order the pair by start time.
            if prev.start_time <= current.start_time {
                summary.record(prev, current);
            } else {
                summary.record(current, prev);
            }
        }
        active.push(current);
    }

    summary
}

/// Conflict summary for every file in an interval map.
pub fn analyze_all(intervals: &IntervalMap) -> HashMap<String, ConflictSummary> {
    intervals
        .iter()
        .map(|(name, ivs)| (name.clone(), analyze_file(ivs)))
        .collect()
}
