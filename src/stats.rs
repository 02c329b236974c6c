//! Aggregate summaries over decoded traces
//!
//! Everything reporting collaborators tabulate that is not a chart or
//! HTML concern: per-layer and per-function call totals, records and
//! files per rank, the I/O transfer-size histogram, and per-file access
//! summaries with decoded open flags. All functions are pure over the
//! decoded structures and every output type serializes.

use crate::filter::FileFilter;
use crate::functions::{self, IoClass, Layer, TransferLayout};
use crate::metadata::LocalMetadata;
use crate::records::Record;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Call totals per instrumentation layer, summed across ranks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayerTotals {
    pub posix: u64,
    pub mpi: u64,
    pub hdf5: u64,
}

/// Sum the per-rank function counters into per-layer totals.
pub fn layer_totals<'a>(metas: impl IntoIterator<Item = &'a LocalMetadata>) -> LayerTotals {
    let mut totals = LayerTotals::default();
    for meta in metas {
        for (id, &count) in meta.function_counts.iter().enumerate() {
            if count <= 0 {
                continue;
            }
            let Some(desc) = u8::try_from(id).ok().and_then(functions::lookup) else {
                continue;
            };
            let slot = match desc.layer {
                Layer::Posix => &mut totals.posix,
                Layer::Mpi => &mut totals.mpi,
                Layer::Hdf5 => &mut totals.hdf5,
            };
            *slot += count as u64;
        }
    }
    totals
}

/// One function's aggregate call count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionCount {
    /// Normalized display name (`MPI_`, not `PMPI_`)
    pub name: &'static str,
    pub count: u64,
}

/// Aggregate call counts per function across ranks, most-called first,
/// zero-count functions omitted.
pub fn function_totals<'a>(
    metas: impl IntoIterator<Item = &'a LocalMetadata>,
) -> Vec<FunctionCount> {
    let mut counts = vec![0u64; functions::FUNCTIONS.len()];
    for meta in metas {
        for (id, &count) in meta.function_counts.iter().enumerate() {
            if count > 0 && id < counts.len() {
                counts[id] += count as u64;
            }
        }
    }

    let mut totals: Vec<FunctionCount> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(id, &count)| FunctionCount {
            name: functions::FUNCTIONS[id].display_name(),
            count,
        })
        .collect();
    totals.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(b.name)));
    totals
}

/// Total decoded-record count per rank, in rank order.
pub fn records_per_rank<'a>(metas: impl IntoIterator<Item = &'a LocalMetadata>) -> Vec<i32> {
    metas.into_iter().map(|m| m.total_records).collect()
}

/// Number of non-ignored files each rank touched, in rank order.
pub fn files_per_rank<'a>(
    metas: impl IntoIterator<Item = &'a LocalMetadata>,
    filter: &FileFilter,
) -> Vec<usize> {
    metas
        .into_iter()
        .map(|m| {
            m.files
                .iter()
                .filter(|f| !filter.is_ignored(&f.name))
                .count()
        })
        .collect()
}

/// Transfer size in bytes of one record, if it is a POSIX byte transfer.
fn transfer_size(rec: &Record) -> Option<i64> {
    let desc = functions::lookup(rec.func_id)?;
    match desc.class {
        IoClass::Transfer { layout, .. } => match layout {
            TransferLayout::Plain | TransferLayout::Positioned => {
                rec.args.get(2)?.parse().ok()
            }
            TransferLayout::Buffered => {
                let size: i64 = rec.args.get(1)?.parse().ok()?;
                let nmemb: i64 = rec.args.get(2)?.parse().ok()?;
                size.checked_mul(nmemb)
            }
        },
        _ => None,
    }
}

/// Histogram of transfer sizes over all records: size -> occurrences.
/// Non-transfer records and non-positive sizes are excluded.
pub fn io_size_histogram<'a>(
    records: impl IntoIterator<Item = &'a Record>,
) -> BTreeMap<i64, u64> {
    let mut histogram = BTreeMap::new();
    for rec in records {
        if let Some(size) = transfer_size(rec) {
            if size > 0 {
                *histogram.entry(size).or_insert(0) += 1;
            }
        }
    }
    histogram
}

/// How one file was opened and accessed, across all ranks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileAccessSummary {
    /// File size from the file map (bytes)
    pub size: i64,
    /// Decoded open-flag strings and verbatim `fopen` mode strings
    pub open_modes: BTreeSet<String>,
    pub read: bool,
    pub write: bool,
}

/// Open-flag bits as the traced platform logs them.
const OPEN_FLAGS: &[(i64, &str)] = &[
    (0x0001, "O_WRONLY"),
    (0x0002, "O_RDWR"),
    (0x0004, "O_NONBLOCK"),
    (0x0008, "O_APPEND"),
    (0x0010, "O_SHLOCK"),
    (0x0020, "O_EXLOCK"),
    (0x0040, "O_ASYNC"),
    (0x0080, "O_FSYNC"),
    (0x0200, "O_CREAT"),
    (0x0400, "O_TRUNC"),
    (0x0800, "O_EXCL"),
];

/// Render a numeric `open(2)` flags argument as `O_...` names.
pub fn decode_open_flags(flags: i64) -> String {
    let names: Vec<&str> = OPEN_FLAGS
        .iter()
        .filter(|&&(bit, _)| flags & bit != 0)
        .map(|&(_, name)| name)
        .collect();
    if names.is_empty() {
        "O_RDONLY".to_owned()
    } else {
        names.join(" | ")
    }
}

/// Build per-file access summaries from every rank's records and file
/// map, dropping ignored filenames.
pub fn file_access_summaries<'a>(
    ranks: impl IntoIterator<Item = (&'a [Record], &'a LocalMetadata)>,
    filter: &FileFilter,
) -> HashMap<String, FileAccessSummary> {
    let mut summaries: HashMap<String, FileAccessSummary> = HashMap::new();

    for (records, meta) in ranks {
        // Seed sizes so files that were mapped but never transferred
        // still appear.
        for info in &meta.files {
            if !filter.is_ignored(&info.name) {
                summaries.entry(info.name.clone()).or_default().size = info.size;
            }
        }

        for rec in records {
            let Some(desc) = functions::lookup(rec.func_id) else {
                continue;
            };
            match desc.class {
                IoClass::Open => {
                    let Some(name) = file_arg(rec, 0, meta) else {
                        continue;
                    };
                    let Some(mode) = open_mode(desc.name, rec) else {
                        continue;
                    };
                    if !filter.is_ignored(name) {
                        summaries
                            .entry(name.to_owned())
                            .or_default()
                            .open_modes
                            .insert(mode);
                    }
                }
                IoClass::Transfer { layout, is_read } => {
                    let fid_slot = match layout {
                        TransferLayout::Buffered => 3,
                        _ => 0,
                    };
                    let Some(name) = file_arg(rec, fid_slot, meta) else {
                        continue;
                    };
                    if filter.is_ignored(name) {
                        continue;
                    }
                    let entry = summaries.entry(name.to_owned()).or_default();
                    if is_read {
                        entry.read = true;
                    } else {
                        entry.write = true;
                    }
                }
                _ => {}
            }
        }
    }

    summaries
}

/// Resolve the file-id argument at `slot` to a filename.
fn file_arg<'a>(rec: &Record, slot: usize, meta: &'a LocalMetadata) -> Option<&'a str> {
    let fid: usize = rec.args.get(slot)?.parse().ok()?;
    meta.filename(fid)
}

/// The open mode of an `open`-class record: decoded flag names for the
/// numeric variants, the mode string verbatim for the stream variants.
fn open_mode(name: &str, rec: &Record) -> Option<String> {
    match name {
        "open" | "open64" => {
            let flags: i64 = rec.args.get(1)?.parse().ok()?;
            Some(decode_open_flags(flags))
        }
        "fopen" | "fopen64" | "fdopen" => rec.args.get(1).cloned(),
        // creat has an implied O_WRONLY|O_CREAT|O_TRUNC
        "creat" | "creat64" => Some(decode_open_flags(0x0001 | 0x0200 | 0x0400)),
        _ => None,
    }
}
