//! Global and per-process trace metadata
//!
//! A trace directory holds one global metadata file for the whole run and
//! one metadata file per traced process (rank). Both are fixed-width
//! little-endian headers followed by variable-length tails:
//!
//! ```text
//! global:  { time_resolution: f64, process_count: i32,
//!            compression_mode: i32, window_size: i32 }      (20 bytes)
//!          then newline-separated function names (advisory)
//!
//! local:   { start_ts: f64, end_ts: f64,
//!            file_count: i32, total_records: i32 }           (24 bytes)
//!          16 bytes of in-process pointers (meaningless here, skipped)
//!          function_counts: i32[256]
//!          file_count x { file_id: i32, file_size: i64,
//!                         name_len: i32, name: name_len bytes }
//! ```
//!
//! The function-name list in the global file records what the tracer
//! version actually intercepted; decoding uses the compiled-in table in
//! [`crate::functions`] instead, because logged names carry raw-binding
//! prefixes that need normalization.

use crate::error::{Result, TraceError};
use crate::functions::COUNTER_SLOTS;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Run-level metadata, one per trace directory.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalMetadata {
    /// Seconds per integer time unit in record timestamps
    pub time_resolution: f64,
    /// Number of traced processes (ranks)
    pub process_count: i32,
    /// Compression mode the tracer ran with (2 = delta compression)
    pub compression_mode: i32,
    /// Sliding-window size the tracer used when emitting delta records
    pub window_size: i32,
    /// Advisory function-name list from the file tail, kept for inspection
    pub advisory_functions: Vec<String>,
}

/// One entry of a rank's file map.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    /// File size in bytes as observed at trace finalization
    pub size: i64,
    /// Filename bytes as logged; non-UTF-8 bytes are replaced
    pub name: String,
}

/// Per-process metadata, one per rank. Never mutated after load.
#[derive(Debug, Clone, Serialize)]
pub struct LocalMetadata {
    pub start_ts: f64,
    pub end_ts: f64,
    pub file_count: i32,
    pub total_records: i32,
    /// Call count per function id, `COUNTER_SLOTS` entries
    pub function_counts: Vec<i32>,
    /// Dense file map: index is the file id referenced by records
    pub files: Vec<FileInfo>,
}

/// Little-endian field reader over a metadata buffer. Any read past the
/// end becomes `MalformedMetadata` naming the file.
struct Fields<'a> {
    buf: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> Fields<'a> {
    fn new(buf: &'a [u8], path: &'a Path) -> Self {
        Self { buf, pos: 0, path }
    }

    fn malformed(&self, reason: impl Into<String>) -> TraceError {
        TraceError::MalformedMetadata {
            path: self.path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(self.malformed(format!(
                "truncated: need {} bytes at offset {}, file has {}",
                n,
                self.pos,
                self.buf.len()
            ))),
        }
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn f64(&mut self) -> Result<f64> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes(b.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes(b.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes(b.try_into().unwrap()))
    }
}

impl GlobalMetadata {
    /// Read the global metadata file of a trace directory.
    pub fn read(path: &Path) -> Result<Self> {
        let buf = fs::read(path)?;
        Self::parse(&buf, path)
    }

    fn parse(buf: &[u8], path: &Path) -> Result<Self> {
        let mut f = Fields::new(buf, path);
        let time_resolution = f.f64()?;
        let process_count = f.i32()?;
        let compression_mode = f.i32()?;
        let window_size = f.i32()?;

        if process_count < 0 {
            return Err(f.malformed(format!("negative process count {process_count}")));
        }

        let advisory_functions = buf[f.pos..]
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();

        Ok(Self {
            time_resolution,
            process_count,
            compression_mode,
            window_size,
            advisory_functions,
        })
    }
}

impl LocalMetadata {
    /// Read one rank's metadata file.
    pub fn read(path: &Path) -> Result<Self> {
        let buf = fs::read(path)?;
        Self::parse(&buf, path)
    }

    fn parse(buf: &[u8], path: &Path) -> Result<Self> {
        let mut f = Fields::new(buf, path);
        let start_ts = f.f64()?;
        let end_ts = f.f64()?;
        let file_count = f.i32()?;
        let total_records = f.i32()?;

        if file_count < 0 {
            return Err(f.malformed(format!("negative file count {file_count}")));
        }

        // Two pointer-sized fields only meaningful inside the traced
        // process's address space.
        f.skip(16)?;

        let mut function_counts = Vec::with_capacity(COUNTER_SLOTS);
        for _ in 0..COUNTER_SLOTS {
            function_counts.push(f.i32()?);
        }

        let mut files: Vec<Option<FileInfo>> = Vec::new();
        files.resize_with(file_count as usize, || None);
        for _ in 0..file_count {
            let file_id = f.i32()?;
            let size = f.i64()?;
            let name_len = f.i32()?;
            if name_len < 0 {
                return Err(f.malformed(format!("negative filename length {name_len}")));
            }
            let name = String::from_utf8_lossy(f.take(name_len as usize)?).into_owned();

            let slot = usize::try_from(file_id)
                .ok()
                .and_then(|i| files.get_mut(i))
                .ok_or_else(|| {
                    TraceError::MalformedMetadata {
                        path: path.to_path_buf(),
                        reason: format!(
                            "file id {file_id} outside [0, {file_count})"
                        ),
                    }
                })?;
            if slot.is_some() {
                return Err(TraceError::MalformedMetadata {
                    path: path.to_path_buf(),
                    reason: format!("duplicate file id {file_id}"),
                });
            }
            *slot = Some(FileInfo { size, name });
        }

        // Every slot was filled exactly once by the loop above.
        let files = files.into_iter().map(Option::unwrap).collect();

        Ok(Self {
            start_ts,
            end_ts,
            file_count,
            total_records,
            function_counts,
            files,
        })
    }

    /// Filename for a record's file-id argument, if the id is in range.
    pub fn filename(&self, file_id: usize) -> Option<&str> {
        self.files.get(file_id).map(|f| f.name.as_str())
    }
}

/// Conventional file names inside a trace directory.
pub fn global_metadata_path(dir: &Path) -> PathBuf {
    dir.join("recorder.mt")
}

/// Per-rank metadata file: `<rank>.mt`.
pub fn local_metadata_path(dir: &Path, rank: i32) -> PathBuf {
    dir.join(format!("{rank}.mt"))
}

/// Per-rank event log: `<rank>.itf`.
pub fn event_log_path(dir: &Path, rank: i32) -> PathBuf {
    dir.join(format!("{rank}.itf"))
}
