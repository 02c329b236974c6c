//! Synthetic trace-directory builder shared by integration tests.
//!
//! Writes the same byte layouts the tracer produces: a 20-byte global
//! header plus advisory names, per-rank metadata with the 256-slot
//! counter block, and newline-terminated binary event-log lines.

#![allow(dead_code)] // not every test binary uses every helper

use std::fs;
use std::path::Path;

pub const COUNTER_SLOTS: usize = 256;

pub fn write_global(dir: &Path, time_resolution: f64, process_count: i32) {
    let mut buf = Vec::new();
    buf.extend_from_slice(&time_resolution.to_le_bytes());
    buf.extend_from_slice(&process_count.to_le_bytes());
    buf.extend_from_slice(&2i32.to_le_bytes()); // compression mode
    buf.extend_from_slice(&3i32.to_le_bytes()); // window size
    for name in ["open", "read", "write", "MPI_Barrier"] {
        buf.extend_from_slice(name.as_bytes());
        buf.push(b'\n');
    }
    fs::write(dir.join("recorder.mt"), buf).unwrap();
}

pub fn write_local(
    dir: &Path,
    rank: i32,
    files: &[(i32, i64, &str)],
    counts: &[(usize, i32)],
    total_records: i32,
) {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0.0f64.to_le_bytes()); // start ts
    buf.extend_from_slice(&60.0f64.to_le_bytes()); // end ts
    buf.extend_from_slice(&(files.len() as i32).to_le_bytes());
    buf.extend_from_slice(&total_records.to_le_bytes());
    buf.extend_from_slice(&[0u8; 16]); // pointers

    let mut counters = vec![0i32; COUNTER_SLOTS];
    for &(id, n) in counts {
        counters[id] = n;
    }
    for c in counters {
        buf.extend_from_slice(&c.to_le_bytes());
    }

    for &(id, size, name) in files {
        buf.extend_from_slice(&id.to_le_bytes());
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(&(name.len() as i32).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
    }
    fs::write(dir.join(format!("{rank}.mt")), buf).unwrap();
}

/// Encode one event-log line: 10-byte header, pad/separator, tokens.
pub fn record_line(status: u8, start: i32, end: i32, code: u8, args: &[&str]) -> Vec<u8> {
    let mut buf = vec![status];
    buf.extend_from_slice(&start.to_le_bytes());
    buf.extend_from_slice(&end.to_le_bytes());
    buf.push(code);
    for a in args {
        buf.push(b' ');
        buf.extend_from_slice(a.as_bytes());
    }
    buf.push(b'\n');
    buf
}

pub fn write_log(dir: &Path, rank: i32, lines: &[Vec<u8>]) {
    fs::write(dir.join(format!("{rank}.itf")), lines.concat()).unwrap();
}

// Function ids used by the tests, matching the compiled-in table.
pub const F_OPEN: u8 = 2;
pub const F_WRITE: u8 = 5;
pub const F_READ: u8 = 6;
pub const F_PREAD: u8 = 9;
pub const F_PWRITE: u8 = 11;
pub const F_FWRITE: u8 = 20;
pub const F_MPI_BARRIER: u8 = 105;
