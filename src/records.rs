//! Event-log record decoding and delta expansion
//!
//! Each rank's event log is a sequence of newline-terminated binary lines:
//!
//! ```text
//! { status: i8, start_offset: i32 LE, end_offset: i32 LE,
//!   func_or_ref: u8, <1 pad byte>, ' '-separated argument tokens } '\n'
//! ```
//!
//! `start_offset`/`end_offset` are time units relative to the rank's start
//! timestamp; multiply by the global `time_resolution` for seconds. The
//! four header fields may contain any byte value, including `0x0A`, so the
//! line terminator is only searched for at offset 10 or later of each line.
//!
//! # Delta encoding
//!
//! With `status == 0` a record is self-contained and `func_or_ref` is the
//! function id. With `status != 0` the record is delta-encoded against an
//! earlier record of the same rank: `func_or_ref` is the back-reference
//! distance (0 = immediately preceding record) and the low 7 bits of
//! `status` form an [`ArgMask`] saying which argument slots differ. The
//! record then carries only the replacement tokens, in slot order.
//! Back references always point strictly backward, so expanding front to
//! back resolves every chain.

use crate::error::{Result, TraceError};
use serde::Serialize;
use tracing::warn;

/// Argument-slot bitmask of a delta-encoded record.
///
/// Wire encoding: the low 7 bits of the status byte, bit `i` set ⇔
/// argument slot `i` was overwritten, least-significant-bit first. The
/// high bit only marks the record as delta-encoded and is not part of
/// the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgMask(u8);

impl ArgMask {
    pub fn from_status(status: u8) -> Self {
        Self(status & 0x7f)
    }

    /// Flagged slot indices, lowest first.
    pub fn slots(self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..7).filter(move |i| bits >> i & 1 == 1)
    }

    /// Number of flagged slots.
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }
}

/// One decoded log line, before delta expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    /// 0 = self-contained; otherwise delta-encoded with the low 7 bits
    /// as the argument mask
    pub status: u8,
    /// Start time in integer time units relative to the rank start
    pub start_offset: i32,
    /// End time in integer time units relative to the rank start
    pub end_offset: i32,
    /// Function id when self-contained, back-reference distance when
    /// delta-encoded
    pub func_or_ref: u8,
    /// Full argument list, or only the changed tokens for delta records
    pub args: Vec<String>,
}

/// Fully expanded record. Immutable once produced by [`decompress`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub start_offset: i32,
    pub end_offset: i32,
    pub func_id: u8,
    pub args: Vec<String>,
}

impl Record {
    /// Start time in seconds relative to the rank start.
    pub fn start_seconds(&self, time_resolution: f64) -> f64 {
        f64::from(self.start_offset) * time_resolution
    }

    /// End time in seconds relative to the rank start.
    pub fn end_seconds(&self, time_resolution: f64) -> f64 {
        f64::from(self.end_offset) * time_resolution
    }
}

/// Result of decoding one rank's event log.
///
/// A log that ends mid-record stops decoding at that point; everything
/// decoded before the bad line is still valid, so both are returned.
#[derive(Debug)]
pub struct DecodedLog {
    pub records: Vec<RawRecord>,
    /// Set when the tail of the log was truncated.
    pub truncation: Option<TraceError>,
}

/// Split a rank's event log into raw records, in file order.
///
/// Lines are found by scanning for `\n` starting 10 bytes past the
/// previous boundary; earlier bytes belong to the fixed header and may
/// legitimately contain `0x0A`.
pub fn decode_log(data: &[u8], rank: i32) -> DecodedLog {
    let mut records = Vec::new();
    let mut pos = 0usize;

    while pos < data.len() {
        if data.len() - pos < 10 {
            return DecodedLog {
                records,
                truncation: Some(TraceError::TruncatedRecord { rank, offset: pos }),
            };
        }
        let Some(nl) = data[pos + 10..].iter().position(|&b| b == b'\n') else {
            // Header present but the terminator never arrives: the tracer
            // was killed mid-write.
            return DecodedLog {
                records,
                truncation: Some(TraceError::TruncatedRecord { rank, offset: pos }),
            };
        };
        let line = &data[pos..pos + 10 + nl];
        records.push(decode_line(line));
        pos += 10 + nl + 1;
    }

    DecodedLog {
        records,
        truncation: None,
    }
}

/// Decode one complete line (terminator already stripped, length >= 10).
fn decode_line(line: &[u8]) -> RawRecord {
    let status = line[0];
    let start_offset = i32::from_le_bytes(line[1..5].try_into().unwrap());
    let end_offset = i32::from_le_bytes(line[5..9].try_into().unwrap());
    let func_or_ref = line[9];
    // Byte 10 is a pad/separator; tokens follow, space-separated.
    let args = if line.len() > 10 {
        String::from_utf8_lossy(&line[10..])
            .split_ascii_whitespace()
            .map(str::to_owned)
            .collect()
    } else {
        Vec::new()
    };

    RawRecord {
        status,
        start_offset,
        end_offset,
        func_or_ref,
        args,
    }
}

/// Expand all delta-encoded records of one rank, preserving order.
///
/// Records are consumed front to back; each delta record is patched
/// against the already-expanded record `1 + distance` positions earlier.
pub fn decompress(raw: Vec<RawRecord>, rank: i32) -> Result<Vec<Record>> {
    let mut out: Vec<Record> = Vec::with_capacity(raw.len());

    for (idx, rec) in raw.into_iter().enumerate() {
        if rec.status == 0 {
            out.push(Record {
                start_offset: rec.start_offset,
                end_offset: rec.end_offset,
                func_id: rec.func_or_ref,
                args: rec.args,
            });
            continue;
        }

        let distance = rec.func_or_ref as usize;
        let ref_idx = idx.checked_sub(1 + distance).ok_or(
            TraceError::InvalidBackReference {
                rank,
                record: idx,
                distance,
            },
        )?;
        let referent = &out[ref_idx];
        let func_id = referent.func_id;
        let mut args = referent.args.clone();

        let mask = ArgMask::from_status(rec.status);
        let supplied = rec.args.len();
        let mut tokens = rec.args.into_iter();
        for slot in mask.slots() {
            let token = tokens.next().ok_or(TraceError::ArgumentUnderflow {
                rank,
                record: idx,
                needed: mask.count(),
                supplied,
            })?;
            match args.get_mut(slot) {
                Some(arg) => *arg = token,
                None => {
                    // The writer never flags a slot past the referent's
                    // argument count; tolerate it without growing the list.
                    warn!(rank, record = idx, slot, "delta mask flags slot past referent arguments");
                }
            }
        }

        out.push(Record {
            start_offset: rec.start_offset,
            end_offset: rec.end_offset,
            func_id,
            args,
        });
    }

    Ok(out)
}

/// Stable sort by start time; ties keep original file order.
///
/// Delta chains are written in emission order, which asynchronous calls
/// can leave out of time order.
pub fn sort_by_start_time(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by_key(|r| r.start_offset);
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode one wire line the way the tracer writes it.
    fn line(status: u8, start: i32, end: i32, code: u8, args: &[&str]) -> Vec<u8> {
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

    fn log(lines: &[Vec<u8>]) -> Vec<u8> {
        lines.concat()
    }

    #[test]
    fn test_decode_single_record() {
        let data = log(&[line(0, 100, 200, 6, &["0", "0x7f", "4096"])]);
        let decoded = decode_log(&data, 0);
        assert!(decoded.truncation.is_none());
        assert_eq!(decoded.records.len(), 1);
        let r = &decoded.records[0];
        assert_eq!(r.status, 0);
        assert_eq!(r.start_offset, 100);
        assert_eq!(r.end_offset, 200);
        assert_eq!(r.func_or_ref, 6);
        assert_eq!(r.args, vec!["0", "0x7f", "4096"]);
    }

    #[test]
    fn test_decode_newline_inside_header() {
        // start_offset 0x0A == b'\n' in the first header byte run
        let data = log(&[
            line(0, 0x0A, 0x0A0A, 5, &["1", "p", "8"]),
            line(0, 7, 9, 6, &["2", "p", "16"]),
        ]);
        let decoded = decode_log(&data, 0);
        assert!(decoded.truncation.is_none());
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].start_offset, 0x0A);
        assert_eq!(decoded.records[1].args[2], "16");
    }

    #[test]
    fn test_decode_truncated_header() {
        let mut data = log(&[line(0, 1, 2, 6, &["0", "p", "4"])]);
        data.extend_from_slice(&[0u8; 5]); // partial next header
        let decoded = decode_log(&data, 3);
        assert_eq!(decoded.records.len(), 1);
        match decoded.truncation {
            Some(TraceError::TruncatedRecord { rank: 3, .. }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_missing_terminator() {
        let mut data = log(&[line(0, 1, 2, 6, &[])]);
        let mut tail = line(0, 3, 4, 5, &["0", "p", "4"]);
        tail.pop(); // strip the '\n'
        data.extend_from_slice(&tail);
        let decoded = decode_log(&data, 1);
        assert_eq!(decoded.records.len(), 1);
        assert!(decoded.truncation.is_some());
    }

    #[test]
    fn test_decode_empty_log() {
        let decoded = decode_log(&[], 0);
        assert!(decoded.records.is_empty());
        assert!(decoded.truncation.is_none());
    }

    #[test]
    fn test_argmask_bit_order() {
        let mask = ArgMask::from_status(0b1000_0101);
        assert_eq!(mask.slots().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(mask.count(), 2);

        // High bit alone: delta marker, no changed slots
        let empty = ArgMask::from_status(0b1000_0000);
        assert_eq!(empty.count(), 0);
    }

    #[test]
    fn test_decompress_single_slot_change() {
        // Self-contained record, then a delta changing only slot 2.
        let raw = vec![
            RawRecord {
                status: 0,
                start_offset: 10,
                end_offset: 20,
                func_or_ref: 6,
                args: vec!["0".into(), "0xbuf".into(), "4096".into()],
            },
            RawRecord {
                status: 0b1000_0100,
                start_offset: 30,
                end_offset: 40,
                func_or_ref: 0, // immediately preceding record
                args: vec!["8192".into()],
            },
        ];
        let out = decompress(raw, 0).unwrap();
        assert_eq!(out[1].func_id, 6);
        assert_eq!(out[1].args, vec!["0", "0xbuf", "8192"]);
        assert_eq!(out[1].start_offset, 30);
        // Referent untouched
        assert_eq!(out[0].args[2], "4096");
    }

    #[test]
    fn test_decompress_chain_full_length() {
        // Every record references its predecessor; each changes slot 0.
        let mut raw = vec![RawRecord {
            status: 0,
            start_offset: 0,
            end_offset: 1,
            func_or_ref: 5,
            args: vec!["0".into(), "p".into(), "64".into()],
        }];
        for i in 1..100 {
            raw.push(RawRecord {
                status: 0b1000_0001,
                start_offset: i,
                end_offset: i + 1,
                func_or_ref: 0,
                args: vec![format!("{i}")],
            });
        }
        let out = decompress(raw, 0).unwrap();
        assert_eq!(out.len(), 100);
        for (i, rec) in out.iter().enumerate() {
            assert_eq!(rec.func_id, 5);
            assert_eq!(rec.args[0], format!("{i}"));
            assert_eq!(rec.args[1], "p");
            assert_eq!(rec.args[2], "64");
        }
    }

    #[test]
    fn test_decompress_longer_distance() {
        let raw = vec![
            RawRecord {
                status: 0,
                start_offset: 0,
                end_offset: 1,
                func_or_ref: 6,
                args: vec!["1".into(), "p".into(), "4".into()],
            },
            RawRecord {
                status: 0,
                start_offset: 2,
                end_offset: 3,
                func_or_ref: 5,
                args: vec!["2".into(), "q".into(), "8".into()],
            },
            // distance 1 skips the write and references the read
            RawRecord {
                status: 0b1000_0001,
                start_offset: 4,
                end_offset: 5,
                func_or_ref: 1,
                args: vec!["3".into()],
            },
        ];
        let out = decompress(raw, 0).unwrap();
        assert_eq!(out[2].func_id, 6);
        assert_eq!(out[2].args, vec!["3", "p", "4"]);
    }

    #[test]
    fn test_decompress_invalid_back_reference() {
        let raw = vec![RawRecord {
            status: 0b1000_0001,
            start_offset: 0,
            end_offset: 1,
            func_or_ref: 0,
            args: vec!["x".into()],
        }];
        let err = decompress(raw, 2).unwrap_err();
        match err {
            TraceError::InvalidBackReference { rank, record, distance } => {
                assert_eq!((rank, record, distance), (2, 0, 0));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_decompress_argument_underflow() {
        let raw = vec![
            RawRecord {
                status: 0,
                start_offset: 0,
                end_offset: 1,
                func_or_ref: 6,
                args: vec!["1".into(), "p".into(), "4".into()],
            },
            // Mask flags slots 0 and 1 but only one token present
            RawRecord {
                status: 0b1000_0011,
                start_offset: 2,
                end_offset: 3,
                func_or_ref: 0,
                args: vec!["only".into()],
            },
        ];
        let err = decompress(raw, 0).unwrap_err();
        match err {
            TraceError::ArgumentUnderflow { needed, supplied, .. } => {
                assert_eq!((needed, supplied), (2, 1));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_sort_by_start_time_stable() {
        let mk = |start: i32, tag: &str| Record {
            start_offset: start,
            end_offset: start + 1,
            func_id: 6,
            args: vec![tag.to_owned()],
        };
        let sorted = sort_by_start_time(vec![mk(5, "a"), mk(1, "b"), mk(5, "c"), mk(0, "d")]);
        let tags: Vec<_> = sorted.iter().map(|r| r.args[0].as_str()).collect();
        assert_eq!(tags, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_decode_then_decompress_wire_roundtrip() {
        let data = log(&[
            line(0, 10, 20, 6, &["0", "0xb", "4096"]),
            line(0b1000_0100, 30, 40, 0, &["8192"]),
        ]);
        let decoded = decode_log(&data, 0);
        assert!(decoded.truncation.is_none());
        let out = decompress(decoded.records, 0).unwrap();
        assert_eq!(out[1].args, vec!["0", "0xb", "8192"]);
        assert_eq!(out[1].func_id, 6);
    }
}
