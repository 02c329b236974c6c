//! Filename filtering for conflict analysis and report summaries
//!
//! Traced jobs touch plenty of files nobody wants in a report: shared
//! libraries pulled in at startup, device nodes, pipes, `/proc` entries.
//! A [`FileFilter`] holds regex patterns for those. Filtering happens
//! after interval construction and before conflict analysis, so ignored
//! files still participate in cursor tracking.

use anyhow::{Context, Result};
use regex::RegexSet;

/// Patterns matched by [`FileFilter::default`].
const DEFAULT_PATTERNS: &[&str] = &[
    r"^/dev/",
    r"^/proc/",
    r"^/sys/",
    r"^/etc/",
    r"^/usr/",
    r"^/lib",
    r"^pipe:",
    r"^socket:",
    r"^anon_inode:",
    r"\.so(\.\d+)*$",
    r"^(stdin|stdout|stderr)$",
];

/// Predicate deciding which filenames are non-application files.
#[derive(Debug, Clone)]
pub struct FileFilter {
    ignored: RegexSet,
}

impl FileFilter {
    /// Filter that ignores nothing.
    pub fn none() -> Self {
        Self {
            ignored: RegexSet::empty(),
        }
    }

    /// Build a filter from caller-supplied regex patterns.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ignored = RegexSet::new(patterns).context("invalid ignore pattern")?;
        Ok(Self { ignored })
    }

    /// True if the filename matches any ignore pattern.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.is_match(name)
    }
}

impl Default for FileFilter {
    /// Stock pattern set: system paths, device nodes, pipes, sockets,
    /// shared libraries, and the standard streams.
    fn default() -> Self {
        Self::from_patterns(DEFAULT_PATTERNS).expect("default patterns are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_ignores_nothing() {
        let f = FileFilter::none();
        assert!(!f.is_ignored("/dev/null"));
        assert!(!f.is_ignored("output.dat"));
    }

    #[test]
    fn test_default_system_files() {
        let f = FileFilter::default();
        assert!(f.is_ignored("/dev/null"));
        assert!(f.is_ignored("/proc/self/maps"));
        assert!(f.is_ignored("/usr/lib/x86_64-linux-gnu/libc.so.6"));
        assert!(f.is_ignored("pipe:[38411]"));
        assert!(f.is_ignored("stdout"));
    }

    #[test]
    fn test_default_keeps_application_files() {
        let f = FileFilter::default();
        assert!(!f.is_ignored("/scratch/run42/checkpoint.h5"));
        assert!(!f.is_ignored("output.dat"));
        assert!(!f.is_ignored("/home/user/results/trace.out"));
    }

    #[test]
    fn test_custom_patterns() {
        let f = FileFilter::from_patterns([r"\.tmp$", r"^/scratch/"]).unwrap();
        assert!(f.is_ignored("job.tmp"));
        assert!(f.is_ignored("/scratch/x"));
        assert!(!f.is_ignored("/data/job.out"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(FileFilter::from_patterns(["(unclosed"]).is_err());
    }
}
