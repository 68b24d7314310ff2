// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Serial port discovery.
//!
//! Candidate ports are the entries of the device directory whose name
//! contains the port family prefix. Matching is a plain substring test, so
//! the `tty` family also yields `ttyUSB*` and `ttyS*` entries.
//!
//! The sequence is lazy and follows the directory's own iteration order,
//! which is not sorted. Reopening the directory restarts it.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConnectionError, EuroResult};
use crate::types::SerialPortKind;

// =============================================================================
// PortMatches
// =============================================================================

/// Lazy filter over directory entry names.
#[derive(Debug)]
pub struct PortMatches<I> {
    entries: I,
    prefix: String,
}

impl<I> PortMatches<I>
where
    I: Iterator<Item = String>,
{
    /// Creates a filter yielding names from `entries` that contain `prefix`.
    pub fn new(entries: I, prefix: impl Into<String>) -> Self {
        Self {
            entries,
            prefix: prefix.into(),
        }
    }

    /// Returns the prefix being matched.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl<I> Iterator for PortMatches<I>
where
    I: Iterator<Item = String>,
{
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let prefix = self.prefix.as_str();
        self.entries.by_ref().find(|name| name.contains(prefix))
    }
}

// =============================================================================
// EntryNames
// =============================================================================

/// Entry names of an open directory.
///
/// Entries that fail to read or whose names are not UTF-8 are skipped.
#[derive(Debug)]
pub struct EntryNames {
    inner: fs::ReadDir,
}

impl Iterator for EntryNames {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.inner.by_ref() {
            match entry.map(|e| e.file_name()).map(OsString::into_string) {
                Ok(Ok(name)) => return Some(name),
                Ok(Err(raw)) => {
                    tracing::trace!(name = ?raw, "Skipping non UTF-8 device entry");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable device entry");
                }
            }
        }
        None
    }
}

// =============================================================================
// DeviceDirectory
// =============================================================================

/// The directory scanned for serial devices, usually `/dev`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDirectory {
    path: PathBuf,
}

impl DeviceDirectory {
    /// Creates a handle to a device directory. Nothing is read until
    /// [`matching`](Self::matching) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the directory and returns the lazy sequence of entry names
    /// matching `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::DirectoryUnreadable`] if the directory
    /// cannot be opened.
    pub fn matching(&self, kind: SerialPortKind) -> EuroResult<PortMatches<EntryNames>> {
        let inner = fs::read_dir(&self.path).map_err(|source| ConnectionError::DirectoryUnreadable {
            path: self.path.clone(),
            source,
        })?;

        Ok(PortMatches::new(EntryNames { inner }, kind.prefix()))
    }

    /// Like [`matching`](Self::matching), yielding full device paths.
    pub fn candidate_paths(
        &self,
        kind: SerialPortKind,
    ) -> EuroResult<impl Iterator<Item = PathBuf> + '_> {
        Ok(self.matching(kind)?.map(move |name| self.path.join(name)))
    }
}

impl Default for DeviceDirectory {
    fn default() -> Self {
        Self::new("/dev")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EuroError, ErrorKind};

    fn names(list: &[&str]) -> std::vec::IntoIter<String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_matches_in_iteration_order() {
        let mut matches = PortMatches::new(
            names(&["ttyUSB0", "ttyS0", "random.txt", "ttyUSB1"]),
            SerialPortKind::TtyUsb.prefix(),
        );

        assert_eq!(matches.next().as_deref(), Some("ttyUSB0"));
        assert_eq!(matches.next().as_deref(), Some("ttyUSB1"));
        assert_eq!(matches.next(), None);
        assert_eq!(matches.next(), None);
    }

    #[test]
    fn test_tty_prefix_is_a_substring_match() {
        let matched: Vec<_> = PortMatches::new(
            names(&["ttyUSB0", "ttyS0", "random.txt", "console"]),
            SerialPortKind::Tty.prefix(),
        )
        .collect();

        assert_eq!(matched, vec!["ttyUSB0", "ttyS0"]);
    }

    #[test]
    fn test_directory_matching_restarts_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ttyUSB0", "ttyS0", "random.txt", "ttyUSB1"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let devices = DeviceDirectory::new(dir.path());
        let first: Vec<_> = devices.matching(SerialPortKind::TtyUsb).unwrap().collect();
        let second: Vec<_> = devices.matching(SerialPortKind::TtyUsb).unwrap().collect();

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["ttyUSB0", "ttyUSB1"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_candidate_paths_are_joined() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ttyS3"), b"").unwrap();

        let devices = DeviceDirectory::new(dir.path());
        let paths: Vec<_> = devices.candidate_paths(SerialPortKind::TtyS).unwrap().collect();
        assert_eq!(paths, vec![dir.path().join("ttyS3")]);
    }

    #[test]
    fn test_missing_directory() {
        let devices = DeviceDirectory::new("/nonexistent/device/dir");
        let error: EuroError = devices.matching(SerialPortKind::Tty).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Connection);
    }
}
