//! Chunk entry types
//!
//! These types describe what a collector finds while walking: how a directory
//! entry is classified, how a file name maps to a chunk index, and the open
//! handle that travels from the collector through the registry to the assembler.

use std::ffi::OsStr;
use std::fs::{File, FileType};
use std::path::{Path, PathBuf};

/// Type of directory entry, as reported without following links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (never followed)
    Symlink,
    /// Fifo, socket, device or anything else
    Other,
}

impl EntryKind {
    /// Classify from a non-following file type
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryKind::File
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryKind::Directory
    }

    /// Check if this is a symbolic link
    pub fn is_symlink(&self) -> bool {
        *self == EntryKind::Symlink
    }
}

/// Parse a file name as a chunk index
///
/// Only names made entirely of ASCII digits qualify; leading zeros are
/// allowed. Signs, whitespace, suffixes and values past `u64::MAX` make the
/// file noise rather than a chunk.
pub fn parse_chunk_index(name: &OsStr) -> Option<u64> {
    let name = name.to_str()?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// An open chunk file waiting to be copied into the output
#[derive(Debug)]
pub struct ChunkHandle {
    index: u64,
    path: PathBuf,
    file: File,
}

impl ChunkHandle {
    /// Open `path` for reading as chunk `index`
    pub fn open(index: u64, path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self { index, path, file })
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size on disk at the time of the call
    pub fn size(&self) -> u64 {
        self.file.metadata().map(|m| m.len()).unwrap_or(0)
    }

    /// Give up the handle, keeping only the file for reading
    pub fn into_parts(self) -> (u64, PathBuf, File) {
        (self.index, self.path, self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_chunk_index() {
        assert_eq!(parse_chunk_index(OsStr::new("0")), Some(0));
        assert_eq!(parse_chunk_index(OsStr::new("42")), Some(42));
        assert_eq!(parse_chunk_index(OsStr::new("007")), Some(7));
        assert_eq!(
            parse_chunk_index(OsStr::new("18446744073709551615")),
            Some(u64::MAX)
        );
    }

    #[test]
    fn test_parse_rejects_noise() {
        for name in ["", "abc", "12abc", "1.bin", "-1", "+1", " 3", "3 ", "0x10", "١"] {
            assert_eq!(parse_chunk_index(OsStr::new(name)), None, "{name:?}");
        }
        // Overflow is noise, not a wrapped index
        assert_eq!(parse_chunk_index(OsStr::new("18446744073709551616")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_rejects_non_utf8() {
        use std::os::unix::ffi::OsStringExt;
        let name = OsString::from_vec(vec![b'1', 0xff]);
        assert_eq!(parse_chunk_index(&name), None);
    }

    #[test]
    fn test_entry_kind_classification() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("5"), b"x").unwrap();

        let mut kinds: Vec<(OsString, EntryKind)> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (e.file_name(), EntryKind::from_file_type(e.file_type().unwrap()))
            })
            .collect();
        kinds.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(
            kinds,
            vec![
                (OsString::from("5"), EntryKind::File),
                (OsString::from("sub"), EntryKind::Directory),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_not_followed() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let meta = fs::symlink_metadata(dir.path().join("link")).unwrap();
        let kind = EntryKind::from_file_type(meta.file_type());
        assert!(kind.is_symlink());
        assert!(!kind.is_dir());
    }

    #[test]
    fn test_chunk_handle_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("3");
        fs::write(&path, b"abc").unwrap();

        let handle = ChunkHandle::open(3, &path).unwrap();
        assert_eq!(handle.index(), 3);
        assert_eq!(handle.path(), path.as_path());
        assert_eq!(handle.size(), 3);

        assert!(ChunkHandle::open(4, dir.path().join("4")).is_err());
    }
}
