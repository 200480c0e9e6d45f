//! Memory-mapped file backend.
//!
//! [`crate::file::physical::Physical`] maps a file from disk read-only into the address space
//! and serves it through the [`crate::file::Backend`] trait. Header decoding only touches the
//! first few pages of a binary, so mapping avoids reading large images in full.
//!
//! Empty files are rejected before mapping, as some platforms refuse zero-length maps.

use super::Backend;
use crate::{
    Error::{Empty, FileError, OutOfBounds},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses memory-mapped I/O for access to files on disk.
///
/// # Examples
///
/// ```rust,ignore
/// use pescope::file::{Physical, Backend};
/// use std::path::Path;
///
/// let physical = Physical::new(Path::new("kernel32.dll"))?;
/// assert_eq!(physical.data_slice(0, 2)?, b"MZ");
/// # Ok::<(), pescope::Error>(())
/// ```
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// # Arguments
    /// * `path` - Path to the file on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped, and
    /// [`crate::Error::Empty`] if the file has no content.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        if file.metadata()?.len() == 0 {
            return Err(Empty);
        }

        // The map stays valid only while no other process truncates the file.
        let mmap = unsafe { Mmap::map(&file) }.map_err(FileError)?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_file(name: &str, content: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "pescope_physical_{}_{}.bin",
            name,
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_physical() {
        let mut content = vec![0u8; 0x84];
        content[0..2].copy_from_slice(b"MZ");
        content[0x80..0x84].copy_from_slice(b"PE\0\0");
        let path = temp_file("map", &content);

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.len(), 0x84);
        assert_eq!(physical.data_slice(0, 2).unwrap(), b"MZ");
        assert_eq!(physical.data_slice(0x80, 4).unwrap(), b"PE\0\0");
        assert!(physical.data_slice(0x80, 5).is_err());
        assert!(physical.data_slice(usize::MAX, 1).is_err());
        let empty_slice: &[u8] = &[];
        assert_eq!(physical.data_slice(0x84, 0).unwrap(), empty_slice);

        drop(physical);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_file_path() {
        let result = Physical::new(PathBuf::from("/nonexistent/path/to/file.dll"));
        match result {
            Err(FileError(io_error)) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError"),
        }
    }

    #[test]
    fn test_empty_file() {
        let path = temp_file("empty", b"");

        assert!(matches!(Physical::new(&path), Err(Empty)));

        std::fs::remove_file(&path).unwrap();
    }
}
