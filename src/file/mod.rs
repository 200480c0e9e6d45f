//! Binary input handling.
//!
//! This module abstracts over where the bytes of a binary come from and hands them to the
//! header decoder. A [`crate::file::File`] owns its data through a [`crate::file::Backend`]:
//! either a read-only memory map of a file on disk, or a buffer already in memory.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - Loaded binary, entry point for decoding and inspection
//! - [`crate::file::Backend`] - Trait for the different data sources
//! - [`crate::file::parser::Parser`] - Bounds-checked cursor used by the header decoders
//! - [`crate::file::io`] - Little-endian primitive reads and writes
//!
//! # Examples
//!
//! ## Loading from memory
//!
//! ```rust
//! use pescope::{pe::build_minimal_stub, File};
//!
//! let file = File::from_mem(build_minimal_stub(None)?)?;
//! assert_eq!(file.len(), 0x84);
//!
//! let headers = file.headers();
//! assert!(headers.is_image());
//! assert!(headers.coff().is_none());
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ## Loading from disk
//!
//! ```rust,no_run
//! use pescope::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("C:/Windows/System32/kernel32.dll"))?;
//! for violation in file.inspect().violations() {
//!     println!("{violation}");
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Backends are `Send + Sync` and a [`crate::file::File`] is never mutated after loading, so
//! it can be shared across threads freely.

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use log::debug;

use crate::{
    pe::{self, Inspection, PeHeaders},
    Error::{Empty, Precondition},
    Result,
};
use memory::Memory;
use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of binary data, allowing for both in-memory and
/// on-disk representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// A loaded binary.
///
/// Loading only checks that there is something to decode. Everything else, including
/// whether the bytes look like a PE file at all, is reported by [`File::inspect`] as
/// structural findings rather than errors.
///
/// # Examples
///
/// ```rust
/// use pescope::{pe::build_minimal_stub, File};
///
/// let file = File::from_mem(build_minimal_stub(None)?)?;
/// let inspection = file.inspect();
///
/// assert!(!inspection.is_valid());
/// assert_eq!(
///     inspection.violations().to_string(),
///     "Binary (Img) does not have valid length"
/// );
/// # Ok::<(), pescope::Error>(())
/// ```
pub struct File {
    data: Box<dyn Backend>,
}

impl File {
    /// Loads a binary from disk by memory-mapping it.
    ///
    /// # Arguments
    ///
    /// * `file` - Path to the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path is empty ([`crate::Error::Precondition`])
    /// - The file cannot be opened or mapped ([`crate::Error::FileError`])
    /// - The file is empty ([`crate::Error::Empty`])
    pub fn from_file(file: &Path) -> Result<File> {
        if file.as_os_str().is_empty() {
            return Err(Precondition("a path to a binary is required"));
        }

        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a binary from a memory buffer.
    ///
    /// # Arguments
    ///
    /// * `data` - The bytes of the binary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] if the buffer is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        debug!("loaded {} byte binary", data.len());
        Ok(File {
            data: Box::new(data),
        })
    }

    /// Returns the total size of the loaded binary in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the binary has a length of zero.
    ///
    /// A loaded [`File`] is never empty; this exists for API symmetry with [`File::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the entire binary.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns a slice of the binary at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// Decode the headers of the binary.
    ///
    /// See [`crate::pe::decode`].
    #[must_use]
    pub fn headers(&self) -> PeHeaders {
        pe::decode(self.data())
    }

    /// Decode the headers and validate them with every rule group enabled.
    ///
    /// See [`crate::pe::inspect`].
    #[must_use]
    pub fn inspect(&self) -> Inspection {
        pe::inspect(self.data())
    }
}
