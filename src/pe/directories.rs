//! Data-directory table at the tail of the optional header.

use std::fmt;

use crate::{
    pe::{flags::DataDirectoryKind, optional::DeclaredReader},
    Result,
};

/// One (address, size) entry of the data-directory table
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DataDirectory {
    /// Relative virtual address of the table
    pub virtual_address: u32,
    /// Size of the table in bytes
    pub size: u32,
    /// Position in the directory table, starting at 1
    pub index: u32,
}

impl DataDirectory {
    /// Encoded size of one entry in bytes
    pub const SIZE: usize = 8;

    /// The well-known slot this entry occupies, `None` past the 16th entry
    #[must_use]
    pub fn kind(&self) -> Option<DataDirectoryKind> {
        DataDirectoryKind::from_repr(self.index)
    }

    /// Returns `true` if both address and size are zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.virtual_address == 0 && self.size == 0
    }
}

/// Read up to `count` entries, stopping early once the declared header size is consumed.
///
/// The entries are returned in every case. The accompanying result is
/// [`crate::Error::OutOfBounds`] if the buffer ended before a declared entry; the list then holds
/// the entries read before that.
pub(crate) fn read_directories(
    reader: &mut DeclaredReader,
    count: u32,
) -> (Vec<DataDirectory>, Result<()>) {
    let available = reader.declared_remaining() / DataDirectory::SIZE;
    let count = (count as usize).min(available);
    let mut directories = Vec::with_capacity(count);

    for index in 1..=count {
        match reader.pair() {
            Ok(Some((virtual_address, size))) => directories.push(DataDirectory {
                virtual_address,
                size,
                index: index as u32,
            }),
            Ok(None) => break,
            Err(error) => return (directories, Err(error)),
        }
    }

    (directories, Ok(()))
}

impl fmt::Display for DataDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{:>2} {:<16}", self.index, kind.to_string())?,
            None => write!(f, "{:>2} {:<16}", self.index, "-")?,
        }
        write!(f, "{:#010x} {:#010x}", self.virtual_address, self.size)
    }
}
