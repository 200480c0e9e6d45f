//! Little-endian, bounds-checked field reading and writing for PE/COFF headers.
//!
//! Every multi-byte field in the DOS, COFF and optional headers is stored little-endian,
//! independent of the host the file is inspected on. This module is the single place where
//! raw bytes become integers (and integers become bytes, for fixture generation), and it
//! guarantees that no read or write ever touches a byte outside the provided buffer.
//!
//! # Key Components
//!
//! - [`crate::file::io::PeIO`] - Trait implemented by the unsigned field widths PE headers use
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::write_le`] - Write a value to the start of a buffer
//! - [`crate::file::io::write_le_at`] - Write a value at an offset and advance the offset
//!
//! # Error Handling
//!
//! All functions return [`crate::Error::OutOfBounds`] when the buffer is too short. On error
//! the offset is left untouched, so a caller can report exactly where decoding stopped.
//!
//! # Examples
//!
//! ```rust
//! use pescope::file::io::{read_le_at, write_le_at};
//!
//! let mut header = [0u8; 6];
//! let mut offset = 0;
//! write_le_at(&mut header, &mut offset, 0x5A4D_u16)?;
//! write_le_at(&mut header, &mut offset, 0x80_u32)?;
//!
//! let mut offset = 0;
//! let magic: u16 = read_le_at(&header, &mut offset)?;
//! let lfanew: u32 = read_le_at(&header, &mut offset)?;
//! assert_eq!((magic, lfanew), (0x5A4D, 0x80));
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for the fixed-width unsigned integers that make up PE header fields.
///
/// Each implementation names the byte array it converts from and to, so the generic readers
/// can slice exactly `size_of::<T>()` bytes and hand them over without any host-order
/// assumptions.
pub trait PeIO: Sized + Copy {
    /// Byte array representation of this field width.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Build the value from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Convert the value into little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
}

impl PeIO for u64 {
    type Bytes = [u8; 8];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        u64::from_le_bytes(bytes)
    }

    fn to_le_bytes(self) -> Self::Bytes {
        u64::to_le_bytes(self)
    }
}

impl PeIO for u32 {
    type Bytes = [u8; 4];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        u32::from_le_bytes(bytes)
    }

    fn to_le_bytes(self) -> Self::Bytes {
        u32::to_le_bytes(self)
    }
}

impl PeIO for u16 {
    type Bytes = [u8; 2];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        u16::from_le_bytes(bytes)
    }

    fn to_le_bytes(self) -> Self::Bytes {
        u16::to_le_bytes(self)
    }
}

impl PeIO for u8 {
    type Bytes = [u8; 1];

    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        u8::from_le_bytes(bytes)
    }

    fn to_le_bytes(self) -> Self::Bytes {
        u8::to_le_bytes(self)
    }
}

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: PeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`.
///
/// On success the offset is advanced by `size_of::<T>()`; on failure it is left unchanged.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the value would extend past the end of `data`.
///
/// # Examples
///
/// ```rust
/// use pescope::file::io::read_le_at;
///
/// let data = [0x4C, 0x01, 0x02, 0x00]; // machine = i386, sections = 2
/// let mut offset = 0;
///
/// let machine: u16 = read_le_at(&data, &mut offset)?;
/// let sections: u16 = read_le_at(&data, &mut offset)?;
/// assert_eq!((machine, sections, offset), (0x014C, 2, 4));
/// # Ok::<(), pescope::Error>(())
/// ```
pub fn read_le_at<T: PeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Writes `value` in little-endian byte order to the start of `data`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn write_le<T: PeIO>(data: &mut [u8], value: T) -> Result<()> {
    let mut offset = 0_usize;
    write_le_at(data, &mut offset, value)
}

/// Writes `value` in little-endian byte order at `offset` and advances the offset.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the value would extend past the end of `data`.
pub fn write_le_at<T: PeIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(value.to_le_bytes().as_ref());
    *offset = end;

    Ok(())
}
