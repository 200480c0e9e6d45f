//! Optional header decoding.
//!
//! The optional header follows the COFF file header in images. Its layout is selected by the
//! leading magic: PE32 (`0x10B`) and ROM (`0x107`) images carry a `base_of_data` field and
//! 4-byte image base, stack and heap fields, while PE32+ (`0x20B`) drops `base_of_data` and
//! widens those fields to 8 bytes.
//!
//! Decoding is bounded twice. The buffer bounds every read as usual, and the declared
//! `size_of_optional_header` bounds how many fields exist at all. A field the declared size no
//! longer covers ends decoding quietly and leaves it and every following field as `None`. A
//! field the declared size covers but the buffer does not is a truncation and is reported as an
//! error, keeping the fields read so far.

use std::fmt;

use crate::{
    file::{io::PeIO, parser::Parser},
    pe::flags::{DllCharacteristics, OptionalMagic, Subsystem},
    Result,
};

/// Cursor bounded by both the buffer and the declared optional-header size.
pub(crate) struct DeclaredReader<'a> {
    parser: Parser<'a>,
    declared: usize,
}

impl<'a> DeclaredReader<'a> {
    /// Position a reader at `offset` with `declared` bytes of header to consume
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` lies beyond the end of `data`.
    pub(crate) fn new(data: &'a [u8], offset: usize, declared: usize) -> Result<Self> {
        let mut parser = Parser::new(data);
        parser.seek(offset)?;

        Ok(DeclaredReader { parser, declared })
    }

    /// Bytes of the declared header not consumed yet
    pub(crate) fn declared_remaining(&self) -> usize {
        self.declared
    }

    /// Current position inside the buffer
    pub(crate) fn pos(&self) -> usize {
        self.parser.pos()
    }

    /// Read the next field if the declared size still covers it.
    ///
    /// Once a field does not fit, the declared budget is exhausted so that every later field
    /// reads as `None` too.
    pub(crate) fn field<T: PeIO>(&mut self) -> Result<Option<T>> {
        let width = std::mem::size_of::<T>();
        if self.declared < width {
            self.declared = 0;
            return Ok(None);
        }

        let value = self.parser.read_le::<T>()?;
        self.declared -= width;
        Ok(Some(value))
    }

    /// Read a field that is 8 bytes wide in PE32+ images and 4 bytes wide otherwise
    pub(crate) fn sized(&mut self, wide: bool) -> Result<Option<u64>> {
        if wide {
            self.field::<u64>()
        } else {
            Ok(self.field::<u32>()?.map(u64::from))
        }
    }

    /// Read an (address, size) pair if the declared size covers all 8 bytes
    pub(crate) fn pair(&mut self) -> Result<Option<(u32, u32)>> {
        if self.declared < 8 {
            self.declared = 0;
            return Ok(None);
        }

        self.parser.ensure_remaining(8)?;
        let address = self.parser.read_le::<u32>()?;
        let size = self.parser.read_le::<u32>()?;
        self.declared -= 8;
        Ok(Some((address, size)))
    }
}

/// The optional header of an image.
///
/// Only `magic` is guaranteed; every other field is `None` when the declared header size ended
/// before it, the layout was not recognised, or the declared size is below the minimum the
/// layout requires. `image_base` and the stack and heap sizes are widened to `u64` for all
/// layouts.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct OptionalHeader {
    /// Layout selector: `0x10B`, `0x20B` or `0x107`
    pub magic: u16,
    /// Linker major version
    pub major_linker_version: Option<u8>,
    /// Linker minor version
    pub minor_linker_version: Option<u8>,
    /// Size of all code sections
    pub size_of_code: Option<u32>,
    /// Size of all initialized data sections
    pub size_of_initialized_data: Option<u32>,
    /// Size of all uninitialized data sections
    pub size_of_uninitialized_data: Option<u32>,
    /// Entry point relative to the image base
    pub address_of_entry_point: Option<u32>,
    /// Start of the code section relative to the image base
    pub base_of_code: Option<u32>,
    /// Start of the data section relative to the image base, PE32 and ROM only
    pub base_of_data: Option<u32>,
    /// Preferred load address, a multiple of 64 KiB
    pub image_base: Option<u64>,
    /// Alignment of sections in memory
    pub section_alignment: Option<u32>,
    /// Alignment of section raw data in the file
    pub file_alignment: Option<u32>,
    /// Required operating system major version
    pub major_operating_system_version: Option<u16>,
    /// Required operating system minor version
    pub minor_operating_system_version: Option<u16>,
    /// Image major version
    pub major_image_version: Option<u16>,
    /// Image minor version
    pub minor_image_version: Option<u16>,
    /// Subsystem major version
    pub major_subsystem_version: Option<u16>,
    /// Subsystem minor version
    pub minor_subsystem_version: Option<u16>,
    /// Reserved, must be zero
    pub win32_version_value: Option<u32>,
    /// Size of the loaded image, a multiple of the section alignment
    pub size_of_image: Option<u32>,
    /// Size of all headers, a multiple of the file alignment
    pub size_of_headers: Option<u32>,
    /// Image checksum
    pub check_sum: Option<u32>,
    /// Required subsystem, see [`Subsystem`]
    pub subsystem: Option<u16>,
    /// DLL characteristics bitmask, see [`DllCharacteristics`]
    pub dll_characteristics: Option<u16>,
    /// Stack size to reserve
    pub size_of_stack_reserve: Option<u64>,
    /// Stack size to commit
    pub size_of_stack_commit: Option<u64>,
    /// Local heap size to reserve
    pub size_of_heap_reserve: Option<u64>,
    /// Local heap size to commit
    pub size_of_heap_commit: Option<u64>,
    /// Reserved, must be zero
    pub loader_flags: Option<u32>,
    /// Number of data-directory entries following the header
    pub number_of_rva_and_sizes: Option<u32>,
}

impl OptionalHeader {
    /// Create a header of which only the magic is known
    #[must_use]
    pub fn with_magic(magic: u16) -> OptionalHeader {
        OptionalHeader {
            magic,
            ..OptionalHeader::default()
        }
    }

    /// The layout selected by the magic, if it is a known one
    #[must_use]
    pub fn variant(&self) -> Option<OptionalMagic> {
        OptionalMagic::from_repr(self.magic)
    }

    /// Returns `true` if `declared` is below the minimum size of this header's layout
    #[must_use]
    pub fn is_undersized(&self, declared: u16) -> bool {
        self.variant()
            .and_then(OptionalMagic::minimum_size)
            .is_some_and(|minimum| declared < minimum)
    }

    /// The subsystem, if present and known
    #[must_use]
    pub fn subsystem_type(&self) -> Option<Subsystem> {
        self.subsystem.and_then(Subsystem::from_repr)
    }

    /// The DLL characteristics as flags, if present
    #[must_use]
    pub fn dll_flags(&self) -> Option<DllCharacteristics> {
        self.dll_characteristics
            .map(DllCharacteristics::from_bits_retain)
    }

    /// Decode the header whose `magic` was just read, every further field in layout order.
    ///
    /// Headers with an unknown magic, or a declared size below their layout's minimum, stop
    /// right after the magic.
    ///
    /// The header is returned in every case. The accompanying result is
    /// [`crate::Error::OutOfBounds`] if the buffer ended before a declared field; the header
    /// then holds the fields read up to that point.
    pub(crate) fn read(
        reader: &mut DeclaredReader,
        magic: u16,
        declared: u16,
    ) -> (OptionalHeader, Result<()>) {
        let mut header = OptionalHeader::with_magic(magic);
        let result = header.read_fields(reader, declared);
        (header, result)
    }

    fn read_fields(&mut self, reader: &mut DeclaredReader, declared: u16) -> Result<()> {
        let Some(variant) = self.variant() else {
            return Ok(());
        };
        if self.is_undersized(declared) {
            return Ok(());
        }
        let wide = variant.is_wide();

        self.major_linker_version = reader.field()?;
        self.minor_linker_version = reader.field()?;
        self.size_of_code = reader.field()?;
        self.size_of_initialized_data = reader.field()?;
        self.size_of_uninitialized_data = reader.field()?;
        self.address_of_entry_point = reader.field()?;
        self.base_of_code = reader.field()?;
        if !wide {
            self.base_of_data = reader.field()?;
        }
        self.image_base = reader.sized(wide)?;
        self.section_alignment = reader.field()?;
        self.file_alignment = reader.field()?;
        self.major_operating_system_version = reader.field()?;
        self.minor_operating_system_version = reader.field()?;
        self.major_image_version = reader.field()?;
        self.minor_image_version = reader.field()?;
        self.major_subsystem_version = reader.field()?;
        self.minor_subsystem_version = reader.field()?;
        self.win32_version_value = reader.field()?;
        self.size_of_image = reader.field()?;
        self.size_of_headers = reader.field()?;
        self.check_sum = reader.field()?;
        self.subsystem = reader.field()?;
        self.dll_characteristics = reader.field()?;
        self.size_of_stack_reserve = reader.sized(wide)?;
        self.size_of_stack_commit = reader.sized(wide)?;
        self.size_of_heap_reserve = reader.sized(wide)?;
        self.size_of_heap_commit = reader.sized(wide)?;
        self.loader_flags = reader.field()?;
        self.number_of_rva_and_sizes = reader.field()?;

        Ok(())
    }
}

fn write_field<T: fmt::LowerHex>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    value: Option<T>,
) -> fmt::Result {
    match value {
        Some(value) => writeln!(f, "  {name:<32}{value:#x}"),
        None => writeln!(f, "  {name:<32}-"),
    }
}

impl fmt::Display for OptionalHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optional header")?;
        match self.variant() {
            Some(variant) => writeln!(f, "  {:<32}{variant} ({:#06x})", "magic", self.magic)?,
            None => writeln!(f, "  {:<32}{:#06x}", "magic", self.magic)?,
        }
        write_field(f, "major_linker_version", self.major_linker_version)?;
        write_field(f, "minor_linker_version", self.minor_linker_version)?;
        write_field(f, "size_of_code", self.size_of_code)?;
        write_field(f, "size_of_initialized_data", self.size_of_initialized_data)?;
        write_field(f, "size_of_uninitialized_data", self.size_of_uninitialized_data)?;
        write_field(f, "address_of_entry_point", self.address_of_entry_point)?;
        write_field(f, "base_of_code", self.base_of_code)?;
        if self.variant() != Some(OptionalMagic::Pe32Plus) {
            write_field(f, "base_of_data", self.base_of_data)?;
        }
        write_field(f, "image_base", self.image_base)?;
        write_field(f, "section_alignment", self.section_alignment)?;
        write_field(f, "file_alignment", self.file_alignment)?;
        write_field(f, "major_operating_system_version", self.major_operating_system_version)?;
        write_field(f, "minor_operating_system_version", self.minor_operating_system_version)?;
        write_field(f, "major_image_version", self.major_image_version)?;
        write_field(f, "minor_image_version", self.minor_image_version)?;
        write_field(f, "major_subsystem_version", self.major_subsystem_version)?;
        write_field(f, "minor_subsystem_version", self.minor_subsystem_version)?;
        write_field(f, "win32_version_value", self.win32_version_value)?;
        write_field(f, "size_of_image", self.size_of_image)?;
        write_field(f, "size_of_headers", self.size_of_headers)?;
        write_field(f, "check_sum", self.check_sum)?;
        match self.subsystem_type() {
            Some(subsystem) => writeln!(f, "  {:<32}{subsystem}", "subsystem")?,
            None => write_field(f, "subsystem", self.subsystem)?,
        }
        match self.dll_flags() {
            Some(flags) => {
                write!(f, "  {:<32}{:#x}", "dll_characteristics", flags.bits())?;
                for (name, _) in flags.iter_names() {
                    write!(f, " {name}")?;
                }
                writeln!(f)?;
            }
            None => write_field(f, "dll_characteristics", self.dll_characteristics)?,
        }
        write_field(f, "size_of_stack_reserve", self.size_of_stack_reserve)?;
        write_field(f, "size_of_stack_commit", self.size_of_stack_commit)?;
        write_field(f, "size_of_heap_reserve", self.size_of_heap_reserve)?;
        write_field(f, "size_of_heap_commit", self.size_of_heap_commit)?;
        write_field(f, "loader_flags", self.loader_flags)?;
        write_field(f, "number_of_rva_and_sizes", self.number_of_rva_and_sizes)
    }
}
