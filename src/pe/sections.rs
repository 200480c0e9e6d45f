//! Section table.
//!
//! The table directly follows the optional header (or the COFF header, for objects) and holds
//! `number_of_sections` records of 40 bytes each. The table is decoded as a unit: if the buffer
//! cannot hold every declared record, none is decoded.

use std::fmt;

use crate::{
    file::{io::write_le_at, parser::Parser},
    pe::flags::SectionCharacteristics,
    Result,
};

/// One record of the section table
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SectionHeader {
    /// Null-padded name, or `/` followed by a decimal string-table offset in objects
    pub name: [u8; 8],
    /// Size of the section in memory
    pub virtual_size: u32,
    /// Address of the section relative to the image base
    pub virtual_address: u32,
    /// Size of the initialized data on disk
    pub size_of_raw_data: u32,
    /// File offset of the section data
    pub pointer_to_raw_data: u32,
    /// File offset of the relocation entries
    pub pointer_to_relocations: u32,
    /// File offset of the COFF line-number entries
    pub pointer_to_linenumbers: u32,
    /// Number of relocation entries
    pub number_of_relocations: u16,
    /// Number of COFF line-number entries
    pub number_of_linenumbers: u16,
    /// Characteristics bitmask, see [`SectionCharacteristics`]
    pub characteristics: u32,
}

impl SectionHeader {
    /// Encoded size of one record in bytes
    pub const SIZE: usize = 40;

    /// Read one record at the parser's position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 40 bytes remain.
    pub fn read(parser: &mut Parser) -> Result<SectionHeader> {
        parser.ensure_remaining(Self::SIZE)?;

        Ok(SectionHeader {
            name: parser.read_array::<8>()?,
            virtual_size: parser.read_le::<u32>()?,
            virtual_address: parser.read_le::<u32>()?,
            size_of_raw_data: parser.read_le::<u32>()?,
            pointer_to_raw_data: parser.read_le::<u32>()?,
            pointer_to_relocations: parser.read_le::<u32>()?,
            pointer_to_linenumbers: parser.read_le::<u32>()?,
            number_of_relocations: parser.read_le::<u16>()?,
            number_of_linenumbers: parser.read_le::<u16>()?,
            characteristics: parser.read_le::<u32>()?,
        })
    }

    /// Encode the record at `offset` of `out`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `out` is too short.
    pub fn write(&self, out: &mut [u8], offset: usize) -> Result<()> {
        let mut offset = offset;
        for byte in self.name {
            write_le_at(out, &mut offset, byte)?;
        }
        write_le_at(out, &mut offset, self.virtual_size)?;
        write_le_at(out, &mut offset, self.virtual_address)?;
        write_le_at(out, &mut offset, self.size_of_raw_data)?;
        write_le_at(out, &mut offset, self.pointer_to_raw_data)?;
        write_le_at(out, &mut offset, self.pointer_to_relocations)?;
        write_le_at(out, &mut offset, self.pointer_to_linenumbers)?;
        write_le_at(out, &mut offset, self.number_of_relocations)?;
        write_le_at(out, &mut offset, self.number_of_linenumbers)?;
        write_le_at(out, &mut offset, self.characteristics)
    }

    /// The name with trailing NUL padding removed, lossily converted to UTF-8
    #[must_use]
    pub fn name_str(&self) -> String {
        let end = self
            .name
            .iter()
            .rposition(|byte| *byte != 0)
            .map_or(0, |last| last + 1);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// The characteristics as flags, alignment bits retained
    #[must_use]
    pub fn flags(&self) -> SectionCharacteristics {
        SectionCharacteristics::from_bits_retain(self.characteristics)
    }
}

/// Read `count` records starting at `offset`, all or nothing.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer cannot hold all `count` records.
pub(crate) fn read_section_table(
    data: &[u8],
    offset: usize,
    count: u16,
) -> Result<Vec<SectionHeader>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut parser = Parser::new(data);
    parser.seek(offset)?;
    parser.ensure_remaining(usize::from(count) * SectionHeader::SIZE)?;

    let mut sections = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        sections.push(SectionHeader::read(&mut parser)?);
    }

    Ok(sections)
}

impl fmt::Display for SectionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} vsize {:#010x} vaddr {:#010x} rawsize {:#010x} rawptr {:#010x} reloc {:#010x}/{} lines {:#010x}/{} flags {:#010x}",
            self.name_str(),
            self.virtual_size,
            self.virtual_address,
            self.size_of_raw_data,
            self.pointer_to_raw_data,
            self.pointer_to_relocations,
            self.number_of_relocations,
            self.pointer_to_linenumbers,
            self.number_of_linenumbers,
            self.characteristics
        )?;

        let flags = self.flags();
        for (name, _) in flags
            .difference(SectionCharacteristics::ALIGN_MASK)
            .iter_names()
        {
            write!(f, " {name}")?;
        }
        if let Some(alignment) = flags.alignment() {
            write!(f, " {alignment}")?;
        }
        Ok(())
    }
}
