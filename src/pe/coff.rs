//! COFF file header.
//!
//! The 20-byte header shared by object files and images. For objects it sits at offset 0, for
//! images directly after the `PE\0\0` signature.

use std::fmt;

use crate::{
    file::{io::write_le_at, parser::Parser},
    pe::flags::{FileCharacteristics, Machine},
    Result,
};

/// The COFF file header
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CoffHeader {
    /// Target machine identifier, 0 applies to any machine
    pub machine: u16,
    /// Number of entries in the section table
    pub number_of_sections: u16,
    /// Low 32 bits of the creation time in seconds since the Unix epoch
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table, zero for images
    pub pointer_to_symbol_table: u32,
    /// Number of entries in the COFF symbol table, zero for images
    pub number_of_symbols: u32,
    /// Size of the optional header, zero for objects
    pub size_of_optional_header: u16,
    /// Characteristics bitmask, see [`FileCharacteristics`]
    pub characteristics: u16,
}

impl CoffHeader {
    /// Encoded size of the header in bytes
    pub const SIZE: usize = 20;

    /// Read the header at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the 20 bytes at `offset` do not fit into `data`.
    pub fn read(data: &[u8], offset: usize) -> Result<CoffHeader> {
        let mut parser = Parser::new(data);
        parser.seek(offset)?;
        parser.ensure_remaining(Self::SIZE)?;

        Ok(CoffHeader {
            machine: parser.read_le::<u16>()?,
            number_of_sections: parser.read_le::<u16>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            pointer_to_symbol_table: parser.read_le::<u32>()?,
            number_of_symbols: parser.read_le::<u32>()?,
            size_of_optional_header: parser.read_le::<u16>()?,
            characteristics: parser.read_le::<u16>()?,
        })
    }

    /// Encode the header at `offset` of `out`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `out` is too short.
    pub fn write(&self, out: &mut [u8], offset: usize) -> Result<()> {
        let mut offset = offset;
        write_le_at(out, &mut offset, self.machine)?;
        write_le_at(out, &mut offset, self.number_of_sections)?;
        write_le_at(out, &mut offset, self.time_date_stamp)?;
        write_le_at(out, &mut offset, self.pointer_to_symbol_table)?;
        write_le_at(out, &mut offset, self.number_of_symbols)?;
        write_le_at(out, &mut offset, self.size_of_optional_header)?;
        write_le_at(out, &mut offset, self.characteristics)
    }

    /// The machine type, if it is a known one
    #[must_use]
    pub fn machine_type(&self) -> Option<Machine> {
        Machine::from_repr(self.machine)
    }

    /// The characteristics as flags, undefined bits retained
    #[must_use]
    pub fn flags(&self) -> FileCharacteristics {
        FileCharacteristics::from_bits_retain(self.characteristics)
    }
}

impl fmt::Display for CoffHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "COFF file header")?;
        match self.machine_type() {
            Some(machine) => writeln!(f, "  machine                  {machine} ({:#06x})", self.machine)?,
            None => writeln!(f, "  machine                  {:#06x}", self.machine)?,
        }
        writeln!(f, "  number_of_sections       {}", self.number_of_sections)?;
        writeln!(f, "  time_date_stamp          {:#010x}", self.time_date_stamp)?;
        writeln!(f, "  pointer_to_symbol_table  {:#010x}", self.pointer_to_symbol_table)?;
        writeln!(f, "  number_of_symbols        {}", self.number_of_symbols)?;
        writeln!(f, "  size_of_optional_header  {}", self.size_of_optional_header)?;
        write!(f, "  characteristics          {:#06x}", self.characteristics)?;
        for (name, _) in self.flags().iter_names() {
            write!(f, " {name}")?;
        }
        writeln!(f)
    }
}
