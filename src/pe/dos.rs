//! Legacy (MS-DOS) header and format signature.
//!
//! Every executable image starts with the 64-byte MS-DOS header. Its last field, `e_lfanew`,
//! points at the 4-byte `PE\0\0` signature that precedes the COFF file header. Raw object files
//! have neither; they start directly with the COFF header.
//!
//! The header is only decoded once the buffer holds at least [`DOS_REGION_LEN`] bytes, the size
//! of the canonical stub including its 16-bit program.

use std::fmt;

use crate::{
    file::{io::write_le_at, parser::Parser},
    pe::flags::{DOS_MAGIC, PE_SIGNATURE},
    Result,
};

/// Minimum buffer length before the legacy header is decoded
pub const DOS_REGION_LEN: usize = 128;

/// The MS-DOS header found at offset 0 of every image.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DosHeader {
    /// Magic number, `MZ`
    pub e_magic: u16,
    /// Bytes on the last page of the file
    pub e_cblp: u16,
    /// Pages in the file
    pub e_cp: u16,
    /// Relocations
    pub e_crlc: u16,
    /// Size of the header in paragraphs
    pub e_cparhdr: u16,
    /// Minimum extra paragraphs needed
    pub e_minalloc: u16,
    /// Maximum extra paragraphs needed
    pub e_maxalloc: u16,
    /// Initial (relative) SS value
    pub e_ss: u16,
    /// Initial SP value
    pub e_sp: u16,
    /// Checksum
    pub e_csum: u16,
    /// Initial IP value
    pub e_ip: u16,
    /// Initial (relative) CS value
    pub e_cs: u16,
    /// File address of the relocation table
    pub e_lfarlc: u16,
    /// Overlay number
    pub e_ovno: u16,
    /// Reserved, must be zero
    pub e_res: [u8; 8],
    /// OEM identifier
    pub e_oemid: u16,
    /// OEM information, `e_oemid` specific
    pub e_oeminfo: u16,
    /// Reserved, must be zero
    pub e_res2: [u8; 20],
    /// File address of the PE signature
    pub e_lfanew: u32,
}

impl DosHeader {
    /// Encoded size of the header in bytes
    pub const SIZE: usize = 64;

    /// Read the header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than [`DosHeader::SIZE`].
    pub fn read(data: &[u8]) -> Result<DosHeader> {
        let mut parser = Parser::new(data);
        parser.ensure_remaining(Self::SIZE)?;

        Ok(DosHeader {
            e_magic: parser.read_le::<u16>()?,
            e_cblp: parser.read_le::<u16>()?,
            e_cp: parser.read_le::<u16>()?,
            e_crlc: parser.read_le::<u16>()?,
            e_cparhdr: parser.read_le::<u16>()?,
            e_minalloc: parser.read_le::<u16>()?,
            e_maxalloc: parser.read_le::<u16>()?,
            e_ss: parser.read_le::<u16>()?,
            e_sp: parser.read_le::<u16>()?,
            e_csum: parser.read_le::<u16>()?,
            e_ip: parser.read_le::<u16>()?,
            e_cs: parser.read_le::<u16>()?,
            e_lfarlc: parser.read_le::<u16>()?,
            e_ovno: parser.read_le::<u16>()?,
            e_res: parser.read_array::<8>()?,
            e_oemid: parser.read_le::<u16>()?,
            e_oeminfo: parser.read_le::<u16>()?,
            e_res2: parser.read_array::<20>()?,
            e_lfanew: parser.read_le::<u32>()?,
        })
    }

    /// Encode the header into the first [`DosHeader::SIZE`] bytes of `out`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `out` is too short.
    pub fn write(&self, out: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        for value in [
            self.e_magic,
            self.e_cblp,
            self.e_cp,
            self.e_crlc,
            self.e_cparhdr,
            self.e_minalloc,
            self.e_maxalloc,
            self.e_ss,
            self.e_sp,
            self.e_csum,
            self.e_ip,
            self.e_cs,
            self.e_lfarlc,
            self.e_ovno,
        ] {
            write_le_at(out, &mut offset, value)?;
        }
        for byte in self.e_res {
            write_le_at(out, &mut offset, byte)?;
        }
        write_le_at(out, &mut offset, self.e_oemid)?;
        write_le_at(out, &mut offset, self.e_oeminfo)?;
        for byte in self.e_res2 {
            write_le_at(out, &mut offset, byte)?;
        }
        write_le_at(out, &mut offset, self.e_lfanew)
    }

    /// The canonical header emitted by linkers in front of a 64-byte stub program
    #[must_use]
    pub fn canonical() -> DosHeader {
        DosHeader {
            e_magic: DOS_MAGIC,
            e_cblp: 0x90,
            e_cp: 3,
            e_crlc: 0,
            e_cparhdr: 4,
            e_minalloc: 0,
            e_maxalloc: 0xFFFF,
            e_ss: 0,
            e_sp: 0xB8,
            e_csum: 0,
            e_ip: 0,
            e_cs: 0,
            e_lfarlc: 0x40,
            e_ovno: 0,
            e_res: [0; 8],
            e_oemid: 0,
            e_oeminfo: 0,
            e_res2: [0; 20],
            e_lfanew: DOS_REGION_LEN as u32,
        }
    }

    /// Returns `true` if the first reserved region (`e_res`) is zero-filled
    #[must_use]
    pub fn res_is_zero(&self) -> bool {
        self.e_res.iter().all(|byte| *byte == 0)
    }

    /// Returns `true` if the second reserved region (`e_res2`) is zero-filled
    #[must_use]
    pub fn res2_is_zero(&self) -> bool {
        self.e_res2.iter().all(|byte| *byte == 0)
    }
}

/// Returns `true` if `data` starts with the `MZ` magic
#[must_use]
pub fn has_dos_magic(data: &[u8]) -> bool {
    data.starts_with(&DOS_MAGIC.to_le_bytes())
}

/// Read the 4-byte format signature at `e_lfanew`, if it lies inside `data`
#[must_use]
pub fn read_signature(data: &[u8], e_lfanew: u32) -> Option<[u8; 4]> {
    let mut parser = Parser::new(data);
    parser.seek(usize::try_from(e_lfanew).ok()?).ok()?;
    parser.read_array::<4>().ok()
}

/// Returns `true` if `signature` is `PE\0\0`
#[must_use]
pub fn is_pe_signature(signature: &[u8; 4]) -> bool {
    *signature == PE_SIGNATURE
}

impl fmt::Display for DosHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MS-DOS header")?;
        writeln!(f, "  e_magic     {:#06x}", self.e_magic)?;
        writeln!(f, "  e_cblp      {:#06x}", self.e_cblp)?;
        writeln!(f, "  e_cp        {:#06x}", self.e_cp)?;
        writeln!(f, "  e_crlc      {:#06x}", self.e_crlc)?;
        writeln!(f, "  e_cparhdr   {:#06x}", self.e_cparhdr)?;
        writeln!(f, "  e_minalloc  {:#06x}", self.e_minalloc)?;
        writeln!(f, "  e_maxalloc  {:#06x}", self.e_maxalloc)?;
        writeln!(f, "  e_ss        {:#06x}", self.e_ss)?;
        writeln!(f, "  e_sp        {:#06x}", self.e_sp)?;
        writeln!(f, "  e_csum      {:#06x}", self.e_csum)?;
        writeln!(f, "  e_ip        {:#06x}", self.e_ip)?;
        writeln!(f, "  e_cs        {:#06x}", self.e_cs)?;
        writeln!(f, "  e_lfarlc    {:#06x}", self.e_lfarlc)?;
        writeln!(f, "  e_ovno      {:#06x}", self.e_ovno)?;
        writeln!(f, "  e_res       {}", hex::encode(self.e_res))?;
        writeln!(f, "  e_oemid     {:#06x}", self.e_oemid)?;
        writeln!(f, "  e_oeminfo   {:#06x}", self.e_oeminfo)?;
        writeln!(f, "  e_res2      {}", hex::encode(self.e_res2))?;
        writeln!(f, "  e_lfanew    {:#010x}", self.e_lfanew)
    }
}
