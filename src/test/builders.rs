//! Byte-level builder for hand-crafted images and objects.
//!
//! The presets produce headers that pass validation without findings; tests then tweak single
//! fields to provoke exactly the violation they are after.

use crate::{
    file::io::write_le_at,
    pe::{build_minimal_stub, CoffHeader, DosHeader, OptionalHeader, SectionHeader},
};

pub struct ImageBuilder {
    dos: Option<DosHeader>,
    signature: [u8; 4],
    coff: CoffHeader,
    optional: Option<OptionalHeader>,
    directories: Vec<(u32, u32)>,
    optional_size: Option<u16>,
    section_count: Option<u16>,
    sections: Vec<SectionHeader>,
}

fn section(name: &[u8], virtual_address: u32, pointer_to_raw_data: u32, characteristics: u32) -> SectionHeader {
    let mut padded = [0u8; 8];
    padded[..name.len()].copy_from_slice(name);

    SectionHeader {
        name: padded,
        virtual_size: 0x200,
        virtual_address,
        size_of_raw_data: 0x200,
        pointer_to_raw_data,
        pointer_to_relocations: 0,
        pointer_to_linenumbers: 0,
        number_of_relocations: 0,
        number_of_linenumbers: 0,
        characteristics,
    }
}

fn pe32_optional() -> OptionalHeader {
    OptionalHeader {
        magic: 0x10B,
        major_linker_version: Some(14),
        minor_linker_version: Some(29),
        size_of_code: Some(0x200),
        size_of_initialized_data: Some(0x400),
        size_of_uninitialized_data: Some(0),
        address_of_entry_point: Some(0x1000),
        base_of_code: Some(0x1000),
        base_of_data: Some(0x2000),
        image_base: Some(0x40_0000),
        section_alignment: Some(0x1000),
        file_alignment: Some(0x200),
        major_operating_system_version: Some(6),
        minor_operating_system_version: Some(0),
        major_image_version: Some(0),
        minor_image_version: Some(0),
        major_subsystem_version: Some(6),
        minor_subsystem_version: Some(0),
        win32_version_value: Some(0),
        size_of_image: Some(0x3000),
        size_of_headers: Some(0x400),
        check_sum: Some(0),
        subsystem: Some(3),
        dll_characteristics: Some(0x8140),
        size_of_stack_reserve: Some(0x10_0000),
        size_of_stack_commit: Some(0x1000),
        size_of_heap_reserve: Some(0x10_0000),
        size_of_heap_commit: Some(0x1000),
        loader_flags: Some(0),
        number_of_rva_and_sizes: Some(0),
    }
}

impl ImageBuilder {
    /// A 32-bit console executable with `.text` and `.data`
    pub fn pe32() -> ImageBuilder {
        ImageBuilder {
            dos: Some(DosHeader::canonical()),
            signature: *b"PE\0\0",
            coff: CoffHeader {
                machine: 0x014C,
                number_of_sections: 0,
                time_date_stamp: 0x5F00_0000,
                pointer_to_symbol_table: 0,
                number_of_symbols: 0,
                size_of_optional_header: 0,
                characteristics: 0x0102,
            },
            optional: Some(pe32_optional()),
            directories: Vec::new(),
            optional_size: None,
            section_count: None,
            sections: vec![
                section(b".text", 0x1000, 0x400, 0x6000_0020),
                section(b".data", 0x2000, 0x600, 0xC000_0040),
            ],
        }
    }

    /// A 64-bit console executable with `.text` and `.data`
    pub fn pe32_plus() -> ImageBuilder {
        let mut builder = ImageBuilder::pe32();
        builder.coff.machine = 0x8664;
        builder.coff.characteristics = 0x0022;
        builder.optional = Some(OptionalHeader {
            magic: 0x20B,
            base_of_data: None,
            image_base: Some(0x1_4000_0000),
            ..pe32_optional()
        });
        builder
    }

    /// An x64 object file with `.text` and `.data`
    pub fn object() -> ImageBuilder {
        ImageBuilder {
            dos: None,
            signature: *b"PE\0\0",
            coff: CoffHeader {
                machine: 0x8664,
                number_of_sections: 0,
                time_date_stamp: 0,
                pointer_to_symbol_table: 0,
                number_of_symbols: 0,
                size_of_optional_header: 0,
                characteristics: 0,
            },
            optional: None,
            directories: Vec::new(),
            optional_size: None,
            section_count: None,
            sections: vec![
                section(b".text", 0, 0x64, 0x6000_0020),
                section(b".data", 0, 0x264, 0xC000_0040),
            ],
        }
    }

    /// Append `count` directory entries; slot 2 (imports) is populated, all others zero
    pub fn directories(mut self, count: u32) -> ImageBuilder {
        self.directories = (1..=count)
            .map(|index| if index == 2 { (0x2000, 0x28) } else { (0, 0) })
            .collect();
        self
    }

    /// Override a single directory entry by its 1-based index
    pub fn directory(mut self, index: u32, virtual_address: u32, size: u32) -> ImageBuilder {
        self.directories[index as usize - 1] = (virtual_address, size);
        self
    }

    /// Declare an optional-header size different from the encoded one
    pub fn optional_size(mut self, size: u16) -> ImageBuilder {
        self.optional_size = Some(size);
        self
    }

    /// Declare a section count different from the number of encoded records
    pub fn section_count(mut self, count: u16) -> ImageBuilder {
        self.section_count = Some(count);
        self
    }

    pub fn signature(mut self, signature: [u8; 4]) -> ImageBuilder {
        self.signature = signature;
        self
    }

    pub fn with_dos(mut self, f: impl FnOnce(&mut DosHeader)) -> ImageBuilder {
        if let Some(dos) = self.dos.as_mut() {
            f(dos);
        }
        self
    }

    pub fn with_coff(mut self, f: impl FnOnce(&mut CoffHeader)) -> ImageBuilder {
        f(&mut self.coff);
        self
    }

    pub fn with_optional(mut self, f: impl FnOnce(&mut OptionalHeader)) -> ImageBuilder {
        if let Some(optional) = self.optional.as_mut() {
            f(optional);
        }
        self
    }

    pub fn with_section(mut self, index: usize, f: impl FnOnce(&mut SectionHeader)) -> ImageBuilder {
        f(&mut self.sections[index]);
        self
    }

    /// Replace the section records with `count` clean copies of `.text`
    pub fn sections(mut self, count: usize) -> ImageBuilder {
        let template = self.sections[0];
        self.sections = vec![template; count];
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(dos) = &self.dos {
            out = build_minimal_stub(None).unwrap();
            dos.write(&mut out).unwrap();
            out[0x80..0x84].copy_from_slice(&self.signature);
        }

        let mut optional = self
            .optional
            .as_ref()
            .map(|optional| encode_optional(optional, &self.directories))
            .unwrap_or_default();
        let optional_size = self.optional_size.unwrap_or(optional.len() as u16);
        optional.resize(usize::from(optional_size), 0);

        let mut coff = self.coff;
        coff.size_of_optional_header = optional_size;
        coff.number_of_sections = self.section_count.unwrap_or(self.sections.len() as u16);
        let coff_offset = out.len();
        out.resize(coff_offset + CoffHeader::SIZE, 0);
        coff.write(&mut out, coff_offset).unwrap();

        out.extend_from_slice(&optional);

        for section in &self.sections {
            let offset = out.len();
            out.resize(offset + SectionHeader::SIZE, 0);
            section.write(&mut out, offset).unwrap();
        }

        out
    }
}

fn encode_optional(optional: &OptionalHeader, directories: &[(u32, u32)]) -> Vec<u8> {
    let wide = optional.magic == 0x20B;
    let mut out = vec![0u8; 112 + directories.len() * 8];
    let mut offset = 0;

    let mut sized = |out: &mut Vec<u8>, offset: &mut usize, value: Option<u64>| {
        let value = value.unwrap_or(0);
        if wide {
            write_le_at(out, offset, value).unwrap();
        } else {
            write_le_at(out, offset, value as u32).unwrap();
        }
    };

    write_le_at(&mut out, &mut offset, optional.magic).unwrap();
    write_le_at(&mut out, &mut offset, optional.major_linker_version.unwrap_or(0)).unwrap();
    write_le_at(&mut out, &mut offset, optional.minor_linker_version.unwrap_or(0)).unwrap();
    for value in [
        optional.size_of_code,
        optional.size_of_initialized_data,
        optional.size_of_uninitialized_data,
        optional.address_of_entry_point,
        optional.base_of_code,
    ] {
        write_le_at(&mut out, &mut offset, value.unwrap_or(0)).unwrap();
    }
    if !wide {
        write_le_at(&mut out, &mut offset, optional.base_of_data.unwrap_or(0)).unwrap();
    }
    sized(&mut out, &mut offset, optional.image_base);
    write_le_at(&mut out, &mut offset, optional.section_alignment.unwrap_or(0)).unwrap();
    write_le_at(&mut out, &mut offset, optional.file_alignment.unwrap_or(0)).unwrap();
    for value in [
        optional.major_operating_system_version,
        optional.minor_operating_system_version,
        optional.major_image_version,
        optional.minor_image_version,
        optional.major_subsystem_version,
        optional.minor_subsystem_version,
    ] {
        write_le_at(&mut out, &mut offset, value.unwrap_or(0)).unwrap();
    }
    for value in [
        optional.win32_version_value,
        optional.size_of_image,
        optional.size_of_headers,
        optional.check_sum,
    ] {
        write_le_at(&mut out, &mut offset, value.unwrap_or(0)).unwrap();
    }
    write_le_at(&mut out, &mut offset, optional.subsystem.unwrap_or(0)).unwrap();
    write_le_at(&mut out, &mut offset, optional.dll_characteristics.unwrap_or(0)).unwrap();
    sized(&mut out, &mut offset, optional.size_of_stack_reserve);
    sized(&mut out, &mut offset, optional.size_of_stack_commit);
    sized(&mut out, &mut offset, optional.size_of_heap_reserve);
    sized(&mut out, &mut offset, optional.size_of_heap_commit);
    write_le_at(&mut out, &mut offset, optional.loader_flags.unwrap_or(0)).unwrap();
    let count = if directories.is_empty() {
        optional.number_of_rva_and_sizes.unwrap_or(0)
    } else {
        directories.len() as u32
    };
    write_le_at(&mut out, &mut offset, count).unwrap();

    for (virtual_address, size) in directories {
        write_le_at(&mut out, &mut offset, *virtual_address).unwrap();
        write_le_at(&mut out, &mut offset, *size).unwrap();
    }

    out.truncate(offset);
    out
}
