//! Constant enumerations and bit masks of the PE/COFF header format.
//!
//! Everything in here is an immutable, process-wide constant: machine types, subsystems,
//! optional-header magics, data-directory kinds and the three characteristic bit masks
//! (COFF file header, optional-header DLL characteristics, section header). Raw values stay
//! raw in the decoded model; these types are views used by the validator and by `Display`.
//!
//! # Key Types
//! - [`Machine`], [`Subsystem`], [`OptionalMagic`]: value enumerations
//! - [`DataDirectoryKind`]: the 16 well-known data-directory slots, 1-based
//! - [`FileCharacteristics`], [`DllCharacteristics`], [`SectionCharacteristics`]: bit masks
//! - [`SectionAlignment`]: the 4-bit alignment field embedded in section characteristics

use bitflags::bitflags;
use goblin::pe::{characteristic, optional_header, section_table};
use strum::{Display, EnumCount, EnumIter, FromRepr};

/// `MZ`, the first two bytes of a DOS-compatible executable
pub const DOS_MAGIC: u16 = goblin::pe::header::DOS_MAGIC;

/// `PE\0\0`, the signature found at `e_lfanew` in executable images
pub const PE_SIGNATURE: [u8; 4] = goblin::pe::header::PE_MAGIC.to_le_bytes();

/// Optional-header magic of PE32 images
pub const MAGIC_PE32: u16 = optional_header::MAGIC_32;

/// Optional-header magic of PE32+ images
pub const MAGIC_PE32_PLUS: u16 = optional_header::MAGIC_64;

/// Optional-header magic of ROM images
pub const MAGIC_ROM: u16 = 0x107;

/// Target machine of a COFF file.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, EnumIter, FromRepr)]
#[repr(u16)]
pub enum Machine {
    /// Applicable to any machine type
    Unknown = 0x0000,
    /// Matsushita AM33
    Am33 = 0x01D3,
    /// x64
    Amd64 = 0x8664,
    /// ARM little endian
    Arm = 0x01C0,
    /// ARM64 little endian
    Arm64 = 0xAA64,
    /// ARM Thumb-2 little endian
    ArmNt = 0x01C4,
    /// EFI byte code
    Ebc = 0x0EBC,
    /// Intel 386 or later
    I386 = 0x014C,
    /// Intel Itanium
    Ia64 = 0x0200,
    /// Mitsubishi M32R little endian
    M32R = 0x9041,
    /// MIPS16
    Mips16 = 0x0266,
    /// MIPS with FPU
    MipsFpu = 0x0366,
    /// MIPS16 with FPU
    MipsFpu16 = 0x0466,
    /// Power PC little endian
    PowerPc = 0x01F0,
    /// Power PC with floating point support
    PowerPcFp = 0x01F1,
    /// MIPS little endian
    R4000 = 0x0166,
    /// RISC-V 32-bit address space
    RiscV32 = 0x5032,
    /// RISC-V 64-bit address space
    RiscV64 = 0x5064,
    /// RISC-V 128-bit address space
    RiscV128 = 0x5128,
    /// Hitachi SH3
    Sh3 = 0x01A2,
    /// Hitachi SH3 DSP
    Sh3Dsp = 0x01A3,
    /// Hitachi SH4
    Sh4 = 0x01A6,
    /// Hitachi SH5
    Sh5 = 0x01A8,
    /// Thumb
    Thumb = 0x01C2,
    /// MIPS little-endian WCE v2
    WceMipsV2 = 0x0169,
}

/// Subsystem required to run an image.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, EnumIter, FromRepr)]
#[repr(u16)]
pub enum Subsystem {
    /// Unknown subsystem
    Unknown = 0,
    /// Device drivers and native Windows processes
    Native = 1,
    /// Windows graphical user interface
    WindowsGui = 2,
    /// Windows character subsystem
    WindowsCui = 3,
    /// OS/2 character subsystem
    Os2Cui = 5,
    /// Posix character subsystem
    PosixCui = 7,
    /// Native Win9x driver
    NativeWindows = 8,
    /// Windows CE
    WindowsCeGui = 9,
    /// EFI application
    EfiApplication = 10,
    /// EFI driver with boot services
    EfiBootServiceDriver = 11,
    /// EFI driver with run-time services
    EfiRuntimeDriver = 12,
    /// EFI ROM image
    EfiRom = 13,
    /// XBOX
    Xbox = 14,
    /// Windows boot application
    WindowsBootApplication = 16,
}

/// Layout variant selected by the optional-header magic.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, EnumIter, FromRepr)]
#[repr(u16)]
pub enum OptionalMagic {
    /// 32-bit image (`0x10B`)
    #[strum(serialize = "PE")]
    Pe32 = MAGIC_PE32,
    /// 64-bit image (`0x20B`)
    #[strum(serialize = "PE+")]
    Pe32Plus = MAGIC_PE32_PLUS,
    /// ROM image (`0x107`)
    #[strum(serialize = "ROM")]
    Rom = MAGIC_ROM,
}

impl OptionalMagic {
    /// Smallest declared optional-header size this variant can be valid with, if any
    #[must_use]
    pub fn minimum_size(self) -> Option<u16> {
        match self {
            OptionalMagic::Pe32 => Some(96),
            OptionalMagic::Pe32Plus => Some(112),
            OptionalMagic::Rom => None,
        }
    }

    /// Returns `true` if image base, stack and heap fields are 8 bytes wide
    #[must_use]
    pub fn is_wide(self) -> bool {
        self == OptionalMagic::Pe32Plus
    }
}

/// Well-known data-directory slots, numbered from 1 in table order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, EnumIter, EnumCount, FromRepr)]
#[repr(u32)]
pub enum DataDirectoryKind {
    /// The export table
    Export = 1,
    /// The import table
    Import = 2,
    /// The resource table
    Resource = 3,
    /// The exception table
    Exception = 4,
    /// The attribute certificate table
    Certificate = 5,
    /// The base relocation table
    BaseRelocation = 6,
    /// The debug data
    Debug = 7,
    /// Reserved, must be 0
    Architecture = 8,
    /// RVA of the value stored in the global pointer register; size must be 0
    GlobalPtr = 9,
    /// The thread local storage table
    Tls = 10,
    /// The load configuration table
    LoadConfig = 11,
    /// The bound import table
    BoundImport = 12,
    /// The import address table
    ImportAddress = 13,
    /// The delay import descriptor
    DelayImport = 14,
    /// The CLR runtime header
    ClrHeader = 15,
    /// Reserved, must be 0
    Reserved = 16,
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Characteristics of the COFF file header
    pub struct FileCharacteristics: u16 {
        /// Image has no base relocations and must load at its preferred base
        const RELOCS_STRIPPED = characteristic::IMAGE_FILE_RELOCS_STRIPPED;
        /// Image is valid and can be run
        const EXECUTABLE_IMAGE = characteristic::IMAGE_FILE_EXECUTABLE_IMAGE;
        /// COFF line numbers removed (deprecated)
        const LINE_NUMS_STRIPPED = characteristic::IMAGE_FILE_LINE_NUMS_STRIPPED;
        /// COFF local symbols removed (deprecated)
        const LOCAL_SYMS_STRIPPED = characteristic::IMAGE_FILE_LOCAL_SYMS_STRIPPED;
        /// Aggressively trim working set (obsolete)
        const AGGRESSIVE_WS_TRIM = characteristic::IMAGE_FILE_AGGRESSIVE_WS_TRIM;
        /// Application can handle addresses above 2 GB
        const LARGE_ADDRESS_AWARE = characteristic::IMAGE_FILE_LARGE_ADDRESS_AWARE;
        /// Reserved for future use
        const RESERVED = 0x0040;
        /// Little endian byte order (deprecated)
        const BYTES_REVERSED_LO = characteristic::IMAGE_FILE_BYTES_REVERSED_LO;
        /// Machine is based on a 32-bit word architecture
        const BIT32_MACHINE = 0x0100;
        /// Debugging information removed
        const DEBUG_STRIPPED = characteristic::IMAGE_FILE_DEBUG_STRIPPED;
        /// Copy to swap file when run from removable media
        const REMOVABLE_RUN_FROM_SWAP = characteristic::IMAGE_FILE_REMOVABLE_RUN_FROM_SWAP;
        /// Copy to swap file when run from network media
        const NET_RUN_FROM_SWAP = characteristic::IMAGE_FILE_NET_RUN_FROM_SWAP;
        /// System file, not a user program
        const SYSTEM = characteristic::IMAGE_FILE_SYSTEM;
        /// Dynamic-link library
        const DLL = characteristic::IMAGE_FILE_DLL;
        /// Run only on a uniprocessor machine
        const UP_SYSTEM_ONLY = characteristic::IMAGE_FILE_UP_SYSTEM_ONLY;
        /// Big endian byte order (deprecated)
        const BYTES_REVERSED_HI = characteristic::IMAGE_FILE_BYTES_REVERSED_HI;
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// DLL characteristics of the optional header
    pub struct DllCharacteristics: u16 {
        /// Reserved, must be zero
        const RESERVED1 = 0x0001;
        /// Reserved, must be zero
        const RESERVED2 = 0x0002;
        /// Reserved, must be zero
        const RESERVED3 = 0x0004;
        /// Reserved, must be zero
        const RESERVED4 = 0x0008;
        /// Image can handle a high entropy 64-bit address space
        const HIGH_ENTROPY_VA = 0x0020;
        /// DLL can be relocated at load time
        const DYNAMIC_BASE = 0x0040;
        /// Code integrity checks are enforced
        const FORCE_INTEGRITY = 0x0080;
        /// Image is NX compatible
        const NX_COMPAT = 0x0100;
        /// Isolation aware, but do not isolate the image
        const NO_ISOLATION = 0x0200;
        /// No structured exception handling
        const NO_SEH = 0x0400;
        /// Do not bind the image
        const NO_BIND = 0x0800;
        /// Image must execute in an AppContainer
        const APPCONTAINER = 0x1000;
        /// WDM driver
        const WDM_DRIVER = 0x2000;
        /// Image supports Control Flow Guard
        const GUARD_CF = 0x4000;
        /// Terminal Server aware
        const TERMINAL_SERVER_AWARE = 0x8000;

        /// All reserved bits
        const RESERVED = Self::RESERVED1.bits()
            | Self::RESERVED2.bits()
            | Self::RESERVED3.bits()
            | Self::RESERVED4.bits();
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Characteristics of a section header.
    ///
    /// The `ALIGN_*` values are not independent bits but a 4-bit number inside
    /// [`SectionCharacteristics::ALIGN_MASK`]; use [`SectionCharacteristics::alignment`].
    pub struct SectionCharacteristics: u32 {
        /// Not padded to the next boundary (object files only, obsolete)
        const TYPE_NO_PAD = section_table::IMAGE_SCN_TYPE_NO_PAD;
        /// Contains executable code
        const CNT_CODE = section_table::IMAGE_SCN_CNT_CODE;
        /// Contains initialized data
        const CNT_INITIALIZED_DATA = section_table::IMAGE_SCN_CNT_INITIALIZED_DATA;
        /// Contains uninitialized data
        const CNT_UNINITIALIZED_DATA = section_table::IMAGE_SCN_CNT_UNINITIALIZED_DATA;
        /// Reserved for future use
        const LNK_OTHER = 0x0000_0100;
        /// Comments or other information (object files only)
        const LNK_INFO = section_table::IMAGE_SCN_LNK_INFO;
        /// Will not become part of the image (object files only)
        const LNK_REMOVE = section_table::IMAGE_SCN_LNK_REMOVE;
        /// COMDAT data (object files only)
        const LNK_COMDAT = section_table::IMAGE_SCN_LNK_COMDAT;
        /// Data referenced through the global pointer
        const GPREL = 0x0000_8000;
        /// Reserved for future use
        const MEM_PURGEABLE = 0x0002_0000;
        /// Reserved for future use
        const MEM_LOCKED = 0x0004_0000;
        /// Reserved for future use
        const MEM_PRELOAD = 0x0008_0000;
        /// The 4-bit alignment field (object files only)
        const ALIGN_MASK = section_table::IMAGE_SCN_ALIGN_MASK;
        /// Contains extended relocations
        const LNK_NRELOC_OVFL = 0x0100_0000;
        /// Can be discarded as needed
        const MEM_DISCARDABLE = 0x0200_0000;
        /// Cannot be cached
        const MEM_NOT_CACHED = 0x0400_0000;
        /// Not pageable
        const MEM_NOT_PAGED = 0x0800_0000;
        /// Can be shared in memory
        const MEM_SHARED = 0x1000_0000;
        /// Can be executed as code
        const MEM_EXECUTE = section_table::IMAGE_SCN_MEM_EXECUTE;
        /// Can be read
        const MEM_READ = section_table::IMAGE_SCN_MEM_READ;
        /// Can be written to
        const MEM_WRITE = section_table::IMAGE_SCN_MEM_WRITE;
    }
}

impl SectionCharacteristics {
    /// Extract the explicit alignment value, if any is set
    #[must_use]
    pub fn alignment(self) -> Option<SectionAlignment> {
        let value = (self.bits() & Self::ALIGN_MASK.bits()) >> 20;
        SectionAlignment::from_repr(value as u8)
    }
}

/// Explicit section data alignment, stored in bits 20..24 of the section characteristics.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum SectionAlignment {
    /// 1-byte boundary
    #[strum(serialize = "ALIGN_1BYTES")]
    Align1 = 0x1,
    /// 2-byte boundary
    #[strum(serialize = "ALIGN_2BYTES")]
    Align2 = 0x2,
    /// 4-byte boundary
    #[strum(serialize = "ALIGN_4BYTES")]
    Align4 = 0x3,
    /// 8-byte boundary
    #[strum(serialize = "ALIGN_8BYTES")]
    Align8 = 0x4,
    /// 16-byte boundary
    #[strum(serialize = "ALIGN_16BYTES")]
    Align16 = 0x5,
    /// 32-byte boundary
    #[strum(serialize = "ALIGN_32BYTES")]
    Align32 = 0x6,
    /// 64-byte boundary
    #[strum(serialize = "ALIGN_64BYTES")]
    Align64 = 0x7,
    /// 128-byte boundary
    #[strum(serialize = "ALIGN_128BYTES")]
    Align128 = 0x8,
    /// 256-byte boundary
    #[strum(serialize = "ALIGN_256BYTES")]
    Align256 = 0x9,
    /// 512-byte boundary
    #[strum(serialize = "ALIGN_512BYTES")]
    Align512 = 0xA,
    /// 1024-byte boundary
    #[strum(serialize = "ALIGN_1024BYTES")]
    Align1024 = 0xB,
    /// 2048-byte boundary
    #[strum(serialize = "ALIGN_2048BYTES")]
    Align2048 = 0xC,
    /// 4096-byte boundary
    #[strum(serialize = "ALIGN_4096BYTES")]
    Align4096 = 0xD,
    /// 8192-byte boundary
    #[strum(serialize = "ALIGN_8192BYTES")]
    Align8192 = 0xE,
}

impl SectionAlignment {
    /// Alignment in bytes
    #[must_use]
    pub fn bytes(self) -> u32 {
        1 << (self as u32 - 1)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_magics() {
        assert_eq!(DOS_MAGIC.to_le_bytes(), *b"MZ");
        assert_eq!(PE_SIGNATURE, *b"PE\0\0");
        assert_eq!(OptionalMagic::from_repr(0x10B), Some(OptionalMagic::Pe32));
        assert_eq!(OptionalMagic::from_repr(0x20B), Some(OptionalMagic::Pe32Plus));
        assert_eq!(OptionalMagic::from_repr(0x107), Some(OptionalMagic::Rom));
        assert_eq!(OptionalMagic::from_repr(0x10C), None);
        assert_eq!(OptionalMagic::Pe32Plus.to_string(), "PE+");
    }

    #[test]
    fn test_directory_kinds() {
        assert_eq!(DataDirectoryKind::COUNT, 16);
        assert_eq!(DataDirectoryKind::from_repr(0), None);
        assert_eq!(
            DataDirectoryKind::from_repr(8),
            Some(DataDirectoryKind::Architecture)
        );
        assert_eq!(
            DataDirectoryKind::iter().last(),
            Some(DataDirectoryKind::Reserved)
        );
        assert_eq!(DataDirectoryKind::from_repr(17), None);
    }

    #[test]
    fn test_machine_lookup() {
        assert_eq!(Machine::from_repr(0x8664), Some(Machine::Amd64));
        assert_eq!(Machine::from_repr(0x014C), Some(Machine::I386));
        assert_eq!(Machine::from_repr(0x1234), None);
        assert_eq!(Subsystem::from_repr(3), Some(Subsystem::WindowsCui));
        assert_eq!(Subsystem::from_repr(4), None);
    }

    #[test]
    fn test_file_characteristics_values() {
        assert_eq!(FileCharacteristics::LINE_NUMS_STRIPPED.bits(), 0x0004);
        assert_eq!(FileCharacteristics::LOCAL_SYMS_STRIPPED.bits(), 0x0008);
        assert_eq!(FileCharacteristics::AGGRESSIVE_WS_TRIM.bits(), 0x0010);
        assert_eq!(FileCharacteristics::BYTES_REVERSED_HI.bits(), 0x8000);
        assert_eq!(DllCharacteristics::RESERVED.bits(), 0x000F);
    }

    #[test]
    fn test_section_alignment() {
        let flags = SectionCharacteristics::from_bits_retain(0x0050_0020);
        assert!(flags.contains(SectionCharacteristics::CNT_CODE));
        assert_eq!(flags.alignment(), Some(SectionAlignment::Align16));
        assert_eq!(SectionAlignment::Align16.bytes(), 16);
        assert_eq!(SectionAlignment::Align8192.bytes(), 8192);
        assert_eq!(SectionAlignment::Align4.to_string(), "ALIGN_4BYTES");

        let flags = SectionCharacteristics::from_bits_retain(0x6000_0020);
        assert_eq!(flags.alignment(), None);

        // 0xF is not a defined alignment value
        let flags = SectionCharacteristics::from_bits_retain(0x00F0_0000);
        assert_eq!(flags.alignment(), None);
    }
}
