//! PE/COFF header decoding.
//!
//! [`decode`] turns a byte buffer into a [`PeHeaders`] model in one pass, stage by stage in
//! increasing file offset:
//!
//! 1. **Stub** - the MS-DOS header and `PE\0\0` signature, deciding image vs. object
//! 2. **File header** - the 20-byte COFF header
//! 3. **Optional header** - magic-dispatched PE32 / PE32+ / ROM layout
//! 4. **Data directories** - the (address, size) table ending the optional header
//! 5. **Section table** - `number_of_sections` records of 40 bytes
//!
//! Decoding never fails. A buffer that ends early stops decoding at the current stage; the
//! model keeps everything read so far and records where it stopped in
//! [`PeHeaders::outcome`]. Whether the decoded values make sense is not checked here, that is
//! the job of [`crate::validation`]. [`inspect`] runs both.
//!
//! # Examples
//!
//! ```rust
//! use pescope::pe::{self, DecodeOutcome, Stage};
//!
//! let headers = pe::decode(&[0u8; 10]);
//! assert!(!headers.is_image());
//! assert_eq!(headers.outcome(), DecodeOutcome::Truncated { stage: Stage::Stub, offset: 0 });
//!
//! let stub = pe::build_minimal_stub(None)?;
//! let inspection = pe::inspect(&stub);
//! assert!(inspection.headers().is_image());
//! assert!(inspection.violations().contains("Binary (Img) does not have valid length"));
//! # Ok::<(), pescope::Error>(())
//! ```

mod coff;
mod directories;
mod dos;
pub mod flags;
mod optional;
mod sections;
mod stub;

pub use coff::CoffHeader;
pub use directories::DataDirectory;
pub use dos::{DosHeader, DOS_REGION_LEN};
pub use optional::OptionalHeader;
pub use sections::SectionHeader;
pub use stub::{build_minimal_stub, DEFAULT_STUB_PROGRAM, STUB_LEN};

use std::fmt;

use log::{debug, trace};
use strum::Display;

use crate::validation::{validate, Violations};

use optional::DeclaredReader;

/// Minimum length of any decodable buffer
pub const MIN_LEN: usize = 20;

/// Minimum length of a decodable image
pub const MIN_IMAGE_LEN: usize = 148;

/// Decoding stage at which a buffer ended early
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display)]
pub enum Stage {
    /// MS-DOS header and signature region
    #[strum(serialize = "stub")]
    Stub,
    /// COFF file header
    #[strum(serialize = "file header")]
    FileHeader,
    /// Optional header fields
    #[strum(serialize = "optional header")]
    OptionalHeader,
    /// Data-directory table
    #[strum(serialize = "data directories")]
    DataDirectories,
    /// Section table
    #[strum(serialize = "section table")]
    SectionTable,
}

/// How far decoding got
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DecodeOutcome {
    /// Every stage the headers call for was decoded
    Complete,
    /// The buffer ended inside `stage`; `offset` is where the missing data starts
    Truncated {
        /// The stage that could not be decoded
        stage: Stage,
        /// File offset of the first unreadable structure
        offset: usize,
    },
}

/// Decoded header model of a PE image or COFF object.
///
/// Obtained from [`decode`]; the model is never mutated afterwards. Parts the buffer did not
/// contain are `None` or empty.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PeHeaders {
    len: usize,
    dos: Option<DosHeader>,
    signature: Option<[u8; 4]>,
    coff: Option<CoffHeader>,
    optional: Option<OptionalHeader>,
    data_directories: Vec<DataDirectory>,
    sections: Vec<SectionHeader>,
    outcome: DecodeOutcome,
}

impl PeHeaders {
    fn empty(len: usize) -> PeHeaders {
        PeHeaders {
            len,
            dos: None,
            signature: None,
            coff: None,
            optional: None,
            data_directories: Vec::new(),
            sections: Vec::new(),
            outcome: DecodeOutcome::Complete,
        }
    }

    /// Length of the decoded buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the decoded buffer was empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the buffer is an executable image, i.e. the MS-DOS header was decoded
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.dos.is_some()
    }

    /// The optional-header magic, or 0 if there is no optional header.
    ///
    /// A decoded header whose magic field is zero also yields 0. Use
    /// [`optional`](Self::optional)`.is_some()` to tell the two apart.
    #[must_use]
    pub fn is_opt(&self) -> u16 {
        self.optional.as_ref().map_or(0, |optional| optional.magic)
    }

    /// The MS-DOS header
    #[must_use]
    pub fn dos(&self) -> Option<&DosHeader> {
        self.dos.as_ref()
    }

    /// The 4 bytes found at `e_lfanew`
    #[must_use]
    pub fn signature(&self) -> Option<&[u8; 4]> {
        self.signature.as_ref()
    }

    /// Returns `true` if the bytes at `e_lfanew` are `PE\0\0`
    #[must_use]
    pub fn has_pe_signature(&self) -> bool {
        self.signature.as_ref().is_some_and(dos::is_pe_signature)
    }

    /// The COFF file header
    #[must_use]
    pub fn coff(&self) -> Option<&CoffHeader> {
        self.coff.as_ref()
    }

    /// The optional header
    #[must_use]
    pub fn optional(&self) -> Option<&OptionalHeader> {
        self.optional.as_ref()
    }

    /// Decoded data-directory entries, in table order
    #[must_use]
    pub fn data_directories(&self) -> &[DataDirectory] {
        &self.data_directories
    }

    /// The data-directory entry at the 1-based `index`
    #[must_use]
    pub fn data_directory(&self, index: u32) -> Option<&DataDirectory> {
        self.data_directories
            .iter()
            .find(|directory| directory.index == index)
    }

    /// Decoded section headers, in table order
    #[must_use]
    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// How far decoding got
    #[must_use]
    pub fn outcome(&self) -> DecodeOutcome {
        self.outcome
    }
}

impl fmt::Display for PeHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dos) = &self.dos {
            write!(f, "{dos}")?;
            if let Some(signature) = &self.signature {
                writeln!(f, "  signature   {}", hex::encode(signature))?;
            }
        }
        if let Some(coff) = &self.coff {
            write!(f, "{coff}")?;
        }
        if let Some(optional) = &self.optional {
            write!(f, "{optional}")?;
        }
        if !self.data_directories.is_empty() {
            writeln!(f, "Data directories")?;
            for directory in &self.data_directories {
                writeln!(f, "  {directory}")?;
            }
        }
        if !self.sections.is_empty() {
            writeln!(f, "Sections")?;
            for section in &self.sections {
                writeln!(f, "  {section}")?;
            }
        }
        if let DecodeOutcome::Truncated { stage, offset } = self.outcome {
            writeln!(f, "Truncated in the {stage} at {offset:#x}")?;
        }
        Ok(())
    }
}

struct Truncation {
    stage: Stage,
    offset: usize,
}

impl Truncation {
    fn at(stage: Stage, offset: usize) -> Truncation {
        Truncation { stage, offset }
    }
}

/// Decode the header region of a PE image or COFF object.
///
/// Never fails and never reads past the end of `data`; see [`PeHeaders::outcome`] for how far
/// decoding got.
#[must_use]
pub fn decode(data: &[u8]) -> PeHeaders {
    let (headers, truncation) = decode_stages(data);

    match truncation {
        Some(truncation) => {
            debug!(
                "buffer of {} bytes truncated in the {} at {:#x}",
                data.len(),
                truncation.stage,
                truncation.offset
            );
            PeHeaders {
                outcome: DecodeOutcome::Truncated {
                    stage: truncation.stage,
                    offset: truncation.offset,
                },
                ..headers
            }
        }
        None => headers,
    }
}

/// Each stage adds its part to the model of the previous one. A truncation returns the model
/// built so far.
fn decode_stages(data: &[u8]) -> (PeHeaders, Option<Truncation>) {
    let headers = PeHeaders::empty(data.len());
    if data.len() < MIN_LEN {
        return (headers, Some(Truncation::at(Stage::Stub, 0)));
    }

    let (headers, coff_offset) = match decode_stub(data) {
        Some(stub) => {
            let headers = PeHeaders {
                dos: Some(stub.dos),
                signature: stub.signature,
                ..headers
            };
            if data.len() < MIN_IMAGE_LEN {
                return (headers, Some(Truncation::at(Stage::Stub, data.len())));
            }
            match stub.coff_offset {
                Some(coff_offset) => (headers, coff_offset),
                None => return (headers, Some(Truncation::at(Stage::FileHeader, data.len()))),
            }
        }
        None => (headers, 0),
    };

    let Ok(coff) = CoffHeader::read(data, coff_offset) else {
        return (headers, Some(Truncation::at(Stage::FileHeader, coff_offset)));
    };
    trace!(
        "COFF header at {:#x}: {} sections, optional header of {} bytes",
        coff_offset,
        coff.number_of_sections,
        coff.size_of_optional_header
    );
    let headers = PeHeaders {
        coff: Some(coff),
        ..headers
    };

    let optional_offset = coff_offset + CoffHeader::SIZE;
    let headers = if coff.size_of_optional_header > 0 {
        let region = decode_optional(data, optional_offset, coff.size_of_optional_header);
        let headers = PeHeaders {
            optional: region.header,
            data_directories: region.directories,
            ..headers
        };
        if region.truncation.is_some() {
            return (headers, region.truncation);
        }
        headers
    } else {
        headers
    };

    let table_offset = optional_offset + usize::from(coff.size_of_optional_header);
    match sections::read_section_table(data, table_offset, coff.number_of_sections) {
        Ok(sections) => (PeHeaders { sections, ..headers }, None),
        Err(_) => (headers, Some(Truncation::at(Stage::SectionTable, table_offset))),
    }
}

const PE_SIGNATURE_LEN: usize = flags::PE_SIGNATURE.len();

/// The image-only part in front of the COFF header
struct Stub {
    dos: DosHeader,
    signature: Option<[u8; 4]>,
    /// `None` if `e_lfanew + 4` does not fit in `usize`
    coff_offset: Option<usize>,
}

/// Returns `None` for objects, which start with the COFF header
fn decode_stub(data: &[u8]) -> Option<Stub> {
    if !dos::has_dos_magic(data) || data.len() < DOS_REGION_LEN {
        return None;
    }

    let dos = DosHeader::read(data).ok()?;
    trace!("image, e_lfanew = {:#x}", dos.e_lfanew);

    Some(Stub {
        signature: dos::read_signature(data, dos.e_lfanew),
        coff_offset: usize::try_from(dos.e_lfanew)
            .ok()
            .and_then(|lfanew| lfanew.checked_add(PE_SIGNATURE_LEN)),
        dos,
    })
}

/// Optional header and data directories, as far as the buffer holds them
#[derive(Default)]
struct OptionalRegion {
    header: Option<OptionalHeader>,
    directories: Vec<DataDirectory>,
    truncation: Option<Truncation>,
}

fn decode_optional(data: &[u8], offset: usize, declared: u16) -> OptionalRegion {
    let Ok(mut reader) = DeclaredReader::new(data, offset, usize::from(declared)) else {
        return OptionalRegion {
            truncation: Some(Truncation::at(Stage::OptionalHeader, offset)),
            ..OptionalRegion::default()
        };
    };
    let magic = match reader.field::<u16>() {
        Ok(Some(magic)) => magic,
        Ok(None) => return OptionalRegion::default(),
        Err(_) => {
            return OptionalRegion {
                truncation: Some(Truncation::at(Stage::OptionalHeader, reader.pos())),
                ..OptionalRegion::default()
            }
        }
    };

    let (header, result) = OptionalHeader::read(&mut reader, magic, declared);
    if result.is_err() {
        return OptionalRegion {
            header: Some(header),
            directories: Vec::new(),
            truncation: Some(Truncation::at(Stage::OptionalHeader, reader.pos())),
        };
    }

    let (directories, result) = match header.number_of_rva_and_sizes {
        Some(count) if reader.declared_remaining() > 0 => {
            directories::read_directories(&mut reader, count)
        }
        _ => (Vec::new(), Ok(())),
    };
    trace!("{} data directories", directories.len());

    OptionalRegion {
        header: Some(header),
        directories,
        truncation: result
            .err()
            .map(|_| Truncation::at(Stage::DataDirectories, reader.pos())),
    }
}

/// A decoded model together with its validation report
#[derive(Clone, Debug)]
pub struct Inspection {
    headers: PeHeaders,
    violations: Violations,
}

impl Inspection {
    /// The decoded model
    #[must_use]
    pub fn headers(&self) -> &PeHeaders {
        &self.headers
    }

    /// The violations found by the default validation configuration
    #[must_use]
    pub fn violations(&self) -> &Violations {
        &self.violations
    }

    /// Returns `true` if no violation was found
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Split into model and report
    #[must_use]
    pub fn into_parts(self) -> (PeHeaders, Violations) {
        (self.headers, self.violations)
    }
}

/// Decode `data` and validate the result with the default configuration.
///
/// # Examples
///
/// ```rust
/// let inspection = pescope::pe::inspect(&[0u8; 16]);
/// assert_eq!(
///     inspection.violations().to_string(),
///     "Binary does not have valid length"
/// );
/// ```
#[must_use]
pub fn inspect(data: &[u8]) -> Inspection {
    let headers = decode(data);
    let violations = validate(&headers);

    Inspection {
        headers,
        violations,
    }
}
