//! Minimal stub encoder.
//!
//! Synthesizes the smallest well-formed image prefix: a canonical MS-DOS header, a 16-bit stub
//! program at offset 64, zero padding up to 0x80 and the `PE\0\0` signature there. The result
//! decodes as an image and is the usual starting point for hand-built test fixtures.

use log::debug;

use crate::{
    file::io::write_le_at,
    pe::{
        dos::{DosHeader, DOS_REGION_LEN},
        flags::PE_SIGNATURE,
    },
    Result,
};

/// The classic 16-bit program printing "This program must be run under Win..." and exiting
pub const DEFAULT_STUB_PROGRAM: &str = "BA10000E1FB409CD21B8014CCD219090546869732070726F6772616D206D7573742062652072756E20756E6465722057696E58580D0A2437";

/// Total length of the encoded stub, signature included
pub const STUB_LEN: usize = DOS_REGION_LEN + PE_SIGNATURE.len();

/// Build a minimal DOS stub followed by the `PE\0\0` signature.
///
/// # Arguments
/// * `program` - Hex encoded 16-bit program placed after the header, or `None` for
///   [`DEFAULT_STUB_PROGRAM`]
///
/// # Errors
/// Returns [`crate::Error::InvalidHex`] if `program` is not valid hex, and
/// [`crate::Error::Malformed`] if it decodes to more than 64 bytes.
///
/// # Examples
///
/// ```rust
/// use pescope::pe::{build_minimal_stub, decode};
///
/// let stub = build_minimal_stub(None)?;
/// assert_eq!(stub.len(), 0x84);
///
/// let headers = decode(&stub);
/// assert!(headers.is_image());
/// assert_eq!(headers.signature(), Some(b"PE\0\0"));
/// # Ok::<(), pescope::Error>(())
/// ```
pub fn build_minimal_stub(program: Option<&str>) -> Result<Vec<u8>> {
    let program = hex::decode(program.unwrap_or(DEFAULT_STUB_PROGRAM))?;

    let capacity = DOS_REGION_LEN - DosHeader::SIZE;
    if program.len() > capacity {
        return Err(malformed_error!(
            "Stub program is {} bytes, at most {} fit before the signature",
            program.len(),
            capacity
        ));
    }

    let mut stub = vec![0u8; STUB_LEN];
    DosHeader::canonical().write(&mut stub)?;
    stub[DosHeader::SIZE..DosHeader::SIZE + program.len()].copy_from_slice(&program);

    let mut offset = DOS_REGION_LEN;
    for byte in PE_SIGNATURE {
        write_le_at(&mut stub, &mut offset, byte)?;
    }

    debug!("built minimal stub with a {} byte program", program.len());
    Ok(stub)
}
