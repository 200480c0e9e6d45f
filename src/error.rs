use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, covering every caller-facing failure of this library.
///
/// These errors are distinct from structural findings. A malformed or truncated PE file is
/// never reported through this type: decoding always succeeds with a (possibly sparse)
/// [`crate::pe::PeHeaders`] and the problems are listed as
/// [`crate::validation::Violation`]s. An [`Error`] means the caller broke a contract, the
/// operating system refused a request, or an input that is not a PE file (a hex string, a
/// path) was unusable.
///
/// # Error Categories
///
/// ## Reader Errors
/// - [`Error::OutOfBounds`] - A field read would have passed the end of the buffer
/// - [`Error::Malformed`] - An input could not be turned into the requested structure
///
/// ## Caller Errors
/// - [`Error::Empty`] - Empty input provided where data was required
/// - [`Error::Precondition`] - An entry point was invoked without its required input
/// - [`Error::InvalidHex`] - A hex encoded stub program could not be decoded
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Error, File};
/// use std::path::Path;
///
/// match File::from_file(Path::new("sample.exe")) {
///     Ok(file) => println!("{}", file.inspect().violations()),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An out of bound access was attempted while reading a field.
    ///
    /// The field reader returns this instead of reading zero-fill past the buffer. The
    /// decoder turns it into a [`crate::pe::DecodeOutcome::Truncated`] tag, so it only
    /// reaches callers who use [`crate::Parser`] or [`crate::file::io`] directly.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The input could not be turned into the requested structure.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// An entry point was called without the input it requires.
    ///
    /// This is a programming error on the caller's side, for example asking to load a file
    /// from an empty path.
    #[error("Precondition failed - {0}")]
    Precondition(&'static str),

    /// The hex representation of a stub program could not be decoded.
    #[error("Invalid hex stub program - {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening or mapping a file.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
