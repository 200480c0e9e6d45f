// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # pescope
//!
//! A decoder and structural validator for the headers of Windows PE images and COFF object
//! files. Built in pure Rust, `pescope` reads the MS-DOS stub, PE signature, COFF file header,
//! optional header, data-directory table and section table of a binary, and reports every
//! place where they depart from the format's structural rules.
//!
//! ## Features
//!
//! - **Never fails on bad input** - Truncated or garbage buffers decode to a partial model that
//!   records where decoding stopped
//! - **Complete header model** - PE32, PE32+ and ROM optional headers, data directories and
//!   section records, with typed flags and enumerations on top of the raw values
//! - **Accumulating validation** - Every finding is reported, not just the first, grouped into
//!   rule groups that can be switched on and off
//! - **Efficient memory access** - Memory-mapped file access, no copies of the input
//!
//! ## Quick Start
//!
//! ### Using the Prelude
//!
//! ```rust
//! use pescope::prelude::*;
//!
//! let file = File::from_mem(build_minimal_stub(None)?)?;
//! let inspection = file.inspect();
//!
//! assert!(inspection.headers().is_image());
//! assert_eq!(inspection.violations().len(), 1);
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ### Decoding and validating separately
//!
//! ```rust
//! use pescope::{pe, validation::{validate_with, SectionFlagPolicy, ValidationConfig}};
//!
//! let headers = pe::decode(&pe::build_minimal_stub(None)?);
//! assert_eq!(headers.signature(), Some(b"PE\0\0"));
//!
//! let config = ValidationConfig::default().with_section_flags(SectionFlagPolicy::Ignore);
//! for violation in &validate_with(&headers, &config) {
//!     println!("[{}] {}", violation.rule(), violation);
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`crate::file`] - Data sources: memory-mapped files and in-memory buffers
//! - [`pe`] - The header model and its decoder, plus the minimal stub encoder
//! - [`validation`] - Structural rules over the decoded model
//! - [`Error`] and [`Result`] - Caller-facing errors
//!
//! Structural problems of a binary are never errors. [`pe::decode`] always returns a model;
//! [`validation::validate`] turns it into a list of [`validation::Violation`]s. [`Error`] is
//! reserved for things like unreadable files, empty inputs or bad hex strings.
//!
//! ## Logging
//!
//! Decoding stages and truncations are reported through the [`log`] facade at `debug` and
//! `trace` level. The library never installs a logger.
//!
//! ## Thread Safety
//!
//! All public types are `Send + Sync`. Decoding and validation are pure functions over an
//! immutable byte slice.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use pescope::prelude::*;
///
/// let headers = decode(&[0u8; 4]);
/// assert!(!validate(&headers).is_empty());
/// ```
pub mod prelude;

/// Binary input: data backends, the [`File`] loader and the low-level reader.
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::File;
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("sample.exe"))?;
/// println!("{}", file.headers());
/// # Ok::<(), pescope::Error>(())
/// ```
pub mod file;

/// Header model, decoder and minimal stub encoder
pub mod pe;

/// Structural validation of the decoded header model
pub mod validation;

/// `pescope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `pescope` Error type
///
/// Caller-facing failures: empty inputs, unreadable files, bad stub programs. Structural
/// problems of a binary are reported as [`validation::Violation`]s instead.
pub use error::Error;

/// Loaded binary, see [`file::File`]
pub use file::File;

/// Bounds-checked little-endian reader, see [`file::parser::Parser`]
pub use file::parser::Parser;

pub use pe::{decode, inspect, Inspection, PeHeaders};
pub use validation::{validate, validate_with, ValidationConfig, Violation, Violations};
