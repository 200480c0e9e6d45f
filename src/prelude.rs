//! # pescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! pescope library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pescope operations
pub use crate::Error;

/// The result type used throughout pescope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Loaded binary and low-level reader
pub use crate::{File, Parser};

/// Decoding and inspection
pub use crate::pe::{build_minimal_stub, decode, inspect, DecodeOutcome, Inspection, Stage};

// ================================================================================================
// Header Model
// ================================================================================================

/// Header structures
pub use crate::pe::{
    CoffHeader, DataDirectory, DosHeader, OptionalHeader, PeHeaders, SectionHeader,
};

/// Typed flags and enumerations
pub use crate::pe::flags::{
    DataDirectoryKind, DllCharacteristics, FileCharacteristics, Machine, OptionalMagic,
    SectionAlignment, SectionCharacteristics, Subsystem,
};

// ================================================================================================
// Validation
// ================================================================================================

/// Structural validation
pub use crate::validation::{
    validate, validate_with, RuleGroup, SectionFlagPolicy, ValidationConfig, Violation,
    Violations,
};
