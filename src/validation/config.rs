//! Validation configuration
//!
//! Selects which rule groups run and how section link/alignment flags are judged.

use crate::validation::RuleGroup;

/// Which kind of file may carry the object-only section flags.
///
/// `LNK_INFO`, `LNK_REMOVE`, `LNK_COMDAT` and the `ALIGN_*` values are meaningful in object
/// files only. Tooling disagrees on which side to flag, so the polarity is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionFlagPolicy {
    /// Report the flags when they appear in object files
    #[default]
    RejectInObjects,
    /// Report the flags when they appear in images
    RejectInImages,
    /// Never report them
    Ignore,
}

/// Configuration for structural validation
///
/// Every rule group can be switched off individually. Rules inside an enabled group still
/// only run when the fields they look at were decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ValidationConfig {
    /// Minimum buffer length for objects and images
    pub enable_length_validation: bool,

    /// One finding per decoding stage the buffer ended in (past the stub)
    pub enable_truncation_validation: bool,

    /// Optional header presence, declared size, magic and directory count
    pub enable_optional_header_validation: bool,

    /// Section count range
    pub enable_section_count_validation: bool,

    /// Deprecated and reserved COFF characteristics
    pub enable_characteristics_validation: bool,

    /// Signature, reserved MS-DOS regions, symbol table and image base of images
    pub enable_image_validation: bool,

    /// Object-file specific header rules
    pub enable_object_validation: bool,

    /// Per-section names, pointers, counts and flags
    pub enable_section_validation: bool,

    /// Optional-header values: reserved fields, alignments, sizes and reserved directories
    pub enable_optional_field_validation: bool,

    /// Polarity of the object-only section flags
    pub section_flags: SectionFlagPolicy,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enable_length_validation: true,
            enable_truncation_validation: true,
            enable_optional_header_validation: true,
            enable_section_count_validation: true,
            enable_characteristics_validation: true,
            enable_image_validation: true,
            enable_object_validation: true,
            enable_section_validation: true,
            enable_optional_field_validation: true,
            section_flags: SectionFlagPolicy::RejectInObjects,
        }
    }
}

impl ValidationConfig {
    /// Creates a configuration that reports nothing
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enable_length_validation: false,
            enable_truncation_validation: false,
            enable_optional_header_validation: false,
            enable_section_count_validation: false,
            enable_characteristics_validation: false,
            enable_image_validation: false,
            enable_object_validation: false,
            enable_section_validation: false,
            enable_optional_field_validation: false,
            section_flags: SectionFlagPolicy::Ignore,
        }
    }

    /// Creates a configuration limited to whether the headers are decodable at all
    ///
    /// Only length, truncation and optional-header shape are checked.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_length_validation: true,
            enable_truncation_validation: true,
            enable_optional_header_validation: true,
            ..Self::disabled()
        }
    }

    /// Creates a configuration with every rule group enabled
    #[must_use]
    pub fn comprehensive() -> Self {
        Self::default()
    }

    /// Replace the section flag policy
    #[must_use]
    pub fn with_section_flags(mut self, policy: SectionFlagPolicy) -> Self {
        self.section_flags = policy;
        self
    }

    /// Returns `true` if rules of `group` should run
    #[must_use]
    pub fn is_enabled(&self, group: RuleGroup) -> bool {
        match group {
            RuleGroup::Length => self.enable_length_validation,
            RuleGroup::Truncation => self.enable_truncation_validation,
            RuleGroup::OptionalHeader => self.enable_optional_header_validation,
            RuleGroup::SectionCount => self.enable_section_count_validation,
            RuleGroup::Characteristics => self.enable_characteristics_validation,
            RuleGroup::Image => self.enable_image_validation,
            RuleGroup::Object => self.enable_object_validation,
            RuleGroup::Sections => self.enable_section_validation,
            RuleGroup::OptionalFields => self.enable_optional_field_validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_presets() {
        let disabled = ValidationConfig::disabled();
        assert!(RuleGroup::iter().all(|group| !disabled.is_enabled(group)));
        assert_eq!(disabled.section_flags, SectionFlagPolicy::Ignore);

        let minimal = ValidationConfig::minimal();
        assert!(minimal.is_enabled(RuleGroup::Length));
        assert!(minimal.is_enabled(RuleGroup::Truncation));
        assert!(minimal.is_enabled(RuleGroup::OptionalHeader));
        assert!(!minimal.is_enabled(RuleGroup::Sections));
        assert!(!minimal.is_enabled(RuleGroup::Image));

        let comprehensive = ValidationConfig::comprehensive();
        assert!(RuleGroup::iter().all(|group| comprehensive.is_enabled(group)));
        assert_eq!(
            comprehensive.section_flags,
            SectionFlagPolicy::RejectInObjects
        );
    }

    #[test]
    fn test_default_config() {
        assert_eq!(ValidationConfig::default(), ValidationConfig::comprehensive());
        assert_eq!(
            ValidationConfig::default()
                .with_section_flags(SectionFlagPolicy::RejectInImages)
                .section_flags,
            SectionFlagPolicy::RejectInImages
        );
    }
}
