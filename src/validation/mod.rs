//! Structural validation of decoded PE/COFF headers.
//!
//! [`validate`] inspects a [`crate::pe::PeHeaders`] model and reports every way it departs from
//! the format's structural rules: lengths, magic numbers, reserved-zero regions, deprecated or
//! reserved flags, alignment and ordering constraints. Validation is a pure function of the
//! model. It never stops at the first finding, and running it twice yields the same report.
//!
//! Rules are grouped by [`RuleGroup`]; [`ValidationConfig`] switches groups on and off. A rule
//! only fires when every field it looks at was decoded, so a truncated buffer produces its
//! truncation finding without a cascade of follow-up findings about missing fields.
//!
//! # Examples
//!
//! ```rust
//! use pescope::{pe, validation::{validate_with, ValidationConfig}};
//!
//! let headers = pe::decode(&pe::build_minimal_stub(None)?);
//! let violations = validate_with(&headers, &ValidationConfig::minimal());
//!
//! assert_eq!(violations.len(), 1);
//! assert!(violations.contains("Binary (Img) does not have valid length"));
//! # Ok::<(), pescope::Error>(())
//! ```

mod config;
mod header;
mod optional;
mod sections;

pub use config::{SectionFlagPolicy, ValidationConfig};

use std::fmt;

use log::debug;
use strum::{Display, EnumIter};

use crate::pe::PeHeaders;

use header::{HeaderValidator, LengthValidator};
use optional::OptionalValidator;
use sections::SectionValidator;

/// Category a validation rule belongs to
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, EnumIter)]
pub enum RuleGroup {
    /// Minimum buffer lengths
    Length,
    /// Buffer ended inside a header structure
    Truncation,
    /// Optional header presence, size, magic and directory count
    OptionalHeader,
    /// Number of sections
    SectionCount,
    /// COFF characteristics
    Characteristics,
    /// Image-only header rules
    Image,
    /// Object-only header rules
    Object,
    /// Section header rules
    Sections,
    /// Optional header values
    OptionalFields,
}

/// A single structural finding
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Violation {
    rule: RuleGroup,
    message: String,
}

impl Violation {
    pub(crate) fn new(rule: RuleGroup, message: impl Into<String>) -> Violation {
        Violation {
            rule,
            message: message.into(),
        }
    }

    /// The group of the rule that produced this finding
    #[must_use]
    pub fn rule(&self) -> RuleGroup {
        self.rule
    }

    /// Human-readable description
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered list of findings
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Violations {
    items: Vec<Violation>,
}

impl Violations {
    pub(crate) fn push(&mut self, rule: RuleGroup, message: impl Into<String>) {
        self.items.push(Violation::new(rule, message));
    }

    /// Iterate over the findings in the order they were found
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.items.iter()
    }

    /// Returns `true` if nothing was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of findings
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if a finding with exactly this message exists
    #[must_use]
    pub fn contains(&self, message: &str) -> bool {
        self.items.iter().any(|violation| violation.message == message)
    }

    /// Returns `true` if any finding belongs to `rule`
    #[must_use]
    pub fn contains_rule(&self, rule: RuleGroup) -> bool {
        self.items.iter().any(|violation| violation.rule == rule)
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, violation) in self.items.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Validate `headers` with every rule group enabled
#[must_use]
pub fn validate(headers: &PeHeaders) -> Violations {
    validate_with(headers, &ValidationConfig::default())
}

/// Validate `headers` with the rule groups selected by `config`
#[must_use]
pub fn validate_with(headers: &PeHeaders, config: &ValidationConfig) -> Violations {
    let mut violations = Violations::default();

    LengthValidator::validate(headers, config, &mut violations);
    HeaderValidator::validate(headers, config, &mut violations);
    SectionValidator::validate(headers, config, &mut violations);
    OptionalValidator::validate(headers, config, &mut violations);

    debug!(
        "validated {} byte buffer: {} violations",
        headers.len(),
        violations.len()
    );
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pe, test::ImageBuilder};

    #[test]
    fn test_clean_pe32() {
        let headers = pe::decode(&ImageBuilder::pe32().build());
        let violations = validate(&headers);
        assert!(violations.is_empty(), "{violations}");
    }

    #[test]
    fn test_clean_pe32_plus() {
        let headers = pe::decode(&ImageBuilder::pe32_plus().directories(16).build());
        let violations = validate(&headers);
        assert!(violations.is_empty(), "{violations}");
    }

    #[test]
    fn test_clean_object() {
        let headers = pe::decode(&ImageBuilder::object().build());
        let violations = validate(&headers);
        assert!(violations.is_empty(), "{violations}");
    }

    #[test]
    fn test_idempotent() {
        let data = ImageBuilder::pe32()
            .section_count(1)
            .with_coff(|coff| coff.characteristics |= 0x0004)
            .with_optional(|optional| optional.loader_flags = Some(1))
            .build();
        let headers = pe::decode(&data);

        let first = validate(&headers);
        let second = validate(&headers);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_accumulates_across_groups() {
        let data = ImageBuilder::pe32()
            .with_dos(|dos| dos.e_res[0] = 1)
            .with_coff(|coff| coff.characteristics |= 0x0040)
            .with_section(0, |section| section.number_of_relocations = 1)
            .with_optional(|optional| optional.win32_version_value = Some(1))
            .build();
        let violations = validate(&pe::decode(&data));

        assert_eq!(violations.len(), 4, "{violations}");
        assert!(violations.contains_rule(RuleGroup::Image));
        assert!(violations.contains_rule(RuleGroup::Characteristics));
        assert!(violations.contains_rule(RuleGroup::Sections));
        assert!(violations.contains_rule(RuleGroup::OptionalFields));

        let rules: Vec<RuleGroup> = violations.iter().map(Violation::rule).collect();
        assert_eq!(
            rules,
            vec![
                RuleGroup::Characteristics,
                RuleGroup::Image,
                RuleGroup::Sections,
                RuleGroup::OptionalFields
            ]
        );
    }

    #[test]
    fn test_disabled_reports_nothing() {
        let headers = pe::decode(&[0u8; 4]);
        assert!(validate_with(&headers, &ValidationConfig::disabled()).is_empty());
        assert!(!validate(&headers).is_empty());
    }

    #[test]
    fn test_display_joins_lines() {
        let mut violations = Violations::default();
        assert_eq!(violations.to_string(), "");

        violations.push(RuleGroup::Length, "first");
        violations.push(RuleGroup::Image, "second");
        assert_eq!(violations.to_string(), "first\nsecond");
        assert_eq!(violations.len(), 2);
        assert!(violations.contains("second"));
        assert!(!violations.contains("sec"));

        let messages: Vec<String> = violations
            .into_iter()
            .map(|violation| violation.message().to_string())
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
