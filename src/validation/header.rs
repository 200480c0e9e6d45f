//! Buffer-length, MS-DOS header and COFF header rules.

use crate::{
    pe::{
        flags::{FileCharacteristics, OptionalMagic},
        DecodeOutcome, PeHeaders, Stage, MIN_IMAGE_LEN, MIN_LEN,
    },
    validation::{RuleGroup, ValidationConfig, Violations},
};

const IMAGE_BASE_ALIGNMENT: u64 = 64 * 1024;
const MIN_SECTIONS: u16 = 2;
const MAX_SECTIONS: u16 = 96;

const DEPRECATED_CHARACTERISTICS: [(FileCharacteristics, &str); 4] = [
    (FileCharacteristics::LINE_NUMS_STRIPPED, "LINE_NUMS_STRIPPED"),
    (FileCharacteristics::LOCAL_SYMS_STRIPPED, "LOCAL_SYMS_STRIPPED"),
    (FileCharacteristics::AGGRESSIVE_WS_TRIM, "AGGRESSIVE_WS_TRIM"),
    (FileCharacteristics::BYTES_REVERSED_HI, "BYTES_REVERSED_HI"),
];

/// Minimum lengths and truncated stages
pub(crate) struct LengthValidator;

impl LengthValidator {
    pub(crate) fn validate(headers: &PeHeaders, config: &ValidationConfig, out: &mut Violations) {
        if config.is_enabled(RuleGroup::Length) {
            if headers.len() < MIN_LEN {
                out.push(RuleGroup::Length, "Binary does not have valid length");
            } else if headers.is_image() && headers.len() < MIN_IMAGE_LEN {
                out.push(RuleGroup::Length, "Binary (Img) does not have valid length");
            }
        }

        if config.is_enabled(RuleGroup::Truncation) {
            if let DecodeOutcome::Truncated { stage, offset } = headers.outcome() {
                // Stub truncation is the length finding above
                if stage != Stage::Stub {
                    out.push(
                        RuleGroup::Truncation,
                        format!("Binary is truncated in the {stage} at offset {offset:#x}"),
                    );
                }
            }
        }
    }
}

/// Optional-header shape, section count, characteristics and image / object specifics
pub(crate) struct HeaderValidator;

impl HeaderValidator {
    pub(crate) fn validate(headers: &PeHeaders, config: &ValidationConfig, out: &mut Violations) {
        if config.is_enabled(RuleGroup::OptionalHeader) {
            Self::optional_header(headers, out);
        }
        if config.is_enabled(RuleGroup::SectionCount) {
            Self::section_count(headers, out);
        }
        if config.is_enabled(RuleGroup::Characteristics) {
            Self::characteristics(headers, out);
        }
        if headers.is_image() && config.is_enabled(RuleGroup::Image) {
            Self::image(headers, out);
        }
        if !headers.is_image() && config.is_enabled(RuleGroup::Object) {
            Self::object(headers, out);
        }
    }

    fn optional_header(headers: &PeHeaders, out: &mut Violations) {
        let Some(coff) = headers.coff() else {
            return;
        };

        let Some(optional) = headers.optional() else {
            // A declared header the buffer ends inside is a truncation finding
            if headers.is_image() && coff.size_of_optional_header == 0 {
                out.push(
                    RuleGroup::OptionalHeader,
                    "Images need to define the Optional Header",
                );
            }
            return;
        };

        match optional.variant() {
            Some(OptionalMagic::Pe32) if optional.is_undersized(coff.size_of_optional_header) => {
                out.push(RuleGroup::OptionalHeader, "OPT size (optionalsize) broken");
            }
            Some(OptionalMagic::Pe32Plus)
                if optional.is_undersized(coff.size_of_optional_header) =>
            {
                out.push(RuleGroup::OptionalHeader, "OPT+ size (optionalsize) broken");
            }
            None => out.push(RuleGroup::OptionalHeader, "OPT signature broken"),
            _ => {}
        }

        if optional
            .number_of_rva_and_sizes
            .is_some_and(|count| count % 8 != 0)
        {
            out.push(
                RuleGroup::OptionalHeader,
                "RVA number should be a multiple of 8",
            );
        }
    }

    fn section_count(headers: &PeHeaders, out: &mut Violations) {
        let Some(coff) = headers.coff() else {
            return;
        };

        if coff.number_of_sections < MIN_SECTIONS {
            out.push(RuleGroup::SectionCount, "Sections must be at least 2");
        } else if coff.number_of_sections > MAX_SECTIONS {
            out.push(RuleGroup::SectionCount, "Sections must be at most 96");
        }
    }

    fn characteristics(headers: &PeHeaders, out: &mut Violations) {
        let Some(coff) = headers.coff() else {
            return;
        };
        let flags = coff.flags();

        for (flag, name) in DEPRECATED_CHARACTERISTICS {
            if flags.contains(flag) {
                out.push(
                    RuleGroup::Characteristics,
                    format!("The {name} Characteristic (chrctrs) is deprecated"),
                );
            }
        }
        if flags.contains(FileCharacteristics::RESERVED) {
            out.push(
                RuleGroup::Characteristics,
                "Characteristic Flag Reserved for future (chrctrs) use is used",
            );
        }
    }

    fn image(headers: &PeHeaders, out: &mut Violations) {
        if !headers.has_pe_signature() {
            out.push(RuleGroup::Image, "PE signature (sig) broken");
        }

        if let Some(dos) = headers.dos() {
            if !dos.res_is_zero() {
                out.push(
                    RuleGroup::Image,
                    "PE Reserved Space #1 (e_res) should be all-zero-filled",
                );
            }
            if !dos.res2_is_zero() {
                out.push(
                    RuleGroup::Image,
                    "PE Reserved Space #2 (e_res2) should be all-zero-filled",
                );
            }
        }

        if let Some(coff) = headers.coff() {
            if coff.pointer_to_symbol_table != 0 || coff.number_of_symbols != 0 {
                out.push(
                    RuleGroup::Image,
                    "Debug COFF symbol table (symtabptr/symbnum) deprecated on images",
                );
            }
        }

        if headers
            .optional()
            .and_then(|optional| optional.image_base)
            .is_some_and(|base| base % IMAGE_BASE_ALIGNMENT != 0)
        {
            out.push(
                RuleGroup::Image,
                "Image Base (o_imbase) must be multiple of 64KB",
            );
        }
    }

    fn object(headers: &PeHeaders, out: &mut Violations) {
        if headers
            .coff()
            .is_some_and(|coff| coff.size_of_optional_header != 0)
        {
            out.push(
                RuleGroup::Object,
                "Optional header (optionalsize != 0) invalid on object files",
            );
        }
    }
}
