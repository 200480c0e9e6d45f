//! Per-section header rules.

use crate::{
    pe::{flags::SectionCharacteristics, PeHeaders, SectionHeader},
    validation::{RuleGroup, SectionFlagPolicy, ValidationConfig, Violations},
};

const OBJECT_RAW_DATA_ALIGNMENT: u32 = 4;

const LINK_FLAGS: [(SectionCharacteristics, &str); 3] = [
    (SectionCharacteristics::LNK_INFO, "LNK_INFO"),
    (SectionCharacteristics::LNK_REMOVE, "LNK_REMOVE"),
    (SectionCharacteristics::LNK_COMDAT, "LNK_COMDAT"),
];

/// Rules applied to every decoded section record
pub(crate) struct SectionValidator;

impl SectionValidator {
    pub(crate) fn validate(headers: &PeHeaders, config: &ValidationConfig, out: &mut Violations) {
        if !config.is_enabled(RuleGroup::Sections) {
            return;
        }

        let file_alignment = headers
            .optional()
            .and_then(|optional| optional.file_alignment);

        for section in headers.sections() {
            let name = section.name_str();
            if headers.is_image() {
                Self::image_section(section, &name, file_alignment, out);
            } else {
                Self::object_section(section, &name, out);
            }
            Self::link_flags(section, &name, headers.is_image(), config.section_flags, out);
        }
    }

    fn image_section(
        section: &SectionHeader,
        name: &str,
        file_alignment: Option<u32>,
        out: &mut Violations,
    ) {
        if name.starts_with('/') {
            out.push(
                RuleGroup::Sections,
                format!("Images cannot have string references at Sections (sects)[{name}]"),
            );
        }
        if name.contains('$') {
            out.push(
                RuleGroup::Sections,
                format!(
                    "Section {name} cannot have a dollar ($) notation since the binary is an Image"
                ),
            );
        }

        // A zero file alignment is reported by the optional-header rules
        if file_alignment
            .and_then(|alignment| section.pointer_to_raw_data.checked_rem(alignment))
            .is_some_and(|rem| rem != 0)
        {
            out.push(
                RuleGroup::Sections,
                format!(
                    "Section {name} raw data pointers (rawdatptr) should be multiples of File \
                     Alignment (o_filealign) for Images"
                ),
            );
        }

        if section.pointer_to_relocations != 0 || section.number_of_relocations != 0 {
            out.push(
                RuleGroup::Sections,
                format!("Section {name} relocations (relocptr/relocnum) should be zero for Images"),
            );
        }
        if section.pointer_to_linenumbers != 0 || section.number_of_linenumbers != 0 {
            out.push(
                RuleGroup::Sections,
                format!("Section {name} lines (linenonum/linenoptr) are deprecated for Images"),
            );
        }
        if section.flags().contains(SectionCharacteristics::TYPE_NO_PAD) {
            out.push(
                RuleGroup::Sections,
                format!("Section {name} Characteristic TYPE_NO_PAD is invalid for Images"),
            );
        }
    }

    fn object_section(section: &SectionHeader, name: &str, out: &mut Violations) {
        if section.pointer_to_raw_data % OBJECT_RAW_DATA_ALIGNMENT != 0 {
            out.push(
                RuleGroup::Sections,
                format!(
                    "Section {name} raw data pointers (rawdatptr) should be multiples of 4B for \
                     Objects"
                ),
            );
        }
    }

    fn link_flags(
        section: &SectionHeader,
        name: &str,
        is_image: bool,
        policy: SectionFlagPolicy,
        out: &mut Violations,
    ) {
        let kind = match (policy, is_image) {
            (SectionFlagPolicy::RejectInObjects, false) => "Objects",
            (SectionFlagPolicy::RejectInImages, true) => "Images",
            _ => return,
        };

        let flags = section.flags();
        for (flag, flag_name) in LINK_FLAGS {
            if flags.contains(flag) {
                out.push(
                    RuleGroup::Sections,
                    format!("Section {name} Characteristic {flag_name} is invalid for {kind}"),
                );
            }
        }

        let raw = (flags & SectionCharacteristics::ALIGN_MASK).bits() >> 20;
        if raw != 0 {
            let alignment = flags
                .alignment()
                .map_or_else(|| format!("ALIGN_{raw:#x}"), |alignment| alignment.to_string());
            out.push(
                RuleGroup::Sections,
                format!("Section {name} Characteristic {alignment} is invalid for {kind}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        pe,
        test::ImageBuilder,
        validation::{validate, validate_with, RuleGroup, SectionFlagPolicy, ValidationConfig},
    };

    #[test]
    fn test_image_names() {
        let data = ImageBuilder::pe32()
            .with_section(0, |section| section.name = *b"/4\0\0\0\0\0\0")
            .with_section(1, |section| section.name = *b".text$mn")
            .build();
        let violations = validate(&pe::decode(&data));

        assert_eq!(
            violations.to_string(),
            "Images cannot have string references at Sections (sects)[/4]\n\
             Section .text$mn cannot have a dollar ($) notation since the binary is an Image"
        );
    }

    #[test]
    fn test_image_pointers() {
        let data = ImageBuilder::pe32()
            .with_section(0, |section| {
                section.pointer_to_raw_data = 0x410;
                section.pointer_to_relocations = 0x800;
                section.number_of_linenumbers = 3;
                section.characteristics |= 0x0000_0008;
            })
            .build();
        let violations = validate(&pe::decode(&data));

        assert_eq!(
            violations.to_string(),
            "Section .text raw data pointers (rawdatptr) should be multiples of File Alignment \
             (o_filealign) for Images\n\
             Section .text relocations (relocptr/relocnum) should be zero for Images\n\
             Section .text lines (linenonum/linenoptr) are deprecated for Images\n\
             Section .text Characteristic TYPE_NO_PAD is invalid for Images"
        );
    }

    #[test]
    fn test_image_zero_file_alignment() {
        let data = ImageBuilder::pe32()
            .with_optional(|optional| optional.file_alignment = Some(0))
            .with_section(0, |section| section.pointer_to_raw_data = 0x410)
            .build();
        let violations = validate(&pe::decode(&data));

        assert!(!violations.contains_rule(RuleGroup::Sections), "{violations}");
    }

    #[test]
    fn test_object_pointers() {
        let data = ImageBuilder::object()
            .with_section(1, |section| section.pointer_to_raw_data = 0x266)
            .build();
        let violations = validate(&pe::decode(&data));

        assert_eq!(
            violations.to_string(),
            "Section .data raw data pointers (rawdatptr) should be multiples of 4B for Objects"
        );
    }

    #[test]
    fn test_object_allows_image_only_rules() {
        let data = ImageBuilder::object()
            .with_section(0, |section| {
                section.name = *b".text$mn";
                section.pointer_to_relocations = 0x400;
                section.number_of_relocations = 2;
            })
            .build();
        assert!(validate(&pe::decode(&data)).is_empty());
    }

    #[test]
    fn test_link_flags_rejected_in_objects() {
        let data = ImageBuilder::object()
            .with_section(0, |section| section.characteristics |= 0x0000_1000 | 0x0050_0000)
            .build();
        let headers = pe::decode(&data);
        let violations = validate(&headers);

        assert_eq!(
            violations.to_string(),
            "Section .text Characteristic LNK_COMDAT is invalid for Objects\n\
             Section .text Characteristic ALIGN_16BYTES is invalid for Objects"
        );

        let ignored = validate_with(
            &headers,
            &ValidationConfig::default().with_section_flags(SectionFlagPolicy::Ignore),
        );
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_link_flags_rejected_in_images() {
        let data = ImageBuilder::pe32()
            .with_section(1, |section| section.characteristics |= 0x0000_0200 | 0x0000_0800)
            .build();
        let headers = pe::decode(&data);

        assert!(validate(&headers).is_empty());

        let config = ValidationConfig::default().with_section_flags(SectionFlagPolicy::RejectInImages);
        let violations = validate_with(&headers, &config);
        assert_eq!(
            violations.to_string(),
            "Section .data Characteristic LNK_INFO is invalid for Images\n\
             Section .data Characteristic LNK_REMOVE is invalid for Images"
        );
    }

    #[test]
    fn test_unnamed_alignment_value() {
        let data = ImageBuilder::object()
            .with_section(0, |section| section.characteristics |= 0x00F0_0000)
            .build();
        let violations = validate(&pe::decode(&data));

        assert!(violations.contains("Section .text Characteristic ALIGN_0xf is invalid for Objects"));
    }

    #[test]
    fn test_disabled_group() {
        let data = ImageBuilder::pe32()
            .with_section(0, |section| section.number_of_relocations = 1)
            .build();
        let config = ValidationConfig {
            enable_section_validation: false,
            ..ValidationConfig::default()
        };
        assert!(validate_with(&pe::decode(&data), &config).is_empty());
    }
}
