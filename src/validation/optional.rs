//! Optional-header value rules.

use crate::{
    pe::{flags::DataDirectoryKind, flags::DllCharacteristics, OptionalHeader, PeHeaders},
    validation::{RuleGroup, ValidationConfig, Violations},
};

const MIN_FILE_ALIGNMENT: u32 = 512;
const MAX_FILE_ALIGNMENT: u32 = 64 * 1024;
const PAGE_SIZE: u32 = 0x1000;

/// Reserved fields, alignments, sizes and reserved data directories
pub(crate) struct OptionalValidator;

impl OptionalValidator {
    pub(crate) fn validate(headers: &PeHeaders, config: &ValidationConfig, out: &mut Violations) {
        if !config.is_enabled(RuleGroup::OptionalFields) {
            return;
        }
        let Some(optional) = headers.optional() else {
            return;
        };

        Self::reserved_fields(optional, out);
        Self::alignments(optional, out);
        Self::dll_characteristics(optional, out);
        Self::stack_and_heap(optional, out);
        Self::reserved_directories(headers, out);
    }

    fn reserved_fields(optional: &OptionalHeader, out: &mut Violations) {
        if optional.win32_version_value.is_some_and(|value| value != 0) {
            out.push(
                RuleGroup::OptionalFields,
                "Win32Res should be all-zero-filled",
            );
        }
        if optional.loader_flags.is_some_and(|value| value != 0) {
            out.push(
                RuleGroup::OptionalFields,
                "Loader Flags (o_ldflag) should be all-zero-filled",
            );
        }
    }

    fn alignments(optional: &OptionalHeader, out: &mut Violations) {
        let file = optional.file_alignment;
        let section = optional.section_alignment;

        if let Some(file) = file {
            let in_range = (MIN_FILE_ALIGNMENT..=MAX_FILE_ALIGNMENT).contains(&file);
            let page_matched = section.is_none_or(|section| section >= PAGE_SIZE || section == file);
            if !in_range || !page_matched {
                out.push(
                    RuleGroup::OptionalFields,
                    "File Alignment (o_filealign) must be between 512 and 64KB (and if section \
                     alignment is less than arch's page size, must be equal to it)",
                );
            }
        }

        if let (Some(file), Some(section)) = (file, section) {
            if section < file {
                out.push(
                    RuleGroup::OptionalFields,
                    "Section Alignment (o_sectalign) must greater or equal to File Alignment \
                     (o_filealign)",
                );
            }
        }

        // Zero alignments make the multiple checks meaningless and are reported above
        if let (Some(size), Some(section)) = (optional.size_of_image, section) {
            if size.checked_rem(section).is_some_and(|rem| rem != 0) {
                out.push(
                    RuleGroup::OptionalFields,
                    "Image Size (o_imgsz) must be multiple of Section Alignment (o_sectalign)",
                );
            }
        }
        if let (Some(size), Some(file)) = (optional.size_of_headers, file) {
            if size.checked_rem(file).is_some_and(|rem| rem != 0) {
                out.push(
                    RuleGroup::OptionalFields,
                    "Headers Size (o_hdrsz) must be multiple of File Alignment (o_filealign)",
                );
            }
        }
    }

    fn dll_characteristics(optional: &OptionalHeader, out: &mut Violations) {
        if optional
            .dll_flags()
            .is_some_and(|flags| flags.intersects(DllCharacteristics::RESERVED))
        {
            out.push(
                RuleGroup::OptionalFields,
                "Reserved DLL Characteristics (o_dllchrctrs) are being used",
            );
        }
    }

    fn stack_and_heap(optional: &OptionalHeader, out: &mut Violations) {
        let exceeds = |reserve: Option<u64>, commit: Option<u64>| match (reserve, commit) {
            (Some(reserve), Some(commit)) => commit > reserve,
            _ => false,
        };

        if exceeds(optional.size_of_stack_reserve, optional.size_of_stack_commit)
            || exceeds(optional.size_of_heap_reserve, optional.size_of_heap_commit)
        {
            out.push(
                RuleGroup::OptionalFields,
                "Reserved (o_stackres/o_heapres) sizes must be greater or equal than Commited \
                 (o_stackcomm/o_heapcomm)",
            );
        }
    }

    fn reserved_directories(headers: &PeHeaders, out: &mut Violations) {
        let nonzero = |kind: DataDirectoryKind| {
            headers
                .data_directory(kind as u32)
                .is_some_and(|directory| !directory.is_zero())
        };
        let global_ptr_sized = headers
            .data_directory(DataDirectoryKind::GlobalPtr as u32)
            .is_some_and(|directory| directory.size != 0);

        if nonzero(DataDirectoryKind::Architecture)
            || nonzero(DataDirectoryKind::Reserved)
            || global_ptr_sized
        {
            out.push(
                RuleGroup::OptionalFields,
                "Reserved Sections must be all-zero-filled",
            );
        }
    }
}
