//! Section management for PE files

use std::ops::Range;

use crate::formats::pe::types::*;
use crate::formats::pe::utils::align_up;

/// Section header together with the extent the loader maps for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: SectionHeader,
    effective_size: u64,
}

impl Section {
    pub fn new(header: SectionHeader, file_alignment: u32) -> Self {
        let effective_size = effective_size(&header, file_alignment);
        Self {
            header,
            effective_size,
        }
    }

    pub fn name(&self) -> String {
        self.header.name()
    }

    /// Mapped size: `min(virtual, raw)` when a virtual size is declared,
    /// raw size otherwise, rounded up to the file alignment.
    pub fn effective_size(&self) -> u64 {
        self.effective_size
    }

    /// RVA interval used for containment tests
    pub fn rva_range(&self) -> Range<u64> {
        let start = self.header.virtual_address as u64;
        start..start + self.effective_size
    }

    pub fn contains_rva(&self, rva: u32) -> bool {
        self.rva_range().contains(&(rva as u64))
    }

    pub fn contains_code(&self) -> bool {
        self.header.contains_code()
    }

    /// File range of the raw data, clamped to `file_len`. The flag is set
    /// when the declared extent had to be cut.
    pub fn raw_range(&self, file_len: usize) -> (Range<usize>, bool) {
        let start = self.header.pointer_to_raw_data as usize;
        let end = start.saturating_add(self.header.size_of_raw_data as usize);
        let clamped_end = end.min(file_len);
        let clamped_start = start.min(clamped_end);
        (clamped_start..clamped_end, clamped_end != end)
    }
}

fn effective_size(header: &SectionHeader, file_alignment: u32) -> u64 {
    let mut size = header.size_of_raw_data;
    if header.virtual_size > 0 {
        size = size.min(header.virtual_size);
    }
    align_up(size as u64, file_alignment as u64)
}

/// Section table in file order
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    sections: Vec<Section>,
}

impl SectionTable {
    pub fn new(headers: Vec<SectionHeader>, file_alignment: u32) -> Self {
        let sections = headers
            .into_iter()
            .map(|h| Section::new(h, file_alignment))
            .collect();
        Self { sections }
    }

    /// Get all sections
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// First section, in file order, whose effective range holds `rva`.
    /// Overlapping sections resolve to the earlier one.
    pub fn section_for_rva(&self, rva: u32) -> Option<&Section> {
        self.sections.iter().find(|s| s.contains_rva(rva))
    }

    /// Convert RVA to file offset
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        let section = self.section_for_rva(rva)?;
        let delta = (rva - section.header.virtual_address) as u64;
        usize::try_from(section.header.pointer_to_raw_data as u64 + delta).ok()
    }

    /// Sections flagged as containing code, in file order
    pub fn code_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.contains_code())
    }
}
