//! Validated read-only view over a PE image

pub mod directories;
pub mod headers;
pub mod sections;
pub mod types;
pub mod utils;

use std::borrow::Cow;

use tracing::debug;

use headers::*;
pub use sections::{Section, SectionTable};
pub use types::*;
use utils::*;

/// Main PE image view.
///
/// Construction validates the header chain; a value of this type always
/// carries a supported architecture and a parsed section table.
pub struct PeImage<'data> {
    data: &'data [u8],
    header: ImageHeader,
    section_table: SectionTable,
}

impl<'data> PeImage<'data> {
    /// Validate the header chain and section table of `data`
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let e_lfanew = parse_dos_header(data)? as usize;
        let header = parse_nt_headers(data, e_lfanew)?;

        // Section table follows the optional header
        let section_offset =
            e_lfanew + 4 + COFF_HEADER_SIZE + header.size_of_optional_header as usize;
        let section_headers =
            parse_section_headers(data, section_offset, header.number_of_sections)?;
        let section_table = SectionTable::new(section_headers, header.file_alignment);

        debug!(
            machine = %header.machine,
            image_base = format_args!("{:#x}", header.image_base),
            sections = header.number_of_sections,
            "Parsed PE headers"
        );

        Ok(Self {
            data,
            header,
            section_table,
        })
    }

    /// Raw file bytes
    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    pub fn bitness(&self) -> Bitness {
        self.header.bitness
    }

    pub fn is_64bit(&self) -> bool {
        self.header.bitness.is_64bit()
    }

    pub fn machine(&self) -> Machine {
        self.header.machine
    }

    pub fn entry_point(&self) -> u32 {
        self.header.entry_point
    }

    pub fn image_base(&self) -> u64 {
        self.header.image_base
    }

    pub fn sections(&self) -> &[Section] {
        self.section_table.sections()
    }

    pub fn section_table(&self) -> &SectionTable {
        &self.section_table
    }

    pub fn data_directory(&self, index: usize) -> DataDirectory {
        self.header
            .data_directories
            .get(index)
            .copied()
            .unwrap_or_default()
    }

    /// Find section containing RVA
    pub fn section_for_rva(&self, rva: u32) -> Option<&Section> {
        self.section_table.section_for_rva(rva)
    }

    /// Convert RVA to file offset
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.section_table.rva_to_offset(rva)
    }

    /// Like `rva_to_offset`, but an unmapped RVA is an error
    pub fn offset_of(&self, rva: u32) -> Result<usize> {
        self.rva_to_offset(rva).ok_or(PeError::InvalidRva { rva })
    }

    pub fn read_u16_at_rva(&self, rva: u32) -> Result<u16> {
        read_u16(self.data, self.offset_of(rva)?)
    }

    pub fn read_u32_at_rva(&self, rva: u32) -> Result<u32> {
        read_u32(self.data, self.offset_of(rva)?)
    }

    pub fn read_u64_at_rva(&self, rva: u32) -> Result<u64> {
        read_u64(self.data, self.offset_of(rva)?)
    }

    pub fn read_slice_at_rva(&self, rva: u32, len: usize) -> Result<&'data [u8]> {
        read_slice(self.data, self.offset_of(rva)?, len)
    }

    /// Read a null-terminated string at an RVA
    pub fn read_string_at_rva(&self, rva: u32) -> Result<Cow<'data, str>> {
        read_cstring(self.data, self.offset_of(rva)?, MAX_NAME_LEN)
    }

    /// Raw bytes of a section, clamped to the end of the file
    pub fn section_data(&self, section: &Section) -> (&'data [u8], bool) {
        let (range, clamped) = section.raw_range(self.data.len());
        (&self.data[range], clamped)
    }
}
