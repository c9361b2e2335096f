//! PE header parsing

use crate::formats::pe::types::*;
use crate::formats::pe::utils::{read_slice, read_u16, read_u32, read_u64};

/// Validate the DOS header and return `e_lfanew`
pub fn parse_dos_header(data: &[u8]) -> Result<u32> {
    let e_magic = read_u16(data, 0).map_err(|_| PeError::InvalidDosSignature)?;
    if e_magic != DOS_SIGNATURE {
        return Err(PeError::InvalidDosSignature);
    }

    if data.len() < DOS_HEADER_SIZE {
        return Err(PeError::TruncatedHeader {
            expected: DOS_HEADER_SIZE,
            actual: data.len(),
        });
    }

    read_u32(data, E_LFANEW_OFFSET)
}

fn truncated(data: &[u8], expected: usize) -> PeError {
    PeError::TruncatedHeader {
        expected,
        actual: data.len(),
    }
}

/// Parse NT headers (signature, COFF header, optional header, data directories).
///
/// Checks run in a fixed order: NT signature, optional header magic, then
/// machine type. The first mismatch aborts.
pub fn parse_nt_headers(data: &[u8], offset: usize) -> Result<ImageHeader> {
    let signature = read_slice(data, offset, 4).map_err(|_| truncated(data, offset + 4))?;
    if signature != PE_SIGNATURE {
        return Err(PeError::InvalidNtSignature);
    }

    // COFF header
    let coff = offset + 4;
    let coff_end = coff + COFF_HEADER_SIZE;
    if coff_end > data.len() {
        return Err(truncated(data, coff_end));
    }
    let raw_machine = read_u16(data, coff)?;
    let number_of_sections = read_u16(data, coff + 2)?;
    let size_of_optional_header = read_u16(data, coff + 16)?;

    // Optional header
    let opt = coff_end;
    let magic = read_u16(data, opt).map_err(|_| truncated(data, opt + 2))?;
    let bitness = Bitness::try_from(magic)?;
    let machine = Machine::try_from(raw_machine)?;

    let dir_offset = opt + bitness.data_directory_offset();
    if dir_offset > data.len() {
        return Err(truncated(data, dir_offset));
    }

    let entry_point = read_u32(data, opt + 16)?;
    let image_base = match bitness {
        Bitness::Pe32 => read_u32(data, opt + 28)? as u64,
        Bitness::Pe32Plus => read_u64(data, opt + 24)?,
    };
    let file_alignment = read_u32(data, opt + 36)?;
    let number_of_rva_and_sizes = read_u32(data, dir_offset - 4)?;
    let data_directories = parse_data_directories(data, dir_offset, number_of_rva_and_sizes)?;

    Ok(ImageHeader {
        bitness,
        machine,
        image_base,
        entry_point,
        number_of_sections,
        size_of_optional_header,
        file_alignment,
        number_of_rva_and_sizes,
        data_directories,
    })
}

/// Parse data directories from data at offset. Entries past
/// `NumberOfRvaAndSizes` stay empty.
pub fn parse_data_directories(
    data: &[u8],
    offset: usize,
    count: u32,
) -> Result<[DataDirectory; NUMBER_OF_DIRECTORY_ENTRIES]> {
    let mut directories = [DataDirectory::default(); NUMBER_OF_DIRECTORY_ENTRIES];
    let count = (count as usize).min(NUMBER_OF_DIRECTORY_ENTRIES);

    for (i, dir) in directories.iter_mut().enumerate().take(count) {
        let dir_offset = offset + i * DATA_DIRECTORY_SIZE;
        if dir_offset + DATA_DIRECTORY_SIZE > data.len() {
            return Err(truncated(data, dir_offset + DATA_DIRECTORY_SIZE));
        }
        *dir = DataDirectory {
            virtual_address: read_u32(data, dir_offset)?,
            size: read_u32(data, dir_offset + 4)?,
        };
    }

    Ok(directories)
}

/// Parse the section table that follows the optional header
pub fn parse_section_headers(
    data: &[u8],
    offset: usize,
    count: u16,
) -> Result<Vec<SectionHeader>> {
    let mut headers = Vec::with_capacity(count as usize);

    for i in 0..count as usize {
        let at = offset + i * SECTION_HEADER_SIZE;
        let raw = read_slice(data, at, SECTION_HEADER_SIZE)
            .map_err(|_| truncated(data, at + SECTION_HEADER_SIZE))?;

        let mut name = [0u8; 8];
        name.copy_from_slice(&raw[..8]);
        headers.push(SectionHeader {
            name,
            virtual_size: read_u32(raw, 8)?,
            virtual_address: read_u32(raw, 12)?,
            size_of_raw_data: read_u32(raw, 16)?,
            pointer_to_raw_data: read_u32(raw, 20)?,
            characteristics: read_u32(raw, 36)?,
        });
    }

    Ok(headers)
}
