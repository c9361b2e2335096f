//! Export directory access

use std::borrow::Cow;

use crate::formats::pe::types::*;
use crate::formats::pe::utils::read_u32;
use crate::formats::pe::PeImage;

const EXPORT_DIRECTORY_SIZE: usize = 40;

/// Read the `IMAGE_EXPORT_DIRECTORY` at `dir_rva`
pub fn read_export_directory(image: &PeImage<'_>, dir_rva: u32) -> Result<ExportDirectory> {
    let raw = image.read_slice_at_rva(dir_rva, EXPORT_DIRECTORY_SIZE)?;

    Ok(ExportDirectory {
        name_rva: read_u32(raw, 12)?,
        base: read_u32(raw, 16)?,
        number_of_functions: read_u32(raw, 20)?,
        number_of_names: read_u32(raw, 24)?,
        address_of_functions: read_u32(raw, 28)?,
        address_of_names: read_u32(raw, 32)?,
    })
}

/// One export slot, addressed by function index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry<'a> {
    pub index: u32,
    pub rva: u32,
    pub name: ExportName<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportName<'a> {
    Named(Cow<'a, str>),
    /// Function index past `NumberOfNames`
    Ordinal(u32),
}

/// Walks `AddressOfFunctions` and `AddressOfNames` in parallel by function
/// index. The name-ordinal table is not consulted.
pub struct ExportEntries<'i, 'data> {
    image: &'i PeImage<'data>,
    dir: ExportDirectory,
    index: u32,
}

impl<'i, 'data> ExportEntries<'i, 'data> {
    pub fn new(image: &'i PeImage<'data>, dir: ExportDirectory) -> Self {
        Self {
            image,
            dir,
            index: 0,
        }
    }

    fn entry(&self, index: u32) -> Result<ExportEntry<'data>> {
        let slot = index.wrapping_mul(4);
        let rva = self
            .image
            .read_u32_at_rva(self.dir.address_of_functions.wrapping_add(slot))?;

        let name = if index < self.dir.number_of_names {
            let name_rva = self
                .image
                .read_u32_at_rva(self.dir.address_of_names.wrapping_add(slot))?;
            ExportName::Named(self.image.read_string_at_rva(name_rva)?)
        } else {
            ExportName::Ordinal(self.dir.base.wrapping_add(index))
        };

        Ok(ExportEntry { index, rva, name })
    }
}

impl<'i, 'data> Iterator for ExportEntries<'i, 'data> {
    type Item = Result<ExportEntry<'data>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.dir.number_of_functions {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some(self.entry(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.dir.number_of_functions - self.index) as usize;
        (0, Some(remaining))
    }
}
