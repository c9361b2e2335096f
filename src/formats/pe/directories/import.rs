//! Import directory access

use std::borrow::Cow;

use crate::formats::pe::types::*;
use crate::formats::pe::utils::read_u32;
use crate::formats::pe::PeImage;

const IMPORT_DESCRIPTOR_SIZE: u32 = 20;

/// Width of an `IMAGE_THUNK_DATA` slot and the position of its ordinal flag.
///
/// The import walk is written once against this trait and instantiated for
/// both widths.
pub trait ThunkWidth {
    /// Bytes per thunk
    const SIZE: u32;
    /// `IMAGE_ORDINAL_FLAG32` / `IMAGE_ORDINAL_FLAG64`
    const ORDINAL_FLAG: u64;

    fn read(image: &PeImage<'_>, rva: u32) -> Result<u64>;
}

pub struct Thunk32;
pub struct Thunk64;

impl ThunkWidth for Thunk32 {
    const SIZE: u32 = 4;
    const ORDINAL_FLAG: u64 = 0x8000_0000;

    fn read(image: &PeImage<'_>, rva: u32) -> Result<u64> {
        image.read_u32_at_rva(rva).map(u64::from)
    }
}

impl ThunkWidth for Thunk64 {
    const SIZE: u32 = 8;
    const ORDINAL_FLAG: u64 = 0x8000_0000_0000_0000;

    fn read(image: &PeImage<'_>, rva: u32) -> Result<u64> {
        image.read_u64_at_rva(rva)
    }
}

/// Decoded thunk value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thunk {
    ByName { hint_name_rva: u32 },
    ByOrdinal { ordinal: u16 },
}

impl Thunk {
    pub fn decode<W: ThunkWidth>(value: u64) -> Self {
        if value & W::ORDINAL_FLAG != 0 {
            Thunk::ByOrdinal {
                ordinal: (value & 0xFFFF) as u16,
            }
        } else {
            Thunk::ByName {
                hint_name_rva: value as u32,
            }
        }
    }
}

/// Iterator over the null-terminated array of import descriptors
pub struct ImportDescriptors<'i, 'data> {
    image: &'i PeImage<'data>,
    rva: u32,
    done: bool,
}

impl<'i, 'data> ImportDescriptors<'i, 'data> {
    pub fn new(image: &'i PeImage<'data>, dir_rva: u32) -> Self {
        Self {
            image,
            rva: dir_rva,
            done: false,
        }
    }

    fn read(&self) -> Result<ImportDescriptor> {
        let raw = self
            .image
            .read_slice_at_rva(self.rva, IMPORT_DESCRIPTOR_SIZE as usize)?;
        Ok(ImportDescriptor {
            original_first_thunk: read_u32(raw, 0)?,
            time_date_stamp: read_u32(raw, 4)?,
            forwarder_chain: read_u32(raw, 8)?,
            name_rva: read_u32(raw, 12)?,
            first_thunk: read_u32(raw, 16)?,
        })
    }
}

impl<'i, 'data> Iterator for ImportDescriptors<'i, 'data> {
    type Item = Result<ImportDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read() {
            Ok(desc) if desc.is_null() => {
                self.done = true;
                None
            }
            Ok(desc) => {
                self.rva = self.rva.wrapping_add(IMPORT_DESCRIPTOR_SIZE);
                Some(Ok(desc))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterator over one descriptor's lookup thunks, stopping at the zero entry
pub struct Thunks<'i, 'data, W> {
    image: &'i PeImage<'data>,
    rva: u32,
    done: bool,
    _width: std::marker::PhantomData<W>,
}

impl<'i, 'data, W: ThunkWidth> Thunks<'i, 'data, W> {
    pub fn new(image: &'i PeImage<'data>, first_rva: u32) -> Self {
        Self {
            image,
            rva: first_rva,
            done: false,
            _width: std::marker::PhantomData,
        }
    }
}

impl<'i, 'data, W: ThunkWidth> Iterator for Thunks<'i, 'data, W> {
    type Item = Result<Thunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match W::read(self.image, self.rva) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(value) => {
                self.rva = self.rva.wrapping_add(W::SIZE);
                Some(Ok(Thunk::decode::<W>(value)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Name of an `IMAGE_IMPORT_BY_NAME` entry (the hint word is skipped)
pub fn read_import_by_name<'data>(image: &PeImage<'data>, rva: u32) -> Result<Cow<'data, str>> {
    // Hint must be readable as well
    image.read_u16_at_rva(rva)?;
    image.read_string_at_rva(rva.wrapping_add(2))
}
