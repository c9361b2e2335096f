//! Bounds-checked readers for PE parsing

use std::borrow::Cow;

use crate::formats::pe::types::{PeError, Result};

/// Longest C string accepted for module and symbol names
pub const MAX_NAME_LEN: usize = 4096;

/// Extension trait for reading primitive types from byte slices
pub trait ReadExt {
    fn read_u8_at(&self, offset: usize) -> Option<u8>;
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_u64_le_at(&self, offset: usize) -> Option<u64>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u8_at(&self, offset: usize) -> Option<u8> {
        self.get(offset).copied()
    }

    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.get(offset..offset.checked_add(2)?)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.get(offset..offset.checked_add(4)?)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_u64_le_at(&self, offset: usize) -> Option<u64> {
        self.get(offset..offset.checked_add(8)?)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset.checked_add(len)?)
    }
}

fn out_of_bounds(data: &[u8], offset: usize, size: usize) -> PeError {
    PeError::OutOfBounds {
        offset,
        size,
        len: data.len(),
    }
}

pub fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.read_u16_le_at(offset)
        .ok_or_else(|| out_of_bounds(data, offset, 2))
}

pub fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.read_u32_le_at(offset)
        .ok_or_else(|| out_of_bounds(data, offset, 4))
}

pub fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    data.read_u64_le_at(offset)
        .ok_or_else(|| out_of_bounds(data, offset, 8))
}

/// Borrow `len` bytes at `offset`, failing instead of walking off the buffer
pub fn read_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    data.read_slice_at(offset, len)
        .ok_or_else(|| out_of_bounds(data, offset, len))
}

/// Read a null-terminated string. A string cut off by the end of the
/// buffer before its terminator is rejected; bytes that are not UTF-8 are
/// replaced rather than rejected.
pub fn read_cstring(data: &[u8], offset: usize, max_len: usize) -> Result<Cow<'_, str>> {
    if offset >= data.len() {
        return Err(out_of_bounds(data, offset, 1));
    }
    let end = offset.saturating_add(max_len).min(data.len());
    let slice = &data[offset..end];
    let len = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or(PeError::InvalidString { offset })?;
    Ok(String::from_utf8_lossy(&slice[..len]))
}

/// Align a value up to the specified alignment, using the loader's mask form.
#[inline(always)]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        value
    } else {
        (value + alignment - 1) & !(alignment - 1)
    }
}
