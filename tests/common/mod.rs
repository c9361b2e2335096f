//! Common test utilities and helpers.
//!
//! `PeBuilder` produces small but well-formed PE32/PE32+ images with a code
//! section and an `.rdata` section holding export and import directories.

#![allow(dead_code)]

pub const IMAGE_BASE_32: u64 = 0x40_0000;
pub const IMAGE_BASE_64: u64 = 0x1_4000_0000;
pub const TEXT_RVA: u32 = 0x1000;
pub const RDATA_RVA: u32 = 0x2000;
pub const FILE_ALIGNMENT: u32 = 0x200;

const E_LFANEW: usize = 0x80;

pub const MACHINE_I386: u16 = 0x014c;
pub const MACHINE_AMD64: u16 = 0x8664;

#[derive(Debug, Clone)]
pub enum ImportEntry {
    Name(String),
    Ordinal(u16),
}

#[derive(Debug, Clone)]
pub struct ImportSpec {
    pub module: String,
    pub entries: Vec<ImportEntry>,
    /// Place the IAT at this RVA instead of inside `.rdata`
    pub first_thunk: Option<u32>,
    /// When false the descriptor's OriginalFirstThunk is zero
    pub with_lookup_table: bool,
}

impl ImportSpec {
    pub fn new(module: &str, names: &[&str]) -> Self {
        Self {
            module: module.to_string(),
            entries: names.iter().map(|n| ImportEntry::Name(n.to_string())).collect(),
            first_thunk: None,
            with_lookup_table: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportSpec {
    pub module: String,
    pub base: u32,
    pub functions: Vec<u32>,
    pub names: Vec<String>,
}

/// Appends bytes to a section image and hands back their RVAs
struct Blob {
    rva: u32,
    bytes: Vec<u8>,
}

impl Blob {
    fn new(rva: u32) -> Self {
        Self {
            rva,
            bytes: Vec::new(),
        }
    }

    fn align(&mut self, to: usize) {
        while self.bytes.len() % to != 0 {
            self.bytes.push(0);
        }
    }

    fn here(&self) -> u32 {
        self.rva + self.bytes.len() as u32
    }

    fn put(&mut self, data: &[u8]) -> u32 {
        let at = self.here();
        self.bytes.extend_from_slice(data);
        at
    }

    fn put_cstr(&mut self, s: &str) -> u32 {
        let at = self.put(s.as_bytes());
        self.bytes.push(0);
        at
    }

    fn reserve(&mut self, len: usize) -> u32 {
        let at = self.here();
        self.bytes.resize(self.bytes.len() + len, 0);
        at
    }

    fn patch_u32(&mut self, rva: u32, value: u32) {
        let off = (rva - self.rva) as usize;
        self.bytes[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn patch_thunk(&mut self, rva: u32, value: u64, pe32_plus: bool) {
        let off = (rva - self.rva) as usize;
        if pe32_plus {
            self.bytes[off..off + 8].copy_from_slice(&value.to_le_bytes());
        } else {
            self.bytes[off..off + 4].copy_from_slice(&(value as u32).to_le_bytes());
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeBuilder {
    pub pe32_plus: bool,
    pub machine: u16,
    pub image_base: u64,
    pub entry_point: u32,
    pub code: Vec<u8>,
    pub exports: Option<ExportSpec>,
    pub imports: Vec<ImportSpec>,
}

impl PeBuilder {
    pub fn pe32() -> Self {
        Self {
            pe32_plus: false,
            machine: MACHINE_I386,
            image_base: IMAGE_BASE_32,
            entry_point: TEXT_RVA,
            code: vec![0xC3],
            exports: None,
            imports: Vec::new(),
        }
    }

    pub fn pe64() -> Self {
        Self {
            pe32_plus: true,
            machine: MACHINE_AMD64,
            image_base: IMAGE_BASE_64,
            ..Self::pe32()
        }
    }

    pub fn code(mut self, code: &[u8]) -> Self {
        self.code = code.to_vec();
        self
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn entry_point(mut self, rva: u32) -> Self {
        self.entry_point = rva;
        self
    }

    pub fn exports(mut self, module: &str, functions: &[u32], names: &[&str]) -> Self {
        self.exports = Some(ExportSpec {
            module: module.to_string(),
            base: 1,
            functions: functions.to_vec(),
            names: names.iter().map(|n| n.to_string()).collect(),
        });
        self
    }

    pub fn import(mut self, spec: ImportSpec) -> Self {
        self.imports.push(spec);
        self
    }

    fn thunk_size(&self) -> usize {
        if self.pe32_plus {
            8
        } else {
            4
        }
    }

    fn ordinal_flag(&self) -> u64 {
        if self.pe32_plus {
            1 << 63
        } else {
            1 << 31
        }
    }

    /// Lay out `.rdata` and return (bytes, export dir RVA, import dir RVA)
    fn build_rdata(&self) -> (Vec<u8>, u32, u32) {
        let mut blob = Blob::new(RDATA_RVA);
        let mut export_rva = 0;
        let mut import_rva = 0;

        if let Some(exports) = &self.exports {
            blob.align(4);
            let dir = blob.reserve(40);
            let name = blob.put_cstr(&exports.module);
            blob.align(4);
            let functions = blob.here();
            for f in &exports.functions {
                blob.put(&f.to_le_bytes());
            }
            let name_rvas: Vec<u32> = exports.names.iter().map(|n| blob.put_cstr(n)).collect();
            blob.align(4);
            let names = blob.here();
            for rva in &name_rvas {
                blob.put(&rva.to_le_bytes());
            }
            blob.patch_u32(dir + 12, name);
            blob.patch_u32(dir + 16, exports.base);
            blob.patch_u32(dir + 20, exports.functions.len() as u32);
            blob.patch_u32(dir + 24, exports.names.len() as u32);
            blob.patch_u32(dir + 28, functions);
            blob.patch_u32(dir + 32, names);
            export_rva = dir;
        }

        if !self.imports.is_empty() {
            let width = self.thunk_size();
            let mut descriptors = Vec::new();

            for import in &self.imports {
                let module = blob.put_cstr(&import.module);
                let values: Vec<u64> = import
                    .entries
                    .iter()
                    .map(|e| match e {
                        ImportEntry::Name(n) => {
                            blob.align(2);
                            let at = blob.put(&0u16.to_le_bytes());
                            blob.put_cstr(n);
                            at as u64
                        }
                        ImportEntry::Ordinal(o) => self.ordinal_flag() | *o as u64,
                    })
                    .collect();

                blob.align(8);
                let ilt = blob.reserve(width * (values.len() + 1));
                let iat = blob.reserve(width * (values.len() + 1));
                for (i, v) in values.iter().enumerate() {
                    blob.patch_thunk(ilt + (i * width) as u32, *v, self.pe32_plus);
                    blob.patch_thunk(iat + (i * width) as u32, *v, self.pe32_plus);
                }

                descriptors.push((
                    if import.with_lookup_table { ilt } else { 0 },
                    module,
                    import.first_thunk.unwrap_or(iat),
                ));
            }

            blob.align(4);
            import_rva = blob.reserve(20 * (descriptors.len() + 1));
            for (i, (oft, name, ft)) in descriptors.iter().enumerate() {
                let d = import_rva + (i * 20) as u32;
                blob.patch_u32(d, *oft);
                blob.patch_u32(d + 12, *name);
                blob.patch_u32(d + 16, *ft);
            }
        }

        (blob.bytes, export_rva, import_rva)
    }

    pub fn build(&self) -> Vec<u8> {
        let (rdata, export_rva, import_rva) = self.build_rdata();

        let opt_size: usize = if self.pe32_plus { 0xF0 } else { 0xE0 };
        let text_raw = align(self.code.len().max(1), FILE_ALIGNMENT as usize);
        let rdata_raw = align(rdata.len().max(1), FILE_ALIGNMENT as usize);
        let text_ptr = FILE_ALIGNMENT as usize;
        let rdata_ptr = text_ptr + text_raw;

        let mut data = vec![0u8; rdata_ptr + rdata_raw];

        // DOS header
        data[0] = b'M';
        data[1] = b'Z';
        put_u32(&mut data, 0x3C, E_LFANEW as u32);

        // NT signature and COFF header
        data[E_LFANEW..E_LFANEW + 4].copy_from_slice(b"PE\0\0");
        let coff = E_LFANEW + 4;
        put_u16(&mut data, coff, self.machine);
        put_u16(&mut data, coff + 2, 2);
        put_u16(&mut data, coff + 16, opt_size as u16);
        put_u16(&mut data, coff + 18, 0x0102);

        // Optional header
        let opt = coff + 20;
        put_u16(&mut data, opt, if self.pe32_plus { 0x20B } else { 0x10B });
        put_u32(&mut data, opt + 16, self.entry_point);
        put_u32(&mut data, opt + 20, TEXT_RVA);
        if self.pe32_plus {
            put_u64(&mut data, opt + 24, self.image_base);
        } else {
            put_u32(&mut data, opt + 28, self.image_base as u32);
        }
        put_u32(&mut data, opt + 32, 0x1000);
        put_u32(&mut data, opt + 36, FILE_ALIGNMENT);
        put_u32(&mut data, opt + 56, 0x3000 + align(rdata.len(), 0x1000) as u32);
        put_u32(&mut data, opt + 60, FILE_ALIGNMENT);
        let dirs = opt + if self.pe32_plus { 112 } else { 96 };
        put_u32(&mut data, dirs - 4, 16);
        if export_rva != 0 {
            put_u32(&mut data, dirs, export_rva);
            put_u32(&mut data, dirs + 4, 40);
        }
        if import_rva != 0 {
            put_u32(&mut data, dirs + 8, import_rva);
            put_u32(&mut data, dirs + 12, 20 * (self.imports.len() as u32 + 1));
        }

        // Section headers
        let sh = opt + opt_size;
        write_section(
            &mut data,
            sh,
            b".text\0\0\0",
            self.code.len() as u32,
            TEXT_RVA,
            // Exact size so the listing stops at the last code byte
            self.code.len() as u32,
            text_ptr as u32,
            0x6000_0020,
        );
        write_section(
            &mut data,
            sh + 40,
            b".rdata\0\0",
            rdata.len() as u32,
            RDATA_RVA,
            rdata_raw as u32,
            rdata_ptr as u32,
            0x4000_0040,
        );

        data[text_ptr..text_ptr + self.code.len()].copy_from_slice(&self.code);
        data[rdata_ptr..rdata_ptr + rdata.len()].copy_from_slice(&rdata);
        data
    }
}

#[allow(clippy::too_many_arguments)]
fn write_section(
    data: &mut [u8],
    at: usize,
    name: &[u8; 8],
    virtual_size: u32,
    virtual_address: u32,
    raw_size: u32,
    raw_ptr: u32,
    characteristics: u32,
) {
    data[at..at + 8].copy_from_slice(name);
    put_u32(data, at + 8, virtual_size);
    put_u32(data, at + 12, virtual_address);
    put_u32(data, at + 16, raw_size);
    put_u32(data, at + 20, raw_ptr);
    put_u32(data, at + 36, characteristics);
}

fn align(value: usize, to: usize) -> usize {
    value.div_ceil(to) * to
}

fn put_u16(data: &mut [u8], at: usize, v: u16) {
    data[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(data: &mut [u8], at: usize, v: u32) {
    data[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(data: &mut [u8], at: usize, v: u64) {
    data[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

/// Write `data` to a temp file that lives as long as the handle
pub fn write_temp(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(data).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}
