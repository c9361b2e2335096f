mod common;

use common::*;
use pedisasm::formats::pe::{Bitness, Machine, PeError, PeImage};

#[test]
fn parses_pe32_header_chain() {
    let data = PeBuilder::pe32().code(&[0x90, 0xC3]).build();
    let image = PeImage::parse(&data).expect("valid image");

    assert_eq!(image.bitness(), Bitness::Pe32);
    assert_eq!(image.machine(), Machine::I386);
    assert_eq!(image.image_base(), IMAGE_BASE_32);
    assert_eq!(image.entry_point(), TEXT_RVA);
    assert_eq!(image.sections().len(), 2);
    assert_eq!(image.sections()[0].name(), ".text");
    assert!(image.sections()[0].contains_code());
    assert!(!image.sections()[1].contains_code());
}

#[test]
fn parses_pe32_plus_header_chain() {
    let data = PeBuilder::pe64().build();
    let image = PeImage::parse(&data).expect("valid image");

    assert_eq!(image.bitness(), Bitness::Pe32Plus);
    assert_eq!(image.machine(), Machine::X86_64);
    assert_eq!(image.image_base(), IMAGE_BASE_64);
    assert_eq!(image.machine().decode_bitness(), 64);
}

#[test]
fn rva_to_offset_matches_section_arithmetic() {
    let data = PeBuilder::pe32().code(&[0x90; 0x10]).build();
    let image = PeImage::parse(&data).unwrap();

    for section in image.sections() {
        let va = section.header.virtual_address;
        let raw = section.header.pointer_to_raw_data as usize;
        for delta in [0u32, 1, 0x10, section.effective_size() as u32 - 1] {
            assert_eq!(image.rva_to_offset(va + delta), Some(raw + delta as usize));
        }
        assert!(image.section_for_rva(va).is_some());
    }

    // Below the first section and in the gap between the two
    assert_eq!(image.rva_to_offset(0x0), None);
    assert_eq!(image.rva_to_offset(TEXT_RVA - 1), None);
    assert_eq!(image.rva_to_offset(TEXT_RVA + FILE_ALIGNMENT), None);
    assert_eq!(image.rva_to_offset(0x1800), None);
    assert_eq!(image.rva_to_offset(u32::MAX), None);
}

#[test]
fn corrupted_dos_signature_is_rejected() {
    let mut data = PeBuilder::pe32().build();
    data[0] = b'X';
    assert_eq!(
        PeImage::parse(&data).err(),
        Some(PeError::InvalidDosSignature)
    );
}

#[test]
fn corrupted_nt_signature_is_rejected() {
    let mut data = PeBuilder::pe32().build();
    data[0x80] = b'N';
    assert_eq!(
        PeImage::parse(&data).err(),
        Some(PeError::InvalidNtSignature)
    );
}

#[test]
fn unsupported_machine_is_rejected() {
    // ARM Thumb-2
    let data = PeBuilder::pe32().machine(0x01c4).build();
    let err = PeImage::parse(&data).err().expect("rejected");
    assert_eq!(err, PeError::UnsupportedMachine(0x01c4));
    assert!(err.is_unsupported_architecture());
}

#[test]
fn truncated_inputs_never_panic() {
    let data = PeBuilder::pe64()
        .exports("app.dll", &[0x1000], &["Run"])
        .import(ImportSpec::new("KERNEL32.dll", &["ExitProcess"]))
        .build();
    for len in 0..data.len() {
        if let Ok(image) = PeImage::parse(&data[..len]) {
            let _ = pedisasm::SymbolTable::build(&image);
        }
    }
}
