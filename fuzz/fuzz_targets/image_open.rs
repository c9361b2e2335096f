#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = pedisasm::PeImage::parse(data) {
        for section in image.sections() {
            let _ = image.section_data(section);
            let _ = image.rva_to_offset(section.header.virtual_address);
        }
    }
});
