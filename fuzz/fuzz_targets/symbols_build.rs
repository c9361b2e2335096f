#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = pedisasm::PeImage::parse(data) {
        if let Ok(table) = pedisasm::SymbolTable::build(&image) {
            assert!(table.is_sorted());
        }
    }
});
