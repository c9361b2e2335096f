#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = pedisasm::OutputConfig::default();
    let _ = pedisasm::disassemble_bytes(data, &config, &mut std::io::sink());
});
