use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

#[path = "../tests/common/mod.rs"]
mod common;

use common::{ImportSpec, PeBuilder};
use pedisasm::config::OutputConfig;
use pedisasm::formats::pe::PeImage;
use pedisasm::symbols::SymbolTable;
use pedisasm::{disassemble_bytes, AddressResolver};

fn synthetic_image(exports: usize, imports: usize) -> Vec<u8> {
    let functions: Vec<u32> = (0..exports as u32).map(|i| 0x1000 + i * 0x10).collect();
    let names: Vec<String> = (0..exports).map(|i| format!("Export{:05}", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let import_names: Vec<String> = (0..imports).map(|i| format!("Import{:05}", i)).collect();
    let import_refs: Vec<&str> = import_names.iter().map(String::as_str).collect();

    let mut spec = ImportSpec::new("KERNEL32.dll", &import_refs);
    spec.first_thunk = Some(0x20_0000);
    PeBuilder::pe32()
        .code(&[0x90; 64])
        .exports("bench.dll", &functions, &name_refs)
        .import(spec)
        .build()
}

fn bench_symbol_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbol-build");
    for (exports, imports) in [(16, 16), (512, 256), (4096, 1024)] {
        let data = synthetic_image(exports, imports);
        group.throughput(Throughput::Elements((exports + imports) as u64));
        group.bench_function(format!("{}x{}", exports, imports), |b| {
            b.iter_batched(
                || PeImage::parse(&data).expect("valid image"),
                |image| black_box(SymbolTable::build(&image).expect("symbols")),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let data = synthetic_image(4096, 1024);
    let image = PeImage::parse(&data).expect("valid image");
    let table = Arc::new(SymbolTable::build(&image).expect("symbols"));
    let resolver = AddressResolver::new(table, image.image_base());

    c.bench_function("resolve-hit-and-miss", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for addr in (0x40_1000u64..0x41_1000).step_by(8) {
                if resolver.resolve(black_box(addr)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
}

fn bench_listing(c: &mut Criterion) {
    let data = synthetic_image(64, 64);
    let config = OutputConfig::default();
    let mut group = c.benchmark_group("listing");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("synthetic-pe32", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(64 * 1024);
            black_box(disassemble_bytes(&data, &config, &mut out).expect("listing"));
            out
        })
    });
    group.finish();
}

criterion_group!(benches, bench_symbol_build, bench_resolve, bench_listing);
criterion_main!(benches);
