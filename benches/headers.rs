//! Benchmarks for header decoding and validation.
//!
//! Measures the three entry points on synthetic inputs:
//! - A clean PE32+ image with a full data-directory table and 16 sections
//! - A buffer truncated in the section table
//! - Random-looking garbage that is rejected early

extern crate pescope;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use pescope::{
    file::io::write_le,
    pe::{self, build_minimal_stub, CoffHeader, SectionHeader},
    validation::{validate_with, ValidationConfig},
};
use std::hint::black_box;

fn put<T: pescope::file::io::PeIO>(out: &mut [u8], offset: usize, value: T) {
    write_le(&mut out[offset..], value).unwrap();
}

/// Stub, AMD64 COFF header, PE32+ optional header with 16 directories and `sections` records
fn image(sections: u16) -> Vec<u8> {
    let mut data = build_minimal_stub(None).unwrap();
    let coff_offset = data.len();

    let coff = CoffHeader {
        machine: 0x8664,
        number_of_sections: sections,
        time_date_stamp: 0,
        pointer_to_symbol_table: 0,
        number_of_symbols: 0,
        size_of_optional_header: 240,
        characteristics: 0x0022,
    };
    data.resize(coff_offset + CoffHeader::SIZE + 240, 0);
    coff.write(&mut data, coff_offset).unwrap();

    let optional = &mut data[coff_offset + CoffHeader::SIZE..];
    put(optional, 0, 0x20B_u16);
    put(optional, 24, 0x1_4000_0000_u64);
    put(optional, 32, 0x1000_u32);
    put(optional, 36, 0x200_u32);
    put(optional, 56, 0x1000_u32 * (u32::from(sections) + 1));
    put(optional, 60, 0x400_u32);
    put(optional, 108, 16_u32);

    for index in 0..sections {
        let record = SectionHeader {
            name: *b".sect\0\0\0",
            virtual_size: 0x1000,
            virtual_address: 0x1000 * (u32::from(index) + 1),
            size_of_raw_data: 0x200,
            pointer_to_raw_data: 0x400 + 0x200 * u32::from(index),
            pointer_to_relocations: 0,
            pointer_to_linenumbers: 0,
            number_of_relocations: 0,
            number_of_linenumbers: 0,
            characteristics: 0x4000_0040,
        };
        let offset = data.len();
        data.resize(offset + SectionHeader::SIZE, 0);
        record.write(&mut data, offset).unwrap();
    }

    data
}

fn bench_decode(c: &mut Criterion) {
    let data = image(16);
    let truncated = &data[..data.len() - 20];

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("complete", |b| {
        b.iter(|| black_box(pe::decode(black_box(&data))));
    });
    group.bench_function("truncated", |b| {
        b.iter(|| black_box(pe::decode(black_box(truncated))));
    });
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let headers = pe::decode(&image(16));
    let comprehensive = ValidationConfig::comprehensive();
    let minimal = ValidationConfig::minimal();

    c.bench_function("validate_comprehensive", |b| {
        b.iter(|| black_box(validate_with(black_box(&headers), &comprehensive)));
    });
    c.bench_function("validate_minimal", |b| {
        b.iter(|| black_box(validate_with(black_box(&headers), &minimal)));
    });
}

fn bench_inspect(c: &mut Criterion) {
    let data = image(96);
    let garbage: Vec<u8> = (0..4096_u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8).collect();

    c.bench_function("inspect_96_sections", |b| {
        b.iter(|| black_box(pe::inspect(black_box(&data))));
    });
    c.bench_function("inspect_garbage", |b| {
        b.iter(|| black_box(pe::inspect(black_box(&garbage))));
    });
}

criterion_group!(benches, bench_decode, bench_validate, bench_inspect);
criterion_main!(benches);
