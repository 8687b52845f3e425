use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sigframe_core::{CrcScheme, FecScheme, Packetizer, PacketizerConfig};

const SCHEMES: [(FecScheme, FecScheme); 5] = [
    (FecScheme::None, FecScheme::None),
    (FecScheme::Hamming74, FecScheme::None),
    (FecScheme::Golay2412, FecScheme::None),
    (FecScheme::ConvV27, FecScheme::None),
    (FecScheme::ConvV29, FecScheme::Hamming84),
];

fn label(inner: FecScheme, outer: FecScheme) -> String {
    format!("{inner}+{outer}")
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let msg = vec![0x42u8; 256];

    for (inner, outer) in SCHEMES {
        let mut packetizer = Packetizer::new(PacketizerConfig::new(msg.len(), CrcScheme::Crc32, inner, outer)).unwrap();
        let mut out = vec![0u8; packetizer.encoded_len()];

        group.throughput(Throughput::Bytes(msg.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label(inner, outer)), &msg, |b, msg| {
            b.iter(|| packetizer.encode_into(black_box(msg), &mut out).unwrap());
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let msg = vec![0x42u8; 256];

    for (inner, outer) in SCHEMES {
        let mut packetizer = Packetizer::new(PacketizerConfig::new(msg.len(), CrcScheme::Crc32, inner, outer)).unwrap();
        let encoded = packetizer.encode(&msg).unwrap();
        let mut out = vec![0u8; msg.len()];

        group.throughput(Throughput::Bytes(msg.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label(inner, outer)), &encoded, |b, encoded| {
            b.iter(|| packetizer.decode_into(black_box(encoded), &mut out).unwrap());
        });
    }

    group.finish();
}

fn bench_decode_soft(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_soft");
    let msg = vec![0x42u8; 256];

    for (inner, outer) in SCHEMES {
        let mut packetizer = Packetizer::new(PacketizerConfig::new(msg.len(), CrcScheme::Crc32, inner, outer)).unwrap();
        let encoded = packetizer.encode(&msg).unwrap();
        let soft: Vec<u8> = encoded
            .iter()
            .flat_map(|b| (0..8).rev().map(move |i| if (b >> i) & 1 == 1 { 200 } else { 55 }))
            .collect();
        let mut out = vec![0u8; msg.len()];

        group.throughput(Throughput::Bytes(msg.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label(inner, outer)), &soft, |b, soft| {
            b.iter(|| packetizer.decode_soft_into(black_box(soft), &mut out).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_decode_soft);
criterion_main!(benches);
