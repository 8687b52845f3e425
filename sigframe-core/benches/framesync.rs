use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use num_complex::Complex32;
use sigframe_core::{
    CrcScheme, FecScheme, FlexFrameGenerator, FlexFrameSync, FrameGenerator, FrameProperties, GmskFrameGenerator,
    GmskFrameSync, ModulationScheme, OfdmFrameGenerator, OfdmFrameSync, OfdmParams,
};

const FRAMES: usize = 8;

fn props() -> FrameProperties {
    FrameProperties {
        crc: CrcScheme::Crc32,
        fec0: FecScheme::ConvV27,
        fec1: FecScheme::None,
        modulation: ModulationScheme::Psk4,
    }
}

fn stream<G: FrameGenerator>(generator: &mut G) -> Vec<Complex32> {
    let mut samples = Vec::new();
    for i in 0..FRAMES {
        generator.assemble(&[i as u8; 8], &[0x5a; 128]).unwrap();
        samples.extend(generator.generate());
        samples.extend(vec![Complex32::new(0.0, 0.0); 64]);
    }
    samples
}

fn bench_flexframe(c: &mut Criterion) {
    let mut group = c.benchmark_group("framesync");
    let samples = stream(&mut FlexFrameGenerator::new(props()).unwrap());
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("flexframe", |b| {
        b.iter(|| {
            let mut count = 0usize;
            let mut sync = FlexFrameSync::flexframe(|_: &sigframe_core::ReceivedFrame<'_>| count += 1).unwrap();
            for chunk in black_box(&samples).chunks(1024) {
                sync.execute(chunk);
            }
            drop(sync);
            assert_eq!(count, FRAMES);
        });
    });
    group.finish();
}

fn bench_gmsk(c: &mut Criterion) {
    let mut group = c.benchmark_group("framesync");
    let samples = stream(&mut GmskFrameGenerator::new(props()).unwrap());
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("gmsk", |b| {
        b.iter(|| {
            let mut sync = GmskFrameSync::gmsk(sigframe_core::FrameCollector::default()).unwrap();
            sync.execute(black_box(&samples));
            black_box(sync.counters().payload_valid);
        });
    });
    group.finish();
}

fn bench_ofdm(c: &mut Criterion) {
    let mut group = c.benchmark_group("framesync");
    let params = OfdmParams::default();
    let samples = stream(&mut OfdmFrameGenerator::new(params.clone(), props()).unwrap());
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("ofdm", |b| {
        b.iter(|| {
            let mut sync = OfdmFrameSync::ofdm(&params, sigframe_core::FrameCollector::default()).unwrap();
            sync.execute(black_box(&samples));
            black_box(sync.counters().payload_valid);
        });
    });
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let mut generator = FlexFrameGenerator::new(props()).unwrap();
    let payload = vec![0x5a; 128];
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("flexframe", |b| {
        b.iter(|| {
            generator.assemble(&[0; 8], black_box(&payload)).unwrap();
            black_box(generator.frame_len());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_flexframe, bench_gmsk, bench_ofdm, bench_generate);
criterion_main!(benches);
