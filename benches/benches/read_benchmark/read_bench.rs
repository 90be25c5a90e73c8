//! Бенчмарки горячего пути чтения: распаковка 24-битных выборок и
//! демультиплексирование групп блоков.

use std::hint::black_box;
use std::io::Cursor;

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use lcheapo_core::{
    decode_payload, demux_window, LcheapoReader, LcheapoWriter, BLOCK_PAYLOAD_SIZE,
    SAMPLES_PER_BLOCK,
};
use lcheapo_types::{add_seconds, DiskHeader, TimeSpec};

/// Детерминированный буфер из `groups` групп по `channels` каналов.
fn make_raw_file(
    groups: u64,
    channels: u16,
) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let header = DiskHeader {
        channel_count: channels,
        nominal_sample_rate: 200,
        real_sample_rate: 200.0,
        data_start_block: 1,
        description: "bench".to_string(),
    };
    let mut writer = LcheapoWriter::new(Cursor::new(Vec::new()), header).unwrap();
    let start = Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap();
    let block_len_s = SAMPLES_PER_BLOCK as f64 / 200.0;

    for g in 0..groups {
        let time = add_seconds(start, g as f64 * block_len_s);
        let chans: Vec<Vec<i32>> = (0..channels)
            .map(|_| {
                (0..SAMPLES_PER_BLOCK)
                    .map(|_| rng.gen_range(-(1 << 23)..(1 << 23)))
                    .collect()
            })
            .collect();
        writer.write_group(time, &chans).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

fn bench_decode_payload(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let payload: Vec<u8> = (0..BLOCK_PAYLOAD_SIZE).map(|_| rng.gen()).collect();

    c.bench_function("decode_payload_166", |b| {
        b.iter(|| decode_payload(black_box(&payload)).unwrap())
    });
}

fn bench_demux_window(c: &mut Criterion) {
    // Минута 4-канальных данных: ~72 группы
    let raw = make_raw_file(72, 4);
    let data = &raw[512..]; // пропускаем заголовок диска

    c.bench_function("demux_window_4ch_1min", |b| {
        b.iter(|| demux_window(black_box(data), 4, 200.0, 0.1).unwrap())
    });
}

fn bench_read_window(c: &mut Criterion) {
    let raw = make_raw_file(720, 4); // ~10 минут

    c.bench_function("read_window_4ch_10min", |b| {
        b.iter(|| {
            let mut reader = LcheapoReader::new(Cursor::new(raw.clone())).unwrap();
            reader
                .read_window(TimeSpec::Offset(0.0), TimeSpec::Offset(600.0))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_decode_payload,
    bench_demux_window,
    bench_read_window
);
criterion_main!(benches);
