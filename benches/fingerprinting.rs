use std::f32::consts::PI;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tempfile::tempdir;

use earmark::EngineConfig;
use earmark::audio::AudioBuffer;
use earmark::fingerprint::{HashRow, fingerprint_buffer};
use earmark::store::{IndexStore, SongRecord};

const CLIP_SECONDS: u32 = 30;

fn sweep_buffer(config: &EngineConfig) -> AudioBuffer {
    let sr = config.sample_rate;
    let total = (CLIP_SECONDS * sr) as usize;
    let rate = 7_700.0 / CLIP_SECONDS as f32;
    let samples = (0..total)
        .map(|i| {
            let t = i as f32 / sr as f32;
            (2.0 * PI * (100.0 * t + 0.5 * rate * t * t)).sin() * 0.6
        })
        .collect();
    AudioBuffer {
        samples,
        sample_rate: sr,
    }
}

fn bench_fingerprint(c: &mut Criterion) {
    let config = EngineConfig::default();
    let buffer = sweep_buffer(&config);
    c.bench_with_input(
        BenchmarkId::new("fingerprint_sweep_s", CLIP_SECONDS),
        &buffer,
        |b, buffer| b.iter(|| black_box(fingerprint_buffer(buffer, &config))),
    );
}

fn bench_lookup(c: &mut Criterion) {
    let config = EngineConfig::default();
    let buffer = sweep_buffer(&config);
    let rows = fingerprint_buffer(&buffer, &config);

    let dir = tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().join("bench.db")).expect("open store");
    let song = SongRecord {
        song_id: "bench-song".into(),
        artist: "Bench".into(),
        album: "Bench".into(),
        title: "Sweep".into(),
    };
    store.store_song(&rows, &song).expect("seed store");

    let query: Vec<HashRow> = rows.iter().copied().take(500).collect();
    c.bench_with_input(
        BenchmarkId::new("lookup_hashes", query.len()),
        &query,
        |b, query| b.iter(|| black_box(store.lookup(query, 5).expect("lookup"))),
    );
}

criterion_group!(benches, bench_fingerprint, bench_lookup);
criterion_main!(benches);
