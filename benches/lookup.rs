use abbreve_rs::{BundledDictionary, BundledSource, LookupForm};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::io::{Cursor, Read};
use std::sync::Once;
use zstd::stream::Decoder as ZstdDecoder;

static DATA_BYTES: &[u8] = include_bytes!(env!("ABBREVE_DATA"));

fn ensure_loaded() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        // Force the lazy store open so the query benches only see warm lookups.
        let _ = BundledDictionary::entry("brb");
    });
}

fn bench_cold_load(c: &mut Criterion) {
    c.bench_function("cold_load::decompress_blob", |b| {
        b.iter(|| {
            let mut decoder = ZstdDecoder::new(Cursor::new(DATA_BYTES)).expect("cold-load decoder");
            let mut buf = Vec::new();
            decoder.read_to_end(&mut buf).expect("stream read");
            black_box(buf.len());
        });
    });
}

fn bench_entry_queries(c: &mut Criterion) {
    ensure_loaded();
    const TERMS: &[&str] = &["brb", "idk", "g.o.a.t", "zzz123"];
    for &term in TERMS {
        c.bench_with_input(BenchmarkId::new("entry_lookup", term), &term, |b, &term| {
            b.iter(|| {
                let entry = BundledDictionary::entry(term).map(|entry| entry.to_entry());
                black_box(entry);
            });
        });
    }
}

fn bench_form_submit(c: &mut Criterion) {
    ensure_loaded();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("bench runtime");
    c.bench_function("form_submit::bundled", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut form = LookupForm::new();
                form.edit("IDK");
                black_box(form.submit(&BundledSource).await.label());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_cold_load,
    bench_entry_queries,
    bench_form_submit
);
criterion_main!(benches);
