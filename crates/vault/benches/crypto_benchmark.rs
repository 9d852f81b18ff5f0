use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maskvault_keys::KeyMaterial;
use maskvault_vault::{aead_decrypt, aead_encrypt, lookup_key};
use std::time::Duration;

fn bench_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_generation");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("random_key", |b| {
        b.iter(|| black_box(KeyMaterial::random()));
    });
    group.finish();
}

fn bench_lookup_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_key");
    let master = [9u8; 32];
    group.bench_function("forward", |b| {
        b.iter(|| black_box(lookup_key(&master, "email", 0x00, "john.doe@example.com").unwrap()));
    });
    group.finish();
}

fn bench_aead_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("aead_operations");
    group.measurement_time(Duration::from_secs(10));

    let key = KeyMaterial::random();
    let ad = b"email\x1ffwd-key";
    let data_sizes = [16, 256, 1024, 8192, 65536];

    for &size in &data_sizes {
        let plaintext = vec![0u8; size];

        group.bench_with_input(BenchmarkId::new("encrypt", size), &plaintext, |b, plaintext| {
            b.iter(|| black_box(aead_encrypt(&key, plaintext, ad).unwrap()));
        });

        let (nonce, ciphertext) = aead_encrypt(&key, &plaintext, ad).unwrap();

        group.bench_with_input(BenchmarkId::new("decrypt", size), &(&nonce, &ciphertext), |b, (nonce, ciphertext)| {
            b.iter(|| black_box(aead_decrypt(&key, nonce, ciphertext, ad).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_key_generation, bench_lookup_key, bench_aead_operations);
criterion_main!(benches);
