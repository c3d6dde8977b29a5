// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for digesting, store sealing, and policy construction
// in the pinvault-trust crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pinvault_core::config::StoreConfig;
use pinvault_core::types::TlsPolicyDescriptor;
use pinvault_trust::{
    Certificate, CertificateDigest, CertificateRepository, Encoding, MemoryResource,
    TrustPolicyBuilder,
};

fn generate_der(name: &str) -> Vec<u8> {
    rcgen::generate_simple_self_signed(vec![name.to_owned()])
        .expect("generate certificate")
        .cert
        .der()
        .to_vec()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark the MD5 alias digest at certificate-like sizes.
fn bench_digest(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[("512 B", 512), ("2 KiB", 2 * 1024), ("8 KiB", 8 * 1024)];

    let mut group = c.benchmark_group("certificate_digest_md5");
    for &(label, size) in sizes {
        let data = vec![0x30u8; size];
        group.bench_function(label, |b| {
            b.iter(|| black_box(CertificateDigest::digest_of(black_box(&data))));
        });
    }
    group.finish();
}

/// Benchmark adding a certificate to a memory-backed store, including the
/// re-seal of the whole container.  A low scrypt work factor keeps the
/// measurement on serialization and I/O rather than key derivation.
fn bench_store_add(c: &mut Criterion) {
    let config = StoreConfig {
        work_factor: Some(10),
        ..StoreConfig::default()
    };
    let cert = Certificate::from_der(&generate_der("bench.test")).expect("parse");

    c.bench_function("store_add_and_seal (memory)", |b| {
        b.iter(|| {
            let mut repo = CertificateRepository::open(MemoryResource::new(), "bench", &config);
            repo.add(black_box(&cert)).expect("add failed");
            black_box(repo);
        });
    });
}

/// Benchmark building a policy from ten base64 certificates with detection.
fn bench_policy_build(c: &mut Criterion) {
    let data: Vec<String> = (0..10)
        .map(|i| Encoding::Base64.encode(&generate_der(&format!("host-{i}.test"))))
        .collect();
    let descriptor = TlsPolicyDescriptor::new("certificate", data);
    let builder = TrustPolicyBuilder::new();

    c.bench_function("policy_build (10 certificates)", |b| {
        b.iter(|| {
            let policy = builder
                .build(black_box(&descriptor))
                .expect("build failed")
                .expect("policy");
            black_box(policy);
        });
    });
}

criterion_group!(benches, bench_digest, bench_store_add, bench_policy_build);
criterion_main!(benches);
