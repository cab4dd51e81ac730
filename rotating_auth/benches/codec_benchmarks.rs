use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rotating_auth::auth::{
    AuthConfig, SessionManager, SessionService,
    codec::{
        decode_refresh_token, encode_refresh_token, generate_refresh_secret,
        hash_refresh_secret, sign_access_token, verify_access_token,
    },
};
use rotating_auth::db::MemorySessionRepository;
use rotating_auth::notify::NotificationHandle;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const SECRET: &str = "benchmark-secret-0123456789abcdefghij";

/// Benchmark signing an HS512 access token
fn bench_sign_access_token(c: &mut Criterion) {
    let owner = Uuid::new_v4();

    c.bench_function("sign_access_token", |b| {
        b.iter(|| sign_access_token(owner, SECRET, Duration::from_secs(900)));
    });
}

/// Benchmark verifying an HS512 access token
fn bench_verify_access_token(c: &mut Criterion) {
    let token = sign_access_token(Uuid::new_v4(), SECRET, Duration::from_secs(900)).unwrap();

    c.bench_function("verify_access_token", |b| {
        b.iter(|| verify_access_token(&token, SECRET));
    });
}

/// Benchmark refresh secret generation, hashing and transport encoding
fn bench_refresh_secret(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh_secret");

    group.bench_function("generate", |b| {
        b.iter(generate_refresh_secret);
    });

    let material = generate_refresh_secret();
    group.bench_function("hash", |b| {
        b.iter(|| hash_refresh_secret(&material.secret));
    });

    let encoded = encode_refresh_token(&material.secret);
    group.bench_function("decode", |b| {
        b.iter(|| decode_refresh_token(&encoded));
    });

    group.finish();
}

/// Benchmark a full refresh against the memory store with N live sessions
fn bench_refresh_rotation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("refresh_rotation");

    for n_sessions in [1usize, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_sessions", n_sessions)),
            n_sessions,
            |b, &n| {
                let manager = SessionManager::new(
                    Arc::new(MemorySessionRepository::new()),
                    &AuthConfig::new(SECRET),
                    NotificationHandle::disabled(),
                );
                for _ in 1..n {
                    rt.block_on(manager.login(Uuid::new_v4(), "Chrome/1", "1.2.3.4"))
                        .unwrap();
                }
                let mut token = rt
                    .block_on(manager.login(Uuid::new_v4(), "Chrome/1", "1.2.3.4"))
                    .unwrap()
                    .refresh_token;

                b.iter(|| {
                    token = rt
                        .block_on(manager.refresh(&token, "Chrome/1", "1.2.3.4"))
                        .unwrap()
                        .refresh_token;
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    codec,
    bench_sign_access_token,
    bench_verify_access_token,
    bench_refresh_secret,
);

criterion_group!(sessions, bench_refresh_rotation);

criterion_main!(codec, sessions);
