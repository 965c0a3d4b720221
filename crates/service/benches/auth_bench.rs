use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use service::auth::domain::{LoginInput, RegisterInput};
use service::auth::repository::mock::MockAuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::auth::tokens::TokenIssuer;

fn bench_login(c: &mut Criterion) {
    let repo = Arc::new(MockAuthRepository::default());
    let cfg = AuthConfig { tokens: TokenIssuer::new("bench-secret", 3600, 86400), password_algorithm: "argon2".into() };
    let svc = AuthService::new(repo, cfg);

    // pre-create user outside of the benchmark using a tokio runtime
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(svc.register(RegisterInput {
        name: "Bench".into(),
        email: "bench@example.com".into(),
        password: "Benchmark1".into(),
        ..Default::default()
    }))
    .unwrap();

    c.bench_function("auth_login_verify", |b| {
        b.iter(|| {
            rt.block_on(svc.login(LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into() }))
                .unwrap();
        });
    });

    let session = rt
        .block_on(svc.login(LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into() }))
        .unwrap();
    c.bench_function("auth_authenticate_token", |b| {
        b.iter(|| rt.block_on(svc.authenticate(black_box(&session.access_token))).unwrap());
    });
}

fn bench_rating_average(c: &mut Criterion) {
    let ratings: Vec<i32> = (0..10_000).map(|i| i % 5 + 1).collect();
    c.bench_function("review_average_10k", |b| b.iter(|| models::review::average(black_box(&ratings))));
}

criterion_group!(benches, bench_login, bench_rating_average);
criterion_main!(benches);
