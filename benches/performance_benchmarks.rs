use chrono::{DateTime, Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use xd_reserve::middleware::{RateLimitConfig, RateLimiter};
use xd_reserve::modules::reservation::models::{CreateReservationRequest, RequestContext};
use xd_reserve::modules::reservation::ReservationStore;

fn reservation_request(index: u64) -> CreateReservationRequest {
    serde_json::from_value(json!({
        "phone": format!("138{:08}", index % 100_000_000),
        "nickname": "小明",
        "gender": if index % 2 == 0 { "male" } else { "female" },
        "age": "23-28",
        "plan": "yearly"
    }))
    .unwrap()
}

/// 每次创建使用不同的毫秒，编号不会相互冲突
fn created_at(start: DateTime<Utc>, index: u64) -> DateTime<Utc> {
    start + Duration::milliseconds(index as i64)
}

fn benchmark_store_operations(c: &mut Criterion) {
    c.bench_function("create_reservation", |b| {
        let store = ReservationStore::new();
        let start = Utc::now();
        let mut index = 0u64;
        b.iter(|| {
            index += 1;
            let _ = store.create_at(
                black_box(&reservation_request(index)),
                RequestContext::default(),
                created_at(start, index),
            );
        })
    });

    let store = ReservationStore::new();
    let start = Utc::now();
    for index in 0..10_000 {
        let _ = store.create_at(
            &reservation_request(index),
            RequestContext::default(),
            created_at(start, index),
        );
    }

    c.bench_function("compute_stats_10k", |b| {
        b.iter(|| black_box(store.compute_stats()))
    });

    let number = store
        .compute_stats()
        .recent_reservations
        .first()
        .map(|r| r.reservation_number.clone())
        .unwrap();
    c.bench_function("find_by_number_10k", |b| {
        b.iter(|| black_box(store.find_by_number(black_box(&number))))
    });
}

fn benchmark_concurrent_creates(c: &mut Criterion) {
    for thread_count in [2u64, 4, 8].iter() {
        c.bench_function(&format!("concurrent_create_{}_threads", thread_count), |b| {
            b.iter(|| {
                let store = Arc::new(ReservationStore::new());
                let start = Utc::now();
                let handles: Vec<_> = (0..*thread_count)
                    .map(|t| {
                        let store = Arc::clone(&store);
                        thread::spawn(move || {
                            for j in 0..100 {
                                let index = t * 1_000 + j;
                                let _ = store.create_at(
                                    &reservation_request(index),
                                    RequestContext::default(),
                                    created_at(start, index),
                                );
                            }
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.join().unwrap();
                }
            })
        });
    }
}

fn benchmark_rate_limiter(c: &mut Criterion) {
    let limiter = RateLimiter::new(RateLimitConfig {
        max_requests: u32::MAX,
        ..RateLimitConfig::default()
    });

    c.bench_function("rate_limit_check", |b| {
        let mut index = 0u32;
        b.iter(|| {
            index = index.wrapping_add(1);
            let ip = format!("10.0.{}.{}", (index >> 8) & 0x0f, index & 0xff);
            black_box(limiter.check_rate_limit(&ip))
        })
    });
}

criterion_group!(
    benches,
    benchmark_store_operations,
    benchmark_concurrent_creates,
    benchmark_rate_limiter
);
criterion_main!(benches);
