//! Submit-to-resolve throughput for a single category.

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};

use dispatch_core::{
    Category, CategoryConfig, HandlerError, JobHandler, Scheduler, SchedulerConfig,
};

struct InstantOk;

#[async_trait::async_trait]
impl JobHandler for InstantOk {
    async fn handle(&self, _: &Value) -> Result<Value, HandlerError> {
        Ok(json!("ok"))
    }
}

fn scheduler(pool_size: usize) -> Scheduler {
    let mut config = SchedulerConfig::default();
    *config.category_mut(Category::CoachChat) = CategoryConfig {
        pool_size,
        pacing_delay: Duration::ZERO,
        max_queue_depth: 10_000,
        max_retries: 0,
        dispatch_timeout: None,
    };
    let s = Scheduler::new(config);
    s.register_handler(Category::CoachChat, Arc::new(InstantOk));
    s
}

fn bench_submit_resolve(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("submit_resolve");

    for &pool_size in &[1usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(pool_size),
            &pool_size,
            |b, &pool_size| {
                b.iter(|| {
                    rt.block_on(async {
                        let s = scheduler(pool_size);
                        let mut tickets = Vec::with_capacity(100);
                        for i in 0..100 {
                            let user = format!("u{i}");
                            tickets.push(
                                s.submit(&user, Category::CoachChat, json!({"n": i}))
                                    .await
                                    .expect("submit"),
                            );
                        }
                        for t in tickets {
                            t.outcome().await.expect("resolve");
                        }
                        s.shutdown().await;
                    });
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_submit_resolve);
criterion_main!(benches);
