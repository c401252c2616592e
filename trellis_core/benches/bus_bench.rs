//! Event bus dispatch benchmarks.
//!
//! Measures synchronous publish latency against subscriber counts. Dispatch
//! cost should grow linearly with the number of subscribers for an event.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use trellis_core::prelude::*;

struct Sink;

impl Module for Sink {
    fn init(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
        ctx.subscribe("BENCH_TICK")
    }
    fn handle_event(&mut self, _ctx: &ModuleContext<'_>, event: &str, _data: &EventEnvelope) {
        black_box(event.len());
    }
}

fn booted_manager(subscribers: usize) -> SystemManager {
    let mut factory = ModuleFactory::new();
    factory.register("sink", |_| Ok(Box::new(Sink) as Box<dyn Module>));

    let mut toml_text = String::new();
    for i in 0..subscribers {
        toml_text.push_str(&format!(
            "[[modules]]\ntype = \"sink\"\nconfig = {{ instance_name = \"sink{i}\" }}\n\n"
        ));
    }
    let system = SystemConfig::from_toml(&toml_text).expect("bench config");
    let mut manager = SystemManager::new(factory);
    manager.boot(system).expect("bench boot");
    manager
}

fn bench_publish_signal(c: &mut Criterion) {
    for subscribers in [0usize, 1, 4, 12] {
        let manager = booted_manager(subscribers);
        let ctx = Arc::clone(manager.context());
        c.bench_function(&format!("publish_signal_{subscribers}_subs"), |b| {
            b.iter(|| {
                ctx.publish(EventEnvelope::signal(black_box("BENCH_TICK")));
            });
        });
    }
}

fn bench_publish_payload(c: &mut Criterion) {
    let manager = booted_manager(4);
    let ctx = Arc::clone(manager.context());
    c.bench_function("publish_payload_4_subs", |b| {
        b.iter(|| {
            ctx.publish(EventEnvelope::with_payload(
                black_box("BENCH_TICK"),
                [0u8; 64],
            ));
        });
    });
}

criterion_group!(benches, bench_publish_signal, bench_publish_payload);
criterion_main!(benches);
