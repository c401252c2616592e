//! Races against the shared tables from multiple threads.

use std::any::Any;
use std::sync::{Arc, Barrier, Weak};
use std::thread;
use trellis_core::prelude::*;
use trellis_core::resource::ResourceManager;
use trellis_core::service::ServiceLocator;

#[test]
fn exactly_one_winner_for_a_contested_resource() {
    let rm = Arc::new(ResourceManager::new());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let rm = Arc::clone(&rm);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                rm.lock(ResourceKind::SpiBus, 1, &format!("worker{i}")).is_ok()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
    assert!(rm.is_locked(ResourceKind::SpiBus, 1));
    assert_eq!(rm.claim_count(), 1);
}

#[test]
fn exactly_one_winner_for_a_contested_service_name() {
    let locator = Arc::new(ServiceLocator::new());
    let barrier = Arc::new(Barrier::new(8));
    let api = Arc::new(0u32);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let locator = Arc::clone(&locator);
            let barrier = Arc::clone(&barrier);
            let weak: Weak<u32> = Arc::downgrade(&api);
            let handle: Weak<dyn Any + Send + Sync> = weak;
            thread::spawn(move || {
                barrier.wait();
                locator
                    .register("shared", ServiceType::Custom, handle, &format!("owner{i}"))
                    .is_ok()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
    assert_eq!(locator.len(), 1);
}

#[test]
fn concurrent_publishes_deliver_and_release_every_envelope() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        hits: Arc<AtomicUsize>,
    }
    impl Module for Counter {
        fn init(&mut self, ctx: &ModuleContext<'_>) -> Result<(), CoreError> {
            ctx.subscribe("TICK")
        }
        fn handle_event(&mut self, _ctx: &ModuleContext<'_>, _event: &str, _data: &EventEnvelope) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let mut factory = ModuleFactory::new();
    {
        let hits = Arc::clone(&hits);
        factory.register("counter", move |_| {
            Ok(Box::new(Counter { hits: Arc::clone(&hits) }) as Box<dyn Module>)
        });
    }

    let mut manager = SystemManager::new(factory);
    let system = SystemConfig::from_toml(
        r#"
        [[modules]]
        type = "counter"
        config = { instance_name = "c0" }
        "#,
    )
    .unwrap();
    manager.boot(system).unwrap();

    let released = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(4));
    let publishes_per_thread = 100;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(manager.context());
            let barrier = Arc::clone(&barrier);
            let released = Arc::clone(&released);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..publishes_per_thread {
                    let released = Arc::clone(&released);
                    ctx.publish(EventEnvelope::with_release("TICK", 0u8, move |_| {
                        released.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    }));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // Every envelope is released exactly once, and every publish reaches
    // the subscriber: a racing publisher waits for a busy instance instead
    // of dropping the delivery.
    assert_eq!(released.load(std::sync::atomic::Ordering::SeqCst), 4 * publishes_per_thread);
    assert_eq!(hits.load(Ordering::SeqCst), 4 * publishes_per_thread);
}
