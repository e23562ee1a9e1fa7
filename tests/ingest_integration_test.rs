//! End-to-end ingestion tests: channel in, windowed instances out.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use vigil_lib::core::TemplateSpec;
use vigil_lib::ingest::IngestionLoop;
use vigil_lib::metrics::{InstanceStore, TemplateRegistry, TimeWindowedSeries};
use tokio::sync::{mpsc, watch};

fn spec(name: &str, path: &str, period: &str) -> TemplateSpec {
    TemplateSpec {
        name: name.to_string(),
        path: path.to_string(),
        period: period.to_string(),
        constraints: [("above".to_string(), "50".to_string())].into(),
        transformations: vec!["average".to_string()],
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

#[tokio::test]
async fn test_messages_flow_into_windowed_instances() {
    let registry = Arc::new(
        TemplateRegistry::from_specs(&[
            spec("queued.{host}", "stats.*.unicorn.socket_queued", "1h"),
            spec("all_unicorn", "stats.*.unicorn.*", "1h"),
        ])
        .unwrap(),
    );
    let store = Arc::new(InstanceStore::new());
    let ingest = IngestionLoop::new(Arc::clone(&registry), Arc::clone(&store));
    let counters = ingest.counters();

    let (msg_tx, msg_rx) = mpsc::channel(16);
    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { ingest.run(msg_rx, stop_rx).await });

    let now = now_secs();
    msg_tx
        .send(format!(
            "stats.web01.unicorn.socket_queued 42.0 {}\nstats.web01.unicorn.socket_queued 45.0 {}\nnot a metric\n",
            now - 2,
            now - 1,
        ))
        .await
        .unwrap();
    drop(msg_tx);
    worker.await.unwrap();

    // Both templates matched the path: independent instances, no dedup.
    assert_eq!(store.len(), 2);

    let queued = store.find(0, "stats.web01.unicorn.socket_queued").unwrap();
    assert_eq!(queued.name(), "queued.web01");
    assert_eq!(queued.series().len(), 2);

    let all = store.find(1, "stats.web01.unicorn.socket_queued").unwrap();
    assert_eq!(all.name(), "all_unicorn");
    assert_eq!(all.series().len(), 2);

    let obs = queued.observation();
    assert_eq!(obs.constraints.get("above"), Some(&"50".to_string()));
    assert_eq!(obs.transformations, vec!["average".to_string()]);

    let stats = counters.stats();
    assert_eq!(stats.lines_ok, 2);
    assert_eq!(stats.lines_failed, 1);
    assert_eq!(stats.samples_recorded, 4);
    assert_eq!(stats.instances_created, 2);

    let _ = stop_tx;
}

#[tokio::test]
async fn test_ingestion_trims_stale_samples() {
    let registry =
        Arc::new(TemplateRegistry::from_specs(&[spec("queued", "stats.*.queued", "10s")]).unwrap());
    let store = Arc::new(InstanceStore::new());
    let ingest = IngestionLoop::new(Arc::clone(&registry), Arc::clone(&store));

    let now = now_secs();
    // First sample is well outside the 10s window; the trim after the
    // second write must evict it.
    ingest.process_message(&format!("stats.web01.queued 1.0 {}", now - 3600));
    ingest.process_message(&format!("stats.web01.queued 2.0 {}", now));

    let instance = store.find(0, "stats.web01.queued").unwrap();
    let samples = instance.series().snapshot();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples.get(&now), Some(&2.0));
}

#[test]
fn test_concurrent_writers_on_distinct_series_do_not_contend() {
    // Retention wide enough that no sample ages out during the run.
    let a = Arc::new(TimeWindowedSeries::new(Duration::from_secs(100_000)));
    let b = Arc::new(TimeWindowedSeries::new(Duration::from_secs(100_000)));
    let base = now_secs();

    let started = Instant::now();
    let writers: Vec<_> = [Arc::clone(&a), Arc::clone(&b)]
        .into_iter()
        .map(|series| {
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    series.record(base + i, i as f64);
                    series.trim(base + i);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    // Contention-free writers finish comfortably inside a generous bound.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(a.len(), 10_000);
    assert_eq!(b.len(), 10_000);
}

#[test]
fn test_concurrent_first_samples_create_one_instance() {
    let registry =
        Arc::new(TemplateRegistry::from_specs(&[spec("queued", "stats.*.queued", "1h")]).unwrap());
    let store = Arc::new(InstanceStore::new());

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let ingest = IngestionLoop::new(registry, store);
                ingest.process_message(&format!("stats.web01.queued {}.0 1700000000", i));
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(store.len(), 1);
}
