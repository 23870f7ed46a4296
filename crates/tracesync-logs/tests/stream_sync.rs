use std::sync::Arc;
use std::time::Duration;

use tracesync_logs::{
    FilteredView, ProducerConfig, Record, RecordGenerator, SequenceClock, TimeSync, TraceProducer,
    TraceStore, ViewEvent,
};

fn fast_producer() -> TraceProducer {
    TraceProducer::new(ProducerConfig {
        min_jitter: Duration::from_millis(1),
        max_jitter: Duration::from_millis(3),
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_drains_without_loss() {
    let store = TraceStore::new();
    let mut producer = fast_producer();
    producer.start(
        store.sender(),
        RecordGenerator::seeded(Arc::new(SequenceClock::new(0, 1)), 11),
    );

    let mut ticks = tokio::time::interval(Duration::from_millis(10));
    for _ in 0..20 {
        ticks.tick().await;
        store.drain_tick();
    }
    producer.stop();
    // An aborted task may still be finishing its current poll on another worker
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.drain_tick();

    let produced = producer.produced() as usize;
    assert!(produced > 0);
    assert_eq!(store.row_count(), produced);

    let timestamps: Vec<i64> =
        store.with_records(|records, _| records.iter().map(|r| r.timestamp()).collect());
    let expected: Vec<i64> = (0..produced as i64).collect();
    assert_eq!(timestamps, expected);
}

#[tokio::test]
async fn test_views_follow_stream_and_sync() {
    let store = TraceStore::new();
    let mut generator = RecordGenerator::seeded(Arc::new(SequenceClock::new(1_000, 10)), 5);
    for record in generator.backlog(200) {
        store.enqueue(record);
    }
    store.drain_tick();

    let module = generator.modules()[0].clone();
    let sync = TimeSync::new();

    let mut all = FilteredView::new(store.clone());
    all.attach_sync(sync.join());
    let mut narrow = FilteredView::new(store.clone());
    narrow.attach_sync(sync.join());
    narrow
        .set_filter_text(&format!("module eq \"{}\"", module))
        .unwrap();
    narrow.take_events();

    let narrow_rows = narrow.row_count();
    assert!(narrow_rows > 0 && narrow_rows < all.row_count());
    for row in 0..narrow_rows {
        assert_eq!(narrow.record(row).unwrap().module(), module);
    }

    // Stream more records in and check the filtered insert range
    let mut producer = fast_producer();
    producer.start(store.sender(), generator);
    tokio::time::sleep(Duration::from_millis(100)).await;
    producer.stop();
    store.drain_tick();
    narrow.refresh();
    all.refresh();

    let grown = narrow.row_count();
    let events = narrow.take_events();
    if grown > narrow_rows {
        assert_eq!(
            events,
            vec![ViewEvent::Inserted {
                start: narrow_rows,
                end: grown
            }]
        );
    } else {
        assert!(events.is_empty());
    }

    // Selecting a row in one view scrolls the other to the same moment
    let selected = all.select_row(150).unwrap();
    let row = narrow.apply_sync().unwrap();
    let synced = narrow.record(row).unwrap().timestamp();
    assert!(synced <= selected || row == 0);
    if row + 1 < narrow.row_count() {
        assert!(narrow.record(row + 1).unwrap().timestamp() > selected);
    }
}

#[tokio::test]
async fn test_clear_while_streaming() {
    let store = TraceStore::new();
    let mut view = FilteredView::new(store.clone());

    store.enqueue(Record::new("2", "core", 1, "first"));
    store.drain_tick();
    view.refresh();
    assert_eq!(view.take_events(), vec![ViewEvent::Inserted { start: 0, end: 1 }]);

    store.enqueue(Record::new("2", "core", 2, "queued before clear"));
    store.clear();
    store.drain_tick();
    view.refresh();

    assert_eq!(
        view.take_events(),
        vec![
            ViewEvent::Removed { start: 0, end: 1 },
            ViewEvent::Inserted { start: 0, end: 1 },
        ]
    );
    assert_eq!(view.data(0).unwrap(), "[2][core      ] : queued before clear");
}
