use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Duration, Timelike, Utc};

use asset_tracker::config::TrackerConfig;
use asset_tracker::declination::FixedDeclination;
use asset_tracker::error::Error;
use asset_tracker::event::IngestEvent;
use asset_tracker::service::{FixQuery, Tracker};
use asset_tracker::store::MemoryStore;

fn tracker(page_size: usize) -> Tracker<MemoryStore> {
    Tracker::new(
        MemoryStore::with_page_size(page_size),
        Arc::new(FixedDeclination(13.0)),
        TrackerConfig::default(),
    )
    .unwrap()
}

/// Event timestamps relative to the test run so they sit inside the default
/// trailing query window.
fn stamp(minute: i64) -> DateTime<Utc> {
    static BASE: OnceLock<DateTime<Utc>> = OnceLock::new();
    let base = *BASE
        .get_or_init(|| (Utc::now() - Duration::hours(2)).with_nanosecond(0).unwrap());
    base + Duration::minutes(minute)
}

fn event(minute: i64, lat_dm: &str, speed: f64) -> IngestEvent {
    IngestEvent {
        event: "fix".to_string(),
        coreid: "boat-1".to_string(),
        published_at: stamp(minute).to_rfc3339(),
        data: format!(
            "N,{},W,12213.2683,{:.1},54,1,120,-3,2,18.5,12.6,5.1",
            lat_dm, speed
        ),
    }
}

/// A short voyage: parked, five legs of ~55 m (0.03 minutes of latitude)
/// each, parked again.
fn voyage() -> Vec<IngestEvent> {
    let lat = |hundredths: i64| format!("3743.{:04}", hundredths);
    vec![
        event(0, &lat(0), 0.0),
        event(1, &lat(0), 0.0),
        event(2, &lat(300), 4.0),
        event(3, &lat(600), 4.0),
        event(4, &lat(900), 4.0),
        event(5, &lat(1200), 4.0),
        event(6, &lat(1500), 4.0),
        event(7, &lat(1500), 0.0),
        event(8, &lat(1500), 0.0),
    ]
}

#[tokio::test]
async fn test_full_pipeline_fixes_and_trips() {
    let tracker = tracker(100);
    for e in voyage() {
        tracker.ingest(e).await.unwrap();
    }

    let fixes = tracker
        .get_fixes("boat-1", &FixQuery::default())
        .await
        .unwrap();
    assert_eq!(fixes.count, 9);
    assert_eq!(fixes.items.len(), 9);

    // Normalization applied throughout: DM decoded, declination folded in.
    let first = &fixes.items[0];
    assert_eq!(first.latitude, 37.7166667);
    assert_eq!(first.longitude, -122.2211383);
    assert_eq!(first.heading.mag, 120);
    assert_eq!(first.heading.r#true, 133);

    // Ascending time order.
    for pair in fixes.items.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }

    let bounds = fixes.bounds.unwrap();
    assert!(bounds.min_lat < bounds.max_lat);
    assert!(fixes.distance > 0.0);

    let trips = tracker
        .get_trips("boat-1", &FixQuery::default())
        .await
        .unwrap();
    assert_eq!(trips.len(), 1);
    // Five moving fixes plus the closing boundary fix.
    assert_eq!(trips[0].num_fixes, 6);
    assert_eq!(trips[0].start, fixes.items[2].timestamp);
    assert_eq!(trips[0].end, fixes.items[7].timestamp);
    // Four ~55 m legs between the five moving fixes; the closing leg to the
    // stationary boundary fix adds nothing.
    assert!((trips[0].distance - 4.0 * 55.56).abs() < 5.0);
}

#[tokio::test]
async fn test_pipeline_invariant_to_page_chunking() {
    let one_page = tracker(100);
    let five_pages = tracker(2);
    for e in voyage() {
        one_page.ingest(e.clone()).await.unwrap();
        five_pages.ingest(e).await.unwrap();
    }

    let a = one_page
        .get_fixes("boat-1", &FixQuery::default())
        .await
        .unwrap();
    let b = five_pages
        .get_fixes("boat-1", &FixQuery::default())
        .await
        .unwrap();

    assert_eq!(a.count, b.count);
    assert_eq!(a.distance, b.distance);
    assert_eq!(a.bounds, b.bounds);
    let stamps = |items: &[asset_tracker::normalizer::Fix]| {
        items.iter().map(|f| f.timestamp).collect::<Vec<_>>()
    };
    assert_eq!(stamps(&a.items), stamps(&b.items));

    let trips_a = one_page
        .get_trips("boat-1", &FixQuery::default())
        .await
        .unwrap();
    let trips_b = five_pages
        .get_trips("boat-1", &FixQuery::default())
        .await
        .unwrap();
    assert_eq!(trips_a, trips_b);
}

#[tokio::test]
async fn test_empty_window_yields_no_bounds() {
    let tracker = tracker(100);
    for e in voyage() {
        tracker.ingest(e).await.unwrap();
    }

    // A window before any data.
    let result = tracker
        .get_fixes(
            "boat-1",
            &FixQuery {
                since: Some(stamp(-120)),
                before: Some(stamp(-60)),
                latest_only: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(result.count, 0);
    assert!(result.items.is_empty());
    assert!(result.bounds.is_none());
    assert_eq!(result.distance, 0.0);
}

#[tokio::test]
async fn test_latest_fix_freshness() {
    let tracker = tracker(100);
    for e in voyage() {
        tracker.ingest(e).await.unwrap();
    }
    // Voyage events are about two hours old: outside the 19-minute window.
    assert!(matches!(
        tracker.get_latest_fix("boat-1").await,
        Err(Error::NotFound(_))
    ));

    // A fresh fix updates the pointer.
    let fresh = IngestEvent {
        event: "fix".to_string(),
        coreid: "boat-1".to_string(),
        published_at: Utc::now().to_rfc3339(),
        data: "N,3743.2500,W,12213.2683,0.0,54,1,120,-3,2,18.5,12.6,5.1".to_string(),
    };
    tracker.ingest(fresh).await.unwrap();

    let latest = tracker.get_latest_fix("boat-1").await.unwrap();
    assert_eq!(latest.last.latitude, 37.7208333);
}

#[tokio::test]
async fn test_rejected_events_do_not_pollute_the_log() {
    let tracker = tracker(100);
    tracker.ingest(event(0, "3743.0000", 0.0)).await.unwrap();

    let mut bad = event(1, "3743.0300", 0.0);
    bad.data = "N,3743.0300,W".to_string();
    assert!(matches!(
        tracker.ingest(bad).await,
        Err(Error::Validation(_))
    ));

    let mut wrong_type = event(2, "3743.0600", 0.0);
    wrong_type.event = "diagnostic".to_string();
    assert!(matches!(
        tracker.ingest(wrong_type).await,
        Err(Error::UnknownEventType(_))
    ));

    // A hemisphere letter outside NSEW survives the casts but not the
    // position decode; it must be turned away, not stored.
    let mut bad_direction = event(3, "3743.0900", 0.0);
    bad_direction.data = "Q,3743.0900,W,12213.2683,0.0,54,1,120,-3,2,18.5,12.6,5.1".to_string();
    assert!(matches!(
        tracker.ingest(bad_direction).await,
        Err(Error::MissingLocation(_))
    ));

    let fixes = tracker
        .get_fixes("boat-1", &FixQuery::default())
        .await
        .unwrap();
    assert_eq!(fixes.count, 1);
}
