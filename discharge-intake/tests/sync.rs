use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use discharge_core::PipelineConfig;
use discharge_intake::seed::{seed_admissions, seed_facilities};
use discharge_intake::{
    AdmissionSource, FetchError, JsonFileSource, RefreshOutcome, SnapshotCache, StaticSource,
    WithDeadline,
};
use serde_json::{json, Value};

fn cache() -> SnapshotCache {
    SnapshotCache::new(PipelineConfig::default(), seed_facilities())
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap()
}

struct SlowSource {
    delay: Duration,
    inner: StaticSource,
}

impl AdmissionSource for SlowSource {
    fn fetch(&self) -> Result<Value, FetchError> {
        thread::sleep(self.delay);
        self.inner.fetch()
    }

    fn describe(&self) -> String {
        "slow source".to_string()
    }
}

fn healthy_source() -> StaticSource {
    let anchor = at(0).date_naive();
    StaticSource::new(seed_admissions(12, anchor))
}

#[test]
fn successful_refresh_replaces_snapshot() {
    let mut cache = cache();
    assert!(cache.snapshot().is_none());

    let outcome = cache.refresh(&healthy_source(), at(8));
    assert_eq!(
        outcome,
        RefreshOutcome::Updated {
            records: 12,
            skipped: 0
        }
    );
    let snapshot = cache.snapshot().expect("đã có snapshot");
    assert_eq!(snapshot.records.len(), 12);
    assert_eq!(snapshot.metrics.totals.admissions, 12);
    assert_eq!(cache.last_successful_sync(), Some(at(8)));
    assert!(!cache.has_error());
    assert!(cache.stale_message().is_none());
}

#[test]
fn failed_fetch_keeps_previous_snapshot() {
    let mut cache = cache();
    cache.refresh(&healthy_source(), at(8));
    let before = Arc::clone(cache.snapshot().expect("đã có snapshot"));

    let outcome = cache.refresh(&StaticSource::unavailable("EHR gateway returned 503"), at(9));
    let message = match outcome {
        RefreshOutcome::Stale { message } => message,
        other => panic!("phải giữ dữ liệu cũ, nhận {other:?}"),
    };
    assert_eq!(
        message,
        "sync failed, showing last known data as of 2026-10-19T08:00:00+00:00"
    );

    let after = cache.snapshot().expect("snapshot vẫn còn");
    assert!(Arc::ptr_eq(&before, after));
    assert!(cache.has_error());
    let failure = cache.last_error().expect("có lỗi đồng bộ");
    assert!(failure.error.contains("503"));
    assert_eq!(failure.failed_at, at(9));
    assert_eq!(cache.last_successful_sync(), Some(at(8)));
}

#[test]
fn timeouts_and_bad_payloads_fail_closed() {
    let mut cache = cache();
    cache.refresh(&healthy_source(), at(8));
    let before = Arc::clone(cache.snapshot().expect("đã có snapshot"));

    let timeout = StaticSource::timing_out(Duration::from_secs(30));
    assert!(matches!(
        cache.refresh(&timeout, at(9)),
        RefreshOutcome::Stale { .. }
    ));
    assert!(Arc::ptr_eq(&before, cache.snapshot().expect("snapshot vẫn còn")));

    let wrong_shape = StaticSource::new(json!({ "error": "maintenance" }));
    assert!(matches!(
        cache.refresh(&wrong_shape, at(10)),
        RefreshOutcome::Stale { .. }
    ));
    assert!(Arc::ptr_eq(&before, cache.snapshot().expect("snapshot vẫn còn")));
}

#[test]
fn recovery_clears_the_error_flag() {
    let mut cache = cache();
    cache.refresh(&StaticSource::unavailable("offline"), at(7));
    assert_eq!(
        cache.stale_message().as_deref(),
        Some("sync failed, no data has been loaded yet")
    );

    cache.refresh(&healthy_source(), at(8));
    assert!(!cache.has_error());
    assert_eq!(cache.last_successful_sync(), Some(at(8)));
}

#[test]
fn newer_refresh_supersedes_one_in_flight() {
    let mut cache = cache();
    let source = healthy_source();

    let first = cache.begin_refresh();
    let second = cache.begin_refresh();

    assert_eq!(
        cache.complete(first, source.fetch(), at(8)),
        RefreshOutcome::Superseded
    );
    assert!(cache.snapshot().is_none());

    assert!(matches!(
        cache.complete(second, source.fetch(), at(9)),
        RefreshOutcome::Updated { .. }
    ));
    assert_eq!(cache.last_successful_sync(), Some(at(9)));

    let late_failure = cache.begin_refresh();
    let _ = cache.begin_refresh();
    assert_eq!(
        cache.complete(
            late_failure,
            Err(FetchError::Unavailable("late".to_string())),
            at(10)
        ),
        RefreshOutcome::Superseded
    );
    assert!(!cache.has_error());
}

#[test]
fn file_source_reports_io_and_parse_errors() {
    let missing = JsonFileSource::new("/nonexistent/admissions.json");
    assert!(matches!(missing.fetch(), Err(FetchError::Io(_))));

    let fixture = JsonFileSource::new(format!(
        "{}/tests/data/admissions_batch.json",
        env!("CARGO_MANIFEST_DIR")
    ));
    let payload = fixture.fetch().expect("đọc được file mẫu");
    assert_eq!(payload.as_array().map(Vec::len), Some(6));

    let generous = WithDeadline::new(fixture, Duration::from_secs(60));
    assert!(generous.fetch().is_ok());
    assert!(generous.describe().contains("admissions_batch.json"));
}

#[test]
fn late_reply_is_dropped_as_timeout() {
    let slow = WithDeadline::new(
        SlowSource {
            delay: Duration::from_millis(50),
            inner: healthy_source(),
        },
        Duration::from_millis(5),
    );
    assert!(matches!(
        slow.fetch(),
        Err(FetchError::Timeout(limit)) if limit == Duration::from_millis(5)
    ));

    let mut cache = cache();
    cache.refresh(&healthy_source(), at(8));
    let before = Arc::clone(cache.snapshot().expect("đã có snapshot"));

    assert!(matches!(
        cache.refresh(&slow, at(9)),
        RefreshOutcome::Stale { .. }
    ));
    assert!(Arc::ptr_eq(&before, cache.snapshot().expect("snapshot vẫn còn")));
    assert_eq!(cache.last_successful_sync(), Some(at(8)));
}

#[test]
fn oversized_stay_in_payload_does_not_abort_refresh() {
    let mut cache = cache();
    let source = StaticSource::new(json!([{
        "id": "adm-long",
        "patientName": "Long Stay",
        "admissionDate": "2026-10-01",
        "predictedLOS": 1e12,
    }]));

    assert_eq!(
        cache.refresh(&source, at(8)),
        RefreshOutcome::Updated {
            records: 1,
            skipped: 0
        }
    );
    let snapshot = cache.snapshot().expect("đã có snapshot");
    assert_eq!(snapshot.records[0].predicted_los, 365);
}
