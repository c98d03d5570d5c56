//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a scripted review feed and run the
//! full crawl cycle end-to-end, down to the chunk files on disk.

use chrono::{NaiveDate, TimeZone, Utc};
use review_crawler::config::Config;
use review_crawler::crawler::Coordinator;
use review_crawler::output::{ChunkStore, DirectoryStore, WriteError, WriteResult};
use review_crawler::{
    AppId, CancelFlag, CrawlErrorKind, CrawlPhase, CrawlRequest, CrawlStatus, DateRange, Review,
    StopReason,
};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const APP: u32 = 730;

/// 2021-02-01T00:00:00Z
const FEB_FIRST: i64 = 1_612_137_600;

/// Seconds between consecutive reviews in the scripted feed
const STEP: i64 = 17_920;

fn app_id() -> AppId {
    AppId::new(APP).unwrap()
}

fn january() -> DateRange {
    DateRange::from_dates(
        Some(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()),
        Some(NaiveDate::from_ymd_opt(2021, 1, 31).unwrap()),
    )
    .unwrap()
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &Path, chunk_size: usize) -> Config {
    let mut config = Config::default();
    config.api.endpoint = server.uri();
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.output.directory = dir.to_string_lossy().into_owned();
    config.output.chunk_size = chunk_size;
    config.api.app_details = false;
    config
}

/// One raw review entry as the API serves it
fn raw_review(n: usize, submitted: i64) -> Value {
    json!({
        "recommendationid": n.to_string(),
        "author": {
            "steamid": format!("7656119{:010}", n),
            "num_games_owned": 12,
            "playtime_at_review": 300 + n
        },
        "language": "english",
        "review": format!("review number {}", n),
        "timestamp_created": submitted,
        "timestamp_updated": submitted + 60,
        "voted_up": n % 3 != 0,
        "votes_up": n % 7,
        "votes_funny": 0,
        "weighted_vote_score": if n % 2 == 0 { json!(0) } else { json!("0.523809552192687988") },
        "comment_count": 0,
        "steam_purchase": true,
        "received_for_free": false,
        "written_during_early_access": false
    })
}

/// Reviews `range` of the descending feed, 17920s apart from 2021-02-01
fn feed(range: std::ops::Range<usize>) -> Vec<Value> {
    range
        .map(|n| raw_review(n, FEB_FIRST - n as i64 * STEP))
        .collect()
}

fn page_body(cursor: &str, reviews: Vec<Value>) -> Value {
    json!({
        "success": 1,
        "cursor": cursor,
        "query_summary": {"num_reviews": reviews.len()},
        "reviews": reviews
    })
}

/// Mounts one page served in answer to `cursor`
async fn mount_page(
    server: &MockServer,
    cursor: &str,
    next: &str,
    reviews: Vec<Value>,
    expected_calls: Option<u64>,
) {
    let mock = Mock::given(method("GET"))
        .and(path(format!("/appreviews/{}", APP)))
        .and(query_param("cursor", cursor))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(next, reviews)));
    match expected_calls {
        Some(n) => mock.expect(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

/// Chunk files in `dir`, sorted by chunk index
fn chunk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<(u32, PathBuf)> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            let index = name
                .strip_prefix(&format!("reviews_{}_", APP))?
                .strip_suffix(".json")?
                .parse()
                .ok()?;
            Some((index, p))
        })
        .collect();
    files.sort();
    files.into_iter().map(|(_, p)| p).collect()
}

fn read_chunk(path: &Path) -> Vec<Review> {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn leftover_temp_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().to_string_lossy().ends_with(".tmp"))
        .count()
}

#[tokio::test]
async fn test_january_scenario() {
    let server = MockServer::start().await;
    mount_page(&server, "*", "c2", feed(0..100), Some(1)).await;
    mount_page(&server, "c2", "c3", feed(100..200), Some(1)).await;
    mount_page(&server, "c3", "c4", feed(200..300), Some(0)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 50);
    let request = CrawlRequest::new(app_id(), january());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert!(report.status.is_success(), "status: {}", report.status);
    assert_eq!(report.stop_reason, Some(StopReason::OutOfRange));
    assert_eq!(report.state.pages_fetched(), 2);
    assert_eq!(report.state.phase(), CrawlPhase::Done);

    let range = january();
    let expected: Vec<String> = (0..200)
        .filter(|&n| {
            let submitted = Utc.timestamp_opt(FEB_FIRST - n as i64 * STEP, 0).unwrap();
            range.contains(submitted)
        })
        .map(|n| n.to_string())
        .collect();
    assert_eq!(expected.len(), 149);

    let files = chunk_files(dir.path());
    assert_eq!(files, report.files);
    let chunks: Vec<Vec<Review>> = files.iter().map(|f| read_chunk(f)).collect();
    let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![50, 50, 49]);

    let ids: Vec<String> = chunks
        .iter()
        .flatten()
        .inspect(|r| assert!(range.contains(r.submitted_at())))
        .map(|r| r.recommendation_id().to_string())
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(report.state.reviews_accepted(), 149);
    assert_eq!(leftover_temp_files(dir.path()), 0);
}

#[tokio::test]
async fn test_early_stop_disabled_paginates_past_range() {
    let server = MockServer::start().await;
    mount_page(&server, "*", "c2", feed(0..100), Some(1)).await;
    mount_page(&server, "c2", "c3", feed(100..200), Some(1)).await;
    mount_page(&server, "c3", "c3", feed(200..300), Some(1)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path(), 50);
    config.crawl.early_stop = false;
    let request = CrawlRequest::new(app_id(), january());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert!(report.status.is_success());
    assert_eq!(report.stop_reason, Some(StopReason::CursorRepeated));
    assert_eq!(report.state.pages_fetched(), 3);
    assert_eq!(report.state.reviews_accepted(), 149);
    assert!(report.state.out_of_range_seen());
}

#[tokio::test]
async fn test_repeated_cursor_stops_after_two_pages() {
    // Real cursors carry characters that must be query-encoded
    let cursor = "AoJwv+3q5/YCeJ2x=";

    let server = MockServer::start().await;
    mount_page(&server, "*", cursor, feed(0..10), Some(1)).await;
    mount_page(&server, cursor, cursor, feed(10..20), Some(1)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 5_000);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert!(report.status.is_success());
    assert_eq!(report.stop_reason, Some(StopReason::CursorRepeated));
    assert_eq!(report.state.pages_fetched(), 2);
    assert_eq!(report.state.cursor().as_str(), cursor);

    let files = chunk_files(dir.path());
    assert_eq!(files.len(), 1);
    assert_eq!(read_chunk(&files[0]).len(), 20);
}

#[tokio::test]
async fn test_empty_page_terminates() {
    let server = MockServer::start().await;
    mount_page(&server, "*", "c2", feed(0..30), Some(1)).await;
    mount_page(&server, "c2", "c3", vec![], Some(1)).await;
    mount_page(&server, "c3", "c4", feed(30..60), Some(0)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 5_000);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert!(report.status.is_success());
    assert_eq!(report.stop_reason, Some(StopReason::EmptyPage));
    assert_eq!(report.state.pages_fetched(), 2);
    assert_eq!(report.state.reviews_accepted(), 30);
}

#[tokio::test]
async fn test_max_pages_limit() {
    let server = MockServer::start().await;
    mount_page(&server, "*", "c2", feed(0..10), Some(1)).await;
    mount_page(&server, "c2", "c3", feed(10..20), Some(1)).await;
    mount_page(&server, "c3", "c4", feed(20..30), Some(0)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 5_000);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded()).with_max_pages(2);
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert!(report.status.is_success());
    assert_eq!(report.stop_reason, Some(StopReason::PageLimit));
    assert_eq!(report.state.pages_fetched(), 2);
    assert_eq!(report.state.reviews_accepted(), 20);
}

/// Fails every chunk from `fail_from` on, delegating earlier ones to disk
struct FailingStore {
    inner: DirectoryStore,
    fail_from: u32,
}

impl ChunkStore for FailingStore {
    fn write_chunk(&mut self, app_id: AppId, index: u32, reviews: &[Review]) -> WriteResult<PathBuf> {
        if index >= self.fail_from {
            return Err(WriteError::Io {
                path: self.inner.path_for(app_id, index),
                source: std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
            });
        }
        self.inner.write_chunk(app_id, index, reviews)
    }

    fn clear_stale(&mut self, app_id: AppId) -> WriteResult<Vec<PathBuf>> {
        self.inner.clear_stale(app_id)
    }
}

#[tokio::test]
async fn test_write_failure_on_second_flush() {
    let server = MockServer::start().await;
    mount_page(&server, "*", "c2", feed(0..100), Some(1)).await;
    mount_page(&server, "c2", "c3", feed(100..200), Some(0)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 50);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let store = FailingStore {
        inner: DirectoryStore::new(dir.path()),
        fail_from: 2,
    };
    let report = Coordinator::with_store(config, request, store)
        .unwrap()
        .run()
        .await;

    assert_eq!(
        report.status.error().map(|e| e.kind()),
        Some(CrawlErrorKind::Write)
    );
    assert_eq!(report.state.phase(), CrawlPhase::Failed);
    assert_eq!(report.unflushed, 50);
    assert_eq!(report.next_chunk_index, 2);

    let files = chunk_files(dir.path());
    assert_eq!(files, vec![dir.path().join(format!("reviews_{}_1.json", APP))]);
    assert_eq!(read_chunk(&files[0]).len(), 50);
    assert_eq!(leftover_temp_files(dir.path()), 0);
}

/// Serves a page and requests cancellation while doing so
struct CancelOnRespond {
    flag: CancelFlag,
    template: ResponseTemplate,
}

impl Respond for CancelOnRespond {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.flag.cancel();
        self.template.clone()
    }
}

#[tokio::test]
async fn test_cancellation_mid_crawl_flushes_buffer() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 5_000);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let coordinator = Coordinator::new(config, request).unwrap();

    mount_page(&server, "*", "c2", feed(0..100), Some(1)).await;
    Mock::given(method("GET"))
        .and(query_param("cursor", "c2"))
        .respond_with(CancelOnRespond {
            flag: coordinator.cancel_handle(),
            template: ResponseTemplate::new(200).set_body_json(page_body("c3", feed(100..200))),
        })
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "c3", "c4", feed(200..300), Some(0)).await;

    let report = coordinator.run().await;

    assert!(matches!(report.status, CrawlStatus::Cancelled));
    assert_eq!(report.stop_reason, Some(StopReason::Cancelled));
    assert_eq!(report.state.phase(), CrawlPhase::Cancelled);
    assert_eq!(report.state.pages_fetched(), 2);
    assert_eq!(report.unflushed, 0);

    let files = chunk_files(dir.path());
    assert_eq!(files.len(), 1);
    assert_eq!(read_chunk(&files[0]).len(), 200);
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let server = MockServer::start().await;
    mount_page(&server, "*", "c2", feed(0..100), None).await;
    mount_page(&server, "c2", "c3", feed(100..200), None).await;

    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    for dir in [&first, &second] {
        let config = create_test_config(&server, dir.path(), 50);
        let request = CrawlRequest::new(app_id(), january());
        let report = Coordinator::new(config, request).unwrap().run().await;
        assert!(report.status.is_success());
    }

    let a = chunk_files(first.path());
    let b = chunk_files(second.path());
    assert_eq!(a.len(), 3);
    assert_eq!(a.len(), b.len());
    for (left, right) in a.iter().zip(&b) {
        assert_eq!(fs::read(left).unwrap(), fs::read(right).unwrap());
    }
}

#[tokio::test]
async fn test_always_rate_limited_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/appreviews/{}", APP)))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 50);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert_eq!(
        report.status.error().map(|e| e.kind()),
        Some(CrawlErrorKind::FetchExhausted)
    );
    assert_eq!(report.state.pages_fetched(), 0);
    assert!(chunk_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_failure_after_accepting_reviews_flushes_them() {
    let server = MockServer::start().await;
    mount_page(&server, "*", "c2", feed(0..40), Some(1)).await;
    Mock::given(method("GET"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 5_000);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert_eq!(
        report.status.error().map(|e| e.kind()),
        Some(CrawlErrorKind::FetchFatal)
    );
    assert_eq!(report.unflushed, 0);
    let files = chunk_files(dir.path());
    assert_eq!(files.len(), 1);
    assert_eq!(read_chunk(&files[0]).len(), 40);
}

#[tokio::test]
async fn test_invalid_chunk_size_fails_before_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 0);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert_eq!(
        report.status.error().map(|e| e.kind()),
        Some(CrawlErrorKind::InvalidInput)
    );
}

#[tokio::test]
async fn test_anonymized_reviewers() {
    let server = MockServer::start().await;
    mount_page(&server, "*", "*", feed(0..3), Some(1)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path(), 5_000);
    config.crawl.anonymize_reviewers = true;
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;
    assert!(report.status.is_success());

    let reviews = read_chunk(&chunk_files(dir.path())[0]);
    assert_eq!(reviews.len(), 3);
    for review in &reviews {
        assert_eq!(review.reviewer_id().len(), 64);
        assert!(!review.reviewer_id().starts_with("7656119"));
        assert_eq!(review.app_id(), app_id());
    }
}

#[tokio::test]
async fn test_rerun_into_same_directory_removes_stale_chunks() {
    let dir = TempDir::new().unwrap();

    let large = MockServer::start().await;
    mount_page(&large, "*", "*", feed(0..30), Some(1)).await;
    let config = create_test_config(&large, dir.path(), 10);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;
    assert!(report.status.is_success());
    assert_eq!(chunk_files(dir.path()).len(), 3);

    // Files that belong to nobody or to another app stay put
    fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();
    fs::write(dir.path().join("reviews_731_1.json"), b"[]").unwrap();

    let small = MockServer::start().await;
    mount_page(&small, "*", "*", feed(100..105), Some(1)).await;
    let config = create_test_config(&small, dir.path(), 10);
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;
    assert!(report.status.is_success());

    let files = chunk_files(dir.path());
    assert_eq!(files, vec![dir.path().join("reviews_730_1.json")]);
    let reviews = read_chunk(&files[0]);
    assert_eq!(reviews.len(), 5);
    assert_eq!(reviews[0].recommendation_id(), "100");

    assert_eq!(fs::read(dir.path().join("notes.txt")).unwrap(), b"keep me");
    assert!(dir.path().join("reviews_731_1.json").exists());
    assert_eq!(leftover_temp_files(dir.path()), 0);
}

#[tokio::test]
async fn test_app_details_are_attached_to_reviews() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/appdetails"))
        .and(query_param("appids", APP.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            APP.to_string(): {
                "success": true,
                "data": {
                    "type": "game",
                    "name": "Counter-Strike 2",
                    "developers": ["Valve", "Hidden Path Entertainment"]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "*", "", feed(0..4), Some(1)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path(), 5_000);
    config.api.app_details = true;
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert!(report.status.is_success());
    assert_eq!(report.stop_reason, Some(StopReason::CursorExhausted));
    let details = report.app_details.as_ref().unwrap();
    assert_eq!(details.kind.as_deref(), Some("game"));
    assert_eq!(details.developer_label(), "Valve, Hidden Path Entertainment");

    let reviews = read_chunk(&chunk_files(dir.path())[0]);
    assert_eq!(reviews.len(), 4);
    for review in &reviews {
        assert_eq!(review.app_name(), Some("Counter-Strike 2"));
        assert_eq!(review.developers().len(), 2);
    }
}

#[tokio::test]
async fn test_app_details_lookup_retries_like_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/appdetails"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/appreviews/{}", APP)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path(), 50);
    config.api.app_details = true;
    let request = CrawlRequest::new(app_id(), DateRange::unbounded());
    let report = Coordinator::new(config, request).unwrap().run().await;

    assert_eq!(
        report.status.error().map(|e| e.kind()),
        Some(CrawlErrorKind::FetchExhausted)
    );
    assert_eq!(report.state.phase(), CrawlPhase::Failed);
    assert!(chunk_files(dir.path()).is_empty());
}
