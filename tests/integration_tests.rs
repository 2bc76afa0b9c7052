//! Integration tests for intronview
//!
//! An axum app stands in for the genome browser exon endpoints and answers
//! from a `LocalRangeSource`.

#![cfg(feature = "http")]

use axum::{Json, Router, extract::State, routing::post};
use intronview::{
    Error, ShortenedIntronsViewport,
    introns::{TransformOutcome, TransformRequest, TransformType},
    source::{HttpRangeSource, LocalRangeSource, RangeSource},
    types::{ApiResponse, Block, RangeQuery, TrackConfig, ViewportQuery},
    viewport::{Viewport, Window},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone)]
struct MockState {
    source: Arc<LocalRangeSource>,
    hits: Arc<AtomicUsize>,
}

fn envelope(result: intronview::Result<Vec<Block>>) -> Json<ApiResponse<Vec<Block>>> {
    Json(match result {
        Ok(blocks) => ApiResponse::success(blocks),
        Err(e) => ApiResponse::error(e.to_string()),
    })
}

async fn viewport_exons(
    State(state): State<MockState>,
    Json(query): Json<ViewportQuery>,
) -> Json<ApiResponse<Vec<Block>>> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    envelope(state.source.exons_by_viewport(&query).await)
}

async fn range_exons(
    State(state): State<MockState>,
    Json(query): Json<RangeQuery>,
) -> Json<ApiResponse<Vec<Block>>> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    envelope(state.source.exons_by_range(&query).await)
}

struct MockServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl MockServer {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn source(&self) -> HttpRangeSource {
        HttpRangeSource::new(&self.base_url, Duration::from_secs(5), Duration::from_secs(60))
            .unwrap()
    }
}

async fn start_mock_server() -> MockServer {
    let mut source = LocalRangeSource::new();
    source.insert(
        1,
        1,
        vec![
            Block::new(11_000, 11_100),
            Block::new(12_000, 12_100),
            Block::new(15_000, 15_300),
        ],
    );
    let hits = Arc::new(AtomicUsize::new(0));
    let state = MockState {
        source: Arc::new(source),
        hits: hits.clone(),
    };

    let app = Router::new()
        .route("/restapi/gene/exons/viewport", post(viewport_exons))
        .route("/restapi/gene/exons/range", post(range_exons))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: format!("http://{}/restapi", addr),
        hits,
    }
}

fn range_query(track_id: i64, start: i64, end: i64) -> RangeQuery {
    RangeQuery {
        chromosome_id: 1,
        id: track_id,
        project_id: None,
        intron_length: 0,
        start_index: start,
        end_index: end,
    }
}

#[tokio::test]
async fn test_range_query_over_http() {
    let server = start_mock_server().await;
    let blocks = server
        .source()
        .exons_by_range(&range_query(1, 11_050, 12_500))
        .await
        .unwrap();
    assert_eq!(blocks, vec![Block::new(11_000, 11_100), Block::new(12_000, 12_100)]);
}

#[tokio::test]
async fn test_identical_queries_are_cached() {
    let server = start_mock_server().await;
    let source = server.source();
    let query = ViewportQuery {
        center_position: 12_050,
        chromosome_id: 1,
        id: 1,
        project_id: None,
        intron_length: 0,
        view_port_size: 600,
    };

    let first = source.exons_by_viewport(&query).await.unwrap();
    let second = source.exons_by_viewport(&query).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_error_envelope_is_fetch_failure() {
    let server = start_mock_server().await;
    let err = server
        .source()
        .exons_by_range(&range_query(42, 1, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RangeFetch(ref message) if message.contains("track 42")));
}

#[tokio::test]
async fn test_missing_endpoint_is_fetch_failure() {
    let server = start_mock_server().await;
    let source = HttpRangeSource::new(
        &server.base_url.replace("/restapi", "/elsewhere"),
        Duration::from_secs(5),
        Duration::from_secs(60),
    )
    .unwrap();
    let err = source
        .exons_by_range(&range_query(1, 1, 100))
        .await
        .unwrap_err();
    assert!(err.is_fetch_failure());
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_shortened_introns_over_http() {
    let server = start_mock_server().await;
    let viewport = Viewport::new(100_000, 1000.0).with_brush(Window::new(11_900, 12_200));
    let introns = ShortenedIntronsViewport::new(viewport, Arc::new(server.source()));

    introns.enable(TrackConfig::new(1, 1)).await.unwrap();
    let brush = introns.brush().await.unwrap();
    assert_eq!((brush.start_index, brush.end_index), (11_001, 15_099));
    assert_eq!(brush.shortened_size, 301);
    assert_eq!(server.hits(), 1);

    let outcome = introns.transform(TransformRequest::pan(10)).await.unwrap();
    assert!(matches!(
        outcome,
        TransformOutcome::Applied {
            kind: TransformType::Move,
            ..
        }
    ));
    assert_eq!(server.hits(), 1);

    let snapshot = introns.snapshot().await;
    assert!(!snapshot.check_feature(12_500, Some(12_600)));
    assert!(snapshot.check_feature(15_100, Some(15_200)));

    introns.set_intron_length(50).await.unwrap();
    assert_eq!(server.hits(), 2);
    let catalog = introns.catalog().await.unwrap();
    assert_eq!(catalog.ranges()[0].start_index, 10_950);
    assert_eq!(introns.brush().await.unwrap().center, 12_060);
}
