//! End-to-end races against local mock providers.

use std::time::{Duration, Instant};

use axum::{body::Body, http::Request, http::StatusCode};
use cep_race::{
    server::build_router, ProviderConfig, ProviderId, Query, RaceConfig, RaceResult, Racer,
};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn provider(id: &str, delay_ms: u64, body: &str) -> (MockServer, ProviderConfig) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ws/01001000/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(&server)
        .await;

    let config = ProviderConfig::new(id, format!("{}/ws/{{query}}/json", server.uri())).unwrap();
    (server, config)
}

fn unreachable_provider(id: &str) -> ProviderConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    ProviderConfig::new(id, format!("http://127.0.0.1:{port}/{{query}}")).unwrap()
}

fn query() -> Query {
    Query::new("01001000").unwrap()
}

#[tokio::test]
async fn fastest_provider_wins() {
    let (_fast, p1) = provider("p1", 50, "X").await;
    let (_slow, p2) = provider("p2", 900, "Y").await;
    let racer = Racer::new(vec![p2, p1], RaceConfig::default()).unwrap();

    match racer.race(&query()).await {
        RaceResult::Won { provider, body } => {
            assert_eq!(provider.as_str(), "p1");
            assert_eq!(body, "X");
        }
        other => panic!("expected p1 to win, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_providers_time_out_at_deadline() {
    let (_a, p1) = provider("p1", 1500, "X").await;
    let (_b, p2) = provider("p2", 1600, "Y").await;
    let cfg = RaceConfig::default().with_deadline(Duration::from_millis(300));
    let racer = Racer::new(vec![p1, p2], cfg).unwrap();

    let start = Instant::now();
    let result = racer.race(&query()).await;

    assert!(matches!(result, RaceResult::TimedOut));
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn unreachable_providers_fail_fast() {
    let racer = Racer::new(
        vec![unreachable_provider("p1"), unreachable_provider("p2")],
        RaceConfig::default().with_deadline(Duration::from_secs(5)),
    )
    .unwrap();

    let start = Instant::now();
    let result = racer.race(&query()).await;

    match result {
        RaceResult::AllFailed { failures } => assert_eq!(failures.len(), 2),
        other => panic!("expected all failed, got {other:?}"),
    }
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn reachable_provider_beats_a_failing_one() {
    let (_ok, p2) = provider("p2", 100, "Y").await;
    let racer = Racer::new(vec![unreachable_provider("p1"), p2], RaceConfig::default()).unwrap();

    let result = racer.race(&query()).await;

    assert_eq!(result.winner().map(|p| p.as_str()), Some("p2"));
    let stats = racer.provider_stats();
    assert_eq!(stats[&ProviderId::from("p1")].errors, 1);
    assert_eq!(stats[&ProviderId::from("p2")].wins, 1);
}

#[tokio::test]
async fn service_answers_with_the_winner() {
    let (_fast, p1) = provider("p1", 20, "{\"cep\":\"01001-000\"}").await;
    let (_slow, p2) = provider("p2", 600, "{}").await;
    let app = build_router(Racer::new(vec![p1, p2], RaceConfig::default()).unwrap());

    let resp = app
        .oneshot(Request::builder().uri("/?cep=01001000").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
    assert_eq!(&body[..], b"provider: p1\n\n{\"cep\":\"01001-000\"}");
}
