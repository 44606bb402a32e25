use crate::common::fast_fetcher;
use cws_lister::crawler::{FetchErrorKind, FetchFailure, Fetcher, RequestKind};
use cws_lister::config::UserAgentConfig;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(config: cws_lister::config::FetcherConfig) -> Fetcher {
    Fetcher::from_config(&UserAgentConfig::default(), &config).unwrap()
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let fetcher = fetcher(fast_fetcher());
    let response = fetcher
        .fetch(&format!("{}/flaky", mock_server.uri()), RequestKind::Listing)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
    assert_eq!(response.attempts, 3);
    assert_eq!(fetcher.retries(), 2);
    assert_eq!(fetcher.requests(), 3);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fetcher(fast_fetcher());
    let error = fetcher
        .fetch(&format!("{}/gone", mock_server.uri()), RequestKind::Detail)
        .await
        .unwrap_err();

    assert_eq!(error.kind, FetchErrorKind::Permanent);
    assert_eq!(error.reason, FetchFailure::Status(404));
    assert_eq!(error.attempts, 1);
    assert!(error.is_gone());
    assert_eq!(fetcher.retries(), 0);
}

#[tokio::test]
async fn test_rate_limit_exhaustion_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = fetcher(fast_fetcher());
    let error = fetcher
        .fetch(&format!("{}/busy", mock_server.uri()), RequestKind::Listing)
        .await
        .unwrap_err();

    assert!(error.is_transient());
    assert_eq!(error.reason, FetchFailure::Status(429));
    assert_eq!(error.attempts, 3);
    assert_eq!(fetcher.retries(), 2);

    let host = url::Url::parse(&mock_server.uri()).unwrap();
    let host = format!(
        "{}:{}",
        host.host_str().unwrap(),
        host.port_or_known_default().unwrap()
    );
    let state = fetcher.scheduler().host_state(&host).await.unwrap();
    assert_eq!(state.rate_limit_hits, 3);
    assert!(state.is_rate_limited());
}

#[tokio::test]
async fn test_slow_responses_are_bounded_by_budget() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = fast_fetcher();
    config.timeout_ms = 150;
    config.max_retries = 1;
    let fetcher = fetcher(config);
    assert_eq!(fetcher.budget(), Duration::from_millis(300));

    let started = Instant::now();
    let error = fetcher
        .fetch(&format!("{}/slow", mock_server.uri()), RequestKind::Detail)
        .await
        .unwrap_err();

    assert!(error.is_transient());
    assert!(error.attempts >= 1 && error.attempts <= 2);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_invalid_url_is_permanent() {
    let fetcher = fetcher(fast_fetcher());
    let error = fetcher
        .fetch("not a url", RequestKind::Listing)
        .await
        .unwrap_err();

    assert_eq!(error.kind, FetchErrorKind::Permanent);
    assert_eq!(error.attempts, 0);
    assert!(matches!(error.reason, FetchFailure::InvalidUrl(_)));
}
