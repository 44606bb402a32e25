use crate::common::{detail_html, detail_path, item_id, sitemap_index, test_config, url_set};
use cws_lister::output::{load_previous, write_snapshot};
use cws_lister::{run, AbortReason, CatalogEntry, ItemId, RunStatus};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves a detail page for `id` at `/detail/{slug}/{id}`
async fn mount_detail(mock_server: &MockServer, slug: &str, id: &ItemId, name: &str) {
    let canonical = format!("{}{}", mock_server.uri(), detail_path(slug, id));
    Mock::given(method("GET"))
        .and(path(detail_path(slug, id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(name, &canonical)))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_full_run_from_sitemap_index() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let (a, b, c) = (item_id('a'), item_id('b'), item_id('c'));

    Mock::given(method("GET"))
        .and(path("/sitemap"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_index(
            &base,
            &["/sitemap/shard/0", "/sitemap/shard/1"],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Shards overlap on `b`
    Mock::given(method("GET"))
        .and(path("/sitemap/shard/0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(url_set(
            &base,
            &[detail_path("beta", &b), detail_path("alpha", &a)],
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap/shard/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(url_set(
            &base,
            &[detail_path("beta", &b), detail_path("gamma", &c)],
        )))
        .mount(&mock_server)
        .await;

    mount_detail(&mock_server, "alpha", &a, "Alpha").await;
    Mock::given(method("GET"))
        .and(path(detail_path("beta", &b)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_html("Beta", &format!("{}{}", base, detail_path("beta", &b)))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(detail_path("gamma", &c)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = test_config(&base, &["/sitemap"]);
    let outcome = run(&config, None).await.unwrap();

    let ids: Vec<&ItemId> = outcome.snapshot.ids().collect();
    assert_eq!(ids, vec![&a, &b]);
    assert_eq!(outcome.snapshot.entries[0].name, "Alpha");
    assert_eq!(
        outcome.snapshot.entries[1].page,
        format!("{}{}", base, detail_path("beta", &b))
    );

    let report = &outcome.report;
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.seeds_visited, 3);
    assert_eq!(report.discovered, 3);
    assert_eq!(report.duplicates_ignored, 1);
    assert_eq!(report.resolved, 2);
    assert_eq!(report.not_found, 1);
    assert_eq!(report.failures(), 0);
    assert!(report.requests >= 6);
    assert!(report.snapshot_hash.is_some());
    assert!(!outcome.snapshot.partial);
}

#[tokio::test]
async fn test_html_listing_pagination() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let (a, b) = (item_id('a'), item_id('b'));

    Mock::given(method("GET"))
        .and(path("/category/tools"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><head><link rel="next" href="/category/tools?page=2"></head>
<body><a href="{}">Alpha</a><a href="/about">About</a></body></html>"#,
            detail_path("alpha", &a)
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/category/tools"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><a href="{}">Beta</a><a href="{}">Alpha again</a></body></html>"#,
            detail_path("beta", &b),
            detail_path("alpha", &a)
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_detail(&mock_server, "alpha", &a, "Alpha").await;
    mount_detail(&mock_server, "beta", &b, "Beta").await;

    let config = test_config(&base, &["/category/tools?page=1"]);
    let outcome = run(&config, None).await.unwrap();

    assert_eq!(outcome.snapshot.len(), 2);
    assert_eq!(outcome.report.seeds_visited, 2);
    assert_eq!(outcome.report.duplicates_ignored, 1);
}

fn previous_entries(base: &str) -> Vec<CatalogEntry> {
    ['a', 'z']
        .iter()
        .map(|c| {
            let id = item_id(*c);
            CatalogEntry::new(
                id.clone(),
                "Previously listed",
                format!("{}{}", base, detail_path("old", &id)),
                format!("{}/crx?x=id%3D{}", base, id),
            )
            .unwrap()
        })
        .collect()
}

#[tokio::test]
async fn test_abort_leaves_previous_artifact_untouched() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let ids: Vec<ItemId> = ['a', 'b', 'c', 'd'].into_iter().map(item_id).collect();
    let detail_paths: Vec<String> = ids.iter().map(|id| detail_path("x", id)).collect();

    Mock::given(method("GET"))
        .and(path("/sitemap"))
        .respond_with(ResponseTemplate::new(200).set_body_string(url_set(&base, &detail_paths)))
        .mount(&mock_server)
        .await;
    mount_detail(&mock_server, "x", &ids[0], "Only good one").await;
    // Every other detail page keeps failing
    for failing in &detail_paths[1..] {
        Mock::given(method("GET"))
            .and(path(failing.as_str()))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("data.json");
    let mut builder = cws_lister::CatalogBuilder::new();
    for entry in previous_entries(&base) {
        builder.add(entry);
    }
    write_snapshot(&builder.finalize(false), &data_path).unwrap();
    let before = std::fs::read(&data_path).unwrap();

    let mut config = test_config(&base, &["/sitemap"]);
    config.fetcher.max_retries = 1;
    let previous = load_previous(&data_path).unwrap();
    assert_eq!(previous.as_ref().map(Vec::len), Some(2));

    let aborted = run(&config, previous).await.unwrap_err();

    assert!(matches!(
        aborted.reason,
        AbortReason::FailureThreshold { .. }
    ));
    assert_eq!(aborted.report.status, RunStatus::Aborted);
    assert_eq!(aborted.report.resolved, 1);
    assert_eq!(aborted.report.failed_transient, 3);
    assert!(aborted.report.retried >= 3);
    assert_eq!(std::fs::read(&data_path).unwrap(), before);
}

#[tokio::test]
async fn test_successful_run_diffs_against_previous() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let (a, b) = (item_id('a'), item_id('b'));

    Mock::given(method("GET"))
        .and(path("/sitemap"))
        .respond_with(ResponseTemplate::new(200).set_body_string(url_set(
            &base,
            &[detail_path("alpha", &a), detail_path("beta", &b)],
        )))
        .mount(&mock_server)
        .await;
    mount_detail(&mock_server, "alpha", &a, "Alpha").await;
    mount_detail(&mock_server, "beta", &b, "Beta").await;

    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("data.json");

    let config = test_config(&base, &["/sitemap"]);
    let outcome = run(&config, Some(previous_entries(&base))).await.unwrap();

    let diff = outcome.diff.as_ref().unwrap();
    assert_eq!(diff.added, vec![b.clone()]);
    assert_eq!(diff.removed, vec![item_id('z')]);
    assert_eq!(diff.unchanged, 1);
    assert_eq!(diff.updated, 1);
    assert_eq!(outcome.report.added, Some(1));

    write_snapshot(&outcome.snapshot, &data_path).unwrap();
    let written = load_previous(&data_path).unwrap().unwrap();
    assert_eq!(written, outcome.snapshot.entries);

    // A second run over an unchanged store produces identical bytes
    let again = run(&config, Some(written)).await.unwrap();
    assert_eq!(
        again.snapshot.to_json_bytes().unwrap(),
        std::fs::read(&data_path).unwrap()
    );
    assert!(again.diff.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_seed_aborts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), &["/sitemap"]);
    let aborted = run(&config, None).await.unwrap_err();

    assert!(matches!(
        aborted.reason,
        AbortReason::SeedFailureThreshold { .. }
    ));
    assert_eq!(aborted.report.seeds_failed, 1);
}

#[tokio::test]
async fn test_consent_page_in_place_of_shard_fails_the_seed() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let a = item_id('a');

    Mock::given(method("GET"))
        .and(path("/sitemap"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_index(
            &base,
            &["/sitemap/shard/0", "/sitemap/shard/1"],
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap/shard/0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(url_set(&base, &[detail_path("alpha", &a)])),
        )
        .mount(&mock_server)
        .await;
    // Served with 200, so only the document shape tells it apart
    Mock::given(method("GET"))
        .and(path("/sitemap/shard/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<!doctype html><html><head><title>Before you continue to Google</title></head>
<body><form action="https://consent.google.com/save"><button>Accept all</button></form></body></html>"#,
        ))
        .mount(&mock_server)
        .await;
    mount_detail(&mock_server, "alpha", &a, "Alpha").await;

    let config = test_config(&base, &["/sitemap"]);
    let aborted = run(&config, None).await.unwrap_err();

    assert!(matches!(
        aborted.reason,
        AbortReason::SeedFailureThreshold { .. }
    ));
    assert_eq!(aborted.report.seeds_visited, 3);
    assert_eq!(aborted.report.seeds_failed, 1);
}
