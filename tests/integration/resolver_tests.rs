use crate::common::{detail_html, detail_path, fast_fetcher, item_id, test_config};
use cws_lister::crawler::{Fetcher, ItemResolver, ItemTask, ResolveError};
use cws_lister::ItemState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver(base_url: &str) -> ItemResolver {
    let config = test_config(base_url, &["/sitemap"]);
    let fetcher = Fetcher::from_config(&config.user_agent, &fast_fetcher()).unwrap();
    ItemResolver::new(fetcher, config.store)
}

#[tokio::test]
async fn test_resolves_entry_from_detail_page() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let id = item_id('a');
    let canonical = format!("{}{}", base, detail_path("dark-reader", &id));

    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(detail_html("Dark Reader", &canonical)),
        )
        .mount(&mock_server)
        .await;

    let entry = resolver(&base)
        .resolve(&ItemTask::new(id.clone()))
        .await
        .unwrap();

    assert_eq!(entry.id, id);
    assert_eq!(entry.name, "Dark Reader");
    assert_eq!(entry.page, canonical);
    assert_eq!(entry.file, format!("{}/crx?x=id%3D{}", base, id));
}

#[tokio::test]
async fn test_listing_hint_is_fetched() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let id = item_id('b');
    let hint = format!("{}{}", base, detail_path("ublock-origin", &id));

    Mock::given(method("GET"))
        .and(path(detail_path("ublock-origin", &id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html("uBlock Origin", &hint)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let entry = resolver(&base)
        .resolve(&ItemTask::with_hint(id, hint.clone()))
        .await
        .unwrap();
    assert_eq!(entry.page, hint);
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let mock_server = MockServer::start().await;
    let id = item_id('c');

    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", id)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = resolver(&mock_server.uri())
        .resolve(&ItemTask::new(id))
        .await
        .unwrap_err();

    assert!(matches!(error, ResolveError::NotFound { .. }));
    assert_eq!(error.item_state(), ItemState::NotFound);
}

#[tokio::test]
async fn test_redirect_to_home_is_not_found() {
    let mock_server = MockServer::start().await;
    let id = item_id('d');

    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", id)))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>Chrome Web Store</title></head></html>"),
        )
        .mount(&mock_server)
        .await;

    let error = resolver(&mock_server.uri())
        .resolve(&ItemTask::new(id))
        .await
        .unwrap_err();

    assert_eq!(error.item_state(), ItemState::NotFound);
}

#[tokio::test]
async fn test_unrecognized_page_is_malformed() {
    let mock_server = MockServer::start().await;
    let id = item_id('e');

    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&mock_server)
        .await;

    let error = resolver(&mock_server.uri())
        .resolve(&ItemTask::new(id))
        .await
        .unwrap_err();

    assert!(matches!(error, ResolveError::Malformed { .. }));
    assert_eq!(error.item_state(), ItemState::Malformed);
}

#[tokio::test]
async fn test_generic_title_falls_back_to_slug() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let id = item_id('f');
    let canonical = format!("{}{}", base, detail_path("google-translate", &id));

    Mock::given(method("GET"))
        .and(path(format!("/detail/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><head><title>Chrome Web Store</title><link rel="canonical" href="{}"></head></html>"#,
            canonical
        )))
        .mount(&mock_server)
        .await;

    let entry = resolver(&base).resolve(&ItemTask::new(id)).await.unwrap();
    assert_eq!(entry.name, "google translate");
    assert_eq!(entry.page, canonical);
}
