//! Integration tests for the WordPress publisher's idempotent upsert.

use landgen_core::{new_v7, Error, PagePublisher};
use landgen_db::test_fixtures::{generated_page, sample_content, sample_site};
use landgen_jobs::adapters::{WordPressConfig, WordPressPublisher};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Basic auth for `editor:abcd efgh ijkl mnop`, the fixture credentials.
const FIXTURE_AUTH: &str = "Basic ZWRpdG9yOmFiY2QgZWZnaCBpamtsIG1ub3A=";

fn publisher() -> WordPressPublisher {
    WordPressPublisher::new(WordPressConfig {
        timeout_seconds: 5,
        publish_status: "publish".to_string(),
    })
    .expect("Failed to create publisher")
}

#[tokio::test]
async fn test_creates_page_when_unknown() {
    let server = MockServer::start().await;
    let project_id = new_v7();
    let page = generated_page(project_id);
    let site = sample_site(project_id, &server.uri());

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/pages"))
        .and(query_param("slug", page.slug.as_str()))
        .and(header("Authorization", FIXTURE_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/pages"))
        .and(header("Authorization", FIXTURE_AUTH))
        .and(body_partial_json(serde_json::json!({
            "slug": page.slug,
            "status": "publish",
            "title": "Roof Repair in Austin, TX"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 101,
            "link": "https://example.com/roof-repair/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let published = publisher()
        .publish(&page, &sample_content(), &site)
        .await
        .unwrap();
    assert_eq!(published.page_id, 101);
    assert_eq!(published.page_url, "https://example.com/roof-repair/");
}

#[tokio::test]
async fn test_updates_known_page_without_lookup() {
    let server = MockServer::start().await;
    let project_id = new_v7();
    let mut page = generated_page(project_id);
    page.wp_page_id = Some(55);
    let site = sample_site(project_id, &server.uri());

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/pages/55"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 55,
            "link": "https://example.com/roof-repair/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let published = publisher()
        .publish(&page, &sample_content(), &site)
        .await
        .unwrap();
    assert_eq!(published.page_id, 55);
}

#[tokio::test]
async fn test_updates_existing_slug_instead_of_duplicating() {
    let server = MockServer::start().await;
    let project_id = new_v7();
    let page = generated_page(project_id);
    let site = sample_site(project_id, &server.uri());

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/pages"))
        .and(query_param("slug", page.slug.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 77, "link": "https://example.com/roof-repair/"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/pages/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 77,
            "link": "https://example.com/roof-repair/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/pages"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let published = publisher()
        .publish(&page, &sample_content(), &site)
        .await
        .unwrap();
    assert_eq!(published.page_id, 77);
}

#[tokio::test]
async fn test_deleted_remote_page_is_recreated() {
    let server = MockServer::start().await;
    let project_id = new_v7();
    let mut page = generated_page(project_id);
    page.wp_page_id = Some(9);
    let site = sample_site(project_id, &server.uri());

    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/pages/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wp/v2/pages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 10,
            "link": "https://example.com/roof-repair/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let published = publisher()
        .publish(&page, &sample_content(), &site)
        .await
        .unwrap();
    assert_eq!(published.page_id, 10);
}

#[tokio::test]
async fn test_bad_credentials_are_permanent() {
    let server = MockServer::start().await;
    let project_id = new_v7();
    let page = generated_page(project_id);
    let site = sample_site(project_id, &server.uri());

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/pages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "code": "rest_not_logged_in",
            "message": "You are not currently logged in."
        })))
        .mount(&server)
        .await;

    let err = publisher()
        .publish(&page, &sample_content(), &site)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    let project_id = new_v7();
    let page = generated_page(project_id);
    let site = sample_site(project_id, &server.uri());

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/pages"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = publisher()
        .publish(&page, &sample_content(), &site)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExternalService(_)), "got {:?}", err);
    assert!(err.to_string().contains("502"));
}
