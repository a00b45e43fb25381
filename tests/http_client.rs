use std::time::Duration;

use shls_chef::models::HttpConfig;
use shls_chef::utils::http::HttpClient;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_config(cache_dir: &TempDir, forever_hosts: Vec<String>) -> HttpConfig {
    HttpConfig {
        timeout_secs: 1,
        max_retries: 2,
        retry_backoff_ms: 10,
        cache_dir: cache_dir.path().join("cache").to_string_lossy().into_owned(),
        cache_forever_hosts: forever_hosts,
        ..HttpConfig::default()
    }
}

async fn mount_missing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn non_success_status_is_absent_without_retry() {
    let server = MockServer::start().await;
    mount_missing(&server).await;

    let tmp = TempDir::new().unwrap();
    let http = HttpClient::new(&http_config(&tmp, vec![])).unwrap();

    let url = format!("{}/missing", server.uri());
    assert!(http.get(&url).await.is_none());
}

#[tokio::test]
async fn missing_page_is_absent_without_retry() {
    let server = MockServer::start().await;
    mount_missing(&server).await;

    let tmp = TempDir::new().unwrap();
    let http = HttpClient::new(&http_config(&tmp, vec![])).unwrap();

    let url = format!("{}/missing", server.uri());
    assert!(http.get_page(&url).await.is_none());
}

#[tokio::test]
async fn timeouts_are_retried_up_to_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(2)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let http = HttpClient::new(&http_config(&tmp, vec![]))
        .unwrap()
        .with_cache(None);

    let url = format!("{}/slow", server.uri());
    assert!(http.get(&url).await.is_none());
}

#[tokio::test]
async fn connection_refused_gives_up() {
    let tmp = TempDir::new().unwrap();
    let http = HttpClient::new(&http_config(&tmp, vec![]))
        .unwrap()
        .with_cache(None);

    // port 9 (discard) is closed on test machines
    assert!(http.get("http://127.0.0.1:9/").await.is_none());
}

#[tokio::test]
async fn forever_hosts_are_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let http = HttpClient::new(&http_config(&tmp, vec!["127.0.0.1".into()])).unwrap();

    let url = format!("{}/home", server.uri());
    let first = http.get_page(&url).await.unwrap();
    let second = http.get_page(&url).await.unwrap();
    assert_eq!(first.html, "<html>home</html>");
    assert_eq!(second, first);
}

#[tokio::test]
async fn other_hosts_are_revalidated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_string("<html>v1</html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let http = HttpClient::new(&http_config(&tmp, vec![])).unwrap();

    let url = format!("{}/page", server.uri());
    assert_eq!(http.get_page(&url).await.unwrap().html, "<html>v1</html>");
    assert_eq!(http.get_page(&url).await.unwrap().html, "<html>v1</html>");
}
