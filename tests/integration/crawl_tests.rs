//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small catalogue and run the full crawl
//! (config file, HTTP backend, stage parsers, retry policy, JSON-lines sink)
//! end-to-end.

use shelf_scout::config::load_config;
use shelf_scout::crawler::{build_renderer, run_crawl, Coordinator};
use shelf_scout::output::{format_markdown_summary, JsonLinesSink};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a config file for a crawl starting at `seed`
fn write_config(dir: &TempDir, seed: &str, start_stage: &str, max_retries: u32) -> std::path::PathBuf {
    let config_path = dir.path().join("scout.toml");
    let content = format!(
        r#"
[crawler]
seed-url = "{seed}"
allowed-domains = ["127.0.0.1"]
categories = ["Beverages", "Snacks & Desserts"]
max-concurrent-renders = 4
start-stage = "{start_stage}"

[render]
backend = "http"
selector-wait-timeout-ms = 500
selector-poll-interval-ms = 10
scroll-convergence-interval-ms = 10
scroll-convergence-max-rounds = 5
fetch-timeout-ms = 5000
home-settle-ms = 0

[retry]
max-retries = {max_retries}

[user-agent]
crawler-name = "TestScout"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "test@example.com"

[output]
records-path = "{records}"
summary-path = "{summary}"
"#,
        seed = seed,
        start_stage = start_stage,
        max_retries = max_retries,
        records = dir.path().join("products.jsonl").display(),
        summary = dir.path().join("summary.md").display(),
    );
    std::fs::write(&config_path, content).expect("Failed to write config");
    config_path
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn detail_page(name: &str, sku: &str, price: &str) -> ResponseTemplate {
    html(&format!(
        r#"<div class="product-Details-page-root">
             <h1 class="product-tile__name">{}</h1>
             <div class="product-Details-images"><img src="/img/{}.jpg"></div>
             <div class="product-Details-sku">SKU: {}</div>
             <div class="accordion-property"><p>Chilled </p><p>drink</p></div>
             <span class="product-Details-current-price">{}</span>
             <button class="add-to-cart">Add</button>
           </div>"#,
        name, sku, sku, price
    ))
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Home with one allowed and one unlisted category, one carousel, one listing of
/// three products (one with an unparseable price)
async fn mount_catalogue(server: &MockServer) {
    mount(
        server,
        "/en",
        html(
            r#"<nav class="pc-sidenavbar">
                 <a href="/en/beverages"><span>Beverages</span></a>
                 <a href="/en/electronics"><span>Electronics</span></a>
               </nav>"#,
        ),
    )
    .await;

    mount(
        server,
        "/en/beverages",
        html(
            r#"<div class="plp-carousel">
                 <span class="plp-carousel__title-name">Juice</span>
                 <a class="plp-carousel__link" href="/en/beverages/juice">View all</a>
               </div>"#,
        ),
    )
    .await;

    mount(
        server,
        "/en/beverages/juice",
        html(
            r#"<div class="product-item"><img class="product-item-image"><a href="/en/p/orange">Orange</a></div>
               <div class="product-item"><img class="product-item-image"><a href="/en/p/apple">Apple</a></div>
               <div class="product-item"><img class="product-item-image"><a href="/en/p/mystery">?</a></div>"#,
        ),
    )
    .await;

    mount(server, "/en/p/orange", detail_page("Orange Juice 500ml.", "8851234567890", "฿ 45.00")).await;
    mount(server, "/en/p/apple", detail_page("Apple Juice 1L", "8850000000011", "฿ 1,052.50")).await;
    mount(server, "/en/p/mystery", detail_page("Mystery Drink", "0", "Ask staff")).await;
}

fn read_records(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .expect("Failed to read records")
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect()
}

#[tokio::test]
async fn test_full_crawl_from_home() {
    let server = MockServer::start().await;
    mount_catalogue(&server).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&dir, &format!("{}/en", server.uri()), "home", 3);
    let config = load_config(&config_path).expect("Failed to load config");
    let records_path = dir.path().join("products.jsonl");

    let report = run_crawl(&config, &records_path).await.expect("Crawl failed");

    // home, category, listing, three detail pages
    assert_eq!(report.units_processed, 6);
    assert_eq!(report.records_emitted, 2);
    assert_eq!(report.failed_records, 1);
    assert_eq!(report.records_by_category.get("Beverages"), Some(&2));
    assert_eq!(report.backend, "http");

    let mut records = read_records(&records_path);
    records.sort_by_key(|r| r["name"].as_str().unwrap_or_default().to_string());
    assert_eq!(records.len(), 2);

    let apple = &records[0];
    assert_eq!(apple["name"], "Apple Juice");
    assert_eq!(apple["quantity"]["value"], 1.0);
    assert_eq!(apple["quantity"]["unit"], "L");
    assert_eq!(apple["price"], 1052.5);

    let orange = &records[1];
    assert_eq!(orange["name"], "Orange Juice");
    assert_eq!(orange["quantity"]["unit"], "ml");
    assert_eq!(orange["price"], 45.0);
    assert_eq!(orange["barcode"], "8851234567890");
    assert_eq!(orange["details"], "Chilled drink");
    assert_eq!(orange["category"], "Beverages");
    assert_eq!(orange["subcategory"], "Juice");
    assert_eq!(orange["url"], format!("{}/en/p/orange", server.uri()));

    // Electronics is not in the allow-list and must never be requested
    let requests = server.received_requests().await.expect("Request recording disabled");
    assert!(requests.iter().all(|r| r.url.path() != "/en/electronics"));

    let markdown = format_markdown_summary(&report);
    assert!(markdown.contains("| Beverages | 2 |"));
}

#[tokio::test]
async fn test_retryable_status_then_success() {
    let server = MockServer::start().await;

    // First answer is a 503, later ones succeed
    Mock::given(method("GET"))
        .and(path("/en/list"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount(
        &server,
        "/en/list",
        html(r#"<div class="product-item"><img class="product-item-image"><a href="/en/p/orange">Orange</a></div>"#),
    )
    .await;
    mount(&server, "/en/p/orange", detail_page("Orange Juice 500ml", "885", "฿ 45")).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&dir, &format!("{}/en/list", server.uri()), "product-list", 3);
    let config = load_config(&config_path).expect("Failed to load config");

    let report = run_crawl(&config, &dir.path().join("products.jsonl"))
        .await
        .expect("Crawl failed");

    assert_eq!(report.retries_scheduled, 1);
    assert_eq!(report.units_abandoned, 0);
    assert_eq!(report.records_emitted, 1);

    let list_requests = server
        .received_requests()
        .await
        .expect("Request recording disabled")
        .iter()
        .filter(|r| r.url.path() == "/en/list")
        .count();
    assert_eq!(list_requests, 2);
}

#[tokio::test]
async fn test_non_retryable_status_is_not_retried() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/en/list",
        html(
            r#"<div class="product-item"><img class="product-item-image"><a href="/en/p/gone">Gone</a></div>
               <div class="product-item"><img class="product-item-image"><a href="/en/p/orange">Orange</a></div>"#,
        ),
    )
    .await;
    mount(&server, "/en/p/gone", ResponseTemplate::new(404)).await;
    mount(&server, "/en/p/orange", detail_page("Orange Juice", "885", "฿ 45")).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&dir, &format!("{}/en/list", server.uri()), "product-list", 3);
    let config = load_config(&config_path).expect("Failed to load config");

    let report = run_crawl(&config, &dir.path().join("products.jsonl"))
        .await
        .expect("Crawl failed");

    assert_eq!(report.retries_scheduled, 0);
    assert_eq!(report.units_ignored, 1);
    assert_eq!(report.records_emitted, 1);

    let gone_requests = server
        .received_requests()
        .await
        .expect("Request recording disabled")
        .iter()
        .filter(|r| r.url.path() == "/en/p/gone")
        .count();
    assert_eq!(gone_requests, 1);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let server = MockServer::start().await;
    mount(&server, "/en/list", ResponseTemplate::new(502)).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&dir, &format!("{}/en/list", server.uri()), "product-list", 2);
    let config = load_config(&config_path).expect("Failed to load config");

    let report = run_crawl(&config, &dir.path().join("products.jsonl"))
        .await
        .expect("Crawl failed");

    assert_eq!(report.units_processed, 0);
    assert_eq!(report.retries_scheduled, 2);
    assert_eq!(report.units_abandoned, 1);

    let requests = server.received_requests().await.expect("Request recording disabled");
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_coordinator_with_custom_sink() {
    let server = MockServer::start().await;
    mount_catalogue(&server).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&dir, &format!("{}/en", server.uri()), "home", 3);
    let config = load_config(&config_path).expect("Failed to load config");

    let renderer = build_renderer(&config).await.expect("Failed to build renderer");
    let sink = JsonLinesSink::new(Vec::new());
    let mut coordinator = Coordinator::new(&config, renderer, Box::new(sink)).expect("Failed to create coordinator");

    let report = coordinator.run().await.expect("Crawl failed");
    assert_eq!(report.records_emitted, 2);
    assert_eq!(coordinator.session().failed_records(), 1);
}
