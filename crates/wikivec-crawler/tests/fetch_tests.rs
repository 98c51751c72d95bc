use httpmock::prelude::*;

use wikivec_core::config::CrawlConfig;
use wikivec_core::error::Error;
use wikivec_core::traits::PageFetcher;
use wikivec_core::types::Language;
use wikivec_crawler::HttpFetcher;

fn config_for(server: &MockServer) -> CrawlConfig {
    CrawlConfig {
        base_url: server.base_url(),
        seed_paths: vec!["/".to_string()],
        max_depth: 4,
        fetch_delay_ms: 0,
        fetch_timeout_secs: 5,
        max_retries: 0,
        min_content_len: 10,
        max_snippet_len: 800,
    }
}

#[tokio::test]
async fn extracts_main_region_title_and_valid_links() {
    let server = MockServer::start();
    let base = server.base_url();
    let html = format!(
        r#"<html><head><title>  Grove - Light Sensor  </title></head>
        <body>
          <nav><a href="/nav-only.css">skip</a></nav>
          <main>
            <h1>Grove Light Sensor</h1>
            <p>The Grove Light Sensor detects ambient light intensity and
               outputs an analog value proportional to brightness levels.</p>
            <p>tiny</p>
            <a href="/Grove/Connectors">relative</a>
            <a href="{base}/XIAO/?ref=nav#specs">tracked</a>
            <a href="https://elsewhere.example.org/page">foreign</a>
            <a href="/files/schematic.pdf">asset</a>
          </main>
        </body></html>"#
    );
    server.mock(|when, then| {
        when.method(GET).path("/Grove/Light_Sensor/");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(html);
    });

    let fetcher = HttpFetcher::new(&config_for(&server)).expect("fetcher");
    let page = fetcher
        .fetch(&format!("{base}/Grove/Light_Sensor/"))
        .await
        .expect("fetch");

    assert_eq!(page.title, "Grove - Light Sensor");
    assert!(page.text.contains("ambient light intensity"));
    assert_eq!(page.language, Language::En);
    assert_eq!(
        page.links,
        vec![
            format!("{base}/Grove/Connectors/"),
            format!("{base}/XIAO/"),
        ],
        "foreign hosts, assets and short css links must be filtered"
    );
}

#[tokio::test]
async fn detects_chinese_content() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/zh/Grove/");
        then.status(200).body(
            "<html><title>光传感器</title><body><main>\
             <p>光传感器模块可以感知环境光线强度，输出模拟电压信号，适用于各类开发板与传感器扩展场景。</p>\
             </main></body></html>",
        );
    });

    let fetcher = HttpFetcher::new(&config_for(&server)).expect("fetcher");
    let page = fetcher
        .fetch(&format!("{}/zh/Grove/", server.base_url()))
        .await
        .expect("fetch");

    assert_eq!(page.language, Language::Zh);
    assert!(page.text.contains("光传感器模块"));
}

#[tokio::test]
async fn snippet_is_bounded_by_configured_budget() {
    let server = MockServer::start();
    let long_paragraph = "ambient light intensity measurement sentence. ".repeat(100);
    server.mock(|when, then| {
        when.method(GET).path("/long/");
        then.status(200).body(format!(
            "<html><body><main><p>{long_paragraph}</p></main></body></html>"
        ));
    });

    let fetcher = HttpFetcher::new(&config_for(&server)).expect("fetcher");
    let page = fetcher
        .fetch(&format!("{}/long/", server.base_url()))
        .await
        .expect("fetch");

    assert!(page.text.chars().count() <= 800);
}

#[tokio::test]
async fn http_error_status_maps_to_fetch_failed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing/");
        then.status(404);
    });

    let fetcher = HttpFetcher::new(&config_for(&server)).expect("fetcher");
    match fetcher.fetch(&format!("{}/missing/", server.base_url())).await {
        Err(Error::FetchFailed { reason, .. }) => assert!(reason.contains("404")),
        other => panic!("expected FetchFailed, got ok={}", other.is_ok()),
    }
}

#[tokio::test]
async fn urls_outside_the_wiki_are_rejected_before_any_request() {
    let server = MockServer::start();
    let fetcher = HttpFetcher::new(&config_for(&server)).expect("fetcher");
    match fetcher.fetch("https://elsewhere.example.org/page/").await {
        Err(Error::FetchFailed { reason, .. }) => {
            assert!(reason.contains("outside the target wiki"));
        }
        other => panic!("expected FetchFailed, got ok={}", other.is_ok()),
    }
}
