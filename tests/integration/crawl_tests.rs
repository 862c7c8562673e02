//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end: seeding, politeness, fetching, extraction,
//! filtering, frontier persistence and report files.

use ripple_scope::config::{Config, CrawlerConfig, OutputConfig, ScopeConfig, UserAgentConfig};
use ripple_scope::crawler::Crawler;
use ripple_scope::frontier::FrontierMode;
use ripple_scope::state::UrlStatus;
use ripple_scope::url::TrapRules;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY_TEXT: &str = "Crawler crawler crawler research group publishes papers about \
    information retrieval, search engines, web archives, text mining and link analysis \
    for students and faculty across the school.";

/// Creates a test configuration scoped to the mock server's host
fn create_test_config(host: &str, seed: String, dir: &Path, workers: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers,
            politeness_delay_ms: 100,
            idle_poll_ms: 10,
            request_timeout_secs: 5,
            max_body_bytes: 1024 * 1024,
            min_page_words: 20,
            cache_server: None,
        },
        scope: ScopeConfig {
            root_domains: vec![host.to_string()],
            institution_domain: host.to_string(),
            seeds: vec![seed],
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: dir.join("frontier.db").display().to_string(),
            reports_dir: dir.join("reports").display().to_string(),
            flush_every: 50,
        },
        filter: TrapRules::default(),
    }
}

fn html(links: &str) -> String {
    format!(
        "<html><head><title>Test</title><script>var hidden = 1;</script></head>\
         <body><p>{}</p>{}</body></html>",
        BODY_TEXT, links
    )
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Mounts a small site: a home page linking to two pages, a PDF, a
/// calendar trap, a missing page and an offsite link
async fn mount_site(server: &MockServer) {
    mount_page(
        server,
        "/",
        html(
            r#"<a href="/research">Research</a>
               <a href="/people#staff">People</a>
               <a href="/people?utm_source=home">People again</a>
               <a href="/papers/survey.pdf">Survey</a>
               <a href="/events/calendar/2024-05-01/">Calendar</a>
               <a href="/missing">Missing</a>
               <a href="https://offsite.example.org/">Elsewhere</a>"#,
        ),
    )
    .await;
    mount_page(server, "/research", html(r#"<a href="/">Home</a>"#)).await;
    mount_page(server, "/people", html(r#"<a href="/research">Research</a>"#)).await;
}

fn host_of(server: &MockServer) -> String {
    url::Url::parse(&server.uri())
        .expect("Failed to parse mock server URI")
        .host_str()
        .expect("Mock server URI has no host")
        .to_string()
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let host = host_of(&mock_server);
    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(&host, seed.clone(), dir.path(), 2);

    let crawler = Crawler::new(config, "test-hash", FrontierMode::Fresh).unwrap();
    let summary = crawler.crawl().await.unwrap();

    // Home, research, people and the 404
    assert_eq!(summary.pages_processed, 4);
    assert_eq!(summary.failed_workers, 0);
    assert_eq!(summary.frontier.done, 4);
    assert_eq!(summary.frontier.pending, 0);
    assert_eq!(summary.frontier.reserved, 0);

    let frontier = crawler.frontier();
    assert_eq!(
        frontier.status_of(&format!("{}/people", mock_server.uri())).unwrap(),
        Some(UrlStatus::Done)
    );
    assert_eq!(
        frontier.status_of("https://offsite.example.org/").unwrap(),
        None
    );

    // Traps and non-HTML links are never requested
    let requested: Vec<String> = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert!(!requested.iter().any(|p| p.ends_with(".pdf")));
    assert!(!requested.iter().any(|p| p.contains("calendar")));
    assert_eq!(
        requested.iter().filter(|p| p.as_str() == "/people").count(),
        1,
        "canonical duplicates were fetched twice"
    );

    let reports = dir.path().join("reports");
    assert_eq!(
        fs::read_to_string(reports.join("unique_pages.txt")).unwrap(),
        "count: 3\n"
    );
    assert_eq!(
        fs::read_to_string(reports.join("subdomains.txt")).unwrap(),
        format!("{}, 3\n", host)
    );
    let top_words = fs::read_to_string(reports.join("top_50_words.txt")).unwrap();
    assert_eq!(top_words.lines().next(), Some("crawler, 9"));
    assert!(!top_words.contains("hidden"));
    assert!(!top_words.lines().any(|line| line.starts_with("the,")));

    let longest = fs::read_to_string(reports.join("longest_page.txt")).unwrap();
    assert!(longest.starts_with(&format!("url: {}", seed)));
}

#[tokio::test]
async fn test_resume_after_completed_crawl_does_no_work() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let host = host_of(&mock_server);
    let seed = format!("{}/", mock_server.uri());

    let first = Crawler::new(
        create_test_config(&host, seed.clone(), dir.path(), 1),
        "test-hash",
        FrontierMode::Fresh,
    )
    .unwrap();
    assert_eq!(first.crawl().await.unwrap().pages_processed, 4);
    drop(first);

    let requests_after_first = mock_server.received_requests().await.unwrap().len();

    let resumed = Crawler::new(
        create_test_config(&host, seed, dir.path(), 1),
        "test-hash",
        FrontierMode::Resume,
    )
    .unwrap();
    let summary = resumed.crawl().await.unwrap();

    assert_eq!(summary.pages_processed, 0);
    assert_eq!(summary.frontier.done, 4);
    assert_eq!(
        mock_server.received_requests().await.unwrap().len(),
        requests_after_first
    );
}

#[tokio::test]
async fn test_fresh_crawl_starts_over() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let host = host_of(&mock_server);
    let seed = format!("{}/", mock_server.uri());

    for _ in 0..2 {
        let crawler = Crawler::new(
            create_test_config(&host, seed.clone(), dir.path(), 1),
            "test-hash",
            FrontierMode::Fresh,
        )
        .unwrap();
        let summary = crawler.crawl().await.unwrap();
        assert_eq!(summary.pages_processed, 4);
    }
}

#[tokio::test]
async fn test_single_and_multiple_workers_agree() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let host = host_of(&mock_server);
    let seed = format!("{}/", mock_server.uri());

    for workers in [1, 3] {
        let dir = TempDir::new().unwrap();
        let crawler = Crawler::new(
            create_test_config(&host, seed.clone(), dir.path(), workers),
            "test-hash",
            FrontierMode::Fresh,
        )
        .unwrap();
        let summary = crawler.crawl().await.unwrap();

        assert_eq!(summary.pages_processed, 4, "{} workers", workers);
        assert_eq!(summary.failed_workers, 0, "{} workers", workers);
        assert_eq!(summary.frontier.done, 4, "{} workers", workers);
        assert_eq!(summary.frontier.reserved, 0, "{} workers", workers);
        assert_eq!(
            fs::read_to_string(dir.path().join("reports").join("unique_pages.txt")).unwrap(),
            "count: 3\n",
            "{} workers",
            workers
        );
    }
}
