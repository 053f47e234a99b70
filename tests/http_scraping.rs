//! HTTP transport, crawl policy loading and reconciliation against a local site.

mod common;

use std::time::{Duration, Instant};

use common::{Site, closed_addr, metacritic_page, spawn_site};
use tvratings::config::Config;
use tvratings::pipeline::{Series, enrich};
use tvratings::ratings::{CheckedRatings, RatingRecord};
use tvratings::scraper::policy::AccessPolicy;
use tvratings::scraper::sources::Metacritic;
use tvratings::scraper::transport::{FetchTransport, HttpTransport};
use tvratings::scraper::{MetacriticScraper, Scraper};
use url::Url;

const UA: &str = "tvratings-test/1.0";

fn test_config(base: &str) -> Config {
    Config {
        metacritic_base_url: base.to_string(),
        request_delay: Duration::ZERO,
        http_timeout: Duration::from_secs(5),
        user_agent: UA.to_string(),
        ..Config::default()
    }
}

fn transport(delay: Duration) -> HttpTransport {
    HttpTransport::new(UA, delay, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_success_and_not_found() {
    let (base, _site) = spawn_site(Site::default().page("/ok", "<p>hello</p>")).await;
    let base = Url::parse(&base).unwrap();
    let transport = transport(Duration::ZERO);

    let body = transport.fetch(&base.join("ok").unwrap()).await;
    assert_eq!(body.as_deref(), Some("<p>hello</p>"));
    assert_eq!(transport.fetch(&base.join("missing").unwrap()).await, None);
}

#[tokio::test]
async fn test_fetch_network_failure_is_none() {
    let url = Url::parse(&format!("http://{}/tv/x", closed_addr().await)).unwrap();
    assert_eq!(transport(Duration::ZERO).fetch(&url).await, None);
}

#[tokio::test]
async fn test_politeness_delay_after_success() {
    let (base, _site) = spawn_site(Site::default().page("/ok", "ok")).await;
    let url = Url::parse(&base).unwrap().join("ok").unwrap();
    let transport = transport(Duration::from_millis(200));

    let start = Instant::now();
    assert!(transport.fetch(&url).await.is_some());
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_robots_loaded_from_site() {
    let (base, _site) = spawn_site(
        Site::default().page("/robots.txt", "User-agent: *\nDisallow: /search/\nCrawl-delay: 3\n"),
    )
    .await;
    let client = reqwest::Client::new();
    let policy = AccessPolicy::load(&client, &Url::parse(&base).unwrap()).await;

    assert!(!policy.is_allowed(UA, "/search/the-boys"));
    assert!(policy.is_allowed(UA, "/tv/the-boys"));
    assert_eq!(policy.crawl_delay(UA), Some(Duration::from_secs(3)));
}

#[tokio::test]
async fn test_missing_robots_allows_all() {
    let (base, _site) = spawn_site(Site::default()).await;
    let client = reqwest::Client::new();
    let policy = AccessPolicy::load(&client, &Url::parse(&base).unwrap()).await;
    assert!(policy.is_allowed(UA, "/anything/at/all"));
}

#[tokio::test]
async fn test_unreachable_robots_allows_all() {
    let base = Url::parse(&format!("http://{}/", closed_addr().await)).unwrap();
    let policy = AccessPolicy::load(&reqwest::Client::new(), &base).await;
    assert!(policy.is_allowed(UA, "/tv/the-boys"));
}

#[tokio::test]
async fn test_crawl_delay_raises_request_delay() {
    let site = Site::default().page("/robots.txt", "User-agent: *\nCrawl-delay: 0.5\n");
    let (base, _site) = spawn_site(site).await;

    let scraper = MetacriticScraper::from_config(&test_config(&base))
        .await
        .unwrap();
    assert_eq!(scraper.transport().delay(), Duration::from_millis(500));
}

#[tokio::test]
async fn test_short_crawl_delay_keeps_configured_delay() {
    let site = Site::default().page("/robots.txt", "User-agent: *\nCrawl-delay: 0.5\n");
    let (base, _site) = spawn_site(site).await;

    let config = Config {
        request_delay: Duration::from_secs(2),
        ..test_config(&base)
    };
    let scraper = MetacriticScraper::from_config(&config).await.unwrap();
    assert_eq!(scraper.transport().delay(), Duration::from_secs(2));
}

#[tokio::test]
async fn test_oversized_crawl_delay_does_not_break_construction() {
    let site = Site::default().page(
        "/robots.txt",
        "User-agent: *\nCrawl-delay: 1e30\nDisallow: /tv/secret\n",
    );
    let (base, _site) = spawn_site(site).await;

    let scraper = MetacriticScraper::from_config(&test_config(&base))
        .await
        .unwrap();
    assert_eq!(scraper.transport().delay(), Duration::ZERO);
    assert!(!scraper.policy().is_allowed(UA, "/tv/secret-show"));
}

#[tokio::test]
async fn test_year_mismatch_then_retry_success() {
    let site = Site::default()
        .page("/tv/the-boys", metacritic_page(2020, "6.0", 10))
        .page("/tv/the-boys-2019", metacritic_page(2019, "8.5", 120));
    let (base, site) = spawn_site(site).await;

    let scraper = MetacriticScraper::from_config(&test_config(&base))
        .await
        .unwrap();
    let record = scraper.get_ratings("The Boys", 2019).await;

    assert_eq!(
        record,
        Some(RatingRecord {
            critic_score: Some(8.5),
            critic_count: Some(120),
            user_score: Some(8.1),
            user_count: Some(2048),
            year: Some(2019),
        })
    );
    assert_eq!(
        site.hits(),
        vec!["/robots.txt", "/tv/the-boys", "/tv/the-boys-2019"]
    );
}

#[tokio::test]
async fn test_disallowed_path_is_never_fetched() {
    let site = Site::default()
        .page("/robots.txt", "User-agent: *\nDisallow: /tv/secret\n")
        .page("/tv/secret-show", metacritic_page(2019, "9.0", 5));
    let (base, site) = spawn_site(site).await;

    let scraper = MetacriticScraper::from_config(&test_config(&base))
        .await
        .unwrap();
    assert_eq!(scraper.get_ratings("Secret Show", 2019).await, None);
    assert_eq!(site.hits(), vec!["/robots.txt"]);
}

#[tokio::test]
async fn test_enrich_validates_hits() {
    let site = Site::default()
        .page("/tv/game-of-thrones", metacritic_page(2011, "9.1", 40))
        .page("/tv/old-show", metacritic_page(1800, "5.0", 3));
    let (base, _site) = spawn_site(site).await;

    let source = Metacritic::new(&base).unwrap();
    let scraper = Scraper::new(source, transport(Duration::ZERO), AccessPolicy::allow_all());
    let series = vec![
        Series {
            title: "Game of Thrones".into(),
            year: 2011,
        },
        Series {
            title: "Old Show".into(),
            year: 1800,
        },
        Series {
            title: "Missing".into(),
            year: 2024,
        },
    ];

    let results = enrich(&scraper, &series).await;
    assert_eq!(results.len(), 3);
    assert!(matches!(&results[0], Some(CheckedRatings::Valid(r)) if r.year == 2011));
    assert!(matches!(
        &results[1],
        Some(CheckedRatings::Unvalidated(r)) if r.year == Some(1800)
    ));
    assert!(results[2].is_none());
}
