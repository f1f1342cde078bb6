//! Integration tests for the crawler
//!
//! These run the coordinator end-to-end against an in-memory fetcher, and
//! once against a wiremock server through the real HTTP fetcher.

use crate::support::{
    full_quote_html, listing_html, listing_url, quote_html, quote_url, test_config, EventKind,
    StaticFetcher,
};
use earnings_ripple::config::parse_config;
use earnings_ripple::crawler::{crawl, Coordinator, CrawlPhase, FetchError};
use earnings_ripple::{CrawlError, FailureKind, RecordStatus};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn urls(raw: &[String]) -> Vec<Url> {
    raw.iter().map(|u| Url::parse(u).unwrap()).collect()
}

#[tokio::test]
async fn test_three_keys_one_timeout() {
    let seeds = vec![listing_url("2021-03-04")];
    let fetcher = StaticFetcher::new()
        .page(
            &seeds[0],
            listing_html(&[
                ("GME", "GameStop Corp."),
                ("AMC", "AMC Entertainment"),
                ("TSLA", "Tesla, Inc."),
            ]),
        )
        .page(&quote_url("GME"), full_quote_html("GME"))
        .page(&quote_url("AMC"), full_quote_html("AMC"))
        .failing(
            &quote_url("TSLA"),
            FetchError::Timeout {
                url: quote_url("TSLA"),
            },
        );

    let config = test_config(&seeds, "");
    let mut coordinator = Coordinator::new(&config, fetcher).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();

    assert_eq!(coordinator.phase(), CrawlPhase::Quiescent);
    assert_eq!(report.outstanding, 0);
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.tasks.listing.done, 1);
    assert_eq!(report.tasks.detail.done, 2);
    assert_eq!(report.tasks.detail.failed, 1);

    let failed: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.status == RecordStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].ticker, "TSLA");
    assert_eq!(failed[0].company_name.as_deref(), Some("Tesla, Inc."));
    assert_eq!(failed[0].issues[0].kind, FailureKind::Transport);

    let gme = report.record("GME").unwrap();
    assert_eq!(gme.status, RecordStatus::Complete, "{:?}", gme.missing_fields());
    assert_eq!(gme.current_price, Some(1118.18));
    assert_eq!(gme.avg_volume, Some(12_000_000));
    assert_eq!(gme.sector.as_deref(), Some("Technology"));
}

#[tokio::test(start_paused = true)]
async fn test_interleaved_fan_out_overlaps_slow_listing() {
    let seeds = vec![listing_url("fast"), listing_url("slow")];
    let fetcher = StaticFetcher::new()
        .page(&seeds[0], listing_html(&[("GME", "GameStop Corp.")]))
        .slow_page(
            &seeds[1],
            listing_html(&[("AMC", "AMC Entertainment")]),
            Duration::from_secs(5),
        )
        .page(&quote_url("GME"), full_quote_html("GME"))
        .page(&quote_url("AMC"), full_quote_html("AMC"));

    let config = test_config(&seeds, r#"fan-out = "interleaved""#);
    let mut coordinator = Coordinator::new(&config, fetcher.clone()).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();
    assert_eq!(report.records.len(), 2);

    let detail_start = fetcher.position(&quote_url("GME"), EventKind::Start).unwrap();
    let slow_end = fetcher.position(&seeds[1], EventKind::End).unwrap();
    assert!(detail_start < slow_end, "{:?}", fetcher.events());
}

#[tokio::test(start_paused = true)]
async fn test_after_discovery_waits_for_every_listing() {
    let seeds = vec![listing_url("fast"), listing_url("slow")];
    let fetcher = StaticFetcher::new()
        .page(&seeds[0], listing_html(&[("GME", "GameStop Corp.")]))
        .slow_page(
            &seeds[1],
            listing_html(&[("AMC", "AMC Entertainment")]),
            Duration::from_secs(5),
        )
        .page(&quote_url("GME"), full_quote_html("GME"))
        .page(&quote_url("AMC"), full_quote_html("AMC"));

    let config = test_config(&seeds, r#"fan-out = "after-discovery""#);
    let mut coordinator = Coordinator::new(&config, fetcher.clone()).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.outstanding, 0);

    let last_listing_end = seeds
        .iter()
        .filter_map(|s| fetcher.position(s, EventKind::End))
        .max()
        .unwrap();
    for ticker in ["GME", "AMC"] {
        let start = fetcher.position(&quote_url(ticker), EventKind::Start).unwrap();
        assert!(start > last_listing_end, "{:?}", fetcher.events());
    }
}

#[tokio::test]
async fn test_listing_fields_visible_before_detail_fetch() {
    let seeds = vec![listing_url("2021-03-04")];
    let fetcher = StaticFetcher::new()
        .page(&seeds[0], listing_html(&[("GME", "GameStop Corp.")]))
        .page(&quote_url("GME"), full_quote_html("GME"));

    let config = test_config(&seeds, "");
    let mut coordinator = Coordinator::new(&config, fetcher.clone()).unwrap();
    fetcher.probe_store(coordinator.store());
    coordinator.run(urls(&seeds)).await.unwrap();

    let before = fetcher.snapshot_at(&quote_url("GME")).unwrap();
    let gme = before.iter().find(|r| r.ticker == "GME").unwrap();
    assert_eq!(gme.company_name.as_deref(), Some("GameStop Corp."));
    assert_eq!(gme.eps_estimate.as_deref(), Some("0.42"));
    assert_eq!(gme.detail_url.as_deref(), Some(quote_url("GME").as_str()));
    assert!(gme.current_price.is_none());
    assert!(gme.sector.is_none());
}

#[tokio::test]
async fn test_retryable_errors_are_retried() {
    let seeds = vec![listing_url("2021-03-04")];
    let fetcher = StaticFetcher::new()
        .page(
            &seeds[0],
            listing_html(&[("GME", "GameStop Corp."), ("AMC", "AMC Entertainment")]),
        )
        .flaky_page(&quote_url("GME"), full_quote_html("GME"), 2)
        .failing(
            &quote_url("AMC"),
            FetchError::Status {
                url: quote_url("AMC"),
                status: 404,
            },
        );

    let config = test_config(&seeds, "max-retries = 2");
    let mut coordinator = Coordinator::new(&config, fetcher.clone()).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();

    assert_eq!(fetcher.attempts(&quote_url("GME")), 3);
    assert_eq!(fetcher.attempts(&quote_url("AMC")), 1);
    assert_eq!(report.record("GME").unwrap().status, RecordStatus::Complete);
    assert_eq!(report.record("AMC").unwrap().status, RecordStatus::Failed);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let seeds = vec![listing_url("2021-03-04")];
    let fetcher = StaticFetcher::new()
        .page(&seeds[0], listing_html(&[("GME", "GameStop Corp.")]))
        .flaky_page(&quote_url("GME"), full_quote_html("GME"), 5);

    let config = test_config(&seeds, "max-retries = 1");
    let mut coordinator = Coordinator::new(&config, fetcher.clone()).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();

    assert_eq!(fetcher.attempts(&quote_url("GME")), 2);
    let gme = report.record("GME").unwrap();
    assert_eq!(gme.status, RecordStatus::Failed);
    assert!(gme.issues[0].message.contains("503"));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_abandons_in_flight_tasks() {
    let seeds = vec![listing_url("2021-03-04")];
    let fetcher = StaticFetcher::new()
        .page(
            &seeds[0],
            listing_html(&[("GME", "GameStop Corp."), ("AMC", "AMC Entertainment")]),
        )
        .page(&quote_url("GME"), full_quote_html("GME"))
        .slow_page(
            &quote_url("AMC"),
            full_quote_html("AMC"),
            Duration::from_secs(600),
        );

    let config = test_config(&seeds, "crawl-deadline-secs = 2");
    let mut coordinator = Coordinator::new(&config, fetcher).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();

    assert!(report.deadline_hit);
    assert_eq!(report.outstanding, 0);
    assert_eq!(coordinator.work_counter().get(), 0);
    assert_eq!(report.phases.last(), Some(&CrawlPhase::Quiescent));
    assert_eq!(report.tasks.detail.done, 1);
    assert_eq!(report.tasks.detail.abandoned, 1);

    let amc = report.record("AMC").unwrap();
    assert_eq!(amc.status, RecordStatus::Failed);
    assert_eq!(amc.issues[0].kind, FailureKind::Abandoned);
    assert_eq!(amc.company_name.as_deref(), Some("AMC Entertainment"));
    assert_eq!(report.record("GME").unwrap().status, RecordStatus::Complete);
}

#[tokio::test]
async fn test_unknown_key_on_detail_page() {
    let seeds = vec![listing_url("2021-03-04")];
    let fetcher = StaticFetcher::new()
        .page(&seeds[0], listing_html(&[("GME", "GameStop Corp.")]))
        .page(&quote_url("GME"), quote_html("ZZZZ"));

    let config = test_config(&seeds, "");
    let mut coordinator = Coordinator::new(&config, fetcher).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();

    assert_eq!(report.records.len(), 1);
    let correlation: Vec<_> = report.failures_of(FailureKind::Correlation).collect();
    assert_eq!(correlation.len(), 1);
    assert_eq!(correlation[0].key.as_deref(), Some("ZZZZ"));
    assert_eq!(correlation[0].url, quote_url("GME"));

    let gme = report.record("GME").unwrap();
    assert!(gme.issues.is_empty());
    assert!(gme.current_price.is_none());
    assert_eq!(report.tasks.detail.failed, 1);
}

#[tokio::test]
async fn test_follow_up_page_completes_record() {
    let seeds = vec![listing_url("2021-03-04")];
    let follow_up = "https://finance.yahoo.com/quote/GME/insights?p=GME";
    let fetcher = StaticFetcher::new()
        .page(&seeds[0], listing_html(&[("GME", "GameStop Corp.")]))
        .page(&quote_url("GME"), quote_html("GME"))
        .page(follow_up, full_quote_html("GME"));

    let mut config = test_config(&seeds, "");
    config.source.follow_up_path = Some("insights".to_string());
    let mut coordinator = Coordinator::new(&config, fetcher.clone()).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();

    assert_eq!(fetcher.attempts(follow_up), 1);
    assert_eq!(report.tasks.follow_up.done, 1);
    let gme = report.record("GME").unwrap();
    assert_eq!(gme.status, RecordStatus::Complete, "{:?}", gme.missing_fields());
    assert_eq!(gme.sector.as_deref(), Some("Technology"));
}

#[tokio::test]
async fn test_every_seed_unreachable() {
    let seeds = vec![listing_url("a"), listing_url("b")];
    let config = test_config(&seeds, "");
    let mut coordinator = Coordinator::new(&config, StaticFetcher::new()).unwrap();

    match coordinator.run(urls(&seeds)).await {
        Err(CrawlError::SeedUnreachable { source, .. }) => {
            assert_eq!(source.status(), Some(404));
        }
        other => panic!("expected SeedUnreachable, got {:?}", other.map(|r| r.records)),
    }
}

#[tokio::test]
async fn test_one_seed_unreachable_is_not_fatal() {
    let seeds = vec![listing_url("a"), listing_url("b")];
    let fetcher = StaticFetcher::new()
        .page(&seeds[0], listing_html(&[("GME", "GameStop Corp.")]))
        .page(&quote_url("GME"), full_quote_html("GME"));

    let config = test_config(&seeds, "");
    let mut coordinator = Coordinator::new(&config, fetcher).unwrap();
    let report = coordinator.run(urls(&seeds)).await.unwrap();

    assert_eq!(report.tasks.listing.done, 1);
    assert_eq!(report.tasks.listing.failed, 1);
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_randomized_user_agent_per_request() {
    let seeds = vec![listing_url("2021-03-04")];
    let fetcher = StaticFetcher::new()
        .page(
            &seeds[0],
            listing_html(&[("GME", "GameStop Corp."), ("AMC", "AMC Entertainment")]),
        )
        .page(&quote_url("GME"), full_quote_html("GME"))
        .page(&quote_url("AMC"), full_quote_html("AMC"));

    let config = test_config(&seeds, "");
    let mut coordinator = Coordinator::new(&config, fetcher.clone()).unwrap();
    coordinator.run(urls(&seeds)).await.unwrap();

    let agents = fetcher.user_agents();
    assert_eq!(agents.len(), 3);
    for agent in &agents {
        assert!((10..20).contains(&agent.len()), "{}", agent);
        assert!(agent.chars().all(|c| c.is_ascii_alphabetic()));
    }
}

#[tokio::test]
async fn test_full_crawl_against_mock_server() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let domain = Url::parse(&base_url).unwrap().host_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/calendar/earnings"))
        .and(query_param("day", "2021-03-04"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[
            ("GME", "GameStop Corp."),
            ("AMC", "AMC Entertainment"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    for ticker in ["GME", "AMC"] {
        Mock::given(method("GET"))
            .and(path(format!("/quote/{}", ticker)))
            .and(query_param("p", ticker))
            .respond_with(ResponseTemplate::new(200).set_body_string(full_quote_html(ticker)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = parse_config(&format!(
        r#"
[crawler]
max-concurrent-fetches = 4
max-parallelism = 2
min-delay-ms = 10

[fetcher]
allowed-domains = ["{domain}"]
user-agent-policy = "fixed"
user-agent = "EarningsRippleTest/1.0"

[source]
base-url = "{base_url}"
day = "2021-03-04"

[output]
format = "json"
"#
    ))
    .unwrap();

    let report = crawl(config).await.unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.outstanding, 0);
    for record in &report.records {
        assert_eq!(record.status, RecordStatus::Complete, "{:?}", record);
        assert_eq!(
            record.earnings_date,
            chrono::NaiveDate::from_ymd_opt(2021, 3, 4)
        );
    }
    assert_eq!(
        report.record("AMC").unwrap().detail_url.as_deref(),
        Some(format!("{}/quote/AMC?p=AMC", base_url).as_str())
    );
}
