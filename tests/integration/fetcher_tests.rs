//! HTTP fetcher tests against a wiremock server

use earnings_ripple::config::{parse_config, FetcherConfig, UserAgentPolicy};
use earnings_ripple::crawler::{FetchError, FetchRequest, HttpFetcher, PageFetcher, UserAgentSource};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_config(server: &MockServer, max_body_bytes: u64) -> FetcherConfig {
    let domain = Url::parse(&server.uri())
        .unwrap()
        .host_str()
        .unwrap()
        .to_string();
    FetcherConfig {
        allowed_domains: vec![domain],
        max_body_bytes,
        ..FetcherConfig::default()
    }
}

fn request(server: &MockServer, route: &str, user_agent: &str) -> FetchRequest {
    FetchRequest {
        url: Url::parse(&format!("{}{}", server.uri(), route)).unwrap(),
        user_agent: user_agent.to_string(),
    }
}

#[tokio::test]
async fn test_fetch_success_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/GME"))
        .and(header("user-agent", "EarningsRippleTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>GME</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(&server, 0)).unwrap();
    let document = fetcher
        .fetch(request(&server, "/quote/GME?p=GME", "EarningsRippleTest/1.0"))
        .await
        .unwrap();

    assert_eq!(document.status, 200);
    assert_eq!(document.body(), "<html>GME</html>");
    assert_eq!(document.url.path(), "/quote/GME");
}

#[tokio::test]
async fn test_fetch_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(&server, 0)).unwrap();
    let err = fetcher
        .fetch(request(&server, "/quote/NOPE", "test"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_fetch_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(&server, 0)).unwrap();
    let err = fetcher
        .fetch(request(&server, "/calendar/earnings", "test"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_disallowed_domain_never_requested() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = FetcherConfig {
        allowed_domains: vec!["finance.yahoo.com".to_string()],
        ..FetcherConfig::default()
    };
    let fetcher = HttpFetcher::new(&config).unwrap();
    let err = fetcher
        .fetch(request(&server, "/quote/GME", "test"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::DomainNotAllowed { .. }));
}

#[tokio::test]
async fn test_body_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/small"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(&server, 1024)).unwrap();

    let err = fetcher
        .fetch(request(&server, "/big", "test"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FetchError::BodyTooLarge {
            url: format!("{}/big", server.uri()),
            limit: 1024,
        }
    );

    let small = fetcher.fetch(request(&server, "/small", "test")).await.unwrap();
    assert_eq!(small.body(), "ok");
}

#[tokio::test]
async fn test_redirect_to_other_domain_rejected() {
    let server = MockServer::start().await;
    let port = Url::parse(&server.uri()).unwrap().port().unwrap();
    let offsite = format!("http://localhost:{}/offsite", port);
    Mock::given(method("GET"))
        .and(path("/quote/GME"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", offsite.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/offsite"))
        .respond_with(ResponseTemplate::new(200).set_body_string("offsite body"))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(&server, 0)).unwrap();
    let err = fetcher
        .fetch(request(&server, "/quote/GME", "test"))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::DomainNotAllowed { url: offsite });
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_redirect_within_domain_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/GME"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/quote/GME/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quote/GME/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(&server, 0)).unwrap();
    let document = fetcher
        .fetch(request(&server, "/quote/GME", "test"))
        .await
        .unwrap();

    assert_eq!(document.url.path(), "/quote/GME/");
    assert_eq!(document.body(), "moved");
}

/// Serves one chunked response with no Content-Length header
async fn chunked_server(chunks: usize, chunk_size: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n")
            .await;
        let chunk = format!("{:x}\r\n{}\r\n", chunk_size, "x".repeat(chunk_size));
        for _ in 0..chunks {
            if socket.write_all(chunk.as_bytes()).await.is_err() {
                return;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_body_cap_without_content_length() {
    let base = chunked_server(8, 512).await;
    let config = FetcherConfig {
        allowed_domains: vec!["127.0.0.1".to_string()],
        max_body_bytes: 1024,
        ..FetcherConfig::default()
    };
    let fetcher = HttpFetcher::new(&config).unwrap();

    let url = Url::parse(&format!("{}/big", base)).unwrap();
    let err = fetcher
        .fetch(FetchRequest {
            url: url.clone(),
            user_agent: "test".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FetchError::BodyTooLarge {
            url: url.to_string(),
            limit: 1024,
        }
    );
}

#[tokio::test]
async fn test_randomized_user_agent_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header_regex("user-agent", "^[A-Za-z]{10,19}$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(3)
        .mount(&server)
        .await;

    let config = FetcherConfig {
        user_agent_policy: UserAgentPolicy::Randomized,
        ..fetcher_config(&server, 0)
    };
    let agents = UserAgentSource::from_config(&config);
    let fetcher = HttpFetcher::new(&config).unwrap();

    for _ in 0..3 {
        let agent = agents.next();
        fetcher
            .fetch(request(&server, "/quote/GME", &agent))
            .await
            .unwrap();
    }
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("earnings.toml");
    std::fs::write(
        &path,
        r#"
[crawler]
max-concurrent-fetches = 4
max-parallelism = 1
min-delay-ms = 10000

[fetcher]
allowed-domains = ["finance.yahoo.com"]
user-agent-policy = "randomized"

[source]
base-url = "https://finance.yahoo.com"
from = "2021-02-28"
to = "2021-03-06"
day = "2021-03-04"
"#,
    )
    .unwrap();

    let (config, hash) = earnings_ripple::config::load_config_with_hash(&path).unwrap();
    assert_eq!(hash.len(), 64);
    assert_eq!(config.fetcher.user_agent_policy, UserAgentPolicy::Randomized);

    let seeds = earnings_ripple::config::seed_urls(&config.source).unwrap();
    assert_eq!(
        seeds[0].as_str(),
        "https://finance.yahoo.com/calendar/earnings?from=2021-02-28&to=2021-03-06&day=2021-03-04"
    );

    assert!(parse_config("[crawler]\nmax-concurrent-fetches = 0").is_err());
}
