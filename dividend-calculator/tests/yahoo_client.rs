//! Yahoo client against a mocked finance API.

use dividend_calculator::data::{DataError, FinanceDataSource, YahooFinance};
use dividend_common::config::{CacheConfig, ProviderConfig};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, cache_dir: &std::path::Path) -> YahooFinance {
    let provider = ProviderConfig {
        quote_base_url: server.uri(),
        chart_base_url: server.uri(),
        user_agent: "divcalc-test".into(),
        timeout_secs: 5,
    };
    let cache = CacheConfig {
        dir: cache_dir.to_path_buf(),
        ttl_secs: 86_400,
    };
    YahooFinance::new(&provider, &cache)
}

#[tokio::test]
async fn test_ticker_info_is_cached_on_disk() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/AAPL"))
        .and(header("user-agent", "divcalc-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {"result": [{"quoteType": {"symbol": "AAPL"}}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let yahoo = client(&server, dir.path());
    for _ in 0..2 {
        let info = yahoo.get_ticker_info("AAPL").await.unwrap();
        assert_eq!(info["quoteSummary"]["result"][0]["quoteType"]["symbol"], "AAPL");
    }

    // a second client over the same directory reuses the file too
    let again = client(&server, dir.path());
    again.get_ticker_info("AAPL").await.unwrap();

    assert!(dir.path().join("ticker_AAPL.json").is_file());
}

#[tokio::test]
async fn test_non_200_is_transport_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server, dir.path())
        .get_ticker_info("NOPE")
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Transport { status: 404, .. }));
    assert!(!dir.path().join("ticker_NOPE.json").exists());
}

#[tokio::test]
async fn test_dividends_in_major_units() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/BP.L"))
        .and(query_param("events", "div"))
        .and(query_param("interval", "1mo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {"result": [{
                "meta": {"currency": "GBp"},
                "events": {"dividends": {
                    "1675209600": {"amount": 5.46, "date": 1675209600}
                }}
            }]}
        })))
        .mount(&server)
        .await;

    let dividends = client(&server, dir.path())
        .get_historic_dividends("BP.L")
        .await
        .unwrap();

    assert_eq!(dividends.len(), 1);
    assert!((dividends[0].amount - 0.0546).abs() < 1e-9);
    assert_eq!(dividends[0].datetime, "01-02-2023");
    assert!(dir.path().join("dividends_BP.L.json").is_file());
}

#[tokio::test]
async fn test_no_dividend_events_is_missing_data() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/TSLA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {"result": [{"meta": {"currency": "USD"}}]}
        })))
        .mount(&server)
        .await;

    let err = client(&server, dir.path())
        .get_historic_dividends("TSLA")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Company TSLA is not paying dividends");
}

#[tokio::test]
async fn test_prices_keyed_by_interval() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/KO"))
        .and(query_param("range", "max"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {"result": [{
                "timestamp": [1672531200],
                "indicators": {"quote": [{
                    "open": [60.0], "close": [61.0], "high": [62.0], "low": [59.0], "volume": [100]
                }]}
            }]}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let yahoo = client(&server, dir.path());
    let monthly = yahoo.get_historic_prices("KO", "1mo").await.unwrap();
    yahoo.get_historic_prices("KO", "1mo").await.unwrap();
    yahoo.get_historic_prices("KO", "1d").await.unwrap();

    assert_eq!(monthly[0].close, Some(61.0));
    assert!(dir.path().join("prices_KO_1mo.json").is_file());
    assert!(dir.path().join("prices_KO_1d.json").is_file());
}

#[tokio::test]
async fn test_search_is_not_cached() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/finance/search"))
        .and(query_param("q", "coca cola"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quotes": [{"symbol": "KO", "shortname": "Coca-Cola Company (The)"}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let yahoo = client(&server, dir.path());
    for _ in 0..2 {
        let quotes = yahoo.search_ticker("coca cola").await.unwrap();
        assert_eq!(quotes[0]["symbol"], "KO");
    }
}
