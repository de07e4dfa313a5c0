use std::sync::Arc;

use tickerwatch_core::{
    BatchEntry, ClientConfig, FetchErrorKind, HttpError, HttpQuoteService, HttpResponse,
    QuoteService, StubHttpClient, Symbol,
};

const BASE_URL: &str = "https://quotes.example.test/api/";

fn service() -> (Arc<StubHttpClient>, HttpQuoteService) {
    let http = Arc::new(StubHttpClient::new());
    let config = ClientConfig::new(BASE_URL)
        .expect("valid base url")
        .with_timeout_ms(2_500);
    let service = HttpQuoteService::new(config, http.clone());
    (http, service)
}

fn symbol(value: &str) -> Symbol {
    Symbol::parse(value).expect("valid symbol")
}

fn snapshot(symbol: &str, price: f64) -> String {
    format!(
        r#"{{"company":{{"symbol":"{symbol}"}},"market":{{"currentPrice":{price},"previousClose":null}}}}"#
    )
}

struct StatusCase {
    name: &'static str,
    reply: Result<HttpResponse, HttpError>,
    kind: FetchErrorKind,
    status: Option<u16>,
    retryable: bool,
}

fn status_cases() -> Vec<StatusCase> {
    vec![
        StatusCase {
            name: "transport failure",
            reply: Err(HttpError::new("connection refused")),
            kind: FetchErrorKind::Network,
            status: None,
            retryable: true,
        },
        StatusCase {
            name: "5xx without body",
            reply: Ok(HttpResponse::new(502, "Bad Gateway")),
            kind: FetchErrorKind::Network,
            status: Some(502),
            retryable: true,
        },
        StatusCase {
            name: "rate limited",
            reply: Ok(HttpResponse::new(429, r#"{"message":"slow down"}"#)),
            kind: FetchErrorKind::Api,
            status: Some(429),
            retryable: true,
        },
        StatusCase {
            name: "bad request",
            reply: Ok(HttpResponse::new(400, r#"{"error":"bad symbol"}"#)),
            kind: FetchErrorKind::Api,
            status: Some(400),
            retryable: false,
        },
        StatusCase {
            name: "unknown symbol",
            reply: Ok(HttpResponse::new(404, r#"{"error":"Not found"}"#)),
            kind: FetchErrorKind::NotFound,
            status: None,
            retryable: false,
        },
        StatusCase {
            name: "html on success",
            reply: Ok(HttpResponse::ok_json("<html></html>")),
            kind: FetchErrorKind::Parse,
            status: None,
            retryable: false,
        },
    ]
}

#[tokio::test]
async fn ticker_errors_follow_the_taxonomy() {
    for case in status_cases() {
        let (http, service) = service();
        match case.reply {
            Ok(response) => http.respond("/ticker?id=AAPL", response),
            Err(error) => http.fail("/ticker?id=AAPL", error),
        }

        let error = service
            .ticker(&symbol("AAPL"))
            .await
            .expect_err(case.name);

        assert_eq!(error.kind(), case.kind, "{}: kind", case.name);
        assert_eq!(error.status(), case.status, "{}: status", case.name);
        assert_eq!(error.retryable(), case.retryable, "{}: retryable", case.name);
    }
}

#[tokio::test]
async fn ticker_request_carries_headers_and_timeout() {
    let (http, service) = service();
    http.respond_json("/ticker?id=AAPL", snapshot("AAPL", 190.0));

    service.ticker(&symbol("AAPL")).await.expect("snapshot");

    let request = &http.requests()[0];
    assert_eq!(request.url, "https://quotes.example.test/api/ticker?id=AAPL");
    assert_eq!(request.timeout_ms, 2_500);
    assert_eq!(
        request.headers.get("accept").map(String::as_str),
        Some("application/json")
    );
    assert!(request.headers.contains_key("user-agent"));
}

#[tokio::test]
async fn ticker_accepts_bare_and_keyed_payloads() {
    let (http, service) = service();
    http.respond_json("/ticker?id=AAPL", snapshot("AAPL", 190.0));
    http.respond_json(
        "/ticker?id=MSFT",
        format!(r#"{{"MSFT":{}}}"#, snapshot("MSFT", 410.0)),
    );

    let aapl = service.ticker(&symbol("AAPL")).await.expect("bare");
    let msft = service.ticker(&symbol("MSFT")).await.expect("keyed");

    assert_eq!(aapl.market.current_price, Some(190.0));
    assert_eq!(aapl.market.previous_close, None);
    assert_eq!(msft.symbol().as_str(), "MSFT");
}

#[tokio::test]
async fn index_symbols_are_url_encoded() {
    let (http, service) = service();
    http.respond_json("/ticker?id=%5EGSPC", snapshot("^GSPC", 5_000.0));

    service.ticker(&symbol("^gspc")).await.expect("index snapshot");

    assert_eq!(
        http.request_urls(),
        vec!["https://quotes.example.test/api/ticker?id=%5EGSPC"]
    );
}

#[tokio::test]
async fn batch_joins_symbols_and_classifies_entries() {
    let (http, service) = service();
    http.respond_json(
        "/tickers?symbols=AAPL,MSFT,TSLA",
        format!(
            r#"{{"AAPL":{{"error":"rate limited"}},"MSFT":{},"TSLA":"n/a"}}"#,
            snapshot("MSFT", 410.0)
        ),
    );

    let batch = service
        .tickers(&[symbol("AAPL"), symbol("MSFT"), symbol("TSLA")])
        .await
        .expect("batch");

    assert_eq!(batch.len(), 3);
    assert_eq!(
        batch.get(&symbol("AAPL")),
        Some(&BatchEntry::Error(String::from("rate limited")))
    );
    assert!(matches!(
        batch.get(&symbol("MSFT")),
        Some(BatchEntry::Snapshot(_))
    ));
    assert!(matches!(
        batch.get(&symbol("TSLA")),
        Some(BatchEntry::Malformed(_))
    ));
}

#[tokio::test]
async fn empty_batch_is_rejected_without_a_request() {
    let (http, service) = service();

    let error = service.tickers(&[]).await.expect_err("empty batch");

    assert_eq!(error.kind(), FetchErrorKind::InvalidRequest);
    assert_eq!(http.request_count(), 0);
}

#[tokio::test]
async fn history_reads_the_symbol_cell() {
    let (http, service) = service();
    http.respond_json(
        "/history?id=AAPL&range=1W",
        r#"{"AAPL":{"data":[{"timestamp":"2025-11-10T00:00:00Z","open":1,"high":2,"low":0.5,"close":1.5,"volume":10}],"cachedAt":1731196800}}"#,
    );

    let series = service
        .history(&symbol("AAPL"), &"1w".parse().expect("valid range"))
        .await
        .expect("series");

    assert_eq!(series.points.len(), 1);
    assert_eq!(series.points[0].close, 1.5);
    assert_eq!(series.cached_at, Some(1_731_196_800.0));
}

#[tokio::test]
async fn history_error_marker_is_an_api_error() {
    let (http, service) = service();
    http.respond_json(
        "/history?id=AAPL&range=5Y",
        r#"{"AAPL":{"error":"range not available"}}"#,
    );

    let error = service
        .history(&symbol("AAPL"), &"5Y".parse().expect("valid range"))
        .await
        .expect_err("flagged");

    assert_eq!(error.kind(), FetchErrorKind::Api);
    assert_eq!(error.message(), "range not available");
}
