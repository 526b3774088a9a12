//! Batched quote fetching against a mock quote endpoint

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{fixtures, logging};
use stock_sifter::api::{HttpFetcher, QuoteClient};
use stock_sifter::models::FieldValue;
use stock_sifter::SiftError;

#[tokio::test]
async fn test_batches_hit_endpoint_with_quoted_symbols() {
    logging::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quotes"))
        .and(query_param("s", "\"AAA\",\"BBB\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"query":{"count":2,"results":{"quote":[
                {"symbol":"AAA","LastTradePriceOnly":"1.5"},
                {"symbol":"BBB","LastTradePriceOnly":"2.5"}]}}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quotes"))
        .and(query_param("s", "\"CCC\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"query":{"count":1,"results":{"quote":{"symbol":"CCC","LastTradePriceOnly":"3.5"}}}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = fixtures::test_config(dir.path(), &server.uri());
    config.batch_size = 2;

    let fetcher = HttpFetcher::new().unwrap();
    let quotes = QuoteClient::new(&fetcher, &config)
        .batch_quote_fetch(&fixtures::strings(&["AAA", "BBB", "CCC"]))
        .await
        .unwrap();

    logging::log_test_data("Quotes", &quotes);
    assert_eq!(quotes.len(), 3);
    assert_eq!(
        quotes["CCC"]["LastTradePriceOnly"],
        FieldValue::Text("3.5".to_string())
    );
}

#[tokio::test]
async fn test_server_error_aborts_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = fixtures::test_config(dir.path(), &server.uri());

    let fetcher = HttpFetcher::new().unwrap();
    let result = QuoteClient::new(&fetcher, &config)
        .batch_quote_fetch(&fixtures::strings(&["AAA"]))
        .await;

    assert!(matches!(result, Err(SiftError::HttpStatus { status: 500, .. })));
}
