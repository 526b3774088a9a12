//! Full sift runs against a mock quote endpoint

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{fixtures, logging};
use stock_sifter::api::HttpFetcher;
use stock_sifter::blacklist::RowStore;
use stock_sifter::ingestion::run_sift;
use stock_sifter::models::{RecordsBySymbol, SymbolRecord};
use stock_sifter::portfolio::Portfolio;
use stock_sifter::SiftError;

const SYMBOLS: &str = "Symbol,Security Name\nGOOD,Good Corp\nBAD,Bad Corp\nJUNK,Junk Inc\n";

#[test]
fn test_add_records_updates_store_for_each_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixtures::test_config(dir.path(), "http://quotes.test");
    let mut store = RowStore::default();
    let mut portfolio = Portfolio::new("Whole Portfolio", &config);

    let mut records = RecordsBySymbol::new();
    records.insert("NOCAP".to_string(), fixtures::candidate("N/A", "4"));
    records.insert("REAL".to_string(), fixtures::candidate("500M", "10"));
    portfolio.add_records(records, &mut store);

    assert_eq!(portfolio.len(), 1);
    assert_eq!(portfolio.stocks()[0].symbol, "REAL");
    assert_eq!(
        store.records(),
        &[SymbolRecord::new("REAL", 1, 0), SymbolRecord::new("NOCAP", 0, 1)]
    );
}

#[tokio::test]
async fn test_sift_run_writes_snapshot_and_updates_row_store() {
    logging::init_test_logging();
    logging::log_test_step("Running full sift against mock quotes");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"query":{"results":{"quote":[
                {"symbol":"BAD","MarketCapitalization":"N/A","LastTradePriceOnly":"3.00"},
                {"symbol":"GOOD","MarketCapitalization":"500M","LastTradePriceOnly":"10"},
                {"symbol":"EXTRA","MarketCapitalization":"1B","LastTradePriceOnly":"1"}]}}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = fixtures::test_config(dir.path(), &server.uri());
    fixtures::write_file(dir.path(), "stock_symbols.csv", SYMBOLS);
    fixtures::write_file(dir.path(), "symbol_data.csv", "symbol,successes,failures\nJUNK,0,5\n");

    let fetcher = HttpFetcher::new().unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let summary = run_sift(&config, &fetcher, date).await.unwrap();

    logging::log_test_data("Summary", &summary);
    assert_eq!(summary.blacklisted, 1);
    assert_eq!(summary.candidates, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.exported, 1);
    assert_eq!(summary.output_path, dir.path().join("stock_data_2024-05-01.csv"));

    let store = RowStore::load(&config.row_store_path).unwrap();
    assert_eq!(
        store.records(),
        &[
            SymbolRecord::new("JUNK", 0, 5),
            SymbolRecord::new("GOOD", 1, 0),
            SymbolRecord::new("BAD", 0, 1),
        ]
    );

    let snapshot = std::fs::read_to_string(&summary.output_path).unwrap();
    assert_eq!(
        snapshot,
        "Symbol,MarketCapitalization,LastTradePriceOnly,GoogleUrl\n\
         GOOD,500000000,10,https://www.google.com/finance?q=GOOD\n"
    );
}

#[tokio::test]
async fn test_quote_failure_leaves_row_store_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = fixtures::test_config(dir.path(), &server.uri());
    fixtures::write_file(dir.path(), "stock_symbols.csv", SYMBOLS);
    let untouched = "symbol,successes,failures\nGOOD,3,1\n";
    fixtures::write_file(dir.path(), "symbol_data.csv", untouched);

    let fetcher = HttpFetcher::new().unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

    assert!(run_sift(&config, &fetcher, date).await.is_err());
    assert_eq!(std::fs::read_to_string(&config.row_store_path).unwrap(), untouched);
    assert!(!config.snapshot_path(date).exists());
}

#[tokio::test]
async fn test_null_quote_results_leave_row_store_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"query":{"count":0,"results":null}}"#))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = fixtures::test_config(dir.path(), &server.uri());
    fixtures::write_file(dir.path(), "stock_symbols.csv", SYMBOLS);
    let untouched = "symbol,successes,failures\nGOOD,0,2\nBAD,0,2\n";
    fixtures::write_file(dir.path(), "symbol_data.csv", untouched);

    let fetcher = HttpFetcher::new().unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

    let result = run_sift(&config, &fetcher, date).await;
    assert!(matches!(result, Err(SiftError::MissingQuotes { .. })));
    assert_eq!(std::fs::read_to_string(&config.row_store_path).unwrap(), untouched);
    assert!(RowStore::load(&config.row_store_path).unwrap().compute_blacklist(3, 0.2).is_empty());
    assert!(!config.snapshot_path(date).exists());
}
