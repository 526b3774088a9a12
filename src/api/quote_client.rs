use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{ApiRateLimiter, UrlFetcher};
use crate::error::{Result, SiftError};
use crate::models::{Config, FieldValue, Fields, RecordsBySymbol};

const QUOTE_ESCAPE: &str = "%22";
const COMMA_ESCAPE: &str = "%2C";

/// `{query: {results: {quote: ...}}}` envelope of the quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    query: QuoteQuery,
}

#[derive(Debug, Deserialize)]
struct QuoteQuery {
    #[serde(default)]
    results: Option<QuoteResults>,
}

#[derive(Debug, Deserialize)]
struct QuoteResults {
    quote: QuotePayload,
}

/// A batch of one symbol comes back as a bare object rather than a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuotePayload {
    Many(Vec<Map<String, Value>>),
    One(Map<String, Value>),
}

impl QuotePayload {
    fn into_records(self) -> Vec<Map<String, Value>> {
        match self {
            QuotePayload::Many(records) => records,
            QuotePayload::One(record) => vec![record],
        }
    }
}

/// Build one query URL per batch of at most `batch_size` symbols, in order.
pub fn form_quote_urls_in_batches(symbols: &[String], batch_size: usize, template: &str) -> Vec<String> {
    symbols
        .chunks(batch_size.max(1))
        .map(|batch| {
            let quoted: Vec<String> = batch
                .iter()
                .map(|symbol| {
                    let encoded: String = url::form_urlencoded::byte_serialize(symbol.as_bytes()).collect();
                    format!("{}{}{}", QUOTE_ESCAPE, encoded, QUOTE_ESCAPE)
                })
                .collect();
            template.replace("{symbols}", &quoted.join(COMMA_ESCAPE))
        })
        .collect()
}

/// Decode a quote response into per-symbol fields.
///
/// `None` when the response carries `results: null`.
pub fn decode_quotes(body: &[u8], symbol_field: &str) -> Result<Option<Vec<(String, Fields)>>> {
    let envelope: QuoteEnvelope = serde_json::from_slice(body)?;
    let Some(results) = envelope.query.results else {
        return Ok(None);
    };

    let mut quotes = Vec::new();
    for record in results.quote.into_records() {
        let symbol = match record.get(symbol_field).and_then(Value::as_str) {
            Some(symbol) => symbol.to_string(),
            None => {
                warn!("⚠️  Quote without '{}' field skipped", symbol_field);
                continue;
            }
        };
        let fields = record
            .into_iter()
            .map(|(key, value)| (key, json_to_field(value)))
            .collect();
        quotes.push((symbol, fields));
    }

    Ok(Some(quotes))
}

fn json_to_field(value: Value) -> FieldValue {
    match value {
        Value::String(text) => FieldValue::Text(text),
        Value::Number(number) => number
            .as_f64()
            .map(FieldValue::Number)
            .unwrap_or_else(|| FieldValue::Text(number.to_string())),
        Value::Null => FieldValue::Text(String::new()),
        other => FieldValue::Text(other.to_string()),
    }
}

/// Batched client for the JSON quote endpoint
pub struct QuoteClient<'a, F: UrlFetcher + ?Sized> {
    fetcher: &'a F,
    url_template: String,
    batch_size: usize,
    symbol_field: String,
    rate_limiter: ApiRateLimiter,
}

impl<'a, F: UrlFetcher + ?Sized> QuoteClient<'a, F> {
    pub fn new(fetcher: &'a F, config: &Config) -> Self {
        Self {
            fetcher,
            url_template: config.quote_url_template.clone(),
            batch_size: config.batch_size,
            symbol_field: config.field_keys.quote_symbol.clone(),
            rate_limiter: ApiRateLimiter::new(config.quote_delay),
        }
    }

    /// Fetch quotes for `symbols`, one request per batch.
    ///
    /// Any failed request, or a batch answered with null results, aborts the
    /// whole fetch.
    pub async fn batch_quote_fetch(&self, symbols: &[String]) -> Result<RecordsBySymbol> {
        let urls = form_quote_urls_in_batches(symbols, self.batch_size, &self.url_template);
        let mut symbol_to_data = RecordsBySymbol::new();

        info!("🌐 Fetching quotes for {} symbols in {} batches", symbols.len(), urls.len());

        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                self.rate_limiter.wait().await;
            }

            let body = self.fetcher.fetch_url(url).await?;
            let quotes = decode_quotes(&body, &self.symbol_field)?
                .ok_or_else(|| SiftError::MissingQuotes { url: url.clone() })?;
            if quotes.is_empty() {
                warn!("⚠️  Batch {} of {} returned no quotes", index + 1, urls.len());
            }
            symbol_to_data.extend(quotes);
        }

        info!("✅ Received quotes for {} symbols", symbol_to_data.len());
        Ok(symbol_to_data)
    }
}
