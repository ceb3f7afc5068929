use std::{future::Future, time::Duration};

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::{config::MarketConfig, error::FetchError, models::Ticker};

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// One dataset as returned by `/api/v1/datasets/WIKI/{ticker}.json`.
///
/// Only the parts we use are kept; rows stay as raw json values and are
/// reshaped by [`PriceSeries::from_dataset`](crate::series::PriceSeries::from_dataset).
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub column_names: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

/// Anything that can hand us a dataset for a ticker.
pub trait MarketData {
    fn fetch(&self, ticker: &Ticker) -> impl Future<Output = Result<Dataset, FetchError>>;
}

/// Http client for the Quandl-style dataset API.
#[derive(Clone)]
pub struct QuandlClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    max_attempts: u32,
}

impl QuandlClient {
    pub fn new(config: &MarketConfig) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|err| FetchError::Url(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::Url(format!("{base_url} cannot be a base url")));
        }

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(QuandlClient {
            http,
            base_url,
            api_key: config.api_key.clone(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Builds the dataset url from path segments, so the ticker is always
    /// percent-encoded as a single segment.
    pub fn dataset_url(&self, ticker: &Ticker) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Url(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1", "datasets", "WIKI"])
            .push(&format!("{}.json", ticker.as_str()));
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("api_key", key);
        }
        Ok(url)
    }

    /// Sends the GET, retrying transport failures up to `max_attempts` times.
    async fn get_with_retry(&self, url: &Url) -> Result<(reqwest::StatusCode, String), FetchError> {
        let mut attempt = 1;
        loop {
            let result = async {
                let response = self.http.get(url.clone()).send().await?;
                let status = response.status();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>((status, body))
            }
            .await;

            match result {
                Ok(pair) => return Ok(pair),
                Err(err) if attempt < self.max_attempts => {
                    log::warn!(
                        "attempt {attempt}/{} for {} failed: {err}; retrying",
                        self.max_attempts,
                        redact(url)
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(FetchError::Transport {
                        attempts: attempt,
                        source: err,
                    })
                }
            }
        }
    }
}

impl MarketData for QuandlClient {
    async fn fetch(&self, ticker: &Ticker) -> Result<Dataset, FetchError> {
        let url = self.dataset_url(ticker)?;
        log::info!("fetching dataset for {ticker} from {}", redact(&url));

        let (status, body) = self.get_with_retry(&url).await?;
        let dataset = parse_dataset(status, &body)?;

        log::info!(
            "fetched {} rows x {} columns for {ticker}",
            dataset.data.len(),
            dataset.column_names.len()
        );
        Ok(dataset)
    }
}

/// Turns a response into a dataset. Error payloads win over the status code.
pub fn parse_dataset(status: reqwest::StatusCode, body: &str) -> Result<Dataset, FetchError> {
    let json: Value = serde_json::from_str(body).map_err(|err| {
        if status.is_success() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Upstream(format!("HTTP {status}"))
        }
    })?;

    if let Some(error) = json.get("error") {
        let message = match error {
            Value::String(msg) => msg.clone(),
            other => other.to_string(),
        };
        log::warn!("upstream reported an error: {message}");
        return Err(FetchError::Upstream(message));
    }

    if !status.is_success() {
        return Err(FetchError::Upstream(format!("HTTP {status}")));
    }

    serde_json::from_value(json).map_err(|err| FetchError::Decode(err.to_string()))
}

// Keep api keys out of the logs.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
