use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Failures while reading configuration from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("invalid market data url {url:?}: {reason}")]
    Url { url: String, reason: String },
}

/// Failures while talking to the market data service.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The service answered with an error payload (unknown ticker etc).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Network failure after the retry budget ran out.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The body was not the dataset shape we expect.
    #[error("could not decode dataset: {0}")]
    Decode(String),

    #[error("invalid market data url: {0}")]
    Url(String),

    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failures while reshaping a dataset into a price series.
#[derive(Error, Debug, PartialEq)]
pub enum SeriesError {
    #[error("dataset has no Date column")]
    MissingDateColumn,

    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("row {row}: bad date {value:?}")]
    BadDate { row: usize, value: String },

    #[error("row {row}, column {column:?}: not a number")]
    BadNumber { row: usize, column: String },

    #[error("duplicate date {0}")]
    DuplicateDate(chrono::NaiveDate),
}

#[derive(Error, Debug, PartialEq)]
pub enum ChartError {
    #[error("dataset has no {0:?} column")]
    MissingColumn(String),

    #[error("could not encode chart: {0}")]
    Encode(String),
}

/// Top level error for anything that can go wrong while serving a request.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Fetch(_) | AppError::Series(_) => StatusCode::BAD_GATEWAY,
            AppError::Chart(_) | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("request failed: {self}");
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
