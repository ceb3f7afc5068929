use std::{collections::BTreeSet, fmt};

use serde::Deserialize;

use crate::error::AppError;

// Data types to receive and structure user input

const MAX_TICKER_LEN: usize = 12;

/// A price series the user can ask to plot.
///
/// Variant order is the selection order used by the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Closing,
    Opening,
    AdjustedClosing,
    AdjustedOpening,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Closing,
        Field::Opening,
        Field::AdjustedClosing,
        Field::AdjustedOpening,
    ];

    /// Name of the matching column in the dataset payload.
    pub fn column(&self) -> &'static str {
        match self {
            Field::Closing => "Close",
            Field::Opening => "Open",
            Field::AdjustedClosing => "Adj. Close",
            Field::AdjustedOpening => "Adj. Open",
        }
    }

    /// Name of the checkbox in the html form.
    pub fn form_name(&self) -> &'static str {
        match self {
            Field::Closing => "Closing",
            Field::Opening => "Opening",
            Field::AdjustedClosing => "Adj_closing",
            Field::AdjustedOpening => "Adj_opening",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Closing => "Closing price",
            Field::Opening => "Opening price",
            Field::AdjustedClosing => "Adjusted closing price",
            Field::AdjustedOpening => "Adjusted opening price",
        }
    }
}

/// A ticker symbol that is safe to put in a url path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("ticker is empty".to_string()));
        }
        if trimmed.len() > MAX_TICKER_LEN {
            return Err(AppError::Validation(format!(
                "ticker is longer than {MAX_TICKER_LEN} characters"
            )));
        }
        if !trimmed.starts_with(|c: char| c.is_ascii_alphanumeric())
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(AppError::Validation(format!(
                "ticker {trimmed:?} has unexpected characters"
            )));
        }
        Ok(Ticker(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The raw form submission, as posted by the index page.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct SelectionForm {
    #[serde(default)]
    pub stock: String,
    #[serde(rename = "Closing")]
    pub closing: Option<String>,
    #[serde(rename = "Opening")]
    pub opening: Option<String>,
    #[serde(rename = "Adj_closing")]
    pub adj_closing: Option<String>,
    #[serde(rename = "Adj_opening")]
    pub adj_opening: Option<String>,
}

impl SelectionForm {
    fn is_checked(&self, field: Field) -> bool {
        let value = match field {
            Field::Closing => &self.closing,
            Field::Opening => &self.opening,
            Field::AdjustedClosing => &self.adj_closing,
            Field::AdjustedOpening => &self.adj_opening,
        };
        match value.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(v) => !v.eq_ignore_ascii_case("false") && !v.eq_ignore_ascii_case("off"),
        }
    }

    /// Validates the submission. No side effects.
    pub fn into_request(self) -> Result<SelectionRequest, AppError> {
        let ticker = Ticker::parse(&self.stock)?;
        let fields = Field::ALL
            .into_iter()
            .filter(|field| self.is_checked(*field))
            .collect();
        Ok(SelectionRequest { ticker, fields })
    }
}

/// A validated request: which ticker, which series.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRequest {
    ticker: Ticker,
    fields: BTreeSet<Field>,
}

impl SelectionRequest {
    pub fn new(ticker: Ticker, fields: impl IntoIterator<Item = Field>) -> Self {
        SelectionRequest {
            ticker,
            fields: fields.into_iter().collect(),
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Selected fields, in selection order.
    pub fn fields(&self) -> &BTreeSet<Field> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(stock: &str) -> SelectionForm {
        SelectionForm {
            stock: stock.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn non_empty_ticker_builds_a_request() {
        for raw in ["ABC", "  aapl ", "BRK_A", "BF.B", "x"] {
            let request = form(raw).into_request().unwrap();
            assert_eq!(request.ticker().as_str(), raw.trim());
            assert!(request.fields().is_empty());
        }
    }

    #[test]
    fn empty_or_blank_ticker_is_a_validation_error() {
        for raw in ["", "   ", "\t\n"] {
            assert!(matches!(
                form(raw).into_request(),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn rejects_tickers_unsafe_for_a_url() {
        for raw in ["AB/C", "../etc", "..", "-X", "A B", "ABC?x=1", "VERYLONGTICKER1"] {
            assert!(
                matches!(form(raw).into_request(), Err(AppError::Validation(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn checkboxes_follow_html_semantics() {
        let submitted = SelectionForm {
            stock: "ABC".to_string(),
            closing: Some("y".to_string()),
            opening: Some("off".to_string()),
            adj_closing: Some(String::new()),
            adj_opening: Some("true".to_string()),
        };
        let request = submitted.into_request().unwrap();
        let fields: Vec<Field> = request.fields().iter().copied().collect();
        assert_eq!(fields, vec![Field::Closing, Field::AdjustedOpening]);
    }

    #[test]
    fn deserializes_from_urlencoded_form() {
        let body = "stock=ABC&Opening=y&Closing=y";
        let parsed: SelectionForm = parse_form(body);
        let request = parsed.into_request().unwrap();
        let fields: Vec<Field> = request.fields().iter().copied().collect();
        assert_eq!(fields, vec![Field::Closing, Field::Opening]);
    }

    fn parse_form(body: &str) -> SelectionForm {
        actix_web::web::Query::<SelectionForm>::from_query(body)
            .unwrap()
            .into_inner()
    }
}
