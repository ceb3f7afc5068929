//! Sequencing of one user action: validate, fetch, reshape, then render on
//! the next page.
//!
//! ```text
//! AwaitingInput -> Fetching -> Error -> AwaitingInput
//!                           -> Ready -> Rendering -> AwaitingInput
//! ```
//!
//! Nothing here is global: the [`Prepared`] value produced by [`submit`] is
//! handed to the caller, which keeps it in the visitor's session until
//! [`present`] consumes it.

use serde::Serialize;

use crate::{
    chart,
    error::{AppError, ChartError, FetchError},
    fetch::MarketData,
    models::{SelectionForm, SelectionRequest},
    series::{company_name, PriceSeries},
};

pub const INVALID_TICKER: &str = "Need to input a valid stock ticker";
pub const SERVICE_UNAVAILABLE: &str = "Market data service is unavailable, try again later";
pub const NOTHING_TO_SHOW: &str = "Submit a ticker first";

/// Selection plus the data fetched for it, waiting to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub selection: SelectionRequest,
    pub series: PriceSeries,
    pub company: String,
}

/// Where a submission leaves the visitor.
#[derive(Debug)]
pub enum Transition {
    /// Back to the form, with a message to flash.
    AwaitingInput { message: &'static str, cause: AppError },
    /// Data is ready; the next page draws it.
    Ready(Prepared),
}

/// Everything the chart page template needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub stock_name: String,
    pub script: String,
    pub div: String,
}

/// Message shown to the user for a failed step.
///
/// Bad input and upstream rejections read the same; only network trouble
/// gets its own wording.
pub fn user_message(err: &AppError) -> &'static str {
    match err {
        AppError::Fetch(FetchError::Transport { .. })
        | AppError::Fetch(FetchError::Client(_))
        | AppError::Fetch(FetchError::Url(_)) => SERVICE_UNAVAILABLE,
        _ => INVALID_TICKER,
    }
}

/// Handles a form submission. Makes at most one call to `source`, and none
/// at all when the form does not validate.
pub async fn submit<M: MarketData>(source: &M, form: SelectionForm) -> Transition {
    match prepare(source, form).await {
        Ok(prepared) => Transition::Ready(prepared),
        Err(cause) => {
            log::info!("submission rejected: {cause}");
            Transition::AwaitingInput {
                message: user_message(&cause),
                cause,
            }
        }
    }
}

async fn prepare<M: MarketData>(source: &M, form: SelectionForm) -> Result<Prepared, AppError> {
    let selection = form.into_request()?;
    let dataset = source.fetch(selection.ticker()).await?;
    let series = PriceSeries::from_dataset(&dataset)?;
    // every selected series must be drawable before the visitor is sent on
    if let Some(missing) = selection
        .fields()
        .iter()
        .map(|field| field.column())
        .find(|column| !series.columns().iter().any(|have| have == column))
    {
        return Err(ChartError::MissingColumn(missing.to_string()).into());
    }
    let company = company_name(&dataset.name, selection.ticker());
    log::info!(
        "prepared {} ({company}): {} rows, {} field(s)",
        selection.ticker(),
        series.len(),
        selection.fields().len()
    );
    Ok(Prepared {
        selection,
        series,
        company,
    })
}

/// Draws a prepared selection.
pub fn present(prepared: &Prepared) -> Result<Page, AppError> {
    let rendered = chart::render(
        &prepared.series,
        prepared.selection.fields(),
        &prepared.company,
    )?;
    Ok(Page {
        stock_name: prepared.company.clone(),
        script: rendered.script,
        div: rendered.div,
    })
}
