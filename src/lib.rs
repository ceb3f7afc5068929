//! Web app that charts historical stock prices for a ticker typed into a form.

pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod flow;
pub mod models;
pub mod routes;
pub mod series;
pub mod session;
pub mod templates;
