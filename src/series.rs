use chrono::NaiveDate;
use serde_json::Value;

use crate::{error::SeriesError, fetch::Dataset, models::Ticker};

const DATE_COLUMN: &str = "Date";

/// Date-keyed price rows. Dates are unique and strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    columns: Vec<String>,
    rows: Vec<(NaiveDate, Vec<Option<f64>>)>,
}

impl PriceSeries {
    /// Reshapes positional `data` rows using the `column_names` header.
    ///
    /// Row order from the payload is kept when it is already chronological,
    /// otherwise rows are sorted by date (the WIKI api returns newest first).
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, SeriesError> {
        let date_index = dataset
            .column_names
            .iter()
            .position(|name| name == DATE_COLUMN)
            .ok_or(SeriesError::MissingDateColumn)?;

        let columns: Vec<String> = dataset
            .column_names
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_index)
            .map(|(_, name)| name.clone())
            .collect();

        let expected = dataset.column_names.len();
        let mut rows = Vec::with_capacity(dataset.data.len());

        for (row_index, row) in dataset.data.iter().enumerate() {
            if row.len() != expected {
                return Err(SeriesError::RowWidth {
                    row: row_index,
                    found: row.len(),
                    expected,
                });
            }

            let date = parse_date(&row[date_index]).ok_or_else(|| SeriesError::BadDate {
                row: row_index,
                value: row[date_index].to_string(),
            })?;

            let mut values = Vec::with_capacity(columns.len());
            for (cell_index, cell) in row.iter().enumerate() {
                if cell_index == date_index {
                    continue;
                }
                let value = match cell {
                    Value::Null => None,
                    Value::Number(n) => n.as_f64(),
                    _ => None,
                };
                if value.is_none() && !cell.is_null() {
                    return Err(SeriesError::BadNumber {
                        row: row_index,
                        column: dataset.column_names[cell_index].clone(),
                    });
                }
                values.push(value);
            }

            rows.push((date, values));
        }

        if !rows.windows(2).all(|pair| pair[0].0 < pair[1].0) {
            rows.sort_by_key(|(date, _)| *date);
            if let Some(pair) = rows.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                return Err(SeriesError::DuplicateDate(pair[0].0));
            }
        }

        Ok(PriceSeries { columns, rows })
    }

    /// Non-date column names, in payload order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|(date, _)| *date).collect()
    }

    /// Values of one column, aligned with [`dates`](Self::dates).
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|(_, values)| values[index]).collect())
    }

    /// `(date, value)` pairs of one column.
    pub fn points(&self, name: &str) -> Option<Vec<(NaiveDate, Option<f64>)>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|(date, values)| (*date, values[index]))
                .collect(),
        )
    }
}

fn parse_date(cell: &Value) -> Option<NaiveDate> {
    let raw = cell.as_str()?;
    // some datasets carry a time part; only the day matters here
    let day = match raw.split_once('T') {
        Some((day, _)) if day.len() == 10 => day,
        _ => raw,
    };
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Strips the `" (TICKER)"` marker and anything after it from a dataset name.
///
/// `"Apple Inc (AAPL) Prices, Dividends, Splits and Trading Volume"` becomes
/// `"Apple Inc"`. Names without the marker are returned trimmed.
pub fn company_name(name: &str, ticker: &Ticker) -> String {
    let marker = format!(" ({})", ticker.as_str().to_ascii_uppercase());
    let upper = name.to_ascii_uppercase();
    match upper.rfind(&marker) {
        Some(end) if end > 0 => name[..end].trim().to_string(),
        _ => name.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(columns: &[&str], data: Value) -> Dataset {
        Dataset {
            name: "Acme Corp (ABC)".to_string(),
            column_names: columns.iter().map(|c| c.to_string()).collect(),
            data: serde_json::from_value(data).unwrap(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn columns_come_back_exactly() {
        let ds = dataset(
            &["Date", "Open", "Close"],
            json!([["2020-01-02", 10.0, 10.5], ["2020-01-03", 10.5, 11.0]]),
        );
        let series = PriceSeries::from_dataset(&ds).unwrap();

        assert_eq!(series.columns().to_vec(), vec!["Open", "Close"]);
        assert_eq!(series.column("Open").unwrap(), vec![Some(10.0), Some(10.5)]);
        assert_eq!(series.column("Close").unwrap(), vec![Some(10.5), Some(11.0)]);
        assert_eq!(series.dates(), vec![day("2020-01-02"), day("2020-01-03")]);
        assert!(series.column("Volume").is_none());
    }

    #[test]
    fn newest_first_rows_are_sorted_ascending() {
        let ds = dataset(
            &["Date", "Close"],
            json!([
                ["2020-01-06", 3.0],
                ["2020-01-03", 2.0],
                ["2020-01-02", 1.0]
            ]),
        );
        let series = PriceSeries::from_dataset(&ds).unwrap();
        assert_eq!(
            series.dates(),
            vec![day("2020-01-02"), day("2020-01-03"), day("2020-01-06")]
        );
        assert_eq!(
            series.column("Close").unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn date_column_need_not_be_first_and_nulls_survive() {
        let ds = dataset(
            &["Open", "Date", "Adj. Close"],
            json!([[1.5, "2020-01-02", null], [2, "2020-01-03T00:00:00", 2.25]]),
        );
        let series = PriceSeries::from_dataset(&ds).unwrap();
        assert_eq!(series.columns().to_vec(), vec!["Open", "Adj. Close"]);
        assert_eq!(series.column("Adj. Close").unwrap(), vec![None, Some(2.25)]);
        assert_eq!(series.column("Open").unwrap(), vec![Some(1.5), Some(2.0)]);
    }

    #[test]
    fn rejects_bad_rows() {
        let missing_date = dataset(&["Open"], json!([[1.0]]));
        assert_eq!(
            PriceSeries::from_dataset(&missing_date),
            Err(SeriesError::MissingDateColumn)
        );

        let short_row = dataset(&["Date", "Open"], json!([["2020-01-02"]]));
        assert!(matches!(
            PriceSeries::from_dataset(&short_row),
            Err(SeriesError::RowWidth { row: 0, found: 1, expected: 2 })
        ));

        let bad_date = dataset(&["Date", "Open"], json!([["yesterday", 1.0]]));
        assert!(matches!(
            PriceSeries::from_dataset(&bad_date),
            Err(SeriesError::BadDate { row: 0, .. })
        ));

        let bad_number = dataset(&["Date", "Open"], json!([["2020-01-02", "ten"]]));
        assert!(matches!(
            PriceSeries::from_dataset(&bad_number),
            Err(SeriesError::BadNumber { row: 0, .. })
        ));

        let duplicate = dataset(
            &["Date", "Open"],
            json!([["2020-01-02", 1.0], ["2020-01-02", 2.0]]),
        );
        assert_eq!(
            PriceSeries::from_dataset(&duplicate),
            Err(SeriesError::DuplicateDate(day("2020-01-02")))
        );
    }

    #[test]
    fn empty_dataset_is_an_empty_series() {
        let series = PriceSeries::from_dataset(&dataset(&["Date", "Close"], json!([]))).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.column("Close").unwrap(), Vec::<Option<f64>>::new());
    }

    #[test]
    fn dates_take_an_optional_time_part_and_nothing_else() {
        let with_time = dataset(&["Date", "Open"], json!([["2020-01-02T00:00:00", 1.0]]));
        let series = PriceSeries::from_dataset(&with_time).unwrap();
        assert_eq!(series.dates()[0].to_string(), "2020-01-02");

        for raw in ["2020-01-02garbage", "2020-01-02 junk", "2020-01-0T2"] {
            let trailing = dataset(&["Date", "Open"], json!([[raw, 1.0]]));
            assert!(
                matches!(
                    PriceSeries::from_dataset(&trailing),
                    Err(SeriesError::BadDate { row: 0, .. })
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn company_name_strips_ticker_marker() {
        let abc = Ticker::parse("ABC").unwrap();
        assert_eq!(company_name("Acme Corp (ABC)", &abc), "Acme Corp");
        assert_eq!(
            company_name("Acme Corp (ABC) Prices, Dividends, Splits and Trading Volume", &abc),
            "Acme Corp"
        );
        assert_eq!(
            company_name("Acme Corp (ABC)", &Ticker::parse("abc").unwrap()),
            "Acme Corp"
        );
        assert_eq!(company_name("Something Else (XYZ)", &abc), "Something Else (XYZ)");
        assert_eq!(
            company_name("Acme (ABC) Holdings (ABC)", &abc),
            "Acme (ABC) Holdings"
        );
    }
}
