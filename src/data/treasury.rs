//! US Treasury daily yield-curve download.
//!
//! The Treasury publishes its daily par yield curve as a per-calendar-year
//! CSV (Date column plus one column per tenor label, percent units). This
//! module fetches and parses those tables and provides the two access
//! patterns the pipeline needs:
//!
//! - the latest published row at or before an as-of date (with lookback)
//! - a trailing history of roughly `n_days` business-day rows
//!
//! Per-year downloads inside one call are memoized in an explicit map owned
//! by that call; there is no process-wide cache.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::error::AppError;

const RATES_CSV_URL: &str = "https://home.treasury.gov/resource-center/data-chart-center/\
interest-rates/daily-treasury-rates.csv/all/{year}?type=daily_treasury_yield_curve\
&field_tdr_date_value={year}&_format=csv";

/// Calendar days fetched per requested business day, plus slack, when
/// estimating how far back a history window starts.
const CALENDAR_DAYS_PER_BUSINESS_DAY: f64 = 2.3;
const HISTORY_SLACK_DAYS: i64 = 30;

/// One published wide row: a date plus `(tenor label, percent yield)` cells.
///
/// Non-numeric cells are dropped during parsing, so a row may carry fewer
/// labels than the full grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCurveRow {
    pub date: NaiveDate,
    pub values: Vec<(String, f64)>,
}

impl RawCurveRow {
    pub fn value_for(&self, label: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }
}

pub struct TreasuryClient {
    client: Client,
}

impl Default for TreasuryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TreasuryClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Fetch and parse one calendar year's daily yield table.
    pub fn fetch_year_table(&self, year: i32) -> Result<Vec<RawCurveRow>, AppError> {
        let url = RATES_CSV_URL.replace("{year}", &year.to_string());
        info!(year, "fetching Treasury yield table");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::network(format!("Treasury request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::network(format!(
                "Treasury request for year {year} failed with status {}",
                resp.status()
            )));
        }
        let body = resp
            .text()
            .map_err(|e| AppError::network(format!("failed to read Treasury response: {e}")))?;

        parse_year_csv(&body)
    }

    /// Most recent published row at or before `as_of`, walking back at most
    /// `max_lookback_days` calendar days (weekends and holidays publish
    /// nothing).
    pub fn fetch_latest_row(
        &self,
        as_of: NaiveDate,
        max_lookback_days: u32,
    ) -> Result<RawCurveRow, AppError> {
        let mut year_cache: HashMap<i32, Vec<RawCurveRow>> = HashMap::new();

        for offset in 0..=i64::from(max_lookback_days) {
            let candidate = as_of - Duration::days(offset);
            let year = candidate.year();
            if !year_cache.contains_key(&year) {
                let table = self.fetch_year_table(year)?;
                year_cache.insert(year, table);
            }
            if let Some(row) = year_cache[&year].iter().find(|r| r.date == candidate) {
                info!(curve_date = %candidate, %as_of, "using latest published curve");
                return Ok(row.clone());
            }
        }

        Err(AppError::insufficient(format!(
            "no Treasury curve found within {max_lookback_days} days of {as_of}"
        )))
    }

    /// Trailing history of approximately `n_days` published rows ending at
    /// `end_date`. Years that fail to download are skipped with a warning;
    /// the call fails only if every year fails.
    pub fn fetch_history(
        &self,
        n_days: usize,
        end_date: NaiveDate,
    ) -> Result<Vec<RawCurveRow>, AppError> {
        let span = (n_days as f64 * CALENDAR_DAYS_PER_BUSINESS_DAY) as i64 + HISTORY_SLACK_DAYS;
        let start_date = end_date - Duration::days(span);

        let mut rows: Vec<RawCurveRow> = Vec::new();
        let mut fetched_any = false;
        for year in start_date.year()..=end_date.year() {
            match self.fetch_year_table(year) {
                Ok(table) => {
                    fetched_any = true;
                    rows.extend(table);
                }
                Err(err) => warn!(year, %err, "skipping year due to download error"),
            }
        }
        if !fetched_any {
            return Err(AppError::network("unable to fetch any Treasury data"));
        }

        Ok(trim_history(rows, start_date, end_date, n_days))
    }
}

/// Parse one year's CSV body into dated rows, oldest first.
///
/// Rows with unparseable dates are skipped; non-numeric cells are dropped.
pub fn parse_year_csv(body: &str) -> Result<Vec<RawCurveRow>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::network(format!("failed to read Treasury CSV headers: {e}")))?
        .clone();
    let date_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .ok_or_else(|| AppError::network("Treasury table does not include a Date column"))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            match record {
                Ok(r) => r,
                Err(e) => {
                    warn!(%e, "skipping malformed Treasury CSV record");
                    continue;
                }
            };
        let Some(date) = record.get(date_col).and_then(parse_date) else {
            continue;
        };

        let mut values = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == date_col {
                continue;
            }
            if let Some(v) = record.get(idx).and_then(parse_value) {
                values.push((header.to_string(), v));
            }
        }
        rows.push(RawCurveRow { date, values });
    }

    rows.sort_by_key(|r| r.date);
    Ok(rows)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == "N/A" {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// Dedupe by date (first occurrence wins), restrict to the window, and keep
/// the trailing `n_days` rows.
fn trim_history(
    rows: Vec<RawCurveRow>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    n_days: usize,
) -> Vec<RawCurveRow> {
    let mut seen: HashSet<NaiveDate> = HashSet::new();
    let mut deduped: Vec<RawCurveRow> = Vec::with_capacity(rows.len());
    for row in rows {
        if row.date < start_date || row.date > end_date {
            continue;
        }
        if seen.insert(row.date) {
            deduped.push(row);
        }
    }
    deduped.sort_by_key(|r| r.date);

    if deduped.len() > n_days {
        deduped.split_off(deduped.len() - n_days)
    } else {
        deduped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,1 Mo,2 Mo,3 Mo,6 Mo,1 Yr,2 Yr,5 Yr,10 Yr,30 Yr
01/03/2025,4.40,4.42,4.43,4.41,4.25,4.28,4.41,4.60,4.82
01/02/2025,4.44,4.45,4.42,4.40,4.21,4.25,4.38,4.57,4.79
01/06/2025,4.43,4.44,4.44,.,4.24,4.29,4.43,4.62,4.85
not-a-date,1.0,2.0,3.0,4.0,5.0,6.0,7.0,8.0,9.0
";

    #[test]
    fn parses_sorts_and_skips_bad_cells() {
        let rows = parse_year_csv(SAMPLE).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(rows[2].date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());

        // The "." cell on Jan 6 is dropped, the rest survive.
        assert_eq!(rows[2].value_for("6 Mo"), None);
        assert_eq!(rows[2].value_for("10 Yr"), Some(4.62));
        assert_eq!(rows[0].values.len(), 9);
    }

    #[test]
    fn missing_date_column_is_an_error() {
        let result = parse_year_csv("Tenor,Yield\n1 Mo,4.4\n");
        assert!(matches!(result, Err(AppError::Network(_))));
    }

    #[test]
    fn history_trim_dedupes_and_keeps_tail() {
        let d = |day: u32| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        let row = |day: u32, v: f64| RawCurveRow {
            date: d(day),
            values: vec![("10 Yr".to_string(), v)],
        };
        let rows = vec![row(2, 4.57), row(3, 4.60), row(2, 9.99), row(6, 4.62), row(7, 4.61)];

        let trimmed = trim_history(rows, d(1), d(7), 3);
        assert_eq!(trimmed.len(), 3);
        assert_eq!(trimmed[0].date, d(3));
        assert_eq!(trimmed[2].date, d(7));

        // First occurrence wins for the duplicated date.
        let all = trim_history(
            vec![row(2, 4.57), row(2, 9.99)],
            d(1),
            d(7),
            10,
        );
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value_for("10 Yr"), Some(4.57));
    }
}
