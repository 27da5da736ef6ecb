//! Data acquisition for published Treasury yield curves.

mod treasury;

pub use treasury::{parse_year_csv, RawCurveRow, TreasuryClient};
