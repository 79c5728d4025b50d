//! # Sales Rollup
//!
//! Turns daily sales extracts into per-month ledgers and rolls those ledgers up
//! into fiscal period reports compared against targets and prior-year actuals.
//!
//! ## Core Concepts
//!
//! - **Metric vector**: 17 fixed slots covering two sales channels and the company total
//! - **Amount slots**: currency figures, aggregated by sum
//! - **Quantity slots**: unit counts, aggregated by average (day-weighted for actuals,
//!   month-weighted for targets and prior-year figures, which arrive pre-averaged)
//! - **Ledger**: one month of daily vectors, keyed by `yyyy_MM`
//! - **Master tables**: one target and one prior-year vector per month, plus working days
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_rollup::*;
//! use chrono::NaiveDate;
//!
//! let config = EngineConfig::default();
//! let mut store = FileStore::open("./data")?;
//!
//! import_daily_file(&mut store, &config, "sales_20240415.csv", &csv_text)?;
//!
//! let base_date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
//! let summary = build_summary_report(&store, &config, base_date)?;
//! println!("{}", summary.render_text());
//! ```

pub mod achievement;
pub mod batch;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod metrics;
pub mod report;
pub mod schema;
pub mod store;
pub mod utils;

pub use achievement::{AchievementPlan, DailyProgress};
pub use batch::{
    import_batch, import_correction_file, import_daily_file, import_master_file, ImportKind,
    ImportSummary, SkippedFile,
};
pub use consistency::{verify_company_totals, ConsistencyChecker, TotalMismatch, VerificationResult};
pub use engine::{
    ratio, FiscalWindow, MetricComparison, PeriodAggregator, PeriodStats, StatObject,
};
pub use error::{LedgerError, Result};
pub use ingestion::{extract_record, parse_master_rows, parse_working_day_rows, read_rows};
pub use metrics::{slot, MetricKind, MetricLayout, MetricVector, METRIC_COUNT};
pub use report::{
    build_monthly_report, build_summary_report, LedgerSheet, LedgerSheetRow, PeriodReport,
    ReportKind, ReportSet,
};
pub use schema::EngineConfig;
pub use store::{DailyLedger, FileStore, MasterKind, MemoryStore, PeriodStore, DAYS_PER_LEDGER};
pub use utils::*;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A calendar month, the join key across ledgers, master tables and working days.
/// Canonical text form is `yyyy_MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(LedgerError::InvalidMonthKey(format!("{}_{}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Caller guarantees `month` is 1..=12.
    pub(crate) fn from_parts(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("MonthKey always holds a valid year and month")
    }

    pub fn days_in_month(&self) -> u32 {
        utils::days_in_month(self.year, self.month)
    }

    pub fn add_months(&self, months: i32) -> Self {
        let total = self.year * 12 + (self.month as i32 - 1) + months;
        Self {
            year: total.div_euclid(12),
            month: total.rem_euclid(12) as u32 + 1,
        }
    }

    /// The same month one calendar year earlier, used to join prior-year figures.
    pub fn previous_year(&self) -> Self {
        self.add_months(-12)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}_{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = LedgerError;

    /// Accepts `yyyy_MM`, `yyyy-MM` and `yyyy/MM`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LedgerError::InvalidMonthKey(s.to_string());
        let parts: Vec<&str> = s.trim().split(['_', '-', '/']).collect();

        match parts.as_slice() {
            [year, month]
                if year.len() == 4
                    && (1..=2).contains(&month.len())
                    && year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) =>
            {
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                MonthKey::new(year, month).map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for MonthKey {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> String {
        key.to_string()
    }
}

/// Working-day counts for one month, per channel. Fractional counts are kept as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingDays {
    pub channel_a: f64,
    pub channel_b: f64,
}

/// Target or prior-year vectors keyed by month.
pub type MasterTable = BTreeMap<MonthKey, MetricVector>;

pub type WorkingDaysTable = BTreeMap<MonthKey, WorkingDays>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_round_trip_text() {
        let key: MonthKey = "2024_04".parse().unwrap();
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 4);
        assert_eq!(key.to_string(), "2024_04");

        assert_eq!("2024-4".parse::<MonthKey>().unwrap(), key);
        assert_eq!("2024/04".parse::<MonthKey>().unwrap(), key);
        assert!("2024_13".parse::<MonthKey>().is_err());
        assert!("24_04".parse::<MonthKey>().is_err());
        assert!("2024_04_01".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_arithmetic() {
        let key = MonthKey::new(2024, 1).unwrap();
        assert_eq!(key.add_months(-1).to_string(), "2023_12");
        assert_eq!(key.add_months(11).to_string(), "2024_12");
        assert_eq!(key.add_months(12).to_string(), "2025_01");
        assert_eq!(key.previous_year().to_string(), "2023_01");
        assert_eq!(MonthKey::new(2024, 2).unwrap().days_in_month(), 29);
    }

    #[test]
    fn test_month_key_orders_chronologically() {
        let mut keys = vec![
            MonthKey::new(2025, 1).unwrap(),
            MonthKey::new(2024, 12).unwrap(),
            MonthKey::new(2024, 4).unwrap(),
        ];
        keys.sort();
        let text: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(text, vec!["2024_04", "2024_12", "2025_01"]);
    }

    #[test]
    fn test_month_key_as_json_map_key() {
        let mut table = MasterTable::new();
        table.insert(MonthKey::new(2024, 4).unwrap(), MetricVector::filled(1.0));

        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"2024_04\""));

        let back: MasterTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
