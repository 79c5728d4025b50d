//! Import orchestration. Each file is parsed and stored on its own; a bad file
//! is recorded and skipped without stopping the rest of the batch.

use crate::error::{LedgerError, Result};
use crate::ingestion::{extract_record, parse_master_rows, parse_working_day_rows, read_rows};
use crate::schema::EngineConfig;
use crate::store::{MasterKind, PeriodStore};
use crate::utils::{parse_file_date, parse_file_month};
use crate::MonthKey;
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `*YYYYMMDD*.csv` daily extracts.
    Daily,
    /// `*YYYYMM*.csv` month-end figures replacing the whole month.
    Correction,
    /// `target.csv`, `prev.csv` or `days.csv`.
    Master,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl ImportSummary {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Stores one daily extract under the date embedded in its file name.
pub fn import_daily_file<S: PeriodStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    file_name: &str,
    content: &str,
) -> Result<NaiveDate> {
    let date = parse_file_date(file_name)?;
    let rows = read_rows(content)?;
    let record = extract_record(&rows, config)?;

    store.append_daily(MonthKey::from_date(date), date.day(), record)?;
    info!("Imported daily figures for {} from {}", date, file_name);
    Ok(date)
}

/// Replaces the month named in the file with a single month-end figure.
pub fn import_correction_file<S: PeriodStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    file_name: &str,
    content: &str,
) -> Result<MonthKey> {
    let month = parse_file_month(file_name)?;
    let rows = read_rows(content)?;
    let record = extract_record(&rows, config)?;

    store.apply_correction(month, record)?;
    info!("Applied month-end correction for {} from {}", month, file_name);
    Ok(month)
}

/// Replaces a master table wholesale. The target is picked by file name.
/// Returns the number of months loaded.
pub fn import_master_file<S: PeriodStore + ?Sized>(
    store: &mut S,
    file_name: &str,
    content: &str,
) -> Result<usize> {
    let base_name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .to_lowercase();

    let rows = read_rows(content)?;
    let (label, count) = match base_name.as_str() {
        "target.csv" | "prev.csv" => {
            let kind = if base_name == "target.csv" {
                MasterKind::Target
            } else {
                MasterKind::PriorYear
            };
            let table = parse_master_rows(&rows, file_name)?;
            store.replace_master(kind, &table)?;
            (kind.label(), table.len())
        }
        "days.csv" => {
            let table = parse_working_day_rows(&rows, file_name)?;
            store.replace_working_days(&table)?;
            ("working days", table.len())
        }
        _ => return Err(LedgerError::UnknownMasterFile(file_name.to_string())),
    };

    info!("Loaded {} months of {} data from {}", count, label, file_name);
    Ok(count)
}

/// Imports `(file_name, content)` pairs in order.
pub fn import_batch<S: PeriodStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    kind: ImportKind,
    files: &[(String, String)],
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for (name, content) in files {
        let outcome = match kind {
            ImportKind::Daily => import_daily_file(store, config, name, content).map(|_| ()),
            ImportKind::Correction => {
                import_correction_file(store, config, name, content).map(|_| ())
            }
            ImportKind::Master => import_master_file(store, name, content).map(|_| ()),
        };

        match outcome {
            Ok(()) => summary.imported.push(name.clone()),
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                summary.skipped.push(SkippedFile {
                    name: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "{:?} import finished: {} imported, {} skipped",
        kind,
        summary.imported.len(),
        summary.skipped.len()
    );
    summary
}
