//! Persistence for monthly ledgers, master tables and working days.
//!
//! RULE: Only store implementations touch storage.
//! Ingestion and reporting go through the `PeriodStore` trait.

use crate::engine::StatObject;
use crate::error::{LedgerError, Result};
use crate::metrics::{MetricLayout, MetricVector};
use crate::{MasterTable, MonthKey, WorkingDaysTable};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Day slots per ledger, regardless of the month's real length.
pub const DAYS_PER_LEDGER: usize = 31;

/// One month of daily metric vectors. A `None` day is blank, not zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLedger {
    pub month: MonthKey,
    days: Vec<Option<MetricVector>>,
    /// Set once a month-end correction has replaced the daily figures.
    #[serde(default)]
    pub finalized: bool,
}

impl DailyLedger {
    pub fn new(month: MonthKey) -> Self {
        Self {
            month,
            days: vec![None; DAYS_PER_LEDGER],
            finalized: false,
        }
    }

    /// Pads or truncates to exactly 31 day slots, for ledgers read from disk.
    fn normalized(mut self) -> Self {
        self.days.resize(DAYS_PER_LEDGER, None);
        self
    }

    fn check_day(&self, day: u32) -> Result<usize> {
        if day == 0 || day as usize > DAYS_PER_LEDGER {
            return Err(LedgerError::InvalidDay {
                month: self.month.to_string(),
                day,
            });
        }
        Ok(day as usize - 1)
    }

    pub fn day(&self, day: u32) -> Option<&MetricVector> {
        self.check_day(day)
            .ok()
            .and_then(|idx| self.days[idx].as_ref())
    }

    pub fn set_day(&mut self, day: u32, values: MetricVector) -> Result<()> {
        let idx = self.check_day(day)?;
        self.days[idx] = Some(values);
        Ok(())
    }

    /// Collapses the month to one authoritative figure on day 1.
    pub fn apply_correction(&mut self, values: MetricVector) {
        self.days = vec![None; DAYS_PER_LEDGER];
        self.days[0] = Some(values);
        self.finalized = true;
    }

    /// `(day, values)` for all 31 slots, day numbers starting at 1.
    pub fn days(&self) -> impl Iterator<Item = (u32, Option<&MetricVector>)> + '_ {
        self.days
            .iter()
            .enumerate()
            .map(|(idx, values)| (idx as u32 + 1, values.as_ref()))
    }

    pub fn recorded_days(&self) -> usize {
        self.days.iter().filter(|d| d.is_some()).count()
    }

    /// Sums and populated-cell counts over the 31 × 17 grid.
    pub fn totals(&self) -> StatObject {
        let mut totals = StatObject::default();
        for values in self.days.iter().flatten() {
            totals.accumulate(values, &MetricVector::filled(1.0));
        }
        totals
    }

    /// Month footer: sum for amount slots, average of recorded days for quantity slots.
    pub fn footer(&self, layout: &MetricLayout) -> MetricVector {
        let totals = self.totals();
        MetricVector::new(std::array::from_fn(|idx| totals.resolve(idx, layout)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterKind {
    Target,
    PriorYear,
}

impl MasterKind {
    pub fn label(&self) -> &'static str {
        match self {
            MasterKind::Target => "target",
            MasterKind::PriorYear => "prior year",
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            MasterKind::Target => "target.json",
            MasterKind::PriorYear => "prev.json",
        }
    }
}

pub trait PeriodStore {
    fn load_ledger(&self, month: MonthKey) -> Result<Option<DailyLedger>>;
    fn save_ledger(&mut self, ledger: &DailyLedger) -> Result<()>;
    /// Months with a stored ledger, oldest first.
    fn ledger_months(&self) -> Result<Vec<MonthKey>>;

    fn load_master(&self, kind: MasterKind) -> Result<MasterTable>;
    fn replace_master(&mut self, kind: MasterKind, table: &MasterTable) -> Result<()>;

    fn load_working_days(&self) -> Result<WorkingDaysTable>;
    fn replace_working_days(&mut self, table: &WorkingDaysTable) -> Result<()>;

    /// Records one day's figures, creating the month's ledger on first use.
    fn append_daily(&mut self, month: MonthKey, day: u32, values: MetricVector) -> Result<()> {
        let mut ledger = self
            .load_ledger(month)?
            .unwrap_or_else(|| DailyLedger::new(month));
        ledger.set_day(day, values)?;
        self.save_ledger(&ledger)
    }

    /// Replaces the whole month with a single month-end figure on day 1.
    fn apply_correction(&mut self, month: MonthKey, values: MetricVector) -> Result<()> {
        let mut ledger = self
            .load_ledger(month)?
            .unwrap_or_else(|| DailyLedger::new(month));
        ledger.apply_correction(values);
        self.save_ledger(&ledger)
    }

    /// Creates a blank ledger for manual entry.
    fn create_empty_ledger(&mut self, month: MonthKey) -> Result<DailyLedger> {
        if self.load_ledger(month)?.is_some() {
            return Err(LedgerError::LedgerExists(month.to_string()));
        }
        let ledger = DailyLedger::new(month);
        self.save_ledger(&ledger)?;
        Ok(ledger)
    }
}

/// Volatile store, used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ledgers: BTreeMap<MonthKey, DailyLedger>,
    masters: BTreeMap<MasterKind, MasterTable>,
    working_days: WorkingDaysTable,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeriodStore for MemoryStore {
    fn load_ledger(&self, month: MonthKey) -> Result<Option<DailyLedger>> {
        Ok(self.ledgers.get(&month).cloned())
    }

    fn save_ledger(&mut self, ledger: &DailyLedger) -> Result<()> {
        self.ledgers.insert(ledger.month, ledger.clone());
        Ok(())
    }

    fn ledger_months(&self) -> Result<Vec<MonthKey>> {
        Ok(self.ledgers.keys().copied().collect())
    }

    fn load_master(&self, kind: MasterKind) -> Result<MasterTable> {
        Ok(self.masters.get(&kind).cloned().unwrap_or_default())
    }

    fn replace_master(&mut self, kind: MasterKind, table: &MasterTable) -> Result<()> {
        self.masters.insert(kind, table.clone());
        Ok(())
    }

    fn load_working_days(&self) -> Result<WorkingDaysTable> {
        Ok(self.working_days.clone())
    }

    fn replace_working_days(&mut self, table: &WorkingDaysTable) -> Result<()> {
        self.working_days = table.clone();
        Ok(())
    }
}

const LEDGER_DIR: &str = "ledgers";
const WORKING_DAYS_FILE: &str = "working_days.json";

/// JSON files under one data directory:
/// `ledgers/yyyy_MM.json`, `target.json`, `prev.json`, `working_days.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(LEDGER_DIR))?;
        debug!("Opened file store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ledger_path(&self, month: MonthKey) -> PathBuf {
        self.root.join(LEDGER_DIR).join(format!("{}.json", month))
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        Ok(())
    }
}

impl PeriodStore for FileStore {
    fn load_ledger(&self, month: MonthKey) -> Result<Option<DailyLedger>> {
        let ledger: Option<DailyLedger> = Self::read_json(&self.ledger_path(month))?;
        Ok(ledger.map(DailyLedger::normalized))
    }

    fn save_ledger(&mut self, ledger: &DailyLedger) -> Result<()> {
        Self::write_json(&self.ledger_path(ledger.month), ledger)
    }

    fn ledger_months(&self) -> Result<Vec<MonthKey>> {
        let mut months = Vec::new();
        for entry in fs::read_dir(self.root.join(LEDGER_DIR))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(month) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<MonthKey>().ok())
            {
                months.push(month);
            }
        }
        months.sort();
        Ok(months)
    }

    fn load_master(&self, kind: MasterKind) -> Result<MasterTable> {
        Ok(Self::read_json(&self.root.join(kind.file_name()))?.unwrap_or_default())
    }

    fn replace_master(&mut self, kind: MasterKind, table: &MasterTable) -> Result<()> {
        Self::write_json(&self.root.join(kind.file_name()), table)
    }

    fn load_working_days(&self) -> Result<WorkingDaysTable> {
        Ok(Self::read_json(&self.root.join(WORKING_DAYS_FILE))?.unwrap_or_default())
    }

    fn replace_working_days(&mut self, table: &WorkingDaysTable) -> Result<()> {
        Self::write_json(&self.root.join(WORKING_DAYS_FILE), table)
    }
}
