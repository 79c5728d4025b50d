use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Required column '{0}' not found in header")]
    MissingColumn(&'static str),

    #[error("No usable date in file name '{0}'")]
    InvalidFileDate(String),

    #[error("Invalid month key '{0}': expected yyyy_MM")]
    InvalidMonthKey(String),

    #[error("Invalid day {day} for ledger {month}: must be between 1 and 31")]
    InvalidDay { month: String, day: u32 },

    #[error("Ledger {0} already exists")]
    LedgerExists(String),

    #[error("No valid rows found in {0}")]
    NoValidRows(String),

    #[error("Unrecognised master data file '{0}': expected target.csv, prev.csv or days.csv")]
    UnknownMasterFile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
