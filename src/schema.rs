use crate::error::{LedgerError, Result};
use crate::metrics::{MetricLayout, DEFAULT_QUANTITY_SLOTS, METRIC_COUNT};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_FISCAL_YEAR_START_MONTH: u32 = 4;
pub const DEFAULT_CHANNEL_B_FIXED_DEDUCTION: f64 = 6_000_000.0;
pub const DEFAULT_CHANNEL_A_NAME: &str = "営業計";
pub const DEFAULT_CHANNEL_B_NAME: &str = "直販他計";

/// Engine settings, passed explicitly into every component that needs them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    #[schemars(
        description = "Calendar month the fiscal year starts in (1 = January). The fiscal year is labeled by the calendar year of its first month."
    )]
    pub fiscal_year_start_month: u32,

    #[schemars(
        description = "Metric slots (0-16) holding unit quantities. These are averaged; every other slot is a currency amount and is summed."
    )]
    pub quantity_slots: Vec<usize>,

    #[schemars(
        description = "Fixed monthly allowance subtracted from the channel B target before spreading it over channel B working days."
    )]
    pub channel_b_fixed_deduction: f64,

    #[schemars(description = "Value of the name column identifying channel A (home delivery) rows in daily extracts.")]
    pub channel_a_name: String,

    #[schemars(description = "Value of the name column identifying channel B (direct sales) rows in daily extracts.")]
    pub channel_b_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fiscal_year_start_month: DEFAULT_FISCAL_YEAR_START_MONTH,
            quantity_slots: DEFAULT_QUANTITY_SLOTS.to_vec(),
            channel_b_fixed_deduction: DEFAULT_CHANNEL_B_FIXED_DEDUCTION,
            channel_a_name: DEFAULT_CHANNEL_A_NAME.to_string(),
            channel_b_name: DEFAULT_CHANNEL_B_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.fiscal_year_start_month) {
            return Err(LedgerError::InvalidConfig(format!(
                "fiscal_year_start_month {} must be between 1 and 12",
                self.fiscal_year_start_month
            )));
        }

        let mut seen = HashSet::new();
        for &idx in &self.quantity_slots {
            if idx >= METRIC_COUNT {
                return Err(LedgerError::InvalidConfig(format!(
                    "quantity slot {} is out of range (0-{})",
                    idx,
                    METRIC_COUNT - 1
                )));
            }
            if !seen.insert(idx) {
                return Err(LedgerError::InvalidConfig(format!(
                    "quantity slot {} listed twice",
                    idx
                )));
            }
        }

        if !self.channel_b_fixed_deduction.is_finite() || self.channel_b_fixed_deduction < 0.0 {
            return Err(LedgerError::InvalidConfig(format!(
                "channel_b_fixed_deduction {} must be a non-negative number",
                self.channel_b_fixed_deduction
            )));
        }

        if self.channel_a_name.trim().is_empty() || self.channel_b_name.trim().is_empty() {
            return Err(LedgerError::InvalidConfig(
                "channel names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn layout(&self) -> MetricLayout {
        MetricLayout::from_quantity_slots(&self.quantity_slots)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EngineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
