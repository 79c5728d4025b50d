use crate::error::Result;
use crate::metrics::{slot, MetricVector, METRIC_CODES};
use crate::store::{DailyLedger, MasterKind, PeriodStore};
use log::warn;
use serde::Serialize;

/// Company-wide slot and the two channel slots it must equal the sum of.
const COMPANY_TOTALS: [(usize, usize, usize); 3] = [
    (slot::ALL_TOTAL_AMOUNT, slot::A_TOTAL_AMOUNT, slot::B_TOTAL_AMOUNT),
    (slot::ALL_DAIRY_AMOUNT, slot::A_DAIRY_AMOUNT, slot::B_DAIRY_AMOUNT),
    (slot::ALL_DAIRY_QTY, slot::A_DAIRY_QTY, slot::B_DAIRY_QTY),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalMismatch {
    pub slot: usize,
    pub expected: f64,
    pub actual: f64,
    pub difference: f64,
}

/// Compares each company-wide slot against the sum of its channel slots.
pub fn verify_company_totals(values: &MetricVector, tolerance: f64) -> Vec<TotalMismatch> {
    COMPANY_TOTALS
        .iter()
        .filter_map(|&(total, a, b)| {
            let expected = values[a] + values[b];
            let difference = (values[total] - expected).abs();
            (difference > tolerance).then(|| TotalMismatch {
                slot: total,
                expected,
                actual: values[total],
                difference,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationResult {
    pub checked_days: usize,
    pub warnings: Vec<String>,
}

impl VerificationResult {
    pub fn is_consistent(&self) -> bool {
        self.warnings.is_empty()
    }

    fn push(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

pub struct ConsistencyChecker {
    tolerance: f64,
}

impl ConsistencyChecker {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn verify_ledger(&self, ledger: &DailyLedger, result: &mut VerificationResult) {
        for (day, values) in ledger.days() {
            let Some(values) = values else { continue };
            result.checked_days += 1;

            for mismatch in verify_company_totals(values, self.tolerance) {
                result.push(format!(
                    "{} day {}: {} is {} but channel slots sum to {} (difference {})",
                    ledger.month,
                    day,
                    METRIC_CODES[mismatch.slot],
                    mismatch.actual,
                    mismatch.expected,
                    mismatch.difference
                ));
            }
        }
    }

    /// Checks every stored ledger and flags months with actuals but no target.
    /// Findings are warnings; only store errors fail the call.
    pub fn verify_store<S: PeriodStore + ?Sized>(&self, store: &S) -> Result<VerificationResult> {
        let mut result = VerificationResult::default();
        let targets = store.load_master(MasterKind::Target)?;

        for month in store.ledger_months()? {
            let Some(ledger) = store.load_ledger(month)? else { continue };
            self.verify_ledger(&ledger, &mut result);

            if ledger.recorded_days() > 0 && !targets.contains_key(&month) {
                result.push(format!("{} has recorded days but no target", month));
            }
        }

        Ok(result)
    }
}

impl Default for ConsistencyChecker {
    fn default() -> Self {
        Self::new(1e-6)
    }
}
