//! The fixed 17-slot metric layout shared by ledgers, master tables and reports.
//!
//! Slots 0–6 belong to channel A (home delivery), 7–13 to channel B (direct
//! sales) and 14–16 are company-wide. Each channel block is laid out as
//! {total amount, dairy amount, dairy qty, Y400 amount, Y400 qty, Y1000 amount,
//! Y1000 qty}.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Index, IndexMut};

pub const METRIC_COUNT: usize = 17;

/// Slot indices into a [`MetricVector`].
pub mod slot {
    pub const A_TOTAL_AMOUNT: usize = 0;
    pub const A_DAIRY_AMOUNT: usize = 1;
    pub const A_DAIRY_QTY: usize = 2;
    pub const A_MID_AMOUNT: usize = 3;
    pub const A_MID_QTY: usize = 4;
    pub const A_PREMIUM_AMOUNT: usize = 5;
    pub const A_PREMIUM_QTY: usize = 6;

    pub const B_TOTAL_AMOUNT: usize = 7;
    pub const B_DAIRY_AMOUNT: usize = 8;
    pub const B_DAIRY_QTY: usize = 9;
    pub const B_MID_AMOUNT: usize = 10;
    pub const B_MID_QTY: usize = 11;
    pub const B_PREMIUM_AMOUNT: usize = 12;
    pub const B_PREMIUM_QTY: usize = 13;

    pub const ALL_TOTAL_AMOUNT: usize = 14;
    pub const ALL_DAIRY_AMOUNT: usize = 15;
    pub const ALL_DAIRY_QTY: usize = 16;
}

pub const DEFAULT_QUANTITY_SLOTS: [usize; 7] = [
    slot::A_DAIRY_QTY,
    slot::A_MID_QTY,
    slot::A_PREMIUM_QTY,
    slot::B_DAIRY_QTY,
    slot::B_MID_QTY,
    slot::B_PREMIUM_QTY,
    slot::ALL_DAIRY_QTY,
];

pub const METRIC_LABELS: [&str; METRIC_COUNT] = [
    "Home delivery total sales",
    "Home delivery dairy sales",
    "Home delivery dairy units",
    "Home delivery Y400 sales",
    "Home delivery Y400 units",
    "Home delivery Y1000 sales",
    "Home delivery Y1000 units",
    "Direct sales total sales",
    "Direct sales dairy sales",
    "Direct sales dairy units",
    "Direct sales Y400 sales",
    "Direct sales Y400 units",
    "Direct sales Y1000 sales",
    "Direct sales Y1000 units",
    "Company total sales",
    "Company dairy sales",
    "Company dairy units",
];

/// Short machine-friendly column names, used as CSV headers.
pub const METRIC_CODES: [&str; METRIC_COUNT] = [
    "home_total_amt",
    "home_dairy_amt",
    "home_dairy_qty",
    "home_y400_amt",
    "home_y400_qty",
    "home_y1000_amt",
    "home_y1000_qty",
    "direct_total_amt",
    "direct_dairy_amt",
    "direct_dairy_qty",
    "direct_y400_amt",
    "direct_y400_qty",
    "direct_y1000_amt",
    "direct_y1000_qty",
    "all_total_amt",
    "all_dairy_amt",
    "all_dairy_qty",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricVector([f64; METRIC_COUNT]);

impl MetricVector {
    pub fn new(values: [f64; METRIC_COUNT]) -> Self {
        Self(values)
    }

    pub fn zeros() -> Self {
        Self([0.0; METRIC_COUNT])
    }

    pub fn filled(value: f64) -> Self {
        Self([value; METRIC_COUNT])
    }

    pub fn values(&self) -> &[f64; METRIC_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }
}

impl From<[f64; METRIC_COUNT]> for MetricVector {
    fn from(values: [f64; METRIC_COUNT]) -> Self {
        Self(values)
    }
}

impl Index<usize> for MetricVector {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.0[idx]
    }
}

impl IndexMut<usize> for MetricVector {
    fn index_mut(&mut self, idx: usize) -> &mut f64 {
        &mut self.0[idx]
    }
}

impl AddAssign<&MetricVector> for MetricVector {
    fn add_assign(&mut self, rhs: &MetricVector) {
        for (lhs, r) in self.0.iter_mut().zip(rhs.0.iter()) {
            *lhs += r;
        }
    }
}

impl Add for MetricVector {
    type Output = MetricVector;

    fn add(mut self, rhs: MetricVector) -> MetricVector {
        self += &rhs;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Currency figure, aggregated by sum.
    Amount,
    /// Units sold, aggregated by average over its count basis.
    Quantity,
}

/// Slot → aggregation kind. Every aggregation path reads this table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLayout {
    kinds: [MetricKind; METRIC_COUNT],
}

impl MetricLayout {
    /// Builds a layout where the given slots are quantities and the rest are amounts.
    /// Out-of-range indices are ignored here; `EngineConfig::validate` rejects them.
    pub fn from_quantity_slots(quantity_slots: &[usize]) -> Self {
        let mut kinds = [MetricKind::Amount; METRIC_COUNT];
        for &idx in quantity_slots {
            if idx < METRIC_COUNT {
                kinds[idx] = MetricKind::Quantity;
            }
        }
        Self { kinds }
    }

    pub fn kind(&self, idx: usize) -> MetricKind {
        self.kinds[idx]
    }

    pub fn is_quantity(&self, idx: usize) -> bool {
        self.kinds[idx] == MetricKind::Quantity
    }

    pub fn quantity_slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..METRIC_COUNT).filter(move |&i| self.is_quantity(i))
    }
}

impl Default for MetricLayout {
    fn default() -> Self {
        Self::from_quantity_slots(&DEFAULT_QUANTITY_SLOTS)
    }
}
