use crate::error::Result;
use crate::metrics::{MetricKind, MetricLayout, MetricVector, METRIC_COUNT, METRIC_LABELS};
use crate::schema::EngineConfig;
use crate::store::{MasterKind, PeriodStore};
use crate::utils::fiscal_month;
use crate::{MasterTable, MonthKey};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Running sums and counts per metric slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatObject {
    pub sums: MetricVector,
    pub counts: MetricVector,
}

impl StatObject {
    pub fn accumulate(&mut self, sums: &MetricVector, counts: &MetricVector) {
        self.sums += sums;
        self.counts += counts;
    }

    /// The reported figure for one slot: the raw sum for amounts,
    /// sum over count for quantities (0 when nothing was counted).
    pub fn resolve(&self, idx: usize, layout: &MetricLayout) -> f64 {
        match layout.kind(idx) {
            MetricKind::Amount => self.sums[idx],
            MetricKind::Quantity => ratio(self.sums[idx], self.counts[idx]),
        }
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// A span of consecutive fiscal months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalWindow {
    Q1,
    Q2,
    Q3,
    Q4,
    FirstHalf,
    SecondHalf,
    FullYear,
    /// A single month, by 0-based fiscal offset.
    Month(u32),
}

impl FiscalWindow {
    pub const SUMMARY: [FiscalWindow; 7] = [
        FiscalWindow::Q1,
        FiscalWindow::Q2,
        FiscalWindow::Q3,
        FiscalWindow::Q4,
        FiscalWindow::FirstHalf,
        FiscalWindow::SecondHalf,
        FiscalWindow::FullYear,
    ];

    pub fn monthly() -> impl Iterator<Item = FiscalWindow> {
        (0..12).map(FiscalWindow::Month)
    }

    pub fn start_offset(&self) -> u32 {
        match self {
            FiscalWindow::Q1 | FiscalWindow::FirstHalf | FiscalWindow::FullYear => 0,
            FiscalWindow::Q2 => 3,
            FiscalWindow::Q3 | FiscalWindow::SecondHalf => 6,
            FiscalWindow::Q4 => 9,
            FiscalWindow::Month(offset) => *offset,
        }
    }

    pub fn month_count(&self) -> u32 {
        match self {
            FiscalWindow::Q1 | FiscalWindow::Q2 | FiscalWindow::Q3 | FiscalWindow::Q4 => 3,
            FiscalWindow::FirstHalf | FiscalWindow::SecondHalf => 6,
            FiscalWindow::FullYear => 12,
            FiscalWindow::Month(_) => 1,
        }
    }

    pub fn title(&self, fiscal_start_month: u32) -> String {
        let month_index = |offset: u32| ((fiscal_start_month + 11 + offset) % 12) as usize;
        let span = || {
            let first = MONTH_ABBR[month_index(self.start_offset())];
            let last = MONTH_ABBR[month_index(self.start_offset() + self.month_count() - 1)];
            format!("{}-{}", first, last)
        };

        match self {
            FiscalWindow::Q1 => format!("Q1 ({})", span()),
            FiscalWindow::Q2 => format!("Q2 ({})", span()),
            FiscalWindow::Q3 => format!("Q3 ({})", span()),
            FiscalWindow::Q4 => format!("Q4 ({})", span()),
            FiscalWindow::FirstHalf => format!("First half ({})", span()),
            FiscalWindow::SecondHalf => format!("Second half ({})", span()),
            FiscalWindow::FullYear => "Full year to date".to_string(),
            FiscalWindow::Month(offset) => MONTH_NAMES[month_index(*offset)].to_string(),
        }
    }
}

/// One metric row of a period report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub index: usize,
    pub label: &'static str,
    pub kind: MetricKind,
    pub actual: f64,
    pub target: f64,
    pub achievement_rate: f64,
    pub prior: f64,
    pub yoy_rate: f64,
}

/// The three accumulators for one period, plus the months that fed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodStats {
    pub actual: StatObject,
    pub target: StatObject,
    pub prev: StatObject,
    pub months: Vec<MonthKey>,
}

impl PeriodStats {
    pub fn comparisons(&self, layout: &MetricLayout) -> Vec<MetricComparison> {
        (0..METRIC_COUNT)
            .map(|idx| {
                let actual = self.actual.resolve(idx, layout);
                let target = self.target.resolve(idx, layout);
                let prior = self.prev.resolve(idx, layout);
                MetricComparison {
                    index: idx,
                    label: METRIC_LABELS[idx],
                    kind: layout.kind(idx),
                    actual,
                    target,
                    achievement_rate: ratio(actual, target),
                    prior,
                    yoy_rate: ratio(actual, prior),
                }
            })
            .collect()
    }
}

/// Rolls ledgers and master figures up over fiscal month ranges.
///
/// Target and prior-year tables are read once when the aggregator is built;
/// ledgers are read per month on every call.
pub struct PeriodAggregator<'a, S: PeriodStore + ?Sized> {
    store: &'a S,
    config: &'a EngineConfig,
    layout: MetricLayout,
    targets: MasterTable,
    priors: MasterTable,
}

impl<'a, S: PeriodStore + ?Sized> PeriodAggregator<'a, S> {
    pub fn new(store: &'a S, config: &'a EngineConfig) -> Result<Self> {
        config.validate()?;
        let targets = store.load_master(MasterKind::Target)?;
        let priors = store.load_master(MasterKind::PriorYear)?;
        debug!(
            "Loaded {} target months and {} prior-year months",
            targets.len(),
            priors.len()
        );

        Ok(Self {
            store,
            config,
            layout: config.layout(),
            targets,
            priors,
        })
    }

    pub fn layout(&self) -> &MetricLayout {
        &self.layout
    }

    /// Aggregates `month_count` fiscal months from `start_offset` (0 = first fiscal month).
    ///
    /// With a `base_date`, months starting after it are left out entirely so that
    /// future periods never show up as a shortfall.
    pub fn aggregate(
        &self,
        fiscal_year: i32,
        start_offset: u32,
        month_count: u32,
        base_date: Option<NaiveDate>,
    ) -> Result<PeriodStats> {
        let mut stats = PeriodStats::default();
        let month_weights = MetricVector::filled(1.0);
        let zeros = MetricVector::zeros();

        for offset in start_offset..start_offset + month_count {
            let month = fiscal_month(fiscal_year, offset, self.config.fiscal_year_start_month);

            if let Some(base) = base_date {
                if month.first_day() > base {
                    debug!("Skipping {}: starts after base date {}", month, base);
                    continue;
                }
            }

            let actual = self.actual_totals(month)?;
            stats.actual.accumulate(&actual.sums, &actual.counts);

            let target = self.targets.get(&month).unwrap_or(&zeros);
            stats.target.accumulate(target, &month_weights);

            let prior = self.priors.get(&month.previous_year()).unwrap_or(&zeros);
            stats.prev.accumulate(prior, &month_weights);

            stats.months.push(month);
        }

        debug!(
            "FY{} offsets {}..{}: {} month(s) included",
            fiscal_year,
            start_offset,
            start_offset + month_count,
            stats.months.len()
        );
        Ok(stats)
    }

    pub fn aggregate_window(
        &self,
        fiscal_year: i32,
        window: FiscalWindow,
        base_date: Option<NaiveDate>,
    ) -> Result<PeriodStats> {
        self.aggregate(
            fiscal_year,
            window.start_offset(),
            window.month_count(),
            base_date,
        )
    }

    /// Ledger totals for one month, with quantity counts replaced by the
    /// month's calendar length. Amount counts keep the populated-day count.
    fn actual_totals(&self, month: MonthKey) -> Result<StatObject> {
        let mut totals = self
            .store
            .load_ledger(month)?
            .map(|ledger| ledger.totals())
            .unwrap_or_default();

        let days = month.days_in_month() as f64;
        for idx in self.layout.quantity_slots() {
            totals.counts[idx] = days;
        }
        Ok(totals)
    }
}
