use crate::achievement::{AchievementPlan, DailyProgress};
use crate::engine::{FiscalWindow, MetricComparison, PeriodAggregator};
use crate::error::Result;
use crate::metrics::{MetricKind, MetricLayout, MetricVector, METRIC_CODES};
use crate::schema::EngineConfig;
use crate::store::{DailyLedger, MasterKind, PeriodStore};
use crate::utils::{fiscal_month, fiscal_year_for_date};
use crate::MonthKey;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Quarters, halves and the full year, cut off at the base date.
    Summary,
    /// Twelve single-month blocks with no cutoff.
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub title: String,
    pub window: FiscalWindow,
    pub months: Vec<MonthKey>,
    pub rows: Vec<MetricComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSet {
    pub kind: ReportKind,
    pub fiscal_year: i32,
    pub base_date: NaiveDate,
    pub blocks: Vec<PeriodReport>,
}

pub fn build_summary_report<S: PeriodStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
    base_date: NaiveDate,
) -> Result<ReportSet> {
    let fiscal_year = fiscal_year_for_date(base_date, config.fiscal_year_start_month);
    let aggregator = PeriodAggregator::new(store, config)?;

    let mut blocks = Vec::with_capacity(FiscalWindow::SUMMARY.len());
    for window in FiscalWindow::SUMMARY {
        let stats = aggregator.aggregate_window(fiscal_year, window, Some(base_date))?;
        blocks.push(PeriodReport {
            title: window.title(config.fiscal_year_start_month),
            window,
            rows: stats.comparisons(aggregator.layout()),
            months: stats.months,
        });
    }

    info!("Built summary report for FY{} as of {}", fiscal_year, base_date);
    Ok(ReportSet {
        kind: ReportKind::Summary,
        fiscal_year,
        base_date,
        blocks,
    })
}

/// Every month of the fiscal year, including months after `base_date`,
/// which come out as zero actuals against their targets.
pub fn build_monthly_report<S: PeriodStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
    base_date: NaiveDate,
) -> Result<ReportSet> {
    let fiscal_year = fiscal_year_for_date(base_date, config.fiscal_year_start_month);
    let aggregator = PeriodAggregator::new(store, config)?;

    let mut blocks = Vec::with_capacity(12);
    for window in FiscalWindow::monthly() {
        let stats = aggregator.aggregate_window(fiscal_year, window, None)?;
        let month = fiscal_month(
            fiscal_year,
            window.start_offset(),
            config.fiscal_year_start_month,
        );
        blocks.push(PeriodReport {
            title: format!("{} ({})", window.title(config.fiscal_year_start_month), month),
            window,
            rows: stats.comparisons(aggregator.layout()),
            months: stats.months,
        });
    }

    info!("Built monthly report for FY{}", fiscal_year);
    Ok(ReportSet {
        kind: ReportKind::Monthly,
        fiscal_year,
        base_date,
        blocks,
    })
}

fn format_value(kind: MetricKind, value: f64) -> String {
    match kind {
        MetricKind::Amount => format!("{:.0}", value),
        MetricKind::Quantity => format!("{:.2}", value),
    }
}

fn format_rate(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

impl ReportSet {
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut output = String::new();
        let heading = match self.kind {
            ReportKind::Summary => "Summary",
            ReportKind::Monthly => "Monthly report",
        };
        output.push_str(&format!(
            "{} - FY{} (base date {})\n\n",
            heading, self.fiscal_year, self.base_date
        ));

        for block in &self.blocks {
            output.push_str(&format!("== {} ==\n", block.title));
            output.push_str(&format!(
                "{:<30} {:>14} {:>14} {:>9} {:>14} {:>9}\n",
                "Metric", "Actual", "Target", "Achv", "Prior year", "YoY"
            ));
            for row in &block.rows {
                output.push_str(&format!(
                    "{:<30} {:>14} {:>14} {:>9} {:>14} {:>9}\n",
                    row.label,
                    format_value(row.kind, row.actual),
                    format_value(row.kind, row.target),
                    format_rate(row.achievement_rate),
                    format_value(row.kind, row.prior),
                    format_rate(row.yoy_rate),
                ));
            }
            output.push('\n');
        }

        output
    }

    /// One CSV record per period and metric.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record([
            "period",
            "metric",
            "kind",
            "actual",
            "target",
            "achievement_rate",
            "prior",
            "yoy_rate",
        ])?;

        for block in &self.blocks {
            for row in &block.rows {
                let kind = match row.kind {
                    MetricKind::Amount => "amount",
                    MetricKind::Quantity => "quantity",
                };
                csv.write_record([
                    block.title.clone(),
                    METRIC_CODES[row.index].to_string(),
                    kind.to_string(),
                    row.actual.to_string(),
                    row.target.to_string(),
                    row.achievement_rate.to_string(),
                    row.prior.to_string(),
                    row.yoy_rate.to_string(),
                ])?;
            }
        }

        csv.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSheetRow {
    pub day: u32,
    pub values: Option<MetricVector>,
    pub progress: DailyProgress,
}

/// The month sheet: 31 day rows with daily achievement ratios, then the footer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSheet {
    pub month: MonthKey,
    pub finalized: bool,
    pub plan: AchievementPlan,
    pub rows: Vec<LedgerSheetRow>,
    pub footer: MetricVector,
}

impl LedgerSheet {
    pub fn build(ledger: &DailyLedger, plan: AchievementPlan, layout: &MetricLayout) -> Self {
        let rows = ledger
            .days()
            .map(|(day, values)| LedgerSheetRow {
                day,
                values: values.copied(),
                progress: plan.progress(values),
            })
            .collect();

        Self {
            month: ledger.month,
            finalized: ledger.finalized,
            plan,
            rows,
            footer: ledger.footer(layout),
        }
    }

    /// Reads the ledger together with the month's target and working days.
    /// Returns `None` when no ledger exists for `month`.
    pub fn load<S: PeriodStore + ?Sized>(
        store: &S,
        config: &EngineConfig,
        month: MonthKey,
    ) -> Result<Option<Self>> {
        let ledger = match store.load_ledger(month)? {
            Some(ledger) => ledger,
            None => return Ok(None),
        };
        let targets = store.load_master(MasterKind::Target)?;
        let days = store.load_working_days()?;

        let plan = AchievementPlan::for_month(
            targets.get(&month),
            days.get(&month).copied(),
            config.channel_b_fixed_deduction,
        );
        Ok(Some(Self::build(&ledger, plan, &config.layout())))
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut output = String::new();
        let status = if self.finalized { " [finalized]" } else { "" };
        output.push_str(&format!("Ledger {}{}\n", self.month, status));
        output.push_str(&format!(
            "Daily targets: A {:.0} / B {:.0} / combined {:.0}\n\n",
            self.plan.daily_a, self.plan.daily_b, self.plan.daily_combined
        ));

        output.push_str(&format!("{:>4}", "Day"));
        for code in METRIC_CODES {
            output.push_str(&format!(" {:>14}", code));
        }
        output.push_str(&format!(" {:>8} {:>8} {:>8}\n", "A%", "B%", "All%"));

        for row in &self.rows {
            output.push_str(&format!("{:>4}", row.day));
            match &row.values {
                Some(values) => {
                    for value in values.iter() {
                        output.push_str(&format!(" {:>14}", value));
                    }
                    output.push_str(&format!(
                        " {:>8} {:>8} {:>8}\n",
                        format_rate(row.progress.a),
                        format_rate(row.progress.b),
                        format_rate(row.progress.combined)
                    ));
                }
                None => output.push('\n'),
            }
        }

        output.push_str(&format!("{:>4}", "Tot"));
        for value in self.footer.iter() {
            output.push_str(&format!(" {:>14.2}", value));
        }
        output.push('\n');
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::slot;
    use crate::store::MemoryStore;
    use crate::{MasterTable, WorkingDays, WorkingDaysTable};

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn amount(idx: usize, value: f64) -> MetricVector {
        let mut v = MetricVector::zeros();
        v[idx] = value;
        v
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut target = MasterTable::new();
        for offset in 0..12 {
            let m = fiscal_month(2024, offset, 4);
            store.append_daily(m, 1, amount(slot::A_TOTAL_AMOUNT, 100.0)).unwrap();
            target.insert(m, amount(slot::A_TOTAL_AMOUNT, 400.0));
        }
        store.replace_master(MasterKind::Target, &target).unwrap();
        store
    }

    #[test]
    fn test_summary_report_applies_cutoff() {
        let store = seeded_store();
        let config = EngineConfig::default();
        let base = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap();

        let report = build_summary_report(&store, &config, base).unwrap();
        assert_eq!(report.kind, ReportKind::Summary);
        assert_eq!(report.fiscal_year, 2024);
        assert_eq!(report.blocks.len(), 7);

        let titles: Vec<&str> = report.blocks.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles[0], "Q1 (Apr-Jun)");
        assert_eq!(titles[6], "Full year to date");

        let q2 = &report.blocks[1];
        assert_eq!(q2.months.len(), 2);
        assert_eq!(q2.rows[slot::A_TOTAL_AMOUNT].actual, 200.0);
        assert_eq!(q2.rows[slot::A_TOTAL_AMOUNT].achievement_rate, 0.25);

        let year = &report.blocks[6];
        assert_eq!(year.rows[slot::A_TOTAL_AMOUNT].actual, 500.0);
        assert_eq!(year.rows[slot::A_TOTAL_AMOUNT].target, 2000.0);
    }

    #[test]
    fn test_monthly_report_includes_future_months() {
        let mut store = MemoryStore::new();
        let mut target = MasterTable::new();
        target.insert(month(2025, 3), amount(slot::A_TOTAL_AMOUNT, 400.0));
        store.replace_master(MasterKind::Target, &target).unwrap();

        let config = EngineConfig::default();
        let base = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let report = build_monthly_report(&store, &config, base).unwrap();

        assert_eq!(report.blocks.len(), 12);
        assert_eq!(report.blocks[0].title, "April (2024_04)");
        let march = &report.blocks[11];
        assert_eq!(march.months, vec![month(2025, 3)]);
        assert_eq!(march.rows[slot::A_TOTAL_AMOUNT].actual, 0.0);
        assert_eq!(march.rows[slot::A_TOTAL_AMOUNT].target, 400.0);
        assert_eq!(march.rows[slot::A_TOTAL_AMOUNT].achievement_rate, 0.0);
    }

    #[test]
    fn test_report_rendering() {
        let store = seeded_store();
        let config = EngineConfig::default();
        let base = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let report = build_summary_report(&store, &config, base).unwrap();

        let text = report.render_text();
        assert!(text.contains("Summary - FY2024"));
        assert!(text.contains("== Q1 (Apr-Jun) =="));
        assert!(text.contains("25.0%"));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"kind\": \"summary\""));
        assert!(json.contains("\"achievement_rate\""));

        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        let csv_text = String::from_utf8(buffer).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(
            lines.next(),
            Some("period,metric,kind,actual,target,achievement_rate,prior,yoy_rate")
        );
        assert_eq!(csv_text.lines().count(), 1 + 7 * 17);
        assert!(csv_text.contains("Q1 (Apr-Jun),home_total_amt,amount,300,1200,0.25,0,0"));
    }

    #[test]
    fn test_ledger_sheet_rows_and_progress() {
        let mut store = MemoryStore::new();
        let april = month(2024, 4);

        let mut row = MetricVector::zeros();
        row[slot::A_TOTAL_AMOUNT] = 60_000.0;
        row[slot::B_TOTAL_AMOUNT] = 50_000.0;
        row[slot::ALL_TOTAL_AMOUNT] = 110_000.0;
        store.append_daily(april, 2, row).unwrap();

        let mut target = MasterTable::new();
        let mut t = amount(slot::A_TOTAL_AMOUNT, 1_200_000.0);
        t[slot::B_TOTAL_AMOUNT] = 8_000_000.0;
        target.insert(april, t);
        store.replace_master(MasterKind::Target, &target).unwrap();

        let mut days = WorkingDaysTable::new();
        days.insert(april, WorkingDays { channel_a: 20.0, channel_b: 20.0 });
        store.replace_working_days(&days).unwrap();

        let config = EngineConfig::default();
        let sheet = LedgerSheet::load(&store, &config, april).unwrap().unwrap();

        assert_eq!(sheet.rows.len(), 31);
        assert_eq!(sheet.plan.daily_b, 100_000.0);
        assert_eq!(sheet.rows[0].values, None);
        assert_eq!(sheet.rows[0].progress, DailyProgress::default());
        assert_eq!(sheet.rows[1].progress.b, 0.5);
        assert_eq!(sheet.rows[1].progress.a, 1.0);
        assert_eq!(sheet.footer[slot::ALL_TOTAL_AMOUNT], 110_000.0);

        let text = sheet.render_text();
        assert!(text.starts_with("Ledger 2024_04\n"));
        assert!(text.contains("home_total_amt"));

        assert!(LedgerSheet::load(&store, &config, month(2024, 5)).unwrap().is_none());
    }
}
