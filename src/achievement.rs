//! Daily achievement baselines derived from a month's target and working days.

use crate::metrics::{slot, MetricVector};
use crate::WorkingDays;
use serde::Serialize;

/// `amount / basis` when the basis is positive, else 0. A zero or negative
/// day count or daily target never yields a baseline or a ratio.
fn over_positive(amount: f64, basis: f64) -> f64 {
    if basis > 0.0 {
        amount / basis
    } else {
        0.0
    }
}

/// Daily target baselines for one month.
///
/// All three baselines are 0 unless the month has both a target vector and a
/// working-day entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AchievementPlan {
    pub daily_a: f64,
    pub daily_b: f64,
    pub daily_combined: f64,
}

/// One day's actuals as a fraction of the daily baselines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyProgress {
    pub a: f64,
    pub b: f64,
    pub combined: f64,
}

impl AchievementPlan {
    /// Channel B carries a fixed monthly allowance that is taken off its target
    /// before the remainder is spread over its working days.
    pub fn for_month(
        target: Option<&MetricVector>,
        days: Option<WorkingDays>,
        fixed_deduction: f64,
    ) -> Self {
        let (target, days) = match (target, days) {
            (Some(target), Some(days)) => (target, days),
            _ => return Self::default(),
        };

        let daily_a = over_positive(target[slot::A_TOTAL_AMOUNT], days.channel_a);
        let daily_b = over_positive(
            (target[slot::B_TOTAL_AMOUNT] - fixed_deduction).max(0.0),
            days.channel_b,
        );

        Self {
            daily_a,
            daily_b,
            daily_combined: daily_a + daily_b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.daily_a == 0.0 && self.daily_b == 0.0
    }

    pub fn progress(&self, row: Option<&MetricVector>) -> DailyProgress {
        match row {
            Some(row) => DailyProgress {
                a: over_positive(row[slot::A_TOTAL_AMOUNT], self.daily_a),
                b: over_positive(row[slot::B_TOTAL_AMOUNT], self.daily_b),
                combined: over_positive(row[slot::ALL_TOTAL_AMOUNT], self.daily_combined),
            },
            None => DailyProgress::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DEFAULT_CHANNEL_B_FIXED_DEDUCTION;

    fn target(a: f64, b: f64) -> MetricVector {
        let mut v = MetricVector::zeros();
        v[slot::A_TOTAL_AMOUNT] = a;
        v[slot::B_TOTAL_AMOUNT] = b;
        v
    }

    #[test]
    fn test_channel_b_deduction() {
        let t = target(0.0, 14_000_000.0);
        let days = WorkingDays { channel_a: 0.0, channel_b: 20.0 };
        let plan = AchievementPlan::for_month(Some(&t), Some(days), DEFAULT_CHANNEL_B_FIXED_DEDUCTION);

        assert_eq!(plan.daily_b, 400_000.0);
        assert_eq!(plan.daily_a, 0.0);
        assert_eq!(plan.daily_combined, 400_000.0);
    }

    #[test]
    fn test_daily_progress_ratio() {
        let t = target(3_000_000.0, 8_000_000.0);
        let days = WorkingDays { channel_a: 25.0, channel_b: 20.0 };
        // Deduction of 6,000,000 leaves 2,000,000 over 20 days
        let plan = AchievementPlan::for_month(Some(&t), Some(days), 6_000_000.0);
        assert_eq!(plan.daily_a, 120_000.0);
        assert_eq!(plan.daily_b, 100_000.0);

        let mut row = MetricVector::zeros();
        row[slot::B_TOTAL_AMOUNT] = 50_000.0;
        row[slot::A_TOTAL_AMOUNT] = 60_000.0;
        row[slot::ALL_TOTAL_AMOUNT] = 110_000.0;
        let progress = plan.progress(Some(&row));
        assert_eq!(progress.b, 0.5);
        assert_eq!(progress.a, 0.5);
        assert_eq!(progress.combined, 0.5);
    }

    #[test]
    fn test_deduction_larger_than_target_clamps_to_zero() {
        let t = target(1_000_000.0, 5_000_000.0);
        let days = WorkingDays { channel_a: 20.0, channel_b: 20.0 };
        let plan = AchievementPlan::for_month(Some(&t), Some(days), 6_000_000.0);
        assert_eq!(plan.daily_b, 0.0);
        assert_eq!(plan.daily_combined, plan.daily_a);

        let progress = plan.progress(Some(&target(10.0, 10.0)));
        assert_eq!(progress.b, 0.0);
    }

    #[test]
    fn test_missing_inputs_give_empty_plan() {
        let t = target(1_000_000.0, 8_000_000.0);
        let days = WorkingDays { channel_a: 20.0, channel_b: 20.0 };

        assert!(AchievementPlan::for_month(None, Some(days), 0.0).is_empty());
        assert!(AchievementPlan::for_month(Some(&t), None, 0.0).is_empty());

        let zero_days = WorkingDays::default();
        let plan = AchievementPlan::for_month(Some(&t), Some(zero_days), 0.0);
        assert!(plan.is_empty());
        assert_eq!(plan.progress(Some(&t)), DailyProgress::default());
    }

    #[test]
    fn test_negative_target_gives_zero_progress() {
        let t = target(-2_000_000.0, 8_000_000.0);
        let days = WorkingDays { channel_a: 20.0, channel_b: 20.0 };
        let plan = AchievementPlan::for_month(Some(&t), Some(days), 6_000_000.0);
        assert_eq!(plan.daily_a, -100_000.0);
        // -100,000 + 100,000
        assert_eq!(plan.daily_combined, 0.0);

        let mut row = MetricVector::zeros();
        row[slot::A_TOTAL_AMOUNT] = 50_000.0;
        row[slot::B_TOTAL_AMOUNT] = 50_000.0;
        row[slot::ALL_TOTAL_AMOUNT] = 100_000.0;
        let progress = plan.progress(Some(&row));
        assert_eq!(progress.a, 0.0);
        assert_eq!(progress.b, 0.5);
        assert_eq!(progress.combined, 0.0);

        let negative_days = WorkingDays { channel_a: -5.0, channel_b: 20.0 };
        let plan = AchievementPlan::for_month(Some(&target(1_000_000.0, 0.0)), Some(negative_days), 0.0);
        assert_eq!(plan.daily_a, 0.0);
    }

    #[test]
    fn test_fractional_working_days_are_not_rounded() {
        let t = target(2_160_000.0, 0.0);
        let days = WorkingDays { channel_a: 21.6, channel_b: 20.0 };
        let plan = AchievementPlan::for_month(Some(&t), Some(days), 6_000_000.0);
        assert!((plan.daily_a - 100_000.0).abs() < 1e-6);

        let mut row = MetricVector::zeros();
        row[slot::A_TOTAL_AMOUNT] = 50_000.0;
        assert!((plan.progress(Some(&row)).a - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_blank_day_progress_is_zero() {
        let t = target(2_000_000.0, 8_000_000.0);
        let days = WorkingDays { channel_a: 20.0, channel_b: 20.0 };
        let plan = AchievementPlan::for_month(Some(&t), Some(days), 6_000_000.0);
        assert_eq!(plan.progress(None), DailyProgress::default());
    }
}
