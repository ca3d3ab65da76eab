//! Weekly rebalancing of the daily target.
//!
//! Weeks start on Sunday. Whatever is left of `7 × target` after the days already eaten
//! this week is spread over the remaining days, today included. The result can shrink the
//! daily target to force catch-up but never raises it above the target.

use chrono::{Datelike, Days, NaiveDate};

use crate::models::{LogHistory, Nutrient, Pfc, WeeklyAllowance, WeeklyAverage, round2};

pub const DAYS_PER_WEEK: u32 = 7;

/// The most recent Sunday on or before `day`.
#[must_use]
pub fn week_start(day: NaiveDate) -> NaiveDate {
    let offset = u64::from(day.weekday().num_days_from_sunday());
    day.checked_sub_days(Days::new(offset)).unwrap_or(day)
}

/// Days left in the week including `day` itself (Sunday = 7, Saturday = 1).
#[must_use]
pub fn remaining_days(day: NaiveDate) -> u32 {
    DAYS_PER_WEEK - day.weekday().num_days_from_sunday()
}

/// Sum of logged totals for every date in `[from, until)`.
#[must_use]
pub fn consumed_between(history: &LogHistory, from: NaiveDate, until: NaiveDate) -> Pfc {
    from.iter_days()
        .take_while(|d| *d < until)
        .fold(Pfc::ZERO, |acc, d| acc.plus(&history.total_for(d)))
}

#[must_use]
pub fn compute_weekly_allowance(
    history: &LogHistory,
    target: &Pfc,
    today: NaiveDate,
) -> WeeklyAllowance {
    let target = target.safe_target();
    let start = week_start(today);
    let days_left = remaining_days(today);
    let consumed = consumed_between(history, start, today);

    let mut allowance = Pfc::ZERO;
    for n in Nutrient::ALL {
        let weekly_target = target.get(n) * f64::from(DAYS_PER_WEEK);
        let remaining_budget = (weekly_target - consumed.get(n)).max(0.0);
        let even = round2(remaining_budget / f64::from(days_left));
        allowance.set(n, round2(target.get(n).min(even)));
    }

    WeeklyAllowance {
        allowance,
        remaining_days: days_left,
        week_start: start,
        consumed: consumed.rounded(),
    }
}

/// Average daily intake over the seven days ending at `today`, counting only logged days.
#[must_use]
pub fn weekly_average(history: &LogHistory, today: NaiveDate) -> WeeklyAverage {
    let start = today
        .checked_sub_days(Days::new(u64::from(DAYS_PER_WEEK - 1)))
        .unwrap_or(today);
    let logged: Vec<Pfc> = start
        .iter_days()
        .take_while(|d| *d <= today)
        .filter_map(|d| history.get(d))
        .map(|l| l.total())
        .collect();

    if logged.is_empty() {
        return WeeklyAverage {
            average: Pfc::ZERO,
            days_count: 0,
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let count = logged.len() as f64;
    WeeklyAverage {
        average: Pfc::sum(&logged).map(|v| round2(v / count)),
        days_count: logged.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_TARGET, DailyLog, FoodEntry};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn log(day: &str, total: Pfc) -> DailyLog {
        DailyLog::with_items(
            date(day),
            vec![FoodEntry {
                id: day.to_string(),
                name: "meal".to_string(),
                nutrients: total,
                store: None,
                timestamp: 0,
            }],
        )
    }

    #[test]
    fn test_week_start_and_remaining_days() {
        // 2024-01-07 is a Sunday.
        assert_eq!(week_start(date("2024-01-07")), date("2024-01-07"));
        assert_eq!(remaining_days(date("2024-01-07")), 7);
        assert_eq!(week_start(date("2024-01-10")), date("2024-01-07"));
        assert_eq!(remaining_days(date("2024-01-10")), 4);
        assert_eq!(week_start(date("2024-01-13")), date("2024-01-07"));
        assert_eq!(remaining_days(date("2024-01-13")), 1);
    }

    #[test]
    fn test_wednesday_on_pace() {
        let history: LogHistory = [
            log("2024-01-07", Pfc::new(100.0, 60.0, 250.0, 2000.0)),
            log("2024-01-08", Pfc::new(100.0, 60.0, 250.0, 2000.0)),
            log("2024-01-09", Pfc::new(100.0, 60.0, 250.0, 2000.0)),
        ]
        .into_iter()
        .collect();
        let result = compute_weekly_allowance(&history, &DEFAULT_TARGET, date("2024-01-10"));
        assert_eq!(result.remaining_days, 4);
        assert_eq!(result.week_start, date("2024-01-07"));
        assert_eq!(result.consumed.calories, 6000.0);
        assert_eq!(result.allowance.calories, 2000.0);
        assert_eq!(result.allowance, DEFAULT_TARGET);
    }

    #[test]
    fn test_overage_is_amortized() {
        // 1000 kcal over on Sunday, spread across Mon..Sat.
        let history: LogHistory = [log("2024-01-07", Pfc::new(100.0, 60.0, 250.0, 3000.0))]
            .into_iter()
            .collect();
        let result = compute_weekly_allowance(&history, &DEFAULT_TARGET, date("2024-01-08"));
        assert_eq!(result.remaining_days, 6);
        // (14000 - 3000) / 6 = 1833.33
        assert_eq!(result.allowance.calories, 1833.33);
        assert_eq!(result.allowance.protein, 100.0);
    }

    #[test]
    fn test_under_budget_never_exceeds_target() {
        let history = LogHistory::new();
        let result = compute_weekly_allowance(&history, &DEFAULT_TARGET, date("2024-01-12"));
        assert_eq!(result.allowance, DEFAULT_TARGET);
    }

    #[test]
    fn test_budget_exhausted_gives_zero() {
        let history: LogHistory = [log("2024-01-07", Pfc::new(900.0, 60.0, 250.0, 2000.0))]
            .into_iter()
            .collect();
        let result = compute_weekly_allowance(&history, &DEFAULT_TARGET, date("2024-01-09"));
        assert_eq!(result.allowance.protein, 0.0);
    }

    #[test]
    fn test_today_and_previous_week_are_excluded() {
        let history: LogHistory = [
            log("2024-01-06", Pfc::new(500.0, 500.0, 500.0, 9000.0)),
            log("2024-01-09", Pfc::new(500.0, 500.0, 500.0, 9000.0)),
        ]
        .into_iter()
        .collect();
        let result = compute_weekly_allowance(&history, &DEFAULT_TARGET, date("2024-01-09"));
        assert_eq!(result.consumed, Pfc::ZERO);
        assert_eq!(result.allowance, DEFAULT_TARGET);
    }

    #[test]
    fn test_allowance_bounded_and_monotonic() {
        let today = date("2024-01-11");
        let mut previous = f64::INFINITY;
        for step in 0..40 {
            let protein = f64::from(step) * 25.0;
            let history: LogHistory = [log("2024-01-08", Pfc::new(protein, 60.0, 250.0, 2000.0))]
                .into_iter()
                .collect();
            let result = compute_weekly_allowance(&history, &DEFAULT_TARGET, today);
            for n in Nutrient::ALL {
                assert!(result.allowance.get(n) <= DEFAULT_TARGET.get(n));
            }
            assert!(result.allowance.protein <= previous);
            previous = result.allowance.protein;
        }
    }

    #[test]
    fn test_weekly_average_counts_logged_days() {
        let history: LogHistory = [
            log("2024-01-04", Pfc::new(999.0, 999.0, 999.0, 9999.0)),
            log("2024-01-05", Pfc::new(100.0, 50.0, 200.0, 1800.0)),
            log("2024-01-11", Pfc::new(80.0, 70.0, 250.0, 2100.0)),
        ]
        .into_iter()
        .collect();
        let avg = weekly_average(&history, date("2024-01-11"));
        assert_eq!(avg.days_count, 2);
        assert_eq!(avg.average, Pfc::new(90.0, 60.0, 225.0, 1950.0));
    }

    #[test]
    fn test_weekly_average_empty() {
        let avg = weekly_average(&LogHistory::new(), date("2024-01-11"));
        assert_eq!(avg.days_count, 0);
        assert_eq!(avg.average, Pfc::ZERO);
    }
}
