//! Bar decomposition of intake and carried debt for display.
//!
//! One bar is one target's worth of a nutrient. Whatever does not fit in the first bar
//! spills into extra bars; the number of extra bars drawn is capped but the underlying
//! amounts are untouched.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::ledger::compute_debt;
use crate::models::{LogHistory, Nutrient, Pfc, round2, safe_target};

pub const DEFAULT_MAX_BARS: usize = 10;
pub const DEFAULT_CHART_DAYS: u32 = 20;

/// Amounts of today's intake and carried debt that fall inside one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarSegment {
    pub current: f64,
    pub debt: f64,
}

impl BarSegment {
    fn rounded(current: f64, debt: f64) -> Self {
        Self {
            current: round2(current),
            debt: round2(debt),
        }
    }

    #[must_use]
    pub fn filled(&self) -> f64 {
        self.current + self.debt
    }

    /// Width of the intake portion as a percentage of the bar.
    #[must_use]
    pub fn current_pct(&self, target: f64) -> f64 {
        (self.current / safe_target(target) * 100.0).min(100.0)
    }

    /// Width of the debt overlay, drawn right after the intake portion.
    #[must_use]
    pub fn debt_pct(&self, target: f64) -> f64 {
        let current_pct = self.current_pct(target);
        (self.debt / safe_target(target) * 100.0).min(100.0 - current_pct)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarDecomposition {
    pub primary: BarSegment,
    pub extras: Vec<BarSegment>,
    /// Extra bars needed to show everything, before the cap.
    pub extra_bars_needed: usize,
}

impl BarDecomposition {
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.extras.len() < self.extra_bars_needed
    }
}

/// Split `current + debt` into target-width bars, drawing at most `max_bars` extra bars.
///
/// Segment amounts are rounded to 2 decimals; the split itself uses the unrounded inputs.
#[must_use]
pub fn decompose_bars(current: f64, debt: f64, target: f64, max_bars: usize) -> BarDecomposition {
    let target = safe_target(target);
    let current = current.max(0.0);
    let debt = debt.max(0.0);
    let total = current + debt;

    let primary_current = current.min(target);
    let primary = BarSegment::rounded(primary_current, (target - primary_current).min(debt));

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let extra_bars_needed = (round2(total - target).max(0.0) / target).ceil() as usize;

    let mut extras = Vec::new();
    for i in 0..extra_bars_needed.min(max_bars) {
        #[allow(clippy::cast_precision_loss)]
        let bar_start = (i + 1) as f64 * target;
        let debt_in_bar = (debt - bar_start).clamp(0.0, target);
        let current_in_bar = (total - bar_start - debt_in_bar).clamp(0.0, target - debt_in_bar);
        let segment = BarSegment::rounded(current_in_bar, debt_in_bar);
        if segment.filled() <= 0.0 {
            continue;
        }
        extras.push(segment);
    }

    BarDecomposition {
        primary,
        extras,
        extra_bars_needed,
    }
}

/// Bar decompositions for all four nutrients of one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientBars {
    pub protein: BarDecomposition,
    pub fat: BarDecomposition,
    pub carbs: BarDecomposition,
    pub calories: BarDecomposition,
}

impl NutrientBars {
    #[must_use]
    pub fn new(current: &Pfc, debt: &Pfc, target: &Pfc, max_bars: usize) -> Self {
        let bars = |n: Nutrient| decompose_bars(current.get(n), debt.get(n), target.get(n), max_bars);
        Self {
            protein: bars(Nutrient::Protein),
            fat: bars(Nutrient::Fat),
            carbs: bars(Nutrient::Carbs),
            calories: bars(Nutrient::Calories),
        }
    }

    #[must_use]
    pub fn get(&self, nutrient: Nutrient) -> &BarDecomposition {
        match nutrient {
            Nutrient::Protein => &self.protein,
            Nutrient::Fat => &self.fat,
            Nutrient::Carbs => &self.carbs,
            Nutrient::Calories => &self.calories,
        }
    }
}

/// One nutrient on one chart day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebtVisual {
    pub intake: f64,
    pub debt_within_limit: f64,
    pub overflow: f64,
    #[serde(skip_serializing)]
    pub next_carry: f64,
}

/// Intake capped at target, carried debt that still fits under target, and the overflow
/// that rolls into tomorrow's carry.
///
/// The displayed amounts are rounded to 2 decimals; `next_carry` is not, so chaining days
/// does not accumulate rounding.
#[must_use]
pub fn debt_visual(intake: f64, target: f64, carry: f64) -> DebtVisual {
    let target = safe_target(target);
    let intake_within_limit = intake.min(target);
    let debt_within_limit = carry.min((target - intake_within_limit).max(0.0));
    let overflow = (intake + carry - target).max(0.0);
    DebtVisual {
        intake: round2(intake_within_limit),
        debt_within_limit: round2(debt_within_limit),
        overflow: round2(overflow),
        next_carry: overflow,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtChartDay {
    pub date: NaiveDate,
    pub protein: DebtVisual,
    pub fat: DebtVisual,
    pub carbs: DebtVisual,
    pub calories: DebtVisual,
}

impl DebtChartDay {
    #[must_use]
    pub fn get(&self, nutrient: Nutrient) -> &DebtVisual {
        match nutrient {
            Nutrient::Protein => &self.protein,
            Nutrient::Fat => &self.fat,
            Nutrient::Carbs => &self.carbs,
            Nutrient::Calories => &self.calories,
        }
    }

    /// Debt under the limit summed over protein, fat and carbs.
    #[must_use]
    pub fn pfc_debt(&self) -> f64 {
        round2(self.protein.debt_within_limit + self.fat.debt_within_limit + self.carbs.debt_within_limit)
    }

    #[must_use]
    pub fn pfc_overflow(&self) -> f64 {
        round2(self.protein.overflow + self.fat.overflow + self.carbs.overflow)
    }
}

/// Chart rows for the `days` days ending at `reference`, oldest first.
///
/// The first day's carry is the ledger debt entering the window; after that each day's
/// overflow becomes the next day's carry.
#[must_use]
pub fn debt_chart(
    history: &LogHistory,
    target: &Pfc,
    reference: NaiveDate,
    days: u32,
) -> Vec<DebtChartDay> {
    if days == 0 {
        return Vec::new();
    }
    let start = reference
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(reference);
    let mut carry = compute_debt(history, target, start);

    start
        .iter_days()
        .take(days as usize)
        .map(|date| {
            let total = history.total_for(date);
            let visual = |n: Nutrient| debt_visual(total.get(n), target.get(n), carry.get(n));
            let day = DebtChartDay {
                date,
                protein: visual(Nutrient::Protein),
                fat: visual(Nutrient::Fat),
                carbs: visual(Nutrient::Carbs),
                calories: visual(Nutrient::Calories),
            };
            for n in Nutrient::ALL {
                carry.set(n, day.get(n).next_carry);
            }
            day
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::carry_forward;
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

    fn sum_all(bars: &BarDecomposition) -> f64 {
        bars.primary.filled() + bars.extras.iter().map(BarSegment::filled).sum::<f64>()
    }

    #[test]
    fn test_under_target_has_no_extra_bars() {
        let bars = decompose_bars(40.0, 30.0, 100.0, DEFAULT_MAX_BARS);
        assert_eq!(bars.primary, BarSegment { current: 40.0, debt: 30.0 });
        assert!(bars.extras.is_empty());
        assert_eq!(bars.extra_bars_needed, 0);
        assert!((bars.primary.current_pct(100.0) - 40.0).abs() < 1e-9);
        assert!((bars.primary.debt_pct(100.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_debt_overlay_limited_to_remaining_width() {
        let bars = decompose_bars(80.0, 50.0, 100.0, DEFAULT_MAX_BARS);
        assert_eq!(bars.primary, BarSegment { current: 80.0, debt: 20.0 });
        assert!((bars.primary.debt_pct(100.0) - 20.0).abs() < 1e-9);
        assert_eq!(bars.extra_bars_needed, 1);
    }

    #[test]
    fn test_debt_spills_into_extra_bars() {
        let bars = decompose_bars(0.0, 250.0, 100.0, DEFAULT_MAX_BARS);
        assert_eq!(bars.primary, BarSegment { current: 0.0, debt: 100.0 });
        assert_eq!(
            bars.extras,
            vec![
                BarSegment { current: 0.0, debt: 100.0 },
                BarSegment { current: 0.0, debt: 50.0 },
            ]
        );
    }

    #[test]
    fn test_intake_over_target_spills() {
        let bars = decompose_bars(150.0, 0.0, 100.0, DEFAULT_MAX_BARS);
        assert_eq!(bars.primary, BarSegment { current: 100.0, debt: 0.0 });
        assert_eq!(bars.extras, vec![BarSegment { current: 50.0, debt: 0.0 }]);
    }

    #[test]
    fn test_cap_limits_rendering_only() {
        let bars = decompose_bars(0.0, 1500.0, 100.0, DEFAULT_MAX_BARS);
        assert_eq!(bars.extra_bars_needed, 14);
        assert_eq!(bars.extras.len(), DEFAULT_MAX_BARS);
        assert!(bars.is_truncated());

        let uncapped = decompose_bars(0.0, 1500.0, 100.0, usize::MAX);
        assert_eq!(uncapped.extras.len(), 14);
        assert!(!uncapped.is_truncated());
    }

    #[test]
    fn test_conservation_without_cap() {
        let target = 60.0;
        for current in [0.0, 12.5, 59.9, 60.0, 95.0, 240.0, 611.0] {
            for debt in [0.0, 0.01, 30.0, 60.0, 121.0, 333.3] {
                let bars = decompose_bars(current, debt, target, usize::MAX);
                let total = sum_all(&bars);
                assert!(
                    (total - (current + debt)).abs() < 1e-9,
                    "current={current} debt={debt} total={total}"
                );
                for bar in std::iter::once(&bars.primary).chain(bars.extras.iter()) {
                    assert!(bar.filled() <= target + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_zero_target_is_clamped() {
        let bars = decompose_bars(2.0, 0.0, 0.0, DEFAULT_MAX_BARS);
        assert_eq!(bars.primary.current, 1.0);
        assert_eq!(bars.extras.len(), 1);
    }

    #[test]
    fn test_debt_visual() {
        let v = debt_visual(80.0, 100.0, 50.0);
        assert_eq!(v.intake, 80.0);
        assert_eq!(v.debt_within_limit, 20.0);
        assert_eq!(v.overflow, 30.0);
        assert_eq!(v.next_carry, 30.0);

        let under = debt_visual(40.0, 100.0, 10.0);
        assert_eq!(under.intake, 40.0);
        assert_eq!(under.debt_within_limit, 10.0);
        assert_eq!(under.overflow, 0.0);

        let over = debt_visual(140.0, 100.0, 0.0);
        assert_eq!(over.intake, 100.0);
        assert_eq!(over.debt_within_limit, 0.0);
        assert_eq!(over.overflow, 40.0);
    }

    #[test]
    fn test_chart_carry_matches_ledger_recurrence() {
        let history: LogHistory = [
            log("2024-01-01", Pfc::new(160.0, 70.0, 300.0, 2500.0)),
            log("2024-01-02", Pfc::new(130.0, 40.0, 100.0, 2300.0)),
            log("2024-01-04", Pfc::new(90.0, 90.0, 260.0, 1900.0)),
            log("2024-01-05", Pfc::new(210.0, 55.0, 240.0, 2600.0)),
        ]
        .into_iter()
        .collect();
        let rows = debt_chart(&history, &DEFAULT_TARGET, date("2024-01-06"), 4);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].date, date("2024-01-03"));
        assert_eq!(rows[3].date, date("2024-01-06"));

        // Each day's overflow equals the ledger debt entering the following day.
        for row in &rows {
            let next = row.date + Days::new(1);
            let ledger = carry_forward(&history, &DEFAULT_TARGET, Pfc::ZERO, date("2024-01-01"), next);
            for n in Nutrient::ALL {
                assert!((row.get(n).next_carry - ledger.get(n)).abs() < 0.01, "{n:?} on {}", row.date);
            }
        }
    }

    #[test]
    fn test_chart_seeds_with_window_debt() {
        let history: LogHistory = [log("2024-01-01", Pfc::new(300.0, 60.0, 250.0, 2000.0))]
            .into_iter()
            .collect();
        let rows = debt_chart(&history, &DEFAULT_TARGET, date("2024-01-02"), 1);
        // 200 g protein carried in; nothing eaten on the 2nd.
        assert_eq!(rows[0].protein.intake, 0.0);
        assert_eq!(rows[0].protein.debt_within_limit, 100.0);
        assert_eq!(rows[0].protein.overflow, 100.0);
        assert_eq!(rows[0].pfc_debt(), 100.0);
        assert_eq!(rows[0].pfc_overflow(), 100.0);
    }

    fn is_two_decimals(v: f64) -> bool {
        v == round2(v)
    }

    #[test]
    fn test_bar_segments_are_rounded() {
        let bars = decompose_bars(150.3, 0.0, 100.1, DEFAULT_MAX_BARS);
        assert_eq!(bars.extras, vec![BarSegment { current: 50.2, debt: 0.0 }]);

        for (current, debt, target) in [(150.3, 0.7, 100.1), (0.1, 333.33, 33.3), (99.99, 0.03, 0.3)] {
            let bars = decompose_bars(current, debt, target, usize::MAX);
            for bar in std::iter::once(&bars.primary).chain(bars.extras.iter()) {
                assert!(is_two_decimals(bar.current), "{bar:?}");
                assert!(is_two_decimals(bar.debt), "{bar:?}");
                assert!(bar.filled() > 0.0 || bars.extras.is_empty());
            }
            assert!((sum_all(&bars) - (current + debt)).abs() < 0.01 * (bars.extras.len() + 1) as f64);
        }
    }

    #[test]
    fn test_chart_values_are_rounded_but_carry_is_not() {
        let day = date("2024-01-01");
        let history: LogHistory = [DailyLog::with_items(
            day,
            ["a", "b"]
                .iter()
                .zip([100.1, 0.2])
                .map(|(id, protein)| FoodEntry {
                    id: (*id).to_string(),
                    name: "snack".to_string(),
                    nutrients: Pfc::new(protein, 0.0, 0.0, 0.0),
                    store: None,
                    timestamp: 0,
                })
                .collect(),
        )]
        .into_iter()
        .collect();
        let target = Pfc::new(100.0, 60.0, 250.0, 2000.0);
        let rows = debt_chart(&history, &target, date("2024-01-02"), 2);

        let protein = rows[0].protein;
        assert_eq!(protein.overflow, 0.3);
        assert!(is_two_decimals(protein.intake));
        assert!(is_two_decimals(protein.debt_within_limit));
        assert!((protein.next_carry - (100.1 + 0.2 - 100.0)).abs() < 1e-12);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["protein"]["overflow"], 0.3);
        assert!(json["protein"].get("next_carry").is_none());
        assert_eq!(rows[1].protein.debt_within_limit, 0.3);
    }

    #[test]
    fn test_chart_zero_days() {
        assert!(debt_chart(&LogHistory::new(), &DEFAULT_TARGET, date("2024-01-02"), 0).is_empty());
    }
}
