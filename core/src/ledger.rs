//! Nutrient debt ledger.
//!
//! Debt is replayed one calendar day at a time from the first logged date. A day without a
//! log still counts: it is a zero-intake day and repays one full target.

use chrono::{Days, NaiveDate};

use crate::models::{LogHistory, Nutrient, Pfc};

/// Advance the debt recurrence by one day.
///
/// Each nutrient is floored at zero independently, so an under-target day can pay debt
/// down but never banks credit for later.
#[must_use]
pub fn step(debt: &Pfc, day_total: &Pfc, target: &Pfc) -> Pfc {
    let mut next = Pfc::ZERO;
    for n in Nutrient::ALL {
        next.set(n, (debt.get(n) + day_total.get(n) - target.get(n)).max(0.0));
    }
    next
}

/// Replay the recurrence over `[from, until)` starting from `opening` debt.
///
/// Returns the unrounded debt so that consecutive ranges can be chained.
#[must_use]
pub fn carry_forward(
    history: &LogHistory,
    target: &Pfc,
    opening: Pfc,
    from: NaiveDate,
    until: NaiveDate,
) -> Pfc {
    let target = target.safe_target();
    let mut debt = opening;
    let mut day = from;
    while day < until {
        debt = step(&debt, &history.total_for(day), &target);
        let Some(next) = day.checked_add_days(Days::new(1)) else {
            break;
        };
        day = next;
    }
    debt
}

/// Outstanding debt entering `as_of`, rounded to 2 decimals.
#[must_use]
pub fn compute_debt(history: &LogHistory, target: &Pfc, as_of: NaiveDate) -> Pfc {
    let Some(first) = history.first_date() else {
        return Pfc::ZERO;
    };
    carry_forward(history, target, Pfc::ZERO, first, as_of).rounded()
}
