use anyhow::Result;

use pfc_core::models::Nutrient;
use pfc_core::service::PfcService;
use pfc_core::visualize::DebtChartDay;

use super::helpers::{
    TotalsRow, date_arg, format_amount, no_neg_zero, print_nutrient_table, print_totals_table,
};

pub(crate) fn cmd_debt(svc: &PfcService, date: Option<String>, json: bool) -> Result<()> {
    let date = date_arg(date)?;
    let report = svc.get_debt_report(&date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let (debt, target) = (report.debt, report.target);

    println!("Debt carried into {date}:\n");
    if debt.is_zero() {
        println!("  None. Intake is within target.");
        return Ok(());
    }
    let rows: Vec<_> = Nutrient::ALL
        .iter()
        .map(|&n| {
            (
                n,
                vec![
                    format_amount(n, debt.get(n)),
                    format_amount(n, target.get(n)),
                ],
            )
        })
        .collect();
    print_nutrient_table(&["Debt", "Target"], &rows);
    Ok(())
}

pub(crate) fn cmd_week(svc: &PfcService, date: Option<String>, json: bool) -> Result<()> {
    let date = date_arg(date)?;
    let out = svc.get_week_report(&date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let allowance = &out.allowance;
    println!(
        "Week of {} ({} day(s) left including {date})\n",
        allowance.week_start, allowance.remaining_days
    );
    let rows: Vec<_> = Nutrient::ALL
        .iter()
        .map(|&n| {
            (
                n,
                vec![
                    format_amount(n, out.target.get(n) * 7.0),
                    format_amount(n, allowance.consumed.get(n)),
                    format_amount(n, allowance.allowance.get(n)),
                    format_amount(n, out.average.average.get(n)),
                ],
            )
        })
        .collect();
    print_nutrient_table(&["Weekly budget", "Consumed", "Per day left", "7-day avg"], &rows);
    println!(
        "  Average over {} logged day(s) in the last 7",
        out.average.days_count
    );
    Ok(())
}

fn chart_row(day: &DebtChartDay) -> TotalsRow {
    let cell = |n: Nutrient| {
        let v = day.get(n);
        let mut s = format_amount(n, v.intake);
        if v.debt_within_limit > 0.0 {
            s.push_str(&format!(" +{}", format_amount(n, v.debt_within_limit)));
        }
        if v.overflow > 0.0 {
            s.push_str(&format!(" ({} over)", format_amount(n, no_neg_zero(v.overflow))));
        }
        s
    };
    TotalsRow {
        date: day.date.to_string(),
        protein: cell(Nutrient::Protein),
        fat: cell(Nutrient::Fat),
        carbs: cell(Nutrient::Carbs),
        calories: cell(Nutrient::Calories),
    }
}

pub(crate) fn cmd_chart(
    svc: &PfcService,
    date: Option<String>,
    days: u32,
    json: bool,
) -> Result<()> {
    let date = date_arg(date)?;
    let chart = svc.get_debt_chart(&date, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chart)?);
        return Ok(());
    }

    let rows: Vec<TotalsRow> = chart.iter().map(chart_row).collect();
    print_totals_table(&rows);
    println!("  Cells: intake capped at target, +carried debt, (overflow into next day)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pfc_core::visualize::debt_visual;

    #[test]
    fn test_chart_row_cells() {
        let day = DebtChartDay {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            protein: debt_visual(80.0, 100.0, 0.0),
            fat: debt_visual(50.0, 60.0, 30.0),
            carbs: debt_visual(300.0, 250.0, 0.0),
            calories: debt_visual(2000.0, 2000.0, 0.0),
        };
        let row = chart_row(&day);
        assert_eq!(row.date, "2024-06-15");
        assert_eq!(row.protein, "80.0g");
        assert_eq!(row.fat, "50.0g +10.0g (20.0g over)");
        assert_eq!(row.carbs, "250.0g (50.0g over)");
        assert_eq!(row.calories, "2000 kcal");
    }
}
