use anyhow::Result;
use std::process;

use pfc_core::models::Nutrient;
use pfc_core::service::PfcService;
use pfc_core::visualize::BarDecomposition;

use super::helpers::{
    BAR_WIDTH, TotalsRow, date_arg, format_amount, print_nutrient_table, print_totals_table,
    render_bar, truncate,
};
use super::log::short_id;

fn bar_lines(bars: &BarDecomposition, target: f64) -> Vec<String> {
    let mut lines = vec![render_bar(&bars.primary, target, BAR_WIDTH)];
    lines.extend(bars.extras.iter().map(|seg| render_bar(seg, target, BAR_WIDTH)));
    if bars.is_truncated() {
        let hidden = bars.extra_bars_needed - bars.extras.len();
        lines.push(format!("(+{hidden} more)"));
    }
    lines
}

pub(crate) fn cmd_summary(
    svc: &PfcService,
    date: Option<String>,
    max_bars: usize,
    json: bool,
) -> Result<()> {
    let date = date_arg(date)?;
    let summary = svc.get_day_summary(&date, max_bars)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("=== {} ===\n", summary.date);

    if summary.log.is_empty() {
        println!("  No entries");
    }
    for e in summary.log.items() {
        let store = e
            .store
            .as_ref()
            .map(|s| format!(" ({s})"))
            .unwrap_or_default();
        let p = &e.nutrients;
        println!(
            "  [{}] {}{store} | P:{:.1}g F:{:.1}g C:{:.1}g {:.0} kcal",
            short_id(&e.id),
            truncate(&e.name, 40),
            p.protein,
            p.fat,
            p.carbs,
            p.calories
        );
    }
    println!();

    let total = summary.log.total();
    let rows: Vec<_> = Nutrient::ALL
        .iter()
        .map(|&n| {
            (
                n,
                vec![
                    format_amount(n, total.get(n)),
                    format_amount(n, summary.target.get(n)),
                    format_amount(n, summary.debt.get(n)),
                    format_amount(n, summary.allowance.allowance.get(n)),
                ],
            )
        })
        .collect();
    print_nutrient_table(&["Intake", "Target", "Debt", "Today's allowance"], &rows);

    if summary.adjusted {
        println!(
            "  Allowance adjusted for {} remaining day(s) this week (from {})",
            summary.allowance.remaining_days, summary.allowance.week_start
        );
    }
    println!();

    for n in Nutrient::ALL {
        let lines = bar_lines(summary.bars.get(n), summary.target.get(n));
        println!("  {:<9}{}", n.label(), lines[0]);
        for line in &lines[1..] {
            println!("  {:<9}{line}", "");
        }
    }

    Ok(())
}

pub(crate) fn cmd_history(svc: &PfcService, days: u32, json: bool) -> Result<()> {
    let today = date_arg(None)?;
    let totals = svc.list_daily_totals(&today, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    if totals.is_empty() {
        eprintln!("No entries in the last {days} day(s)");
        process::exit(2);
    }

    let rows: Vec<TotalsRow> = totals
        .iter()
        .map(|t| TotalsRow::new(format!("{} ({})", t.date, t.entry_count), &t.total))
        .collect();
    print_totals_table(&rows);
    Ok(())
}
