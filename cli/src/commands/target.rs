use anyhow::{Result, bail};
use serde::Serialize;

use pfc_core::models::{Nutrient, Pfc};
use pfc_core::service::PfcService;

use super::helpers::{format_amount, format_pfc};

/// Overlay any provided values on the current target.
fn merge_target(current: &Pfc, values: [Option<f64>; 4]) -> Pfc {
    let mut target = *current;
    for (n, value) in Nutrient::ALL.into_iter().zip(values) {
        if let Some(v) = value {
            target.set(n, v);
        }
    }
    target
}

pub(crate) fn cmd_target_set(
    svc: &PfcService,
    protein: Option<f64>,
    fat: Option<f64>,
    carbs: Option<f64>,
    calories: Option<f64>,
    json: bool,
) -> Result<()> {
    let values = [protein, fat, carbs, calories];
    if values.iter().all(Option::is_none) {
        bail!("Nothing to set. Provide at least one of --protein, --fat, --carbs, or --calories");
    }

    let target = merge_target(&svc.get_target()?, values);
    svc.set_target(&target)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&target)?);
    } else {
        println!("Daily target: {}", format_pfc(&target));
    }
    Ok(())
}

pub(crate) fn cmd_target_show(svc: &PfcService, json: bool) -> Result<()> {
    let target = svc.get_target()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&target)?);
        return Ok(());
    }
    for n in Nutrient::ALL {
        println!("  {:<9}{:>10}", n.label(), format_amount(n, target.get(n)));
    }
    Ok(())
}

pub(crate) fn cmd_target_calc(svc: &PfcService, apply: bool, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct CalcOutput {
        suggested: Pfc,
        applied: bool,
    }

    let suggested = if apply {
        svc.apply_suggested_target()?
    } else {
        svc.suggest_target()?
    };

    if json {
        let out = CalcOutput {
            suggested,
            applied: apply,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if apply {
        println!("Daily target set to suggestion: {}", format_pfc(&suggested));
    } else {
        println!("Suggested target: {}", format_pfc(&suggested));
        println!("  Run `pfc target calc --apply` to use it.");
    }
    Ok(())
}
