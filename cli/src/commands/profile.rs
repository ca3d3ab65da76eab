use anyhow::{Result, bail};
use serde::Serialize;
use std::process;

use pfc_core::models::{ACTIVITY_LEVELS, Gender, UserProfile};
use pfc_core::profile::{basal_metabolic_rate, body_mass_index};
use pfc_core::service::PfcService;

use super::helpers::json_error;

pub(crate) fn parse_gender(s: &str) -> Result<Gender> {
    match s.to_lowercase().as_str() {
        "male" | "m" => Ok(Gender::Male),
        "female" | "f" => Ok(Gender::Female),
        _ => bail!("Invalid gender: {s}. Use male or female"),
    }
}

pub(crate) struct ProfileArgs {
    pub gender: Option<String>,
    pub age: Option<u32>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub activity: Option<f64>,
}

impl ProfileArgs {
    fn is_empty(&self) -> bool {
        self.gender.is_none()
            && self.age.is_none()
            && self.height.is_none()
            && self.weight.is_none()
            && self.target_weight.is_none()
            && self.activity.is_none()
    }

    /// Overlay on `base`; without a stored profile, gender and age must be given.
    fn apply(self, base: Option<UserProfile>) -> Result<UserProfile> {
        let gender = self.gender.as_deref().map(parse_gender).transpose()?;
        let mut profile = match base {
            Some(p) => p,
            None => {
                let (Some(gender), Some(age), Some(height), Some(weight)) =
                    (gender, self.age, self.height, self.weight)
                else {
                    bail!("No profile yet. Provide --gender, --age, --height and --weight");
                };
                UserProfile {
                    gender,
                    age,
                    height,
                    weight,
                    target_weight: weight,
                    activity_level: ACTIVITY_LEVELS[0],
                }
            }
        };
        if let Some(g) = gender {
            profile.gender = g;
        }
        if let Some(a) = self.age {
            profile.age = a;
        }
        if let Some(h) = self.height {
            profile.height = h;
        }
        if let Some(w) = self.weight {
            profile.weight = w;
        }
        if let Some(t) = self.target_weight {
            profile.target_weight = t;
        }
        if let Some(level) = self.activity {
            profile.activity_level = level;
        }
        Ok(profile)
    }
}

#[derive(Serialize)]
struct ProfileOutput {
    #[serde(flatten)]
    profile: UserProfile,
    bmi: f64,
    bmr: f64,
}

impl ProfileOutput {
    fn new(profile: UserProfile) -> Self {
        Self {
            bmi: (body_mass_index(&profile) * 10.0).round() / 10.0,
            bmr: basal_metabolic_rate(&profile).round(),
            profile,
        }
    }

    fn print(&self) {
        let p = &self.profile;
        let gender = match p.gender {
            Gender::Male => "male",
            Gender::Female => "female",
        };
        println!("  Gender:         {gender}");
        println!("  Age:            {}", p.age);
        println!("  Height:         {:.1} cm", p.height);
        println!("  Weight:         {:.1} kg", p.weight);
        println!("  Target weight:  {:.1} kg", p.target_weight);
        println!("  Activity level: {}", p.activity_level);
        println!("  BMI:            {:.1}", self.bmi);
        println!("  BMR:            {:.0} kcal", self.bmr);
    }
}

pub(crate) fn cmd_profile_set(svc: &PfcService, args: ProfileArgs, json: bool) -> Result<()> {
    if args.is_empty() {
        bail!(
            "Nothing to set. Provide at least one of --gender, --age, --height, --weight, --target-weight, or --activity"
        );
    }
    let profile = args.apply(svc.get_profile()?)?;
    svc.set_profile(&profile)?;

    let out = ProfileOutput::new(profile);
    if json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Profile saved.\n");
        out.print();
    }
    Ok(())
}

pub(crate) fn cmd_profile_show(svc: &PfcService, json: bool) -> Result<()> {
    let Some(profile) = svc.get_profile()? else {
        let message = "No profile set. Use `pfc profile set` first";
        if json {
            println!("{}", json_error(message));
        } else {
            eprintln!("{message}");
        }
        process::exit(2);
    };

    let out = ProfileOutput::new(profile);
    if json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        out.print();
    }
    Ok(())
}
