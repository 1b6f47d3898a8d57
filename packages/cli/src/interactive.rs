//! Interactive mode, used when `wayguard` runs without a subcommand.
//!
//! Prompts for the tool to run and its inputs, then delegates to the same
//! code paths as the subcommands.

use std::path::PathBuf;

use dialoguer::{Input, Select};
use wayguard_tracking::config::DEFAULT_CONFIG;
use wayguard_zone_models::GeoPoint;

use crate::track::{PositionArg, TrackArgs};

enum Tool {
    Track,
    Score,
    ShowConfig,
}

impl Tool {
    const ALL: &[Self] = &[Self::Track, Self::Score, Self::ShowConfig];

    const fn label(&self) -> &'static str {
        match self {
            Self::Track => "Track my trip",
            Self::Score => "Score a point against a zones file",
            Self::ShowConfig => "Print the default config",
        }
    }
}

fn prompt_point() -> Result<GeoPoint, Box<dyn std::error::Error>> {
    let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
    let lng: f64 = Input::new().with_prompt("Longitude").interact_text()?;
    Ok(GeoPoint::new(lat, lng))
}

/// Runs interactive mode.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected tool fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Wayguard");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Track => {
            let digital_id: String = Input::new()
                .with_prompt("Digital ID")
                .interact_text()?;
            let route: String = Input::new()
                .with_prompt("Route file (leave empty to enter a fixed position)")
                .allow_empty(true)
                .interact_text()?;
            let position = if route.trim().is_empty() {
                PositionArg::Fixed(prompt_point()?)
            } else {
                PositionArg::Route(PathBuf::from(route.trim()))
            };
            crate::track::run(TrackArgs {
                digital_id,
                config: None,
                position,
            })
            .await
        }
        Tool::Score => {
            let zones: String = Input::new()
                .with_prompt("Zones file")
                .default("zones.json".to_string())
                .interact_text()?;
            let point = prompt_point()?;
            crate::score::run(&PathBuf::from(zones), point)
        }
        Tool::ShowConfig => {
            print!("{DEFAULT_CONFIG}");
            Ok(())
        }
    }
}
