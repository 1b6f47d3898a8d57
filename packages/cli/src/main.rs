#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line host for the Wayguard tracking engine.
//!
//! ```text
//! wayguard track --digital-id <ID> (--lat <LAT> --lng <LNG> | --route <FILE>) [--config <FILE>]
//! wayguard score --zones <FILE> --lat <LAT> --lng <LNG>
//! wayguard config
//! ```
//!
//! Running `wayguard` with no subcommand enters interactive mode.
//!
//! The device position is simulated from a fixed point or a recorded
//! route. Everything else (login, zones, location reports, pause, resume,
//! snooze) talks to the real backend at the configured URL.

mod command;
mod console;
mod interactive;
mod score;
mod track;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wayguard_tracking::config::DEFAULT_CONFIG;
use wayguard_zone_models::GeoPoint;

use crate::track::{PositionArg, TrackArgs};

#[derive(Parser)]
#[command(
    name = "wayguard",
    about = "Adaptive trip tracking with geofence risk scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and track the active trip
    Track {
        /// Unique digital ID issued at registration
        #[arg(long)]
        digital_id: String,
        /// TOML config file (defaults are embedded; see `wayguard config`)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Fixed latitude to report
        #[arg(long, requires = "lng", conflicts_with = "route", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Fixed longitude to report
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// JSON array of `{latitude, longitude}` points to walk
        #[arg(long)]
        route: Option<PathBuf>,
    },
    /// Score a point against a zones file without contacting the backend
    Score {
        /// JSON array of safety zones, as returned by `GET /safety-zones`
        #[arg(long)]
        zones: PathBuf,
        /// Latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Print the embedded default config
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run().await;
    };

    match command {
        Commands::Track {
            digital_id,
            config,
            lat,
            lng,
            route,
        } => {
            let position = match (lat, lng, route) {
                (Some(lat), Some(lng), None) => PositionArg::Fixed(GeoPoint::new(lat, lng)),
                (None, None, Some(route)) => PositionArg::Route(route),
                _ => return Err("Provide either --lat and --lng, or --route".into()),
            };
            track::run(TrackArgs {
                digital_id,
                config,
                position,
            })
            .await?;
        }
        Commands::Score { zones, lat, lng } => {
            score::run(&zones, GeoPoint::new(lat, lng))?;
        }
        Commands::Config => print!("{DEFAULT_CONFIG}"),
    }

    Ok(())
}
