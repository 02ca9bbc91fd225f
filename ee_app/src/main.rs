use std::env;
use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod error;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("Begin log");

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ee.ini"));

    let result = config::Config::load(&config_path)
        .and_then(app::App::new)
        .and_then(|mut app| app.run());

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
