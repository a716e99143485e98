pub mod alarm;
pub mod config;
pub mod run;
pub mod sounds;
pub mod stats;

use wakeup_core::{Config, HttpApi};

/// Client for the configured alarm server.
pub fn connect(config: &Config) -> Result<HttpApi, Box<dyn std::error::Error>> {
    Ok(HttpApi::from_url(config.base_url()?, config.request_timeout())?)
}
