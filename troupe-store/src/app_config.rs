use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Destination catalog file, loaded at boot.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long a member has to answer a group invitation.
    pub confirmation_window_hours: i64,
    /// Cadence of the background deadline sweep.
    pub sweep_interval_seconds: u64,
    /// Minimum gap between unforced clustering runs.
    #[serde(default = "default_min_rerun")]
    pub clustering_min_rerun_seconds: i64,
    /// Where confirmed members are sent to pay.
    pub payment_base_url: String,
    pub api_base_url: String,
}

fn default_min_rerun() -> i64 {
    60
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of TROUPE)
            // Eg.. `TROUPE__SERVER__PORT=8080` would set the server port
            .add_source(config::Environment::with_prefix("TROUPE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
