use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub data_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct Campaign {
    pub referral_code_length: usize,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub storage: Storage,
    pub campaign: Campaign,
}

impl Settings {
    /// Defaults, then the TOML file at `path` if present, then `CAMPAIGN__*`
    /// environment variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("storage.data_dir", "data")?
            .set_default("campaign.referral_code_length", 8)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CAMPAIGN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
