use std::path::PathBuf;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Runtime settings, read from defaults, an optional `libraryservice.toml`
/// and `LIBRARYSERVICE_*` environment variables, in that order
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub use_in_memory_store: bool,
    pub log_filter: String,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Self::builder()?
            .add_source(File::with_name("libraryservice").required(false))
            .add_source(Environment::with_prefix("LIBRARYSERVICE"))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("data_dir", "library_data")?
            .set_default("use_in_memory_store", false)?
            .set_default("log_filter", "info")?)
    }
}

#[cfg(test)]
mod settings_tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings: Settings = Settings::builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(
            settings,
            Settings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                data_dir: PathBuf::from("library_data"),
                use_in_memory_store: false,
                log_filter: "info".to_string(),
            }
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let settings: Settings = Settings::builder()
            .unwrap()
            .add_source(File::from_str(
                "port = 9000\nuse_in_memory_store = true\ndata_dir = \"/tmp/library\"",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.port, 9000);
        assert!(settings.use_in_memory_store);
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/library"));
        assert_eq!(settings.host, "0.0.0.0");
    }
}
