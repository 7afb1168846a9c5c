//! # Configuration Management
//!
//! Configuration is assembled in layers, later sources override earlier ones:
//! 1. Built-in defaults
//! 2. An optional YAML file
//! 3. Environment variables prefixed `EDGEPLANE_` (double underscore as the
//!    nesting separator, e.g. `EDGEPLANE_XDS__PORT`)
//! 4. Command-line flags (parsed separately by [`crate::cli`])

pub mod settings;

pub use settings::{
    AppConfig, DagConfig, DebugConfig, ListenerConfig, NamespaceName, ObservabilityConfig,
    TlsVersion, XdsConfig,
};

use crate::errors::{Error, Result};
use config::{Config, Environment, File};
use std::path::Path;

pub fn load_config<P: AsRef<Path>>(config_path: Option<P>) -> Result<AppConfig> {
    let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        let path = path.as_ref();
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(Error::config(format!("configuration file not found: {}", path.display())));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("EDGEPLANE").separator("__").try_parsing(true),
    );

    let config = builder.build()?;
    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;
    Ok(app_config)
}

pub fn load_config_from_env() -> Result<AppConfig> {
    load_config::<&str>(None)
}

pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    load_config(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn loads_default_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = load_config_from_env().unwrap();
        assert_eq!(config.xds.port, 18000);
    }

    #[test]
    fn env_var_overrides_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("EDGEPLANE_XDS__PORT", "19000");
        let config = load_config_from_env().unwrap();
        assert_eq!(config.xds.port, 19000);
        std::env::remove_var("EDGEPLANE_XDS__PORT");
    }

    #[test]
    fn file_overrides_default_and_env_overrides_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        let yaml = "xds:\n  port: 18500\n  bind_address: \"0.0.0.0\"\n";
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_config_from_file(file.path()).unwrap();
        assert_eq!(config.xds.port, 18500);

        std::env::set_var("EDGEPLANE_XDS__PORT", "18999");
        let config = load_config_from_file(file.path()).unwrap();
        assert_eq!(config.xds.port, 18999);
        std::env::remove_var("EDGEPLANE_XDS__PORT");
    }

    #[test]
    fn missing_file_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        let result = load_config_from_file("/nonexistent/edgeplane.yaml");
        assert!(result.is_err());
    }
}
