//! Layered configuration loading shared by the services.
//!
//! Sources, lowest precedence first: the service's serde defaults, an optional
//! `configuration.{toml,yaml,json}` file, then `<PREFIX>__SECTION__KEY`
//! environment variables. A `.env` file is read first when present.

use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;

/// Options for [`load`].
#[derive(Debug, Clone)]
pub struct LoadOptions<'a> {
    /// Environment variable prefix, e.g. `AUTH` for `AUTH__PORT`.
    pub env_prefix: &'a str,
    /// Base name of the optional configuration file.
    pub file_name: &'a str,
    /// Keys whose environment values are comma-separated lists.
    pub list_keys: &'a [&'a str],
}

impl<'a> LoadOptions<'a> {
    pub fn new(env_prefix: &'a str) -> Self {
        Self {
            env_prefix,
            file_name: "configuration",
            list_keys: &[],
        }
    }

    pub fn with_list_keys(mut self, keys: &'a [&'a str]) -> Self {
        self.list_keys = keys;
        self
    }
}

/// Load a typed configuration. Fields absent from every source fall back to
/// the target type's `#[serde(default)]` values.
pub fn load<T: DeserializeOwned>(options: &LoadOptions<'_>) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let mut env = Environment::with_prefix(options.env_prefix)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true);

    if !options.list_keys.is_empty() {
        env = env.list_separator(",");
        for key in options.list_keys {
            env = env.with_list_parse_key(key);
        }
    }

    let config = Cfg::builder()
        .add_source(File::with_name(options.file_name).required(false))
        .add_source(env)
        .build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(default)]
    struct Sample {
        port: u16,
        names: Vec<String>,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                port: 8080,
                names: vec!["a".to_string()],
            }
        }
    }

    #[test]
    fn test_defaults_apply_when_no_source_sets_a_key() {
        let options = LoadOptions::new("SERVICE_CORE_CONFIG_TEST_UNSET");
        let sample: Sample = load(&options).unwrap();
        assert_eq!(sample.port, 8080);
        assert_eq!(sample.names, vec!["a".to_string()]);
    }
}
