use super::{LogConfig, ServerConfig, DEFAULT_CONFIG_FILE_PATH, HCX_PREFIX};
use crate::error::{ConfigError, Error};
use crate::Args;
use config::{Config, Environment};
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Clone, Debug, Deserialize)]
pub struct MediatorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Everything needed to talk to the exchange: protocol and auth endpoints,
/// the service account, our participant identity and key material source.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayConfig {
    pub protocol_base: String,
    pub auth_base: String,
    pub participant_code: String,
    pub username: String,
    pub password: String,
    pub encryption_private_key_url: String,
    pub ig_url: String,
}

/// Config defaults to a file called `hcx-mediator.toml` in the current directory.
/// Supports TOML, JSON, YAML
/// Variable names should match the struct field names.
///
/// ENV vars can be used to override file settings.
///
/// ENV vars must be prefixed with `HCX_`.
///
impl MediatorConfig {
    pub fn default_path() -> String {
        DEFAULT_CONFIG_FILE_PATH.to_string()
    }

    pub fn load(args: &Args) -> Result<MediatorConfig, Error> {
        // Log a warning to user that config file is missing
        if !PathBuf::from(&args.config_file_path).exists() {
            println!(
                "Configuration file was not found: {}",
                args.config_file_path
            );
            println!("Loading config values from environment variables.");
        }
        let mut config = MediatorConfig::build(&args.config_file_path)?;

        // If log level is default, it has not been set by the user in config
        if config.log.level == LogConfig::default_log_level() {
            config.log.level = args.log_level;
        }

        // If log format is default, it has not been set by the user in config
        if config.log.format == LogConfig::default_log_format() {
            config.log.format = args.log_format;
        }

        Ok(config)
    }

    pub fn build(path: &str) -> Result<Self, Error> {
        // For parsing top-level values such as HCX_HOST, HCX_PORT
        // and for parsing nested env values such as HCX_GATEWAY__PARTICIPANT_CODE
        let hcx_env_source = Environment::with_prefix(HCX_PREFIX)
            .try_parsing(true)
            .separator("__")
            .prefix_separator("_");

        let config: Self = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(hcx_env_source)
            .build()?
            .try_deserialize()
            .map_err(|err| match err {
                config::ConfigError::Message(ref s) => match s {
                    s if s.contains("missing field") => {
                        let name = extract_field_name(s).map_or("unknown".to_string(), |s| s);
                        ConfigError::MissingParameter { name }
                    }
                    s if s.contains("does not have variant constructor") => {
                        let (name, value) = extract_invalid_field(s);
                        ConfigError::InvalidParameter { name, value }
                    }
                    _ => err.into(),
                },
                _ => err.into(),
            })?;

        Ok(config)
    }

    pub fn use_structured_logging(&self) -> bool {
        matches!(self.log.format, super::LogFormat::Structured)
    }
}

///
/// Extracts a field name (if present) from a config::ConfigError::Message
/// This is called in `build` if a ConfigError message contains the string `missing field`
///
fn extract_field_name(input: &str) -> Option<String> {
    let re = Regex::new(r"`(\w+)`").unwrap();
    re.captures(input)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

///
/// Extracts a field name (if present) from a config::ConfigError::Message
/// This is called in `build` if a ConfigError message contains the string `does not have variant constructor`
///
/// Error string is `enum {name} does not have variant constructor {value}`
///
fn extract_invalid_field(input: &str) -> (String, String) {
    let words = input.split(" ").collect::<Vec<_>>();

    let default_name = "unknown".to_string();
    let default_val = "".to_string();

    if !input.starts_with("enum") {
        return (default_name, default_val);
    }

    let name = words
        .get(1)
        .map_or(default_name.to_owned(), |w| w.to_string());

    let value = words
        .last()
        .map_or(default_val.to_owned(), |w| w.to_string());

    (name, value)
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::with_no_hcx_vars;
    use crate::{config::MediatorConfig, error::Error};

    #[test]
    fn config_loads_from_file() {
        with_no_hcx_vars(|| {
            let config = MediatorConfig::build("tests/config/hcx-mediator-test.toml").unwrap();
            assert_eq!(config.server.to_socket_address(), "127.0.0.1:7810");
            assert_eq!(config.gateway.participant_code, "1-test-provider");
        });
    }

    #[test]
    fn env_overrides_file() {
        with_no_hcx_vars(|| {
            temp_env::with_vars(
                [("HCX_GATEWAY__PARTICIPANT_CODE", Some("1-env-provider"))],
                || {
                    let config =
                        MediatorConfig::build("tests/config/hcx-mediator-test.toml").unwrap();
                    assert_eq!(config.gateway.participant_code, "1-env-provider");
                },
            );
        });
    }

    #[test]
    fn missing_parameter_is_named() {
        with_no_hcx_vars(|| {
            let config = MediatorConfig::build("tests/config/does-not-exist.toml");

            assert!(config.is_err());
            match config.unwrap_err() {
                Error::Config(err) => {
                    assert!(err.to_string().contains("Missing field"));
                }
                err => panic!("unexpected error: {err}"),
            }
        });
    }
}
