//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `CLOUDSDK_API_KEY` is unset or a value is invalid, falls back to a file
//! 3. Probes the working directory for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CLOUDSDK_API_KEY`: API key (required)
//! - `CLOUDSDK_API_URL`: API base URL
//! - `CLOUDSDK_SSL_VERIFY`: Whether server certificates are verified (true/false)
//! - `CLOUDSDK_CONNECT_TIMEOUT_SECS`: Connect timeout in seconds, `0` disables it
//! - `CLOUDSDK_REQUEST_TIMEOUT_SECS`: Request timeout in seconds, `0` disables it
//! - `CLOUDSDK_RETRY_ATTEMPTS`: Attempts per idempotent request
//!
//! ## File Locations
//! The loader probes `./cloudsdk.toml` then `./cloudsdk.json`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use cloudsdk_domain::{ClientConfig, CloudError, Result};

const API_KEY: &str = "CLOUDSDK_API_KEY";
const API_URL: &str = "CLOUDSDK_API_URL";
const SSL_VERIFY: &str = "CLOUDSDK_SSL_VERIFY";
const CONNECT_TIMEOUT: &str = "CLOUDSDK_CONNECT_TIMEOUT_SECS";
const REQUEST_TIMEOUT: &str = "CLOUDSDK_REQUEST_TIMEOUT_SECS";
const RETRY_ATTEMPTS: &str = "CLOUDSDK_RETRY_ATTEMPTS";

const CONFIG_FILE_NAMES: [&str; 2] = ["cloudsdk.toml", "cloudsdk.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `CloudError::Config` if configuration cannot be loaded from
/// either source or fails validation.
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `CLOUDSDK_API_KEY` is required; unset variables keep their defaults.
///
/// # Errors
/// Returns `CloudError::Config` if the key is missing or a value is invalid.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::new(env_var(API_KEY)?);

    if let Some(api_url) = env_opt(API_URL) {
        config.api_url = api_url;
    }
    config.ssl_verify = env_bool(SSL_VERIFY, config.ssl_verify);
    if let Some(secs) = env_parse::<u64>(CONNECT_TIMEOUT)? {
        config.timeouts.connect = timeout_secs(secs);
    }
    if let Some(secs) = env_parse::<u64>(REQUEST_TIMEOUT)? {
        config.timeouts.request = timeout_secs(secs);
    }
    if let Some(attempts) = env_parse::<u32>(RETRY_ATTEMPTS)? {
        config.retry.attempts = attempts;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the working directory with
/// [`probe_config_paths`]. The format follows the file extension.
///
/// # Errors
/// Returns `CloudError::Config` if the file is missing or unreadable, the
/// format is invalid, or the result fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CloudError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CloudError::Config("No config file found in the working directory".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CloudError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, by file extension.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CloudError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CloudError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CloudError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the working directory.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    CONFIG_FILE_NAMES.iter().map(|name| cwd.join(name)).find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        CloudError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-blank value of a variable.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| CloudError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn timeout_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::{Builder, NamedTempFile};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 6] =
        [API_KEY, API_URL, SSL_VERIFY, CONNECT_TIMEOUT, REQUEST_TIMEOUT, RETRY_ATTEMPTS];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn temp_config(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().unwrap();

        for value in ["1", "true", "YES", "on"] {
            std::env::set_var("CLOUDSDK_TEST_BOOL", value);
            assert!(env_bool("CLOUDSDK_TEST_BOOL", false), "{value}");
        }
        for value in ["0", "false", "no", "off"] {
            std::env::set_var("CLOUDSDK_TEST_BOOL", value);
            assert!(!env_bool("CLOUDSDK_TEST_BOOL", true), "{value}");
        }

        std::env::remove_var("CLOUDSDK_TEST_BOOL");
        assert!(env_bool("CLOUDSDK_TEST_BOOL", true));
        assert!(!env_bool("CLOUDSDK_TEST_BOOL", false));
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var(API_KEY, "secret");
        std::env::set_var(API_URL, "https://api.example.test/");
        std::env::set_var(SSL_VERIFY, "false");
        std::env::set_var(CONNECT_TIMEOUT, "5");
        std::env::set_var(REQUEST_TIMEOUT, "0");
        std::env::set_var(RETRY_ATTEMPTS, "7");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.api_url, "https://api.example.test/");
        assert!(!config.ssl_verify);
        assert_eq!(config.timeouts.connect, Some(Duration::from_secs(5)));
        assert_eq!(config.timeouts.request, None);
        assert_eq!(config.retry.attempts, 7);
    }

    #[test]
    fn test_load_from_env_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var(API_KEY, "secret");
        let result = load_from_env();
        clear_env();

        assert_eq!(result.unwrap(), ClientConfig::new("secret"));
    }

    #[test]
    fn test_load_from_env_missing_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, CloudError::Config(message) if message.contains(API_KEY)));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var(API_KEY, "secret");
        std::env::set_var(RETRY_ATTEMPTS, "many");
        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(CloudError::Config(_))));
    }

    #[test]
    fn test_load_from_file_toml() {
        let file = temp_config(
            ".toml",
            r#"
api_key = "secret"
api_url = "https://api.example.test"
trust_env = false

[timeouts]
connect = 1500

[retry]
attempts = 5
"#,
        );

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.api_url, "https://api.example.test");
        assert!(!config.trust_env);
        assert_eq!(config.timeouts.connect, Some(Duration::from_millis(1500)));
        assert_eq!(config.timeouts.request, Some(Duration::from_secs(60)));
        assert_eq!(config.retry.attempts, 5);
    }

    #[test]
    fn test_load_from_file_json() {
        let file = temp_config(".json", r#"{"api_key": "secret", "ssl_verify": false}"#);

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.api_key, "secret");
        assert!(!config.ssl_verify);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_config() {
        let file = temp_config(
            ".json",
            r#"{"api_key": "secret", "retry": {"backoff_min": 2000, "backoff_max": 10}}"#,
        );
        let err = load_from_file(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, CloudError::Config(message) if message.contains("inverted")));
    }

    #[test]
    fn test_load_from_file_missing_path() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/cloudsdk.toml"))).unwrap_err();
        assert!(matches!(err, CloudError::Config(message) if message.contains("not found")));
    }

    #[test]
    fn test_parse_config_unsupported_extension() {
        let err = parse_config("api_key: secret", Path::new("cloudsdk.yaml")).unwrap_err();
        assert!(matches!(err, CloudError::Config(message) if message.contains("yaml")));
    }

    #[test]
    fn test_parse_config_invalid_toml() {
        let err = parse_config("api_key = ", Path::new("cloudsdk.toml")).unwrap_err();
        assert!(matches!(err, CloudError::Config(message) if message.contains("TOML")));
    }
}
