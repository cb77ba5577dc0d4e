//! Environment-driven client configuration.

use std::time::Duration;

use restcall_core::{ClientConfig, ConfigError, JsonAdapter, ReadMode, RestClient, DEFAULT_TIMEOUT};

#[test]
fn test_config_from_env_defaults() {
    temp_env::with_vars(
        vec![
            ("RESTCALL_ENDPOINT", Some("https://api.example.com/items")),
            ("RESTCALL_TIMEOUT_MS", None),
            ("RESTCALL_READ_MODE", None),
        ],
        || {
            let config = ClientConfig::from_env().unwrap();
            assert_eq!(config.endpoint, "https://api.example.com/items");
            assert_eq!(config.timeout, DEFAULT_TIMEOUT);
            assert_eq!(config.read_mode, ReadMode::ReadToEnd);
        },
    );
}

#[test]
fn test_config_from_env_custom() {
    temp_env::with_vars(
        vec![
            ("RESTCALL_ENDPOINT", Some("http://localhost:3000/items")),
            ("RESTCALL_TIMEOUT_MS", Some("2500")),
            ("RESTCALL_READ_MODE", Some("bounded")),
        ],
        || {
            let config = ClientConfig::from_env().unwrap();
            assert_eq!(config.timeout, Duration::from_millis(2500));
            assert_eq!(config.read_mode, ReadMode::Bounded);

            let client = RestClient::from_config(JsonAdapter, config).unwrap();
            assert_eq!(client.endpoint(), "http://localhost:3000/items");
            assert_eq!(client.read_mode(), ReadMode::Bounded);
        },
    );
}

#[test]
fn test_config_from_env_missing_endpoint() {
    temp_env::with_var_unset("RESTCALL_ENDPOINT", || {
        let err = ClientConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("RESTCALL_ENDPOINT")));
    });
}

#[test]
fn test_config_from_env_bad_timeout() {
    temp_env::with_vars(
        vec![
            ("RESTCALL_ENDPOINT", Some("https://api.example.com")),
            ("RESTCALL_TIMEOUT_MS", Some("soon")),
        ],
        || {
            let err = ClientConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    name: "RESTCALL_TIMEOUT_MS",
                    ..
                }
            ));
        },
    );
}

#[test]
fn test_config_from_env_bad_read_mode() {
    temp_env::with_vars(
        vec![
            ("RESTCALL_ENDPOINT", Some("https://api.example.com")),
            ("RESTCALL_TIMEOUT_MS", None),
            ("RESTCALL_READ_MODE", Some("sometimes")),
        ],
        || {
            let err = ClientConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    name: "RESTCALL_READ_MODE",
                    ..
                }
            ));
        },
    );
}
