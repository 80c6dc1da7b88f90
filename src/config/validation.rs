//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, LogSink};
use slirc_proto::NICK_MAX_LEN;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("identity.nick is required")]
    MissingNick,
    #[error("identity.nick must be at most 15 characters for nick recovery, got {0}")]
    NickTooLong(usize),
    #[error("server.address must be host:port, got '{0}'")]
    InvalidAddress(String),
    #[error("server.ca_file does not exist: {0}")]
    CaFileNotFound(String),
    #[error("log.path is required when log.sink = \"file\"")]
    MissingLogPath,
    #[error("behavior.max_concurrent_handlers must be at least 1")]
    ZeroHandlerLimit,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let nick = &config.identity.nick;
    if nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    } else if config.behavior.recover_nick && nick.chars().count() > NICK_MAX_LEN {
        errors.push(ValidationError::NickTooLong(nick.chars().count()));
    }

    let address = &config.server.address;
    let has_port = address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if !has_port {
        errors.push(ValidationError::InvalidAddress(address.clone()));
    }

    if let Some(ca) = &config.server.ca_file
        && !ca.exists()
    {
        errors.push(ValidationError::CaFileNotFound(ca.display().to_string()));
    }

    if config.log.sink == LogSink::File && config.log.path.is_none() {
        errors.push(ValidationError::MissingLogPath);
    }

    if config.behavior.max_concurrent_handlers == Some(0) {
        errors.push(ValidationError::ZeroHandlerLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r#"
[server]
address = "127.0.0.1:6667"

[identity]
nick = "ugjka"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_nick_fails() {
        let toml = r#"
[server]
address = "127.0.0.1:6667"

[identity]
nick = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingNick)));
    }

    #[test]
    fn test_long_nick_only_fails_with_recovery() {
        let toml = r#"
[server]
address = "127.0.0.1:6667"

[identity]
nick = "averyveryverylongnick"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::NickTooLong(21))));

        let mut config = config;
        config.behavior.recover_nick = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_address_without_port_fails() {
        let toml = r#"
[server]
address = "irc.libera.chat"

[identity]
nick = "ugjka"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidAddress(_))));
    }

    #[test]
    fn test_collects_every_error() {
        let toml = r#"
[server]
address = "nowhere"
ca_file = "/nonexistent/ca.pem"

[identity]
nick = ""

[behavior]
max_concurrent_handlers = 0

[log]
sink = "file"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::CaFileNotFound(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingLogPath)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroHandlerLimit)));
    }
}
