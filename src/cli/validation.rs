//! Value parsers for CLI arguments
//!
//! Each function is used as a clap `value_parser`, so errors surface as
//! ordinary usage errors before any configuration is loaded.

use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

use reqwest::Url;

/// Upper bound for `migrate --rollback`
const MAX_ROLLBACK_STEPS: u32 = 100;

/// Maximum length of a DNS name
const MAX_HOSTNAME_LEN: usize = 253;

pub fn validate_port(value: &str) -> Result<u16, String> {
    match value.parse::<u16>() {
        Ok(0) => Err("Port must be between 1 and 65535. Port 0 is not allowed.".to_string()),
        Ok(port) => Ok(port),
        Err(_) => Err(format!(
            "Port must be a valid number between 1 and 65535, got: '{}'",
            value
        )),
    }
}

/// The file must exist, be a regular file and be readable
pub fn validate_config_file_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", value));
    }
    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", value));
    }

    fs::File::open(&path)
        .map(|_| path)
        .map_err(|e| format!("Cannot read configuration file '{}': {}", value, e))
}

pub fn validate_rollback_steps(value: &str) -> Result<u32, String> {
    let steps: u32 = value.parse().map_err(|_| {
        format!(
            "Rollback steps must be a valid positive number, got: '{}'",
            value
        )
    })?;

    if steps == 0 {
        return Err("Rollback steps must be greater than 0".to_string());
    }
    if steps > MAX_ROLLBACK_STEPS {
        return Err(format!(
            "Rollback steps cannot exceed {}",
            MAX_ROLLBACK_STEPS
        ));
    }

    Ok(steps)
}

/// Accepts IP literals and DNS-style host names
pub fn validate_host_address(value: &str) -> Result<String, String> {
    let host = value.trim();

    if host.is_empty() {
        return Err("Host address cannot be empty".to_string());
    }
    if host.parse::<IpAddr>().is_ok() {
        return Ok(host.to_string());
    }
    if host.len() > MAX_HOSTNAME_LEN {
        return Err(format!(
            "Host address is too long (maximum {} characters)",
            MAX_HOSTNAME_LEN
        ));
    }

    // Dotted digits that did not parse as an IP are a typo, not a host name
    if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(format!("Invalid IPv4 address format: '{}'", value));
    }

    let valid_label = |label: &str| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    if !host.split('.').all(valid_label) {
        return Err(format!("Invalid host name: '{}'", value));
    }

    Ok(host.to_string())
}

/// Absolute http(s) URL for `trigger --url`
pub fn validate_base_url(value: &str) -> Result<String, String> {
    let url = Url::parse(value).map_err(|e| format!("Invalid URL '{}': {}", value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(value.trim_end_matches('/').to_string()),
        scheme => Err(format!(
            "URL scheme must be http or https, got '{}'",
            scheme
        )),
    }
}

/// Token subjects end up in `sub`; blank ids would match no record owner
pub fn validate_subject(value: &str) -> Result<String, String> {
    let subject = value.trim();
    if subject.is_empty() {
        return Err("Subject cannot be empty".to_string());
    }
    if subject.chars().any(char::is_whitespace) {
        return Err(format!("Subject cannot contain whitespace: '{}'", value));
    }
    Ok(subject.to_string())
}
