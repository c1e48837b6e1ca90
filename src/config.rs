// src/config.rs
use crate::errors::HeadshotError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_image_model: String,
    pub gemini_base_url: String,
    pub transform_timeout: Duration,
    pub session_ttl: Duration,
    pub bind_addr: String,
    pub static_dir: PathBuf,
    pub styles_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, HeadshotError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HeadshotError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let gemini_api_key = var("GEMINI_API_KEY")
            .ok_or_else(|| HeadshotError::Config("GEMINI_API_KEY must be set".to_string()))?;

        let transform_timeout = match var("TRANSFORM_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("TRANSFORM_TIMEOUT_SECS", &raw)?),
            None => Duration::from_secs(120),
        };
        let session_ttl = match var("SESSION_TTL_SECS") {
            Some(raw) => Duration::from_secs(parse_number("SESSION_TTL_SECS", &raw)?),
            None => Duration::from_secs(30 * 60),
        };
        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => parse_number("MAX_UPLOAD_BYTES", &raw)? as usize,
            None => 10 * 1024 * 1024,
        };

        Ok(Self {
            gemini_api_key,
            gemini_image_model: var("GEMINI_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            gemini_base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            transform_timeout,
            session_ttl,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            styles_path: var("STYLES_PATH").map(PathBuf::from),
            max_upload_bytes,
        })
    }
}

fn parse_number(name: &str, raw: &str) -> Result<u64, HeadshotError> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(HeadshotError::Config(format!(
            "{} must be a positive integer, got {:?}",
            name, raw
        ))),
        Ok(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, HeadshotError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_with_only_api_key() {
        let config = config(&[("GEMINI_API_KEY", "secret")]).unwrap();

        assert_eq!(config.gemini_image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.transform_timeout, Duration::from_secs(120));
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert!(config.styles_path.is_none());
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn api_key_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("GEMINI_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_IMAGE_MODEL", "gemini-3-pro-image-preview"),
            ("TRANSFORM_TIMEOUT_SECS", "45"),
            ("SESSION_TTL_SECS", "600"),
            ("STYLES_PATH", "/etc/persona/styles.json"),
            ("MAX_UPLOAD_BYTES", "2048"),
        ])
        .unwrap();

        assert_eq!(config.gemini_image_model, "gemini-3-pro-image-preview");
        assert_eq!(config.transform_timeout, Duration::from_secs(45));
        assert_eq!(config.session_ttl, Duration::from_secs(600));
        assert_eq!(config.styles_path, Some(PathBuf::from("/etc/persona/styles.json")));
        assert_eq!(config.max_upload_bytes, 2048);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = config(&[("GEMINI_API_KEY", "k"), ("TRANSFORM_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("TRANSFORM_TIMEOUT_SECS"));
        assert!(config(&[("GEMINI_API_KEY", "k"), ("MAX_UPLOAD_BYTES", "0")]).is_err());
    }
}
