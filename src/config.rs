use std::env;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Runtime settings, read from the process environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Builds the config from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            api_base: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port: get("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
            max_upload_bytes: get("MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from_map(&[]);
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.max_upload_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn api_key_falls_back_to_legacy_name() {
        assert_eq!(from_map(&[("API_KEY", "abc")]).api_key.as_deref(), Some("abc"));
        assert_eq!(from_map(&[("GEMINI_API_KEY", "x"), ("API_KEY", "abc")]).api_key.as_deref(), Some("x"));
        assert!(from_map(&[("GEMINI_API_KEY", "  ")]).api_key.is_none());
    }

    #[test]
    fn bad_port_uses_default() {
        assert_eq!(from_map(&[("PORT", "nope")]).port, 8080);
        assert_eq!(from_map(&[("PORT", "3000")]).port, 3000);
    }
}
