// src/config/service.rs
use anyhow::{Context, Result};
use axum::http::HeaderValue;
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/service.toml";
pub const DEFAULT_DATASET_PATH: &str = "data/articles.csv";

pub const ENV_CONFIG_PATH: &str = "WIKIFY_CONFIG_PATH";
pub const ENV_DATASET_PATH: &str = "WIKIFY_DATASET_PATH";
pub const ENV_CORS_ORIGINS: &str = "WIKIFY_CORS_ORIGINS";
pub const ENV_METRICS: &str = "WIKIFY_METRICS";

fn default_dataset_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATASET_PATH)
}

/// Local frontend dev servers.
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    /// Browser origins allowed to call the API with credentials.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Install the Prometheus recorder and expose `/metrics`.
    #[serde(default)]
    pub metrics_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            cors_origins: default_cors_origins(),
            metrics_enabled: false,
        }
    }
}

impl ServiceConfig {
    /// Resolve config:
    /// 1) $WIKIFY_CONFIG_PATH (must exist)
    /// 2) config/service.toml if present
    /// 3) built-in defaults
    ///
    /// then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(&p)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading service config from {}", path.display()))?;
        Self::from_toml_str(&data)
            .with_context(|| format!("parsing service config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: ServiceConfig = toml::from_str(s)?;
        cfg.cors_origins = clean_origins(cfg.cors_origins);
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(p) = env::var(ENV_DATASET_PATH) {
            if !p.trim().is_empty() {
                self.dataset_path = PathBuf::from(p.trim());
            }
        }
        if let Ok(raw) = env::var(ENV_CORS_ORIGINS) {
            self.cors_origins = clean_origins(raw.split(',').map(str::to_string).collect());
        }
        if let Some(on) = parse_flag(env::var(ENV_METRICS).ok()) {
            self.metrics_enabled = on;
        }
    }

    /// Every origin must be usable as an `Access-Control-Allow-Origin` value.
    pub fn validate(&self) -> Result<()> {
        self.origin_header_values().map(|_| ())
    }

    pub fn origin_header_values(&self) -> Result<Vec<HeaderValue>> {
        self.cors_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o:?}"))
            })
            .collect()
    }
}

fn clean_origins(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for it in items {
        let t = it.trim().trim_end_matches('/');
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

fn parse_flag(raw: Option<String>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ServiceConfig::default());
    }

    #[test]
    fn toml_fields_and_origin_cleanup() {
        let cfg = ServiceConfig::from_toml_str(
            r#"
dataset_path = "/srv/articles.jsonl"
cors_origins = [" http://localhost:3000/ ", "", "http://localhost:3000"]
metrics_enabled = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.dataset_path, PathBuf::from("/srv/articles.jsonl"));
        assert_eq!(cfg.cors_origins, vec!["http://localhost:3000"]);
        assert!(cfg.metrics_enabled);
    }

    #[test]
    fn invalid_origin_fails_validation() {
        let cfg = ServiceConfig {
            cors_origins: vec!["http://bad\norigin".to_string()],
            ..ServiceConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag(Some("1".into())), Some(true));
        assert_eq!(parse_flag(Some(" TRUE ".into())), Some(true));
        assert_eq!(parse_flag(Some("off".into())), Some(false));
        assert_eq!(parse_flag(Some("maybe".into())), None);
        assert_eq!(parse_flag(None), None);
    }
}
