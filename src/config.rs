//! Runtime configuration.
//!
//! Precedence: CLI flags > environment (`DEVCAMPER_*`) > config files > defaults. Each
//! source is read into a [`ConfigLayer`] of optional values; layers are merged from the
//! strongest down, and a value is only taken from a weaker layer if still unset.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "devcamper.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("invalid config {path}: {source}")]
    Toml { path: PathBuf, source: toml::de::Error },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    pub jwt_expire_days: Option<u32>,
    pub jwt_cookie_expire_days: Option<u32>,
    pub file_upload_path: Option<PathBuf>,
    pub max_file_upload: Option<usize>,
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
    pub geocoder_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_retention: Option<usize>,
}

impl ConfigLayer {
    /// Takes every value still unset here from `weaker`.
    pub fn fill_from(&mut self, weaker: ConfigLayer) {
        if self.host.is_none() { self.host = weaker.host; }
        if self.port.is_none() { self.port = weaker.port; }
        if self.data_dir.is_none() { self.data_dir = weaker.data_dir; }
        if self.jwt_secret.is_none() { self.jwt_secret = weaker.jwt_secret; }
        if self.jwt_expire_days.is_none() { self.jwt_expire_days = weaker.jwt_expire_days; }
        if self.jwt_cookie_expire_days.is_none() {
            self.jwt_cookie_expire_days = weaker.jwt_cookie_expire_days;
        }
        if self.file_upload_path.is_none() { self.file_upload_path = weaker.file_upload_path; }
        if self.max_file_upload.is_none() { self.max_file_upload = weaker.max_file_upload; }
        if self.default_limit.is_none() { self.default_limit = weaker.default_limit; }
        if self.max_limit.is_none() { self.max_limit = weaker.max_limit; }
        if self.geocoder_file.is_none() { self.geocoder_file = weaker.geocoder_file; }
        if self.log_dir.is_none() { self.log_dir = weaker.log_dir; }
        if self.log_level.is_none() { self.log_level = weaker.log_level; }
        if self.log_retention.is_none() { self.log_retention = weaker.log_retention; }
    }

    /// Reads `DEVCAMPER_*` variables from `vars`.
    ///
    /// # Errors
    /// `InvalidEnv` when a numeric variable does not parse.
    pub fn from_env(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        fn num<T: std::str::FromStr>(
            vars: &HashMap<String, String>,
            key: &str,
        ) -> Result<Option<T>, ConfigError> {
            vars.get(key)
                .map(|v| {
                    v.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnv {
                        key: key.to_string(),
                        value: v.clone(),
                    })
                })
                .transpose()
        }
        let text = |key: &str| vars.get(key).cloned();
        let path = |key: &str| vars.get(key).map(PathBuf::from);
        Ok(Self {
            host: text("DEVCAMPER_HOST"),
            port: num(vars, "DEVCAMPER_PORT")?,
            data_dir: path("DEVCAMPER_DATA_DIR"),
            jwt_secret: text("DEVCAMPER_JWT_SECRET"),
            jwt_expire_days: num(vars, "DEVCAMPER_JWT_EXPIRE_DAYS")?,
            jwt_cookie_expire_days: num(vars, "DEVCAMPER_JWT_COOKIE_EXPIRE_DAYS")?,
            file_upload_path: path("DEVCAMPER_FILE_UPLOAD_PATH"),
            max_file_upload: num(vars, "DEVCAMPER_MAX_FILE_UPLOAD")?,
            default_limit: num(vars, "DEVCAMPER_DEFAULT_LIMIT")?,
            max_limit: num(vars, "DEVCAMPER_MAX_LIMIT")?,
            geocoder_file: path("DEVCAMPER_GEOCODER_FILE"),
            log_dir: path("DEVCAMPER_LOG_DIR"),
            log_level: text("DEVCAMPER_LOG_LEVEL"),
            log_retention: num(vars, "DEVCAMPER_LOG_RETENTION")?,
        })
    }

    /// Parses one TOML config file. The second value holds a warning when the file stores
    /// secrets in plain text.
    ///
    /// # Errors
    /// Read or parse failures, naming the file.
    pub fn from_file(path: &Path) -> Result<(Self, Option<String>), ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let parse_err = |source| ConfigError::Toml { path: path.to_path_buf(), source };
        let table: toml::Table = toml::from_str(&text).map_err(parse_err)?;
        let secrets = scan_toml_for_secret_keys(&toml::Value::Table(table));
        let warning = (!secrets.is_empty()).then(|| {
            format!(
                "config {} stores secrets in plain text ({}); prefer DEVCAMPER_JWT_SECRET",
                path.display(),
                secrets.join(", ")
            )
        });
        Ok((toml::from_str(&text).map_err(parse_err)?, warning))
    }
}

fn is_secret_key(key: &str) -> bool {
    let k = key.to_ascii_lowercase();
    k.contains("password") || k.contains("secret") || k.contains("token") || k.contains("api_key")
}

fn scan_toml_for_secret_keys(val: &toml::Value) -> Vec<String> {
    let mut secrets = Vec::new();
    let mut q = VecDeque::new();
    q.push_back((String::new(), val));
    while let Some((prefix, v)) = q.pop_front() {
        if let toml::Value::Table(map) = v {
            for (k, vv) in map {
                let full = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                if is_secret_key(k) {
                    secrets.push(full.clone());
                }
                q.push_back((full, vv));
            }
        }
    }
    secrets
}

/// Config files consulted, strongest first.
#[must_use]
pub fn config_paths(cli_path: Option<&Path>, vars: &HashMap<String, String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = cli_path {
        paths.push(p.to_path_buf());
    }
    if let Some(p) = vars.get("DEVCAMPER_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(CONFIG_FILE_NAME));
    }
    paths
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expire_days: u32,
    pub jwt_cookie_expire_days: u32,
    pub file_upload_path: PathBuf,
    pub max_file_upload: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    pub geocoder_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_retention: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_layer(ConfigLayer::default())
    }
}

/// Resolved settings plus the warnings raised while resolving them. The loader runs
/// before logging is configured, so callers log `warnings` once a logger is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub warnings: Vec<String>,
}

impl AppConfig {
    /// Applies defaults to whatever `layer` leaves unset. A missing JWT secret is replaced
    /// by a random per-process one, so tokens do not survive a restart.
    #[must_use]
    pub fn from_layer(layer: ConfigLayer) -> Self {
        Self::resolve(layer).config
    }

    /// `from_layer`, keeping the warnings.
    #[must_use]
    pub fn resolve(layer: ConfigLayer) -> LoadedConfig {
        let mut warnings = Vec::new();
        let jwt_secret = layer.jwt_secret.unwrap_or_else(|| {
            warnings.push("no jwt_secret configured; using a random secret for this process".to_string());
            hex::encode(rand::random::<[u8; 32]>())
        });
        let max_limit = layer.max_limit.unwrap_or(100).max(1);
        let config = Self {
            host: layer.host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: layer.port.unwrap_or(5000),
            data_dir: layer.data_dir.unwrap_or_else(|| PathBuf::from("data")),
            jwt_secret,
            jwt_expire_days: layer.jwt_expire_days.unwrap_or(30),
            jwt_cookie_expire_days: layer.jwt_cookie_expire_days.unwrap_or(30),
            file_upload_path: layer.file_upload_path.unwrap_or_else(|| PathBuf::from("public/uploads")),
            max_file_upload: layer.max_file_upload.unwrap_or(1_000_000),
            default_limit: layer.default_limit.unwrap_or(25).clamp(1, max_limit),
            max_limit,
            geocoder_file: layer.geocoder_file,
            log_dir: layer.log_dir,
            log_level: layer.log_level.unwrap_or_else(|| "info".to_string()),
            log_retention: layer.log_retention.unwrap_or(7),
        };
        LoadedConfig { config, warnings }
    }

    /// Resolves the configuration from CLI flags, the given environment and config files.
    ///
    /// # Errors
    /// Unreadable or invalid config files, or malformed numeric variables.
    pub fn load(
        cli: ConfigLayer,
        cli_path: Option<&Path>,
        vars: &HashMap<String, String>,
    ) -> Result<LoadedConfig, ConfigError> {
        let mut merged = cli;
        let mut file_warnings = Vec::new();
        merged.fill_from(ConfigLayer::from_env(vars)?);
        for path in config_paths(cli_path, vars) {
            if path.exists() {
                let (layer, warning) = ConfigLayer::from_file(&path)?;
                file_warnings.extend(warning);
                merged.fill_from(layer);
            } else if Some(path.as_path()) == cli_path {
                return Err(ConfigError::Io {
                    path,
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
        }
        let mut loaded = Self::resolve(merged);
        file_warnings.append(&mut loaded.warnings);
        loaded.warnings = file_warnings;
        Ok(loaded)
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "port = 7000\nmax_limit = 50\nlog_level = \"debug\"\nhost = \"0.0.0.0\"").unwrap();
        let env = vars(&[("DEVCAMPER_PORT", "6000"), ("DEVCAMPER_LOG_LEVEL", "warn")]);
        let cli = ConfigLayer { log_level: Some("trace".into()), ..ConfigLayer::default() };
        let cfg = AppConfig::load(cli, Some(&path), &env).unwrap().config;
        assert_eq!(cfg.port, 6000);
        assert_eq!(cfg.log_level, "trace");
        assert_eq!(cfg.max_limit, 50);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.default_limit, 25);
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_layer(ConfigLayer {
            jwt_secret: Some("s".into()),
            ..ConfigLayer::default()
        });
        assert_eq!(cfg.bind_addr(), "127.0.0.1:5000");
        assert_eq!((cfg.default_limit, cfg.max_limit, cfg.max_file_upload), (25, 100, 1_000_000));
        assert_eq!(cfg.jwt_expire_days, 30);
        assert_eq!(AppConfig::default().jwt_secret.len(), 64);
    }

    #[test]
    fn bad_inputs_are_errors() {
        let env = vars(&[("DEVCAMPER_PORT", "http")]);
        assert!(matches!(ConfigLayer::from_env(&env), Err(ConfigError::InvalidEnv { .. })));
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load(ConfigLayer::default(), Some(&missing), &HashMap::new()).is_err());
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "prot = 1").unwrap();
        assert!(matches!(ConfigLayer::from_file(&bad), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn secrets_in_files_are_detected() {
        let t: toml::Table = toml::from_str("jwt_secret = \"x\"\nport = 1").unwrap();
        assert_eq!(scan_toml_for_secret_keys(&toml::Value::Table(t)), vec!["jwt_secret".to_string()]);
    }

    #[test]
    fn warnings_are_returned_not_dropped() {
        let loaded = AppConfig::resolve(ConfigLayer::default());
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("no jwt_secret configured"));
        assert_eq!(loaded.config.jwt_secret.len(), 64);

        let quiet = AppConfig::resolve(ConfigLayer { jwt_secret: Some("s".into()), ..ConfigLayer::default() });
        assert!(quiet.warnings.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.toml");
        std::fs::write(&path, "jwt_secret = \"in-file\"\nport = 7100").unwrap();
        let loaded = AppConfig::load(ConfigLayer::default(), Some(&path), &HashMap::new()).unwrap();
        assert_eq!(loaded.config.jwt_secret, "in-file");
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("plain text (jwt_secret)"));
    }
}
