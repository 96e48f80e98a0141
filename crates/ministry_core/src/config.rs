//! File-based core configuration.
//!
//! # Responsibility
//! - Load `ministry.toml` settings: database path, logging, member
//!   directory endpoint and role-rank overrides.
//! - Turn the `[role_ranking]` table into a ready `RoleRanking`.
//!
//! # Invariants
//! - Every field has a default; an empty file is a valid config.
//! - Unknown role names in `[role_ranking]` are rejected at load time.

use crate::model::role::{RoleName, RoleRanking};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "ministry.sqlite3";
const DEFAULT_DIRECTORY_URL: &str = "http://localhost:8080";
const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 3_000;

/// Config load failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Member directory endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTORY_URL.to_string(),
            timeout_ms: DEFAULT_DIRECTORY_TIMEOUT_MS,
        }
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Root of `ministry.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// `None` keeps the build-mode default.
    pub log_level: Option<String>,
    /// File logging is off when unset.
    pub log_dir: Option<PathBuf>,
    pub directory: DirectoryConfig,
    /// Rank overrides keyed by role name, e.g. `DEACON = 12`.
    pub role_ranking: BTreeMap<String, u32>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: None,
            log_dir: None,
            directory: DirectoryConfig::default(),
            role_ranking: BTreeMap::new(),
        }
    }
}

impl CoreConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Standard ranking with `[role_ranking]` overrides applied.
    pub fn role_ranking(&self) -> Result<RoleRanking, ConfigError> {
        let overrides = self
            .role_ranking
            .iter()
            .map(|(name, rank)| {
                name.trim()
                    .parse::<RoleName>()
                    .map(|role| (role, *rank))
                    .map_err(|err| ConfigError::Invalid(format!("[role_ranking] {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RoleRanking::standard().with_overrides(overrides))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".to_string()));
        }
        if self.directory.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "directory.base_url must not be empty".to_string(),
            ));
        }
        if self.directory.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "directory.timeout_ms must be positive".to_string(),
            ));
        }
        self.role_ranking().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::model::role::{RoleName, RoleRanking};
    use std::io::Write;
    use std::path::PathBuf;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(text.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let config = CoreConfig::load(file.path()).expect("empty config is valid");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(
            config.role_ranking().expect("standard ranking"),
            *RoleRanking::standard()
        );
    }

    #[test]
    fn full_file_is_parsed() {
        let file = write_config(
            r#"
db_path = "/var/lib/ministry/db.sqlite3"
log_level = "warn"
log_dir = "/var/log/ministry"

[directory]
base_url = "https://members.example.org"
timeout_ms = 1500

[role_ranking]
DEACON = 2
"#,
        );
        let config = CoreConfig::load(file.path()).expect("config should load");
        assert_eq!(config.db_path, PathBuf::from("/var/lib/ministry/db.sqlite3"));
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.directory.timeout().as_millis(), 1500);

        let ranking = config.role_ranking().expect("ranking should build");
        assert_eq!(ranking.rank(RoleName::Deacon), 2);
        assert_eq!(
            ranking.rank(RoleName::SeniorPastor),
            RoleRanking::standard().rank(RoleName::SeniorPastor)
        );
    }

    #[test]
    fn unknown_role_override_is_rejected() {
        let file = write_config("[role_ranking]\nARCHBISHOP = 1\n");
        let err = CoreConfig::load(file.path()).expect_err("unknown role must fail");
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("ARCHBISHOP")));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CoreConfig::load("/nonexistent/ministry.toml").expect_err("missing file");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
