//! Configuration loading.
//!
//! `ServerConfig` wraps one or more named `RepositoryConfig`s in a small
//! TOML file layered with `CONFD_`-prefixed environment overrides, the
//! way a layered config resolution would work, without a general-purpose
//! key/value store -- this service only has a handful of knobs.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfdResult, ConfdResultExt};

/// Immutable, process-lifetime configuration for one backing repository.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    pub uri: String,
    pub basedir: PathBuf,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default = "default_label")]
    pub default_label: String,
    #[serde(default = "default_true")]
    pub try_master_fallback: bool,
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate_seconds: i64,
    #[serde(default = "default_true")]
    pub clone_on_start: bool,
    #[serde(default)]
    pub force_pull: bool,
    #[serde(default)]
    pub delete_untracked_branches: bool,
    #[serde(default)]
    pub skip_ssl_validation: bool,
    #[serde(default)]
    pub clone_submodules: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

fn default_label() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

fn default_refresh_rate() -> i64 {
    -1
}

impl RepositoryConfig {
    /// `working_directory` defaults to `basedir` unless explicitly redirected.
    pub fn working_directory(&self) -> &Path {
        self.working_directory.as_deref().unwrap_or(&self.basedir)
    }
}

/// Server-wide configuration: one or more named repositories, the HTTP
/// bind address, and the encryption bootstrap key.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub encrypt_key: Option<String>,
    #[serde(rename = "repository", default)]
    pub repositories: HashMap<String, RepositoryConfig>,
}

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:8888".parse().unwrap()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Read a TOML file, then apply `CONFD_*` environment overrides to the
    /// `"default"` repository's primitive fields.
    pub fn load(path: &Path) -> ConfdResult<ServerConfig> {
        let contents = std::fs::read_to_string(path)
            .chain_err(|| format!("failed to read config file `{}`", path.display()))?;
        let mut config: ServerConfig = toml::from_str(&contents)
            .chain_err(|| format!("failed to parse config file `{}`", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = env::var("CONFD_BIND_ADDR") {
            if let Ok(addr) = addr.parse() {
                self.bind_addr = addr;
            }
        }
        if let Ok(filter) = env::var("CONFD_LOG_FILTER") {
            self.log_filter = filter;
        }
        if let Ok(key) = env::var("CONFD_ENCRYPT_KEY") {
            self.encrypt_key = Some(key);
        }

        let repo = self
            .repositories
            .entry("default".to_string())
            .or_insert_with(|| RepositoryConfig {
                uri: String::new(),
                basedir: PathBuf::from("."),
                working_directory: None,
                default_label: default_label(),
                try_master_fallback: true,
                timeout_seconds: 5,
                refresh_rate_seconds: -1,
                clone_on_start: true,
                force_pull: false,
                delete_untracked_branches: false,
                skip_ssl_validation: false,
                clone_submodules: false,
                username: None,
                password: None,
                passphrase: None,
            });

        macro_rules! overlay {
            ($env:literal, $field:ident) => {
                if let Ok(v) = env::var($env) {
                    repo.$field = v;
                }
            };
        }
        overlay!("CONFD_URI", uri);
        overlay!("CONFD_DEFAULT_LABEL", default_label);
        if let Ok(v) = env::var("CONFD_BASEDIR") {
            repo.basedir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("CONFD_TRY_MASTER_FALLBACK") {
            repo.try_master_fallback = parse_bool(&v);
        }
        if let Ok(v) = env::var("CONFD_TIMEOUT") {
            if let Ok(n) = v.parse() {
                repo.timeout_seconds = n;
            }
        }
        if let Ok(v) = env::var("CONFD_REFRESH_RATE") {
            if let Ok(n) = v.parse() {
                repo.refresh_rate_seconds = n;
            }
        }
        if let Ok(v) = env::var("CONFD_CLONE_ON_START") {
            repo.clone_on_start = parse_bool(&v);
        }
        if let Ok(v) = env::var("CONFD_FORCE_PULL") {
            repo.force_pull = parse_bool(&v);
        }
        if let Ok(v) = env::var("CONFD_DELETE_UNTRACKED_BRANCHES") {
            repo.delete_untracked_branches = parse_bool(&v);
        }
        if let Ok(v) = env::var("CONFD_SKIP_SSL_VALIDATION") {
            repo.skip_ssl_validation = parse_bool(&v);
        }
        if let Ok(v) = env::var("CONFD_CLONE_SUBMODULES") {
            repo.clone_submodules = parse_bool(&v);
        }
        if let Ok(v) = env::var("CONFD_USERNAME") {
            repo.username = Some(v);
        }
        if let Ok(v) = env::var("CONFD_PASSWORD") {
            repo.password = Some(v);
        }
        if let Ok(v) = env::var("CONFD_PASSPHRASE") {
            repo.passphrase = Some(v);
        }
    }

    pub fn repository(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.get(name)
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_directory_defaults_to_basedir() {
        let cfg = RepositoryConfig {
            uri: "https://example.invalid/repo.git".into(),
            basedir: PathBuf::from("/tmp/base"),
            working_directory: None,
            default_label: "main".into(),
            try_master_fallback: true,
            timeout_seconds: 5,
            refresh_rate_seconds: -1,
            clone_on_start: true,
            force_pull: false,
            delete_untracked_branches: false,
            skip_ssl_validation: false,
            clone_submodules: false,
            username: None,
            password: None,
            passphrase: None,
        };
        assert_eq!(cfg.working_directory(), Path::new("/tmp/base"));
    }
}
