use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OrdrfsError, OrdrfsResult};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdrfsConfig {
    pub catalog: CatalogConfig,
    pub account: AccountConfig,
    pub mount: MountConfig,
    pub log: LogConfig,
}

/// Which OpenDAL service the catalog is read through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    /// Read-only HTTP endpoint serving the catalog JSON documents
    Http,
    /// Local directory holding a catalog dump
    Fs,
    /// Empty in-process store (tests, dry runs)
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    /// Base URL for the `http` backend
    pub endpoint: String,
    /// Root directory for the `fs` backend
    pub root: PathBuf,
    /// Key prefix inside the store (default: catalog)
    pub prefix: String,
    /// Refuse plaintext HTTP endpoints instead of warning
    pub enforce_tls: bool,
}

/// Delivery details carried into order submissions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Real directory the namespace is overlaid on
    pub backing_dir: PathBuf,
    /// Default mountpoint when none is given on the command line
    pub mountpoint: Option<PathBuf>,
    pub allow_other: bool,
    /// Kernel attribute cache TTL in seconds (default: 1)
    pub attr_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: CatalogBackend::Fs,
            endpoint: "http://localhost:8080".into(),
            root: PathBuf::from("~/.local/share/ordrfs/catalog"),
            prefix: "catalog".into(),
            enforce_tls: false,
        }
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            backing_dir: PathBuf::from("~/.local/share/ordrfs/backing"),
            mountpoint: None,
            allow_other: false,
            attr_ttl_secs: 1,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl OrdrfsConfig {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults silently, leaving the caller to
    /// report it once logging is up; an unreadable or malformed file is an
    /// error.
    pub fn load(path: &Path) -> OrdrfsResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrdrfsError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| OrdrfsError::Config(format!("parsing {}: {e}", path.display())))
    }
}

/// Expand a leading `~/` against `$HOME`. Other paths are returned as-is.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[catalog]
backend = "http"
endpoint = "https://catalog.example.com"
prefix = "v1"
enforce_tls = true

[account]
email = "me@example.com"
address = "1 Main St"
city = "Springfield"
zip = "12345"

[mount]
backing_dir = "/var/lib/ordrfs"
mountpoint = "/mnt/food"
allow_other = true
attr_ttl_secs = 5

[log]
level = "debug"
format = "json"
"#;
        let config: OrdrfsConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.catalog.backend, CatalogBackend::Http);
        assert_eq!(config.catalog.endpoint, "https://catalog.example.com");
        assert_eq!(config.catalog.prefix, "v1");
        assert!(config.catalog.enforce_tls);
        assert_eq!(config.account.zip.as_deref(), Some("12345"));
        assert_eq!(config.mount.backing_dir, PathBuf::from("/var/lib/ordrfs"));
        assert_eq!(config.mount.mountpoint, Some(PathBuf::from("/mnt/food")));
        assert!(config.mount.allow_other);
        assert_eq!(config.mount.attr_ttl_secs, 5);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: OrdrfsConfig = toml::from_str("").unwrap();

        assert_eq!(config.catalog.backend, CatalogBackend::Fs);
        assert_eq!(config.catalog.prefix, "catalog");
        assert!(!config.catalog.enforce_tls);
        assert!(config.account.address.is_none());
        assert_eq!(config.mount.attr_ttl_secs, 1);
        assert!(!config.mount.allow_other);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[catalog]
backend = "memory"
"#;
        let config: OrdrfsConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.catalog.backend, CatalogBackend::Memory);
        // Defaults
        assert_eq!(config.catalog.prefix, "catalog");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = OrdrfsConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.catalog.prefix, "catalog");
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[catalog\nbackend = ").unwrap();
        let err = OrdrfsConfig::load(&path).unwrap_err();
        assert!(matches!(err, OrdrfsError::Config(_)));
    }

    #[test]
    fn test_expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde(Path::new("/srv/food")), PathBuf::from("/srv/food"));
        assert_eq!(expand_tilde(Path::new("rel/dir")), PathBuf::from("rel/dir"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = OrdrfsConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: OrdrfsConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.catalog.prefix, parsed.catalog.prefix);
        assert_eq!(config.mount.backing_dir, parsed.mount.backing_dir);
    }
}
