//! Dashboard configuration – reads/writes `~/.nt4dash/config.toml`.

use nt4dash_server::{AssetRoot, DEFAULT_PORT, PageConfig};
use nt4dash_types::DashError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

/// Persisted dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP port the asset server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Deploy directory; assets are served from `deploy_dir/asset_subdir`.
    #[serde(default = "default_deploy_dir")]
    pub deploy_dir: PathBuf,

    #[serde(default = "default_asset_subdir")]
    pub asset_subdir: String,

    /// Identifier the client module announces to the NT4 server.
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// NT4 server the client module connects to.
    #[serde(default = "default_target_address")]
    pub target_address: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_deploy_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_asset_subdir() -> String {
    "dashboard".to_string()
}
fn default_client_name() -> String {
    "nt4dash".to_string()
}
fn default_target_address() -> String {
    "localhost".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            deploy_dir: default_deploy_dir(),
            asset_subdir: default_asset_subdir(),
            client_name: default_client_name(),
            target_address: default_target_address(),
        }
    }
}

impl Config {
    pub fn asset_root(&self) -> AssetRoot {
        AssetRoot::under(&self.deploy_dir, &self.asset_subdir)
    }

    /// Start arguments the served page hands to the client module.
    pub fn page_config(&self) -> PageConfig {
        PageConfig::new(&self.client_name, &self.target_address)
    }
}

/// `$NT4DASH_CONFIG`, or `~/.nt4dash/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("NT4DASH_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".nt4dash").join("config.toml")
}

/// Effective configuration: the file if present, else defaults, with
/// `NT4DASH_*` overrides applied on top.
pub fn load() -> Result<Config, DashError> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse the file at `path`.  `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, DashError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| DashError::Config(format!("failed to read {}: {e}", path.display())))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| DashError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `NT4DASH_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `NT4DASH_PORT` | `port` |
/// | `NT4DASH_BIND` | `bind_address` |
/// | `NT4DASH_DEPLOY_DIR` | `deploy_dir` |
/// | `NT4DASH_ASSET_SUBDIR` | `asset_subdir` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("NT4DASH_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.port = port;
    }
    if let Ok(v) = std::env::var("NT4DASH_BIND")
        && let Ok(addr) = v.parse::<IpAddr>()
    {
        cfg.bind_address = addr;
    }
    if let Ok(v) = std::env::var("NT4DASH_DEPLOY_DIR") {
        cfg.deploy_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("NT4DASH_ASSET_SUBDIR") {
        cfg.asset_subdir = v;
    }
}

/// Write `cfg` to `path`, creating parent directories.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), DashError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| DashError::Config(format!("failed to create {}: {e}", parent.display())))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| DashError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| DashError::Config(format!("failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deploy_layout() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 7070);
        assert_eq!(cfg.bind_address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(cfg.asset_root().dir(), Path::new("./dashboard"));
    }

    #[test]
    fn page_config_carries_client_settings() {
        let cfg = Config {
            client_name: "driver-station".to_string(),
            target_address: "10.12.34.2".to_string(),
            ..Config::default()
        };
        assert_eq!(
            cfg.page_config(),
            PageConfig::new("driver-station", "10.12.34.2")
        );
        assert_eq!(Config::default().page_config(), PageConfig::default());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = 5800\ndeploy_dir = \"/home/lvuser/deploy\"\n").unwrap();

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.port, 5800);
        assert_eq!(
            cfg.asset_root().dir(),
            Path::new("/home/lvuser/deploy/dashboard")
        );
        assert_eq!(cfg.client_name, "nt4dash");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = \"seventy\"").unwrap();
        assert!(matches!(load_from(&path), Err(DashError::Config(_))));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_nt4dash_dir() {
        let p = config_path_for_home("/home/testuser");
        assert_eq!(p, PathBuf::from("/home/testuser/.nt4dash/config.toml"));
    }

    #[test]
    fn apply_env_overrides_changes_port() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("NT4DASH_PORT", "5810") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.port, 5810);
        unsafe { std::env::remove_var("NT4DASH_PORT") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_bind() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("NT4DASH_BIND", "not-an-ip") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.bind_address, default_bind_address());
        unsafe { std::env::remove_var("NT4DASH_BIND") };
    }

    #[test]
    fn apply_env_overrides_changes_asset_location() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe {
            std::env::set_var("NT4DASH_DEPLOY_DIR", "/srv/robot");
            std::env::set_var("NT4DASH_ASSET_SUBDIR", "web");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.asset_root().dir(), Path::new("/srv/robot/web"));
        unsafe {
            std::env::remove_var("NT4DASH_DEPLOY_DIR");
            std::env::remove_var("NT4DASH_ASSET_SUBDIR");
        }
    }
}
