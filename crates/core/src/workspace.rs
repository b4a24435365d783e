use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coinboard_types::config::AppConfig;
use tracing::{debug, info};

/// Dotfolder name under `$HOME`.
const DOTFOLDER: &str = ".coinboard";

/// Overrides the dotfolder location.
pub const HOME_ENV: &str = "COINBOARD_HOME";

/// Overrides `api.api_key`.
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

/// Required subdirectories inside the dotfolder.
const SUBDIRS: &[&str] = &["logs", "data"];

const CONFIG_FILE: &str = "config.toml";
const STORE_FILE: &str = "data/coins.db";

/// Resolve the root path: `$COINBOARD_HOME`, else `$HOME/.coinboard/`.
pub fn root_dir() -> Result<PathBuf> {
    if let Some(custom) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(custom));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(DOTFOLDER))
}

/// Resolve a path relative to the dotfolder root.
pub fn resolve(relative: &str) -> Result<PathBuf> {
    Ok(root_dir()?.join(relative))
}

/// Ensure the dotfolder structure exists. Idempotent.
///
/// ```text
/// $HOME/.coinboard/
/// ├── config.toml
/// ├── logs/
/// └── data/
///     └── coins.db   (written by `coinboard store sync`)
/// ```
pub fn init_workspace() -> Result<WorkspaceReport> {
    // A `.env` in the working directory may carry COINGECKO_API_KEY.
    let env_file = dotenvy::dotenv().ok();
    let created = init_workspace_at(&root_dir()?)?;
    Ok(WorkspaceReport { created, env_file })
}

/// What [`init_workspace`] did. Runs before logging is set up, so the
/// caller logs it afterwards.
#[derive(Debug, Default)]
pub struct WorkspaceReport {
    pub created: Vec<PathBuf>,
    pub env_file: Option<PathBuf>,
}

impl WorkspaceReport {
    pub fn log(&self) {
        if let Some(path) = &self.env_file {
            debug!("loaded {}", path.display());
        }
        for path in &self.created {
            info!("created {}", path.display());
        }
    }
}

/// Create whatever is missing under `root`; returns the created paths.
pub fn init_workspace_at(root: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for sub in SUBDIRS {
        let dir = root.join(sub);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            created.push(dir);
        }
    }

    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        write_config(&config_path, &AppConfig::default())?;
        created.push(config_path);
    }

    Ok(created)
}

/// Load the config from disk with environment overrides applied.
pub fn load_config() -> Result<AppConfig> {
    let mut config = load_config_from(&root_dir()?)?;
    apply_env_overrides(&mut config, std::env::var(API_KEY_ENV).ok());
    Ok(config)
}

/// Load `config.toml` under `root` as written, without overrides.
pub fn load_config_from(root: &Path) -> Result<AppConfig> {
    let config_path = root.join(CONFIG_FILE);
    let raw = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse {}", config_path.display()))
}

/// Write the config back to disk.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(&root_dir()?, config)
}

pub fn save_config_to(root: &Path, config: &AppConfig) -> Result<()> {
    write_config(&root.join(CONFIG_FILE), config)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, toml_str).with_context(|| format!("Failed to write {}", path.display()))
}

/// A non-empty key from the environment replaces the configured one.
pub fn apply_env_overrides(config: &mut AppConfig, api_key: Option<String>) {
    if let Some(key) = api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
        debug!("using API key from {API_KEY_ENV}");
        config.api.api_key = Some(key);
    }
}

/// Store database path: `store.path` if set, else `<root>/data/coins.db`.
pub fn store_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.store.path {
        Some(path) => Ok(PathBuf::from(path)),
        None => resolve(STORE_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("coinboard-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_resolve_relative_path() {
        let path = resolve("data/coins.db").unwrap();
        assert!(path.ends_with("data/coins.db"));
        assert!(path.starts_with(root_dir().unwrap()));
    }

    #[test]
    fn test_init_workspace_idempotent() {
        let root = scratch("init");
        let created = init_workspace_at(&root).unwrap();
        assert_eq!(created.len(), SUBDIRS.len() + 1);
        assert!(created.contains(&root.join(CONFIG_FILE)));
        assert!(init_workspace_at(&root).unwrap().is_empty());
        for sub in SUBDIRS {
            assert!(root.join(sub).is_dir(), "{sub} directory should exist");
        }
        assert!(root.join(CONFIG_FILE).is_file());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_load_and_save_config() {
        let root = scratch("roundtrip");
        init_workspace_at(&root).unwrap();
        let mut config = load_config_from(&root).unwrap();
        assert_eq!(config, AppConfig::default());

        config.api.vs_currency = "eur".into();
        config.display.per_page = 50;
        save_config_to(&root, &config).unwrap();

        let reloaded = load_config_from(&root).unwrap();
        assert_eq!(reloaded.api.vs_currency, "eur");
        assert_eq!(reloaded.display.per_page, 50);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let root = scratch("keep");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(CONFIG_FILE), "[api]\nvs_currency = \"gbp\"\n").unwrap();
        init_workspace_at(&root).unwrap();
        let config = load_config_from(&root).unwrap();
        assert_eq!(config.api.vs_currency, "gbp");
        assert_eq!(config.query.stale_secs, 30);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_unparseable_config_is_error() {
        let root = scratch("broken");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(CONFIG_FILE), "api = [").unwrap();
        assert!(load_config_from(&root).is_err());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_env_key_overrides_config() {
        let mut config = AppConfig::default();
        config.api.api_key = Some("from-file".into());

        apply_env_overrides(&mut config, None);
        assert_eq!(config.api.api_key.as_deref(), Some("from-file"));

        apply_env_overrides(&mut config, Some("  ".into()));
        assert_eq!(config.api.api_key.as_deref(), Some("from-file"));

        apply_env_overrides(&mut config, Some("CG-env".into()));
        assert_eq!(config.api.api_key.as_deref(), Some("CG-env"));
    }

    #[test]
    fn test_store_path_override() {
        let mut config = AppConfig::default();
        assert!(store_path(&config).unwrap().ends_with("data/coins.db"));
        config.store.path = Some("/tmp/elsewhere.db".into());
        assert_eq!(store_path(&config).unwrap(), PathBuf::from("/tmp/elsewhere.db"));
    }
}
