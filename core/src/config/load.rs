use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default fanout data directory: ~/.fanout
pub fn get_fanout_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".fanout"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.fanout/config.toml
    let user_config = get_fanout_data_dir().ok().map(|d| d.join("config.toml"));

    // Priority 2: ./fanout.toml
    let local_config = Path::new("fanout.toml");

    let mut cfg = match user_config.filter(|p| p.exists()) {
        Some(path) => read_config(&path)?,
        None if local_config.exists() => read_config(local_config)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

/// Load an explicit config file. Environment overrides still apply.
pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let mut cfg = read_config(path.as_ref())?;
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Some(v) = env_value("FANOUT_MAX_CONCURRENCY") {
        cfg.engine.max_concurrency = v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("FANOUT_MAX_CONCURRENCY must be a number, got '{v}'"))?;
    }
    if let Some(v) = env_value("FANOUT_DISPATCH_MODE") {
        cfg.engine.dispatch_mode = v.parse()?;
    }
    if let Some(v) = env_value("FANOUT_MAX_RETRIES") {
        cfg.engine.retry.max_retries = v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("FANOUT_MAX_RETRIES must be a number, got '{v}'"))?;
    }
    if let Some(v) = env_value("FANOUT_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    Ok(())
}
