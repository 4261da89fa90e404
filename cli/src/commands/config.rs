use fanout_core::api::{AppConfig, CliError};

/// Render the effective configuration as TOML.
pub fn render_config(cfg: &AppConfig) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Config(e.to_string()))
}

pub fn print_config(cfg: &AppConfig) -> Result<i32, CliError> {
    print!("{}", render_config(cfg)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_config_round_trips() {
        let mut cfg = AppConfig::default();
        cfg.engine.max_concurrency = 12;
        cfg.http.resource_filter = vec!["image".into()];

        let text = render_config(&cfg).unwrap();
        assert!(text.contains("[engine]"));
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, cfg);
    }
}
