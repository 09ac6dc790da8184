use std::env;
use std::path::PathBuf;

use crate::domain::config::{AppConfig, DEFAULT_BASE_URL};
use crate::domain::models::Role;
use crate::domain::session::SessionContext;
use crate::log;

const APP_NAME: &str = "tsheet";

pub fn load_config() -> AppConfig {
    match confy::load(APP_NAME, "config") {
        Ok(cfg) => {
            log!("Config loaded successfully");
            cfg
        }
        Err(e) => {
            log!("Error loading config: {}. Using default.", e);
            AppConfig::default()
        }
    }
}

pub fn save_config(cfg: &AppConfig) -> Result<(), String> {
    confy::store(APP_NAME, "config", cfg).map_err(|e| e.to_string())
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.replace('"', "").trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn effective_token(config: &AppConfig) -> String {
    if !config.api_token.trim().is_empty() {
        config.api_token.trim().to_string()
    } else {
        env_value("TSHEET_TOKEN").unwrap_or_default()
    }
}

pub fn effective_base_url(config: &AppConfig) -> String {
    let base_url = if !config.base_url.trim().is_empty() && config.base_url != DEFAULT_BASE_URL {
        config.base_url.trim().to_string()
    } else {
        env_value("TSHEET_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    };
    base_url.trim_end_matches('/').to_string()
}

pub fn effective_role(config: &AppConfig) -> Role {
    match config.role {
        Some(role) => role,
        None => env_value("TSHEET_ROLE")
            .map(|raw| Role::parse(&raw))
            .unwrap_or_default(),
    }
}

pub fn effective_export_dir(config: &AppConfig) -> PathBuf {
    config
        .export_dir
        .as_deref()
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(str::to_string)
        .or_else(|| env_value("TSHEET_EXPORT_DIR"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The one place where credentials are read; everything downstream gets
/// the resulting context injected.
pub fn resolve_session(config: &AppConfig) -> SessionContext {
    let session = SessionContext::new(
        &effective_base_url(config),
        &effective_token(config),
        effective_role(config),
    );
    log!(
        "Session resolved: base_url={}, authenticated={}, role={}",
        session.base_url,
        session.is_authenticated(),
        session.role.label()
    );
    session
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_values_win_over_environment() {
        let config = AppConfig {
            api_token: " secret ".to_string(),
            base_url: "https://timesheets.example.com/".to_string(),
            role: Some(Role::Admin),
            export_dir: Some("/tmp/exports".to_string()),
            ..AppConfig::default()
        };
        let session = resolve_session(&config);
        assert_eq!(session.token, "secret");
        assert_eq!(session.base_url, "https://timesheets.example.com");
        assert!(session.is_admin());
        assert_eq!(effective_export_dir(&config), PathBuf::from("/tmp/exports"));
    }
}
