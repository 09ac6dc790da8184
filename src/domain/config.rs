use serde::{Deserialize, Serialize};

use crate::domain::models::Role;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    // Issued together with the token by the identity service; `None` defers
    // to TSHEET_ROLE.
    #[serde(default)]
    pub role: Option<Role>,
    // None -> current directory
    #[serde(default)]
    pub export_dir: Option<String>,
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: default_base_url(),
            role: None,
            export_dir: None,
            theme: default_theme(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_theme() -> String {
    "tokyo-night".to_string()
}
