const DEVELOPMENT_VERSION: &str = "development";

pub fn build_version() -> &'static str {
    match option_env!("TSHEET_RELEASE_VERSION") {
        Some(version) if !version.trim().is_empty() => version,
        _ => DEVELOPMENT_VERSION,
    }
}

/// Sent with every backend request so server logs can tell client builds apart.
pub fn user_agent() -> String {
    format!("tsheet/{}", build_version())
}
