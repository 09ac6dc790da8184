use std::str::FromStr;
use std::sync::OnceLock;

use ratatui::style::Color;
use ratatui_themes::{ThemeName, ThemePalette};

use crate::domain::config::AppConfig;

pub const THEME_CATALOG: &[&str] = &[
    "dracula",
    "one-dark-pro",
    "nord",
    "catppuccin-mocha",
    "catppuccin-latte",
    "gruvbox-dark",
    "gruvbox-light",
    "tokyo-night",
    "solarized-dark",
    "solarized-light",
    "monokai-pro",
    "rose-pine",
    "kanagawa",
    "everforest",
    "cyberpunk",
];

const DEFAULT_THEME: ThemeName = ThemeName::TokyoNight;
const LIGHT_THEME: ThemeName = ThemeName::CatppuccinLatte;

pub fn palette_from_config(config: &AppConfig) -> ThemePalette {
    resolve_theme_name(&config.theme).palette()
}

/// Palette for a theme being previewed in the config form.
pub fn palette_with_override(config: &AppConfig, override_theme: Option<&str>) -> ThemePalette {
    resolve_theme_name(override_theme.unwrap_or(&config.theme)).palette()
}

pub fn resolve_theme_name(raw: &str) -> ThemeName {
    let value = normalize_theme_key(raw);
    if value == "auto" {
        return detect_system_theme_name();
    }
    ThemeName::from_str(&value).unwrap_or(DEFAULT_THEME)
}

fn normalize_theme_key(raw: &str) -> String {
    let value = raw.trim().to_ascii_lowercase();
    match value.as_str() {
        "" => "tokyo-night".to_string(),
        "default" | "system" => "auto".to_string(),
        "tokyo" => "tokyo-night".to_string(),
        "catppuccin" | "mocha" => "catppuccin-mocha".to_string(),
        "latte" => "catppuccin-latte".to_string(),
        "gruvbox" => "gruvbox-dark".to_string(),
        "solarized" => "solarized-dark".to_string(),
        _ => value,
    }
}

fn detect_system_theme_name() -> ThemeName {
    static DETECTED_THEME: OnceLock<ThemeName> = OnceLock::new();
    *DETECTED_THEME.get_or_init(|| {
        let hint = std::env::var("TSHEET_SYSTEM_THEME").ok();
        let colorfgbg = std::env::var("COLORFGBG").ok();
        match parse_theme_hint(hint.as_deref()).or_else(|| background_is_dark(colorfgbg.as_deref())) {
            Some(false) => LIGHT_THEME,
            _ => DEFAULT_THEME,
        }
    })
}

fn parse_theme_hint(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "dark" | "1" | "true" => Some(true),
        "light" | "0" | "false" => Some(false),
        _ => None,
    }
}

// COLORFGBG is "fg;bg" (sometimes "fg;default;bg"); ANSI 7 and 15 are light backgrounds.
fn background_is_dark(raw: Option<&str>) -> Option<bool> {
    let bg = raw?.rsplit(';').next()?.trim().parse::<u8>().ok()?;
    Some(!matches!(bg, 7 | 15))
}

/// Colors cycled through by the statistics bars.
pub fn series_color(palette: &ThemePalette, idx: usize) -> Color {
    match idx % 4 {
        0 => palette.accent,
        1 => Color::Green,
        2 => Color::Yellow,
        _ => Color::Magenta,
    }
}
