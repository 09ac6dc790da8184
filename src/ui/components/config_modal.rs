use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::application::app::{App, ConfigField};
use crate::ui::helpers::centered_rect;
use crate::ui::theme::{THEME_CATALOG, palette_with_override, resolve_theme_name};
use crate::utils::version::build_version;

fn masked_token(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 4 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("...{tail}")
    } else if chars.is_empty() {
        String::new()
    } else {
        "***".to_string()
    }
}

pub fn render_config_modal(frame: &mut Frame, app: &mut App) {
    let Some(form) = app.config_form.as_ref() else {
        return;
    };

    let area = centered_rect(72, 60, frame.area());
    frame.render_widget(Clear, area);

    let palette = palette_with_override(&app.config, Some(form.theme.as_str()));
    let version = build_version();

    let block = Block::default()
        .title(format!("Configuracion Local [{version}] rol: {}", app.session.role.label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(Style::default().bg(palette.bg).fg(palette.fg));
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let style_focused = Style::default()
        .fg(palette.accent)
        .add_modifier(Modifier::BOLD);
    let style_normal = Style::default().fg(palette.fg);

    let fields = [
        ("Token API", ConfigField::Token, &form.token),
        ("Base URL", ConfigField::BaseUrl, &form.base_url),
        ("Carpeta de exportacion", ConfigField::ExportDir, &form.export_dir),
        ("Tema (lista)", ConfigField::Theme, &form.theme),
    ];

    for (idx, (title, field, value)) in fields.iter().enumerate() {
        let is_focused = form.focused == *field;
        let style = if is_focused { style_focused } else { style_normal };
        let display_value = if *field == ConfigField::Token && !is_focused {
            masked_token(value)
        } else {
            value.to_string()
        };
        let paragraph = Paragraph::new(display_value)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(*title)
                    .border_style(style)
                    .style(Style::default().bg(palette.bg)),
            )
            .style(style);
        frame.render_widget(paragraph, chunks[idx]);

        if is_focused {
            let text_len = value.chars().count() as u16;
            frame.set_cursor_position((chunks[idx].x + 1 + text_len, chunks[idx].y + 1));
        }
    }

    let show_status = app.status.contains("Error")
        || app.status.contains("guardada")
        || app.status.contains("restablecida");
    let help_text = format!(
        "Tema actual: {} (aplicado: {})\n\
         Variables: TSHEET_TOKEN, TSHEET_BASE_URL, TSHEET_ROLE, TSHEET_EXPORT_DIR\n\
         Tab/Shift+Tab: campo | Up/Down: tema | Ctrl+U: limpiar | Ctrl+R: restablecer | Enter: guardar | Esc: cancelar{}",
        form.theme,
        resolve_theme_name(&form.theme).slug(),
        if show_status {
            format!("\n{}", app.status)
        } else {
            String::new()
        }
    );
    frame.render_widget(
        Paragraph::new(help_text)
            .style(Style::default().fg(palette.muted))
            .alignment(Alignment::Center),
        chunks[4],
    );

    if form.focused != ConfigField::Theme {
        return;
    }

    let current_theme = form.theme.clone();
    let dropdown_area = Rect {
        x: chunks[3].x,
        y: chunks[3].y + 3,
        width: chunks[3].width,
        height: (THEME_CATALOG.len() as u16 + 2).min(10),
    };

    let items: Vec<ListItem> = THEME_CATALOG
        .iter()
        .map(|theme| {
            let marker = if *theme == current_theme { "*" } else { " " };
            ListItem::new(format!("{marker} {theme}"))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title("Temas")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .style(Style::default().bg(palette.selection).fg(palette.fg)),
        )
        .highlight_style(Style::default().bg(palette.accent).fg(palette.bg))
        .highlight_symbol("-> ");

    frame.render_widget(Clear, dropdown_area);
    if let Some(form) = app.config_form.as_mut() {
        frame.render_stateful_widget(list, dropdown_area, &mut form.theme_list_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_mask_keeps_only_the_tail() {
        assert_eq!(masked_token("abcdef123"), "...f123");
        assert_eq!(masked_token("abc"), "***");
        assert_eq!(masked_token(""), "");
    }
}
