use ratatui::{
    Frame,
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::application::app::App;
use crate::ui::helpers::centered_rect;
use crate::ui::theme::palette_from_config;
use crate::utils::parsing::{display_day, format_hours};

pub fn render_confirm_delete(frame: &mut Frame, app: &App) {
    let Some(id) = app.pending_delete else {
        return;
    };
    let palette = palette_from_config(&app.config);

    let area = centered_rect(50, 25, frame.area());
    frame.render_widget(Clear, area);

    let detail = match app.pending_delete_entry() {
        Some(entry) => format!(
            "{} | {} | {}h | {}",
            display_day(&entry.date),
            entry.project,
            format_hours(entry.hours),
            entry.description
        ),
        None => format!("Registro #{id}"),
    };

    let text = vec![
        Line::from(Span::styled(
            "Seguro que quieres eliminar este registro?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(detail),
        Line::from(""),
        Line::from(Span::styled(
            "y/Enter: eliminar | n/Esc: cancelar",
            Style::default().fg(palette.muted),
        )),
    ];

    frame.render_widget(
        Paragraph::new(text)
            .block(
                Block::default()
                    .title("Eliminar registro")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .style(Style::default().bg(palette.bg).fg(palette.fg)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}
