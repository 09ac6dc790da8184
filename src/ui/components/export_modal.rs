use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::application::app::{App, ExportField};
use crate::ui::helpers::centered_rect;
use crate::ui::theme::palette_from_config;

pub fn render_export_modal(frame: &mut Frame, app: &App) {
    let Some(dialog) = app.export_dialog.as_ref() else {
        return;
    };
    let palette = palette_from_config(&app.config);

    let area = centered_rect(55, 40, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Block::default()
            .title("Exportar todos los usuarios")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent))
            .style(Style::default().bg(palette.bg).fg(palette.fg)),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    let style_focused = Style::default()
        .fg(palette.accent)
        .add_modifier(Modifier::BOLD);
    let style_normal = Style::default().fg(palette.fg);

    let fields = [
        ("Desde (opcional)", ExportField::DateFrom, &dialog.date_from),
        ("Hasta (opcional)", ExportField::DateTo, &dialog.date_to),
    ];
    for (idx, (title, field, value)) in fields.iter().enumerate() {
        let is_focused = dialog.focused == Some(*field);
        let style = if is_focused { style_focused } else { style_normal };
        frame.render_widget(
            Paragraph::new(value.as_str())
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(*title)
                        .border_style(style)
                        .style(Style::default().bg(palette.bg)),
                )
                .style(style),
            chunks[idx],
        );
        if is_focused && !dialog.in_flight {
            let text_len = value.chars().count() as u16;
            frame.set_cursor_position((chunks[idx].x + 1 + text_len, chunks[idx].y + 1));
        }
    }

    let status = if dialog.in_flight {
        Paragraph::new("Exportando...").style(Style::default().fg(palette.muted))
    } else if let Some(error) = &dialog.error {
        Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red))
    } else if app.exporting_all {
        Paragraph::new("Otra exportacion en curso").style(Style::default().fg(palette.muted))
    } else {
        Paragraph::new(format!("Destino: {}", app.export_dir.display()))
            .style(Style::default().fg(palette.muted))
    };
    frame.render_widget(status.alignment(Alignment::Center), chunks[2]);

    frame.render_widget(
        Paragraph::new("Tab: campo | Enter: exportar | Esc: cerrar")
            .style(Style::default().fg(palette.muted))
            .alignment(Alignment::Center),
        chunks[3],
    );
}
