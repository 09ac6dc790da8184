use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::application::app::{App, FilterField, View};
use crate::domain::filter::user_label;
use crate::ui::helpers::centered_rect;
use crate::ui::theme::palette_from_config;

pub fn render_filter_modal(frame: &mut Frame, app: &App) {
    let Some(form) = app.filter_form.as_ref() else {
        return;
    };
    let palette = palette_from_config(&app.config);
    let listing = match form.target {
        View::AllTimesheets => &app.admin,
        _ => &app.mine,
    };

    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Block::default()
            .title(format!("Filtros - {}", form.target.title()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent))
            .style(Style::default().bg(palette.bg).fg(palette.fg)),
        area,
    );

    let user_value = match form.user.value() {
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => format!("{} (#{id})", user_label(&app.users.users, id)),
            Err(_) => raw.to_string(),
        },
        None => "Todos".to_string(),
    };
    let project_value = form.project.value().unwrap_or("Todos").to_string();

    let mut fields = Vec::with_capacity(5);
    if form.has_user_field() {
        fields.push(("Usuario (Up/Down)", FilterField::User, user_value, false));
    }
    fields.push(("Proyecto (Up/Down)", FilterField::Project, project_value, false));
    fields.push(("Desde (YYYY-MM-DD)", FilterField::DateFrom, form.date_from.clone(), true));
    fields.push(("Hasta (YYYY-MM-DD)", FilterField::DateTo, form.date_to.clone(), true));
    fields.push(("Buscar en descripcion", FilterField::Search, form.search.clone(), true));

    let mut constraints: Vec<Constraint> = fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(2));
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(constraints)
        .split(area);

    let style_focused = Style::default()
        .fg(palette.accent)
        .add_modifier(Modifier::BOLD);
    let style_normal = Style::default().fg(palette.fg);

    for (idx, (title, field, value, editable)) in fields.iter().enumerate() {
        let is_focused = form.focused == *field;
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
        if is_focused && *editable {
            let text_len = value.chars().count() as u16;
            frame.set_cursor_position((chunks[idx].x + 1 + text_len, chunks[idx].y + 1));
        }
    }

    let status_idx = fields.len();
    let status = match &form.error {
        Some(error) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(format!(
            "{} de {} registros",
            listing.visible().len(),
            listing.records.len()
        ))
        .style(Style::default().fg(palette.muted)),
    };
    frame.render_widget(status.alignment(Alignment::Center), chunks[status_idx]);

    frame.render_widget(
        Paragraph::new("Tab/Shift+Tab: campo | Up/Down: opcion | Ctrl+R: limpiar | Enter/Esc: cerrar")
            .style(Style::default().fg(palette.muted))
            .alignment(Alignment::Center),
        chunks[status_idx + 1],
    );
}
