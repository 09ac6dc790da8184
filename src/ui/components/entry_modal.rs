use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::application::app::{App, FormField, FormMode};
use crate::domain::validation::{MAX_HOURS, MIN_HOURS};
use crate::ui::helpers::centered_rect;
use crate::ui::theme::palette_from_config;

pub fn render_entry_modal(frame: &mut Frame, app: &mut App) {
    let Some(form) = app.entry_form.as_ref() else {
        return;
    };

    let area = centered_rect(60, 55, frame.area());
    let palette = palette_from_config(&app.config);

    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(form.title())
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
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    let style_focused = Style::default()
        .fg(palette.accent)
        .add_modifier(Modifier::BOLD);
    let style_normal = Style::default().fg(palette.fg);

    let hours_title = format!("Horas ({MIN_HOURS}-{MAX_HOURS})");
    let project_title = match &form.selected_project {
        Some(_) => "Proyecto",
        None => "Proyecto (Busca...)",
    };
    let fields = [
        ("Fecha (YYYY-MM-DD)", FormField::Date, &form.date),
        (project_title, FormField::Project, &form.project_search),
        (hours_title.as_str(), FormField::Hours, &form.hours),
        ("Descripcion", FormField::Description, &form.description),
    ];

    for (idx, (title, field, value)) in fields.iter().enumerate() {
        let style = if form.focused == *field {
            style_focused
        } else {
            style_normal
        };
        let paragraph = Paragraph::new(value.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(*title)
                    .border_style(style)
                    .style(Style::default().bg(palette.bg)),
            )
            .style(style);
        frame.render_widget(paragraph, chunks[idx]);

        if form.focused == *field && !form.submitting {
            let text_len = value.chars().count() as u16;
            frame.set_cursor_position((chunks[idx].x + 1 + text_len, chunks[idx].y + 1));
        }
    }

    let (message, message_style) = match (&form.error, form.submitting) {
        (_, true) => ("Guardando...".to_string(), Style::default().fg(palette.muted)),
        (Some(error), false) => (error.clone(), Style::default().fg(Color::Red)),
        (None, false) => (String::new(), style_normal),
    };
    frame.render_widget(
        Paragraph::new(message)
            .style(message_style)
            .alignment(Alignment::Center),
        chunks[4],
    );

    let submit_label = match form.mode {
        FormMode::Create => "crear",
        FormMode::Edit(_) => "actualizar",
    };
    frame.render_widget(
        Paragraph::new(format!(
            "Tab: siguiente | Shift+Tab: anterior | Enter: {submit_label} (en Descripcion) | Ctrl+S: guardar | Esc: cancelar"
        ))
        .style(Style::default().fg(palette.muted))
        .alignment(Alignment::Center),
        chunks[5],
    );

    if form.focused != FormField::Project
        || form.selected_project.is_some()
        || form.filtered_indices.is_empty()
    {
        return;
    }

    let indices = form.filtered_indices.clone();
    let dropdown_area = Rect {
        x: chunks[1].x,
        y: chunks[1].y + 3,
        width: chunks[1].width,
        height: 10.min(indices.len() as u16 + 2),
    };

    let items: Vec<ListItem> = indices
        .iter()
        .filter_map(|&idx| app.project_options.get(idx))
        .map(|project| ListItem::new(project.clone()))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .style(Style::default().bg(palette.selection).fg(palette.fg)),
        )
        .highlight_style(Style::default().bg(palette.accent).fg(palette.bg));

    frame.render_widget(Clear, dropdown_area);
    if let Some(form) = app.entry_form.as_mut() {
        frame.render_stateful_widget(list, dropdown_area, &mut form.list_state);
    }
}
