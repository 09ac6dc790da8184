pub mod components;
pub mod helpers;
pub mod theme;
pub mod tui;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap},
};
use ratatui_themes::ThemePalette;

use crate::application::app::{App, InputMode, TimesheetListing, View};
use crate::domain::filter::{total_hours, user_label};
use crate::domain::models::User;
use crate::ui::components::config_modal::render_config_modal;
use crate::ui::components::confirm_modal::render_confirm_delete;
use crate::ui::components::entry_modal::render_entry_modal;
use crate::ui::components::export_modal::render_export_modal;
use crate::ui::components::filter_modal::render_filter_modal;
use crate::ui::theme::{palette_from_config, series_color};
use crate::utils::parsing::{display_day, format_hours};

pub fn ui(frame: &mut Frame, app: &mut App) {
    let palette = palette_from_config(&app.config);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_tabs(frame, app, &palette, layout[0]);

    match app.view {
        View::MyTimesheets => {
            render_listing(frame, &mut app.mine, &[], false, &palette, layout[1])
        }
        View::AllTimesheets => {
            let users = app.users.users.clone();
            render_listing(frame, &mut app.admin, &users, true, &palette, layout[1])
        }
        View::Users => render_users(frame, app, &palette, layout[1]),
        View::Statistics => render_statistics(frame, app, &palette, layout[1]),
    }

    render_actions(frame, app, &palette, layout[2]);

    match app.input_mode {
        InputMode::Filtering => render_filter_modal(frame, app),
        InputMode::EntryForm => render_entry_modal(frame, app),
        InputMode::ConfirmDelete => render_confirm_delete(frame, app),
        InputMode::Exporting => render_export_modal(frame, app),
        InputMode::Configuring => render_config_modal(frame, app),
        InputMode::Normal => {}
    }
}

fn render_tabs(frame: &mut Frame, app: &App, palette: &ThemePalette, area: Rect) {
    let views = app.available_views();
    let titles: Vec<Line> = views
        .iter()
        .enumerate()
        .map(|(idx, view)| Line::from(format!("{} {}", idx + 1, view.title())))
        .collect();
    let selected = views.iter().position(|view| *view == app.view).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(format!(
                    "tsheet - {} ({})",
                    app.session.base_url,
                    app.session.role.label()
                ))
                .borders(Borders::ALL),
        )
        .select(selected)
        .style(Style::default().fg(palette.muted))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn notice(frame: &mut Frame, title: String, text: &str, color: Color, area: Rect) {
    frame.render_widget(
        Paragraph::new(text.to_string())
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true })
            .block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}

fn render_listing(
    frame: &mut Frame,
    listing: &mut TimesheetListing,
    users: &[User],
    with_user: bool,
    palette: &ThemePalette,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    frame.render_widget(
        Paragraph::new(format!("Filtro: {}", listing.filter.summary()))
            .style(Style::default().fg(palette.muted)),
        chunks[0],
    );

    let visible = listing.visible();
    let title = format!(
        "Registros ({}/{}) | {}h",
        visible.len(),
        listing.records.len(),
        format_hours(total_hours(&visible))
    );

    if let Some(error) = &listing.error {
        if listing.records.is_empty() {
            notice(frame, title, error, Color::Red, chunks[1]);
            return;
        }
    }
    if listing.loading && !listing.loaded {
        notice(frame, title, "Cargando...", palette.muted, chunks[1]);
        return;
    }
    if visible.is_empty() {
        let text = if listing.records.is_empty() {
            "No hay registros todavia"
        } else {
            "Ningun registro coincide con los filtros (x: limpiar)"
        };
        notice(frame, title, text, palette.muted, chunks[1]);
        return;
    }

    let mut header = vec!["Fecha"];
    if with_user {
        header.push("Usuario");
    }
    header.extend(["Proyecto", "Horas", "Descripcion"]);

    let rows: Vec<Row> = visible
        .iter()
        .map(|entry| {
            let mut cells = vec![Cell::from(display_day(&entry.date))];
            if with_user {
                cells.push(Cell::from(user_label(users, entry.user_id)));
            }
            cells.push(Cell::from(entry.project.clone()));
            cells.push(Cell::from(format!("{:>5}", format_hours(entry.hours))));
            cells.push(Cell::from(entry.description.clone()));
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(12)];
    if with_user {
        widths.push(Constraint::Length(16));
    }
    widths.extend([
        Constraint::Length(20),
        Constraint::Length(6),
        Constraint::Min(10),
    ]);

    let title = match &listing.error {
        Some(error) => format!("{title} | {error}"),
        None if listing.loading => format!("{title} | actualizando..."),
        None => title,
    };

    let table = Table::new(rows, widths)
        .header(
            Row::new(header).style(
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
        )
        .block(Block::default().title(title).borders(Borders::ALL))
        .row_highlight_style(
            Style::default()
                .bg(palette.selection)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");

    frame.render_stateful_widget(table, chunks[1], &mut listing.table_state);
}

fn render_users(frame: &mut Frame, app: &App, palette: &ThemePalette, area: Rect) {
    let title = format!("Usuarios ({})", app.users.users.len());
    if let Some(error) = &app.users.error {
        notice(frame, title, error, Color::Red, area);
        return;
    }
    if app.users.loading && !app.users.loaded {
        notice(frame, title, "Cargando...", palette.muted, area);
        return;
    }

    let rows: Vec<Row> = app
        .users
        .users
        .iter()
        .map(|user| {
            Row::new(vec![
                Cell::from(user.id.to_string()),
                Cell::from(user.username.clone()),
                Cell::from(user.role.label()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(16),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["ID", "Usuario", "Rol"]).style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(Block::default().title(title).borders(Borders::ALL))
    .row_highlight_style(Style::default().bg(palette.selection))
    .highlight_symbol("-> ");

    let mut state = ratatui::widgets::TableState::default();
    state.select(app.users.list_state.selected());
    frame.render_stateful_widget(table, area, &mut state);
}

// Bars carry tenths of an hour so fractional totals still render.
fn hours_bar(label: String, hours: f64, color: Color) -> Bar<'static> {
    Bar::default()
        .value((hours.max(0.0) * 10.0).round() as u64)
        .text_value(format_hours(hours))
        .label(Line::from(label))
        .style(Style::default().fg(color))
}

fn render_statistics(frame: &mut Frame, app: &App, palette: &ThemePalette, area: Rect) {
    let stats = &app.stats;
    let title = format!("Estadisticas - {} (<-/->: rango)", stats.range.label());

    if let Some(error) = &stats.error {
        notice(frame, title, error, Color::Red, area);
        return;
    }
    let Some(data) = &stats.data else {
        notice(frame, title, "Cargando...", palette.muted, area);
        return;
    };
    if data.is_empty() {
        notice(frame, title, "Sin horas registradas en este rango", palette.muted, area);
        return;
    }

    let outer = Block::default()
        .title(format!(
            "{} | total {}h{}",
            title,
            format_hours(data.total_hours()),
            if stats.loading { " | actualizando..." } else { "" }
        ))
        .borders(Borders::ALL);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[0]);

    let project_bars: Vec<Bar> = data
        .project_distribution
        .iter()
        .enumerate()
        .map(|(idx, item)| hours_bar(item.project.clone(), item.hours, series_color(palette, idx)))
        .collect();
    frame.render_widget(
        BarChart::default()
            .block(Block::default().title("Por proyecto").borders(Borders::ALL))
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .data(BarGroup::default().bars(&project_bars)),
        top[0],
    );

    let employee_rows: Vec<Row> = data
        .employee_hours
        .iter()
        .map(|item| {
            Row::new(vec![
                Cell::from(item.name.clone()),
                Cell::from(format!("{:>6}h", format_hours(item.hours))),
            ])
        })
        .collect();
    frame.render_widget(
        Table::new(employee_rows, [Constraint::Min(12), Constraint::Length(8)])
            .header(Row::new(vec!["Empleado", "Horas"]).style(Style::default().fg(palette.accent)))
            .block(Block::default().title("Por empleado").borders(Borders::ALL)),
        top[1],
    );

    let daily_bars: Vec<Bar> = data
        .daily_trends
        .iter()
        .map(|item| {
            let day = display_day(&item.date);
            let short = day.get(5..).unwrap_or(&day).to_string();
            hours_bar(short, item.hours, palette.accent)
        })
        .collect();
    frame.render_widget(
        BarChart::default()
            .block(Block::default().title("Tendencia diaria").borders(Borders::ALL))
            .bar_width(5)
            .bar_gap(1)
            .data(BarGroup::default().bars(&daily_bars)),
        rows[1],
    );
}

fn render_actions(frame: &mut Frame, app: &App, palette: &ThemePalette, area: Rect) {
    let keys = match app.view {
        View::MyTimesheets => "n: nuevo | e: editar | d: eliminar | f: filtros | x: limpiar",
        View::AllTimesheets => "e: exportar usuario | E: exportar todos | f: filtros | x: limpiar",
        View::Users => "j/k: mover",
        View::Statistics => "<-/->: rango",
    };
    let status_style = if app.status.starts_with("error") {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(palette.fg)
    };
    let busy = if app.has_pending_tasks() { " [..]" } else { "" };

    let text = Line::from(vec![
        Span::styled(
            format!("{keys} | Tab: vista | r: refrescar | c: config | q: salir | "),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("{}{busy}", app.status), status_style),
    ]);

    frame.render_widget(
        Paragraph::new(text).block(Block::default().title("Acciones").borders(Borders::ALL)),
        area,
    );
}
