use crossterm::event::{KeyCode, KeyModifiers};

use crate::application::app::{App, InputMode, View};

pub fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> bool {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match app.input_mode {
        InputMode::Filtering => {
            match code {
                KeyCode::Esc | KeyCode::Enter => app.close_filter(),
                KeyCode::BackTab => app.filter_prev_field(),
                KeyCode::Tab => app.filter_next_field(),
                KeyCode::Up => app.filter_cycle(false),
                KeyCode::Down => app.filter_cycle(true),
                KeyCode::Backspace => app.filter_backspace(),
                KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                    app.reset_filters()
                }
                KeyCode::Char(value) => app.filter_input(value),
                _ => {}
            }
            return false;
        }
        InputMode::EntryForm => {
            match code {
                KeyCode::Esc => app.close_entry_form(),
                KeyCode::BackTab => app.form_prev_field(),
                KeyCode::Tab => app.form_next_field(),
                KeyCode::Enter => app.form_enter(),
                KeyCode::Up => app.form_nav_up(),
                KeyCode::Down => app.form_nav_down(),
                KeyCode::Backspace => app.form_input_backspace(),
                KeyCode::Char('s') if modifiers.contains(KeyModifiers::CONTROL) => {
                    app.submit_entry()
                }
                KeyCode::Char(value) => app.form_input_push(value),
                _ => {}
            }
            return false;
        }
        InputMode::ConfirmDelete => {
            match code {
                KeyCode::Char('y') | KeyCode::Char('s') | KeyCode::Enter => app.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Esc => app.cancel_delete(),
                _ => {}
            }
            return false;
        }
        InputMode::Exporting => {
            match code {
                KeyCode::Esc => app.close_export_dialog(),
                KeyCode::Tab | KeyCode::BackTab => app.export_toggle_field(),
                KeyCode::Enter => app.submit_export_dialog(),
                KeyCode::Backspace => app.export_backspace(),
                KeyCode::Char(value) => app.export_input(value),
                _ => {}
            }
            return false;
        }
        InputMode::Configuring => {
            match code {
                KeyCode::Esc => app.close_config(),
                KeyCode::BackTab => app.config_prev_field(),
                KeyCode::Tab => app.config_next_field(),
                KeyCode::Up => app.config_theme_previous(),
                KeyCode::Down => app.config_theme_next(),
                KeyCode::Enter => app.save_config_form(),
                KeyCode::Backspace => app.config_backspace(),
                KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                    app.config_clear_field()
                }
                KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                    app.config_reset_defaults()
                }
                KeyCode::Char(value) => app.config_input(value),
                _ => {}
            }
            return false;
        }
        InputMode::Normal => {}
    }

    match code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => app.next_view(),
        KeyCode::BackTab => app.previous_view(),
        KeyCode::Char(digit @ '1'..='4') => {
            app.select_view_index(digit as usize - '1' as usize)
        }
        KeyCode::Down | KeyCode::Char('j') => app.next_row(),
        KeyCode::Up | KeyCode::Char('k') => app.previous_row(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('f') => app.open_filter(),
        KeyCode::Char('x') => app.reset_filters(),
        KeyCode::Char('c') => app.open_config(),
        _ => match app.view {
            View::MyTimesheets => match code {
                KeyCode::Char('n') => app.open_add_entry(),
                KeyCode::Char('e') | KeyCode::Enter => app.open_edit_entry(),
                KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
                _ => {}
            },
            View::AllTimesheets => match code {
                KeyCode::Char('e') => app.export_selected_user(),
                KeyCode::Char('E') => app.open_export_dialog(),
                _ => {}
            },
            View::Statistics => match code {
                KeyCode::Right | KeyCode::Char('l') => app.next_stats_range(),
                KeyCode::Left | KeyCode::Char('h') => app.previous_stats_range(),
                _ => {}
            },
            View::Users => {}
        },
    }

    false
}
