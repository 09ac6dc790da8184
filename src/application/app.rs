use chrono::Local;
use ratatui::widgets::{ListState, TableState};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::domain::config::AppConfig;
use crate::domain::export::{ExportRequest, build_all_users_export, build_user_export};
use crate::domain::filter::{FilterCriteria, Selection, filter_entries, project_facets};
use crate::domain::models::*;
use crate::domain::session::SessionContext;
use crate::domain::validation::validate_entry;
use crate::infrastructure::api_client::{ApiClient, ApiError, TimesheetApi};
use crate::infrastructure::config::{
    effective_base_url, effective_export_dir, effective_token, load_config, resolve_session,
    save_config,
};
use crate::infrastructure::download::save_export;
use crate::log;
use crate::ui::theme::THEME_CATALOG;
use crate::utils::parsing::{display_day, format_hours, parse_optional_date};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputMode {
    Normal,
    Filtering,
    EntryForm,
    ConfirmDelete,
    Exporting,
    Configuring,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum View {
    MyTimesheets,
    AllTimesheets,
    Users,
    Statistics,
}

impl View {
    pub const ALL: [View; 4] = [
        View::MyTimesheets,
        View::AllTimesheets,
        View::Users,
        View::Statistics,
    ];

    pub fn title(self) -> &'static str {
        match self {
            View::MyTimesheets => "Mis registros",
            View::AllTimesheets => "Todos los registros",
            View::Users => "Usuarios",
            View::Statistics => "Estadisticas",
        }
    }

    pub fn requires_admin(self) -> bool {
        self != View::MyTimesheets
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FormField {
    Date,
    Project,
    Hours,
    Description,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FormMode {
    Create,
    Edit(i64),
}

pub struct EntryForm {
    pub mode: FormMode,
    pub date: String,
    pub project_search: String,
    pub selected_project: Option<String>,
    pub hours: String,
    pub description: String,
    pub focused: FormField,
    pub filtered_indices: Vec<usize>,
    pub list_state: ListState,
    pub submitting: bool,
    pub error: Option<String>,
}

impl EntryForm {
    pub fn new(default_date: String) -> Self {
        Self {
            mode: FormMode::Create,
            date: default_date,
            project_search: String::new(),
            selected_project: None,
            hours: String::new(),
            description: String::new(),
            focused: FormField::Date,
            filtered_indices: Vec::new(),
            list_state: ListState::default(),
            submitting: false,
            error: None,
        }
    }

    pub fn from_entry(entry: &TimesheetEntry) -> Self {
        Self {
            mode: FormMode::Edit(entry.id),
            date: display_day(&entry.date),
            project_search: entry.project.clone(),
            selected_project: Some(entry.project.clone()),
            hours: format_hours(entry.hours),
            description: entry.description.clone(),
            focused: FormField::Date,
            filtered_indices: Vec::new(),
            list_state: ListState::default(),
            submitting: false,
            error: None,
        }
    }

    pub fn title(&self) -> String {
        match self.mode {
            FormMode::Create => "Nuevo Registro".to_string(),
            FormMode::Edit(id) => format!("Editar Registro #{id}"),
        }
    }

    pub fn project_value(&self) -> &str {
        match &self.selected_project {
            Some(project) => project.as_str(),
            None => self.project_search.trim(),
        }
    }

    pub fn next_field(&mut self) {
        self.focused = match self.focused {
            FormField::Date => FormField::Project,
            FormField::Project => FormField::Hours,
            FormField::Hours => FormField::Description,
            FormField::Description => FormField::Date,
        };
    }

    pub fn prev_field(&mut self) {
        self.focused = match self.focused {
            FormField::Date => FormField::Description,
            FormField::Project => FormField::Date,
            FormField::Hours => FormField::Project,
            FormField::Description => FormField::Hours,
        };
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FilterField {
    User,
    Project,
    DateFrom,
    DateTo,
    Search,
}

/// Text state behind the filter bar. Every edit is turned into a complete
/// `FilterCriteria`; an edit that does not parse leaves the active one alone.
/// User and project are kept as values, so a refetch that reorders the
/// facets does not change what was picked.
pub struct FilterForm {
    pub target: View,
    pub user: Selection,
    pub project: Selection,
    pub date_from: String,
    pub date_to: String,
    pub search: String,
    pub focused: FilterField,
    pub error: Option<String>,
}

impl FilterForm {
    pub fn from_criteria(target: View, criteria: &FilterCriteria) -> Self {
        Self {
            target,
            user: criteria.user.clone(),
            project: criteria.project.clone(),
            date_from: criteria
                .date_from
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            date_to: criteria
                .date_to
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            search: criteria.search_term.clone(),
            focused: if target == View::AllTimesheets {
                FilterField::User
            } else {
                FilterField::Project
            },
            error: None,
        }
    }

    pub fn has_user_field(&self) -> bool {
        self.target == View::AllTimesheets
    }

    pub fn next_field(&mut self) {
        self.focused = match self.focused {
            FilterField::User => FilterField::Project,
            FilterField::Project => FilterField::DateFrom,
            FilterField::DateFrom => FilterField::DateTo,
            FilterField::DateTo => FilterField::Search,
            FilterField::Search if self.has_user_field() => FilterField::User,
            FilterField::Search => FilterField::Project,
        };
    }

    pub fn prev_field(&mut self) {
        self.focused = match self.focused {
            FilterField::User => FilterField::Search,
            FilterField::Project if self.has_user_field() => FilterField::User,
            FilterField::Project => FilterField::Search,
            FilterField::DateFrom => FilterField::Project,
            FilterField::DateTo => FilterField::DateFrom,
            FilterField::Search => FilterField::DateTo,
        };
    }

    pub fn to_criteria(&self) -> Result<FilterCriteria, String> {
        let user = if self.has_user_field() {
            self.user.clone()
        } else {
            Selection::All
        };
        Ok(FilterCriteria {
            user,
            project: self.project.clone(),
            date_from: parse_optional_date(&self.date_from)?,
            date_to: parse_optional_date(&self.date_to)?,
            search_term: self.search.clone(),
        })
    }
}

/// Steps a selector through `All` followed by `options`. A value that is no
/// longer offered restarts from `All`.
fn cycle_selection(current: &Selection, options: &[String], forward: bool) -> Selection {
    let count = options.len() + 1;
    let position = current
        .value()
        .and_then(|value| options.iter().position(|option| option == value))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let next = if forward {
        (position + 1) % count
    } else {
        (position + count - 1) % count
    };
    match next.checked_sub(1).and_then(|idx| options.get(idx)) {
        Some(option) => Selection::Only(option.clone()),
        None => Selection::All,
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ExportField {
    DateFrom,
    DateTo,
}

/// All-users export dialog; its dates are independent of the filter bar.
/// `id` ties a running export to the dialog that started it.
#[derive(Default)]
pub struct ExportDialog {
    pub id: u64,
    pub date_from: String,
    pub date_to: String,
    pub focused: Option<ExportField>,
    pub in_flight: bool,
    pub error: Option<String>,
}

impl ExportDialog {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            focused: Some(ExportField::DateFrom),
            ..Default::default()
        }
    }

    pub fn toggle_field(&mut self) {
        self.focused = match self.focused {
            Some(ExportField::DateFrom) => Some(ExportField::DateTo),
            _ => Some(ExportField::DateFrom),
        };
    }

    pub fn focused_text(&mut self) -> &mut String {
        match self.focused {
            Some(ExportField::DateTo) => &mut self.date_to,
            _ => &mut self.date_from,
        }
    }

    pub fn to_request(&self) -> Result<ExportRequest, String> {
        Ok(build_all_users_export(
            parse_optional_date(&self.date_from)?,
            parse_optional_date(&self.date_to)?,
        ))
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ConfigField {
    Token,
    BaseUrl,
    ExportDir,
    Theme,
}

pub struct ConfigForm {
    pub token: String,
    pub base_url: String,
    pub export_dir: String,
    pub theme: String,
    pub focused: ConfigField,
    pub theme_list_state: ListState,
}

/// One timesheet table: the raw collection from the backend plus the
/// filter applied to it. The visible rows are always recomputed from both.
#[derive(Default)]
pub struct TimesheetListing {
    pub records: Vec<TimesheetEntry>,
    pub projects: Vec<String>,
    pub filter: FilterCriteria,
    pub table_state: TableState,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
}

impl TimesheetListing {
    pub fn visible(&self) -> Vec<&TimesheetEntry> {
        filter_entries(&self.records, &self.filter)
    }

    pub fn replace_records(&mut self, records: Vec<TimesheetEntry>) {
        self.projects = project_facets(&records);
        self.records = records;
        self.loaded = true;
        self.clamp_selection();
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.records.len();
        self.records.retain(|entry| entry.id != id);
        self.projects = project_facets(&self.records);
        self.clamp_selection();
        self.records.len() != before
    }

    pub fn set_filter(&mut self, filter: FilterCriteria) {
        self.filter = filter;
        self.clamp_selection();
    }

    pub fn selected_entry(&self) -> Option<&TimesheetEntry> {
        let idx = self.table_state.selected()?;
        self.visible().get(idx).copied()
    }

    pub fn next(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let next = match self.table_state.selected() {
            Some(idx) if idx + 1 < len => idx + 1,
            _ => 0,
        };
        self.table_state.select(Some(next));
    }

    pub fn previous(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let prev = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(idx) => idx - 1,
        };
        self.table_state.select(Some(prev));
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            self.table_state.select(None);
        } else {
            let idx = self.table_state.selected().unwrap_or(0).min(len - 1);
            self.table_state.select(Some(idx));
        }
    }
}

#[derive(Default)]
pub struct UsersView {
    pub users: Vec<User>,
    pub list_state: ListState,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct StatsView {
    pub range: StatsRange,
    pub data: Option<Statistics>,
    pub loading: bool,
    pub error: Option<String>,
}

pub enum TaskOutcome {
    MyTimesheets(Result<Vec<TimesheetEntry>, ApiError>),
    AllTimesheets(Result<Vec<TimesheetEntry>, ApiError>),
    Users(Result<Vec<User>, ApiError>),
    Projects(Result<Vec<String>, ApiError>),
    Statistics(StatsRange, Result<Statistics, ApiError>),
    Saved(FormMode, Result<TimesheetEntry, ApiError>),
    Deleted(i64, Result<(), ApiError>),
    Exported {
        dialog: Option<u64>,
        result: Result<PathBuf, String>,
    },
}

#[derive(Clone, Copy, Debug)]
enum TaskKind {
    MyTimesheets,
    AllTimesheets,
    Users,
    Projects,
    Statistics(StatsRange),
    Save(FormMode),
    Delete(i64),
    Export { dialog: Option<u64> },
}

impl TaskKind {
    /// Outcome reported when the worker thread died without answering, so
    /// no in-flight flag is left set.
    fn lost(self) -> TaskOutcome {
        let error = ApiError::Transport("tarea interrumpida".to_string());
        match self {
            TaskKind::MyTimesheets => TaskOutcome::MyTimesheets(Err(error)),
            TaskKind::AllTimesheets => TaskOutcome::AllTimesheets(Err(error)),
            TaskKind::Users => TaskOutcome::Users(Err(error)),
            TaskKind::Projects => TaskOutcome::Projects(Err(error)),
            TaskKind::Statistics(range) => TaskOutcome::Statistics(range, Err(error)),
            TaskKind::Save(mode) => TaskOutcome::Saved(mode, Err(error)),
            TaskKind::Delete(id) => TaskOutcome::Deleted(id, Err(error)),
            TaskKind::Export { dialog } => TaskOutcome::Exported {
                dialog,
                result: Err("Exportacion interrumpida".to_string()),
            },
        }
    }
}

struct PendingTask {
    kind: TaskKind,
    rx: Receiver<TaskOutcome>,
}

pub struct App {
    pub session: SessionContext,
    pub config: AppConfig,
    api: Arc<dyn TimesheetApi>,
    pub export_dir: PathBuf,
    pub view: View,
    pub input_mode: InputMode,
    pub status: String,
    pub mine: TimesheetListing,
    pub admin: TimesheetListing,
    pub users: UsersView,
    pub stats: StatsView,
    pub project_options: Vec<String>,
    pub entry_form: Option<EntryForm>,
    pub filter_form: Option<FilterForm>,
    pub export_dialog: Option<ExportDialog>,
    pub exporting: bool,
    pub exporting_all: bool,
    dialog_seq: u64,
    pub config_form: Option<ConfigForm>,
    pub pending_delete: Option<i64>,
    tasks: Vec<PendingTask>,
}

impl App {
    pub fn new() -> Result<Self, String> {
        let config = load_config();
        let session = resolve_session(&config);
        let api = ApiClient::new(&session)?;
        let export_dir = effective_export_dir(&config);
        Ok(Self::with_api(config, session, Arc::new(api), export_dir))
    }

    pub fn with_api(
        config: AppConfig,
        session: SessionContext,
        api: Arc<dyn TimesheetApi>,
        export_dir: PathBuf,
    ) -> Self {
        let mut app = Self {
            session,
            config,
            api,
            export_dir,
            view: View::MyTimesheets,
            input_mode: InputMode::Normal,
            status: "cargando...".to_string(),
            mine: TimesheetListing::default(),
            admin: TimesheetListing::default(),
            users: UsersView::default(),
            stats: StatsView::default(),
            project_options: Vec::new(),
            entry_form: None,
            filter_form: None,
            export_dialog: None,
            exporting: false,
            exporting_all: false,
            dialog_seq: 0,
            config_form: None,
            pending_delete: None,
            tasks: Vec::new(),
        };

        if app.session.is_authenticated() {
            app.load_mine();
            app.load_projects();
        } else {
            app.status = ApiError::Unauthenticated.user_message("");
        }
        app
    }

    fn spawn<F>(&mut self, kind: TaskKind, job: F)
    where
        F: FnOnce(&dyn TimesheetApi) -> TaskOutcome + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let api = Arc::clone(&self.api);
        thread::spawn(move || {
            let _ = tx.send(job(api.as_ref()));
        });
        self.tasks.push(PendingTask { kind, rx });
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn check_background_load(&mut self) {
        let mut outcomes = Vec::new();
        self.tasks.retain(|task| match task.rx.try_recv() {
            Ok(outcome) => {
                outcomes.push(outcome);
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => {
                outcomes.push(task.kind.lost());
                false
            }
        });
        for outcome in outcomes {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::MyTimesheets(result) => {
                self.mine.loading = false;
                match result {
                    Ok(records) => {
                        self.status = format!("actualizado: {} registros", records.len());
                        self.mine.replace_records(records);
                        self.mine.error = None;
                    }
                    Err(error) => {
                        log!("Error loading own timesheets: {}", error);
                        let message = error.user_message("cargar tus registros");
                        self.status = format!("error: {message}");
                        self.mine.error = Some(message);
                    }
                }
            }
            TaskOutcome::AllTimesheets(result) => {
                self.admin.loading = false;
                match result {
                    Ok(records) => {
                        self.status = format!("actualizado: {} registros", records.len());
                        self.admin.replace_records(records);
                        self.admin.error = None;
                    }
                    Err(error) => {
                        log!("Error loading all timesheets: {}", error);
                        let message = error.user_message("cargar los registros");
                        self.status = format!("error: {message}");
                        self.admin.error = Some(message);
                    }
                }
            }
            TaskOutcome::Users(result) => {
                self.users.loading = false;
                match result {
                    Ok(users) => {
                        self.users.users = users;
                        self.users.loaded = true;
                        self.users.error = None;
                        let selected = match self.users.users.len() {
                            0 => None,
                            len => Some(self.users.list_state.selected().unwrap_or(0).min(len - 1)),
                        };
                        self.users.list_state.select(selected);
                    }
                    Err(error) => {
                        log!("Error loading users: {}", error);
                        let message = error.user_message("cargar usuarios");
                        self.status = format!("error: {message}");
                        self.users.error = Some(message);
                    }
                }
            }
            TaskOutcome::Projects(result) => match result {
                Ok(projects) => {
                    self.project_options = projects;
                    self.update_project_filter();
                }
                Err(error) => {
                    log!("Error loading projects: {}", error);
                    self.status = "error: no se pudieron cargar los proyectos".to_string();
                }
            },
            TaskOutcome::Statistics(range, result) => {
                if range != self.stats.range {
                    return;
                }
                self.stats.loading = false;
                match result {
                    Ok(stats) => {
                        self.stats.data = Some(stats);
                        self.stats.error = None;
                        self.status = format!("estadisticas: {}", range.label());
                    }
                    Err(error) => {
                        log!("Error loading statistics: {}", error);
                        let message = error.user_message("cargar las estadisticas");
                        self.status = format!("error: {message}");
                        self.stats.error = Some(message);
                    }
                }
            }
            TaskOutcome::Saved(mode, result) => match result {
                Ok(entry) => {
                    log!("Timesheet {} saved", entry.id);
                    self.close_entry_form();
                    self.status = match mode {
                        FormMode::Create => "registro creado!".to_string(),
                        FormMode::Edit(_) => "registro actualizado!".to_string(),
                    };
                    self.load_mine();
                }
                Err(error) => {
                    log!("Error saving timesheet: {}", error);
                    let message = error.user_message("guardar el registro");
                    self.status = format!("error: {message}");
                    if let Some(form) = &mut self.entry_form {
                        form.submitting = false;
                        form.error = Some(message);
                    }
                }
            },
            TaskOutcome::Deleted(id, result) => match result {
                Ok(()) => {
                    self.mine.remove(id);
                    self.admin.remove(id);
                    self.status = "registro eliminado".to_string();
                }
                Err(error) => {
                    log!("Error deleting timesheet {}: {}", id, error);
                    let message = error.user_message("eliminar el registro");
                    self.status = format!("error: {message}");
                }
            },
            TaskOutcome::Exported { dialog, result } => {
                match dialog {
                    Some(_) => self.exporting_all = false,
                    None => self.exporting = false,
                }
                let owner_open =
                    dialog.is_some() && self.export_dialog.as_ref().map(|d| d.id) == dialog;
                match result {
                    Ok(path) => {
                        self.status = format!("exportado a {}", path.display());
                        if owner_open {
                            self.close_export_dialog();
                        }
                    }
                    Err(message) => {
                        self.status = format!("error: {message}");
                        if let Some(open) = self.export_dialog.as_mut().filter(|_| owner_open) {
                            open.in_flight = false;
                            open.error = Some(message);
                        }
                    }
                }
            }
        }
    }

    // Loading

    fn load_mine(&mut self) {
        self.mine.loading = true;
        self.spawn(TaskKind::MyTimesheets, |api| {
            TaskOutcome::MyTimesheets(api.list_timesheets())
        });
    }

    fn load_projects(&mut self) {
        self.spawn(TaskKind::Projects, |api| {
            TaskOutcome::Projects(api.list_projects())
        });
    }

    fn load_admin(&mut self) {
        self.admin.loading = true;
        self.spawn(TaskKind::AllTimesheets, |api| {
            TaskOutcome::AllTimesheets(api.list_all_timesheets())
        });
        self.load_users();
    }

    fn load_users(&mut self) {
        self.users.loading = true;
        self.spawn(TaskKind::Users, |api| TaskOutcome::Users(api.list_users()));
    }

    fn load_stats(&mut self) {
        let range = self.stats.range;
        self.stats.loading = true;
        self.spawn(TaskKind::Statistics(range), move |api| {
            TaskOutcome::Statistics(range, api.fetch_statistics(range))
        });
    }

    pub fn refresh(&mut self) {
        if !self.session.is_authenticated() {
            self.status = ApiError::Unauthenticated.user_message("");
            return;
        }
        self.status = "actualizando...".to_string();
        match self.view {
            View::MyTimesheets => {
                self.load_mine();
                self.load_projects();
            }
            View::AllTimesheets => self.load_admin(),
            View::Users => self.load_users(),
            View::Statistics => self.load_stats(),
        }
    }

    // Views

    pub fn available_views(&self) -> Vec<View> {
        View::ALL
            .into_iter()
            .filter(|view| !view.requires_admin() || self.session.is_admin())
            .collect()
    }

    pub fn select_view(&mut self, view: View) {
        if view.requires_admin() && !self.session.is_admin() {
            self.status = "solo disponible para administradores".to_string();
            return;
        }
        self.view = view;
        if !self.session.is_authenticated() {
            return;
        }
        match view {
            View::MyTimesheets => {}
            View::AllTimesheets if !self.admin.loaded && !self.admin.loading => self.load_admin(),
            View::Users if !self.users.loaded && !self.users.loading => self.load_users(),
            View::Statistics if self.stats.data.is_none() && !self.stats.loading => {
                self.load_stats()
            }
            _ => {}
        }
    }

    pub fn next_view(&mut self) {
        let views = self.available_views();
        let idx = views.iter().position(|v| *v == self.view).unwrap_or(0);
        let next = views[(idx + 1) % views.len()];
        self.select_view(next);
    }

    pub fn previous_view(&mut self) {
        let views = self.available_views();
        let idx = views.iter().position(|v| *v == self.view).unwrap_or(0);
        let prev = views[(idx + views.len() - 1) % views.len()];
        self.select_view(prev);
    }

    pub fn select_view_index(&mut self, idx: usize) {
        if let Some(view) = View::ALL.get(idx) {
            self.select_view(*view);
        }
    }

    fn current_listing_mut(&mut self) -> Option<&mut TimesheetListing> {
        match self.view {
            View::MyTimesheets => Some(&mut self.mine),
            View::AllTimesheets => Some(&mut self.admin),
            _ => None,
        }
    }

    pub fn next_row(&mut self) {
        if let Some(listing) = self.current_listing_mut() {
            listing.next();
            return;
        }
        if self.view == View::Users && !self.users.users.is_empty() {
            let len = self.users.users.len();
            let next = match self.users.list_state.selected() {
                Some(idx) if idx + 1 < len => idx + 1,
                _ => 0,
            };
            self.users.list_state.select(Some(next));
        }
    }

    pub fn previous_row(&mut self) {
        if let Some(listing) = self.current_listing_mut() {
            listing.previous();
            return;
        }
        if self.view == View::Users && !self.users.users.is_empty() {
            let len = self.users.users.len();
            let prev = match self.users.list_state.selected() {
                Some(0) | None => len - 1,
                Some(idx) => idx - 1,
            };
            self.users.list_state.select(Some(prev));
        }
    }

    pub fn next_stats_range(&mut self) {
        if self.view != View::Statistics {
            return;
        }
        self.stats.range = self.stats.range.next();
        self.load_stats();
    }

    pub fn previous_stats_range(&mut self) {
        if self.view != View::Statistics {
            return;
        }
        self.stats.range = self.stats.range.previous();
        self.load_stats();
    }

    // Filters

    pub fn open_filter(&mut self) {
        let criteria = match self.view {
            View::MyTimesheets => &self.mine.filter,
            View::AllTimesheets => &self.admin.filter,
            _ => return,
        };
        self.filter_form = Some(FilterForm::from_criteria(self.view, criteria));
        self.input_mode = InputMode::Filtering;
    }

    pub fn close_filter(&mut self) {
        self.filter_form = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn reset_filters(&mut self) {
        let form_open = self.filter_form.is_some();
        let Some(listing) = self.current_listing_mut() else {
            return;
        };
        if listing.filter.is_default() && !form_open {
            self.status = "no hay filtros activos".to_string();
            return;
        }
        listing.set_filter(FilterCriteria::default());
        if let Some(form) = &mut self.filter_form {
            *form = FilterForm::from_criteria(form.target, &FilterCriteria::default());
        }
        self.status = "filtros restablecidos".to_string();
    }

    pub fn filter_next_field(&mut self) {
        if let Some(form) = &mut self.filter_form {
            form.next_field();
        }
    }

    pub fn filter_prev_field(&mut self) {
        if let Some(form) = &mut self.filter_form {
            form.prev_field();
        }
    }

    /// Up/Down on the user and project selectors; "all" comes first.
    pub fn filter_cycle(&mut self, forward: bool) {
        let Some(form) = &mut self.filter_form else {
            return;
        };
        match form.focused {
            FilterField::User => {
                let ids: Vec<String> = self
                    .users
                    .users
                    .iter()
                    .map(|user| user.id.to_string())
                    .collect();
                form.user = cycle_selection(&form.user, &ids, forward);
            }
            FilterField::Project => {
                let projects = match form.target {
                    View::AllTimesheets => &self.admin.projects,
                    _ => &self.mine.projects,
                };
                form.project = cycle_selection(&form.project, projects, forward);
            }
            _ => return,
        }
        self.apply_filter_form();
    }

    pub fn filter_input(&mut self, ch: char) {
        if let Some(form) = &mut self.filter_form {
            match form.focused {
                FilterField::DateFrom => form.date_from.push(ch),
                FilterField::DateTo => form.date_to.push(ch),
                FilterField::Search => form.search.push(ch),
                FilterField::User | FilterField::Project => return,
            }
        }
        self.apply_filter_form();
    }

    pub fn filter_backspace(&mut self) {
        if let Some(form) = &mut self.filter_form {
            match form.focused {
                FilterField::DateFrom => {
                    form.date_from.pop();
                }
                FilterField::DateTo => {
                    form.date_to.pop();
                }
                FilterField::Search => {
                    form.search.pop();
                }
                FilterField::User | FilterField::Project => return,
            }
        }
        self.apply_filter_form();
    }

    fn apply_filter_form(&mut self) {
        let Some(form) = &mut self.filter_form else {
            return;
        };
        let listing = match form.target {
            View::AllTimesheets => &mut self.admin,
            _ => &mut self.mine,
        };
        match form.to_criteria() {
            Ok(criteria) => {
                form.error = None;
                listing.set_filter(criteria);
            }
            Err(error) => form.error = Some(error),
        }
    }

    // Entry form

    pub fn open_add_entry(&mut self) {
        if self.view != View::MyTimesheets {
            return;
        }
        let default_date = Local::now().format("%Y-%m-%d").to_string();
        self.entry_form = Some(EntryForm::new(default_date));
        self.input_mode = InputMode::EntryForm;
        self.update_project_filter();
    }

    pub fn open_edit_entry(&mut self) {
        if self.view != View::MyTimesheets {
            return;
        }
        let Some(entry) = self.mine.selected_entry() else {
            self.status = "selecciona un registro para editar".to_string();
            return;
        };
        self.entry_form = Some(EntryForm::from_entry(entry));
        self.input_mode = InputMode::EntryForm;
        self.update_project_filter();
    }

    pub fn close_entry_form(&mut self) {
        self.entry_form = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn form_next_field(&mut self) {
        if let Some(form) = &mut self.entry_form {
            form.next_field();
        }
    }

    pub fn form_prev_field(&mut self) {
        if let Some(form) = &mut self.entry_form {
            form.prev_field();
        }
    }

    pub fn form_input_push(&mut self, ch: char) {
        if let Some(form) = &mut self.entry_form {
            if form.submitting {
                return;
            }
            match form.focused {
                FormField::Date => form.date.push(ch),
                FormField::Project => {
                    form.project_search.push(ch);
                    form.selected_project = None;
                    self.update_project_filter();
                }
                FormField::Hours => form.hours.push(ch),
                FormField::Description => form.description.push(ch),
            }
        }
    }

    pub fn form_input_backspace(&mut self) {
        if let Some(form) = &mut self.entry_form {
            if form.submitting {
                return;
            }
            match form.focused {
                FormField::Date => {
                    form.date.pop();
                }
                FormField::Project => {
                    form.project_search.pop();
                    form.selected_project = None;
                    self.update_project_filter();
                }
                FormField::Hours => {
                    form.hours.pop();
                }
                FormField::Description => {
                    form.description.pop();
                }
            }
        }
    }

    pub fn update_project_filter(&mut self) {
        if let Some(form) = &mut self.entry_form {
            let query = form.project_search.to_lowercase();
            form.filtered_indices = self
                .project_options
                .iter()
                .enumerate()
                .filter(|(_, p)| query.is_empty() || p.to_lowercase().contains(&query))
                .map(|(i, _)| i)
                .take(20)
                .collect();
            if !form.filtered_indices.is_empty() {
                form.list_state.select(Some(0));
            } else {
                form.list_state.select(None);
            }
        }
    }

    pub fn form_nav_up(&mut self) {
        if let Some(form) = &mut self.entry_form {
            if form.focused == FormField::Project && !form.filtered_indices.is_empty() {
                let i = form.list_state.selected().unwrap_or(0);
                if i > 0 {
                    form.list_state.select(Some(i - 1));
                }
            }
        }
    }

    pub fn form_nav_down(&mut self) {
        if let Some(form) = &mut self.entry_form {
            if form.focused == FormField::Project && !form.filtered_indices.is_empty() {
                let i = form.list_state.selected().unwrap_or(0);
                if i + 1 < form.filtered_indices.len() {
                    form.list_state.select(Some(i + 1));
                }
            }
        }
    }

    pub fn form_enter(&mut self) {
        let Some(form) = &mut self.entry_form else {
            return;
        };

        if form.focused == FormField::Project && form.selected_project.is_none() {
            let picked = form
                .list_state
                .selected()
                .and_then(|idx| form.filtered_indices.get(idx))
                .and_then(|&project_idx| self.project_options.get(project_idx));
            if let Some(project) = picked {
                form.selected_project = Some(project.clone());
                form.project_search = project.clone();
                form.filtered_indices.clear();
                form.next_field();
                return;
            }
        }

        if form.focused == FormField::Description {
            self.submit_entry();
        } else {
            form.next_field();
        }
    }

    /// Validates locally, then creates or updates depending on the form
    /// mode. A failed submit keeps the form open with the error.
    pub fn submit_entry(&mut self) {
        let Some(form) = &mut self.entry_form else {
            return;
        };
        if form.submitting {
            return;
        }

        let payload = match validate_entry(
            &form.date,
            form.project_value(),
            &form.hours,
            &form.description,
        ) {
            Ok(payload) => payload,
            Err(error) => {
                form.error = Some(error.to_string());
                self.status = format!("error: {error}");
                return;
            }
        };

        form.submitting = true;
        form.error = None;
        let mode = form.mode;
        self.status = match mode {
            FormMode::Create => "creando registro...".to_string(),
            FormMode::Edit(_) => "actualizando registro...".to_string(),
        };

        self.spawn(TaskKind::Save(mode), move |api| {
            let result = match mode {
                FormMode::Create => api.create_timesheet(&payload),
                FormMode::Edit(id) => api.update_timesheet(id, &payload),
            };
            TaskOutcome::Saved(mode, result)
        });
    }

    // Delete

    pub fn request_delete(&mut self) {
        if self.view != View::MyTimesheets {
            return;
        }
        match self.mine.selected_entry() {
            Some(entry) => {
                self.pending_delete = Some(entry.id);
                self.input_mode = InputMode::ConfirmDelete;
            }
            None => self.status = "selecciona un registro para eliminar".to_string(),
        }
    }

    pub fn pending_delete_entry(&self) -> Option<&TimesheetEntry> {
        let id = self.pending_delete?;
        self.mine.records.iter().find(|entry| entry.id == id)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.input_mode = InputMode::Normal;
        self.status = "eliminacion cancelada".to_string();
    }

    pub fn confirm_delete(&mut self) {
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        self.input_mode = InputMode::Normal;
        self.status = format!("eliminando registro #{id}...");
        self.spawn(TaskKind::Delete(id), move |api| {
            TaskOutcome::Deleted(id, api.delete_timesheet(id))
        });
    }

    // Export

    /// Exports the user pinned in the admin filter. Blocked locally while
    /// the filter shows every user.
    pub fn export_selected_user(&mut self) {
        if self.view != View::AllTimesheets || self.exporting {
            return;
        }
        let request = match build_user_export(&self.admin.filter) {
            Ok(request) => request,
            Err(error) => {
                self.status = format!("error: {error}");
                return;
            }
        };
        self.exporting = true;
        self.start_export(request, None);
    }

    pub fn open_export_dialog(&mut self) {
        if self.view != View::AllTimesheets {
            return;
        }
        self.dialog_seq += 1;
        self.export_dialog = Some(ExportDialog::new(self.dialog_seq));
        self.input_mode = InputMode::Exporting;
    }

    pub fn close_export_dialog(&mut self) {
        self.export_dialog = None;
        if self.input_mode == InputMode::Exporting {
            self.input_mode = InputMode::Normal;
        }
    }

    pub fn export_toggle_field(&mut self) {
        if let Some(dialog) = &mut self.export_dialog {
            dialog.toggle_field();
        }
    }

    pub fn export_input(&mut self, ch: char) {
        if let Some(dialog) = &mut self.export_dialog {
            if !dialog.in_flight {
                dialog.focused_text().push(ch);
            }
        }
    }

    pub fn export_backspace(&mut self) {
        if let Some(dialog) = &mut self.export_dialog {
            if !dialog.in_flight {
                dialog.focused_text().pop();
            }
        }
    }

    pub fn submit_export_dialog(&mut self) {
        let Some(dialog) = &mut self.export_dialog else {
            return;
        };
        if dialog.in_flight {
            return;
        }
        if self.exporting_all {
            dialog.error = Some("Ya hay una exportacion en curso".to_string());
            return;
        }
        match dialog.to_request() {
            Ok(request) => {
                dialog.in_flight = true;
                dialog.error = None;
                let id = dialog.id;
                self.exporting_all = true;
                self.start_export(request, Some(id));
            }
            Err(error) => dialog.error = Some(error),
        }
    }

    fn start_export(&mut self, request: ExportRequest, dialog: Option<u64>) {
        self.status = format!("exportando {}...", request.describe());
        let dir = self.export_dir.clone();
        self.spawn(TaskKind::Export { dialog }, move |api| {
            let result = api
                .export_timesheets(&request)
                .map_err(|error| error.user_message("exportar los registros"))
                .and_then(|file| {
                    save_export(&dir, &file)
                        .map_err(|error| format!("No se pudo guardar el archivo: {error}"))
                });
            TaskOutcome::Exported { dialog, result }
        });
    }

    // Config Modal Methods

    pub fn open_config(&mut self) {
        let theme = self.config.theme.clone();
        let mut theme_list_state = ListState::default();
        theme_list_state.select(THEME_CATALOG.iter().position(|t| *t == theme));
        self.config_form = Some(ConfigForm {
            token: effective_token(&self.config),
            base_url: effective_base_url(&self.config),
            export_dir: self.export_dir.display().to_string(),
            theme,
            focused: ConfigField::Token,
            theme_list_state,
        });
        self.input_mode = InputMode::Configuring;
        self.status = "Configurando...".to_string();
    }

    pub fn close_config(&mut self) {
        self.config_form = None;
        self.input_mode = InputMode::Normal;
        self.status = "Cancelado".to_string();
    }

    pub fn save_config_form(&mut self) {
        let Some(form) = &self.config_form else {
            return;
        };
        let mut new_config = self.config.clone();
        new_config.api_token = form.token.trim().to_string();
        new_config.base_url = form.base_url.trim().to_string();
        let export_dir = form.export_dir.trim();
        new_config.export_dir = if export_dir.is_empty() || export_dir == "." {
            None
        } else {
            Some(export_dir.to_string())
        };
        new_config.theme = form.theme.trim().to_string();

        if let Err(e) = save_config(&new_config) {
            self.status = format!("Error guardando: {}", e);
            return;
        }

        let session = resolve_session(&new_config);
        match ApiClient::new(&session) {
            Ok(client) => self.api = Arc::new(client),
            Err(e) => {
                self.status = format!("Error cliente: {}", e);
                return;
            }
        }
        self.export_dir = effective_export_dir(&new_config);
        self.session = session;
        self.config = new_config;
        self.config_form = None;
        self.input_mode = InputMode::Normal;
        if !self.available_views().contains(&self.view) {
            self.view = View::MyTimesheets;
        }
        self.refresh();
        self.status = "Configuracion guardada!".to_string();
    }

    pub fn config_next_field(&mut self) {
        if let Some(form) = &mut self.config_form {
            form.focused = match form.focused {
                ConfigField::Token => ConfigField::BaseUrl,
                ConfigField::BaseUrl => ConfigField::ExportDir,
                ConfigField::ExportDir => ConfigField::Theme,
                ConfigField::Theme => ConfigField::Token,
            };
        }
    }

    pub fn config_prev_field(&mut self) {
        if let Some(form) = &mut self.config_form {
            form.focused = match form.focused {
                ConfigField::Token => ConfigField::Theme,
                ConfigField::BaseUrl => ConfigField::Token,
                ConfigField::ExportDir => ConfigField::BaseUrl,
                ConfigField::Theme => ConfigField::ExportDir,
            };
        }
    }

    pub fn config_theme_next(&mut self) {
        self.config_theme_step(true);
    }

    pub fn config_theme_previous(&mut self) {
        self.config_theme_step(false);
    }

    fn config_theme_step(&mut self, forward: bool) {
        if let Some(form) = &mut self.config_form {
            if form.focused != ConfigField::Theme {
                return;
            }
            let len = THEME_CATALOG.len();
            let current = THEME_CATALOG
                .iter()
                .position(|t| *t == form.theme)
                .unwrap_or(0);
            let next = if forward {
                (current + 1) % len
            } else {
                (current + len - 1) % len
            };
            form.theme = THEME_CATALOG[next].to_string();
            form.theme_list_state.select(Some(next));
        }
    }

    pub fn config_input(&mut self, ch: char) {
        if let Some(form) = &mut self.config_form {
            match form.focused {
                ConfigField::Token => form.token.push(ch),
                ConfigField::BaseUrl => form.base_url.push(ch),
                ConfigField::ExportDir => form.export_dir.push(ch),
                ConfigField::Theme => form.theme.push(ch),
            }
        }
    }

    pub fn config_backspace(&mut self) {
        if let Some(form) = &mut self.config_form {
            match form.focused {
                ConfigField::Token => {
                    form.token.pop();
                }
                ConfigField::BaseUrl => {
                    form.base_url.pop();
                }
                ConfigField::ExportDir => {
                    form.export_dir.pop();
                }
                ConfigField::Theme => {
                    form.theme.pop();
                }
            }
        }
    }

    pub fn config_clear_field(&mut self) {
        if let Some(form) = &mut self.config_form {
            match form.focused {
                ConfigField::Token => form.token.clear(),
                ConfigField::BaseUrl => form.base_url.clear(),
                ConfigField::ExportDir => form.export_dir.clear(),
                ConfigField::Theme => form.theme.clear(),
            }
        }
    }

    pub fn config_reset_defaults(&mut self) {
        if let Some(form) = &mut self.config_form {
            let defaults = AppConfig::default();
            form.base_url = defaults.base_url;
            form.export_dir = ".".to_string();
            form.theme = defaults.theme;
            form.theme_list_state
                .select(THEME_CATALOG.iter().position(|t| *t == form.theme));
            self.status = "Configuracion restablecida (Enter para guardar)".to_string();
        }
    }
}

#[cfg(test)]
impl App {
    /// Blocks until every outstanding task, including follow-ups spawned
    /// while applying outcomes, has been applied.
    pub fn wait_for_tasks(&mut self) {
        while !self.tasks.is_empty() {
            let task = self.tasks.remove(0);
            let outcome = task.rx.recv().unwrap_or_else(|_| task.kind.lost());
            self.apply_outcome(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::export::ExportMode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        timesheets: Mutex<Vec<TimesheetEntry>>,
        all_timesheets: Vec<TimesheetEntry>,
        users: Vec<User>,
        forbid_admin: bool,
        fail_export: bool,
        fail_delete: bool,
        calls: Mutex<Vec<String>>,
        exports: Mutex<Vec<ExportRequest>>,
    }

    impl FakeApi {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        }

        fn admin_guard(&self) -> Result<(), ApiError> {
            if self.forbid_admin {
                Err(ApiError::Forbidden)
            } else {
                Ok(())
            }
        }
    }

    impl TimesheetApi for FakeApi {
        fn list_timesheets(&self) -> Result<Vec<TimesheetEntry>, ApiError> {
            self.record("GET /timesheet/".to_string());
            Ok(self.timesheets.lock().unwrap().clone())
        }

        fn create_timesheet(&self, payload: &TimesheetPayload) -> Result<TimesheetEntry, ApiError> {
            self.record("POST /timesheet/".to_string());
            let mut records = self.timesheets.lock().unwrap();
            let entry = TimesheetEntry {
                id: records.iter().map(|e| e.id).max().unwrap_or(0) + 1,
                user_id: 5,
                date: payload.date.clone(),
                project: payload.project.clone(),
                hours: payload.hours,
                description: payload.description.clone(),
                created_at: None,
            };
            records.push(entry.clone());
            Ok(entry)
        }

        fn update_timesheet(
            &self,
            id: i64,
            payload: &TimesheetPayload,
        ) -> Result<TimesheetEntry, ApiError> {
            self.record(format!("PUT /timesheet/{id}"));
            let mut records = self.timesheets.lock().unwrap();
            let entry = records
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(ApiError::Server {
                    status: 404,
                    message: "Timesheet not found or unauthorized".to_string(),
                })?;
            entry.hours = payload.hours;
            entry.description = payload.description.clone();
            Ok(entry.clone())
        }

        fn delete_timesheet(&self, id: i64) -> Result<(), ApiError> {
            self.record(format!("DELETE /timesheet/{id}"));
            if self.fail_delete {
                return Err(ApiError::Server {
                    status: 404,
                    message: "Timesheet not found or unauthorized".to_string(),
                });
            }
            Ok(())
        }

        fn list_projects(&self) -> Result<Vec<String>, ApiError> {
            self.record("GET /timesheet/projects".to_string());
            Ok(vec!["Firma A".to_string(), "Internal".to_string()])
        }

        fn list_users(&self) -> Result<Vec<User>, ApiError> {
            self.record("GET /admin/users".to_string());
            self.admin_guard()?;
            Ok(self.users.clone())
        }

        fn list_all_timesheets(&self) -> Result<Vec<TimesheetEntry>, ApiError> {
            self.record("GET /admin/timesheets".to_string());
            self.admin_guard()?;
            Ok(self.all_timesheets.clone())
        }

        fn fetch_statistics(&self, range: StatsRange) -> Result<Statistics, ApiError> {
            self.record(format!("GET /admin/statistics?range={}", range.as_str()));
            self.admin_guard()?;
            Ok(Statistics::default())
        }

        fn export_timesheets(&self, request: &ExportRequest) -> Result<ExportFile, ApiError> {
            let query: Vec<String> = request
                .query_pairs()
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            self.record(format!("GET /admin/export/timesheet?{}", query.join("&")));
            self.exports.lock().unwrap().push(request.clone());
            if self.fail_export {
                return Err(ApiError::Status(500));
            }
            Ok(ExportFile {
                filename: "export.xlsx".to_string(),
                bytes: b"PK".to_vec(),
            })
        }
    }

    fn entry(id: i64, user_id: i64, project: &str, date: &str) -> TimesheetEntry {
        TimesheetEntry {
            id,
            user_id,
            date: date.to_string(),
            project: project.to_string(),
            hours: 4.0,
            description: format!("entry {id}"),
            created_at: None,
        }
    }

    fn fake() -> FakeApi {
        FakeApi {
            timesheets: Mutex::new(vec![
                entry(1, 5, "Firma A", "2024-01-10"),
                entry(2, 5, "Internal", "2024-01-12"),
            ]),
            all_timesheets: vec![
                entry(1, 5, "Firma A", "2024-01-10"),
                entry(2, 5, "Internal", "2024-01-12"),
                entry(3, 6, "Firma A", "2024-01-12"),
            ],
            users: vec![
                User {
                    id: 5,
                    username: "ana".to_string(),
                    role: Role::Employee,
                },
                User {
                    id: 6,
                    username: "luis".to_string(),
                    role: Role::Admin,
                },
            ],
            ..Default::default()
        }
    }

    fn app_with(api: Arc<FakeApi>, role: Role, dir: &std::path::Path) -> App {
        let session = SessionContext::new("http://backend.test", "token", role);
        let mut app = App::with_api(AppConfig::default(), session, api, dir.to_path_buf());
        app.wait_for_tasks();
        app
    }

    #[test]
    fn startup_loads_own_entries_and_projects() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let app = app_with(api.clone(), Role::Employee, dir.path());
        assert_eq!(app.mine.records.len(), 2);
        assert_eq!(app.mine.projects, vec!["Firma A", "Internal"]);
        assert_eq!(app.project_options.len(), 2);
        assert!(!app.mine.loading);
        assert_eq!(api.count("GET /admin"), 0);
    }

    #[test]
    fn missing_token_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let session = SessionContext::new("http://backend.test", "", Role::Admin);
        let app = App::with_api(AppConfig::default(), session, api.clone(), dir.path().to_path_buf());
        assert!(!app.has_pending_tasks());
        assert!(app.status.contains("No hay token"));
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn declining_delete_leaves_records_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Employee, dir.path());

        app.next_row();
        app.request_delete();
        assert_eq!(app.input_mode, InputMode::ConfirmDelete);
        assert!(app.pending_delete.is_some());

        app.cancel_delete();
        app.wait_for_tasks();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.mine.records.len(), 2);
        assert_eq!(api.count("DELETE"), 0);
    }

    #[test]
    fn confirmed_delete_removes_exactly_the_target() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Employee, dir.path());

        app.next_row();
        let target = app.mine.selected_entry().unwrap().id;
        app.request_delete();
        app.confirm_delete();
        app.wait_for_tasks();

        assert_eq!(api.count("DELETE"), 1);
        assert_eq!(api.count(&format!("DELETE /timesheet/{target}")), 1);
        assert_eq!(app.mine.records.len(), 1);
        assert!(app.mine.records.iter().all(|e| e.id != target));
        assert!(app.pending_delete.is_none());
    }

    #[test]
    fn edit_prefills_form_and_validates_before_update() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Employee, dir.path());

        app.open_edit_entry();
        let form = app.entry_form.as_mut().unwrap();
        assert_eq!(form.mode, FormMode::Edit(1));
        assert_eq!(form.date, "2024-01-10");
        assert_eq!(form.project_value(), "Firma A");
        assert_eq!(form.hours, "4");

        form.hours = "9".to_string();
        app.submit_entry();
        assert!(!app.has_pending_tasks());
        let form = app.entry_form.as_ref().unwrap();
        assert!(form.error.as_deref().unwrap().contains("entre"));
        assert!(!form.submitting);
        assert_eq!(api.count("PUT"), 0);

        app.entry_form.as_mut().unwrap().hours = "8".to_string();
        let gets_before = api.count("GET /timesheet/");
        app.submit_entry();
        app.wait_for_tasks();

        assert_eq!(api.count("PUT /timesheet/1"), 1);
        assert_eq!(api.count("POST"), 0);
        assert!(app.entry_form.is_none());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(api.count("GET /timesheet/") > gets_before);
        assert_eq!(app.mine.records[0].hours, 8.0);
    }

    #[test]
    fn create_goes_through_the_project_picker() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Employee, dir.path());

        app.open_add_entry();
        app.form_next_field();
        for ch in "inter".chars() {
            app.form_input_push(ch);
        }
        app.form_enter();
        assert_eq!(app.entry_form.as_ref().unwrap().project_value(), "Internal");
        assert_eq!(app.entry_form.as_ref().unwrap().focused, FormField::Hours);

        app.form_input_push('2');
        app.form_next_field();
        for ch in "planning".chars() {
            app.form_input_push(ch);
        }
        app.form_enter();
        app.wait_for_tasks();

        assert_eq!(api.count("POST /timesheet/"), 1);
        assert_eq!(app.mine.records.len(), 3);
        assert_eq!(app.status, "actualizado: 3 registros");
    }

    #[test]
    fn user_export_is_blocked_without_a_selected_user() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Admin, dir.path());
        app.select_view(View::AllTimesheets);
        app.wait_for_tasks();

        app.export_selected_user();
        assert!(!app.has_pending_tasks());
        assert!(!app.exporting);
        assert!(app.status.contains("Selecciona un usuario"));
        assert_eq!(api.count("GET /admin/export"), 0);
    }

    #[test]
    fn user_export_sends_one_request_for_the_selected_user() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Admin, dir.path());
        app.select_view(View::AllTimesheets);
        app.wait_for_tasks();

        app.admin.set_filter(FilterCriteria {
            user: Selection::from("5"),
            ..Default::default()
        });
        app.export_selected_user();
        app.wait_for_tasks();

        let exports = api.exports.lock().unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].mode, ExportMode::SingleUser(5));
        drop(exports);
        assert_eq!(api.count("GET /admin/export/timesheet?user_id=5"), 1);
        assert_eq!(api.count("GET /admin/export/timesheet?export_all"), 0);
        assert!(!app.exporting);
        assert!(dir.path().join("export.xlsx").exists());
    }

    #[test]
    fn failed_all_users_export_keeps_dialog_open() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi {
            fail_export: true,
            ..fake()
        });
        let mut app = app_with(api.clone(), Role::Admin, dir.path());
        app.select_view(View::AllTimesheets);
        app.wait_for_tasks();

        app.open_export_dialog();
        for ch in "2024-01-01".chars() {
            app.export_input(ch);
        }
        app.submit_export_dialog();
        app.wait_for_tasks();

        let dialog = app.export_dialog.as_ref().expect("dialog stays open");
        assert!(!dialog.in_flight);
        assert_eq!(dialog.error.as_deref(), Some("No se pudo exportar los registros"));
        assert_eq!(app.input_mode, InputMode::Exporting);
        assert_eq!(
            api.count("GET /admin/export/timesheet?export_all=true&date_from=2024-01-01"),
            1
        );
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn all_users_export_ignores_the_filter_dates() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Admin, dir.path());
        app.select_view(View::AllTimesheets);
        app.wait_for_tasks();
        app.admin.set_filter(FilterCriteria {
            date_from: parse_optional_date("2024-01-11").unwrap(),
            ..Default::default()
        });

        app.open_export_dialog();
        app.export_toggle_field();
        for ch in "2024-02-01".chars() {
            app.export_input(ch);
        }
        app.submit_export_dialog();
        app.wait_for_tasks();

        assert!(app.export_dialog.is_none());
        assert_eq!(
            api.count("GET /admin/export/timesheet?export_all=true&date_to=2024-02-01"),
            1
        );
    }

    #[test]
    fn forbidden_admin_data_shows_permission_message() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi {
            forbid_admin: true,
            ..fake()
        });
        let mut app = app_with(api, Role::Admin, dir.path());
        app.select_view(View::AllTimesheets);
        app.wait_for_tasks();

        assert!(!app.admin.loading);
        assert_eq!(
            app.admin.error.as_deref(),
            Some("No tienes permiso para acceder a este recurso")
        );
        assert_eq!(
            app.users.error.as_deref(),
            Some("No tienes permiso para acceder a este recurso")
        );
    }

    #[test]
    fn employees_cannot_open_admin_views() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Employee, dir.path());
        app.select_view(View::Users);
        assert_eq!(app.view, View::MyTimesheets);
        assert_eq!(app.available_views(), vec![View::MyTimesheets]);
        app.next_view();
        assert_eq!(app.view, View::MyTimesheets);
        assert_eq!(api.count("GET /admin"), 0);
    }

    #[test]
    fn filter_form_applies_complete_criteria_only() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api, Role::Admin, dir.path());
        app.select_view(View::AllTimesheets);
        app.wait_for_tasks();

        app.open_filter();
        app.filter_cycle(true);
        assert_eq!(app.admin.filter.user, Selection::Only("5".to_string()));
        assert_eq!(app.admin.visible().len(), 2);

        app.filter_next_field();
        app.filter_next_field();
        for ch in "2024-01-".chars() {
            app.filter_input(ch);
        }
        assert!(app.filter_form.as_ref().unwrap().error.is_some());
        assert_eq!(app.admin.filter.date_from, None);

        app.filter_input('1');
        app.filter_input('1');
        assert!(app.filter_form.as_ref().unwrap().error.is_none());
        let visible: Vec<i64> = app.admin.visible().iter().map(|e| e.id).collect();
        assert_eq!(visible, vec![2]);

        app.reset_filters();
        assert!(app.admin.filter.is_default());
        assert_eq!(app.admin.visible().len(), 3);
    }

    #[test]
    fn picked_project_survives_a_refetch_that_reorders_facets() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Employee, dir.path());

        app.open_filter();
        app.filter_cycle(true);
        app.filter_cycle(true);
        assert_eq!(app.mine.filter.project, Selection::Only("Internal".to_string()));

        api.timesheets
            .lock()
            .unwrap()
            .insert(0, entry(9, 5, "Consultoria", "2024-01-15"));
        app.refresh();
        app.wait_for_tasks();
        assert_eq!(app.mine.projects, vec!["Consultoria", "Firma A", "Internal"]);

        app.filter_next_field();
        app.filter_next_field();
        app.filter_next_field();
        for ch in "entry".chars() {
            app.filter_input(ch);
        }
        assert_eq!(app.mine.filter.project, Selection::Only("Internal".to_string()));
        let visible: Vec<i64> = app.mine.visible().iter().map(|e| e.id).collect();
        assert_eq!(visible, vec![2]);

        app.filter_prev_field();
        app.filter_prev_field();
        app.filter_prev_field();
        app.filter_cycle(true);
        assert_eq!(app.mine.filter.project, Selection::All);
    }

    #[test]
    fn reopened_export_dialog_is_not_touched_by_an_earlier_export() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Admin, dir.path());
        app.select_view(View::AllTimesheets);
        app.wait_for_tasks();

        app.open_export_dialog();
        app.submit_export_dialog();
        app.close_export_dialog();
        app.open_export_dialog();
        app.submit_export_dialog();
        assert!(app.exporting_all);
        let dialog = app.export_dialog.as_ref().unwrap();
        assert!(!dialog.in_flight);
        assert!(dialog.error.is_some());

        app.wait_for_tasks();
        assert_eq!(api.exports.lock().unwrap().len(), 1);
        assert!(!app.exporting_all);
        assert_eq!(app.input_mode, InputMode::Exporting);
        assert!(app.export_dialog.is_some());

        app.submit_export_dialog();
        app.wait_for_tasks();
        assert_eq!(api.exports.lock().unwrap().len(), 2);
        assert!(app.export_dialog.is_none());
    }

    #[test]
    fn failed_delete_only_reports_through_the_status_line() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi {
            fail_delete: true,
            ..fake()
        });
        let mut app = app_with(api.clone(), Role::Employee, dir.path());

        app.next_row();
        app.request_delete();
        app.confirm_delete();
        app.wait_for_tasks();

        assert_eq!(api.count("DELETE /timesheet/"), 1);
        assert_eq!(app.mine.records.len(), 2);
        assert!(app.mine.error.is_none());
        assert!(app.status.starts_with("error: "));
    }

    #[test]
    fn stats_range_change_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(fake());
        let mut app = app_with(api.clone(), Role::Admin, dir.path());
        app.select_view(View::Statistics);
        app.wait_for_tasks();
        app.next_stats_range();
        app.wait_for_tasks();

        assert_eq!(api.count("GET /admin/statistics?range=week"), 1);
        assert_eq!(api.count("GET /admin/statistics?range=month"), 1);
        assert!(!app.stats.loading);
        assert!(app.stats.data.is_some());
    }
}
