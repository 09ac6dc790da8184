use std::path::PathBuf;

use serde::Serialize;

use crate::domain::export::{build_all_users_export, build_user_export, entries_to_csv};
use crate::domain::filter::{FilterCriteria, Selection, filter_entries, total_hours, user_label};
use crate::domain::models::{StatsRange, TimesheetEntry};
use crate::domain::validation::validate_entry;
use crate::infrastructure::api_client::{ApiClient, ApiError, TimesheetApi};
use crate::infrastructure::config::{effective_export_dir, load_config, resolve_session};
use crate::infrastructure::download::save_export;
use crate::utils::parsing::parse_optional_date;

const API_HELP: &str = "  api timesheets [--project <NOMBRE>] [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>] [--search <TEXTO>] [--pretty]\n  api projects [--pretty]\n  api create --date <YYYY-MM-DD> --project <NOMBRE> --hours <HORAS> --description <TEXTO> [--pretty]\n  api update --id <ID> --date <YYYY-MM-DD> --project <NOMBRE> --hours <HORAS> --description <TEXTO> [--pretty]\n  api delete --id <ID> --yes\n  api users [--pretty]\n  api all-timesheets [--user <ID|all>] [--project <NOMBRE>] [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>] [--search <TEXTO>] [--csv] [--pretty]\n  api stats [--range <week|month|year>] [--pretty]\n  api export (--user <ID> | --all) [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>] [--out <DIR>]";

const TIMESHEETS_HELP: &str = "Uso:\n  api timesheets [--project <NOMBRE>] [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>] [--search <TEXTO>] [--pretty]";

const PROJECTS_HELP: &str = "Uso:\n  api projects [--pretty]";

const CREATE_HELP: &str = "Uso:\n  api create --date <YYYY-MM-DD> --project <NOMBRE> --hours <HORAS> --description <TEXTO> [--pretty]";

const UPDATE_HELP: &str = "Uso:\n  api update --id <ID> --date <YYYY-MM-DD> --project <NOMBRE> --hours <HORAS> --description <TEXTO> [--pretty]";

const DELETE_HELP: &str = "Uso:\n  api delete --id <ID> --yes";

const USERS_HELP: &str = "Uso:\n  api users [--pretty]";

const ALL_TIMESHEETS_HELP: &str = "Uso:\n  api all-timesheets [--user <ID|all>] [--project <NOMBRE>] [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>] [--search <TEXTO>] [--csv] [--pretty]";

const STATS_HELP: &str = "Uso:\n  api stats [--range <week|month|year>] [--pretty]";

const EXPORT_HELP: &str = "Uso:\n  api export (--user <ID> | --all) [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>] [--out <DIR>]";

#[derive(Serialize)]
struct TimesheetsOutput<'a> {
    filter: &'a FilterCriteria,
    count: usize,
    total_hours: f64,
    timesheets: Vec<&'a TimesheetEntry>,
}

#[derive(Serialize)]
struct SavedOutput {
    ok: bool,
    timesheet: TimesheetEntry,
}

#[derive(Serialize)]
struct DeletedOutput {
    ok: bool,
    id: i64,
}

#[derive(Serialize)]
struct ExportOutput {
    ok: bool,
    request: String,
    path: String,
}

pub fn run_api(args: &[String]) -> Result<(), String> {
    if args.is_empty() || is_help(args[0].as_str()) {
        println!("Subcomandos:\n{API_HELP}");
        return Ok(());
    }

    let rest = &args[1..];
    match args[0].as_str() {
        "timesheets" => cmd_timesheets(rest),
        "projects" => cmd_projects(rest),
        "create" => cmd_save(rest, false),
        "update" => cmd_save(rest, true),
        "delete" => cmd_delete(rest),
        "users" => cmd_users(rest),
        "all-timesheets" => cmd_all_timesheets(rest),
        "stats" => cmd_stats(rest),
        "export" => cmd_export(rest),
        other => Err(format!("Comando API desconocido: {other}\n\n{API_HELP}")),
    }
}

pub fn api_help() -> &'static str {
    API_HELP
}

/// Flags shared by every subcommand. Each subcommand rejects the ones it
/// does not take.
#[derive(Default)]
struct Flags {
    id: Option<i64>,
    user: Option<String>,
    all: bool,
    project: Option<String>,
    date: Option<String>,
    hours: Option<String>,
    description: Option<String>,
    from: Option<String>,
    to: Option<String>,
    search: Option<String>,
    range: Option<String>,
    out: Option<String>,
    yes: bool,
    csv: bool,
    pretty: bool,
}

fn parse_flags(args: &[String], allowed: &[&str], help_text: &str) -> Result<Flags, String> {
    let mut flags = Flags::default();

    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        if !allowed.contains(&flag) {
            return Err(format!("Flag desconocida: {flag}\n\n{help_text}"));
        }
        match flag {
            "--all" => flags.all = true,
            "--yes" => flags.yes = true,
            "--csv" => flags.csv = true,
            "--pretty" => flags.pretty = true,
            _ => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("Falta valor para {flag}"))?
                    .clone();
                match flag {
                    "--id" => {
                        let parsed = value
                            .parse::<i64>()
                            .map_err(|_| format!("id invalido: {value}"))?;
                        flags.id = Some(parsed);
                    }
                    "--user" => flags.user = Some(value),
                    "--project" => flags.project = Some(value),
                    "--date" => flags.date = Some(value),
                    "--hours" => flags.hours = Some(value),
                    "--description" => flags.description = Some(value),
                    "--from" => flags.from = Some(value),
                    "--to" => flags.to = Some(value),
                    "--search" => flags.search = Some(value),
                    "--range" => flags.range = Some(value),
                    "--out" => flags.out = Some(value),
                    _ => return Err(format!("Flag desconocida: {flag}\n\n{help_text}")),
                }
            }
        }
        i += 1;
    }

    Ok(flags)
}

fn criteria_from_flags(flags: &Flags) -> Result<FilterCriteria, String> {
    Ok(FilterCriteria {
        user: flags.user.as_deref().map(Selection::from).unwrap_or_default(),
        project: flags
            .project
            .as_deref()
            .map(Selection::from)
            .unwrap_or_default(),
        date_from: parse_optional_date(flags.from.as_deref().unwrap_or(""))?,
        date_to: parse_optional_date(flags.to.as_deref().unwrap_or(""))?,
        search_term: flags.search.clone().unwrap_or_default(),
    })
}

fn cmd_timesheets(args: &[String]) -> Result<(), String> {
    if contains_help(args) {
        println!("{TIMESHEETS_HELP}");
        return Ok(());
    }

    let flags = parse_flags(
        args,
        &["--project", "--from", "--to", "--search", "--pretty"],
        TIMESHEETS_HELP,
    )?;
    let criteria = criteria_from_flags(&flags)?;
    let client = build_client()?;
    let records = client
        .list_timesheets()
        .map_err(|error| error.user_message("cargar tus registros"))?;
    print_timesheets(&records, &criteria, flags.pretty)
}

fn cmd_projects(args: &[String]) -> Result<(), String> {
    if contains_help(args) {
        println!("{PROJECTS_HELP}");
        return Ok(());
    }

    let flags = parse_flags(args, &["--pretty"], PROJECTS_HELP)?;
    let client = build_client()?;
    let projects = client
        .list_projects()
        .map_err(|error| error.user_message("cargar los proyectos"))?;
    print_json(&projects, flags.pretty)
}

fn cmd_save(args: &[String], update: bool) -> Result<(), String> {
    let help_text = if update { UPDATE_HELP } else { CREATE_HELP };
    if contains_help(args) {
        println!("{help_text}");
        return Ok(());
    }

    let mut allowed = vec!["--date", "--project", "--hours", "--description", "--pretty"];
    if update {
        allowed.push("--id");
    }
    let flags = parse_flags(args, &allowed, help_text)?;

    let date = flags.date.as_deref().ok_or("Falta --date")?;
    let project = flags.project.as_deref().ok_or("Falta --project")?;
    let hours = flags.hours.as_deref().ok_or("Falta --hours")?;
    let description = flags.description.as_deref().ok_or("Falta --description")?;
    let payload =
        validate_entry(date, project, hours, description).map_err(|error| error.to_string())?;

    let client = build_client()?;
    let timesheet = if update {
        let id = flags.id.ok_or("Falta --id")?;
        client.update_timesheet(id, &payload)
    } else {
        client.create_timesheet(&payload)
    }
    .map_err(|error| error.user_message("guardar el registro"))?;

    print_json(&SavedOutput { ok: true, timesheet }, flags.pretty)
}

fn cmd_delete(args: &[String]) -> Result<(), String> {
    if contains_help(args) {
        println!("{DELETE_HELP}");
        return Ok(());
    }

    let flags = parse_flags(args, &["--id", "--yes"], DELETE_HELP)?;
    let id = flags.id.ok_or("Falta --id")?;
    if !flags.yes {
        return Err(format!(
            "Eliminar el registro #{id} requiere confirmacion: agrega --yes"
        ));
    }

    let client = build_client()?;
    client
        .delete_timesheet(id)
        .map_err(|error| error.user_message("eliminar el registro"))?;
    print_json(&DeletedOutput { ok: true, id }, false)
}

fn cmd_users(args: &[String]) -> Result<(), String> {
    if contains_help(args) {
        println!("{USERS_HELP}");
        return Ok(());
    }

    let flags = parse_flags(args, &["--pretty"], USERS_HELP)?;
    let client = build_client()?;
    let users = client
        .list_users()
        .map_err(|error| error.user_message("cargar usuarios"))?;
    print_json(&users, flags.pretty)
}

fn cmd_all_timesheets(args: &[String]) -> Result<(), String> {
    if contains_help(args) {
        println!("{ALL_TIMESHEETS_HELP}");
        return Ok(());
    }

    let flags = parse_flags(
        args,
        &[
            "--user", "--project", "--from", "--to", "--search", "--csv", "--pretty",
        ],
        ALL_TIMESHEETS_HELP,
    )?;
    let criteria = criteria_from_flags(&flags)?;
    let client = build_client()?;
    let records = client
        .list_all_timesheets()
        .map_err(|error| error.user_message("cargar los registros"))?;

    if flags.csv {
        let users = client
            .list_users()
            .map_err(|error| error.user_message("cargar usuarios"))?;
        let visible = filter_entries(&records, &criteria);
        print!("{}", entries_to_csv(&visible, &users));
        if let Some(user_id) = criteria.user_id() {
            eprintln!("{} registros de {}", visible.len(), user_label(&users, user_id));
        }
        return Ok(());
    }

    print_timesheets(&records, &criteria, flags.pretty)
}

fn parse_range(raw: Option<&str>) -> Result<StatsRange, String> {
    let Some(raw) = raw else {
        return Ok(StatsRange::default());
    };
    StatsRange::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = StatsRange::ALL.iter().map(|range| range.as_str()).collect();
        format!("Rango invalido: {raw} (use {})", known.join("|"))
    })
}

fn cmd_stats(args: &[String]) -> Result<(), String> {
    if contains_help(args) {
        println!("{STATS_HELP}");
        return Ok(());
    }

    let flags = parse_flags(args, &["--range", "--pretty"], STATS_HELP)?;
    let range = parse_range(flags.range.as_deref())?;

    let client = build_client()?;
    let stats = client
        .fetch_statistics(range)
        .map_err(|error| error.user_message("cargar las estadisticas"))?;
    print_json(&stats, flags.pretty)
}

fn cmd_export(args: &[String]) -> Result<(), String> {
    if contains_help(args) {
        println!("{EXPORT_HELP}");
        return Ok(());
    }

    let flags = parse_flags(
        args,
        &["--user", "--all", "--from", "--to", "--out"],
        EXPORT_HELP,
    )?;
    let criteria = criteria_from_flags(&flags)?;
    let request = match (flags.all, flags.user.is_some()) {
        (true, true) => return Err("Usa --user o --all, no ambos".to_string()),
        (true, false) => build_all_users_export(criteria.date_from, criteria.date_to),
        (false, _) => build_user_export(&criteria).map_err(|error| error.to_string())?,
    };

    let config = load_config();
    let dir = flags
        .out
        .map(PathBuf::from)
        .unwrap_or_else(|| effective_export_dir(&config));

    let client = build_client()?;
    let file = client
        .export_timesheets(&request)
        .map_err(|error| error.user_message("exportar los registros"))?;
    let path = save_export(&dir, &file)
        .map_err(|error| format!("No se pudo guardar el archivo: {error}"))?;

    let output = ExportOutput {
        ok: true,
        request: request.describe(),
        path: path.display().to_string(),
    };
    print_json(&output, false)
}

fn print_timesheets(
    records: &[TimesheetEntry],
    criteria: &FilterCriteria,
    pretty: bool,
) -> Result<(), String> {
    let visible = filter_entries(records, criteria);
    let output = TimesheetsOutput {
        filter: criteria,
        count: visible.len(),
        total_hours: total_hours(&visible),
        timesheets: visible,
    };
    print_json(&output, pretty)
}

fn build_client() -> Result<ApiClient, String> {
    let config = load_config();
    let session = resolve_session(&config);
    if !session.is_authenticated() {
        return Err(ApiError::Unauthenticated.user_message(""));
    }
    ApiClient::new(&session)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|error| error.to_string())?;
    println!("{json}");
    Ok(())
}

fn is_help(value: &str) -> bool {
    matches!(value, "-h" | "--help" | "help")
}

fn contains_help(args: &[String]) -> bool {
    args.iter().any(|value| is_help(value.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn flags_build_complete_criteria() {
        let flags = parse_flags(
            &args(&["--user", "5", "--from", "2024-01-01", "--search", "Review"]),
            &["--user", "--from", "--search"],
            ALL_TIMESHEETS_HELP,
        )
        .unwrap();
        let criteria = criteria_from_flags(&flags).unwrap();
        assert_eq!(criteria.user, Selection::Only("5".to_string()));
        assert!(criteria.project.is_all());
        assert_eq!(criteria.date_from.unwrap().to_string(), "2024-01-01");
        assert_eq!(criteria.date_to, None);
        assert_eq!(criteria.search_term, "Review");
    }

    #[test]
    fn rejects_flags_outside_the_subcommand() {
        let error = parse_flags(&args(&["--csv"]), &["--pretty"], USERS_HELP)
            .err()
            .unwrap();
        assert!(error.starts_with("Flag desconocida: --csv"));

        let error = parse_flags(&args(&["--id"]), &["--id"], DELETE_HELP)
            .err()
            .unwrap();
        assert_eq!(error, "Falta valor para --id");
    }

    #[test]
    fn delete_requires_confirmation_before_any_request() {
        let error = cmd_delete(&args(&["--id", "7"])).unwrap_err();
        assert!(error.contains("--yes"));
    }

    #[test]
    fn export_rejects_conflicting_targets() {
        let error = cmd_export(&args(&["--user", "5", "--all"])).unwrap_err();
        assert_eq!(error, "Usa --user o --all, no ambos");

        let error = cmd_export(&args(&["--user", "all"])).unwrap_err();
        assert!(error.contains("Selecciona un usuario"));
    }

    #[test]
    fn stats_range_defaults_to_week_and_lists_valid_ranges() {
        assert_eq!(parse_range(None), Ok(StatsRange::Week));
        assert_eq!(parse_range(Some("Mes")), Ok(StatsRange::Month));
        assert_eq!(
            parse_range(Some("decade")).unwrap_err(),
            "Rango invalido: decade (use week|month|year)"
        );
    }

    #[test]
    fn invalid_dates_fail_before_loading_anything() {
        let error = cmd_timesheets(&args(&["--from", "mañana"])).unwrap_err();
        assert!(error.starts_with("Fecha invalida"));
    }
}
