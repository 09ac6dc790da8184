use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::filter::{FilterCriteria, Selection, user_label};
use crate::domain::models::{TimesheetEntry, User};
use crate::utils::parsing::{display_day, format_date};

pub const DEFAULT_EXPORT_FILENAME: &str = "timesheet_export.xlsx";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "user_id", rename_all = "snake_case")]
pub enum ExportMode {
    SingleUser(i64),
    AllUsers,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    pub mode: ExportMode,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportError {
    AllUsersSelected,
    InvalidUser(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::AllUsersSelected => {
                write!(f, "Selecciona un usuario antes de exportar sus registros")
            }
            ExportError::InvalidUser(value) => write!(f, "Usuario invalido para exportar: {value}"),
        }
    }
}

impl std::error::Error for ExportError {}

/// Export of the user pinned in the filter, over the filter's date range.
pub fn build_user_export(criteria: &FilterCriteria) -> Result<ExportRequest, ExportError> {
    let raw = match &criteria.user {
        Selection::All => return Err(ExportError::AllUsersSelected),
        Selection::Only(raw) => raw,
    };
    let user_id = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ExportError::InvalidUser(raw.clone()))?;

    Ok(ExportRequest {
        mode: ExportMode::SingleUser(user_id),
        date_from: criteria.date_from,
        date_to: criteria.date_to,
    })
}

/// Export of every user; the dates come from the export dialog, not the filter.
pub fn build_all_users_export(
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> ExportRequest {
    ExportRequest {
        mode: ExportMode::AllUsers,
        date_from,
        date_to,
    }
}

impl ExportRequest {
    /// Query string of `/admin/export/timesheet`. Each date bound is sent
    /// only when set; a missing bound is never filled in.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        match self.mode {
            ExportMode::AllUsers => pairs.push(("export_all", "true".to_string())),
            ExportMode::SingleUser(user_id) => pairs.push(("user_id", user_id.to_string())),
        }
        if let Some(from) = self.date_from {
            pairs.push(("date_from", format_date(from)));
        }
        if let Some(to) = self.date_to {
            pairs.push(("date_to", format_date(to)));
        }
        pairs
    }

    pub fn describe(&self) -> String {
        let who = match self.mode {
            ExportMode::AllUsers => "todos los usuarios".to_string(),
            ExportMode::SingleUser(user_id) => format!("usuario {user_id}"),
        };
        let from = self.date_from.map(format_date).unwrap_or_default();
        let to = self.date_to.map(format_date).unwrap_or_default();
        if from.is_empty() && to.is_empty() {
            who
        } else {
            format!("{who} ({from}..{to})")
        }
    }
}

/// File name announced by a `Content-Disposition` header. The RFC 5987
/// `filename*` form wins over the plain one.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in split_parameters(header) {
        let part = part.trim();
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "filename*" => {
                let encoded = match value.split_once("''") {
                    Some((_, rest)) => rest,
                    None => value,
                };
                let decoded = urlencoding::decode_binary(unquote(encoded).as_bytes());
                extended = Some(String::from_utf8_lossy(&decoded).into_owned());
            }
            "filename" => plain = Some(unquote(value).to_string()),
            _ => {}
        }
    }

    extended
        .or(plain)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

pub fn resolve_export_filename(content_disposition: Option<&str>) -> String {
    content_disposition
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| DEFAULT_EXPORT_FILENAME.to_string())
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}

// `;` inside a quoted-string belongs to the value.
fn split_parameters(header: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (idx, ch) in header.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                parts.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&header[start..]);
    parts
}

/// CSV rendering of a (filtered) listing, one row per entry.
pub fn entries_to_csv(entries: &[&TimesheetEntry], users: &[User]) -> String {
    let mut csv = String::from("id,user,date,project,hours,description\n");
    for entry in entries {
        let user = if entry.user_id == 0 {
            String::new()
        } else {
            user_label(users, entry.user_id)
        };
        let fields = [
            entry.id.to_string(),
            user,
            display_day(&entry.date),
            entry.project.clone(),
            entry.hours.to_string(),
            entry.description.clone(),
        ];
        let row: Vec<String> = fields.iter().map(|field| csv_field(field)).collect();
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
    }

    #[test]
    fn user_export_is_blocked_while_all_users_selected() {
        let criteria = FilterCriteria::default();
        assert_eq!(
            build_user_export(&criteria),
            Err(ExportError::AllUsersSelected)
        );
    }

    #[test]
    fn user_export_rejects_non_numeric_users() {
        let criteria = FilterCriteria {
            user: Selection::from("ana"),
            ..Default::default()
        };
        assert_eq!(
            build_user_export(&criteria),
            Err(ExportError::InvalidUser("ana".to_string()))
        );
    }

    #[test]
    fn user_export_carries_filter_dates() {
        let criteria = FilterCriteria {
            user: Selection::from("5"),
            date_from: day("2024-01-01"),
            date_to: day("2024-01-31"),
            ..Default::default()
        };
        let request = build_user_export(&criteria).unwrap();
        assert_eq!(
            request.query_pairs(),
            vec![
                ("user_id", "5".to_string()),
                ("date_from", "2024-01-01".to_string()),
                ("date_to", "2024-01-31".to_string()),
            ]
        );
    }

    #[test]
    fn partial_ranges_are_forwarded_as_given() {
        let request = build_all_users_export(None, day("2024-03-01"));
        assert_eq!(
            request.query_pairs(),
            vec![
                ("export_all", "true".to_string()),
                ("date_to", "2024-03-01".to_string()),
            ]
        );

        let criteria = FilterCriteria {
            user: Selection::from("5"),
            date_from: day("2024-02-01"),
            ..Default::default()
        };
        let pairs = build_user_export(&criteria).unwrap().query_pairs();
        assert!(pairs.iter().any(|(key, _)| *key == "date_from"));
        assert!(pairs.iter().all(|(key, _)| *key != "date_to"));
        assert!(pairs.iter().all(|(key, _)| *key != "export_all"));
    }

    #[test]
    fn filename_comes_from_content_disposition() {
        assert_eq!(
            resolve_export_filename(Some("attachment; filename=\"ana_2024.xlsx\"")),
            "ana_2024.xlsx"
        );
        assert_eq!(
            resolve_export_filename(Some("attachment; filename=report.csv")),
            "report.csv"
        );
        assert_eq!(
            resolve_export_filename(Some(
                "attachment; filename=\"plain.xlsx\"; filename*=UTF-8''horas%20enero.xlsx"
            )),
            "horas enero.xlsx"
        );
    }

    #[test]
    fn quoted_filename_keeps_its_semicolons() {
        assert_eq!(
            resolve_export_filename(Some("attachment; filename=\"horas;enero.xlsx\"")),
            "horas;enero.xlsx"
        );
        assert_eq!(
            resolve_export_filename(Some(
                "attachment; filename=\"a;b.xlsx\"; filename*=UTF-8''a%3Bb%C3%B1.xlsx"
            )),
            "a;bñ.xlsx"
        );
    }

    #[test]
    fn filename_falls_back_to_default() {
        assert_eq!(resolve_export_filename(None), DEFAULT_EXPORT_FILENAME);
        assert_eq!(
            resolve_export_filename(Some("attachment")),
            DEFAULT_EXPORT_FILENAME
        );
        assert_eq!(
            resolve_export_filename(Some("attachment; filename=\"\"")),
            DEFAULT_EXPORT_FILENAME
        );
    }

    #[test]
    fn csv_quotes_awkward_fields() {
        let entry = TimesheetEntry {
            id: 7,
            user_id: 5,
            date: "2024-01-10".to_string(),
            project: "Firma A".to_string(),
            hours: 2.5,
            description: "review, \"final\"".to_string(),
            created_at: None,
        };
        let users = vec![User {
            id: 5,
            username: "ana".to_string(),
            role: Default::default(),
        }];
        let csv = entries_to_csv(&[&entry], &users);
        assert_eq!(
            csv,
            "id,user,date,project,hours,description\n7,ana,2024-01-10,Firma A,2.5,\"review, \"\"final\"\"\"\n"
        );
    }
}
