use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::models::{TimesheetEntry, User};

pub const ALL: &str = "all";

/// A selector value that is either unconstrained or pinned to one value.
/// Serialized as a plain string where `"all"` means unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Only(value) => Some(value.as_str()),
        }
    }
}

impl From<&str> for Selection {
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
            Selection::All
        } else {
            Selection::Only(raw.to_string())
        }
    }
}

impl From<String> for Selection {
    fn from(raw: String) -> Self {
        Selection::from(raw.as_str())
    }
}

impl From<Selection> for String {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::All => ALL.to_string(),
            Selection::Only(value) => value,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub user: Selection,
    #[serde(default)]
    pub project: Selection,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub search_term: String,
}

impl FilterCriteria {
    pub fn is_default(&self) -> bool {
        *self == FilterCriteria::default()
    }

    /// Numeric owner id of the user selection. `None` for `All` and for
    /// values that are not integers.
    pub fn user_id(&self) -> Option<i64> {
        self.user
            .value()
            .and_then(|value| value.trim().parse::<i64>().ok())
    }

    pub fn matches(&self, entry: &TimesheetEntry) -> bool {
        if !self.user.is_all() {
            match self.user_id() {
                Some(user_id) if entry.user_id == user_id => {}
                _ => return false,
            }
        }

        if let Selection::Only(project) = &self.project {
            if entry.project != *project {
                return false;
            }
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(day) = entry.day() else {
                return false;
            };
            if let Some(from) = self.date_from {
                if day < from {
                    return false;
                }
            }
            // Day granularity: the whole `date_to` day is inside the range.
            if let Some(to) = self.date_to {
                if day > to {
                    return false;
                }
            }
        }

        if !self.search_term.is_empty() {
            let term = self.search_term.to_lowercase();
            if !entry.description.to_lowercase().contains(&term) {
                return false;
            }
        }

        true
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(user) = self.user.value() {
            parts.push(format!("usuario={user}"));
        }
        if let Some(project) = self.project.value() {
            parts.push(format!("proyecto={project}"));
        }
        match (self.date_from, self.date_to) {
            (None, None) => {}
            (from, to) => parts.push(format!(
                "fechas={}..{}",
                from.map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                to.map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            )),
        }
        if !self.search_term.is_empty() {
            parts.push(format!("texto=\"{}\"", self.search_term));
        }
        if parts.is_empty() {
            "sin filtros".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Entries satisfying every active criterion, in their original order.
pub fn filter_entries<'a>(
    entries: &'a [TimesheetEntry],
    criteria: &FilterCriteria,
) -> Vec<&'a TimesheetEntry> {
    entries
        .iter()
        .filter(|entry| criteria.matches(entry))
        .collect()
}

/// Distinct project names in order of first appearance.
pub fn project_facets(entries: &[TimesheetEntry]) -> Vec<String> {
    let mut projects: Vec<String> = Vec::new();
    for entry in entries {
        if !projects.iter().any(|project| *project == entry.project) {
            projects.push(entry.project.clone());
        }
    }
    projects
}

pub fn user_label(users: &[User], user_id: i64) -> String {
    users
        .iter()
        .find(|user| user.id == user_id)
        .map(|user| user.username.clone())
        .unwrap_or_else(|| format!("Usuario {user_id}"))
}

pub fn total_hours(entries: &[&TimesheetEntry]) -> f64 {
    entries.iter().map(|entry| entry.hours).sum()
}
