use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::parsing::entry_day;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TimesheetEntry {
    pub id: i64,
    #[serde(default, alias = "userId")]
    pub user_id: i64,
    pub date: String,
    pub project: String,
    pub hours: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl TimesheetEntry {
    pub fn day(&self) -> Option<NaiveDate> {
        entry_day(&self.date)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    Employee,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Employee
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Role,
}

/// Body shared by create and update.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct TimesheetPayload {
    pub date: String,
    pub project: String,
    pub hours: f64,
    pub description: String,
}

#[derive(Deserialize)]
pub struct ProjectsResponse {
    #[serde(default)]
    pub projects: Vec<String>,
}

#[derive(Deserialize, Default)]
pub struct MutationResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timesheet: Option<TimesheetEntry>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsRange {
    #[default]
    Week,
    Month,
    Year,
}

impl StatsRange {
    pub const ALL: [StatsRange; 3] = [StatsRange::Week, StatsRange::Month, StatsRange::Year];

    pub fn as_str(self) -> &'static str {
        match self {
            StatsRange::Week => "week",
            StatsRange::Month => "month",
            StatsRange::Year => "year",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "week" | "semana" => Some(StatsRange::Week),
            "month" | "mes" => Some(StatsRange::Month),
            "year" | "ano" | "año" => Some(StatsRange::Year),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            StatsRange::Week => StatsRange::Month,
            StatsRange::Month => StatsRange::Year,
            StatsRange::Year => StatsRange::Week,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            StatsRange::Week => StatsRange::Year,
            StatsRange::Month => StatsRange::Week,
            StatsRange::Year => StatsRange::Month,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatsRange::Week => "semana",
            StatsRange::Month => "mes",
            StatsRange::Year => "año",
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ProjectHours {
    pub project: String,
    pub hours: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct EmployeeHours {
    pub name: String,
    pub hours: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct DailyHours {
    pub date: String,
    pub hours: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Statistics {
    #[serde(rename = "projectDistribution", default)]
    pub project_distribution: Vec<ProjectHours>,
    #[serde(rename = "employeeHours", default)]
    pub employee_hours: Vec<EmployeeHours>,
    #[serde(rename = "dailyTrends", default)]
    pub daily_trends: Vec<DailyHours>,
}

impl Statistics {
    pub fn total_hours(&self) -> f64 {
        self.project_distribution.iter().map(|p| p.hours).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.project_distribution.is_empty()
            && self.employee_hours.is_empty()
            && self.daily_trends.is_empty()
    }
}

/// Downloaded export payload, kept opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_accepts_both_user_id_spellings() {
        let snake: TimesheetEntry = serde_json::from_str(
            r#"{"id":1,"user_id":5,"date":"2024-01-10","project":"A","hours":4,"description":"work"}"#,
        )
        .unwrap();
        let camel: TimesheetEntry = serde_json::from_str(
            r#"{"id":1,"userId":5,"date":"2024-01-10","project":"A","hours":4,"description":"work"}"#,
        )
        .unwrap();
        assert_eq!(snake.user_id, 5);
        assert_eq!(camel.user_id, 5);
        assert_eq!(snake.hours, 4.0);
    }

    #[test]
    fn own_listing_omits_user_id() {
        let entry: TimesheetEntry = serde_json::from_str(
            r#"{"id":3,"date":"2024-01-10","project":"Internal","hours":2,"description":"x","created_at":"2024-01-10 09:00:00"}"#,
        )
        .unwrap();
        assert_eq!(entry.user_id, 0);
        assert_eq!(entry.created_at.as_deref(), Some("2024-01-10 09:00:00"));
    }

    #[test]
    fn unknown_roles_are_ordinary_users() {
        let user: User =
            serde_json::from_str(r#"{"id":2,"username":"ana","role":"employee"}"#).unwrap();
        assert_eq!(user.role, Role::Employee);
        let user: User =
            serde_json::from_str(r#"{"id":3,"username":"root","role":"admin"}"#).unwrap();
        assert_eq!(user.role, Role::Admin);
        let user: User =
            serde_json::from_str(r#"{"id":4,"username":"x","role":"auditor"}"#).unwrap();
        assert_eq!(user.role, Role::Employee);
    }

    #[test]
    fn statistics_use_camel_case_keys() {
        let stats: Statistics = serde_json::from_str(
            r#"{"projectDistribution":[{"project":"A","hours":6}],"employeeHours":[{"name":"ana","hours":6}],"dailyTrends":[]}"#,
        )
        .unwrap();
        assert_eq!(stats.total_hours(), 6.0);
        assert_eq!(stats.employee_hours[0].name, "ana");
        assert!(!stats.is_empty());
    }

    #[test]
    fn stats_range_cycles() {
        assert_eq!(StatsRange::Week.next(), StatsRange::Month);
        assert_eq!(StatsRange::Week.previous(), StatsRange::Year);
        assert_eq!(StatsRange::parse("MONTH"), Some(StatsRange::Month));
        assert_eq!(StatsRange::parse("decade"), None);
    }
}
