use std::fmt;

use crate::domain::models::TimesheetPayload;
use crate::utils::parsing::{format_date, parse_date, parse_hours};

pub const MIN_HOURS: f64 = 1.0;
pub const MAX_HOURS: f64 = 8.0;

#[derive(Clone, Debug, PartialEq)]
pub enum ValidationError {
    InvalidDate(String),
    MissingProject,
    InvalidHours(String),
    HoursOutOfRange(f64),
    MissingDescription,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidDate(raw) => write!(f, "Fecha invalida: {raw:?} (use YYYY-MM-DD)"),
            ValidationError::MissingProject => write!(f, "Selecciona un proyecto"),
            ValidationError::InvalidHours(raw) => write!(f, "Horas invalidas: {raw:?}"),
            ValidationError::HoursOutOfRange(hours) => write!(
                f,
                "Las horas deben estar entre {MIN_HOURS} y {MAX_HOURS} (recibido {hours})"
            ),
            ValidationError::MissingDescription => write!(f, "La descripcion es obligatoria"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_hours(hours: f64) -> Result<f64, ValidationError> {
    if !(MIN_HOURS..=MAX_HOURS).contains(&hours) {
        return Err(ValidationError::HoursOutOfRange(hours));
    }
    Ok(hours)
}

/// Checks a create/update form before anything is sent to the backend.
pub fn validate_entry(
    date: &str,
    project: &str,
    hours: &str,
    description: &str,
) -> Result<TimesheetPayload, ValidationError> {
    let day = parse_date(date).ok_or_else(|| ValidationError::InvalidDate(date.to_string()))?;

    let project = project.trim();
    if project.is_empty() {
        return Err(ValidationError::MissingProject);
    }

    let hours = parse_hours(hours).ok_or_else(|| ValidationError::InvalidHours(hours.to_string()))?;
    let hours = validate_hours(hours)?;

    let description = description.trim();
    if description.is_empty() {
        return Err(ValidationError::MissingDescription);
    }

    Ok(TimesheetPayload {
        date: format_date(day),
        project: project.to_string(),
        hours,
        description: description.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(value: &str) -> Result<TimesheetPayload, ValidationError> {
        validate_entry("2024-01-10", "Internal", value, "standup")
    }

    #[test]
    fn hours_outside_one_to_eight_are_rejected() {
        assert_eq!(hours("0"), Err(ValidationError::HoursOutOfRange(0.0)));
        assert_eq!(hours("8.5"), Err(ValidationError::HoursOutOfRange(8.5)));
        assert_eq!(hours("9"), Err(ValidationError::HoursOutOfRange(9.0)));
        assert_eq!(hours("-1"), Err(ValidationError::HoursOutOfRange(-1.0)));
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(hours("1").unwrap().hours, 1.0);
        assert_eq!(hours("8").unwrap().hours, 8.0);
        assert_eq!(hours("4,5").unwrap().hours, 4.5);
    }

    #[test]
    fn non_numeric_hours_are_rejected() {
        assert!(matches!(hours(""), Err(ValidationError::InvalidHours(_))));
        assert!(matches!(hours("ocho"), Err(ValidationError::InvalidHours(_))));
    }

    #[test]
    fn date_is_normalized() {
        let payload = validate_entry("10/01/2024", "Internal", "2", "x").unwrap();
        assert_eq!(payload.date, "2024-01-10");
        assert!(matches!(
            validate_entry("2024-13-01", "Internal", "2", "x"),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn project_and_description_are_required() {
        assert_eq!(
            validate_entry("2024-01-10", "  ", "2", "x"),
            Err(ValidationError::MissingProject)
        );
        assert_eq!(
            validate_entry("2024-01-10", "Internal", "2", "   "),
            Err(ValidationError::MissingDescription)
        );
    }
}
