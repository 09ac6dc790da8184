use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_DISPOSITION;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::export::{ExportRequest, resolve_export_filename};
use crate::domain::models::*;
use crate::domain::session::SessionContext;
use crate::log;
use crate::utils::version::user_agent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiError {
    Unauthenticated,
    Forbidden,
    Server { status: u16, message: String },
    Status(u16),
    Transport(String),
    Decode(String),
}

impl ApiError {
    /// Message shown next to the action that failed.
    pub fn user_message(&self, action: &str) -> String {
        match self {
            ApiError::Unauthenticated => {
                "No hay token configurado. Define TSHEET_TOKEN o guarda api_token en la configuracion."
                    .to_string()
            }
            ApiError::Forbidden => "No tienes permiso para acceder a este recurso".to_string(),
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Status(_) | ApiError::Transport(_) | ApiError::Decode(_) => {
                format!("No se pudo {action}")
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthenticated => write!(f, "sin token"),
            ApiError::Forbidden => write!(f, "403 acceso denegado"),
            ApiError::Server { status, message } => write!(f, "{status} {message}"),
            ApiError::Status(status) => write!(f, "{status}"),
            ApiError::Transport(error) => write!(f, "error de red: {error}"),
            ApiError::Decode(error) => write!(f, "respuesta invalida: {error}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Backend operations the application needs. `ApiClient` talks HTTP; tests
/// substitute an in-memory implementation.
pub trait TimesheetApi: Send + Sync {
    fn list_timesheets(&self) -> Result<Vec<TimesheetEntry>, ApiError>;
    fn create_timesheet(&self, payload: &TimesheetPayload) -> Result<TimesheetEntry, ApiError>;
    fn update_timesheet(
        &self,
        id: i64,
        payload: &TimesheetPayload,
    ) -> Result<TimesheetEntry, ApiError>;
    fn delete_timesheet(&self, id: i64) -> Result<(), ApiError>;
    fn list_projects(&self) -> Result<Vec<String>, ApiError>;
    fn list_users(&self) -> Result<Vec<User>, ApiError>;
    fn list_all_timesheets(&self) -> Result<Vec<TimesheetEntry>, ApiError>;
    fn fetch_statistics(&self, range: StatsRange) -> Result<Statistics, ApiError>;
    fn export_timesheets(&self, request: &ExportRequest) -> Result<ExportFile, ApiError>;
}

pub struct ApiClient {
    pub base_url: String,
    token: String,
    pub client: Client,
}

impl ApiClient {
    pub fn new(session: &SessionContext) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(user_agent())
            .build()
            .map_err(|error| error.to_string())?;

        Ok(Self {
            base_url: session.base_url.trim_end_matches('/').to_string(),
            token: session.token.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, method: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        if self.token.is_empty() {
            return Err(ApiError::Unauthenticated);
        }
        log!("{} token len: {}", method, self.token.len());

        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|error| {
                log!("{} transport error: {}", method, error);
                ApiError::Transport(error.to_string())
            })?;

        let status = response.status();
        log!("{} {} -> {}", method, response.url(), status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        log!("{} error body: {:.200}", method, body);
        Err(error_from_status(status, &body))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send("GET", self.client.get(&url))?;
        let body = response.text().map_err(|e| ApiError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|error| decode_error(error, &body))
    }

    fn get_list<T: DeserializeOwned>(&self, path: &str, keys: &[&str]) -> Result<Vec<T>, ApiError> {
        let url = self.url(path);
        let response = self.send("GET", self.client.get(&url))?;
        let body = response.text().map_err(|e| ApiError::Transport(e.to_string()))?;
        let items: Vec<T> = parse_list_from_body(&body, keys)?;
        log!("GET {} -> {} items", path, items.len());
        Ok(items)
    }

    fn mutation(&self, method: &str, request: RequestBuilder) -> Result<TimesheetEntry, ApiError> {
        let response = self.send(method, request)?;
        let body = response.text().map_err(|e| ApiError::Transport(e.to_string()))?;
        let parsed: MutationResponse =
            serde_json::from_str(&body).map_err(|error| decode_error(error, &body))?;
        if let Some(message) = parsed.error {
            return Err(ApiError::Server {
                status: 200,
                message,
            });
        }
        if let Some(message) = &parsed.message {
            log!("{} -> {}", method, message);
        }
        parsed
            .timesheet
            .ok_or_else(|| ApiError::Decode("respuesta sin timesheet".to_string()))
    }
}

impl TimesheetApi for ApiClient {
    fn list_timesheets(&self) -> Result<Vec<TimesheetEntry>, ApiError> {
        self.get_list("/timesheet/", &["timesheets", "data", "items"])
    }

    fn create_timesheet(&self, payload: &TimesheetPayload) -> Result<TimesheetEntry, ApiError> {
        log!(
            "POST timesheet: date={}, project={}, hours={}",
            payload.date,
            payload.project,
            payload.hours
        );
        let request = self.client.post(self.url("/timesheet/")).json(payload);
        self.mutation("POST", request)
    }

    fn update_timesheet(
        &self,
        id: i64,
        payload: &TimesheetPayload,
    ) -> Result<TimesheetEntry, ApiError> {
        log!(
            "PUT timesheet {}: date={}, project={}, hours={}",
            id,
            payload.date,
            payload.project,
            payload.hours
        );
        let request = self
            .client
            .put(self.url(&format!("/timesheet/{id}")))
            .json(payload);
        self.mutation("PUT", request)
    }

    fn delete_timesheet(&self, id: i64) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!("/timesheet/{id}")));
        self.send("DELETE", request)?;
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<String>, ApiError> {
        let response: ProjectsResponse = self.get_json("/timesheet/projects")?;
        Ok(response.projects)
    }

    fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get_list("/admin/users", &["users", "data", "items"])
    }

    fn list_all_timesheets(&self) -> Result<Vec<TimesheetEntry>, ApiError> {
        self.get_list("/admin/timesheets", &["timesheets", "data", "items"])
    }

    fn fetch_statistics(&self, range: StatsRange) -> Result<Statistics, ApiError> {
        let url = self.url("/admin/statistics");
        let request = self.client.get(url).query(&[("range", range.as_str())]);
        let response = self.send("GET", request)?;
        let body = response.text().map_err(|e| ApiError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|error| decode_error(error, &body))
    }

    fn export_timesheets(&self, request: &ExportRequest) -> Result<ExportFile, ApiError> {
        let pairs = request.query_pairs();
        log!("Export request: {}", request.describe());
        let builder = self
            .client
            .get(self.url("/admin/export/timesheet"))
            .query(&pairs);
        let response = self.send("GET", builder)?;

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let filename = resolve_export_filename(disposition.as_deref());
        let bytes = response
            .bytes()
            .map_err(|e| ApiError::Transport(e.to_string()))?
            .to_vec();
        log!("Export received: {} ({} bytes)", filename, bytes.len());

        Ok(ExportFile { filename, bytes })
    }
}

fn error_from_status(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::FORBIDDEN {
        return ApiError::Forbidden;
    }
    match server_error_message(body) {
        Some(message) => ApiError::Server {
            status: status.as_u16(),
            message,
        },
        None => ApiError::Status(status.as_u16()),
    }
}

/// `error` field of a JSON error body, if there is one.
fn server_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(Value::as_str)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
}

fn decode_error(error: serde_json::Error, body: &str) -> ApiError {
    let snippet = body.lines().next().unwrap_or("");
    log!("Decode error: {} | {:.80}", error, snippet);
    if snippet.is_empty() {
        ApiError::Decode(error.to_string())
    } else {
        ApiError::Decode(format!("{error} {snippet:.80}"))
    }
}

fn parse_list_from_body<T: DeserializeOwned>(body: &str, keys: &[&str]) -> Result<Vec<T>, ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|error| decode_error(error, body))?;

    if let Some(list) = extract_list(&value, keys) {
        return serde_json::from_value(list).map_err(|error| ApiError::Decode(error.to_string()));
    }

    Err(ApiError::Decode(format!(
        "json sin lista (keys: {})",
        keys.join(", ")
    )))
}

fn extract_list(value: &Value, keys: &[&str]) -> Option<Value> {
    match value {
        Value::Array(_) if is_object_array(value) => Some(value.clone()),
        Value::Object(map) => keys
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|list| is_object_array(list))
            .cloned(),
        _ => None,
    }
}

fn is_object_array(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|item| item.is_object()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_distinct_from_generic_failures() {
        let forbidden = error_from_status(StatusCode::FORBIDDEN, r#"{"error":"Unauthorized"}"#);
        assert_eq!(forbidden, ApiError::Forbidden);
        assert_eq!(
            forbidden.user_message("cargar usuarios"),
            "No tienes permiso para acceder a este recurso"
        );

        let generic = error_from_status(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(generic, ApiError::Status(500));
        assert_eq!(generic.user_message("cargar usuarios"), "No se pudo cargar usuarios");
    }

    #[test]
    fn server_error_field_is_surfaced_verbatim() {
        let error = error_from_status(StatusCode::BAD_REQUEST, r#"{"error":"Invalid project option"}"#);
        assert_eq!(error.user_message("guardar"), "Invalid project option");
    }

    #[test]
    fn lists_are_found_bare_or_wrapped() {
        let bare: Vec<User> =
            parse_list_from_body(r#"[{"id":1,"username":"ana","role":"admin"}]"#, &["users"]).unwrap();
        assert_eq!(bare.len(), 1);

        let wrapped: Vec<TimesheetEntry> = parse_list_from_body(
            r#"{"timesheets":[{"id":1,"date":"2024-01-10","project":"A","hours":4,"description":"x"}]}"#,
            &["timesheets"],
        )
        .unwrap();
        assert_eq!(wrapped[0].project, "A");

        let empty: Vec<TimesheetEntry> =
            parse_list_from_body(r#"{"timesheets":[]}"#, &["timesheets"]).unwrap();
        assert!(empty.is_empty());

        let missing: Result<Vec<User>, ApiError> =
            parse_list_from_body(r#"{"message":"hi"}"#, &["users"]);
        assert!(matches!(missing, Err(ApiError::Decode(_))));
    }

    #[test]
    fn requests_without_token_never_leave_the_client() {
        let session = SessionContext::new("http://127.0.0.1:9", "", Role::Employee);
        let client = ApiClient::new(&session).unwrap();
        assert_eq!(client.list_timesheets(), Err(ApiError::Unauthenticated));
    }
}
