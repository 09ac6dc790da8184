use crate::domain::models::Role;

/// Credential and role facts resolved once at start-up and handed to
/// whatever needs to talk to the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    pub base_url: String,
    pub token: String,
    pub role: Role,
}

impl SessionContext {
    pub fn new(base_url: &str, token: &str, role: Role) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            role,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.role == Role::Admin
    }
}
