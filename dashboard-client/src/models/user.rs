use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PlatformAdmin,
    CompanyAdmin,
    Viewer,
    #[serde(other)]
    Unknown,
}

/// Organization the user belongs to, as embedded in the profile payload.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompanySummary {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
}

/// Cached representation of the authenticated user (`GET /api/users/me/`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
    #[serde(default)]
    pub company_data: Option<CompanySummary>,
    /// Fields this client does not model; kept so a round trip through the
    /// store loses nothing the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_role() -> Role {
    Role::Viewer
}

fn default_true() -> bool {
    true
}

impl UserProfile {
    /// Name to show in greetings; falls back to the mailbox part of the email.
    pub fn display_name(&self) -> &str {
        if !self.full_name.trim().is_empty() {
            self.full_name.trim()
        } else {
            self.email.split('@').next().unwrap_or("User")
        }
    }

    /// Apply a partial update. Fields absent from `update` keep their value.
    pub fn merge(&mut self, update: ProfileUpdate) {
        let mut names_changed = false;

        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
            names_changed = true;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
            names_changed = true;
        }
        if let Some(full_name) = update.full_name {
            self.full_name = full_name;
        } else if names_changed {
            self.full_name = format!("{} {}", self.first_name, self.last_name)
                .trim()
                .to_string();
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(avatar) = update.avatar {
            self.avatar = Some(avatar);
        }
        if let Some(can_edit) = update.can_edit {
            self.can_edit = can_edit;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(company) = update.company_data {
            self.company_data = Some(company);
        }
        self.extra.extend(update.extra);
    }
}

/// Partial profile. Serialized as the `PATCH /api/users/me/` body and merged
/// into the cached profile afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_edit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_data: Option<CompanySummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
