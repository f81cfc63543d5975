//! CRM resource records: clients, leads, properties, reminders, comments.
//!
//! Each record type has a row model (what goes on the wire, camelCase), a
//! `New*` input accepted on create, and an `Update*` input that carries the
//! id alongside the same field set. Dates travel as plain strings
//! (`YYYY-MM-DD`) and timestamps as RFC 3339, matching the published JSON
//! interface.

pub mod store;

use serde::{Deserialize, Serialize};

pub use store::RecordStore;

// ── Clients ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub birthday: Option<String>,
    pub budget_min: i64,
    pub budget_max: i64,
    pub reminder_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub birthday: Option<String>,
    #[serde(default)]
    pub budget_min: i64,
    #[serde(default)]
    pub budget_max: i64,
    pub reminder_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateClient {
    #[serde(default)]
    pub id: i64,
    #[serde(flatten)]
    pub fields: NewClient,
}

// ── Leads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub interest: String,
    pub follow_up_date: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub email: Option<String>,
    #[serde(default)]
    pub interest: String,
    #[serde(default)]
    pub follow_up_date: String,
    #[serde(default)]
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLead {
    #[serde(default)]
    pub id: i64,
    #[serde(flatten)]
    pub fields: NewLead,
}

// ── Properties ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub title: String,
    pub price: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub bedrooms: i64,
    pub bathrooms: f64,
    pub size: i64,
    pub location: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    #[serde(default)]
    pub title: String,
    pub price: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub bedrooms: i64,
    #[serde(default)]
    pub bathrooms: f64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub location: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProperty {
    #[serde(default)]
    pub id: i64,
    #[serde(flatten)]
    pub fields: NewProperty,
}

// ── Reminders ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: i64,
    pub title: String,
    pub date: String,
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub related_client: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    pub time: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub related_client: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReminder {
    #[serde(default)]
    pub id: i64,
    #[serde(flatten)]
    pub fields: NewReminder,
}

// ── Comments ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub related_to: Option<String>,
    pub content: String,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub related_to: Option<String>,
    #[serde(default)]
    pub content: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateComment {
    #[serde(default)]
    pub id: i64,
    #[serde(flatten)]
    pub fields: NewComment,
}
