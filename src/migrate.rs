//! Batch importer for seeding a database from an exported data dump.
//!
//! One payload may carry any subset of the five record arrays. Records are
//! inserted one at a time through the regular store so the same validation
//! applies; a failing record is reported and skipped, never aborting the
//! batch. Clients whose email is already present are skipped without being
//! counted as errors, so re-running an import is harmless.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::records::{NewClient, NewComment, NewLead, NewProperty, NewReminder, RecordStore};

#[derive(Debug, Default, Deserialize)]
pub struct MigrationPayload {
    #[serde(default)]
    pub clients: Vec<NewClient>,
    #[serde(default)]
    pub leads: Vec<NewLead>,
    #[serde(default)]
    pub properties: Vec<NewProperty>,
    #[serde(default)]
    pub reminders: Vec<NewReminder>,
    #[serde(default)]
    pub comments: Vec<NewComment>,
}

/// Per-entity success counts plus a flat list of human-readable failures.
#[derive(Debug, Default, Serialize)]
pub struct MigrationResults {
    pub clients: usize,
    pub leads: usize,
    pub properties: usize,
    pub reminders: usize,
    pub comments: usize,
    pub errors: Vec<String>,
}

/// Run a full import. Infallible at the batch level: every per-record
/// failure lands in `results.errors` instead of bubbling up.
pub fn run(store: &RecordStore, payload: &MigrationPayload) -> MigrationResults {
    let mut results = MigrationResults::default();

    for client in &payload.clients {
        match store.create_client(client) {
            Ok(_) => results.clients += 1,
            // Duplicate email means the record was imported before.
            Err(ApiError::Conflict(_)) => {}
            Err(e) => results.errors.push(format!("Client {}: {e}", client.name)),
        }
    }

    for lead in &payload.leads {
        match store.create_lead(lead) {
            Ok(_) => results.leads += 1,
            Err(e) => results.errors.push(format!("Lead {}: {e}", lead.name)),
        }
    }

    for property in &payload.properties {
        match store.create_property(property) {
            Ok(_) => results.properties += 1,
            Err(e) => results
                .errors
                .push(format!("Property {}: {e}", property.title)),
        }
    }

    for reminder in &payload.reminders {
        match store.create_reminder(reminder) {
            Ok(_) => results.reminders += 1,
            Err(e) => results
                .errors
                .push(format!("Reminder {}: {e}", reminder.title)),
        }
    }

    for comment in &payload.comments {
        match store.create_comment(comment) {
            Ok(_) => results.comments += 1,
            Err(e) => results
                .errors
                .push(format!("Comment {}: {e}", comment.title)),
        }
    }

    tracing::info!(
        clients = results.clients,
        leads = results.leads,
        properties = results.properties,
        reminders = results.reminders,
        comments = results.comments,
        errors = results.errors.len(),
        "migration completed"
    );
    results
}
