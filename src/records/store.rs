//! SQLite store for the five CRM record types.
//!
//! Every operation checks one connection out of the shared pool, runs its
//! statements, and maps constraint/missing-row outcomes onto the
//! [`ApiError`] taxonomy. Updates rewrite the full field set (the published
//! interface sends whole records) and refresh `updated_at`.

use super::*;
use crate::db::Database;
use crate::error::ApiError;
use chrono::Utc;
use rusqlite::{params, Row};

#[derive(Clone)]
pub struct RecordStore {
    db: Database,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}

impl RecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ── Clients ─────────────────────────────────────────────────────

    pub fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, phone, email, type, birthday, budget_min, budget_max,
                    reminder_date, notes, created_at, updated_at
             FROM clients ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map([], client_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_client(&self, input: &NewClient) -> Result<Client, ApiError> {
        if input.name.is_empty()
            || input.phone.is_empty()
            || input.email.is_empty()
            || input.kind.is_empty()
        {
            return Err(ApiError::validation(
                "Missing required fields: name, phone, email, type",
            ));
        }

        let conn = self.db.conn()?;
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM clients WHERE email = ?1",
                params![input.email],
                |_| Ok(true),
            )
            .unwrap_or(false);
        if exists {
            return Err(ApiError::conflict("Client with this email already exists"));
        }

        let now = now_rfc3339();
        let inserted = conn.execute(
            "INSERT INTO clients (name, phone, email, type, birthday, budget_min,
                                  budget_max, reminder_date, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                input.name,
                input.phone,
                input.email,
                input.kind,
                input.birthday,
                input.budget_min,
                input.budget_max,
                input.reminder_date,
                input.notes,
                now
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(ApiError::conflict("Client with this email already exists"));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, name, phone, email, type, birthday, budget_min, budget_max,
                    reminder_date, notes, created_at, updated_at
             FROM clients WHERE id = ?1",
            params![id],
            client_from_row,
        )
        .map_err(Into::into)
    }

    pub fn update_client(&self, update: &UpdateClient) -> Result<Client, ApiError> {
        if update.id == 0 {
            return Err(ApiError::validation("Client ID is required"));
        }
        let input = &update.fields;

        let conn = self.db.conn()?;
        if !input.email.is_empty() {
            let taken: bool = conn
                .query_row(
                    "SELECT 1 FROM clients WHERE email = ?1 AND id != ?2",
                    params![input.email, update.id],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if taken {
                return Err(ApiError::conflict("Email already exists for another client"));
            }
        }

        let changed = conn.execute(
            "UPDATE clients SET name = ?2, phone = ?3, email = ?4, type = ?5,
                    birthday = ?6, budget_min = ?7, budget_max = ?8,
                    reminder_date = ?9, notes = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                update.id,
                input.name,
                input.phone,
                input.email,
                input.kind,
                input.birthday,
                input.budget_min,
                input.budget_max,
                input.reminder_date,
                input.notes,
                now_rfc3339()
            ],
        )?;
        if changed == 0 {
            return Err(ApiError::not_found("Client not found"));
        }

        conn.query_row(
            "SELECT id, name, phone, email, type, birthday, budget_min, budget_max,
                    reminder_date, notes, created_at, updated_at
             FROM clients WHERE id = ?1",
            params![update.id],
            client_from_row,
        )
        .map_err(Into::into)
    }

    pub fn delete_client(&self, id: i64) -> Result<i64, ApiError> {
        self.delete_row("clients", "Client not found", id)
    }

    // ── Leads ───────────────────────────────────────────────────────

    pub fn list_leads(&self) -> Result<Vec<Lead>, ApiError> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, phone, email, interest, follow_up_date, status, notes,
                    created_at, updated_at
             FROM leads ORDER BY follow_up_date ASC, created_at DESC",
        )?;
        let rows = stmt
            .query_map([], lead_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_lead(&self, input: &NewLead) -> Result<Lead, ApiError> {
        if input.name.is_empty()
            || input.phone.is_empty()
            || input.interest.is_empty()
            || input.follow_up_date.is_empty()
            || input.status.is_empty()
        {
            return Err(ApiError::validation(
                "Missing required fields: name, phone, interest, followUpDate, status",
            ));
        }

        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO leads (name, phone, email, interest, follow_up_date, status,
                                notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                input.name,
                input.phone,
                input.email,
                input.interest,
                input.follow_up_date,
                input.status,
                input.notes,
                now_rfc3339()
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, name, phone, email, interest, follow_up_date, status, notes,
                    created_at, updated_at
             FROM leads WHERE id = ?1",
            params![id],
            lead_from_row,
        )
        .map_err(Into::into)
    }

    pub fn update_lead(&self, update: &UpdateLead) -> Result<Lead, ApiError> {
        if update.id == 0 {
            return Err(ApiError::validation("Lead ID is required"));
        }
        let input = &update.fields;

        let conn = self.db.conn()?;
        let changed = conn.execute(
            "UPDATE leads SET name = ?2, phone = ?3, email = ?4, interest = ?5,
                    follow_up_date = ?6, status = ?7, notes = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                update.id,
                input.name,
                input.phone,
                input.email,
                input.interest,
                input.follow_up_date,
                input.status,
                input.notes,
                now_rfc3339()
            ],
        )?;
        if changed == 0 {
            return Err(ApiError::not_found("Lead not found"));
        }

        conn.query_row(
            "SELECT id, name, phone, email, interest, follow_up_date, status, notes,
                    created_at, updated_at
             FROM leads WHERE id = ?1",
            params![update.id],
            lead_from_row,
        )
        .map_err(Into::into)
    }

    pub fn delete_lead(&self, id: i64) -> Result<i64, ApiError> {
        self.delete_row("leads", "Lead not found", id)
    }

    // ── Properties ──────────────────────────────────────────────────

    pub fn list_properties(&self) -> Result<Vec<Property>, ApiError> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, price, type, status, bedrooms, bathrooms, size,
                    location, description, created_at, updated_at
             FROM properties ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map([], property_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_property(&self, input: &NewProperty) -> Result<Property, ApiError> {
        if input.title.is_empty()
            || input.price.is_none()
            || input.kind.is_empty()
            || input.status.is_empty()
            || input.location.is_empty()
        {
            return Err(ApiError::validation(
                "Missing required fields: title, price, type, status, location",
            ));
        }

        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO properties (title, price, type, status, bedrooms, bathrooms,
                                     size, location, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                input.title,
                input.price,
                input.kind,
                input.status,
                input.bedrooms,
                input.bathrooms,
                input.size,
                input.location,
                input.description,
                now_rfc3339()
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, title, price, type, status, bedrooms, bathrooms, size,
                    location, description, created_at, updated_at
             FROM properties WHERE id = ?1",
            params![id],
            property_from_row,
        )
        .map_err(Into::into)
    }

    pub fn update_property(&self, update: &UpdateProperty) -> Result<Property, ApiError> {
        if update.id == 0 {
            return Err(ApiError::validation("Property ID is required"));
        }
        let input = &update.fields;

        let conn = self.db.conn()?;
        let changed = conn.execute(
            "UPDATE properties SET title = ?2, price = ?3, type = ?4, status = ?5,
                    bedrooms = ?6, bathrooms = ?7, size = ?8, location = ?9,
                    description = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                update.id,
                input.title,
                input.price.unwrap_or(0),
                input.kind,
                input.status,
                input.bedrooms,
                input.bathrooms,
                input.size,
                input.location,
                input.description,
                now_rfc3339()
            ],
        )?;
        if changed == 0 {
            return Err(ApiError::not_found("Property not found"));
        }

        conn.query_row(
            "SELECT id, title, price, type, status, bedrooms, bathrooms, size,
                    location, description, created_at, updated_at
             FROM properties WHERE id = ?1",
            params![update.id],
            property_from_row,
        )
        .map_err(Into::into)
    }

    pub fn delete_property(&self, id: i64) -> Result<i64, ApiError> {
        self.delete_row("properties", "Property not found", id)
    }

    // ── Reminders ───────────────────────────────────────────────────

    pub fn list_reminders(&self) -> Result<Vec<Reminder>, ApiError> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, date, time, type, related_client, notes,
                    created_at, updated_at
             FROM reminders ORDER BY date ASC, time ASC",
        )?;
        let rows = stmt
            .query_map([], reminder_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_reminder(&self, input: &NewReminder) -> Result<Reminder, ApiError> {
        if input.title.is_empty() || input.date.is_empty() || input.kind.is_empty() {
            return Err(ApiError::validation(
                "Missing required fields: title, date, type",
            ));
        }

        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO reminders (title, date, time, type, related_client, notes,
                                    created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                input.title,
                input.date,
                input.time,
                input.kind,
                input.related_client,
                input.notes,
                now_rfc3339()
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, title, date, time, type, related_client, notes,
                    created_at, updated_at
             FROM reminders WHERE id = ?1",
            params![id],
            reminder_from_row,
        )
        .map_err(Into::into)
    }

    pub fn update_reminder(&self, update: &UpdateReminder) -> Result<Reminder, ApiError> {
        if update.id == 0 {
            return Err(ApiError::validation("Reminder ID is required"));
        }
        let input = &update.fields;

        let conn = self.db.conn()?;
        let changed = conn.execute(
            "UPDATE reminders SET title = ?2, date = ?3, time = ?4, type = ?5,
                    related_client = ?6, notes = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                update.id,
                input.title,
                input.date,
                input.time,
                input.kind,
                input.related_client,
                input.notes,
                now_rfc3339()
            ],
        )?;
        if changed == 0 {
            return Err(ApiError::not_found("Reminder not found"));
        }

        conn.query_row(
            "SELECT id, title, date, time, type, related_client, notes,
                    created_at, updated_at
             FROM reminders WHERE id = ?1",
            params![update.id],
            reminder_from_row,
        )
        .map_err(Into::into)
    }

    pub fn delete_reminder(&self, id: i64) -> Result<i64, ApiError> {
        self.delete_row("reminders", "Reminder not found", id)
    }

    // ── Comments ────────────────────────────────────────────────────

    pub fn list_comments(&self) -> Result<Vec<Comment>, ApiError> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, category, related_to, content, date,
                    created_at, updated_at
             FROM comments ORDER BY date DESC, created_at DESC",
        )?;
        let rows = stmt
            .query_map([], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_comment(&self, input: &NewComment) -> Result<Comment, ApiError> {
        if input.title.is_empty() || input.category.is_empty() || input.content.is_empty() {
            return Err(ApiError::validation(
                "Missing required fields: title, category, content",
            ));
        }

        let date = input.date.clone().unwrap_or_else(today);
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO comments (title, category, related_to, content, date,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                input.title,
                input.category,
                input.related_to,
                input.content,
                date,
                now_rfc3339()
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, title, category, related_to, content, date,
                    created_at, updated_at
             FROM comments WHERE id = ?1",
            params![id],
            comment_from_row,
        )
        .map_err(Into::into)
    }

    pub fn update_comment(&self, update: &UpdateComment) -> Result<Comment, ApiError> {
        if update.id == 0 {
            return Err(ApiError::validation("Comment ID is required"));
        }
        let input = &update.fields;

        let conn = self.db.conn()?;
        let changed = conn.execute(
            "UPDATE comments SET title = ?2, category = ?3, related_to = ?4,
                    content = ?5, date = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                update.id,
                input.title,
                input.category,
                input.related_to,
                input.content,
                input.date.clone().unwrap_or_else(today),
                now_rfc3339()
            ],
        )?;
        if changed == 0 {
            return Err(ApiError::not_found("Comment not found"));
        }

        conn.query_row(
            "SELECT id, title, category, related_to, content, date,
                    created_at, updated_at
             FROM comments WHERE id = ?1",
            params![update.id],
            comment_from_row,
        )
        .map_err(Into::into)
    }

    pub fn delete_comment(&self, id: i64) -> Result<i64, ApiError> {
        self.delete_row("comments", "Comment not found", id)
    }

    // ── Shared ──────────────────────────────────────────────────────

    fn delete_row(&self, table: &str, missing: &str, id: i64) -> Result<i64, ApiError> {
        if id == 0 {
            return Err(ApiError::validation("ID is required"));
        }
        let conn = self.db.conn()?;
        // Table names come from the fixed call sites above, never from input.
        let deleted = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
        if deleted == 0 {
            return Err(ApiError::not_found(missing));
        }
        Ok(id)
    }
}

// ── Row mappers ─────────────────────────────────────────────────────

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        kind: row.get(4)?,
        birthday: row.get(5)?,
        budget_min: row.get(6)?,
        budget_max: row.get(7)?,
        reminder_date: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        interest: row.get(4)?,
        follow_up_date: row.get(5)?,
        status: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn property_from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
    Ok(Property {
        id: row.get(0)?,
        title: row.get(1)?,
        price: row.get(2)?,
        kind: row.get(3)?,
        status: row.get(4)?,
        bedrooms: row.get(5)?,
        bathrooms: row.get(6)?,
        size: row.get(7)?,
        location: row.get(8)?,
        description: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn reminder_from_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        title: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        kind: row.get(4)?,
        related_client: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        related_to: row.get(3)?,
        content: row.get(4)?,
        date: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, RecordStore) {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(&tmp.path().join("crm.db")).unwrap();
        (tmp, RecordStore::new(db))
    }

    fn sample_client(email: &str) -> NewClient {
        NewClient {
            name: "Ada Buyer".into(),
            phone: "555-0100".into(),
            email: email.into(),
            kind: "buyer".into(),
            birthday: None,
            budget_min: 100_000,
            budget_max: 250_000,
            reminder_date: None,
            notes: Some("prefers the waterfront".into()),
        }
    }

    #[test]
    fn client_crud_round_trip() {
        let (_tmp, store) = test_store();

        let created = store.create_client(&sample_client("a@b.com")).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.budget_max, 250_000);

        let listed = store.list_clients().unwrap();
        assert_eq!(listed.len(), 1);

        let mut fields = sample_client("a@b.com");
        fields.name = "Ada Renamed".into();
        let updated = store
            .update_client(&UpdateClient {
                id: created.id,
                fields,
            })
            .unwrap();
        assert_eq!(updated.name, "Ada Renamed");

        assert_eq!(store.delete_client(created.id).unwrap(), created.id);
        assert!(store.list_clients().unwrap().is_empty());
    }

    #[test]
    fn duplicate_client_email_conflicts() {
        let (_tmp, store) = test_store();

        store.create_client(&sample_client("a@b.com")).unwrap();
        let err = store.create_client(&sample_client("a@b.com")).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.to_string(), "Client with this email already exists");
    }

    #[test]
    fn update_cannot_steal_another_clients_email() {
        let (_tmp, store) = test_store();

        store.create_client(&sample_client("first@b.com")).unwrap();
        let second = store.create_client(&sample_client("second@b.com")).unwrap();

        let err = store
            .update_client(&UpdateClient {
                id: second.id,
                fields: sample_client("first@b.com"),
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn missing_required_client_fields_fail_validation() {
        let (_tmp, store) = test_store();

        let mut input = sample_client("a@b.com");
        input.phone = String::new();
        let err = store.create_client(&input).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.to_string().starts_with("Missing required fields"));
    }

    #[test]
    fn update_and_delete_missing_rows_are_not_found() {
        let (_tmp, store) = test_store();

        let err = store
            .update_client(&UpdateClient {
                id: 9999,
                fields: sample_client("a@b.com"),
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = store.delete_lead(9999).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn leads_sort_by_follow_up_date() {
        let (_tmp, store) = test_store();

        for (name, date) in [("Late", "2026-09-20"), ("Soon", "2026-09-01")] {
            store
                .create_lead(&NewLead {
                    name: name.into(),
                    phone: "555-0101".into(),
                    email: None,
                    interest: "house".into(),
                    follow_up_date: date.into(),
                    status: "new".into(),
                    notes: None,
                })
                .unwrap();
        }

        let leads = store.list_leads().unwrap();
        assert_eq!(leads[0].name, "Soon");
        assert_eq!(leads[1].name, "Late");
    }

    #[test]
    fn property_requires_price() {
        let (_tmp, store) = test_store();

        let err = store
            .create_property(&NewProperty {
                title: "Loft".into(),
                price: None,
                kind: "apartment".into(),
                status: "available".into(),
                bedrooms: 2,
                bathrooms: 1.5,
                size: 80,
                location: "Midtown".into(),
                description: None,
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn comment_date_defaults_to_today() {
        let (_tmp, store) = test_store();

        let comment = store
            .create_comment(&NewComment {
                title: "Viewing feedback".into(),
                category: "client".into(),
                related_to: None,
                content: "Liked the kitchen".into(),
                date: None,
            })
            .unwrap();
        assert_eq!(comment.date, today());
    }

    #[test]
    fn reminders_sort_by_date_then_time() {
        let (_tmp, store) = test_store();

        for (title, date, time) in [
            ("B", "2026-09-01", Some("14:00")),
            ("A", "2026-09-01", Some("09:00")),
            ("C", "2026-09-02", None),
        ] {
            store
                .create_reminder(&NewReminder {
                    title: title.into(),
                    date: date.into(),
                    time: time.map(Into::into),
                    kind: "call".into(),
                    related_client: None,
                    notes: None,
                })
                .unwrap();
        }

        let reminders = store.list_reminders().unwrap();
        let titles: Vec<_> = reminders.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C"]);
    }
}
