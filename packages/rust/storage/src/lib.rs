//! libSQL storage layer for the CRM client registry.
//!
//! The [`Storage`] struct wraps an embedded libSQL database holding clients,
//! their contacts, and the append-only stage journey. It implements
//! [`CrmStore`], the boundary the reconciler is written against.
//!
//! **Access rules:**
//! - sync runs: read-write via [`Storage::open`]
//! - inspection commands: read-only via [`Storage::open_readonly`]

mod migrations;
mod store;

pub use store::CrmStore;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crmsync_shared::{
    Category, Client, ClientId, Contact, ContactId, CrmError, JourneyEntry, JourneyId, NewClient,
    NewContact, NewJourneyEntry, Result, SourceTable, Stage, company_name_key,
};
use libsql::{Connection, Database, params};

const CLIENT_COLUMNS: &str = "id, company_name, category, current_stage, notes, source, created_by, created_at, updated_at";
const CONTACT_COLUMNS: &str =
    "id, client_id, name, position, email, phone, is_primary, created_at";
const JOURNEY_COLUMNS: &str = "id, client_id, from_stage, to_stage, source_table, source_id, notes, created_by, created_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CrmError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CrmError::not_found(format!(
                "database {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CrmError::Storage(format!("migration v{} failed: {e}", migration.version))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CrmError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Journey entries produced by one upstream record, oldest first.
    pub async fn list_journey_by_source(
        &self,
        source_table: SourceTable,
        source_id: &str,
    ) -> Result<Vec<JourneyEntry>> {
        let sql = format!(
            "SELECT {JOURNEY_COLUMNS} FROM crm_client_journey
             WHERE source_table = ?1 AND source_id = ?2 ORDER BY rowid"
        );
        let mut rows = self
            .conn
            .query(&sql, params![source_table.as_str(), source_id])
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_journey_entry(&row)?);
        }
        Ok(results)
    }
}

#[async_trait]
impl CrmStore for Storage {
    async fn find_client_by_name(&self, company_name: &str) -> Result<Option<Client>> {
        let key = company_name_key(company_name);
        tracing::debug!(name_key = %key, "looking up client by name");

        let sql = format!("SELECT {CLIENT_COLUMNS} FROM crm_clients WHERE name_key = ?1");
        let mut rows = self
            .conn
            .query(&sql, params![key.as_str()])
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_client(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn get_client(&self, id: &ClientId) -> Result<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM crm_clients WHERE id = ?1");
        let mut rows = self
            .conn
            .query(&sql, params![id.to_string()])
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_client(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM crm_clients ORDER BY name_key");
        let mut rows = self.conn.query(&sql, params![]).await.map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_client(&row)?);
        }
        Ok(results)
    }

    async fn insert_client(&self, client: &NewClient) -> Result<ClientId> {
        self.check_writable()?;
        let id = ClientId::new();
        let now = Utc::now().to_rfc3339();
        let name = client.company_name.trim();
        self.conn
            .execute(
                "INSERT INTO crm_clients
                   (id, company_name, name_key, category, current_stage, notes, source, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id.to_string(),
                    name,
                    company_name_key(name),
                    client.category.as_str(),
                    client.current_stage.as_str(),
                    client.notes.as_deref(),
                    client.source.as_str(),
                    client.created_by.as_str(),
                    now.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    async fn update_client_stage(
        &self,
        id: &ClientId,
        stage: Stage,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "UPDATE crm_clients SET current_stage = ?1, updated_at = ?2 WHERE id = ?3",
                params![stage.as_str(), updated_at.to_rfc3339(), id.to_string()],
            )
            .await
            .map_err(db_err)?;

        if affected == 0 {
            return Err(CrmError::not_found(format!("client {id}")));
        }
        Ok(())
    }

    async fn insert_contact(&self, contact: &NewContact) -> Result<ContactId> {
        self.check_writable()?;
        let id = ContactId::new();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO crm_contacts (id, client_id, name, position, email, phone, is_primary, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.to_string(),
                    contact.client_id.to_string(),
                    contact.name.as_str(),
                    contact.position.as_deref(),
                    contact.email.as_deref(),
                    contact.phone.as_deref(),
                    i64::from(contact.is_primary),
                    now.as_str(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    async fn list_contacts(&self, client_id: &ClientId) -> Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM crm_contacts WHERE client_id = ?1 ORDER BY rowid"
        );
        let mut rows = self
            .conn
            .query(&sql, params![client_id.to_string()])
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_contact(&row)?);
        }
        Ok(results)
    }

    async fn insert_journey_entry(&self, entry: &NewJourneyEntry) -> Result<JourneyId> {
        self.check_writable()?;
        let id = JourneyId::new();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO crm_client_journey
                   (id, client_id, from_stage, to_stage, source_table, source_id, notes, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.to_string(),
                    entry.client_id.to_string(),
                    entry.from_stage.map(Stage::as_str),
                    entry.to_stage.as_str(),
                    entry.source_table.as_str(),
                    entry.source_id.as_deref(),
                    entry.notes.as_str(),
                    entry.created_by.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    async fn list_journey(&self, client_id: &ClientId) -> Result<Vec<JourneyEntry>> {
        let sql = format!(
            "SELECT {JOURNEY_COLUMNS} FROM crm_client_journey WHERE client_id = ?1 ORDER BY rowid"
        );
        let mut rows = self
            .conn
            .query(&sql, params![client_id.to_string()])
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_journey_entry(&row)?);
        }
        Ok(results)
    }
}

/// Map a libSQL error, surfacing unique-key violations as [`CrmError::Conflict`].
fn db_err(e: libsql::Error) -> CrmError {
    let message = e.to_string();
    if message.contains("UNIQUE constraint failed") {
        CrmError::Conflict(message)
    } else {
        CrmError::Storage(message)
    }
}

fn get_text(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx).map_err(db_err)
}

fn get_timestamp(row: &libsql::Row, idx: i32) -> Result<DateTime<Utc>> {
    let s = get_text(row, idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CrmError::Storage(format!("invalid date: {e}")))
}

fn get_id<T: std::str::FromStr<Err = uuid::Error>>(row: &libsql::Row, idx: i32) -> Result<T> {
    let s = get_text(row, idx)?;
    s.parse()
        .map_err(|e| CrmError::Storage(format!("invalid id '{s}': {e}")))
}

/// Parse a stored tag, reporting corruption as a storage error.
fn get_tag<T: std::str::FromStr<Err = CrmError>>(row: &libsql::Row, idx: i32) -> Result<T> {
    let s = get_text(row, idx)?;
    s.parse()
        .map_err(|e: CrmError| CrmError::Storage(format!("corrupt row: {e}")))
}

/// Convert a database row to a [`Client`].
fn row_to_client(row: &libsql::Row) -> Result<Client> {
    Ok(Client {
        id: get_id(row, 0)?,
        company_name: get_text(row, 1)?,
        category: get_tag::<Category>(row, 2)?,
        current_stage: get_tag::<Stage>(row, 3)?,
        notes: row.get::<String>(4).ok(),
        source: get_text(row, 5)?,
        created_by: get_text(row, 6)?,
        created_at: get_timestamp(row, 7)?,
        updated_at: get_timestamp(row, 8)?,
    })
}

/// Convert a database row to a [`Contact`].
fn row_to_contact(row: &libsql::Row) -> Result<Contact> {
    Ok(Contact {
        id: get_id(row, 0)?,
        client_id: get_id(row, 1)?,
        name: get_text(row, 2)?,
        position: row.get::<String>(3).ok(),
        email: row.get::<String>(4).ok(),
        phone: row.get::<String>(5).ok(),
        is_primary: row.get::<i64>(6).map_err(db_err)? != 0,
        created_at: get_timestamp(row, 7)?,
    })
}

/// Convert a database row to a [`JourneyEntry`].
fn row_to_journey_entry(row: &libsql::Row) -> Result<JourneyEntry> {
    let from_stage = match row.get::<String>(2).ok() {
        Some(s) => Some(
            s.parse::<Stage>()
                .map_err(|e| CrmError::Storage(format!("corrupt row: {e}")))?,
        ),
        None => None,
    };

    Ok(JourneyEntry {
        id: get_id(row, 0)?,
        client_id: get_id(row, 1)?,
        from_stage,
        to_stage: get_tag::<Stage>(row, 3)?,
        source_table: get_tag::<SourceTable>(row, 4)?,
        source_id: row.get::<String>(5).ok(),
        notes: get_text(row, 6)?,
        created_by: get_text(row, 7)?,
        created_at: get_timestamp(row, 8)?,
    })
}
