//! SQL migration definitions for the crmsync database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: crm_clients, crm_contacts, crm_client_journey",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- CRM clients, one per case-folded company name
CREATE TABLE IF NOT EXISTS crm_clients (
    id            TEXT PRIMARY KEY,
    company_name  TEXT NOT NULL,
    name_key      TEXT NOT NULL,
    category      TEXT NOT NULL DEFAULT 'others',
    current_stage TEXT NOT NULL,
    notes         TEXT,
    source        TEXT NOT NULL,
    created_by    TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_crm_clients_name_key ON crm_clients(name_key);

-- Contacts owned by a client
CREATE TABLE IF NOT EXISTS crm_contacts (
    id         TEXT PRIMARY KEY,
    client_id  TEXT NOT NULL REFERENCES crm_clients(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    position   TEXT,
    email      TEXT,
    phone      TEXT,
    is_primary INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crm_contacts_client ON crm_contacts(client_id);

-- Append-only stage journey
CREATE TABLE IF NOT EXISTS crm_client_journey (
    id           TEXT PRIMARY KEY,
    client_id    TEXT NOT NULL REFERENCES crm_clients(id) ON DELETE CASCADE,
    from_stage   TEXT,
    to_stage     TEXT NOT NULL,
    source_table TEXT NOT NULL,
    source_id    TEXT,
    notes        TEXT NOT NULL,
    created_by   TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crm_client_journey_client ON crm_client_journey(client_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Journey lookups by upstream record",
            sql: r#"
CREATE INDEX IF NOT EXISTS idx_crm_client_journey_source
    ON crm_client_journey(source_table, source_id);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
