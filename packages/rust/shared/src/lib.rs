//! Shared types, error model, and configuration for crmsync.
//!
//! This crate is the foundation depended on by all other crmsync crates.
//! It provides:
//! - [`CrmError`], the unified error type
//! - Domain types ([`Client`], [`Contact`], [`JourneyEntry`], [`Stage`], [`Category`])
//! - Configuration ([`AppConfig`], [`SyncConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseConfig, SyncConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_database_path,
};
pub use error::{CrmError, Result};
pub use types::{
    Category, Client, ClientId, Contact, ContactId, JourneyEntry, JourneyId, NewClient,
    NewContact, NewJourneyEntry, SourceTable, Stage, company_name_key,
};
