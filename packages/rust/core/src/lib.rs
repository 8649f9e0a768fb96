//! CRM reconciliation logic for crmsync.
//!
//! This crate mirrors business-development stage transitions into the CRM
//! client registry ([`sync::sync_to_crm`]) and classifies free-text industry
//! descriptions ([`category::map_industry_to_category`]).

pub mod category;
pub mod sync;

pub use category::{CATEGORY_RULES, CategoryRule, map_industry_to_category};
pub use sync::{ContactInfo, SyncOptions, SyncRequest, SyncResult, SyncWarning, sync_to_crm};
