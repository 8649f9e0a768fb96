//! Core domain types for the CRM client registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CrmError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Declares a UUID v7 newtype identifier (time-sortable).
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new time-sortable identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a CRM client.
    ClientId
);
uuid_id!(
    /// Identifier of a client contact.
    ContactId
);
uuid_id!(
    /// Identifier of a journey log entry.
    JourneyId
);

// ---------------------------------------------------------------------------
// Closed tag enums
// ---------------------------------------------------------------------------

/// Declares a closed tag enum with a snake_case wire form, `Display` and `FromStr`.
macro_rules! tag_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $tag:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored/wire tag for this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CrmError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let needle = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| {
                        let expected: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        CrmError::validation(format!(
                            "unknown {} '{s}': expected one of {}",
                            $label,
                            expected.join(", ")
                        ))
                    })
            }
        }
    };
}

tag_enum!(
    /// Pipeline stage of a client. Any stage may follow any other.
    Stage, "stage" {
        Prospect => "prospect",
        Proposal => "proposal",
        Lead => "lead",
        Sales => "sales",
        ClosedWon => "closed_won",
        ClosedLost => "closed_lost",
    }
);

tag_enum!(
    /// Business category of a client.
    Category, "category" {
        Government => "government",
        Ngo => "ngo",
        Media => "media",
        Accommodation => "accommodation",
        TourOperator => "tour_operator",
        /// State-owned enterprise.
        Bumn => "bumn",
        Transportation => "transportation",
        /// Food and beverage.
        Fnb => "fnb",
        Attraction => "attraction",
        TourismVillage => "tourism_village",
        HospitalitySuppliers => "hospitality_suppliers",
        /// Catch-all when nothing more specific applies.
        Others => "others",
    }
);

impl Default for Category {
    fn default() -> Self {
        Category::Others
    }
}

tag_enum!(
    /// Upstream business-development table a sync originates from.
    SourceTable, "source table" {
        BdProspects => "bd_prospects",
        BdProposals => "bd_proposals",
        BdLeads => "bd_leads",
        BdSales => "bd_sales",
        BdMeetings => "bd_meetings",
    }
);

impl SourceTable {
    /// Table name with an upstream prefix removed (`bd_leads` → `leads`).
    pub fn label(self, prefix: &str) -> &'static str {
        let name = self.as_str();
        match name.strip_prefix(prefix) {
            Some(rest) if !rest.is_empty() => rest,
            _ => name,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A CRM client as stored. Identity is the case-folded company name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    /// Company name as first synced.
    pub company_name: String,
    pub category: Category,
    pub current_stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Where the client came from (e.g. `leads`).
    pub source: String,
    /// Acting user that first synced the client.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new client.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub company_name: String,
    pub category: Category,
    pub current_stage: Stage,
    pub notes: Option<String>,
    pub source: String,
    pub created_by: String,
}

/// Normalized uniqueness key for a company name.
///
/// Full Unicode lower-casing, so `ACME CORP` and `acme corp` share a key.
pub fn company_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A person attached to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub client_id: ClientId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new contact.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub client_id: ClientId,
    pub name: String,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_primary: bool,
}

// ---------------------------------------------------------------------------
// JourneyEntry
// ---------------------------------------------------------------------------

/// Append-only log record of a stage sync for a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyEntry {
    pub id: JourneyId,
    pub client_id: ClientId,
    /// Stage before the sync; `None` for the creation entry.
    pub from_stage: Option<Stage>,
    pub to_stage: Stage,
    pub source_table: SourceTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub notes: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a journey entry.
#[derive(Debug, Clone)]
pub struct NewJourneyEntry {
    pub client_id: ClientId,
    pub from_stage: Option<Stage>,
    pub to_stage: Stage,
    pub source_table: SourceTable,
    pub source_id: Option<String>,
    pub notes: String,
    pub created_by: String,
}
