//! The store boundary the reconciler talks to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crmsync_shared::{
    Client, ClientId, Contact, ContactId, JourneyEntry, JourneyId, NewClient, NewContact,
    NewJourneyEntry, Result, Stage,
};

/// Table-oriented CRM store: lookups, inserts returning ids, and updates by id.
///
/// Each call is an independent round trip; there is no transaction spanning
/// several calls. Implementations must report a duplicate company name on
/// [`CrmStore::insert_client`] as [`crmsync_shared::CrmError::Conflict`].
#[async_trait]
pub trait CrmStore: Send + Sync {
    /// Case-insensitive exact match on company name. `Ok(None)` when absent.
    async fn find_client_by_name(&self, company_name: &str) -> Result<Option<Client>>;

    /// Fetch a client by id.
    async fn get_client(&self, id: &ClientId) -> Result<Option<Client>>;

    /// All clients, ordered by company name.
    async fn list_clients(&self) -> Result<Vec<Client>>;

    /// Insert a client and return its new id.
    async fn insert_client(&self, client: &NewClient) -> Result<ClientId>;

    /// Set a client's stage and updated timestamp.
    async fn update_client_stage(
        &self,
        id: &ClientId,
        stage: Stage,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Insert a contact owned by a client.
    async fn insert_contact(&self, contact: &NewContact) -> Result<ContactId>;

    /// Contacts of a client, in insertion order.
    async fn list_contacts(&self, client_id: &ClientId) -> Result<Vec<Contact>>;

    /// Append a journey entry.
    async fn insert_journey_entry(&self, entry: &NewJourneyEntry) -> Result<JourneyId>;

    /// Journey of a client, oldest first.
    async fn list_journey(&self, client_id: &ClientId) -> Result<Vec<JourneyEntry>>;
}
