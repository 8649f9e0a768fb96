//! CRM stage-sync reconciliation.
//!
//! When a business-development record moves to a pipeline stage, the
//! matching CRM client is created or advanced and one journey entry is
//! appended. Steps run strictly in sequence against the store:
//!
//! 1. Look up the client by case-insensitive company name
//! 2. Advance an existing client's stage, or create the client (plus an
//!    optional primary contact)
//! 3. Append a journey entry, always
//!
//! Only the lookup and the client insert/update are fatal. Contact and
//! journey failures are logged and surfaced as [`SyncWarning`]s.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crmsync_shared::{
    Category, Client, ClientId, CrmError, NewClient, NewContact, NewJourneyEntry, Result,
    SourceTable, Stage, SyncConfig,
};
use crmsync_storage::CrmStore;

// ---------------------------------------------------------------------------
// Request, options & result
// ---------------------------------------------------------------------------

/// Contact details supplied with a sync. Only used when a client is created.
#[derive(Debug, Clone, Default)]
pub struct ContactInfo {
    pub name: String,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One stage transition of an upstream record, to be mirrored into the CRM.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// User performing the transition; recorded as creator.
    pub acting_user_id: String,
    /// Company name; required and matched case-insensitively.
    pub company_name: String,
    /// Category for a newly created client.
    pub category: Option<Category>,
    /// Primary contact for a newly created client.
    pub contact: Option<ContactInfo>,
    /// Stage the upstream record moved to.
    pub stage: Stage,
    pub source_table: SourceTable,
    /// Id of the upstream record.
    pub source_id: Option<String>,
    /// Free-text source label; derived from `source_table` when absent.
    pub source_label: Option<String>,
    pub notes: Option<String>,
}

impl SyncRequest {
    /// Minimal request; optional fields start empty.
    pub fn new(
        acting_user_id: impl Into<String>,
        company_name: impl Into<String>,
        stage: Stage,
        source_table: SourceTable,
    ) -> Self {
        Self {
            acting_user_id: acting_user_id.into(),
            company_name: company_name.into(),
            category: None,
            contact: None,
            stage,
            source_table,
            source_id: None,
            source_label: None,
            notes: None,
        }
    }
}

/// Reconciler settings, usually taken from the `[sync]` config section.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Prefix stripped from the source table name for the default source label.
    pub source_prefix: String,
    /// Category for new clients when the request carries none.
    pub default_category: Category,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            source_prefix: config.source_prefix.clone(),
            default_category: config.default_category,
        }
    }
}

/// A secondary write that failed without failing the sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncWarning {
    /// The primary contact of a new client could not be stored.
    ContactNotCreated { message: String },
    /// The journey entry for this sync could not be appended.
    JourneyNotRecorded { message: String },
}

impl std::fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContactNotCreated { message } => write!(f, "contact not created: {message}"),
            Self::JourneyNotRecorded { message } => write!(f, "journey not recorded: {message}"),
        }
    }
}

/// Outcome of [`sync_to_crm`]. Never an `Err`: fatal failures set `success = false`.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Whether this call created the client.
    pub is_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SyncWarning>,
}

impl SyncResult {
    fn failed(err: &CrmError) -> Self {
        Self {
            success: false,
            client_id: None,
            is_new: false,
            error: Some(err.to_string()),
            warnings: Vec::new(),
        }
    }

    /// Succeeded with every secondary write in place.
    pub fn is_complete(&self) -> bool {
        self.success && self.warnings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Mirror an upstream stage transition into the CRM.
#[instrument(skip_all, fields(company = %request.company_name, stage = %request.stage, source = %request.source_table))]
pub async fn sync_to_crm<S>(store: &S, request: &SyncRequest, options: &SyncOptions) -> SyncResult
where
    S: CrmStore + ?Sized,
{
    match reconcile(store, request, options).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "CRM sync failed");
            SyncResult::failed(&e)
        }
    }
}

/// Where the client ended up after step 2.
struct Resolved {
    client_id: ClientId,
    previous_stage: Option<Stage>,
    is_new: bool,
}

async fn reconcile<S>(store: &S, request: &SyncRequest, options: &SyncOptions) -> Result<SyncResult>
where
    S: CrmStore + ?Sized,
{
    let company_name = request.company_name.trim();
    if company_name.is_empty() {
        return Err(CrmError::validation("company name must not be empty"));
    }
    if request.acting_user_id.trim().is_empty() {
        return Err(CrmError::validation("acting user id must not be empty"));
    }

    let source_label = source_label(request, options);
    let mut warnings = Vec::new();

    let resolved = match store.find_client_by_name(company_name).await? {
        Some(existing) => advance_existing(store, existing, request.stage).await?,
        None => {
            let new_client = NewClient {
                company_name: company_name.to_string(),
                category: request.category.unwrap_or(options.default_category),
                current_stage: request.stage,
                notes: non_blank(request.notes.as_deref()),
                source: source_label.clone(),
                created_by: request.acting_user_id.clone(),
            };

            match store.insert_client(&new_client).await {
                Ok(client_id) => {
                    info!(%client_id, category = %new_client.category, "created CRM client");
                    if let Some(warning) = attach_primary_contact(store, &client_id, request).await
                    {
                        warnings.push(warning);
                    }
                    Resolved {
                        client_id,
                        previous_stage: None,
                        is_new: true,
                    }
                }
                Err(e) if e.is_conflict() => {
                    warn!(error = %e, "client created concurrently, continuing as existing");
                    let existing = store
                        .find_client_by_name(company_name)
                        .await?
                        .ok_or_else(|| {
                            CrmError::Conflict(format!(
                                "client '{company_name}' conflicted on insert but cannot be found"
                            ))
                        })?;
                    advance_existing(store, existing, request.stage).await?
                }
                Err(e) => return Err(e),
            }
        }
    };

    let entry = NewJourneyEntry {
        client_id: resolved.client_id.clone(),
        from_stage: resolved.previous_stage,
        to_stage: request.stage,
        source_table: request.source_table,
        source_id: non_blank(request.source_id.as_deref()),
        notes: journey_note(resolved.previous_stage, request.stage, &source_label),
        created_by: request.acting_user_id.clone(),
    };

    match store.insert_journey_entry(&entry).await {
        Ok(journey_id) => debug!(%journey_id, "journey entry appended"),
        Err(e) => {
            warn!(client_id = %resolved.client_id, error = %e, "failed to append journey entry");
            warnings.push(SyncWarning::JourneyNotRecorded {
                message: e.to_string(),
            });
        }
    }

    Ok(SyncResult {
        success: true,
        client_id: Some(resolved.client_id),
        is_new: resolved.is_new,
        error: None,
        warnings,
    })
}

/// Move an existing client to `stage`, skipping the write when it is already there.
async fn advance_existing<S>(store: &S, client: Client, stage: Stage) -> Result<Resolved>
where
    S: CrmStore + ?Sized,
{
    let previous = client.current_stage;
    if previous != stage {
        store
            .update_client_stage(&client.id, stage, Utc::now())
            .await?;
        info!(client_id = %client.id, from = %previous, to = %stage, "advanced CRM client stage");
    } else {
        debug!(client_id = %client.id, %stage, "client already at stage");
    }

    Ok(Resolved {
        client_id: client.id,
        previous_stage: Some(previous),
        is_new: false,
    })
}

/// Store the request's contact as the new client's primary contact.
async fn attach_primary_contact<S>(
    store: &S,
    client_id: &ClientId,
    request: &SyncRequest,
) -> Option<SyncWarning>
where
    S: CrmStore + ?Sized,
{
    let info = request.contact.as_ref()?;
    let name = non_blank(Some(info.name.as_str()))?;

    let contact = NewContact {
        client_id: client_id.clone(),
        name,
        position: non_blank(info.position.as_deref()),
        email: non_blank(info.email.as_deref()),
        phone: non_blank(info.phone.as_deref()),
        is_primary: true,
    };

    match store.insert_contact(&contact).await {
        Ok(contact_id) => {
            debug!(%contact_id, "primary contact created");
            None
        }
        Err(e) => {
            warn!(%client_id, error = %e, "failed to create primary contact");
            Some(SyncWarning::ContactNotCreated {
                message: e.to_string(),
            })
        }
    }
}

/// Explicit label, else the source table name without the configured prefix.
fn source_label(request: &SyncRequest, options: &SyncOptions) -> String {
    non_blank(request.source_label.as_deref())
        .unwrap_or_else(|| request.source_table.label(&options.source_prefix).to_string())
}

fn journey_note(previous: Option<Stage>, stage: Stage, source_label: &str) -> String {
    match previous {
        None => format!("Initial sync from {source_label} as {stage}"),
        Some(prev) if prev == stage => format!("Stage confirmed as {stage} via {source_label}"),
        Some(prev) => format!("Stage updated from {prev} to {stage} via {source_label}"),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::DateTime;
    use crmsync_shared::{Contact, ContactId, JourneyEntry, JourneyId};
    use crmsync_storage::Storage;
    use uuid::Uuid;

    /// Which store calls should fail.
    #[derive(Default)]
    struct Faults {
        lookup: bool,
        insert_client: bool,
        update_client: bool,
        contact: bool,
        journey: bool,
        /// Another writer inserts the same company just before our insert.
        rival_insert: Option<Stage>,
        /// Insert reports a name conflict but nothing is stored.
        phantom_conflict: bool,
    }

    /// Delegates to a real [`Storage`], failing selected operations.
    struct FaultyStore {
        inner: Storage,
        faults: Faults,
        client_writes: AtomicUsize,
    }

    impl FaultyStore {
        async fn new(faults: Faults) -> Self {
            Self {
                inner: test_storage().await,
                faults,
                client_writes: AtomicUsize::new(0),
            }
        }
    }

    fn injected(op: &str) -> CrmError {
        CrmError::Storage(format!("injected {op} failure"))
    }

    #[async_trait]
    impl CrmStore for FaultyStore {
        async fn find_client_by_name(&self, company_name: &str) -> Result<Option<Client>> {
            if self.faults.lookup {
                return Err(injected("lookup"));
            }
            self.inner.find_client_by_name(company_name).await
        }

        async fn get_client(&self, id: &ClientId) -> Result<Option<Client>> {
            self.inner.get_client(id).await
        }

        async fn list_clients(&self) -> Result<Vec<Client>> {
            self.inner.list_clients().await
        }

        async fn insert_client(&self, client: &NewClient) -> Result<ClientId> {
            self.client_writes.fetch_add(1, Ordering::SeqCst);
            if self.faults.insert_client {
                return Err(injected("insert_client"));
            }
            if self.faults.phantom_conflict {
                return Err(CrmError::Conflict(format!(
                    "crm_clients.name_key: {}",
                    client.company_name
                )));
            }
            if let Some(stage) = self.faults.rival_insert {
                let rival = NewClient {
                    current_stage: stage,
                    created_by: "rival".into(),
                    ..client.clone()
                };
                self.inner.insert_client(&rival).await?;
            }
            self.inner.insert_client(client).await
        }

        async fn update_client_stage(
            &self,
            id: &ClientId,
            stage: Stage,
            updated_at: DateTime<Utc>,
        ) -> Result<()> {
            self.client_writes.fetch_add(1, Ordering::SeqCst);
            if self.faults.update_client {
                return Err(injected("update_client_stage"));
            }
            self.inner.update_client_stage(id, stage, updated_at).await
        }

        async fn insert_contact(&self, contact: &NewContact) -> Result<ContactId> {
            if self.faults.contact {
                return Err(injected("insert_contact"));
            }
            self.inner.insert_contact(contact).await
        }

        async fn list_contacts(&self, client_id: &ClientId) -> Result<Vec<Contact>> {
            self.inner.list_contacts(client_id).await
        }

        async fn insert_journey_entry(&self, entry: &NewJourneyEntry) -> Result<JourneyId> {
            if self.faults.journey {
                return Err(injected("insert_journey_entry"));
            }
            self.inner.insert_journey_entry(entry).await
        }

        async fn list_journey(&self, client_id: &ClientId) -> Result<Vec<JourneyEntry>> {
            self.inner.list_journey(client_id).await
        }
    }

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("crmsync_sync_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn request(company: &str, stage: Stage) -> SyncRequest {
        let mut req = SyncRequest::new("user-1", company, stage, SourceTable::BdLeads);
        req.source_id = Some("lead-7".into());
        req
    }

    fn with_contact(mut req: SyncRequest) -> SyncRequest {
        req.contact = Some(ContactInfo {
            name: "Dana Scully".into(),
            position: Some("Procurement".into()),
            email: Some("dana@acme.test".into()),
            phone: Some("  ".into()),
        });
        req
    }

    #[tokio::test]
    async fn new_company_creates_client_and_first_entry() {
        let store = test_storage().await;
        let result = sync_to_crm(&store, &request("Acme Corp", Stage::Lead), &SyncOptions::default()).await;

        assert!(result.is_complete(), "{result:?}");
        assert!(result.is_new);
        let client_id = result.client_id.expect("client id");

        let clients = store.list_clients().await.unwrap();
        assert_eq!(clients.len(), 1);
        let client = &clients[0];
        assert_eq!(client.id, client_id);
        assert_eq!(client.current_stage, Stage::Lead);
        assert_eq!(client.category, Category::Others);
        assert_eq!(client.source, "leads");
        assert_eq!(client.created_by, "user-1");

        let journey = store.list_journey(&client_id).await.unwrap();
        assert_eq!(journey.len(), 1);
        assert_eq!(journey[0].from_stage, None);
        assert_eq!(journey[0].to_stage, Stage::Lead);
        assert_eq!(journey[0].source_table, SourceTable::BdLeads);
        assert_eq!(journey[0].source_id.as_deref(), Some("lead-7"));
        assert_eq!(journey[0].notes, "Initial sync from leads as lead");
    }

    #[tokio::test]
    async fn same_stage_logs_without_updating() {
        let store = test_storage().await;
        let opts = SyncOptions::default();
        let first = sync_to_crm(&store, &request("Acme Corp", Stage::Proposal), &opts).await;
        let client_id = first.client_id.unwrap();
        let before = store.get_client(&client_id).await.unwrap().unwrap();

        let second = sync_to_crm(&store, &request("Acme Corp", Stage::Proposal), &opts).await;
        assert!(second.success);
        assert!(!second.is_new);
        assert_eq!(second.client_id.as_ref(), Some(&client_id));

        let after = store.get_client(&client_id).await.unwrap().unwrap();
        assert_eq!(after.current_stage, Stage::Proposal);
        assert_eq!(after.updated_at, before.updated_at);

        let journey = store.list_journey(&client_id).await.unwrap();
        assert_eq!(journey.len(), 2);
        assert_eq!(journey[1].from_stage, Some(Stage::Proposal));
        assert_eq!(journey[1].to_stage, Stage::Proposal);
        assert_eq!(journey[1].notes, "Stage confirmed as proposal via leads");
    }

    #[tokio::test]
    async fn stage_change_updates_client_and_logs_transition() {
        let store = test_storage().await;
        let opts = SyncOptions::default();
        let first = sync_to_crm(&store, &request("Acme Corp", Stage::Prospect), &opts).await;
        let client_id = first.client_id.unwrap();

        let mut req = request("Acme Corp", Stage::Sales);
        req.source_table = SourceTable::BdSales;
        let second = sync_to_crm(&store, &req, &opts).await;
        assert!(second.is_complete());
        assert!(!second.is_new);

        let client = store.get_client(&client_id).await.unwrap().unwrap();
        assert_eq!(client.current_stage, Stage::Sales);
        assert_eq!(client.source, "leads");

        let journey = store.list_journey(&client_id).await.unwrap();
        assert_eq!(journey.len(), 2);
        assert_eq!(journey[1].from_stage, Some(Stage::Prospect));
        assert_eq!(journey[1].to_stage, Stage::Sales);
        assert_eq!(journey[1].source_table, SourceTable::BdSales);
        assert_eq!(journey[1].notes, "Stage updated from prospect to sales via sales");
    }

    #[tokio::test]
    async fn journey_from_stage_tracks_prior_stage() {
        let store = test_storage().await;
        let opts = SyncOptions::default();
        let stages = [Stage::Prospect, Stage::Lead, Stage::Lead, Stage::ClosedLost, Stage::Proposal];
        let mut client_id = None;
        for stage in stages {
            let result = sync_to_crm(&store, &request("Wayne Enterprises", stage), &opts).await;
            assert!(result.success);
            client_id = result.client_id;
        }

        let journey = store.list_journey(&client_id.unwrap()).await.unwrap();
        assert_eq!(journey.len(), stages.len());
        assert_eq!(journey[0].from_stage, None);
        for (i, entry) in journey.iter().enumerate().skip(1) {
            assert_eq!(entry.from_stage, Some(stages[i - 1]));
            assert_eq!(entry.to_stage, stages[i]);
        }
    }

    #[tokio::test]
    async fn name_matching_is_case_insensitive() {
        let store = test_storage().await;
        let opts = SyncOptions::default();
        let first = sync_to_crm(&store, &request("Acme Corp", Stage::Lead), &opts).await;
        let second = sync_to_crm(&store, &request("ACME CORP", Stage::Sales), &opts).await;

        assert!(second.success);
        assert!(!second.is_new);
        assert_eq!(first.client_id, second.client_id);

        let clients = store.list_clients().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].company_name, "Acme Corp");
    }

    #[tokio::test]
    async fn new_client_gets_primary_contact() {
        let store = test_storage().await;
        let mut req = with_contact(request("Acme Corp", Stage::Lead));
        req.category = Some(Category::Accommodation);
        req.notes = Some("Beachfront property".into());

        let result = sync_to_crm(&store, &req, &SyncOptions::default()).await;
        assert!(result.is_complete());
        let client_id = result.client_id.unwrap();

        let client = store.get_client(&client_id).await.unwrap().unwrap();
        assert_eq!(client.category, Category::Accommodation);
        assert_eq!(client.notes.as_deref(), Some("Beachfront property"));

        let contacts = store.list_contacts(&client_id).await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Dana Scully");
        assert!(contacts[0].is_primary);
        assert_eq!(contacts[0].phone, None);
    }

    #[tokio::test]
    async fn existing_client_ignores_contact() {
        let store = test_storage().await;
        let opts = SyncOptions::default();
        let first = sync_to_crm(&store, &request("Acme Corp", Stage::Lead), &opts).await;
        sync_to_crm(&store, &with_contact(request("Acme Corp", Stage::Sales)), &opts).await;

        let contacts = store.list_contacts(&first.client_id.unwrap()).await.unwrap();
        assert!(contacts.is_empty());
    }

    #[tokio::test]
    async fn blank_contact_name_creates_no_contact() {
        let store = test_storage().await;
        let mut req = with_contact(request("Acme Corp", Stage::Lead));
        if let Some(contact) = req.contact.as_mut() {
            contact.name = "   ".into();
        }
        let result = sync_to_crm(&store, &req, &SyncOptions::default()).await;
        assert!(result.is_complete());

        let contacts = store.list_contacts(&result.client_id.unwrap()).await.unwrap();
        assert!(contacts.is_empty());
    }

    #[tokio::test]
    async fn contact_failure_is_not_fatal() {
        let store = FaultyStore::new(Faults {
            contact: true,
            ..Faults::default()
        })
        .await;
        let req = with_contact(request("Acme Corp", Stage::Lead));

        let result = sync_to_crm(&store, &req, &SyncOptions::default()).await;
        assert!(result.success);
        assert!(result.is_new);
        assert!(!result.is_complete());
        assert!(matches!(
            result.warnings.as_slice(),
            [SyncWarning::ContactNotCreated { .. }]
        ));

        let client_id = result.client_id.expect("client id");
        assert!(store.get_client(&client_id).await.unwrap().is_some());
        assert_eq!(store.list_journey(&client_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn journey_failure_is_not_fatal() {
        let store = FaultyStore::new(Faults {
            journey: true,
            ..Faults::default()
        })
        .await;

        let result = sync_to_crm(&store, &request("Acme Corp", Stage::Lead), &SyncOptions::default()).await;
        assert!(result.success);
        assert!(matches!(
            result.warnings.as_slice(),
            [SyncWarning::JourneyNotRecorded { message }] if message.contains("injected")
        ));
        let client_id = result.client_id.unwrap();
        assert!(store.list_journey(&client_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_aborts_without_writes() {
        let store = FaultyStore::new(Faults {
            lookup: true,
            ..Faults::default()
        })
        .await;

        let result = sync_to_crm(&store, &request("Acme Corp", Stage::Lead), &SyncOptions::default()).await;
        assert!(!result.success);
        assert!(result.client_id.is_none());
        assert!(result.error.as_deref().unwrap().contains("injected lookup failure"));
        assert_eq!(store.client_writes.load(Ordering::SeqCst), 0);
        assert!(store.list_clients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn client_insert_failure_is_fatal() {
        let store = FaultyStore::new(Faults {
            insert_client: true,
            ..Faults::default()
        })
        .await;

        let result = sync_to_crm(&store, &request("Acme Corp", Stage::Lead), &SyncOptions::default()).await;
        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn client_update_failure_is_fatal() {
        let store = FaultyStore::new(Faults {
            update_client: true,
            ..Faults::default()
        })
        .await;
        let opts = SyncOptions::default();
        let first = sync_to_crm(&store, &request("Acme Corp", Stage::Lead), &opts).await;
        assert!(first.success);

        let second = sync_to_crm(&store, &request("Acme Corp", Stage::Sales), &opts).await;
        assert!(!second.success);

        let journey = store.list_journey(&first.client_id.unwrap()).await.unwrap();
        assert_eq!(journey.len(), 1);
    }

    #[tokio::test]
    async fn insert_conflict_takes_existing_path() {
        let store = FaultyStore::new(Faults {
            rival_insert: Some(Stage::Prospect),
            ..Faults::default()
        })
        .await;

        let req = with_contact(request("Acme Corp", Stage::Proposal));
        let result = sync_to_crm(&store, &req, &SyncOptions::default()).await;
        assert!(result.is_complete(), "{result:?}");
        assert!(!result.is_new);

        let clients = store.list_clients().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].created_by, "rival");
        assert_eq!(clients[0].current_stage, Stage::Proposal);

        let client_id = result.client_id.unwrap();
        assert!(store.list_contacts(&client_id).await.unwrap().is_empty());
        let journey = store.list_journey(&client_id).await.unwrap();
        assert_eq!(journey.len(), 1);
        assert_eq!(journey[0].from_stage, Some(Stage::Prospect));
    }

    #[tokio::test]
    async fn conflict_without_a_stored_client_fails() {
        let store = FaultyStore::new(Faults {
            phantom_conflict: true,
            ..Faults::default()
        })
        .await;

        let req = with_contact(request("Acme Corp", Stage::Lead));
        let result = sync_to_crm(&store, &req, &SyncOptions::default()).await;
        assert!(!result.success);
        assert!(result.client_id.is_none());
        let err = result.error.unwrap();
        assert!(err.contains("cannot be found"), "{err}");

        assert!(store.inner.list_clients().await.unwrap().is_empty());
        let journey = store
            .inner
            .list_journey_by_source(SourceTable::BdLeads, "lead-7")
            .await
            .unwrap();
        assert!(journey.is_empty());
    }

    #[tokio::test]
    async fn blank_company_or_user_is_rejected() {
        let store = FaultyStore::new(Faults::default()).await;
        let opts = SyncOptions::default();

        let result = sync_to_crm(&store, &request("   ", Stage::Lead), &opts).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("company name"));

        let mut req = request("Acme Corp", Stage::Lead);
        req.acting_user_id = String::new();
        let result = sync_to_crm(&store, &req, &opts).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("acting user"));

        assert_eq!(store.client_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn source_label_and_category_defaults() {
        let store = test_storage().await;
        let opts = SyncOptions {
            source_prefix: "bd_".into(),
            default_category: Category::Media,
        };

        let mut labelled = request("Initech", Stage::Lead);
        labelled.source_label = Some("Trade fair 2026".into());
        let result = sync_to_crm(&store, &labelled, &opts).await;
        let client = store.get_client(&result.client_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(client.source, "Trade fair 2026");
        assert_eq!(client.category, Category::Media);

        let mut meeting = request("Globex", Stage::Prospect);
        meeting.source_table = SourceTable::BdMeetings;
        let result = sync_to_crm(&store, &meeting, &opts).await;
        let client = store.get_client(&result.client_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(client.source, "meetings");
    }

    #[test]
    fn result_serializes_warnings_with_kind_tag() {
        let result = SyncResult {
            success: true,
            client_id: None,
            is_new: true,
            error: None,
            warnings: vec![SyncWarning::JourneyNotRecorded {
                message: "disk full".into(),
            }],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["warnings"][0]["kind"], "journey_not_recorded");
        assert!(json.get("error").is_none());
    }
}
