use crate::client::api_client::{ClientError, ResourceApi};
use crate::client::events::{ChangeEvent, ChangeNotifier, ChangeType};
use crate::client::local_store::{LocalStore, ACTIVITY_LOGS_KEY};
use crate::client::seed;
use crate::models::{ActivityEntry, Resource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Where a record stands relative to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    Confirmed,
    /// Applied locally, server call in flight.
    Pending,
    /// The server refused or could not be reached; the record is out of sync.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<R> {
    pub record: R,
    pub state: SyncState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Api,
    LocalCache,
    Seed,
}

struct Entries<R> {
    records: Vec<Tracked<R>>,
    /// Local ids of confirmed creates, mapped to the id the server assigned.
    aliases: HashMap<String, String>,
}

impl<R: Resource> Entries<R> {
    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|t| t.record.meta().id == id)
    }

    fn replace(&mut self, id: &str, tracked: Tracked<R>) {
        if let Some(index) = self.position(id) {
            self.records[index] = tracked;
        }
    }
}

/// In-memory working copy of one resource kind with a local mirror and
/// optimistic mutations.
///
/// Every mutation is applied immediately, written to the local store and
/// announced once on the kind's change channel before the server is called.
/// If the server call fails, updates and deletes are reverted (and announced
/// again) while creates stay in place marked [`SyncState::Failed`].
pub struct ResourceCache<R: Resource, A: ResourceApi, S: LocalStore> {
    api: Arc<A>,
    store: Arc<S>,
    notifier: Arc<ChangeNotifier>,
    entries: Mutex<Entries<R>>,
    detached: AtomicBool,
}

impl<R: Resource, A: ResourceApi, S: LocalStore> ResourceCache<R, A, S> {
    pub fn new(api: Arc<A>, store: Arc<S>, notifier: Arc<ChangeNotifier>) -> Self {
        ResourceCache {
            api,
            store,
            notifier,
            entries: Mutex::new(Entries { records: Vec::new(), aliases: HashMap::new() }),
            detached: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<R>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            log::error!("{} cache lock was poisoned; continuing with its data.", R::KIND.module_name());
            poisoned.into_inner()
        })
    }

    pub fn records(&self) -> Vec<R> {
        self.lock().records.iter().map(|t| t.record.clone()).collect()
    }

    pub fn tracked(&self) -> Vec<Tracked<R>> {
        self.lock().records.clone()
    }

    pub fn state_of(&self, id: &str) -> Option<SyncState> {
        let entries = self.lock();
        let id = entries.aliases.get(id).map(String::as_str).unwrap_or(id);
        entries.position(id).map(|i| entries.records[i].state.clone())
    }

    /// Stops applying server results; used when the owning view goes away
    /// while requests are still in flight.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    fn announce(&self, id: &str, change: ChangeType) {
        self.notifier.publish(ChangeEvent { kind: R::KIND, id: id.to_string(), change });
    }

    /// Rewrites the local mirror. Failures are logged; the mirror is secondary.
    fn mirror(&self) {
        let snapshot = self.records();
        let result = serde_json::to_value(&snapshot)
            .map_err(|e| ClientError::LocalStore(e.to_string()))
            .and_then(|value| self.store.write(R::KIND.collection(), &value));
        if let Err(e) = result {
            log::warn!("Could not update the local {} cache: {}", R::KIND.collection(), e);
        }
    }

    fn read_mirror(&self) -> Option<Vec<R>> {
        match self.store.read(R::KIND.collection()) {
            Ok(Some(value)) => match serde_json::from_value::<Vec<R>>(value) {
                Ok(records) => Some(records),
                Err(e) => {
                    log::warn!("Ignoring unreadable local {} cache: {}", R::KIND.collection(), e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Could not read the local {} cache: {}", R::KIND.collection(), e);
                None
            }
        }
    }

    fn replace_all(&self, records: Vec<R>) {
        let mut entries = self.lock();
        entries.records = records
            .into_iter()
            .map(|record| Tracked { record, state: SyncState::Confirmed })
            .collect();
        entries.aliases.clear();
    }

    /// Loads from the API, else the local cache, else the bundled seed
    /// (which is then persisted so the next offline load finds it).
    pub async fn load(&self) -> Result<LoadSource, ClientError> {
        match self.api.list::<R>().await {
            Ok(records) => {
                if !self.is_detached() {
                    self.replace_all(records);
                    self.mirror();
                }
                Ok(LoadSource::Api)
            }
            Err(e) => {
                log::warn!("Loading {} from the server failed ({}); falling back to the local cache.", R::KIND.collection(), e);
                if let Some(cached) = self.read_mirror().filter(|records| !records.is_empty()) {
                    self.replace_all(cached);
                    return Ok(LoadSource::LocalCache);
                }
                let seeded = seed::seed_records::<R>().map_err(|e| ClientError::Decode(e.to_string()))?;
                self.replace_all(seeded);
                self.mirror();
                Ok(LoadSource::Seed)
            }
        }
    }

    /// Creates the record if it has no server id yet, otherwise updates it.
    pub async fn save(&self, mut record: R) -> Result<R, ClientError> {
        // A local id whose create was confirmed now refers to the server record.
        let confirmed = {
            let entries = self.lock();
            entries.aliases.get(&record.meta().id).and_then(|server_id| {
                entries.position(server_id).map(|i| entries.records[i].record.meta().clone())
            })
        };
        if let Some(meta) = confirmed {
            *record.meta_mut() = meta;
        }

        if record.meta().has_server_id() {
            self.update_existing(record).await
        } else {
            self.create_new(record).await
        }
    }

    async fn create_new(&self, mut record: R) -> Result<R, ClientError> {
        if record.meta().id.is_empty() {
            record.meta_mut().id = format!("local-{}", Uuid::new_v4());
        }
        let local_id = record.meta().id.clone();
        {
            let mut entries = self.lock();
            let tracked = Tracked { record: record.clone(), state: SyncState::Pending };
            match entries.position(&local_id) {
                Some(index) => entries.records[index] = tracked,
                None => entries.records.push(tracked),
            }
        }
        self.mirror();
        self.announce(&local_id, ChangeType::Created);

        let result = self.api.create(&record).await;
        if self.is_detached() {
            return result;
        }
        match result {
            Ok(created) => {
                {
                    let mut entries = self.lock();
                    entries.replace(&local_id, Tracked { record: created.clone(), state: SyncState::Confirmed });
                    entries.aliases.insert(local_id, created.meta().id.clone());
                }
                self.mirror();
                Ok(created)
            }
            Err(e) => {
                log::warn!("Creating {} '{}' failed; kept locally as unsynced: {}", R::KIND.noun(), record.label(), e);
                {
                    let mut entries = self.lock();
                    if let Some(index) = entries.position(&local_id) {
                        entries.records[index].state = SyncState::Failed(e.to_string());
                    }
                }
                self.mirror();
                self.announce(&local_id, ChangeType::Updated);
                Err(e)
            }
        }
    }

    async fn update_existing(&self, record: R) -> Result<R, ClientError> {
        let id = record.meta().id.clone();
        let previous = {
            let mut entries = self.lock();
            let tracked = Tracked { record: record.clone(), state: SyncState::Pending };
            match entries.position(&id) {
                Some(index) => Some(std::mem::replace(&mut entries.records[index], tracked)),
                None => {
                    entries.records.push(tracked);
                    None
                }
            }
        };
        self.mirror();
        self.announce(&id, ChangeType::Updated);

        let result = self.api.update(&record).await;
        if self.is_detached() {
            return result;
        }
        match result {
            Ok(updated) => {
                self.lock().replace(&id, Tracked { record: updated.clone(), state: SyncState::Confirmed });
                self.mirror();
                Ok(updated)
            }
            Err(e) => {
                log::warn!("Updating {} {} failed; reverting local change: {}", R::KIND.noun(), id, e);
                {
                    let mut entries = self.lock();
                    match previous {
                        Some(prev) => entries.replace(&id, prev),
                        None => {
                            if let Some(index) = entries.position(&id) {
                                entries.records.remove(index);
                            }
                        }
                    }
                }
                self.mirror();
                self.announce(&id, ChangeType::Updated);
                Err(e)
            }
        }
    }

    pub async fn remove(&self, id: &str) -> Result<(), ClientError> {
        let (id, index, removed) = {
            let mut entries = self.lock();
            let id = entries.aliases.get(id).cloned().unwrap_or_else(|| id.to_string());
            let index = entries
                .position(&id)
                .ok_or_else(|| ClientError::NotFound(format!("No {} with id {} in the cache.", R::KIND.noun(), id)))?;
            let removed = entries.records.remove(index);
            (id, index, removed)
        };
        self.mirror();
        self.announce(&id, ChangeType::Deleted);

        // Never reached the server, nothing to delete there.
        if !removed.record.meta().has_server_id() {
            return Ok(());
        }

        let result = self.api.delete::<R>(&id).await;
        if self.is_detached() {
            return result;
        }
        match result {
            Ok(()) => Ok(()),
            Err(ClientError::NotFound(msg)) => {
                log::info!("{} {} was already gone on the server: {}", R::KIND.noun(), id, msg);
                Ok(())
            }
            Err(e) => {
                log::warn!("Deleting {} {} failed; restoring it: {}", R::KIND.noun(), id, e);
                {
                    let mut entries = self.lock();
                    let at = index.min(entries.records.len());
                    entries.records.insert(at, removed);
                }
                self.mirror();
                self.announce(&id, ChangeType::Created);
                Err(e)
            }
        }
    }
}

/// Guards a form against double submission while its save is in flight.
#[derive(Debug, Default)]
pub struct FormGuard {
    busy: AtomicBool,
}

/// Held for the duration of one submission; releases the guard on drop.
pub struct Submission<'a> {
    guard: &'a FormGuard,
}

impl FormGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Result<Submission<'_>, ClientError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Submission { guard: self })
            .map_err(|_| ClientError::Busy)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// Fetches the activity feed, mirroring it locally; offline it serves the
/// last mirrored copy (or nothing).
pub async fn load_activity_log<A: ResourceApi, S: LocalStore>(
    api: &A,
    store: &S,
    limit: u32,
) -> Result<Vec<ActivityEntry>, ClientError> {
    match api.activity(limit).await {
        Ok(entries) => {
            let mirrored = serde_json::to_value(&entries)
                .map_err(|e| ClientError::LocalStore(e.to_string()))
                .and_then(|value| store.write(ACTIVITY_LOGS_KEY, &value));
            if let Err(e) = mirrored {
                log::warn!("Could not update the local activity cache: {}", e);
            }
            Ok(entries)
        }
        Err(e) => {
            log::warn!("Loading activity from the server failed ({}); using the local cache.", e);
            match store.read(ACTIVITY_LOGS_KEY)? {
                Some(value) => serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string())),
                None => Ok(Vec::new()),
            }
        }
    }
}
