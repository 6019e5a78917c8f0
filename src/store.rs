//! Sync engine and collection store.
//!
//! `SyncStore` owns the in-memory copy of the four collections and
//! routes every mutation either to the remote document backend or
//! directly to memory plus the local durable cache. The operating mode
//! is fixed at startup: remote if a backend was configured and
//! reachable, otherwise local-only. There is no runtime failover.
//!
//! Remote mode is pessimistic across add/update/delete: no local
//! mutation happens until a subscription snapshot confirms it. Local
//! mode applies immediately and persists the new snapshot. Snapshot
//! notifications land on a bounded channel drained by the owner via
//! [`SyncStore::process_pending`] or [`SyncStore::process_next`]; each
//! drained notification wholesale-replaces one collection, so no reader
//! ever observes a half-replaced collection.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::auth::verify_secret;
use crate::backend::{
    BackendError, Document, DocumentBackend, Fields, HttpBackend, MemoryBackend,
};
use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::StoreError;
use crate::models::{
    Collection, NewParticipant, NewProgram, NewResult, NewTeam, Participant, ParticipantPatch,
    Program, ProgramPatch, ResultEntry, ResultPatch, Team, TeamPatch,
};

/// Buffer size for the snapshot notification channel.
/// Notifications are whole-collection replacements, so the drain loop
/// never falls far behind; 32 leaves headroom for four collections.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Length of the random suffix in locally synthesized ids.
const LOCAL_ID_SUFFIX_LEN: usize = 9;

/// Notifications from subscription forwarding tasks back to the owner.
enum StoreEvent {
    Snapshot {
        collection: Collection,
        docs: Vec<Document>,
        /// Cleared by [`SubscriptionHandle::cancel`]; snapshots from a
        /// cancelled subscription are dropped unapplied.
        active: Arc<AtomicBool>,
    },
    SubscriptionError {
        collection: Collection,
        error: BackendError,
    },
    /// A forwarding task stopped, after cancellation or because the
    /// backend closed the feed. Sent after the live count is dropped.
    Ended { collection: Collection },
}

/// Cancellation handle for one subscription. Independent subscriptions
/// to the same collection must each be cancelled separately.
#[derive(Debug)]
pub struct SubscriptionHandle {
    collection: Collection,
    active: Arc<AtomicBool>,
    stop: watch::Sender<bool>,
}

impl SubscriptionHandle {
    /// Stop further notifications. Idempotent; a second call is a
    /// no-op. Snapshots already in flight are dropped unapplied.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
        let _ = self.stop.send(true);
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn is_cancelled(&self) -> bool {
        !self.active.load(Ordering::SeqCst)
    }
}

/// The sync engine plus the collection store it guards.
///
/// All mutation takes `&mut self`, so one owner funnels every
/// operation; no locks are needed on the collections themselves.
pub struct SyncStore {
    backend: Option<Arc<dyn DocumentBackend>>,
    cache: CacheManager,

    results: Vec<ResultEntry>,
    programs: Vec<Program>,
    teams: Vec<Team>,
    participants: Vec<Participant>,

    is_authenticated: bool,
    admin_secret: Option<String>,

    events_tx: mpsc::Sender<StoreEvent>,
    events_rx: mpsc::Receiver<StoreEvent>,
    live_subscriptions: Arc<AtomicUsize>,
}

impl SyncStore {
    /// Open the store per the configuration: remote mode when the
    /// backend endpoint is set and reachable, local-only otherwise.
    /// Backend initialization failure demotes to local-only rather
    /// than aborting startup.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        let cache_dir = config
            .cache_dir()
            .map_err(|e| StoreError::Validation(format!("cache directory unavailable: {}", e)))?;

        let backend = match config.backend {
            Some(ref backend_config) => {
                let http = HttpBackend::new(backend_config)?;
                match http.probe().await {
                    Ok(()) => {
                        info!(url = %backend_config.base_url, "remote backend reachable, running in remote mode");
                        Some(Arc::new(http) as Arc<dyn DocumentBackend>)
                    }
                    Err(e) => {
                        warn!(error = %e, "backend unreachable, falling back to local-only mode");
                        None
                    }
                }
            }
            None => {
                info!("no backend configured, running in local-only mode");
                None
            }
        };

        let mut store = match backend {
            Some(backend) => Self::with_backend(cache_dir, backend)?,
            None => Self::local(cache_dir)?,
        };
        store.admin_secret = config.admin_secret.clone();
        Ok(store)
    }

    /// Local-only store: all persistence goes to the durable cache.
    pub fn local(cache_dir: PathBuf) -> Result<Self, StoreError> {
        Self::build(cache_dir, None)
    }

    /// Remote-mode store: the backend is the source of truth and the
    /// in-memory collections are a read replica.
    pub fn with_backend(
        cache_dir: PathBuf,
        backend: Arc<dyn DocumentBackend>,
    ) -> Result<Self, StoreError> {
        Self::build(cache_dir, Some(backend))
    }

    /// Remote-mode store over the in-process backend, for demos and
    /// tests.
    pub fn in_memory(cache_dir: PathBuf) -> Result<(Self, Arc<MemoryBackend>), StoreError> {
        let backend = Arc::new(MemoryBackend::new());
        let store = Self::with_backend(cache_dir, backend.clone())?;
        Ok((store, backend))
    }

    fn build(
        cache_dir: PathBuf,
        backend: Option<Arc<dyn DocumentBackend>>,
    ) -> Result<Self, StoreError> {
        let cache = CacheManager::new(cache_dir)?;
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let mut store = Self {
            backend,
            cache,
            results: Vec::new(),
            programs: Vec::new(),
            teams: Vec::new(),
            participants: Vec::new(),
            is_authenticated: false,
            admin_secret: None,
            events_tx,
            events_rx,
            live_subscriptions: Arc::new(AtomicUsize::new(0)),
        };
        store.load_from_cache();
        Ok(store)
    }

    pub fn set_admin_secret(&mut self, secret: Option<String>) {
        self.admin_secret = secret;
    }

    /// Whether a remote backend was configured at startup.
    pub fn is_remote(&self) -> bool {
        self.backend.is_some()
    }

    // =========================================================================
    // Warm start
    // =========================================================================

    /// Rehydrate collections and the authentication flag from the
    /// durable cache. In remote mode the first snapshot notification
    /// then wholesale-replaces the warm copy.
    fn load_from_cache(&mut self) {
        match self.cache.load_results() {
            Ok(Some(cached)) => {
                info!(count = cached.data.len(), age = %cached.age_display(), "warm-started results from cache");
                self.results = cached.data;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load cached results"),
        }
        match self.cache.load_programs() {
            Ok(Some(cached)) => self.programs = cached.data,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load cached programs"),
        }
        match self.cache.load_teams() {
            Ok(Some(cached)) => self.teams = cached.data,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load cached teams"),
        }
        match self.cache.load_participants() {
            Ok(Some(cached)) => self.participants = cached.data,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load cached participants"),
        }
        match self.cache.load_auth_flag() {
            Ok(Some(cached)) => self.is_authenticated = cached.data,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load cached auth flag"),
        }
    }

    // =========================================================================
    // Read-only views
    // =========================================================================

    pub fn results(&self) -> &[ResultEntry] {
        &self.results
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Publish a result. Remote mode submits and awaits the
    /// backend-assigned id, leaving memory untouched until a snapshot
    /// confirms; local mode synthesizes an id, prepends so the
    /// sequence stays most-recent-first, and persists.
    pub async fn add_result(&mut self, draft: NewResult) -> Result<String, StoreError> {
        validate_new_result(&draft)?;

        if let Some(ref backend) = self.backend {
            let mut fields = to_fields(&draft)?;
            fields.insert(
                "timestamp".to_string(),
                serde_json::json!(Utc::now().to_rfc3339()),
            );
            let id = backend.add_document(Collection::Results, fields).await?;
            debug!(id = %id, "result submitted to backend");
            return Ok(id);
        }

        let id = local_id(Collection::Results);
        let entry = draft.into_entry(id.clone(), Utc::now());
        self.results.insert(0, entry);
        self.cache.save_results(&self.results)?;
        Ok(id)
    }

    /// Merge a patch into a result. A missing id is a silent no-op,
    /// logged at debug level. Local edits stamp `edited_at` with
    /// max(now, timestamp) so it never precedes creation.
    pub async fn edit_result(&mut self, id: &str, patch: ResultPatch) -> Result<(), StoreError> {
        validate_result_patch(&patch)?;

        if let Some(ref backend) = self.backend {
            let mut fields = to_fields(&patch)?;
            fields.insert(
                "editedAt".to_string(),
                serde_json::json!(Utc::now().to_rfc3339()),
            );
            backend
                .update_document(Collection::Results, id, fields)
                .await?;
            return Ok(());
        }

        match self.results.iter_mut().find(|r| r.id == id) {
            Some(entry) => {
                patch.apply(entry);
                entry.edited_at = Some(monotonic_edit_stamp(entry.timestamp));
                self.cache.save_results(&self.results)?;
            }
            None => debug!(id = %id, "edit for unknown result ignored"),
        }
        Ok(())
    }

    /// Delete a result. Deleting an absent id is a silent no-op.
    pub async fn delete_result(&mut self, id: &str) -> Result<(), StoreError> {
        if let Some(ref backend) = self.backend {
            backend.delete_document(Collection::Results, id).await?;
            return Ok(());
        }

        let before = self.results.len();
        self.results.retain(|r| r.id != id);
        if self.results.len() == before {
            debug!(id = %id, "delete for unknown result ignored");
        } else {
            self.cache.save_results(&self.results)?;
        }
        Ok(())
    }

    /// Empty the results collection. Remote mode deletes every id in
    /// the current replica, stopping at the first failure; the replica
    /// may trail the backend, so entities created but not yet observed
    /// survive.
    pub async fn clear_results(&mut self) -> Result<(), StoreError> {
        if let Some(ref backend) = self.backend {
            let ids: Vec<String> = self.results.iter().map(|r| r.id.clone()).collect();
            info!(count = ids.len(), "clearing results on the backend");
            for id in ids {
                backend.delete_document(Collection::Results, &id).await?;
            }
            return Ok(());
        }

        self.results.clear();
        self.cache.save_results(&self.results)?;
        Ok(())
    }

    // =========================================================================
    // Programs
    // =========================================================================

    pub async fn add_program(&mut self, draft: NewProgram) -> Result<String, StoreError> {
        validate_new_program(&draft)?;

        if let Some(ref backend) = self.backend {
            let fields = to_fields(&draft)?;
            let id = backend.add_document(Collection::Programs, fields).await?;
            return Ok(id);
        }

        let id = local_id(Collection::Programs);
        self.programs.push(draft.into_entity(id.clone()));
        self.cache.save_programs(&self.programs)?;
        Ok(id)
    }

    pub async fn edit_program(&mut self, id: &str, patch: ProgramPatch) -> Result<(), StoreError> {
        if let Some(ref backend) = self.backend {
            let fields = to_fields(&patch)?;
            backend
                .update_document(Collection::Programs, id, fields)
                .await?;
            return Ok(());
        }

        match self.programs.iter_mut().find(|p| p.id == id) {
            Some(entity) => {
                patch.apply(entity);
                self.cache.save_programs(&self.programs)?;
            }
            None => debug!(id = %id, "edit for unknown program ignored"),
        }
        Ok(())
    }

    pub async fn delete_program(&mut self, id: &str) -> Result<(), StoreError> {
        if let Some(ref backend) = self.backend {
            backend.delete_document(Collection::Programs, id).await?;
            return Ok(());
        }

        let before = self.programs.len();
        self.programs.retain(|p| p.id != id);
        if self.programs.len() != before {
            self.cache.save_programs(&self.programs)?;
        }
        Ok(())
    }

    // =========================================================================
    // Teams
    // =========================================================================

    pub async fn add_team(&mut self, draft: NewTeam) -> Result<String, StoreError> {
        validate_new_team(&draft)?;

        if let Some(ref backend) = self.backend {
            let fields = to_fields(&draft)?;
            let id = backend.add_document(Collection::Teams, fields).await?;
            return Ok(id);
        }

        let id = local_id(Collection::Teams);
        self.teams.push(draft.into_entity(id.clone()));
        self.cache.save_teams(&self.teams)?;
        Ok(id)
    }

    pub async fn edit_team(&mut self, id: &str, patch: TeamPatch) -> Result<(), StoreError> {
        if let Some(ref backend) = self.backend {
            let fields = to_fields(&patch)?;
            backend
                .update_document(Collection::Teams, id, fields)
                .await?;
            return Ok(());
        }

        match self.teams.iter_mut().find(|t| t.id == id) {
            Some(entity) => {
                patch.apply(entity);
                self.cache.save_teams(&self.teams)?;
            }
            None => debug!(id = %id, "edit for unknown team ignored"),
        }
        Ok(())
    }

    pub async fn delete_team(&mut self, id: &str) -> Result<(), StoreError> {
        if let Some(ref backend) = self.backend {
            backend.delete_document(Collection::Teams, id).await?;
            return Ok(());
        }

        let before = self.teams.len();
        self.teams.retain(|t| t.id != id);
        if self.teams.len() != before {
            self.cache.save_teams(&self.teams)?;
        }
        Ok(())
    }

    // =========================================================================
    // Participants
    // =========================================================================

    pub async fn add_participant(&mut self, draft: NewParticipant) -> Result<String, StoreError> {
        validate_new_participant(&draft)?;

        if let Some(ref backend) = self.backend {
            let fields = to_fields(&draft)?;
            let id = backend
                .add_document(Collection::Participants, fields)
                .await?;
            return Ok(id);
        }

        let id = local_id(Collection::Participants);
        self.participants.push(draft.into_entity(id.clone()));
        self.cache.save_participants(&self.participants)?;
        Ok(id)
    }

    pub async fn edit_participant(
        &mut self,
        id: &str,
        patch: ParticipantPatch,
    ) -> Result<(), StoreError> {
        if let Some(ref backend) = self.backend {
            let fields = to_fields(&patch)?;
            backend
                .update_document(Collection::Participants, id, fields)
                .await?;
            return Ok(());
        }

        match self.participants.iter_mut().find(|p| p.id == id) {
            Some(entity) => {
                patch.apply(entity);
                self.cache.save_participants(&self.participants)?;
            }
            None => debug!(id = %id, "edit for unknown participant ignored"),
        }
        Ok(())
    }

    pub async fn delete_participant(&mut self, id: &str) -> Result<(), StoreError> {
        if let Some(ref backend) = self.backend {
            backend
                .delete_document(Collection::Participants, id)
                .await?;
            return Ok(());
        }

        let before = self.participants.len();
        self.participants.retain(|p| p.id != id);
        if self.participants.len() != before {
            self.cache.save_participants(&self.participants)?;
        }
        Ok(())
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Establish a live feed for one collection. Valid only in remote
    /// mode. Each notification wholesale-replaces the collection's
    /// in-memory slot once drained by the owner.
    pub async fn subscribe(
        &self,
        collection: Collection,
    ) -> Result<SubscriptionHandle, StoreError> {
        let backend = self.backend.as_ref().ok_or(StoreError::NoBackend)?;
        let mut subscription = backend.subscribe(collection).await?;

        let active = Arc::new(AtomicBool::new(true));
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let events_tx = self.events_tx.clone();
        let task_active = active.clone();
        let live = self.live_subscriptions.clone();
        live.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        // A send means cancel; a closed sender means the
                        // handle was dropped, which also ends the feed.
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    message = subscription.snapshots.recv() => match message {
                        Some(Ok(docs)) => {
                            let event = StoreEvent::Snapshot {
                                collection,
                                docs,
                                active: task_active.clone(),
                            };
                            if events_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(error)) => {
                            let event = StoreEvent::SubscriptionError { collection, error };
                            if events_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
            // Drop the live count before announcing, so a drained Ended
            // event observes the count already at its new value.
            live.fetch_sub(1, Ordering::SeqCst);
            let _ = events_tx.send(StoreEvent::Ended { collection }).await;
            debug!(collection = %collection, "subscription forwarding stopped");
        });

        Ok(SubscriptionHandle {
            collection,
            active,
            stop: stop_tx,
        })
    }

    /// Drain and apply every pending notification without blocking.
    /// Returns the number of snapshots applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.process_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Await the next notification and apply it. Returns the refreshed
    /// collection, or `None` once no subscription remains live and the
    /// queued notifications are drained.
    pub async fn process_next(&mut self) -> Option<Collection> {
        loop {
            let event = if self.live_subscriptions.load(Ordering::SeqCst) == 0 {
                // Nothing will be produced anymore; only the queue is left.
                self.events_rx.try_recv().ok()?
            } else {
                self.events_rx.recv().await?
            };
            let collection = match event {
                StoreEvent::Snapshot { collection, .. } => Some(collection),
                _ => None,
            };
            if self.process_event(event) {
                return collection;
            }
        }
    }

    fn process_event(&mut self, event: StoreEvent) -> bool {
        match event {
            StoreEvent::Snapshot {
                collection,
                docs,
                active,
            } => {
                if !active.load(Ordering::SeqCst) {
                    debug!(collection = %collection, "dropping snapshot from cancelled subscription");
                    return false;
                }
                self.apply_snapshot(collection, docs);
                true
            }
            StoreEvent::SubscriptionError { collection, error } => {
                // Keep the last good snapshot; no automatic re-subscribe.
                warn!(collection = %collection, error = %error, "subscription stream failure");
                false
            }
            StoreEvent::Ended { collection } => {
                debug!(collection = %collection, "subscription ended");
                false
            }
        }
    }

    /// Wholesale-replace one collection with a backend snapshot and
    /// persist the new copy. Entities that fail to parse are skipped.
    fn apply_snapshot(&mut self, collection: Collection, docs: Vec<Document>) {
        debug!(collection = %collection, count = docs.len(), "applying snapshot");
        match collection {
            Collection::Results => {
                self.results = parse_documents(collection, docs);
                if let Err(e) = self.cache.save_results(&self.results) {
                    warn!(error = %e, "failed to cache results snapshot");
                }
            }
            Collection::Programs => {
                self.programs = parse_documents(collection, docs);
                if let Err(e) = self.cache.save_programs(&self.programs) {
                    warn!(error = %e, "failed to cache programs snapshot");
                }
            }
            Collection::Teams => {
                self.teams = parse_documents(collection, docs);
                if let Err(e) = self.cache.save_teams(&self.teams) {
                    warn!(error = %e, "failed to cache teams snapshot");
                }
            }
            Collection::Participants => {
                self.participants = parse_documents(collection, docs);
                if let Err(e) = self.cache.save_participants(&self.participants) {
                    warn!(error = %e, "failed to cache participants snapshot");
                }
            }
        }
    }

    // =========================================================================
    // Authentication flag
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Compare the supplied secret against the configured admin secret
    /// and set the authentication flag on success. The flag is
    /// persisted so a warm start restores it.
    pub fn login(&mut self, secret: &str) -> bool {
        if verify_secret(self.admin_secret.as_deref(), secret) {
            self.is_authenticated = true;
            if let Err(e) = self.cache.save_auth_flag(true) {
                warn!(error = %e, "failed to persist auth flag");
            }
            info!("admin login succeeded");
            true
        } else {
            debug!("admin login rejected");
            false
        }
    }

    pub fn logout(&mut self) {
        self.is_authenticated = false;
        if let Err(e) = self.cache.save_auth_flag(false) {
            warn!(error = %e, "failed to persist auth flag");
        }
    }

    // =========================================================================
    // Internals shared with the transfer codec
    // =========================================================================

    pub(crate) fn backend(&self) -> Option<&Arc<dyn DocumentBackend>> {
        self.backend.as_ref()
    }

    pub(crate) fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub(crate) fn replace_results(&mut self, results: Vec<ResultEntry>) {
        self.results = results;
    }

    pub(crate) fn replace_programs(&mut self, programs: Vec<Program>) {
        self.programs = programs;
    }

    pub(crate) fn replace_teams(&mut self, teams: Vec<Team>) {
        self.teams = teams;
    }

    pub(crate) fn replace_participants(&mut self, participants: Vec<Participant>) {
        self.participants = participants;
    }
}

/// Serialize a draft or patch into the wire field map.
pub(crate) fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Validation(format!(
            "expected an object payload, got {}",
            other
        ))),
        Err(e) => Err(StoreError::Validation(e.to_string())),
    }
}

/// Synthesize a local id: `{collection}_{millis}_{random-suffix}`.
fn local_id(collection: Collection) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LOCAL_ID_SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!(
        "{}_{}_{}",
        collection.id_prefix(),
        Utc::now().timestamp_millis(),
        suffix
    )
}

/// `edited_at` must never precede `timestamp`, even under clock skew.
fn monotonic_edit_stamp(created: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(created)
}

fn parse_documents<T: serde::de::DeserializeOwned>(
    collection: Collection,
    docs: Vec<Document>,
) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match serde_json::from_value(doc.into_value()) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(collection = %collection, id = %id, error = %e, "skipping malformed snapshot entity");
                    None
                }
            }
        })
        .collect()
}

fn validate_new_result(draft: &NewResult) -> Result<(), StoreError> {
    if draft.points == 0 {
        return Err(StoreError::Validation(
            "points must be a positive integer".to_string(),
        ));
    }
    if draft.program_id.is_empty() || draft.participant_id.is_empty() || draft.team_id.is_empty() {
        return Err(StoreError::Validation(
            "programId, participantId and teamId are required".to_string(),
        ));
    }
    Ok(())
}

fn validate_result_patch(patch: &ResultPatch) -> Result<(), StoreError> {
    if patch.points == Some(0) {
        return Err(StoreError::Validation(
            "points must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

fn validate_new_program(draft: &NewProgram) -> Result<(), StoreError> {
    if draft.name.is_empty() {
        return Err(StoreError::Validation("program name is required".to_string()));
    }
    if draft.max_points == 0 {
        return Err(StoreError::Validation(
            "maxPoints must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

fn validate_new_team(draft: &NewTeam) -> Result<(), StoreError> {
    if draft.name.is_empty() || draft.color.is_empty() {
        return Err(StoreError::Validation(
            "team name and color are required".to_string(),
        ));
    }
    Ok(())
}

fn validate_new_participant(draft: &NewParticipant) -> Result<(), StoreError> {
    if draft.name.is_empty() || draft.team_id.is_empty() {
        return Err(StoreError::Validation(
            "participant name and teamId are required".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, Place};
    use std::time::Duration;
    use tokio::time::timeout;

    fn draft(team: &str, points: u32) -> NewResult {
        NewResult {
            program_id: "p1".to_string(),
            participant_id: "u1".to_string(),
            team_id: team.to_string(),
            points,
            grade: Grade::A,
            place: Place::First,
        }
    }

    fn local_store() -> (SyncStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SyncStore::local(dir.path().to_path_buf()).unwrap();
        (store, dir)
    }

    async fn next_applied(store: &mut SyncStore) -> Collection {
        timeout(Duration::from_secs(1), store.process_next())
            .await
            .expect("timed out waiting for a snapshot")
            .expect("subscription channel closed")
    }

    #[tokio::test]
    async fn test_local_add_prepends_with_fresh_id_and_timestamp() {
        let (mut store, _dir) = local_store();

        let first = store.add_result(draft("t1", 50)).await.unwrap();
        let second = store.add_result(draft("t1", 60)).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.results().len(), 2);
        // Most-recent-first
        assert_eq!(store.results()[0].id, second);
        assert_eq!(store.results()[1].id, first);

        let entry = &store.results()[1];
        assert!(entry.id.starts_with("result_"));
        assert_eq!(entry.points, 50);
        assert_eq!(entry.team_id, "t1");
        assert_eq!(entry.grade, Grade::A);
        assert_eq!(entry.place, Place::First);
        assert!(entry.edited_at.is_none());
    }

    #[tokio::test]
    async fn test_local_edit_sets_edited_at_and_keeps_timestamp() {
        let (mut store, _dir) = local_store();
        let id = store.add_result(draft("t1", 50)).await.unwrap();
        let created = store.results()[0].timestamp;

        let patch = ResultPatch {
            points: Some(75),
            ..Default::default()
        };
        store.edit_result(&id, patch).await.unwrap();

        let entry = &store.results()[0];
        assert_eq!(entry.points, 75);
        assert_eq!(entry.timestamp, created);
        let edited_at = entry.edited_at.expect("edit must stamp editedAt");
        assert!(edited_at >= created);
    }

    #[tokio::test]
    async fn test_edit_missing_id_is_a_silent_no_op() {
        let (mut store, _dir) = local_store();
        store.add_result(draft("t1", 50)).await.unwrap();
        let before = store.results().to_vec();

        let patch = ResultPatch {
            points: Some(75),
            ..Default::default()
        };
        store.edit_result("missing", patch).await.unwrap();
        assert_eq!(store.results(), &before[..]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (mut store, _dir) = local_store();
        let id = store.add_result(draft("t1", 50)).await.unwrap();

        store.delete_result(&id).await.unwrap();
        assert!(store.results().is_empty());
        // Second delete: no error, no change
        store.delete_result(&id).await.unwrap();
        assert!(store.results().is_empty());
    }

    #[tokio::test]
    async fn test_zero_points_rejected_at_the_boundary() {
        let (mut store, _dir) = local_store();
        let err = store.add_result(draft("t1", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.results().is_empty());
    }

    #[tokio::test]
    async fn test_warm_start_restores_collections_and_auth_flag() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = SyncStore::local(dir.path().to_path_buf()).unwrap();
            store.set_admin_secret(Some("s3cret".to_string()));
            store.add_result(draft("t1", 50)).await.unwrap();
            assert!(store.login("s3cret"));
        }

        let store = SyncStore::local(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.results().len(), 1);
        assert!(store.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_requires_configured_secret() {
        let (mut store, _dir) = local_store();
        assert!(!store.login("anything"));

        store.set_admin_secret(Some("s3cret".to_string()));
        assert!(!store.login("wrong"));
        assert!(store.login("s3cret"));
        store.logout();
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_subscribe_requires_remote_mode() {
        let (store, _dir) = local_store();
        let err = store.subscribe(Collection::Results).await.unwrap_err();
        assert!(matches!(err, StoreError::NoBackend));
    }

    #[tokio::test]
    async fn test_remote_add_is_pessimistic_until_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, _backend) = SyncStore::in_memory(dir.path().to_path_buf()).unwrap();

        let id = store.add_result(draft("t1", 50)).await.unwrap();
        // No optimistic update: the replica waits for the feed.
        assert!(store.results().is_empty());

        let _handle = store.subscribe(Collection::Results).await.unwrap();
        assert_eq!(next_applied(&mut store).await, Collection::Results);
        assert_eq!(store.results().len(), 1);
        assert_eq!(store.results()[0].id, id);
        assert_eq!(store.results()[0].points, 50);
    }

    #[tokio::test]
    async fn test_remote_edit_flows_through_notification() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, _backend) = SyncStore::in_memory(dir.path().to_path_buf()).unwrap();
        let id = store.add_result(draft("t1", 50)).await.unwrap();

        let _handle = store.subscribe(Collection::Results).await.unwrap();
        next_applied(&mut store).await;

        let patch = ResultPatch {
            points: Some(75),
            ..Default::default()
        };
        store.edit_result(&id, patch).await.unwrap();
        // Still the old value until the snapshot lands
        assert_eq!(store.results()[0].points, 50);

        next_applied(&mut store).await;
        let entry = &store.results()[0];
        assert_eq!(entry.points, 75);
        assert!(entry.edited_at.is_some());
    }

    #[tokio::test]
    async fn test_backend_write_failure_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, backend) = SyncStore::in_memory(dir.path().to_path_buf()).unwrap();
        backend.set_fail_writes(true);

        let err = store.add_result(draft("t1", 50)).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(store.results().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_notification_means_no_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, _backend) = SyncStore::in_memory(dir.path().to_path_buf()).unwrap();
        store.add_result(draft("t1", 50)).await.unwrap();

        let handle = store.subscribe(Collection::Results).await.unwrap();
        handle.cancel();
        assert!(handle.is_cancelled());
        // Idempotent
        handle.cancel();

        // Give any in-flight snapshot time to land on the channel; it
        // must be dropped unapplied.
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.process_pending();
        assert!(store.results().is_empty());
    }

    #[tokio::test]
    async fn test_independent_subscriptions_cancel_separately() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, _backend) = SyncStore::in_memory(dir.path().to_path_buf()).unwrap();
        store.add_result(draft("t1", 50)).await.unwrap();

        let first = store.subscribe(Collection::Results).await.unwrap();
        let second = store.subscribe(Collection::Results).await.unwrap();
        first.cancel();

        // The surviving subscription still delivers.
        assert_eq!(next_applied(&mut store).await, Collection::Results);
        assert_eq!(store.results().len(), 1);
        second.cancel();
    }

    #[tokio::test]
    async fn test_process_next_resolves_none_after_last_subscription_ends() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, _backend) = SyncStore::in_memory(dir.path().to_path_buf()).unwrap();
        store.add_result(draft("t1", 50)).await.unwrap();

        let handle = store.subscribe(Collection::Results).await.unwrap();
        assert_eq!(next_applied(&mut store).await, Collection::Results);

        handle.cancel();
        let outcome = timeout(Duration::from_secs(1), store.process_next())
            .await
            .expect("process_next must resolve once the feed ends");
        assert_eq!(outcome, None);
        // The last applied snapshot is kept
        assert_eq!(store.results().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_results_remote_deletes_replica_ids() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, _backend) = SyncStore::in_memory(dir.path().to_path_buf()).unwrap();
        store.add_result(draft("t1", 50)).await.unwrap();
        store.add_result(draft("t2", 60)).await.unwrap();

        let _handle = store.subscribe(Collection::Results).await.unwrap();
        next_applied(&mut store).await;
        assert_eq!(store.results().len(), 2);

        store.clear_results().await.unwrap();
        // One snapshot per delete
        next_applied(&mut store).await;
        next_applied(&mut store).await;
        assert!(store.results().is_empty());
    }

    #[tokio::test]
    async fn test_reference_collections_local_crud() {
        let (mut store, _dir) = local_store();

        let team_id = store
            .add_team(NewTeam {
                name: "Falcons".to_string(),
                color: "#2563eb".to_string(),
                gradient: None,
            })
            .await
            .unwrap();
        let program_id = store
            .add_program(NewProgram {
                name: "Elocution".to_string(),
                category: crate::models::ProgramCategory::OnStage,
                max_points: 80,
            })
            .await
            .unwrap();
        store
            .add_participant(NewParticipant {
                name: "Ayesha".to_string(),
                team_id: team_id.clone(),
                category: "Senior".to_string(),
            })
            .await
            .unwrap();

        store
            .edit_team(
                &team_id,
                TeamPatch {
                    name: Some("Golden Falcons".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.teams()[0].name, "Golden Falcons");

        store.delete_program(&program_id).await.unwrap();
        assert!(store.programs().is_empty());
        assert_eq!(store.participants().len(), 1);
    }
}
