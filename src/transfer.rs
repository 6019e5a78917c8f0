//! JSON import and export of the full dataset.
//!
//! The export document is a single object with the four collection
//! arrays. Import accepts the same shape with any subset of the keys
//! present, plus a legacy form that is a bare array of results. Parsing
//! is strict and happens before any mutation, so a malformed document
//! leaves the store byte-for-byte unchanged.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::Fields;
use crate::error::StoreError;
use crate::models::{Collection, Participant, Program, ResultEntry, Team};
use crate::store::{to_fields, SyncStore};

/// Full dataset snapshot, as written by export and read by import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub results: Vec<ResultEntry>,
    pub programs: Vec<Program>,
    pub teams: Vec<Team>,
    pub participants: Vec<Participant>,
}

/// Import document with any subset of the collection keys. At least
/// one must be present.
#[derive(Debug, Clone, Deserialize)]
struct ImportObject {
    results: Option<Vec<ResultEntry>>,
    programs: Option<Vec<Program>>,
    teams: Option<Vec<Team>>,
    participants: Option<Vec<Participant>>,
}

/// A parsed import document. Only the collections present in the
/// source text are touched by the import.
#[derive(Debug, Clone)]
pub struct ImportPayload {
    pub results: Option<Vec<ResultEntry>>,
    pub programs: Option<Vec<Program>>,
    pub teams: Option<Vec<Team>>,
    pub participants: Option<Vec<Participant>>,
}

impl ImportPayload {
    /// Strictly parse an import document. Accepts the export object
    /// shape or a legacy bare array of results.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        if let Ok(results) = serde_json::from_str::<Vec<ResultEntry>>(text) {
            return Ok(ImportPayload {
                results: Some(results),
                programs: None,
                teams: None,
                participants: None,
            });
        }

        let object: ImportObject =
            serde_json::from_str(text).map_err(|e| StoreError::Parse(e.to_string()))?;

        if object.results.is_none()
            && object.programs.is_none()
            && object.teams.is_none()
            && object.participants.is_none()
        {
            return Err(StoreError::Parse(
                "import document contains none of the collection keys".to_string(),
            ));
        }

        Ok(ImportPayload {
            results: object.results,
            programs: object.programs,
            teams: object.teams,
            participants: object.participants,
        })
    }
}

/// Default export filename, stamped with the UTC date.
pub fn default_export_filename() -> String {
    format!("festsync_export_{}.json", Utc::now().format("%Y-%m-%d"))
}

impl SyncStore {
    /// Snapshot the four collections as currently held in memory.
    pub fn export_snapshot(&self) -> ExportSnapshot {
        ExportSnapshot {
            results: self.results().to_vec(),
            programs: self.programs().to_vec(),
            teams: self.teams().to_vec(),
            participants: self.participants().to_vec(),
        }
    }

    /// Serialize the full dataset as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.export_snapshot())
            .map_err(|e| StoreError::Parse(e.to_string()))
    }

    pub fn export_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.export_json()?;
        std::fs::write(path, json)
            .map_err(|e| StoreError::Parse(format!("failed to write {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "exported dataset");
        Ok(())
    }

    /// Parse and apply an import document.
    ///
    /// Local mode wholesale-replaces each present collection and
    /// persists. Remote mode inserts every imported entity as a new
    /// document (the backend assigns fresh ids), so re-importing a
    /// dataset duplicates entities; stops at the first write failure.
    pub async fn import_json(&mut self, text: &str) -> Result<(), StoreError> {
        let payload = ImportPayload::parse(text)?;
        self.import_payload(payload).await
    }

    pub async fn import_payload(&mut self, payload: ImportPayload) -> Result<(), StoreError> {
        if self.is_remote() {
            return self.import_remote(payload).await;
        }

        if let Some(results) = payload.results {
            info!(count = results.len(), "importing results");
            self.replace_results(results);
            self.cache().save_results(self.results())?;
        }
        if let Some(programs) = payload.programs {
            info!(count = programs.len(), "importing programs");
            self.replace_programs(programs);
            self.cache().save_programs(self.programs())?;
        }
        if let Some(teams) = payload.teams {
            info!(count = teams.len(), "importing teams");
            self.replace_teams(teams);
            self.cache().save_teams(self.teams())?;
        }
        if let Some(participants) = payload.participants {
            info!(count = participants.len(), "importing participants");
            self.replace_participants(participants);
            self.cache().save_participants(self.participants())?;
        }
        Ok(())
    }

    async fn import_remote(&mut self, payload: ImportPayload) -> Result<(), StoreError> {
        warn!("remote import inserts every entity as a new document; re-importing duplicates data");
        let backend = self
            .backend()
            .cloned()
            .ok_or(StoreError::NoBackend)?;

        if let Some(results) = payload.results {
            for entry in results {
                let fields = strip_id(to_fields(&entry)?);
                backend.add_document(Collection::Results, fields).await?;
            }
        }
        if let Some(programs) = payload.programs {
            for entity in programs {
                let fields = strip_id(to_fields(&entity)?);
                backend.add_document(Collection::Programs, fields).await?;
            }
        }
        if let Some(teams) = payload.teams {
            for entity in teams {
                let fields = strip_id(to_fields(&entity)?);
                backend.add_document(Collection::Teams, fields).await?;
            }
        }
        if let Some(participants) = payload.participants {
            for entity in participants {
                let fields = strip_id(to_fields(&entity)?);
                backend
                    .add_document(Collection::Participants, fields)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn import_from_file(&mut self, path: &Path) -> Result<(), StoreError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Parse(format!("failed to read {}: {}", path.display(), e)))?;
        self.import_json(&text).await
    }

    /// Load an initial dataset. Same semantics as import; intended for
    /// first-run provisioning from a fixture file.
    pub async fn seed(&mut self, path: &Path) -> Result<(), StoreError> {
        info!(path = %path.display(), "seeding dataset");
        self.import_from_file(path).await
    }
}

/// Imported entities hand id assignment back to the backend.
fn strip_id(mut fields: Fields) -> Fields {
    fields.remove("id");
    fields
}
