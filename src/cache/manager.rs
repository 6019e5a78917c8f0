use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Collection, Participant, Program, ResultEntry, Team};

/// Cache key for the persisted authentication flag. The four
/// collections use their wire names as keys.
const AUTH_FLAG_KEY: &str = "isAuthenticated";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    /// Human-readable age for warm-start logging.
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew (negative ages)
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>, CacheError> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        let cached: CachedData<T> = serde_json::from_str(&contents)?;
        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<(), CacheError> {
        let cached = CachedData::new(data);
        let path = self.cache_path(name);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    // ===== Results =====

    pub fn load_results(&self) -> Result<Option<CachedData<Vec<ResultEntry>>>, CacheError> {
        self.load(Collection::Results.name())
    }

    pub fn save_results(&self, results: &[ResultEntry]) -> Result<(), CacheError> {
        self.save(Collection::Results.name(), &results)
    }

    // ===== Programs =====

    pub fn load_programs(&self) -> Result<Option<CachedData<Vec<Program>>>, CacheError> {
        self.load(Collection::Programs.name())
    }

    pub fn save_programs(&self, programs: &[Program]) -> Result<(), CacheError> {
        self.save(Collection::Programs.name(), &programs)
    }

    // ===== Teams =====

    pub fn load_teams(&self) -> Result<Option<CachedData<Vec<Team>>>, CacheError> {
        self.load(Collection::Teams.name())
    }

    pub fn save_teams(&self, teams: &[Team]) -> Result<(), CacheError> {
        self.save(Collection::Teams.name(), &teams)
    }

    // ===== Participants =====

    pub fn load_participants(&self) -> Result<Option<CachedData<Vec<Participant>>>, CacheError> {
        self.load(Collection::Participants.name())
    }

    pub fn save_participants(&self, participants: &[Participant]) -> Result<(), CacheError> {
        self.save(Collection::Participants.name(), &participants)
    }

    // ===== Authentication flag =====

    pub fn load_auth_flag(&self) -> Result<Option<CachedData<bool>>, CacheError> {
        self.load(AUTH_FLAG_KEY)
    }

    pub fn save_auth_flag(&self, authenticated: bool) -> Result<(), CacheError> {
        self.save(AUTH_FLAG_KEY, &authenticated)
    }
}

// ============================================================================
// Tests
// ============================================================================
