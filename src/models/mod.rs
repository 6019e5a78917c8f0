//! Data models for festival entities.
//!
//! This module contains the data structures for the four synced
//! collections:
//!
//! - `ResultEntry`: a published competition result
//! - `Program`: a competition item (on-stage or off-stage)
//! - `Team`: a competing team
//! - `Participant`: a registered contestant
//!
//! Each entity has a draft form (`New*`, the entity minus id and
//! timestamp) used by the add path and a patch form (`*Patch`, all
//! fields optional) used by the edit path. Wire names are camelCase.

pub mod reference;
pub mod result;

pub use reference::{
    NewParticipant, NewProgram, NewTeam, Participant, ParticipantPatch, Program, ProgramCategory,
    ProgramPatch, Team, TeamPatch,
};
pub use result::{Grade, NewResult, Place, ResultEntry, ResultPatch};

/// The four named collections managed by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Results,
    Programs,
    Teams,
    Participants,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Results,
        Collection::Programs,
        Collection::Teams,
        Collection::Participants,
    ];

    /// Wire name of the collection, also used as the cache key.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Results => "results",
            Collection::Programs => "programs",
            Collection::Teams => "teams",
            Collection::Participants => "participants",
        }
    }

    /// Prefix for locally synthesized entity ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Collection::Results => "result",
            Collection::Programs => "program",
            Collection::Teams => "team",
            Collection::Participants => "participant",
        }
    }

    /// Field the backend should order snapshots by, if any.
    /// Results are delivered most-recent-first.
    pub fn order_field(&self) -> Option<&'static str> {
        match self {
            Collection::Results => Some("timestamp"),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "results" => Some(Collection::Results),
            "programs" => Some(Collection::Programs),
            "teams" => Some(Collection::Teams),
            "participants" => Some(Collection::Participants),
            _ => None,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_round_trip() {
        for c in Collection::ALL {
            assert_eq!(Collection::parse(c.name()), Some(c));
        }
        assert_eq!(Collection::parse("scores"), None);
    }

    #[test]
    fn test_only_results_are_ordered() {
        assert_eq!(Collection::Results.order_field(), Some("timestamp"));
        assert_eq!(Collection::Teams.order_field(), None);
    }
}
