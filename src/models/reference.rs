//! Reference entities: programs, teams and participants.
//!
//! These change rarely compared to results; they are seeded once and
//! edited only from the admin surface.

use serde::{Deserialize, Serialize};

/// Where a program takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ProgramCategory {
    #[serde(rename = "On-Stage")]
    OnStage,
    #[serde(rename = "Off-Stage")]
    OffStage,
}

impl ProgramCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramCategory::OnStage => "On-Stage",
            ProgramCategory::OffStage => "Off-Stage",
        }
    }
}

impl std::fmt::Display for ProgramCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A competition item participants can be scored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Program {
    pub id: String,
    pub name: String,
    pub category: ProgramCategory,
    pub max_points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgram {
    pub name: String,
    pub category: ProgramCategory,
    pub max_points: u32,
}

impl NewProgram {
    pub fn into_entity(self, id: String) -> Program {
        Program {
            id,
            name: self.name,
            category: self.category,
            max_points: self.max_points,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ProgramCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<u32>,
}

impl ProgramPatch {
    pub fn apply(&self, entity: &mut Program) {
        if let Some(ref v) = self.name {
            entity.name = v.clone();
        }
        if let Some(v) = self.category {
            entity.category = v;
        }
        if let Some(v) = self.max_points {
            entity.max_points = v;
        }
    }
}

/// A competing team. `color` and `gradient` are display tokens passed
/// through verbatim to the scoreboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Team {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<String>,
}

impl NewTeam {
    pub fn into_entity(self, id: String) -> Team {
        Team {
            id,
            name: self.name,
            color: self.color,
            gradient: self.gradient,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<String>,
}

impl TeamPatch {
    pub fn apply(&self, entity: &mut Team) {
        if let Some(ref v) = self.name {
            entity.name = v.clone();
        }
        if let Some(ref v) = self.color {
            entity.color = v.clone();
        }
        if let Some(ref v) = self.gradient {
            entity.gradient = Some(v.clone());
        }
    }
}

/// A registered contestant. `team_id` should reference an existing
/// team for the entity to be meaningful; the store does not enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub team_id: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParticipant {
    pub name: String,
    pub team_id: String,
    pub category: String,
}

impl NewParticipant {
    pub fn into_entity(self, id: String) -> Participant {
        Participant {
            id,
            name: self.name,
            team_id: self.team_id,
            category: self.category,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ParticipantPatch {
    pub fn apply(&self, entity: &mut Participant) {
        if let Some(ref v) = self.name {
            entity.name = v.clone();
        }
        if let Some(ref v) = self.team_id {
            entity.team_id = v.clone();
        }
        if let Some(ref v) = self.category {
            entity.category = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_wire_shape() {
        let program = Program {
            id: "prog1".to_string(),
            name: "Quran Recitation".to_string(),
            category: ProgramCategory::OnStage,
            max_points: 100,
        };
        let json = serde_json::to_value(&program).unwrap();
        assert_eq!(json["category"], "On-Stage");
        assert_eq!(json["maxPoints"], 100);
    }

    #[test]
    fn test_team_gradient_is_optional() {
        let json = r##"{"id":"t1","name":"Falcons","color":"#2563eb"}"##;
        let team: Team = serde_json::from_str(json).unwrap();
        assert_eq!(team.gradient, None);
        let back = serde_json::to_value(&team).unwrap();
        assert!(back.get("gradient").is_none());
    }

    #[test]
    fn test_participant_patch_moves_team() {
        let mut p = Participant {
            id: "u1".to_string(),
            name: "Ayesha".to_string(),
            team_id: "t1".to_string(),
            category: "Senior".to_string(),
        };
        let patch = ParticipantPatch {
            team_id: Some("t2".to_string()),
            ..Default::default()
        };
        patch.apply(&mut p);
        assert_eq!(p.team_id, "t2");
        assert_eq!(p.name, "Ayesha");
    }
}
