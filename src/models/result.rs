//! Published competition results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grade awarded with a result, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(Grade::APlus),
            "A" => Some(Grade::A),
            "B+" => Some(Grade::BPlus),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "E" => Some(Grade::E),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placing awarded with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Place {
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
    Participation,
}

impl Place {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1st" => Some(Place::First),
            "2nd" => Some(Place::Second),
            "3rd" => Some(Place::Third),
            "Participation" => Some(Place::Participation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Place::First => "1st",
            Place::Second => "2nd",
            Place::Third => "3rd",
            Place::Participation => "Participation",
        }
    }
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published result for one participant in one program.
///
/// `timestamp` is set exactly once at creation and never altered.
/// `edited_at` is absent until the first update and then only increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ResultEntry {
    pub id: String,
    pub program_id: String,
    pub participant_id: String,
    pub team_id: String,
    pub points: u32,
    pub grade: Grade,
    pub place: Place,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

/// Draft of a result, before the sync engine assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResult {
    pub program_id: String,
    pub participant_id: String,
    pub team_id: String,
    pub points: u32,
    pub grade: Grade,
    pub place: Place,
}

impl NewResult {
    pub fn into_entry(self, id: String, timestamp: DateTime<Utc>) -> ResultEntry {
        ResultEntry {
            id,
            program_id: self.program_id,
            participant_id: self.participant_id,
            team_id: self.team_id,
            points: self.points,
            grade: self.grade,
            place: self.place,
            timestamp,
            edited_at: None,
        }
    }
}

/// Field-level merge patch for a result. Absent fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
}

impl ResultPatch {
    /// Merge the patch into an entry. Does not touch id or timestamp.
    pub fn apply(&self, entry: &mut ResultEntry) {
        if let Some(ref v) = self.program_id {
            entry.program_id = v.clone();
        }
        if let Some(ref v) = self.participant_id {
            entry.participant_id = v.clone();
        }
        if let Some(ref v) = self.team_id {
            entry.team_id = v.clone();
        }
        if let Some(v) = self.points {
            entry.points = v;
        }
        if let Some(v) = self.grade {
            entry.grade = v;
        }
        if let Some(v) = self.place {
            entry.place = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> ResultEntry {
        ResultEntry {
            id: "result_1700000000000_abc123def".to_string(),
            program_id: "prog1".to_string(),
            participant_id: "u1".to_string(),
            team_id: "t1".to_string(),
            points: 50,
            grade: Grade::APlus,
            place: Place::First,
            timestamp: "2026-02-01T10:00:00Z".parse().unwrap(),
            edited_at: None,
        }
    }

    #[test]
    fn test_result_wire_shape_is_camel_case() {
        let json = serde_json::to_value(sample_entry()).unwrap();
        assert_eq!(json["programId"], "prog1");
        assert_eq!(json["teamId"], "t1");
        assert_eq!(json["grade"], "A+");
        assert_eq!(json["place"], "1st");
        // editedAt is omitted until the first edit
        assert!(json.get("editedAt").is_none());
    }

    #[test]
    fn test_result_round_trip() {
        let mut entry = sample_entry();
        entry.edited_at = Some("2026-02-01T11:00:00Z".parse().unwrap());
        let json = serde_json::to_string(&entry).unwrap();
        let back: ResultEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_grade_parse_matches_wire_values() {
        for s in ["A+", "A", "B+", "B", "C", "D", "E"] {
            let grade = Grade::parse(s).unwrap();
            assert_eq!(grade.as_str(), s);
        }
        assert_eq!(Grade::parse("C+"), None);
    }

    #[test]
    fn test_patch_leaves_absent_fields_untouched() {
        let mut entry = sample_entry();
        let patch = ResultPatch {
            points: Some(75),
            ..Default::default()
        };
        patch.apply(&mut entry);
        assert_eq!(entry.points, 75);
        assert_eq!(entry.program_id, "prog1");
        assert_eq!(entry.grade, Grade::APlus);
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = ResultPatch {
            points: Some(75),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["points"], 75);
    }
}
