//! Team score aggregation.
//!
//! Pure derivations over the in-memory collections; no state of its
//! own. Summation is commutative, so every function here is invariant
//! under permutation of the results sequence.

use std::collections::HashMap;

use crate::models::{ResultEntry, Team};

/// Sum each team's points from the results collection.
///
/// Every known team starts at 0 so teams without results still appear.
/// Results whose teamId has no corresponding team are still summed
/// under that teamId.
pub fn compute_team_scores(results: &[ResultEntry], teams: &[Team]) -> HashMap<String, u64> {
    let mut scores: HashMap<String, u64> = HashMap::new();
    for team in teams {
        scores.insert(team.id.clone(), 0);
    }
    for result in results {
        *scores.entry(result.team_id.clone()).or_insert(0) += u64::from(result.points);
    }
    scores
}

pub fn total_points(scores: &HashMap<String, u64>) -> u64 {
    scores.values().sum()
}

/// A team's share of the total, in [0, 1]. Zero total yields 0.0 for
/// everyone; the display convention of an even split is the caller's.
pub fn share(scores: &HashMap<String, u64>, team_id: &str) -> f64 {
    let total = total_points(scores);
    if total == 0 {
        return 0.0;
    }
    scores.get(team_id).copied().unwrap_or(0) as f64 / total as f64
}

/// The team with the strictly greatest score. Ties for the maximum,
/// including the all-zero case, yield no leader.
pub fn leader<'a>(scores: &HashMap<String, u64>, teams: &'a [Team]) -> Option<&'a Team> {
    let mut best: Option<(&Team, u64)> = None;
    let mut tied = false;
    for team in teams {
        let score = scores.get(&team.id).copied().unwrap_or(0);
        match best {
            Some((_, top)) if score > top => {
                best = Some((team, score));
                tied = false;
            }
            Some((_, top)) if score == top => tied = true,
            Some(_) => {}
            None => best = Some((team, score)),
        }
    }
    match best {
        Some((team, score)) if score > 0 && !tied => Some(team),
        _ => None,
    }
}

/// Scoreboard summary row for one team.
#[derive(Debug, Clone)]
pub struct TeamScore {
    pub team_id: String,
    pub name: String,
    pub points: u64,
    pub share: f64,
}

/// Convenience summary over both collections, ordered by points
/// descending.
#[derive(Debug, Clone)]
pub struct Scoreboard {
    pub rows: Vec<TeamScore>,
    pub leader: Option<String>,
    pub total: u64,
}

impl Scoreboard {
    pub fn build(results: &[ResultEntry], teams: &[Team]) -> Self {
        let scores = compute_team_scores(results, teams);
        let total = total_points(&scores);
        let leader = leader(&scores, teams).map(|t| t.id.clone());

        let mut rows: Vec<TeamScore> = teams
            .iter()
            .map(|team| {
                let points = scores.get(&team.id).copied().unwrap_or(0);
                TeamScore {
                    team_id: team.id.clone(),
                    name: team.name.clone(),
                    points,
                    share: share(&scores, &team.id),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.points.cmp(&a.points));

        Self {
            rows,
            leader,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, Place};
    use chrono::Utc;

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.to_string(),
            name: name.to_string(),
            color: "#2563eb".to_string(),
            gradient: None,
        }
    }

    fn result(team_id: &str, points: u32) -> ResultEntry {
        ResultEntry {
            id: format!("r_{}_{}", team_id, points),
            program_id: "prog1".to_string(),
            participant_id: "u1".to_string(),
            team_id: team_id.to_string(),
            points,
            grade: Grade::A,
            place: Place::First,
            timestamp: Utc::now(),
            edited_at: None,
        }
    }

    #[test]
    fn test_scores_invariant_under_permutation() {
        let teams = vec![team("t1", "Falcons"), team("t2", "Eagles")];
        let mut results = vec![
            result("t1", 10),
            result("t2", 30),
            result("t1", 20),
            result("t2", 5),
        ];
        let forward = compute_team_scores(&results, &teams);
        results.reverse();
        let backward = compute_team_scores(&results, &teams);
        assert_eq!(forward, backward);
        assert_eq!(forward["t1"], 30);
        assert_eq!(forward["t2"], 35);
    }

    #[test]
    fn test_team_without_results_scores_zero() {
        let teams = vec![team("t1", "Falcons"), team("t2", "Eagles")];
        let results = vec![result("t1", 50)];
        let scores = compute_team_scores(&results, &teams);
        assert_eq!(scores["t2"], 0);
    }

    #[test]
    fn test_unknown_team_id_is_still_summed() {
        let teams = vec![team("t1", "Falcons")];
        let results = vec![result("ghost", 25)];
        let scores = compute_team_scores(&results, &teams);
        assert_eq!(scores["ghost"], 25);
        // Unknown teams never become the leader
        assert!(leader(&scores, &teams).is_none());
    }

    #[test]
    fn test_leader_and_shares() {
        let teams = vec![team("t1", "Falcons"), team("t2", "Eagles")];
        let results = vec![result("t1", 40), result("t2", 60)];
        let scores = compute_team_scores(&results, &teams);

        assert_eq!(leader(&scores, &teams).unwrap().id, "t2");
        assert!((share(&scores, "t1") - 0.4).abs() < f64::EPSILON);
        assert!((share(&scores, "t2") - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tie_yields_no_leader() {
        let teams = vec![team("t1", "Falcons"), team("t2", "Eagles")];
        let results = vec![result("t1", 50), result("t2", 50)];
        let scores = compute_team_scores(&results, &teams);
        assert!(leader(&scores, &teams).is_none());
    }

    #[test]
    fn test_all_zero_yields_no_leader_and_zero_shares() {
        let teams = vec![team("t1", "Falcons"), team("t2", "Eagles")];
        let scores = compute_team_scores(&[], &teams);
        assert!(leader(&scores, &teams).is_none());
        assert_eq!(share(&scores, "t1"), 0.0);
    }

    #[test]
    fn test_scoreboard_rows_are_ordered_by_points() {
        let teams = vec![team("t1", "Falcons"), team("t2", "Eagles")];
        let results = vec![result("t1", 40), result("t2", 60)];
        let board = Scoreboard::build(&results, &teams);
        assert_eq!(board.total, 100);
        assert_eq!(board.leader.as_deref(), Some("t2"));
        assert_eq!(board.rows[0].team_id, "t2");
        assert_eq!(board.rows[1].points, 40);
    }
}
