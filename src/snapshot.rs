//! End-of-match snapshot for the external history store.
//!
//! A [`MatchSnapshot`] is produced on request by
//! [`MatchSession::snapshot`](crate::MatchSession::snapshot); the core never
//! writes storage itself. Snapshots encode to a compact binary form with
//! bincode and, with the `json` feature, to JSON.

use serde::{Deserialize, Serialize};

use crate::clock::MatchClock;
use crate::ledger::Ledger;
use crate::roster::Roster;
use crate::{PlayerId, TouchlineError, TouchlineResult};

fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// Per-player line of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStat {
    /// Player id.
    pub id: PlayerId,
    /// Display name at the time of the snapshot.
    pub name: String,
    /// Jersey number.
    pub number: u8,
    /// Seconds on the field.
    pub seconds_played: u32,
    /// Goals scored.
    pub goals: u32,
    /// Red cards, including second yellows.
    pub red_cards: u32,
    /// Yellow cards.
    pub yellow_cards: u32,
}

/// Final state of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Label chosen by the operator, e.g. the opponent's name.
    pub name: String,
    /// The team the match was tracked for.
    pub team_name: String,
    /// Formation in use when the snapshot was taken.
    pub formation: String,
    /// Match time in whole seconds.
    pub elapsed_seconds: u32,
    /// Configured match length.
    pub total_duration_minutes: u32,
    /// Goals for.
    pub team_goals: u32,
    /// Goals against.
    pub opponent_goals: u32,
    /// One line per roster player, in roster order.
    pub players: Vec<PlayerStat>,
}

impl MatchSnapshot {
    pub(crate) fn capture(
        name: String,
        team_name: &str,
        formation: &str,
        total_duration_minutes: u32,
        roster: &Roster,
        clock: &MatchClock,
        ledger: &Ledger,
    ) -> Self {
        let tally = ledger.tally();
        let players = roster
            .iter()
            .map(|player| PlayerStat {
                id: player.id.clone(),
                name: player.display_name(),
                number: player.number,
                seconds_played: clock.player_time(&player.id),
                goals: tally.goals(&player.id),
                red_cards: tally.red_cards(&player.id),
                yellow_cards: tally.yellow_cards(&player.id),
            })
            .collect();
        Self {
            name,
            team_name: team_name.to_owned(),
            formation: formation.to_owned(),
            elapsed_seconds: clock.elapsed_seconds(),
            total_duration_minutes,
            team_goals: tally.team_goals(),
            opponent_goals: tally.opponent_goals(),
            players,
        }
    }

    /// Looks up one player's line.
    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerStat> {
        self.players.iter().find(|stat| &stat.id == id)
    }

    /// Encodes with bincode.
    pub fn to_bytes(&self) -> TouchlineResult<Vec<u8>> {
        bincode::serde::encode_to_vec(self, config()).map_err(|e| {
            TouchlineError::SerializationError {
                context: format!("encoding match snapshot: {}", e),
            }
        })
    }

    /// Decodes bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> TouchlineResult<Self> {
        let (snapshot, read) =
            bincode::serde::decode_from_slice::<Self, _>(bytes, config()).map_err(|e| {
                TouchlineError::SerializationError {
                    context: format!("decoding match snapshot: {}", e),
                }
            })?;
        if read != bytes.len() {
            return Err(TouchlineError::SerializationError {
                context: format!(
                    "decoding match snapshot: {} trailing byte(s)",
                    bytes.len() - read
                ),
            });
        }
        Ok(snapshot)
    }

    /// Serializes to pretty-printed JSON.
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> TouchlineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| TouchlineError::SerializationError {
            context: format!("match snapshot to JSON: {}", e),
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::formation::FormationCatalog;
    use crate::assignment::SlotAssignment;
    use crate::roster::Player;
    use std::collections::BTreeMap;
    use web_time::{Duration, Instant};

    fn roster() -> Roster {
        Roster::new(vec![
            Player::new("a", "Ann", "Able", 1, "GK"),
            Player::new("b", "Ben", "Baker", 9, "CF"),
            Player::new("c", "Cy", "Cole", 12, "CB"),
        ])
        .unwrap()
    }

    fn sample() -> MatchSnapshot {
        let roster = roster();
        let mut clock = MatchClock::new();
        let times: BTreeMap<PlayerId, u32> = roster.ids().map(|id| (id.clone(), 0)).collect();
        let active = [PlayerId::from("a"), PlayerId::from("b")];
        clock.start(active, times, 80, Instant::now()).unwrap();
        clock.advance(Duration::from_secs(75));

        let mut assignment =
            SlotAssignment::new(FormationCatalog::builtin().get("1-4-4-2").unwrap());
        let mut ledger = Ledger::new();
        ledger.goal(&PlayerId::from("b"));
        ledger.opponent_goal();
        ledger.yellow_card(&PlayerId::from("c"), &mut assignment);

        MatchSnapshot::capture(
            "Rovers".to_owned(),
            "Lions",
            "1-4-4-2",
            80,
            &roster,
            &clock,
            &ledger,
        )
    }

    #[test]
    fn capture_collects_per_player_lines() {
        let snapshot = sample();
        assert_eq!(snapshot.team_name, "Lions");
        assert_eq!(snapshot.elapsed_seconds, 75);
        assert_eq!(snapshot.team_goals, 1);
        assert_eq!(snapshot.opponent_goals, 1);
        assert_eq!(snapshot.players.len(), 3);

        let b = snapshot.player(&PlayerId::from("b")).unwrap();
        assert_eq!(b.seconds_played, 75);
        assert_eq!(b.goals, 1);
        assert_eq!(b.name, "B. Baker");

        let c = snapshot.player(&PlayerId::from("c")).unwrap();
        assert_eq!(c.seconds_played, 0);
        assert_eq!(c.yellow_cards, 1);
    }

    #[test]
    fn bytes_decode_to_same_snapshot() {
        let snapshot = sample();
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(MatchSnapshot::from_bytes(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn truncated_bytes_fail() {
        let bytes = sample().to_bytes().unwrap();
        let err = MatchSnapshot::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, TouchlineError::SerializationError { .. }));
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.push(0);
        assert!(MatchSnapshot::from_bytes(&bytes).is_err());
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_contains_player_lines() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["players"][1]["goals"], 1);
    }
}
