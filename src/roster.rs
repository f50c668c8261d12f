//! Players and the match-day roster.
//!
//! The roster is owned by the surrounding application; a [`MatchSession`]
//! holds a copy for the duration of one match and hands an updated copy back
//! through [`MatchSession::finish_roster`].
//!
//! [`MatchSession`]: crate::MatchSession
//! [`MatchSession::finish_roster`]: crate::MatchSession::finish_roster

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::InvalidRequestKind;
use crate::{PlayerId, TouchlineResult};

/// A squad member.
///
/// Positions are plain strings ("GK", "CB", "LW", ...) compared against a
/// slot's display position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable identity.
    pub id: PlayerId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Jersey number.
    pub number: u8,
    /// Primary position.
    pub position: String,
    /// Additional positions the player can cover.
    pub secondary_positions: Vec<String>,
    /// False once the player has been ruled out (e.g. after a sending-off).
    pub available: bool,
}

impl Player {
    /// Creates an available player with no secondary positions.
    #[must_use]
    pub fn new(
        id: impl Into<PlayerId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        number: u8,
        position: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            number,
            position: position.into(),
            secondary_positions: Vec::new(),
            available: true,
        }
    }

    /// Adds secondary positions.
    #[must_use]
    pub fn with_secondary_positions<I, S>(mut self, positions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secondary_positions
            .extend(positions.into_iter().map(Into::into));
        self
    }

    /// Marks the player as unavailable.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Short name as shown on the touchline, e.g. "J. Smith".
    ///
    /// The initial is upper-cased.
    ///
    /// ```
    /// use touchline::Player;
    ///
    /// let player = Player::new("p9", "Jamie", "Smith", 9, "CF");
    /// assert_eq!(player.display_name(), "J. Smith");
    /// ```
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.first_name.chars().next() {
            Some(initial) => format!("{}. {}", initial.to_uppercase(), self.last_name),
            None => self.last_name.clone(),
        }
    }

    /// Returns true if `position` is this player's primary position.
    #[must_use]
    pub fn plays_primary(&self, position: &str) -> bool {
        self.position == position
    }

    /// Returns true if `position` is one of this player's secondary positions.
    #[must_use]
    pub fn plays_secondary(&self, position: &str) -> bool {
        self.secondary_positions.iter().any(|p| p == position)
    }
}

/// An ordered list of players with unique ids.
///
/// Roster order is significant: it is the tie-break for [`auto_assign`].
///
/// [`auto_assign`]: crate::auto_assign
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Builds a roster, rejecting duplicate ids.
    pub fn new(players: Vec<Player>) -> TouchlineResult<Self> {
        let mut seen = BTreeSet::new();
        for player in &players {
            if !seen.insert(&player.id) {
                return Err(InvalidRequestKind::DuplicatePlayer {
                    player: player.id.clone(),
                }
                .into());
            }
        }
        Ok(Self { players })
    }

    /// Looks up a player by id.
    #[must_use]
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Returns true if the roster has a player with this id.
    #[must_use]
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.get(id).is_some()
    }

    /// Iterates players in roster order.
    pub fn iter(&self) -> std::slice::Iter<'_, Player> {
        self.players.iter()
    }

    /// Iterates player ids in roster order.
    pub fn ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter().map(|p| &p.id)
    }

    /// Number of players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True if there are no players.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Marks a player unavailable. Returns false if the id is unknown.
    pub fn mark_unavailable(&mut self, id: &PlayerId) -> bool {
        match self.players.iter_mut().find(|p| &p.id == id) {
            Some(player) => {
                player.available = false;
                true
            },
            None => false,
        }
    }

    /// Consumes the roster, returning the players in order.
    #[must_use]
    pub fn into_players(self) -> Vec<Player> {
        self.players
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Player;
    type IntoIter = std::slice::Iter<'a, Player>;

    fn into_iter(self) -> Self::IntoIter {
        self.players.iter()
    }
}

/// Formats whole seconds as `MM:SS`.
///
/// Minutes are not wrapped, so a 90-minute match ends at `"90:00"`.
///
/// ```
/// use touchline::format_clock;
///
/// assert_eq!(format_clock(0), "00:00");
/// assert_eq!(format_clock(2400), "40:00");
/// assert_eq!(format_clock(61), "01:01");
/// ```
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
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
    use crate::TouchlineError;

    fn player(id: &str, position: &str) -> Player {
        Player::new(id, "Alex", id.to_uppercase(), 1, position)
    }

    #[test]
    fn roster_rejects_duplicate_ids() {
        let result = Roster::new(vec![player("p1", "GK"), player("p1", "CB")]);
        assert!(matches!(
            result,
            Err(TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::DuplicatePlayer { .. }
            })
        ));
    }

    #[test]
    fn roster_preserves_order() {
        let roster =
            Roster::new(vec![player("b", "CB"), player("a", "GK"), player("c", "CF")]).unwrap();
        let ids: Vec<&str> = roster.ids().map(PlayerId::as_str).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn mark_unavailable_flips_flag() {
        let mut roster = Roster::new(vec![player("p1", "GK")]).unwrap();
        let id = PlayerId::from("p1");
        assert!(roster.mark_unavailable(&id));
        assert!(!roster.get(&id).unwrap().available);
        assert!(!roster.mark_unavailable(&PlayerId::from("ghost")));
    }

    #[test]
    fn display_name_handles_empty_first_name() {
        let p = Player::new("p1", "", "Keeper", 1, "GK");
        assert_eq!(p.display_name(), "Keeper");
    }

    #[test]
    fn secondary_positions_are_matched_exactly() {
        let p = Player::new("p7", "Sam", "Wing", 7, "RW").with_secondary_positions(["LW", "CF"]);
        assert!(p.plays_primary("RW"));
        assert!(p.plays_secondary("LW"));
        assert!(!p.plays_secondary("RW"));
    }

    #[test]
    fn format_clock_pads_and_does_not_wrap() {
        assert_eq!(format_clock(9), "00:09");
        assert_eq!(format_clock(5400), "90:00");
        assert_eq!(format_clock(6000), "100:00");
    }
}
