//! # Touchline
//!
//! Match-state core for tracking a live soccer match from the touchline.
//!
//! Touchline keeps four pieces of state consistent with each other:
//!
//! - the **clock** ([`MatchClock`]): match phase, elapsed time, and how long
//!   each player has been on the field;
//! - the **lineup** ([`SlotAssignment`]): which player stands in which
//!   formation slot;
//! - the **substitution proposal** ([`SubstitutionProposal`]): an N-for-N
//!   swap built up pick by pick and applied as one batch;
//! - the **ledger** ([`Ledger`]): goals and cards, undoable one step at a time.
//!
//! A [`MatchSession`] owns all four and is driven by a surrounding shell: it
//! polls the clock from a periodic timer, forwards drag/drop gestures and
//! clicks, asks for confirmation prompts before destructive actions, and
//! drains [`MatchEvent`]s. There is no I/O and no background thread.
//!
//! ```
//! use touchline::{MatchBuilder, Player, PlayerId, Roster};
//! use web_time::{Duration, Instant};
//!
//! let positions = ["GK", "RB", "CB", "CB", "LB", "RM", "CM", "CM", "LM", "CF", "CF", "GK"];
//! let players = positions
//!     .iter()
//!     .enumerate()
//!     .map(|(i, pos)| Player::new(format!("p{}", i + 1), "Sam", format!("Player{}", i + 1), i as u8 + 1, *pos))
//!     .collect();
//! let roster = Roster::new(players)?;
//!
//! let mut session = MatchBuilder::new().with_roster(roster).build()?;
//! session.auto_assign()?;
//!
//! let kick_off = Instant::now();
//! session.start(kick_off)?;
//! session.poll(kick_off + Duration::from_millis(10_400));
//!
//! assert_eq!(session.elapsed_seconds(), 10);
//! assert_eq!(session.player_time(&PlayerId::from("p1")), 10);
//! assert_eq!(session.player_time(&PlayerId::from("p12")), 0);
//! # Ok::<(), touchline::TouchlineError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use assignment::{auto_assign, MoveOutcome, MoveTarget, SlotAssignment};
pub use clock::{ClockTransition, Half, MatchClock, MatchPhase, Toggle};
pub use config::MatchConfig;
pub use error::{InvalidRequestKind, TouchlineError};
pub use formation::{Formation, FormationCatalog, DEFAULT_FORMATION};
pub use ledger::{ActionRecord, Dismissal, Ledger, Tally, UndoOutcome};
pub use roster::{format_clock, Player, Roster};
pub use session::builder::MatchBuilder;
pub use session::confirmation::PendingAction;
pub use session::event_drain::EventDrain;
pub use session::match_session::{MatchSession, Performed, SubstituteSort};
pub use snapshot::{MatchSnapshot, PlayerStat};
pub use substitution::{Selection, Substitution, SubstitutionOutcome, SubstitutionProposal};

pub mod assignment;
pub mod clock;
pub mod config;
#[doc(hidden)]
pub mod error;
pub mod formation;
pub mod ledger;
pub mod prelude;
pub mod roster;
pub mod snapshot;
pub mod substitution;
pub mod telemetry;

/// The match session and its builder.
pub mod session {
    #[doc(hidden)]
    pub mod builder;
    pub mod confirmation;
    #[doc(hidden)]
    pub mod event_drain;
    #[doc(hidden)]
    pub mod match_session;
}

/// A specialized `Result` for touchline operations.
pub type TouchlineResult<T, E = TouchlineError> = std::result::Result<T, E>;

// #############
// #   TYPES   #
// #############

/// Stable identity of a roster player.
///
/// ```
/// use touchline::PlayerId;
///
/// let id = PlayerId::from("p9");
/// assert_eq!(id.as_str(), "p9");
/// assert_eq!(id.to_string(), "p9");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps an id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A named position in a formation, e.g. `"GK"` or `"CB2"`.
///
/// Keys are unique within a formation. A trailing number only tells two
/// slots of the same position apart; see [`display_position`](Self::display_position).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct SlotKey(String);

impl SlotKey {
    /// Wraps a key string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key with trailing digits stripped, compared against player positions.
    ///
    /// ```
    /// use touchline::SlotKey;
    ///
    /// assert_eq!(SlotKey::from("CB2").display_position(), "CB");
    /// assert_eq!(SlotKey::from("GK").display_position(), "GK");
    /// ```
    #[must_use]
    pub fn display_position(&self) -> &str {
        let stripped = self.0.trim_end_matches(|c: char| c.is_ascii_digit());
        if stripped.is_empty() {
            &self.0
        } else {
            stripped
        }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for SlotKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

// #############
// #   ENUMS   #
// #############

/// Notifications queued by a [`MatchSession`]. Drain them with
/// [`MatchSession::events`].
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new event types may be
/// added in future versions. Always include a wildcard arm when matching.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchEvent {
    /// Kick-off.
    Started,
    /// The operator paused the clock.
    Paused {
        /// Match second at which the clock stopped.
        elapsed: u32,
    },
    /// The operator resumed the clock.
    Resumed {
        /// Match second at which the clock restarted.
        elapsed: u32,
    },
    /// The clock reached half-time and paused itself.
    HalfTime {
        /// The half-time second.
        elapsed: u32,
    },
    /// The clock reached full time. The session is now read-only.
    FullTime {
        /// The full-time second.
        elapsed: u32,
    },
    /// The match was abandoned and the session is idle again.
    Cancelled,
    /// A player was sent off.
    SentOff {
        /// The dismissed player.
        player: PlayerId,
        /// The slot they left, if they were on the field.
        slot: Option<SlotKey>,
    },
    /// Undoing a sending-off put the player back into their slot.
    Reinstated {
        /// The reinstated player.
        player: PlayerId,
        /// The slot they returned to.
        slot: SlotKey,
    },
    /// A substitution proposal was applied.
    SubstitutionApplied(Vec<Substitution>),
    /// A bench player could not enter because the team is at its card-reduced limit.
    AssignmentRejected {
        /// The player that was refused.
        player: PlayerId,
        /// Players allowed on the field.
        max_active: usize,
    },
}

// ###################
// # UNIT TESTS      #
// ###################

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn display_position_strips_trailing_digits() {
        assert_eq!(SlotKey::from("CM2").display_position(), "CM");
        assert_eq!(SlotKey::from("CF10").display_position(), "CF");
        assert_eq!(SlotKey::from("LW").display_position(), "LW");
    }

    #[test]
    fn all_digit_key_keeps_full_key() {
        assert_eq!(SlotKey::from("11").display_position(), "11");
    }

    #[test]
    fn ids_order_and_display_as_strings() {
        let a = PlayerId::from("a");
        let b = PlayerId::new(String::from("b"));
        assert!(a < b);
        assert_eq!(format!("{}/{}", a, SlotKey::from("GK")), "a/GK");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&PlayerId::from("p7")).unwrap();
        assert_eq!(json, "\"p7\"");
        let slot: SlotKey = serde_json::from_str("\"CB2\"").unwrap();
        assert_eq!(slot, SlotKey::from("CB2"));
    }

    #[test]
    fn match_event_equality() {
        assert_eq!(MatchEvent::Started, MatchEvent::Started);
        assert_ne!(
            MatchEvent::Paused { elapsed: 1 },
            MatchEvent::Resumed { elapsed: 1 }
        );
    }
}
