use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::{MatchPhase, PlayerId, SlotKey};

/// This enum contains all error messages this library can return. Most API functions will generally return a [`Result<(), TouchlineError>`].
///
/// Only [`TouchlineError::CapacityExceeded`] is expected during normal play; it is
/// the user-facing rejection of a bench player entering the field while the
/// team is already at its (possibly card-reduced) limit. Every other variant
/// indicates that the surrounding shell sequenced calls incorrectly.
///
/// [`Result<(), TouchlineError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TouchlineError {
    /// The operation is not legal in the current match phase.
    InvalidTransition {
        /// The operation that was attempted.
        operation: &'static str,
        /// The phase the match was in when the operation was attempted.
        phase: MatchPhase,
    },
    /// You made an invalid request, usually by using wrong parameters for function calls.
    InvalidRequest {
        /// Further specifies why the request was invalid.
        kind: InvalidRequestKind,
    },
    /// A bench player was moved into an empty slot while the field was already full.
    CapacityExceeded {
        /// The number of players allowed on the field right now.
        max_active: usize,
        /// The number of slots occupied when the request was made.
        occupied: usize,
    },
    /// A [`MatchConfig`] failed validation.
    ///
    /// [`MatchConfig`]: crate::MatchConfig
    InvalidConfig {
        /// A description of the rejected value.
        info: String,
    },
    /// Serialization or deserialization of data failed.
    SerializationError {
        /// A description of what failed to serialize/deserialize.
        context: String,
    },
}

/// Structured reasons for [`TouchlineError::InvalidRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InvalidRequestKind {
    /// The slot key is not part of the current formation.
    UnknownSlot {
        /// The slot that was requested.
        slot: SlotKey,
    },
    /// The player is not on the roster.
    UnknownPlayer {
        /// The player that was requested.
        player: PlayerId,
    },
    /// A formation name was not found in the catalog.
    UnknownFormation {
        /// The formation that was requested.
        name: String,
    },
    /// Two roster entries share the same id.
    DuplicatePlayer {
        /// The repeated id.
        player: PlayerId,
    },
    /// A formation lists the same slot twice, or no slots at all.
    MalformedFormation {
        /// The formation name.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The roster has no players.
    EmptyRoster,
    /// The player was sent off and may not be placed on the field again.
    SentOff {
        /// The player that was sent off.
        player: PlayerId,
    },
    /// The player is held by an open substitution proposal.
    ReservedBySubstitution {
        /// The reserved player.
        player: PlayerId,
    },
    /// A batch named the same slot twice.
    DuplicateSlot {
        /// The repeated slot.
        slot: SlotKey,
    },
    /// The player is already in a slot, or named twice in a batch.
    AlreadyOnField {
        /// The player.
        player: PlayerId,
    },
    /// The player is not in any slot.
    NotOnField {
        /// The player that was expected on the field.
        player: PlayerId,
    },
    /// Kick-off was requested with empty slots.
    IncompleteLineup {
        /// The number of empty slots.
        missing: usize,
    },
    /// `start` was given no initial time for an active player.
    MissingInitialTime {
        /// The player without a seeded time.
        player: PlayerId,
    },
    /// A move was proposed or committed without `begin_move`.
    NoMoveInProgress,
    /// `begin_move` was called while another move was still open.
    MoveAlreadyInProgress {
        /// The player being moved by the open gesture.
        player: PlayerId,
    },
    /// A move was committed without a target.
    MoveWithoutTarget {
        /// The player being moved.
        player: PlayerId,
    },
    /// The event queue size must be at least one.
    EventQueueTooSmall,
}

impl Display for InvalidRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSlot { slot } => write!(f, "unknown slot '{}'", slot),
            Self::UnknownPlayer { player } => write!(f, "unknown player '{}'", player),
            Self::UnknownFormation { name } => write!(f, "unknown formation '{}'", name),
            Self::DuplicatePlayer { player } => {
                write!(f, "player '{}' appears more than once on the roster", player)
            },
            Self::MalformedFormation { name, reason } => {
                write!(f, "formation '{}' is malformed: {}", name, reason)
            },
            Self::EmptyRoster => write!(f, "the roster has no players"),
            Self::SentOff { player } => {
                write!(f, "player '{}' was sent off and cannot return", player)
            },
            Self::ReservedBySubstitution { player } => {
                write!(
                    f,
                    "player '{}' is reserved by an open substitution proposal",
                    player
                )
            },
            Self::DuplicateSlot { slot } => write!(f, "slot '{}' named more than once", slot),
            Self::AlreadyOnField { player } => {
                write!(f, "player '{}' is already on the field", player)
            },
            Self::NotOnField { player } => write!(f, "player '{}' is not on the field", player),
            Self::IncompleteLineup { missing } => {
                write!(f, "{} slot(s) must be filled before kick-off", missing)
            },
            Self::MissingInitialTime { player } => {
                write!(f, "no initial time given for active player '{}'", player)
            },
            Self::NoMoveInProgress => write!(f, "no move in progress"),
            Self::MoveAlreadyInProgress { player } => {
                write!(f, "a move of player '{}' is already in progress", player)
            },
            Self::MoveWithoutTarget { player } => {
                write!(f, "move of player '{}' has no target", player)
            },
            Self::EventQueueTooSmall => write!(f, "event queue size must be at least 1"),
        }
    }
}

impl From<InvalidRequestKind> for TouchlineError {
    fn from(kind: InvalidRequestKind) -> Self {
        Self::InvalidRequest { kind }
    }
}

impl Display for TouchlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TouchlineError::InvalidTransition { operation, phase } => {
                write!(f, "Cannot {} while the match is {}", operation, phase)
            },
            TouchlineError::InvalidRequest { kind } => {
                write!(f, "Invalid Request: {}", kind)
            },
            TouchlineError::CapacityExceeded {
                max_active,
                occupied,
            } => {
                write!(
                    f,
                    "Cannot add player. Team is down to {} players due to red card(s) ({} on the field).",
                    max_active, occupied
                )
            },
            TouchlineError::InvalidConfig { info } => {
                write!(f, "Invalid configuration: {}", info)
            },
            TouchlineError::SerializationError { context } => {
                write!(f, "Serialization error: {}", context)
            },
        }
    }
}

impl Error for TouchlineError {}

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
    fn invalid_request_kind_converts_into_error() {
        let err: TouchlineError = InvalidRequestKind::UnknownSlot {
            slot: SlotKey::from("ST"),
        }
        .into();
        assert!(matches!(
            err,
            TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::UnknownSlot { .. }
            }
        ));
        assert_eq!(err.to_string(), "Invalid Request: unknown slot 'ST'");
    }

    #[test]
    fn invalid_transition_display_names_phase() {
        let err = TouchlineError::InvalidTransition {
            operation: "start",
            phase: MatchPhase::Playing,
        };
        assert_eq!(err.to_string(), "Cannot start while the match is playing");
    }

    #[test]
    fn capacity_exceeded_display_matches_alert() {
        let err = TouchlineError::CapacityExceeded {
            max_active: 10,
            occupied: 10,
        };
        assert!(err
            .to_string()
            .starts_with("Cannot add player. Team is down to 10 players"));
    }

    #[test]
    fn error_is_std_error() {
        fn takes_error(_: &dyn Error) {}
        takes_error(&TouchlineError::InvalidConfig {
            info: "zero".to_owned(),
        });
    }
}
