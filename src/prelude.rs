//! Convenient re-exports for common usage.
//!
//! ```rust
//! use touchline::prelude::*;
//! ```
//!
//! # What's Included
//!
//! - **Session**: [`MatchSession`], [`MatchBuilder`], [`MatchConfig`], [`MatchEvent`], [`PendingAction`]
//! - **Identities**: [`PlayerId`], [`SlotKey`], [`Player`], [`Roster`]
//! - **Engine outcomes**: [`MatchPhase`], [`ClockTransition`], [`Toggle`], [`MoveTarget`],
//!   [`MoveOutcome`], [`Selection`], [`SubstitutionOutcome`], [`UndoOutcome`]
//! - **Error handling**: [`TouchlineError`], [`TouchlineResult`]

pub use crate::session::builder::MatchBuilder;
pub use crate::session::confirmation::PendingAction;
pub use crate::session::match_session::MatchSession;

pub use crate::{MatchConfig, MatchEvent};

pub use crate::{Player, PlayerId, Roster, SlotKey};

pub use crate::{
    ClockTransition, MatchPhase, MoveOutcome, MoveTarget, Selection, SubstitutionOutcome, Toggle,
    UndoOutcome,
};

pub use crate::{TouchlineError, TouchlineResult};
