use serde::{Deserialize, Serialize};

/// The match clock is always in one of these phases.
///
/// ```text
///   Idle ──start──▶ Playing ◀──toggle──▶ Paused
///    ▲                 │  (half-time)      ▲
///    │                 └───────────────────┘
///    │                 │ (full-time)
///    │                 ▼
///    └────cancel──── Finished
/// ```
///
/// `cancel` returns to `Idle` from any phase. `Finished` is otherwise terminal.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// No match in progress.
    #[default]
    Idle,
    /// The clock is running.
    Playing,
    /// The clock is stopped, either by the operator or at half-time.
    Paused,
    /// Full time has been reached.
    Finished,
}

impl MatchPhase {
    /// Returns a string representation suitable for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }

    /// True while a match is underway (playing or paused).
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half the match is in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Half {
    /// Before the half-time whistle.
    First,
    /// From half-time onwards.
    Second,
}

/// An automatic phase change produced by the clock reaching a boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ClockTransition {
    /// The clock reached half-time and paused itself.
    HalfTime {
        /// Elapsed seconds at the boundary.
        elapsed: u32,
    },
    /// The clock reached full time and the match finished.
    FullTime {
        /// Elapsed seconds at the boundary.
        elapsed: u32,
    },
}

/// Result of [`MatchClock::toggle_play_pause`].
///
/// [`MatchClock::toggle_play_pause`]: crate::MatchClock::toggle_play_pause
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// The clock was playing and is now paused.
    Paused,
    /// The clock was paused and is now playing.
    Resumed,
    /// Flushing time before the pause crossed a boundary, which already stopped the clock.
    Transitioned(ClockTransition),
    /// Nothing happened: the clock is idle or finished.
    Ignored,
}
