//! The match clock.
//!
//! [`MatchClock`] owns the match phase, elapsed time, and the per-player
//! time record. It never reads the wall clock itself: callers pass an
//! [`Instant`] to [`MatchClock::poll`] whenever their periodic timer fires,
//! and the clock advances by however many whole seconds really passed since
//! the previous poll. Sub-second remainders carry over to the next poll, so
//! a timer that fires late, early, or not at all while the host is suspended
//! neither loses nor gains match time.
//!
//! Both automatic transitions are edge-triggered: a single poll that spans
//! half-time stops exactly on the half-time second and pauses, dropping the
//! excess.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};
use web_time::{Duration, Instant};

use crate::config::validate_duration;
use crate::error::InvalidRequestKind;
use crate::report_violation;
use crate::telemetry::{InvariantChecker, InvariantViolation, ViolationKind, ViolationSeverity};
use crate::{PlayerId, TouchlineError, TouchlineResult};

mod phase;

pub use phase::{ClockTransition, Half, MatchPhase, Toggle};

/// Match time and per-player time.
#[derive(Debug, Clone, Default)]
pub struct MatchClock {
    phase: MatchPhase,
    elapsed_seconds: u32,
    half_time_seconds: u32,
    full_time_seconds: u32,
    player_times: BTreeMap<PlayerId, u32>,
    active: BTreeSet<PlayerId>,
    last_poll: Option<Instant>,
    carry: Duration,
}

impl MatchClock {
    /// An idle clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kicks off.
    ///
    /// `initial_times` seeds the time record and should cover the whole
    /// roster; every id in `active` must be present.
    ///
    /// # Errors
    ///
    /// - [`TouchlineError::InvalidTransition`] if the clock is not idle.
    /// - [`TouchlineError::InvalidConfig`] if the duration is zero or odd.
    /// - [`TouchlineError::InvalidRequest`] if an active player has no initial time.
    pub fn start<I>(
        &mut self,
        active: I,
        initial_times: BTreeMap<PlayerId, u32>,
        total_duration_minutes: u32,
        now: Instant,
    ) -> TouchlineResult<()>
    where
        I: IntoIterator<Item = PlayerId>,
    {
        if self.phase != MatchPhase::Idle {
            return Err(TouchlineError::InvalidTransition {
                operation: "start",
                phase: self.phase,
            });
        }
        validate_duration(total_duration_minutes)?;
        let active: BTreeSet<PlayerId> = active.into_iter().collect();
        if let Some(missing) = active.iter().find(|id| !initial_times.contains_key(*id)) {
            return Err(InvalidRequestKind::MissingInitialTime {
                player: missing.clone(),
            }
            .into());
        }

        self.full_time_seconds = total_duration_minutes * 60;
        self.half_time_seconds = self.full_time_seconds / 2;
        self.elapsed_seconds = 0;
        self.player_times = initial_times;
        self.active = active;
        self.last_poll = Some(now);
        self.carry = Duration::ZERO;
        self.phase = MatchPhase::Playing;
        debug!(
            active = self.active.len(),
            full_time = self.full_time_seconds,
            "match clock started"
        );
        Ok(())
    }

    /// Advances to `now`.
    ///
    /// Call this from the host's periodic timer. Does nothing unless playing.
    /// Returns the transition if a boundary was reached.
    pub fn poll(&mut self, now: Instant) -> Option<ClockTransition> {
        if self.phase != MatchPhase::Playing {
            return None;
        }
        let last = match self.last_poll {
            Some(last) => last,
            None => {
                self.last_poll = Some(now);
                return None;
            },
        };
        if now < last {
            report_violation!(
                ViolationSeverity::Warning,
                ViolationKind::Clock,
                "poll instant is {:?} earlier than the previous poll at second {}",
                last.duration_since(now),
                self.elapsed_seconds
            );
            return None;
        }
        self.last_poll = Some(now);
        self.advance(now.saturating_duration_since(last))
    }

    /// Advances by a measured amount of real time.
    ///
    /// Whole seconds are credited to the match and to every active player; the
    /// sub-second remainder is carried forward. Time past a half/full-time
    /// boundary is discarded.
    pub fn advance(&mut self, delta: Duration) -> Option<ClockTransition> {
        if self.phase != MatchPhase::Playing {
            return None;
        }
        let total = self.carry.saturating_add(delta);
        let whole = total.as_secs();
        self.carry = Duration::from_nanos(u64::from(total.subsec_nanos()));

        let boundary = if self.elapsed_seconds < self.half_time_seconds {
            self.half_time_seconds
        } else {
            self.full_time_seconds
        };
        let remaining = boundary.saturating_sub(self.elapsed_seconds);
        let step = whole.min(u64::from(remaining)) as u32;
        if step > 0 {
            self.accrue(step);
        }

        if self.elapsed_seconds < boundary {
            return None;
        }
        self.carry = Duration::ZERO;
        if boundary == self.half_time_seconds {
            self.phase = MatchPhase::Paused;
            self.last_poll = None;
            debug!(elapsed = self.elapsed_seconds, "half-time");
            Some(ClockTransition::HalfTime {
                elapsed: self.elapsed_seconds,
            })
        } else {
            self.phase = MatchPhase::Finished;
            self.last_poll = None;
            debug!(elapsed = self.elapsed_seconds, "full-time");
            Some(ClockTransition::FullTime {
                elapsed: self.elapsed_seconds,
            })
        }
    }

    fn accrue(&mut self, seconds: u32) {
        self.elapsed_seconds += seconds;
        for id in &self.active {
            let time = self.player_times.entry(id.clone()).or_insert(0);
            *time = time.saturating_add(seconds);
        }
        trace!(
            seconds,
            elapsed = self.elapsed_seconds,
            active = self.active.len(),
            "accrued"
        );
    }

    /// Pauses a playing clock or resumes a paused one.
    ///
    /// Time up to `now` is credited before pausing. Idle and finished clocks
    /// are left alone.
    pub fn toggle_play_pause(&mut self, now: Instant) -> Toggle {
        match self.phase {
            MatchPhase::Playing => {
                if let Some(transition) = self.poll(now) {
                    return Toggle::Transitioned(transition);
                }
                self.phase = MatchPhase::Paused;
                self.last_poll = None;
                debug!(elapsed = self.elapsed_seconds, "clock paused");
                Toggle::Paused
            },
            MatchPhase::Paused => {
                self.phase = MatchPhase::Playing;
                self.last_poll = Some(now);
                debug!(elapsed = self.elapsed_seconds, "clock resumed");
                Toggle::Resumed
            },
            MatchPhase::Idle | MatchPhase::Finished => Toggle::Ignored,
        }
    }

    /// Returns to idle, discarding all time.
    pub fn cancel(&mut self) {
        let previous = self.phase;
        self.phase = MatchPhase::Idle;
        self.elapsed_seconds = 0;
        self.player_times.clear();
        self.active.clear();
        self.last_poll = None;
        self.carry = Duration::ZERO;
        debug!(%previous, "match clock cancelled");
    }

    /// Replaces the set of players accruing time.
    ///
    /// Only takes effect while the match is live. Returns true if the set changed.
    pub fn set_active_players<I>(&mut self, active: I) -> bool
    where
        I: IntoIterator<Item = PlayerId>,
    {
        if !self.phase.is_live() {
            return false;
        }
        let active: BTreeSet<PlayerId> = active.into_iter().collect();
        if active == self.active {
            return false;
        }
        for id in &active {
            self.player_times.entry(id.clone()).or_insert(0);
        }
        self.active = active;
        trace!(active = self.active.len(), "active set replaced");
        true
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Whole seconds of match time.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    /// Half-time boundary in seconds. Zero before the first kick-off.
    #[must_use]
    pub fn half_time_seconds(&self) -> u32 {
        self.half_time_seconds
    }

    /// Full-time boundary in seconds. Zero before the first kick-off.
    #[must_use]
    pub fn full_time_seconds(&self) -> u32 {
        self.full_time_seconds
    }

    /// Seconds a player has been on the field. Zero if unknown.
    #[must_use]
    pub fn player_time(&self, id: &PlayerId) -> u32 {
        self.player_times.get(id).copied().unwrap_or(0)
    }

    /// The full time record.
    #[must_use]
    pub fn player_times(&self) -> &BTreeMap<PlayerId, u32> {
        &self.player_times
    }

    /// Players currently accruing time.
    #[must_use]
    pub fn active_players(&self) -> &BTreeSet<PlayerId> {
        &self.active
    }

    /// First half until the half-time boundary has been reached.
    #[must_use]
    pub fn half(&self) -> Half {
        if self.phase != MatchPhase::Idle && self.elapsed_seconds >= self.half_time_seconds {
            Half::Second
        } else {
            Half::First
        }
    }

    /// True while paused exactly on the half-time second.
    #[must_use]
    pub fn is_half_time_break(&self) -> bool {
        self.phase == MatchPhase::Paused && self.elapsed_seconds == self.half_time_seconds
    }
}

impl InvariantChecker for MatchClock {
    /// # Invariants
    ///
    /// 1. An idle clock holds no time and no active players
    /// 2. Elapsed time never exceeds full time
    /// 3. A finished clock sits exactly on full time
    /// 4. Every active player has a time record
    /// 5. The carried remainder is below one second
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.phase == MatchPhase::Idle {
            if self.elapsed_seconds != 0 || !self.player_times.is_empty() || !self.active.is_empty()
            {
                return Err(
                    InvariantViolation::new("MatchClock", "idle clock holds state").with_details(
                        format!(
                            "elapsed={}, times={}, active={}",
                            self.elapsed_seconds,
                            self.player_times.len(),
                            self.active.len()
                        ),
                    ),
                );
            }
            return Ok(());
        }

        if self.elapsed_seconds > self.full_time_seconds {
            return Err(
                InvariantViolation::new("MatchClock", "elapsed exceeds full time").with_details(
                    format!(
                        "elapsed={}, full={}",
                        self.elapsed_seconds, self.full_time_seconds
                    ),
                ),
            );
        }

        if self.phase == MatchPhase::Finished && self.elapsed_seconds != self.full_time_seconds {
            return Err(
                InvariantViolation::new("MatchClock", "finished before full time").with_details(
                    format!(
                        "elapsed={}, full={}",
                        self.elapsed_seconds, self.full_time_seconds
                    ),
                ),
            );
        }

        if let Some(id) = self
            .active
            .iter()
            .find(|id| !self.player_times.contains_key(*id))
        {
            return Err(
                InvariantViolation::new("MatchClock", "active player without time record")
                    .with_details(format!("player={}", id)),
            );
        }

        if self.carry >= Duration::from_secs(1) {
            return Err(
                InvariantViolation::new("MatchClock", "carry is a whole second or more")
                    .with_details(format!("carry={:?}", self.carry)),
            );
        }

        Ok(())
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

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<PlayerId> {
        range.map(|n| PlayerId::from(format!("p{n}"))).collect()
    }

    fn zeroed(players: &[PlayerId]) -> BTreeMap<PlayerId, u32> {
        players.iter().map(|id| (id.clone(), 0)).collect()
    }

    fn started(minutes: u32) -> (MatchClock, Instant) {
        let roster = ids(1..=12);
        let mut clock = MatchClock::new();
        let t0 = Instant::now();
        clock
            .start(roster[..11].to_vec(), zeroed(&roster), minutes, t0)
            .unwrap();
        (clock, t0)
    }

    #[test]
    fn start_requires_idle() {
        let (mut clock, t0) = started(80);
        let err = clock.start(Vec::new(), BTreeMap::new(), 80, t0).unwrap_err();
        assert_eq!(
            err,
            TouchlineError::InvalidTransition {
                operation: "start",
                phase: MatchPhase::Playing
            }
        );
    }

    #[test]
    fn manual_pause_keeps_the_remainder() {
        let (mut clock, t0) = started(80);
        clock.advance(Duration::from_millis(2_700));
        assert_eq!(clock.toggle_play_pause(t0), Toggle::Paused);
        assert_eq!(clock.toggle_play_pause(t0), Toggle::Resumed);
        clock.advance(Duration::from_millis(400));
        assert_eq!(clock.elapsed_seconds(), 3);
        assert!(clock.check_invariants().is_ok());
    }

    #[test]
    fn start_rejects_odd_duration() {
        let mut clock = MatchClock::new();
        let result = clock.start(Vec::new(), BTreeMap::new(), 75, Instant::now());
        assert!(matches!(result, Err(TouchlineError::InvalidConfig { .. })));
        assert_eq!(clock.phase(), MatchPhase::Idle);
    }

    #[test]
    fn start_requires_time_for_every_active_player() {
        let mut clock = MatchClock::new();
        let result = clock.start(ids(1..=2), zeroed(&ids(1..=1)), 80, Instant::now());
        assert!(matches!(
            result,
            Err(TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::MissingInitialTime { .. }
            })
        ));
    }

    #[test]
    fn poll_accrues_to_active_players_only() {
        let (mut clock, t0) = started(80);
        assert_eq!(clock.poll(t0 + Duration::from_secs(10)), None);

        assert_eq!(clock.elapsed_seconds(), 10);
        for id in ids(1..=11) {
            assert_eq!(clock.player_time(&id), 10);
        }
        assert_eq!(clock.player_time(&PlayerId::from("p12")), 0);
    }

    #[test]
    fn sub_second_remainder_carries_forward() {
        let (mut clock, _) = started(80);
        clock.advance(Duration::from_millis(600));
        assert_eq!(clock.elapsed_seconds(), 0);
        clock.advance(Duration::from_millis(600));
        assert_eq!(clock.elapsed_seconds(), 1);
        clock.advance(Duration::from_millis(800));
        assert_eq!(clock.elapsed_seconds(), 2);
    }

    #[test]
    fn half_time_fires_once_and_drops_excess() {
        let (mut clock, _) = started(80);
        let transition = clock.advance(Duration::from_secs(3000));
        assert_eq!(transition, Some(ClockTransition::HalfTime { elapsed: 2400 }));
        assert_eq!(clock.phase(), MatchPhase::Paused);
        assert!(clock.is_half_time_break());
        assert_eq!(clock.half(), Half::Second);

        // Paused: nothing moves
        assert_eq!(clock.advance(Duration::from_secs(60)), None);
        assert_eq!(clock.elapsed_seconds(), 2400);

        let resumed_at = Instant::now();
        assert_eq!(clock.toggle_play_pause(resumed_at), Toggle::Resumed);
        assert!(!clock.is_half_time_break());
        assert_eq!(clock.advance(Duration::from_secs(1)), None);
        assert_eq!(clock.elapsed_seconds(), 2401);
    }

    #[test]
    fn full_time_finishes_and_freezes() {
        let (mut clock, t0) = started(2);
        assert_eq!(
            clock.advance(Duration::from_secs(60)),
            Some(ClockTransition::HalfTime { elapsed: 60 })
        );
        clock.toggle_play_pause(t0);
        assert_eq!(
            clock.advance(Duration::from_secs(500)),
            Some(ClockTransition::FullTime { elapsed: 120 })
        );
        assert_eq!(clock.phase(), MatchPhase::Finished);
        assert_eq!(clock.player_time(&PlayerId::from("p1")), 120);
        assert_eq!(clock.toggle_play_pause(t0), Toggle::Ignored);
        assert_eq!(clock.advance(Duration::from_secs(5)), None);
        assert!(clock.check_invariants().is_ok());
    }

    #[test]
    fn poll_backwards_credits_nothing() {
        let (mut clock, t0) = started(80);
        clock.poll(t0 + Duration::from_secs(5));
        assert_eq!(clock.poll(t0 + Duration::from_secs(2)), None);
        assert_eq!(clock.elapsed_seconds(), 5);
        clock.poll(t0 + Duration::from_secs(6));
        assert_eq!(clock.elapsed_seconds(), 6);
    }

    #[test]
    fn pause_flushes_elapsed_time() {
        let (mut clock, t0) = started(80);
        assert_eq!(
            clock.toggle_play_pause(t0 + Duration::from_secs(7)),
            Toggle::Paused
        );
        assert_eq!(clock.elapsed_seconds(), 7);
        // Time spent paused is not credited
        clock.toggle_play_pause(t0 + Duration::from_secs(100));
        clock.poll(t0 + Duration::from_secs(103));
        assert_eq!(clock.elapsed_seconds(), 10);
    }

    #[test]
    fn pause_across_half_time_reports_transition() {
        let (mut clock, t0) = started(80);
        assert_eq!(
            clock.toggle_play_pause(t0 + Duration::from_secs(2500)),
            Toggle::Transitioned(ClockTransition::HalfTime { elapsed: 2400 })
        );
        assert_eq!(clock.phase(), MatchPhase::Paused);
    }

    #[test]
    fn toggle_when_idle_is_ignored() {
        let mut clock = MatchClock::new();
        assert_eq!(clock.toggle_play_pause(Instant::now()), Toggle::Ignored);
        assert_eq!(clock.phase(), MatchPhase::Idle);
    }

    #[test]
    fn cancel_zeroes_everything() {
        let (mut clock, t0) = started(80);
        clock.poll(t0 + Duration::from_secs(30));
        clock.cancel();
        assert_eq!(clock.phase(), MatchPhase::Idle);
        assert_eq!(clock.elapsed_seconds(), 0);
        assert!(clock.player_times().is_empty());
        assert!(clock.active_players().is_empty());
        assert!(clock.check_invariants().is_ok());
    }

    #[test]
    fn set_active_players_reports_changes_only() {
        let (mut clock, _) = started(80);
        assert!(!clock.set_active_players(ids(1..=11)));
        assert!(clock.set_active_players(ids(2..=12)));
        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.player_time(&PlayerId::from("p1")), 0);
        assert_eq!(clock.player_time(&PlayerId::from("p12")), 3);
    }

    #[test]
    fn set_active_players_ignored_when_idle() {
        let mut clock = MatchClock::new();
        assert!(!clock.set_active_players(ids(1..=3)));
        assert!(clock.active_players().is_empty());
    }
}
