use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tracing::debug;
use web_time::{Duration, Instant};

use crate::assignment::{MoveOutcome, MoveTarget, SlotAssignment};
use crate::clock::{ClockTransition, Half, MatchClock, MatchPhase, Toggle};
use crate::config::MatchConfig;
use crate::error::InvalidRequestKind;
use crate::formation::{Formation, FormationCatalog};
use crate::ledger::{ActionRecord, Ledger, UndoOutcome};
use crate::roster::{Player, Roster};
use crate::session::confirmation::{self, PendingAction};
use crate::session::event_drain::EventDrain;
use crate::snapshot::MatchSnapshot;
use crate::substitution::{Selection, SubstitutionOutcome, SubstitutionProposal};
use crate::telemetry::{
    InvariantChecker, InvariantViolation, ViolationKind, ViolationObserver, ViolationSeverity,
};
use crate::{
    debug_check_invariants, report_violation_to, MatchEvent, PlayerId, SlotKey, TouchlineError,
    TouchlineResult,
};

/// Ordering for [`MatchSession::substitutes`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum SubstituteSort {
    /// By jersey number.
    #[default]
    Number,
    /// By primary position, then jersey number.
    Position,
}

/// Result of [`MatchSession::perform`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Performed {
    /// A record was appended to the ledger.
    Recorded(ActionRecord),
    /// The last record was undone (or the ledger was empty).
    Undone(UndoOutcome),
}

/// One match in progress.
///
/// `MatchSession` owns the clock, the slot assignment, the ledger and the
/// open substitution proposal, and is the only way to mutate them together.
/// Every public method is one atomic step: when it returns `Err`, nothing
/// changed. After each successful mutation the on-field set is reconciled
/// once and handed to the clock.
///
/// Once the match is [`Finished`](MatchPhase::Finished) every mutation is
/// rejected with [`TouchlineError::InvalidTransition`] until
/// [`cancel`](Self::cancel) returns the session to idle.
pub struct MatchSession {
    team_name: String,
    roster: Roster,
    catalog: FormationCatalog,
    formation: Formation,
    config: MatchConfig,
    clock: MatchClock,
    assignment: SlotAssignment,
    ledger: Ledger,
    proposal: SubstitutionProposal,
    event_queue: VecDeque<MatchEvent>,
    event_queue_size: usize,
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl std::fmt::Debug for MatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchSession")
            .field("team_name", &self.team_name)
            .field("formation", &self.formation.name())
            .field("phase", &self.clock.phase())
            .field("elapsed_seconds", &self.clock.elapsed_seconds())
            .field("occupied", &self.assignment.occupied())
            .field("ledger_len", &self.ledger.len())
            .field("proposal", &self.proposal)
            .field("pending_events", &self.event_queue.len())
            .field("has_violation_observer", &self.violation_observer.is_some())
            .finish_non_exhaustive()
    }
}

impl MatchSession {
    pub(crate) fn new(
        team_name: String,
        roster: Roster,
        catalog: FormationCatalog,
        formation: Formation,
        config: MatchConfig,
        violation_observer: Option<Arc<dyn ViolationObserver>>,
        event_queue_size: usize,
    ) -> Self {
        let assignment = SlotAssignment::new(&formation);
        Self {
            team_name,
            roster,
            catalog,
            formation,
            config,
            clock: MatchClock::new(),
            assignment,
            ledger: Ledger::new(),
            proposal: SubstitutionProposal::new(),
            event_queue: VecDeque::new(),
            event_queue_size,
            violation_observer,
        }
    }

    // #############
    // #  HELPERS  #
    // #############

    fn ensure_not_finished(&self, operation: &'static str) -> TouchlineResult<()> {
        let phase = self.clock.phase();
        if phase == MatchPhase::Finished {
            return Err(TouchlineError::InvalidTransition { operation, phase });
        }
        Ok(())
    }

    fn ensure_phase(&self, operation: &'static str, allowed: bool) -> TouchlineResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(TouchlineError::InvalidTransition {
                operation,
                phase: self.clock.phase(),
            })
        }
    }

    fn require_player(&self, player: &PlayerId) -> TouchlineResult<()> {
        if self.roster.contains(player) {
            Ok(())
        } else {
            Err(InvalidRequestKind::UnknownPlayer {
                player: player.clone(),
            }
            .into())
        }
    }

    fn ensure_not_sent_off(&self, player: &PlayerId) -> TouchlineResult<()> {
        if self.ledger.is_sent_off(player) {
            return Err(InvalidRequestKind::SentOff {
                player: player.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn ensure_not_reserved(&self, player: Option<&PlayerId>) -> TouchlineResult<()> {
        match player {
            Some(player) if self.proposal.is_reserved(player) => {
                Err(InvalidRequestKind::ReservedBySubstitution {
                    player: player.clone(),
                }
                .into())
            },
            _ => Ok(()),
        }
    }

    /// A player the operator may pick up and place.
    fn ensure_movable(&self, player: &PlayerId) -> TouchlineResult<()> {
        self.require_player(player)?;
        self.ensure_not_sent_off(player)?;
        self.ensure_not_reserved(Some(player))
    }

    fn push_event(&mut self, event: MatchEvent) {
        self.event_queue.push_back(event);
        while self.event_queue.len() > self.event_queue_size {
            self.event_queue.pop_front();
        }
    }

    /// Hands the on-field set to the clock if it changed.
    fn reconcile(&mut self) {
        if let Some(active) = self.assignment.reconcile_active_set() {
            self.clock.set_active_players(active.iter().cloned());
        }
        debug_check_invariants!(self);
    }

    fn reject_capacity(&mut self, player: PlayerId, max_active: usize) {
        report_violation_to!(
            &self.violation_observer,
            at self.clock.elapsed_seconds(),
            ViolationSeverity::Warning,
            ViolationKind::Assignment,
            "bench player {} rejected: {} of {} allowed on the field",
            player,
            self.assignment.occupied(),
            max_active
        );
        self.push_event(MatchEvent::AssignmentRejected { player, max_active });
    }

    fn on_transition(&mut self, transition: ClockTransition) {
        match transition {
            ClockTransition::HalfTime { elapsed } => {
                self.push_event(MatchEvent::HalfTime { elapsed });
            },
            ClockTransition::FullTime { elapsed } => {
                self.assignment.abort_move();
                self.proposal.cancel();
                self.reconcile();
                self.push_event(MatchEvent::FullTime { elapsed });
            },
        }
    }

    // #############
    // #   CLOCK   #
    // #############

    /// Kicks off.
    ///
    /// Every slot must be filled. The time record is seeded with zero for the
    /// whole roster, bench included.
    ///
    /// # Errors
    /// - [`InvalidTransition`] unless idle.
    /// - [`InvalidRequest`] with `IncompleteLineup` if a slot is empty.
    ///
    /// [`InvalidTransition`]: TouchlineError::InvalidTransition
    /// [`InvalidRequest`]: TouchlineError::InvalidRequest
    pub fn start(&mut self, now: Instant) -> TouchlineResult<()> {
        self.ensure_phase("start", self.clock.phase() == MatchPhase::Idle)?;
        let missing = self.assignment.empty_slots().count();
        if missing > 0 {
            return Err(InvalidRequestKind::IncompleteLineup { missing }.into());
        }
        let initial_times: BTreeMap<PlayerId, u32> =
            self.roster.ids().map(|id| (id.clone(), 0)).collect();
        self.clock.start(
            self.assignment.active_players(),
            initial_times,
            self.config.total_duration_minutes,
            now,
        )?;
        self.assignment.abort_move();
        self.reconcile();
        self.push_event(MatchEvent::Started);
        Ok(())
    }

    /// Advances the clock to `now`. Call from the host's periodic timer.
    pub fn poll(&mut self, now: Instant) -> Option<ClockTransition> {
        let transition = self.clock.poll(now)?;
        self.on_transition(transition);
        Some(transition)
    }

    /// Advances the clock by a measured amount of real time.
    ///
    /// For hosts that measure time themselves; see [`MatchClock::advance`].
    pub fn advance(&mut self, delta: Duration) -> Option<ClockTransition> {
        let transition = self.clock.advance(delta)?;
        self.on_transition(transition);
        Some(transition)
    }

    /// Pauses or resumes. Does nothing while idle or finished.
    pub fn toggle_play_pause(&mut self, now: Instant) -> Toggle {
        let toggle = self.clock.toggle_play_pause(now);
        let elapsed = self.clock.elapsed_seconds();
        match toggle {
            Toggle::Paused => self.push_event(MatchEvent::Paused { elapsed }),
            Toggle::Resumed => self.push_event(MatchEvent::Resumed { elapsed }),
            Toggle::Transitioned(transition) => self.on_transition(transition),
            Toggle::Ignored => {},
        }
        toggle
    }

    /// Abandons the match and returns to idle.
    ///
    /// Time, the ledger and any open proposal are discarded. The lineup is
    /// kept so that the next kick-off can reuse it.
    pub fn cancel(&mut self) {
        let previous = self.clock.phase();
        self.clock.cancel();
        self.ledger.clear();
        self.proposal.cancel();
        self.assignment.abort_move();
        self.reconcile();
        if previous != MatchPhase::Idle {
            self.push_event(MatchEvent::Cancelled);
        }
        debug!(%previous, "match cancelled");
    }

    // #############
    // #  LINEUP   #
    // #############

    /// Switches formation, emptying every slot. Only before kick-off.
    pub fn set_formation(&mut self, name: &str) -> TouchlineResult<()> {
        self.ensure_phase("change formation", self.clock.phase() == MatchPhase::Idle)?;
        let formation = self.catalog.require(name)?.clone();
        self.assignment.reset(&formation);
        self.formation = formation;
        self.proposal.cancel();
        self.reconcile();
        Ok(())
    }

    /// Fills the lineup by position. Only before kick-off.
    ///
    /// Returns the number of slots filled. See [`auto_assign`](crate::auto_assign).
    pub fn auto_assign(&mut self) -> TouchlineResult<usize> {
        self.ensure_phase("auto-assign", self.clock.phase() == MatchPhase::Idle)?;
        let filled = self.assignment.auto_fill(&self.roster);
        self.proposal.cancel();
        self.reconcile();
        Ok(filled)
    }

    /// Puts `player` into `slot`, benching the occupant.
    ///
    /// # Errors
    /// - [`CapacityExceeded`] if a bench player would fill an empty slot while
    ///   the team is at its card-reduced limit. An
    ///   [`AssignmentRejected`](MatchEvent::AssignmentRejected) event is queued.
    /// - [`InvalidRequest`] for unknown ids, sent-off players, or players
    ///   reserved by the substitution proposal.
    ///
    /// [`CapacityExceeded`]: TouchlineError::CapacityExceeded
    /// [`InvalidRequest`]: TouchlineError::InvalidRequest
    pub fn assign(
        &mut self,
        slot: &SlotKey,
        player: &PlayerId,
    ) -> TouchlineResult<Option<PlayerId>> {
        self.ensure_not_finished("assign a player")?;
        self.ensure_movable(player)?;
        self.ensure_not_reserved(self.assignment.occupant(slot))?;
        let max_active = self.max_active();
        match self.assignment.assign(slot, player, Some(max_active)) {
            Ok(displaced) => {
                self.reconcile();
                Ok(displaced)
            },
            Err(err) => {
                if matches!(err, TouchlineError::CapacityExceeded { .. }) {
                    self.reject_capacity(player.clone(), max_active);
                }
                Err(err)
            },
        }
    }

    /// Empties `slot`.
    pub fn unassign(&mut self, slot: &SlotKey) -> TouchlineResult<Option<PlayerId>> {
        self.ensure_not_finished("unassign a slot")?;
        self.ensure_not_reserved(self.assignment.occupant(slot))?;
        let removed = self.assignment.unassign(slot)?;
        self.reconcile();
        Ok(removed)
    }

    /// Sends a field player to the bench, returning the slot they left.
    pub fn bench_player(&mut self, player: &PlayerId) -> TouchlineResult<Option<SlotKey>> {
        self.ensure_not_finished("bench a player")?;
        self.require_player(player)?;
        self.ensure_not_reserved(Some(player))?;
        let slot = self.assignment.bench_player(player);
        self.reconcile();
        Ok(slot)
    }

    /// Exchanges the occupants of two slots.
    pub fn swap(&mut self, a: &SlotKey, b: &SlotKey) -> TouchlineResult<()> {
        self.ensure_not_finished("swap slots")?;
        self.ensure_not_reserved(self.assignment.occupant(a))?;
        self.ensure_not_reserved(self.assignment.occupant(b))?;
        self.assignment.swap(a, b)?;
        self.reconcile();
        Ok(())
    }

    /// Picks up `player` for a drag gesture.
    pub fn begin_move(&mut self, player: &PlayerId) -> TouchlineResult<()> {
        self.ensure_not_finished("move a player")?;
        self.ensure_movable(player)?;
        self.assignment.begin_move(player)
    }

    /// Hovers the open gesture over `target`. Nothing is reconciled.
    pub fn propose_move(&mut self, target: MoveTarget) -> TouchlineResult<()> {
        self.ensure_not_finished("move a player")?;
        self.assignment.propose_move(target)
    }

    /// Drops the moving player on the proposed target.
    ///
    /// The gesture is closed whether or not the drop is accepted.
    pub fn commit_move(&mut self) -> TouchlineResult<MoveOutcome> {
        self.ensure_not_finished("move a player")?;
        let moving = self.assignment.moving_player().cloned();
        // The proposal and the ledger may have changed since the gesture opened.
        let still_movable = match &moving {
            Some(player) => self.ensure_movable(player),
            None => Ok(()),
        };
        let target_free = still_movable.and_then(|()| match self.assignment.proposed_target() {
            Some(MoveTarget::Slot(slot)) => {
                let occupant = self.assignment.occupant(slot);
                if occupant == moving.as_ref() {
                    Ok(())
                } else {
                    self.ensure_not_reserved(occupant)
                }
            },
            _ => Ok(()),
        });
        if let Err(err) = target_free {
            self.assignment.abort_move();
            self.reconcile();
            return Err(err);
        }
        let max_active = self.max_active();
        let result = self.assignment.commit_move(max_active);
        if let (Err(TouchlineError::CapacityExceeded { .. }), Some(player)) = (&result, moving) {
            self.reject_capacity(player, max_active);
        }
        self.reconcile();
        result
    }

    /// Abandons the open gesture.
    pub fn abort_move(&mut self) -> Option<PlayerId> {
        let player = self.assignment.abort_move();
        self.reconcile();
        player
    }

    // ##################
    // #  SUBSTITUTION  #
    // ##################

    /// Toggles a bench player in the substitution proposal.
    pub fn toggle_incoming(&mut self, player: &PlayerId) -> TouchlineResult<Selection> {
        self.ensure_not_finished("pick a substitute")?;
        self.require_player(player)?;
        if !self.proposal.incoming().contains(player) {
            self.ensure_not_sent_off(player)?;
            if self.assignment.is_active(player) {
                return Err(InvalidRequestKind::AlreadyOnField {
                    player: player.clone(),
                }
                .into());
            }
        }
        Ok(self.proposal.toggle_incoming(player))
    }

    /// Toggles a field player in the substitution proposal.
    pub fn toggle_outgoing(&mut self, player: &PlayerId) -> TouchlineResult<Selection> {
        self.ensure_not_finished("pick a player to come off")?;
        self.require_player(player)?;
        if !self.proposal.outgoing().contains(player) && !self.assignment.is_active(player) {
            return Err(InvalidRequestKind::NotOnField {
                player: player.clone(),
            }
            .into());
        }
        Ok(self.proposal.toggle_outgoing(player))
    }

    /// Drops the proposal without touching the lineup.
    pub fn cancel_substitution(&mut self) {
        self.proposal.cancel();
    }

    /// Applies the proposal as one batch.
    ///
    /// An incomplete proposal is left open and reported as
    /// [`SubstitutionOutcome::Incomplete`].
    pub fn commit_substitution(&mut self) -> TouchlineResult<SubstitutionOutcome> {
        self.ensure_not_finished("substitute")?;
        let outcome = match self.proposal.commit(&mut self.assignment) {
            Ok(outcome) => outcome,
            Err(err) => {
                report_violation_to!(
                    &self.violation_observer,
                    at self.clock.elapsed_seconds(),
                    ViolationSeverity::Warning,
                    ViolationKind::Substitution,
                    "substitution rejected: {}",
                    err
                );
                return Err(err);
            },
        };
        if let SubstitutionOutcome::Applied(subs) = &outcome {
            self.push_event(MatchEvent::SubstitutionApplied(subs.clone()));
            self.reconcile();
        }
        Ok(outcome)
    }

    // ############
    // #  LEDGER  #
    // ############

    fn ensure_card_target(&self, player: &PlayerId) -> TouchlineResult<()> {
        self.ensure_phase("show a card", self.clock.phase().is_live())?;
        self.require_player(player)?;
        self.ensure_not_sent_off(player)
    }

    fn after_card(&mut self, record: &ActionRecord) {
        if let (Some(player), Some(dismissal)) = (record.player(), record.dismissal()) {
            self.push_event(MatchEvent::SentOff {
                player: player.clone(),
                slot: dismissal.vacated_slot.clone(),
            });
        }
        self.reconcile();
    }

    /// Credits a goal.
    pub fn goal(&mut self, player: &PlayerId) -> TouchlineResult<ActionRecord> {
        self.ensure_phase("record a goal", self.clock.phase().is_live())?;
        self.require_player(player)?;
        self.ensure_not_sent_off(player)?;
        let record = self.ledger.goal(player).clone();
        debug_check_invariants!(self);
        Ok(record)
    }

    /// Records a goal against.
    pub fn opponent_goal(&mut self) -> TouchlineResult<ActionRecord> {
        self.ensure_phase("record a goal", self.clock.phase().is_live())?;
        let record = self.ledger.opponent_goal().clone();
        debug_check_invariants!(self);
        Ok(record)
    }

    /// Sends a player off. They leave their slot, any proposal, and any open
    /// gesture, and may not return this match.
    pub fn red_card(&mut self, player: &PlayerId) -> TouchlineResult<ActionRecord> {
        self.ensure_card_target(player)?;
        self.release(player);
        let record = self.ledger.red_card(player, &mut self.assignment).clone();
        self.after_card(&record);
        Ok(record)
    }

    /// Cautions a player. A second caution sends them off like [`red_card`](Self::red_card).
    pub fn yellow_card(&mut self, player: &PlayerId) -> TouchlineResult<ActionRecord> {
        self.ensure_card_target(player)?;
        if self.ledger.tally().yellow_cards(player) >= 1 {
            self.release(player);
        }
        let record = self.ledger.yellow_card(player, &mut self.assignment).clone();
        self.after_card(&record);
        Ok(record)
    }

    fn release(&mut self, player: &PlayerId) {
        self.proposal.remove_player(player);
        if self.assignment.moving_player() == Some(player) {
            self.assignment.abort_move();
        }
    }

    /// Reverses the last ledger record. An empty ledger is not an error.
    pub fn undo_last(&mut self) -> TouchlineResult<UndoOutcome> {
        self.ensure_phase("undo", self.clock.phase().is_live())?;
        let outcome = self.ledger.undo_last(&mut self.assignment);
        if let UndoOutcome::Undone {
            record,
            restored_slot,
        } = &outcome
        {
            if let (Some(player), Some(dismissal)) = (record.player(), record.dismissal()) {
                match (restored_slot, &dismissal.vacated_slot) {
                    (Some(slot), _) => self.push_event(MatchEvent::Reinstated {
                        player: player.clone(),
                        slot: slot.clone(),
                    }),
                    (None, Some(vacated)) => {
                        report_violation_to!(
                            &self.violation_observer,
                            at self.clock.elapsed_seconds(),
                            ViolationSeverity::Warning,
                            ViolationKind::Ledger,
                            "{} stays on the bench: slot {} was refilled",
                            player,
                            vacated
                        );
                    },
                    (None, None) => {},
                }
            }
        }
        self.reconcile();
        Ok(outcome)
    }

    /// Executes an approved [`PendingAction`].
    pub fn perform(&mut self, action: &PendingAction) -> TouchlineResult<Performed> {
        match action {
            PendingAction::Goal { player } => self.goal(player).map(Performed::Recorded),
            PendingAction::OpponentGoal => self.opponent_goal().map(Performed::Recorded),
            PendingAction::RedCard { player } => self.red_card(player).map(Performed::Recorded),
            PendingAction::YellowCard { player } => {
                self.yellow_card(player).map(Performed::Recorded)
            },
            PendingAction::UndoLast => self.undo_last().map(Performed::Undone),
        }
    }

    /// The prompt the shell should confirm before calling [`perform`](Self::perform).
    ///
    /// `None` when there is nothing to confirm (undo on an empty ledger).
    #[must_use]
    pub fn confirmation_for(&self, action: &PendingAction) -> Option<String> {
        confirmation::prompt(action, &self.roster, &self.ledger)
    }

    // #############
    // #  QUERIES  #
    // #############

    /// Players allowed on the field: slots minus red cards.
    #[must_use]
    pub fn max_active(&self) -> usize {
        self.assignment
            .total_slots()
            .saturating_sub(self.ledger.red_card_total())
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        self.clock.phase()
    }

    /// Which half is being played.
    #[must_use]
    pub fn half(&self) -> Half {
        self.clock.half()
    }

    /// Whole seconds of match time.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.clock.elapsed_seconds()
    }

    /// Seconds `player` has spent on the field.
    #[must_use]
    pub fn player_time(&self, player: &PlayerId) -> u32 {
        self.clock.player_time(player)
    }

    /// The match-day roster.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The formation in use.
    #[must_use]
    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    /// Available formations.
    #[must_use]
    pub fn catalog(&self) -> &FormationCatalog {
        &self.catalog
    }

    /// The team this session tracks. Empty unless set on the builder.
    #[must_use]
    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    /// The match configuration.
    #[must_use]
    pub fn config(&self) -> MatchConfig {
        self.config
    }

    /// The clock, read-only.
    #[must_use]
    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    /// The lineup, read-only.
    #[must_use]
    pub fn assignment(&self) -> &SlotAssignment {
        &self.assignment
    }

    /// The ledger, read-only.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The open substitution proposal.
    #[must_use]
    pub fn proposal(&self) -> &SubstitutionProposal {
        &self.proposal
    }

    /// True once `player` has been sent off this match.
    #[must_use]
    pub fn is_sent_off(&self, player: &PlayerId) -> bool {
        self.ledger.is_sent_off(player)
    }

    /// Roster players not on the field, sent-off players included.
    #[must_use]
    pub fn substitutes(&self, sort: SubstituteSort) -> Vec<&Player> {
        let mut bench: Vec<&Player> = self
            .roster
            .iter()
            .filter(|p| !self.assignment.is_active(&p.id))
            .collect();
        match sort {
            SubstituteSort::Number => bench.sort_by_key(|p| p.number),
            SubstituteSort::Position => {
                bench.sort_by(|a, b| a.position.cmp(&b.position).then(a.number.cmp(&b.number)));
            },
        }
        bench
    }

    /// True if the undo control should be enabled.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.clock.phase().is_live() && !self.ledger.is_empty()
    }

    /// True if the play/pause control should be enabled.
    #[must_use]
    pub fn can_toggle_clock(&self) -> bool {
        self.clock.phase().is_live()
    }

    /// True if `player` may be picked up and moved.
    #[must_use]
    pub fn is_draggable(&self, player: &PlayerId) -> bool {
        self.clock.phase() != MatchPhase::Finished && self.ensure_movable(player).is_ok()
    }

    /// Takes every pending event, oldest first.
    pub fn events(&mut self) -> EventDrain<'_> {
        EventDrain::from_drain(self.event_queue.drain(..))
    }

    /// The roster to carry into the next match: sent-off players are marked unavailable.
    #[must_use]
    pub fn finish_roster(&self) -> Roster {
        let mut roster = self.roster.clone();
        for player in self.ledger.tally().red_cards_by_player().keys() {
            roster.mark_unavailable(player);
        }
        roster
    }

    /// Captures the current state for the history store.
    #[must_use]
    pub fn snapshot(&self, name: impl Into<String>) -> MatchSnapshot {
        MatchSnapshot::capture(
            name.into(),
            &self.team_name,
            self.formation.name(),
            self.config.total_duration_minutes,
            &self.roster,
            &self.clock,
            &self.ledger,
        )
    }
}

impl InvariantChecker for MatchSession {
    /// # Invariants
    ///
    /// 1. The clock, lineup and ledger each hold their own invariants
    /// 2. No sent-off player is on the field
    /// 3. While live, the clock accrues exactly the on-field players
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.assignment.check_invariants()?;
        self.clock.check_invariants()?;
        self.ledger.check_invariants()?;

        if let Some(player) = self
            .assignment
            .occupants()
            .values()
            .find(|p| self.ledger.is_sent_off(p))
        {
            return Err(
                InvariantViolation::new("MatchSession", "sent-off player on the field")
                    .with_details(format!("player={}", player)),
            );
        }

        if self.clock.phase().is_live() {
            let on_field = self.assignment.active_players();
            if self.clock.active_players() != &on_field {
                return Err(InvariantViolation::new(
                    "MatchSession",
                    "clock active set differs from lineup",
                )
                .with_details(format!(
                    "clock={}, lineup={}",
                    self.clock.active_players().len(),
                    on_field.len()
                )));
            }
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
    use crate::telemetry::CollectingObserver;
    use crate::MatchBuilder;

    const POSITIONS: [&str; 14] = [
        "GK", "RB", "CB", "CB", "LB", "RM", "CM", "CM", "LM", "CF", "CF", "GK", "CB", "CM",
    ];

    fn pid(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    fn slot(key: &str) -> SlotKey {
        SlotKey::from(key)
    }

    fn roster() -> Roster {
        Roster::new(
            POSITIONS
                .iter()
                .enumerate()
                .map(|(i, pos)| {
                    let n = i + 1;
                    Player::new(format!("p{}", n), "Pat", format!("Player{}", n), n as u8, *pos)
                })
                .collect(),
        )
        .unwrap()
    }

    /// p1..p11 fill the 1-4-4-2 in order, p12..p14 on the bench.
    fn lined_up() -> MatchSession {
        let mut session = MatchBuilder::new().with_roster(roster()).build().unwrap();
        assert_eq!(session.auto_assign().unwrap(), 11);
        session
    }

    fn kicked_off() -> (MatchSession, Instant) {
        let mut session = lined_up();
        let now = Instant::now();
        session.start(now).unwrap();
        (session, now)
    }

    #[test]
    fn start_requires_full_lineup() {
        let mut session = MatchBuilder::new().with_roster(roster()).build().unwrap();
        let err = session.start(Instant::now()).unwrap_err();
        assert!(matches!(
            err,
            TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::IncompleteLineup { missing: 11 }
            }
        ));
    }

    #[test]
    fn start_seeds_whole_roster_and_queues_event() {
        let (mut session, _) = kicked_off();
        assert_eq!(session.clock().player_times().len(), 14);
        assert_eq!(session.clock().active_players().len(), 11);
        let events: Vec<_> = session.events().collect();
        assert_eq!(events, vec![MatchEvent::Started]);
        assert!(session.start(Instant::now()).is_err());
    }

    #[test]
    fn accrual_follows_substitution() {
        let (mut session, _) = kicked_off();
        session.advance(Duration::from_secs(10));
        session.toggle_incoming(&pid("p12")).unwrap();
        session.toggle_outgoing(&pid("p1")).unwrap();
        session.commit_substitution().unwrap();
        session.advance(Duration::from_secs(5));

        assert_eq!(session.player_time(&pid("p1")), 10);
        assert_eq!(session.player_time(&pid("p12")), 5);
        assert_eq!(session.player_time(&pid("p2")), 15);
        assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn capacity_rejection_is_reported() {
        let observer = Arc::new(CollectingObserver::new());
        let mut session = MatchBuilder::new()
            .with_roster(roster())
            .with_violation_observer(observer.clone())
            .build()
            .unwrap();
        session.auto_assign().unwrap();
        session.start(Instant::now()).unwrap();
        session.red_card(&pid("p1")).unwrap();
        assert_eq!(session.max_active(), 10);

        let err = session.assign(&slot("GK"), &pid("p12")).unwrap_err();
        assert!(matches!(err, TouchlineError::CapacityExceeded { .. }));
        assert!(observer.has_violation(ViolationKind::Assignment));
        assert!(session
            .events()
            .any(|e| matches!(e, MatchEvent::AssignmentRejected { max_active: 10, .. })));
        assert_eq!(session.assignment().occupant(&slot("GK")), None);
    }

    #[test]
    fn sent_off_player_cannot_return_or_be_carded_again() {
        let (mut session, _) = kicked_off();
        session.red_card(&pid("p4")).unwrap();
        assert!(!session.is_draggable(&pid("p4")));
        assert!(matches!(
            session.assign(&slot("CB2"), &pid("p4")),
            Err(TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::SentOff { .. }
            })
        ));
        assert!(session.red_card(&pid("p4")).is_err());
        assert!(session.yellow_card(&pid("p4")).is_err());
        assert!(session.toggle_incoming(&pid("p4")).is_err());
    }

    #[test]
    fn red_card_pulls_player_from_proposal() {
        let (mut session, _) = kicked_off();
        session.toggle_incoming(&pid("p12")).unwrap();
        session.toggle_outgoing(&pid("p6")).unwrap();
        session.red_card(&pid("p6")).unwrap();
        assert_eq!(session.proposal().outgoing(), &[] as &[PlayerId]);
        assert_eq!(session.proposal().incoming(), &[pid("p12")]);
    }

    #[test]
    fn reserved_players_cannot_be_dragged() {
        let (mut session, _) = kicked_off();
        session.toggle_incoming(&pid("p12")).unwrap();
        session.toggle_outgoing(&pid("p1")).unwrap();
        assert!(!session.is_draggable(&pid("p1")));
        assert!(session.begin_move(&pid("p12")).is_err());

        // Dropping someone else on a reserved player's slot is refused too
        session.begin_move(&pid("p13")).unwrap();
        session.propose_move(MoveTarget::Slot(slot("GK"))).unwrap();
        assert!(matches!(
            session.commit_move(),
            Err(TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::ReservedBySubstitution { .. }
            })
        ));
        assert_eq!(session.assignment().moving_player(), None);
        assert_eq!(session.assignment().occupant(&slot("GK")), Some(&pid("p1")));
    }

    #[test]
    fn hovering_a_drag_leaves_the_clock_alone() {
        let (mut session, _) = kicked_off();
        session.begin_move(&pid("p12")).unwrap();
        session.propose_move(MoveTarget::Slot(slot("RB"))).unwrap();
        session.propose_move(MoveTarget::Slot(slot("LB"))).unwrap();
        assert!(session.clock().active_players().contains(&pid("p5")));

        let outcome = session.commit_move().unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Placed {
                slot: slot("LB"),
                displaced: Some(pid("p5"))
            }
        );
        assert!(session.clock().active_players().contains(&pid("p12")));
        assert!(!session.clock().active_players().contains(&pid("p5")));
    }

    #[test]
    fn card_during_open_gesture_reaches_the_clock() {
        let (mut session, _) = kicked_off();
        session.begin_move(&pid("p12")).unwrap();
        session.red_card(&pid("p1")).unwrap();

        assert!(!session.clock().active_players().contains(&pid("p1")));
        session.advance(Duration::from_secs(10));
        assert_eq!(session.player_time(&pid("p1")), 0);
        assert_eq!(session.player_time(&pid("p2")), 10);
        assert_eq!(session.assignment().moving_player(), Some(&pid("p12")));
        assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn player_reserved_mid_gesture_cannot_be_dropped() {
        let (mut session, _) = kicked_off();
        session.begin_move(&pid("p12")).unwrap();
        assert_eq!(
            session.toggle_incoming(&pid("p12")).unwrap(),
            Selection::Added
        );
        session.propose_move(MoveTarget::Slot(slot("GK"))).unwrap();

        assert!(matches!(
            session.commit_move(),
            Err(TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::ReservedBySubstitution { .. }
            })
        ));
        assert_eq!(session.assignment().moving_player(), None);
        assert_eq!(session.assignment().occupant(&slot("GK")), Some(&pid("p1")));

        // The proposal is still usable
        session.toggle_outgoing(&pid("p1")).unwrap();
        assert!(matches!(
            session.commit_substitution().unwrap(),
            SubstitutionOutcome::Applied(_)
        ));
        assert_eq!(session.assignment().occupant(&slot("GK")), Some(&pid("p12")));
    }

    #[test]
    fn undo_red_card_reinstates_and_emits_event() {
        let (mut session, _) = kicked_off();
        session.red_card(&pid("p1")).unwrap();
        session.undo_last().unwrap();
        assert_eq!(session.assignment().occupant(&slot("GK")), Some(&pid("p1")));
        assert_eq!(session.max_active(), 11);
        let events: Vec<_> = session.events().collect();
        assert!(events.contains(&MatchEvent::Reinstated {
            player: pid("p1"),
            slot: slot("GK")
        }));
    }

    #[test]
    fn undo_after_refill_leaves_player_benched() {
        let observer = Arc::new(CollectingObserver::new());
        let mut session = MatchBuilder::new()
            .with_roster(roster())
            .with_violation_observer(observer.clone())
            .build()
            .unwrap();
        session.auto_assign().unwrap();
        session.start(Instant::now()).unwrap();
        session.red_card(&pid("p1")).unwrap();
        // A field player covers the empty goal
        session.assign(&slot("GK"), &pid("p2")).unwrap();
        session.undo_last().unwrap();
        assert!(!session.assignment().is_active(&pid("p1")));
        assert!(observer.has_violation(ViolationKind::Ledger));
    }

    #[test]
    fn full_time_freezes_the_session() {
        let (mut session, _) = kicked_off();
        session.toggle_incoming(&pid("p12")).unwrap();
        assert_eq!(
            session.advance(Duration::from_secs(2400)),
            Some(ClockTransition::HalfTime { elapsed: 2400 })
        );
        let resumed = session.toggle_play_pause(Instant::now());
        assert_eq!(resumed, Toggle::Resumed);
        assert_eq!(
            session.advance(Duration::from_secs(9999)),
            Some(ClockTransition::FullTime { elapsed: 4800 })
        );
        assert!(session.proposal().is_empty());
        assert!(!session.can_toggle_clock());
        assert!(!session.can_undo());
        assert!(matches!(
            session.assign(&slot("GK"), &pid("p12")),
            Err(TouchlineError::InvalidTransition { .. })
        ));
        assert!(session.goal(&pid("p9")).is_err());

        session.cancel();
        assert_eq!(session.phase(), MatchPhase::Idle);
        assert_eq!(session.assignment().occupied(), 11);
    }

    #[test]
    fn ledger_actions_need_a_live_match() {
        let mut session = lined_up();
        assert!(matches!(
            session.goal(&pid("p9")),
            Err(TouchlineError::InvalidTransition { .. })
        ));
        assert!(session.undo_last().is_err());
    }

    #[test]
    fn formation_changes_only_before_kick_off() {
        let mut session = lined_up();
        session.set_formation("1-4-3-3").unwrap();
        assert_eq!(session.assignment().occupied(), 0);
        assert!(session.set_formation("3-5-2").is_err());
        // No wingers or holding midfielder on this roster
        assert_eq!(session.auto_assign().unwrap(), 8);
        assert!(session.start(Instant::now()).is_err());

        session.set_formation("1-4-4-2").unwrap();
        session.auto_assign().unwrap();
        session.start(Instant::now()).unwrap();
        assert!(session.set_formation("1-4-3-3").is_err());
    }

    #[test]
    fn substitutes_sorting() {
        let session = lined_up();
        let by_number: Vec<u8> = session
            .substitutes(SubstituteSort::Number)
            .iter()
            .map(|p| p.number)
            .collect();
        assert_eq!(by_number, vec![12, 13, 14]);
        let by_position: Vec<&str> = session
            .substitutes(SubstituteSort::Position)
            .iter()
            .map(|p| p.position.as_str())
            .collect();
        assert_eq!(by_position, vec!["CB", "CM", "GK"]);
    }

    #[test]
    fn perform_dispatches_and_prompts_match() {
        let (mut session, _) = kicked_off();
        let action = PendingAction::Goal { player: pid("p9") };
        assert_eq!(
            session.confirmation_for(&action).unwrap(),
            "Goal scored by P. Player9?"
        );
        assert!(matches!(
            session.perform(&action).unwrap(),
            Performed::Recorded(ActionRecord::Goal { .. })
        ));
        assert!(session.can_undo());
        assert!(matches!(
            session.perform(&PendingAction::UndoLast).unwrap(),
            Performed::Undone(UndoOutcome::Undone { .. })
        ));
        assert_eq!(session.ledger().tally().team_goals(), 0);
    }

    #[test]
    fn finish_roster_marks_sent_off_unavailable() {
        let (mut session, _) = kicked_off();
        session.yellow_card(&pid("p3")).unwrap();
        session.yellow_card(&pid("p3")).unwrap();
        let roster = session.finish_roster();
        assert!(!roster.get(&pid("p3")).unwrap().available);
        assert!(roster.get(&pid("p4")).unwrap().available);
    }

    #[test]
    fn event_queue_drops_oldest() {
        let mut session = MatchBuilder::new()
            .with_roster(roster())
            .with_event_queue_size(2)
            .unwrap()
            .build()
            .unwrap();
        session.auto_assign().unwrap();
        let now = Instant::now();
        session.start(now).unwrap();
        session.toggle_play_pause(now);
        session.toggle_play_pause(now);
        let events: Vec<_> = session.events().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MatchEvent::Paused { .. }));
        assert!(matches!(events[1], MatchEvent::Resumed { .. }));
    }
}
