//! Property-based tests for the match session.
//!
//! These tests use proptest to drive a session with random operation
//! sequences and check that its guarantees hold whatever the order.
//!
//! # Properties Tested
//!
//! - Injectivity: no player ever holds two slots
//! - Accrual: each player's time equals the match seconds spent on the field
//! - Edges: half-time and full time each fire exactly once, whatever the poll cadence
//! - Undo: N ledger actions followed by N undos restore tallies and lineup
//! - Capacity: `max_active == total_slots - red cards`, and a full team rejects entrants
//! - Atomicity: a rejected operation leaves lineup and ledger untouched
//! - Gestures: cards, substitutions and undo made while a drag is open still
//!   reach the clock before the next poll

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::collections::{BTreeMap, BTreeSet};

use crate::common::{lined_up_session, nth, squad, SQUAD_SIZE};
use proptest::prelude::*;
use touchline::telemetry::InvariantChecker;
use touchline::{
    ClockTransition, MatchBuilder, MatchConfig, MatchPhase, MatchSession, MoveTarget, PlayerId,
    SlotKey, Toggle, TouchlineError,
};
use web_time::{Duration, Instant};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// One operator or timer action.
#[derive(Debug, Clone)]
enum Op {
    Poll(u64),
    TogglePause,
    Assign(usize, usize),
    Unassign(usize),
    Swap(usize, usize),
    BeginMove(usize),
    ProposeMove(Option<usize>),
    CommitMove,
    AbortMove,
    Goal(usize),
    OpponentGoal,
    RedCard(usize),
    YellowCard(usize),
    Undo,
    ToggleIncoming(usize),
    ToggleOutgoing(usize),
    CommitSubstitution,
}

/// Ledger-only actions, for the undo property.
#[derive(Debug, Clone)]
enum LedgerOp {
    Goal(usize),
    OpponentGoal,
    RedCard(usize),
    YellowCard(usize),
}

const SLOTS: usize = 11;

fn player_index() -> impl Strategy<Value = usize> {
    1usize..=SQUAD_SIZE
}

fn slot_index() -> impl Strategy<Value = usize> {
    0usize..SLOTS
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u64..20_000).prop_map(Op::Poll),
        1 => Just(Op::TogglePause),
        3 => (slot_index(), player_index()).prop_map(|(s, p)| Op::Assign(s, p)),
        1 => slot_index().prop_map(Op::Unassign),
        1 => (slot_index(), slot_index()).prop_map(|(a, b)| Op::Swap(a, b)),
        2 => player_index().prop_map(Op::BeginMove),
        2 => proptest::option::of(slot_index()).prop_map(Op::ProposeMove),
        2 => Just(Op::CommitMove),
        1 => Just(Op::AbortMove),
        2 => player_index().prop_map(Op::Goal),
        1 => Just(Op::OpponentGoal),
        1 => player_index().prop_map(Op::RedCard),
        1 => player_index().prop_map(Op::YellowCard),
        2 => Just(Op::Undo),
        2 => player_index().prop_map(Op::ToggleIncoming),
        2 => player_index().prop_map(Op::ToggleOutgoing),
        1 => Just(Op::CommitSubstitution),
    ]
}

fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        player_index().prop_map(LedgerOp::Goal),
        Just(LedgerOp::OpponentGoal),
        player_index().prop_map(LedgerOp::RedCard),
        player_index().prop_map(LedgerOp::YellowCard),
    ]
}

// ============================================================================
// Harness
// ============================================================================

/// A started session plus an independent model of per-player time.
struct Harness {
    session: MatchSession,
    now: Instant,
    expected: BTreeMap<PlayerId, u32>,
}

impl Harness {
    fn new() -> Self {
        let mut session = lined_up_session();
        let now = Instant::now();
        session.start(now).unwrap();
        Self {
            session,
            now,
            expected: BTreeMap::new(),
        }
    }

    fn slot(&self, index: usize) -> SlotKey {
        self.session.assignment().slots()[index].clone()
    }

    fn apply(&mut self, op: &Op) -> Result<(), TouchlineError> {
        match op {
            Op::Poll(ms) => {
                self.now += Duration::from_millis(*ms);
                self.session.poll(self.now);
            },
            Op::TogglePause => {
                self.session.toggle_play_pause(self.now);
            },
            Op::Assign(s, p) => {
                let slot = self.slot(*s);
                self.session.assign(&slot, &nth(*p))?;
            },
            Op::Unassign(s) => {
                let slot = self.slot(*s);
                self.session.unassign(&slot)?;
            },
            Op::Swap(a, b) => {
                let (a, b) = (self.slot(*a), self.slot(*b));
                self.session.swap(&a, &b)?;
            },
            Op::BeginMove(p) => {
                self.session.begin_move(&nth(*p))?;
            },
            Op::ProposeMove(target) => {
                let target = target.map_or(MoveTarget::Bench, |s| MoveTarget::Slot(self.slot(s)));
                self.session.propose_move(target)?;
            },
            Op::CommitMove => {
                self.session.commit_move()?;
            },
            Op::AbortMove => {
                self.session.abort_move();
            },
            Op::Goal(p) => {
                self.session.goal(&nth(*p))?;
            },
            Op::OpponentGoal => {
                self.session.opponent_goal()?;
            },
            Op::RedCard(p) => {
                self.session.red_card(&nth(*p))?;
            },
            Op::YellowCard(p) => {
                self.session.yellow_card(&nth(*p))?;
            },
            Op::Undo => {
                self.session.undo_last()?;
            },
            Op::ToggleIncoming(p) => {
                self.session.toggle_incoming(&nth(*p))?;
            },
            Op::ToggleOutgoing(p) => {
                self.session.toggle_outgoing(&nth(*p))?;
            },
            Op::CommitSubstitution => {
                self.session.commit_substitution()?;
            },
        }
        Ok(())
    }

    /// Applies `op`, crediting the model with any match time that passed.
    fn step(&mut self, op: &Op) -> Result<(), TouchlineError> {
        let on_field = self.session.assignment().active_players();
        let before = self.session.elapsed_seconds();
        let result = self.apply(op);
        let gained = self.session.elapsed_seconds() - before;
        for player in on_field {
            *self.expected.entry(player).or_insert(0) += gained;
        }
        result
    }
}

fn occupants(session: &MatchSession) -> BTreeMap<SlotKey, PlayerId> {
    session.assignment().occupants().clone()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Invariants, accrual and capacity hold after every step.
    #[test]
    fn random_play_preserves_guarantees(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        let mut harness = Harness::new();

        for op in &ops {
            let lineup_before = occupants(&harness.session);
            let ledger_before = harness.session.ledger().len();

            let result = harness.step(op);

            if result.is_err() {
                prop_assert_eq!(&occupants(&harness.session), &lineup_before, "{:?}", op);
                prop_assert_eq!(harness.session.ledger().len(), ledger_before, "{:?}", op);
            }
            prop_assert!(harness.session.check_invariants().is_ok(), "{:?}", op);
            if harness.session.phase().is_live() {
                prop_assert_eq!(
                    harness.session.clock().active_players(),
                    &harness.session.assignment().active_players(),
                    "{:?}", op
                );
            }

            let placed: BTreeSet<&PlayerId> = harness.session.assignment().occupants().values().collect();
            prop_assert_eq!(placed.len(), harness.session.assignment().occupied());

            let reds = harness.session.ledger().tally().red_card_total() as usize;
            prop_assert_eq!(harness.session.max_active(), SLOTS.saturating_sub(reds));
            if harness.session.phase() != MatchPhase::Idle {
                prop_assert!(harness.session.assignment().occupied() <= SLOTS);
            }
        }

        for n in 1..=SQUAD_SIZE {
            let id = nth(n);
            let expected = harness.expected.get(&id).copied().unwrap_or(0);
            prop_assert_eq!(harness.session.player_time(&id), expected, "player {}", id);
        }
    }

    /// Half-time and full time fire once each for any poll cadence.
    #[test]
    fn boundaries_fire_exactly_once(steps in proptest::collection::vec(100u64..45_000, 1..64)) {
        let mut session = MatchBuilder::new()
            .with_roster(squad())
            .with_config(MatchConfig::with_duration_minutes(2))
            .build()
            .unwrap();
        session.auto_assign().unwrap();
        let mut now = Instant::now();
        session.start(now).unwrap();

        let mut half_times = 0;
        let mut full_times = 0;
        let mut cycle = steps.iter().cycle();
        for _ in 0..10_000 {
            if session.phase() == MatchPhase::Finished {
                break;
            }
            now += Duration::from_millis(*cycle.next().unwrap());
            match session.poll(now) {
                Some(ClockTransition::HalfTime { elapsed }) => {
                    prop_assert_eq!(elapsed, 60);
                    half_times += 1;
                    prop_assert_eq!(session.toggle_play_pause(now), Toggle::Resumed);
                },
                Some(ClockTransition::FullTime { elapsed }) => {
                    prop_assert_eq!(elapsed, 120);
                    full_times += 1;
                },
                None => {},
            }
        }

        prop_assert_eq!(half_times, 1);
        prop_assert_eq!(full_times, 1);
        prop_assert_eq!(session.elapsed_seconds(), 120);
        prop_assert_eq!(session.player_time(&nth(1)), 120);
        prop_assert_eq!(session.player_time(&nth(12)), 0);
        prop_assert_eq!(session.poll(now + Duration::from_secs(600)), None);
    }

    /// N accepted ledger actions followed by N undos is a no-op.
    #[test]
    fn undo_inverts_exactly(ops in proptest::collection::vec(ledger_op_strategy(), 1..40)) {
        let mut session = lined_up_session();
        session.start(Instant::now()).unwrap();
        let tally_before = session.ledger().tally().clone();
        let lineup_before = occupants(&session);
        let max_before = session.max_active();

        let mut accepted = 0;
        for op in &ops {
            let result = match op {
                LedgerOp::Goal(p) => session.goal(&nth(*p)),
                LedgerOp::OpponentGoal => session.opponent_goal(),
                LedgerOp::RedCard(p) => session.red_card(&nth(*p)),
                LedgerOp::YellowCard(p) => session.yellow_card(&nth(*p)),
            };
            if result.is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(session.ledger().len(), accepted);

        for _ in 0..accepted {
            session.undo_last().unwrap();
        }

        prop_assert!(session.ledger().is_empty());
        prop_assert_eq!(session.ledger().tally(), &tally_before);
        prop_assert_eq!(occupants(&session), lineup_before);
        prop_assert_eq!(session.max_active(), max_before);
        prop_assert_eq!(
            session.clock().active_players(),
            &session.assignment().active_players()
        );
    }

    /// After k red cards on starters a full team rejects every bench entrant.
    #[test]
    fn capacity_shrinks_with_red_cards(sent_off in proptest::sample::subsequence((1..=SLOTS).collect::<Vec<_>>(), 1..5)) {
        let mut session = lined_up_session();
        session.start(Instant::now()).unwrap();
        for n in &sent_off {
            session.red_card(&nth(*n)).unwrap();
        }

        prop_assert_eq!(session.max_active(), SLOTS - sent_off.len());
        prop_assert_eq!(session.assignment().occupied(), session.max_active());

        let empty: Vec<SlotKey> = session.assignment().empty_slots().cloned().collect();
        prop_assert_eq!(empty.len(), sent_off.len());
        for slot in &empty {
            let err = session.assign(slot, &nth(SQUAD_SIZE)).unwrap_err();
            let is_capacity = matches!(err, TouchlineError::CapacityExceeded { .. });
            prop_assert!(is_capacity);
        }
    }
}
