//! Tests for the `InvariantChecker` implementations.
//!
//! # Invariants Tested
//!
//! ## SlotAssignment
//! - every occupant is known to the formation, and no player holds two slots
//!
//! ## MatchClock
//! - elapsed time stays within full time, and no player outlasts the match
//!
//! ## Ledger
//! - the cached tally equals a fold over the log
//! - nobody collects more than two yellow cards
//!
//! ## MatchSession
//! - no sent-off player stands on the field
//! - while live, the clock accrues exactly the on-field players

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use crate::common::{after, nth, observed_session, slot, started_session};
use touchline::telemetry::{InvariantChecker, ViolationKind};
use touchline::{
    assert_invariants, assert_no_violations, ActionRecord, FormationCatalog, Ledger,
    MatchClock, MoveTarget, SlotAssignment, Tally,
};
use web_time::Instant;

// ============================================================================
// Component checks
// ============================================================================

#[test]
fn fresh_components_hold_invariants() {
    let catalog = FormationCatalog::builtin();
    let formation = catalog.get("1-4-4-2").unwrap();

    assert!(SlotAssignment::new(formation).check_invariants().is_ok());
    assert!(MatchClock::new().check_invariants().is_ok());
    assert!(Ledger::new().check_invariants().is_ok());
}

#[test]
fn clock_holds_invariants_through_both_halves() {
    let mut clock = MatchClock::new();
    let kick_off = Instant::now();
    let times = (1..=3).map(|n| (nth(n), 0)).collect();
    clock
        .start([nth(1), nth(2)], times, 2, kick_off)
        .unwrap();

    clock.poll(after(kick_off, 75));
    assert_invariants!(clock, "after half-time");
    clock.toggle_play_pause(after(kick_off, 80));
    clock.set_active_players([nth(1), nth(3)]);
    clock.poll(after(kick_off, 500));
    assert_invariants!(clock, "after full time");

    assert_eq!(clock.elapsed_seconds(), 120);
    assert_eq!(clock.player_time(&nth(1)), 120);
    assert_eq!(clock.player_time(&nth(2)), 60);
    assert_eq!(clock.player_time(&nth(3)), 60);
}

#[test]
fn ledger_tally_matches_fold_after_undo() {
    let catalog = FormationCatalog::builtin();
    let mut assignment = SlotAssignment::new(catalog.get("1-4-4-2").unwrap());
    assignment.assign(&slot("GK"), &nth(1), None).unwrap();

    let mut ledger = Ledger::new();
    ledger.goal(&nth(9));
    ledger.yellow_card(&nth(1), &mut assignment);
    ledger.yellow_card(&nth(1), &mut assignment);
    ledger.opponent_goal();
    ledger.undo_last(&mut assignment);

    assert_invariants!(ledger);
    assert_eq!(ledger.tally(), &Tally::fold(ledger.records()));
    assert!(matches!(
        ledger.last(),
        Some(ActionRecord::YellowCard {
            second_yellow: Some(_),
            ..
        })
    ));
    assert_eq!(assignment.occupant(&slot("GK")), None);
}

// ============================================================================
// Session checks
// ============================================================================

#[test]
fn busy_match_never_reports_an_invariant_violation() {
    let (mut session, observer) = observed_session();
    let kick_off = Instant::now();
    session.start(kick_off).unwrap();

    session.poll(after(kick_off, 61));
    session.assign(&slot("LM"), &nth(18)).unwrap();
    session.goal(&nth(10)).unwrap();
    session.yellow_card(&nth(4)).unwrap();

    session.toggle_incoming(&nth(13)).unwrap();
    session.toggle_outgoing(&nth(4)).unwrap();
    session.commit_substitution().unwrap();

    session.begin_move(&nth(9)).unwrap();
    session.propose_move(MoveTarget::Slot(slot("RM"))).unwrap();
    assert_invariants!(session, "gesture open");
    session.commit_move().unwrap();

    session.red_card(&nth(2)).unwrap();
    session.undo_last().unwrap();
    session.poll(after(kick_off, 5_000));

    assert_invariants!(session);
    assert!(!observer.has_violation(ViolationKind::Invariant));
    assert_no_violations!(observer);
}

#[test]
fn clock_follows_lineup_after_every_kind_of_change() {
    let (mut session, _) = started_session();
    let check = |session: &touchline::MatchSession| {
        assert_eq!(
            session.clock().active_players(),
            &session.assignment().active_players()
        );
        assert_invariants!(session);
    };

    session.unassign(&slot("CF2")).unwrap();
    check(&session);
    session.swap(&slot("CF"), &slot("CF2")).unwrap();
    check(&session);
    session.bench_player(&nth(7)).unwrap();
    check(&session);
    session.red_card(&nth(3)).unwrap();
    check(&session);
    session.undo_last().unwrap();
    check(&session);
    session.assign(&slot("CM"), &nth(14)).unwrap();
    check(&session);
}
