//! End-to-end match scenarios driven through [`MatchSession`].

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

mod common;

use common::{after, lined_up_session, nth, observed_session, pid, slot, started_session};
use touchline::telemetry::ViolationKind;
use touchline::{
    ActionRecord, ClockTransition, InvalidRequestKind, MatchEvent, MatchPhase, MatchSnapshot,
    MoveOutcome, MoveTarget, PendingAction, Performed, Selection, SubstituteSort,
    SubstitutionOutcome, Toggle, TouchlineError, UndoOutcome,
};
use web_time::Duration;

// ============================================================================
// Clock
// ============================================================================

#[test]
fn starters_accrue_and_bench_does_not() {
    let (mut session, kick_off) = started_session();
    assert_eq!(session.poll(after(kick_off, 10)), None);

    for n in 1..=11 {
        assert_eq!(session.player_time(&nth(n)), 10, "starter p{}", n);
    }
    assert_eq!(session.player_time(&nth(12)), 0);
    assert_eq!(session.elapsed_seconds(), 10);
}

#[test]
fn coarse_polls_neither_lose_nor_gain_time() {
    let (mut session, kick_off) = started_session();
    let mut now = kick_off;
    for step_ms in [700, 700, 1_900, 300, 5_400] {
        now += Duration::from_millis(step_ms);
        session.poll(now);
    }
    // 9.0 s of wall time in total
    assert_eq!(session.elapsed_seconds(), 9);
    assert_eq!(session.player_time(&nth(1)), 9);
}

#[test]
fn half_time_fires_once_then_full_time_freezes() {
    let (mut session, kick_off) = started_session();

    let transition = session.poll(after(kick_off, 40 * 60 + 25));
    assert_eq!(
        transition,
        Some(ClockTransition::HalfTime { elapsed: 2_400 })
    );
    assert_eq!(session.phase(), MatchPhase::Paused);
    assert_eq!(session.player_time(&nth(1)), 2_400);
    assert_eq!(session.poll(after(kick_off, 40 * 60 + 60)), None);

    let resume_at = after(kick_off, 3_000);
    assert_eq!(session.toggle_play_pause(resume_at), Toggle::Resumed);
    let transition = session.poll(resume_at + Duration::from_secs(2_400 + 90));
    assert_eq!(
        transition,
        Some(ClockTransition::FullTime { elapsed: 4_800 })
    );
    assert_eq!(session.phase(), MatchPhase::Finished);
    assert!(!session.can_toggle_clock());

    let events: Vec<_> = session.events().collect();
    assert_eq!(
        events,
        vec![
            MatchEvent::HalfTime { elapsed: 2_400 },
            MatchEvent::Resumed { elapsed: 2_400 },
            MatchEvent::FullTime { elapsed: 4_800 },
        ]
    );

    let err = session.goal(&nth(9)).unwrap_err();
    assert!(matches!(
        err,
        TouchlineError::InvalidTransition {
            phase: MatchPhase::Finished,
            ..
        }
    ));
    assert!(session.assign(&slot("GK"), &nth(12)).is_err());
}

#[test]
fn manual_pause_stops_accrual() {
    let (mut session, kick_off) = started_session();
    assert_eq!(session.toggle_play_pause(after(kick_off, 5)), Toggle::Paused);
    session.poll(after(kick_off, 60));
    assert_eq!(session.elapsed_seconds(), 5);

    assert_eq!(session.toggle_play_pause(after(kick_off, 60)), Toggle::Resumed);
    session.poll(after(kick_off, 63));
    assert_eq!(session.elapsed_seconds(), 8);
    assert_eq!(session.player_time(&nth(4)), 8);
}

#[test]
fn sub_second_remainder_survives_a_manual_pause() {
    let (mut session, kick_off) = started_session();
    session.poll(kick_off + Duration::from_millis(1_600));
    assert_eq!(session.elapsed_seconds(), 1);

    let paused_at = kick_off + Duration::from_millis(1_600);
    assert_eq!(session.toggle_play_pause(paused_at), Toggle::Paused);
    let resumed_at = after(kick_off, 30);
    assert_eq!(session.toggle_play_pause(resumed_at), Toggle::Resumed);

    // 0.6 s before the pause plus 0.5 s after it make one whole second
    session.poll(resumed_at + Duration::from_millis(500));
    assert_eq!(session.elapsed_seconds(), 2);
    assert_eq!(session.player_time(&nth(1)), 2);
}

#[test]
fn cancel_returns_to_idle_and_keeps_lineup() {
    let (mut session, kick_off) = started_session();
    session.poll(after(kick_off, 30));
    session.goal(&nth(10)).unwrap();
    session.cancel();

    assert_eq!(session.phase(), MatchPhase::Idle);
    assert_eq!(session.elapsed_seconds(), 0);
    assert_eq!(session.player_time(&nth(1)), 0);
    assert!(session.ledger().is_empty());
    assert_eq!(session.assignment().occupied(), 11);
    assert_eq!(session.events().last(), Some(MatchEvent::Cancelled));

    session.start(after(kick_off, 100)).unwrap();
    assert_eq!(session.phase(), MatchPhase::Playing);
}

#[test]
fn start_requires_full_lineup() {
    let mut session = lined_up_session();
    session.unassign(&slot("CF2")).unwrap();
    let err = session.start(web_time::Instant::now()).unwrap_err();
    assert_eq!(
        err,
        TouchlineError::InvalidRequest {
            kind: InvalidRequestKind::IncompleteLineup { missing: 1 }
        }
    );
    assert_eq!(session.phase(), MatchPhase::Idle);
}

// ============================================================================
// Slot assignment
// ============================================================================

#[test]
fn bench_player_onto_occupied_slot_bumps_occupant() {
    let (mut session, _) = started_session();
    let displaced = session.assign(&slot("GK"), &nth(12)).unwrap();

    assert_eq!(displaced, Some(nth(1)));
    assert_eq!(session.assignment().slot_of(&nth(1)), None);
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(12)));
    assert_eq!(session.assignment().occupied(), 11);
    assert!(session.clock().active_players().contains(&nth(12)));
    assert!(!session.clock().active_players().contains(&nth(1)));
}

#[test]
fn substitute_accrues_only_after_entering() {
    let (mut session, kick_off) = started_session();
    session.poll(after(kick_off, 20));
    session.assign(&slot("CF"), &nth(16)).unwrap();
    session.poll(after(kick_off, 35));

    assert_eq!(session.player_time(&nth(10)), 20);
    assert_eq!(session.player_time(&nth(16)), 15);
    assert_eq!(session.player_time(&nth(11)), 35);
}

#[test]
fn hovering_a_drag_leaves_the_clock_alone_until_drop() {
    let (mut session, kick_off) = started_session();
    session.begin_move(&nth(14)).unwrap();
    session.propose_move(MoveTarget::Slot(slot("CM"))).unwrap();
    session.propose_move(MoveTarget::Slot(slot("CM2"))).unwrap();
    assert!(session.clock().active_players().contains(&nth(8)));

    let outcome = session.commit_move().unwrap();
    assert_eq!(
        outcome,
        MoveOutcome::Placed {
            slot: slot("CM2"),
            displaced: Some(nth(8)),
        }
    );
    assert!(session.clock().active_players().contains(&nth(14)));
    assert!(!session.clock().active_players().contains(&nth(8)));
    session.poll(after(kick_off, 4));
    assert_eq!(session.player_time(&nth(14)), 4);
}

#[test]
fn dragging_field_player_swaps_slots() {
    let (mut session, _) = started_session();
    session.begin_move(&nth(2)).unwrap();
    session.propose_move(MoveTarget::Slot(slot("LB"))).unwrap();
    let outcome = session.commit_move().unwrap();

    assert_eq!(
        outcome,
        MoveOutcome::Swapped {
            from: slot("RB"),
            to: slot("LB"),
            displaced: Some(nth(5)),
        }
    );
    assert_eq!(session.assignment().occupant(&slot("LB")), Some(&nth(2)));
    assert_eq!(session.assignment().occupant(&slot("RB")), Some(&nth(5)));
}

#[test]
fn red_cards_shrink_capacity() {
    let (mut session, observer) = observed_session();
    session.start(web_time::Instant::now()).unwrap();

    session.red_card(&nth(3)).unwrap();
    session.yellow_card(&nth(7)).unwrap();
    session.yellow_card(&nth(7)).unwrap();
    assert_eq!(session.max_active(), 9);
    assert_eq!(session.assignment().occupied(), 9);

    let err = session.assign(&slot("CB"), &nth(13)).unwrap_err();
    assert_eq!(
        err,
        TouchlineError::CapacityExceeded {
            max_active: 9,
            occupied: 9,
        }
    );
    assert!(observer.has_violation(ViolationKind::Assignment));
    assert!(session
        .events()
        .any(|e| e == MatchEvent::AssignmentRejected {
            player: nth(13),
            max_active: 9,
        }));

    // Replacing someone already on the field is still allowed.
    assert_eq!(
        session.assign(&slot("CB2"), &nth(13)).unwrap(),
        Some(nth(4))
    );
}

// ============================================================================
// Ledger
// ============================================================================

#[test]
fn goal_then_undo_restores_tally() {
    let (mut session, _) = started_session();
    let before = session.ledger().len();
    session.goal(&nth(9)).unwrap();
    assert_eq!(session.ledger().tally().goals(&nth(9)), 1);

    let outcome = session.undo_last().unwrap();
    assert!(matches!(outcome, UndoOutcome::Undone { .. }));
    assert_eq!(session.ledger().tally().goals(&nth(9)), 0);
    assert_eq!(session.ledger().len(), before);
}

#[test]
fn red_card_vacates_slot_and_undo_restores_it() {
    let (mut session, _) = started_session();
    assert_eq!(session.max_active(), 11);

    session.red_card(&nth(1)).unwrap();
    assert_eq!(session.assignment().occupant(&slot("GK")), None);
    assert_eq!(session.max_active(), 10);
    assert!(session.is_sent_off(&nth(1)));
    assert!(!session.is_draggable(&nth(1)));
    assert!(!session.clock().active_players().contains(&nth(1)));

    let outcome = session.undo_last().unwrap();
    assert_eq!(
        outcome,
        UndoOutcome::Undone {
            record: ActionRecord::RedCard {
                player: nth(1),
                dismissal: touchline::Dismissal {
                    vacated_slot: Some(slot("GK")),
                },
            },
            restored_slot: Some(slot("GK")),
        }
    );
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(1)));
    assert_eq!(session.max_active(), 11);
    assert!(session.clock().active_players().contains(&nth(1)));

    let events: Vec<_> = session.events().collect();
    assert_eq!(
        events,
        vec![
            MatchEvent::SentOff {
                player: nth(1),
                slot: Some(slot("GK")),
            },
            MatchEvent::Reinstated {
                player: nth(1),
                slot: slot("GK"),
            },
        ]
    );
}

#[test]
fn undo_after_slot_refilled_leaves_player_on_bench() {
    let (mut session, observer) = observed_session();
    session.start(web_time::Instant::now()).unwrap();
    session.red_card(&nth(1)).unwrap();
    // Bump a field player so the goalkeeper slot can be filled within capacity.
    session.assign(&slot("CF2"), &nth(12)).unwrap();
    session.swap(&slot("CF2"), &slot("GK")).unwrap();
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(12)));

    session.undo_last().unwrap();
    assert_eq!(session.ledger().tally().red_cards(&nth(1)), 0);
    assert_eq!(session.assignment().slot_of(&nth(1)), None);
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(12)));
    assert!(observer.has_violation(ViolationKind::Ledger));
}

#[test]
fn second_yellow_escalates_and_undoes_in_one_step() {
    let (mut session, _) = started_session();
    session.yellow_card(&nth(6)).unwrap();
    let second = session.yellow_card(&nth(6)).unwrap();
    assert!(second.escalated_to_red());
    assert_eq!(session.ledger().tally().yellow_cards(&nth(6)), 2);
    assert_eq!(session.ledger().tally().red_cards(&nth(6)), 1);
    assert_eq!(session.assignment().occupant(&slot("RM")), None);

    let err = session.yellow_card(&nth(6)).unwrap_err();
    assert_eq!(
        err,
        TouchlineError::InvalidRequest {
            kind: InvalidRequestKind::SentOff { player: nth(6) }
        }
    );

    session.undo_last().unwrap();
    assert_eq!(session.ledger().tally().yellow_cards(&nth(6)), 1);
    assert_eq!(session.ledger().tally().red_cards(&nth(6)), 0);
    assert_eq!(session.assignment().occupant(&slot("RM")), Some(&nth(6)));
}

#[test]
fn undo_on_empty_ledger_is_not_an_error() {
    let (mut session, _) = started_session();
    assert!(!session.can_undo());
    assert_eq!(session.undo_last().unwrap(), UndoOutcome::Empty);
    assert_eq!(session.confirmation_for(&PendingAction::UndoLast), None);
}

#[test]
fn ledger_actions_need_a_live_match() {
    let mut session = lined_up_session();
    assert!(matches!(
        session.goal(&nth(9)),
        Err(TouchlineError::InvalidTransition {
            phase: MatchPhase::Idle,
            ..
        })
    ));
    assert!(session.opponent_goal().is_err());
    assert!(session.undo_last().is_err());
}

#[test]
fn confirm_then_perform() {
    let (mut session, _) = started_session();
    let action = PendingAction::RedCard { player: nth(10) };
    assert_eq!(
        session.confirmation_for(&action).unwrap(),
        "Give Red Card to A. Player10? Player will be sent to bench and cannot return."
    );
    let performed = session.perform(&action).unwrap();
    assert!(matches!(
        performed,
        Performed::Recorded(ActionRecord::RedCard { .. })
    ));
    assert_eq!(
        session.confirmation_for(&PendingAction::UndoLast).unwrap(),
        "Undo red card for A. Player10?"
    );
}

// ============================================================================
// Substitutions
// ============================================================================

#[test]
fn one_for_one_substitution() {
    let (mut session, _) = started_session();
    assert_eq!(session.toggle_incoming(&nth(12)).unwrap(), Selection::Added);
    assert_eq!(session.toggle_outgoing(&nth(1)).unwrap(), Selection::Added);

    let outcome = session.commit_substitution().unwrap();
    let SubstitutionOutcome::Applied(subs) = outcome else {
        panic!("expected the substitution to apply");
    };
    assert_eq!(subs.len(), 1);
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(12)));
    assert!(session.proposal().is_empty());
    assert!(session.clock().active_players().contains(&nth(12)));
}

#[test]
fn picks_pair_in_selection_order() {
    let (mut session, _) = started_session();
    session.toggle_incoming(&nth(13)).unwrap();
    session.toggle_incoming(&nth(16)).unwrap();
    session.toggle_outgoing(&nth(10)).unwrap();
    session.toggle_outgoing(&nth(3)).unwrap();
    assert_eq!(session.toggle_outgoing(&nth(4)).unwrap(), Selection::Ignored);

    session.commit_substitution().unwrap();
    assert_eq!(session.assignment().occupant(&slot("CF")), Some(&nth(13)));
    assert_eq!(session.assignment().occupant(&slot("CB")), Some(&nth(16)));
}

#[test]
fn outgoing_needs_an_incoming_pick_first() {
    let (mut session, _) = started_session();
    assert_eq!(session.toggle_outgoing(&nth(2)).unwrap(), Selection::Ignored);
    assert!(session.proposal().is_empty());
}

#[test]
fn incomplete_proposal_stays_open() {
    let (mut session, _) = started_session();
    session.toggle_incoming(&nth(12)).unwrap();
    let outcome = session.commit_substitution().unwrap();
    assert_eq!(
        outcome,
        SubstitutionOutcome::Incomplete {
            incoming: 1,
            outgoing: 0,
        }
    );
    assert_eq!(session.proposal().incoming(), &[nth(12)]);
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(1)));

    session.cancel_substitution();
    assert!(session.proposal().is_empty());
}

#[test]
fn reserved_players_cannot_be_dragged() {
    let (mut session, _) = started_session();
    session.toggle_incoming(&nth(12)).unwrap();
    session.toggle_outgoing(&nth(1)).unwrap();

    assert!(!session.is_draggable(&nth(1)));
    assert!(!session.is_draggable(&nth(12)));
    assert!(session.begin_move(&nth(1)).is_err());

    // Dropping someone else on a reserved player's slot is refused too.
    session.begin_move(&nth(15)).unwrap();
    session.propose_move(MoveTarget::Slot(slot("GK"))).unwrap();
    let err = session.commit_move().unwrap_err();
    assert_eq!(
        err,
        TouchlineError::InvalidRequest {
            kind: InvalidRequestKind::ReservedBySubstitution { player: nth(1) }
        }
    );
    assert_eq!(session.assignment().moving_player(), None);
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(1)));
}

#[test]
fn red_card_while_a_drag_is_open_stops_accrual() {
    let (mut session, kick_off) = started_session();
    session.begin_move(&nth(12)).unwrap();
    session.propose_move(MoveTarget::Slot(slot("CB"))).unwrap();
    session.red_card(&nth(1)).unwrap();
    session.poll(after(kick_off, 10));

    assert_eq!(session.player_time(&nth(1)), 0);
    assert!(!session.clock().active_players().contains(&nth(1)));
    assert_eq!(session.player_time(&nth(3)), 10);

    let outcome = session.commit_move().unwrap();
    assert_eq!(
        outcome,
        MoveOutcome::Placed {
            slot: slot("CB"),
            displaced: Some(nth(3)),
        }
    );
    session.poll(after(kick_off, 15));
    assert_eq!(session.player_time(&nth(12)), 5);
    assert_eq!(session.player_time(&nth(3)), 10);
}

#[test]
fn substitution_while_a_drag_is_open_reaches_the_clock() {
    let (mut session, kick_off) = started_session();
    session.toggle_incoming(&nth(13)).unwrap();
    session.toggle_outgoing(&nth(2)).unwrap();
    session.begin_move(&nth(12)).unwrap();
    assert!(matches!(
        session.commit_substitution().unwrap(),
        SubstitutionOutcome::Applied(_)
    ));
    session.poll(after(kick_off, 10));

    assert_eq!(session.player_time(&nth(2)), 0);
    assert_eq!(session.player_time(&nth(13)), 10);
    assert_eq!(session.assignment().moving_player(), Some(&nth(12)));
    assert_eq!(session.abort_move(), Some(nth(12)));
}

#[test]
fn dragged_player_picked_for_substitution_stays_put() {
    let (mut session, _) = started_session();
    session.begin_move(&nth(12)).unwrap();
    session.toggle_incoming(&nth(12)).unwrap();
    session.propose_move(MoveTarget::Slot(slot("GK"))).unwrap();

    let err = session.commit_move().unwrap_err();
    assert_eq!(
        err,
        TouchlineError::InvalidRequest {
            kind: InvalidRequestKind::ReservedBySubstitution { player: nth(12) }
        }
    );
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(1)));

    session.toggle_outgoing(&nth(1)).unwrap();
    assert!(matches!(
        session.commit_substitution().unwrap(),
        SubstitutionOutcome::Applied(_)
    ));
    assert_eq!(session.assignment().occupant(&slot("GK")), Some(&nth(12)));
}

#[test]
fn red_card_drops_player_from_proposal() {
    let (mut session, _) = started_session();
    session.toggle_incoming(&nth(12)).unwrap();
    session.toggle_outgoing(&nth(1)).unwrap();
    session.red_card(&nth(1)).unwrap();

    assert!(session.proposal().outgoing().is_empty());
    assert_eq!(session.proposal().incoming(), &[nth(12)]);
}

#[test]
fn sent_off_player_cannot_come_back_on() {
    let (mut session, _) = started_session();
    session.red_card(&nth(5)).unwrap();
    assert!(session.toggle_incoming(&nth(5)).is_err());
    assert!(session.begin_move(&nth(5)).is_err());
    assert!(session.assign(&slot("GK"), &nth(5)).is_err());
}

// ============================================================================
// Formations
// ============================================================================

#[test]
fn secondary_position_fills_left_wing() {
    let mut session = lined_up_session();
    session.set_formation("1-4-3-3").unwrap();
    assert_eq!(session.assignment().occupied(), 0);

    assert_eq!(session.auto_assign().unwrap(), 11);
    assert_eq!(session.assignment().occupant(&slot("LW")), Some(&nth(9)));
    assert_eq!(session.assignment().occupant(&slot("DM")), Some(&nth(17)));
    assert_eq!(session.assignment().occupant(&slot("RW")), Some(&nth(18)));
}

#[test]
fn formation_is_fixed_once_started() {
    let (mut session, _) = started_session();
    assert!(session.set_formation("1-4-3-3").is_err());
    assert!(session.auto_assign().is_err());
    assert!(session.set_formation("1-2-3").is_err());
}

// ============================================================================
// Bench, snapshots and the next match
// ============================================================================

#[test]
fn substitutes_list_sorts_by_number_or_position() {
    let (session, _) = started_session();
    let by_number: Vec<_> = session
        .substitutes(SubstituteSort::Number)
        .into_iter()
        .map(|p| p.number)
        .collect();
    assert_eq!(by_number, vec![12, 13, 14, 15, 16, 17, 18]);

    let by_position: Vec<_> = session
        .substitutes(SubstituteSort::Position)
        .into_iter()
        .map(|p| p.position.as_str())
        .collect();
    assert_eq!(by_position, vec!["CB", "CF", "CM", "DM", "GK", "RB", "RW"]);
}

#[test]
fn snapshot_carries_times_and_tallies() {
    let (mut session, kick_off) = started_session();
    session.poll(after(kick_off, 90));
    session.goal(&nth(10)).unwrap();
    session.goal(&nth(10)).unwrap();
    session.opponent_goal().unwrap();
    session.red_card(&nth(4)).unwrap();

    let snapshot = session.snapshot("vs Rovers");
    assert_eq!(snapshot.elapsed_seconds, 90);
    assert_eq!(snapshot.team_goals, 2);
    assert_eq!(snapshot.opponent_goals, 1);
    let scorer = snapshot.player(&nth(10)).unwrap();
    assert_eq!(scorer.goals, 2);
    assert_eq!(scorer.seconds_played, 90);
    assert_eq!(snapshot.player(&nth(4)).unwrap().red_cards, 1);
    assert_eq!(snapshot.player(&nth(18)).unwrap().seconds_played, 0);

    let bytes = snapshot.to_bytes().unwrap();
    assert_eq!(MatchSnapshot::from_bytes(&bytes).unwrap(), snapshot);
}

#[test]
fn sent_off_players_are_unavailable_next_match() {
    let (mut session, _) = started_session();
    session.red_card(&nth(1)).unwrap();
    let next = session.finish_roster();

    assert!(!next.get(&nth(1)).unwrap().available);
    assert!(next.get(&nth(2)).unwrap().available);

    let mut rematch = touchline::MatchBuilder::new()
        .with_roster(next)
        .build()
        .unwrap();
    rematch.auto_assign().unwrap();
    assert_eq!(rematch.assignment().occupant(&slot("GK")), Some(&nth(12)));
    assert_eq!(rematch.assignment().slot_of(&pid("p1")), None);
}
