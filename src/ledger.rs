//! The in-match event log.
//!
//! Goals and cards are appended as [`ActionRecord`]s and only the most recent
//! record can be undone. Each record carries everything its inverse needs: a
//! sending-off remembers the slot it vacated so that undo can put the player
//! back without consulting anything older than the record itself.
//!
//! Totals are kept incrementally in a [`Tally`]; at all times the tally equals
//! [`Tally::fold`] over the records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assignment::SlotAssignment;
use crate::telemetry::{InvariantChecker, InvariantViolation};
use crate::{PlayerId, SlotKey};

/// What a sending-off did to the lineup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dismissal {
    /// The slot the player was removed from, or `None` if they were on the bench.
    pub vacated_slot: Option<SlotKey>,
}

/// One logged event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionRecord {
    /// A goal for the team.
    Goal {
        /// The scorer.
        player: PlayerId,
    },
    /// A goal against.
    OpponentGoal,
    /// A straight red card.
    RedCard {
        /// The player sent off.
        player: PlayerId,
        /// Where they were removed from.
        dismissal: Dismissal,
    },
    /// A yellow card, possibly the second one.
    YellowCard {
        /// The cautioned player.
        player: PlayerId,
        /// Set when this was the player's second yellow and therefore a sending-off.
        second_yellow: Option<Dismissal>,
    },
}

impl ActionRecord {
    /// The player the record is about, if any.
    #[must_use]
    pub fn player(&self) -> Option<&PlayerId> {
        match self {
            Self::Goal { player }
            | Self::RedCard { player, .. }
            | Self::YellowCard { player, .. } => Some(player),
            Self::OpponentGoal => None,
        }
    }

    /// The sending-off carried by this record, if it was one.
    #[must_use]
    pub fn dismissal(&self) -> Option<&Dismissal> {
        match self {
            Self::RedCard { dismissal, .. } => Some(dismissal),
            Self::YellowCard { second_yellow, .. } => second_yellow.as_ref(),
            Self::Goal { .. } | Self::OpponentGoal => None,
        }
    }

    /// True for a second yellow.
    #[must_use]
    pub fn escalated_to_red(&self) -> bool {
        matches!(
            self,
            Self::YellowCard {
                second_yellow: Some(_),
                ..
            }
        )
    }
}

/// Running totals derived from the ledger.
///
/// Zero counts are not stored, so two tallies with the same totals compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    goals: BTreeMap<PlayerId, u32>,
    red_cards: BTreeMap<PlayerId, u32>,
    yellow_cards: BTreeMap<PlayerId, u32>,
    opponent_goals: u32,
}

fn bump(map: &mut BTreeMap<PlayerId, u32>, player: &PlayerId) {
    *map.entry(player.clone()).or_insert(0) += 1;
}

fn drop_one(map: &mut BTreeMap<PlayerId, u32>, player: &PlayerId) {
    if let Some(count) = map.get_mut(player) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            map.remove(player);
        }
    }
}

impl Tally {
    /// Recomputes totals from scratch.
    pub fn fold<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ActionRecord>,
    {
        let mut tally = Self::default();
        for record in records {
            tally.apply(record);
        }
        tally
    }

    fn apply(&mut self, record: &ActionRecord) {
        match record {
            ActionRecord::Goal { player } => bump(&mut self.goals, player),
            ActionRecord::OpponentGoal => self.opponent_goals += 1,
            ActionRecord::RedCard { player, .. } => bump(&mut self.red_cards, player),
            ActionRecord::YellowCard {
                player,
                second_yellow,
            } => {
                bump(&mut self.yellow_cards, player);
                if second_yellow.is_some() {
                    bump(&mut self.red_cards, player);
                }
            },
        }
    }

    fn revert(&mut self, record: &ActionRecord) {
        match record {
            ActionRecord::Goal { player } => drop_one(&mut self.goals, player),
            ActionRecord::OpponentGoal => {
                self.opponent_goals = self.opponent_goals.saturating_sub(1);
            },
            ActionRecord::RedCard { player, .. } => drop_one(&mut self.red_cards, player),
            ActionRecord::YellowCard {
                player,
                second_yellow,
            } => {
                drop_one(&mut self.yellow_cards, player);
                if second_yellow.is_some() {
                    drop_one(&mut self.red_cards, player);
                }
            },
        }
    }

    /// Goals scored by `player`.
    #[must_use]
    pub fn goals(&self, player: &PlayerId) -> u32 {
        self.goals.get(player).copied().unwrap_or(0)
    }

    /// Red cards shown to `player`, including second yellows.
    #[must_use]
    pub fn red_cards(&self, player: &PlayerId) -> u32 {
        self.red_cards.get(player).copied().unwrap_or(0)
    }

    /// Yellow cards shown to `player`.
    #[must_use]
    pub fn yellow_cards(&self, player: &PlayerId) -> u32 {
        self.yellow_cards.get(player).copied().unwrap_or(0)
    }

    /// Goals conceded.
    #[must_use]
    pub fn opponent_goals(&self) -> u32 {
        self.opponent_goals
    }

    /// Goals scored by the team.
    #[must_use]
    pub fn team_goals(&self) -> u32 {
        self.goals.values().sum()
    }

    /// Red cards across the team.
    #[must_use]
    pub fn red_card_total(&self) -> u32 {
        self.red_cards.values().sum()
    }

    /// Non-zero goal counts by player.
    #[must_use]
    pub fn goals_by_player(&self) -> &BTreeMap<PlayerId, u32> {
        &self.goals
    }

    /// Non-zero red card counts by player.
    #[must_use]
    pub fn red_cards_by_player(&self) -> &BTreeMap<PlayerId, u32> {
        &self.red_cards
    }
}

/// Result of [`Ledger::undo_last`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UndoOutcome {
    /// The ledger was empty.
    Empty,
    /// The last record was removed and its effects reversed.
    Undone {
        /// The removed record.
        record: ActionRecord,
        /// The slot a sent-off player was put back into, if it was still free.
        restored_slot: Option<SlotKey>,
    },
}

/// Append-only, undoable log of goals and cards.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<ActionRecord>,
    tally: Tally,
}

impl Ledger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, record: ActionRecord) -> &ActionRecord {
        self.tally.apply(&record);
        debug!(?record, len = self.records.len() + 1, "ledger append");
        self.records.push(record);
        let last = self.records.len() - 1;
        &self.records[last]
    }

    /// Records a goal by `player`.
    pub fn goal(&mut self, player: &PlayerId) -> &ActionRecord {
        self.push(ActionRecord::Goal {
            player: player.clone(),
        })
    }

    /// Records a goal against.
    pub fn opponent_goal(&mut self) -> &ActionRecord {
        self.push(ActionRecord::OpponentGoal)
    }

    /// Sends `player` off, vacating their slot if they had one.
    pub fn red_card(&mut self, player: &PlayerId, assignment: &mut SlotAssignment) -> &ActionRecord {
        let vacated_slot = assignment.bench_player(player);
        self.push(ActionRecord::RedCard {
            player: player.clone(),
            dismissal: Dismissal { vacated_slot },
        })
    }

    /// Cautions `player`. A second caution in the match is a sending-off.
    pub fn yellow_card(
        &mut self,
        player: &PlayerId,
        assignment: &mut SlotAssignment,
    ) -> &ActionRecord {
        let second_yellow = if self.tally.yellow_cards(player) >= 1 {
            Some(Dismissal {
                vacated_slot: assignment.bench_player(player),
            })
        } else {
            None
        };
        self.push(ActionRecord::YellowCard {
            player: player.clone(),
            second_yellow,
        })
    }

    /// Removes the last record and reverses it.
    ///
    /// A sent-off player goes back into the slot they vacated only if that
    /// slot is still empty; otherwise they stay on the bench.
    pub fn undo_last(&mut self, assignment: &mut SlotAssignment) -> UndoOutcome {
        let Some(record) = self.records.pop() else {
            return UndoOutcome::Empty;
        };
        self.tally.revert(&record);

        let restored_slot = match (record.player(), record.dismissal()) {
            (Some(player), Some(Dismissal {
                vacated_slot: Some(slot),
            })) => {
                if assignment.restore(slot, player) {
                    Some(slot.clone())
                } else {
                    debug!(%slot, %player, "slot refilled since dismissal, player stays on bench");
                    None
                }
            },
            _ => None,
        };
        debug!(?record, restored = ?restored_slot, "ledger undo");
        UndoOutcome::Undone {
            record,
            restored_slot,
        }
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.tally = Tally::default();
    }

    /// Current totals.
    #[must_use]
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    /// The most recent record.
    #[must_use]
    pub fn last(&self) -> Option<&ActionRecord> {
        self.records.last()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once `player` has received a red card (straight or second yellow).
    #[must_use]
    pub fn is_sent_off(&self, player: &PlayerId) -> bool {
        self.tally.red_cards(player) > 0
    }

    /// Red cards across the team.
    #[must_use]
    pub fn red_card_total(&self) -> usize {
        self.tally.red_card_total() as usize
    }
}

impl InvariantChecker for Ledger {
    /// # Invariants
    ///
    /// 1. The running tally equals a fold over the records
    /// 2. No player holds more than two yellow cards
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let folded = Tally::fold(&self.records);
        if folded != self.tally {
            return Err(
                InvariantViolation::new("Ledger", "running tally differs from fold").with_details(
                    format!(
                        "records={}, team_goals={}/{}, red={}/{}",
                        self.records.len(),
                        self.tally.team_goals(),
                        folded.team_goals(),
                        self.tally.red_card_total(),
                        folded.red_card_total()
                    ),
                ),
            );
        }
        if let Some((player, count)) = self.tally.yellow_cards.iter().find(|(_, c)| **c > 2) {
            return Err(
                InvariantViolation::new("Ledger", "more than two yellow cards")
                    .with_details(format!("player={}, yellows={}", player, count)),
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
    use crate::formation::FormationCatalog;

    fn pid(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    fn gk() -> SlotKey {
        SlotKey::from("GK")
    }

    fn lineup() -> SlotAssignment {
        let mut assignment =
            SlotAssignment::new(FormationCatalog::builtin().get("1-4-4-2").unwrap());
        let slots = assignment.slots().to_vec();
        for (i, slot) in slots.iter().enumerate() {
            assignment
                .assign(slot, &pid(&format!("p{}", i + 1)), None)
                .unwrap();
        }
        assignment
    }

    #[test]
    fn goal_then_undo() {
        let mut ledger = Ledger::new();
        let mut assignment = lineup();
        ledger.goal(&pid("p9"));
        assert_eq!(ledger.tally().goals(&pid("p9")), 1);
        assert_eq!(ledger.len(), 1);

        let outcome = ledger.undo_last(&mut assignment);
        assert!(matches!(outcome, UndoOutcome::Undone { restored_slot: None, .. }));
        assert_eq!(ledger.tally().goals(&pid("p9")), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn undo_on_empty_ledger() {
        let mut ledger = Ledger::new();
        let mut assignment = lineup();
        assert_eq!(ledger.undo_last(&mut assignment), UndoOutcome::Empty);
    }

    #[test]
    fn opponent_goal_counts() {
        let mut ledger = Ledger::new();
        let mut assignment = lineup();
        ledger.opponent_goal();
        ledger.opponent_goal();
        assert_eq!(ledger.tally().opponent_goals(), 2);
        ledger.undo_last(&mut assignment);
        assert_eq!(ledger.tally().opponent_goals(), 1);
        assert_eq!(ledger.tally().team_goals(), 0);
    }

    #[test]
    fn red_card_vacates_and_undo_restores() {
        let mut ledger = Ledger::new();
        let mut assignment = lineup();
        let record = ledger.red_card(&pid("p1"), &mut assignment).clone();
        assert_eq!(record.dismissal().unwrap().vacated_slot, Some(gk()));
        assert_eq!(assignment.occupant(&gk()), None);
        assert_eq!(ledger.red_card_total(), 1);
        assert!(ledger.is_sent_off(&pid("p1")));

        let outcome = ledger.undo_last(&mut assignment);
        assert!(matches!(
            outcome,
            UndoOutcome::Undone { restored_slot: Some(ref slot), .. } if slot == &gk()
        ));
        assert_eq!(assignment.occupant(&gk()), Some(&pid("p1")));
        assert_eq!(ledger.red_card_total(), 0);
    }

    #[test]
    fn undo_leaves_player_on_bench_when_slot_refilled() {
        let mut ledger = Ledger::new();
        let mut assignment = lineup();
        ledger.red_card(&pid("p1"), &mut assignment);
        assignment.assign(&gk(), &pid("p2"), None).unwrap();

        let outcome = ledger.undo_last(&mut assignment);
        assert!(matches!(outcome, UndoOutcome::Undone { restored_slot: None, .. }));
        assert!(!assignment.is_active(&pid("p1")));
        assert_eq!(ledger.tally().red_cards(&pid("p1")), 0);
    }

    #[test]
    fn red_card_for_bench_player_vacates_nothing() {
        let mut ledger = Ledger::new();
        let mut assignment = lineup();
        let record = ledger.red_card(&pid("p14"), &mut assignment).clone();
        assert_eq!(record.dismissal().unwrap().vacated_slot, None);
        assert_eq!(assignment.occupied(), 11);
        assert_eq!(ledger.red_card_total(), 1);
    }

    #[test]
    fn second_yellow_is_a_sending_off() {
        let mut ledger = Ledger::new();
        let mut assignment = lineup();
        let first = ledger.yellow_card(&pid("p4"), &mut assignment).clone();
        assert!(!first.escalated_to_red());
        assert!(assignment.is_active(&pid("p4")));

        let second = ledger.yellow_card(&pid("p4"), &mut assignment).clone();
        assert!(second.escalated_to_red());
        assert_eq!(ledger.tally().yellow_cards(&pid("p4")), 2);
        assert_eq!(ledger.tally().red_cards(&pid("p4")), 1);
        assert!(!assignment.is_active(&pid("p4")));

        ledger.undo_last(&mut assignment);
        assert_eq!(ledger.tally().yellow_cards(&pid("p4")), 1);
        assert_eq!(ledger.red_card_total(), 0);
        assert_eq!(
            assignment.occupant(&SlotKey::from("CB2")),
            Some(&pid("p4"))
        );
        assert!(ledger.check_invariants().is_ok());
    }

    #[test]
    fn tally_matches_fold_through_mixed_sequence() {
        let mut ledger = Ledger::new();
        let mut assignment = lineup();
        ledger.goal(&pid("p9"));
        ledger.yellow_card(&pid("p3"), &mut assignment);
        ledger.opponent_goal();
        ledger.red_card(&pid("p6"), &mut assignment);
        ledger.goal(&pid("p10"));
        assert_eq!(ledger.tally(), &Tally::fold(ledger.records()));
        ledger.undo_last(&mut assignment);
        ledger.undo_last(&mut assignment);
        assert_eq!(ledger.tally(), &Tally::fold(ledger.records()));
        assert!(ledger.check_invariants().is_ok());
    }

    #[test]
    fn clear_resets_tally() {
        let mut ledger = Ledger::new();
        ledger.goal(&pid("p9"));
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.tally(), &Tally::default());
    }
}
