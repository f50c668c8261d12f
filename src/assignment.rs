//! Formation slots and who stands in them.
//!
//! [`SlotAssignment`] maps slot keys to player ids and is the single source
//! of truth for which players are on the field. Every mutation keeps the
//! mapping injective: a player occupies at most one slot.
//!
//! # Drag gestures
//!
//! A live drag is an explicit three-step protocol rather than an ambient
//! "dragging" flag:
//!
//! ```text
//! begin_move(player) ─▶ propose_move(target)* ─▶ commit_move(max_active)
//!                                         └────▶ abort_move()
//! ```
//!
//! Proposing a target never touches the mapping, so hovering over several
//! targets leaves [`SlotAssignment::reconcile_active_set`] with nothing to
//! publish. Other mutations made while a move is open are published as usual.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::InvalidRequestKind;
use crate::formation::Formation;
use crate::roster::Roster;
use crate::telemetry::{InvariantChecker, InvariantViolation};
use crate::{PlayerId, SlotKey, TouchlineError, TouchlineResult};

/// Where an open move would drop its player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoveTarget {
    /// Onto a formation slot, occupied or not.
    Slot(SlotKey),
    /// Off the field.
    Bench,
}

/// What a committed move did.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoveOutcome {
    /// A bench player entered `slot`, sending `displaced` (if any) to the bench.
    Placed {
        /// The slot entered.
        slot: SlotKey,
        /// The previous occupant, now on the bench.
        displaced: Option<PlayerId>,
    },
    /// A field player moved from one slot to another, trading places with `displaced`.
    Swapped {
        /// The slot the player left.
        from: SlotKey,
        /// The slot the player now holds.
        to: SlotKey,
        /// The previous occupant of `to`, now in `from`.
        displaced: Option<PlayerId>,
    },
    /// A field player left `slot` for the bench.
    Benched {
        /// The vacated slot.
        slot: SlotKey,
    },
    /// The drop put the player where they already were.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingMove {
    player: PlayerId,
    target: Option<MoveTarget>,
}

/// The slot-to-player mapping for the current formation.
#[derive(Debug, Clone, Default)]
pub struct SlotAssignment {
    slots: Vec<SlotKey>,
    occupants: BTreeMap<SlotKey, PlayerId>,
    reconciled: BTreeSet<PlayerId>,
    pending_move: Option<PendingMove>,
}

impl SlotAssignment {
    /// An empty assignment over `formation`'s slots.
    #[must_use]
    pub fn new(formation: &Formation) -> Self {
        Self {
            slots: formation.slots().to_vec(),
            ..Self::default()
        }
    }

    /// Switches to another formation, clearing every slot.
    pub fn reset(&mut self, formation: &Formation) {
        self.slots = formation.slots().to_vec();
        self.occupants.clear();
        self.pending_move = None;
        debug!(formation = formation.name(), "assignment reset");
    }

    /// Slot keys in formation order.
    #[must_use]
    pub fn slots(&self) -> &[SlotKey] {
        &self.slots
    }

    /// Number of slots in the formation.
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.occupants.len()
    }

    /// Who stands in `slot`.
    #[must_use]
    pub fn occupant(&self, slot: &SlotKey) -> Option<&PlayerId> {
        self.occupants.get(slot)
    }

    /// Which slot `player` stands in.
    #[must_use]
    pub fn slot_of(&self, player: &PlayerId) -> Option<&SlotKey> {
        self.occupants
            .iter()
            .find_map(|(slot, id)| (id == player).then_some(slot))
    }

    /// True if `player` is on the field.
    #[must_use]
    pub fn is_active(&self, player: &PlayerId) -> bool {
        self.slot_of(player).is_some()
    }

    /// True if `slot` belongs to the formation.
    #[must_use]
    pub fn has_slot(&self, slot: &SlotKey) -> bool {
        self.slots.contains(slot)
    }

    /// Slots with their occupants, in formation order.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotKey, Option<&PlayerId>)> {
        self.slots
            .iter()
            .map(move |slot| (slot, self.occupants.get(slot)))
    }

    /// Unoccupied slots, in formation order.
    pub fn empty_slots(&self) -> impl Iterator<Item = &SlotKey> {
        self.slots
            .iter()
            .filter(move |slot| !self.occupants.contains_key(*slot))
    }

    /// The raw mapping.
    #[must_use]
    pub fn occupants(&self) -> &BTreeMap<SlotKey, PlayerId> {
        &self.occupants
    }

    /// The set of players currently on the field.
    #[must_use]
    pub fn active_players(&self) -> BTreeSet<PlayerId> {
        self.occupants.values().cloned().collect()
    }

    fn require_slot(&self, slot: &SlotKey) -> TouchlineResult<()> {
        if self.has_slot(slot) {
            Ok(())
        } else {
            Err(InvalidRequestKind::UnknownSlot { slot: slot.clone() }.into())
        }
    }

    /// Fails with `CapacityExceeded` if no more players may enter the field.
    pub fn check_capacity(&self, max_active: usize) -> TouchlineResult<()> {
        let occupied = self.occupied();
        if occupied >= max_active {
            return Err(TouchlineError::CapacityExceeded {
                max_active,
                occupied,
            });
        }
        Ok(())
    }

    /// Puts `player` into `slot`.
    ///
    /// If the player was in another slot, that slot is vacated. If `slot` held
    /// someone else, they go to the bench and are returned. When `max_active`
    /// is given, a bench player entering an empty slot is subject to
    /// [`check_capacity`](Self::check_capacity).
    pub fn assign(
        &mut self,
        slot: &SlotKey,
        player: &PlayerId,
        max_active: Option<usize>,
    ) -> TouchlineResult<Option<PlayerId>> {
        self.require_slot(slot)?;
        if self.occupants.get(slot) == Some(player) {
            return Ok(None);
        }
        let from = self.slot_of(player).cloned();
        if let (None, false, Some(max_active)) =
            (&from, self.occupants.contains_key(slot), max_active)
        {
            self.check_capacity(max_active)?;
        }
        if let Some(from) = &from {
            self.occupants.remove(from);
        }
        let displaced = self.occupants.insert(slot.clone(), player.clone());
        debug!(%slot, %player, from = ?from, displaced = ?displaced, "assigned");
        Ok(displaced)
    }

    /// Empties `slot`, returning whoever stood there.
    pub fn unassign(&mut self, slot: &SlotKey) -> TouchlineResult<Option<PlayerId>> {
        self.require_slot(slot)?;
        let removed = self.occupants.remove(slot);
        if let Some(player) = &removed {
            debug!(%slot, %player, "unassigned");
        }
        Ok(removed)
    }

    /// Sends `player` to the bench, returning the slot they left.
    pub fn bench_player(&mut self, player: &PlayerId) -> Option<SlotKey> {
        let slot = self.slot_of(player)?.clone();
        self.occupants.remove(&slot);
        debug!(%slot, %player, "benched");
        Some(slot)
    }

    /// Exchanges the occupants of two slots. Either may be empty.
    pub fn swap(&mut self, a: &SlotKey, b: &SlotKey) -> TouchlineResult<()> {
        self.require_slot(a)?;
        self.require_slot(b)?;
        if a == b {
            return Ok(());
        }
        let first = self.occupants.remove(a);
        let second = self.occupants.remove(b);
        if let Some(player) = second {
            self.occupants.insert(a.clone(), player);
        }
        if let Some(player) = first {
            self.occupants.insert(b.clone(), player);
        }
        debug!(%a, %b, "swapped");
        Ok(())
    }

    /// Puts `player` back into `slot` if the slot is empty and the player is benched.
    ///
    /// Returns false (and changes nothing) otherwise.
    pub fn restore(&mut self, slot: &SlotKey, player: &PlayerId) -> bool {
        if !self.has_slot(slot) || self.occupants.contains_key(slot) || self.is_active(player) {
            return false;
        }
        self.occupants.insert(slot.clone(), player.clone());
        debug!(%slot, %player, "restored");
        true
    }

    /// Places several bench players at once, all or nothing.
    ///
    /// Each pair is `(slot, incoming)`. Slots must be distinct and known, and
    /// no incoming player may already be on the field. Returns the displaced
    /// occupants in pair order.
    pub fn apply_batch(
        &mut self,
        pairs: &[(SlotKey, PlayerId)],
    ) -> TouchlineResult<Vec<Option<PlayerId>>> {
        let mut seen_slots = BTreeSet::new();
        let mut seen_players = BTreeSet::new();
        for (slot, player) in pairs {
            self.require_slot(slot)?;
            if !seen_slots.insert(slot) {
                return Err(InvalidRequestKind::DuplicateSlot { slot: slot.clone() }.into());
            }
            if self.is_active(player) || !seen_players.insert(player) {
                return Err(InvalidRequestKind::AlreadyOnField {
                    player: player.clone(),
                }
                .into());
            }
        }
        let displaced = pairs
            .iter()
            .map(|(slot, player)| self.occupants.insert(slot.clone(), player.clone()))
            .collect();
        debug!(pairs = pairs.len(), "batch applied");
        Ok(displaced)
    }

    /// Fills every slot from `roster` by position, replacing the current mapping.
    ///
    /// Returns the number of slots filled. See [`auto_assign`].
    pub fn auto_fill(&mut self, roster: &Roster) -> usize {
        self.occupants = auto_assign(roster, &self.slots);
        self.pending_move = None;
        debug!(filled = self.occupants.len(), "auto-assigned");
        self.occupants.len()
    }

    /// Publishes the current on-field set if it changed since the last call.
    ///
    /// Returns `None` when nothing changed.
    pub fn reconcile_active_set(&mut self) -> Option<&BTreeSet<PlayerId>> {
        let current = self.active_players();
        if current == self.reconciled {
            return None;
        }
        self.reconciled = current;
        Some(&self.reconciled)
    }

    /// The set last published by [`reconcile_active_set`](Self::reconcile_active_set).
    #[must_use]
    pub fn reconciled_active_set(&self) -> &BTreeSet<PlayerId> {
        &self.reconciled
    }

    /// Opens a move gesture for `player`.
    pub fn begin_move(&mut self, player: &PlayerId) -> TouchlineResult<()> {
        if let Some(open) = &self.pending_move {
            return Err(InvalidRequestKind::MoveAlreadyInProgress {
                player: open.player.clone(),
            }
            .into());
        }
        self.pending_move = Some(PendingMove {
            player: player.clone(),
            target: None,
        });
        Ok(())
    }

    /// Points the open move at `target`. May be called any number of times.
    pub fn propose_move(&mut self, target: MoveTarget) -> TouchlineResult<()> {
        if let MoveTarget::Slot(slot) = &target {
            self.require_slot(slot)?;
        }
        match &mut self.pending_move {
            Some(pending) => {
                pending.target = Some(target);
                Ok(())
            },
            None => Err(InvalidRequestKind::NoMoveInProgress.into()),
        }
    }

    /// Drops the moving player on the proposed target.
    ///
    /// The gesture is closed whether or not the drop is accepted. A bench
    /// player dropped into an empty slot is subject to `max_active`; a field
    /// player dropped on another slot trades places with its occupant.
    pub fn commit_move(&mut self, max_active: usize) -> TouchlineResult<MoveOutcome> {
        let pending = self
            .pending_move
            .take()
            .ok_or(TouchlineError::from(InvalidRequestKind::NoMoveInProgress))?;
        let target = pending.target.ok_or_else(|| {
            TouchlineError::from(InvalidRequestKind::MoveWithoutTarget {
                player: pending.player.clone(),
            })
        })?;
        let from = self.slot_of(&pending.player).cloned();

        match (from, target) {
            (Some(from), MoveTarget::Slot(to)) if from == to => Ok(MoveOutcome::Unchanged),
            (Some(from), MoveTarget::Slot(to)) => {
                let displaced = self.occupants.get(&to).cloned();
                self.swap(&from, &to)?;
                Ok(MoveOutcome::Swapped {
                    from,
                    to,
                    displaced,
                })
            },
            (None, MoveTarget::Slot(slot)) => {
                let displaced = self.assign(&slot, &pending.player, Some(max_active))?;
                Ok(MoveOutcome::Placed { slot, displaced })
            },
            (Some(slot), MoveTarget::Bench) => {
                self.occupants.remove(&slot);
                debug!(%slot, player = %pending.player, "benched");
                Ok(MoveOutcome::Benched { slot })
            },
            (None, MoveTarget::Bench) => Ok(MoveOutcome::Unchanged),
        }
    }

    /// Cancels the open move, returning the player that was being moved.
    pub fn abort_move(&mut self) -> Option<PlayerId> {
        self.pending_move.take().map(|pending| pending.player)
    }

    /// The player being moved, if a gesture is open.
    #[must_use]
    pub fn moving_player(&self) -> Option<&PlayerId> {
        self.pending_move.as_ref().map(|pending| &pending.player)
    }

    /// Where the open move would currently drop its player.
    #[must_use]
    pub fn proposed_target(&self) -> Option<&MoveTarget> {
        self.pending_move
            .as_ref()
            .and_then(|pending| pending.target.as_ref())
    }
}

impl InvariantChecker for SlotAssignment {
    /// # Invariants
    ///
    /// 1. Every occupied slot belongs to the formation
    /// 2. No player occupies two slots
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if let Some(slot) = self.occupants.keys().find(|slot| !self.slots.contains(slot)) {
            return Err(
                InvariantViolation::new("SlotAssignment", "occupied slot not in formation")
                    .with_details(format!("slot={}", slot)),
            );
        }

        let mut seen = BTreeSet::new();
        for (slot, player) in &self.occupants {
            if !seen.insert(player) {
                return Err(
                    InvariantViolation::new("SlotAssignment", "player occupies two slots")
                        .with_details(format!("player={}, second_slot={}", player, slot)),
                );
            }
        }
        Ok(())
    }
}

/// Two-pass greedy lineup by position.
///
/// Pass one walks `slots` in order and gives each slot the first unused,
/// available roster player whose primary position equals the slot's display
/// position. Pass two does the same for the slots still empty using secondary
/// positions. Unavailable players are never picked. Ties go to roster order,
/// so the result is deterministic.
///
/// ```
/// use touchline::{auto_assign, Player, Roster, SlotKey};
///
/// let roster = Roster::new(vec![
///     Player::new("a", "Ann", "Able", 1, "GK"),
///     Player::new("b", "Ben", "Baker", 2, "RW").with_secondary_positions(["LW"]),
/// ]).unwrap();
/// let slots = [SlotKey::from("GK"), SlotKey::from("LW")];
///
/// let lineup = auto_assign(&roster, &slots);
/// assert_eq!(lineup[&SlotKey::from("LW")].as_str(), "b");
/// ```
#[must_use]
pub fn auto_assign(roster: &Roster, slots: &[SlotKey]) -> BTreeMap<SlotKey, PlayerId> {
    let mut lineup = BTreeMap::new();
    let mut used: BTreeSet<&PlayerId> = BTreeSet::new();

    for slot in slots {
        let position = slot.display_position();
        if let Some(player) = roster
            .iter()
            .find(|p| p.available && !used.contains(&p.id) && p.plays_primary(position))
        {
            used.insert(&player.id);
            lineup.insert(slot.clone(), player.id.clone());
        }
    }

    for slot in slots {
        if lineup.contains_key(slot) {
            continue;
        }
        let position = slot.display_position();
        if let Some(player) = roster
            .iter()
            .find(|p| p.available && !used.contains(&p.id) && p.plays_secondary(position))
        {
            used.insert(&player.id);
            lineup.insert(slot.clone(), player.id.clone());
        }
    }

    lineup
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
    use crate::roster::Player;

    fn slot(key: &str) -> SlotKey {
        SlotKey::from(key)
    }

    fn pid(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    fn four_four_two() -> SlotAssignment {
        SlotAssignment::new(FormationCatalog::builtin().get("1-4-4-2").unwrap())
    }

    /// Eleven players p1..p11 in formation order.
    fn full_lineup() -> SlotAssignment {
        let mut assignment = four_four_two();
        let slots = assignment.slots().to_vec();
        for (i, key) in slots.iter().enumerate() {
            assignment
                .assign(key, &pid(&format!("p{}", i + 1)), None)
                .unwrap();
        }
        assignment
    }

    #[test]
    fn assign_unknown_slot_fails() {
        let mut assignment = four_four_two();
        let result = assignment.assign(&slot("ST"), &pid("p1"), None);
        assert!(matches!(
            result,
            Err(TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::UnknownSlot { .. }
            })
        ));
    }

    #[test]
    fn assign_moves_rather_than_copies() {
        let mut assignment = four_four_two();
        assignment.assign(&slot("CB"), &pid("p4"), None).unwrap();
        assignment.assign(&slot("CB2"), &pid("p4"), None).unwrap();
        assert_eq!(assignment.occupant(&slot("CB")), None);
        assert_eq!(assignment.occupant(&slot("CB2")), Some(&pid("p4")));
        assert!(assignment.check_invariants().is_ok());
    }

    #[test]
    fn implicit_swap_benches_occupant() {
        let mut assignment = full_lineup();
        let displaced = assignment.assign(&slot("GK"), &pid("p12"), Some(11)).unwrap();
        assert_eq!(displaced, Some(pid("p1")));
        assert!(!assignment.is_active(&pid("p1")));
        assert_eq!(assignment.occupant(&slot("GK")), Some(&pid("p12")));
        assert_eq!(assignment.occupied(), 11);
    }

    #[test]
    fn capacity_applies_only_to_bench_into_empty_slot() {
        let mut assignment = full_lineup();
        assignment.unassign(&slot("GK")).unwrap();

        // Down to ten after a red card: bench player may not fill the gap
        let err = assignment
            .assign(&slot("GK"), &pid("p12"), Some(10))
            .unwrap_err();
        assert_eq!(
            err,
            TouchlineError::CapacityExceeded {
                max_active: 10,
                occupied: 10
            }
        );
        assert_eq!(assignment.occupant(&slot("GK")), None);

        // A field player may still move into it
        assignment.assign(&slot("GK"), &pid("p2"), Some(10)).unwrap();
        assert_eq!(assignment.occupant(&slot("RB")), None);

        // And a bench player may still replace an occupant
        assignment.assign(&slot("GK"), &pid("p12"), Some(10)).unwrap();
        assert_eq!(assignment.occupied(), 10);
    }

    #[test]
    fn unassign_empty_slot_is_noop() {
        let mut assignment = four_four_two();
        assert_eq!(assignment.unassign(&slot("GK")).unwrap(), None);
    }

    #[test]
    fn swap_handles_empty_side() {
        let mut assignment = four_four_two();
        assignment.assign(&slot("LB"), &pid("p5"), None).unwrap();
        assignment.swap(&slot("LB"), &slot("RB")).unwrap();
        assert_eq!(assignment.occupant(&slot("RB")), Some(&pid("p5")));
        assert_eq!(assignment.occupant(&slot("LB")), None);
    }

    #[test]
    fn restore_only_into_empty_slot() {
        let mut assignment = full_lineup();
        assignment.unassign(&slot("GK")).unwrap();
        assert!(assignment.restore(&slot("GK"), &pid("p1")));
        assert!(!assignment.restore(&slot("GK"), &pid("p12")));
    }

    #[test]
    fn apply_batch_is_all_or_nothing() {
        let mut assignment = full_lineup();
        let before = assignment.occupants().clone();
        // p2 is already on the field: whole batch rejected
        let result = assignment.apply_batch(&[
            (slot("GK"), pid("p12")),
            (slot("CF"), pid("p2")),
        ]);
        assert!(result.is_err());
        assert_eq!(assignment.occupants(), &before);

        let displaced = assignment
            .apply_batch(&[(slot("GK"), pid("p12")), (slot("CF"), pid("p13"))])
            .unwrap();
        assert_eq!(displaced, vec![Some(pid("p1")), Some(pid("p10"))]);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut assignment = full_lineup();
        assert_eq!(assignment.reconcile_active_set().unwrap().len(), 11);
        assert!(assignment.reconcile_active_set().is_none());
        assignment.assign(&slot("GK"), &pid("p12"), None).unwrap();
        assert!(assignment
            .reconcile_active_set()
            .unwrap()
            .contains(&pid("p12")));
    }

    #[test]
    fn hovering_an_open_move_publishes_nothing() {
        let mut assignment = full_lineup();
        assignment.reconcile_active_set();
        assignment.begin_move(&pid("p12")).unwrap();
        assignment.propose_move(MoveTarget::Slot(slot("GK"))).unwrap();
        assignment.propose_move(MoveTarget::Slot(slot("CF"))).unwrap();
        assert!(assignment.reconcile_active_set().is_none());

        // Unrelated changes still go out while the gesture is open
        assignment.unassign(&slot("LB")).unwrap();
        let published = assignment.reconcile_active_set().unwrap();
        assert!(!published.contains(&pid("p5")));
        assert_eq!(assignment.moving_player(), Some(&pid("p12")));

        let outcome = assignment.commit_move(11).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Placed {
                slot: slot("CF"),
                displaced: Some(pid("p10"))
            }
        );
        assert!(assignment.reconcile_active_set().is_some());
    }

    #[test]
    fn move_between_slots_swaps() {
        let mut assignment = full_lineup();
        assignment.begin_move(&pid("p1")).unwrap();
        assignment.propose_move(MoveTarget::Slot(slot("CF"))).unwrap();
        let outcome = assignment.commit_move(11).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Swapped {
                from: slot("GK"),
                to: slot("CF"),
                displaced: Some(pid("p10"))
            }
        );
        assert_eq!(assignment.occupant(&slot("GK")), Some(&pid("p10")));
        assert_eq!(assignment.occupied(), 11);
    }

    #[test]
    fn move_to_bench_vacates() {
        let mut assignment = full_lineup();
        assignment.begin_move(&pid("p3")).unwrap();
        assignment.propose_move(MoveTarget::Bench).unwrap();
        assert_eq!(
            assignment.commit_move(11).unwrap(),
            MoveOutcome::Benched { slot: slot("CB") }
        );
        assert_eq!(assignment.occupied(), 10);
    }

    #[test]
    fn move_protocol_misuse() {
        let mut assignment = full_lineup();
        assert!(assignment.propose_move(MoveTarget::Bench).is_err());
        assert!(assignment.commit_move(11).is_err());
        assignment.begin_move(&pid("p1")).unwrap();
        assert!(assignment.begin_move(&pid("p2")).is_err());
        assert!(matches!(
            assignment.commit_move(11),
            Err(TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::MoveWithoutTarget { .. }
            })
        ));
        // Gesture closed by the failed commit
        assert_eq!(assignment.moving_player(), None);
    }

    #[test]
    fn rejected_commit_closes_gesture() {
        let mut assignment = full_lineup();
        assignment.unassign(&slot("GK")).unwrap();
        assignment.begin_move(&pid("p12")).unwrap();
        assignment.propose_move(MoveTarget::Slot(slot("GK"))).unwrap();
        assert!(matches!(
            assignment.commit_move(10),
            Err(TouchlineError::CapacityExceeded { .. })
        ));
        assert_eq!(assignment.moving_player(), None);
        assert_eq!(assignment.abort_move(), None);
    }

    #[test]
    fn auto_assign_primary_then_secondary() {
        let roster = Roster::new(vec![
            Player::new("gk", "G", "Keeper", 1, "GK"),
            Player::new("rw", "R", "Winger", 7, "RW").with_secondary_positions(["LW"]),
            Player::new("rw2", "S", "Winger", 17, "RW").with_secondary_positions(["LW"]),
            Player::new("cf", "C", "Forward", 9, "CF").with_secondary_positions(["RW"]),
        ])
        .unwrap();
        let slots = [slot("GK"), slot("RW"), slot("CF"), slot("LW")];
        let lineup = auto_assign(&roster, &slots);

        assert_eq!(lineup[&slot("GK")], pid("gk"));
        assert_eq!(lineup[&slot("RW")], pid("rw"));
        assert_eq!(lineup[&slot("CF")], pid("cf"));
        // rw is used by pass one, so the second RW takes LW
        assert_eq!(lineup[&slot("LW")], pid("rw2"));
    }

    #[test]
    fn auto_assign_skips_unavailable_and_strips_digits() {
        let roster = Roster::new(vec![
            Player::new("a", "A", "One", 4, "CB").unavailable(),
            Player::new("b", "B", "Two", 5, "CB"),
            Player::new("c", "C", "Three", 6, "CB"),
        ])
        .unwrap();
        let lineup = auto_assign(&roster, &[slot("CB"), slot("CB2")]);
        assert_eq!(lineup[&slot("CB")], pid("b"));
        assert_eq!(lineup[&slot("CB2")], pid("c"));
    }

    #[test]
    fn auto_fill_replaces_mapping() {
        let mut assignment = four_four_two();
        assignment.assign(&slot("CF"), &pid("ghost"), None).unwrap();
        let roster = Roster::new(vec![Player::new("k", "K", "Keeper", 1, "GK")]).unwrap();
        assert_eq!(assignment.auto_fill(&roster), 1);
        assert_eq!(assignment.occupant(&slot("GK")), Some(&pid("k")));
        assert_eq!(assignment.occupant(&slot("CF")), None);
    }
}
