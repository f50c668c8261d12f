//! N-for-N substitution proposals.
//!
//! The operator picks bench players to come on and field players to go off,
//! then commits the whole proposal as one batch. Picks pair up in the order
//! they were made: the first outgoing player is replaced by the first
//! incoming one, and so on.

use smallvec::SmallVec;
use tracing::debug;

use crate::assignment::SlotAssignment;
use crate::error::InvalidRequestKind;
use crate::{PlayerId, SlotKey, TouchlineError, TouchlineResult};

/// Picks are rarely more than a handful per stoppage.
type Picks = SmallVec<[PlayerId; 4]>;

/// Result of toggling a pick.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    /// The player was added to the list.
    Added,
    /// The player was removed from the list.
    Removed,
    /// The pick was not allowed and nothing changed.
    Ignored,
}

/// One applied swap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Substitution {
    /// The slot that changed hands.
    pub slot: SlotKey,
    /// The bench player who came on.
    pub player_in: PlayerId,
    /// The field player who went off.
    pub player_out: PlayerId,
}

/// Result of [`SubstitutionProposal::commit`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubstitutionOutcome {
    /// Every pairing was applied, in pick order.
    Applied(Vec<Substitution>),
    /// The lists were empty or of different lengths; nothing changed.
    Incomplete {
        /// Number of incoming picks.
        incoming: usize,
        /// Number of outgoing picks.
        outgoing: usize,
    },
}

/// An open substitution proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionProposal {
    incoming: Picks,
    outgoing: Picks,
}

impl SubstitutionProposal {
    /// An empty proposal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles a bench player in the incoming list.
    ///
    /// Removing an incoming pick drops trailing outgoing picks so that there
    /// are never more players going off than coming on.
    pub fn toggle_incoming(&mut self, player: &PlayerId) -> Selection {
        if let Some(index) = self.incoming.iter().position(|p| p == player) {
            self.incoming.remove(index);
            self.outgoing.truncate(self.incoming.len());
            return Selection::Removed;
        }
        self.incoming.push(player.clone());
        Selection::Added
    }

    /// Toggles a field player in the outgoing list.
    ///
    /// Adding is ignored until there are more incoming picks than outgoing ones.
    pub fn toggle_outgoing(&mut self, player: &PlayerId) -> Selection {
        if let Some(index) = self.outgoing.iter().position(|p| p == player) {
            self.outgoing.remove(index);
            return Selection::Removed;
        }
        if self.outgoing.len() >= self.incoming.len() {
            return Selection::Ignored;
        }
        self.outgoing.push(player.clone());
        Selection::Added
    }

    /// Drops `player` from whichever list holds them. Returns true if found.
    pub fn remove_player(&mut self, player: &PlayerId) -> bool {
        if self.incoming.contains(player) {
            self.toggle_incoming(player);
            return true;
        }
        if let Some(index) = self.outgoing.iter().position(|p| p == player) {
            self.outgoing.remove(index);
            return true;
        }
        false
    }

    /// Clears both lists.
    pub fn cancel(&mut self) {
        self.incoming.clear();
        self.outgoing.clear();
    }

    /// Bench players picked to come on, in pick order.
    #[must_use]
    pub fn incoming(&self) -> &[PlayerId] {
        &self.incoming
    }

    /// Field players picked to go off, in pick order.
    #[must_use]
    pub fn outgoing(&self) -> &[PlayerId] {
        &self.outgoing
    }

    /// True if neither list has picks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }

    /// True if the lists are non-empty and the same length.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.incoming.is_empty() && self.incoming.len() == self.outgoing.len()
    }

    /// True if `player` is on either list.
    #[must_use]
    pub fn is_reserved(&self, player: &PlayerId) -> bool {
        self.incoming.contains(player) || self.outgoing.contains(player)
    }

    /// Applies the proposal to `assignment` as one batch.
    ///
    /// An incomplete proposal is left open and reported as
    /// [`SubstitutionOutcome::Incomplete`]. On error nothing is applied and
    /// the proposal stays open. On success both lists are cleared.
    pub fn commit(
        &mut self,
        assignment: &mut SlotAssignment,
    ) -> TouchlineResult<SubstitutionOutcome> {
        if !self.is_complete() {
            return Ok(SubstitutionOutcome::Incomplete {
                incoming: self.incoming.len(),
                outgoing: self.outgoing.len(),
            });
        }

        let mut pairs = Vec::with_capacity(self.outgoing.len());
        for (out, incoming) in self.outgoing.iter().zip(&self.incoming) {
            let slot = assignment.slot_of(out).cloned().ok_or_else(|| {
                TouchlineError::from(InvalidRequestKind::NotOnField {
                    player: out.clone(),
                })
            })?;
            pairs.push((slot, incoming.clone()));
        }
        assignment.apply_batch(&pairs)?;

        let applied: Vec<Substitution> = pairs
            .into_iter()
            .zip(self.outgoing.drain(..))
            .map(|((slot, player_in), player_out)| Substitution {
                slot,
                player_in,
                player_out,
            })
            .collect();
        self.incoming.clear();
        debug!(count = applied.len(), "substitution committed");
        Ok(SubstitutionOutcome::Applied(applied))
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

    fn lineup() -> SlotAssignment {
        let mut assignment =
            SlotAssignment::new(FormationCatalog::builtin().get("1-4-3-3").unwrap());
        let slots = assignment.slots().to_vec();
        for (i, slot) in slots.iter().enumerate() {
            assignment
                .assign(slot, &pid(&format!("p{}", i + 1)), None)
                .unwrap();
        }
        assignment
    }

    #[test]
    fn outgoing_requires_incoming_first() {
        let mut proposal = SubstitutionProposal::new();
        assert_eq!(proposal.toggle_outgoing(&pid("p1")), Selection::Ignored);
        assert_eq!(proposal.toggle_incoming(&pid("p12")), Selection::Added);
        assert_eq!(proposal.toggle_outgoing(&pid("p1")), Selection::Added);
        assert_eq!(proposal.toggle_outgoing(&pid("p2")), Selection::Ignored);
        assert_eq!(proposal.outgoing(), &[pid("p1")]);
    }

    #[test]
    fn toggle_removes_existing_pick() {
        let mut proposal = SubstitutionProposal::new();
        proposal.toggle_incoming(&pid("p12"));
        proposal.toggle_outgoing(&pid("p1"));
        assert_eq!(proposal.toggle_outgoing(&pid("p1")), Selection::Removed);
        assert_eq!(proposal.toggle_incoming(&pid("p12")), Selection::Removed);
        assert!(proposal.is_empty());
    }

    #[test]
    fn dropping_incoming_trims_outgoing() {
        let mut proposal = SubstitutionProposal::new();
        proposal.toggle_incoming(&pid("p12"));
        proposal.toggle_incoming(&pid("p13"));
        proposal.toggle_outgoing(&pid("p1"));
        proposal.toggle_outgoing(&pid("p2"));
        proposal.toggle_incoming(&pid("p12"));
        assert_eq!(proposal.incoming(), &[pid("p13")]);
        assert_eq!(proposal.outgoing(), &[pid("p1")]);
    }

    #[test]
    fn commit_incomplete_is_noop() {
        let mut assignment = lineup();
        let mut proposal = SubstitutionProposal::new();
        proposal.toggle_incoming(&pid("p12"));
        let outcome = proposal.commit(&mut assignment).unwrap();
        assert_eq!(
            outcome,
            SubstitutionOutcome::Incomplete {
                incoming: 1,
                outgoing: 0
            }
        );
        assert_eq!(proposal.incoming(), &[pid("p12")]);

        let mut empty = SubstitutionProposal::new();
        assert!(matches!(
            empty.commit(&mut assignment).unwrap(),
            SubstitutionOutcome::Incomplete { .. }
        ));
    }

    #[test]
    fn commit_pairs_in_pick_order() {
        let mut assignment = lineup();
        let mut proposal = SubstitutionProposal::new();
        proposal.toggle_incoming(&pid("p12"));
        proposal.toggle_incoming(&pid("p13"));
        proposal.toggle_outgoing(&pid("p11"));
        proposal.toggle_outgoing(&pid("p1"));

        let outcome = proposal.commit(&mut assignment).unwrap();
        let SubstitutionOutcome::Applied(subs) = outcome else {
            panic!("expected applied substitutions");
        };
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].slot, SlotKey::from("LW"));
        assert_eq!(subs[0].player_in, pid("p12"));
        assert_eq!(subs[1].slot, SlotKey::from("GK"));
        assert_eq!(subs[1].player_in, pid("p13"));
        assert_eq!(assignment.occupant(&SlotKey::from("GK")), Some(&pid("p13")));
        assert!(!assignment.is_active(&pid("p1")));
        assert!(proposal.is_empty());
    }

    #[test]
    fn commit_failure_leaves_everything_untouched() {
        let mut assignment = lineup();
        let mut proposal = SubstitutionProposal::new();
        proposal.toggle_incoming(&pid("p12"));
        proposal.toggle_incoming(&pid("p13"));
        proposal.toggle_outgoing(&pid("p1"));
        proposal.toggle_outgoing(&pid("p2"));
        // p2 leaves the field before the commit
        assignment.bench_player(&pid("p2"));
        let before = assignment.occupants().clone();

        let err = proposal.commit(&mut assignment).unwrap_err();
        assert!(matches!(
            err,
            TouchlineError::InvalidRequest {
                kind: InvalidRequestKind::NotOnField { .. }
            }
        ));
        assert_eq!(assignment.occupants(), &before);
        assert!(proposal.is_complete());
    }

    #[test]
    fn remove_player_from_either_list() {
        let mut proposal = SubstitutionProposal::new();
        proposal.toggle_incoming(&pid("p12"));
        proposal.toggle_outgoing(&pid("p1"));
        assert!(proposal.is_reserved(&pid("p1")));
        assert!(proposal.remove_player(&pid("p1")));
        assert!(!proposal.is_reserved(&pid("p1")));
        assert!(proposal.remove_player(&pid("p12")));
        assert!(!proposal.remove_player(&pid("p12")));
        assert!(proposal.is_empty());
    }
}
