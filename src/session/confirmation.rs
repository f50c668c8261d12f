//! Human-readable prompts for destructive actions.
//!
//! The core never asks for confirmation itself. The shell asks
//! [`MatchSession::confirmation_for`](crate::MatchSession::confirmation_for)
//! for the prompt, shows it, and only on approval calls
//! [`MatchSession::perform`](crate::MatchSession::perform).

use crate::ledger::{ActionRecord, Ledger};
use crate::roster::Roster;
use crate::PlayerId;

/// A destructive action awaiting the operator's approval.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PendingAction {
    /// Credit a goal to a player.
    Goal {
        /// The scorer.
        player: PlayerId,
    },
    /// Record a goal against.
    OpponentGoal,
    /// Show a straight red card.
    RedCard {
        /// The player to send off.
        player: PlayerId,
    },
    /// Show a yellow card.
    YellowCard {
        /// The player to caution.
        player: PlayerId,
    },
    /// Undo the most recent ledger record.
    UndoLast,
}

fn name_of(roster: &Roster, player: &PlayerId) -> String {
    roster
        .get(player)
        .map_or_else(|| player.to_string(), |p| p.display_name())
}

/// Builds the prompt for `action`, or `None` if there is nothing to confirm.
pub(crate) fn prompt(action: &PendingAction, roster: &Roster, ledger: &Ledger) -> Option<String> {
    let text = match action {
        PendingAction::Goal { player } => {
            format!("Goal scored by {}?", name_of(roster, player))
        },
        PendingAction::OpponentGoal => "Goal for the opponent?".to_owned(),
        PendingAction::RedCard { player } => format!(
            "Give Red Card to {}? Player will be sent to bench and cannot return.",
            name_of(roster, player)
        ),
        PendingAction::YellowCard { player } => {
            if ledger.tally().yellow_cards(player) >= 1 {
                format!(
                    "Give second Yellow Card to {}? Player will be sent off and cannot return.",
                    name_of(roster, player)
                )
            } else {
                format!("Give Yellow Card to {}?", name_of(roster, player))
            }
        },
        PendingAction::UndoLast => match ledger.last()? {
            ActionRecord::Goal { player } => {
                format!("Undo last goal by {}?", name_of(roster, player))
            },
            ActionRecord::OpponentGoal => "Undo last opponent goal?".to_owned(),
            ActionRecord::RedCard { player, .. } => {
                format!("Undo red card for {}?", name_of(roster, player))
            },
            ActionRecord::YellowCard {
                player,
                second_yellow,
            } => {
                if second_yellow.is_some() {
                    format!("Undo second yellow card for {}?", name_of(roster, player))
                } else {
                    format!("Undo yellow card for {}?", name_of(roster, player))
                }
            },
        },
    };
    Some(text)
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
    use crate::assignment::SlotAssignment;
    use crate::roster::Player;

    fn roster() -> Roster {
        Roster::new(vec![Player::new("p9", "jamie", "Smith", 9, "CF")]).unwrap()
    }

    fn p9() -> PlayerId {
        PlayerId::from("p9")
    }

    #[test]
    fn goal_and_red_card_prompts() {
        let ledger = Ledger::new();
        assert_eq!(
            prompt(&PendingAction::Goal { player: p9() }, &roster(), &ledger).unwrap(),
            "Goal scored by J. Smith?"
        );
        assert_eq!(
            prompt(&PendingAction::RedCard { player: p9() }, &roster(), &ledger).unwrap(),
            "Give Red Card to J. Smith? Player will be sent to bench and cannot return."
        );
    }

    #[test]
    fn yellow_prompt_warns_on_second() {
        let mut ledger = Ledger::new();
        let mut assignment = SlotAssignment::default();
        let action = PendingAction::YellowCard { player: p9() };
        assert_eq!(
            prompt(&action, &roster(), &ledger).unwrap(),
            "Give Yellow Card to J. Smith?"
        );
        ledger.yellow_card(&p9(), &mut assignment);
        assert!(prompt(&action, &roster(), &ledger)
            .unwrap()
            .starts_with("Give second Yellow Card"));
    }

    #[test]
    fn undo_prompt_follows_last_record() {
        let mut ledger = Ledger::new();
        let mut assignment = SlotAssignment::default();
        assert_eq!(prompt(&PendingAction::UndoLast, &roster(), &ledger), None);

        ledger.goal(&p9());
        assert_eq!(
            prompt(&PendingAction::UndoLast, &roster(), &ledger).unwrap(),
            "Undo last goal by J. Smith?"
        );
        ledger.red_card(&p9(), &mut assignment);
        assert_eq!(
            prompt(&PendingAction::UndoLast, &roster(), &ledger).unwrap(),
            "Undo red card for J. Smith?"
        );
    }

    #[test]
    fn unknown_player_falls_back_to_id() {
        let ledger = Ledger::new();
        let action = PendingAction::Goal {
            player: PlayerId::from("ghost"),
        };
        assert_eq!(
            prompt(&action, &roster(), &ledger).unwrap(),
            "Goal scored by ghost?"
        );
    }
}
