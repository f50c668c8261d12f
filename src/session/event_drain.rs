use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

use crate::MatchEvent;

/// Drains pending [`MatchEvent`]s from a session, oldest first.
///
/// Obtained from [`MatchSession::events`](crate::MatchSession::events).
/// Events not consumed before the drain is dropped are discarded.
///
/// ```
/// use touchline::{MatchBuilder, Player, Roster};
///
/// let roster = Roster::new(vec![Player::new("a", "Ann", "Able", 1, "GK")]).unwrap();
/// let mut session = MatchBuilder::new().with_roster(roster).build().unwrap();
/// assert_eq!(session.events().len(), 0);
/// ```
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a> {
    inner: Drain<'a, MatchEvent>,
}

impl<'a> EventDrain<'a> {
    pub(crate) fn from_drain(inner: Drain<'a, MatchEvent>) -> Self {
        Self { inner }
    }
}

impl Iterator for EventDrain<'_> {
    type Item = MatchEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for EventDrain<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for EventDrain<'_> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl FusedIterator for EventDrain<'_> {}

impl std::fmt::Debug for EventDrain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::iter_with_drain
)]
mod tests {
    use super::*;
    use crate::PlayerId;
    use std::collections::VecDeque;

    fn queue() -> VecDeque<MatchEvent> {
        let mut queue = VecDeque::new();
        queue.push_back(MatchEvent::Started);
        queue.push_back(MatchEvent::Paused { elapsed: 12 });
        queue.push_back(MatchEvent::AssignmentRejected {
            player: PlayerId::from("p12"),
            max_active: 10,
        });
        queue
    }

    #[test]
    fn yields_in_queue_order_and_empties_queue() {
        let mut queue = queue();
        let events: Vec<_> = EventDrain::from_drain(queue.drain(..)).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], MatchEvent::Started);
        assert!(queue.is_empty());
    }

    #[test]
    fn double_ended_and_exact_size() {
        let mut queue = queue();
        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.len(), 3);
        assert!(matches!(
            drain.next_back(),
            Some(MatchEvent::AssignmentRejected { .. })
        ));
        assert_eq!(drain.next(), Some(MatchEvent::Started));
        assert_eq!(drain.len(), 1);
    }

    #[test]
    fn fused_after_exhaustion() {
        let mut queue = VecDeque::from([MatchEvent::Started]);
        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert!(drain.next().is_some());
        assert!(drain.next().is_none());
        assert!(drain.next().is_none());
    }

    #[test]
    fn debug_shows_remaining() {
        let mut queue = queue();
        let drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(format!("{:?}", drain), "EventDrain { remaining: 3 }");
    }
}
