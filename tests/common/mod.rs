//! Shared fixtures for integration tests.
//!
//! ```ignore
//! mod common;
//! use common::{pid, slot, started_session, squad};
//! ```

#![allow(dead_code)]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::sync::{Arc, Once};

use touchline::telemetry::CollectingObserver;
use touchline::{MatchBuilder, MatchSession, Player, PlayerId, Roster, SlotKey};
use web_time::{Duration, Instant};

/// Size of the default squad.
pub const SQUAD_SIZE: usize = 18;

/// Players `p1..=p11` are the 1-4-4-2 starters produced by auto-assignment.
pub const STARTERS: usize = 11;

/// `(position, secondary positions)` per jersey number, in roster order.
const SQUAD: [(&str, &[&str]); SQUAD_SIZE] = [
    ("GK", &[]),
    ("RB", &["CB"]),
    ("CB", &[]),
    ("CB", &["DM"]),
    ("LB", &[]),
    ("RM", &["RW"]),
    ("CM", &[]),
    ("CM", &["DM"]),
    ("LM", &["LW"]),
    ("CF", &[]),
    ("CF", &["RW"]),
    ("GK", &[]),
    ("CB", &["RB"]),
    ("CM", &[]),
    ("RB", &[]),
    ("CF", &[]),
    ("DM", &["CM"]),
    ("RW", &[]),
];

static TRACING: Once = Once::new();

/// Routes crate logs through the test harness's captured output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        // A subscriber installed elsewhere wins.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Builds a player id.
pub fn pid(id: &str) -> PlayerId {
    PlayerId::from(id)
}

/// Builds a slot key.
pub fn slot(key: &str) -> SlotKey {
    SlotKey::from(key)
}

/// The id of jersey number `n`.
pub fn nth(n: usize) -> PlayerId {
    PlayerId::new(format!("p{}", n))
}

/// An 18-player squad with ids `p1..=p18`.
///
/// No player has LW as a primary position; `p9` lists it as a secondary.
pub fn squad() -> Roster {
    let players = SQUAD
        .iter()
        .enumerate()
        .map(|(i, (position, secondary))| {
            let n = i + 1;
            Player::new(
                format!("p{}", n),
                "Alex",
                format!("Player{}", n),
                n as u8,
                *position,
            )
            .with_secondary_positions(secondary.iter().copied())
        })
        .collect();
    Roster::new(players).unwrap()
}

/// An idle session on 1-4-4-2 with `p1..=p11` assigned.
pub fn lined_up_session() -> MatchSession {
    init_tracing();
    let mut session = MatchBuilder::new().with_roster(squad()).build().unwrap();
    assert_eq!(session.auto_assign().unwrap(), STARTERS);
    session
}

/// Like [`lined_up_session`], but collecting violations.
pub fn observed_session() -> (MatchSession, Arc<CollectingObserver>) {
    init_tracing();
    let observer = Arc::new(CollectingObserver::new());
    let mut session = MatchBuilder::new()
        .with_roster(squad())
        .with_violation_observer(observer.clone())
        .build()
        .unwrap();
    session.auto_assign().unwrap();
    (session, observer)
}

/// A session kicked off at the returned instant.
pub fn started_session() -> (MatchSession, Instant) {
    let mut session = lined_up_session();
    let kick_off = Instant::now();
    session.start(kick_off).unwrap();
    session.events().for_each(drop);
    (session, kick_off)
}

/// `seconds` after `start`.
pub fn after(start: Instant, seconds: u64) -> Instant {
    start + Duration::from_secs(seconds)
}
