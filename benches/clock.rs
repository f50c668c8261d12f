//! Benchmarks for clock polling and lineup reconciliation
//!
//! Run with: cargo bench --bench clock

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::hint::black_box;
use touchline::{MatchBuilder, MatchClock, MatchSession, Player, PlayerId, Roster, SlotKey};
use web_time::{Duration, Instant};

const POSITIONS: [&str; 18] = [
    "GK", "RB", "CB", "CB", "LB", "RM", "CM", "CM", "LM", "CF", "CF", "GK", "CB", "CM", "RB",
    "CF", "DM", "RW",
];

fn roster() -> Roster {
    let players = POSITIONS
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let n = i + 1;
            Player::new(
                format!("p{}", n),
                "Bench",
                format!("Mark{}", n),
                n as u8,
                *position,
            )
        })
        .collect();
    Roster::new(players).expect("unique ids")
}

fn started_session() -> (MatchSession, Instant) {
    let mut session = MatchBuilder::new()
        .with_roster(roster())
        .build()
        .expect("valid session");
    session.auto_assign().expect("idle session");
    let kick_off = Instant::now();
    session.start(kick_off).expect("full lineup");
    (session, kick_off)
}

fn bench_clock_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("MatchClock advance");

    for active in [11usize, 22, 44].iter() {
        group.bench_with_input(BenchmarkId::new("one_second", active), active, |b, &active| {
            let ids: Vec<PlayerId> = (0..active)
                .map(|i| PlayerId::new(format!("p{}", i)))
                .collect();
            let times: BTreeMap<PlayerId, u32> = ids.iter().map(|id| (id.clone(), 0)).collect();
            b.iter_batched(
                || {
                    let mut clock = MatchClock::new();
                    clock
                        .start(ids.iter().cloned(), times.clone(), 80, Instant::now())
                        .expect("idle clock");
                    clock
                },
                |mut clock| black_box(clock.advance(black_box(Duration::from_millis(1_250)))),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_session_poll(c: &mut Criterion) {
    c.bench_function("session_poll_first_half", |b| {
        b.iter_batched(
            started_session,
            |(mut session, kick_off)| {
                for second in 1..=60u64 {
                    session.poll(kick_off + Duration::from_secs(second));
                }
                black_box(session.elapsed_seconds())
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_reassignment(c: &mut Criterion) {
    let gk = SlotKey::from("GK");
    let p1 = PlayerId::from("p1");
    let p12 = PlayerId::from("p12");

    c.bench_function("session_swap_goalkeepers", |b| {
        let (mut session, _) = started_session();
        let mut flip = false;
        b.iter(|| {
            let incoming = if flip { &p1 } else { &p12 };
            flip = !flip;
            black_box(session.assign(&gk, incoming).expect("bench player"))
        });
    });
}

criterion_group!(
    benches,
    bench_clock_advance,
    bench_session_poll,
    bench_reassignment
);
criterion_main!(benches);
