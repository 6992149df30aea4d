mod admin;
mod import;
mod session;

use alloc::string::String;

use crate::clock::ManualClock;
use crate::engine::GachaEngine;
use crate::prizes::PrizeTable;
use crate::rng::ScriptedRng;
use crate::store::{JsonStore, KeyValueStore, MemoryStore};
use crate::sync::MemoryRemote;
use crate::types::*;

// ==========================================
// HELPER FUNCTIONS (Boilerplate Reduction)
// ==========================================

type TestEngine<'a> = GachaEngine<JsonStore<MemoryStore>, &'a MemoryRemote, ScriptedRng, ManualClock>;

const START: Timestamp = 1_700_000_000_000;

fn prize(id: &str, kind: PrizeKind, value: f64, weight: f64) -> PrizeDefinition {
    PrizeDefinition {
        id: String::from(id),
        name: String::from(id),
        kind,
        value,
        weight,
        fragment_group_id: None,
        is_rare: false,
    }
}

fn fragment(id: &str, group: &str, weight: f64) -> PrizeDefinition {
    PrizeDefinition {
        fragment_group_id: Some(String::from(group)),
        is_rare: true,
        ..prize(id, PrizeKind::Fragment, 0.0, weight)
    }
}

/// Rolls: [0, 50] empty, (50, 80] ten points, (80, 100] one fragment
fn small_table() -> PrizeTable {
    PrizeTable::new(vec![
        prize("empty", PrizeKind::Empty, 0.0, 50.0),
        prize("pt_10", PrizeKind::Points, 10.0, 30.0),
        fragment("frag_gold", "GOLD", 20.0),
    ])
    .unwrap()
}

/// Unit rolls that land on each entry of `small_table`
const ROLL_EMPTY: f64 = 0.10;
const ROLL_POINTS: f64 = 0.60;
const ROLL_FRAGMENT: f64 = 0.90;

fn create_engine<'a>(remote: &'a MemoryRemote, rolls: &[f64]) -> (TestEngine<'a>, ManualClock) {
    let clock = ManualClock::new(START);
    let engine = GachaEngine::new(
        JsonStore::new(MemoryStore::new()),
        remote,
        ScriptedRng::new(rolls),
        clock.clone(),
    )
    .with_table(small_table());
    (engine, clock)
}

/// Engine with one user already in the ledger and logged in
fn create_logged_in<'a>(
    remote: &'a MemoryRemote,
    rolls: &[f64],
    name: &str,
    points: Points,
) -> (TestEngine<'a>, ManualClock, Session) {
    let (mut engine, clock) = create_engine(remote, rolls);
    engine.set_balance(name, points).unwrap();
    let session = engine.login(name).unwrap();
    (engine, clock, session)
}

/// Every raw key/value pair, for byte-for-byte comparisons
fn raw_state(engine: &TestEngine<'_>) -> alloc::vec::Vec<(String, Option<String>)> {
    crate::store::ALL_KEYS
        .iter()
        .map(|key| (String::from(*key), engine.store().backend().get(key)))
        .collect()
}

/// Remote with one seeded document, remembered by the engine
fn connect(engine: &mut TestEngine<'_>, remote: &MemoryRemote, id: &str) {
    remote.insert_raw(id, r#"{"pointsDB":{},"logs":[]}"#);
    engine.set_remote_id(Some(id)).unwrap();
}
