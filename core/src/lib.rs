#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod catalog;
pub mod clock;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod prizes;
pub mod records;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod types;
pub mod view;

#[cfg(test)]
mod tests;

pub use catalog::{default_prizes, fragment_definitions, COST_PER_DRAW, FRAGMENTS_NEEDED};
pub use clock::{Clock, ManualClock};
#[cfg(feature = "std")]
pub use clock::SystemClock;
pub use engine::{DrawOutcome, GachaEngine, ImportOutcome, RedeemOutcome};
pub use error::*;
pub use ledger::{ImportReport, LeaderboardEntry, PointsLedger, SkippedRow, LEADERBOARD_SIZE};
pub use prizes::PrizeTable;
pub use records::{DrawRecords, Redemption};
pub use rng::{DrawRng, ScriptedRng, XorShiftRng};
pub use snapshot::Snapshot;
pub use store::{JsonStore, KeyValueStore, LocalStore, MemoryStore};
pub use sync::{HttpRemote, MemoryRemote, NoRemote, RemoteStore, SyncConfig, SyncDocument, SyncReport};
pub use types::*;
pub use view::*;
