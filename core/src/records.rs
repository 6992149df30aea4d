//! Draw log: append-only, newest first
//!
//! The log is the audit trail behind admin redemption and is independent of
//! any user's session. Entries are never removed; the only transition is
//! setting `redeemed_at` once.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::types::{DrawLogEntry, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawRecords {
    entries: Vec<DrawLogEntry>,
}

/// Result of a redemption attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    /// Entry was open and is now redeemed at the given time
    Redeemed(Timestamp),
    /// Entry had already been redeemed at the given time
    AlreadyRedeemed(Timestamp),
    /// No entry has that id
    NotFound,
}

impl Redemption {
    /// Whether the log changed
    pub fn changed(&self) -> bool {
        matches!(self, Redemption::Redeemed(_))
    }
}

impl DrawRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head
    pub fn append(&mut self, entry: DrawLogEntry) {
        self.entries.insert(0, entry);
    }

    /// Set `redeemed_at` on an open entry. Re-marking keeps the first time.
    pub fn mark_redeemed(&mut self, id: &str, now: Timestamp) -> Redemption {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => match entry.redeemed_at {
                Some(at) => Redemption::AlreadyRedeemed(at),
                None => {
                    entry.redeemed_at = Some(now);
                    Redemption::Redeemed(now)
                }
            },
            None => Redemption::NotFound,
        }
    }

    pub fn get(&self, id: &str) -> Option<&DrawLogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Snapshot of every entry, newest first
    pub fn list(&self) -> Vec<DrawLogEntry> {
        self.entries.clone()
    }

    pub fn entries(&self) -> &[DrawLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries won by one user, newest first
    pub fn for_user<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DrawLogEntry> + 'a {
        self.entries.iter().filter(move |e| e.user_name == name)
    }

    /// Entries still waiting for an admin to hand the prize over
    pub fn pending(&self) -> impl Iterator<Item = &DrawLogEntry> {
        self.entries.iter().filter(|e| e.is_pending())
    }

    /// Id for the next entry: the current time in milliseconds, bumped past
    /// the newest numeric id when two draws land in the same millisecond
    pub fn next_id(&self, now: Timestamp) -> String {
        let newest = self
            .entries
            .iter()
            .filter_map(|e| e.id.parse::<Timestamp>().ok())
            .max();
        let id = match newest {
            Some(newest) if newest >= now => newest.saturating_add(1),
            _ => now,
        };
        format!("{}", id)
    }
}

impl From<Vec<DrawLogEntry>> for DrawRecords {
    fn from(entries: Vec<DrawLogEntry>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrizeKind;

    fn entry(id: &str, kind: PrizeKind) -> DrawLogEntry {
        DrawLogEntry {
            id: String::from(id),
            user_name: String::from("Tom"),
            prize_name: String::from("prize"),
            prize_type: kind,
            timestamp: 1,
            redeemed_at: None,
        }
    }

    #[test]
    fn test_append_puts_newest_first() {
        let mut records = DrawRecords::new();
        records.append(entry("1", PrizeKind::Cash));
        records.append(entry("2", PrizeKind::Empty));
        let ids: Vec<&str> = records.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
    }

    #[test]
    fn test_next_id_bumps_on_collision() {
        let mut records = DrawRecords::new();
        assert_eq!(records.next_id(1_000), "1000");
        records.append(entry("1000", PrizeKind::Cash));
        assert_eq!(records.next_id(1_000), "1001");
        assert_eq!(records.next_id(999), "1001");
        assert_eq!(records.next_id(5_000), "5000");
    }

    #[test]
    fn test_next_id_saturates_at_max() {
        let mut records = DrawRecords::new();
        records.append(entry(&format!("{}", Timestamp::MAX), PrizeKind::Cash));
        assert_eq!(records.next_id(1_000), format!("{}", Timestamp::MAX));
    }

    #[test]
    fn test_for_user_filters_by_name() {
        let mut records = DrawRecords::new();
        records.append(entry("1", PrizeKind::Cash));
        records.append(DrawLogEntry {
            user_name: String::from("Ann"),
            ..entry("2", PrizeKind::Coupon)
        });
        records.append(entry("3", PrizeKind::Empty));

        let toms: Vec<&str> = records.for_user("Tom").map(|e| e.id.as_str()).collect();
        assert_eq!(toms, ["3", "1"]);
        assert_eq!(records.for_user("Bob").count(), 0);
    }

    #[test]
    fn test_next_id_ignores_foreign_ids() {
        let mut records = DrawRecords::new();
        records.append(entry("imported-a", PrizeKind::Cash));
        assert_eq!(records.next_id(77), "77");
    }

    #[test]
    fn test_pending_skips_empty_points_and_redeemed() {
        let mut records = DrawRecords::new();
        records.append(entry("1", PrizeKind::Empty));
        records.append(entry("2", PrizeKind::Points));
        records.append(entry("3", PrizeKind::Coupon));
        records.append(entry("4", PrizeKind::Physical));
        records.mark_redeemed("4", 10);
        let pending: Vec<&str> = records.pending().map(|e| e.id.as_str()).collect();
        assert_eq!(pending, ["3"]);
    }

    #[test]
    fn test_mark_unknown_id() {
        let mut records = DrawRecords::new();
        records.append(entry("1", PrizeKind::Cash));
        assert_eq!(records.mark_redeemed("nope", 5), Redemption::NotFound);
        assert!(records.get("1").unwrap().redeemed_at.is_none());
    }
}
