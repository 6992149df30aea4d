//! Points ledger: display name -> balance
//!
//! The ledger is the authority for balances across sessions and devices.
//! Names are trimmed before they reach the map, so two names differing only
//! in surrounding whitespace are the same user.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ImportIssue;
use crate::types::{ImportRow, Points, PointsCell};

/// How many names the leaderboard shows by default
pub const LEADERBOARD_SIZE: usize = 10;

/// Trim a display name into its ledger key
pub fn normalize_name(name: &str) -> &str {
    name.trim()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsLedger {
    #[serde(deserialize_with = "deserialize_balances")]
    balances: BTreeMap<String, Points>,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Rows written to the ledger
    pub imported: usize,
    /// Rows skipped, by position in the batch
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub row: usize,
    pub issue: ImportIssue,
}

/// One leaderboard line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub points: Points,
}

impl PointsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance for a name; unknown users start at zero
    pub fn get(&self, name: &str) -> Points {
        self.balance(name).unwrap_or(0)
    }

    /// Balance for a name, if the ledger has ever seen it
    pub fn balance(&self, name: &str) -> Option<Points> {
        self.balances.get(normalize_name(name)).copied()
    }

    /// Upsert a balance
    pub fn set(&mut self, name: &str, balance: Points) {
        self.balances
            .insert(String::from(normalize_name(name)), balance);
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Points)> {
        self.balances.iter()
    }

    /// Apply import rows in order. Balances are overwritten, not added to,
    /// so the last row for a duplicate name wins. Bad rows are skipped one by
    /// one without aborting the batch.
    pub fn import_rows(&mut self, rows: &[ImportRow]) -> ImportReport {
        let mut report = ImportReport::default();

        for (row, record) in rows.iter().enumerate() {
            let name = record
                .name
                .as_deref()
                .map(normalize_name)
                .unwrap_or_default();
            if name.is_empty() {
                report.skipped.push(SkippedRow {
                    row,
                    issue: ImportIssue::EmptyName,
                });
                continue;
            }

            match record.points.as_ref().and_then(parse_points) {
                Some(points) => {
                    self.set(name, points);
                    report.imported += 1;
                }
                None => report.skipped.push(SkippedRow {
                    row,
                    issue: ImportIssue::MalformedPoints,
                }),
            }
        }

        report
    }

    /// Top balances, highest first, ties by name
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<(&String, &Points)> = self.balances.iter().collect();
        // BTreeMap iteration is already name-ordered and the sort is stable
        entries.sort_by(|a, b| b.1.cmp(a.1));

        entries
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, (name, points))| LeaderboardEntry {
                rank: i + 1,
                name: name.clone(),
                points: *points,
            })
            .collect()
    }
}

impl FromIterator<(String, Points)> for PointsLedger {
    fn from_iter<I: IntoIterator<Item = (String, Points)>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for (name, points) in iter {
            ledger.set(&name, points);
        }
        ledger
    }
}

/// Read a points cell the way a spreadsheet paste hands it over. Fractions
/// are truncated; negatives and non-numbers are rejected.
fn parse_points(cell: &PointsCell) -> Option<Points> {
    let value = match cell {
        PointsCell::Number(n) => *n,
        PointsCell::Text(text) => text.trim().parse::<f64>().ok()?,
    };
    if value < 0.0 {
        return None;
    }
    truncate_points(value)
}

fn truncate_points(value: f64) -> Option<Points> {
    if !value.is_finite() || value < Points::MIN as f64 || value > Points::MAX as f64 {
        return None;
    }
    Some(value as Points)
}

/// Stored balance maps may hold fractions or `null` written by older
/// clients. Each entry is read on its own so one bad value never drops the
/// rest of the map.
fn balances_from_values(raw: BTreeMap<String, Value>) -> BTreeMap<String, Points> {
    let mut balances = BTreeMap::new();
    for (name, value) in raw {
        let points = match &value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_points)),
            _ => None,
        };
        match points {
            Some(points) => {
                balances.insert(String::from(normalize_name(&name)), points);
            }
            None => log::warn!("dropping unreadable balance for {}: {}", name, value),
        }
    }
    balances
}

pub(crate) fn deserialize_balances<'de, D>(deserializer: D) -> Result<BTreeMap<String, Points>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, Value>::deserialize(deserializer).map(balances_from_values)
}

pub(crate) fn deserialize_optional_balances<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, Points>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.map(balances_from_values))
}
