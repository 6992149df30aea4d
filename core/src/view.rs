//! View types for UI serialization
//!
//! Read-only shapes handed to the browser and the CLI. None of them feed
//! back into engine state.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::catalog::FRAGMENTS_NEEDED;
use crate::prizes::PrizeTable;
use crate::types::*;

/// Progress toward one composite reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentProgress {
    pub group_id: String,
    pub reward_name: String,
    pub count: u32,
    pub needed: u32,
    /// Enough pieces collected. Redemption is handled by staff.
    pub complete: bool,
}

impl FragmentProgress {
    /// Progress for every known group, including ones with no pieces yet
    pub fn for_session(session: &Session, definitions: &[FragmentDefinition]) -> Vec<Self> {
        let mut progress: Vec<Self> = definitions
            .iter()
            .map(|def| Self::new(&def.group_id, &def.reward_name, session))
            .collect();

        // Groups collected before a definition was removed still show up
        for group in session.fragments.keys() {
            if !definitions.iter().any(|d| &d.group_id == group) {
                progress.push(Self::new(group, group, session));
            }
        }
        progress
    }

    fn new(group_id: &str, reward_name: &str, session: &Session) -> Self {
        let count = session.fragment_count(group_id);
        Self {
            group_id: String::from(group_id),
            reward_name: String::from(reward_name),
            count,
            needed: FRAGMENTS_NEEDED,
            complete: count >= FRAGMENTS_NEEDED,
        }
    }
}

/// One row of the admin odds table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeOddsRow {
    pub id: String,
    pub name: String,
    pub kind: PrizeKind,
    pub value: f64,
    pub weight: f64,
    /// Roll range covered by this prize is (previous bound, upper_bound]
    pub upper_bound: f64,
    pub is_rare: bool,
}

/// The prize table as the admin dashboard shows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsView {
    pub rows: Vec<PrizeOddsRow>,
    pub total_weight: f64,
    /// Share of rolls that fall through to the first prize
    pub fallback_mass: f64,
}

impl OddsView {
    pub fn from_table(table: &PrizeTable) -> Self {
        let mut cumulative = 0.0;
        let rows = table
            .iter()
            .map(|prize| {
                cumulative += prize.weight;
                PrizeOddsRow {
                    id: prize.id.clone(),
                    name: prize.name.clone(),
                    kind: prize.kind,
                    value: prize.value,
                    weight: prize.weight,
                    upper_bound: cumulative,
                    is_rare: prize.is_rare,
                }
            })
            .collect();

        Self {
            rows,
            total_weight: table.total_weight(),
            fallback_mass: table.fallback_mass(),
        }
    }
}
