//! Domain types shared by the ledger, the draw engine and the sync layer.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

/// A point balance. Signed because two devices spending the same remote
/// balance at once can drive it below zero.
pub type Points = i64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// What a prize hands out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrizeKind {
    /// Nothing won
    Empty,
    /// Points credited straight back to the balance
    #[serde(rename = "POINT")]
    Points,
    Cash,
    Coupon,
    Physical,
    /// One piece of a composite reward
    Fragment,
}

impl PrizeKind {
    /// Whether winning this kind leaves something in the inventory
    pub fn is_collectible(&self) -> bool {
        !matches!(self, PrizeKind::Empty | PrizeKind::Points)
    }
}

/// A weighted entry of the prize table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeDefinition {
    pub id: String,
    pub name: String,
    pub kind: PrizeKind,
    /// Points granted for `Points`, face value otherwise
    pub value: f64,
    /// Percentage of the 0..100 draw range owned by this prize
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_group_id: Option<String>,
    #[serde(default)]
    pub is_rare: bool,
}

impl PrizeDefinition {
    /// Points this prize adds back to the balance. Tables only admit whole
    /// values for point prizes.
    pub fn points_award(&self) -> Points {
        match self.kind {
            PrizeKind::Points => self.value as Points,
            _ => 0,
        }
    }
}

/// Composite reward unlocked by collecting fragments of one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentDefinition {
    pub group_id: String,
    pub reward_name: String,
}

/// A prize sitting in a user's inventory
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub prize_id: String,
    pub prize_name: String,
    pub obtained_at: Timestamp,
    #[serde(default)]
    pub is_redeemed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<Timestamp>,
}

/// The active user's working copy
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub name: String,
    pub points: Points,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    /// Fragment group id -> pieces collected
    #[serde(default)]
    pub fragments: BTreeMap<String, u32>,
}

impl Session {
    pub fn new(name: &str, points: Points) -> Self {
        Self {
            name: String::from(name),
            points,
            inventory: Vec::new(),
            fragments: BTreeMap::new(),
        }
    }

    /// Pieces collected for a fragment group
    pub fn fragment_count(&self, group_id: &str) -> u32 {
        self.fragments.get(group_id).copied().unwrap_or(0)
    }
}

/// One line of the draw log
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawLogEntry {
    pub id: String,
    pub user_name: String,
    pub prize_name: String,
    pub prize_type: PrizeKind,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<Timestamp>,
}

impl DrawLogEntry {
    pub fn is_redeemed(&self) -> bool {
        self.redeemed_at.is_some()
    }

    /// Won something physical that has not been handed over yet
    pub fn is_pending(&self) -> bool {
        self.prize_type.is_collectible() && !self.is_redeemed()
    }
}

/// Points column of an import row, as a spreadsheet or paste parser hands it over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointsCell {
    Number(f64),
    Text(String),
}

/// One record handed over by the bulk import parser
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub points: Option<PointsCell>,
}

impl ImportRow {
    pub fn new(name: &str, points: Points) -> Self {
        Self {
            name: Some(String::from(name)),
            points: Some(PointsCell::Number(points as f64)),
        }
    }
}
