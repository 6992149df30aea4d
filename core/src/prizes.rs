//! Prize table and weighted selection
//!
//! Weights are percentages over a 0..100 roll. Selection is a linear scan in
//! table order that takes the first prize whose running total reaches the
//! roll (`roll <= cumulative`). Nothing is renormalized: when the weights
//! stop short of 100 the remainder falls back to the first prize, and any
//! weight past 100 can never be rolled. Existing prize tables depend on these
//! odds, so keep the scan exactly as it is.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;

use crate::catalog::default_prizes;
use crate::error::{ConfigWarning, GachaError, GachaResult};
use crate::rng::DrawRng;
use crate::types::{Points, PrizeDefinition, PrizeKind};

/// Width of the roll range
pub const ROLL_SCALE: f64 = 100.0;

/// How far the weight total may drift from 100 before it is reported
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Point awards are credited as integers, so the configured value must be one
fn is_whole_points(value: f64) -> bool {
    value.is_finite() && value >= 0.0 && value <= Points::MAX as f64 && (value as Points) as f64 == value
}

/// Ordered, immutable list of weighted prizes
#[derive(Debug, Clone, PartialEq)]
pub struct PrizeTable {
    prizes: Vec<PrizeDefinition>,
}

impl PrizeTable {
    /// Build a table, rejecting configurations no draw could run against
    pub fn new(prizes: Vec<PrizeDefinition>) -> GachaResult<Self> {
        if prizes.is_empty() {
            return Err(GachaError::EmptyPrizeTable);
        }

        let mut seen = BTreeSet::new();
        for prize in &prizes {
            if !seen.insert(prize.id.as_str()) {
                return Err(GachaError::DuplicatePrizeId {
                    id: prize.id.clone(),
                });
            }
            if !prize.weight.is_finite() || prize.weight < 0.0 {
                return Err(GachaError::InvalidWeight {
                    id: prize.id.clone(),
                });
            }
            if prize.kind == PrizeKind::Fragment && prize.fragment_group_id.is_none() {
                return Err(GachaError::MissingFragmentGroup {
                    id: prize.id.clone(),
                });
            }
            if prize.kind == PrizeKind::Points && !is_whole_points(prize.value) {
                return Err(GachaError::InvalidPointValue {
                    id: prize.id.clone(),
                });
            }
        }

        Ok(Self { prizes })
    }

    /// The table compiled in from prizes.json (validated by the build script)
    pub fn builtin() -> Self {
        Self {
            prizes: default_prizes(),
        }
    }

    pub fn prizes(&self) -> &[PrizeDefinition] {
        &self.prizes
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrizeDefinition> {
        self.prizes.iter()
    }

    pub fn len(&self) -> usize {
        self.prizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }

    /// Sum of all weights, in table order
    pub fn total_weight(&self) -> f64 {
        self.prizes.iter().map(|p| p.weight).sum()
    }

    /// Probability mass that lands on the fallback because the weights stop
    /// short of 100
    pub fn fallback_mass(&self) -> f64 {
        let residual = ROLL_SCALE - self.total_weight();
        if residual > 0.0 {
            residual
        } else {
            0.0
        }
    }

    /// Configuration smells worth reporting at startup
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let total = self.total_weight();
        let drift = total - ROLL_SCALE;
        if drift > WEIGHT_TOLERANCE || drift < -WEIGHT_TOLERANCE {
            warnings.push(ConfigWarning::WeightSumMismatch { total });
        }

        let mut cumulative = 0.0;
        for prize in &self.prizes {
            if cumulative >= ROLL_SCALE && prize.weight > 0.0 {
                warnings.push(ConfigWarning::UnreachablePrize {
                    id: prize.id.clone(),
                });
            }
            cumulative += prize.weight;
        }

        warnings
    }

    /// Log every configuration warning; returns how many there were
    pub fn report_warnings(&self) -> usize {
        let warnings = self.warnings();
        for warning in &warnings {
            match warning {
                ConfigWarning::WeightSumMismatch { total } => log::warn!(
                    "prize weights add up to {} instead of 100, the difference goes to {}",
                    total,
                    self.prizes[0].id
                ),
                ConfigWarning::UnreachablePrize { id } => {
                    log::warn!("prize {} sits past the 100 mark and can never be drawn", id)
                }
            }
        }
        warnings.len()
    }

    /// Index of the prize a roll in [0, 100) lands on
    pub fn select_index(&self, roll: f64) -> usize {
        let mut cumulative = 0.0;
        for (index, prize) in self.prizes.iter().enumerate() {
            cumulative += prize.weight;
            if roll <= cumulative {
                return index;
            }
        }
        0
    }

    /// Prize a roll in [0, 100) lands on
    pub fn select(&self, roll: f64) -> &PrizeDefinition {
        &self.prizes[self.select_index(roll)]
    }

    /// Roll once and return the winning prize
    pub fn draw<R: DrawRng>(&self, rng: &mut R) -> &PrizeDefinition {
        let roll = rng.next_unit() * ROLL_SCALE;
        self.select(roll)
    }

    /// Ids of the fragment groups any prize contributes to
    pub fn fragment_groups(&self) -> Vec<String> {
        let groups: BTreeSet<&String> = self
            .prizes
            .iter()
            .filter_map(|p| p.fragment_group_id.as_ref())
            .collect();
        groups.into_iter().cloned().collect()
    }
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self::builtin()
    }
}
