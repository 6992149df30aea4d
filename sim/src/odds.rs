//! Monte-Carlo check of the prize table
//!
//! Draws are split into fixed-size batches, each with its own generator
//! derived from the base seed, so a run is reproducible regardless of how
//! rayon schedules the batches.

use epe_gacha_core::prizes::{PrizeTable, ROLL_SCALE};
use epe_gacha_core::rng::{DrawRng, XorShiftRng};
use rayon::prelude::*;
use serde::Serialize;

const BATCH_SIZE: u64 = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct OddsRow {
    pub id: String,
    pub name: String,
    /// Configured percentage
    pub weight: f64,
    /// Observed percentage
    pub observed: f64,
    pub hits: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OddsReport {
    pub draws: u64,
    pub seed: u64,
    pub rows: Vec<OddsRow>,
    /// Share of rolls landing past the last cumulative bound
    pub fallback_mass: f64,
}

fn run_batch(table: &PrizeTable, seed: u64, batch: u64, draws: u64) -> Vec<u64> {
    let mut rng = XorShiftRng::seed_from_u64(seed ^ batch.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let mut hits = vec![0u64; table.len()];
    for _ in 0..draws {
        let roll = rng.next_unit() * ROLL_SCALE;
        hits[table.select_index(roll)] += 1;
    }
    hits
}

pub fn simulate(table: &PrizeTable, draws: u64, seed: u64) -> OddsReport {
    let batches = draws.div_ceil(BATCH_SIZE);
    let hits = (0..batches)
        .into_par_iter()
        .map(|batch| {
            let size = BATCH_SIZE.min(draws - batch * BATCH_SIZE);
            run_batch(table, seed, batch, size)
        })
        .reduce(
            || vec![0u64; table.len()],
            |mut total, batch| {
                for (sum, hit) in total.iter_mut().zip(batch) {
                    *sum += hit;
                }
                total
            },
        );

    let rows = table
        .iter()
        .zip(hits)
        .map(|(prize, hits)| OddsRow {
            id: prize.id.clone(),
            name: prize.name.clone(),
            weight: prize.weight,
            observed: if draws == 0 {
                0.0
            } else {
                hits as f64 * 100.0 / draws as f64
            },
            hits,
        })
        .collect();

    OddsReport {
        draws,
        seed,
        rows,
        fallback_mass: table.fallback_mass(),
    }
}
