//! Build script: reads /prizes/prizes.json and generates Rust source code that
//! statically constructs the prize table, the fragment definitions and the
//! draw constants. The core crate embeds this data without runtime JSON
//! parsing of its configuration.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

// ── JSON schema types (build-time only) ──────────────────────────────────────

#[derive(Deserialize)]
struct JsonConfig {
    cost_per_draw: i64,
    fragments_needed: u32,
    #[serde(default)]
    fragments: Vec<JsonFragment>,
    prizes: Vec<JsonPrize>,
}

#[derive(Deserialize)]
struct JsonFragment {
    id: String,
    reward: String,
}

#[derive(Deserialize)]
struct JsonPrize {
    id: String,
    name: String,
    kind: String,
    value: f64,
    weight: f64,
    fragment: Option<String>,
    #[serde(default)]
    rare: bool,
}

// ── Code generation helpers ──────────────────────────────────────────────────

fn gen_kind(kind: &str) -> &'static str {
    match kind {
        "EMPTY" => "PrizeKind::Empty",
        "POINT" => "PrizeKind::Points",
        "CASH" => "PrizeKind::Cash",
        "COUPON" => "PrizeKind::Coupon",
        "PHYSICAL" => "PrizeKind::Physical",
        "FRAGMENT" => "PrizeKind::Fragment",
        other => panic!("Unknown prize kind: {other}"),
    }
}

fn gen_f64(value: f64) -> String {
    // Debug formatting always keeps a decimal point, so the literal stays f64.
    format!("{value:?}")
}

fn gen_prize(prize: &JsonPrize) -> String {
    let kind = gen_kind(&prize.kind);
    let fragment = match &prize.fragment {
        Some(group) => format!("Some(String::from({group:?}))"),
        None => "None".to_string(),
    };

    format!(
        r#"        PrizeDefinition {{
            id: String::from({id:?}),
            name: String::from({name:?}),
            kind: {kind},
            value: {value},
            weight: {weight},
            fragment_group_id: {fragment},
            is_rare: {rare},
        }}"#,
        id = prize.id,
        name = prize.name,
        value = gen_f64(prize.value),
        weight = gen_f64(prize.weight),
        rare = prize.rare,
    )
}

fn gen_fragment(fragment: &JsonFragment) -> String {
    format!(
        "        FragmentDefinition {{ group_id: String::from({:?}), reward_name: String::from({:?}) }}",
        fragment.id, fragment.reward
    )
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let prizes_path = Path::new(&manifest_dir).join("../prizes/prizes.json");

    println!("cargo:rerun-if-changed={}", prizes_path.display());

    let prizes_json = fs::read_to_string(&prizes_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", prizes_path.display()));
    let config: JsonConfig =
        serde_json::from_str(&prizes_json).expect("Failed to parse prizes.json");

    if config.prizes.is_empty() {
        panic!("prizes.json defines no prizes");
    }
    let mut seen: Vec<&str> = Vec::new();
    for prize in &config.prizes {
        if seen.contains(&prize.id.as_str()) {
            panic!("Duplicate prize id: {}", prize.id);
        }
        seen.push(&prize.id);
        if !prize.weight.is_finite() || prize.weight < 0.0 {
            panic!("Prize {} has an invalid weight", prize.id);
        }
        if prize.kind == "FRAGMENT" && prize.fragment.is_none() {
            panic!("Fragment prize {} has no fragment group", prize.id);
        }
        if prize.kind == "POINT" && (prize.value < 0.0 || prize.value.fract() != 0.0) {
            panic!("Point prize {} must award a whole number of points", prize.id);
        }
    }

    let prize_entries: Vec<String> = config.prizes.iter().map(gen_prize).collect();
    let fragment_entries: Vec<String> = config.fragments.iter().map(gen_fragment).collect();

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest = Path::new(&out_dir).join("prizes_generated.rs");

    let generated = format!(
        r#"// Auto-generated from prizes.json. DO NOT EDIT.
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use crate::types::*;

/// Points deducted by every draw.
pub const COST_PER_DRAW: Points = {cost};

/// Fragments of one group needed to complete its composite reward.
pub const FRAGMENTS_NEEDED: u32 = {needed};

/// Returns every prize defined in prizes.json, in table order.
pub fn default_prizes() -> Vec<PrizeDefinition> {{
    vec![
{prizes}
    ]
}}

/// Returns the composite reward behind each fragment group.
pub fn fragment_definitions() -> Vec<FragmentDefinition> {{
    vec![
{fragments}
    ]
}}
"#,
        cost = config.cost_per_draw,
        needed = config.fragments_needed,
        prizes = prize_entries.join(",\n"),
        fragments = fragment_entries.join(",\n"),
    );

    fs::write(&dest, generated).expect("Failed to write generated prizes file");
}
