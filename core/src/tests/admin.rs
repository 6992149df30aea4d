use super::*;
use crate::catalog::{fragment_definitions, FRAGMENTS_NEEDED};
use crate::error::{ConfigWarning, GachaError};
use crate::view::FragmentProgress;

// ==========================================
// 1. PRIZE TABLE CONFIGURATION
// ==========================================

#[test]
fn test_builtin_table_is_consistent() {
    let table = PrizeTable::builtin();

    assert!(table.warnings().is_empty(), "{:?}", table.warnings());
    assert!((table.total_weight() - 100.0).abs() < 1e-6);
    assert_eq!(table.prizes()[0].kind, PrizeKind::Empty);

    let groups = table.fragment_groups();
    let defined: Vec<String> = fragment_definitions().into_iter().map(|d| d.group_id).collect();
    for group in groups {
        assert!(defined.contains(&group), "No reward defined for {}", group);
    }
}

#[test]
fn test_weight_mismatch_is_a_warning() {
    let short = PrizeTable::new(vec![prize("a", PrizeKind::Empty, 0.0, 40.0)]).unwrap();
    assert_eq!(
        short.warnings(),
        vec![ConfigWarning::WeightSumMismatch { total: 40.0 }]
    );
    assert!((short.fallback_mass() - 60.0).abs() < 1e-9);

    let long = PrizeTable::new(vec![
        prize("a", PrizeKind::Empty, 0.0, 90.0),
        prize("b", PrizeKind::Cash, 1.0, 10.0),
        prize("c", PrizeKind::Cash, 1.0, 5.0),
    ])
    .unwrap();
    let warnings = long.warnings();
    assert!(warnings.contains(&ConfigWarning::UnreachablePrize {
        id: String::from("c")
    }));
    assert_eq!(long.report_warnings(), warnings.len());
}

#[test]
fn test_invalid_tables_are_rejected() {
    assert_eq!(PrizeTable::new(vec![]), Err(GachaError::EmptyPrizeTable));
    assert_eq!(
        PrizeTable::new(vec![
            prize("a", PrizeKind::Empty, 0.0, 50.0),
            prize("a", PrizeKind::Cash, 1.0, 50.0),
        ]),
        Err(GachaError::DuplicatePrizeId {
            id: String::from("a")
        })
    );
    assert_eq!(
        PrizeTable::new(vec![prize("a", PrizeKind::Empty, 0.0, -1.0)]),
        Err(GachaError::InvalidWeight {
            id: String::from("a")
        })
    );
    assert_eq!(
        PrizeTable::new(vec![prize("f", PrizeKind::Fragment, 0.0, 100.0)]),
        Err(GachaError::MissingFragmentGroup {
            id: String::from("f")
        })
    );
    assert_eq!(
        PrizeTable::new(vec![prize("pt", PrizeKind::Points, 2.5, 100.0)]),
        Err(GachaError::InvalidPointValue {
            id: String::from("pt")
        })
    );
    assert_eq!(
        PrizeTable::new(vec![prize("pt", PrizeKind::Points, f64::NAN, 100.0)]),
        Err(GachaError::InvalidPointValue {
            id: String::from("pt")
        })
    );
    // Face values of other kinds may carry cents
    assert!(PrizeTable::new(vec![prize("cash", PrizeKind::Cash, 2.5, 100.0)]).is_ok());
}

#[test]
fn test_odds_view_bounds() {
    let remote = MemoryRemote::new();
    let (engine, _clock) = create_engine(&remote, &[]);

    let odds = engine.odds();
    let bounds: Vec<f64> = odds.rows.iter().map(|r| r.upper_bound).collect();

    assert_eq!(bounds, vec![50.0, 80.0, 100.0]);
    assert_eq!(odds.total_weight, 100.0);
    assert_eq!(odds.fallback_mass, 0.0);
    assert!(odds.rows[2].is_rare);
}

// ==========================================
// 2. FRAGMENTS
// ==========================================

#[tokio::test]
async fn test_fragment_progress_counts_only() {
    let remote = MemoryRemote::new();
    let (engine, _clock, session) = create_logged_in(&remote, &[ROLL_FRAGMENT], "Tom", 1_000);
    let mut engine = engine.with_fragments(vec![FragmentDefinition {
        group_id: String::from("GOLD"),
        reward_name: String::from("Golden ticket"),
    }]);

    let mut session = session;
    for _ in 0..FRAGMENTS_NEEDED {
        session = engine.draw(&session).await.unwrap().session;
    }

    let progress = engine.fragment_progress(&session);
    assert_eq!(
        progress,
        vec![FragmentProgress {
            group_id: String::from("GOLD"),
            reward_name: String::from("Golden ticket"),
            count: FRAGMENTS_NEEDED,
            needed: FRAGMENTS_NEEDED,
            complete: true,
        }]
    );
    // Completion is reported, never cashed in
    assert_eq!(session.inventory.len(), FRAGMENTS_NEEDED as usize);
    assert!(session.inventory.iter().all(|item| !item.is_redeemed));
}

// ==========================================
// 3. SETTINGS, RESET AND SNAPSHOTS
// ==========================================

#[test]
fn test_branding_round_trip() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);

    assert_eq!(engine.branding(), None);
    engine.set_branding(Some("data:image/png;base64,AAAA")).unwrap();
    assert_eq!(engine.branding().as_deref(), Some("data:image/png;base64,AAAA"));
    engine.set_branding(None).unwrap();
    assert_eq!(engine.branding(), None);
}

#[tokio::test]
async fn test_reset_wipes_everything() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock, session) = create_logged_in(&remote, &[ROLL_EMPTY], "Tom", 100);
    engine.draw(&session).await.unwrap();
    engine.set_remote_id(Some("doc")).unwrap();

    engine.reset().unwrap();

    assert!(raw_state(&engine).iter().all(|(_, value)| value.is_none()));
    assert!(engine.current_session().is_none());
    assert!(engine.logs().is_empty());
    assert_eq!(engine.remote_id(), None);
}

#[tokio::test]
async fn test_snapshot_restores_shared_state() {
    let remote = MemoryRemote::new();
    let (mut engine, clock, session) = create_logged_in(&remote, &[ROLL_POINTS], "Tom", 100);
    engine.draw(&session).await.unwrap();
    let backup = engine.export_snapshot();

    clock.advance(1_000);
    engine.set_balance("Tom", 0).unwrap();
    engine.set_balance("Ann", 50).unwrap();
    engine.restore_snapshot(&backup).unwrap();

    assert_eq!(engine.balance("Tom"), 80);
    assert_eq!(engine.balance("Ann"), 0);
    assert_eq!(engine.logs().len(), 1);
}

#[test]
fn test_corrupt_snapshot_is_rejected() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock, _session) = create_logged_in(&remote, &[], "Tom", 100);
    let mut backup = engine.export_snapshot();
    backup.push(0);

    assert_eq!(engine.restore_snapshot(&backup), Err(GachaError::CorruptSnapshot));
    assert_eq!(engine.restore_snapshot(&[0xff]), Err(GachaError::CorruptSnapshot));
    assert_eq!(engine.balance("Tom"), 100);
}
