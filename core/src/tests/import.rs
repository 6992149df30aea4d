use super::*;
use crate::error::ImportIssue;
use crate::ledger::LEADERBOARD_SIZE;

fn text_row(name: &str, points: &str) -> ImportRow {
    ImportRow {
        name: Some(String::from(name)),
        points: Some(PointsCell::Text(String::from(points))),
    }
}

#[tokio::test]
async fn test_import_last_row_wins() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);

    let outcome = engine
        .import_points(&[ImportRow::new("A", 10), ImportRow::new("A", 20)])
        .await
        .unwrap();

    assert_eq!(outcome.report.imported, 2);
    assert_eq!(engine.balance("A"), 20, "Import overwrites, never adds");
}

#[tokio::test]
async fn test_import_overwrites_existing_balance() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);
    engine.set_balance("A", 500).unwrap();

    engine.import_points(&[ImportRow::new("A", 5)]).await.unwrap();

    assert_eq!(engine.balance("A"), 5);
}

#[tokio::test]
async fn test_bad_rows_are_skipped_individually() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);

    let rows = [
        text_row("  Ann ", "120"),
        text_row("", "50"),
        text_row("Bob", "lots"),
        ImportRow {
            name: Some(String::from("Cid")),
            points: None,
        },
        text_row("Dee", "-5"),
        ImportRow {
            name: Some(String::from("Eve")),
            points: Some(PointsCell::Number(42.9)),
        },
    ];
    let outcome = engine.import_points(&rows).await.unwrap();

    assert_eq!(outcome.report.imported, 2);
    let issues: Vec<(usize, ImportIssue)> = outcome
        .report
        .skipped
        .iter()
        .map(|s| (s.row, s.issue.clone()))
        .collect();
    assert_eq!(
        issues,
        vec![
            (1, ImportIssue::EmptyName),
            (2, ImportIssue::MalformedPoints),
            (3, ImportIssue::MalformedPoints),
            (4, ImportIssue::MalformedPoints),
        ]
    );
    assert_eq!(engine.balance("Ann"), 120, "Names are trimmed");
    assert_eq!(engine.balance("Eve"), 42, "Fractions truncate");
    assert_eq!(engine.balance("Bob"), 0);
}

#[tokio::test]
async fn test_import_refreshes_logged_in_user() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock, _session) = create_logged_in(&remote, &[], "Tom", 10);

    let outcome = engine.import_points(&[ImportRow::new("Tom", 300)]).await.unwrap();

    assert_eq!(outcome.session.unwrap().points, 300);
    assert_eq!(engine.current_session().unwrap().points, 300);
}

#[tokio::test]
async fn test_import_pushes_when_connected() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);
    connect(&mut engine, &remote, "doc");

    let outcome = engine.import_points(&[ImportRow::new("Ann", 75)]).await.unwrap();

    assert!(outcome.push.unwrap().success);
    let document = remote.document("doc").unwrap();
    assert_eq!(document.points_db.unwrap().get("Ann"), Some(&75));
    assert_eq!(document.client_version.as_deref(), Some("3.1"));
}

#[test]
fn test_import_row_accepts_spreadsheet_json() {
    let rows: Vec<ImportRow> =
        serde_json::from_str(r#"[{"name":"Ann","points":10},{"name":"Bob","points":"20"},{"points":5}]"#)
            .unwrap();

    assert_eq!(rows[0].points, Some(PointsCell::Number(10.0)));
    assert_eq!(rows[1].points, Some(PointsCell::Text(String::from("20"))));
    assert_eq!(rows[2].name, None);
}

#[tokio::test]
async fn test_leaderboard_orders_by_points_then_name() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);
    let rows: Vec<ImportRow> = (0..12)
        .map(|i| ImportRow::new(&alloc::format!("user{:02}", i), (i % 4) * 100))
        .collect();
    engine.import_points(&rows).await.unwrap();

    let board = engine.leaderboard(LEADERBOARD_SIZE);

    assert_eq!(board.len(), LEADERBOARD_SIZE);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[0].name, "user03");
    assert_eq!(board[0].points, 300);
    assert_eq!(board[1].name, "user07");
    assert_eq!(board[2].name, "user11");
    assert!(board.windows(2).all(|w| w[0].points >= w[1].points));
}
