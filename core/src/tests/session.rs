use super::*;
use crate::error::GachaError;
use crate::store::SessionStore;

#[test]
fn test_login_seeds_from_ledger() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);
    engine.set_balance("Ann", 240).unwrap();

    let session = engine.login("  Ann  ").unwrap();

    assert_eq!(session.name, "Ann");
    assert_eq!(session.points, 240);
    assert!(session.inventory.is_empty());
    assert_eq!(engine.current_session(), Some(session));
}

#[test]
fn test_unknown_user_starts_at_zero() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);

    assert_eq!(engine.login("Newcomer").unwrap().points, 0);
}

#[test]
fn test_blank_login_is_rejected() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock) = create_engine(&remote, &[]);

    assert_eq!(engine.login("   "), Err(GachaError::EmptyName));
    assert!(engine.current_session().is_none());
}

#[tokio::test]
async fn test_relogin_resumes_inventory() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock, session) = create_logged_in(&remote, &[ROLL_FRAGMENT], "Tom", 100);
    engine.draw(&session).await.unwrap();

    let resumed = engine.login("Tom").unwrap();
    assert_eq!(resumed.inventory.len(), 1);
    assert_eq!(resumed.points, 70);

    let other = engine.login("Ann").unwrap();
    assert!(other.inventory.is_empty(), "Switching users starts fresh");
}

#[tokio::test]
async fn test_logout_keeps_balance() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock, session) = create_logged_in(&remote, &[ROLL_EMPTY], "Tom", 100);
    engine.draw(&session).await.unwrap();

    engine.logout().unwrap();

    assert!(engine.store().load_session().is_none());
    assert_eq!(engine.balance("Tom"), 70);
    assert_eq!(engine.login("Tom").unwrap().points, 70);
}

#[test]
fn test_current_session_follows_ledger() {
    let remote = MemoryRemote::new();
    let (mut engine, _clock, _session) = create_logged_in(&remote, &[], "Tom", 100);

    engine.set_balance("Tom", 15).unwrap();

    assert_eq!(engine.current_session().unwrap().points, 15);
}
