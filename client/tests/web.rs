//! Browser tests, run with `wasm-pack test --headless --firefox client`
#![cfg(target_arch = "wasm32")]

use epe_gacha_client::engine::GachaClient;
use epe_gacha_client::remote::JsClock;
use epe_gacha_client::storage::BrowserStorage;
use epe_gacha_core::clock::Clock;
use epe_gacha_core::store::{JsonStore, KeyValueStore, LedgerStore, KEY_POINTS_DB};
use epe_gacha_core::types::ImportRow;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn local_storage_round_trip() {
    let mut storage = BrowserStorage::local().unwrap();
    storage.set(KEY_POINTS_DB, r#"{"Tom":70}"#).unwrap();

    let store = JsonStore::new(storage);
    assert_eq!(store.load_ledger().get("Tom"), 70);

    let mut storage = store.into_inner();
    storage.remove(KEY_POINTS_DB).unwrap();
    assert_eq!(storage.get(KEY_POINTS_DB), None);
}

#[wasm_bindgen_test]
fn clock_reads_epoch_millis() {
    // 2020-01-01 in milliseconds
    assert!(JsClock.now_ms() > 1_577_836_800_000);
}

#[wasm_bindgen_test]
async fn reads_stay_available_during_a_draw() {
    let client = GachaClient::new(JsValue::UNDEFINED).unwrap();
    client.reset().unwrap();
    let rows = serde_wasm_bindgen::to_value(&vec![ImportRow::new("Tom", 100)]).unwrap();
    JsFuture::from(client.import_points(rows)).await.unwrap();
    client.login("Tom").unwrap();
    client.set_remote_id(Some("missing-document".into())).unwrap();

    let draw = client.draw();
    // Let the draw start and block on its pull
    JsFuture::from(js_sys::Promise::resolve(&JsValue::NULL)).await.unwrap();

    assert_eq!(client.balance("Tom").unwrap(), 100);
    assert!(!client.current_user().unwrap().is_null());
    assert!(client.logout().is_err(), "Writes wait for the draw");

    let _ = JsFuture::from(draw).await;
    client.reset().unwrap();
}
