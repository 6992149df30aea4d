extern crate alloc;

pub mod engine;
pub mod remote;
pub mod storage;

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    #[cfg(feature = "browser_log")]
    let _ = console_log::init_with_level(log::Level::Debug);
}

/// Version tag the app writes into synced documents
#[wasm_bindgen]
pub fn client_version() -> String {
    epe_gacha_core::sync::CLIENT_VERSION.into()
}
