//! Gacha engine for browser WASM builds
//!
//! Wraps the core engine over `localStorage` and `fetch`. Operations that
//! touch the network return Promises; everything else is synchronous.
//!
//! A draw, import or sync keeps the engine borrowed until its requests
//! settle, which can take two request timeouts. Reads go through a second
//! engine over the same `localStorage` that never talks to the network, so
//! the UI can keep rendering balances and logs meanwhile. Writes made while
//! an operation is in flight are rejected with "Engine is busy".

use alloc::rc::Rc;
use core::cell::RefCell;
use core::future::Future;

use epe_gacha_core::engine::GachaEngine;
use epe_gacha_core::ledger::LEADERBOARD_SIZE;
use epe_gacha_core::rng::XorShiftRng;
use epe_gacha_core::store::JsonStore;
use epe_gacha_core::sync::{HttpRemote, NoRemote, SyncConfig, SyncReport};
use epe_gacha_core::types::ImportRow;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::remote::{FetchTransport, JsClock};
use crate::storage::BrowserStorage;

type BrowserEngine =
    GachaEngine<JsonStore<BrowserStorage>, HttpRemote<FetchTransport, JsClock>, XorShiftRng, JsClock>;

/// Same storage, no remote; only its `&self` methods are called
type ReadEngine = GachaEngine<JsonStore<BrowserStorage>, NoRemote, XorShiftRng, JsClock>;

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&format!("{:?}", e)))
}

fn error<E: core::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn random_seed() -> u64 {
    let mut bytes = [0u8; 8];
    if let Err(e) = getrandom::getrandom(&mut bytes) {
        log::warn!("getrandom failed, seeding from the clock: {}", e);
        return js_sys::Date::now() as u64;
    }
    u64::from_le_bytes(bytes)
}

/// The gacha engine exposed to WASM
#[wasm_bindgen]
pub struct GachaClient {
    engine: Rc<RefCell<BrowserEngine>>,
    reader: Rc<ReadEngine>,
}

impl GachaClient {
    /// Run an async engine operation as a Promise. A second call while one is
    /// in flight is rejected instead of interleaving writes.
    fn spawn<F, Fut>(&self, op: F) -> js_sys::Promise
    where
        F: FnOnce(Rc<RefCell<BrowserEngine>>) -> Fut + 'static,
        Fut: Future<Output = Result<JsValue, JsValue>> + 'static,
    {
        future_to_promise(op(Rc::clone(&self.engine)))
    }

    fn with_engine<T>(&self, f: impl FnOnce(&mut BrowserEngine) -> Result<T, JsValue>) -> Result<T, JsValue> {
        let mut engine = self.engine.try_borrow_mut().map_err(|_| busy())?;
        f(&mut engine)
    }

    fn read<T>(&self, f: impl FnOnce(&ReadEngine) -> Result<T, JsValue>) -> Result<T, JsValue> {
        f(&self.reader)
    }
}

fn busy() -> JsValue {
    JsValue::from_str("Engine is busy")
}

#[wasm_bindgen]
impl GachaClient {
    /// Create the engine. `config` is an optional `SyncConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<GachaClient, JsValue> {
        let config: SyncConfig = if config.is_undefined() || config.is_null() {
            SyncConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {:?}", e)))?
        };
        let storage = BrowserStorage::local().map_err(error)?;
        let version = config.client_version.clone();

        let engine = GachaEngine::new(
            JsonStore::new(storage),
            HttpRemote::new(config, FetchTransport, JsClock),
            XorShiftRng::seed_from_u64(random_seed()),
            JsClock,
        )
        .with_client_version(&version);
        let reader = GachaEngine::new(
            JsonStore::new(BrowserStorage::local().map_err(error)?),
            NoRemote,
            XorShiftRng::seed_from_u64(1),
            JsClock,
        );

        Ok(Self {
            engine: Rc::new(RefCell::new(engine)),
            reader: Rc::new(reader),
        })
    }

    // ==========================================
    // SESSION
    // ==========================================

    #[wasm_bindgen]
    pub fn login(&self, name: &str) -> Result<JsValue, JsValue> {
        self.with_engine(|engine| to_js(&engine.login(name).map_err(error)?))
    }

    #[wasm_bindgen]
    pub fn logout(&self) -> Result<(), JsValue> {
        self.with_engine(|engine| engine.logout().map_err(error))
    }

    /// Active session or null
    #[wasm_bindgen]
    pub fn current_user(&self) -> Result<JsValue, JsValue> {
        self.read(|engine| to_js(&engine.current_session()))
    }

    #[wasm_bindgen]
    pub fn fragment_progress(&self) -> Result<JsValue, JsValue> {
        self.read(|engine| match engine.current_session() {
            Some(session) => to_js(&engine.fragment_progress(&session)),
            None => Ok(JsValue::NULL),
        })
    }

    // ==========================================
    // DRAW
    // ==========================================

    /// Draw for the logged-in user. Resolves to a `DrawOutcome`, rejects
    /// with a status message.
    #[wasm_bindgen]
    pub fn draw(&self) -> js_sys::Promise {
        self.spawn(|shared| async move {
            let mut engine = shared.try_borrow_mut().map_err(|_| busy())?;
            let outcome = engine.draw_current().await.map_err(error)?;
            to_js(&outcome)
        })
    }

    #[wasm_bindgen]
    pub fn cost_per_draw(&self) -> Result<i64, JsValue> {
        self.read(|engine| Ok(engine.cost_per_draw()))
    }

    #[wasm_bindgen]
    pub fn prize_table(&self) -> Result<JsValue, JsValue> {
        self.read(|engine| to_js(&engine.table().prizes()))
    }

    #[wasm_bindgen]
    pub fn odds(&self) -> Result<JsValue, JsValue> {
        self.read(|engine| to_js(&engine.odds()))
    }

    // ==========================================
    // LEDGER
    // ==========================================

    #[wasm_bindgen]
    pub fn balance(&self, name: &str) -> Result<i64, JsValue> {
        self.read(|engine| Ok(engine.balance(name)))
    }

    /// Bulk import from parsed spreadsheet rows `[{name, points}]`
    #[wasm_bindgen]
    pub fn import_points(&self, rows: JsValue) -> js_sys::Promise {
        self.spawn(|shared| async move {
            let rows: Vec<ImportRow> = serde_wasm_bindgen::from_value(rows)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse rows: {:?}", e)))?;
            let mut engine = shared.try_borrow_mut().map_err(|_| busy())?;
            let outcome = engine.import_points(&rows).await.map_err(error)?;
            to_js(&outcome)
        })
    }

    #[wasm_bindgen]
    pub fn leaderboard(&self, limit: Option<usize>) -> Result<JsValue, JsValue> {
        self.read(|engine| to_js(&engine.leaderboard(limit.unwrap_or(LEADERBOARD_SIZE))))
    }

    // ==========================================
    // LOG
    // ==========================================

    #[wasm_bindgen]
    pub fn logs(&self) -> Result<JsValue, JsValue> {
        self.read(|engine| to_js(&engine.logs()))
    }

    #[wasm_bindgen]
    pub fn mark_redeemed(&self, log_id: String) -> js_sys::Promise {
        self.spawn(|shared| async move {
            let mut engine = shared.try_borrow_mut().map_err(|_| busy())?;
            let outcome = engine.mark_redeemed(&log_id).await.map_err(error)?;
            to_js(&outcome)
        })
    }

    // ==========================================
    // SYNC
    // ==========================================

    #[wasm_bindgen]
    pub fn remote_id(&self) -> Result<Option<String>, JsValue> {
        self.read(|engine| Ok(engine.remote_id()))
    }

    #[wasm_bindgen]
    pub fn set_remote_id(&self, id: Option<String>) -> Result<(), JsValue> {
        self.with_engine(|engine| engine.set_remote_id(id.as_deref()).map_err(error))
    }

    #[wasm_bindgen]
    pub fn pull(&self) -> js_sys::Promise {
        self.spawn(|shared| async move {
            let mut engine = shared.try_borrow_mut().map_err(|_| busy())?;
            engine.pull().await.map_err(error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen]
    pub fn push(&self) -> js_sys::Promise {
        self.spawn(|shared| async move {
            let engine = shared.try_borrow().map_err(|_| busy())?;
            engine.push().await.map_err(error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves to the new document id. Rejects when the provider hides the
    /// id from scripts; the admin then creates the document by hand.
    #[wasm_bindgen]
    pub fn create_remote_document(&self) -> js_sys::Promise {
        self.spawn(|shared| async move {
            let mut engine = shared.try_borrow_mut().map_err(|_| busy())?;
            let id = engine.create_remote_document().await.map_err(error)?;
            Ok(JsValue::from_str(&id))
        })
    }

    /// Periodic refresh. Resolves to `{report, session}` and never rejects.
    /// A tick that lands while another operation holds the engine skips the
    /// pull and reports the stored session.
    #[wasm_bindgen]
    pub fn refresh(&self) -> js_sys::Promise {
        #[derive(Serialize)]
        struct Refresh {
            report: SyncReport,
            session: Option<epe_gacha_core::types::Session>,
        }

        let reader = Rc::clone(&self.reader);
        self.spawn(|shared| async move {
            let (report, session) = match shared.try_borrow_mut() {
                Ok(mut engine) => engine.refresh().await,
                Err(_) => (
                    SyncReport {
                        success: false,
                        message: String::from("Engine is busy"),
                        error: None,
                    },
                    reader.current_session(),
                ),
            };
            to_js(&Refresh { report, session })
        })
    }

    // ==========================================
    // ADMIN
    // ==========================================

    #[wasm_bindgen]
    pub fn branding(&self) -> Result<Option<String>, JsValue> {
        self.read(|engine| Ok(engine.branding()))
    }

    #[wasm_bindgen]
    pub fn set_branding(&self, asset: Option<String>) -> Result<(), JsValue> {
        self.with_engine(|engine| engine.set_branding(asset.as_deref()).map_err(error))
    }

    #[wasm_bindgen]
    pub fn reset(&self) -> Result<(), JsValue> {
        self.with_engine(|engine| engine.reset().map_err(error))
    }

    /// SCALE-encoded backup of ledger and log
    #[wasm_bindgen]
    pub fn export_snapshot(&self) -> Result<Vec<u8>, JsValue> {
        self.read(|engine| Ok(engine.export_snapshot()))
    }

    #[wasm_bindgen]
    pub fn restore_snapshot(&self, bytes: &[u8]) -> Result<(), JsValue> {
        self.with_engine(|engine| engine.restore_snapshot(bytes).map_err(error))
    }
}
