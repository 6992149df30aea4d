//! Draw and ledger engine
//!
//! Ties the prize table, the local repositories and the remote document
//! together. Every operation that changes shared state commits locally first
//! and only then tries the remote; a failed sync is reported next to the
//! result and never undoes the local write.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::catalog::{fragment_definitions, COST_PER_DRAW};
use crate::clock::Clock;
use crate::error::{GachaError, GachaResult, SyncResult};
use crate::ledger::{normalize_name, ImportReport, LeaderboardEntry};
use crate::prizes::PrizeTable;
use crate::records::Redemption;
use crate::rng::DrawRng;
use crate::snapshot::Snapshot;
use crate::store::LocalStore;
use crate::sync::{self, RemoteStore, SyncReport, CLIENT_VERSION};
use crate::types::*;
use crate::view::{FragmentProgress, OddsView};

/// Result of a successful draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawOutcome {
    pub prize: PrizeDefinition,
    pub session: Session,
    pub entry: DrawLogEntry,
    /// Refresh attempted before spending, when a remote is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull: Option<SyncReport>,
    /// Replication attempted after the commit, when a remote is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<SyncReport>,
}

/// Result of a bulk import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub report: ImportReport,
    /// Active session after its balance was refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<SyncReport>,
}

/// Result of an admin redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemOutcome {
    pub logs: Vec<DrawLogEntry>,
    /// When the entry counts as redeemed; None for an unknown id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<SyncReport>,
}

/// The draw/ledger engine over injected storage, remote, randomness and time
pub struct GachaEngine<S, R, G, C> {
    store: S,
    remote: R,
    rng: G,
    clock: C,
    table: PrizeTable,
    fragments: Vec<FragmentDefinition>,
    client_version: String,
}

impl<S: LocalStore, R: RemoteStore, G: DrawRng, C: Clock> GachaEngine<S, R, G, C> {
    /// Create an engine over the built-in prize table
    pub fn new(store: S, remote: R, rng: G, clock: C) -> Self {
        let engine = Self {
            store,
            remote,
            rng,
            clock,
            table: PrizeTable::builtin(),
            fragments: fragment_definitions(),
            client_version: String::from(CLIENT_VERSION),
        };
        engine.table.report_warnings();
        log::info!(
            "gacha engine ready: {} prizes, {} points per draw",
            engine.table.len(),
            COST_PER_DRAW
        );
        engine
    }

    /// Swap in another prize table
    pub fn with_table(mut self, table: PrizeTable) -> Self {
        table.report_warnings();
        self.table = table;
        self
    }

    pub fn with_fragments(mut self, fragments: Vec<FragmentDefinition>) -> Self {
        self.fragments = fragments;
        self
    }

    /// Version tag written into pushed documents
    pub fn with_client_version(mut self, version: &str) -> Self {
        self.client_version = String::from(version);
        self
    }

    pub fn table(&self) -> &PrizeTable {
        &self.table
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn cost_per_draw(&self) -> Points {
        COST_PER_DRAW
    }

    // ==========================================
    // SESSION
    // ==========================================

    /// Start a session for a name, seeded from the ledger. Logging in again
    /// under the active name resumes the existing session.
    pub fn login(&mut self, name: &str) -> GachaResult<Session> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(GachaError::EmptyName);
        }

        let points = self.store.load_ledger().get(name);
        let session = match self.store.load_session() {
            Some(mut existing) if existing.name == name => {
                existing.points = points;
                existing
            }
            _ => Session::new(name, points),
        };
        self.store.save_session(&session)?;
        log::info!("{} logged in with {} points", session.name, session.points);
        Ok(session)
    }

    /// End the session. The ledger keeps the balance.
    pub fn logout(&mut self) -> GachaResult<()> {
        if let Some(session) = self.store.load_session() {
            log::info!("{} logged out", session.name);
        }
        self.store.clear_session()?;
        Ok(())
    }

    /// The active session with its balance taken from the ledger
    pub fn current_session(&self) -> Option<Session> {
        let mut session = self.store.load_session()?;
        if let Some(points) = self.store.load_ledger().balance(&session.name) {
            session.points = points;
        }
        Some(session)
    }

    pub fn fragment_progress(&self, session: &Session) -> Vec<FragmentProgress> {
        FragmentProgress::for_session(session, &self.fragments)
    }

    // ==========================================
    // LEDGER
    // ==========================================

    pub fn balance(&self, name: &str) -> Points {
        self.store.load_ledger().get(name)
    }

    /// Overwrite one balance
    pub fn set_balance(&mut self, name: &str, points: Points) -> GachaResult<()> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(GachaError::EmptyName);
        }
        let mut ledger = self.store.load_ledger();
        ledger.set(name, points);
        self.store.save_ledger(&ledger)?;
        Ok(())
    }

    /// Overwrite balances from import rows, refresh the active session and
    /// push the result
    pub async fn import_points(&mut self, rows: &[ImportRow]) -> GachaResult<ImportOutcome> {
        let mut ledger = self.store.load_ledger();
        let report = ledger.import_rows(rows);
        self.store.save_ledger(&ledger)?;

        for skipped in &report.skipped {
            log::warn!("skipped import row {}: {:?}", skipped.row, skipped.issue);
        }
        log::info!(
            "imported {} balances, skipped {} rows",
            report.imported,
            report.skipped.len()
        );

        let session = match self.store.load_session() {
            Some(mut session) => {
                if let Some(points) = ledger.balance(&session.name) {
                    session.points = points;
                    self.store.save_session(&session)?;
                }
                Some(session)
            }
            None => None,
        };

        let push = self.push_if_configured().await;
        Ok(ImportOutcome {
            report,
            session,
            push,
        })
    }

    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.store.load_ledger().leaderboard(limit)
    }

    // ==========================================
    // DRAW
    // ==========================================

    /// Spend one draw's cost and roll a prize for the session.
    ///
    /// 1. Reject outright when the session cannot pay
    /// 2. Best-effort pull so a balance spent on another device is seen
    /// 3. Re-check against the freshest balance
    /// 4. Roll the table
    /// 5. Apply cost, point prizes, inventory and fragments to a copy
    /// 6. Commit session, ledger and log together
    /// 7. Best-effort push
    pub async fn draw(&mut self, session: &Session) -> GachaResult<DrawOutcome> {
        let cost = COST_PER_DRAW;
        if session.points < cost {
            log::info!("draw rejected for {}: {} points", session.name, session.points);
            return Err(GachaError::InsufficientFunds {
                have: session.points,
                need: cost,
            });
        }

        let pull = if self.sync_configured() {
            let result = sync::pull(&mut self.store, &self.remote).await;
            if let Err(e) = &result {
                log::warn!("pull before draw failed, using local balance: {}", e);
            }
            Some(SyncReport::from_result(&result, "Synced from cloud"))
        } else {
            None
        };

        let mut ledger = self.store.load_ledger();
        let fresh = ledger.balance(&session.name).unwrap_or(session.points);
        if fresh < cost {
            log::info!("draw rejected for {} after refresh: {} points", session.name, fresh);
            return Err(GachaError::InsufficientFunds {
                have: fresh,
                need: cost,
            });
        }

        let prize = self.table.draw(&mut self.rng).clone();
        let now = self.clock.now_ms();

        let mut updated = session.clone();
        updated.points = fresh - cost + prize.points_award();
        if prize.kind.is_collectible() {
            updated.inventory.push(InventoryItem {
                prize_id: prize.id.clone(),
                prize_name: prize.name.clone(),
                obtained_at: now,
                is_redeemed: false,
                redeemed_at: None,
            });
        }
        if prize.kind == PrizeKind::Fragment {
            if let Some(group) = &prize.fragment_group_id {
                *updated.fragments.entry(group.clone()).or_insert(0) += 1;
            }
        }

        ledger.set(&updated.name, updated.points);
        let mut logs = self.store.load_logs();
        let entry = DrawLogEntry {
            id: logs.next_id(now),
            user_name: updated.name.clone(),
            prize_name: prize.name.clone(),
            prize_type: prize.kind,
            timestamp: now,
            redeemed_at: None,
        };
        logs.append(entry.clone());
        self.store.commit_draw(&updated, &ledger, &logs)?;

        log::info!(
            "{} drew {} ({:?}), balance {} -> {}",
            updated.name,
            prize.id,
            prize.kind,
            fresh,
            updated.points
        );

        let push = self.push_if_configured().await;
        Ok(DrawOutcome {
            prize,
            session: updated,
            entry,
            pull,
            push,
        })
    }

    /// Draw for the logged-in user
    pub async fn draw_current(&mut self) -> GachaResult<DrawOutcome> {
        let session = self.current_session().ok_or(GachaError::NoActiveSession)?;
        self.draw(&session).await
    }

    // ==========================================
    // LOG
    // ==========================================

    /// Every draw, newest first
    pub fn logs(&self) -> Vec<DrawLogEntry> {
        self.store.load_logs().list()
    }

    /// Mark a log entry as handed over. Re-marking keeps the first time and
    /// writes nothing.
    pub async fn mark_redeemed(&mut self, log_id: &str) -> GachaResult<RedeemOutcome> {
        let mut logs = self.store.load_logs();
        let redemption = logs.mark_redeemed(log_id, self.clock.now_ms());

        let (redeemed_at, push) = match redemption {
            Redemption::Redeemed(at) => {
                self.store.save_logs(&logs)?;
                log::info!("log {} redeemed", log_id);
                (Some(at), self.push_if_configured().await)
            }
            Redemption::AlreadyRedeemed(at) => (Some(at), None),
            Redemption::NotFound => {
                log::warn!("redeem requested for unknown log {}", log_id);
                (None, None)
            }
        };

        Ok(RedeemOutcome {
            logs: logs.list(),
            redeemed_at,
            push,
        })
    }

    // ==========================================
    // SYNC
    // ==========================================

    pub fn remote_id(&self) -> Option<String> {
        self.store.remote_id()
    }

    pub fn set_remote_id(&mut self, id: Option<&str>) -> GachaResult<()> {
        self.store.set_remote_id(id)?;
        Ok(())
    }

    fn sync_configured(&self) -> bool {
        self.store.remote_id().is_some()
    }

    /// Replace local ledger and log with the remote document
    pub async fn pull(&mut self) -> SyncResult<()> {
        sync::pull(&mut self.store, &self.remote).await
    }

    /// Replace the remote document with local ledger and log
    pub async fn push(&self) -> SyncResult<()> {
        sync::push(
            &self.store,
            &self.remote,
            self.clock.now_ms(),
            &self.client_version,
        )
        .await
    }

    /// Provision a new remote document and start syncing with it
    pub async fn create_remote_document(&mut self) -> SyncResult<String> {
        let now = self.clock.now_ms();
        sync::create_remote_document(&mut self.store, &self.remote, now).await
    }

    /// Pull, then hand back the reconciled session. Used by the periodic
    /// refresh while the app is idle.
    pub async fn refresh(&mut self) -> (SyncReport, Option<Session>) {
        let result = self.pull().await;
        (
            SyncReport::from_result(&result, "Synced from cloud"),
            self.current_session(),
        )
    }

    async fn push_if_configured(&self) -> Option<SyncReport> {
        if !self.sync_configured() {
            return None;
        }
        let result = self.push().await;
        if let Err(e) = &result {
            log::warn!("push failed, local state kept: {}", e);
        }
        Some(SyncReport::from_result(&result, "Uploaded to cloud"))
    }

    // ==========================================
    // ADMIN
    // ==========================================

    pub fn odds(&self) -> OddsView {
        OddsView::from_table(&self.table)
    }

    pub fn branding(&self) -> Option<String> {
        self.store.branding()
    }

    pub fn set_branding(&mut self, asset: Option<&str>) -> GachaResult<()> {
        self.store.set_branding(asset)?;
        Ok(())
    }

    /// Wipe every local key: balances, log, session and settings
    pub fn reset(&mut self) -> GachaResult<()> {
        self.store.reset()?;
        log::warn!("local state reset");
        Ok(())
    }

    pub fn export_snapshot(&self) -> Vec<u8> {
        Snapshot {
            ledger: self.store.load_ledger(),
            logs: self.store.load_logs(),
            exported_at: self.clock.now_ms(),
        }
        .to_bytes()
    }

    /// Replace ledger and log with a previously exported snapshot
    pub fn restore_snapshot(&mut self, bytes: &[u8]) -> GachaResult<()> {
        let snapshot = Snapshot::from_bytes(bytes)?;
        self.store
            .replace_shared(Some(&snapshot.ledger), Some(&snapshot.logs))?;
        log::info!(
            "restored snapshot from {}: {} balances, {} log entries",
            snapshot.exported_at,
            snapshot.ledger.len(),
            snapshot.logs.len()
        );
        Ok(())
    }
}
