//! Remote sync: replicate `{ledger, logs}` through one remote JSON document
//!
//! Consistency is last writer wins with whole-document replacement. A pull
//! overwrites the local ledger and log with whatever the document holds; a
//! push overwrites the document with local state. There is no version check
//! and no merge, so two devices sharing one document can lose each other's
//! updates or both spend the same balance. Local state is always the durable
//! record and a failed sync never rolls it back.
//!
//! Providers differ only in URLs and the write verb, so one `HttpRemote`
//! covers all of them and the provider is picked by configuration.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{SyncError, SyncResult};
use crate::ledger::{deserialize_optional_balances, PointsLedger};
use crate::records::DrawRecords;
use crate::store::LocalStore;
use crate::types::{DrawLogEntry, Points, Timestamp};

/// Default request timeout
pub const DEFAULT_TIMEOUT_MS: u32 = 8_000;

/// Version tag written into pushed documents
pub const CLIENT_VERSION: &str = "3.1";

const README: &str = "EPE App Sync Data - Do not delete";

/// The remote document, as stored by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDocument {
    #[serde(
        rename = "pointsDB",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_balances"
    )]
    pub points_db: Option<BTreeMap<String, Points>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<DrawLogEntry>>,
    #[serde(default)]
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
}

impl SyncDocument {
    /// Snapshot of local state for a push
    pub fn from_local(
        ledger: &PointsLedger,
        logs: &DrawRecords,
        now: Timestamp,
        client_version: &str,
    ) -> Self {
        Self {
            points_db: Some(ledger.iter().map(|(k, v)| (k.clone(), *v)).collect()),
            logs: Some(logs.list()),
            updated_at: now,
            client_version: Some(String::from(client_version)),
            readme: None,
        }
    }

    /// Empty document for provisioning
    pub fn seed(now: Timestamp) -> Self {
        Self {
            points_db: Some(BTreeMap::new()),
            logs: Some(Vec::new()),
            updated_at: now,
            client_version: None,
            readme: Some(String::from(README)),
        }
    }

    pub fn ledger(&self) -> Option<PointsLedger> {
        self.points_db
            .as_ref()
            .map(|db| db.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    pub fn records(&self) -> Option<DrawRecords> {
        self.logs.as_ref().map(|logs| DrawRecords::from(logs.clone()))
    }

    /// Parse a response body; anything but a JSON object is malformed
    pub fn parse(body: &str) -> SyncResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|_| SyncError::Malformed)?;
        if !value.is_object() {
            return Err(SyncError::Malformed);
        }
        serde_json::from_value(value).map_err(|_| SyncError::Malformed)
    }

    pub fn to_json(&self) -> String {
        // Maps of strings and integers always serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Which anonymous JSON store hosts the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteProvider {
    /// jsonblob.com: anonymous PUT updates, POST creates
    #[default]
    JsonBlob,
    /// npoint.io: POST updates, documents created on the website only
    Npoint,
}

impl RemoteProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            RemoteProvider::JsonBlob => "https://jsonblob.com/api/jsonBlob",
            RemoteProvider::Npoint => "https://api.npoint.io",
        }
    }

    pub fn write_method(&self) -> HttpMethod {
        match self {
            RemoteProvider::JsonBlob => HttpMethod::Put,
            RemoteProvider::Npoint => HttpMethod::Post,
        }
    }

    pub fn can_create(&self) -> bool {
        matches!(self, RemoteProvider::JsonBlob)
    }
}

/// Remote sync settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub provider: RemoteProvider,
    /// Replaces the provider's default collection URL
    pub base_url: Option<String>,
    pub timeout_ms: u32,
    pub client_version: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            provider: RemoteProvider::default(),
            base_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            client_version: String::from(CLIENT_VERSION),
        }
    }
}

impl SyncConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    pub fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url(), id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: Option<String>,
    pub timeout_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// `Location` header, when the provider sends one
    pub location: Option<String>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one request over the wire. Errors mean the request never got an
/// HTTP answer (offline, DNS, CORS, timeout).
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// Whole-document access to the remote store
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn fetch(&self, id: &str) -> SyncResult<SyncDocument>;
    async fn replace(&self, id: &str, document: &SyncDocument) -> SyncResult<()>;
    /// Provision a new document and return its id
    async fn create(&self, document: &SyncDocument) -> SyncResult<String>;
}

impl<R: RemoteStore + ?Sized> RemoteStore for &R {
    async fn fetch(&self, id: &str) -> SyncResult<SyncDocument> {
        (**self).fetch(id).await
    }

    async fn replace(&self, id: &str, document: &SyncDocument) -> SyncResult<()> {
        (**self).replace(id, document).await
    }

    async fn create(&self, document: &SyncDocument) -> SyncResult<String> {
        (**self).create(document).await
    }
}

const JSON_HEADERS: [(&str, &str); 2] = [
    ("Content-Type", "application/json"),
    ("Accept", "application/json"),
];

// Provider GETs are cacheable; a stale read would undo a newer push.
const NO_CACHE_HEADERS: [(&str, &str); 4] = [
    ("Accept", "application/json"),
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// `RemoteStore` over plain HTTP for any configured provider
#[derive(Debug, Clone)]
pub struct HttpRemote<T, C> {
    config: SyncConfig,
    transport: T,
    clock: C,
}

impl<T: HttpTransport, C: Clock> HttpRemote<T, C> {
    pub fn new(config: SyncConfig, transport: T, clock: C) -> Self {
        Self {
            config,
            transport,
            clock,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        log::debug!("sync {} {}", request.method.as_str(), request.url);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|reason| SyncError::Unreachable { reason })?;
        if response.is_success() {
            return Ok(response);
        }
        match response.status {
            404 => Err(SyncError::NotFound),
            status => Err(SyncError::Rejected { status }),
        }
    }
}

impl<T: HttpTransport, C: Clock> RemoteStore for HttpRemote<T, C> {
    async fn fetch(&self, id: &str) -> SyncResult<SyncDocument> {
        let url = format!(
            "{}?t={}",
            self.config.document_url(id),
            self.clock.now_ms()
        );
        let response = self
            .send(HttpRequest {
                method: HttpMethod::Get,
                url,
                headers: NO_CACHE_HEADERS.to_vec(),
                body: None,
                timeout_ms: self.config.timeout_ms,
            })
            .await?;
        SyncDocument::parse(&response.body)
    }

    async fn replace(&self, id: &str, document: &SyncDocument) -> SyncResult<()> {
        self.send(HttpRequest {
            method: self.config.provider.write_method(),
            url: self.config.document_url(id),
            headers: JSON_HEADERS.to_vec(),
            body: Some(document.to_json()),
            timeout_ms: self.config.timeout_ms,
        })
        .await?;
        Ok(())
    }

    async fn create(&self, document: &SyncDocument) -> SyncResult<String> {
        if !self.config.provider.can_create() {
            return Err(SyncError::Unsupported);
        }
        let response = self
            .send(HttpRequest {
                method: HttpMethod::Post,
                url: String::from(self.config.base_url()),
                headers: JSON_HEADERS.to_vec(),
                body: Some(document.to_json()),
                timeout_ms: self.config.timeout_ms,
            })
            .await?;

        // The new document's URL comes back in Location; browsers may hide
        // the header from cross-origin scripts.
        response
            .location
            .as_deref()
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .ok_or(SyncError::Malformed)
    }
}

/// Remote store that lives in memory, for tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryRemote {
    documents: RefCell<BTreeMap<String, String>>,
    next_id: RefCell<u32>,
    offline: RefCell<bool>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the network were down
    pub fn set_offline(&self, offline: bool) {
        *self.offline.borrow_mut() = offline;
    }

    /// Store a raw body under an id
    pub fn insert_raw(&self, id: &str, body: &str) {
        self.documents
            .borrow_mut()
            .insert(String::from(id), String::from(body));
    }

    pub fn raw(&self, id: &str) -> Option<String> {
        self.documents.borrow().get(id).cloned()
    }

    pub fn document(&self, id: &str) -> Option<SyncDocument> {
        self.raw(id).and_then(|body| SyncDocument::parse(&body).ok())
    }

    fn check_online(&self) -> SyncResult<()> {
        if *self.offline.borrow() {
            return Err(SyncError::Unreachable {
                reason: String::from("offline"),
            });
        }
        Ok(())
    }
}

impl RemoteStore for MemoryRemote {
    async fn fetch(&self, id: &str) -> SyncResult<SyncDocument> {
        self.check_online()?;
        let body = self.raw(id).ok_or(SyncError::NotFound)?;
        SyncDocument::parse(&body)
    }

    async fn replace(&self, id: &str, document: &SyncDocument) -> SyncResult<()> {
        self.check_online()?;
        if self.raw(id).is_none() {
            return Err(SyncError::NotFound);
        }
        self.insert_raw(id, &document.to_json());
        Ok(())
    }

    async fn create(&self, document: &SyncDocument) -> SyncResult<String> {
        self.check_online()?;
        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            format!("mem-{}", *next)
        };
        self.insert_raw(&id, &document.to_json());
        Ok(id)
    }
}

/// Remote that is never reachable; for installs without cloud sync
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl RemoteStore for NoRemote {
    async fn fetch(&self, _id: &str) -> SyncResult<SyncDocument> {
        Err(SyncError::NotConfigured)
    }

    async fn replace(&self, _id: &str, _document: &SyncDocument) -> SyncResult<()> {
        Err(SyncError::NotConfigured)
    }

    async fn create(&self, _document: &SyncDocument) -> SyncResult<String> {
        Err(SyncError::Unsupported)
    }
}

/// Outcome of one sync step, ready for a status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
}

impl SyncReport {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: String::from(message),
            error: None,
        }
    }

    pub fn failed(error: SyncError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error: Some(error),
        }
    }

    pub fn from_result<T>(result: &SyncResult<T>, message: &str) -> Self {
        match result {
            Ok(_) => Self::ok(message),
            Err(e) => Self::failed(e.clone()),
        }
    }
}

/// Fetch the remote document and overwrite local ledger and log with it.
/// Fields missing from the document leave their local counterpart alone.
pub async fn pull<S: LocalStore, R: RemoteStore>(store: &mut S, remote: &R) -> SyncResult<()> {
    let id = store.remote_id().ok_or(SyncError::NotConfigured)?;
    let document = remote.fetch(&id).await?;

    let ledger = document.ledger();
    let logs = document.records();
    store
        .replace_shared(ledger.as_ref(), logs.as_ref())
        .map_err(|e| SyncError::LocalStorage {
            reason: e.to_string(),
        })?;

    log::info!(
        "pulled {} balances and {} log entries from {}",
        ledger.as_ref().map(PointsLedger::len).unwrap_or(0),
        logs.as_ref().map(DrawRecords::len).unwrap_or(0),
        id
    );
    Ok(())
}

/// Overwrite the remote document with local ledger and log
pub async fn push<S: LocalStore, R: RemoteStore>(
    store: &S,
    remote: &R,
    now: Timestamp,
    client_version: &str,
) -> SyncResult<()> {
    let id = store.remote_id().ok_or(SyncError::NotConfigured)?;
    let document = SyncDocument::from_local(
        &store.load_ledger(),
        &store.load_logs(),
        now,
        client_version,
    );
    remote.replace(&id, &document).await?;
    log::info!("pushed local state to {}", id);
    Ok(())
}

/// Provision an empty document and remember its id locally
pub async fn create_remote_document<S: LocalStore, R: RemoteStore>(
    store: &mut S,
    remote: &R,
    now: Timestamp,
) -> SyncResult<String> {
    let id = remote.create(&SyncDocument::seed(now)).await?;
    store
        .set_remote_id(Some(&id))
        .map_err(|e| SyncError::LocalStorage {
            reason: e.to_string(),
        })?;
    log::info!("created remote document {}", id);
    Ok(id)
}
