use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::object::parse_object_json;
use crate::catalog::{Catalog, CatalogError, Category};
use crate::ledger::{currency_from_f64, Ledger, LedgerError, TableQuery};
use crate::optimizer::{recommend, Strategy};
use crate::persistence::{
    export_document, import_document, restore_ledger, save_snapshot, DirStore, DocumentError,
    MemoryStore, SnapshotStore, StoreError,
};

/// One client's ledger and the store its snapshot is written to.
pub struct Session {
    pub ledger: Ledger,
    store: Box<dyn SnapshotStore>,
}

impl Session {
    fn save(&mut self) -> Result<(), ApiError> {
        save_snapshot(self.store.as_mut(), &self.ledger)?;
        Ok(())
    }
}

pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Server state: the shared catalog and one ledger per session. With a sessions directory, each
/// session persists under `<dir>/<id>/` and is restored lazily after restarts, so the oldest
/// live session can be evicted once `max_sessions` is reached. Without one, new sessions are
/// refused at the limit.
pub struct AppState {
    catalog: Catalog,
    sessions: HashMap<String, Session>,
    // Least recently touched first.
    recent: VecDeque<String>,
    sessions_dir: Option<PathBuf>,
    max_sessions: usize,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Session not found")]
    SessionNotFound,
    #[error("Session limit of {0} reached")]
    SessionLimit(usize),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to serialize response: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl AppState {
    pub fn new(catalog: Catalog, sessions_dir: Option<PathBuf>) -> Self {
        Self {
            catalog,
            sessions: HashMap::new(),
            recent: VecDeque::new(),
            sessions_dir,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Sessions live only in memory.
    pub fn in_memory(catalog: Catalog) -> Self {
        Self::new(catalog, None)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn store_for(&self, id: &str) -> Box<dyn SnapshotStore> {
        match &self.sessions_dir {
            Some(dir) => Box::new(DirStore::new(dir.join(id))),
            None => Box::new(MemoryStore::new()),
        }
    }

    fn touch(&mut self, id: &str) {
        if let Some(pos) = self.recent.iter().position(|seen| seen == id) {
            self.recent.remove(pos);
        }
        self.recent.push_back(id.to_string());
    }

    /// Make room for one more live session.
    fn reserve_slot(&mut self) -> Result<(), ApiError> {
        while self.sessions.len() >= self.max_sessions {
            if self.sessions_dir.is_none() {
                warn!(limit = self.max_sessions, "session limit reached");
                return Err(ApiError::SessionLimit(self.max_sessions));
            }
            let Some(oldest) = self.recent.pop_front() else {
                break;
            };
            self.sessions.remove(&oldest);
            debug!(session = %oldest, "session evicted from memory");
        }
        Ok(())
    }

    fn insert_session(&mut self, id: &str, session: Session) -> Result<(), ApiError> {
        self.reserve_slot()?;
        self.sessions.insert(id.to_string(), session);
        self.touch(id);
        Ok(())
    }

    pub fn create_session(&mut self) -> Result<String, ApiError> {
        self.reserve_slot()?;
        let id = Uuid::new_v4().to_string();
        let mut session = Session {
            ledger: Ledger::new(self.catalog.clone()),
            store: self.store_for(&id),
        };
        session.save()?;
        info!(session = %id, "session created");
        self.insert_session(&id, session)?;
        Ok(id)
    }

    fn restore_session(&self, id: &str) -> Option<Session> {
        let dir = self.sessions_dir.as_ref()?.join(id);
        if !dir.is_dir() {
            return None;
        }
        let store = DirStore::new(dir);
        let mut ledger = Ledger::new(self.catalog.clone());
        restore_ledger(&store, &mut ledger);
        info!(session = %id, "session restored from disk");
        Some(Session {
            ledger,
            store: Box::new(store),
        })
    }

    pub fn session_mut(&mut self, id: &str) -> Result<&mut Session, ApiError> {
        if Uuid::parse_str(id).is_err() {
            return Err(ApiError::SessionNotFound);
        }
        if self.sessions.contains_key(id) {
            self.touch(id);
        } else {
            let session = self.restore_session(id).ok_or(ApiError::SessionNotFound)?;
            self.insert_session(id, session)?;
        }
        self.sessions.get_mut(id).ok_or(ApiError::SessionNotFound)
    }

    /// Swap the catalog for new sessions and every live one. Live sessions keep their levels
    /// for names that survive; sessions still on disk pick it up when restored.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        for (id, session) in &mut self.sessions {
            session.ledger.replace_catalog(catalog.clone());
            if let Err(err) = session.save() {
                warn!(session = %id, %err, "failed to save session after catalog replacement");
            }
        }
        info!(upgrades = catalog.len(), sessions = self.sessions.len(), "catalog replaced");
        self.catalog = catalog;
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountRequest {
    pub upgrade: String,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelRequest {
    pub upgrade: String,
    pub level: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeRequest {
    pub upgrade: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyRequest {
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyRequest {
    pub strategy: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub affordable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsufficientFundsDetails {
    pub upgrade: String,
    pub required: u64,
    pub available: u64,
    pub level: u32,
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(ApiError::Parse)
}

/// Like `parse_body`, but an empty body means "all defaults".
fn parse_optional_body<T: for<'de> Deserialize<'de> + Default>(body: &str) -> Result<T, ApiError> {
    if body.trim().is_empty() {
        Ok(T::default())
    } else {
        parse_body(body)
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(ApiError::Serialize)
}

fn query_pairs(query: &str) -> impl Iterator<Item = (String, String)> + '_ {
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
}

fn flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "")
}

/// `affordable`, `hide_max`, `search` and `category` from a query string.
pub fn parse_table_query(query: &str) -> Result<TableQuery, ApiError> {
    let mut table = TableQuery::default();
    for (key, value) in query_pairs(query) {
        match key.as_str() {
            "affordable" => table.affordable_only = flag(&value),
            "hide_max" => table.hide_max_level = flag(&value),
            "search" => table.search = Some(value),
            "category" => {
                table.category = Some(
                    value
                        .parse::<Category>()
                        .map_err(|err| ApiError::Validation(err.to_string()))?,
                )
            }
            _ => {}
        }
    }
    Ok(table)
}

pub fn health_payload(state: &AppState) -> Result<String, ApiError> {
    to_payload(&serde_json::json!({
        "status": "ok",
        "service": "upgrade-ledger",
        "version": env!("CARGO_PKG_VERSION"),
        "upgrades": state.catalog().len(),
        "sessions": state.session_count(),
    }))
}

pub fn catalog_payload(state: &AppState) -> Result<String, ApiError> {
    to_payload(&serde_json::json!({ "upgrades": state.catalog().upgrades() }))
}

/// Replace the catalog from an object document body (`{ name: { baseCost, benefit, ... } }`).
pub fn replace_catalog_payload(state: &mut AppState, body: &str) -> Result<String, ApiError> {
    let catalog = parse_object_json(body).map_err(|err| {
        warn!(%err, "catalog replacement rejected");
        ApiError::from(err)
    })?;
    state.replace_catalog(catalog);
    catalog_payload(state)
}

pub fn create_session_payload(state: &mut AppState) -> Result<String, ApiError> {
    let id = state.create_session()?;
    let session = state.session_mut(&id)?;
    to_payload(&serde_json::json!({
        "id": id,
        "view": session.ledger.view(&TableQuery::default()),
    }))
}

pub fn session_view_payload(state: &mut AppState, id: &str, query: &str) -> Result<String, ApiError> {
    let table = parse_table_query(query)?;
    let session = state.session_mut(id)?;
    to_payload(&serde_json::json!({ "id": id, "view": session.ledger.view(&table) }))
}

/// Run a mutation, persist, and answer with its result plus the refreshed view. A failed save
/// puts the ledger back as it was, so the session never holds state its store does not.
fn mutate<T, F>(state: &mut AppState, id: &str, action: F) -> Result<String, ApiError>
where
    T: Serialize,
    F: FnOnce(&mut Ledger) -> Result<T, ApiError>,
{
    let session = state.session_mut(id)?;
    let before = session.ledger.clone();
    let result = action(&mut session.ledger)?;
    if let Err(err) = session.save() {
        warn!(session = %id, %err, "save failed, mutation rolled back");
        session.ledger = before;
        return Err(err);
    }
    to_payload(&serde_json::json!({
        "id": id,
        "result": result,
        "view": session.ledger.view(&TableQuery::default()),
    }))
}

pub fn buy_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    let request: CountRequest = parse_body(body)?;
    mutate(state, id, |ledger| {
        Ok(ledger.buy(&request.upgrade, request.count.unwrap_or(1))?)
    })
}

pub fn sell_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    let request: CountRequest = parse_body(body)?;
    mutate(state, id, |ledger| {
        Ok(ledger.sell(&request.upgrade, request.count.unwrap_or(1))?)
    })
}

pub fn level_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    let request: LevelRequest = parse_body(body)?;
    mutate(state, id, |ledger| Ok(ledger.set_level(&request.upgrade, request.level)?))
}

pub fn max_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    let request: UpgradeRequest = parse_body(body)?;
    mutate(state, id, |ledger| Ok(ledger.max_out(&request.upgrade)?))
}

pub fn reset_payload(state: &mut AppState, id: &str) -> Result<String, ApiError> {
    mutate(state, id, |ledger| {
        ledger.reset_levels();
        Ok(serde_json::json!({ "status": "reset" }))
    })
}

pub fn currency_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    let request: CurrencyRequest = parse_body(body)?;
    mutate(state, id, |ledger| {
        ledger.set_currency(currency_from_f64(request.amount));
        Ok(serde_json::json!({ "available": ledger.available() }))
    })
}

pub fn strategy_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    let request: StrategyRequest = parse_body(body)?;
    let strategy = request
        .strategy
        .parse::<Strategy>()
        .map_err(|err| ApiError::Validation(err.to_string()))?;
    mutate(state, id, |ledger| {
        ledger.set_strategy(strategy);
        Ok(serde_json::json!({ "strategy": strategy }))
    })
}

pub fn recommendation_payload(state: &mut AppState, id: &str, query: &str) -> Result<String, ApiError> {
    let affordable = parse_table_query(query)?.affordable_only;
    let session = state.session_mut(id)?;
    to_payload(&serde_json::json!({
        "id": id,
        "recommendation": recommend(&session.ledger, affordable),
    }))
}

pub fn buy_recommended_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    let request: RecommendationRequest = parse_optional_body(body)?;
    mutate(state, id, |ledger| Ok(ledger.buy_recommended(request.affordable)?))
}

pub fn ignore_recommended_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    let request: RecommendationRequest = parse_optional_body(body)?;
    mutate(state, id, |ledger| {
        Ok(serde_json::json!({ "ignored": ledger.ignore_recommended(request.affordable) }))
    })
}

pub fn import_payload(state: &mut AppState, id: &str, body: &str) -> Result<String, ApiError> {
    mutate(state, id, |ledger| {
        import_document(ledger, body).map_err(|err| {
            warn!(session = %id, %err, "import rejected");
            ApiError::from(err)
        })
    })
}

pub fn export_payload(state: &mut AppState, id: &str) -> Result<String, ApiError> {
    let session = state.session_mut(id)?;
    to_payload(&export_document(&session.ledger))
}
