pub mod document;
pub mod snapshot;
pub mod store;

pub use document::{
    export_document, export_json, import_document, DocumentError, ExportDocument, ImportReport,
    DOCUMENT_VERSION,
};
pub use snapshot::{
    load_snapshot, restore_ledger, save_snapshot, PersistedState, CURRENCY_KEY, LEVELS_KEY,
    STRATEGY_KEY,
};
pub use store::{DirStore, MemoryStore, SnapshotStore, StoreError};
