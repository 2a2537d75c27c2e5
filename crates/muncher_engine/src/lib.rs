//! Muncher engine: HTML extraction passes, persisted ledgers and asset reconciliation.
mod assets;
mod config;
mod dom;
mod error;
mod fetch;
mod hints;
mod ledger;
mod persist;
mod processor;
mod scene;
mod table;
mod types;

pub use assets::{
    normalize_asset_path, AssetDescriptor, AssetManifest, AssetReconciler, ReconcileReport,
};
pub use config::{ConfigError, MuncherConfig};
pub use dom::{HtmlNode, TreeNode, MAX_ASCENT_DEPTH};
pub use error::EngineError;
pub use fetch::{AssetFetcher, FetchSettings, ReqwestFetcher};
pub use hints::HintStore;
pub use ledger::{
    load_id_lookup, save_id_lookup, save_image_finder_results, DownloadLedger,
    TableMatchLedger, DOWNLOADS_FILE, HI_RES_FILE, JOURNAL_IMAGES_FILE, LOOKUPS_FILE,
    SCENE_IMAGES_FILE, TABLE_DATA_FILE,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, KeyedJsonStore, PersistError};
pub use processor::{AdventureOutput, UnitProcessor, UnitSummary};
pub use scene::SceneDetector;
pub use table::{
    build_table_record, extract_tables, guess_name_from_siblings, parse_table, ParsedTable,
    TableMatchObserver, TableNamer, TableSource,
};
pub use types::{FailureKind, FetchError};
