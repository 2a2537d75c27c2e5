use std::collections::BTreeSet;

use engine_logging::engine_info;
use muncher_core::{IdLookup, IdLookupEntry, ImageFinderResults, TableMatchEntry};

use crate::assets::normalize_asset_path;
use crate::persist::{KeyedJsonStore, PersistError};
use crate::table::TableMatchObserver;

pub const LOOKUPS_FILE: &str = "lookups.json";
pub const DOWNLOADS_FILE: &str = "downloads.json";
pub const HI_RES_FILE: &str = "hires.json";
pub const TABLE_DATA_FILE: &str = "table-data.json";
pub const SCENE_IMAGES_FILE: &str = "scene-images.json";
pub const JOURNAL_IMAGES_FILE: &str = "journal-images.json";

/// Logical asset paths already materialized on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadLedger {
    paths: BTreeSet<String>,
}

impl DownloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(store: &KeyedJsonStore, book_code: &str) -> Self {
        let paths: Vec<String> = store.load_section(book_code);
        paths.into_iter().collect()
    }

    pub fn save(&self, store: &KeyedJsonStore, book_code: &str) -> Result<(), PersistError> {
        let paths: Vec<&String> = self.paths.iter().collect();
        store.save_section(book_code, &paths)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(&normalize_asset_path(path))
    }

    pub fn insert(&mut self, path: &str) -> bool {
        self.paths.insert(normalize_asset_path(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for DownloadLedger {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for path in iter {
            ledger.insert(path.as_ref());
        }
        ledger
    }
}

/// Collects table-find diagnostics for offline hint curation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMatchLedger {
    entries: Vec<TableMatchEntry>,
}

impl TableMatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TableMatchEntry] {
        &self.entries
    }

    pub fn save(&self, store: &KeyedJsonStore, book_code: &str) -> Result<(), PersistError> {
        engine_info!("Saving {} table matches to {:?}", self.entries.len(), store.path());
        store.save_section(book_code, &self.entries)
    }
}

impl TableMatchObserver for TableMatchLedger {
    fn table_matched(&mut self, entry: TableMatchEntry) {
        self.entries.push(entry);
    }
}

pub fn load_id_lookup(store: &KeyedJsonStore, book_code: &str) -> IdLookup {
    let entries: Vec<IdLookupEntry> = store.load_section(book_code);
    IdLookup::from_entries(entries)
}

pub fn save_id_lookup(
    store: &KeyedJsonStore,
    book_code: &str,
    ids: &IdLookup,
) -> Result<(), PersistError> {
    store.save_section(book_code, ids.entries())
}

pub fn save_image_finder_results(
    scene_store: &KeyedJsonStore,
    journal_store: &KeyedJsonStore,
    book_code: &str,
    results: &ImageFinderResults,
) -> Result<(), PersistError> {
    scene_store.save_section(book_code, &results.scenes)?;
    journal_store.save_section(book_code, &results.journals)
}
