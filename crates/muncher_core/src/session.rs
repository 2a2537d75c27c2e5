use std::collections::{BTreeMap, HashMap, HashSet};

use engine_logging::{engine_debug, engine_info};

use crate::hints::Enhancements;
use crate::ids::{DocType, IdLookup};
use crate::records::{
    FolderKind, FolderRecord, ImageFinderEntry, ImageFinderResults, JournalRecord, SceneRecord,
    TableRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    /// Record every scene image and image journal for the image finder ledger.
    pub image_find: bool,
}

/// Record collections for one conversion run.
///
/// Components receive the session by reference and only go through its typed
/// operations, so the scene de-duplication can observe every prior insertion.
#[derive(Debug, Clone)]
pub struct ConversionSession {
    book_code: String,
    options: SessionOptions,
    enhancements: Enhancements,
    ids: IdLookup,
    folders: Vec<FolderRecord>,
    master_folders: BTreeMap<FolderKind, String>,
    chapter_folders: HashMap<(FolderKind, u64), usize>,
    journals: Vec<JournalRecord>,
    scenes: Vec<SceneRecord>,
    tables: Vec<TableRecord>,
    seen_scenes: HashSet<(String, u64)>,
    image_finder: ImageFinderResults,
}

impl ConversionSession {
    pub fn new(
        book_code: impl Into<String>,
        enhancements: Enhancements,
        ids: IdLookup,
        options: SessionOptions,
    ) -> Self {
        let mut session = Self {
            book_code: book_code.into(),
            options,
            enhancements,
            ids,
            folders: Vec::new(),
            master_folders: BTreeMap::new(),
            chapter_folders: HashMap::new(),
            journals: Vec::new(),
            scenes: Vec::new(),
            tables: Vec::new(),
            seen_scenes: HashSet::new(),
            image_finder: ImageFinderResults::default(),
        };
        for kind in FolderKind::ALL {
            session.create_master_folder(kind);
        }
        engine_debug!(
            "Session {} ready: {} table hints, {} scene enhancements, {} scene adjustments",
            session.book_code,
            session.enhancements.table_hints.len(),
            session.enhancements.scene_enhancements.len(),
            session.enhancements.scene_adjustments.len()
        );
        session
    }

    fn create_master_folder(&mut self, kind: FolderKind) {
        let marker = format!("master-{}", kind.label());
        let id = self.ids.assign(DocType::Folder, 0, Some(&marker));
        self.folders.push(FolderRecord {
            id: id.clone(),
            parent_id: None,
            kind,
            name: format!("{} {}", self.book_code, kind.label()),
            is_master: true,
        });
        self.master_folders.insert(kind, id);
    }

    pub fn book_code(&self) -> &str {
        &self.book_code
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn enhancements(&self) -> &Enhancements {
        &self.enhancements
    }

    pub fn ids(&self) -> &IdLookup {
        &self.ids
    }

    pub fn assign_id(&mut self, doc_type: DocType, ddb_id: u64, content_chunk_id: Option<&str>) -> String {
        self.ids.assign(doc_type, ddb_id, content_chunk_id)
    }

    pub fn master_folder(&self, kind: FolderKind) -> &str {
        self.master_folders
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Chapter folder for `(kind, chapter_id)` under the master folder, created on first use.
    pub fn ensure_folder(&mut self, kind: FolderKind, chapter_id: u64, name: &str) -> String {
        if let Some(&idx) = self.chapter_folders.get(&(kind, chapter_id)) {
            return self.folders[idx].id.clone();
        }
        let id = self.ids.assign(DocType::Folder, chapter_id, Some(kind.label()));
        let parent_id = self.master_folder(kind).to_string();
        self.folders.push(FolderRecord {
            id: id.clone(),
            parent_id: Some(parent_id),
            kind,
            name: name.to_string(),
            is_master: false,
        });
        self.chapter_folders
            .insert((kind, chapter_id), self.folders.len() - 1);
        id
    }

    pub fn folder_for(&self, kind: FolderKind, chapter_id: u64) -> Option<&str> {
        self.chapter_folders
            .get(&(kind, chapter_id))
            .map(|&idx| self.folders[idx].id.as_str())
    }

    /// Chapter folder when one exists, otherwise the master folder.
    pub fn folder_or_master(&self, kind: FolderKind, chapter_id: Option<u64>) -> String {
        chapter_id
            .and_then(|id| self.folder_for(kind, id))
            .unwrap_or_else(|| self.master_folder(kind))
            .to_string()
    }

    pub fn folders(&self) -> &[FolderRecord] {
        &self.folders
    }

    pub fn has_text_journal(&self, ddb_id: u64) -> bool {
        self.journals
            .iter()
            .any(|journal| journal.ddb_id == ddb_id && !journal.is_image())
    }

    pub fn add_journal(&mut self, journal: JournalRecord) {
        self.journals.push(journal);
    }

    pub fn journals(&self) -> &[JournalRecord] {
        &self.journals
    }

    pub fn has_scene(&self, content_chunk_id: &str, ddb_id: u64) -> bool {
        self.seen_scenes
            .contains(&(content_chunk_id.to_string(), ddb_id))
    }

    /// Append a scene and its companion journal unless the chunk/id pair was already recorded.
    ///
    /// Returns `false` when the pair was seen before and nothing was added.
    pub fn record_scene(&mut self, scene: SceneRecord, journal: Option<JournalRecord>) -> bool {
        let key = (scene.content_chunk_id.clone(), scene.ddb_id);
        if !self.seen_scenes.insert(key) {
            engine_debug!(
                "Skipping repeated scene {} ({})",
                scene.content_chunk_id,
                scene.ddb_id
            );
            return false;
        }
        engine_info!("Scene \"{}\" ({}) recorded", scene.name, scene.content_chunk_id);
        if let Some(journal) = journal {
            self.journals.push(journal);
        }
        self.scenes.push(scene);
        true
    }

    pub fn scenes(&self) -> &[SceneRecord] {
        &self.scenes
    }

    pub fn add_table(&mut self, table: TableRecord) {
        self.tables.push(table);
    }

    pub fn tables(&self) -> &[TableRecord] {
        &self.tables
    }

    pub fn note_scene_image(&mut self, entry: ImageFinderEntry) {
        if self.options.image_find {
            self.image_finder.scenes.push(entry);
        }
    }

    pub fn note_journal_image(&mut self, entry: ImageFinderEntry) {
        if self.options.image_find {
            self.image_finder.journals.push(entry);
        }
    }

    pub fn image_finder(&self) -> &ImageFinderResults {
        &self.image_finder
    }

    /// Folder ids referenced directly by a journal, scene or table.
    pub fn referenced_folders(&self) -> HashSet<&str> {
        let journals = self.journals.iter().filter_map(|j| j.folder.as_deref());
        let scenes = self.scenes.iter().filter_map(|s| s.folder.as_deref());
        let tables = self.tables.iter().filter_map(|t| t.folder.as_deref());
        journals.chain(scenes).chain(tables).collect()
    }
}
