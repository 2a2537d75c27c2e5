use engine_logging::{engine_debug, engine_error, engine_info};
use muncher_core::{
    exportable_folders, synthesize_missing_scenes, ContentUnit, ConversionSession, DocType,
    FolderKind, FolderRecord, IdLookup, ImageFinderResults, InvariantViolation, JournalContent,
    JournalRecord, SceneRecord, TableMatchEntry, TableRecord,
};
use scraper::{Html, Selector};

use crate::config::MuncherConfig;
use crate::dom::collapse_whitespace;
use crate::error::EngineError;
use crate::ledger::{
    save_id_lookup, save_image_finder_results, TableMatchLedger, JOURNAL_IMAGES_FILE,
    LOOKUPS_FILE, SCENE_IMAGES_FILE, TABLE_DATA_FILE,
};
use crate::persist::PersistError;
use crate::scene::SceneDetector;
use crate::table::{extract_tables, TableMatchObserver, TableSource};

/// What one call to [`UnitProcessor::process_unit`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitSummary {
    /// The unit already had a text journal and was left alone.
    pub skipped: bool,
    pub journal_id: Option<String>,
    pub tables: usize,
    pub scenes: usize,
}

/// Records handed to the output sink once every unit has been processed.
#[derive(Debug, Clone, PartialEq)]
pub struct AdventureOutput {
    pub journals: Vec<JournalRecord>,
    pub scenes: Vec<SceneRecord>,
    pub tables: Vec<TableRecord>,
    /// Only folders that hold content, directly or through a subfolder.
    pub folders: Vec<FolderRecord>,
    pub ids: IdLookup,
    pub image_finder: ImageFinderResults,
    pub table_matches: Vec<TableMatchEntry>,
}

/// Runs the extraction passes over content units, one at a time, in document order.
pub struct UnitProcessor {
    session: ConversionSession,
    table_matches: Option<TableMatchLedger>,
    table_debug: bool,
}

impl UnitProcessor {
    pub fn new(session: ConversionSession, config: &MuncherConfig) -> Self {
        Self::with_flags(session, config.table_find, config.table_debug)
    }

    pub fn with_flags(session: ConversionSession, table_find: bool, table_debug: bool) -> Self {
        Self {
            session,
            table_matches: table_find.then(TableMatchLedger::new),
            table_debug,
        }
    }

    pub fn session(&self) -> &ConversionSession {
        &self.session
    }

    pub fn table_matches(&self) -> Option<&TableMatchLedger> {
        self.table_matches.as_ref()
    }

    pub fn process_unit(&mut self, unit: &ContentUnit) -> UnitSummary {
        if self.session.has_text_journal(unit.id) {
            engine_debug!("Unit {} already has a journal, skipping", unit.id);
            return UnitSummary {
                skipped: true,
                ..UnitSummary::default()
            };
        }

        let document = Html::parse_fragment(&unit.html);
        let mut unit = unit.clone();
        if unit.trimmed_title().is_none() {
            unit.title = fragment_title(&document);
        }
        let title = unit
            .trimmed_title()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Chapter {}", unit.id));
        engine_info!("Processing \"{}\" ({})", title, unit.content_chunk_id);

        if unit.parent_id.is_none() {
            for kind in FolderKind::ALL {
                self.session.ensure_folder(kind, unit.id, &title);
            }
        }

        let chapter = Some(unit.chapter_id());
        let journal_id = self.session.assign_id(
            DocType::JournalEntry,
            unit.id,
            Some(&unit.content_chunk_id),
        );
        let journal_folder = self.session.folder_or_master(FolderKind::Journal, chapter);
        self.session.add_journal(JournalRecord {
            id: journal_id.clone(),
            ddb_id: unit.id,
            content_chunk_id: Some(unit.content_chunk_id.clone()),
            name: title.clone(),
            folder: Some(journal_folder),
            content: JournalContent::Html(unit.html.clone()),
        });

        let table_folder = self.session.folder_or_master(FolderKind::Table, chapter);
        let source = TableSource {
            ddb_id: unit.id,
            journal_id: &journal_id,
            journal_name: &title,
            folder: Some(&table_folder),
            debug_markup: self.table_debug,
        };
        let observer = self
            .table_matches
            .as_mut()
            .map(|ledger| ledger as &mut dyn TableMatchObserver);
        let tables = extract_tables(&mut self.session, &document, &source, observer);
        let scenes = SceneDetector::detect(&mut self.session, &unit, &document);

        UnitSummary {
            skipped: false,
            journal_id: Some(journal_id),
            tables,
            scenes,
        }
    }

    /// Synthesize missing scenes and resolve the folders worth exporting.
    pub fn finish(&mut self) -> Result<AdventureOutput, InvariantViolation> {
        let added = synthesize_missing_scenes(&mut self.session)?;
        engine_debug!("Added {} missing scenes", added);
        let folders = exportable_folders(&self.session)?;

        Ok(AdventureOutput {
            journals: self.session.journals().to_vec(),
            scenes: self.session.scenes().to_vec(),
            tables: self.session.tables().to_vec(),
            folders,
            ids: self.session.ids().clone(),
            image_finder: self.session.image_finder().clone(),
            table_matches: self
                .table_matches
                .as_ref()
                .map(|ledger| ledger.entries().to_vec())
                .unwrap_or_default(),
        })
    }

    /// Persist id lookups, and the diagnostic ledgers whose modes are on.
    pub fn save_metrics(&self, config: &MuncherConfig) -> Result<(), PersistError> {
        let book_code = self.session.book_code();
        save_id_lookup(&config.ledger(LOOKUPS_FILE), book_code, self.session.ids())?;
        if let Some(ledger) = &self.table_matches {
            ledger.save(&config.ledger(TABLE_DATA_FILE), book_code)?;
        }
        if config.image_find {
            save_image_finder_results(
                &config.ledger(SCENE_IMAGES_FILE),
                &config.ledger(JOURNAL_IMAGES_FILE),
                book_code,
                self.session.image_finder(),
            )?;
        }
        Ok(())
    }

    /// [`finish`](Self::finish) then [`save_metrics`](Self::save_metrics); the metrics are
    /// written even when finishing fails, and the finishing error takes precedence.
    pub fn complete(mut self, config: &MuncherConfig) -> Result<AdventureOutput, EngineError> {
        let output = self.finish();
        if let Err(err) = &output {
            engine_error!("Finishing {} failed: {}", self.session.book_code(), err);
        }
        match (output, self.save_metrics(config)) {
            (Ok(output), Ok(())) => Ok(output),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(violation), Ok(())) => Err(violation.into()),
            (Err(violation), Err(err)) => {
                engine_error!("Saving metrics for {} failed: {}", self.session.book_code(), err);
                Err(violation.into())
            }
        }
    }
}

fn fragment_title(document: &Html) -> Option<String> {
    let headings = Selector::parse("h1, h2, h3, h4, h5, h6").ok()?;
    let title = document
        .select(&headings)
        .next()
        .map(|heading| collapse_whitespace(heading.text()))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| collapse_whitespace(document.root_element().text()));
    Some(title).filter(|text| !text.is_empty())
}
