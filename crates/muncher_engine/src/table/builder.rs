use engine_logging::{engine_debug, engine_info};
use muncher_core::{is_dice_header, ConversionSession, DocType, TableMatchEntry, TableRecord};
use scraper::{ElementRef, Html, Selector};

use crate::dom::HtmlNode;
use crate::table::namer::TableNamer;
use crate::table::parse::parse_table;

pub const CONTENT_CHUNK_ATTR: &str = "data-content-chunk-id";

/// Receives a diagnostic entry for every table built while table-find mode is on.
pub trait TableMatchObserver {
    fn table_matched(&mut self, entry: TableMatchEntry);
}

/// Journal the tables are extracted from.
#[derive(Debug, Clone, Copy)]
pub struct TableSource<'a> {
    pub ddb_id: u64,
    pub journal_id: &'a str,
    pub journal_name: &'a str,
    pub folder: Option<&'a str>,
    /// Log the raw table markup for every detection.
    pub debug_markup: bool,
}

/// Turn one `<table>` carrying a content chunk id into a [`TableRecord`].
///
/// Returns `None` for tables without a chunk id; those cannot be keyed to hints.
pub fn build_table_record(
    session: &mut ConversionSession,
    table: ElementRef,
    source: &TableSource,
    observer: Option<&mut dyn TableMatchObserver>,
) -> Option<TableRecord> {
    let Some(content_chunk_id) = table.value().attr(CONTENT_CHUNK_ATTR) else {
        engine_debug!("Skipping table without content chunk id in {}", source.journal_name);
        return None;
    };

    let parsed = parse_table(table);
    let dice_headers: Vec<String> = parsed
        .headers
        .iter()
        .filter(|header| is_dice_header(header))
        .cloned()
        .collect();

    let name_guess = TableNamer::new(session.enhancements()).resolve(
        &HtmlNode::new(table),
        content_chunk_id,
        &parsed.headers,
        &dice_headers,
    );

    engine_info!("Table: \"{}\"", name_guess);
    engine_debug!("ContentChunkId: {}", content_chunk_id);
    engine_info!("Dice Keys: {}", dice_headers.join(", "));
    engine_info!("Keys: {}", parsed.headers.join(", "));
    if source.debug_markup {
        engine_debug!("{}", table.html());
    }

    let record = TableRecord {
        id: session.assign_id(DocType::RollTable, source.ddb_id, Some(content_chunk_id)),
        content_chunk_id: content_chunk_id.to_string(),
        name_guess,
        headers: parsed.headers,
        dice_headers,
        rows: parsed.rows,
        journal_ref: Some(source.journal_id.to_string()),
        folder: source.folder.map(str::to_string),
    };

    if let Some(observer) = observer {
        observer.table_matched(TableMatchEntry::from_record(&record, source.journal_name));
    }
    Some(record)
}

/// Build and store a record for every chunk-id table in `document`.
pub fn extract_tables(
    session: &mut ConversionSession,
    document: &Html,
    source: &TableSource,
    mut observer: Option<&mut dyn TableMatchObserver>,
) -> usize {
    let Ok(selector) = Selector::parse("table") else {
        return 0;
    };

    let mut count = 0;
    for table in document.select(&selector) {
        let observer = observer.as_mut().map(|o| &mut **o as &mut dyn TableMatchObserver);
        if let Some(record) = build_table_record(session, table, source, observer) {
            session.add_table(record);
            count += 1;
        }
    }
    count
}
