use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One HTML fragment handed over by the content source, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUnit {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    pub html: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub cobalt_id: Option<u64>,
    #[serde(default)]
    pub slug: Option<String>,
    pub content_chunk_id: String,
}

impl ContentUnit {
    /// Ddb id of the chapter this unit is filed under.
    pub fn chapter_id(&self) -> u64 {
        self.parent_id.unwrap_or(self.id)
    }

    /// Title with surrounding whitespace removed, `None` when blank.
    pub fn trimmed_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    Journal,
    Scene,
    Table,
}

impl FolderKind {
    pub const ALL: [FolderKind; 3] = [FolderKind::Journal, FolderKind::Scene, FolderKind::Table];

    pub fn label(self) -> &'static str {
        match self {
            FolderKind::Journal => "JournalEntry",
            FolderKind::Scene => "Scene",
            FolderKind::Table => "RollTable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: FolderKind,
    pub name: String,
    pub is_master: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum JournalContent {
    Html(String),
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalRecord {
    pub id: String,
    pub ddb_id: u64,
    pub content_chunk_id: Option<String>,
    pub name: String,
    pub folder: Option<String>,
    pub content: JournalContent,
}

impl JournalRecord {
    pub fn is_image(&self) -> bool {
        matches!(self.content, JournalContent::Image(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneRecord {
    /// Document id assigned through the id lookups.
    pub id: String,
    /// Source ddb id; synthetic for placeholder scenes.
    pub ddb_id: u64,
    pub content_chunk_id: String,
    pub parent_id: Option<u64>,
    pub cobalt_id: Option<u64>,
    pub name: String,
    pub image: String,
    pub folder: Option<String>,
    pub missing: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub id: String,
    pub content_chunk_id: String,
    pub name_guess: String,
    pub headers: Vec<String>,
    pub dice_headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub journal_ref: Option<String>,
    pub folder: Option<String>,
}

/// Diagnostic line recorded in table-find mode for curating table hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMatchEntry {
    pub name_guess: String,
    pub length: usize,
    pub keys: Vec<String>,
    pub dice_keys: Vec<String>,
    pub dice_table: bool,
    pub multi_dice_keys: bool,
    pub dice_keys_number: usize,
    pub total_keys: usize,
    pub journal: String,
    pub content_chunk_id: String,
}

impl TableMatchEntry {
    pub fn from_record(record: &TableRecord, journal: &str) -> Self {
        Self {
            name_guess: record.name_guess.clone(),
            length: record.rows.len(),
            keys: record.headers.clone(),
            dice_keys: record.dice_headers.clone(),
            dice_table: !record.dice_headers.is_empty(),
            multi_dice_keys: record.dice_headers.len() > 1,
            dice_keys_number: record.dice_headers.len(),
            total_keys: record.headers.len(),
            journal: journal.to_string(),
            content_chunk_id: record.content_chunk_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFinderEntry {
    pub name: String,
    pub ddb_id: u64,
    pub content_chunk_id: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageFinderResults {
    pub scenes: Vec<ImageFinderEntry>,
    pub journals: Vec<ImageFinderEntry>,
}
