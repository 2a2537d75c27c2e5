use std::collections::HashSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const ID_LENGTH: usize = 16;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    Folder,
    JournalEntry,
    Scene,
    RollTable,
}

/// Persisted assignment of one document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdLookupEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub ddb_id: u64,
    #[serde(default)]
    pub content_chunk_id: Option<String>,
}

/// Stable document ids across runs, keyed by document type, ddb id and chunk id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdLookup {
    entries: Vec<IdLookupEntry>,
    used: HashSet<String>,
}

impl IdLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<IdLookupEntry>) -> Self {
        let used = entries.iter().map(|entry| entry.id.clone()).collect();
        Self { entries, used }
    }

    pub fn entries(&self) -> &[IdLookupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, doc_type: DocType, ddb_id: u64, content_chunk_id: Option<&str>) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| {
                entry.doc_type == doc_type
                    && entry.ddb_id == ddb_id
                    && entry.content_chunk_id.as_deref() == content_chunk_id
            })
            .map(|entry| entry.id.as_str())
    }

    /// Existing id for the key, or a freshly derived one that is recorded for later runs.
    pub fn assign(&mut self, doc_type: DocType, ddb_id: u64, content_chunk_id: Option<&str>) -> String {
        if let Some(id) = self.find(doc_type, ddb_id, content_chunk_id) {
            return id.to_string();
        }

        let mut salt = 0u32;
        let id = loop {
            let candidate = derive_id(doc_type, ddb_id, content_chunk_id, salt);
            if !self.used.contains(&candidate) {
                break candidate;
            }
            salt += 1;
        };

        self.used.insert(id.clone());
        self.entries.push(IdLookupEntry {
            id: id.clone(),
            doc_type,
            ddb_id,
            content_chunk_id: content_chunk_id.map(str::to_string),
        });
        id
    }
}

fn derive_id(doc_type: DocType, ddb_id: u64, content_chunk_id: Option<&str>, salt: u32) -> String {
    let mut key = String::new();
    let _ = write!(
        &mut key,
        "{doc_type:?}:{ddb_id}:{}:{salt}",
        content_chunk_id.unwrap_or("")
    );
    let digest = Sha256::digest(key.as_bytes());
    digest
        .iter()
        .take(ID_LENGTH)
        .map(|byte| ID_ALPHABET[*byte as usize % ID_ALPHABET.len()] as char)
        .collect()
}
