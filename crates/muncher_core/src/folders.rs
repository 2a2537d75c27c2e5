use std::collections::{HashMap, HashSet};

use engine_logging::{engine_debug, engine_error, engine_info};

use crate::error::InvariantViolation;
use crate::records::FolderRecord;
use crate::session::ConversionSession;

/// Decides which folders carry exportable content.
///
/// A folder has content when it is a master folder, when a record is filed in it
/// directly, or when any child folder has content. Results are memoized per folder
/// id for the lifetime of the resolver.
pub struct FolderReachability<'a> {
    folders: &'a [FolderRecord],
    referenced: HashSet<&'a str>,
    children: HashMap<&'a str, Vec<usize>>,
    memo: HashMap<&'a str, bool>,
    visiting: HashSet<&'a str>,
}

impl<'a> FolderReachability<'a> {
    /// Build the resolver, rejecting dangling parents and parent cycles up front.
    pub fn new(
        folders: &'a [FolderRecord],
        referenced: HashSet<&'a str>,
    ) -> Result<Self, InvariantViolation> {
        let by_id: HashMap<&str, &FolderRecord> =
            folders.iter().map(|f| (f.id.as_str(), f)).collect();

        let mut children: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (idx, folder) in folders.iter().enumerate() {
            if let Some(parent) = folder.parent_id.as_deref() {
                if !by_id.contains_key(parent) {
                    return Err(InvariantViolation::UnknownParentFolder {
                        folder_id: folder.id.clone(),
                        parent_id: parent.to_string(),
                    });
                }
                children.entry(parent).or_default().push(idx);
            }
        }

        for folder in folders {
            ensure_parent_chain_ends(folder, &by_id)?;
        }

        Ok(Self {
            folders,
            referenced,
            children,
            memo: HashMap::with_capacity(folders.len()),
            visiting: HashSet::new(),
        })
    }

    pub fn has_content(&mut self, folder_id: &str) -> Result<bool, InvariantViolation> {
        match self.folders.iter().position(|f| f.id == folder_id) {
            Some(idx) => self.resolve(idx),
            None => Ok(false),
        }
    }

    fn resolve(&mut self, idx: usize) -> Result<bool, InvariantViolation> {
        let folders = self.folders;
        let folder = &folders[idx];
        let id = folder.id.as_str();
        if let Some(&known) = self.memo.get(id) {
            return Ok(known);
        }
        if !self.visiting.insert(id) {
            engine_error!("Folder cycle detected at {}", id);
            return Err(InvariantViolation::FolderCycle {
                folder_id: id.to_string(),
            });
        }

        let mut has_content = folder.is_master || self.referenced.contains(id);
        if !has_content {
            let children = self.children.get(id).cloned().unwrap_or_default();
            for child in children {
                if self.resolve(child)? {
                    has_content = true;
                    break;
                }
            }
        }

        self.visiting.remove(id);
        self.memo.insert(id, has_content);
        Ok(has_content)
    }

    /// Folders with content, in their original order.
    pub fn exportable(mut self) -> Result<Vec<FolderRecord>, InvariantViolation> {
        let mut kept = Vec::new();
        for idx in 0..self.folders.len() {
            if self.resolve(idx)? {
                kept.push(self.folders[idx].clone());
            } else {
                engine_debug!("Dropping empty folder {}", self.folders[idx].name);
            }
        }
        Ok(kept)
    }
}

fn ensure_parent_chain_ends<'f>(
    folder: &'f FolderRecord,
    by_id: &HashMap<&str, &'f FolderRecord>,
) -> Result<(), InvariantViolation> {
    let mut seen = HashSet::new();
    let mut current = folder;
    while let Some(parent) = current.parent_id.as_deref() {
        if !seen.insert(current.id.as_str()) {
            return Err(InvariantViolation::FolderCycle {
                folder_id: current.id.clone(),
            });
        }
        match by_id.get(parent) {
            Some(next) => current = *next,
            None => break,
        }
    }
    Ok(())
}

/// Reduced folder set for export, computed over the session's records.
pub fn exportable_folders(session: &ConversionSession) -> Result<Vec<FolderRecord>, InvariantViolation> {
    let resolver = FolderReachability::new(session.folders(), session.referenced_folders())?;
    let kept = resolver.exportable()?;
    engine_info!(
        "Exporting {} of {} folders",
        kept.len(),
        session.folders().len()
    );
    Ok(kept)
}
