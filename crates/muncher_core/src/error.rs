use thiserror::Error;

/// Conditions that would corrupt exported data if the run carried on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("synthesized scene id {id} for \"{name}\" collides with an existing scene")]
    DuplicateSceneId { id: u64, name: String },
    #[error("folder graph contains a cycle through folder {folder_id}")]
    FolderCycle { folder_id: String },
    #[error("folder {folder_id} references unknown parent folder {parent_id}")]
    UnknownParentFolder { folder_id: String, parent_id: String },
}
