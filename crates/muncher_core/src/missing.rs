use std::collections::HashSet;

use engine_logging::{engine_error, engine_info};

use crate::error::InvariantViolation;
use crate::hints::SceneEnhancement;
use crate::ids::DocType;
use crate::records::{FolderKind, ImageFinderEntry, JournalContent, JournalRecord, SceneRecord};
use crate::session::ConversionSession;

pub const MISSING_SCENE_BASE_ID: u64 = 90_000;

/// Synthetic ddb id for the `index`-th missing scene hint.
pub fn missing_scene_id(ddb_id: u64, index: usize) -> u64 {
    MISSING_SCENE_BASE_ID + ddb_id + index as u64
}

/// Generate placeholder scene and image journal pairs for every `missing` scene hint.
///
/// Ids are checked against each other and against detected scenes before anything
/// is appended, so a collision leaves the session untouched. Placeholders that are
/// already present are skipped.
pub fn synthesize_missing_scenes(session: &mut ConversionSession) -> Result<usize, InvariantViolation> {
    let hints: Vec<SceneEnhancement> = session.enhancements().missing_scenes().cloned().collect();
    if hints.is_empty() {
        engine_info!("No missing scenes to process.");
        return Ok(0);
    }
    engine_info!("Generating {} missing scenes", hints.len());

    let existing: HashSet<u64> = session
        .scenes()
        .iter()
        .filter(|scene| !scene.missing)
        .map(|scene| scene.ddb_id)
        .collect();
    let mut assigned = HashSet::with_capacity(hints.len());
    let mut planned = Vec::with_capacity(hints.len());
    for (index, hint) in hints.iter().enumerate() {
        let id = missing_scene_id(hint.ddb_id, index);
        if existing.contains(&id) || !assigned.insert(id) {
            engine_error!("Missing scene id {} for \"{}\" is already taken", id, hint.name);
            return Err(InvariantViolation::DuplicateSceneId {
                id,
                name: hint.name.clone(),
            });
        }
        planned.push((id, hint));
    }

    let mut created = 0;
    for (id, hint) in planned {
        let content_chunk_id = format!("ddb-missing-{}-{}", session.book_code(), id);
        engine_info!("Attempting {} with {}", hint.name, content_chunk_id);

        let journal = JournalRecord {
            id: session.assign_id(DocType::JournalEntry, id, Some(&content_chunk_id)),
            ddb_id: id,
            content_chunk_id: Some(content_chunk_id.clone()),
            name: hint.name.clone(),
            folder: Some(session.folder_or_master(FolderKind::Journal, hint.parent_id)),
            content: JournalContent::Image(hint.img.clone()),
        };
        let scene = SceneRecord {
            id: session.assign_id(DocType::Scene, id, Some(&content_chunk_id)),
            ddb_id: id,
            content_chunk_id: content_chunk_id.clone(),
            parent_id: hint.parent_id,
            cobalt_id: hint.cobalt_id,
            name: hint.scene_name().to_string(),
            image: hint.img.clone(),
            folder: Some(session.folder_or_master(FolderKind::Scene, hint.parent_id)),
            missing: true,
            extra: session
                .enhancements()
                .scene_adjustment(&content_chunk_id)
                .map(|adj| adj.patch.clone())
                .unwrap_or_default(),
        };

        let finder_entry = ImageFinderEntry {
            name: scene.name.clone(),
            ddb_id: id,
            content_chunk_id,
            image: hint.img.clone(),
        };
        if session.record_scene(scene, Some(journal)) {
            session.note_scene_image(finder_entry);
            created += 1;
        }
    }
    Ok(created)
}
