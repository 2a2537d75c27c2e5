use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info, engine_warn};
use muncher_core::{Enhancements, HiResAsset, SceneAdjustment, SceneEnhancement, TableHint};
use serde::de::DeserializeOwned;

/// Hint files for all adventures, laid out per adventure code:
///
/// - `tables/<code>.json`: table name hints
/// - `enhancements/<code>.json`: scene enhancements, including missing scenes
/// - `scenes/<code>/*.json`: scene adjustment patches
/// - `hires/<code>.json`: high resolution replacement assets
#[derive(Debug, Clone)]
pub struct HintStore {
    root: PathBuf,
}

impl HintStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Every hint set for `book_code`; absent or unreadable files contribute nothing.
    pub fn load(&self, book_code: &str) -> Enhancements {
        let file = format!("{book_code}.json");
        let enhancements = Enhancements {
            table_hints: load_list::<TableHint>(&self.root.join("tables").join(&file)),
            scene_enhancements: load_list::<SceneEnhancement>(
                &self.root.join("enhancements").join(&file),
            ),
            scene_adjustments: self.load_scene_adjustments(book_code),
            hi_res: load_list::<HiResAsset>(&self.root.join("hires").join(&file)),
        };
        engine_info!(
            "Loaded hints for {}: {} tables, {} scene enhancements, {} adjustments, {} hi-res",
            book_code,
            enhancements.table_hints.len(),
            enhancements.scene_enhancements.len(),
            enhancements.scene_adjustments.len(),
            enhancements.hi_res.len()
        );
        enhancements
    }

    fn load_scene_adjustments(&self, book_code: &str) -> Vec<SceneAdjustment> {
        let dir = self.root.join("scenes").join(book_code);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                engine_debug!("No scene adjustments at {:?}: {}", dir, err);
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        files.sort();

        files
            .iter()
            .flat_map(|path| {
                engine_info!("Loading {:?}", path);
                load_list::<SceneAdjustment>(path)
            })
            .collect()
    }
}

fn load_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            engine_warn!("Failed to read hints {:?}: {}", path, err);
            return Vec::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(list) => list,
        Err(err) => {
            engine_warn!("Failed to parse hints {:?}: {}", path, err);
            Vec::new()
        }
    }
}
