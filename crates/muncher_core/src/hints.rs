use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableHint {
    pub content_chunk_id: String,
    pub table_name: String,
}

/// Scene hint: either an adjustment for a detected scene or a `missing` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneEnhancement {
    pub ddb_id: u64,
    pub missing: bool,
    pub name: String,
    pub adjust_name: Option<String>,
    pub slug: Option<String>,
    pub parent_id: Option<u64>,
    pub cobalt_id: Option<u64>,
    pub content_chunk_id: Option<String>,
    pub img: String,
}

impl SceneEnhancement {
    /// `adjustName` when set and non-empty, otherwise the default name.
    pub fn scene_name(&self) -> &str {
        self.adjust_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Free-form JSON patch applied to the scene with the same content chunk id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneAdjustment {
    #[serde(default)]
    pub content_chunk_id: Option<String>,
    #[serde(flatten)]
    pub patch: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiResAsset {
    pub name: String,
    pub path: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enhancements {
    pub table_hints: Vec<TableHint>,
    pub scene_enhancements: Vec<SceneEnhancement>,
    pub scene_adjustments: Vec<SceneAdjustment>,
    pub hi_res: Vec<HiResAsset>,
}

impl Enhancements {
    pub fn table_hint(&self, content_chunk_id: &str) -> Option<&TableHint> {
        self.table_hints
            .iter()
            .find(|hint| hint.content_chunk_id == content_chunk_id)
    }

    /// Enhancement for a scene detected in content; placeholder hints never match.
    pub fn detected_scene_enhancement(&self, content_chunk_id: &str) -> Option<&SceneEnhancement> {
        self.scene_enhancements.iter().find(|hint| {
            !hint.missing && hint.content_chunk_id.as_deref() == Some(content_chunk_id)
        })
    }

    pub fn missing_scenes(&self) -> impl Iterator<Item = &SceneEnhancement> {
        self.scene_enhancements.iter().filter(|hint| hint.missing)
    }

    pub fn scene_adjustment(&self, content_chunk_id: &str) -> Option<&SceneAdjustment> {
        self.scene_adjustments
            .iter()
            .find(|adj| adj.content_chunk_id.as_deref() == Some(content_chunk_id))
    }
}
