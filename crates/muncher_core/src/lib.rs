//! Muncher core: domain records, hint data and the pure finishing passes.
mod dice;
mod error;
mod folders;
mod hints;
mod ids;
mod missing;
mod records;
mod session;

pub use dice::{is_dice_header, normalize_dashes};
pub use error::InvariantViolation;
pub use folders::{exportable_folders, FolderReachability};
pub use hints::{Enhancements, HiResAsset, SceneAdjustment, SceneEnhancement, TableHint};
pub use ids::{DocType, IdLookup, IdLookupEntry};
pub use missing::{missing_scene_id, synthesize_missing_scenes, MISSING_SCENE_BASE_ID};
pub use records::{
    ContentUnit, FolderKind, FolderRecord, ImageFinderEntry, ImageFinderResults, JournalContent,
    JournalRecord, SceneRecord, TableMatchEntry, TableRecord,
};
pub use session::{ConversionSession, SessionOptions};
