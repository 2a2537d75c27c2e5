use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use muncher_core::HiResAsset;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::fetch::AssetFetcher;
use crate::ledger::DownloadLedger;
use crate::persist::{ensure_output_dir, PersistError};
use crate::{FailureKind, FetchError};

/// Relative asset path with leading separators removed.
pub fn normalize_asset_path(path: &str) -> String {
    path.trim().trim_start_matches(['/', '\\']).to_string()
}

/// True when `path` is relative and stays below the directory it is joined to.
fn stays_under_root(path: &str) -> bool {
    let mut components = Path::new(path).components().peekable();
    components.peek().is_some()
        && components.all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// One remote file and every local path it must end up at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub logical_path: String,
    pub remote_url: String,
    /// Local destinations; the logical path is the primary one even when absent here.
    pub local_paths: Vec<String>,
}

impl AssetDescriptor {
    pub fn new(logical_path: impl Into<String>, remote_url: impl Into<String>) -> Self {
        Self {
            logical_path: logical_path.into(),
            remote_url: remote_url.into(),
            local_paths: Vec::new(),
        }
    }

    pub fn with_local_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.local_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn primary_path(&self) -> String {
        normalize_asset_path(&self.logical_path)
    }

    /// Local paths other than the primary one, normalized and without repeats.
    pub fn aliases(&self) -> Vec<String> {
        let primary = self.primary_path();
        let mut aliases: Vec<String> = Vec::new();
        for path in self.local_paths.iter().map(|p| normalize_asset_path(p)) {
            if path != primary && !path.is_empty() && !aliases.contains(&path) {
                aliases.push(path);
            }
        }
        aliases
    }

    /// The primary path or alias that would land outside the asset root, if any.
    fn escaping_path(&self) -> Option<String> {
        std::iter::once(self.primary_path())
            .chain(self.aliases())
            .find(|path| !stays_under_root(path))
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    files: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "RemoteUrl")]
    remote_url: String,
    #[serde(rename = "LocalUrl", default)]
    local_urls: Vec<String>,
}

/// The mobile asset manifest (`files.txt`) listing remote images and their local paths.
pub struct AssetManifest;

impl AssetManifest {
    /// Descriptors in manifest order; a missing or malformed manifest yields none.
    pub fn load(path: &Path) -> Vec<AssetDescriptor> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                engine_warn!("Failed to read asset manifest {:?}: {}", path, err);
                return Vec::new();
            }
        };
        Self::parse(&content).unwrap_or_else(|err| {
            engine_warn!("Failed to parse asset manifest {:?}: {}", path, err);
            Vec::new()
        })
    }

    pub fn parse(content: &str) -> Result<Vec<AssetDescriptor>, serde_json::Error> {
        let manifest: ManifestFile = serde_json::from_str(content)?;
        Ok(manifest
            .files
            .into_iter()
            .filter_map(|entry| {
                let primary = entry.local_urls.first()?.clone();
                Some(AssetDescriptor::new(primary, entry.remote_url).with_local_paths(entry.local_urls))
            })
            .collect())
    }

    /// High resolution replacements; their paths are relative to the `assets/` root.
    pub fn from_hi_res(assets: &[HiResAsset]) -> Vec<AssetDescriptor> {
        assets
            .iter()
            .map(|asset| {
                let path = normalize_asset_path(&asset.path);
                let path = path.strip_prefix("assets/").unwrap_or(&path).to_string();
                AssetDescriptor::new(path, asset.url.clone())
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Primary paths downloaded in this run.
    pub fetched: Vec<String>,
    /// Alias paths produced by copying a fetched file.
    pub copied: Vec<String>,
    pub already_present: usize,
    pub failed: Vec<(String, FetchError)>,
    /// The whole batch was skipped by configuration.
    pub skipped_batch: bool,
    /// Cancellation stopped the batch before every descriptor was visited.
    pub cancelled: bool,
}

/// Fetches the assets a ledger does not know about yet.
///
/// Fetches run one at a time, so no two target the same destination and the ledger
/// only changes after a write has completed.
pub struct AssetReconciler {
    fetcher: Arc<dyn AssetFetcher>,
    root: PathBuf,
    timeout: Duration,
    cancel: CancellationToken,
}

impl AssetReconciler {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            fetcher,
            root: root.into(),
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Download every descriptor missing from `ledger`, then copy it to its aliases.
    ///
    /// A failed fetch is logged and left out of the ledger so the next run retries it.
    /// Descriptors with a local path outside the asset root are rejected without a fetch.
    /// Only a destination directory that cannot be created aborts the batch.
    pub async fn reconcile(
        &self,
        descriptors: &[AssetDescriptor],
        ledger: &mut DownloadLedger,
    ) -> Result<ReconcileReport, PersistError> {
        let mut report = ReconcileReport::default();

        for descriptor in descriptors {
            if self.cancel.is_cancelled() {
                engine_warn!("Asset downloads cancelled, {} fetched so far", report.fetched.len());
                report.cancelled = true;
                break;
            }

            let primary = descriptor.primary_path();
            if let Some(escaping) = descriptor.escaping_path() {
                engine_warn!(
                    "Rejecting {}: local path {:?} leaves the asset root",
                    descriptor.remote_url,
                    escaping
                );
                let err = FetchError::new(
                    FailureKind::UnsafePath,
                    format!("{escaping} leaves the asset root"),
                );
                report.failed.push((primary, err));
                continue;
            }
            if ledger.contains(&primary) {
                report.already_present += 1;
                continue;
            }

            let destination = self.root.join(&primary);
            if let Some(dir) = destination.parent() {
                ensure_output_dir(dir)?;
            }

            engine_info!("Downloading {} ({:?})", primary, destination);
            match self
                .fetcher
                .fetch(&descriptor.remote_url, &destination, self.timeout)
                .await
            {
                Ok(bytes) => {
                    engine_debug!("Wrote {} bytes to {:?}", bytes, destination);
                }
                Err(err) => {
                    engine_warn!("Failed to download {}: {}", descriptor.remote_url, err);
                    report.failed.push((primary, err));
                    continue;
                }
            }
            report.fetched.push(primary.clone());

            if self.copy_aliases(descriptor, &destination, &mut report)? {
                ledger.insert(&primary);
            }
        }

        Ok(report)
    }

    /// Returns `false` when an alias could not be written; the primary then stays out of the ledger.
    fn copy_aliases(
        &self,
        descriptor: &AssetDescriptor,
        source: &Path,
        report: &mut ReconcileReport,
    ) -> Result<bool, PersistError> {
        let mut complete = true;
        for alias in descriptor.aliases() {
            let target = self.root.join(&alias);
            if let Some(dir) = target.parent() {
                ensure_output_dir(dir)?;
            }
            engine_info!("Copying {} to {}", descriptor.primary_path(), alias);
            match fs::copy(source, &target) {
                Ok(_) => report.copied.push(alias),
                Err(err) => {
                    engine_warn!("Failed to copy {:?} to {:?}: {}", source, target, err);
                    complete = false;
                }
            }
        }
        Ok(complete)
    }

    /// The high resolution batch; skipped entirely when large downloads are disabled.
    pub async fn download_enhancements(
        &self,
        assets: &[HiResAsset],
        ledger: &mut DownloadLedger,
        disable_large_downloads: bool,
    ) -> Result<ReconcileReport, PersistError> {
        engine_info!("Checking for download enhancements...");
        if disable_large_downloads {
            engine_info!("Large downloads disabled, skipping {} enhancements", assets.len());
            return Ok(ReconcileReport {
                skipped_batch: true,
                ..ReconcileReport::default()
            });
        }
        self.reconcile(&AssetManifest::from_hi_res(assets), ledger).await
    }
}
