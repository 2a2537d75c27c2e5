use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use muncher_core::HiResAsset;
use muncher_engine::{
    AssetDescriptor, AssetFetcher, AssetManifest, AssetReconciler, DownloadLedger, FailureKind,
    FetchError, KeyedJsonStore, PersistError, DOWNLOADS_FILE, HI_RES_FILE,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Writes the url as file content and remembers what was asked for.
#[derive(Default)]
struct FakeFetcher {
    requested: Mutex<Vec<String>>,
    failing: Vec<String>,
    cancel_after_first: Option<CancellationToken>,
}

#[async_trait::async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, destination: &Path, _timeout: Duration) -> Result<u64, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(token) = &self.cancel_after_first {
            token.cancel();
        }
        if self.failing.iter().any(|f| f == url) {
            return Err(FetchError {
                kind: FailureKind::HttpStatus(500),
                message: "boom".to_string(),
            });
        }
        fs::write(destination, url).unwrap();
        Ok(url.len() as u64)
    }
}

impl FakeFetcher {
    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

fn descriptors() -> Vec<AssetDescriptor> {
    vec![
        AssetDescriptor::new("a.png", "https://cdn.example.com/a.png"),
        AssetDescriptor::new("b.png", "https://cdn.example.com/b.png")
            .with_local_paths(["b.png", "c.png"]),
    ]
}

#[tokio::test]
async fn only_unknown_assets_are_fetched_and_aliases_are_copied() {
    let tmp = TempDir::new().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = AssetReconciler::new(fetcher.clone(), tmp.path(), Duration::from_secs(5));
    let mut ledger: DownloadLedger = ["a.png"].into_iter().collect();

    let report = reconciler.reconcile(&descriptors(), &mut ledger).await.unwrap();

    assert_eq!(fetcher.requested(), vec!["https://cdn.example.com/b.png"]);
    assert_eq!(report.fetched, vec!["b.png"]);
    assert_eq!(report.copied, vec!["c.png"]);
    assert_eq!(report.already_present, 1);
    assert_eq!(ledger.iter().collect::<Vec<_>>(), vec!["a.png", "b.png"]);
    assert_eq!(
        fs::read_to_string(tmp.path().join("c.png")).unwrap(),
        "https://cdn.example.com/b.png"
    );
}

#[tokio::test]
async fn second_run_fetches_nothing() {
    let tmp = TempDir::new().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = AssetReconciler::new(fetcher.clone(), tmp.path(), Duration::from_secs(5));
    let mut ledger = DownloadLedger::new();

    reconciler.reconcile(&descriptors(), &mut ledger).await.unwrap();
    let report = reconciler.reconcile(&descriptors(), &mut ledger).await.unwrap();

    assert_eq!(fetcher.requested().len(), 2);
    assert!(report.fetched.is_empty());
    assert_eq!(report.already_present, 2);
}

#[tokio::test]
async fn failed_fetch_is_skipped_and_stays_out_of_the_ledger() {
    let tmp = TempDir::new().unwrap();
    let fetcher = Arc::new(FakeFetcher {
        failing: vec!["https://cdn.example.com/a.png".to_string()],
        ..FakeFetcher::default()
    });
    let reconciler = AssetReconciler::new(fetcher.clone(), tmp.path(), Duration::from_secs(5));
    let mut ledger = DownloadLedger::new();

    let report = reconciler.reconcile(&descriptors(), &mut ledger).await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "a.png");
    assert_eq!(report.failed[0].1.kind, FailureKind::HttpStatus(500));
    assert_eq!(report.fetched, vec!["b.png"]);
    assert!(!ledger.contains("a.png"));
    assert!(ledger.contains("b.png"));
}

#[tokio::test]
async fn nested_destinations_get_their_directories() {
    let tmp = TempDir::new().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = AssetReconciler::new(fetcher, tmp.path(), Duration::from_secs(5));
    let mut ledger = DownloadLedger::new();
    let assets = vec![AssetDescriptor::new("/maps/deep/x.png", "https://cdn.example.com/x.png")];

    reconciler.reconcile(&assets, &mut ledger).await.unwrap();

    assert!(tmp.path().join("maps/deep/x.png").is_file());
    assert!(ledger.contains("maps/deep/x.png"));
}

#[tokio::test]
async fn cancellation_stops_new_fetches() {
    let tmp = TempDir::new().unwrap();
    let token = CancellationToken::new();
    let fetcher = Arc::new(FakeFetcher {
        cancel_after_first: Some(token.clone()),
        ..FakeFetcher::default()
    });
    let reconciler = AssetReconciler::new(fetcher.clone(), tmp.path(), Duration::from_secs(5))
        .with_cancellation(token);
    let mut ledger = DownloadLedger::new();

    let report = reconciler.reconcile(&descriptors(), &mut ledger).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(fetcher.requested(), vec!["https://cdn.example.com/a.png"]);
    assert_eq!(ledger.iter().collect::<Vec<_>>(), vec!["a.png"]);
}

#[tokio::test]
async fn disabled_large_downloads_skip_the_whole_batch() {
    let tmp = TempDir::new().unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = AssetReconciler::new(fetcher.clone(), tmp.path(), Duration::from_secs(5));
    let mut ledger = DownloadLedger::new();
    let hi_res = vec![HiResAsset {
        name: "Cragmaw".to_string(),
        path: "assets/maps/cragmaw.webp".to_string(),
        url: "https://cdn.example.com/cragmaw.webp".to_string(),
    }];

    let skipped = reconciler
        .download_enhancements(&hi_res, &mut ledger, true)
        .await
        .unwrap();
    assert!(skipped.skipped_batch);
    assert!(fetcher.requested().is_empty());
    assert!(ledger.is_empty());

    let report = reconciler
        .download_enhancements(&hi_res, &mut ledger, false)
        .await
        .unwrap();
    assert_eq!(report.fetched, vec!["maps/cragmaw.webp"]);
    assert!(tmp.path().join("maps/cragmaw.webp").is_file());
}

#[tokio::test]
async fn paths_leaving_the_asset_root_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = AssetReconciler::new(fetcher.clone(), &root, Duration::from_secs(5));
    let mut ledger = DownloadLedger::new();
    let assets = vec![
        AssetDescriptor::new("../escaped.png", "https://cdn.example.com/escaped.png")
            .with_local_paths(["../escaped.png", "../../alias.png"]),
        AssetDescriptor::new("maps/ok.png", "https://cdn.example.com/ok.png")
            .with_local_paths(["maps/ok.png", "maps/../../sneaky.png"]),
        AssetDescriptor::new("maps/fine.png", "https://cdn.example.com/fine.png"),
    ];

    let report = reconciler.reconcile(&assets, &mut ledger).await.unwrap();

    assert_eq!(fetcher.requested(), vec!["https://cdn.example.com/fine.png"]);
    assert_eq!(report.fetched, vec!["maps/fine.png"]);
    assert!(report.copied.is_empty());
    let rejected: Vec<&str> = report.failed.iter().map(|(path, _)| path.as_str()).collect();
    assert_eq!(rejected, vec!["../escaped.png", "maps/ok.png"]);
    assert!(report
        .failed
        .iter()
        .all(|(_, err)| err.kind == FailureKind::UnsafePath));
    assert!(!tmp.path().join("escaped.png").exists());
    assert!(!tmp.path().join("sneaky.png").exists());
    assert_eq!(ledger.iter().collect::<Vec<_>>(), vec!["maps/fine.png"]);
}

#[tokio::test]
async fn uncreatable_destination_directory_aborts_the_batch() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("blocked"), "not a directory").unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = AssetReconciler::new(fetcher.clone(), tmp.path(), Duration::from_secs(5));
    let mut ledger = DownloadLedger::new();
    let assets = vec![
        AssetDescriptor::new("blocked/x.png", "https://cdn.example.com/x.png"),
        AssetDescriptor::new("y.png", "https://cdn.example.com/y.png"),
    ];

    let err = reconciler.reconcile(&assets, &mut ledger).await.unwrap_err();

    assert!(matches!(err, PersistError::OutputDir(_)));
    assert!(fetcher.requested().is_empty());
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn failed_alias_copy_keeps_primary_out_of_the_ledger() {
    let tmp = TempDir::new().unwrap();
    // A directory where the alias file should go makes the copy fail.
    fs::create_dir_all(tmp.path().join("c.png")).unwrap();
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = AssetReconciler::new(fetcher.clone(), tmp.path(), Duration::from_secs(5));
    let mut ledger = DownloadLedger::new();
    let assets = vec![AssetDescriptor::new("b.png", "https://cdn.example.com/b.png")
        .with_local_paths(["b.png", "c.png"])];

    let report = reconciler.reconcile(&assets, &mut ledger).await.unwrap();

    assert_eq!(report.fetched, vec!["b.png"]);
    assert!(report.copied.is_empty());
    assert!(tmp.path().join("b.png").is_file());
    assert!(!ledger.contains("b.png"));
}

#[tokio::test]
async fn persisted_ledgers_prevent_refetching_across_runs() {
    let tmp = TempDir::new().unwrap();
    let downloads = KeyedJsonStore::new(tmp.path().join("config").join(DOWNLOADS_FILE));
    let hi_res_downloads = KeyedJsonStore::new(tmp.path().join("config").join(HI_RES_FILE));
    let hi_res = vec![HiResAsset {
        name: "Cragmaw".to_string(),
        path: "assets/maps/cragmaw.webp".to_string(),
        url: "https://cdn.example.com/cragmaw.webp".to_string(),
    }];
    let fetcher = Arc::new(FakeFetcher::default());
    let reconciler = AssetReconciler::new(fetcher.clone(), tmp.path().join("assets"), Duration::from_secs(5));

    let mut ledger = DownloadLedger::load(&downloads, "lmop");
    reconciler.reconcile(&descriptors(), &mut ledger).await.unwrap();
    ledger.save(&downloads, "lmop").unwrap();
    let mut hi_res_ledger = DownloadLedger::load(&hi_res_downloads, "lmop");
    reconciler
        .download_enhancements(&hi_res, &mut hi_res_ledger, false)
        .await
        .unwrap();
    hi_res_ledger.save(&hi_res_downloads, "lmop").unwrap();
    assert_eq!(fetcher.requested().len(), 3);

    let mut ledger = DownloadLedger::load(&downloads, "lmop");
    let mut hi_res_ledger = DownloadLedger::load(&hi_res_downloads, "lmop");
    let report = reconciler.reconcile(&descriptors(), &mut ledger).await.unwrap();
    let hi_res_report = reconciler
        .download_enhancements(&hi_res, &mut hi_res_ledger, false)
        .await
        .unwrap();

    assert_eq!(fetcher.requested().len(), 3);
    assert_eq!(report.already_present, 2);
    assert_eq!(hi_res_report.already_present, 1);
    assert_eq!(hi_res_ledger.iter().collect::<Vec<_>>(), vec!["maps/cragmaw.webp"]);
}

#[test]
fn manifest_lists_primary_and_extra_local_paths() {
    let manifest = r#"{"files": [
        {"RemoteUrl": "https://cdn.example.com/a.png", "LocalUrl": ["/img/a.png", "/img/a-copy.png"]},
        {"RemoteUrl": "https://cdn.example.com/none.png", "LocalUrl": []}
    ]}"#;
    let descriptors = AssetManifest::parse(manifest).unwrap();

    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].primary_path(), "img/a.png");
    assert_eq!(descriptors[0].aliases(), vec!["img/a-copy.png"]);
}

#[test]
fn missing_manifest_yields_nothing() {
    let tmp = TempDir::new().unwrap();
    assert!(AssetManifest::load(&tmp.path().join("files.txt")).is_empty());
}
