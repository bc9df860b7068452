mod common;

use account_resources::config::FeatureFlags;
use account_resources::{load, write, AccountInfo, Downloader, WriterContext};
use common::{sample_account, ACCOUNT_UUID};
use std::sync::Arc;
use tempfile::tempdir;

async fn round_trip(features: FeatureFlags) {
    let account = AccountInfo {
        name: "round-trip".to_string(),
        uuid: ACCOUNT_UUID.to_string(),
    };
    let downloaded = Downloader::new(Arc::new(sample_account()), account, features)
        .download_resources()
        .await
        .unwrap();

    let dir = tempdir().unwrap();
    let ctx = WriterContext::new(dir.path(), "account").with_features(features);
    write(&ctx, &downloaded).unwrap();
    let loaded = load(ctx.target_dir()).unwrap();

    assert_eq!(loaded, downloaded);
}

#[tokio::test]
async fn test_download_write_load_round_trip() {
    round_trip(FeatureFlags::default()).await;
}

#[tokio::test]
async fn test_round_trip_with_boundaries_and_service_users() {
    round_trip(FeatureFlags::all()).await;
}

#[tokio::test]
async fn test_rewriting_loaded_resources_is_stable() {
    let account = AccountInfo {
        name: "round-trip".to_string(),
        uuid: ACCOUNT_UUID.to_string(),
    };
    let downloaded = Downloader::new(Arc::new(sample_account()), account, FeatureFlags::all())
        .download_resources()
        .await
        .unwrap();

    let dir = tempdir().unwrap();
    let first = WriterContext::new(dir.path(), "first").with_features(FeatureFlags::all());
    write(&first, &downloaded).unwrap();
    let loaded = load(first.target_dir()).unwrap();
    let second = WriterContext::new(dir.path(), "second").with_features(FeatureFlags::all());
    write(&second, &loaded).unwrap();

    for name in ["policies.yaml", "groups.yaml", "users.yaml", "service-users.yaml", "boundaries.yaml"] {
        let a = std::fs::read(first.target_dir().join(name)).unwrap();
        let b = std::fs::read(second.target_dir().join(name)).unwrap();
        assert_eq!(a, b, "{} differs", name);
    }
}
