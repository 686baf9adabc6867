//! Integration tests against a real Postgres instance. Require
//! `DATABASE_URL` and are `#[ignore]`d by default; run with
//! `cargo test -- --ignored` against a disposable database.

use chrono::Duration;
use serial_test::serial;
use sqlx::PgPool;

use mediasearch_db::{AiModelRepo, AssetRepo, DbConfig, LibraryRepo};
use mediasearch_models::{DiscoveredFile, MediaKind, NewLibrary, PipelineStage, WorkerId};
use mediasearch_queue::{ClaimEngine, LeaseConfig};

async fn test_pool() -> PgPool {
    let config = DbConfig::from_env().expect("DATABASE_URL must be set for integration tests");
    mediasearch_db::connect(&config).await.expect("connect")
}

#[tokio::test]
#[ignore]
#[serial]
async fn claim_is_race_free_across_two_workers() {
    let pool = test_pool().await;
    let slug = mediasearch_models::LibrarySlug::parse("claim-race-test").unwrap();
    LibraryRepo::new(&pool)
        .create(&NewLibrary {
            slug: slug.clone(),
            display_name: "Claim race test".into(),
            source_root: "/tmp/claim-race-test".into(),
            target_ai_model_id: None,
        })
        .await
        .ok();

    let assets = AssetRepo::new(&pool);
    assets
        .upsert_discovered(
            &slug,
            &DiscoveredFile {
                rel_path: "one.jpg".into(),
                kind: MediaKind::Image,
                mtime: 1.0,
                size_bytes: 100,
            },
        )
        .await
        .unwrap();

    let engine = ClaimEngine::new(&pool, LeaseConfig::default());
    let worker_a = WorkerId::new("image-proxy", "hostA", "aaa111");
    let worker_b = WorkerId::new("image-proxy", "hostB", "bbb222");

    let (a, b) = tokio::join!(
        engine.claim_next(PipelineStage::Proxy, Some(MediaKind::Image), Some(&slug), &worker_a, None),
        engine.claim_next(PipelineStage::Proxy, Some(MediaKind::Image), Some(&slug), &worker_b, None),
    );

    let claimed = [a.unwrap(), b.unwrap()];
    let claimed_count = claimed.iter().filter(|c| c.is_some()).count();
    assert_eq!(claimed_count, 1, "exactly one worker should have won the only row");
}

#[tokio::test]
#[ignore]
#[serial]
async fn expired_lease_is_reclaimed_and_retry_count_increments() {
    let pool = test_pool().await;
    let slug = mediasearch_models::LibrarySlug::parse("lease-reclaim-test").unwrap();
    LibraryRepo::new(&pool)
        .create(&NewLibrary {
            slug: slug.clone(),
            display_name: "Lease reclaim test".into(),
            source_root: "/tmp/lease-reclaim-test".into(),
            target_ai_model_id: None,
        })
        .await
        .ok();

    let assets = AssetRepo::new(&pool);
    assets
        .upsert_discovered(
            &slug,
            &DiscoveredFile {
                rel_path: "two.jpg".into(),
                kind: MediaKind::Image,
                mtime: 1.0,
                size_bytes: 100,
            },
        )
        .await
        .unwrap();

    let engine = ClaimEngine::new(&pool, LeaseConfig {
        lease_ttl: Duration::seconds(-1),
        ..LeaseConfig::default()
    });
    let worker_a = WorkerId::new("image-proxy", "hostA", "aaa111");

    let claimed = engine
        .claim_next(PipelineStage::Proxy, Some(MediaKind::Image), Some(&slug), &worker_a, None)
        .await
        .unwrap()
        .expect("row should be claimable");
    assert_eq!(claimed.retry_count, 1);

    let reclaimed = engine.reclaim_sweep().await.unwrap();
    assert_eq!(reclaimed, 1);

    let worker_b = WorkerId::new("image-proxy", "hostB", "bbb222");
    let reclaimed_asset = engine
        .claim_next(PipelineStage::Proxy, Some(MediaKind::Image), Some(&slug), &worker_b, None)
        .await
        .unwrap()
        .expect("reclaimed row should be claimable again");
    assert_eq!(reclaimed_asset.id, claimed.id);
    assert_eq!(reclaimed_asset.retry_count, 2);
}

#[tokio::test]
#[ignore]
#[serial]
async fn model_registration_is_idempotent() {
    let pool = test_pool().await;
    let models = AiModelRepo::new(&pool);
    let first = models.find_or_create("siglip", "v1").await.unwrap();
    let second = models.find_or_create("siglip", "v1").await.unwrap();
    assert_eq!(first.id, second.id);
}
