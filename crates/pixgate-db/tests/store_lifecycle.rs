//! Store lifecycle integration tests.
//!
//! These run against a real database file so multiple pools and reopened
//! stores observe the same state, the way several server instances share
//! one store in production.

use chrono::{Duration, Utc};
use pixgate_common::ImageParams;
use pixgate_db::config::StoreConfig;
use pixgate_db::store::TokenStore;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        db_path: dir
            .path()
            .join("pixgate.sqlite")
            .to_str()
            .unwrap()
            .to_string(),
        pool_size: 4,
        token_ttl_minutes: 15,
        cleanup_probability: 0.0,
    }
}

#[test]
fn open_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        pool_size: 0,
        ..test_config(&dir)
    };
    assert!(TokenStore::open(config).is_err());
}

#[test]
fn two_instances_share_one_store() {
    let dir = TempDir::new().unwrap();
    let a = TokenStore::open(test_config(&dir)).unwrap();
    let b = TokenStore::open(test_config(&dir)).unwrap();

    // The pending-token constraint holds across instances
    let token = a.create_token("img1").unwrap();
    assert!(b.create_token("img1").is_none());

    // Either instance may consume the token, but only once in total
    assert!(b.consume_token(&token, "img1"));
    assert!(!a.consume_token(&token, "img1"));
}

#[test]
fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let before = Utc::now() - Duration::seconds(1);
    let params = ImageParams::new("img1", 320, 240, "crop", "image/jpeg", true, 60);

    let token = {
        let store = TokenStore::open(test_config(&dir)).unwrap();
        let token = store.create_token("img1").unwrap();
        assert!(store.consume_token(&token, "img1"));
        assert!(store.add_to_cache(&params, "https://cdn.example/img1.jpg", Utc::now()));
        store.close();
        token
    };

    let reopened = TokenStore::open(test_config(&dir)).unwrap();
    assert!(reopened.is_alive());

    // Reopening applies no migrations and loses no state
    assert_eq!(reopened.migrate().unwrap(), 0);
    assert!(reopened.mark_upload_completed(&token, "img1"));
    assert_eq!(reopened.images_completed_after(before).len(), 1);
    assert_eq!(
        reopened.get_from_cache(&params).as_deref(),
        Some("https://cdn.example/img1.jpg")
    );
}

#[test]
fn cache_entries_are_independent_per_tuple() {
    let dir = TempDir::new().unwrap();
    let store = TokenStore::open(test_config(&dir)).unwrap();

    let webp = ImageParams::new("img1", 640, 480, "clip", "image/webp", false, 80);
    let mut jpeg = webp.clone();
    jpeg.mime = "image/jpeg".to_string();

    assert!(store.add_to_cache(&webp, "https://cdn.example/img1.webp", Utc::now()));
    assert!(store.get_from_cache(&jpeg).is_none());
}
