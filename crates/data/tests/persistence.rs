use loteria_core::{
    Card, CardRepository, DeckError, DeckManager, ImportMode, RngState, StorageError,
    StorageProvider,
};
use loteria_data::{
    export_snapshot, import_snapshot, snapshot_to_json, ImportError, KeyValueStorage,
    OfflineCache, RecordStorage, DEFAULT_DECK_NAME,
};
use std::path::Path;

#[path = "../src/test_support.rs"]
mod test_support;

use test_support::TempDir;

const NAMES: [&str; 3] = ["El Gallo", "La Dama", "El Catrín"];

async fn add_and_reload<P: StorageProvider>(provider: &P) {
    let mut manager = DeckManager::load(provider, RngState::from_seed(11))
        .await
        .expect("load");
    for name in NAMES {
        manager.add_card(name, "data:image/png;base64,AAAA").await.expect("add");
    }
    let middle = manager.deck().cards()[1].id.clone();
    manager.remove_card(&middle).await.expect("remove");
    let before = manager.deck().clone();

    let reloaded = DeckManager::load(provider, RngState::from_seed(12))
        .await
        .expect("reload");
    assert_eq!(reloaded.deck(), &before);
    let numbers: Vec<u32> = reloaded.deck().iter().map(|card| card.number).collect();
    assert_eq!(numbers, vec![1, 3]);
}

#[tokio::test]
async fn record_store_survives_reload() {
    let dir = TempDir::new("records_reload");
    add_and_reload(&RecordStorage::new(dir.path().join("data"))).await;
}

#[tokio::test]
async fn key_value_store_survives_reload() {
    let dir = TempDir::new("kv_reload");
    add_and_reload(&KeyValueStorage::new(dir.path().join("data"))).await;
}

/// Adds a card while `block` keeps the backend from saving, then checks the
/// failed add left both the stored deck and the manager untouched.
async fn failed_add_keeps_stored_deck<P: StorageProvider>(provider: &P, block: impl FnOnce()) {
    let mut manager = DeckManager::load(provider, RngState::from_seed(13))
        .await
        .expect("load");
    for name in NAMES {
        manager.add_card(name, "data:,").await.expect("add");
    }
    let before = provider.open().await.expect("open").get_all().await.expect("get");
    assert_eq!(before.as_slice(), manager.deck().cards());

    block();
    let err = manager
        .add_card("La Sirena", "data:,s")
        .await
        .expect_err("save is blocked");
    assert!(matches!(
        err,
        DeckError::PersistenceFailed(StorageError::Io(_))
    ));
    assert_eq!(manager.deck().cards(), before.as_slice());

    let after = provider.open().await.expect("reopen").get_all().await.expect("get");
    assert_eq!(after, before);
}

fn block_with_file(path: &Path) {
    std::fs::write(path, b"in the way").expect("block with file");
}

fn block_with_dir(path: &Path) {
    std::fs::create_dir_all(path).expect("block with dir");
}

#[tokio::test]
async fn record_store_keeps_deck_when_save_fails() {
    let dir = TempDir::new("records_failed_save");
    let data = dir.path().join("data");
    let staging = data.join("cards.tmp");
    failed_add_keeps_stored_deck(&RecordStorage::new(&data), || block_with_file(&staging)).await;
}

#[tokio::test]
async fn key_value_store_keeps_deck_when_save_fails() {
    let dir = TempDir::new("kv_failed_save");
    let data = dir.path().join("data");
    let staging = data.join("loteria-cards.json.tmp");
    failed_add_keeps_stored_deck(&KeyValueStorage::new(&data), || block_with_dir(&staging)).await;
}

#[tokio::test]
async fn export_then_replace_import_restores_the_deck() {
    let dir = TempDir::new("export_import");
    let source = RecordStorage::new(dir.path().join("source"));
    let mut manager = DeckManager::load(&source, RngState::from_seed(3))
        .await
        .expect("load");
    for name in NAMES {
        manager.add_card(name, format!("data:,{name}")).await.expect("add");
    }
    let json = snapshot_to_json(&export_snapshot(manager.deck(), DEFAULT_DECK_NAME))
        .expect("export");

    let target = KeyValueStorage::new(dir.path().join("target"));
    let mut other = DeckManager::load(&target, RngState::from_seed(4))
        .await
        .expect("load target");
    other.add_card("La Sirena", "data:,s").await.expect("add");

    let imported = import_snapshot(&json).expect("import");
    assert_eq!(imported.skipped, 0);
    let cards = imported.reconcile(other.deck(), ImportMode::Replace);
    other.replace_all(cards).await.expect("replace");
    assert_eq!(other.deck(), manager.deck());

    let stored = target.open().await.expect("open").get_all().await.expect("get");
    assert_eq!(stored.as_slice(), manager.deck().cards());
}

#[tokio::test]
async fn import_skips_cards_without_names() {
    let raw = r#"{
        "version": "1.0",
        "deckName": "Feria",
        "cardCount": 5,
        "cards": [
            {"id": 1, "name": "El Sol", "image": "data:,1", "number": 1},
            {"id": 2, "name": "La Luna", "image": "data:,2", "number": 2},
            {"id": 3, "image": "data:,3", "number": 3},
            {"id": 4, "name": "", "image": "data:,4", "number": 4},
            {"id": "e", "name": "La Estrella", "image": "data:,5", "number": 5}
        ]
    }"#;
    let imported = import_snapshot(raw).expect("import");
    assert_eq!(imported.cards.len(), 3);
    assert_eq!(imported.skipped, 2);
    assert_eq!(imported.display_name(), "Feria");

    let dir = TempDir::new("import_append");
    let storage = RecordStorage::new(dir.path());
    let mut manager = DeckManager::load(&storage, RngState::from_seed(5))
        .await
        .expect("load");
    manager.add_card("El Sol", "data:,x").await.expect("add");
    let preview = imported.preview(manager.deck());
    assert_eq!(preview.valid_cards, 3);
    assert_eq!(preview.current_cards, 1);

    let cards = imported.reconcile(manager.deck(), ImportMode::Append);
    manager.replace_all(cards).await.expect("append");
    assert_eq!(manager.deck().len(), 4);
}

#[test]
fn import_rejects_bad_files() {
    assert!(matches!(
        import_snapshot("not json"),
        Err(ImportError::MalformedInput(_))
    ));
    assert!(matches!(
        import_snapshot(r#"{"cards": []}"#),
        Err(ImportError::InvalidSnapshot(_))
    ));
    assert!(matches!(
        import_snapshot(r#"{"version": "1.0", "cards": [{"id": 1}]}"#),
        Err(ImportError::NoValidCards)
    ));
}

#[tokio::test]
async fn quota_failure_rolls_back_the_add() {
    let dir = TempDir::new("quota_rollback");
    let storage = KeyValueStorage::new(dir.path()).with_quota(Some(400));
    let mut manager = DeckManager::load(&storage, RngState::from_seed(6))
        .await
        .expect("load");
    manager.add_card("El Gallo", "data:,small").await.expect("add");
    let err = manager
        .add_card("El Músico", format!("data:,{}", "x".repeat(1000)))
        .await
        .expect_err("over quota");
    assert!(matches!(
        err,
        DeckError::PersistenceFailed(StorageError::QuotaExceeded { quota: 400, .. })
    ));
    assert_eq!(manager.deck().len(), 1);
    let stored: Vec<Card> = storage.open().await.expect("open").get_all().await.expect("get");
    assert_eq!(stored.as_slice(), manager.deck().cards());
}

#[tokio::test]
async fn backup_restores_after_the_store_is_lost() {
    let dir = TempDir::new("backup_restore");
    let cache = OfflineCache::new(dir.path().join("cache"));
    let storage = RecordStorage::new(dir.path().join("data"));
    let mut manager = DeckManager::load(&storage, RngState::from_seed(7))
        .await
        .expect("load");
    for name in NAMES {
        manager.add_card(name, "data:,").await.expect("add");
    }
    let bytes = serde_json::to_vec(manager.deck().cards()).expect("encode");
    assert!(cache.backup(&bytes).await);

    std::fs::remove_dir_all(dir.path().join("data")).expect("drop store");
    let mut fresh = DeckManager::load(&storage, RngState::from_seed(8))
        .await
        .expect("load empty");
    assert!(fresh.deck().is_empty());

    let restored = cache.restore_backup().await.expect("backup present");
    let cards: Vec<Card> = serde_json::from_slice(&restored).expect("decode");
    fresh.replace_all(cards).await.expect("restore");
    assert_eq!(fresh.deck(), manager.deck());
}
