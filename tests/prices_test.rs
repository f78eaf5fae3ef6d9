use game_ledger::error::LookupError;
use game_ledger::models::AppId;
use game_ledger::prices::{load_book, PriceBook};
use game_ledger::sources::{OriginalPriceSource, PriceSource};
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// List price lookup: app 404 always fails, app 408 never answers, and every
/// lookup fails while `down` is set
#[derive(Default, Clone)]
struct FakeStore {
    calls: Arc<AtomicUsize>,
    down: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl OriginalPriceSource for FakeStore {
    async fn original_price(&self, app_id: AppId) -> Result<f64, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;

        let result = if self.down.load(Ordering::SeqCst) || app_id == 404 {
            Err(LookupError::Decode("store unavailable".to_string()))
        } else if app_id == 408 {
            std::future::pending::<()>().await;
            unreachable!()
        } else {
            Ok(app_id as f64 / 10.0)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[tokio::test]
async fn test_existing_book_is_read_with_canonical_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.json");
    fs::write(
        &path,
        r#"{ "10": { "paid": 4.99, "orig": 9.99 }, "oops": { "paid": 1.0 } }"#,
    )
    .unwrap();

    let book = PriceBook::new(&path, FakeStore::default());
    let prices = book.prices(&[10]).await.unwrap();

    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].app_id, 10);
    assert_eq!(prices[0].paid, Some(4.99));
    assert_eq!(prices[0].original, Some(9.99));
}

#[tokio::test]
async fn test_duplicate_keys_keep_canonical_spelling() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.json");
    fs::write(
        &path,
        r#"{ "010": { "paid": 1.0, "orig": 2.0 }, "10": { "paid": 3.0, "orig": 4.0 }, " 10": { "paid": 5.0, "orig": 6.0 } }"#,
    )
    .unwrap();

    let book = load_book(&path).await.unwrap();
    assert_eq!(book.len(), 1);
    assert_eq!(book[&10].paid, Some(3.0));
}

#[tokio::test]
async fn test_missing_games_are_filled_and_saved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.json");
    fs::write(&path, r#"{ "10": { "paid": 1.0, "orig": 2.0 } }"#).unwrap();

    let book = PriceBook::new(&path, FakeStore::default());
    let prices = book.prices(&[10, 200, 404, 200]).await.unwrap();

    let ids: Vec<AppId> = prices.iter().map(|p| p.app_id).collect();
    assert_eq!(ids, vec![10, 200, 404]);
    assert_eq!(prices[1].paid, None);
    assert_eq!(prices[1].original, Some(20.0));
    // A failed lookup is not a price
    assert_eq!(prices[2].original, None);

    let saved = load_book(&path).await.unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(saved[&200].orig, Some(20.0));
    assert_eq!(saved[&404].orig, None);
    assert_eq!(saved[&10].paid, Some(1.0));
}

#[tokio::test]
async fn test_failed_lookup_is_retried_on_next_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.json");
    fs::write(&path, r#"{ "10": { "paid": 7.5 } }"#).unwrap();

    let store = FakeStore::default();
    let book = PriceBook::new(&path, store.clone());

    store.down.store(true, Ordering::SeqCst);
    let first = book.prices(&[10, 30]).await.unwrap();
    assert_eq!(first[0].original, None);
    assert_eq!(first[1].original, None);

    store.down.store(false, Ordering::SeqCst);
    let second = book.prices(&[10, 30]).await.unwrap();
    assert_eq!(second[0].original, Some(1.0));
    assert_eq!(second[1].original, Some(3.0));

    let saved = load_book(&path).await.unwrap();
    assert_eq!(saved[&10].paid, Some(7.5));
    assert_eq!(saved[&10].orig, Some(1.0));
    assert_eq!(saved[&30].orig, Some(3.0));
    assert_eq!(store.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_hung_lookup_times_out() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.json");

    let book = PriceBook::new(&path, FakeStore::default()).with_timeout(Duration::from_millis(50));
    let prices = book.prices(&[20, 408]).await.unwrap();

    assert_eq!(prices.len(), 2);
    assert_eq!(prices[0].original, Some(2.0));
    assert_eq!(prices[1].original, None);
}

#[tokio::test]
async fn test_store_lookups_are_capped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.json");

    let store = FakeStore::default();
    let book = PriceBook::new(&path, store.clone()).with_max_in_flight(3);
    let apps: Vec<AppId> = (1..=20).collect();
    let prices = book.prices(&apps).await.unwrap();

    assert_eq!(prices.len(), 20);
    assert!(store.peak_in_flight.load(Ordering::SeqCst) <= 3);
    assert_eq!(store.calls.load(Ordering::SeqCst), 20);
}

#[tokio::test]
async fn test_known_games_do_not_hit_the_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.json");
    fs::write(&path, r#"{ "10": { "paid": 1.0, "orig": 2.0 } }"#).unwrap();

    let store = FakeStore::default();
    let book = PriceBook::new(&path, store.clone());
    book.prices(&[10]).await.unwrap();
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);

    book.prices(&[10, 30]).await.unwrap();
    book.prices(&[10, 30]).await.unwrap();
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_offline_book_without_file_is_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let book = PriceBook::<FakeStore>::offline(&path);
    let prices = book.prices(&[10, 20]).await.unwrap();

    assert!(prices.is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_malformed_book_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.json");
    fs::write(&path, "not json").unwrap();

    let err = PriceBook::<FakeStore>::offline(&path)
        .prices(&[10])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to parse price book"));
}
