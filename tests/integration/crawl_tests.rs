//! End-to-end crawl tests against the simulated calculator page
//!
//! All tests run on a paused tokio clock, so request delays, retry backoff
//! and selection timeouts elapse instantly.

use crate::common::{
    action, action_select_to_read_gaps, device, manufacturer, test_config, Catalog, ErrorEvents,
    FakeLauncher, TrackedStorage,
};
use repair_price_crawler::crawler::{Coordinator, NodeLevel};
use repair_price_crawler::storage::{CatalogTable, RunStatus, SqliteStorage, Storage};
use repair_price_crawler::CrawlError;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;

fn reopen(path: &Path) -> SqliteStorage {
    SqliteStorage::new(path).unwrap()
}

fn price_of(
    storage: &SqliteStorage,
    manufacturer_id: i64,
    device: &str,
    action: &str,
) -> Vec<Option<i64>> {
    let device_id = storage.find_device(device, manufacturer_id).unwrap().unwrap();
    let action_id = storage.find_action(action, device_id).unwrap().unwrap();
    storage
        .price_history(action_id)
        .unwrap()
        .into_iter()
        .map(|record| record.price)
        .collect()
}

fn three_manufacturers() -> Catalog {
    let mut samsung = manufacturer(
        "Samsung",
        vec![device("Galaxy S21", vec![action("Display", "€ 199,00")])],
    );
    samsung.broken = true;

    Catalog::new(vec![
        manufacturer(
            "Apple",
            vec![
                device(
                    "iPhone 13",
                    vec![action("Display", "€ 129,00"), action("Akku", "89 €")],
                ),
                device("iPad Air", vec![action("Ladebuchse", "69 €")]),
            ],
        ),
        samsung,
        manufacturer(
            "Google",
            vec![device("Pixel 7", vec![action("Kamera", "Nicht verfügbar")])],
        ),
    ])
}

#[tokio::test(start_paused = true)]
async fn test_single_leaf_end_to_end() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");
    let config = test_config(&db_path);

    let catalog = Catalog::new(vec![manufacturer(
        "Apple",
        vec![device("iPhone 13", vec![action("Display", "€ 129,00")])],
    )]);
    let launcher = FakeLauncher::new(catalog);
    let (storage, storage_closes) = TrackedStorage::open(&db_path);
    let browser_closes = launcher.closes.clone();

    let report = Coordinator::new(config, "hash-1", launcher, storage)
        .run()
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.prices_recorded, 1);
    assert_eq!(browser_closes.get(), 1);
    assert_eq!(storage_closes.get(), 1);

    let storage = reopen(&db_path);
    assert_eq!(storage.count_rows(CatalogTable::Manufacturers).unwrap(), 1);
    assert_eq!(storage.count_rows(CatalogTable::Devices).unwrap(), 1);
    assert_eq!(storage.count_rows(CatalogTable::Actions).unwrap(), 1);
    assert_eq!(storage.count_rows(CatalogTable::Prices).unwrap(), 1);

    let device_id = storage.find_device("iPhone 13", 1).unwrap().unwrap();
    let action_id = storage.find_action("Display", device_id).unwrap().unwrap();
    let history = storage.price_history(action_id).unwrap();
    assert_eq!(history[0].price, Some(12900));

    let runs = storage.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].config_hash, "hash-1");
    assert_eq!(runs[0].prices_recorded, 1);
    assert!(runs[0].finished_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_failing_manufacturer_is_skipped_and_logged_once() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    let events = ErrorEvents::default();
    let _subscriber = tracing::subscriber::set_default(
        tracing_subscriber::registry().with(events.clone()),
    );

    let launcher = FakeLauncher::new(three_manufacturers());
    let (storage, _) = TrackedStorage::open(&db_path);

    let report = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await
        .unwrap();

    assert_eq!(report.manufacturers_visited, 2);
    assert_eq!(report.devices_visited, 3);
    assert_eq!(report.actions_visited, 4);
    assert_eq!(report.prices_recorded, 4);
    assert_eq!(report.prices_missing, 1);

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.level, NodeLevel::Manufacturer);
    assert_eq!(failure.path, vec!["Samsung".to_string()]);

    let errors = events.messages();
    assert_eq!(errors.len(), 1, "unexpected error events: {:?}", errors);
    assert!(errors[0].contains("Samsung"));

    let storage = reopen(&db_path);
    assert_eq!(storage.count_rows(CatalogTable::Manufacturers).unwrap(), 2);
    assert_eq!(storage.count_rows(CatalogTable::Prices).unwrap(), 4);
    assert_eq!(storage.count_missing_prices().unwrap(), 1);

    let runs = storage.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].node_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failing_device_does_not_abort_manufacturer() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    let mut broken = device("iPhone 6", vec![action("Display", "49 €")]);
    broken.broken = true;
    let catalog = Catalog::new(vec![manufacturer(
        "Apple",
        vec![
            broken,
            device("iPhone 13", vec![action("Display", "129 €")]),
        ],
    )]);

    let launcher = FakeLauncher::new(catalog);
    let (storage, _) = TrackedStorage::open(&db_path);

    let report = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await
        .unwrap();

    assert_eq!(report.failures_at(NodeLevel::Device).count(), 1);
    assert_eq!(report.failures[0].path_display(), "Apple > iPhone 6");
    assert_eq!(report.devices_visited, 1);
    assert_eq!(report.prices_recorded, 1);

    let storage = reopen(&db_path);
    assert_eq!(storage.count_rows(CatalogTable::Devices).unwrap(), 1);
    assert!(storage.find_device("iPhone 6", 1).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_walk_error_still_cleans_up_once() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    let mut catalog = three_manufacturers();
    catalog.manufacturer_list_error = true;
    let launcher = FakeLauncher::new(catalog);
    let browser_closes = launcher.closes.clone();
    let (storage, storage_closes) = TrackedStorage::open(&db_path);

    let result = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await;

    assert!(matches!(result, Err(CrawlError::Script(_))));
    assert_eq!(browser_closes.get(), 1);
    assert_eq!(storage_closes.get(), 1);

    let runs = reopen(&db_path).recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_launch_failure_closes_storage() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    let launcher = FakeLauncher::failing();
    let launches = launcher.launches.clone();
    let browser_closes = launcher.closes.clone();
    let (storage, storage_closes) = TrackedStorage::open(&db_path);

    let result = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await;

    assert!(matches!(result, Err(CrawlError::BrowserLaunch(_))));
    assert_eq!(launches.get(), 1);
    assert_eq!(browser_closes.get(), 0);
    assert_eq!(storage_closes.get(), 1);

    let runs = reopen(&db_path).recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_is_retried() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    let mut catalog = Catalog::new(vec![manufacturer(
        "Apple",
        vec![device("iPhone 13", vec![action("Akku", "89 €")])],
    )]);
    catalog.navigation_failures = 2;

    let launcher = FakeLauncher::new(catalog);
    let (storage, _) = TrackedStorage::open(&db_path);

    let report = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await
        .unwrap();

    assert_eq!(report.prices_recorded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_gives_up_after_budget() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    // max-retries = 2 allows three attempts
    let mut catalog = Catalog::new(vec![]);
    catalog.navigation_failures = 3;

    let launcher = FakeLauncher::new(catalog);
    let browser_closes = launcher.closes.clone();
    let (storage, _) = TrackedStorage::open(&db_path);

    let result = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await;

    assert!(matches!(result, Err(CrawlError::Navigation { .. })));
    assert_eq!(browser_closes.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_max_manufacturers_truncates_list() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");
    let mut config = test_config(&db_path);
    config.crawler.max_manufacturers = Some(1);

    let launcher = FakeLauncher::new(three_manufacturers());
    let (storage, _) = TrackedStorage::open(&db_path);

    let report = Coordinator::new(config, "hash", launcher, storage)
        .run()
        .await
        .unwrap();

    assert_eq!(report.manufacturers_visited, 1);
    assert!(report.is_clean());

    let storage = reopen(&db_path);
    assert_eq!(storage.count_rows(CatalogTable::Manufacturers).unwrap(), 1);
    assert_eq!(storage.count_rows(CatalogTable::Prices).unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_second_run_appends_history() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    for _ in 0..2 {
        let catalog = Catalog::new(vec![manufacturer(
            "Apple",
            vec![device("iPhone 13", vec![action("Display", "€ 129,00")])],
        )]);
        let (storage, _) = TrackedStorage::open(&db_path);
        Coordinator::new(test_config(&db_path), "hash", FakeLauncher::new(catalog), storage)
            .run()
            .await
            .unwrap();
    }

    let storage = reopen(&db_path);
    assert_eq!(storage.count_rows(CatalogTable::Actions).unwrap(), 1);
    assert_eq!(storage.count_rows(CatalogTable::Prices).unwrap(), 2);

    let history = storage.price_history(1).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].date_collected < history[1].date_collected);
    assert_eq!(storage.recent_runs(10).unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_page_updates_are_not_read_stale() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    let events = ErrorEvents::default();
    let _subscriber = tracing::subscriber::set_default(
        tracing_subscriber::registry().with(events.clone()),
    );

    // The form changes 500ms after each selection, well after the request delay
    let mut catalog = three_manufacturers();
    catalog.update_delay = Duration::from_millis(500);
    let launcher = FakeLauncher::new(catalog);
    let interactions = launcher.interactions.clone();
    let (storage, _) = TrackedStorage::open(&db_path);

    let report = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await
        .unwrap();

    // Samsung never repopulates the device select; Apple's list must not pass for it
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path_display(), "Samsung");
    assert_eq!(events.messages().len(), 1);
    assert_eq!(report.manufacturers_visited, 2);
    assert_eq!(report.devices_visited, 3);
    assert_eq!(report.prices_recorded, 4);

    let storage = reopen(&db_path);
    assert_eq!(storage.count_rows(CatalogTable::Manufacturers).unwrap(), 2);
    assert_eq!(storage.count_rows(CatalogTable::Devices).unwrap(), 3);
    assert_eq!(price_of(&storage, 1, "iPhone 13", "Display"), vec![Some(12900)]);
    assert_eq!(price_of(&storage, 1, "iPhone 13", "Akku"), vec![Some(89)]);
    assert_eq!(price_of(&storage, 1, "iPad Air", "Ladebuchse"), vec![Some(69)]);
    assert_eq!(price_of(&storage, 2, "Pixel 7", "Kamera"), vec![None]);
    assert!(storage.find_device("Pixel 7", 1).unwrap().is_none());

    // Every price read waits out the request delay after its selection
    let gaps = action_select_to_read_gaps(&interactions);
    assert_eq!(gaps.len(), 4);
    assert!(gaps.iter().all(|gap| *gap >= Duration::from_millis(100)), "{:?}", gaps);
}

#[tokio::test(start_paused = true)]
async fn test_failed_price_insert_is_logged_and_walk_continues() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    let events = ErrorEvents::default();
    let _subscriber = tracing::subscriber::set_default(
        tracing_subscriber::registry().with(events.clone()),
    );

    let catalog = Catalog::new(vec![manufacturer(
        "Apple",
        vec![device(
            "iPhone 13",
            vec![
                action("Display", "129 €"),
                action("Akku", "89 €"),
                action("Kamera", "59 €"),
            ],
        )],
    )]);
    let launcher = FakeLauncher::new(catalog);
    let (storage, storage_closes) = TrackedStorage::open(&db_path);
    let storage = storage.failing_price_inserts_for("Akku");

    let report = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await
        .unwrap();

    assert_eq!(report.actions_visited, 3);
    assert_eq!(report.prices_recorded, 2);
    assert_eq!(report.price_write_failures, 1);
    assert!(report.failures.is_empty());
    assert!(!report.is_clean());
    assert_eq!(storage_closes.get(), 1);

    let errors = events.messages();
    assert_eq!(errors.len(), 1, "unexpected error events: {:?}", errors);
    assert!(errors[0].contains("Akku"));

    let storage = reopen(&db_path);
    assert_eq!(storage.count_rows(CatalogTable::Prices).unwrap(), 2);
    assert_eq!(price_of(&storage, 1, "iPhone 13", "Display"), vec![Some(129)]);
    assert!(price_of(&storage, 1, "iPhone 13", "Akku").is_empty());
    assert_eq!(price_of(&storage, 1, "iPhone 13", "Kamera"), vec![Some(59)]);

    let runs = storage.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_failing_action_is_skipped_and_logged_once() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("prices.db");

    let events = ErrorEvents::default();
    let _subscriber = tracing::subscriber::set_default(
        tracing_subscriber::registry().with(events.clone()),
    );

    let mut broken = action("Display", "129 €");
    broken.broken = true;
    let catalog = Catalog::new(vec![manufacturer(
        "Apple",
        vec![device("iPhone 13", vec![broken, action("Akku", "89 €")])],
    )]);
    let launcher = FakeLauncher::new(catalog);
    let (storage, _) = TrackedStorage::open(&db_path);

    let report = Coordinator::new(test_config(&db_path), "hash", launcher, storage)
        .run()
        .await
        .unwrap();

    assert_eq!(report.failures_at(NodeLevel::Action).count(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path_display(), "Apple > iPhone 13 > Display");
    assert_eq!(report.actions_visited, 1);
    assert_eq!(report.prices_recorded, 1);

    let errors = events.messages();
    assert_eq!(errors.len(), 1, "unexpected error events: {:?}", errors);
    assert!(errors[0].contains("Display"));

    let storage = reopen(&db_path);
    assert_eq!(price_of(&storage, 1, "iPhone 13", "Akku"), vec![Some(89)]);
    let device_id = storage.find_device("iPhone 13", 1).unwrap().unwrap();
    assert!(storage.find_action("Display", device_id).unwrap().is_none());
}
