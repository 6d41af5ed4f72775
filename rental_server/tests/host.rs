use std::time::Duration;

use rental_engine::{
    db_types::{CopyStatus, RentalStatus},
    events::EventProducers,
    test_utils::{prepare_test_env, random_db_path, seed_book, seed_user, tear_down, MockGateway},
    AccountManagement,
    CatalogManagement,
    Money,
    RentalStore,
    SqliteDatabase,
};
use rental_server::{
    config::ServerConfig,
    expiry_worker::run_sweep,
    server::{open_database, RentalServer},
    services::RentalServices,
};

async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[tokio::test]
async fn services_use_configured_expiries() {
    let db = setup().await;
    let gateway = MockGateway::new();
    let config =
        ServerConfig { invoice_expiry: chrono::Duration::hours(2), topup_expiry_secs: 600, ..Default::default() };
    let services = RentalServices::new(db.clone(), gateway.clone(), EventProducers::default(), &config);
    let user = seed_user(&db, "dewi@example.com", 0).await;
    let book = seed_book(&db, "Cantik Itu Luka", 12_000, 1).await;

    let booking = services.rentals.create_invoice_booking(user.id, book.id).await.unwrap();
    let hold = booking.payment_due_at - chrono::Utc::now();
    assert!(hold <= chrono::Duration::hours(2) && hold > chrono::Duration::minutes(119));
    services.wallet.create_topup(user.id, Money::from(50_000)).await.unwrap();

    let requests = gateway.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].expiry_seconds, 7200);
    assert_eq!(requests[1].expiry_seconds, 600);
    tear_down(db).await;
}

#[tokio::test]
async fn sweep_releases_lapsed_bookings() {
    let db = setup().await;
    let config = ServerConfig { invoice_expiry: chrono::Duration::milliseconds(1), ..Default::default() };
    let services = RentalServices::new(db.clone(), MockGateway::new(), EventProducers::default(), &config);
    let user = seed_user(&db, "eko@example.com", 0).await;
    let book = seed_book(&db, "Ronggeng Dukuh Paruk", 9_000, 1).await;
    let booking = services.rentals.create_invoice_booking(user.id, book.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = run_sweep(&services.expiry).await.unwrap();
    assert_eq!(result.canceled_count(), 1);
    assert_eq!(result.released_copies, vec![booking.copy_id]);
    let rental = db.fetch_rental(booking.rental_id).await.unwrap().unwrap();
    assert_eq!(rental.status, RentalStatus::Canceled);
    assert_eq!(db.fetch_copy(booking.copy_id).await.unwrap().unwrap().status, CopyStatus::Available);

    let result = run_sweep(&services.expiry).await.unwrap();
    assert!(result.is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn fresh_databases_are_created_and_migrated() {
    let _ = env_logger::try_init();
    let config = ServerConfig { database_url: random_db_path(), max_connections: 2, ..Default::default() };
    let db = open_database(&config).await.unwrap();
    let user = seed_user(&db, "fajar@example.com", 1_000).await;
    assert_eq!(db.fetch_user(user.id).await.unwrap().unwrap().balance, Money::from(1_000));
    // Opening again must not wipe the data
    let mut again = open_database(&config).await.unwrap();
    assert!(again.fetch_user(user.id).await.unwrap().is_some());
    again.close().await.unwrap();
    tear_down(db).await;
}

#[tokio::test]
async fn server_starts_and_stops() {
    let _ = env_logger::try_init();
    let config = ServerConfig {
        database_url: random_db_path(),
        max_connections: 2,
        sweep_interval: Duration::from_millis(50),
        ..Default::default()
    };
    let server = RentalServer::start(config).await.unwrap();
    let db = server.database().clone();
    let book = seed_book(&db, "Bumi Manusia", 20_000, 3).await;
    let listed = server.services.catalog.list_books().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, book.id);
    tokio::time::sleep(Duration::from_millis(120)).await;
    server.shutdown().await.unwrap();
    tear_down(db).await;
}

#[tokio::test]
async fn invalid_config_is_rejected_at_startup() {
    let config = ServerConfig { max_connections: 0, ..Default::default() };
    assert!(RentalServer::start(config).await.is_err());
}
