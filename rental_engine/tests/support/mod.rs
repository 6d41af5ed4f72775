#![allow(dead_code)]
use rental_engine::{
    db_types::{LedgerEntry, Money},
    events::EventProducers,
    test_utils::{prepare_test_env, random_db_path, MockGateway},
    AccountManagement,
    RentalFlowApi,
    SettlementApi,
    SqliteDatabase,
    WalletApi,
};

pub async fn setup() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub struct Apis {
    pub db: SqliteDatabase,
    pub gateway: MockGateway,
    pub flow: RentalFlowApi<SqliteDatabase, MockGateway>,
    pub settlement: SettlementApi<SqliteDatabase, MockGateway>,
    pub wallet: WalletApi<SqliteDatabase, MockGateway>,
}

pub async fn setup_apis() -> Apis {
    let db = setup().await;
    apis_for(db, EventProducers::default())
}

pub fn apis_for(db: SqliteDatabase, producers: EventProducers) -> Apis {
    let gateway = MockGateway::new();
    let flow = RentalFlowApi::new(db.clone(), gateway.clone(), producers.clone());
    let settlement = SettlementApi::new(db.clone(), gateway.clone(), producers);
    let wallet = WalletApi::new(db.clone(), gateway.clone());
    Apis { db, gateway, flow, settlement, wallet }
}

/// Replays the user's ledger oldest-first and checks every running total, returning the final balance.
pub async fn replay_ledger(db: &SqliteDatabase, user_id: i64) -> Money {
    let mut entries: Vec<LedgerEntry> = db.ledger_for_user(user_id).await.expect("Error fetching ledger");
    entries.reverse();
    let mut balance = Money::zero();
    for entry in entries {
        balance += entry.amount;
        assert_eq!(balance, entry.balance_after, "Ledger entry #{} does not replay", entry.id);
    }
    balance
}

pub async fn balance_of(db: &SqliteDatabase, user_id: i64) -> Money {
    db.fetch_user(user_id).await.expect("Error fetching user").expect("No such user").balance
}
