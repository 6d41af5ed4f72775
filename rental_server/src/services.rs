use rental_engine::{
    events::EventProducers,
    AccountApi,
    AccountManagement,
    CatalogApi,
    CatalogManagement,
    ExpiryApi,
    PaymentGateway,
    RentalFlowApi,
    RentalStore,
    SettlementApi,
    WalletApi,
};

use crate::config::ServerConfig;

/// Every engine API, wired to one database, one payment gateway and one set of event producers.
///
/// This is the surface that a request layer calls after it has authenticated the caller and validated the request.
pub struct RentalServices<B, G> {
    pub rentals: RentalFlowApi<B, G>,
    pub settlement: SettlementApi<B, G>,
    pub wallet: WalletApi<B, G>,
    pub catalog: CatalogApi<B>,
    pub accounts: AccountApi<B>,
    pub expiry: ExpiryApi<B>,
}

impl<B, G> RentalServices<B, G>
where
    B: RentalStore + CatalogManagement + AccountManagement,
    G: PaymentGateway,
{
    pub fn new(db: B, gateway: G, producers: EventProducers, config: &ServerConfig) -> Self {
        let rentals = RentalFlowApi::new(db.clone(), gateway.clone(), producers.clone())
            .with_options(config.rental_flow_options());
        let settlement = SettlementApi::new(db.clone(), gateway.clone(), producers.clone());
        let wallet = WalletApi::new(db.clone(), gateway).with_topup_expiry(config.topup_expiry_secs);
        let catalog = CatalogApi::new(db.clone());
        let accounts = AccountApi::new(db.clone());
        let expiry = ExpiryApi::new(db, producers);
        Self { rentals, settlement, wallet, catalog, accounts, expiry }
    }
}
