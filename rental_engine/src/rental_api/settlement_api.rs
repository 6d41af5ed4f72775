use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{CopyStatus, LedgerEntryType, LedgerRef, Rental, RentalStatus, TopupStatus, WalletTopup},
    events::{ActivationSource, EventProducers, RentalActivatedEvent, TopupCreditedEvent},
    helpers::parse_external_id,
    rental_api::{
        errors::SettlementError,
        rental_objects::{InvoiceEvent, InvoiceStatus, SettlementOutcome},
    },
    traits::{PaymentGateway, RentalStore, StoreError, StoreTransaction},
};

/// `SettlementApi` reconciles invoice status notifications from the payment gateway with local state.
///
/// The gateway delivers notifications at least once, so every path here is idempotent: a notification for an invoice
/// that has already been settled is acknowledged with [`SettlementOutcome::Duplicate`] and changes nothing. An invoice
/// id belongs either to a wallet top-up or to a rental. Top-ups are checked first.
pub struct SettlementApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for SettlementApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B, G> SettlementApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> SettlementApi<B, G>
where
    B: RentalStore,
    G: PaymentGateway,
{
    /// Entry point for raw gateway callbacks. The callback is verified before its body is even decoded.
    pub async fn handle_callback(
        &self,
        signature_header: &str,
        raw_body: &[u8],
    ) -> Result<SettlementOutcome, SettlementError> {
        if !self.gateway.verify_callback(signature_header, raw_body) {
            warn!("🔄️💳️ Rejected an invoice callback that failed verification");
            return Err(SettlementError::InvalidCallback);
        }
        let event = serde_json::from_slice::<InvoiceEvent>(raw_body).map_err(|e| {
            error!("🔄️💳️ Could not decode invoice callback: {e}");
            SettlementError::MalformedEvent(e.to_string())
        })?;
        self.handle_settlement(event).await
    }

    /// Applies a decoded invoice event.
    pub async fn handle_settlement(&self, event: InvoiceEvent) -> Result<SettlementOutcome, SettlementError> {
        let invoice_id = event.invoice_id.trim();
        if invoice_id.is_empty() {
            error!("🔄️💳️ Invoice event without an invoice id: {event:?}");
            return Err(SettlementError::MalformedEvent("The invoice id is missing".into()));
        }
        match &event.status {
            InvoiceStatus::Paid => {},
            InvoiceStatus::Other(s) if s.trim().is_empty() => {
                error!("🔄️💳️ Invoice event without a status for invoice {invoice_id}");
                return Err(SettlementError::MalformedEvent("The invoice status is missing".into()));
            },
            status => {
                debug!("🔄️💳️ Invoice {invoice_id} is now {}. Nothing to do.", String::from(status.clone()));
                return Ok(SettlementOutcome::Ignored(status.clone()));
            },
        }
        trace!("🔄️💳️ Settling paid invoice {invoice_id}");
        if let Some(topup) = self.db.find_topup_by_external_invoice(invoice_id).await? {
            return self.settle_topup(topup).await;
        }
        match self.db.find_rental_by_external_invoice(invoice_id).await? {
            Some(rental) => self.settle_rental(rental).await,
            None => {
                let owner = event.external_id.as_deref().and_then(parse_external_id);
                error!(
                    "🔄️💳️ Invoice {invoice_id} (external id {:?}, owner {owner:?}) was paid, but it matches neither a \
                     top-up nor a rental. This payment needs to be reconciled by hand.",
                    event.external_id
                );
                Err(SettlementError::UnmappedInvoice(invoice_id.to_string()))
            },
        }
    }

    async fn settle_topup(&self, mut topup: WalletTopup) -> Result<SettlementOutcome, SettlementError> {
        match topup.status {
            TopupStatus::Paid => {
                debug!("🔄️💳️ Top-up #{} has already been credited. Ignoring duplicate delivery.", topup.id);
                return Ok(SettlementOutcome::Duplicate);
            },
            TopupStatus::Pending => {},
            status => {
                warn!("🔄️💳️ Payment received for top-up #{}, which is {status}. It will not be credited.", topup.id);
                return Ok(SettlementOutcome::Duplicate);
            },
        }
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let Some(entry) = tx.mark_topup_paid_and_credit(topup.id, topup.user_id, topup.amount, now).await? else {
            debug!("🔄️💳️ Top-up #{} was settled by a concurrent delivery", topup.id);
            return Ok(SettlementOutcome::Duplicate);
        };
        tx.commit().await?;
        info!(
            "🔄️💳️ Top-up #{} paid. {} credited to user #{}. Balance is now {}",
            topup.id, topup.amount, topup.user_id, entry.balance_after
        );
        topup.status = TopupStatus::Paid;
        topup.paid_at = Some(now);
        let topup_id = topup.id;
        self.producers.publish_topup_credited(TopupCreditedEvent::new(topup, entry.clone())).await;
        Ok(SettlementOutcome::TopupCredited { topup_id, entry })
    }

    async fn settle_rental(&self, rental: Rental) -> Result<SettlementOutcome, SettlementError> {
        if let Some(outcome) = already_settled(&rental)? {
            return Ok(outcome);
        }
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let balance = tx
            .lock_balance(rental.user_id)
            .await?
            .ok_or_else(|| StoreError::MissingRecord(format!("user #{}", rental.user_id)))?;
        let mut rental = tx
            .lock_rental(rental.id)
            .await?
            .ok_or_else(|| StoreError::MissingRecord(format!("rental #{}", rental.id)))?;
        if let Some(outcome) = already_settled(&rental)? {
            return Ok(outcome);
        }
        let price = rental.rental_cost;
        if balance < price {
            error!(
                "🔄️💳️ Invoice for rental #{} was paid, but user #{} only has {balance} to cover the {price} charge",
                rental.id, rental.user_id
            );
            return Err(SettlementError::InsufficientFunds {
                rental_id: rental.id,
                balance,
                price,
                deficit: price - balance,
            });
        }
        if !tx.activate_rental(rental.id, now).await? {
            debug!("🔄️💳️ Rental #{} was settled by a concurrent delivery", rental.id);
            return Ok(SettlementOutcome::Duplicate);
        }
        tx.set_copy_status(rental.copy_id, CopyStatus::Rented, None).await?;
        let charge = tx
            .post_ledger_entry(
                rental.user_id,
                balance,
                -price,
                LedgerEntryType::RentalCharge,
                LedgerRef::Rental(rental.id),
            )
            .await?;
        tx.commit().await?;
        rental.status = RentalStatus::Active;
        rental.paid_at = Some(now);
        rental.activated_at = Some(now);
        info!("🔄️💳️ Rental #{} paid and activated. Copy #{} is rented out.", rental.id, rental.copy_id);
        self.producers
            .publish_rental_activated(RentalActivatedEvent::new(rental.clone(), ActivationSource::Settlement))
            .await;
        Ok(SettlementOutcome::RentalActivated { rental, charge })
    }
}

/// `Some(Duplicate)` if the rental's payment has already been applied, an error if it can no longer be applied, and
/// `None` if the rental is still waiting for payment.
fn already_settled(rental: &Rental) -> Result<Option<SettlementOutcome>, SettlementError> {
    match rental.status {
        RentalStatus::Booked => Ok(None),
        RentalStatus::Paid | RentalStatus::Active | RentalStatus::Returned => {
            debug!("🔄️💳️ Rental #{} is already {}. Ignoring duplicate delivery.", rental.id, rental.status);
            Ok(Some(SettlementOutcome::Duplicate))
        },
        RentalStatus::Canceled => {
            error!(
                "🔄️💳️ Payment arrived for rental #{}, which was canceled at {:?}. The copy has been released, so the \
                 payment needs to be reconciled by hand.",
                rental.id, rental.canceled_at
            );
            Err(SettlementError::RentalCanceled(rental.id))
        },
    }
}
