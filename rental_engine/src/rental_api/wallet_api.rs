use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{LedgerEntry, LedgerEntryType, LedgerRef, Money, NewTopup, WalletTopup},
    helpers::topup_external_id,
    rental_api::{errors::WalletApiError, rental_objects::TopupInvoice},
    traits::{AccountManagement, InvoiceRequest, PaymentGateway, RentalStore, StoreTransaction},
};

pub const DEFAULT_TOPUP_EXPIRY_SECS: u32 = 3600;

/// `WalletApi` manages user deposits: top-up invoices, balance queries, the ledger and manual adjustments.
pub struct WalletApi<B, G> {
    db: B,
    gateway: G,
    topup_expiry_secs: u32,
}

impl<B: Debug, G> Debug for WalletApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B, G> WalletApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway, topup_expiry_secs: DEFAULT_TOPUP_EXPIRY_SECS }
    }

    pub fn with_topup_expiry(mut self, seconds: u32) -> Self {
        self.topup_expiry_secs = seconds;
        self
    }
}

impl<B, G> WalletApi<B, G>
where
    B: RentalStore + AccountManagement,
    G: PaymentGateway,
{
    /// Requests a top-up invoice from the gateway and records it as a PENDING top-up. The wallet is only credited
    /// once the gateway reports the invoice as paid.
    pub async fn create_topup(&self, user_id: i64, amount: Money) -> Result<TopupInvoice, WalletApiError> {
        if !amount.is_positive() {
            return Err(WalletApiError::InvalidAmount(amount));
        }
        let user = self.db.fetch_user(user_id).await?.ok_or(WalletApiError::UserNotFound(user_id))?;
        let request = InvoiceRequest {
            external_id: topup_external_id(user_id),
            amount,
            payer_email: user.email,
            description: "Wallet top-up".to_string(),
            expiry_seconds: self.topup_expiry_secs,
        };
        let invoice = self.gateway.create_invoice(request).await?;
        let topup = NewTopup {
            user_id,
            amount,
            external_invoice_id: invoice.invoice_id.clone(),
            payment_link: invoice.invoice_url.clone(),
            expires_at: invoice.expires_at,
        };
        let mut tx = self.db.begin().await?;
        let topup = tx.insert_topup(topup).await?;
        tx.commit().await?;
        info!("🔄️👛️ Top-up #{} of {amount} for user #{user_id} awaits payment of invoice {}", topup.id, invoice.invoice_id);
        Ok(TopupInvoice {
            topup_id: topup.id,
            invoice_id: invoice.invoice_id,
            payment_link: invoice.invoice_url,
            expires_at: invoice.expires_at,
        })
    }

    pub async fn balance(&self, user_id: i64) -> Result<Money, WalletApiError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(WalletApiError::UserNotFound(user_id))?;
        Ok(user.balance)
    }

    /// The user's ledger, most recent entry first.
    pub async fn ledger(&self, user_id: i64) -> Result<Vec<LedgerEntry>, WalletApiError> {
        let entries = self.db.ledger_for_user(user_id).await?;
        Ok(entries)
    }

    pub async fn topups(&self, user_id: i64) -> Result<Vec<WalletTopup>, WalletApiError> {
        let topups = self.db.topups_for_user(user_id).await?;
        Ok(topups)
    }

    /// Credits (positive `amount`) or debits (negative `amount`) the user's balance and records an ADJUSTMENT entry.
    /// A debit can never take the balance below zero.
    pub async fn adjust_balance(&self, user_id: i64, amount: Money, note: &str) -> Result<LedgerEntry, WalletApiError> {
        if amount == Money::zero() {
            return Err(WalletApiError::InvalidAmount(amount));
        }
        let mut tx = self.db.begin().await?;
        let balance = tx.lock_balance(user_id).await?.ok_or(WalletApiError::UserNotFound(user_id))?;
        if (balance + amount).is_negative() {
            return Err(WalletApiError::InsufficientFunds { balance, amount: -amount });
        }
        let entry =
            tx.post_ledger_entry(user_id, balance, amount, LedgerEntryType::Adjustment, LedgerRef::Adjustment).await?;
        tx.commit().await?;
        info!("🔄️👛️ Balance of user #{user_id} adjusted by {amount} to {}. Note: {note}", entry.balance_after);
        Ok(entry)
    }
}

