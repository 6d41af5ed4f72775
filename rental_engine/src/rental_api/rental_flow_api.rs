use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{
        CopyStatus,
        HoldDuration,
        LedgerEntryType,
        LedgerRef,
        NewRental,
        Rental,
        RentalFunding,
        RentalStatus,
    },
    events::{ActivationSource, EventProducers, RentalActivatedEvent, RentalReturnedEvent},
    helpers::rental_external_id,
    rental_api::{
        errors::{BookingError, InvoiceBookingError, ReturnError},
        rental_objects::{BookingReceipt, InvoiceBooking},
    },
    traits::{
        AccountManagement,
        CatalogManagement,
        HistoryEntry,
        InvoiceRequest,
        PaymentGateway,
        RentalStore,
        StoreError,
        StoreTransaction,
    },
};

pub const DEFAULT_INVOICE_EXPIRY_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy)]
pub struct RentalFlowOptions {
    /// How long an invoice-funded booking holds its copy while waiting for payment.
    pub invoice_expiry: Duration,
}

impl Default for RentalFlowOptions {
    fn default() -> Self {
        Self { invoice_expiry: Duration::hours(DEFAULT_INVOICE_EXPIRY_HOURS) }
    }
}

/// `RentalFlowApi` is the primary API for booking and returning rentals.
///
/// Every operation that changes state runs inside a single store transaction. If any step fails, the transaction is
/// dropped and nothing is applied.
pub struct RentalFlowApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    options: RentalFlowOptions,
}

impl<B, G> Debug for RentalFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RentalFlowApi")
    }
}

impl<B, G> RentalFlowApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers, options: RentalFlowOptions::default() }
    }

    pub fn with_options(mut self, options: RentalFlowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B, G> RentalFlowApi<B, G>
where
    B: RentalStore + CatalogManagement + AccountManagement,
    G: PaymentGateway,
{
    /// Books a copy of the book and pays for it from the user's deposit.
    ///
    /// The user's balance is locked before a copy is claimed. Copy selection skips copies that concurrent bookings
    /// are busy claiming, so simultaneous bookings of the same title each get a different copy, and the booking fails
    /// with [`BookingError::NoStock`] once every copy is taken.
    ///
    /// The rental is created ACTIVE and its copy RENTED. A non-zero `hold` is recorded as the rental's due time.
    pub async fn book_with_deposit(
        &self,
        user_id: i64,
        book_id: i64,
        hold: HoldDuration,
    ) -> Result<BookingReceipt, BookingError> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let balance = tx.lock_balance(user_id).await?.ok_or(BookingError::UserNotFound(user_id))?;
        let price = tx.book_price(book_id).await?.ok_or(BookingError::BookNotFound(book_id))?;
        if balance < price {
            debug!("🔄️📚️ User #{user_id} cannot afford book #{book_id}. Balance {balance}, price {price}");
            return Err(BookingError::InsufficientFunds { balance, price, deficit: price - balance });
        }
        let deadline = hold.deadline_from(now);
        let copy_id = tx
            .claim_available_copy(book_id, CopyStatus::Rented, deadline)
            .await?
            .ok_or(BookingError::NoStock(book_id))?;
        let new_rental = NewRental {
            user_id,
            book_id,
            copy_id,
            rental_cost: price,
            booked_at: now,
            payment_due_at: deadline.unwrap_or(now),
            funding: RentalFunding::Deposit,
        };
        let rental = tx.insert_rental(new_rental).await?;
        let charge = tx
            .post_ledger_entry(user_id, balance, -price, LedgerEntryType::RentalCharge, LedgerRef::Rental(rental.id))
            .await?;
        tx.commit().await?;
        info!(
            "🔄️📚️ User #{user_id} rented copy #{copy_id} of book #{book_id} for {price}. Rental #{} is active.",
            rental.id
        );
        let event = RentalActivatedEvent::new(rental.clone(), ActivationSource::Deposit);
        self.producers.publish_rental_activated(event).await;
        Ok(BookingReceipt { rental, charge })
    }

    /// Books a copy of the book, to be paid for through an external invoice.
    ///
    /// The invoice is requested *before* the booking transaction starts, so a slow gateway never holds a copy
    /// claim open. The copy is held as BOOKED until the invoice expires; settlement (see
    /// [`crate::SettlementApi`]) activates the rental, and the expiry sweeper releases it if no payment arrives.
    pub async fn create_invoice_booking(
        &self,
        user_id: i64,
        book_id: i64,
    ) -> Result<InvoiceBooking, InvoiceBookingError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(InvoiceBookingError::UserNotFound(user_id))?;
        let book = self.db.fetch_book(book_id).await?.ok_or(InvoiceBookingError::BookNotFound(book_id))?;
        if book.available_copies == 0 {
            return Err(InvoiceBookingError::NoStock(book_id));
        }
        let expiry = self.options.invoice_expiry;
        let request = InvoiceRequest {
            external_id: rental_external_id(user_id, book_id),
            amount: book.rental_cost,
            payer_email: user.email,
            description: format!("Rental of \"{}\"", book.name),
            expiry_seconds: u32::try_from(expiry.num_seconds().max(0)).unwrap_or(u32::MAX),
        };
        let now = Utc::now();
        let invoice = self.gateway.create_invoice(request).await?;
        debug!("🔄️🧾️ Invoice {} issued for user #{user_id}, book #{book_id}", invoice.invoice_id);
        let payment_due_at = now + expiry;

        let mut tx = self.db.begin().await?;
        let Some(copy_id) = tx.claim_available_copy(book_id, CopyStatus::Booked, Some(payment_due_at)).await? else {
            warn!(
                "🔄️🧾️ Book #{book_id} ran out of stock after invoice {} was issued. The invoice will not be honoured.",
                invoice.invoice_id
            );
            return Err(InvoiceBookingError::NoStock(book_id));
        };
        let new_rental = NewRental {
            user_id,
            book_id,
            copy_id,
            rental_cost: book.rental_cost,
            booked_at: now,
            payment_due_at,
            funding: RentalFunding::Invoice {
                invoice_id: invoice.invoice_id.clone(),
                payment_link: invoice.invoice_url.clone(),
            },
        };
        let rental = tx.insert_rental(new_rental).await?;
        tx.commit().await?;
        info!(
            "🔄️🧾️ Copy #{copy_id} of book #{book_id} is booked for user #{user_id} until {payment_due_at}. Rental #{} \
             awaits payment of invoice {}",
            rental.id, invoice.invoice_id
        );
        Ok(InvoiceBooking {
            rental_id: rental.id,
            copy_id,
            invoice_id: invoice.invoice_id,
            payment_link: invoice.invoice_url,
            payment_due_at,
        })
    }

    /// Returns an active rental. Only the user that holds the rental may return it, and the copy goes back on the
    /// shelf.
    pub async fn return_rental(&self, user_id: i64, rental_id: i64) -> Result<Rental, ReturnError> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut rental = tx.lock_rental(rental_id).await?.ok_or(ReturnError::NotFound(rental_id))?;
        if rental.user_id != user_id {
            warn!("🔄️📦️ User #{user_id} tried to return rental #{rental_id}, which belongs to user #{}", rental.user_id);
            return Err(ReturnError::NotOwner { rental_id, user_id });
        }
        if rental.status != RentalStatus::Active {
            debug!("🔄️📦️ Rental #{rental_id} cannot be returned. It is {}", rental.status);
            return Err(ReturnError::NotActive(rental_id));
        }
        tx.mark_rental_returned(rental_id, now).await?;
        tx.set_copy_status(rental.copy_id, CopyStatus::Available, None).await?;
        tx.commit().await?;
        rental.status = RentalStatus::Returned;
        rental.returned_at = Some(now);
        info!("🔄️📦️ Rental #{rental_id} returned. Copy #{} is available again.", rental.copy_id);
        self.producers.publish_rental_returned(RentalReturnedEvent::new(rental.clone())).await;
        Ok(rental)
    }

    /// The user's rentals, most recent first.
    pub async fn my_history(&self, user_id: i64) -> Result<Vec<HistoryEntry>, StoreError> {
        self.db.rental_history(user_id).await
    }
}
