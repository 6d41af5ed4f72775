use log::*;
use rental_engine::events::{
    ActivationSource,
    BookingExpiredEvent,
    EventHandlers,
    EventHooks,
    RentalActivatedEvent,
    RentalReturnedEvent,
    TopupCreditedEvent,
};

/// Assigns the host's event handlers.
///
/// The host has no downstream integrations, so every hook writes an audit line to the log:
///
/// 1. RentalActivatedEvent - a rental was paid from the wallet deposit, or its invoice was settled.
/// 2. RentalReturnedEvent - a copy is back on the shelf.
/// 3. TopupCreditedEvent - a wallet top-up invoice was paid and the balance credited.
/// 4. BookingExpiredEvent - the sweeper canceled an unpaid booking and released its copy.
pub fn create_audit_event_handlers(buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_rental_activated(|ev| {
        let RentalActivatedEvent { rental, source } = ev;
        let how = match source {
            ActivationSource::Deposit => "paid from deposit",
            ActivationSource::Settlement => "invoice settled",
        };
        Box::pin(async move {
            info!(
                "📬️ Rental #{} activated ({how}). User #{} has copy #{} for {}.",
                rental.id, rental.user_id, rental.copy_id, rental.rental_cost
            );
        })
    });
    hooks.on_rental_returned(|ev: RentalReturnedEvent| {
        Box::pin(async move {
            info!("📬️ Rental #{} returned. Copy #{} is available again.", ev.rental.id, ev.rental.copy_id);
        })
    });
    hooks.on_topup_credited(|ev: TopupCreditedEvent| {
        Box::pin(async move {
            info!(
                "📬️ Top-up #{} credited {} to user #{}. Balance is now {}.",
                ev.topup.id, ev.entry.amount, ev.topup.user_id, ev.entry.balance_after
            );
        })
    });
    hooks.on_booking_expired(|ev: BookingExpiredEvent| {
        Box::pin(async move {
            warn!(
                "📬️ Booking #{} for user #{} was not paid by {}. Copy #{} released.",
                ev.rental.id, ev.rental.user_id, ev.rental.payment_due_at, ev.rental.copy_id
            );
        })
    });
    EventHandlers::new(buffer_size, hooks)
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn every_event_has_an_audit_hook() {
        let handlers = create_audit_event_handlers(4);
        let producers = handlers.producers();
        assert_eq!(producers.rental_activated_producer.len(), 1);
        assert_eq!(producers.rental_returned_producer.len(), 1);
        assert_eq!(producers.topup_credited_producer.len(), 1);
        assert_eq!(producers.booking_expired_producer.len(), 1);
        handlers.start_handlers().await;
    }
}
