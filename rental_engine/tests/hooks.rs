use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use futures_util::FutureExt;
use log::*;
use rental_engine::{
    db_types::{HoldDuration, Money},
    events::{ActivationSource, EventHandlers, EventHooks},
    rental_objects::{InvoiceEvent, InvoiceStatus},
    test_utils::{seed_book, seed_user, tear_down},
    ExpiryApi,
};

mod support;
use support::{apis_for, setup};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::SeqCst)
    }
}

async fn wait_for(hook: &HookCalled, expected: i32) {
    for _ in 0..50 {
        if hook.count() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn hooks_fire_after_each_committed_change() {
    let activated = HookCalled::default();
    let from_settlement = HookCalled::default();
    let returned = HookCalled::default();
    let credited = HookCalled::default();
    let expired = HookCalled::default();

    let mut hooks = EventHooks::default();
    let (a, s) = (activated.clone(), from_settlement.clone());
    hooks.on_rental_activated(move |ev| {
        info!("🪝️ Rental #{} activated", ev.rental.id);
        a.called();
        if ev.source == ActivationSource::Settlement {
            s.called();
        }
        async {}.boxed()
    });
    let r = returned.clone();
    hooks.on_rental_returned(move |_| {
        r.called();
        async {}.boxed()
    });
    let c = credited.clone();
    hooks.on_topup_credited(move |ev| {
        assert_eq!(ev.entry.amount, ev.topup.amount);
        c.called();
        async {}.boxed()
    });
    let e = expired.clone();
    hooks.on_booking_expired(move |_| {
        e.called();
        async {}.boxed()
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let db = setup().await;
    let apis = apis_for(db.clone(), producers.clone());
    let sweeper = ExpiryApi::new(db.clone(), producers);
    let user = seed_user(&db, "alice@example.com", 50_000).await;
    let book = seed_book(&db, "Lelaki Harimau", 10_000, 3).await;

    let receipt = apis.flow.book_with_deposit(user.id, book.id, HoldDuration::default()).await.unwrap();
    apis.flow.return_rental(user.id, receipt.rental_id()).await.unwrap();
    // A failed booking must not fire anything
    assert!(apis.flow.book_with_deposit(user.id, 9_999, HoldDuration::default()).await.is_err());

    let booking = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();
    apis.settlement.handle_settlement(InvoiceEvent::new(booking.invoice_id.clone(), InvoiceStatus::Paid)).await.unwrap();
    // A duplicate delivery must not fire anything either
    apis.settlement.handle_settlement(InvoiceEvent::new(booking.invoice_id, InvoiceStatus::Paid)).await.unwrap();

    let topup = apis.wallet.create_topup(user.id, Money::from(5_000)).await.unwrap();
    apis.settlement.handle_settlement(InvoiceEvent::new(topup.invoice_id, InvoiceStatus::Paid)).await.unwrap();

    apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();
    sweeper.release_expired_bookings_at(Utc::now() + chrono::Duration::days(2)).await.unwrap();

    wait_for(&activated, 2).await;
    wait_for(&returned, 1).await;
    wait_for(&credited, 1).await;
    wait_for(&expired, 1).await;
    // Give any stray events a chance to arrive
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(activated.count(), 2);
    assert_eq!(from_settlement.count(), 1);
    assert_eq!(returned.count(), 1);
    assert_eq!(credited.count(), 1);
    assert_eq!(expired.count(), 1);
    tear_down(db).await;
}
