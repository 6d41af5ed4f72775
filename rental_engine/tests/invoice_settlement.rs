use chrono::{Duration, Utc};
use futures_util::future::join_all;
use rental_engine::{
    db_types::{CopyStatus, LedgerEntryType, LedgerRef, Money, RentalStatus, TopupStatus},
    rental_objects::{InvoiceEvent, InvoiceStatus, SettlementOutcome},
    test_utils::{seed_book, seed_user, tear_down, MOCK_CALLBACK_TOKEN},
    AccountManagement,
    CatalogManagement,
    ErrorKind,
    InvoiceBookingError,
    SettlementError,
    WalletApiError,
};

mod support;
use support::{balance_of, replay_ledger, setup_apis};

fn paid_callback(invoice_id: &str) -> Vec<u8> {
    format!(r#"{{"id":"{invoice_id}","status":"PAID","external_id":"whatever","paid_amount":15000}}"#).into_bytes()
}

#[tokio::test]
async fn invoice_booking_is_activated_by_settlement() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "alice@example.com", 50_000).await;
    let book = seed_book(&apis.db, "Perahu Kertas", 15_000, 2).await;

    let booking = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();
    let due_in = booking.payment_due_at - Utc::now();
    assert!(due_in > Duration::hours(23) && due_in <= Duration::hours(24));
    assert!(booking.payment_link.contains(&booking.invoice_id));

    let requests = apis.gateway.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, Money::from(15_000));
    assert_eq!(requests[0].payer_email, "alice@example.com");
    assert_eq!(requests[0].expiry_seconds, 24 * 3600);
    assert!(requests[0].external_id.starts_with(&format!("rental:{}:{}:", user.id, book.id)));

    let rental = apis.db.fetch_rental(booking.rental_id).await.unwrap().unwrap();
    assert_eq!(rental.status, RentalStatus::Booked);
    assert_eq!(rental.external_invoice_id.as_deref(), Some(booking.invoice_id.as_str()));
    let copy = apis.db.fetch_copy(booking.copy_id).await.unwrap().unwrap();
    assert_eq!(copy.status, CopyStatus::Booked);
    assert_eq!(copy.booked_until, Some(booking.payment_due_at));
    // No money moves at booking time
    assert_eq!(balance_of(&apis.db, user.id).await, Money::from(50_000));

    let outcome =
        apis.settlement.handle_callback(MOCK_CALLBACK_TOKEN, &paid_callback(&booking.invoice_id)).await.unwrap();
    let SettlementOutcome::RentalActivated { rental, charge } = outcome else {
        panic!("Expected the rental to be activated, got {outcome:?}");
    };
    assert_eq!(rental.status, RentalStatus::Active);
    assert!(rental.activated_at.is_some());
    assert_eq!(charge.amount, Money::from(-15_000));
    assert_eq!(charge.reference, LedgerRef::Rental(booking.rental_id));

    let copy = apis.db.fetch_copy(booking.copy_id).await.unwrap().unwrap();
    assert_eq!(copy.status, CopyStatus::Rented);
    assert_eq!(balance_of(&apis.db, user.id).await, Money::from(35_000));

    // Duplicate delivery is acknowledged and changes nothing
    let outcome =
        apis.settlement.handle_callback(MOCK_CALLBACK_TOKEN, &paid_callback(&booking.invoice_id)).await.unwrap();
    assert!(outcome.is_duplicate());
    assert_eq!(balance_of(&apis.db, user.id).await, Money::from(35_000));
    let charges = apis
        .db
        .ledger_for_user(user.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.entry_type == LedgerEntryType::RentalCharge)
        .count();
    assert_eq!(charges, 1);
    assert_eq!(replay_ledger(&apis.db, user.id).await, Money::from(35_000));
    tear_down(apis.db).await;
}

#[tokio::test]
async fn topups_are_credited_exactly_once() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "bob@example.com", 0).await;

    let invoice = apis.wallet.create_topup(user.id, Money::from(25_000)).await.unwrap();
    let requests = apis.gateway.requests().await;
    assert_eq!(requests[0].description, "Wallet top-up");
    assert_eq!(requests[0].expiry_seconds, 3600);
    let topup = apis.db.fetch_topup(invoice.topup_id).await.unwrap().unwrap();
    assert_eq!(topup.status, TopupStatus::Pending);
    assert_eq!(apis.wallet.balance(user.id).await.unwrap(), Money::zero());

    let event = InvoiceEvent::new(invoice.invoice_id.clone(), InvoiceStatus::Paid);
    let outcome = apis.settlement.handle_settlement(event.clone()).await.unwrap();
    let SettlementOutcome::TopupCredited { topup_id, entry } = outcome else {
        panic!("Expected a top-up credit, got {outcome:?}");
    };
    assert_eq!(topup_id, invoice.topup_id);
    assert_eq!(entry.entry_type, LedgerEntryType::TopupConfirmed);
    assert_eq!(entry.reference, LedgerRef::Topup(invoice.topup_id));
    assert_eq!(entry.balance_after, Money::from(25_000));

    let outcome = apis.settlement.handle_settlement(event).await.unwrap();
    assert_eq!(outcome, SettlementOutcome::Duplicate);
    assert_eq!(apis.wallet.balance(user.id).await.unwrap(), Money::from(25_000));
    assert_eq!(apis.wallet.ledger(user.id).await.unwrap().len(), 1);
    let topup = apis.db.fetch_topup(invoice.topup_id).await.unwrap().unwrap();
    assert_eq!(topup.status, TopupStatus::Paid);
    assert!(topup.paid_at.is_some());
    tear_down(apis.db).await;
}

#[tokio::test]
async fn unpaid_statuses_are_acknowledged_without_changes() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "carol@example.com", 0).await;
    let invoice = apis.wallet.create_topup(user.id, Money::from(10_000)).await.unwrap();

    for status in ["EXPIRED", "PENDING"] {
        let body = format!(r#"{{"id":"{}","status":"{status}"}}"#, invoice.invoice_id);
        let outcome = apis.settlement.handle_callback(MOCK_CALLBACK_TOKEN, body.as_bytes()).await.unwrap();
        assert!(matches!(outcome, SettlementOutcome::Ignored(_)));
    }
    let topup = apis.db.fetch_topup(invoice.topup_id).await.unwrap().unwrap();
    assert_eq!(topup.status, TopupStatus::Pending);
    assert_eq!(balance_of(&apis.db, user.id).await, Money::zero());
    tear_down(apis.db).await;
}

#[tokio::test]
async fn bad_callbacks_are_rejected() {
    let apis = setup_apis().await;

    let err = apis.settlement.handle_callback("wrong-token", &paid_callback("inv-1")).await.unwrap_err();
    assert!(matches!(err, SettlementError::InvalidCallback));
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = apis.settlement.handle_callback(MOCK_CALLBACK_TOKEN, b"not json").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    let err = apis.settlement.handle_callback(MOCK_CALLBACK_TOKEN, br#"{"status":"PAID"}"#).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    let err = apis.settlement.handle_callback(MOCK_CALLBACK_TOKEN, br#"{"id":"","status":"PAID"}"#).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    let err = apis.settlement.handle_callback(MOCK_CALLBACK_TOKEN, br#"{"id":"inv-1","status":""}"#).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);

    let err = apis.settlement.handle_callback(MOCK_CALLBACK_TOKEN, &paid_callback("inv-404")).await.unwrap_err();
    assert!(matches!(err, SettlementError::UnmappedInvoice(ref id) if id == "inv-404"));
    assert_eq!(err.kind(), ErrorKind::Unmapped);
    tear_down(apis.db).await;
}

#[tokio::test]
async fn settlement_requires_funds_to_cover_the_rental() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "dave@example.com", 5_000).await;
    let book = seed_book(&apis.db, "Orang-Orang Biasa", 15_000, 1).await;
    let booking = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();

    let event = InvoiceEvent::new(booking.invoice_id.clone(), InvoiceStatus::Paid);
    let err = apis.settlement.handle_settlement(event.clone()).await.unwrap_err();
    match err {
        SettlementError::InsufficientFunds { rental_id, deficit, .. } => {
            assert_eq!(rental_id, booking.rental_id);
            assert_eq!(deficit, Money::from(10_000));
        },
        e => panic!("Unexpected error: {e}"),
    }
    let rental = apis.db.fetch_rental(booking.rental_id).await.unwrap().unwrap();
    assert_eq!(rental.status, RentalStatus::Booked);
    assert_eq!(apis.db.fetch_copy(booking.copy_id).await.unwrap().unwrap().status, CopyStatus::Booked);
    assert_eq!(balance_of(&apis.db, user.id).await, Money::from(5_000));

    // Once the wallet is topped up, a redelivery goes through
    apis.wallet.adjust_balance(user.id, Money::from(10_000), "goodwill").await.unwrap();
    let outcome = apis.settlement.handle_settlement(event).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::RentalActivated { .. }));
    assert_eq!(balance_of(&apis.db, user.id).await, Money::zero());
    tear_down(apis.db).await;
}

#[tokio::test]
async fn gateway_failure_books_nothing() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "erin@example.com", 0).await;
    let book = seed_book(&apis.db, "Pulang", 15_000, 1).await;
    apis.gateway.set_failing(true);

    let err = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap_err();
    assert!(matches!(err, InvoiceBookingError::GatewayError(_)));
    assert_eq!(apis.db.fetch_book(book.id).await.unwrap().unwrap().available_copies, 1);
    assert!(apis.db.rental_history(user.id).await.unwrap().is_empty());

    let err = apis.wallet.create_topup(user.id, Money::from(10_000)).await.unwrap_err();
    assert!(matches!(err, WalletApiError::GatewayError(_)));
    assert!(apis.db.topups_for_user(user.id).await.unwrap().is_empty());
    tear_down(apis.db).await;
}

#[tokio::test]
async fn invoice_booking_checks_stock_before_invoicing() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "frank@example.com", 0).await;
    let book = seed_book(&apis.db, "Sang Pemimpi", 15_000, 1).await;

    apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();
    let err = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap_err();
    assert!(matches!(err, InvoiceBookingError::NoStock(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(apis.gateway.invoices_issued(), 1);

    let err = apis.flow.create_invoice_booking(user.id, 9_999).await.unwrap_err();
    assert!(matches!(err, InvoiceBookingError::BookNotFound(9_999)));
    let err = apis.flow.create_invoice_booking(9_999, book.id).await.unwrap_err();
    assert!(matches!(err, InvoiceBookingError::UserNotFound(9_999)));
    tear_down(apis.db).await;
}

#[tokio::test]
async fn wallet_amounts_are_validated() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "grace@example.com", 1_000).await;

    let err = apis.wallet.create_topup(user.id, Money::zero()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadInput);
    let err = apis.wallet.create_topup(user.id, Money::from(-5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadInput);
    let err = apis.wallet.create_topup(9_999, Money::from(5_000)).await.unwrap_err();
    assert!(matches!(err, WalletApiError::UserNotFound(9_999)));

    let err = apis.wallet.adjust_balance(user.id, Money::from(-1_001), "too much").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentRequired);
    let entry = apis.wallet.adjust_balance(user.id, Money::from(-1_000), "refund").await.unwrap();
    assert_eq!(entry.balance_after, Money::zero());
    assert_eq!(entry.entry_type, LedgerEntryType::Adjustment);
    assert_eq!(replay_ledger(&apis.db, user.id).await, Money::zero());
    tear_down(apis.db).await;
}

const DELIVERIES: usize = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_topup_deliveries_credit_once() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "gita@example.com", 0).await;
    let topup = apis.wallet.create_topup(user.id, Money::from(25_000)).await.unwrap();

    let deliveries = (0..DELIVERIES).map(|_| {
        let event = InvoiceEvent::new(topup.invoice_id.clone(), InvoiceStatus::Paid);
        apis.settlement.handle_settlement(event)
    });
    let outcomes = join_all(deliveries).await.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>();

    let credited = outcomes.iter().filter(|o| matches!(o, SettlementOutcome::TopupCredited { .. })).count();
    let duplicates = outcomes.iter().filter(|o| o.is_duplicate()).count();
    assert_eq!(credited, 1);
    assert_eq!(duplicates, DELIVERIES - 1);

    let ledger = apis.db.ledger_for_user(user.id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].entry_type, LedgerEntryType::TopupConfirmed);
    assert_eq!(balance_of(&apis.db, user.id).await, Money::from(25_000));
    assert_eq!(replay_ledger(&apis.db, user.id).await, Money::from(25_000));
    let stored = apis.db.fetch_topup(topup.topup_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TopupStatus::Paid);
    tear_down(apis.db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_rental_deliveries_charge_once() {
    let apis = setup_apis().await;
    let user = seed_user(&apis.db, "hadi@example.com", 50_000).await;
    let book = seed_book(&apis.db, "Negeri 5 Menara", 15_000, 1).await;
    let booking = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();

    let deliveries = (0..DELIVERIES).map(|_| {
        let event = InvoiceEvent::new(booking.invoice_id.clone(), InvoiceStatus::Paid);
        apis.settlement.handle_settlement(event)
    });
    let outcomes = join_all(deliveries).await.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>();

    let activated = outcomes.iter().filter(|o| matches!(o, SettlementOutcome::RentalActivated { .. })).count();
    let duplicates = outcomes.iter().filter(|o| o.is_duplicate()).count();
    assert_eq!(activated, 1);
    assert_eq!(duplicates, DELIVERIES - 1);

    let ledger = apis.db.ledger_for_user(user.id).await.unwrap();
    let charges = ledger.iter().filter(|e| e.entry_type == LedgerEntryType::RentalCharge).count();
    assert_eq!(charges, 1);
    assert_eq!(balance_of(&apis.db, user.id).await, Money::from(35_000));
    assert_eq!(replay_ledger(&apis.db, user.id).await, Money::from(35_000));
    let rental = apis.db.fetch_rental(booking.rental_id).await.unwrap().unwrap();
    assert_eq!(rental.status, RentalStatus::Active);
    assert_eq!(apis.db.fetch_copy(booking.copy_id).await.unwrap().unwrap().status, CopyStatus::Rented);
    tear_down(apis.db).await;
}
