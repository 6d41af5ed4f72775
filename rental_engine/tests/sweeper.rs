use chrono::{Duration, Utc};
use rental_engine::{
    db_types::{CopyStatus, HoldDuration, Money, RentalStatus},
    events::EventProducers,
    rental_objects::{InvoiceEvent, InvoiceStatus},
    test_utils::{seed_book, seed_user, tear_down},
    AccountManagement,
    CatalogManagement,
    ErrorKind,
    ExpiryApi,
    RentalStore,
    SettlementError,
    StoreTransaction,
};

mod support;
use support::{balance_of, setup_apis};

#[tokio::test]
async fn unpaid_bookings_are_released_once() {
    let apis = setup_apis().await;
    let sweeper = ExpiryApi::new(apis.db.clone(), EventProducers::default());
    let user = seed_user(&apis.db, "alice@example.com", 0).await;
    let book = seed_book(&apis.db, "Laut Bercerita", 15_000, 2).await;
    let booking = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();

    // Nothing is due yet
    let result = sweeper.release_expired_bookings().await.unwrap();
    assert!(result.is_empty());
    assert_eq!(apis.db.fetch_book(book.id).await.unwrap().unwrap().available_copies, 1);

    let later = Utc::now() + Duration::hours(25);
    let result = sweeper.release_expired_bookings_at(later).await.unwrap();
    assert_eq!(result.canceled_count(), 1);
    assert_eq!(result.canceled[0].id, booking.rental_id);
    assert_eq!(result.canceled[0].status, RentalStatus::Canceled);
    assert!(result.canceled[0].canceled_at.is_some());
    assert_eq!(result.released_copies, vec![booking.copy_id]);

    let rental = apis.db.fetch_rental(booking.rental_id).await.unwrap().unwrap();
    assert_eq!(rental.status, RentalStatus::Canceled);
    let copy = apis.db.fetch_copy(booking.copy_id).await.unwrap().unwrap();
    assert_eq!(copy.status, CopyStatus::Available);
    assert!(copy.booked_until.is_none());
    assert_eq!(apis.db.fetch_book(book.id).await.unwrap().unwrap().available_copies, 2);

    let again = sweeper.release_expired_bookings_at(later).await.unwrap();
    assert!(again.is_empty());
    tear_down(apis.db).await;
}

#[tokio::test]
async fn payment_after_cancellation_is_a_conflict() {
    let apis = setup_apis().await;
    let sweeper = ExpiryApi::new(apis.db.clone(), EventProducers::default());
    let user = seed_user(&apis.db, "bob@example.com", 50_000).await;
    let book = seed_book(&apis.db, "Tenggelamnya Kapal", 15_000, 1).await;
    let booking = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();
    sweeper.release_expired_bookings_at(Utc::now() + Duration::hours(25)).await.unwrap();

    let event = InvoiceEvent::new(booking.invoice_id, InvoiceStatus::Paid);
    let err = apis.settlement.handle_settlement(event).await.unwrap_err();
    assert!(matches!(err, SettlementError::RentalCanceled(id) if id == booking.rental_id));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(balance_of(&apis.db, user.id).await, Money::from(50_000));
    assert_eq!(apis.db.fetch_copy(booking.copy_id).await.unwrap().unwrap().status, CopyStatus::Available);
    tear_down(apis.db).await;
}

#[tokio::test]
async fn paid_and_deposit_rentals_survive_the_sweep() {
    let apis = setup_apis().await;
    let sweeper = ExpiryApi::new(apis.db.clone(), EventProducers::default());
    let user = seed_user(&apis.db, "carol@example.com", 100_000).await;
    let book = seed_book(&apis.db, "Dilan 1990", 15_000, 3).await;

    let hold = HoldDuration::try_from_minutes(60).unwrap();
    let deposit = apis.flow.book_with_deposit(user.id, book.id, hold).await.unwrap();
    let invoiced = apis.flow.create_invoice_booking(user.id, book.id).await.unwrap();
    apis.settlement.handle_settlement(InvoiceEvent::new(invoiced.invoice_id, InvoiceStatus::Paid)).await.unwrap();

    let result = sweeper.release_expired_bookings_at(Utc::now() + Duration::days(3)).await.unwrap();
    assert!(result.is_empty());
    for rental_id in [deposit.rental_id(), invoiced.rental_id] {
        let rental = apis.db.fetch_rental(rental_id).await.unwrap().unwrap();
        assert_eq!(rental.status, RentalStatus::Active);
        let copy = apis.db.fetch_copy(rental.copy_id).await.unwrap().unwrap();
        assert_eq!(copy.status, CopyStatus::Rented);
    }
    tear_down(apis.db).await;
}

#[tokio::test]
async fn lapsed_holds_without_a_rental_are_released() {
    let apis = setup_apis().await;
    let sweeper = ExpiryApi::new(apis.db.clone(), EventProducers::default());
    let book = seed_book(&apis.db, "Cantik Itu Luka", 15_000, 3).await;
    let now = Utc::now();

    let mut tx = apis.db.begin().await.unwrap();
    let lapsed = tx.claim_available_copy(book.id, CopyStatus::Booked, Some(now - Duration::minutes(1))).await.unwrap();
    let held = tx.claim_available_copy(book.id, CopyStatus::Booked, Some(now + Duration::hours(1))).await.unwrap();
    let rented = tx.claim_available_copy(book.id, CopyStatus::Rented, None).await.unwrap();
    tx.commit().await.unwrap();
    let (lapsed, held, rented) = (lapsed.unwrap(), held.unwrap(), rented.unwrap());
    assert_eq!(apis.db.fetch_book(book.id).await.unwrap().unwrap().available_copies, 0);

    let result = sweeper.release_expired_bookings_at(now).await.unwrap();
    assert!(result.canceled.is_empty());
    assert_eq!(result.released_copies, vec![lapsed]);

    let copy = apis.db.fetch_copy(lapsed).await.unwrap().unwrap();
    assert_eq!(copy.status, CopyStatus::Available);
    assert!(copy.booked_until.is_none());
    assert_eq!(apis.db.fetch_copy(held).await.unwrap().unwrap().status, CopyStatus::Booked);
    assert_eq!(apis.db.fetch_copy(rented).await.unwrap().unwrap().status, CopyStatus::Rented);
    assert_eq!(apis.db.fetch_book(book.id).await.unwrap().unwrap().available_copies, 1);
    tear_down(apis.db).await;
}
