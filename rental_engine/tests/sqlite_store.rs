use rental_engine::{
    db_types::{Money, NewBook, NewUser},
    AccountManagement,
    CatalogManagement,
};

mod support;
use support::setup;

#[tokio::test]
async fn created_rows_are_visible_to_every_pooled_connection() {
    let db = setup().await;
    for i in 0..5 {
        let new_user = NewUser::new(format!("reader{i}@example.com").as_str(), "Reader");
        let user = db.create_user(new_user).await.unwrap();
        let fetched = db.fetch_user(user.id).await.unwrap();
        assert_eq!(fetched.map(|u| u.email), Some(user.email.clone()));
        let by_email = db.fetch_user_by_email(&user.email).await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        let new_book = NewBook::new(format!("Volume {i}").as_str(), "Poetry", Money::from(7_500));
        let book = db.create_book(new_book).await.unwrap();
        let fetched = db.fetch_book(book.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, book.name);
        assert_eq!(fetched.available_copies, 0);

        let copies = db.add_copies(book.id, 2).await.unwrap();
        assert_eq!(copies.len(), 2);
        assert_eq!(db.fetch_book(book.id).await.unwrap().unwrap().available_copies, 2);
    }
    assert_eq!(db.list_books().await.unwrap().len(), 5);
    rental_engine::test_utils::tear_down(db).await;
}
