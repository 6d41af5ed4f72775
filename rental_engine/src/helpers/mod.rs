//! External invoice references.
//!
//! Every invoice the engine requests carries an `external_id` that says what it is for. The gateway echoes it back in
//! its callbacks, which makes it useful when reconciling payments by hand.
use chrono::Utc;

const TOPUP_PREFIX: &str = "topup";
const RENTAL_PREFIX: &str = "rental";

fn nanos_now() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_else(|| Utc::now().timestamp_micros() * 1000)
}

/// `topup:{user_id}:{nanos}`
pub fn topup_external_id(user_id: i64) -> String {
    format!("{TOPUP_PREFIX}:{user_id}:{}", nanos_now())
}

/// `rental:{user_id}:{book_id}:{nanos}`
pub fn rental_external_id(user_id: i64, book_id: i64) -> String {
    format!("{RENTAL_PREFIX}:{user_id}:{book_id}:{}", nanos_now())
}

/// What an external id refers to, as far as can be told from the id alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalRef {
    Topup { user_id: i64 },
    Rental { user_id: i64, book_id: i64 },
}

/// Parses an external id produced by [`topup_external_id`] or [`rental_external_id`]. Returns `None` for anything
/// else.
pub fn parse_external_id(external_id: &str) -> Option<ExternalRef> {
    let parts = external_id.split(':').collect::<Vec<&str>>();
    match parts.as_slice() {
        [TOPUP_PREFIX, user, _] => Some(ExternalRef::Topup { user_id: user.parse().ok()? }),
        [RENTAL_PREFIX, user, book, _] => {
            Some(ExternalRef::Rental { user_id: user.parse().ok()?, book_id: book.parse().ok()? })
        },
        _ => None,
    }
}
