pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

pub(crate) fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
