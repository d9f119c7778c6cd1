//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

use crate::error::Error;

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given error is a duplicate key write error.
///
/// This is how the unique-index invariants (one opinion per raw response,
/// one upvote per fingerprint) are detected and turned into domain errors.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    if let ErrorKind::Write(WriteFailure::WriteError(ref e)) = *err.kind {
        return e.code == DUPLICATE_KEY;
    }
    false
}

/// Map a duplicate-key insert failure to the given domain error; anything
/// else stays a database error.
pub fn on_duplicate_key(err: DbError, duplicate: Error) -> Error {
    if is_duplicate_key_error(&err) {
        duplicate
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use mongodb::{bson::doc, error::WriteError};

    use super::*;

    /// The driver's error structs are deserialized from server replies, so
    /// tests build them the same way.
    fn write_error(code: i32) -> DbError {
        let write_error: WriteError = mongodb::bson::from_document(doc! {
            "code": code,
            "errmsg": "write failed",
        })
        .unwrap();
        ErrorKind::Write(WriteFailure::WriteError(write_error)).into()
    }

    #[test]
    fn duplicate_key_writes_are_recognised() {
        assert!(is_duplicate_key_error(&write_error(DUPLICATE_KEY)));
        assert!(!is_duplicate_key_error(&write_error(121)));
    }

    #[test]
    fn duplicate_inserts_become_domain_errors() {
        assert!(matches!(
            on_duplicate_key(write_error(DUPLICATE_KEY), Error::AlreadySupported),
            Error::AlreadySupported
        ));
        assert!(matches!(
            on_duplicate_key(write_error(DUPLICATE_KEY), Error::DuplicatePublish),
            Error::DuplicatePublish
        ));
    }

    #[test]
    fn other_write_errors_stay_database_errors() {
        assert!(matches!(
            on_duplicate_key(write_error(121), Error::AlreadySupported),
            Error::Db(_)
        ));
    }
}
