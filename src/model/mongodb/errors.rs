use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

/// For some reason, the driver doesn't provide error code constants.
pub const DUPLICATE_KEY: i32 = 11000;

/// Was the given database error caused by a duplicate key?
pub fn is_duplicate_key_error<T>(result: Result<T, &DbError>) -> bool {
    if let Err(db_err) = result {
        if let ErrorKind::Write(WriteFailure::WriteError(ref err)) = *db_err.kind {
            if err.code == DUPLICATE_KEY {
                return true;
            }
        }
    }
    false
}
