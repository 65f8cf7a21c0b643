// sqlx::Error -> AppError mapping
//
// Orphan rules prevent `impl From<sqlx::Error> for AppError` here, so every
// adapter calls `map_sqlx_error` explicitly.

use kissan_core::error::AppError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            match db_err.code().as_deref() {
                Some("2067") | Some("1555") => {
                    // UNIQUE / PRIMARY KEY constraint failed
                    AppError::Conflict(format!("Already exists: {}", db_err.message()))
                }
                Some("787") | Some("3850") => AppError::Validation(format!(
                    "Referenced record does not exist: {}",
                    db_err.message()
                )),
                Some("5") => AppError::Database(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                Some("13") => AppError::Database(format!("Database full: {}", db_err.message())),
                Some(code) => AppError::Database(format!(
                    "Database error [{}]: {}",
                    code,
                    db_err.message()
                )),
                None => AppError::Database(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

/// A stored enum or JSON column that no longer parses
pub(crate) fn corrupt(column: &str, value: impl std::fmt::Display) -> AppError {
    AppError::Database(format!("Corrupt value in column {}: {}", column, value))
}
