// sqlx::Error -> AppError

use cryptq_core::error::AppError;

/// SQLite extended result codes for constraint failures
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
const SQLITE_BUSY: &str = "5";
const SQLITE_FULL: &str = "13";

/// Convert sqlx::Error to AppError with structured information.
///
/// Uniqueness violations become `Conflict` so callers can tell a duplicate
/// assignment from an outage.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => {
                let code_str = code.as_ref();
                match code_str {
                    SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY => AppError::Conflict(
                        format!("Unique constraint violation: {}", db_err.message()),
                    ),
                    SQLITE_CONSTRAINT_FOREIGNKEY => AppError::Database(format!(
                        "Foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    SQLITE_BUSY => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    SQLITE_FULL => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            }
            None => AppError::Database(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        _ => AppError::Database(err.to_string()),
    }
}
