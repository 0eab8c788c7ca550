use thiserror::Error;

/// Unified error type for every layer of the access stack.
///
/// Engine capabilities report failures through this type; the public
/// `Connection`/`Statement` surface converts them into absent results and
/// keeps the most recent one readable through `error_message()` /
/// `error_code()`.
#[derive(Debug, Error)]
pub enum DbError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Engine-native failure carrying the engine's own error code.
    #[error("{message}")]
    Native { code: i64, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("statement preparation error: {0}")]
    Prepare(String),

    #[error("bind error: {0}")]
    Bind(String),

    #[error("execution error: {0}")]
    Execution(String),
}

impl DbError {
    /// Numeric code for the pull-style error surface. Native failures expose
    /// the engine's own code; the remaining variants get stable small codes
    /// so `error_code() != 0` always holds for a recorded failure.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            #[cfg(feature = "sqlite")]
            DbError::Sqlite(err) => match err {
                rusqlite::Error::SqliteFailure(ffi, _) => i64::from(ffi.extended_code),
                _ => 5,
            },
            DbError::Native { code, .. } => *code,
            DbError::Config(_) => 1,
            DbError::Connection(_) => 2,
            DbError::Prepare(_) => 3,
            DbError::Bind(_) => 4,
            DbError::Execution(_) => 5,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
