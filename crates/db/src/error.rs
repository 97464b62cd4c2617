/// Errors raised by the mirror's database layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A required setting is absent.
    #[error("Missing configuration: {0} must be set")]
    MissingConfig(&'static str),

    /// A setting is present but unusable.
    #[error("Invalid configuration for {key}: {message}")]
    InvalidConfig { key: &'static str, message: String },

    /// An upsert was attempted with no columns.
    #[error("Attempted to upsert empty row into {table}")]
    EmptyRow { table: String },

    /// An upsert lacks a column the recency predicate compares.
    #[error("Upsert into {table} is missing required column {column}")]
    MissingColumn { table: String, column: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DbError {
    /// Faults caused by the calling code rather than by the database.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, DbError::EmptyRow { .. } | DbError::MissingColumn { .. })
    }
}
