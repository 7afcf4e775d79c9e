use thiserror::Error;

/// Errors that end a generation run.
///
/// Per-write insertion failures are not represented here as run errors: the
/// sink logs and counts them, and the worker moves on to its next record.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Invalid or inconsistent run configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading or parsing the YAML configuration file failed.
    #[error("Unable to load config file {path}: {reason}")]
    ConfigFile { path: String, reason: String },

    /// The attribute source could not produce a bundle.
    #[error("Unable to get fake data for record {record_id}: {reason}")]
    Attribute { record_id: u64, reason: String },

    /// A worker could not prepare one of its insert statements.
    #[error("Error in prepare {statement} (worker {worker_id}): {source}")]
    Prepare {
        worker_id: usize,
        statement: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    /// A value could not be represented in a NUMERIC column.
    #[error("Value {0} cannot be stored as NUMERIC(10, 2)")]
    Numeric(f64),

    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// A worker task panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Failure reported by the in-memory test store.
    #[cfg(test)]
    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
