//! Probe error types.

/// Errors that can occur while probing the target server.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Failed to establish a connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The target table does not exist on the server.
    #[error("table {database}.{table} not found")]
    TableNotFound {
        /// Schema that was searched.
        database: String,
        /// Table that was looked up.
        table: String,
    },

    /// No database was selected and the statement did not qualify the table.
    #[error("no database selected; qualify the table or pass --database")]
    NoDatabase,

    /// TLS was requested in a mode that needs a CA file, but none was given.
    #[error("--tls=custom requires --tls-ca pointing at the CA certificate")]
    MissingTlsCa,

    /// A raw query failed.
    #[error("query error: {0}")]
    Query(#[from] mysql::Error),
}

/// Convenience alias used throughout the probe crate.
pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    /// Creates a [`ProbeError::TableNotFound`].
    pub fn table_not_found(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self::TableNotFound {
            database: database.into(),
            table: table.into(),
        }
    }

    /// Returns `true` if the error means the table is missing (as opposed
    /// to the server being unreachable).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound { .. })
    }
}
