//! Error types for mylite operations.

use std::fmt;

/// The primary error type for all mylite operations.
#[derive(Debug)]
pub enum Error {
    /// Connection lifecycle errors (connect, login, teardown)
    Connection(ConnectionError),
    /// An ERR packet returned by the server
    Server(ServerError),
    /// Wire-level protocol violations
    Protocol(ProtocolError),
    /// Transaction wrapper outcomes
    Transaction(TransactionError),
    /// Value could not be rendered as a SQL literal
    Encode(EncodeError),
    /// I/O errors
    Io(std::io::Error),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish the TCP connection
    Connect,
    /// Handshake or authentication failed
    Login,
    /// The initial `USE <database>` failed
    ChangeDatabase,
    /// The receiver reported the socket closed
    Closed,
}

/// An error reported by the server in an ERR packet.
///
/// `sql_state` is populated only on the 4.1+ dialect; pre-4.1 servers do
/// not transmit one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub code: u16,
    pub sql_state: Option<String>,
    pub message: String,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    pub raw_data: Option<Vec<u8>>,
}

/// Outcome of an aborted transaction.
///
/// `cause` holds the error that triggered the abort (a failed BEGIN or
/// COMMIT, or the error returned by the caller's closure); `rollback_error`
/// is set when the ROLLBACK issued during the abort failed as well.
#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
    pub cause: Option<Box<Error>>,
    pub rollback_error: Option<Box<Error>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// BEGIN failed; nothing was run
    BeginFailed,
    /// The caller's closure returned an error
    BodyFailed,
    /// The caller's closure panicked
    BodyPanicked,
    /// COMMIT failed after the closure succeeded
    CommitFailed,
    /// A transaction was already open
    NestedNotSupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError {
    pub message: String,
}

impl Error {
    /// Is this an error that terminates the connection?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(c) => matches!(
                c.kind,
                ConnectionErrorKind::Connect
                    | ConnectionErrorKind::Login
                    | ConnectionErrorKind::Closed
            ),
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Get the server error code, if this wraps an ERR packet.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Error::Server(e) => Some(e.code),
            _ => None,
        }
    }

    /// Get the SQLSTATE if the server reported one.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Error::Server(e) => e.sql_state.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "connection error: {}", e.message),
            Error::Server(e) => write!(f, "server error: {}", e),
            Error::Protocol(e) => write!(f, "protocol error: {}", e.message),
            Error::Transaction(e) => write!(f, "transaction aborted: {}", e.message),
            Error::Encode(e) => write!(f, "encode error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Transaction(e) => e
                .cause
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "{} (code {}, SQLSTATE {})", self.message, self.code, state),
            None => write!(f, "{} (code {})", self.message, self.code),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        if let Some(rb) = &self.rollback_error {
            write!(f, " (rollback also failed: {})", rb)?;
        }
        Ok(())
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<ServerError> for Error {
    fn from(err: ServerError) -> Self {
        Error::Server(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Error::Encode(err)
    }
}

/// Result type alias for mylite operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        let v41 = ServerError {
            code: 1064,
            sql_state: Some("42000".to_string()),
            message: "You have an error in your SQL syntax".to_string(),
        };
        let text = v41.to_string();
        assert!(text.contains("1064"));
        assert!(text.contains("42000"));

        let v40 = ServerError {
            code: 1064,
            sql_state: None,
            message: "syntax error".to_string(),
        };
        assert!(!v40.to_string().contains("SQLSTATE"));
    }

    #[test]
    fn connection_error_flags() {
        let closed = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Closed,
            message: "socket closed".to_string(),
            source: None,
        });
        assert!(closed.is_connection_error());

        let server = Error::Server(ServerError {
            code: 1146,
            sql_state: Some("42S02".to_string()),
            message: "Table 'x' doesn't exist".to_string(),
        });
        assert!(!server.is_connection_error());
        assert_eq!(server.server_code(), Some(1146));
        assert_eq!(server.sql_state(), Some("42S02"));
    }

    #[test]
    fn transaction_error_preserves_cause() {
        let cause = Error::Server(ServerError {
            code: 1213,
            sql_state: Some("40001".to_string()),
            message: "Deadlock found".to_string(),
        });
        let err = Error::Transaction(TransactionError {
            kind: TransactionErrorKind::BodyFailed,
            message: "transaction body failed".to_string(),
            cause: Some(Box::new(cause)),
            rollback_error: None,
        });
        let text = err.to_string();
        assert!(text.contains("Deadlock"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
