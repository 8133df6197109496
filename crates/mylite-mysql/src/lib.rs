//! MySQL driver for mylite.
//!
//! This crate implements the MySQL client/server wire protocol from
//! scratch over blocking TCP. It provides:
//!
//! - Packet framing with sequence numbers
//! - Authentication (pre-4.1 scramble and 4.1+ secure connection)
//! - Text protocol queries with typed row decoding
//! - Prepared statement execution via `PREPARE` / `EXECUTE`
//! - Transactions with automatic rollback on caller failure
//!
//! # MySQL Protocol Overview
//!
//! MySQL uses a packet-based protocol with a 4-byte header: 3 bytes of
//! payload length (little-endian) plus 1 byte of sequence number. The
//! server's response packets number upward from the client's request.
//! The 4.0 and 4.1/5.x dialects differ in the shape of column metadata
//! and error packets; the dialect is fixed once from the server version
//! string in the greeting.
//!
//! # Example
//!
//! ```rust,ignore
//! use mylite_mysql::{MySqlConfig, MySqlConnection};
//!
//! let config = MySqlConfig::new()
//!     .host("localhost")
//!     .port(3306)
//!     .user("root")
//!     .database("mydb");
//!
//! let mut conn = MySqlConnection::connect(config)?;
//! let result = conn.fetch("SELECT 1")?;
//! ```

pub mod auth;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod receiver;
pub mod types;

pub use config::MySqlConfig;
pub use connection::{ConnectionState, MySqlConnection, QueryResult, ResultSet};
pub use protocol::Dialect;
pub use types::{ColumnMeta, FieldType};
