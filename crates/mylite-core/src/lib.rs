//! Core types for the mylite MySQL client.
//!
//! This crate provides the backend-agnostic foundation:
//!
//! - `Value` for dynamically-typed SQL values
//! - `Row` and `ColumnInfo` for result-set access
//! - the `Error` hierarchy shared by the protocol crates

pub mod error;
pub mod row;
pub mod value;

pub use error::{
    ConnectionError, ConnectionErrorKind, EncodeError, Error, ProtocolError, Result, ServerError,
    TransactionError, TransactionErrorKind,
};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::{Date, DateTime, Time, Value};
