//! MySQL column types and text-protocol value conversion.
//!
//! The text protocol transmits every cell as a byte string; this module
//! lifts those bytes into typed [`Value`]s using the column type tag, and
//! renders [`Value`]s back into SQL literal fragments for parameter
//! substitution.

use mylite_core::{Date, DateTime, EncodeError, Time, Value};

/// MySQL field type codes (the `MYSQL_TYPE_*` constants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0A,
    Time = 0x0B,
    DateTime = 0x0C,
    Year = 0x0D,
    NewDate = 0x0E,
    NewDecimal = 0xF6,
    Enum = 0xF7,
    Set = 0xF8,
    TinyBlob = 0xF9,
    MediumBlob = 0xFA,
    LongBlob = 0xFB,
    Blob = 0xFC,
    VarString = 0xFD,
    String = 0xFE,
    Geometry = 0xFF,
}

impl FieldType {
    /// Parse a field type from its wire byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => FieldType::Decimal,
            0x01 => FieldType::Tiny,
            0x02 => FieldType::Short,
            0x03 => FieldType::Long,
            0x04 => FieldType::Float,
            0x05 => FieldType::Double,
            0x06 => FieldType::Null,
            0x07 => FieldType::Timestamp,
            0x08 => FieldType::LongLong,
            0x09 => FieldType::Int24,
            0x0A => FieldType::Date,
            0x0B => FieldType::Time,
            0x0C => FieldType::DateTime,
            0x0D => FieldType::Year,
            0x0E => FieldType::NewDate,
            0xF6 => FieldType::NewDecimal,
            0xF7 => FieldType::Enum,
            0xF8 => FieldType::Set,
            0xF9 => FieldType::TinyBlob,
            0xFA => FieldType::MediumBlob,
            0xFB => FieldType::LongBlob,
            0xFC => FieldType::Blob,
            0xFD => FieldType::VarString,
            0xFE => FieldType::String,
            0xFF => FieldType::Geometry,
            // Unknown tags decode as raw bytes downstream
            _ => FieldType::VarString,
        }
    }

    /// Check if this is an integer type.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny
                | FieldType::Short
                | FieldType::Long
                | FieldType::LongLong
                | FieldType::Int24
                | FieldType::Year
        )
    }

    /// Check if this is a numeric (non-integer) type.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Decimal | FieldType::NewDecimal | FieldType::Float | FieldType::Double
        )
    }
}

/// Column metadata from a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Table name (or alias)
    pub table: String,
    /// Column name (or alias)
    pub name: String,
    /// Display length
    pub length: u64,
    /// Column type tag
    pub column_type: FieldType,
}

/// Decode a text-protocol cell into a [`Value`].
///
/// NULL cells never reach this function; the length-coded layer maps the
/// 0xFB sentinel to `Value::Null` before type dispatch. Text that fails
/// to parse for its declared type falls back to raw bytes.
pub fn decode_text_value(column_type: FieldType, data: &[u8]) -> Value {
    let text = || String::from_utf8_lossy(data);

    match column_type {
        FieldType::Tiny
        | FieldType::Short
        | FieldType::Long
        | FieldType::LongLong
        | FieldType::Int24
        | FieldType::Year => text()
            .parse::<i64>()
            .map_or_else(|_| Value::Bytes(data.to_vec()), Value::Int),

        // Integer-valued decimals stay exact; everything else is a float.
        FieldType::Decimal | FieldType::NewDecimal | FieldType::Float | FieldType::Double => {
            let text = text();
            if let Ok(i) = text.parse::<i64>() {
                Value::Int(i)
            } else if let Ok(f) = text.parse::<f64>() {
                Value::Float(f)
            } else {
                Value::Bytes(data.to_vec())
            }
        }

        FieldType::Timestamp | FieldType::DateTime => parse_datetime(&text())
            .map_or_else(|| Value::Bytes(data.to_vec()), Value::DateTime),

        FieldType::Date => {
            parse_date(&text()).map_or_else(|| Value::Bytes(data.to_vec()), Value::Date)
        }

        FieldType::Time => {
            parse_time(&text()).map_or_else(|| Value::Bytes(data.to_vec()), Value::Time)
        }

        _ => Value::Bytes(data.to_vec()),
    }
}

fn parse_date(text: &str) -> Option<Date> {
    let mut parts = text.splitn(3, '-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    Some(Date { year, month, day })
}

fn parse_time(text: &str) -> Option<Time> {
    let mut parts = text.splitn(3, ':');
    let hour = parts.next()?.parse().ok()?;
    let minute = parts.next()?.parse().ok()?;
    let second = parts.next()?.parse().ok()?;
    Some(Time {
        hour,
        minute,
        second,
    })
}

fn parse_datetime(text: &str) -> Option<DateTime> {
    let (date_part, time_part) = text.split_once(' ')?;
    Some(DateTime {
        date: parse_date(date_part)?,
        time: parse_time(time_part)?,
    })
}

/// Render a [`Value`] as a SQL literal fragment.
///
/// Used only for parameter substitution (`SET @N = <literal>`). The
/// fragment is raw bytes because quoted byte strings pass through
/// unescaped bytes verbatim. Values with no SQL-literal representation
/// (non-finite floats) error out before anything touches the wire.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, EncodeError> {
    match value {
        Value::Null => Ok(b"null".to_vec()),
        Value::Int(i) => Ok(i.to_string().into_bytes()),
        Value::Float(f) => {
            if f.is_finite() {
                Ok(format_float(*f).into_bytes())
            } else {
                Err(EncodeError {
                    message: format!("cannot encode non-finite float {f} as a SQL literal"),
                })
            }
        }
        Value::Bytes(b) => Ok(escape_bytes(b)),
        Value::Date(d) => Ok(format!("'{d}'").into_bytes()),
        Value::Time(t) => Ok(format!("'{t}'").into_bytes()),
        Value::DateTime(dt) => Ok(format!("'{dt}'").into_bytes()),
    }
}

/// Shortest text that round-trips the float, with a decimal point kept so
/// the server reads it back as a DOUBLE.
fn format_float(f: f64) -> String {
    let text = f.to_string();
    if text.contains('.') || text.contains('e') || text.contains('E') {
        text
    } else {
        format!("{text}.0")
    }
}

/// Quote and escape a byte string for the text protocol.
///
/// Escapes: NUL, LF, CR, backslash, single quote, double quote, Ctrl-Z.
/// All other bytes pass through untouched.
fn escape_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 2);
    out.push(b'\'');
    for &byte in data {
        match byte {
            0x00 => out.extend_from_slice(b"\\0"),
            0x0A => out.extend_from_slice(b"\\n"),
            0x0D => out.extend_from_slice(b"\\r"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'"' => out.extend_from_slice(b"\\\""),
            0x1A => out.extend_from_slice(b"\\Z"),
            b => out.push(b),
        }
    }
    out.push(b'\'');
    out
}
