//! MySQL packet reading utilities.
//!
//! A cursor over a packet payload with the length-coded binary (LCB)
//! primitives the text protocol is built on.

#![allow(clippy::cast_possible_truncation)]

use crate::protocol::{Dialect, ErrPacket, OkPacket};

/// A decoded length-coded binary value.
///
/// The LCB encoding reserves 0xFB as the SQL NULL sentinel, so a decoded
/// value is either NULL or an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lcb {
    /// The 0xFB NULL sentinel
    Null,
    /// Any integer value
    Int(u64),
}

/// A reader over MySQL protocol data.
#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Create a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Get remaining bytes in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if the reader has consumed all input.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Peek at the next byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos)?;
        self.pos += 1;
        Some(*byte)
    }

    /// Read a u16 (little-endian).
    pub fn read_u16_le(&mut self) -> Option<u16> {
        if self.remaining() < 2 {
            return None;
        }
        let value = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Some(value)
    }

    /// Read a u24 (little-endian, 3 bytes).
    pub fn read_u24_le(&mut self) -> Option<u32> {
        if self.remaining() < 3 {
            return None;
        }
        let value = u32::from(self.data[self.pos])
            | (u32::from(self.data[self.pos + 1]) << 8)
            | (u32::from(self.data[self.pos + 2]) << 16);
        self.pos += 3;
        Some(value)
    }

    /// Read a u32 (little-endian).
    pub fn read_u32_le(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let value = u32::from_le_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ]);
        self.pos += 4;
        Some(value)
    }

    /// Read a length-coded binary value.
    ///
    /// - 0x00..0xFA: the value itself
    /// - 0xFB: SQL NULL
    /// - 0xFC: 16-bit LE value follows
    /// - 0xFD: 24-bit LE value follows
    /// - 0xFE: 32-bit LE value follows
    /// - 0xFF: value 255 (the ERR marker never reaches the LCB layer;
    ///   result-set dispatch happens on the raw leading byte)
    ///
    /// Returns `None` only when the input is truncated.
    pub fn read_lcb(&mut self) -> Option<Lcb> {
        let first = self.read_u8()?;
        match first {
            0xFB => Some(Lcb::Null),
            0xFC => self.read_u16_le().map(|v| Lcb::Int(u64::from(v))),
            0xFD => self.read_u24_le().map(|v| Lcb::Int(u64::from(v))),
            0xFE => self.read_u32_le().map(|v| Lcb::Int(u64::from(v))),
            b => Some(Lcb::Int(u64::from(b))),
        }
    }

    /// Read a length-coded byte string.
    ///
    /// The outer `None` means truncated input; the inner `None` is SQL
    /// NULL, which consumes nothing beyond the 0xFB marker.
    pub fn read_lcb_bytes(&mut self) -> Option<Option<&'a [u8]>> {
        match self.read_lcb()? {
            Lcb::Null => Some(None),
            Lcb::Int(len) => self.read_bytes(len as usize).map(Some),
        }
    }

    /// Read a length-coded string as lossy UTF-8. NULL decodes as empty.
    pub fn read_lcb_string(&mut self) -> Option<String> {
        let bytes = self.read_lcb_bytes()?;
        Some(String::from_utf8_lossy(bytes.unwrap_or_default()).into_owned())
    }

    /// Read a null-terminated byte string.
    pub fn read_null_bytes(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos] != 0 {
            self.pos += 1;
        }
        let bytes = &self.data[start..self.pos];
        if self.pos < self.data.len() {
            self.pos += 1;
        }
        Some(bytes)
    }

    /// Read a null-terminated string.
    pub fn read_null_string(&mut self) -> Option<String> {
        self.read_null_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Read a fixed-length string.
    pub fn read_string(&mut self, len: usize) -> Option<String> {
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read the remaining data as a string.
    pub fn read_rest_string(&mut self) -> String {
        let s = String::from_utf8_lossy(&self.data[self.pos..]).into_owned();
        self.pos = self.data.len();
        s
    }

    /// Read a fixed number of bytes.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(bytes)
    }

    /// Read the remaining bytes.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    /// Skip a number of bytes.
    pub fn skip(&mut self, n: usize) -> bool {
        if self.remaining() >= n {
            self.pos += n;
            true
        } else {
            false
        }
    }

    /// Parse an OK packet from the current position.
    ///
    /// Format: `0x00, affected_rows:LCB, insert_id:LCB, ...`. Trailing
    /// content is ignored and absent fields decode as zero, so a bare
    /// `0x00` payload is a valid zero-row OK.
    pub fn parse_ok_packet(&mut self) -> OkPacket {
        if self.peek() == Some(0x00) {
            self.skip(1);
        }
        let affected_rows = match self.read_lcb() {
            Some(Lcb::Int(v)) => v,
            _ => 0,
        };
        let insert_id = match self.read_lcb() {
            Some(Lcb::Int(v)) => v,
            _ => 0,
        };
        OkPacket {
            affected_rows,
            insert_id,
        }
    }

    /// Parse an ERR packet from the current position.
    ///
    /// V40: `0xFF, code:16LE, message`.
    /// V41: `0xFF, code:16LE, '#', sql_state:5, message`.
    pub fn parse_err_packet(&mut self, dialect: Dialect) -> Option<ErrPacket> {
        if self.peek() == Some(0xFF) {
            self.skip(1);
        }
        let code = self.read_u16_le()?;
        let sql_state = match dialect {
            Dialect::V41 if self.peek() == Some(b'#') => {
                self.skip(1);
                Some(self.read_string(5)?)
            }
            _ => None,
        };
        let message = self.read_rest_string();
        Some(ErrPacket {
            code,
            sql_state,
            message,
        })
    }
}
