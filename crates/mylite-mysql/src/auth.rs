//! MySQL handshake authentication.
//!
//! Two password scrambles, selected by the server's capability flags:
//!
//! - **4.1+ (secure connection)**:
//!   ```text
//!   SHA1(password) XOR SHA1(salt + SHA1(SHA1(password)))
//!   ```
//!   where the salt is the concatenation of both greeting salt chunks.
//! - **3.23 / 4.0**: a pair of 31-bit hashes over password and salt seeds
//!   a multiplicative generator whose stream masks 8 output bytes.
//!
//! Both are deterministic functions of `(password, salt)`. An empty
//! password sends an empty scramble in either protocol.

use sha1::{Digest, Sha1};

use crate::protocol::capabilities::{NEW_CLIENT_FLAGS, OLD_CLIENT_FLAGS};
use crate::protocol::{PacketWriter, LATIN1_SWEDISH_CI, MAX_PACKET_SIZE};

/// Compute the 4.1+ authentication scramble (20 bytes).
pub fn scramble_41(password: &str, salt: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    // Stage 1: SHA1(password)
    let stage1 = Sha1::digest(password.as_bytes());

    // Stage 2: SHA1(SHA1(password))
    let stage2 = Sha1::digest(stage1);

    // Mash: SHA1(salt + stage2)
    let mut hasher = Sha1::new();
    hasher.update(salt);
    hasher.update(stage2);
    let mash = hasher.finalize();

    stage1
        .iter()
        .zip(mash.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// Compute the pre-4.1 authentication scramble (8 bytes).
pub fn scramble_323(password: &str, salt: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let (p1, p2) = hash_323(password.as_bytes());
    let (s1, s2) = hash_323(salt);
    let mut rng = Rand323::new(p1 ^ s1, p2 ^ s2);

    let mut out: Vec<u8> = (0..8).map(|_| rng.next_byte() + 64).collect();
    let extra = rng.next_byte();
    for b in &mut out {
        *b ^= extra;
    }
    out
}

/// The 3.23 password hash: two 31-bit accumulators over the input bytes.
///
/// Arithmetic is mod 2^64; only the low 31 bits of each accumulator
/// survive, so the wrap is unobservable in the result.
fn hash_323(input: &[u8]) -> (u64, u64) {
    let mut n1: u64 = 1_345_345_333;
    let mut n2: u64 = 0x1234_5671;
    let mut add: u64 = 7;

    for &byte in input {
        let c = u64::from(byte);
        n1 ^= ((n1 & 63) + add)
            .wrapping_mul(c)
            .wrapping_add(n1 << 8);
        n2 = n2.wrapping_add((n2 << 8) ^ n1);
        add = add.wrapping_add(c);
    }

    (n1 & 0x7FFF_FFFF, n2 & 0x7FFF_FFFF)
}

/// The seeded generator behind the 3.23 scramble stream.
struct Rand323 {
    seed1: u64,
    seed2: u64,
}

impl Rand323 {
    const MODULUS: u64 = 0x3FFF_FFFF;

    fn new(seed1: u64, seed2: u64) -> Self {
        Self {
            seed1: seed1 % Self::MODULUS,
            seed2: seed2 % Self::MODULUS,
        }
    }

    /// Next stream byte in `0..31`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn next_byte(&mut self) -> u8 {
        self.seed1 = (self.seed1 * 3 + self.seed2) % Self::MODULUS;
        self.seed2 = (self.seed1 + self.seed2 + 33) % Self::MODULUS;
        let frac = self.seed1 as f64 / Self::MODULUS as f64;
        (frac * 31.0) as u8
    }
}

/// Build the 4.1+ handshake-response payload.
///
/// `caps:32LE, max_packet:32LE, charset:8, zeros[23], user asciz,
/// scramble_len:8, scramble`.
#[allow(clippy::cast_possible_truncation)]
pub fn build_auth_41(user: &str, scramble: &[u8]) -> Vec<u8> {
    let mut writer = PacketWriter::with_capacity(64 + user.len());
    writer.write_u32_le(NEW_CLIENT_FLAGS);
    writer.write_u32_le(MAX_PACKET_SIZE as u32);
    writer.write_u8(LATIN1_SWEDISH_CI);
    writer.write_zeros(23);
    writer.write_null_string(user);
    writer.write_u8(scramble.len() as u8);
    writer.write_bytes(scramble);
    writer.into_bytes()
}

/// Build the pre-4.1 handshake-response payload.
///
/// `caps:16LE, max_packet:24LE, user asciz, scramble`.
#[allow(clippy::cast_possible_truncation)]
pub fn build_auth_323(user: &str, scramble: &[u8]) -> Vec<u8> {
    let mut writer = PacketWriter::with_capacity(16 + user.len());
    writer.write_u16_le(OLD_CLIENT_FLAGS as u16);
    writer.write_u24_le(MAX_PACKET_SIZE as u32);
    writer.write_null_string(user);
    writer.write_bytes(scramble);
    writer.into_bytes()
}

/// Build the reply to an auth-switch request: the old scramble,
/// null-terminated.
pub fn build_auth_switch_reply(password: &str, salt: &[u8]) -> Vec<u8> {
    let mut reply = scramble_323(password, salt);
    reply.push(0);
    reply
}
