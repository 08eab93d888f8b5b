//! Bluetooth UUIDs
//!
//! Services, characteristics and descriptors are all keyed by UUID. The value
//! is always held as 128 bits (little-endian, as it travels over the air) and
//! SIG-assigned 16/32-bit short forms are expanded against the base UUID.

use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Base UUID `00000000-0000-1000-8000-00805F9B34FB`, little-endian.
const BASE_UUID_LE: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Byte offset of the short-form value inside the base UUID.
const SHORT_OFFSET: usize = 12;

/// A 128-bit Bluetooth UUID.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uuid {
    le: [u8; 16],
}

impl Uuid {
    /// Builds a UUID from 16 little-endian bytes.
    pub const fn from_bytes_le(le: [u8; 16]) -> Self {
        Self { le }
    }

    /// Builds a UUID from 16 big-endian bytes (textual order).
    pub const fn from_bytes_be(be: [u8; 16]) -> Self {
        let mut le = [0u8; 16];
        let mut i = 0;
        while i < 16 {
            le[i] = be[15 - i];
            i += 1;
        }
        Self { le }
    }

    /// Builds a UUID from its 128-bit integer value.
    pub const fn from_u128(value: u128) -> Self {
        Self {
            le: value.to_le_bytes(),
        }
    }

    /// Expands a SIG-assigned 16-bit UUID.
    pub const fn from_u16(short: u16) -> Self {
        Self::from_u32(short as u32)
    }

    /// Expands a SIG-assigned 32-bit UUID.
    pub const fn from_u32(short: u32) -> Self {
        let mut le = BASE_UUID_LE;
        let bytes = short.to_le_bytes();
        le[SHORT_OFFSET] = bytes[0];
        le[SHORT_OFFSET + 1] = bytes[1];
        le[SHORT_OFFSET + 2] = bytes[2];
        le[SHORT_OFFSET + 3] = bytes[3];
        Self { le }
    }

    /// Parses a little-endian attribute-type field of 2, 4 or 16 bytes.
    pub fn try_from_slice_le(slice: &[u8]) -> Option<Self> {
        match slice {
            &[a, b] => Some(Self::from_u16(u16::from_le_bytes([a, b]))),
            &[a, b, c, d] => Some(Self::from_u32(u32::from_le_bytes([a, b, c, d]))),
            _ if slice.len() == 16 => {
                let mut le = [0u8; 16];
                le.copy_from_slice(slice);
                Some(Self::from_bytes_le(le))
            }
            _ => None,
        }
    }

    /// Generates a random version 4 UUID, for ad-hoc custom services.
    pub fn new_random_v4() -> Self {
        let mut be = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut be);
        be[6] = (be[6] & 0x0F) | 0x40;
        be[8] = (be[8] & 0x3F) | 0x80;
        Self::from_bytes_be(be)
    }

    pub const fn as_bytes_le(&self) -> &[u8; 16] {
        &self.le
    }

    pub fn to_bytes_be(&self) -> [u8; 16] {
        let mut be = self.le;
        be.reverse();
        be
    }

    fn is_sig_assigned(&self) -> bool {
        self.le[..SHORT_OFFSET] == BASE_UUID_LE[..SHORT_OFFSET]
    }

    /// Returns the 16-bit short form, if this UUID has one.
    pub fn as_u16(&self) -> Option<u16> {
        match self.as_u32() {
            Some(short) if short <= u16::MAX as u32 => Some(short as u16),
            _ => None,
        }
    }

    /// Returns the 32-bit short form, if this UUID has one.
    pub fn as_u32(&self) -> Option<u32> {
        if !self.is_sig_assigned() {
            return None;
        }
        Some(u32::from_le_bytes([
            self.le[SHORT_OFFSET],
            self.le[SHORT_OFFSET + 1],
            self.le[SHORT_OFFSET + 2],
            self.le[SHORT_OFFSET + 3],
        ]))
    }

    /// Shortest over-the-air encoding: 2 bytes for 16-bit SIG UUIDs,
    /// 16 bytes otherwise. 32-bit forms are not allowed in ATT PDUs.
    pub fn to_att_bytes(&self) -> Vec<u8> {
        match self.as_u16() {
            Some(short) => short.to_le_bytes().to_vec(),
            None => self.le.to_vec(),
        }
    }
}

impl From<u16> for Uuid {
    fn from(short: u16) -> Self {
        Uuid::from_u16(short)
    }
}

impl From<u32> for Uuid {
    fn from(short: u32) -> Self {
        Uuid::from_u32(short)
    }
}

impl From<u128> for Uuid {
    fn from(value: u128) -> Self {
        Uuid::from_u128(value)
    }
}

impl PartialEq<u16> for Uuid {
    fn eq(&self, other: &u16) -> bool {
        self.as_u16() == Some(*other)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.to_bytes_be();
        write!(
            f,
            "{}-{}-{}-{}-{}",
            hex::encode(&b[0..4]),
            hex::encode(&b[4..6]),
            hex::encode(&b[6..8]),
            hex::encode(&b[8..10]),
            hex::encode(&b[10..16])
        )
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.as_u16(), self.as_u32()) {
            (Some(short), _) => write!(f, "Uuid(0x{:04X})", short),
            (None, Some(short)) => write!(f, "Uuid(0x{:08X})", short),
            _ => write!(f, "Uuid({})", self),
        }
    }
}

/// Errors from parsing a textual UUID
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UuidParseError {
    #[error("UUID must have 4, 8 or 32 hex digits, got {0}")]
    InvalidLength(usize),

    #[error("Invalid hex in UUID: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl FromStr for Uuid {
    type Err = UuidParseError;

    /// Accepts `180A`, `0000180A`, and 128-bit forms with or without hyphens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|c| *c != '-').collect();

        match digits.len() {
            4 => {
                let mut be = [0u8; 2];
                hex::decode_to_slice(&digits, &mut be)?;
                Ok(Uuid::from_u16(u16::from_be_bytes(be)))
            }
            8 => {
                let mut be = [0u8; 4];
                hex::decode_to_slice(&digits, &mut be)?;
                Ok(Uuid::from_u32(u32::from_be_bytes(be)))
            }
            32 => {
                let mut be = [0u8; 16];
                hex::decode_to_slice(&digits, &mut be)?;
                Ok(Uuid::from_bytes_be(be))
            }
            n => Err(UuidParseError::InvalidLength(n)),
        }
    }
}
