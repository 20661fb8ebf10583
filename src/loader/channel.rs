//! Word-channel wire variants and the hardware collaborator trait.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{FosdError, Result};

/// Width of one word on the configuration channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordWidth {
    Eight,
    Sixteen,
}

/// Wire variant the target expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndianMode {
    /// One byte per word, bits as stored.
    #[default]
    Native8,
    /// One byte per word, bit order reversed (LSB-first targets).
    Swapped8,
    /// Two bytes per word, first byte in the low half.
    LittleEndian16,
    /// Two bytes per word, first byte in the high half.
    BigEndian16,
}

impl EndianMode {
    #[must_use]
    pub const fn width(self) -> WordWidth {
        match self {
            Self::Native8 | Self::Swapped8 => WordWidth::Eight,
            Self::LittleEndian16 | Self::BigEndian16 => WordWidth::Sixteen,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native8 => "native8",
            Self::Swapped8 => "swapped8",
            Self::LittleEndian16 => "le16",
            Self::BigEndian16 => "be16",
        }
    }
}

impl fmt::Display for EndianMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndianMode {
    type Err = FosdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "native8" | "8" => Ok(Self::Native8),
            "swapped8" => Ok(Self::Swapped8),
            "le16" | "16" => Ok(Self::LittleEndian16),
            "be16" => Ok(Self::BigEndian16),
            other => Err(FosdError::InvalidConfig {
                details: format!("unknown endian mode {other:?} (native8|swapped8|le16|be16)"),
            }),
        }
    }
}

/// Encode one block of image bytes into channel words.
///
/// In the 16-bit variants an odd trailing byte fills its own half of the
/// last word and the missing half is zero.
#[must_use]
pub fn encode_block(mode: EndianMode, bytes: &[u8]) -> Vec<u16> {
    match mode {
        EndianMode::Native8 => bytes.iter().map(|b| u16::from(*b)).collect(),
        EndianMode::Swapped8 => bytes.iter().map(|b| u16::from(b.reverse_bits())).collect(),
        EndianMode::LittleEndian16 => bytes
            .chunks(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
            .collect(),
        EndianMode::BigEndian16 => bytes
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
            .collect(),
    }
}

/// How long a ready-status check may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyPoll {
    /// Single non-blocking check for periodic health checks.
    Quick,
    /// One bounded poll during an actual load.
    Blocking,
}

/// Register/SPI primitives the loader drives.
///
/// The loader is the only caller while a transfer is active; the channel is
/// owned by it for the session's lifetime.
pub trait ConfigChannel {
    /// Drive the configuration reset line.
    fn set_reset(&mut self, asserted: bool) -> Result<()>;
    /// Whether the target acknowledged the reset.
    fn reset_done(&mut self) -> bool;
    /// Blocking write of one block of words.
    fn write_words(&mut self, width: WordWidth, words: &[u16]) -> Result<()>;
    /// Configuration-done status line.
    fn is_ready(&mut self, poll: ReadyPoll) -> bool;
}

impl<C: ConfigChannel + ?Sized> ConfigChannel for Box<C> {
    fn set_reset(&mut self, asserted: bool) -> Result<()> {
        (**self).set_reset(asserted)
    }

    fn reset_done(&mut self) -> bool {
        (**self).reset_done()
    }

    fn write_words(&mut self, width: WordWidth, words: &[u16]) -> Result<()> {
        (**self).write_words(width, words)
    }

    fn is_ready(&mut self, poll: ReadyPoll) -> bool {
        (**self).is_ready(poll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_variants() {
        assert_eq!(encode_block(EndianMode::Native8, &[0x01, 0x80]), vec![0x01, 0x80]);
        assert_eq!(encode_block(EndianMode::Swapped8, &[0x01, 0x80]), vec![0x80, 0x01]);
        assert_eq!(encode_block(EndianMode::Swapped8, &[0b1100_1010]), vec![0b0101_0011]);
    }

    #[test]
    fn sixteen_bit_variants() {
        assert_eq!(encode_block(EndianMode::LittleEndian16, &[0x34, 0x12]), vec![0x1234]);
        assert_eq!(encode_block(EndianMode::BigEndian16, &[0x12, 0x34]), vec![0x1234]);
    }

    #[test]
    fn odd_tail_padded_in_missing_half_only() {
        assert_eq!(
            encode_block(EndianMode::LittleEndian16, &[0x34, 0x12, 0xAB]),
            vec![0x1234, 0x00AB]
        );
        assert_eq!(
            encode_block(EndianMode::BigEndian16, &[0x12, 0x34, 0xAB]),
            vec![0x1234, 0xAB00]
        );
    }

    #[test]
    fn widths_and_parsing() {
        assert_eq!(EndianMode::Swapped8.width(), WordWidth::Eight);
        assert_eq!(EndianMode::BigEndian16.width(), WordWidth::Sixteen);
        assert_eq!("BE16".parse::<EndianMode>().unwrap(), EndianMode::BigEndian16);
        assert_eq!("le16".parse::<EndianMode>().unwrap(), EndianMode::LittleEndian16);
        assert!("32".parse::<EndianMode>().is_err());
    }
}
