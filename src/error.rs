use core::fmt;
#[cfg(feature = "std")]
use std::error;

/// Wire decoding errors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CodecError {
    /// A byte of 7-bit encoded data had its top bit set. Well-formed MIDI SysEx payloads carry
    /// seven significant bits per byte.
    InvalidEncoding,

    /// A multi-byte field ended before all of its bytes arrived.
    NotEnoughBytes,
}

#[cfg(feature = "std")]
impl error::Error for CodecError {}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
