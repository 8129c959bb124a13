#![no_std]
#[cfg(feature = "std")]
#[macro_use]
extern crate std;

pub mod bitfield;
pub mod bytestream;
pub mod ci;
mod error;
pub mod fifo;
pub mod scale;
pub mod ump;

pub use bytestream::{BytestreamToUmp, UmpToBytestream, UsbMidi1ToBytestream};
pub use error::CodecError;
pub use fifo::Fifo;
pub use scale::{scale_down, scale_up};
pub use ump::to_midi1::UmpToMidi1;
pub use ump::MessageType;
