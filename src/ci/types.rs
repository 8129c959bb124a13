//! Typed records and wire codecs for every Capability Inquiry message.
//!
//! Each record mirrors the 7-bit-safe packed form used on the wire: multi-byte integers are
//! 7-bit little-endian and variable-length tails are length-prefixed. `from_bytes` functions
//! take the message body (after the 13-byte CI header) and the header's version field, which
//! selects between the v1 and v2 structural variants.

use crate::bitfield::{from_le7_u14, from_le7_u28, to_le7_u14, to_le7_u28};
use crate::CodecError;

fn need(bytes: &[u8], len: usize) -> Result<(), CodecError> {
    if bytes.len() < len {
        return Err(CodecError::NotEnoughBytes);
    }
    Ok(())
}

fn read_u14(bytes: &[u8], at: usize) -> Result<u16, CodecError> {
    need(bytes, at + 2)?;
    from_le7_u14([bytes[at], bytes[at + 1]])
}

fn read_u28(bytes: &[u8], at: usize) -> Result<u32, CodecError> {
    need(bytes, at + 4)?;
    from_le7_u28([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// A five-byte profile identifier: either a manufacturer-specific id or a standard defined
/// profile.
pub type ProfileId = [u8; 5];

/// A borrowed list of five-byte profile ids.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileList<'a>(&'a [u8]);

impl<'a> ProfileList<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        debug_assert!(bytes.len() % 5 == 0);
        ProfileList(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len() / 5
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ProfileId> + 'a {
        self.0.chunks_exact(5).map(|c| [c[0], c[1], c[2], c[3], c[4]])
    }
}

//  Management messages.

/// Announces a device and its capabilities to the bus.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Discovery {
    pub manufacturer: [u8; 3],
    pub family: u16,
    pub model: u16,
    pub version: [u8; 4],
    pub capability: u8,
    pub max_sysex_size: u32,
    /// v2 only; zero under v1.
    pub output_path_id: u8,
}

impl Discovery {
    pub const SIZE_V1: usize = 16;
    pub const SIZE_V2: usize = 17;

    pub fn from_bytes(version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        need(bytes, Self::SIZE_V1)?;
        let output_path_id = if version > 1 {
            need(bytes, Self::SIZE_V2)?;
            bytes[16]
        } else {
            0
        };
        Ok(Discovery {
            manufacturer: [bytes[0], bytes[1], bytes[2]],
            family: read_u14(bytes, 3)?,
            model: read_u14(bytes, 5)?,
            version: [bytes[7], bytes[8], bytes[9], bytes[10]],
            capability: bytes[11],
            max_sysex_size: read_u28(bytes, 12)?,
            output_path_id,
        })
    }

    pub fn to_bytes(&self, version: u8, out: &mut [u8]) -> Result<usize, CodecError> {
        let size = if version > 1 { Self::SIZE_V2 } else { Self::SIZE_V1 };
        need(out, size)?;
        out[0..3].copy_from_slice(&self.manufacturer);
        out[3..5].copy_from_slice(&to_le7_u14(self.family));
        out[5..7].copy_from_slice(&to_le7_u14(self.model));
        out[7..11].copy_from_slice(&self.version);
        out[11] = self.capability;
        out[12..16].copy_from_slice(&to_le7_u28(self.max_sysex_size));
        if version > 1 {
            out[16] = self.output_path_id;
        }
        Ok(size)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DiscoveryReply {
    pub manufacturer: [u8; 3],
    pub family: u16,
    pub model: u16,
    pub version: [u8; 4],
    pub capability: u8,
    pub max_sysex_size: u32,
    /// v2 only; zero under v1.
    pub output_path_id: u8,
    /// v2 only; zero under v1.
    pub function_block: u8,
}

impl DiscoveryReply {
    pub const SIZE_V1: usize = 16;
    pub const SIZE_V2: usize = 18;

    pub fn from_bytes(version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        need(bytes, Self::SIZE_V1)?;
        let (output_path_id, function_block) = if version > 1 {
            need(bytes, Self::SIZE_V2)?;
            (bytes[16], bytes[17])
        } else {
            (0, 0)
        };
        Ok(DiscoveryReply {
            manufacturer: [bytes[0], bytes[1], bytes[2]],
            family: read_u14(bytes, 3)?,
            model: read_u14(bytes, 5)?,
            version: [bytes[7], bytes[8], bytes[9], bytes[10]],
            capability: bytes[11],
            max_sysex_size: read_u28(bytes, 12)?,
            output_path_id,
            function_block,
        })
    }

    pub fn to_bytes(&self, version: u8, out: &mut [u8]) -> Result<usize, CodecError> {
        let size = if version > 1 { Self::SIZE_V2 } else { Self::SIZE_V1 };
        need(out, size)?;
        out[0..3].copy_from_slice(&self.manufacturer);
        out[3..5].copy_from_slice(&to_le7_u14(self.family));
        out[5..7].copy_from_slice(&to_le7_u14(self.model));
        out[7..11].copy_from_slice(&self.version);
        out[11] = self.capability;
        out[12..16].copy_from_slice(&to_le7_u28(self.max_sysex_size));
        if version > 1 {
            out[16] = self.output_path_id;
            out[17] = self.function_block;
        }
        Ok(size)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct EndpointInfo {
    pub status: u8,
}

impl EndpointInfo {
    pub const SIZE: usize = 1;

    pub fn from_bytes(_version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        need(bytes, Self::SIZE)?;
        Ok(EndpointInfo { status: bytes[0] })
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EndpointInfoReply<'a> {
    pub status: u8,
    pub information: &'a [u8],
}

impl<'a> EndpointInfoReply<'a> {
    /// Status byte plus the 14-bit data length; the data follows.
    pub const FIXED_SIZE: usize = 3;

    pub fn data_length(bytes: &[u8]) -> Result<usize, CodecError> {
        Ok(read_u14(bytes, 1)? as usize)
    }

    pub fn from_bytes(_version: u8, bytes: &'a [u8]) -> Result<Self, CodecError> {
        let length = Self::data_length(bytes)?;
        need(bytes, Self::FIXED_SIZE + length)?;
        Ok(EndpointInfoReply {
            status: bytes[0],
            information: &bytes[Self::FIXED_SIZE..Self::FIXED_SIZE + length],
        })
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct InvalidateMuid {
    pub target_muid: u32,
}

impl InvalidateMuid {
    pub const SIZE: usize = 4;

    pub fn from_bytes(_version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(InvalidateMuid { target_muid: read_u28(bytes, 0)? })
    }

    pub fn to_bytes(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        need(out, Self::SIZE)?;
        out[0..4].copy_from_slice(&to_le7_u28(self.target_muid));
        Ok(Self::SIZE)
    }
}

/// A positive acknowledgement, echoing the offending transaction and an optional text.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Ack<'a> {
    pub original_id: u8,
    pub status_code: u8,
    pub status_data: u8,
    pub details: [u8; 5],
    pub message: &'a [u8],
}

impl<'a> Ack<'a> {
    /// The fixed part: ids, status, details and the 14-bit message length.
    pub const FIXED_SIZE: usize = 10;

    pub fn message_length(bytes: &[u8]) -> Result<usize, CodecError> {
        Ok(read_u14(bytes, 8)? as usize)
    }

    pub fn from_bytes(_version: u8, bytes: &'a [u8]) -> Result<Self, CodecError> {
        let length = Self::message_length(bytes)?;
        need(bytes, Self::FIXED_SIZE + length)?;
        Ok(Ack {
            original_id: bytes[0],
            status_code: bytes[1],
            status_data: bytes[2],
            details: [bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]],
            message: &bytes[Self::FIXED_SIZE..Self::FIXED_SIZE + length],
        })
    }
}

/// A negative acknowledgement. Under v1 the message has no body at all; under v2 it mirrors
/// [`Ack`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Nak<'a> {
    pub original_id: u8,
    pub status_code: u8,
    pub status_data: u8,
    pub details: [u8; 5],
    pub message: &'a [u8],
}

impl<'a> Nak<'a> {
    pub const FIXED_SIZE_V2: usize = 10;

    pub fn from_bytes(version: u8, bytes: &'a [u8]) -> Result<Self, CodecError> {
        if version == 1 {
            return Ok(Nak::default());
        }
        let length = read_u14(bytes, 8)? as usize;
        need(bytes, Self::FIXED_SIZE_V2 + length)?;
        Ok(Nak {
            original_id: bytes[0],
            status_code: bytes[1],
            status_data: bytes[2],
            details: [bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]],
            message: &bytes[Self::FIXED_SIZE_V2..Self::FIXED_SIZE_V2 + length],
        })
    }
}

//  Profile configuration messages.

/// The enabled and disabled profile id lists of a profile inquiry reply.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileInquiryReply<'a> {
    pub enabled: ProfileList<'a>,
    pub disabled: ProfileList<'a>,
}

impl<'a> ProfileInquiryReply<'a> {
    pub fn from_bytes(_version: u8, bytes: &'a [u8]) -> Result<Self, CodecError> {
        let num_enabled = read_u14(bytes, 0)? as usize;
        let enabled_end = 2 + num_enabled * 5;
        let num_disabled = read_u14(bytes, enabled_end)? as usize;
        let disabled_start = enabled_end + 2;
        let disabled_end = disabled_start + num_disabled * 5;
        need(bytes, disabled_end)?;
        Ok(ProfileInquiryReply {
            enabled: ProfileList::new(&bytes[2..enabled_end]),
            disabled: ProfileList::new(&bytes[disabled_start..disabled_end]),
        })
    }
}

macro_rules! plain_profile_message {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        pub struct $name {
            pub pid: ProfileId,
        }

        impl $name {
            pub const SIZE: usize = 5;

            pub fn from_bytes(_version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
                need(bytes, Self::SIZE)?;
                Ok($name { pid: [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]] })
            }
        }
    };
}

plain_profile_message!(ProfileAdded);
plain_profile_message!(ProfileRemoved);

macro_rules! channeled_profile_message {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        pub struct $name {
            pub pid: ProfileId,
            /// v2 only; zero under v1.
            pub num_channels: u16,
        }

        impl $name {
            pub const SIZE_V1: usize = 5;
            pub const SIZE_V2: usize = 7;

            pub fn from_bytes(version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
                need(bytes, Self::SIZE_V1)?;
                let num_channels = if version > 1 { read_u14(bytes, 5)? } else { 0 };
                Ok($name {
                    pid: [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]],
                    num_channels,
                })
            }
        }
    };
}

channeled_profile_message!(ProfileOn);
channeled_profile_message!(ProfileOff);
channeled_profile_message!(ProfileEnabled);
channeled_profile_message!(ProfileDisabled);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ProfileDetails {
    pub pid: ProfileId,
    pub target: u8,
}

impl ProfileDetails {
    pub const SIZE: usize = 6;

    pub fn from_bytes(_version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        need(bytes, Self::SIZE)?;
        Ok(ProfileDetails {
            pid: [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]],
            target: bytes[5],
        })
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileDetailsReply<'a> {
    pub pid: ProfileId,
    pub target: u8,
    pub data: &'a [u8],
}

impl<'a> ProfileDetailsReply<'a> {
    /// Profile id, target and the 14-bit data length.
    pub const FIXED_SIZE: usize = 8;

    pub fn data_length(bytes: &[u8]) -> Result<usize, CodecError> {
        Ok(read_u14(bytes, 6)? as usize)
    }

    pub fn from_bytes(_version: u8, bytes: &'a [u8]) -> Result<Self, CodecError> {
        let length = Self::data_length(bytes)?;
        need(bytes, Self::FIXED_SIZE + length)?;
        Ok(ProfileDetailsReply {
            pid: [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]],
            target: bytes[5],
            data: &bytes[Self::FIXED_SIZE..Self::FIXED_SIZE + length],
        })
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileSpecificData<'a> {
    pub pid: ProfileId,
    pub data: &'a [u8],
}

impl<'a> ProfileSpecificData<'a> {
    pub const FIXED_SIZE: usize = 7;

    pub fn data_length(bytes: &[u8]) -> Result<usize, CodecError> {
        Ok(read_u14(bytes, 5)? as usize)
    }

    pub fn from_bytes(_version: u8, bytes: &'a [u8]) -> Result<Self, CodecError> {
        let length = Self::data_length(bytes)?;
        need(bytes, Self::FIXED_SIZE + length)?;
        Ok(ProfileSpecificData {
            pid: [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]],
            data: &bytes[Self::FIXED_SIZE..Self::FIXED_SIZE + length],
        })
    }
}

//  Property exchange messages.

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PeCapabilities {
    pub num_simultaneous: u8,
    /// v2 only; zero under v1.
    pub major_version: u8,
    /// v2 only; zero under v1.
    pub minor_version: u8,
}

impl PeCapabilities {
    pub const SIZE_V1: usize = 1;
    pub const SIZE_V2: usize = 3;

    pub fn from_bytes(version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        need(bytes, Self::SIZE_V1)?;
        let (major_version, minor_version) = if version > 1 {
            need(bytes, Self::SIZE_V2)?;
            (bytes[1], bytes[2])
        } else {
            (0, 0)
        };
        Ok(PeCapabilities { num_simultaneous: bytes[0], major_version, minor_version })
    }
}

/// How a chunked property exchange body is split: chunk `chunk_number` of
/// `number_of_chunks`, both starting at one.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ChunkInfo {
    pub number_of_chunks: u16,
    pub chunk_number: u16,
}

/// The body shared by the chunked property exchange messages: a request id, a JSON header
/// and (except for inquiries) JSON data.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PropertyExchange<'a> {
    pub chunk: ChunkInfo,
    pub request_id: u8,
    pub header: &'a [u8],
    pub data: &'a [u8],
}

impl<'a> PropertyExchange<'a> {
    /// Request id plus the 14-bit header length; the header bytes follow.
    pub const PT1_FIXED_SIZE: usize = 3;
    /// Chunk counts plus the 14-bit data length; the data bytes follow.
    pub const PT2_FIXED_SIZE: usize = 6;

    pub fn header_length(bytes: &[u8]) -> Result<usize, CodecError> {
        Ok(read_u14(bytes, 1)? as usize)
    }

    pub fn from_bytes(_version: u8, bytes: &'a [u8]) -> Result<Self, CodecError> {
        let header_length = Self::header_length(bytes)?;
        let pt2 = Self::PT1_FIXED_SIZE + header_length;
        let data_length = read_u14(bytes, pt2 + 4)? as usize;
        let data_start = pt2 + Self::PT2_FIXED_SIZE;
        need(bytes, data_start + data_length)?;
        Ok(PropertyExchange {
            chunk: ChunkInfo {
                number_of_chunks: read_u14(bytes, pt2)?,
                chunk_number: read_u14(bytes, pt2 + 2)?,
            },
            request_id: bytes[0],
            header: &bytes[Self::PT1_FIXED_SIZE..pt2],
            data: &bytes[data_start..data_start + data_length],
        })
    }
}

//  Process inquiry messages.

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PiCapabilitiesReply {
    pub features: u8,
}

impl PiCapabilitiesReply {
    pub const SIZE: usize = 1;

    pub fn from_bytes(_version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        need(bytes, Self::SIZE)?;
        Ok(PiCapabilitiesReply { features: bytes[0] })
    }
}

/// Requests a report of the messages a device transmits. The three flag bytes select system,
/// channel controller and note data message categories bit by bit.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MidiMessageReport {
    pub message_data_control: u8,
    pub system_message: u8,
    pub channel_controller: u8,
    pub note_data: u8,
}

impl MidiMessageReport {
    /// A reserved byte sits between the system and channel controller flags.
    pub const SIZE: usize = 5;

    pub fn from_bytes(_version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        need(bytes, Self::SIZE)?;
        Ok(MidiMessageReport {
            message_data_control: bytes[0],
            system_message: bytes[1],
            channel_controller: bytes[3],
            note_data: bytes[4],
        })
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MidiMessageReportReply {
    pub system_message: u8,
    pub channel_controller: u8,
    pub note_data: u8,
}

impl MidiMessageReportReply {
    pub const SIZE: usize = 4;

    pub fn from_bytes(_version: u8, bytes: &[u8]) -> Result<Self, CodecError> {
        need(bytes, Self::SIZE)?;
        Ok(MidiMessageReportReply {
            system_message: bytes[0],
            channel_controller: bytes[2],
            note_data: bytes[3],
        })
    }
}
