//! MIDI Capability Inquiry: typed messages and an incremental SysEx-framed parser.

pub mod dispatcher;
pub mod types;

/// The MUID addressed by messages intended for every receiver.
pub const BROADCAST_MUID: u32 = 0x0FFF_FFFF;

/// The largest MUID a device may allocate for itself; values above it are reserved.
pub const MAX_USER_MUID: u32 = 0x0FFF_FEFF;

/// Universal non-realtime SysEx prefix byte.
pub const UNIVERSAL_NRT: u8 = 0x7E;

/// Sub-ID #1 marking a universal SysEx as MIDI-CI.
pub const SUB_ID_MIDI_CI: u8 = 0x0D;

/// Device id addressing the whole function block rather than a single channel.
pub const FUNCTION_BLOCK: u8 = 0x7F;

/// Capability Inquiry message kinds (SysEx sub-ID #2 values).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum Kind {
    ProfileInquiry = 0x20,
    ProfileInquiryReply = 0x21,
    ProfileSetOn = 0x22,
    ProfileSetOff = 0x23,
    ProfileEnabled = 0x24,
    ProfileDisabled = 0x25,
    ProfileAdded = 0x26,
    ProfileRemoved = 0x27,
    ProfileDetails = 0x28,
    ProfileDetailsReply = 0x29,
    ProfileSpecificData = 0x2F,

    PeCapability = 0x30,
    PeCapabilityReply = 0x31,
    PeGet = 0x34,
    PeGetReply = 0x35,
    PeSet = 0x36,
    PeSetReply = 0x37,
    PeSub = 0x38,
    PeSubReply = 0x39,
    PeNotify = 0x3F,

    PiCapability = 0x40,
    PiCapabilityReply = 0x41,
    PiMmReport = 0x42,
    PiMmReportReply = 0x43,
    PiMmReportEnd = 0x44,

    Discovery = 0x70,
    DiscoveryReply = 0x71,
    EndpointInfo = 0x72,
    EndpointInfoReply = 0x73,
    Ack = 0x7D,
    InvalidateMuid = 0x7E,
    Nak = 0x7F,
}

impl Kind {
    pub fn from_u8(v: u8) -> Option<Kind> {
        Some(match v {
            0x20 => Kind::ProfileInquiry,
            0x21 => Kind::ProfileInquiryReply,
            0x22 => Kind::ProfileSetOn,
            0x23 => Kind::ProfileSetOff,
            0x24 => Kind::ProfileEnabled,
            0x25 => Kind::ProfileDisabled,
            0x26 => Kind::ProfileAdded,
            0x27 => Kind::ProfileRemoved,
            0x28 => Kind::ProfileDetails,
            0x29 => Kind::ProfileDetailsReply,
            0x2F => Kind::ProfileSpecificData,
            0x30 => Kind::PeCapability,
            0x31 => Kind::PeCapabilityReply,
            0x34 => Kind::PeGet,
            0x35 => Kind::PeGetReply,
            0x36 => Kind::PeSet,
            0x37 => Kind::PeSetReply,
            0x38 => Kind::PeSub,
            0x39 => Kind::PeSubReply,
            0x3F => Kind::PeNotify,
            0x40 => Kind::PiCapability,
            0x41 => Kind::PiCapabilityReply,
            0x42 => Kind::PiMmReport,
            0x43 => Kind::PiMmReportReply,
            0x44 => Kind::PiMmReportEnd,
            0x70 => Kind::Discovery,
            0x71 => Kind::DiscoveryReply,
            0x72 => Kind::EndpointInfo,
            0x73 => Kind::EndpointInfoReply,
            0x7D => Kind::Ack,
            0x7E => Kind::InvalidateMuid,
            0x7F => Kind::Nak,
            _ => return None,
        })
    }
}

/// The fields common to every CI message, decoded from the 13-byte header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Header {
    /// The UMP group the carrying SysEx arrived on.
    pub group: u8,
    /// Raw sub-ID #2; [`Kind::from_u8`] names the known values.
    pub sub_id_2: u8,
    pub device_id: u8,
    /// The CI message format version (1 or 2).
    pub version: u8,
    pub source_muid: u32,
    pub destination_muid: u32,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            group: 0xFF,
            sub_id_2: 0,
            device_id: 0xFF,
            version: 1,
            source_muid: 0,
            destination_muid: 0,
        }
    }
}
