//! The Capability Inquiry dispatcher: an incremental parser over the 7-bit payload of a
//! MIDI-CI SysEx, dispatching typed messages to per-family backends.
//!
//! Feed it the bytes between a SysEx start and end (the `7E ...` universal payload) with
//! [`Dispatcher::push`], bracketed by [`Dispatcher::start_sysex7`]. Bytes accumulate into a
//! fixed scratch buffer; the parse advances in phases sized by a `(kind, version)` table, so
//! variable-length tails never require allocation.

use crate::ci::{types, Header, Kind, BROADCAST_MUID, SUB_ID_MIDI_CI, UNIVERSAL_NRT};
use crate::bitfield::from_le7_u28;

/// Scratch space for one message body. A message whose variable parts exceed this is
/// reported through `buffer_overflow` and discarded.
pub const BUFFER_CAPACITY: usize = 512;

/// The 13-byte fixed header that starts every CI message.
const HEADER_SIZE: usize = 13;

pub trait ManagementBackend<C> {
    /// Accepts or rejects a non-broadcast destination MUID. Messages whose destination is
    /// rejected are dropped without any further callback.
    fn check_muid(&mut self, _context: &mut C, _group: u8, _muid: u32) -> bool {
        false
    }

    fn discovery(&mut self, _context: &mut C, _header: &Header, _message: types::Discovery) {}
    fn discovery_reply(&mut self, _context: &mut C, _header: &Header, _message: types::DiscoveryReply) {}
    fn endpoint_info(&mut self, _context: &mut C, _header: &Header, _message: types::EndpointInfo) {}
    fn endpoint_info_reply(
        &mut self,
        _context: &mut C,
        _header: &Header,
        _message: types::EndpointInfoReply,
    ) {
    }
    fn invalidate_muid(&mut self, _context: &mut C, _header: &Header, _message: types::InvalidateMuid) {}
    fn ack(&mut self, _context: &mut C, _header: &Header, _message: types::Ack) {}
    fn nak(&mut self, _context: &mut C, _header: &Header, _message: types::Nak) {}

    /// A structurally valid header with an unrecognised prefix or sub-ID.
    fn unknown(&mut self, _context: &mut C, _header: &Header) {}
    /// A message body outgrew the scratch buffer; the message is discarded.
    fn buffer_overflow(&mut self, _context: &mut C) {}
}

pub trait ProfileBackend<C> {
    fn inquiry(&mut self, _context: &mut C, _header: &Header) {}
    fn inquiry_reply(&mut self, _context: &mut C, _header: &Header, _message: types::ProfileInquiryReply) {
    }
    fn added(&mut self, _context: &mut C, _header: &Header, _message: types::ProfileAdded) {}
    fn removed(&mut self, _context: &mut C, _header: &Header, _message: types::ProfileRemoved) {}
    fn details(&mut self, _context: &mut C, _header: &Header, _message: types::ProfileDetails) {}
    fn details_reply(
        &mut self,
        _context: &mut C,
        _header: &Header,
        _message: types::ProfileDetailsReply,
    ) {
    }
    fn on(&mut self, _context: &mut C, _header: &Header, _message: types::ProfileOn) {}
    fn off(&mut self, _context: &mut C, _header: &Header, _message: types::ProfileOff) {}
    fn enabled(&mut self, _context: &mut C, _header: &Header, _message: types::ProfileEnabled) {}
    fn disabled(&mut self, _context: &mut C, _header: &Header, _message: types::ProfileDisabled) {}
    fn specific_data(
        &mut self,
        _context: &mut C,
        _header: &Header,
        _message: types::ProfileSpecificData,
    ) {
    }
}

pub trait PropertyExchangeBackend<C> {
    fn capabilities(&mut self, _context: &mut C, _header: &Header, _message: types::PeCapabilities) {}
    fn capabilities_reply(
        &mut self,
        _context: &mut C,
        _header: &Header,
        _message: types::PeCapabilities,
    ) {
    }
    fn get(&mut self, _context: &mut C, _header: &Header, _message: types::PropertyExchange) {}
    fn get_reply(&mut self, _context: &mut C, _header: &Header, _message: types::PropertyExchange) {}
    fn set(&mut self, _context: &mut C, _header: &Header, _message: types::PropertyExchange) {}
    fn set_reply(&mut self, _context: &mut C, _header: &Header, _message: types::PropertyExchange) {}
    fn subscription(&mut self, _context: &mut C, _header: &Header, _message: types::PropertyExchange) {}
    fn subscription_reply(
        &mut self,
        _context: &mut C,
        _header: &Header,
        _message: types::PropertyExchange,
    ) {
    }
    fn notify(&mut self, _context: &mut C, _header: &Header, _message: types::PropertyExchange) {}
}

pub trait ProcessInquiryBackend<C> {
    fn capabilities(&mut self, _context: &mut C, _header: &Header) {}
    fn capabilities_reply(
        &mut self,
        _context: &mut C,
        _header: &Header,
        _message: types::PiCapabilitiesReply,
    ) {
    }
    fn midi_message_report(
        &mut self,
        _context: &mut C,
        _header: &Header,
        _message: types::MidiMessageReport,
    ) {
    }
    fn midi_message_report_reply(
        &mut self,
        _context: &mut C,
        _header: &Header,
        _message: types::MidiMessageReportReply,
    ) {
    }
    fn midi_message_report_end(&mut self, _context: &mut C, _header: &Header) {}
}

/// Implements every backend trait as a no-op (and rejects every MUID).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Null;

impl<C> ManagementBackend<C> for Null {}
impl<C> ProfileBackend<C> for Null {}
impl<C> PropertyExchangeBackend<C> for Null {}
impl<C> ProcessInquiryBackend<C> for Null {}

/// One backend per message family plus the context value handed to every callback.
pub struct Config<C, M = Null, P = Null, PE = Null, PI = Null> {
    pub context: C,
    pub management: M,
    pub profile: P,
    pub property_exchange: PE,
    pub process_inquiry: PI,
}

impl<C> Config<C> {
    pub fn new(context: C) -> Self {
        Config {
            context,
            management: Null,
            profile: Null,
            property_exchange: Null,
            process_inquiry: Null,
        }
    }
}

/// The parse phase: which parser consumes the buffer once the awaited byte count arrives.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Consumer {
    Header,
    Discovery,
    DiscoveryReply,
    EndpointInfo,
    EndpointInfoReply,
    InvalidateMuid,
    Ack,
    Nak,
    ProfileInquiry,
    ProfileInquiryReply,
    ProfileAdded,
    ProfileRemoved,
    ProfileDetails,
    ProfileDetailsReply,
    ProfileOn,
    ProfileOff,
    ProfileEnabled,
    ProfileDisabled,
    ProfileSpecificData,
    PeCapabilities,
    PeCapabilitiesReply,
    PropertyExchange,
    PiCapabilities,
    PiCapabilitiesReply,
    PiMmReport,
    PiMmReportReply,
    PiMmReportEnd,
    Discard,
}

/// The fixed body size awaited after the header, keyed by message kind and version. For
/// messages with variable-length tails this is the prefix holding the length field(s).
fn fixed_size(kind: Kind, version: u8) -> usize {
    let v1 = version == 1;
    match kind {
        Kind::Discovery => {
            if v1 {
                types::Discovery::SIZE_V1
            } else {
                types::Discovery::SIZE_V2
            }
        }
        Kind::DiscoveryReply => {
            if v1 {
                types::DiscoveryReply::SIZE_V1
            } else {
                types::DiscoveryReply::SIZE_V2
            }
        }
        Kind::EndpointInfo => types::EndpointInfo::SIZE,
        Kind::EndpointInfoReply => types::EndpointInfoReply::FIXED_SIZE,
        Kind::InvalidateMuid => types::InvalidateMuid::SIZE,
        Kind::Ack => types::Ack::FIXED_SIZE,
        Kind::Nak => {
            if v1 {
                0
            } else {
                types::Nak::FIXED_SIZE_V2
            }
        }
        Kind::ProfileInquiry => 0,
        Kind::ProfileInquiryReply => 2,
        Kind::ProfileAdded | Kind::ProfileRemoved => types::ProfileAdded::SIZE,
        Kind::ProfileDetails => types::ProfileDetails::SIZE,
        Kind::ProfileDetailsReply => types::ProfileDetailsReply::FIXED_SIZE,
        Kind::ProfileSetOn | Kind::ProfileSetOff | Kind::ProfileEnabled | Kind::ProfileDisabled => {
            if v1 {
                types::ProfileOn::SIZE_V1
            } else {
                types::ProfileOn::SIZE_V2
            }
        }
        Kind::ProfileSpecificData => types::ProfileSpecificData::FIXED_SIZE,
        Kind::PeCapability | Kind::PeCapabilityReply => {
            if v1 {
                types::PeCapabilities::SIZE_V1
            } else {
                types::PeCapabilities::SIZE_V2
            }
        }
        Kind::PeGet
        | Kind::PeGetReply
        | Kind::PeSet
        | Kind::PeSetReply
        | Kind::PeSub
        | Kind::PeSubReply
        | Kind::PeNotify => types::PropertyExchange::PT1_FIXED_SIZE,
        Kind::PiCapability | Kind::PiMmReportEnd => 0,
        Kind::PiCapabilityReply => {
            if v1 {
                0
            } else {
                types::PiCapabilitiesReply::SIZE
            }
        }
        Kind::PiMmReport => {
            if v1 {
                0
            } else {
                types::MidiMessageReport::SIZE
            }
        }
        Kind::PiMmReportReply => {
            if v1 {
                0
            } else {
                types::MidiMessageReportReply::SIZE
            }
        }
    }
}

fn consumer_for(kind: Kind) -> Consumer {
    match kind {
        Kind::Discovery => Consumer::Discovery,
        Kind::DiscoveryReply => Consumer::DiscoveryReply,
        Kind::EndpointInfo => Consumer::EndpointInfo,
        Kind::EndpointInfoReply => Consumer::EndpointInfoReply,
        Kind::InvalidateMuid => Consumer::InvalidateMuid,
        Kind::Ack => Consumer::Ack,
        Kind::Nak => Consumer::Nak,
        Kind::ProfileInquiry => Consumer::ProfileInquiry,
        Kind::ProfileInquiryReply => Consumer::ProfileInquiryReply,
        Kind::ProfileAdded => Consumer::ProfileAdded,
        Kind::ProfileRemoved => Consumer::ProfileRemoved,
        Kind::ProfileDetails => Consumer::ProfileDetails,
        Kind::ProfileDetailsReply => Consumer::ProfileDetailsReply,
        Kind::ProfileSetOn => Consumer::ProfileOn,
        Kind::ProfileSetOff => Consumer::ProfileOff,
        Kind::ProfileEnabled => Consumer::ProfileEnabled,
        Kind::ProfileDisabled => Consumer::ProfileDisabled,
        Kind::ProfileSpecificData => Consumer::ProfileSpecificData,
        Kind::PeCapability => Consumer::PeCapabilities,
        Kind::PeCapabilityReply => Consumer::PeCapabilitiesReply,
        Kind::PeGet
        | Kind::PeGetReply
        | Kind::PeSet
        | Kind::PeSetReply
        | Kind::PeSub
        | Kind::PeSubReply
        | Kind::PeNotify => Consumer::PropertyExchange,
        Kind::PiCapability => Consumer::PiCapabilities,
        Kind::PiCapabilityReply => Consumer::PiCapabilitiesReply,
        Kind::PiMmReport => Consumer::PiMmReport,
        Kind::PiMmReportReply => Consumer::PiMmReportReply,
        Kind::PiMmReportEnd => Consumer::PiMmReportEnd,
    }
}

/// Parses MIDI-CI SysEx payloads and dispatches each complete message to a typed backend
/// method exactly once.
pub struct Dispatcher<C, M = Null, P = Null, PE = Null, PI = Null> {
    config: Config<C, M, P, PE, PI>,
    header: Header,
    buffer: [u8; BUFFER_CAPACITY],
    pos: usize,
    count: usize,
    consumer: Consumer,
}

impl<C, M, P, PE, PI> Dispatcher<C, M, P, PE, PI>
where
    M: ManagementBackend<C>,
    P: ProfileBackend<C>,
    PE: PropertyExchangeBackend<C>,
    PI: ProcessInquiryBackend<C>,
{
    pub fn new(config: Config<C, M, P, PE, PI>) -> Self {
        Dispatcher {
            config,
            header: Header::default(),
            buffer: [0; BUFFER_CAPACITY],
            pos: 0,
            count: HEADER_SIZE,
            consumer: Consumer::Header,
        }
    }

    pub fn context(&self) -> &C {
        &self.config.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.config.context
    }

    /// Begins a new CI SysEx arriving on `group`, addressed to `device_id`. Any in-flight
    /// parse is abandoned.
    pub fn start_sysex7(&mut self, group: u8, device_id: u8) {
        self.header = Header { group, device_id, ..Header::default() };
        self.pos = 0;
        self.count = HEADER_SIZE;
        self.consumer = Consumer::Header;
    }

    /// Marks the end of the SysEx begun by [`start_sysex7`](Self::start_sysex7).
    pub fn end_sysex7(&mut self) {}

    /// Feeds one 7-bit payload byte.
    pub fn push(&mut self, byte: u8) {
        if self.count > 0 {
            if self.pos >= self.buffer.len() {
                self.overflow();
                return;
            }
            self.buffer[self.pos] = byte;
            self.pos += 1;
            self.count -= 1;
        }
        while self.count == 0 {
            self.step();
        }
    }

    fn overflow(&mut self) {
        self.pos = 0;
        self.count = 0;
        self.consumer = Consumer::Discard;
        self.config.management.buffer_overflow(&mut self.config.context);
    }

    fn discard(&mut self) {
        self.pos = 0;
        self.count = self.buffer.len();
        self.consumer = Consumer::Discard;
    }

    fn step(&mut self) {
        match self.consumer {
            Consumer::Discard => {
                self.pos = 0;
                self.count = self.buffer.len();
            }
            Consumer::Header => self.parse_header(),
            Consumer::Discovery => self.discovery(),
            Consumer::DiscoveryReply => self.discovery_reply(),
            Consumer::EndpointInfo => self.endpoint_info(),
            Consumer::EndpointInfoReply => self.endpoint_info_reply(),
            Consumer::InvalidateMuid => self.invalidate_muid(),
            Consumer::Ack => self.ack(),
            Consumer::Nak => self.nak(),
            Consumer::ProfileInquiry => {
                self.config.profile.inquiry(&mut self.config.context, &self.header);
                self.discard();
            }
            Consumer::ProfileInquiryReply => self.profile_inquiry_reply(),
            Consumer::ProfileAdded => self.profile_added(),
            Consumer::ProfileRemoved => self.profile_removed(),
            Consumer::ProfileDetails => self.profile_details(),
            Consumer::ProfileDetailsReply => self.profile_details_reply(),
            Consumer::ProfileOn => self.profile_on(),
            Consumer::ProfileOff => self.profile_off(),
            Consumer::ProfileEnabled => self.profile_enabled(),
            Consumer::ProfileDisabled => self.profile_disabled(),
            Consumer::ProfileSpecificData => self.profile_specific_data(),
            Consumer::PeCapabilities => self.pe_capabilities(false),
            Consumer::PeCapabilitiesReply => self.pe_capabilities(true),
            Consumer::PropertyExchange => self.property_exchange(),
            Consumer::PiCapabilities => {
                if self.header.version > 1 {
                    self.config.process_inquiry.capabilities(&mut self.config.context, &self.header);
                }
                self.discard();
            }
            Consumer::PiCapabilitiesReply => self.pi_capabilities_reply(),
            Consumer::PiMmReport => self.pi_mm_report(),
            Consumer::PiMmReportReply => self.pi_mm_report_reply(),
            Consumer::PiMmReportEnd => {
                if self.header.version > 1 {
                    self.config
                        .process_inquiry
                        .midi_message_report_end(&mut self.config.context, &self.header);
                }
                self.discard();
            }
        }
    }

    fn parse_header(&mut self) {
        let b = &self.buffer[..HEADER_SIZE];
        self.header.device_id = b[1];
        self.header.sub_id_2 = b[3];
        self.header.version = b[4];
        let source = from_le7_u28([b[5], b[6], b[7], b[8]]);
        let destination = from_le7_u28([b[9], b[10], b[11], b[12]]);
        self.pos = 0;
        let (source, destination) = match (source, destination) {
            (Ok(s), Ok(d)) => (s, d),
            _ => {
                log::debug!("dropping CI message with a malformed MUID encoding");
                self.discard();
                return;
            }
        };
        self.header.source_muid = source;
        self.header.destination_muid = destination;

        if b[0] != UNIVERSAL_NRT || b[2] != SUB_ID_MIDI_CI {
            self.config.management.unknown(&mut self.config.context, &self.header);
            self.discard();
            return;
        }
        let kind = match Kind::from_u8(self.header.sub_id_2) {
            Some(kind) => kind,
            None => {
                self.config.management.unknown(&mut self.config.context, &self.header);
                self.discard();
                return;
            }
        };
        if destination != BROADCAST_MUID
            && !self.config.management.check_muid(
                &mut self.config.context,
                self.header.group,
                destination,
            )
        {
            // Not addressed to us.
            self.discard();
            return;
        }
        self.consumer = consumer_for(kind);
        self.count = fixed_size(kind, self.header.version);
    }

    fn discovery(&mut self) {
        match types::Discovery::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.management.discovery(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed discovery: {e}"),
        }
        self.discard();
    }

    fn discovery_reply(&mut self) {
        match types::DiscoveryReply::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => {
                self.config.management.discovery_reply(&mut self.config.context, &self.header, m)
            }
            Err(e) => log::debug!("dropping malformed discovery reply: {e}"),
        }
        self.discard();
    }

    fn endpoint_info(&mut self) {
        match types::EndpointInfo::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.management.endpoint_info(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed endpoint info: {e}"),
        }
        self.discard();
    }

    fn endpoint_info_reply(&mut self) {
        let body = &self.buffer[..self.pos];
        match types::EndpointInfoReply::data_length(body) {
            Ok(length) if self.pos == types::EndpointInfoReply::FIXED_SIZE && length > 0 => {
                self.count = length;
            }
            Ok(_) => {
                match types::EndpointInfoReply::from_bytes(self.header.version, body) {
                    Ok(m) => self.config.management.endpoint_info_reply(
                        &mut self.config.context,
                        &self.header,
                        m,
                    ),
                    Err(e) => log::debug!("dropping malformed endpoint info reply: {e}"),
                }
                self.discard();
            }
            Err(_) => self.discard(),
        }
    }

    fn invalidate_muid(&mut self) {
        match types::InvalidateMuid::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => {
                self.config.management.invalidate_muid(&mut self.config.context, &self.header, m)
            }
            Err(e) => log::debug!("dropping malformed invalidate MUID: {e}"),
        }
        self.discard();
    }

    fn ack(&mut self) {
        let body = &self.buffer[..self.pos];
        match types::Ack::message_length(body) {
            Ok(length) if self.pos == types::Ack::FIXED_SIZE && length > 0 => self.count = length,
            Ok(_) => {
                match types::Ack::from_bytes(self.header.version, body) {
                    Ok(m) => self.config.management.ack(&mut self.config.context, &self.header, m),
                    Err(e) => log::debug!("dropping malformed ack: {e}"),
                }
                self.discard();
            }
            Err(_) => self.discard(),
        }
    }

    fn nak(&mut self) {
        if self.header.version == 1 {
            self.config.management.nak(&mut self.config.context, &self.header, types::Nak::default());
            self.discard();
            return;
        }
        let body = &self.buffer[..self.pos];
        match types::Ack::message_length(body) {
            Ok(length) if self.pos == types::Nak::FIXED_SIZE_V2 && length > 0 => self.count = length,
            Ok(_) => {
                match types::Nak::from_bytes(self.header.version, body) {
                    Ok(m) => self.config.management.nak(&mut self.config.context, &self.header, m),
                    Err(e) => log::debug!("dropping malformed nak: {e}"),
                }
                self.discard();
            }
            Err(_) => self.discard(),
        }
    }

    fn profile_inquiry_reply(&mut self) {
        let body = &self.buffer[..self.pos];
        let num_enabled = match crate::bitfield::from_le7_u14([body[0], body[1]]) {
            Ok(n) => n as usize * 5,
            Err(_) => {
                self.discard();
                return;
            }
        };
        if self.pos == 2 {
            // The enabled ids plus the disabled count field.
            self.count = num_enabled + 2;
            return;
        }
        let pt2 = 2 + num_enabled;
        let num_disabled = match crate::bitfield::from_le7_u14([body[pt2], body[pt2 + 1]]) {
            Ok(n) => n as usize * 5,
            Err(_) => {
                self.discard();
                return;
            }
        };
        if self.pos == pt2 + 2 && num_disabled > 0 {
            self.count = num_disabled;
            return;
        }
        match types::ProfileInquiryReply::from_bytes(self.header.version, body) {
            Ok(m) => self.config.profile.inquiry_reply(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed profile inquiry reply: {e}"),
        }
        self.discard();
    }

    fn profile_added(&mut self) {
        match types::ProfileAdded::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.profile.added(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed profile added: {e}"),
        }
        self.discard();
    }

    fn profile_removed(&mut self) {
        match types::ProfileRemoved::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.profile.removed(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed profile removed: {e}"),
        }
        self.discard();
    }

    fn profile_details(&mut self) {
        match types::ProfileDetails::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.profile.details(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed profile details: {e}"),
        }
        self.discard();
    }

    fn profile_details_reply(&mut self) {
        let body = &self.buffer[..self.pos];
        match types::ProfileDetailsReply::data_length(body) {
            Ok(length) if self.pos == types::ProfileDetailsReply::FIXED_SIZE && length > 0 => {
                self.count = length;
            }
            Ok(_) => {
                match types::ProfileDetailsReply::from_bytes(self.header.version, body) {
                    Ok(m) => {
                        self.config.profile.details_reply(&mut self.config.context, &self.header, m)
                    }
                    Err(e) => log::debug!("dropping malformed profile details reply: {e}"),
                }
                self.discard();
            }
            Err(_) => self.discard(),
        }
    }

    fn profile_on(&mut self) {
        match types::ProfileOn::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.profile.on(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed profile on: {e}"),
        }
        self.discard();
    }

    fn profile_off(&mut self) {
        match types::ProfileOff::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.profile.off(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed profile off: {e}"),
        }
        self.discard();
    }

    fn profile_enabled(&mut self) {
        match types::ProfileEnabled::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.profile.enabled(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed profile enabled: {e}"),
        }
        self.discard();
    }

    fn profile_disabled(&mut self) {
        match types::ProfileDisabled::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => self.config.profile.disabled(&mut self.config.context, &self.header, m),
            Err(e) => log::debug!("dropping malformed profile disabled: {e}"),
        }
        self.discard();
    }

    fn profile_specific_data(&mut self) {
        let body = &self.buffer[..self.pos];
        match types::ProfileSpecificData::data_length(body) {
            Ok(length) if self.pos == types::ProfileSpecificData::FIXED_SIZE && length > 0 => {
                self.count = length;
            }
            Ok(_) => {
                match types::ProfileSpecificData::from_bytes(self.header.version, body) {
                    Ok(m) => {
                        self.config.profile.specific_data(&mut self.config.context, &self.header, m)
                    }
                    Err(e) => log::debug!("dropping malformed profile specific data: {e}"),
                }
                self.discard();
            }
            Err(_) => self.discard(),
        }
    }

    fn pe_capabilities(&mut self, reply: bool) {
        match types::PeCapabilities::from_bytes(self.header.version, &self.buffer[..self.pos]) {
            Ok(m) => {
                let (ctx, pe) = (&mut self.config.context, &mut self.config.property_exchange);
                if reply {
                    pe.capabilities_reply(ctx, &self.header, m);
                } else {
                    pe.capabilities(ctx, &self.header, m);
                }
            }
            Err(e) => log::debug!("dropping malformed property exchange capabilities: {e}"),
        }
        self.discard();
    }

    fn property_exchange(&mut self) {
        let body = &self.buffer[..self.pos];
        let header_length = match types::PropertyExchange::header_length(body) {
            Ok(n) => n,
            Err(_) => {
                self.discard();
                return;
            }
        };
        if self.pos == types::PropertyExchange::PT1_FIXED_SIZE && header_length > 0 {
            self.count = header_length;
            return;
        }
        let pt2 = types::PropertyExchange::PT1_FIXED_SIZE + header_length;
        if self.pos == pt2 {
            self.count = types::PropertyExchange::PT2_FIXED_SIZE;
            return;
        }
        let data_length = match crate::bitfield::from_le7_u14([body[pt2 + 4], body[pt2 + 5]]) {
            Ok(n) => n as usize,
            Err(_) => {
                self.discard();
                return;
            }
        };
        if self.pos == pt2 + types::PropertyExchange::PT2_FIXED_SIZE && data_length > 0 {
            self.count = data_length;
            return;
        }
        match types::PropertyExchange::from_bytes(self.header.version, body) {
            Ok(m) => {
                let (ctx, pe) = (&mut self.config.context, &mut self.config.property_exchange);
                match Kind::from_u8(self.header.sub_id_2) {
                    Some(Kind::PeGet) => pe.get(ctx, &self.header, m),
                    Some(Kind::PeGetReply) => pe.get_reply(ctx, &self.header, m),
                    Some(Kind::PeSet) => pe.set(ctx, &self.header, m),
                    Some(Kind::PeSetReply) => pe.set_reply(ctx, &self.header, m),
                    Some(Kind::PeSub) => pe.subscription(ctx, &self.header, m),
                    Some(Kind::PeSubReply) => pe.subscription_reply(ctx, &self.header, m),
                    Some(Kind::PeNotify) => pe.notify(ctx, &self.header, m),
                    _ => debug_assert!(false, "property exchange consumer with a non-PE kind"),
                }
            }
            Err(e) => log::debug!("dropping malformed property exchange: {e}"),
        }
        self.discard();
    }

    fn pi_capabilities_reply(&mut self) {
        if self.header.version > 1 {
            match types::PiCapabilitiesReply::from_bytes(self.header.version, &self.buffer[..self.pos])
            {
                Ok(m) => self.config.process_inquiry.capabilities_reply(
                    &mut self.config.context,
                    &self.header,
                    m,
                ),
                Err(e) => log::debug!("dropping malformed process inquiry reply: {e}"),
            }
        }
        self.discard();
    }

    fn pi_mm_report(&mut self) {
        if self.header.version > 1 {
            match types::MidiMessageReport::from_bytes(self.header.version, &self.buffer[..self.pos]) {
                Ok(m) => self.config.process_inquiry.midi_message_report(
                    &mut self.config.context,
                    &self.header,
                    m,
                ),
                Err(e) => log::debug!("dropping malformed MIDI message report: {e}"),
            }
        }
        self.discard();
    }

    fn pi_mm_report_reply(&mut self) {
        if self.header.version > 1 {
            match types::MidiMessageReportReply::from_bytes(
                self.header.version,
                &self.buffer[..self.pos],
            ) {
                Ok(m) => self.config.process_inquiry.midi_message_report_reply(
                    &mut self.config.context,
                    &self.header,
                    m,
                ),
                Err(e) => log::debug!("dropping malformed MIDI message report reply: {e}"),
            }
        }
        self.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitfield::{to_le7_u14, to_le7_u28};
    use crate::ci::BROADCAST_MUID;
    use std::vec::Vec;

    fn header_bytes(kind: u8, version: u8, source: u32, destination: u32) -> Vec<u8> {
        let mut v = std::vec![UNIVERSAL_NRT, 0x7F, SUB_ID_MIDI_CI, kind, version];
        v.extend_from_slice(&to_le7_u28(source));
        v.extend_from_slice(&to_le7_u28(destination));
        v
    }

    #[derive(Default)]
    struct Record {
        discoveries: Vec<types::Discovery>,
        naks: u32,
        nak_message_len: usize,
        inquiries: u32,
        inquiry_reply: Option<(usize, usize)>,
        pe_get_replies: u32,
        pe_last: Option<(u16, u16, usize, usize)>,
        pi_ends: u32,
        unknowns: u32,
        overflows: u32,
        muid_checks: Vec<u32>,
        accept_muid: Option<u32>,
    }

    struct Recorder;

    impl ManagementBackend<Record> for Recorder {
        fn check_muid(&mut self, context: &mut Record, _group: u8, muid: u32) -> bool {
            context.muid_checks.push(muid);
            context.accept_muid == Some(muid)
        }
        fn discovery(&mut self, context: &mut Record, header: &Header, message: types::Discovery) {
            assert_eq!(header.sub_id_2, Kind::Discovery as u8);
            context.discoveries.push(message);
        }
        fn nak(&mut self, context: &mut Record, _header: &Header, message: types::Nak) {
            context.naks += 1;
            context.nak_message_len = message.message.len();
        }
        fn unknown(&mut self, context: &mut Record, _header: &Header) {
            context.unknowns += 1;
        }
        fn buffer_overflow(&mut self, context: &mut Record) {
            context.overflows += 1;
        }
    }

    impl ProfileBackend<Record> for Recorder {
        fn inquiry(&mut self, context: &mut Record, _header: &Header) {
            context.inquiries += 1;
        }
        fn inquiry_reply(
            &mut self,
            context: &mut Record,
            _header: &Header,
            message: types::ProfileInquiryReply,
        ) {
            context.inquiry_reply = Some((message.enabled.len(), message.disabled.len()));
        }
    }

    impl PropertyExchangeBackend<Record> for Recorder {
        fn get_reply(
            &mut self,
            context: &mut Record,
            _header: &Header,
            message: types::PropertyExchange,
        ) {
            context.pe_get_replies += 1;
            context.pe_last = Some((
                message.chunk.number_of_chunks,
                message.chunk.chunk_number,
                message.header.len(),
                message.data.len(),
            ));
        }
    }

    impl ProcessInquiryBackend<Record> for Recorder {
        fn midi_message_report_end(&mut self, context: &mut Record, _header: &Header) {
            context.pi_ends += 1;
        }
    }

    fn dispatcher() -> Dispatcher<Record, Recorder, Recorder, Recorder, Recorder> {
        Dispatcher::new(Config {
            context: Record::default(),
            management: Recorder,
            profile: Recorder,
            property_exchange: Recorder,
            process_inquiry: Recorder,
        })
    }

    fn feed(d: &mut Dispatcher<Record, Recorder, Recorder, Recorder, Recorder>, bytes: &[u8]) {
        d.start_sysex7(0, 0x7F);
        for b in bytes {
            d.push(*b);
        }
        d.end_sysex7();
    }

    #[test]
    fn discovery_dispatches_once_with_field_values() {
        let message = types::Discovery {
            manufacturer: [0x12, 0x23, 0x34],
            family: 0x3CE7,
            model: 0x2EEB,
            version: [0x4E, 0x3C, 0x2A, 0x18],
            capability: 0x7F,
            max_sysex_size: 0x0214_3456,
            output_path_id: 0x71,
        };
        let mut bytes = header_bytes(Kind::Discovery as u8, 2, 0, BROADCAST_MUID);
        let mut body = [0u8; types::Discovery::SIZE_V2];
        message.to_bytes(2, &mut body).unwrap();
        bytes.extend_from_slice(&body);

        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().discoveries, [message]);
        assert_eq!(d.context().unknowns, 0);
        assert_eq!(d.context().overflows, 0);
    }

    #[test]
    fn v1_discovery_is_shorter() {
        let mut bytes = header_bytes(Kind::Discovery as u8, 1, 5, BROADCAST_MUID);
        let message = types::Discovery { family: 3, ..Default::default() };
        let mut body = [0u8; types::Discovery::SIZE_V1];
        message.to_bytes(1, &mut body).unwrap();
        bytes.extend_from_slice(&body);

        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().discoveries.len(), 1);
        assert_eq!(d.context().discoveries[0].output_path_id, 0);
    }

    #[test]
    fn non_broadcast_muid_is_checked_and_dropped() {
        let mut bytes = header_bytes(Kind::Discovery as u8, 2, 0, 0x123);
        bytes.extend_from_slice(&[0; types::Discovery::SIZE_V2]);
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().muid_checks, [0x123]);
        assert!(d.context().discoveries.is_empty());
        assert_eq!(d.context().unknowns, 0);
    }

    #[test]
    fn accepted_muid_is_dispatched() {
        let mut bytes = header_bytes(Kind::Discovery as u8, 2, 0, 0x123);
        bytes.extend_from_slice(&[0; types::Discovery::SIZE_V2]);
        let mut d = dispatcher();
        d.context_mut().accept_muid = Some(0x123);
        feed(&mut d, &bytes);
        assert_eq!(d.context().discoveries.len(), 1);
    }

    #[test]
    fn broadcast_muid_skips_the_check() {
        let mut bytes = header_bytes(Kind::Discovery as u8, 2, 0, BROADCAST_MUID);
        bytes.extend_from_slice(&[0; types::Discovery::SIZE_V2]);
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert!(d.context().muid_checks.is_empty());
        assert_eq!(d.context().discoveries.len(), 1);
    }

    #[test]
    fn unknown_sub_id_reports_unknown() {
        let bytes = header_bytes(0x55, 1, 0, BROADCAST_MUID);
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().unknowns, 1);
    }

    #[test]
    fn wrong_universal_prefix_reports_unknown() {
        let mut bytes = header_bytes(Kind::Discovery as u8, 1, 0, BROADCAST_MUID);
        bytes[0] = 0x7D;
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().unknowns, 1);
        assert!(d.context().discoveries.is_empty());
    }

    #[test]
    fn profile_inquiry_has_no_body() {
        let bytes = header_bytes(Kind::ProfileInquiry as u8, 1, 0, BROADCAST_MUID);
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().inquiries, 1);
    }

    #[test]
    fn profile_inquiry_reply_parses_both_lists() {
        let mut bytes = header_bytes(Kind::ProfileInquiryReply as u8, 1, 0, BROADCAST_MUID);
        bytes.extend_from_slice(&to_le7_u14(2));
        bytes.extend_from_slice(&[0x7E, 1, 1, 1, 1]);
        bytes.extend_from_slice(&[0x7E, 2, 2, 2, 2]);
        bytes.extend_from_slice(&to_le7_u14(1));
        bytes.extend_from_slice(&[0x7E, 3, 3, 3, 3]);
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().inquiry_reply, Some((2, 1)));
    }

    #[test]
    fn profile_inquiry_reply_with_empty_lists() {
        let mut bytes = header_bytes(Kind::ProfileInquiryReply as u8, 1, 0, BROADCAST_MUID);
        bytes.extend_from_slice(&to_le7_u14(0));
        bytes.extend_from_slice(&to_le7_u14(0));
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().inquiry_reply, Some((0, 0)));
    }

    #[test]
    fn nak_v1_dispatches_without_body() {
        let bytes = header_bytes(Kind::Nak as u8, 1, 0, BROADCAST_MUID);
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().naks, 1);
        assert_eq!(d.context().nak_message_len, 0);
    }

    #[test]
    fn nak_v2_carries_message_text() {
        let mut bytes = header_bytes(Kind::Nak as u8, 2, 0, BROADCAST_MUID);
        let mut fixed = [0u8; 10];
        fixed[8..10].copy_from_slice(&to_le7_u14(5));
        bytes.extend_from_slice(&fixed);
        bytes.extend_from_slice(b"oops\x21");
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().naks, 1);
        assert_eq!(d.context().nak_message_len, 5);
    }

    #[test]
    fn property_exchange_get_reply_phases() {
        let mut bytes = header_bytes(Kind::PeGetReply as u8, 2, 0, BROADCAST_MUID);
        bytes.push(9); // request id
        bytes.extend_from_slice(&to_le7_u14(7));
        bytes.extend_from_slice(b"{\x22r\x22:1}");
        bytes.extend_from_slice(&to_le7_u14(1)); // chunks
        bytes.extend_from_slice(&to_le7_u14(1)); // chunk number
        bytes.extend_from_slice(&to_le7_u14(11));
        bytes.extend_from_slice(b"{\x22ok\x22:true}");
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().pe_get_replies, 1);
        assert_eq!(d.context().pe_last, Some((1, 1, 7, 11)));
    }

    #[test]
    fn process_inquiry_needs_version_two() {
        let bytes = header_bytes(Kind::PiMmReportEnd as u8, 1, 0, BROADCAST_MUID);
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().pi_ends, 0);

        let bytes = header_bytes(Kind::PiMmReportEnd as u8, 2, 0, BROADCAST_MUID);
        feed(&mut d, &bytes);
        assert_eq!(d.context().pi_ends, 1);
    }

    #[test]
    fn oversized_tail_reports_overflow_once() {
        let mut bytes = header_bytes(Kind::Ack as u8, 1, 0, BROADCAST_MUID);
        let mut fixed = [0u8; 10];
        fixed[8..10].copy_from_slice(&to_le7_u14(0x3FFF));
        bytes.extend_from_slice(&fixed);
        // More text than the scratch buffer can hold.
        bytes.extend_from_slice(&[0x21; 1000]);
        let mut d = dispatcher();
        feed(&mut d, &bytes);
        assert_eq!(d.context().overflows, 1);
    }

    #[test]
    fn new_sysex_recovers_after_overflow() {
        let mut bytes = header_bytes(Kind::Ack as u8, 1, 0, BROADCAST_MUID);
        let mut fixed = [0u8; 10];
        fixed[8..10].copy_from_slice(&to_le7_u14(0x3FFF));
        bytes.extend_from_slice(&fixed);
        bytes.extend_from_slice(&[0x21; 600]);
        let mut d = dispatcher();
        feed(&mut d, &bytes);

        let bytes = header_bytes(Kind::ProfileInquiry as u8, 1, 0, BROADCAST_MUID);
        feed(&mut d, &bytes);
        assert_eq!(d.context().inquiries, 1);
    }

    #[test]
    fn back_to_back_messages_each_dispatch() {
        let mut d = dispatcher();
        for _ in 0..3 {
            let bytes = header_bytes(Kind::ProfileInquiry as u8, 1, 0, BROADCAST_MUID);
            feed(&mut d, &bytes);
        }
        assert_eq!(d.context().inquiries, 3);
    }
}
