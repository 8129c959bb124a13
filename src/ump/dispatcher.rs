//! The UMP dispatcher: a word-accumulating state machine that decodes every message type and
//! hands typed records to per-family backends.
//!
//! Callers describe their interest as a [`Config`]: one backend per message family plus a
//! context value passed to every callback. Every backend method defaults to a no-op and
//! [`Null`] implements them all, so a config names only the families it cares about.

use crate::bitfield::get;
use crate::ump::message::{data128, data64, flex, m1cvm, m2cvm, stream, system, utility};
use crate::ump::{status, MessageType};

pub trait UtilityBackend<C> {
    fn noop(&mut self, _context: &mut C, _message: utility::NoOp) {}
    fn jr_clock(&mut self, _context: &mut C, _message: utility::JrClock) {}
    fn jr_timestamp(&mut self, _context: &mut C, _message: utility::JrTimestamp) {}
    fn delta_clockstamp_tpqn(&mut self, _context: &mut C, _message: utility::DeltaClockstampTpqn) {}
    fn delta_clockstamp(&mut self, _context: &mut C, _message: utility::DeltaClockstamp) {}
}

pub trait SystemBackend<C> {
    fn midi_time_code(&mut self, _context: &mut C, _message: system::MidiTimeCode) {}
    fn song_position_pointer(&mut self, _context: &mut C, _message: system::SongPositionPointer) {}
    fn song_select(&mut self, _context: &mut C, _message: system::SongSelect) {}
    fn tune_request(&mut self, _context: &mut C, _message: system::TuneRequest) {}
    fn timing_clock(&mut self, _context: &mut C, _message: system::TimingClock) {}
    fn seq_start(&mut self, _context: &mut C, _message: system::SequenceStart) {}
    fn seq_continue(&mut self, _context: &mut C, _message: system::SequenceContinue) {}
    fn seq_stop(&mut self, _context: &mut C, _message: system::SequenceStop) {}
    fn active_sensing(&mut self, _context: &mut C, _message: system::ActiveSensing) {}
    fn reset(&mut self, _context: &mut C, _message: system::Reset) {}
}

pub trait M1cvmBackend<C> {
    fn note_off(&mut self, _context: &mut C, _message: m1cvm::NoteOff) {}
    fn note_on(&mut self, _context: &mut C, _message: m1cvm::NoteOn) {}
    fn poly_pressure(&mut self, _context: &mut C, _message: m1cvm::PolyPressure) {}
    fn control_change(&mut self, _context: &mut C, _message: m1cvm::ControlChange) {}
    fn program_change(&mut self, _context: &mut C, _message: m1cvm::ProgramChange) {}
    fn channel_pressure(&mut self, _context: &mut C, _message: m1cvm::ChannelPressure) {}
    fn pitch_bend(&mut self, _context: &mut C, _message: m1cvm::PitchBend) {}
}

pub trait Data64Backend<C> {
    fn sysex7_in_1(&mut self, _context: &mut C, _message: data64::Sysex7Packet) {}
    fn sysex7_start(&mut self, _context: &mut C, _message: data64::Sysex7Packet) {}
    fn sysex7_continue(&mut self, _context: &mut C, _message: data64::Sysex7Packet) {}
    fn sysex7_end(&mut self, _context: &mut C, _message: data64::Sysex7Packet) {}
}

pub trait M2cvmBackend<C> {
    fn note_off(&mut self, _context: &mut C, _message: m2cvm::NoteOff) {}
    fn note_on(&mut self, _context: &mut C, _message: m2cvm::NoteOn) {}
    fn poly_pressure(&mut self, _context: &mut C, _message: m2cvm::PolyPressure) {}
    fn registered_per_note_controller(
        &mut self,
        _context: &mut C,
        _message: m2cvm::RegisteredPerNoteController,
    ) {
    }
    fn assignable_per_note_controller(
        &mut self,
        _context: &mut C,
        _message: m2cvm::AssignablePerNoteController,
    ) {
    }
    fn registered_controller(&mut self, _context: &mut C, _message: m2cvm::RegisteredController) {}
    fn assignable_controller(&mut self, _context: &mut C, _message: m2cvm::AssignableController) {}
    fn relative_registered_controller(
        &mut self,
        _context: &mut C,
        _message: m2cvm::RelativeRegisteredController,
    ) {
    }
    fn relative_assignable_controller(
        &mut self,
        _context: &mut C,
        _message: m2cvm::RelativeAssignableController,
    ) {
    }
    fn control_change(&mut self, _context: &mut C, _message: m2cvm::ControlChange) {}
    fn program_change(&mut self, _context: &mut C, _message: m2cvm::ProgramChange) {}
    fn channel_pressure(&mut self, _context: &mut C, _message: m2cvm::ChannelPressure) {}
    fn pitch_bend(&mut self, _context: &mut C, _message: m2cvm::PitchBend) {}
    fn per_note_pitch_bend(&mut self, _context: &mut C, _message: m2cvm::PerNotePitchBend) {}
    fn per_note_management(&mut self, _context: &mut C, _message: m2cvm::PerNoteManagement) {}
}

pub trait Data128Backend<C> {
    fn sysex8_in_1(&mut self, _context: &mut C, _message: data128::Sysex8Packet) {}
    fn sysex8_start(&mut self, _context: &mut C, _message: data128::Sysex8Packet) {}
    fn sysex8_continue(&mut self, _context: &mut C, _message: data128::Sysex8Packet) {}
    fn sysex8_end(&mut self, _context: &mut C, _message: data128::Sysex8Packet) {}
    fn mds_header(&mut self, _context: &mut C, _message: data128::MdsHeader) {}
    fn mds_payload(&mut self, _context: &mut C, _message: data128::MdsPayload) {}
}

pub trait FlexDataBackend<C> {
    fn set_tempo(&mut self, _context: &mut C, _message: flex::SetTempo) {}
    fn set_time_signature(&mut self, _context: &mut C, _message: flex::SetTimeSignature) {}
    fn set_metronome(&mut self, _context: &mut C, _message: flex::SetMetronome) {}
    fn set_key_signature(&mut self, _context: &mut C, _message: flex::SetKeySignature) {}
    fn set_chord_name(&mut self, _context: &mut C, _message: flex::SetChordName) {}
    fn performance(&mut self, _context: &mut C, _message: flex::Text) {}
    fn lyric(&mut self, _context: &mut C, _message: flex::Text) {}
}

pub trait StreamBackend<C> {
    fn endpoint_discovery(&mut self, _context: &mut C, _message: stream::EndpointDiscovery) {}
    fn endpoint_info(&mut self, _context: &mut C, _message: stream::EndpointInfoNotification) {}
    fn device_identity(&mut self, _context: &mut C, _message: stream::DeviceIdentityNotification) {}
    fn endpoint_name(&mut self, _context: &mut C, _message: stream::EndpointNameNotification) {}
    fn product_instance_id(
        &mut self,
        _context: &mut C,
        _message: stream::ProductInstanceIdNotification,
    ) {
    }
    fn jr_configuration_request(
        &mut self,
        _context: &mut C,
        _message: stream::JrConfigurationRequest,
    ) {
    }
    fn jr_configuration_notification(
        &mut self,
        _context: &mut C,
        _message: stream::JrConfigurationNotification,
    ) {
    }
    fn function_block_discovery(
        &mut self,
        _context: &mut C,
        _message: stream::FunctionBlockDiscovery,
    ) {
    }
    fn function_block_info(
        &mut self,
        _context: &mut C,
        _message: stream::FunctionBlockInfoNotification,
    ) {
    }
    fn function_block_name(
        &mut self,
        _context: &mut C,
        _message: stream::FunctionBlockNameNotification,
    ) {
    }
    fn start_of_clip(&mut self, _context: &mut C, _message: stream::StartOfClip) {}
    fn end_of_clip(&mut self, _context: &mut C, _message: stream::EndOfClip) {}
}

/// Receives messages with a reserved type or an unrecognised status, raw.
pub trait UnknownBackend<C> {
    fn unknown(&mut self, _context: &mut C, _words: &[u32]) {}
}

/// Implements every backend trait as a no-op.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Null;

impl<C> UtilityBackend<C> for Null {}
impl<C> SystemBackend<C> for Null {}
impl<C> M1cvmBackend<C> for Null {}
impl<C> Data64Backend<C> for Null {}
impl<C> M2cvmBackend<C> for Null {}
impl<C> Data128Backend<C> for Null {}
impl<C> FlexDataBackend<C> for Null {}
impl<C> StreamBackend<C> for Null {}
impl<C> UnknownBackend<C> for Null {}

/// One backend per message family plus the context value handed to every callback.
pub struct Config<
    C,
    U = Null,
    S = Null,
    M1 = Null,
    D64 = Null,
    M2 = Null,
    D128 = Null,
    F = Null,
    St = Null,
    Unk = Null,
> {
    pub context: C,
    pub utility: U,
    pub system: S,
    pub m1cvm: M1,
    pub data64: D64,
    pub m2cvm: M2,
    pub data128: D128,
    pub flex: F,
    pub stream: St,
    pub unknown: Unk,
}

impl<C> Config<C> {
    /// A config with every family ignored; replace fields for the families of interest.
    pub fn new(context: C) -> Self {
        Config {
            context,
            utility: Null,
            system: Null,
            m1cvm: Null,
            data64: Null,
            m2cvm: Null,
            data128: Null,
            flex: Null,
            stream: Null,
            unknown: Null,
        }
    }
}

/// Accumulates 1-4 words per message and invokes exactly one callback per completed message.
pub struct Dispatcher<C, U = Null, S = Null, M1 = Null, D64 = Null, M2 = Null, D128 = Null, F = Null, St = Null, Unk = Null>
{
    config: Config<C, U, S, M1, D64, M2, D128, F, St, Unk>,
    message: [u32; 4],
    pos: usize,
}

#[allow(clippy::type_complexity)]
impl<C, U, S, M1, D64, M2, D128, F, St, Unk> Dispatcher<C, U, S, M1, D64, M2, D128, F, St, Unk>
where
    U: UtilityBackend<C>,
    S: SystemBackend<C>,
    M1: M1cvmBackend<C>,
    D64: Data64Backend<C>,
    M2: M2cvmBackend<C>,
    D128: Data128Backend<C>,
    F: FlexDataBackend<C>,
    St: StreamBackend<C>,
    Unk: UnknownBackend<C>,
{
    pub fn new(config: Config<C, U, S, M1, D64, M2, D128, F, St, Unk>) -> Self {
        Dispatcher { config, message: [0; 4], pos: 0 }
    }

    pub fn context(&self) -> &C {
        &self.config.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.config.context
    }

    pub fn config(&self) -> &Config<C, U, S, M1, D64, M2, D128, F, St, Unk> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config<C, U, S, M1, D64, M2, D128, F, St, Unk> {
        &mut self.config
    }

    /// Discards any partially accumulated message.
    pub fn clear(&mut self) {
        self.pos = 0;
        self.message = [0; 4];
    }

    pub fn reset(&mut self) {
        self.clear();
    }

    /// Feeds one word. Once the word count implied by the first word's message type has been
    /// reached, decodes and dispatches; no input word is ever silently consumed.
    pub fn push(&mut self, word: u32) {
        self.message[self.pos] = word;
        self.pos += 1;
        let mt = MessageType::of_word(self.message[0]);
        if self.pos < mt.word_count() {
            return;
        }
        self.pos = 0;
        match mt {
            MessageType::Utility => self.utility(),
            MessageType::System => self.system(),
            MessageType::M1Cvm => self.m1cvm(),
            MessageType::Sysex7 => self.data64(),
            MessageType::M2Cvm => self.m2cvm(),
            MessageType::Data128 => self.data128(),
            MessageType::FlexData => self.flex(),
            MessageType::Stream => self.stream(),
            _ => self.unknown(mt.word_count()),
        }
    }

    fn unknown(&mut self, words: usize) {
        self.config.unknown.unknown(&mut self.config.context, &self.message[..words]);
    }

    fn utility(&mut self) {
        let w = self.message[0];
        let (ctx, utility) = (&mut self.config.context, &mut self.config.utility);
        match get::<20, 4>(w) as u8 {
            utility::NOOP => utility.noop(ctx, utility::NoOp::from_word(w)),
            utility::JR_CLOCK => utility.jr_clock(ctx, utility::JrClock::from_word(w)),
            utility::JR_TIMESTAMP => utility.jr_timestamp(ctx, utility::JrTimestamp::from_word(w)),
            utility::DELTA_CLOCKSTAMP_TPQN => {
                utility.delta_clockstamp_tpqn(ctx, utility::DeltaClockstampTpqn::from_word(w))
            }
            utility::DELTA_CLOCKSTAMP => {
                utility.delta_clockstamp(ctx, utility::DeltaClockstamp::from_word(w))
            }
            _ => self.unknown(1),
        }
    }

    fn system(&mut self) {
        let w = self.message[0];
        let (ctx, system) = (&mut self.config.context, &mut self.config.system);
        match get::<16, 8>(w) as u8 {
            status::TIME_CODE => system.midi_time_code(ctx, system::MidiTimeCode::from_word(w)),
            status::SONG_POSITION => {
                system.song_position_pointer(ctx, system::SongPositionPointer::from_word(w))
            }
            status::SONG_SELECT => system.song_select(ctx, system::SongSelect::from_word(w)),
            status::TUNE_REQUEST => system.tune_request(ctx, system::TuneRequest::from_word(w)),
            status::TIMING_CLOCK => system.timing_clock(ctx, system::TimingClock::from_word(w)),
            status::SEQ_START => system.seq_start(ctx, system::SequenceStart::from_word(w)),
            status::SEQ_CONTINUE => system.seq_continue(ctx, system::SequenceContinue::from_word(w)),
            status::SEQ_STOP => system.seq_stop(ctx, system::SequenceStop::from_word(w)),
            status::ACTIVE_SENSING => {
                system.active_sensing(ctx, system::ActiveSensing::from_word(w))
            }
            status::SYSTEM_RESET => system.reset(ctx, system::Reset::from_word(w)),
            _ => self.unknown(1),
        }
    }

    fn m1cvm(&mut self) {
        let w = self.message[0];
        let (ctx, m1cvm) = (&mut self.config.context, &mut self.config.m1cvm);
        match (get::<20, 4>(w) << 4) as u8 {
            status::NOTE_OFF => m1cvm.note_off(ctx, m1cvm::NoteOff::from_word(w)),
            status::NOTE_ON => m1cvm.note_on(ctx, m1cvm::NoteOn::from_word(w)),
            status::POLY_PRESSURE => m1cvm.poly_pressure(ctx, m1cvm::PolyPressure::from_word(w)),
            status::CONTROL_CHANGE => m1cvm.control_change(ctx, m1cvm::ControlChange::from_word(w)),
            status::PROGRAM_CHANGE => m1cvm.program_change(ctx, m1cvm::ProgramChange::from_word(w)),
            status::CHANNEL_PRESSURE => {
                m1cvm.channel_pressure(ctx, m1cvm::ChannelPressure::from_word(w))
            }
            status::PITCH_BEND => m1cvm.pitch_bend(ctx, m1cvm::PitchBend::from_word(w)),
            _ => self.unknown(1),
        }
    }

    fn data64(&mut self) {
        let w = [self.message[0], self.message[1]];
        let (ctx, data64) = (&mut self.config.context, &mut self.config.data64);
        let (status, packet) = data64::Sysex7Packet::from_words(w);
        match status {
            0x0 => data64.sysex7_in_1(ctx, packet),
            0x1 => data64.sysex7_start(ctx, packet),
            0x2 => data64.sysex7_continue(ctx, packet),
            0x3 => data64.sysex7_end(ctx, packet),
            _ => self.unknown(2),
        }
    }

    fn m2cvm(&mut self) {
        let w = [self.message[0], self.message[1]];
        let (ctx, m2cvm) = (&mut self.config.context, &mut self.config.m2cvm);
        match (get::<20, 4>(w[0]) << 4) as u8 {
            status::RPN_PER_NOTE => m2cvm
                .registered_per_note_controller(ctx, m2cvm::RegisteredPerNoteController::from_words(w)),
            status::NRPN_PER_NOTE => m2cvm
                .assignable_per_note_controller(ctx, m2cvm::AssignablePerNoteController::from_words(w)),
            status::RPN => m2cvm.registered_controller(ctx, m2cvm::RegisteredController::from_words(w)),
            status::NRPN => m2cvm.assignable_controller(ctx, m2cvm::AssignableController::from_words(w)),
            status::RPN_RELATIVE => m2cvm
                .relative_registered_controller(ctx, m2cvm::RelativeRegisteredController::from_words(w)),
            status::NRPN_RELATIVE => m2cvm
                .relative_assignable_controller(ctx, m2cvm::RelativeAssignableController::from_words(w)),
            status::PITCH_BEND_PER_NOTE => {
                m2cvm.per_note_pitch_bend(ctx, m2cvm::PerNotePitchBend::from_words(w))
            }
            status::NOTE_OFF => m2cvm.note_off(ctx, m2cvm::NoteOff::from_words(w)),
            status::NOTE_ON => m2cvm.note_on(ctx, m2cvm::NoteOn::from_words(w)),
            status::POLY_PRESSURE => m2cvm.poly_pressure(ctx, m2cvm::PolyPressure::from_words(w)),
            status::CONTROL_CHANGE => m2cvm.control_change(ctx, m2cvm::ControlChange::from_words(w)),
            status::PROGRAM_CHANGE => m2cvm.program_change(ctx, m2cvm::ProgramChange::from_words(w)),
            status::CHANNEL_PRESSURE => {
                m2cvm.channel_pressure(ctx, m2cvm::ChannelPressure::from_words(w))
            }
            status::PITCH_BEND => m2cvm.pitch_bend(ctx, m2cvm::PitchBend::from_words(w)),
            status::PER_NOTE_MANAGE => {
                m2cvm.per_note_management(ctx, m2cvm::PerNoteManagement::from_words(w))
            }
            _ => self.unknown(2),
        }
    }

    fn data128(&mut self) {
        let w = self.message;
        let (ctx, data128) = (&mut self.config.context, &mut self.config.data128);
        match get::<20, 4>(w[0]) {
            data128::SYSEX8_IN_1..=data128::SYSEX8_END => {
                let (status, packet) = data128::Sysex8Packet::from_words(w);
                match status {
                    data128::SYSEX8_IN_1 => data128.sysex8_in_1(ctx, packet),
                    data128::SYSEX8_START => data128.sysex8_start(ctx, packet),
                    data128::SYSEX8_CONTINUE => data128.sysex8_continue(ctx, packet),
                    _ => data128.sysex8_end(ctx, packet),
                }
            }
            data128::MDS_HEADER => data128.mds_header(ctx, data128::MdsHeader::from_words(w)),
            data128::MDS_PAYLOAD => data128.mds_payload(ctx, data128::MdsPayload::from_words(w)),
            _ => self.unknown(4),
        }
    }

    fn flex(&mut self) {
        let w = self.message;
        let (ctx, flex) = (&mut self.config.context, &mut self.config.flex);
        let status_bank = get::<8, 8>(w[0]) as u8;
        let status = get::<0, 8>(w[0]) as u8;
        match (status_bank, status) {
            (flex::BANK_SETUP, flex::SETUP_TEMPO) => {
                flex.set_tempo(ctx, flex::SetTempo::from_words(w))
            }
            (flex::BANK_SETUP, flex::SETUP_TIME_SIGNATURE) => {
                flex.set_time_signature(ctx, flex::SetTimeSignature::from_words(w))
            }
            (flex::BANK_SETUP, flex::SETUP_METRONOME) => {
                flex.set_metronome(ctx, flex::SetMetronome::from_words(w))
            }
            (flex::BANK_SETUP, flex::SETUP_KEY_SIGNATURE) => {
                flex.set_key_signature(ctx, flex::SetKeySignature::from_words(w))
            }
            (flex::BANK_SETUP, flex::SETUP_CHORD_NAME) => {
                flex.set_chord_name(ctx, flex::SetChordName::from_words(w))
            }
            (flex::BANK_PERFORMANCE, _) => flex.performance(ctx, flex::Text::from_words(w)),
            (flex::BANK_LYRIC, _) => flex.lyric(ctx, flex::Text::from_words(w)),
            _ => self.unknown(4),
        }
    }

    fn stream(&mut self) {
        let w = self.message;
        let (ctx, stream) = (&mut self.config.context, &mut self.config.stream);
        match stream::status_of_word(w[0]) {
            stream::ENDPOINT_DISCOVERY => {
                stream.endpoint_discovery(ctx, stream::EndpointDiscovery::from_words(w))
            }
            stream::ENDPOINT_INFO_NOTIFICATION => {
                stream.endpoint_info(ctx, stream::EndpointInfoNotification::from_words(w))
            }
            stream::DEVICE_IDENTITY_NOTIFICATION => {
                stream.device_identity(ctx, stream::DeviceIdentityNotification::from_words(w))
            }
            stream::ENDPOINT_NAME_NOTIFICATION => {
                stream.endpoint_name(ctx, stream::EndpointNameNotification::from_words(w))
            }
            stream::PRODUCT_INSTANCE_ID_NOTIFICATION => {
                stream.product_instance_id(ctx, stream::ProductInstanceIdNotification::from_words(w))
            }
            stream::JR_CONFIGURATION_REQUEST => {
                stream.jr_configuration_request(ctx, stream::JrConfigurationRequest::from_words(w))
            }
            stream::JR_CONFIGURATION_NOTIFICATION => stream
                .jr_configuration_notification(ctx, stream::JrConfigurationNotification::from_words(w)),
            stream::FUNCTION_BLOCK_DISCOVERY => {
                stream.function_block_discovery(ctx, stream::FunctionBlockDiscovery::from_words(w))
            }
            stream::FUNCTION_BLOCK_INFO_NOTIFICATION => {
                stream.function_block_info(ctx, stream::FunctionBlockInfoNotification::from_words(w))
            }
            stream::FUNCTION_BLOCK_NAME_NOTIFICATION => {
                stream.function_block_name(ctx, stream::FunctionBlockNameNotification::from_words(w))
            }
            stream::START_OF_CLIP => stream.start_of_clip(ctx, stream::StartOfClip::from_words(w)),
            stream::END_OF_CLIP => stream.end_of_clip(ctx, stream::EndOfClip::from_words(w)),
            _ => self.unknown(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Record {
        note_ons: u32,
        last_m1_note_on: Option<m1cvm::NoteOn>,
        last_m2_rpn: Option<m2cvm::RegisteredController>,
        sysex: u32,
        unknown_words: usize,
        unknowns: u32,
    }

    struct Recorder;

    impl M1cvmBackend<Record> for Recorder {
        fn note_on(&mut self, context: &mut Record, message: m1cvm::NoteOn) {
            context.note_ons += 1;
            context.last_m1_note_on = Some(message);
        }
    }

    impl M2cvmBackend<Record> for Recorder {
        fn registered_controller(&mut self, context: &mut Record, message: m2cvm::RegisteredController) {
            context.last_m2_rpn = Some(message);
        }
    }

    impl Data64Backend<Record> for Recorder {
        fn sysex7_start(&mut self, context: &mut Record, _message: data64::Sysex7Packet) {
            context.sysex += 1;
        }
        fn sysex7_end(&mut self, context: &mut Record, _message: data64::Sysex7Packet) {
            context.sysex += 1;
        }
    }

    impl UnknownBackend<Record> for Recorder {
        fn unknown(&mut self, context: &mut Record, words: &[u32]) {
            context.unknowns += 1;
            context.unknown_words = words.len();
        }
    }

    fn dispatcher() -> Dispatcher<Record, Null, Null, Recorder, Recorder, Recorder, Null, Null, Null, Recorder>
    {
        Dispatcher::new(Config {
            context: Record::default(),
            utility: Null,
            system: Null,
            m1cvm: Recorder,
            data64: Recorder,
            m2cvm: Recorder,
            data128: Null,
            flex: Null,
            stream: Null,
            unknown: Recorder,
        })
    }

    #[test]
    fn one_word_message_dispatches_immediately() {
        let mut d = dispatcher();
        d.push(0x2091_4040);
        assert_eq!(d.context().note_ons, 1);
        assert_eq!(
            d.context().last_m1_note_on,
            Some(m1cvm::NoteOn { group: 0, channel: 1, note: 0x40, velocity: 0x40 })
        );
    }

    #[test]
    fn two_word_message_waits_for_second_word() {
        let mut d = dispatcher();
        d.push(0x4026_0006);
        assert!(d.context().last_m2_rpn.is_none());
        d.push(0x1000_0000);
        assert_eq!(
            d.context().last_m2_rpn,
            Some(m2cvm::RegisteredController { group: 0, channel: 6, bank: 0, index: 6, value: 0x1000_0000 })
        );
    }

    #[test]
    fn sysex7_start_and_end_dispatch() {
        let mut d = dispatcher();
        d.push(0x3016_7E7F);
        d.push(0x0D70_024B);
        d.push(0x3036_0000);
        d.push(0x1000_0000);
        assert_eq!(d.context().sysex, 2);
    }

    #[test]
    fn reserved_mt_goes_to_unknown_with_word_count() {
        let mut d = dispatcher();
        // MT 0xB is reserved and 96 bits long.
        d.push(0xB000_0000);
        d.push(0);
        assert_eq!(d.context().unknowns, 0);
        d.push(0);
        assert_eq!(d.context().unknowns, 1);
        assert_eq!(d.context().unknown_words, 3);
    }

    #[test]
    fn unknown_status_goes_to_unknown() {
        let mut d = dispatcher();
        // System status 0xF4 is undefined.
        d.push(0x10F4_0000);
        assert_eq!(d.context().unknowns, 1);
        assert_eq!(d.context().unknown_words, 1);
        // Utility status 0x5 is undefined.
        d.push(0x0050_0000);
        assert_eq!(d.context().unknowns, 2);
        // MIDI 2.0 CVM status 0x7 is undefined.
        d.push(0x4070_0000);
        d.push(0);
        assert_eq!(d.context().unknowns, 3);
    }

    #[test]
    fn clear_discards_partial_message() {
        let mut d = dispatcher();
        d.push(0x4026_0006);
        d.clear();
        d.push(0x2091_4040);
        assert_eq!(d.context().note_ons, 1);
        assert!(d.context().last_m2_rpn.is_none());
    }

    /// Every MT and status nibble combination must land in exactly one callback.
    #[test]
    fn no_word_is_silently_consumed() {
        struct Count;
        #[derive(Default)]
        struct Total(u32);
        macro_rules! count_impl {
            ($trait_name:ident { $($method:ident: $ty:ty),* $(,)? }) => {
                impl $trait_name<Total> for Count {
                    $(fn $method(&mut self, context: &mut Total, _message: $ty) {
                        context.0 += 1;
                    })*
                }
            };
        }
        count_impl!(UtilityBackend {
            noop: utility::NoOp,
            jr_clock: utility::JrClock,
            jr_timestamp: utility::JrTimestamp,
            delta_clockstamp_tpqn: utility::DeltaClockstampTpqn,
            delta_clockstamp: utility::DeltaClockstamp,
        });
        count_impl!(SystemBackend {
            midi_time_code: system::MidiTimeCode,
            song_position_pointer: system::SongPositionPointer,
            song_select: system::SongSelect,
            tune_request: system::TuneRequest,
            timing_clock: system::TimingClock,
            seq_start: system::SequenceStart,
            seq_continue: system::SequenceContinue,
            seq_stop: system::SequenceStop,
            active_sensing: system::ActiveSensing,
            reset: system::Reset,
        });
        count_impl!(M1cvmBackend {
            note_off: m1cvm::NoteOff,
            note_on: m1cvm::NoteOn,
            poly_pressure: m1cvm::PolyPressure,
            control_change: m1cvm::ControlChange,
            program_change: m1cvm::ProgramChange,
            channel_pressure: m1cvm::ChannelPressure,
            pitch_bend: m1cvm::PitchBend,
        });
        count_impl!(Data64Backend {
            sysex7_in_1: data64::Sysex7Packet,
            sysex7_start: data64::Sysex7Packet,
            sysex7_continue: data64::Sysex7Packet,
            sysex7_end: data64::Sysex7Packet,
        });
        count_impl!(M2cvmBackend {
            note_off: m2cvm::NoteOff,
            note_on: m2cvm::NoteOn,
            poly_pressure: m2cvm::PolyPressure,
            registered_per_note_controller: m2cvm::RegisteredPerNoteController,
            assignable_per_note_controller: m2cvm::AssignablePerNoteController,
            registered_controller: m2cvm::RegisteredController,
            assignable_controller: m2cvm::AssignableController,
            relative_registered_controller: m2cvm::RelativeRegisteredController,
            relative_assignable_controller: m2cvm::RelativeAssignableController,
            control_change: m2cvm::ControlChange,
            program_change: m2cvm::ProgramChange,
            channel_pressure: m2cvm::ChannelPressure,
            pitch_bend: m2cvm::PitchBend,
            per_note_pitch_bend: m2cvm::PerNotePitchBend,
            per_note_management: m2cvm::PerNoteManagement,
        });
        count_impl!(Data128Backend {
            sysex8_in_1: data128::Sysex8Packet,
            sysex8_start: data128::Sysex8Packet,
            sysex8_continue: data128::Sysex8Packet,
            sysex8_end: data128::Sysex8Packet,
            mds_header: data128::MdsHeader,
            mds_payload: data128::MdsPayload,
        });
        count_impl!(FlexDataBackend {
            set_tempo: flex::SetTempo,
            set_time_signature: flex::SetTimeSignature,
            set_metronome: flex::SetMetronome,
            set_key_signature: flex::SetKeySignature,
            set_chord_name: flex::SetChordName,
            performance: flex::Text,
            lyric: flex::Text,
        });
        count_impl!(StreamBackend {
            endpoint_discovery: stream::EndpointDiscovery,
            endpoint_info: stream::EndpointInfoNotification,
            device_identity: stream::DeviceIdentityNotification,
            endpoint_name: stream::EndpointNameNotification,
            product_instance_id: stream::ProductInstanceIdNotification,
            jr_configuration_request: stream::JrConfigurationRequest,
            jr_configuration_notification: stream::JrConfigurationNotification,
            function_block_discovery: stream::FunctionBlockDiscovery,
            function_block_info: stream::FunctionBlockInfoNotification,
            function_block_name: stream::FunctionBlockNameNotification,
            start_of_clip: stream::StartOfClip,
            end_of_clip: stream::EndOfClip,
        });
        impl UnknownBackend<Total> for Count {
            fn unknown(&mut self, context: &mut Total, _words: &[u32]) {
                context.0 += 1;
            }
        }

        let mut d = Dispatcher::new(Config {
            context: Total::default(),
            utility: Count,
            system: Count,
            m1cvm: Count,
            data64: Count,
            m2cvm: Count,
            data128: Count,
            flex: Count,
            stream: Count,
            unknown: Count,
        });
        let mut messages = 0;
        for mt in 0u32..16 {
            for status in 0u32..16 {
                let w0 = (mt << 28) | (status << 20) | (status << 16);
                for _ in 0..MessageType::of_word(w0).word_count() {
                    d.push(w0);
                }
                messages += 1;
                assert_eq!(d.context().0, messages, "mt {mt:#x} status {status:#x}");
            }
        }
    }
}
