//! UMP to MIDI 1.0 bytestream translation.
//!
//! Runs the UMP dispatcher internally; decoded messages that survive the group filter are
//! serialised as MIDI 1.0 bytes with running-status elision. MIDI 2.0 channel voice messages
//! are downgraded on the way through; message types with no bytestream representation
//! (utility, data128, flex data, UMP stream) are dropped.

use crate::fifo::Fifo;
use crate::scale::scale_down;
use crate::ump::dispatcher::{
    Config, Data64Backend, Dispatcher, M1cvmBackend, M2cvmBackend, Null, SystemBackend,
};
use crate::ump::message::{data64, m1cvm, m2cvm, system};
use crate::ump::status;

/// One message fans out to at most twelve bytes (an RPN/NRPN rewritten as four control
/// changes), rounded up to the next power of two.
const OUTPUT_CAPACITY: usize = 16;
static_assertions::const_assert!(OUTPUT_CAPACITY.is_power_of_two());

struct Context {
    /// A bitmap of the groups whose messages are emitted.
    only_groups: u16,
    /// The last channel-voice status emitted, eligible for elision.
    running_status: Option<u8>,
    /// True between a sysex start packet and its end packet.
    sysex_active: bool,
    output: Fifo<u8, OUTPUT_CAPACITY>,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            only_groups: 0xFFFF,
            running_status: None,
            sysex_active: false,
            output: Fifo::new(),
        }
    }
}

impl Context {
    fn allows(&self, group: u8) -> bool {
        self.only_groups & (1u16 << (group & 0xF)) != 0
    }

    fn push_byte(&mut self, byte: u8) {
        if !status::is_status_byte(byte) || status::is_system_real_time(byte) {
            // Data bytes always flow; real-time bytes are transparent to running status.
            self.emit(byte);
        } else if byte < status::SYSEX_START {
            // Channel voice: elide a repeated status byte.
            if self.running_status != Some(byte) {
                self.emit(byte);
            }
            self.running_status = Some(byte);
        } else {
            // System common never participates in running status and cancels it.
            self.emit(byte);
            self.running_status = None;
        }
    }

    fn emit(&mut self, byte: u8) {
        let ok = self.output.push_back(byte);
        debug_assert!(ok, "bytestream output overflow; drain between pushes");
    }
}

struct System;

impl SystemBackend<Context> for System {
    fn midi_time_code(&mut self, c: &mut Context, m: system::MidiTimeCode) {
        if c.allows(m.group) {
            c.push_byte(status::TIME_CODE);
            c.push_byte(m.time_code & 0x7F);
        }
    }
    fn song_position_pointer(&mut self, c: &mut Context, m: system::SongPositionPointer) {
        if c.allows(m.group) {
            c.push_byte(status::SONG_POSITION);
            c.push_byte((m.position & 0x7F) as u8);
            c.push_byte(((m.position >> 7) & 0x7F) as u8);
        }
    }
    fn song_select(&mut self, c: &mut Context, m: system::SongSelect) {
        if c.allows(m.group) {
            c.push_byte(status::SONG_SELECT);
            c.push_byte(m.song & 0x7F);
        }
    }
    fn tune_request(&mut self, c: &mut Context, m: system::TuneRequest) {
        if c.allows(m.group) {
            c.push_byte(status::TUNE_REQUEST);
        }
    }
    fn timing_clock(&mut self, c: &mut Context, m: system::TimingClock) {
        if c.allows(m.group) {
            c.push_byte(status::TIMING_CLOCK);
        }
    }
    fn seq_start(&mut self, c: &mut Context, m: system::SequenceStart) {
        if c.allows(m.group) {
            c.push_byte(status::SEQ_START);
        }
    }
    fn seq_continue(&mut self, c: &mut Context, m: system::SequenceContinue) {
        if c.allows(m.group) {
            c.push_byte(status::SEQ_CONTINUE);
        }
    }
    fn seq_stop(&mut self, c: &mut Context, m: system::SequenceStop) {
        if c.allows(m.group) {
            c.push_byte(status::SEQ_STOP);
        }
    }
    fn active_sensing(&mut self, c: &mut Context, m: system::ActiveSensing) {
        if c.allows(m.group) {
            c.push_byte(status::ACTIVE_SENSING);
        }
    }
    fn reset(&mut self, c: &mut Context, m: system::Reset) {
        if c.allows(m.group) {
            c.push_byte(status::SYSTEM_RESET);
        }
    }
}

struct M1Cvm;

impl M1cvmBackend<Context> for M1Cvm {
    fn note_off(&mut self, c: &mut Context, m: m1cvm::NoteOff) {
        if c.allows(m.group) {
            c.push_byte(status::NOTE_OFF | m.channel);
            c.push_byte(m.note);
            c.push_byte(m.velocity);
        }
    }
    fn note_on(&mut self, c: &mut Context, m: m1cvm::NoteOn) {
        if c.allows(m.group) {
            c.push_byte(status::NOTE_ON | m.channel);
            c.push_byte(m.note);
            c.push_byte(m.velocity);
        }
    }
    fn poly_pressure(&mut self, c: &mut Context, m: m1cvm::PolyPressure) {
        if c.allows(m.group) {
            c.push_byte(status::POLY_PRESSURE | m.channel);
            c.push_byte(m.note);
            c.push_byte(m.pressure);
        }
    }
    fn control_change(&mut self, c: &mut Context, m: m1cvm::ControlChange) {
        if c.allows(m.group) {
            c.push_byte(status::CONTROL_CHANGE | m.channel);
            c.push_byte(m.controller);
            c.push_byte(m.value);
        }
    }
    fn program_change(&mut self, c: &mut Context, m: m1cvm::ProgramChange) {
        if c.allows(m.group) {
            c.push_byte(status::PROGRAM_CHANGE | m.channel);
            c.push_byte(m.program);
        }
    }
    fn channel_pressure(&mut self, c: &mut Context, m: m1cvm::ChannelPressure) {
        if c.allows(m.group) {
            c.push_byte(status::CHANNEL_PRESSURE | m.channel);
            c.push_byte(m.pressure);
        }
    }
    fn pitch_bend(&mut self, c: &mut Context, m: m1cvm::PitchBend) {
        if c.allows(m.group) {
            c.push_byte(status::PITCH_BEND | m.channel);
            c.push_byte((m.bend & 0x7F) as u8);
            c.push_byte(((m.bend >> 7) & 0x7F) as u8);
        }
    }
}

struct Data64;

impl Data64Backend<Context> for Data64 {
    fn sysex7_in_1(&mut self, c: &mut Context, m: data64::Sysex7Packet) {
        if c.allows(m.group) && m.count > 0 {
            c.push_byte(status::SYSEX_START);
            for b in m.bytes() {
                c.push_byte(*b);
            }
            c.push_byte(status::SYSEX_STOP);
        }
    }
    fn sysex7_start(&mut self, c: &mut Context, m: data64::Sysex7Packet) {
        if c.allows(m.group) {
            c.sysex_active = true;
            c.push_byte(status::SYSEX_START);
            for b in m.bytes() {
                c.push_byte(*b);
            }
        }
    }
    fn sysex7_continue(&mut self, c: &mut Context, m: data64::Sysex7Packet) {
        // A continue with no start on this stream is dropped.
        if c.allows(m.group) && c.sysex_active {
            for b in m.bytes() {
                c.push_byte(*b);
            }
        }
    }
    fn sysex7_end(&mut self, c: &mut Context, m: data64::Sysex7Packet) {
        if c.allows(m.group) && c.sysex_active {
            for b in m.bytes() {
                c.push_byte(*b);
            }
            c.push_byte(status::SYSEX_STOP);
            c.sysex_active = false;
        }
    }
}

struct M2Cvm;

impl M2cvmBackend<Context> for M2Cvm {
    fn note_off(&mut self, c: &mut Context, m: m2cvm::NoteOff) {
        if c.allows(m.group) {
            c.push_byte(status::NOTE_OFF | m.channel);
            c.push_byte(m.note);
            c.push_byte(scale_down(m.velocity as u32, 16, 7) as u8);
        }
    }
    fn note_on(&mut self, c: &mut Context, m: m2cvm::NoteOn) {
        if c.allows(m.group) {
            let mut velocity = scale_down(m.velocity as u32, 16, 7) as u8;
            if velocity == 0 {
                velocity = 1;
            }
            c.push_byte(status::NOTE_ON | m.channel);
            c.push_byte(m.note);
            c.push_byte(velocity);
        }
    }
    fn poly_pressure(&mut self, c: &mut Context, m: m2cvm::PolyPressure) {
        if c.allows(m.group) {
            c.push_byte(status::POLY_PRESSURE | m.channel);
            c.push_byte(m.note);
            c.push_byte(scale_down(m.pressure, 32, 7) as u8);
        }
    }
    fn control_change(&mut self, c: &mut Context, m: m2cvm::ControlChange) {
        if c.allows(m.group) {
            c.push_byte(status::CONTROL_CHANGE | m.channel);
            c.push_byte(m.controller);
            c.push_byte(scale_down(m.value, 32, 7) as u8);
        }
    }
    fn registered_controller(&mut self, c: &mut Context, m: m2cvm::RegisteredController) {
        if c.allows(m.group) {
            controller_pair(c, m.channel, 101, 100, m.bank, m.index, m.value);
        }
    }
    fn assignable_controller(&mut self, c: &mut Context, m: m2cvm::AssignableController) {
        if c.allows(m.group) {
            controller_pair(c, m.channel, 99, 98, m.bank, m.index, m.value);
        }
    }
    fn program_change(&mut self, c: &mut Context, m: m2cvm::ProgramChange) {
        if c.allows(m.group) {
            if m.bank_valid {
                c.push_byte(status::CONTROL_CHANGE | m.channel);
                c.push_byte(0);
                c.push_byte(m.bank_msb);
                c.push_byte(status::CONTROL_CHANGE | m.channel);
                c.push_byte(32);
                c.push_byte(m.bank_lsb);
            }
            c.push_byte(status::PROGRAM_CHANGE | m.channel);
            c.push_byte(m.program);
        }
    }
    fn channel_pressure(&mut self, c: &mut Context, m: m2cvm::ChannelPressure) {
        if c.allows(m.group) {
            c.push_byte(status::CHANNEL_PRESSURE | m.channel);
            c.push_byte(scale_down(m.pressure, 32, 7) as u8);
        }
    }
    fn pitch_bend(&mut self, c: &mut Context, m: m2cvm::PitchBend) {
        if c.allows(m.group) {
            let narrow = scale_down(m.bend, 32, 14);
            c.push_byte(status::PITCH_BEND | m.channel);
            c.push_byte((narrow & 0x7F) as u8);
            c.push_byte(((narrow >> 7) & 0x7F) as u8);
        }
    }
    // Per-note and relative controller messages have no MIDI 1.0 form; the defaults drop
    // them.
}

fn controller_pair(c: &mut Context, channel: u8, msb_cc: u8, lsb_cc: u8, bank: u8, index: u8, value: u32) {
    let narrow = scale_down(value, 32, 14) as u16;
    c.push_byte(status::CONTROL_CHANGE | channel);
    c.push_byte(msb_cc);
    c.push_byte(bank);
    c.push_byte(status::CONTROL_CHANGE | channel);
    c.push_byte(lsb_cc);
    c.push_byte(index);
    c.push_byte(status::CONTROL_CHANGE | channel);
    c.push_byte(6);
    c.push_byte((narrow >> 7) as u8);
    c.push_byte(status::CONTROL_CHANGE | channel);
    c.push_byte(38);
    c.push_byte((narrow & 0x7F) as u8);
}

type FromUmpDispatcher = Dispatcher<Context, Null, System, M1Cvm, Data64, M2Cvm, Null, Null, Null, Null>;

/// Translates UMP words into a MIDI 1.0 byte stream with running-status elision and group
/// filtering.
pub struct UmpToBytestream {
    dispatcher: FromUmpDispatcher,
}

impl Default for UmpToBytestream {
    fn default() -> Self {
        Self::new()
    }
}

impl UmpToBytestream {
    pub fn new() -> Self {
        UmpToBytestream {
            dispatcher: Dispatcher::new(Config {
                context: Context::default(),
                utility: Null,
                system: System,
                m1cvm: M1Cvm,
                data64: Data64,
                m2cvm: M2Cvm,
                data128: Null,
                flex: Null,
                stream: Null,
                unknown: Null,
            }),
        }
    }

    /// Selects the groups to emit. A zero bitmap means no filtering.
    pub fn group_filter(&mut self, group_bitmap: u16) {
        self.dispatcher.context_mut().only_groups =
            if group_bitmap == 0 { 0xFFFF } else { group_bitmap };
    }

    pub fn empty(&self) -> bool {
        self.dispatcher.context().output.empty()
    }

    /// Pops the next output byte.
    ///
    /// The output must not be empty.
    pub fn pop(&mut self) -> u8 {
        debug_assert!(!self.empty());
        self.dispatcher.context_mut().output.pop_front()
    }

    /// Feeds one UMP word.
    pub fn push(&mut self, word: u32) {
        self.dispatcher.push(word);
    }

    /// Drops in-flight state, buffered output, running status and the group filter.
    pub fn reset(&mut self) {
        *self.dispatcher.context_mut() = Context::default();
        self.dispatcher.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(t: &mut UmpToBytestream, words: &[u32]) -> std::vec::Vec<u8> {
        let mut out = std::vec::Vec::new();
        for w in words {
            t.push(*w);
            while !t.empty() {
                out.push(t.pop());
            }
        }
        out
    }

    #[test]
    fn running_status_is_elided() {
        let mut t = UmpToBytestream::new();
        let out = translate(&mut t, &[0x20816050, 0x20817070]);
        assert_eq!(out, [0x81, 0x60, 0x50, 0x70, 0x70]);
    }

    #[test]
    fn status_change_re_emits_status() {
        let mut t = UmpToBytestream::new();
        let out = translate(&mut t, &[0x20816050, 0x20916070]);
        assert_eq!(out, [0x81, 0x60, 0x50, 0x91, 0x60, 0x70]);
    }

    #[test]
    fn real_time_does_not_disturb_running_status() {
        let mut t = UmpToBytestream::new();
        let out = translate(&mut t, &[0x20816050, 0x10F80000, 0x20817070]);
        assert_eq!(out, [0x81, 0x60, 0x50, 0xF8, 0x70, 0x70]);
    }

    #[test]
    fn system_common_clears_running_status() {
        let mut t = UmpToBytestream::new();
        let out = translate(&mut t, &[0x20816050, 0x10F32A00, 0x20817070]);
        assert_eq!(out, [0x81, 0x60, 0x50, 0xF3, 0x2A, 0x81, 0x70, 0x70]);
    }

    #[test]
    fn program_change_is_two_bytes() {
        let mut t = UmpToBytestream::new();
        assert_eq!(translate(&mut t, &[0x20C64000]), [0xC6, 0x40]);
    }

    #[test]
    fn song_position_operands() {
        let mut t = UmpToBytestream::new();
        let word = crate::ump::message::system::SongPositionPointer { group: 0, position: 12864 }
            .to_word();
        assert_eq!(translate(&mut t, &[word]), [0xF2, 0x40, 0x64]);
    }

    #[test]
    fn sysex_round_trips() {
        let words = [
            0x30167E7F, 0x0D70024B, 0x3026607A, 0x737F7F7F, 0x30267F7D, 0x00000000, 0x30260100,
            0x00000300, 0x30360000, 0x10000000,
        ];
        let expected = [
            0xF0, 0x7E, 0x7F, 0x0D, 0x70, 0x02, 0x4B, 0x60, 0x7A, 0x73, 0x7F, 0x7F, 0x7F, 0x7F,
            0x7D, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0xF7,
        ];
        let mut t = UmpToBytestream::new();
        assert_eq!(translate(&mut t, &words), expected);
    }

    #[test]
    fn sysex_continue_without_start_is_dropped() {
        let mut t = UmpToBytestream::new();
        assert_eq!(translate(&mut t, &[0x30260102, 0x03040506]), []);
        assert_eq!(translate(&mut t, &[0x30360102, 0x03040506]), []);
    }

    #[test]
    fn m2_note_on_downgrades() {
        let mut t = UmpToBytestream::new();
        assert_eq!(translate(&mut t, &[0x40904000, 0xC1040000]), [0x90, 0x40, 0x60]);
    }

    #[test]
    fn m2_zero_velocity_note_on_clamps() {
        let mut t = UmpToBytestream::new();
        assert_eq!(translate(&mut t, &[0x40913C00, 0x00010000]), [0x91, 0x3C, 0x01]);
    }

    #[test]
    fn m2_rpn_expands_with_elision() {
        let mut t = UmpToBytestream::new();
        let out = translate(&mut t, &[0x40260006, 0x10000000]);
        assert_eq!(out, [0xB6, 101, 0, 100, 6, 6, 8, 38, 0]);
    }

    #[test]
    fn m2_program_change_with_bank_expands() {
        let mut t = UmpToBytestream::new();
        let out = translate(&mut t, &[0x40C60001, 0x4100010A]);
        assert_eq!(out, [0xB6, 0, 1, 32, 10, 0xC6, 0x41]);
    }

    #[test]
    fn m2_per_note_messages_are_dropped() {
        let mut t = UmpToBytestream::new();
        assert_eq!(translate(&mut t, &[0x40623C00, 0x80000000]), []);
    }

    #[test]
    fn group_filter_drops_other_groups() {
        let mut t = UmpToBytestream::new();
        t.group_filter(0b0010);
        let out = translate(&mut t, &[0x20816050, 0x21917070]);
        assert_eq!(out, [0x91, 0x70, 0x70]);
    }

    #[test]
    fn group_filter_zero_means_all() {
        let mut t = UmpToBytestream::new();
        t.group_filter(0);
        assert_eq!(translate(&mut t, &[0x20816050]), [0x81, 0x60, 0x50]);
    }

    #[test]
    fn unrepresentable_types_are_dropped() {
        let mut t = UmpToBytestream::new();
        // Utility, flex data and stream messages have no MIDI 1.0 form.
        let out = translate(
            &mut t,
            &[0x00100020, 0xD0100000, 0, 0, 0, 0xF0000101, 0, 0, 0],
        );
        assert_eq!(out, []);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut t = UmpToBytestream::new();
        t.group_filter(0b0001);
        translate(&mut t, &[0x20816050]);
        t.reset();
        // Running status was dropped with the rest of the state.
        assert_eq!(translate(&mut t, &[0x20816050]), [0x81, 0x60, 0x50]);
    }
}
