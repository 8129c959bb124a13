//! MIDI 1.0 bytestream to UMP translation.

use crate::fifo::Fifo;
use crate::scale::scale_up;
use crate::ump::message::data64::{Sysex7Packet, Sysex7Status};
use crate::ump::status;

/// Where the sysex accumulator sits within a message.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
enum SysexRun {
    /// No packet has been emitted yet; a message that ends now fits a single packet.
    #[default]
    First,
    /// At least one packet has been emitted; subsequent packets continue the message.
    Continued,
}

/// Per-channel latches for the MIDI 1.0 controller pairs that MIDI 2.0 folds into single
/// messages.
#[derive(Copy, Clone, Debug, Default)]
struct ChannelState {
    bank_msb: Option<u8>,
    bank_lsb: Option<u8>,
    /// True while CC 101/100 selected the parameter, false for CC 99/98.
    rpn_mode: bool,
    param_msb: Option<u8>,
    param_lsb: Option<u8>,
    data_msb: Option<u8>,
}

/// Translates a MIDI 1.0 byte stream into UMP words, either MIDI 1.0 channel voice packets
/// (the default) or MIDI 2.0 channel voice packets with rescaled operands.
///
/// Push bytes with [`push`](Self::push) and drain words with [`pop`](Self::pop). The output
/// queue holds the worst-case fan-out of a single input byte, so it never overflows as long
/// as it is drained between pushes.
pub struct BytestreamToUmp {
    output_midi2: bool,
    group: u8,
    running_status: Option<u8>,
    first_data: Option<u8>,
    sysex_run: SysexRun,
    sysex_len: u8,
    sysex: [u8; 6],
    channel: [ChannelState; 16],
    output: Fifo<u32, OUTPUT_CAPACITY>,
}

/// One input byte fans out to at most four words: a fused controller or program change with
/// bank is a single two-word message, and a sysex data byte can flush a full packet before
/// being buffered.
const OUTPUT_CAPACITY: usize = 4;
static_assertions::const_assert!(OUTPUT_CAPACITY.is_power_of_two());

impl Default for BytestreamToUmp {
    fn default() -> Self {
        Self::new(false, 0)
    }
}

impl BytestreamToUmp {
    /// `output_midi2` selects MIDI 2.0 channel voice output; `group` tags every emitted word.
    pub fn new(output_midi2: bool, group: u8) -> Self {
        debug_assert!(group <= 0xF);
        BytestreamToUmp {
            output_midi2,
            group: group & 0xF,
            running_status: None,
            first_data: None,
            sysex_run: SysexRun::First,
            sysex_len: 0,
            sysex: [0; 6],
            channel: [ChannelState::default(); 16],
            output: Fifo::new(),
        }
    }

    /// Switches between MIDI 1.0 and MIDI 2.0 channel voice output.
    pub fn set_output_midi2(&mut self, output_midi2: bool) {
        self.output_midi2 = output_midi2;
    }

    pub fn set_group(&mut self, group: u8) {
        debug_assert!(group <= 0xF);
        self.group = group & 0xF;
    }

    pub fn empty(&self) -> bool {
        self.output.empty()
    }

    /// Pops the next emitted UMP word.
    ///
    /// The output must not be empty.
    pub fn pop(&mut self) -> u32 {
        debug_assert!(!self.empty());
        self.output.pop_front()
    }

    /// Drops all in-flight state and buffered output.
    pub fn reset(&mut self) {
        let (output_midi2, group) = (self.output_midi2, self.group);
        *self = Self::new(output_midi2, group);
    }

    /// Feeds one byte of the legacy stream.
    pub fn push(&mut self, byte: u8) {
        if status::is_system_real_time(byte) {
            // Real-time bytes may interleave anywhere, even inside sysex, and never disturb
            // the parse state.
            self.emit1(self.pack(0x1, byte, 0, 0));
            return;
        }
        if status::is_status_byte(byte) {
            self.status_byte(byte);
            return;
        }
        match self.running_status {
            Some(status::SYSEX_START) => self.sysex_data(byte),
            Some(d0) => self.data_byte(d0, byte),
            None => {
                log::trace!("dropping data byte {byte:#04x} with no running status");
            }
        }
    }

    fn status_byte(&mut self, byte: u8) {
        match byte {
            status::SYSEX_START => {
                self.sysex_run = SysexRun::First;
                self.sysex_len = 0;
                self.sysex = [0; 6];
                self.running_status = Some(byte);
            }
            status::SYSEX_STOP => {
                if self.running_status == Some(status::SYSEX_START) {
                    let status = match self.sysex_run {
                        SysexRun::First => Sysex7Status::In1,
                        SysexRun::Continued => Sysex7Status::End,
                    };
                    self.flush_sysex(status);
                } else {
                    log::trace!("dropping sysex end with no sysex in progress");
                }
                self.running_status = None;
            }
            status::TUNE_REQUEST => {
                self.emit1(self.pack(0x1, byte, 0, 0));
                self.running_status = None;
            }
            status::TIME_CODE | status::SONG_POSITION | status::SONG_SELECT => {
                self.running_status = Some(byte);
                self.first_data = None;
            }
            0xF4 | 0xF5 => {
                // Undefined system common; clears running status like any other.
                self.running_status = None;
                self.first_data = None;
            }
            _ => {
                self.running_status = Some(byte);
                self.first_data = None;
            }
        }
    }

    fn data_byte(&mut self, d0: u8, byte: u8) {
        match d0 {
            status::TIME_CODE | status::SONG_SELECT => {
                self.emit1(self.pack(0x1, d0, byte, 0));
                self.running_status = None;
            }
            status::SONG_POSITION => match self.first_data.take() {
                None => self.first_data = Some(byte),
                Some(lsb) => {
                    self.emit1(self.pack(0x1, d0, lsb, byte));
                    self.running_status = None;
                }
            },
            _ => match d0 & 0xF0 {
                status::PROGRAM_CHANGE | status::CHANNEL_PRESSURE => self.voice_message(d0, byte, 0),
                _ => match self.first_data.take() {
                    None => self.first_data = Some(byte),
                    Some(first) => self.voice_message(d0, first, byte),
                },
            },
        }
    }

    fn sysex_data(&mut self, byte: u8) {
        if self.sysex_len == 6 {
            let status = match self.sysex_run {
                SysexRun::First => Sysex7Status::Start,
                SysexRun::Continued => Sysex7Status::Continue,
            };
            self.flush_sysex(status);
            self.sysex_run = SysexRun::Continued;
        }
        self.sysex[self.sysex_len as usize] = byte;
        self.sysex_len += 1;
    }

    fn flush_sysex(&mut self, status: Sysex7Status) {
        let packet = Sysex7Packet { group: self.group, data: self.sysex, count: self.sysex_len };
        self.emit2(packet.to_words(status));
        self.sysex = [0; 6];
        self.sysex_len = 0;
    }

    fn voice_message(&mut self, d0: u8, b1: u8, b2: u8) {
        if !self.output_midi2 {
            self.emit1(self.pack(0x2, d0, b1, b2));
            return;
        }
        let channel = (d0 & 0xF) as usize;
        match d0 & 0xF0 {
            status::NOTE_ON if b2 == 0 => {
                // A zero-velocity note-on means note-off; keep that meaning explicit so the
                // downgrade path can invert it.
                self.emit2([self.pack(0x4, status::NOTE_OFF | d0 & 0xF, b1, 0), 0]);
            }
            status::NOTE_OFF | status::NOTE_ON => {
                self.emit2([self.pack(0x4, d0, b1, 0), scale_up(b2 as u32, 7, 16) << 16]);
            }
            status::POLY_PRESSURE => {
                self.emit2([self.pack(0x4, d0, b1, 0), scale_up(b2 as u32, 7, 32)]);
            }
            status::CONTROL_CHANGE => self.controller(channel, d0, b1, b2),
            status::PROGRAM_CHANGE => {
                let state = &mut self.channel[channel];
                let (flag, bank_msb, bank_lsb) = match (state.bank_msb.take(), state.bank_lsb.take())
                {
                    (Some(msb), Some(lsb)) => (1, msb, lsb),
                    _ => (0, 0, 0),
                };
                self.emit2([
                    self.pack(0x4, d0, 0, flag),
                    ((b1 as u32) << 24) | ((bank_msb as u32) << 8) | bank_lsb as u32,
                ]);
            }
            status::CHANNEL_PRESSURE => {
                self.emit2([self.pack(0x4, d0, 0, 0), scale_up(b1 as u32, 7, 32)]);
            }
            status::PITCH_BEND => {
                let bend = ((b2 as u32) << 7) | b1 as u32;
                self.emit2([self.pack(0x4, d0, 0, 0), scale_up(bend, 14, 32)]);
            }
            _ => unreachable!(),
        }
    }

    fn controller(&mut self, channel: usize, d0: u8, index: u8, value: u8) {
        let state = &mut self.channel[channel];
        match index {
            0 => state.bank_msb = Some(value),
            32 => state.bank_lsb = Some(value),
            101 | 99 => {
                state.rpn_mode = index == 101;
                state.param_msb = Some(value);
                state.data_msb = None;
            }
            100 | 98 => {
                state.rpn_mode = index == 100;
                state.param_lsb = Some(value);
                state.data_msb = None;
            }
            6 => {
                if let (Some(msb), Some(lsb)) = (state.param_msb, state.param_lsb) {
                    state.data_msb = Some(value);
                    let rpn_mode = state.rpn_mode;
                    let wide = scale_up((value as u32) << 7, 14, 32);
                    self.fused_controller(d0, rpn_mode, msb, lsb, wide);
                } else {
                    log::trace!("dropping data entry MSB with no parameter selected");
                }
            }
            38 => {
                if let (Some(msb), Some(lsb), Some(data_msb)) =
                    (state.param_msb, state.param_lsb, state.data_msb)
                {
                    let rpn_mode = state.rpn_mode;
                    let wide = scale_up(((data_msb as u32) << 7) | value as u32, 14, 32);
                    self.fused_controller(d0, rpn_mode, msb, lsb, wide);
                } else {
                    log::trace!("dropping data entry LSB with no parameter value pending");
                }
            }
            _ => {
                self.emit2([self.pack(0x4, d0, index, 0), scale_up(value as u32, 7, 32)]);
            }
        }
    }

    fn fused_controller(&mut self, d0: u8, rpn_mode: bool, bank: u8, index: u8, value: u32) {
        let status = if rpn_mode { status::RPN } else { status::NRPN };
        self.emit2([self.pack(0x4, status | (d0 & 0xF), bank, index), value]);
    }

    #[inline]
    fn pack(&self, mt: u8, b1: u8, b2: u8, b3: u8) -> u32 {
        (((mt << 4) | self.group) as u32) << 24 | ((b1 as u32) << 16) | ((b2 as u32) << 8) | b3 as u32
    }

    fn emit1(&mut self, word: u32) {
        let ok = self.output.push_back(word);
        debug_assert!(ok, "UMP output overflow; drain between pushes");
    }

    fn emit2(&mut self, words: [u32; 2]) {
        for word in words {
            self.emit1(word);
        }
    }
}
