//! Typed records for every Universal MIDI Packet message.
//!
//! Each record is a plain struct with named fields plus total `from_word(s)`/`to_word(s)`
//! conversions against the bit-exact layouts of the UMP specification. Wide fields are masked
//! at the codec boundary, so conversions never panic.

use crate::bitfield::{get, get_signed, set, set_signed};
use crate::ump::status;

#[inline(always)]
fn mt_group(mt: u8, group: u8) -> u32 {
    ((mt as u32) << 28) | (((group & 0xF) as u32) << 24)
}

/// Utility messages (message type 0x0), one word.
pub mod utility {
    use super::*;

    pub const NOOP: u8 = 0x0;
    pub const JR_CLOCK: u8 = 0x1;
    pub const JR_TIMESTAMP: u8 = 0x2;
    pub const DELTA_CLOCKSTAMP_TPQN: u8 = 0x3;
    pub const DELTA_CLOCKSTAMP: u8 = 0x4;

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct NoOp {
        pub group: u8,
    }

    impl NoOp {
        pub fn from_word(w: u32) -> Self {
            NoOp { group: get::<24, 4>(w) as u8 }
        }
        pub fn to_word(&self) -> u32 {
            mt_group(0x0, self.group)
        }
    }

    /// Jitter-reduction clock: the sender's 16-bit clock-tick time.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct JrClock {
        pub group: u8,
        pub time: u16,
    }

    impl JrClock {
        pub fn from_word(w: u32) -> Self {
            JrClock { group: get::<24, 4>(w) as u8, time: get::<0, 16>(w) as u16 }
        }
        pub fn to_word(&self) -> u32 {
            mt_group(0x0, self.group) | ((JR_CLOCK as u32) << 20) | self.time as u32
        }
    }

    /// Jitter-reduction timestamp attached to the messages that follow it.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct JrTimestamp {
        pub group: u8,
        pub time: u16,
    }

    impl JrTimestamp {
        pub fn from_word(w: u32) -> Self {
            JrTimestamp { group: get::<24, 4>(w) as u8, time: get::<0, 16>(w) as u16 }
        }
        pub fn to_word(&self) -> u32 {
            mt_group(0x0, self.group) | ((JR_TIMESTAMP as u32) << 20) | self.time as u32
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct DeltaClockstampTpqn {
        pub group: u8,
        pub ticks_pqn: u16,
    }

    impl DeltaClockstampTpqn {
        pub fn from_word(w: u32) -> Self {
            DeltaClockstampTpqn { group: get::<24, 4>(w) as u8, ticks_pqn: get::<0, 16>(w) as u16 }
        }
        pub fn to_word(&self) -> u32 {
            mt_group(0x0, self.group) | ((DELTA_CLOCKSTAMP_TPQN as u32) << 20) | self.ticks_pqn as u32
        }
    }

    /// Ticks since the last event, 20 bits.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct DeltaClockstamp {
        pub group: u8,
        pub ticks: u32,
    }

    impl DeltaClockstamp {
        pub fn from_word(w: u32) -> Self {
            DeltaClockstamp { group: get::<24, 4>(w) as u8, ticks: get::<0, 20>(w) }
        }
        pub fn to_word(&self) -> u32 {
            mt_group(0x0, self.group) | ((DELTA_CLOCKSTAMP as u32) << 20) | (self.ticks & 0xF_FFFF)
        }
    }
}

/// System common and real-time messages (message type 0x1), one word.
pub mod system {
    use super::*;

    macro_rules! plain_system_message {
        ($(#[$doc:meta])* $name:ident, $status:expr) => {
            $(#[$doc])*
            #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
            #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
            pub struct $name {
                pub group: u8,
            }

            impl $name {
                pub fn from_word(w: u32) -> Self {
                    $name { group: get::<24, 4>(w) as u8 }
                }
                pub fn to_word(&self) -> u32 {
                    mt_group(0x1, self.group) | (($status as u32) << 16)
                }
            }
        };
    }

    /// MIDI time code quarter frame.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct MidiTimeCode {
        pub group: u8,
        pub time_code: u8,
    }

    impl MidiTimeCode {
        pub fn from_word(w: u32) -> Self {
            MidiTimeCode { group: get::<24, 4>(w) as u8, time_code: get::<8, 7>(w) as u8 }
        }
        pub fn to_word(&self) -> u32 {
            mt_group(0x1, self.group)
                | ((status::TIME_CODE as u32) << 16)
                | (((self.time_code & 0x7F) as u32) << 8)
        }
    }

    /// 14-bit count of MIDI beats from the start of the song.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct SongPositionPointer {
        pub group: u8,
        pub position: u16,
    }

    impl SongPositionPointer {
        pub fn from_word(w: u32) -> Self {
            let lsb = get::<8, 7>(w);
            let msb = get::<0, 7>(w);
            SongPositionPointer {
                group: get::<24, 4>(w) as u8,
                position: (lsb | (msb << 7)) as u16,
            }
        }
        pub fn to_word(&self) -> u32 {
            mt_group(0x1, self.group)
                | ((status::SONG_POSITION as u32) << 16)
                | (((self.position & 0x7F) as u32) << 8)
                | (((self.position >> 7) & 0x7F) as u32)
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct SongSelect {
        pub group: u8,
        pub song: u8,
    }

    impl SongSelect {
        pub fn from_word(w: u32) -> Self {
            SongSelect { group: get::<24, 4>(w) as u8, song: get::<8, 7>(w) as u8 }
        }
        pub fn to_word(&self) -> u32 {
            mt_group(0x1, self.group)
                | ((status::SONG_SELECT as u32) << 16)
                | (((self.song & 0x7F) as u32) << 8)
        }
    }

    plain_system_message!(TuneRequest, status::TUNE_REQUEST);
    plain_system_message!(
        /// Sent 24 times per quarter note when synchronization is required.
        TimingClock,
        status::TIMING_CLOCK
    );
    plain_system_message!(SequenceStart, status::SEQ_START);
    plain_system_message!(SequenceContinue, status::SEQ_CONTINUE);
    plain_system_message!(SequenceStop, status::SEQ_STOP);
    plain_system_message!(ActiveSensing, status::ACTIVE_SENSING);
    plain_system_message!(Reset, status::SYSTEM_RESET);
}

/// MIDI 1.0 channel voice messages carried in UMP form (message type 0x2), one word.
pub mod m1cvm {
    use super::*;

    #[inline(always)]
    fn w0(group: u8, status: u8, channel: u8, d1: u8, d2: u8) -> u32 {
        mt_group(0x2, group)
            | (((status & 0xF0) as u32) << 16)
            | (((channel & 0xF) as u32) << 16)
            | (((d1 & 0x7F) as u32) << 8)
            | ((d2 & 0x7F) as u32)
    }

    macro_rules! note_message {
        ($name:ident, $status:expr, $b2:ident) => {
            #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
            #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
            pub struct $name {
                pub group: u8,
                pub channel: u8,
                pub note: u8,
                pub $b2: u8,
            }

            impl $name {
                pub fn from_word(w: u32) -> Self {
                    $name {
                        group: get::<24, 4>(w) as u8,
                        channel: get::<16, 4>(w) as u8,
                        note: get::<8, 7>(w) as u8,
                        $b2: get::<0, 7>(w) as u8,
                    }
                }
                pub fn to_word(&self) -> u32 {
                    w0(self.group, $status, self.channel, self.note, self.$b2)
                }
            }
        };
    }

    note_message!(NoteOff, status::NOTE_OFF, velocity);
    note_message!(NoteOn, status::NOTE_ON, velocity);
    note_message!(PolyPressure, status::POLY_PRESSURE, pressure);

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct ControlChange {
        pub group: u8,
        pub channel: u8,
        pub controller: u8,
        pub value: u8,
    }

    impl ControlChange {
        pub fn from_word(w: u32) -> Self {
            ControlChange {
                group: get::<24, 4>(w) as u8,
                channel: get::<16, 4>(w) as u8,
                controller: get::<8, 7>(w) as u8,
                value: get::<0, 7>(w) as u8,
            }
        }
        pub fn to_word(&self) -> u32 {
            w0(self.group, status::CONTROL_CHANGE, self.channel, self.controller, self.value)
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct ProgramChange {
        pub group: u8,
        pub channel: u8,
        pub program: u8,
    }

    impl ProgramChange {
        pub fn from_word(w: u32) -> Self {
            ProgramChange {
                group: get::<24, 4>(w) as u8,
                channel: get::<16, 4>(w) as u8,
                program: get::<8, 7>(w) as u8,
            }
        }
        pub fn to_word(&self) -> u32 {
            w0(self.group, status::PROGRAM_CHANGE, self.channel, self.program, 0)
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct ChannelPressure {
        pub group: u8,
        pub channel: u8,
        pub pressure: u8,
    }

    impl ChannelPressure {
        pub fn from_word(w: u32) -> Self {
            ChannelPressure {
                group: get::<24, 4>(w) as u8,
                channel: get::<16, 4>(w) as u8,
                pressure: get::<8, 7>(w) as u8,
            }
        }
        pub fn to_word(&self) -> u32 {
            w0(self.group, status::CHANNEL_PRESSURE, self.channel, self.pressure, 0)
        }
    }

    /// 14-bit pitch bend; 0x2000 is centre.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct PitchBend {
        pub group: u8,
        pub channel: u8,
        pub bend: u16,
    }

    impl PitchBend {
        pub fn from_word(w: u32) -> Self {
            let lsb = get::<8, 7>(w);
            let msb = get::<0, 7>(w);
            PitchBend {
                group: get::<24, 4>(w) as u8,
                channel: get::<16, 4>(w) as u8,
                bend: (lsb | (msb << 7)) as u16,
            }
        }
        pub fn to_word(&self) -> u32 {
            w0(
                self.group,
                status::PITCH_BEND,
                self.channel,
                (self.bend & 0x7F) as u8,
                ((self.bend >> 7) & 0x7F) as u8,
            )
        }
    }
}

/// 64-bit data messages: system exclusive payloads of up to six 7-bit bytes per packet
/// (message type 0x3).
pub mod data64 {
    use super::*;

    /// Where a packet sits in a system exclusive message.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub enum Sysex7Status {
        /// A complete message in a single packet.
        #[default]
        In1 = 0x0,
        Start = 0x1,
        Continue = 0x2,
        End = 0x3,
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct Sysex7Packet {
        pub group: u8,
        /// Payload bytes; only the first `count` are meaningful.
        pub data: [u8; 6],
        pub count: u8,
    }

    impl Sysex7Packet {
        pub fn bytes(&self) -> &[u8] {
            &self.data[..self.count.min(6) as usize]
        }

        /// Decodes a packet and its position status. An out-of-range byte count is clamped
        /// to six.
        pub fn from_words(w: [u32; 2]) -> (u32, Self) {
            let status = get::<20, 4>(w[0]);
            let count = get::<16, 4>(w[0]).min(6) as u8;
            let mut data = [0u8; 6];
            data[0] = get::<8, 7>(w[0]) as u8;
            data[1] = get::<0, 7>(w[0]) as u8;
            data[2] = get::<24, 7>(w[1]) as u8;
            data[3] = get::<16, 7>(w[1]) as u8;
            data[4] = get::<8, 7>(w[1]) as u8;
            data[5] = get::<0, 7>(w[1]) as u8;
            (status, Sysex7Packet { group: get::<24, 4>(w[0]) as u8, data, count })
        }

        pub fn to_words(&self, status: Sysex7Status) -> [u32; 2] {
            let count = self.count.min(6);
            let w0 = mt_group(0x3, self.group)
                | ((status as u32) << 20)
                | ((count as u32) << 16)
                | (((self.data[0] & 0x7F) as u32) << 8)
                | ((self.data[1] & 0x7F) as u32);
            let w1 = (((self.data[2] & 0x7F) as u32) << 24)
                | (((self.data[3] & 0x7F) as u32) << 16)
                | (((self.data[4] & 0x7F) as u32) << 8)
                | ((self.data[5] & 0x7F) as u32);
            [w0, w1]
        }
    }
}

/// MIDI 2.0 channel voice messages (message type 0x4), two words.
pub mod m2cvm {
    use super::*;

    #[inline(always)]
    fn w0(group: u8, status: u8, channel: u8, b2: u8, b3: u8) -> u32 {
        mt_group(0x4, group)
            | (((status & 0xF0) as u32) << 16)
            | (((channel & 0xF) as u32) << 16)
            | ((b2 as u32) << 8)
            | (b3 as u32)
    }

    macro_rules! note_message {
        ($name:ident, $status:expr) => {
            /// 16-bit velocity with an optional attribute word.
            #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
            #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
            pub struct $name {
                pub group: u8,
                pub channel: u8,
                pub note: u8,
                pub velocity: u16,
                pub attribute_type: u8,
                pub attribute: u16,
            }

            impl $name {
                pub fn from_words(w: [u32; 2]) -> Self {
                    $name {
                        group: get::<24, 4>(w[0]) as u8,
                        channel: get::<16, 4>(w[0]) as u8,
                        note: get::<8, 7>(w[0]) as u8,
                        attribute_type: get::<0, 8>(w[0]) as u8,
                        velocity: (w[1] >> 16) as u16,
                        attribute: (w[1] & 0xFFFF) as u16,
                    }
                }
                pub fn to_words(&self) -> [u32; 2] {
                    [
                        w0(self.group, $status, self.channel, self.note & 0x7F, self.attribute_type),
                        ((self.velocity as u32) << 16) | self.attribute as u32,
                    ]
                }
            }
        };
    }

    note_message!(NoteOff, status::NOTE_OFF);
    note_message!(NoteOn, status::NOTE_ON);

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct PolyPressure {
        pub group: u8,
        pub channel: u8,
        pub note: u8,
        pub pressure: u32,
    }

    impl PolyPressure {
        pub fn from_words(w: [u32; 2]) -> Self {
            PolyPressure {
                group: get::<24, 4>(w[0]) as u8,
                channel: get::<16, 4>(w[0]) as u8,
                note: get::<8, 7>(w[0]) as u8,
                pressure: w[1],
            }
        }
        pub fn to_words(&self) -> [u32; 2] {
            [w0(self.group, status::POLY_PRESSURE, self.channel, self.note & 0x7F, 0), self.pressure]
        }
    }

    macro_rules! per_note_controller {
        ($name:ident, $status:expr) => {
            #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
            #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
            pub struct $name {
                pub group: u8,
                pub channel: u8,
                pub note: u8,
                pub controller: u8,
                pub value: u32,
            }

            impl $name {
                pub fn from_words(w: [u32; 2]) -> Self {
                    $name {
                        group: get::<24, 4>(w[0]) as u8,
                        channel: get::<16, 4>(w[0]) as u8,
                        note: get::<8, 7>(w[0]) as u8,
                        controller: get::<0, 8>(w[0]) as u8,
                        value: w[1],
                    }
                }
                pub fn to_words(&self) -> [u32; 2] {
                    [w0(self.group, $status, self.channel, self.note & 0x7F, self.controller), self.value]
                }
            }
        };
    }

    per_note_controller!(RegisteredPerNoteController, status::RPN_PER_NOTE);
    per_note_controller!(AssignablePerNoteController, status::NRPN_PER_NOTE);

    macro_rules! banked_controller {
        ($(#[$doc:meta])* $name:ident, $status:expr) => {
            $(#[$doc])*
            #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
            #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
            pub struct $name {
                pub group: u8,
                pub channel: u8,
                pub bank: u8,
                pub index: u8,
                pub value: u32,
            }

            impl $name {
                pub fn from_words(w: [u32; 2]) -> Self {
                    $name {
                        group: get::<24, 4>(w[0]) as u8,
                        channel: get::<16, 4>(w[0]) as u8,
                        bank: get::<8, 7>(w[0]) as u8,
                        index: get::<0, 7>(w[0]) as u8,
                        value: w[1],
                    }
                }
                pub fn to_words(&self) -> [u32; 2] {
                    [w0(self.group, $status, self.channel, self.bank & 0x7F, self.index & 0x7F), self.value]
                }
            }
        };
    }

    banked_controller!(
        /// A registered (RPN) controller, the single-message MIDI 2.0 form of the CC
        /// 101/100/6/38 sequence.
        RegisteredController,
        status::RPN
    );
    banked_controller!(
        /// An assignable (NRPN) controller.
        AssignableController,
        status::NRPN
    );
    banked_controller!(
        /// A registered controller change relative to its current value (two's complement).
        RelativeRegisteredController,
        status::RPN_RELATIVE
    );
    banked_controller!(RelativeAssignableController, status::NRPN_RELATIVE);

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct ControlChange {
        pub group: u8,
        pub channel: u8,
        pub controller: u8,
        pub value: u32,
    }

    impl ControlChange {
        pub fn from_words(w: [u32; 2]) -> Self {
            ControlChange {
                group: get::<24, 4>(w[0]) as u8,
                channel: get::<16, 4>(w[0]) as u8,
                controller: get::<8, 7>(w[0]) as u8,
                value: w[1],
            }
        }
        pub fn to_words(&self) -> [u32; 2] {
            [w0(self.group, status::CONTROL_CHANGE, self.channel, self.controller & 0x7F, 0), self.value]
        }
    }

    /// Program change with an optional bank select, replacing the MIDI 1.0 CC 0/32 latch.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct ProgramChange {
        pub group: u8,
        pub channel: u8,
        pub program: u8,
        pub bank_valid: bool,
        pub bank_msb: u8,
        pub bank_lsb: u8,
    }

    impl ProgramChange {
        pub fn from_words(w: [u32; 2]) -> Self {
            ProgramChange {
                group: get::<24, 4>(w[0]) as u8,
                channel: get::<16, 4>(w[0]) as u8,
                bank_valid: get::<0, 1>(w[0]) != 0,
                program: get::<24, 7>(w[1]) as u8,
                bank_msb: get::<8, 7>(w[1]) as u8,
                bank_lsb: get::<0, 7>(w[1]) as u8,
            }
        }
        pub fn to_words(&self) -> [u32; 2] {
            [
                w0(self.group, status::PROGRAM_CHANGE, self.channel, 0, self.bank_valid as u8),
                (((self.program & 0x7F) as u32) << 24)
                    | (((self.bank_msb & 0x7F) as u32) << 8)
                    | ((self.bank_lsb & 0x7F) as u32),
            ]
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct ChannelPressure {
        pub group: u8,
        pub channel: u8,
        pub pressure: u32,
    }

    impl ChannelPressure {
        pub fn from_words(w: [u32; 2]) -> Self {
            ChannelPressure {
                group: get::<24, 4>(w[0]) as u8,
                channel: get::<16, 4>(w[0]) as u8,
                pressure: w[1],
            }
        }
        pub fn to_words(&self) -> [u32; 2] {
            [w0(self.group, status::CHANNEL_PRESSURE, self.channel, 0, 0), self.pressure]
        }
    }

    /// 32-bit pitch bend; 0x8000_0000 is centre.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct PitchBend {
        pub group: u8,
        pub channel: u8,
        pub bend: u32,
    }

    impl PitchBend {
        pub fn from_words(w: [u32; 2]) -> Self {
            PitchBend {
                group: get::<24, 4>(w[0]) as u8,
                channel: get::<16, 4>(w[0]) as u8,
                bend: w[1],
            }
        }
        pub fn to_words(&self) -> [u32; 2] {
            [w0(self.group, status::PITCH_BEND, self.channel, 0, 0), self.bend]
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct PerNotePitchBend {
        pub group: u8,
        pub channel: u8,
        pub note: u8,
        pub bend: u32,
    }

    impl PerNotePitchBend {
        pub fn from_words(w: [u32; 2]) -> Self {
            PerNotePitchBend {
                group: get::<24, 4>(w[0]) as u8,
                channel: get::<16, 4>(w[0]) as u8,
                note: get::<8, 7>(w[0]) as u8,
                bend: w[1],
            }
        }
        pub fn to_words(&self) -> [u32; 2] {
            [w0(self.group, status::PITCH_BEND_PER_NOTE, self.channel, self.note & 0x7F, 0), self.bend]
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct PerNoteManagement {
        pub group: u8,
        pub channel: u8,
        pub note: u8,
        /// Detach per-note controllers from the previously received note(s) of this number.
        pub detach: bool,
        /// Reset (set) per-note controllers to their default values.
        pub reset: bool,
    }

    impl PerNoteManagement {
        pub fn from_words(w: [u32; 2]) -> Self {
            PerNoteManagement {
                group: get::<24, 4>(w[0]) as u8,
                channel: get::<16, 4>(w[0]) as u8,
                note: get::<8, 7>(w[0]) as u8,
                detach: get::<1, 1>(w[0]) != 0,
                reset: get::<0, 1>(w[0]) != 0,
            }
        }
        pub fn to_words(&self) -> [u32; 2] {
            let flags = ((self.detach as u8) << 1) | self.reset as u8;
            [w0(self.group, status::PER_NOTE_MANAGE, self.channel, self.note & 0x7F, flags), 0]
        }
    }
}

/// 128-bit data messages: 8-bit system exclusive and mixed data sets (message type 0x5).
pub mod data128 {
    use super::*;

    pub const SYSEX8_IN_1: u32 = 0x0;
    pub const SYSEX8_START: u32 = 0x1;
    pub const SYSEX8_CONTINUE: u32 = 0x2;
    pub const SYSEX8_END: u32 = 0x3;
    pub const MDS_HEADER: u32 = 0x8;
    pub const MDS_PAYLOAD: u32 = 0x9;

    /// One packet of an 8-bit system exclusive message: a stream id plus up to 13 data bytes.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct Sysex8Packet {
        pub group: u8,
        pub stream_id: u8,
        pub data: [u8; 13],
        pub count: u8,
    }

    impl Default for Sysex8Packet {
        fn default() -> Self {
            Sysex8Packet { group: 0, stream_id: 0, data: [0; 13], count: 0 }
        }
    }

    impl Sysex8Packet {
        pub fn bytes(&self) -> &[u8] {
            &self.data[..self.count.min(13) as usize]
        }

        /// Decodes a packet and its position status. The wire byte count includes the stream
        /// id, so `count` here is one less than the nibble on the wire.
        pub fn from_words(w: [u32; 4]) -> (u32, Self) {
            let status = get::<20, 4>(w[0]);
            let count = (get::<16, 4>(w[0]) as u8).saturating_sub(1).min(13);
            let mut data = [0u8; 13];
            data[0] = get::<0, 8>(w[0]) as u8;
            for (i, byte) in data[1..].iter_mut().enumerate() {
                let word = w[1 + i / 4];
                *byte = (word >> (24 - 8 * (i % 4))) as u8;
            }
            (
                status,
                Sysex8Packet {
                    group: get::<24, 4>(w[0]) as u8,
                    stream_id: get::<8, 8>(w[0]) as u8,
                    data,
                    count,
                },
            )
        }

        pub fn to_words(&self, status: u32) -> [u32; 4] {
            let count = self.count.min(13);
            let mut w = [0u32; 4];
            w[0] = mt_group(0x5, self.group)
                | (status << 20)
                | (((count + 1) as u32) << 16)
                | ((self.stream_id as u32) << 8)
                | self.data[0] as u32;
            for (i, byte) in self.data[1..].iter().enumerate() {
                w[1 + i / 4] |= (*byte as u32) << (24 - 8 * (i % 4));
            }
            w
        }
    }

    /// Announces a mixed data set chunk: payload sizing plus the destination identifiers.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct MdsHeader {
        pub group: u8,
        pub mds_id: u8,
        pub bytes_in_chunk: u16,
        pub chunks_in_set: u16,
        pub chunk_num: u16,
        pub manufacturer_id: u16,
        pub device_id: u16,
        pub sub_id_1: u16,
        pub sub_id_2: u16,
    }

    impl MdsHeader {
        pub fn from_words(w: [u32; 4]) -> Self {
            MdsHeader {
                group: get::<24, 4>(w[0]) as u8,
                mds_id: get::<16, 4>(w[0]) as u8,
                bytes_in_chunk: (w[0] & 0xFFFF) as u16,
                chunks_in_set: (w[1] >> 16) as u16,
                chunk_num: (w[1] & 0xFFFF) as u16,
                manufacturer_id: (w[2] >> 16) as u16,
                device_id: (w[2] & 0xFFFF) as u16,
                sub_id_1: (w[3] >> 16) as u16,
                sub_id_2: (w[3] & 0xFFFF) as u16,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [
                mt_group(0x5, self.group)
                    | (MDS_HEADER << 20)
                    | (((self.mds_id & 0xF) as u32) << 16)
                    | self.bytes_in_chunk as u32,
                ((self.chunks_in_set as u32) << 16) | self.chunk_num as u32,
                ((self.manufacturer_id as u32) << 16) | self.device_id as u32,
                ((self.sub_id_1 as u32) << 16) | self.sub_id_2 as u32,
            ]
        }
    }

    /// Fourteen bytes of mixed data set payload.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct MdsPayload {
        pub group: u8,
        pub mds_id: u8,
        pub data: [u8; 14],
    }

    impl Default for MdsPayload {
        fn default() -> Self {
            MdsPayload { group: 0, mds_id: 0, data: [0; 14] }
        }
    }

    impl MdsPayload {
        pub fn from_words(w: [u32; 4]) -> Self {
            let mut data = [0u8; 14];
            data[0] = (w[0] >> 8) as u8;
            data[1] = w[0] as u8;
            for (i, byte) in data[2..].iter_mut().enumerate() {
                *byte = (w[1 + i / 4] >> (24 - 8 * (i % 4))) as u8;
            }
            MdsPayload {
                group: get::<24, 4>(w[0]) as u8,
                mds_id: get::<16, 4>(w[0]) as u8,
                data,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            let mut w = [0u32; 4];
            w[0] = mt_group(0x5, self.group)
                | (MDS_PAYLOAD << 20)
                | (((self.mds_id & 0xF) as u32) << 16)
                | ((self.data[0] as u32) << 8)
                | self.data[1] as u32;
            for (i, byte) in self.data[2..].iter().enumerate() {
                w[1 + i / 4] |= (*byte as u32) << (24 - 8 * (i % 4));
            }
            w
        }
    }
}

/// Flex data messages (message type 0xD): tempo, signatures, chords and text events.
pub mod flex {
    use super::*;

    pub const BANK_SETUP: u8 = 0x00;
    pub const BANK_PERFORMANCE: u8 = 0x01;
    pub const BANK_LYRIC: u8 = 0x02;

    pub const SETUP_TEMPO: u8 = 0x00;
    pub const SETUP_TIME_SIGNATURE: u8 = 0x01;
    pub const SETUP_METRONOME: u8 = 0x02;
    pub const SETUP_KEY_SIGNATURE: u8 = 0x05;
    pub const SETUP_CHORD_NAME: u8 = 0x06;

    /// The flex-data addressing fields shared by every message in the family.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct Address {
        pub group: u8,
        pub form: u8,
        /// 0 addresses the channel field, 1 the whole group.
        pub addrs: u8,
        pub channel: u8,
    }

    impl Address {
        fn from_word(w: u32) -> Self {
            Address {
                group: get::<24, 4>(w) as u8,
                form: get::<22, 2>(w) as u8,
                addrs: get::<20, 2>(w) as u8,
                channel: get::<16, 4>(w) as u8,
            }
        }
        fn to_word(self, status_bank: u8, stat: u8) -> u32 {
            mt_group(0xD, self.group)
                | (((self.form & 0x3) as u32) << 22)
                | (((self.addrs & 0x3) as u32) << 20)
                | (((self.channel & 0xF) as u32) << 16)
                | ((status_bank as u32) << 8)
                | stat as u32
        }
    }

    /// Tempo as the number of 10ns units per quarter note.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct SetTempo {
        pub address: Address,
        pub ten_ns_pqn: u32,
    }

    impl SetTempo {
        pub fn from_words(w: [u32; 4]) -> Self {
            SetTempo { address: Address::from_word(w[0]), ten_ns_pqn: w[1] }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [self.address.to_word(BANK_SETUP, SETUP_TEMPO), self.ten_ns_pqn, 0, 0]
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct SetTimeSignature {
        pub address: Address,
        pub numerator: u8,
        /// Negative power of two, e.g. 2 for quarter notes.
        pub denominator: u8,
        pub number_of_32nds: u8,
    }

    impl SetTimeSignature {
        pub fn from_words(w: [u32; 4]) -> Self {
            SetTimeSignature {
                address: Address::from_word(w[0]),
                numerator: (w[1] >> 24) as u8,
                denominator: (w[1] >> 16) as u8,
                number_of_32nds: (w[1] >> 8) as u8,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [
                self.address.to_word(BANK_SETUP, SETUP_TIME_SIGNATURE),
                ((self.numerator as u32) << 24)
                    | ((self.denominator as u32) << 16)
                    | ((self.number_of_32nds as u32) << 8),
                0,
                0,
            ]
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct SetMetronome {
        pub address: Address,
        pub clocks_per_primary_click: u8,
        pub bar_accents: [u8; 3],
        pub subdivision_clicks: [u8; 2],
    }

    impl SetMetronome {
        pub fn from_words(w: [u32; 4]) -> Self {
            SetMetronome {
                address: Address::from_word(w[0]),
                clocks_per_primary_click: (w[1] >> 24) as u8,
                bar_accents: [(w[1] >> 16) as u8, (w[1] >> 8) as u8, w[1] as u8],
                subdivision_clicks: [(w[2] >> 24) as u8, (w[2] >> 16) as u8],
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [
                self.address.to_word(BANK_SETUP, SETUP_METRONOME),
                ((self.clocks_per_primary_click as u32) << 24)
                    | ((self.bar_accents[0] as u32) << 16)
                    | ((self.bar_accents[1] as u32) << 8)
                    | self.bar_accents[2] as u32,
                ((self.subdivision_clicks[0] as u32) << 24) | ((self.subdivision_clicks[1] as u32) << 16),
                0,
            ]
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct SetKeySignature {
        pub address: Address,
        /// Sharps (positive) or flats (negative), in [-8, 7].
        pub sharps_flats: i8,
        pub tonic_note: u8,
    }

    impl SetKeySignature {
        pub fn from_words(w: [u32; 4]) -> Self {
            SetKeySignature {
                address: Address::from_word(w[0]),
                sharps_flats: get_signed::<28, 4>(w[1]) as i8,
                tonic_note: get::<24, 4>(w[1]) as u8,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            let mut w1 = set_signed::<28, 4>(0, self.sharps_flats as i32);
            w1 = set::<24, 4>(w1, (self.tonic_note & 0xF) as u32);
            [self.address.to_word(BANK_SETUP, SETUP_KEY_SIGNATURE), w1, 0, 0]
        }
    }

    /// A chord alteration: a kind nibble and the scale degree it applies to.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct Alteration {
        pub kind: u8,
        pub degree: u8,
    }

    impl Alteration {
        fn from_byte(b: u32) -> Self {
            Alteration { kind: ((b >> 4) & 0xF) as u8, degree: (b & 0xF) as u8 }
        }
        fn to_byte(self) -> u32 {
            (((self.kind & 0xF) as u32) << 4) | (self.degree & 0xF) as u32
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct SetChordName {
        pub address: Address,
        pub tonic_sharps_flats: i8,
        pub tonic: u8,
        pub chord_type: u8,
        pub alterations: [Alteration; 4],
        pub bass_sharps_flats: i8,
        pub bass_note: u8,
        pub bass_chord_type: u8,
        pub bass_alterations: [Alteration; 2],
    }

    impl SetChordName {
        pub fn from_words(w: [u32; 4]) -> Self {
            SetChordName {
                address: Address::from_word(w[0]),
                tonic_sharps_flats: get_signed::<28, 4>(w[1]) as i8,
                tonic: get::<24, 4>(w[1]) as u8,
                chord_type: get::<16, 8>(w[1]) as u8,
                alterations: [
                    Alteration::from_byte(w[1] >> 8),
                    Alteration::from_byte(w[1]),
                    Alteration::from_byte(w[2] >> 24),
                    Alteration::from_byte(w[2] >> 16),
                ],
                bass_sharps_flats: get_signed::<28, 4>(w[3]) as i8,
                bass_note: get::<24, 4>(w[3]) as u8,
                bass_chord_type: get::<16, 8>(w[3]) as u8,
                bass_alterations: [Alteration::from_byte(w[3] >> 8), Alteration::from_byte(w[3])],
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            let mut w1 = set_signed::<28, 4>(0, self.tonic_sharps_flats as i32);
            w1 = set::<24, 4>(w1, (self.tonic & 0xF) as u32);
            w1 = set::<16, 8>(w1, self.chord_type as u32);
            w1 |= (self.alterations[0].to_byte() << 8) | self.alterations[1].to_byte();
            let w2 = (self.alterations[2].to_byte() << 24) | (self.alterations[3].to_byte() << 16);
            let mut w3 = set_signed::<28, 4>(0, self.bass_sharps_flats as i32);
            w3 = set::<24, 4>(w3, (self.bass_note & 0xF) as u32);
            w3 = set::<16, 8>(w3, self.bass_chord_type as u32);
            w3 |= (self.bass_alterations[0].to_byte() << 8) | self.bass_alterations[1].to_byte();
            [self.address.to_word(BANK_SETUP, SETUP_CHORD_NAME), w1, w2, w3]
        }
    }

    /// A performance or lyric text event: twelve bytes of UTF-8 per packet, NUL padded.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct Text {
        pub address: Address,
        pub status_bank: u8,
        pub status: u8,
        pub data: [u8; 12],
        pub count: u8,
    }

    impl Default for Text {
        fn default() -> Self {
            Text { address: Address::default(), status_bank: 0, status: 0, data: [0; 12], count: 0 }
        }
    }

    impl Text {
        pub fn bytes(&self) -> &[u8] {
            &self.data[..self.count.min(12) as usize]
        }

        pub fn from_words(w: [u32; 4]) -> Self {
            let mut data = [0u8; 12];
            let mut count = 0u8;
            for word in &w[1..] {
                for shift in [24u32, 16, 8, 0] {
                    let c = (word >> shift) as u8;
                    if c != 0 {
                        data[count as usize] = c;
                        count += 1;
                    }
                }
            }
            Text {
                address: Address::from_word(w[0]),
                status_bank: get::<8, 8>(w[0]) as u8,
                status: get::<0, 8>(w[0]) as u8,
                data,
                count,
            }
        }

        pub fn to_words(&self) -> [u32; 4] {
            let mut w = [self.address.to_word(self.status_bank, self.status), 0, 0, 0];
            for (i, byte) in self.data[..self.count.min(12) as usize].iter().enumerate() {
                w[1 + i / 4] |= (*byte as u32) << (24 - 8 * (i % 4));
            }
            w
        }
    }
}

/// UMP stream messages (message type 0xF): endpoint and function block discovery.
pub mod stream {
    use super::*;

    pub const ENDPOINT_DISCOVERY: u32 = 0x00;
    pub const ENDPOINT_INFO_NOTIFICATION: u32 = 0x01;
    pub const DEVICE_IDENTITY_NOTIFICATION: u32 = 0x02;
    pub const ENDPOINT_NAME_NOTIFICATION: u32 = 0x03;
    pub const PRODUCT_INSTANCE_ID_NOTIFICATION: u32 = 0x04;
    pub const JR_CONFIGURATION_REQUEST: u32 = 0x05;
    pub const JR_CONFIGURATION_NOTIFICATION: u32 = 0x06;
    pub const FUNCTION_BLOCK_DISCOVERY: u32 = 0x10;
    pub const FUNCTION_BLOCK_INFO_NOTIFICATION: u32 = 0x11;
    pub const FUNCTION_BLOCK_NAME_NOTIFICATION: u32 = 0x12;
    pub const START_OF_CLIP: u32 = 0x20;
    pub const END_OF_CLIP: u32 = 0x21;

    #[inline(always)]
    fn w0(format: u8, stat: u32) -> u32 {
        (0xFu32 << 28) | (((format & 0x3) as u32) << 26) | ((stat & 0x3FF) << 16)
    }

    /// Reads the 10-bit status from a stream message's first word.
    #[inline(always)]
    pub fn status_of_word(w: u32) -> u32 {
        get::<16, 10>(w)
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct EndpointDiscovery {
        pub version_major: u8,
        pub version_minor: u8,
        pub filter: u8,
    }

    impl EndpointDiscovery {
        pub fn from_words(w: [u32; 4]) -> Self {
            EndpointDiscovery {
                version_major: get::<8, 8>(w[0]) as u8,
                version_minor: get::<0, 8>(w[0]) as u8,
                filter: get::<0, 8>(w[1]) as u8,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [
                w0(0, ENDPOINT_DISCOVERY) | ((self.version_major as u32) << 8) | self.version_minor as u32,
                self.filter as u32,
                0,
                0,
            ]
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct EndpointInfoNotification {
        pub version_major: u8,
        pub version_minor: u8,
        pub static_function_blocks: bool,
        pub num_function_blocks: u8,
        pub midi2_capable: bool,
        pub midi1_capable: bool,
        pub receive_jr: bool,
        pub transmit_jr: bool,
    }

    impl EndpointInfoNotification {
        pub fn from_words(w: [u32; 4]) -> Self {
            EndpointInfoNotification {
                version_major: get::<8, 8>(w[0]) as u8,
                version_minor: get::<0, 8>(w[0]) as u8,
                static_function_blocks: get::<31, 1>(w[1]) != 0,
                num_function_blocks: get::<24, 7>(w[1]) as u8,
                midi2_capable: get::<9, 1>(w[1]) != 0,
                midi1_capable: get::<8, 1>(w[1]) != 0,
                receive_jr: get::<1, 1>(w[1]) != 0,
                transmit_jr: get::<0, 1>(w[1]) != 0,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [
                w0(0, ENDPOINT_INFO_NOTIFICATION)
                    | ((self.version_major as u32) << 8)
                    | self.version_minor as u32,
                ((self.static_function_blocks as u32) << 31)
                    | (((self.num_function_blocks & 0x7F) as u32) << 24)
                    | ((self.midi2_capable as u32) << 9)
                    | ((self.midi1_capable as u32) << 8)
                    | ((self.receive_jr as u32) << 1)
                    | self.transmit_jr as u32,
                0,
                0,
            ]
        }
    }

    /// The endpoint's identity in MIDI 1.0 device-inquiry form.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct DeviceIdentityNotification {
        pub manufacturer: [u8; 3],
        pub family: u16,
        pub model: u16,
        pub software_revision: [u8; 4],
    }

    impl DeviceIdentityNotification {
        pub fn from_words(w: [u32; 4]) -> Self {
            DeviceIdentityNotification {
                manufacturer: [
                    get::<16, 7>(w[1]) as u8,
                    get::<8, 7>(w[1]) as u8,
                    get::<0, 7>(w[1]) as u8,
                ],
                family: (get::<24, 7>(w[2]) | (get::<16, 7>(w[2]) << 7)) as u16,
                model: (get::<8, 7>(w[2]) | (get::<0, 7>(w[2]) << 7)) as u16,
                software_revision: [
                    get::<24, 7>(w[3]) as u8,
                    get::<16, 7>(w[3]) as u8,
                    get::<8, 7>(w[3]) as u8,
                    get::<0, 7>(w[3]) as u8,
                ],
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [
                w0(0, DEVICE_IDENTITY_NOTIFICATION),
                (((self.manufacturer[0] & 0x7F) as u32) << 16)
                    | (((self.manufacturer[1] & 0x7F) as u32) << 8)
                    | (self.manufacturer[2] & 0x7F) as u32,
                (((self.family & 0x7F) as u32) << 24)
                    | ((((self.family >> 7) & 0x7F) as u32) << 16)
                    | (((self.model & 0x7F) as u32) << 8)
                    | ((self.model >> 7) & 0x7F) as u32,
                (((self.software_revision[0] & 0x7F) as u32) << 24)
                    | (((self.software_revision[1] & 0x7F) as u32) << 16)
                    | (((self.software_revision[2] & 0x7F) as u32) << 8)
                    | (self.software_revision[3] & 0x7F) as u32,
            ]
        }
    }

    /// Fourteen UTF-8 bytes of endpoint name per packet; multi-packet names use the format
    /// field (0 complete, 1 start, 2 continue, 3 end).
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct EndpointNameNotification {
        pub format: u8,
        pub data: [u8; 14],
        pub count: u8,
    }

    impl Default for EndpointNameNotification {
        fn default() -> Self {
            EndpointNameNotification { format: 0, data: [0; 14], count: 0 }
        }
    }

    fn gather_text14(w: [u32; 4]) -> ([u8; 14], u8) {
        let mut data = [0u8; 14];
        let mut count = 0u8;
        for c in [(w[0] >> 8) as u8, w[0] as u8] {
            if c != 0 {
                data[count as usize] = c;
                count += 1;
            }
        }
        for word in &w[1..] {
            for shift in [24u32, 16, 8, 0] {
                let c = (word >> shift) as u8;
                if c != 0 {
                    data[count as usize] = c;
                    count += 1;
                }
            }
        }
        (data, count)
    }

    fn scatter_text14(stat: u32, format: u8, data: &[u8]) -> [u32; 4] {
        let mut w = [w0(format, stat), 0, 0, 0];
        for (i, byte) in data.iter().take(14).enumerate() {
            if i < 2 {
                w[0] |= (*byte as u32) << (8 - 8 * i);
            } else {
                let i = i - 2;
                w[1 + i / 4] |= (*byte as u32) << (24 - 8 * (i % 4));
            }
        }
        w
    }

    impl EndpointNameNotification {
        pub fn bytes(&self) -> &[u8] {
            &self.data[..self.count.min(14) as usize]
        }
        pub fn from_words(w: [u32; 4]) -> Self {
            let (data, count) = gather_text14(w);
            EndpointNameNotification { format: get::<26, 2>(w[0]) as u8, data, count }
        }
        pub fn to_words(&self) -> [u32; 4] {
            scatter_text14(ENDPOINT_NAME_NOTIFICATION, self.format, self.bytes())
        }
    }

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct ProductInstanceIdNotification {
        pub format: u8,
        pub data: [u8; 14],
        pub count: u8,
    }

    impl Default for ProductInstanceIdNotification {
        fn default() -> Self {
            ProductInstanceIdNotification { format: 0, data: [0; 14], count: 0 }
        }
    }

    impl ProductInstanceIdNotification {
        pub fn bytes(&self) -> &[u8] {
            &self.data[..self.count.min(14) as usize]
        }
        pub fn from_words(w: [u32; 4]) -> Self {
            let (data, count) = gather_text14(w);
            ProductInstanceIdNotification { format: get::<26, 2>(w[0]) as u8, data, count }
        }
        pub fn to_words(&self) -> [u32; 4] {
            scatter_text14(PRODUCT_INSTANCE_ID_NOTIFICATION, self.format, self.bytes())
        }
    }

    macro_rules! jr_configuration {
        ($name:ident, $status:expr) => {
            #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
            #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
            pub struct $name {
                /// 0x01 selects MIDI 1.0 protocol, 0x02 MIDI 2.0 protocol.
                pub protocol: u8,
                pub receive_jr: bool,
                pub transmit_jr: bool,
            }

            impl $name {
                pub fn from_words(w: [u32; 4]) -> Self {
                    $name {
                        protocol: get::<8, 8>(w[0]) as u8,
                        receive_jr: get::<1, 1>(w[0]) != 0,
                        transmit_jr: get::<0, 1>(w[0]) != 0,
                    }
                }
                pub fn to_words(&self) -> [u32; 4] {
                    [
                        w0(0, $status)
                            | ((self.protocol as u32) << 8)
                            | ((self.receive_jr as u32) << 1)
                            | self.transmit_jr as u32,
                        0,
                        0,
                        0,
                    ]
                }
            }
        };
    }

    jr_configuration!(JrConfigurationRequest, JR_CONFIGURATION_REQUEST);
    jr_configuration!(JrConfigurationNotification, JR_CONFIGURATION_NOTIFICATION);

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct FunctionBlockDiscovery {
        pub block_num: u8,
        pub filter: u8,
    }

    impl FunctionBlockDiscovery {
        pub fn from_words(w: [u32; 4]) -> Self {
            FunctionBlockDiscovery {
                block_num: get::<8, 8>(w[0]) as u8,
                filter: get::<0, 8>(w[0]) as u8,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [
                w0(0, FUNCTION_BLOCK_DISCOVERY) | ((self.block_num as u32) << 8) | self.filter as u32,
                0,
                0,
                0,
            ]
        }
    }

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct FunctionBlockInfoNotification {
        pub active: bool,
        pub block_num: u8,
        pub ui_hint: u8,
        /// 0 not MIDI 1.0, 1 unrestricted bandwidth, 2 restricted to 31.25kbps.
        pub midi1: u8,
        pub direction: u8,
        pub first_group: u8,
        pub num_groups: u8,
        pub midi_ci_version: u8,
        pub max_sysex8_streams: u8,
    }

    impl FunctionBlockInfoNotification {
        pub fn from_words(w: [u32; 4]) -> Self {
            FunctionBlockInfoNotification {
                active: get::<15, 1>(w[0]) != 0,
                block_num: get::<8, 7>(w[0]) as u8,
                ui_hint: get::<4, 2>(w[0]) as u8,
                midi1: get::<2, 2>(w[0]) as u8,
                direction: get::<0, 2>(w[0]) as u8,
                first_group: get::<24, 8>(w[1]) as u8,
                num_groups: get::<16, 8>(w[1]) as u8,
                midi_ci_version: get::<8, 8>(w[1]) as u8,
                max_sysex8_streams: get::<0, 8>(w[1]) as u8,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            [
                w0(0, FUNCTION_BLOCK_INFO_NOTIFICATION)
                    | ((self.active as u32) << 15)
                    | (((self.block_num & 0x7F) as u32) << 8)
                    | (((self.ui_hint & 0x3) as u32) << 4)
                    | (((self.midi1 & 0x3) as u32) << 2)
                    | (self.direction & 0x3) as u32,
                ((self.first_group as u32) << 24)
                    | ((self.num_groups as u32) << 16)
                    | ((self.midi_ci_version as u32) << 8)
                    | self.max_sysex8_streams as u32,
                0,
                0,
            ]
        }
    }

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    pub struct FunctionBlockNameNotification {
        pub format: u8,
        pub block_num: u8,
        pub data: [u8; 13],
        pub count: u8,
    }

    impl Default for FunctionBlockNameNotification {
        fn default() -> Self {
            FunctionBlockNameNotification { format: 0, block_num: 0, data: [0; 13], count: 0 }
        }
    }

    impl FunctionBlockNameNotification {
        pub fn bytes(&self) -> &[u8] {
            &self.data[..self.count.min(13) as usize]
        }
        pub fn from_words(w: [u32; 4]) -> Self {
            let mut data = [0u8; 13];
            let mut count = 0u8;
            let c = w[0] as u8;
            if c != 0 {
                data[0] = c;
                count = 1;
            }
            for word in &w[1..] {
                for shift in [24u32, 16, 8, 0] {
                    let c = (word >> shift) as u8;
                    if c != 0 {
                        data[count as usize] = c;
                        count += 1;
                    }
                }
            }
            FunctionBlockNameNotification {
                format: get::<26, 2>(w[0]) as u8,
                block_num: get::<8, 8>(w[0]) as u8,
                data,
                count,
            }
        }
        pub fn to_words(&self) -> [u32; 4] {
            let mut w = [
                w0(self.format, FUNCTION_BLOCK_NAME_NOTIFICATION) | ((self.block_num as u32) << 8),
                0,
                0,
                0,
            ];
            for (i, byte) in self.bytes().iter().enumerate() {
                if i == 0 {
                    w[0] |= *byte as u32;
                } else {
                    let i = i - 1;
                    w[1 + i / 4] |= (*byte as u32) << (24 - 8 * (i % 4));
                }
            }
            w
        }
    }

    macro_rules! clip_marker {
        ($name:ident, $status:expr) => {
            #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
            #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
            pub struct $name;

            impl $name {
                pub fn from_words(_w: [u32; 4]) -> Self {
                    $name
                }
                pub fn to_words(&self) -> [u32; 4] {
                    [w0(0, $status), 0, 0, 0]
                }
            }
        };
    }

    clip_marker!(StartOfClip, START_OF_CLIP);
    clip_marker!(EndOfClip, END_OF_CLIP);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn m1cvm_note_round_trip() {
        let m = m1cvm::NoteOff { group: 0, channel: 1, note: 0x60, velocity: 0x50 };
        assert_eq!(m.to_word(), 0x20816050);
        assert_eq!(m1cvm::NoteOff::from_word(0x20816050), m);
    }

    #[test]
    fn m1cvm_masks_wide_fields() {
        let m = m1cvm::NoteOn { group: 0x12, channel: 0x34, note: 0xFF, velocity: 0xFF };
        let w = m.to_word();
        assert_eq!(w >> 28, 0x2);
        assert_eq!((w >> 24) & 0xF, 0x2);
        assert_eq!((w >> 16) & 0xFF, 0x94);
        assert_eq!((w >> 8) & 0xFF, 0x7F);
        assert_eq!(w & 0xFF, 0x7F);
    }

    #[test]
    fn m1cvm_pitch_bend_operand_order() {
        // Data LSB sits in byte 2, MSB in byte 3.
        let m = m1cvm::PitchBend { group: 0, channel: 4, bend: 12864 };
        let w = m.to_word();
        assert_eq!((w >> 8) & 0x7F, 12864 & 0x7F);
        assert_eq!(w & 0x7F, 12864 >> 7);
        assert_eq!(m1cvm::PitchBend::from_word(w), m);
    }

    #[test]
    fn system_song_position_round_trip() {
        let m = system::SongPositionPointer { group: 3, position: 0x1234 };
        assert_eq!(system::SongPositionPointer::from_word(m.to_word()), m);
    }

    #[test]
    fn system_timing_clock_word() {
        assert_eq!(system::TimingClock { group: 8 }.to_word(), 0x18F8_0000);
        assert_eq!(system::TimingClock { group: 0 }.to_word(), 0x10F8_0000);
    }

    #[test]
    fn utility_words() {
        assert_eq!(utility::NoOp { group: 0 }.to_word(), 0x0000_0000);
        let clock = utility::JrClock { group: 0, time: 0xDEAD };
        assert_eq!(clock.to_word(), 0x0010_DEAD);
        assert_eq!(utility::JrClock::from_word(clock.to_word()), clock);
    }

    #[test]
    fn m2cvm_note_round_trip() {
        let m = m2cvm::NoteOn {
            group: 1,
            channel: 2,
            note: 0x40,
            velocity: 0xC104,
            attribute_type: 0,
            attribute: 0,
        };
        let w = m.to_words();
        assert_eq!(w[0], 0x4192_4000);
        assert_eq!(w[1], 0xC104_0000);
        assert_eq!(m2cvm::NoteOn::from_words(w), m);
    }

    #[test]
    fn m2cvm_program_change_round_trip() {
        let m = m2cvm::ProgramChange {
            group: 0,
            channel: 6,
            program: 0x41,
            bank_valid: true,
            bank_msb: 1,
            bank_lsb: 10,
        };
        let w = m.to_words();
        assert_eq!(w, [0x40C60001, 0x4100010A]);
        assert_eq!(m2cvm::ProgramChange::from_words(w), m);
    }

    #[test]
    fn m2cvm_registered_controller_round_trip() {
        let m = m2cvm::RegisteredController { group: 0, channel: 6, bank: 0, index: 6, value: 0x1000_0000 };
        let w = m.to_words();
        assert_eq!(w, [0x40260006, 0x10000000]);
        assert_eq!(m2cvm::RegisteredController::from_words(w), m);
    }

    #[test]
    fn sysex7_packet_round_trip() {
        let p = data64::Sysex7Packet { group: 0, data: [0x7E, 0x7F, 0x0D, 0x70, 0x02, 0x4B], count: 6 };
        let w = p.to_words(data64::Sysex7Status::Start);
        assert_eq!(w, [0x30167E7F, 0x0D70024B]);
        let (status, decoded) = data64::Sysex7Packet::from_words(w);
        assert_eq!(status, data64::Sysex7Status::Start as u32);
        assert_eq!(decoded, p);
    }

    #[test]
    fn sysex7_partial_packet() {
        let p = data64::Sysex7Packet { group: 2, data: [1, 2, 3, 0, 0, 0], count: 3 };
        let w = p.to_words(data64::Sysex7Status::End);
        let (status, decoded) = data64::Sysex7Packet::from_words(w);
        assert_eq!(status, 3);
        assert_eq!(decoded.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn sysex8_packet_round_trip() {
        let mut data = [0u8; 13];
        for (i, b) in data.iter_mut().enumerate() {
            *b = 0xF0 | i as u8;
        }
        let p = data128::Sysex8Packet { group: 5, stream_id: 0x2A, data, count: 13 };
        let w = p.to_words(data128::SYSEX8_CONTINUE);
        let (status, decoded) = data128::Sysex8Packet::from_words(w);
        assert_eq!(status, data128::SYSEX8_CONTINUE);
        assert_eq!(decoded, p);
    }

    #[test]
    fn mds_header_round_trip() {
        let h = data128::MdsHeader {
            group: 1,
            mds_id: 7,
            bytes_in_chunk: 512,
            chunks_in_set: 4,
            chunk_num: 2,
            manufacturer_id: 0x1234,
            device_id: 0x0102,
            sub_id_1: 3,
            sub_id_2: 4,
        };
        assert_eq!(data128::MdsHeader::from_words(h.to_words()), h);
    }

    #[test]
    fn flex_tempo_round_trip() {
        let m = flex::SetTempo {
            address: flex::Address { group: 2, form: 0, addrs: 1, channel: 0 },
            ten_ns_pqn: 50_000_000,
        };
        let w = m.to_words();
        assert_eq!(w[0] >> 28, 0xD);
        assert_eq!(w[0] & 0xFFFF, 0x0000);
        assert_eq!(flex::SetTempo::from_words(w), m);
    }

    #[test]
    fn flex_key_signature_signed_field() {
        for sf in -8i8..=7 {
            let m = flex::SetKeySignature {
                address: flex::Address::default(),
                sharps_flats: sf,
                tonic_note: 3,
            };
            assert_eq!(flex::SetKeySignature::from_words(m.to_words()), m);
        }
    }

    #[test]
    fn flex_chord_round_trip() {
        let m = flex::SetChordName {
            address: flex::Address { group: 0, form: 0, addrs: 0, channel: 9 },
            tonic_sharps_flats: -1,
            tonic: 0x3,
            chord_type: 0x0D,
            alterations: [
                flex::Alteration { kind: 1, degree: 5 },
                flex::Alteration { kind: 2, degree: 7 },
                flex::Alteration::default(),
                flex::Alteration::default(),
            ],
            bass_sharps_flats: -8,
            bass_note: 0,
            bass_chord_type: 1,
            bass_alterations: [flex::Alteration::default(), flex::Alteration::default()],
        };
        assert_eq!(flex::SetChordName::from_words(m.to_words()), m);
    }

    #[test]
    fn flex_text_round_trip() {
        let mut m = flex::Text {
            address: flex::Address { group: 1, form: 0, addrs: 0, channel: 2 },
            status_bank: flex::BANK_LYRIC,
            status: 1,
            ..Default::default()
        };
        for (i, b) in b"Hello".iter().enumerate() {
            m.data[i] = *b;
        }
        m.count = 5;
        let decoded = flex::Text::from_words(m.to_words());
        assert_eq!(decoded.bytes(), b"Hello");
        assert_eq!(decoded.status_bank, flex::BANK_LYRIC);
    }

    #[test]
    fn stream_endpoint_info_round_trip() {
        let m = stream::EndpointInfoNotification {
            version_major: 1,
            version_minor: 1,
            static_function_blocks: true,
            num_function_blocks: 5,
            midi2_capable: true,
            midi1_capable: false,
            receive_jr: false,
            transmit_jr: true,
        };
        let w = m.to_words();
        assert_eq!(stream::status_of_word(w[0]), stream::ENDPOINT_INFO_NOTIFICATION);
        assert_eq!(stream::EndpointInfoNotification::from_words(w), m);
    }

    #[test]
    fn stream_function_block_info_round_trip() {
        let m = stream::FunctionBlockInfoNotification {
            active: true,
            block_num: 3,
            ui_hint: 2,
            midi1: 0,
            direction: 3,
            first_group: 0,
            num_groups: 4,
            midi_ci_version: 2,
            max_sysex8_streams: 1,
        };
        assert_eq!(stream::FunctionBlockInfoNotification::from_words(m.to_words()), m);
    }

    #[test]
    fn stream_name_round_trip() {
        let mut m = stream::EndpointNameNotification::default();
        for (i, b) in b"Synth".iter().enumerate() {
            m.data[i] = *b;
        }
        m.count = 5;
        let decoded = stream::EndpointNameNotification::from_words(m.to_words());
        assert_eq!(decoded.bytes(), b"Synth");
    }

    #[test]
    fn stream_function_block_name_round_trip() {
        let mut m = stream::FunctionBlockNameNotification { block_num: 2, ..Default::default() };
        for (i, b) in b"Main".iter().enumerate() {
            m.data[i] = *b;
        }
        m.count = 4;
        let decoded = stream::FunctionBlockNameNotification::from_words(m.to_words());
        assert_eq!(decoded.block_num, 2);
        assert_eq!(decoded.bytes(), b"Main");
    }

    #[test]
    fn device_identity_round_trip() {
        let m = stream::DeviceIdentityNotification {
            manufacturer: [0x12, 0x23, 0x34],
            family: 0x3CE7,
            model: 0x2EEB,
            software_revision: [0x4E, 0x3C, 0x2A, 0x18],
        };
        assert_eq!(stream::DeviceIdentityNotification::from_words(m.to_words()), m);
    }
}
