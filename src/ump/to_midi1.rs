//! Downgrades a UMP stream from MIDI 2.0 protocol to MIDI 1.0 protocol.
//!
//! Protocol choice only affects channel voice messages: MIDI 2.0 CVM packets are rewritten as
//! MIDI 1.0 CVM packets with rescaled operands and every other message type passes through
//! verbatim.

use crate::bitfield::get;
use crate::fifo::Fifo;
use crate::scale::scale_down;
use crate::ump::{status, MessageType};

/// A single completed input message fans out to at most four words (an RPN/NRPN rewritten as
/// its four-CC sequence, or a four-word message passed through).
const OUTPUT_CAPACITY: usize = 4;
static_assertions::const_assert!(OUTPUT_CAPACITY.is_power_of_two());

#[derive(Default)]
pub struct UmpToMidi1 {
    message: [u32; 4],
    pos: usize,
    output: Fifo<u32, OUTPUT_CAPACITY>,
}

impl UmpToMidi1 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty(&self) -> bool {
        self.output.empty()
    }

    /// Pops the next translated UMP word.
    ///
    /// The output must not be empty.
    pub fn pop(&mut self) -> u32 {
        debug_assert!(!self.empty());
        self.output.pop_front()
    }

    /// Drops any partial message and buffered output.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feeds one word of a MIDI 2.0 protocol UMP stream.
    pub fn push(&mut self, word: u32) {
        self.message[self.pos] = word;
        self.pos += 1;
        let mt = MessageType::of_word(self.message[0]);
        if self.pos < mt.word_count() {
            return;
        }
        self.pos = 0;
        if mt == MessageType::M2Cvm {
            self.downgrade();
        } else {
            for i in 0..mt.word_count() {
                self.emit(self.message[i]);
            }
        }
    }

    fn downgrade(&mut self) {
        let [w0, w1, ..] = self.message;
        let group = get::<24, 4>(w0) as u8;
        let channel = get::<16, 4>(w0) as u8;
        let stat = (get::<20, 4>(w0) << 4) as u8;
        let b2 = get::<8, 8>(w0) as u8;
        match stat {
            status::NOTE_OFF | status::NOTE_ON => {
                let mut velocity = scale_down(w1 >> 16, 16, 7) as u8;
                // A MIDI 2.0 note-on whose wide velocity rounds down to zero must stay a
                // note-on after conversion.
                if stat == status::NOTE_ON && velocity == 0 {
                    velocity = 1;
                }
                self.emit(pack_m1(group, stat | channel, b2, velocity));
            }
            status::POLY_PRESSURE | status::CONTROL_CHANGE => {
                self.emit(pack_m1(group, stat | channel, b2, scale_down(w1, 32, 7) as u8));
            }
            status::CHANNEL_PRESSURE => {
                self.emit(pack_m1(group, stat | channel, scale_down(w1, 32, 7) as u8, 0));
            }
            status::RPN | status::NRPN => {
                let (param_msb_cc, param_lsb_cc) =
                    if stat == status::RPN { (101, 100) } else { (99, 98) };
                let narrow = scale_down(w1, 32, 14) as u16;
                let cc = status::CONTROL_CHANGE | channel;
                let bank = get::<8, 7>(w0) as u8;
                let index = get::<0, 7>(w0) as u8;
                self.emit(pack_m1(group, cc, param_msb_cc, bank));
                self.emit(pack_m1(group, cc, param_lsb_cc, index));
                self.emit(pack_m1(group, cc, 6, (narrow >> 7) as u8));
                self.emit(pack_m1(group, cc, 38, (narrow & 0x7F) as u8));
            }
            status::PROGRAM_CHANGE => {
                let program = get::<24, 7>(w1) as u8;
                if get::<0, 1>(w0) != 0 {
                    let cc = status::CONTROL_CHANGE | channel;
                    self.emit(pack_m1(group, cc, 0, get::<8, 7>(w1) as u8));
                    self.emit(pack_m1(group, cc, 32, get::<0, 7>(w1) as u8));
                }
                self.emit(pack_m1(group, status::PROGRAM_CHANGE | channel, program, 0));
            }
            status::PITCH_BEND => {
                self.emit(pack_m1(
                    group,
                    status::PITCH_BEND | channel,
                    get::<18, 7>(w1) as u8,
                    get::<25, 7>(w1) as u8,
                ));
            }
            _ => {
                // Per-note and relative controller messages have no MIDI 1.0 equivalent.
                log::trace!("dropping m2cvm status {stat:#04x} with no MIDI 1.0 form");
            }
        }
    }

    fn emit(&mut self, word: u32) {
        let ok = self.output.push_back(word);
        debug_assert!(ok, "UMP output overflow; drain between pushes");
    }
}

fn pack_m1(group: u8, status_channel: u8, b2: u8, b3: u8) -> u32 {
    ((0x20 | group as u32) << 24)
        | ((status_channel as u32) << 16)
        | (((b2 & 0x7F) as u32) << 8)
        | (b3 & 0x7F) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::scale_up;

    fn translate(words: &[u32]) -> std::vec::Vec<u32> {
        let mut t = UmpToMidi1::new();
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
    fn m1cvm_passes_through() {
        let words = [0x20816050, 0x20817070];
        assert_eq!(translate(&words), words);
    }

    #[test]
    fn system_passes_through() {
        assert_eq!(translate(&[0x10F80000]), [0x10F80000]);
    }

    #[test]
    fn sysex_passes_through() {
        let words = [
            0x30167E7F, 0x0D70024B, 0x3026607A, 0x737F7F7F, 0x30267F7D, 0x00000000, 0x30260100,
            0x00000300, 0x30360000, 0x10000000,
        ];
        assert_eq!(translate(&words), words);
    }

    #[test]
    fn note_on_velocity_is_rescaled() {
        assert_eq!(translate(&[0x40904000, 0xC1040000]), [0x20904060]);
    }

    #[test]
    fn zero_velocity_note_on_clamps_to_one() {
        assert_eq!(translate(&[0x40913C00, 0x00010000]), [0x20913C01]);
    }

    #[test]
    fn zero_velocity_note_off_stays_zero() {
        assert_eq!(translate(&[0x40813C00, 0x00000000]), [0x20813C00]);
    }

    #[test]
    fn control_change_is_rescaled() {
        let wide = scale_up(0x42, 7, 32);
        assert_eq!(translate(&[0x40B20700, wide]), [0x20B20742]);
    }

    #[test]
    fn pitch_bend_is_rescaled_to_14_bits() {
        // The 32-bit centre maps to the 14-bit centre, LSB first.
        assert_eq!(translate(&[0x40E30000, 0x8000_0000]), [0x20E30040]);
    }

    #[test]
    fn rpn_expands_to_four_control_changes() {
        let out = translate(&[0x40260006, 0x10000000]);
        assert_eq!(
            out,
            [0x20B66500, 0x20B66406, 0x20B60608, 0x20B62600]
        );
    }

    #[test]
    fn nrpn_expands_to_four_control_changes() {
        let out = translate(&[0x40330244, 0x20000000]);
        assert_eq!(
            out,
            [0x20B36302, 0x20B36244, 0x20B30610, 0x20B32600]
        );
    }

    #[test]
    fn program_change_with_bank_expands() {
        let out = translate(&[0x40C60001, 0x4100010A]);
        assert_eq!(out, [0x20B60001, 0x20B6200A, 0x20C64100]);
    }

    #[test]
    fn per_note_messages_are_dropped() {
        // Per-note pitch bend and per-note management have no MIDI 1.0 form.
        assert_eq!(translate(&[0x40623C00, 0x80000000]), []);
        assert_eq!(translate(&[0x40F23C03, 0x00000000]), []);
    }

    #[test]
    fn relative_controllers_are_dropped() {
        assert_eq!(translate(&[0x40460006, 0x00000100]), []);
        assert_eq!(translate(&[0x40560006, 0x00000100]), []);
    }

    #[test]
    fn round_trips_with_bytestream_vectors() {
        // MIDI 1 CVM input from the bytestream translator is already MIDI 1 protocol.
        let words = [0x20C64000];
        assert_eq!(translate(&words), words);
    }
}
