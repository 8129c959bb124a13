//! USB-MIDI 1.0 event packets to MIDI 1.0 bytestream.
//!
//! Event packets are four bytes: a cable/code-index byte followed by up to three MIDI bytes.
//! The Code Index Number alone determines how many of those bytes are meaningful (Table 4-1
//! of the USB Device Class Definition for MIDI Devices, Release 1.0).

use crate::fifo::Fifo;

/// One packet carries at most three MIDI bytes.
const OUTPUT_CAPACITY: usize = 4;
static_assertions::const_assert!(OUTPUT_CAPACITY.is_power_of_two());

/// Demultiplexes one virtual cable of a USB-MIDI 1.0 event packet stream into plain MIDI 1.0
/// bytes. Packets addressed to any other cable are ignored.
#[derive(Default)]
pub struct UsbMidi1ToBytestream {
    cable: u8,
    output: Fifo<u8, OUTPUT_CAPACITY>,
}

impl UsbMidi1ToBytestream {
    /// `cable` selects the virtual cable (0-15) whose messages are translated.
    pub fn new(cable: u8) -> Self {
        debug_assert!(cable <= 0xF);
        UsbMidi1ToBytestream { cable: cable & 0xF, output: Fifo::new() }
    }

    /// Selects a different cable. Any in-flight output is dropped.
    pub fn set_cable(&mut self, cable: u8) {
        debug_assert!(cable <= 0xF);
        self.output.clear();
        self.cable = cable & 0xF;
    }

    pub fn cable(&self) -> u8 {
        self.cable
    }

    pub fn empty(&self) -> bool {
        self.output.empty()
    }

    /// Pops the next output byte.
    ///
    /// The output must not be empty.
    pub fn pop(&mut self) -> u8 {
        debug_assert!(!self.empty());
        self.output.pop_front()
    }

    /// Restores the translator to its initial state: cable 0, no buffered output.
    pub fn reset(&mut self) {
        self.output.clear();
        self.cable = 0;
    }

    /// Feeds one event packet, packed `cable:4 | CIN:4, byte1, byte2, byte3` from the most
    /// significant byte down.
    pub fn push(&mut self, packet: u32) {
        if ((packet >> 28) & 0xF) as u8 != self.cable {
            return;
        }
        let cin = ((packet >> 24) & 0xF) as u8;
        let bytes = cin_size(cin);
        if bytes > 0 {
            self.emit((packet >> 16) as u8);
        }
        if bytes > 1 {
            self.emit((packet >> 8) as u8);
        }
        if bytes > 2 {
            self.emit(packet as u8);
        }
    }

    fn emit(&mut self, byte: u8) {
        let ok = self.output.push_back(byte);
        debug_assert!(ok, "bytestream output overflow; drain between pushes");
    }
}

/// The number of MIDI bytes carried by a packet with the given Code Index Number.
fn cin_size(cin: u8) -> u8 {
    match cin {
        // 0x0 and 0x1 are reserved for future extension.
        0x0 | 0x1 => 0,
        // Two-byte system common.
        0x2 => 2,
        // Three-byte system common; sysex start or continue.
        0x3 | 0x4 => 3,
        // Single-byte system common / sysex end.
        0x5 => 1,
        // Sysex ends with the following two bytes.
        0x6 => 2,
        // Sysex ends with three bytes; note-off/on, poly key press, control change.
        0x7 | 0x8 | 0x9 | 0xA | 0xB => 3,
        // Program change and channel pressure.
        0xC | 0xD => 2,
        // Pitch bend.
        0xE => 3,
        // Single byte.
        _ => 1,
    }
}
