//! Translators between the MIDI 1.0 byte stream, USB-MIDI 1.0 event packets and UMP.

mod from_ump;
mod to_ump;
mod usb_midi1;

pub use from_ump::UmpToBytestream;
pub use to_ump::BytestreamToUmp;
pub use usb_midi1::UsbMidi1ToBytestream;

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn to_ump(bytes: &[u8]) -> Vec<u32> {
        let mut t = BytestreamToUmp::default();
        let mut out = Vec::new();
        for b in bytes {
            t.push(*b);
            while !t.empty() {
                out.push(t.pop());
            }
        }
        out
    }

    fn to_bytes(words: &[u32]) -> Vec<u8> {
        let mut t = UmpToBytestream::new();
        let mut out = Vec::new();
        for w in words {
            t.push(*w);
            while !t.empty() {
                out.push(t.pop());
            }
        }
        out
    }

    fn round_trip(bytes: &[u8]) -> Vec<u8> {
        to_bytes(&to_ump(bytes))
    }

    /// A second round trip through UMP and back is the identity: the first pass
    /// canonicalises running status, the second has nothing left to change.
    #[test]
    fn double_round_trip_is_identity() {
        let streams: [&[u8]; 5] = [
            &[0x81, 0x60, 0x50, 0x70, 0x70],
            &[0x91, 0x3C, 0x40, 0x3D, 0x40, 0x91, 0x3E, 0x40],
            &[0xC6, 0x40, 0xF8, 0xC6, 0x41],
            &[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7, 0xB0, 0x07, 0x64],
            &[0xE4, 0x00, 0x40, 0x00, 0x20, 0xF2, 0x10, 0x08],
        ];
        for bytes in streams {
            let once = round_trip(bytes);
            let twice = round_trip(&once);
            assert_eq!(once, twice, "input {bytes:02x?}");
        }
    }

    #[test]
    fn round_trip_canonicalises_redundant_status() {
        // A redundant repeated status byte collapses onto running status.
        let bytes = [0x91, 0x3C, 0x40, 0x91, 0x3D, 0x40];
        assert_eq!(round_trip(&bytes), [0x91, 0x3C, 0x40, 0x3D, 0x40]);
    }

    #[test]
    fn sysex_round_trip_preserves_payload() {
        let mut bytes = std::vec![0xF0];
        bytes.extend((0u8..32).map(|i| i * 2));
        bytes.push(0xF7);
        assert_eq!(round_trip(&bytes), bytes);
    }

    /// Bytes upscaled to MIDI 2.0, downgraded to MIDI 1.0 protocol and serialised again come
    /// back canonical.
    #[test]
    fn midi2_path_round_trips() {
        let bytes = [0x81, 0x60, 0x50, 0x70, 0x70, 0xE2, 0x00, 0x40, 0xD3, 0x22];
        let mut up = BytestreamToUmp::new(true, 0);
        let mut down = crate::ump::to_midi1::UmpToMidi1::new();
        let mut back = UmpToBytestream::new();
        let mut out = Vec::new();
        for b in bytes {
            up.push(b);
            while !up.empty() {
                down.push(up.pop());
                while !down.empty() {
                    back.push(down.pop());
                    while !back.empty() {
                        out.push(back.pop());
                    }
                }
            }
        }
        assert_eq!(out, [0x81, 0x60, 0x50, 0x70, 0x70, 0xE2, 0x00, 0x40, 0xD3, 0x22]);
    }

    /// USB packets feed the byte parser directly.
    #[test]
    fn usb_packets_feed_the_ump_translator() {
        let mut usb = UsbMidi1ToBytestream::new(0);
        let mut up = BytestreamToUmp::default();
        let mut out = Vec::new();
        for packet in [0x0990_3C7Fu32, 0x08_80_3C00] {
            usb.push(packet);
            while !usb.empty() {
                up.push(usb.pop());
                while !up.empty() {
                    out.push(up.pop());
                }
            }
        }
        assert_eq!(out, [0x2090_3C7F, 0x2080_3C00]);
    }
}
