//! # ESP3 Packet
//!
//! A completed, integrity-checked ESP3 packet. Packets are produced by the
//! [`PacketFramer`](super::PacketFramer) and never change afterwards.

use std::fmt;

use super::protocol::{PacketType, Rorg, ESP3_HEADER_SIZE};
use super::telegram::RadioTelegram;
use crate::eep::rps::rps_action;

/// Completed ESP3 packet
///
/// Header layout:
///
/// | Byte | Field |
/// |------|-------|
/// | 0 | sync (0x55) |
/// | 1..2 | data length (big-endian) |
/// | 3 | optional data length |
/// | 4 | packet type |
/// | 5 | CRC8 over bytes 1..4 |
///
/// The payload holds data, optional data and the trailing payload CRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Esp3Packet {
    header: [u8; ESP3_HEADER_SIZE],
    payload: Vec<u8>,
}

impl Esp3Packet {
    /// Assemble a packet from a verified header and payload.
    ///
    /// The caller guarantees `payload.len() == data_length + opt_data_length + 1`.
    pub(crate) fn from_parts(header: [u8; ESP3_HEADER_SIZE], payload: Vec<u8>) -> Self {
        debug_assert_eq!(
            payload.len(),
            header_data_length(&header) + header[3] as usize + 1
        );
        Self { header, payload }
    }

    /// Raw header bytes
    pub fn header(&self) -> &[u8; ESP3_HEADER_SIZE] {
        &self.header
    }

    /// Declared data length
    pub fn data_length(&self) -> usize {
        header_data_length(&self.header)
    }

    /// Declared optional data length
    pub fn opt_data_length(&self) -> usize {
        self.header[3] as usize
    }

    /// Packet type from header byte 4
    pub fn packet_type(&self) -> PacketType {
        PacketType::from(self.header[4])
    }

    /// Data bytes
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.data_length()]
    }

    /// Optional data bytes
    pub fn opt_data(&self) -> &[u8] {
        let start = self.data_length();
        &self.payload[start..start + self.opt_data_length()]
    }

    /// Trailing payload CRC byte
    pub fn payload_crc(&self) -> u8 {
        self.payload[self.payload.len() - 1]
    }

    /// Radio telegram view, if this is a radio packet
    pub fn radio(&self) -> Option<RadioTelegram<'_>> {
        RadioTelegram::new(self)
    }
}

pub(crate) fn header_data_length(header: &[u8; ESP3_HEADER_SIZE]) -> usize {
    ((header[1] as usize) << 8) | header[2] as usize
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02X} ", b)?;
    }
    Ok(())
}

impl fmt::Display for Esp3Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.radio() {
            Some(radio) => {
                writeln!(
                    f,
                    "ESP3 RADIO rorg={}, sender=0x{:08X}, status=0x{:02X}",
                    radio.rorg(),
                    radio.sender(),
                    radio.status()
                )?;
                writeln!(
                    f,
                    "- subtelegrams={}, destination=0x{:08X}, dBm={}, secLevel={}",
                    radio.subtelegram_count(),
                    radio.destination(),
                    radio.signal_strength_dbm(),
                    radio.security_level()
                )?;
                if radio.rorg() == Rorg::Rps {
                    for rocker in 0..radio.num_rockers() {
                        writeln!(f, "- RPS rocker {} action = {}", rocker, rps_action(&radio, rocker))?;
                    }
                }
            }
            None => writeln!(f, "ESP3 packet of type 0x{:02X}", self.header[4])?,
        }

        write!(f, "- {:3} data bytes: ", self.data_length())?;
        write_hex(f, self.data())?;
        writeln!(f)?;
        if self.packet_type() == PacketType::Radio {
            write!(f, "- {:3} opt  bytes: ", self.opt_data_length())?;
            write_hex(f, self.opt_data())?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esp3::test_util::{frame, parse};

    const REFERENCE: [u8; 21] = [
        0x55, 0x00, 0x07, 0x07, 0x01, 0x7A, 0xF6, 0x30, 0x00, 0x86, 0xB8, 0x1A, 0x30, 0x03, 0xFF,
        0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0xC0,
    ];

    #[test]
    fn test_packet_fields() {
        let packet = parse(&REFERENCE);
        assert_eq!(packet.packet_type(), PacketType::Radio);
        assert_eq!(packet.data_length(), 7);
        assert_eq!(packet.opt_data_length(), 7);
        assert_eq!(packet.data(), &REFERENCE[6..13]);
        assert_eq!(packet.opt_data(), &REFERENCE[13..20]);
        assert_eq!(packet.payload_crc(), 0xC0);
        assert_eq!(packet.header(), &[0x55, 0x00, 0x07, 0x07, 0x01, 0x7A]);
    }

    #[test]
    fn test_description_of_radio_packet() {
        let packet = parse(&REFERENCE);
        let text = packet.to_string();
        assert!(text.contains("ESP3 RADIO rorg=0xF6"));
        assert!(text.contains("sender=0x0086B81A"));
        assert!(text.contains("subtelegrams=3"));
        assert!(text.contains("RPS rocker 1 action"));
        assert!(text.contains("F6 30 00 86 B8 1A 30"));
    }

    #[test]
    fn test_description_of_other_packet() {
        let packet = parse(&frame(0x02, &[0x00], &[]));
        assert_eq!(packet.packet_type(), PacketType::Response);
        assert!(packet.radio().is_none());

        let text = packet.to_string();
        assert!(text.starts_with("ESP3 packet of type 0x02"));
        assert!(!text.contains("opt  bytes"));
    }
}
