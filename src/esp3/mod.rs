//! # ESP3 Protocol Module
//!
//! Implementation of the EnOcean Serial Protocol 3 (receive side).
//!
//! This module handles:
//! - CRC8 checksum calculation (header and payload)
//! - Incremental packet framing with resynchronization
//! - Field access for received radio telegrams (ERP1)

pub mod crc;
pub mod framer;
pub mod packet;
pub mod protocol;
pub mod telegram;

pub use framer::{FrameError, PacketFramer};
pub use packet::Esp3Packet;
pub use protocol::{EnoceanAddress, PacketType, Rorg};
pub use telegram::RadioTelegram;

#[cfg(test)]
pub(crate) mod test_util {
    //! Helpers for building wire bytes in tests.

    use super::crc::crc8;
    use super::protocol::ESP3_SYNC_BYTE;
    use super::{Esp3Packet, PacketFramer};

    /// Build a complete ESP3 frame with valid header and payload CRCs
    pub fn frame(packet_type: u8, data: &[u8], opt: &[u8]) -> Vec<u8> {
        let len = data.len() as u16;
        let mut bytes = vec![ESP3_SYNC_BYTE, (len >> 8) as u8, len as u8, opt.len() as u8, packet_type];
        bytes.push(crc8(&bytes[1..5]));

        let start = bytes.len();
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(opt);
        let crc = crc8(&bytes[start..]);
        bytes.push(crc);
        bytes
    }

    /// Build the wire bytes of a radio telegram with standard optional data
    pub fn radio_frame(rorg: u8, user_data: &[u8], sender: u32, status: u8, dbm: u8) -> Vec<u8> {
        let mut data = vec![rorg];
        data.extend_from_slice(user_data);
        data.extend_from_slice(&sender.to_be_bytes());
        data.push(status);
        let opt = [0x01, 0xFF, 0xFF, 0xFF, 0xFF, dbm, 0x00];
        frame(0x01, &data, &opt)
    }

    /// Parse wire bytes into one completed packet
    pub fn parse(bytes: &[u8]) -> Esp3Packet {
        let mut framer = PacketFramer::new();
        framer.accept_bytes(bytes);
        framer.into_packet().expect("test bytes must form a complete packet")
    }

    /// Build a completed radio packet
    pub fn radio_packet(rorg: u8, user_data: &[u8], sender: u32, status: u8, dbm: u8) -> Esp3Packet {
        parse(&radio_frame(rorg, user_data, sender, status, dbm))
    }

    /// Build a completed RPS packet with a strong signal (-40 dBm)
    pub fn rps_packet(data: u8, sender: u32, status: u8) -> Esp3Packet {
        radio_packet(0xF6, &[data], sender, status, 40)
    }
}
