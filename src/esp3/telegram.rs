//! # Radio Telegram View
//!
//! Read-only field access over a completed radio (ERP1) packet.
//!
//! ## Data Layout
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0 | RORG |
//! | 1..n | user data (n bytes) |
//! | n+1..n+4 | sender address |
//! | n+5 | status |
//! | n+6 | VLD only: CRC |
//!
//! ## Optional Data Layout (7 bytes)
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0 | subtelegram count |
//! | 1..4 | destination address (0xFFFFFFFF = broadcast) |
//! | 5 | best RSSI of all subtelegrams, as positive -dBm |
//! | 6 | security level |

use super::packet::Esp3Packet;
use super::protocol::{
    EnoceanAddress, PacketType, Rorg, LRN_BIT_MASK, LRN_TYPE_MASK, RADIO_OPT_DATA_LENGTH,
    STATUS_NU, STATUS_T21,
};
use crate::eep::EepProfile;

/// Borrowed view of a radio telegram
#[derive(Debug, Clone, Copy)]
pub struct RadioTelegram<'a> {
    packet: &'a Esp3Packet,
}

impl<'a> RadioTelegram<'a> {
    /// Interpret a packet as radio telegram
    ///
    /// Returns `None` unless the packet type is radio and carries a RORG byte.
    pub fn new(packet: &'a Esp3Packet) -> Option<Self> {
        if packet.packet_type() != PacketType::Radio || packet.data_length() < 1 {
            return None;
        }
        Some(Self { packet })
    }

    /// Underlying packet
    pub fn packet(&self) -> &'a Esp3Packet {
        self.packet
    }

    /// Radio telegram organisation
    pub fn rorg(&self) -> Rorg {
        Rorg::from(self.packet.data()[0])
    }

    fn is_vld(&self) -> bool {
        self.rorg() == Rorg::Vld
    }

    /// Status byte (last data byte, or the one before the CRC for VLD)
    pub fn status(&self) -> u8 {
        let mut offset = self.packet.data_length() as isize - 1;
        if self.is_vld() {
            offset -= 1;
        }
        if offset < 0 {
            return 0;
        }
        self.packet.data()[offset as usize]
    }

    /// Number of user data bytes
    pub fn user_data_length(&self) -> usize {
        let overhead = if self.is_vld() { 7 } else { 6 };
        self.packet.data_length().saturating_sub(overhead)
    }

    /// User data bytes between RORG and sender address
    pub fn user_data(&self) -> &'a [u8] {
        let len = self.user_data_length();
        &self.packet.data()[1..1 + len]
    }

    /// First user data byte, the only one RPS and 1BS telegrams carry
    pub fn data_byte(&self) -> Option<u8> {
        self.user_data().first().copied()
    }

    /// Sender address (big-endian, 0 if the telegram carries no user data)
    pub fn sender(&self) -> EnoceanAddress {
        let len = self.user_data_length();
        if len == 0 {
            return 0;
        }
        let start = 1 + len;
        self.packet
            .data()
            .get(start..start + 4)
            .map_or(0, |b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn opt(&self) -> Option<&'a [u8]> {
        let opt = self.packet.opt_data();
        (opt.len() >= RADIO_OPT_DATA_LENGTH).then_some(opt)
    }

    /// Number of subtelegrams received
    pub fn subtelegram_count(&self) -> u8 {
        self.opt().map_or(0, |o| o[0])
    }

    /// Destination address
    pub fn destination(&self) -> EnoceanAddress {
        self.opt().map_or(0, |o| u32::from_be_bytes([o[1], o[2], o[3], o[4]]))
    }

    /// Signal strength in dBm (always <= 0; closer to zero is stronger)
    pub fn signal_strength_dbm(&self) -> i32 {
        self.opt().map_or(0, |o| -i32::from(o[5]))
    }

    /// Security level (0 = unencrypted)
    pub fn security_level(&self) -> u8 {
        self.opt().map_or(0, |o| o[6])
    }

    /// Number of rockers of an RPS switch (2 if T21 is set, 4 otherwise)
    pub fn num_rockers(&self) -> u8 {
        if self.rorg() != Rorg::Rps {
            return 0;
        }
        if self.status() & STATUS_T21 != 0 {
            2
        } else {
            4
        }
    }

    /// Whether this telegram may be used to learn a device in or out
    ///
    /// RPS telegrams carry no teach-in flag; any of them counts as an implicit
    /// teach-in when received at `min_learn_dbm` or stronger. 1BS and 4BS
    /// teach-in telegrams have the LRN bit *cleared*.
    pub fn has_teach_info(&self, min_learn_dbm: i32) -> bool {
        match self.rorg() {
            Rorg::Rps => self.signal_strength_dbm() >= min_learn_dbm,
            Rorg::OneBs => self.data_byte().is_some_and(|d| d & LRN_BIT_MASK == 0),
            Rorg::FourBs => self.four_bs_db0().is_some_and(|d| d & LRN_BIT_MASK == 0),
            _ => false,
        }
    }

    fn four_bs_db0(&self) -> Option<u8> {
        let data = self.user_data();
        (data.len() >= 4).then(|| data[3])
    }

    fn four_bs_teach_in_with_eep(&self) -> bool {
        self.four_bs_db0()
            .is_some_and(|d| d & LRN_BIT_MASK == 0 && d & LRN_TYPE_MASK != 0)
    }

    /// Equipment profile announced or implied by a teach-in telegram
    ///
    /// RPS devices do not announce their profile, it is inferred from the
    /// telegram: a window handle position message (U-message, T21 set, upper
    /// two data bits set) or otherwise a 2- or 4-rocker switch.
    pub fn eep_profile(&self) -> Option<EepProfile> {
        match self.rorg() {
            Rorg::Rps => {
                let data = self.data_byte()?;
                let status = self.status();
                if status & STATUS_NU == 0 && status & STATUS_T21 != 0 && data & 0xC0 == 0xC0 {
                    Some(EepProfile::WINDOW_HANDLE)
                } else if status & STATUS_T21 != 0 {
                    Some(EepProfile::new(0xF6, 0x02, 0x01))
                } else {
                    Some(EepProfile::new(0xF6, 0x03, 0x01))
                }
            }
            Rorg::OneBs => Some(EepProfile::new(0xD5, 0x00, 0x01)),
            Rorg::FourBs if self.four_bs_teach_in_with_eep() => {
                let d = self.user_data();
                let func = d[0] >> 2;
                let eep_type = ((d[0] & 0x03) << 5) | (d[1] >> 3);
                Some(EepProfile::new(0xA5, func, eep_type))
            }
            _ => None,
        }
    }

    /// Manufacturer ID from a 4BS teach-in telegram with EEP, 0 otherwise
    pub fn manufacturer(&self) -> u16 {
        if !self.four_bs_teach_in_with_eep() {
            return 0;
        }
        let d = self.user_data();
        (u16::from(d[1] & 0x07) << 8) | u16::from(d[2])
    }
}
