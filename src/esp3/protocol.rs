//! # ESP3 Protocol Constants and Types
//!
//! Core protocol definitions for the EnOcean Serial Protocol 3.

use std::fmt;

/// ESP3 packet sync byte (always 0x55)
pub const ESP3_SYNC_BYTE: u8 = 0x55;

/// Header size: sync(1) + data length(2) + optional length(1) + type(1) + crc(1)
pub const ESP3_HEADER_SIZE: usize = 6;

/// Largest payload buffer (data + optional data + crc) the framer will allocate
pub const ESP3_MAX_PAYLOAD_SIZE: usize = 300;

/// ESP3 serial baud rate for TCM300/TCM310 modules
pub const ESP3_BAUD_RATE: u32 = 57_600;

/// Optional data length carried by received radio telegrams
pub const RADIO_OPT_DATA_LENGTH: usize = 7;

/// RPS status byte: T21 set = 2-rocker device
pub const STATUS_T21: u8 = 0x20;

/// RPS status byte: NU set = N-message, cleared = U-message
pub const STATUS_NU: u8 = 0x10;

/// 1BS/4BS DB0.3: learn bit, *cleared* in teach-in telegrams
pub const LRN_BIT_MASK: u8 = 0x08;

/// 4BS DB0.7: teach-in telegram carries EEP and manufacturer information
pub const LRN_TYPE_MASK: u8 = 0x80;

/// EnOcean device address (chip ID or base ID)
pub type EnoceanAddress = u32;

/// Broadcast destination address
pub const ENOCEAN_BROADCAST: EnoceanAddress = 0xFFFF_FFFF;

/// ESP3 packet type (header byte 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Radio telegram (ERP1)
    Radio,
    /// Response to any packet
    Response,
    /// Radio subtelegram
    RadioSubTelegram,
    /// Event message
    Event,
    /// Common command
    CommonCommand,
    /// Smart Ack command
    SmartAckCommand,
    /// Remote management command
    RemoteManagementCommand,
    /// Manufacturer specific command (0x80..=0xFF)
    ManufacturerSpecific(u8),
    /// Anything else
    Unknown(u8),
}

impl From<u8> for PacketType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => PacketType::Radio,
            0x02 => PacketType::Response,
            0x03 => PacketType::RadioSubTelegram,
            0x04 => PacketType::Event,
            0x05 => PacketType::CommonCommand,
            0x06 => PacketType::SmartAckCommand,
            0x07 => PacketType::RemoteManagementCommand,
            0x80..=0xFF => PacketType::ManufacturerSpecific(value),
            other => PacketType::Unknown(other),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> Self {
        match value {
            PacketType::Radio => 0x01,
            PacketType::Response => 0x02,
            PacketType::RadioSubTelegram => 0x03,
            PacketType::Event => 0x04,
            PacketType::CommonCommand => 0x05,
            PacketType::SmartAckCommand => 0x06,
            PacketType::RemoteManagementCommand => 0x07,
            PacketType::ManufacturerSpecific(v) | PacketType::Unknown(v) => v,
        }
    }
}

/// Radio telegram organisation (first data byte of a radio telegram)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rorg {
    /// Repeated Switch Communication
    Rps,
    /// 1 Byte Communication
    OneBs,
    /// 4 Byte Communication
    FourBs,
    /// Variable Length Data
    Vld,
    /// Manufacturer specific communication
    Msc,
    /// Addressing Destination Telegram
    Adt,
    /// Smart Ack learn request
    SmartAckLearnRequest,
    /// Smart Ack learn answer
    SmartAckLearnAnswer,
    /// Smart Ack reclaim
    SmartAckReclaim,
    /// Remote management
    SysEx,
    /// Secure telegram
    Secure,
    /// Secure telegram with R-ORG encapsulation
    SecureEncapsulated,
    /// Unknown RORG
    Other(u8),
}

impl From<u8> for Rorg {
    fn from(value: u8) -> Self {
        match value {
            0xF6 => Rorg::Rps,
            0xD5 => Rorg::OneBs,
            0xA5 => Rorg::FourBs,
            0xD2 => Rorg::Vld,
            0xD1 => Rorg::Msc,
            0xA6 => Rorg::Adt,
            0xC6 => Rorg::SmartAckLearnRequest,
            0xC7 => Rorg::SmartAckLearnAnswer,
            0xA7 => Rorg::SmartAckReclaim,
            0xC5 => Rorg::SysEx,
            0x30 => Rorg::Secure,
            0x31 => Rorg::SecureEncapsulated,
            other => Rorg::Other(other),
        }
    }
}

impl From<Rorg> for u8 {
    fn from(value: Rorg) -> Self {
        match value {
            Rorg::Rps => 0xF6,
            Rorg::OneBs => 0xD5,
            Rorg::FourBs => 0xA5,
            Rorg::Vld => 0xD2,
            Rorg::Msc => 0xD1,
            Rorg::Adt => 0xA6,
            Rorg::SmartAckLearnRequest => 0xC6,
            Rorg::SmartAckLearnAnswer => 0xC7,
            Rorg::SmartAckReclaim => 0xA7,
            Rorg::SysEx => 0xC5,
            Rorg::Secure => 0x30,
            Rorg::SecureEncapsulated => 0x31,
            Rorg::Other(v) => v,
        }
    }
}

impl fmt::Display for Rorg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", u8::from(*self))
    }
}
