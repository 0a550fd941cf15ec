//! # ESP3 Packet Framer
//!
//! Incremental byte-stream parser assembling one ESP3 packet at a time.
//!
//! ## State Machine
//!
//! ```text
//! SyncWait --0x55--> HeaderRead --header CRC ok--> DataRead --payload CRC ok--> Complete
//!    ^                   |                            |
//!    +--header CRC bad (replay bytes 1..5)            |
//!    +--declared size > 300 (drop)                    |
//!    +--payload CRC bad (drop)------------------------+
//! ```
//!
//! A header whose CRC does not match is not thrown away: its bytes 1..5 are
//! fed through the state machine again, because a real sync byte may be
//! buried inside a corrupted header. Payload corruption drops the packet.
//!
//! Feeding bytes in arbitrary chunks yields the same packets as feeding them
//! all at once. Once complete, the framer accepts no more bytes; the caller
//! takes the packet with [`PacketFramer::into_packet`] and continues with a
//! fresh framer.

use thiserror::Error;
use tracing::{debug, info};

use super::crc::crc8;
use super::packet::{header_data_length, Esp3Packet};
use super::protocol::{ESP3_HEADER_SIZE, ESP3_MAX_PAYLOAD_SIZE, ESP3_SYNC_BYTE};

/// Framing faults, all recoverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Header CRC mismatch, parser resynchronizes
    #[error("header CRC mismatch, resynchronizing")]
    SyncLost,

    /// Payload CRC mismatch, packet dropped
    #[error("payload CRC mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    CrcMismatch {
        /// CRC computed over the received payload
        expected: u8,
        /// CRC byte received
        actual: u8,
    },

    /// Declared payload size above the allocation limit
    #[error("declared payload of {0} bytes exceeds limit of {limit}", limit = ESP3_MAX_PAYLOAD_SIZE)]
    Oversize(usize),
}

/// Parse state of a [`PacketFramer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Scanning for the 0x55 sync byte
    SyncWait,
    /// Collecting header bytes 1..5
    HeaderRead,
    /// Collecting data, optional data and payload CRC
    DataRead,
    /// Packet complete, no more bytes accepted
    Complete,
}

/// Incremental ESP3 packet parser
#[derive(Debug)]
pub struct PacketFramer {
    state: FramerState,
    header: [u8; ESP3_HEADER_SIZE],
    index: usize,
    payload: Vec<u8>,
    faults: Vec<FrameError>,
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFramer {
    /// Create a framer waiting for a sync byte
    pub fn new() -> Self {
        Self {
            state: FramerState::SyncWait,
            header: [0; ESP3_HEADER_SIZE],
            index: 0,
            payload: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// Current parse state
    pub fn state(&self) -> FramerState {
        self.state
    }

    /// True once a packet has been assembled and verified
    pub fn is_complete(&self) -> bool {
        self.state == FramerState::Complete
    }

    /// Swallow bytes until the packet is complete
    ///
    /// # Arguments
    ///
    /// * `bytes` - Next chunk of the byte stream
    ///
    /// # Returns
    ///
    /// * `usize` - Number of bytes consumed. Equals `bytes.len()` unless the
    ///   packet completed inside this chunk; the remaining bytes belong to the
    ///   next packet. Returns 0 if the packet was already complete.
    ///
    /// # Examples
    ///
    /// ```
    /// use enocean_gateway::esp3::PacketFramer;
    ///
    /// let bytes = [
    ///     0x55, 0x00, 0x07, 0x07, 0x01, 0x7A, 0xF6, 0x30, 0x00, 0x86, 0xB8, 0x1A, 0x30,
    ///     0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0xC0,
    /// ];
    /// let mut framer = PacketFramer::new();
    /// assert_eq!(framer.accept_bytes(&bytes), bytes.len());
    /// assert!(framer.is_complete());
    /// ```
    pub fn accept_bytes(&mut self, bytes: &[u8]) -> usize {
        if self.state == FramerState::Complete {
            return 0;
        }

        let mut accepted = 0;
        let mut replay = [0u8; ESP3_HEADER_SIZE - 1];
        let mut replay_len = 0;
        let mut replay_pos = 0;

        while accepted < bytes.len() || replay_pos < replay_len {
            let byte = if replay_pos < replay_len {
                replay_pos += 1;
                replay[replay_pos - 1]
            } else {
                accepted += 1;
                bytes[accepted - 1]
            };

            match self.state {
                FramerState::SyncWait => {
                    if byte == ESP3_SYNC_BYTE {
                        self.header[0] = byte;
                        self.index = 1;
                        self.state = FramerState::HeaderRead;
                    }
                }
                FramerState::HeaderRead => {
                    self.header[self.index] = byte;
                    self.index += 1;
                    if self.index == ESP3_HEADER_SIZE {
                        if self.header[ESP3_HEADER_SIZE - 1] != crc8(&self.header[1..ESP3_HEADER_SIZE - 1]) {
                            info!("ESP3 header CRC mismatch, resynchronizing");
                            self.faults.push(FrameError::SyncLost);
                            // Byte 1 or later may itself be the real sync byte
                            replay.copy_from_slice(&self.header[1..]);
                            replay_len = replay.len();
                            replay_pos = 0;
                            self.state = FramerState::SyncWait;
                        } else {
                            self.start_payload();
                        }
                    }
                }
                FramerState::DataRead => {
                    self.payload[self.index] = byte;
                    self.index += 1;
                    if self.index == self.payload.len() {
                        let expected = crc8(&self.payload[..self.index - 1]);
                        if expected != byte {
                            info!(
                                "ESP3 payload CRC mismatch (expected 0x{:02X}, got 0x{:02X}), packet dropped",
                                expected, byte
                            );
                            self.faults.push(FrameError::CrcMismatch { expected, actual: byte });
                            self.reset();
                        } else {
                            self.state = FramerState::Complete;
                            return accepted;
                        }
                    }
                }
                FramerState::Complete => break,
            }
        }

        accepted
    }

    /// Allocate the payload buffer for a verified header
    fn start_payload(&mut self) {
        let size = header_data_length(&self.header) + self.header[3] as usize + 1;
        if size > ESP3_MAX_PAYLOAD_SIZE {
            info!("ESP3 header declares {} payload bytes, dropped", size);
            self.faults.push(FrameError::Oversize(size));
            self.reset();
            return;
        }

        debug!(
            "ESP3 header ok: type 0x{:02X}, {} payload bytes",
            self.header[4], size
        );
        if self.payload.len() != size {
            self.payload = vec![0; size];
        }
        self.index = 0;
        self.state = FramerState::DataRead;
    }

    /// Back to sync search, discarding header and payload
    fn reset(&mut self) {
        self.state = FramerState::SyncWait;
        self.header = [0; ESP3_HEADER_SIZE];
        self.index = 0;
        self.payload = Vec::new();
    }

    /// Faults recorded since the last call
    pub fn take_faults(&mut self) -> Vec<FrameError> {
        std::mem::take(&mut self.faults)
    }

    /// Hand over the completed packet
    ///
    /// Returns `None` if the packet is not complete yet.
    pub fn into_packet(self) -> Option<Esp3Packet> {
        if self.state != FramerState::Complete {
            return None;
        }
        Some(Esp3Packet::from_parts(self.header, self.payload))
    }
}
