//! # EnOcean Communication Channel
//!
//! Feeds transport chunks through the packet framer and hands every
//! completed packet to the dispatcher. The framer refuses bytes once it
//! holds a complete packet, so it is replaced by a fresh one after each
//! packet and feeding continues until the chunk is used up.

use std::fmt;
use std::io;

use tracing::{debug, info, warn};

use super::port_trait::ByteSource;
use crate::dispatcher::{Dispatcher, LearnEvent};
use crate::error::{EnoceanError, Result};
use crate::esp3::{Esp3Packet, FrameError, PacketFramer, PacketType};

/// Size of the transport read buffer
pub const READ_BUFFER_SIZE: usize = 256;

/// Counters for one channel
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Bytes received
    pub bytes: u64,
    /// Completed packets
    pub packets: u64,
    /// Headers dropped because of a CRC mismatch
    pub header_crc_errors: u64,
    /// Packets dropped because of a payload CRC mismatch
    pub payload_crc_errors: u64,
    /// Headers announcing more than the maximum payload
    pub oversize: u64,
    /// Errors reported by the transport
    pub transport_errors: u64,
}

impl ChannelStats {
    fn record(&mut self, fault: FrameError) {
        match fault {
            FrameError::SyncLost => self.header_crc_errors += 1,
            FrameError::CrcMismatch { .. } => self.payload_crc_errors += 1,
            FrameError::Oversize(_) => self.oversize += 1,
        }
    }
}

impl fmt::Display for ChannelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes, {} packets, header CRC errors {}, payload CRC errors {}, oversize {}, transport errors {}",
            self.bytes,
            self.packets,
            self.header_crc_errors,
            self.payload_crc_errors,
            self.oversize,
            self.transport_errors
        )
    }
}

/// Receive side of the connection to an EnOcean module
#[derive(Debug)]
pub struct EnoceanComm {
    framer: PacketFramer,
    dispatcher: Dispatcher,
    stats: ChannelStats,
    stats_interval: u64,
    learn_event: Option<LearnEvent>,
}

impl EnoceanComm {
    /// Create a channel; statistics are logged every `stats_interval` packets
    pub fn new(dispatcher: Dispatcher, stats_interval: u64) -> Self {
        Self {
            framer: PacketFramer::new(),
            dispatcher,
            stats: ChannelStats::default(),
            stats_interval,
            learn_event: None,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Most recent learn action, cleared on read
    pub fn take_learn_event(&mut self) -> Option<LearnEvent> {
        self.learn_event.take()
    }

    /// Feed received bytes; returns how many were consumed
    pub fn accept_bytes(&mut self, bytes: &[u8]) -> usize {
        let mut remaining = bytes;
        let mut total = 0;

        while !remaining.is_empty() {
            let consumed = self.framer.accept_bytes(remaining);
            for fault in self.framer.take_faults() {
                self.stats.record(fault);
            }
            total += consumed;
            remaining = &remaining[consumed..];

            if self.framer.is_complete() {
                let framer = std::mem::take(&mut self.framer);
                if let Some(packet) = framer.into_packet() {
                    self.dispatch(packet);
                }
            } else if consumed == 0 {
                warn!("Framer stalled with {} bytes left", remaining.len());
                break;
            }
        }

        self.stats.bytes += total as u64;
        total
    }

    /// Handle one transport callback
    ///
    /// A transport error is passed to the dispatcher; no bytes are framed
    /// for that callback.
    pub fn handle_chunk(&mut self, chunk: io::Result<&[u8]>) -> usize {
        match chunk {
            Ok(bytes) => self.accept_bytes(bytes),
            Err(e) => {
                self.stats.transport_errors += 1;
                self.dispatcher.handle_radio_packet(Err(EnoceanError::Io(e)));
                0
            }
        }
    }

    fn dispatch(&mut self, packet: Esp3Packet) {
        self.stats.packets += 1;
        if self.stats_interval > 0 && self.stats.packets % self.stats_interval == 0 {
            info!("Channel statistics: {}", self.stats);
        }

        match packet.packet_type() {
            PacketType::Radio => {
                if let Some(event) = self.dispatcher.handle_radio_packet(Ok(packet)) {
                    self.learn_event = Some(event);
                }
            }
            other => debug!("Ignoring {:?} packet:\n{}", other, packet),
        }
    }

    /// Read one chunk from the transport and process it
    ///
    /// # Errors
    ///
    /// Returns [`EnoceanError::Io`] if the transport failed (after reporting it
    /// to the dispatcher) and [`EnoceanError::Transport`] if it was closed.
    pub async fn read_once<S>(&mut self, source: &mut S, buf: &mut [u8]) -> Result<usize>
    where
        S: ByteSource + ?Sized,
    {
        match source.read_chunk(buf).await {
            Ok(0) => Err(EnoceanError::Transport(format!("{} closed", source.describe()))),
            Ok(n) => Ok(self.handle_chunk(Ok(&buf[..n]))),
            Err(e) => {
                let kind = e.kind();
                self.handle_chunk(Err(e));
                Err(EnoceanError::Io(io::Error::new(
                    kind,
                    format!("read from {} failed", source.describe()),
                )))
            }
        }
    }

    /// Process chunks until the transport fails or closes
    pub async fn run<S>(&mut self, source: &mut S) -> Result<()>
    where
        S: ByteSource + ?Sized,
    {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        info!("Receiving from {}", source.describe());
        loop {
            self.read_once(source, &mut buf).await?;
        }
    }
}
