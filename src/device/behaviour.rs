//! Behaviour sinks receive the decoded channel events.

use tracing::info;

use crate::eep::ChannelKind;
use crate::esp3::EnoceanAddress;

/// Downstream consumer of one channel's events
#[cfg_attr(test, mockall::automock)]
pub trait BehaviourSink: Send {
    /// Button pressed (`true`) or released (`false`)
    fn button_action(&mut self, pressed: bool);

    /// Binary input changed or was re-reported
    fn update_input_state(&mut self, active: bool);
}

/// Identity of a channel a sink is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Physical device address
    pub address: EnoceanAddress,
    /// Subdevice index
    pub subdevice: u8,
    /// Channel index within the subdevice
    pub channel: usize,
    /// Hardware name of the channel
    pub name: &'static str,
    /// Behaviour kind
    pub kind: ChannelKind,
}

/// Creates one sink per channel when logical devices are built
pub trait SinkFactory: Send {
    /// Create the sink for a channel
    fn create_sink(&mut self, info: &ChannelInfo) -> Box<dyn BehaviourSink>;
}

/// Sink that only logs what it receives
#[derive(Debug)]
pub struct LoggingSink {
    info: ChannelInfo,
}

impl LoggingSink {
    pub fn new(info: ChannelInfo) -> Self {
        Self { info }
    }
}

impl BehaviourSink for LoggingSink {
    fn button_action(&mut self, pressed: bool) {
        info!(
            "Button {} - {:08X}, subdevice {}, channel {}: {}",
            self.info.name,
            self.info.address,
            self.info.subdevice,
            self.info.channel,
            if pressed { "PRESSED" } else { "RELEASED" }
        );
    }

    fn update_input_state(&mut self, active: bool) {
        info!(
            "Input {} - {:08X}, subdevice {}, channel {}: {}",
            self.info.name,
            self.info.address,
            self.info.subdevice,
            self.info.channel,
            if active { "ACTIVE" } else { "inactive" }
        );
    }
}

/// Factory producing [`LoggingSink`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSinkFactory;

impl SinkFactory for LoggingSinkFactory {
    fn create_sink(&mut self, info: &ChannelInfo) -> Box<dyn BehaviourSink> {
        Box::new(LoggingSink::new(*info))
    }
}
